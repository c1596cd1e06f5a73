//! Resource load layer
//!
//! Turns a dump tree into an [`Inventory`]: every record is read, filtered,
//! dispatched on its datatype and decoded into a typed view held in that
//! kind's registry.
//!
//! # Architecture
//!
//! - [`reader`] - Walks the dump tree and yields filtered records lazily
//! - [`dispatch`] - Maps a record's datatype to the registry that ingests it
//! - [`registry`] - Ordered keyed stores and secondary indices
//! - [`inventory`] - The per-run set of registries and the [`Loader`] that fills it
//!
//! # Example
//!
//! ```ignore
//! use vicloud_report::resource::{load, RecordFilter};
//!
//! let filter = RecordFilter::new(vec!["prod".into()], vec![]);
//! let (inventory, warnings) = load(Path::new("dump"), &filter, &[])?;
//! println!("{} load balancers", inventory.load_balancers.len());
//! ```

mod dispatch;
mod inventory;
mod reader;
mod registry;

pub use inventory::{Inventory, Loader};
pub use reader::{parse_documents, Metadata, Record, RecordFilter, RecordStream};
pub use registry::{Registry, SecondaryIndex};

use crate::error::{Result, Warning};
use std::path::{Path, PathBuf};

/// Run the whole load phase
///
/// Supplemental DNS sources are loaded first and bypass the filter; dump
/// records loaded afterwards overwrite DNS records of the same name.
pub fn load(
    root: &Path,
    filter: &RecordFilter,
    dns_sources: &[PathBuf],
) -> Result<(Inventory, Vec<Warning>)> {
    let mut loader = Loader::new();

    for path in dns_sources {
        loader.load_dns_source(path)?;
    }

    let mut stream = RecordStream::open(root, filter.clone())?;
    let ingested = loader.ingest_all(&mut stream)?;
    tracing::debug!(
        "ingested {} records, {} dropped by filter",
        ingested,
        stream.dropped()
    );

    Ok(loader.finish())
}
