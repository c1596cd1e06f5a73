//! Reports over dumped cloud inventory
//!
//! Reads the canonical records a collector wrote to disk, rebuilds the
//! relationships between independently fetched resources and renders them as
//! Graphviz diagrams or fixed-width tables.
//!
//! The pipeline is strictly phased:
//!
//! 1. [`resource::load`] reads and filters records into an immutable [`resource::Inventory`]
//! 2. [`bind::bind`] resolves cross references into a [`bind::Topology`]
//! 3. [`graph`] or [`report`] render the topology

pub mod bind;
pub mod config;
pub mod error;
pub mod graph;
pub mod model;
pub mod report;
pub mod resource;

pub use error::{Error, Result, Warning};

/// Version injected at compile time via VICLOUD_VERSION env var (set by CI/CD),
/// or "dev" for local builds.
pub const VERSION: &str = match option_env!("VICLOUD_VERSION") {
    Some(v) => v,
    None => "dev",
};
