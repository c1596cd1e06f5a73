//! Identifier reference diagram
//!
//! Works straight off the record stream, without the typed views: any string
//! value in `specifics` that ends in a provider id yields an edge from the
//! record's `resourceid` to that id.

use std::collections::BTreeSet;

use regex::Regex;
use serde_json::Value;

use super::DotWriter;
use crate::error::{Result, Warning};
use crate::resource::Record;

/// `vpc-0a1b2c3d4e5f67890`, `subnet-...`, `eni-attach-...` at the end of a
/// value and not glued to a longer token
const ID_PATTERN: &str = r"(?:^|[^-a-z0-9])([a-z][-a-z]*-[0-9a-f]{17})$";

/// Free text; ids mentioned in prose are not references
const SKIPPED_FIELDS: &[&str] = &["Description"];

pub struct ReferenceScanner {
    pattern: Regex,
}

impl ReferenceScanner {
    pub fn new() -> Result<Self> {
        Ok(Self {
            pattern: Regex::new(ID_PATTERN)?,
        })
    }

    /// Every id referenced by `specifics`, excluding `this`
    pub fn references(&self, this: &str, specifics: &Value) -> BTreeSet<String> {
        let mut found = BTreeSet::new();
        self.walk(specifics, &mut found);
        found.remove(this);
        found
    }

    fn walk(&self, value: &Value, found: &mut BTreeSet<String>) {
        match value {
            Value::String(s) => {
                if let Some(id) = self.pattern.captures(s).and_then(|c| c.get(1)) {
                    found.insert(id.as_str().to_string());
                }
            }
            Value::Array(items) => {
                for item in items {
                    self.walk(item, found);
                }
            }
            Value::Object(map) => {
                for (key, item) in map {
                    if SKIPPED_FIELDS.contains(&key.as_str()) {
                        continue;
                    }
                    self.walk(item, found);
                }
            }
            _ => {}
        }
    }
}

/// Render the reference diagram, collecting stream warnings on the way
pub fn render<I>(records: I, warnings: &mut Vec<Warning>) -> Result<String>
where
    I: IntoIterator<Item = std::result::Result<Record, Warning>>,
{
    let scanner = ReferenceScanner::new()?;
    let mut edges = BTreeSet::new();

    for record in records {
        let record = match record {
            Ok(record) => record,
            Err(warning) => {
                warnings.push(warning);
                continue;
            }
        };
        let this = record.metadata.resourceid.as_str();
        if this.is_empty() {
            tracing::debug!("{} has no resource id", record.origin());
            continue;
        }
        for id in scanner.references(this, &record.specifics) {
            edges.insert((this.to_string(), id));
        }
    }

    tracing::info!("{} references found", edges.len());

    let mut dot = DotWriter::digraph();
    dot.statement("node [ shape=\"rectangle\" ]");
    dot.statement("rankdir=LR");
    for (from, to) in &edges {
        dot.edge(from, to);
    }
    Ok(dot.finish())
}
