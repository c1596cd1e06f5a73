//! Record Stream Reader
//!
//! Reads canonical records back out of a dump tree. The collector writes YAML
//! multi-document streams, one file per resource or many resources per file;
//! JSON dumps (single or concatenated values) are accepted as well.

use crate::error::{Error, Result, Warning};
use crate::model::lenient;
use serde::Deserialize;
use serde_json::Value;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Where a record came from
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Metadata {
    #[serde(deserialize_with = "lenient::string")]
    pub profile: String,
    #[serde(deserialize_with = "lenient::string")]
    pub region: String,
    #[serde(deserialize_with = "lenient::string")]
    pub resourceid: String,
}

/// One canonical record: `{datatype, metadata, specifics}`
#[derive(Debug, Clone, Deserialize)]
pub struct Record {
    pub datatype: String,
    pub metadata: Metadata,
    pub specifics: Value,
}

impl Record {
    pub fn from_value(value: Value, origin: &str) -> Result<Self, Warning> {
        serde_json::from_value(value).map_err(|e| Warning::MalformedRecord {
            origin: origin.to_string(),
            reason: e.to_string(),
        })
    }

    /// Short description for diagnostics
    pub fn origin(&self) -> String {
        format!(
            "{} {}/{}/{}",
            self.datatype, self.metadata.profile, self.metadata.region, self.metadata.resourceid
        )
    }
}

/// Profile and region filter
///
/// Each list is an `IN` filter: empty accepts everything, otherwise the
/// metadata value must match one entry exactly.
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    pub profiles: Vec<String>,
    pub regions: Vec<String>,
}

impl RecordFilter {
    pub fn new(profiles: Vec<String>, regions: Vec<String>) -> Self {
        Self { profiles, regions }
    }

    pub fn accepts(&self, metadata: &Metadata) -> bool {
        fn matches(values: &[String], value: &str) -> bool {
            values.is_empty() || values.iter().any(|v| v == value)
        }

        matches(&self.profiles, &metadata.profile) && matches(&self.regions, &metadata.region)
    }
}

/// Lazy stream of filtered records from a dump tree
///
/// The file list is fixed when the stream is opened (sorted by path); files are
/// parsed one at a time as the stream is consumed. Per-document problems come
/// out of the stream as warnings and never end it.
pub struct RecordStream {
    files: std::vec::IntoIter<PathBuf>,
    pending: VecDeque<Result<Record, Warning>>,
    filter: RecordFilter,
    dropped: usize,
}

impl RecordStream {
    /// Open a directory tree or a single file
    pub fn open(root: &Path, filter: RecordFilter) -> Result<Self> {
        let meta = std::fs::metadata(root).map_err(|source| Error::Io {
            path: root.to_path_buf(),
            source,
        })?;

        let mut pending = VecDeque::new();
        let files = if meta.is_file() {
            vec![root.to_path_buf()]
        } else {
            let mut files = Vec::new();
            for entry in WalkDir::new(root).sort_by_file_name() {
                match entry {
                    Ok(entry) if entry.file_type().is_file() && is_dump_file(entry.path()) => {
                        files.push(entry.into_path());
                    }
                    Ok(_) => {}
                    Err(e) if e.depth() == 0 => {
                        return Err(Error::Io {
                            path: root.to_path_buf(),
                            source: e.into(),
                        });
                    }
                    Err(e) => pending.push_back(Err(Warning::MalformedRecord {
                        origin: e
                            .path()
                            .map(|p| p.display().to_string())
                            .unwrap_or_else(|| root.display().to_string()),
                        reason: e.to_string(),
                    })),
                }
            }
            files
        };

        tracing::info!("{} dump files under {:?}", files.len(), root);

        Ok(Self {
            files: files.into_iter(),
            pending,
            filter,
            dropped: 0,
        })
    }

    /// Number of records dropped by the filter so far
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    fn read_file(&mut self, path: &Path) {
        let origin = path.display().to_string();
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                self.pending.push_back(Err(Warning::MalformedRecord {
                    origin,
                    reason: e.to_string(),
                }));
                return;
            }
        };

        tracing::trace!("reading {}", origin);
        for (index, doc) in parse_documents(path, &text).into_iter().enumerate() {
            let doc_origin = format!("{}#{}", origin, index);
            let record = doc.and_then(|value| Record::from_value(value, &doc_origin));
            match record {
                Ok(record) if !self.filter.accepts(&record.metadata) => {
                    tracing::trace!("filtered out {}", record.origin());
                    self.dropped += 1;
                }
                other => self.pending.push_back(other),
            }
        }
    }
}

impl Iterator for RecordStream {
    type Item = Result<Record, Warning>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.pending.pop_front() {
                return Some(item);
            }
            let path = self.files.next()?;
            self.read_file(&path);
        }
    }
}

fn is_dump_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml" | "yml" | "json")
    )
}

/// Split a file into its documents
///
/// A syntax error ends the file: neither parser can resynchronise after one.
pub fn parse_documents(path: &Path, text: &str) -> Vec<Result<Value, Warning>> {
    let origin = path.display().to_string();
    let malformed = |reason: String| Warning::MalformedRecord {
        origin: origin.clone(),
        reason,
    };

    let mut docs = Vec::new();
    if path.extension().and_then(|e| e.to_str()) == Some("json") {
        for value in serde_json::Deserializer::from_str(text).into_iter::<Value>() {
            match value {
                Ok(value) => docs.push(Ok(value)),
                Err(e) => {
                    docs.push(Err(malformed(e.to_string())));
                    break;
                }
            }
        }
    } else {
        for doc in serde_yaml::Deserializer::from_str(text) {
            match Value::deserialize(doc) {
                // `---`/`...` framing leaves empty documents behind
                Ok(Value::Null) => {}
                Ok(value) => docs.push(Ok(value)),
                Err(e) => {
                    docs.push(Err(malformed(e.to_string())));
                    break;
                }
            }
        }
    }
    docs
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn meta(profile: &str, region: &str) -> Metadata {
        Metadata {
            profile: profile.to_string(),
            region: region.to_string(),
            resourceid: "x".to_string(),
        }
    }

    #[test]
    fn test_empty_filter_accepts_all() {
        let filter = RecordFilter::default();
        assert!(filter.accepts(&meta("prod", "us-east-1")));
    }

    #[test]
    fn test_filter_is_exact_match() {
        let filter = RecordFilter::new(vec!["prod".into()], vec![]);
        assert!(filter.accepts(&meta("prod", "us-east-1")));
        assert!(!filter.accepts(&meta("production", "us-east-1")));

        let filter = RecordFilter::new(vec![], vec!["us-east-1".into(), "eu-west-1".into()]);
        assert!(filter.accepts(&meta("dev", "eu-west-1")));
        assert!(!filter.accepts(&meta("dev", "ap-southeast-2")));
    }

    #[test]
    fn test_yaml_multi_document() {
        let text = "---\ndatatype: aws.ec2.vpcs\nmetadata:\n  profile: p\n  region: r\n  resourceid: vpc-1\nspecifics:\n  VpcId: vpc-1\n...\n---\ndatatype: aws.ec2.vpcs\nmetadata:\n  profile: p\n  region: r\n  resourceid: vpc-2\nspecifics:\n  VpcId: vpc-2\n...\n\n";
        let docs = parse_documents(Path::new("dump.yaml"), text);
        assert_eq!(docs.len(), 2);
        assert!(docs.iter().all(|d| d.is_ok()));
    }

    #[test]
    fn test_concatenated_json() {
        let text = r#"{"a": 1} {"b": 2}
{"c": 3}"#;
        let docs = parse_documents(Path::new("dump.json"), text);
        assert_eq!(docs.len(), 3);
    }

    #[test]
    fn test_record_requires_all_fields() {
        let err = Record::from_value(json!({"datatype": "aws.ec2.vpcs", "specifics": {}}), "t")
            .unwrap_err();
        assert!(matches!(err, Warning::MalformedRecord { .. }));
    }

    #[test]
    fn test_numeric_resourceid_is_accepted() {
        let record = Record::from_value(
            json!({
                "datatype": "aws.ec2.account_attributes",
                "metadata": {"profile": "p", "region": "r", "resourceid": 0},
                "specifics": {}
            }),
            "t",
        )
        .unwrap();
        assert_eq!(record.metadata.resourceid, "0");
    }
}
