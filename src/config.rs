//! Configuration Management
//!
//! Optional defaults for report runs, read from
//! `<config dir>/vicloud/report.json`. Values given on the command line always
//! win over the file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    /// Profiles to report on when none are given
    #[serde(default)]
    pub profiles: Vec<String>,
    /// Regions to report on when none are given
    #[serde(default)]
    pub regions: Vec<String>,
    /// Supplemental DNS documents always loaded for the elb diagram
    #[serde(default)]
    pub dns_sources: Vec<PathBuf>,
    /// Draw instances without load balancer connections
    #[serde(default)]
    pub show_all_hosts: bool,
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("vicloud").join("report.json"))
    }

    /// Load configuration from the default location
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        Self::load_from(&path)
    }

    /// Load configuration from `path`; a missing or unreadable file gives the
    /// defaults
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("ignoring config {:?}: {}", path, e);
                Self::default()
            }),
            Err(e) => {
                tracing::warn!("cannot read config {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    /// Get effective profiles (CLI > config)
    pub fn effective_profiles(&self, cli: &[String]) -> Vec<String> {
        if cli.is_empty() {
            self.profiles.clone()
        } else {
            cli.to_vec()
        }
    }

    /// Get effective regions (CLI > config)
    pub fn effective_regions(&self, cli: &[String]) -> Vec<String> {
        if cli.is_empty() {
            self.regions.clone()
        } else {
            cli.to_vec()
        }
    }

    /// DNS sources from the config file followed by the ones on the command line
    pub fn effective_dns_sources(&self, cli: &[PathBuf]) -> Vec<PathBuf> {
        let mut sources = self.dns_sources.clone();
        for path in cli {
            if !sources.contains(path) {
                sources.push(path.clone());
            }
        }
        sources
    }

    pub fn effective_show_all_hosts(&self, cli: bool) -> bool {
        cli || self.show_all_hosts
    }
}
