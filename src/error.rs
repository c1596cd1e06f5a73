//! Error and warning taxonomy
//!
//! [`Error`] is the fatal class: it aborts a report run. [`Warning`] covers
//! everything that only degrades the output; warnings are collected as values
//! during load and bind and surfaced once at the end of the run.

use std::fmt;
use std::path::PathBuf;

use crate::model::Kind;

/// Fatal conditions
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The input root (or a file the user explicitly named) could not be read
    #[error("cannot read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A supplemental DNS document was unreadable as a whole
    #[error("cannot parse DNS source {path:?}: {message}")]
    DnsSource { path: PathBuf, message: String },

    /// Upstream data no longer matches the model this tool assumes
    #[error("invariant violated by {kind} {key}: {message}")]
    InvariantViolation {
        kind: Kind,
        key: String,
        message: String,
    },

    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}

impl Error {
    pub fn invariant(kind: Kind, key: &str, message: impl Into<String>) -> Self {
        Self::InvariantViolation {
            kind,
            key: key.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Which relation a binder pass was trying to attach
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Relation {
    ListenerLoadBalancer,
    RuleListener,
    TargetGroupLoadBalancer,
    TargetHealthTargetGroup,
    TargetHealthInstance,
    DnsLoadBalancer,
    DnsInstance,
    InstanceSecurityGroup,
    LoadBalancerSecurityGroup,
    SubnetVpc,
    InstanceSubnet,
}

impl Relation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ListenerLoadBalancer => "listener -> load balancer",
            Self::RuleListener => "rule -> listener",
            Self::TargetGroupLoadBalancer => "target group -> load balancer",
            Self::TargetHealthTargetGroup => "target health -> target group",
            Self::TargetHealthInstance => "target health -> instance",
            Self::DnsLoadBalancer => "dns -> load balancer",
            Self::DnsInstance => "dns -> instance",
            Self::InstanceSecurityGroup => "instance -> security group",
            Self::LoadBalancerSecurityGroup => "load balancer -> security group",
            Self::SubnetVpc => "subnet -> vpc",
            Self::InstanceSubnet => "instance -> subnet",
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Non-fatal conditions
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Warning {
    /// One input document could not be used as a record
    #[error("malformed record in {origin}: {reason}")]
    MalformedRecord { origin: String, reason: String },

    /// A typed view could not find its identity field
    #[error("{kind} record {origin} has no {field} field")]
    MissingIdentityField {
        kind: Kind,
        field: &'static str,
        origin: String,
    },

    /// A binder pass found no target for a reference
    #[error("unresolved {relation}: {from} -> {to}")]
    UnresolvedReference {
        from: String,
        to: String,
        relation: Relation,
    },
}

impl Warning {
    pub fn unresolved(from: &str, to: &str, relation: Relation) -> Self {
        Self::UnresolvedReference {
            from: from.to_string(),
            to: to.to_string(),
            relation,
        }
    }

    /// Log this warning at the level its class deserves.
    ///
    /// Unresolved references are routine on partial dumps, so they only show
    /// up at `info` and above.
    pub fn emit(&self) {
        match self {
            Self::UnresolvedReference { .. } => tracing::info!("{}", self),
            _ => tracing::warn!("{}", self),
        }
    }
}

/// Log every warning followed by a one line summary
pub fn emit_all(warnings: &[Warning]) {
    let mut unresolved = 0;
    for warning in warnings {
        if matches!(warning, Warning::UnresolvedReference { .. }) {
            unresolved += 1;
        }
        warning.emit();
    }

    if !warnings.is_empty() {
        tracing::info!(
            "{} warnings ({} unresolved references)",
            warnings.len(),
            unresolved
        );
    }
}
