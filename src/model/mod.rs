//! Typed entity views
//!
//! Every dumped record carries an opaque `specifics` document. The types in this
//! module are the typed views the reports need over those documents: only the
//! fields that are actually read are declared, everything else is ignored.
//!
//! # Module Structure
//!
//! - [`elb`] - load balancers, listeners, rules, target groups, target health
//! - [`ec2`] - instances, subnets, VPCs, security groups, ACLs, interfaces
//! - [`dns`] - DNS records from Route 53 dumps or a supplemental DNS document

pub mod dns;
pub mod ec2;
pub mod elb;

pub use dns::{DnsRecord, Route53RecordSet};
pub use ec2::{
    AclEntry, Instance, NetworkAcl, NetworkInterface, SecurityGroup, SecurityGroupRule, Subnet,
    Vpc,
};
pub use elb::{Action, Listener, LoadBalancer, Rule, Target, TargetGroup, TargetHealth};

use serde::de::{DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// The closed set of entity kinds the reports understand
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Kind {
    LoadBalancer,
    Listener,
    Rule,
    TargetGroup,
    TargetHealth,
    Instance,
    Dns,
    Subnet,
    Vpc,
    SecurityGroup,
    SecurityGroupRule,
    NetworkAcl,
    NetworkInterface,
}

impl Kind {
    pub const ALL: [Kind; 13] = [
        Kind::LoadBalancer,
        Kind::Listener,
        Kind::Rule,
        Kind::TargetGroup,
        Kind::TargetHealth,
        Kind::Instance,
        Kind::Dns,
        Kind::Subnet,
        Kind::Vpc,
        Kind::SecurityGroup,
        Kind::SecurityGroupRule,
        Kind::NetworkAcl,
        Kind::NetworkInterface,
    ];

    /// Collector datatype that produces records of this kind
    pub fn datatype(&self) -> &'static str {
        match self {
            Kind::LoadBalancer => "aws.elbv2.load_balancers",
            Kind::Listener => "aws.elbv2.listeners",
            Kind::Rule => "aws.elbv2.rules",
            Kind::TargetGroup => "aws.elbv2.target_groups",
            Kind::TargetHealth => "aws.elbv2.target_health",
            Kind::Instance => "aws.ec2.instances",
            Kind::Dns => "aws.route53.resource_record_sets",
            Kind::Subnet => "aws.ec2.subnets",
            Kind::Vpc => "aws.ec2.vpcs",
            Kind::SecurityGroup => "aws.ec2.security_groups",
            Kind::SecurityGroupRule => "aws.ec2.security_group_rules",
            Kind::NetworkAcl => "aws.ec2.network_acls",
            Kind::NetworkInterface => "aws.ec2.network_interfaces",
        }
    }

    pub fn from_datatype(datatype: &str) -> Option<Kind> {
        Self::ALL.into_iter().find(|k| k.datatype() == datatype)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::LoadBalancer => "load balancer",
            Kind::Listener => "listener",
            Kind::Rule => "rule",
            Kind::TargetGroup => "target group",
            Kind::TargetHealth => "target health",
            Kind::Instance => "instance",
            Kind::Dns => "dns record",
            Kind::Subnet => "subnet",
            Kind::Vpc => "vpc",
            Kind::SecurityGroup => "security group",
            Kind::SecurityGroupRule => "security group rule",
            Kind::NetworkAcl => "network acl",
            Kind::NetworkInterface => "network interface",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a typed view could not be built from a `specifics` document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    MissingIdentity,
    Malformed(String),
}

/// Capabilities shared by every entity kind
pub trait Entity: DeserializeOwned {
    const KIND: Kind;

    /// Field of `specifics` the identity key is derived from
    const IDENTITY_FIELD: &'static str;

    /// Unique key within this kind's registry
    fn identity(&self) -> String;

    /// Short human readable name
    fn display_name(&self) -> String;

    /// Name of this entity's node in rendered diagrams
    fn node_key(&self) -> String;

    /// Build the typed view, checking the identity field first so a missing
    /// key is reported as such rather than as a generic decode failure.
    fn decode(specifics: &Value) -> Result<Self, DecodeError> {
        match specifics.get(Self::IDENTITY_FIELD) {
            Some(Value::String(s)) if !s.is_empty() => {}
            _ => return Err(DecodeError::MissingIdentity),
        }
        Self::deserialize(specifics).map_err(|e| DecodeError::Malformed(e.to_string()))
    }
}

/// Provider tags, normalised from `[{Key, Value}]` into a sorted map
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tags(BTreeMap<String, String>);

impl Tags {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(|s| s.as_str())
    }

    pub fn name(&self) -> Option<&str> {
        self.get("Name")
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }

    /// `"name (id)"` with the lowercased Name tag, or `"? (id)"`
    pub fn labelled(&self, id: &str) -> String {
        let name = self
            .name()
            .map(|n| n.to_lowercase())
            .unwrap_or_else(|| "?".to_string());
        format!("{} ({})", name, id)
    }
}

impl fmt::Display for Tags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (k, v) in &self.0 {
            if !first {
                f.write_str(",")?;
            }
            first = false;
            write!(f, "{}={}", k, v)?;
        }
        Ok(())
    }
}

impl<'de> Deserialize<'de> for Tags {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Tag {
            #[serde(rename = "Key")]
            key: String,
            #[serde(rename = "Value", default, deserialize_with = "lenient::string")]
            value: String,
        }

        let list: Option<Vec<Tag>> = Option::deserialize(deserializer)?;
        let mut tags = BTreeMap::new();
        for tag in list.unwrap_or_default() {
            if let Some(previous) = tags.insert(tag.key.clone(), tag.value) {
                tracing::warn!("duplicate tag {:?}, dropping value {:?}", tag.key, previous);
            }
        }
        Ok(Tags(tags))
    }
}

/// Last path segment of an ARN's resource part, with a fallback to the input
///
/// `arn:aws:elasticloadbalancing:r:1:listener/app/web/50dc/f2f7` -> `f2f7`
pub fn arn_tail(arn: &str) -> &str {
    arn.rsplit('/').next().unwrap_or(arn)
}

/// The `n`th `/`-separated field of an ARN, or the ARN itself when it has no
/// such field
pub fn arn_field(arn: &str, n: usize) -> &str {
    arn.split('/').nth(n).filter(|s| !s.is_empty()).unwrap_or(arn)
}

/// Everything after the `n`th `/` of an ARN, or the ARN itself when it has
/// fewer fields
///
/// `arn:aws:elasticloadbalancing:r:1:loadbalancer/app/web/50dc`, 2 -> `web/50dc`
pub fn arn_path(arn: &str, n: usize) -> &str {
    arn.splitn(n + 1, '/')
        .nth(n)
        .filter(|s| !s.is_empty())
        .unwrap_or(arn)
}

/// Deserializers that accept the loose typing of dumped documents, where
/// ports and ids may arrive as strings or as numbers depending on the encoder.
pub(crate) mod lenient {
    use serde::de::{Deserialize, Deserializer, Error};
    use serde_json::Value;

    fn scalar_to_string<E: Error>(value: Value) -> Result<Option<String>, E> {
        match value {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(s)),
            Value::Number(n) => Ok(Some(n.to_string())),
            Value::Bool(b) => Ok(Some(b.to_string())),
            other => Err(E::custom(format!("expected a scalar, found {}", other))),
        }
    }

    pub fn string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        Ok(scalar_to_string(Value::deserialize(deserializer)?)?.unwrap_or_default())
    }

    pub fn opt_string<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<String>, D::Error> {
        scalar_to_string(Value::deserialize(deserializer)?)
    }

    pub fn opt_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Null => Ok(None),
            Value::Number(n) => n
                .as_i64()
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("expected an integer, found {}", n))),
            Value::String(s) => s
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| D::Error::custom(format!("expected an integer, found {:?}", s))),
            other => Err(D::Error::custom(format!("expected an integer, found {}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_datatype_round_trip() {
        for kind in Kind::ALL {
            assert_eq!(Kind::from_datatype(kind.datatype()), Some(kind));
        }
        assert_eq!(Kind::from_datatype("aws.iam.users"), None);
    }

    #[test]
    fn test_tags_are_sorted_and_last_wins() {
        let tags: Tags = serde_json::from_value(json!([
            {"Key": "env", "Value": "prod"},
            {"Key": "Name", "Value": "Web-1"},
            {"Key": "env", "Value": "stage"},
        ]))
        .unwrap();
        assert_eq!(tags.get("env"), Some("stage"));
        assert_eq!(tags.to_string(), "Name=Web-1,env=stage");
        assert_eq!(tags.labelled("i-1"), "web-1 (i-1)");
    }

    #[test]
    fn test_tags_null_is_empty() {
        let tags: Tags = serde_json::from_value(Value::Null).unwrap();
        assert!(tags.is_empty());
        assert_eq!(tags.labelled("vpc-1"), "? (vpc-1)");
    }

    #[test]
    fn test_arn_helpers() {
        let arn = "arn:aws:elasticloadbalancing:ap-southeast-2:1:listener/app/web/50dc/f2f7";
        assert_eq!(arn_field(arn, 2), "web");
        assert_eq!(arn_tail(arn), "f2f7");
        assert_eq!(arn_field("l1", 2), "l1");
        assert_eq!(arn_tail("l1"), "l1");
        assert_eq!(arn_path(arn, 2), "web/50dc/f2f7");
        assert_eq!(arn_path("l1", 2), "l1");
    }
}
