//! DNS records
//!
//! Records come from two places: Route 53 record sets in the dump, and
//! supplemental documents (`--dns-source`) in the `{result: [{name, type,
//! content}]}` shape exported by external DNS providers. Both end up as a
//! [`DnsRecord`].

use super::{Entity, Kind};
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DnsRecord {
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: String,
    #[serde(default)]
    pub content: String,
    /// Route 53 alias: `content` is a hostname even for A records
    #[serde(skip)]
    pub alias: bool,
}

impl DnsRecord {
    /// Records resolved against the load balancer hostname index: CNAMEs and
    /// A aliases. Aliases of other types are loaded but never bound.
    pub fn targets_hostname(&self) -> bool {
        match self.record_type.as_str() {
            "CNAME" => true,
            "A" => self.alias,
            _ => false,
        }
    }

    /// Records resolved against the instance public address index
    pub fn targets_address(&self) -> bool {
        self.record_type == "A" && !self.alias
    }

    /// Only address and alias records are drawn; the rest stay loaded
    pub fn is_drawn(&self) -> bool {
        matches!(self.record_type.as_str(), "A" | "CNAME")
    }
}

impl Entity for DnsRecord {
    const KIND: Kind = Kind::Dns;
    const IDENTITY_FIELD: &'static str = "name";

    fn identity(&self) -> String {
        self.name.clone()
    }

    fn display_name(&self) -> String {
        self.name.clone()
    }

    fn node_key(&self) -> String {
        format!("DNS_{}", self.name)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResourceRecord {
    pub value: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AliasTarget {
    #[serde(rename = "DNSName")]
    pub dns_name: String,
}

/// One Route 53 record set as dumped by the collector
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Route53RecordSet {
    pub name: String,
    #[serde(rename = "Type")]
    pub record_type: String,
    #[serde(default)]
    pub resource_records: Vec<ResourceRecord>,
    #[serde(default)]
    pub alias_target: Option<AliasTarget>,
}

/// Route 53 writes names fully qualified with a trailing dot
fn unqualify(name: &str) -> String {
    name.trim_end_matches('.').to_lowercase()
}

impl From<Route53RecordSet> for DnsRecord {
    fn from(set: Route53RecordSet) -> Self {
        match set.alias_target {
            Some(alias) => {
                let target = unqualify(&alias.dns_name);
                // ELB aliases are published under a dualstack. prefix
                let target = target
                    .strip_prefix("dualstack.")
                    .map(|s| s.to_string())
                    .unwrap_or(target);
                DnsRecord {
                    name: unqualify(&set.name),
                    record_type: set.record_type,
                    content: target,
                    alias: true,
                }
            }
            None => DnsRecord {
                name: unqualify(&set.name),
                record_type: set.record_type,
                content: set
                    .resource_records
                    .first()
                    .map(|r| r.value.trim_end_matches('.').to_string())
                    .unwrap_or_default(),
                alias: false,
            },
        }
    }
}

impl Entity for Route53RecordSet {
    const KIND: Kind = Kind::Dns;
    const IDENTITY_FIELD: &'static str = "Name";

    fn identity(&self) -> String {
        unqualify(&self.name)
    }

    fn display_name(&self) -> String {
        unqualify(&self.name)
    }

    fn node_key(&self) -> String {
        format!("DNS_{}", unqualify(&self.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_route53_alias_becomes_hostname_record() {
        let set = Route53RecordSet::decode(&json!({
            "Name": "www.example.com.",
            "Type": "A",
            "AliasTarget": {
                "DNSName": "dualstack.web-123.ap-southeast-2.elb.amazonaws.com.",
                "HostedZoneId": "Z1",
                "EvaluateTargetHealth": false
            }
        }))
        .unwrap();
        let record = DnsRecord::from(set);
        assert_eq!(record.name, "www.example.com");
        assert_eq!(record.content, "web-123.ap-southeast-2.elb.amazonaws.com");
        assert!(record.targets_hostname());
        assert!(!record.targets_address());
        assert!(record.is_drawn());
    }

    #[test]
    fn test_route53_plain_record() {
        let set = Route53RecordSet::decode(&json!({
            "Name": "db.example.com.",
            "Type": "A",
            "TTL": 300,
            "ResourceRecords": [{"Value": "203.0.113.7"}]
        }))
        .unwrap();
        let record = DnsRecord::from(set);
        assert_eq!(record.content, "203.0.113.7");
        assert!(record.targets_address());
    }

    #[test]
    fn test_other_types_are_not_drawn() {
        let record = DnsRecord::decode(&json!({
            "name": "example.com", "type": "MX", "content": "mail.example.com"
        }))
        .unwrap();
        assert!(!record.is_drawn());
        assert!(!record.targets_hostname());
        assert!(!record.targets_address());
    }

    #[test]
    fn test_aaaa_alias_is_not_bound() {
        let set = Route53RecordSet::decode(&json!({
            "Name": "v6.example.com.",
            "Type": "AAAA",
            "AliasTarget": {"DNSName": "dualstack.web-123.elb.amazonaws.com."}
        }))
        .unwrap();
        let record = DnsRecord::from(set);
        assert!(record.alias);
        assert!(!record.targets_hostname());
        assert!(!record.targets_address());
        assert!(!record.is_drawn());
    }
}
