//! Network ACL report

use super::protocol_name;
use super::table::{Row, Table};
use crate::bind::Topology;
use crate::model::{AclEntry, NetworkAcl};

pub const COLUMNS: &[&str] = &[
    "RuleNumber",
    "SrcAddr",
    "DstAddr",
    "Protocol",
    "SrcPort",
    "DstPort",
    "RuleAction",
];

/// Inbound entries sort before outbound ones with the same number
fn order(entry: &AclEntry) -> String {
    format!("{:010}.{}", entry.rule_number, u8::from(entry.egress))
}

fn entry_row(entry: &AclEntry) -> Row {
    let row = Row::new(order(entry))
        .set("RuleNumber", entry.rule_number)
        .set("Protocol", protocol_name(&entry.protocol))
        .set("RuleAction", entry.rule_action.as_str());

    if entry.egress {
        row.set("SrcAddr", "*")
            .set("DstAddr", entry.cidr())
            .set("SrcPort", entry.ports())
            .set("DstPort", "*")
    } else {
        row.set("SrcAddr", entry.cidr())
            .set("DstAddr", "*")
            .set("SrcPort", "*")
            .set("DstPort", entry.ports())
    }
}

fn heading(topology: &Topology<'_>, acl: &NetworkAcl) -> String {
    let name = acl.labelled();
    let Some(vpc_id) = acl.vpc_id.as_deref() else {
        return format!("Acl: {}", name);
    };
    let vpc = match topology.inventory.vpcs.get(vpc_id) {
        Some(vpc) => vpc.tags.labelled(vpc_id),
        None => format!("? ({})", vpc_id),
    };
    format!("Acl: {} (Vpc: {})", name, vpc)
}

/// One section per ACL, ordered by ACL name
pub fn render(topology: &Topology<'_>) -> String {
    let mut acls: Vec<&NetworkAcl> = topology.inventory.network_acls.values().collect();
    acls.sort_by_cached_key(|acl| acl.labelled());

    let mut out = String::new();
    for acl in acls {
        let mut table = Table::new(COLUMNS.to_vec());
        for entry in &acl.entries {
            table.push(entry_row(entry));
        }

        out.push('\n');
        out.push_str(&heading(topology, acl));
        out.push('\n');
        out.push_str(&table.render());
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bind::bind;
    use crate::resource::{Loader, Metadata, Record};
    use serde_json::json;

    #[test]
    fn test_acl_table() {
        let mut loader = Loader::new();
        for (datatype, specifics) in [
            (
                "aws.ec2.vpcs",
                json!({"VpcId": "vpc-1", "Tags": [{"Key": "Name", "Value": "Main"}]}),
            ),
            (
                "aws.ec2.network_acls",
                json!({"NetworkAclId": "acl-1", "VpcId": "vpc-1",
                       "Tags": [{"Key": "Name", "Value": "Edge"}],
                       "Entries": [
                    {"RuleNumber": 100, "Protocol": "6", "RuleAction": "allow",
                     "Egress": true, "CidrBlock": "0.0.0.0/0",
                     "PortRange": {"From": 1024, "To": 65535}},
                    {"RuleNumber": 100, "Protocol": "6", "RuleAction": "allow",
                     "Egress": false, "CidrBlock": "0.0.0.0/0",
                     "PortRange": {"From": 443, "To": 443}},
                    {"RuleNumber": 32767, "Protocol": "-1", "RuleAction": "deny",
                     "Egress": false, "CidrBlock": "0.0.0.0/0"}
                ]}),
            ),
        ] {
            loader
                .ingest(&Record {
                    datatype: datatype.to_string(),
                    metadata: Metadata {
                        profile: "p".to_string(),
                        region: "r".to_string(),
                        resourceid: "x".to_string(),
                    },
                    specifics,
                })
                .unwrap();
        }
        let (inventory, _) = loader.finish();
        let out = render(&bind(&inventory));

        let expected = concat!(
            "\n",
            "Acl: edge (acl-1) (Vpc: main (vpc-1))\n",
            "RuleNumber SrcAddr   DstAddr   Protocol SrcPort    DstPort RuleAction \n",
            "       100 0.0.0.0/0 *         tcp      *          443     allow      \n",
            "       100 *         0.0.0.0/0 tcp      1024-65535 *       allow      \n",
            "     32767 0.0.0.0/0 *         *        *          *       deny       \n",
            "\n",
        );
        assert_eq!(out, expected);
    }
}
