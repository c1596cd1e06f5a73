//! Security group report
//!
//! One section per group: its name, description and members, then a table of
//! its rules. Security group rules only ever allow, and are written relative
//! to the group itself (`$this`).

use super::protocol_name;
use super::sortkey::{ipaddr_sortable, port_sortable};
use super::table::{Row, Table};
use crate::bind::Topology;
use crate::model::{Entity, SecurityGroupRule};

/// Canonical column order; a group's table only shows the ones its rules use
pub const COLUMNS: &[&str] = &[
    "RuleNumber",
    "SrcAddr",
    "DstAddr",
    "Protocol",
    "SrcPort",
    "DstPort",
    "RuleAction",
    "Description",
    "Tags",
];

const BASE_COLUMNS: &[&str] = &[
    "SrcAddr",
    "DstAddr",
    "Protocol",
    "SrcPort",
    "DstPort",
    "RuleAction",
];

const THIS: &str = "$this";

fn rule_row(rule: &SecurityGroupRule) -> Row {
    let peer = rule.peer();
    let ports = rule.port_range();
    let (src_addr, dst_addr, src_port, dst_port) = if rule.is_egress {
        (THIS.to_string(), peer, ports, "*".to_string())
    } else {
        (peer, THIS.to_string(), "*".to_string(), ports)
    };

    let order = [
        port_sortable(&src_port),
        port_sortable(&dst_port),
        ipaddr_sortable(&src_addr),
        ipaddr_sortable(&dst_addr),
    ]
    .join(".");

    let mut row = Row::new(order)
        .set("SrcAddr", src_addr)
        .set("DstAddr", dst_addr)
        .set(
            "Protocol",
            protocol_name(rule.ip_protocol.as_deref().unwrap_or("-1")),
        )
        .set("SrcPort", src_port)
        .set("DstPort", dst_port)
        .set("RuleAction", "ALLOW");

    if let Some(description) = rule.description.as_deref().filter(|d| !d.is_empty()) {
        row = row.set("Description", description);
    }
    if !rule.tags.is_empty() {
        row = row.set("Tags", rule.tags.to_string());
    }
    row
}

/// `"name (id)"` with the lowercased group name, or `"? (id)"` when the group
/// record is missing
fn group_label(topology: &Topology<'_>, group_id: &str) -> String {
    match topology.inventory.security_groups.get(group_id) {
        Some(group) => group.labelled(),
        None => format!("? ({})", group_id),
    }
}

fn render_group(topology: &Topology<'_>, group_id: &str, label: &str) -> String {
    let mut out = String::new();
    out.push('\n');
    out.push_str(&format!("Group: {}\n", label));

    if let Some(description) = topology
        .inventory
        .security_groups
        .get(group_id)
        .and_then(|g| g.description.as_deref())
    {
        out.push_str(&format!("Description: {}\n", description));
    }

    let mut elbs: Vec<String> = topology
        .group_load_balancers(group_id)
        .map(|lb| lb.display_name())
        .collect();
    elbs.sort();
    for elb in elbs {
        out.push_str(&format!("ELB {}\n", elb));
    }

    let mut instances: Vec<String> = topology
        .group_instances(group_id)
        .map(|i| i.labelled())
        .collect();
    instances.sort();
    for instance in instances {
        out.push_str(&format!("Instance {}\n", instance));
    }

    let rows: Vec<Row> = topology.group_rules(group_id).map(rule_row).collect();
    let table = Table::from_present(COLUMNS, BASE_COLUMNS, rows);
    out.push_str(&table.render());
    out.push('\n');
    out
}

/// One section per group, ordered by group label
pub fn render(topology: &Topology<'_>) -> String {
    let mut groups: Vec<(String, &str)> = topology
        .security_group_ids()
        .into_iter()
        .map(|id| (group_label(topology, id), id))
        .collect();
    groups.sort();

    groups
        .iter()
        .map(|(label, id)| render_group(topology, id, label))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bind::bind;
    use crate::resource::{Loader, Metadata, Record};
    use serde_json::{json, Value};

    fn render_records(records: Vec<(&str, Value)>) -> String {
        let mut loader = Loader::new();
        for (datatype, specifics) in records {
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
        render(&bind(&inventory))
    }

    #[test]
    fn test_numeric_port_order() {
        let out = render_records(vec![
            (
                "aws.ec2.security_groups",
                json!({"GroupId": "sg-1", "GroupName": "Web", "Description": "web tier"}),
            ),
            (
                "aws.ec2.security_group_rules",
                json!({"SecurityGroupRuleId": "sgr-a", "GroupId": "sg-1", "IsEgress": false,
                       "IpProtocol": "tcp", "FromPort": 80, "ToPort": 80,
                       "CidrIpv4": "0.0.0.0/0"}),
            ),
            (
                "aws.ec2.security_group_rules",
                json!({"SecurityGroupRuleId": "sgr-b", "GroupId": "sg-1", "IsEgress": false,
                       "IpProtocol": "tcp", "FromPort": 9, "ToPort": 9,
                       "CidrIpv4": "0.0.0.0/0"}),
            ),
        ]);

        assert!(out.starts_with("\nGroup: web (sg-1)\nDescription: web tier\n"));
        let nine = out.find(" 9 ").unwrap();
        let eighty = out.find(" 80 ").unwrap();
        assert!(nine < eighty);
        // no rule has a description or tags
        assert!(!out.contains("Description "));
        assert!(!out.contains("Tags"));
    }

    #[test]
    fn test_members_and_egress() {
        let out = render_records(vec![
            ("aws.ec2.security_groups", json!({"GroupId": "sg-1", "GroupName": "app"})),
            (
                "aws.ec2.instances",
                json!({"InstanceId": "i-1", "Tags": [{"Key": "Name", "Value": "App-1"}],
                       "SecurityGroups": [{"GroupId": "sg-1"}]}),
            ),
            (
                "aws.elbv2.load_balancers",
                json!({"LoadBalancerArn": "lb1", "LoadBalancerName": "front",
                       "SecurityGroups": ["sg-1"]}),
            ),
            (
                "aws.ec2.security_group_rules",
                json!({"SecurityGroupRuleId": "sgr-1", "GroupId": "sg-1", "IsEgress": true,
                       "IpProtocol": "-1", "FromPort": -1, "ToPort": -1,
                       "CidrIpv4": "0.0.0.0/0", "Description": "all out",
                       "Tags": [{"Key": "owner", "Value": "ops"}]}),
            ),
        ]);

        assert!(out.contains("ELB front\n"));
        assert!(out.contains("Instance app-1 (i-1)\n"));
        assert!(out.contains("$this"));
        assert!(out.contains("all out"));
        assert!(out.contains("owner=ops"));
    }

    #[test]
    fn test_group_without_rules_has_base_header() {
        let out = render_records(vec![(
            "aws.ec2.security_groups",
            json!({"GroupId": "sg-1", "GroupName": "empty"}),
        )]);
        assert_eq!(
            out,
            "\nGroup: empty (sg-1)\nSrcAddr DstAddr Protocol SrcPort DstPort RuleAction \n\n"
        );
    }

    #[test]
    fn test_rule_for_unknown_group() {
        let out = render_records(vec![(
            "aws.ec2.security_group_rules",
            json!({"SecurityGroupRuleId": "sgr-1", "GroupId": "sg-9",
                   "IpProtocol": "tcp", "FromPort": 22, "ToPort": 22,
                   "ReferencedGroupInfo": {"GroupId": "sg-2"}}),
        )]);
        assert!(out.starts_with("\nGroup: ? (sg-9)\n"));
        assert!(out.contains("sg-2"));
    }
}
