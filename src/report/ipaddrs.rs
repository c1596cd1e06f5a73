//! Address inventory report
//!
//! Every interface address (public and private as separate rows) and every
//! subnet range, in address order.

use super::sortkey::ipaddr_sortable;
use super::table::{Row, Table};
use crate::bind::Topology;
use crate::model::{NetworkInterface, Subnet};

pub const COLUMNS: &[&str] = &["IPv4", "Description", "SubnetId", "VpcId", "Tags"];

/// What an interface is: its instance when attached, its own description
/// otherwise
fn interface_description(topology: &Topology<'_>, iface: &NetworkInterface) -> String {
    if let Some(instance_id) = iface.attached_instance() {
        return match topology.inventory.instance_by_id(instance_id) {
            Some(instance) => instance.labelled(),
            None => format!("? ({})", instance_id),
        };
    }
    iface.description.clone().unwrap_or_default()
}

fn address_row(addr: &str, description: &str, iface: &NetworkInterface) -> Row {
    let mut row = Row::new(ipaddr_sortable(addr))
        .set("IPv4", addr)
        .set("Description", description)
        .set("SubnetId", iface.subnet_id.as_deref().unwrap_or_default())
        .set("VpcId", iface.vpc_id.as_deref().unwrap_or_default());
    if !iface.tags.is_empty() {
        row = row.set("Tags", iface.tags.to_string());
    }
    row
}

fn subnet_row(subnet: &Subnet) -> Row {
    let cidr = subnet.cidr_block.as_deref().unwrap_or_default();
    let mut row = Row::new(ipaddr_sortable(cidr))
        .set("IPv4", cidr)
        .set("SubnetId", subnet.subnet_id.as_str())
        .set("VpcId", subnet.vpc_id.as_deref().unwrap_or_default());
    if let Some(name) = subnet.tags.name() {
        row = row.set("Description", name);
    }
    if !subnet.tags.is_empty() {
        row = row.set("Tags", subnet.tags.to_string());
    }
    row
}

pub fn render(topology: &Topology<'_>) -> String {
    let inventory = topology.inventory;
    let mut table = Table::new(COLUMNS.to_vec());

    for iface in inventory.network_interfaces.values() {
        let description = interface_description(topology, iface);
        if let Some(public) = iface.public_ip() {
            table.push(address_row(public, &description, iface));
        }
        if let Some(private) = iface.private_ip_address.as_deref() {
            table.push(address_row(private, &description, iface));
        }
    }

    for subnet in inventory.subnets.values() {
        table.push(subnet_row(subnet));
    }

    tracing::debug!("{} address rows", table.len());
    let mut out = table.render();
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bind::bind;
    use crate::resource::{Loader, Metadata, Record};
    use serde_json::json;

    #[test]
    fn test_rows_in_address_order() {
        let mut loader = Loader::new();
        for (datatype, specifics) in [
            (
                "aws.ec2.instances",
                json!({"InstanceId": "i-1", "Tags": [{"Key": "Name", "Value": "Web"}]}),
            ),
            (
                "aws.ec2.network_interfaces",
                json!({"NetworkInterfaceId": "eni-1", "SubnetId": "subnet-1",
                       "VpcId": "vpc-1", "PrivateIpAddress": "10.0.1.20",
                       "Attachment": {"InstanceId": "i-1"},
                       "Association": {"PublicIp": "203.0.113.9"}}),
            ),
            (
                "aws.ec2.network_interfaces",
                json!({"NetworkInterfaceId": "eni-2", "SubnetId": "subnet-1",
                       "VpcId": "vpc-1", "PrivateIpAddress": "10.0.1.9",
                       "Description": "nat gateway"}),
            ),
            (
                "aws.ec2.subnets",
                json!({"SubnetId": "subnet-1", "VpcId": "vpc-1", "CidrBlock": "10.0.1.0/24",
                       "Tags": [{"Key": "Name", "Value": "Public-A"}]}),
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

        let addresses: Vec<&str> = out
            .lines()
            .skip(1)
            .filter_map(|line| line.split_whitespace().next())
            .collect();
        assert_eq!(
            addresses,
            vec!["10.0.1.0/24", "10.0.1.9", "10.0.1.20", "203.0.113.9"]
        );
        assert!(out.contains("web (i-1)"));
        assert!(out.contains("nat gateway"));
        assert!(out.contains("Name=Public-A"));
    }
}
