//! Network nesting diagram
//!
//! Undirected graph with a cluster per VPC, a nested cluster per subnet and a
//! record node `{public|private|name}` per instance.

use super::{DotWriter, RenderContext};
use crate::model::{Entity, Instance, Subnet};

/// Record labels treat these as structure
fn record_field(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '{' | '}' | '|' | '<' | '>') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn instance_node(instance: &Instance, dot: &mut DotWriter) {
    let name = instance.display_name().to_lowercase();
    let fields: [&str; 3] = [
        instance.public_ip().unwrap_or_default(),
        instance.private_ip_address.as_deref().unwrap_or_default(),
        &name,
    ];
    let fields = fields.map(record_field);
    let label = format!("{{{}}}", fields.join("|"));
    dot.node(&instance.node_key(), &[("label", label.as_str())]);
}

fn subnet_cluster(ctx: &RenderContext<'_, '_>, subnet: &Subnet, dot: &mut DotWriter) {
    let label = format!(
        "{}\n{}",
        subnet.display_name(),
        subnet.cidr_block.as_deref().unwrap_or("?")
    );
    dot.open_cluster(&subnet.node_key(), &label);
    for instance in ctx.topology.instances_in(&subnet.subnet_id) {
        instance_node(instance, dot);
    }
    dot.close();
}

/// Render the network diagram
pub fn render(ctx: &RenderContext<'_, '_>) -> String {
    let inventory = ctx.topology.inventory;
    let mut dot = DotWriter::graph();
    dot.statement("node [ shape=\"record\" ]");
    dot.statement("rankdir=TB");
    dot.statement("pack=true");

    for vpc in inventory.vpcs.values() {
        dot.blank();
        dot.open_cluster(&vpc.node_key(), &vpc.display_name());
        for subnet in ctx.topology.subnets_of(&vpc.vpc_id) {
            subnet_cluster(ctx, subnet, &mut dot);
        }
        dot.close();
    }

    let mut orphans = ctx.topology.orphan_subnets().peekable();
    if orphans.peek().is_some() {
        dot.blank();
    }
    for subnet in orphans {
        subnet_cluster(ctx, subnet, &mut dot);
    }

    dot.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bind::bind;
    use crate::resource::{Loader, Metadata, Record};
    use serde_json::json;

    fn record(datatype: &str, specifics: serde_json::Value) -> Record {
        Record {
            datatype: datatype.to_string(),
            metadata: Metadata {
                profile: "p".to_string(),
                region: "r".to_string(),
                resourceid: "x".to_string(),
            },
            specifics,
        }
    }

    #[test]
    fn test_vpc_subnet_instance_nesting() {
        let mut loader = Loader::new();
        for r in [
            record(
                "aws.ec2.vpcs",
                json!({"VpcId": "vpc-1", "Tags": [{"Key": "Name", "Value": "Main"}]}),
            ),
            record(
                "aws.ec2.subnets",
                json!({"SubnetId": "subnet-1", "VpcId": "vpc-1", "CidrBlock": "10.0.1.0/24",
                       "Tags": [{"Key": "Name", "Value": "Public-A"}]}),
            ),
            record(
                "aws.ec2.instances",
                json!({"InstanceId": "i-1", "SubnetId": "subnet-1",
                       "PrivateIpAddress": "10.0.1.5",
                       "Tags": [{"Key": "Name", "Value": "Bastion"}]}),
            ),
        ] {
            loader.ingest(&r).unwrap();
        }
        let (inventory, _) = loader.finish();
        let topology = bind(&inventory);
        let out = render(&RenderContext {
            topology: &topology,
            show_all_hosts: false,
        });

        let expected = "graph G {
  node [ shape=\"record\" ]
  rankdir=TB
  pack=true

  subgraph \"cluster_Vpc_vpc-1\" {
    label=\"main\"
    subgraph \"cluster_Subnet_subnet-1\" {
      label=\"public-a\\n10.0.1.0/24\"
      \"Instance_i-1\" [ label=\"{|10.0.1.5|bastion}\" ]
    }
  }
}
";
        assert_eq!(out, expected);
    }

    #[test]
    fn test_record_field_escape() {
        assert_eq!(record_field("a|b"), "a\\|b");
    }
}
