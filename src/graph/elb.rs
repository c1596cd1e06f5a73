//! Load balancer topology diagram
//!
//! One cluster per load balancer holding its listeners, the listeners'
//! fixed-response nodes and its target groups; one cluster per instance
//! holding a node per registered target port. Edges run listener to
//! destination, target group to target, and DNS record to whatever it
//! resolved to.

use super::{DotWriter, Render, RenderContext};
use crate::bind::DnsTarget;
use crate::model::elb::ActionTarget;
use crate::model::{
    Action, DnsRecord, Entity, Instance, Listener, LoadBalancer, Rule, Target, TargetGroup,
};

impl Render for LoadBalancer {
    fn render_node(&self, ctx: &RenderContext<'_, '_>, dot: &mut DotWriter) {
        let key = self.node_key();
        dot.open_cluster(&key, &self.display_name());
        if ctx.topology.has_dns_ref(&self.load_balancer_arn) {
            // handle for incoming DNS edges
            dot.node(&key, &[("label", "dns")]);
        }

        dot.blank();
        for listener in ctx.topology.listeners_of(&self.load_balancer_arn) {
            listener.render_node(ctx, dot);
        }
        dot.blank();
        for group in ctx.topology.target_groups_of(&self.load_balancer_arn) {
            group.render_node(ctx, dot);
        }
        dot.close();
    }

    fn render_edges(&self, _ctx: &RenderContext<'_, '_>, _dot: &mut DotWriter) {}
}

impl Listener {
    fn fixed_response_key(&self) -> String {
        format!("{}_fixed-response", self.node_key())
    }
}

impl Render for Listener {
    fn render_node(&self, ctx: &RenderContext<'_, '_>, dot: &mut DotWriter) {
        dot.node(&self.node_key(), &[("label", self.display_name().as_str())]);

        let mut rules = ctx.topology.rules_of(&self.listener_arn).peekable();
        if rules.peek().is_none() {
            if self
                .default_actions
                .iter()
                .any(|a| a.action_type == "fixed-response")
            {
                dot.node(&self.fixed_response_key(), &[("label", "fixed-response")]);
            }
            return;
        }
        for rule in rules {
            rule.render_node(ctx, dot);
        }
    }

    /// Rules take precedence; default actions are only drawn when no rule is
    /// bound to this listener
    fn render_edges(&self, ctx: &RenderContext<'_, '_>, dot: &mut DotWriter) {
        let mut bound = false;
        for rule in ctx.topology.rules_of(&self.listener_arn) {
            bound = true;
            rule.render_edges(ctx, dot);
        }
        if !bound {
            action_edges(
                ctx,
                dot,
                &self.node_key(),
                &self.default_actions,
                &self.fixed_response_key(),
            );
        }
    }
}

impl Render for Rule {
    fn render_node(&self, _ctx: &RenderContext<'_, '_>, dot: &mut DotWriter) {
        if self.has_fixed_response() {
            dot.node(&self.fixed_response_key(), &[("label", "fixed-response")]);
        }
    }

    /// Rule edges start at the owning listener's node
    fn render_edges(&self, ctx: &RenderContext<'_, '_>, dot: &mut DotWriter) {
        let Some(listener) = self
            .listener_arn
            .as_deref()
            .and_then(|arn| ctx.topology.inventory.listeners.get(arn))
        else {
            return;
        };
        action_edges(
            ctx,
            dot,
            &listener.node_key(),
            &self.actions,
            &self.fixed_response_key(),
        );
    }
}

fn action_edges(
    ctx: &RenderContext<'_, '_>,
    dot: &mut DotWriter,
    src: &str,
    actions: &[Action],
    fixed_response_key: &str,
) {
    for action in actions {
        for target in action.targets() {
            let dest = match target {
                ActionTarget::Forward(arn) => ctx
                    .topology
                    .inventory
                    .target_groups
                    .get(arn)
                    .map(|group| group.node_key())
                    .unwrap_or_else(|| arn.to_string()),
                ActionTarget::Redirect(url) => url,
                ActionTarget::FixedResponse => fixed_response_key.to_string(),
                ActionTarget::Unsupported(kind) => {
                    tracing::debug!("{}: no edge for action type {}", src, kind);
                    continue;
                }
            };
            dot.edge(src, &dest);
        }
    }
}

impl Render for TargetGroup {
    fn render_node(&self, _ctx: &RenderContext<'_, '_>, dot: &mut DotWriter) {
        dot.node(&self.node_key(), &[("label", self.display_name().as_str())]);
    }

    fn render_edges(&self, ctx: &RenderContext<'_, '_>, dot: &mut DotWriter) {
        let Some(health) = ctx.topology.health_of(&self.target_group_arn) else {
            return;
        };
        let key = self.node_key();
        for target in health.targets() {
            dot.edge(&key, &target.node_key());
        }
    }
}

impl Instance {
    /// Registered targets naming this instance, by ascending `<id>/<port>`
    fn registered_targets<'a>(&self, ctx: &RenderContext<'_, 'a>) -> Vec<&'a Target> {
        let mut targets: Vec<&Target> = ctx
            .topology
            .health_for_instance(&self.identity())
            .flat_map(|health| health.targets_for_instance(&self.instance_id))
            .collect();
        targets.sort_by_key(|t| t.key());
        targets.dedup_by_key(|t| t.key());
        targets
    }
}

impl Render for Instance {
    fn render_node(&self, ctx: &RenderContext<'_, '_>, dot: &mut DotWriter) {
        let targets = self.registered_targets(ctx);
        let dns_ref = ctx.topology.has_dns_ref(&self.identity());
        if targets.is_empty() && !dns_ref && !ctx.show_all_hosts {
            return;
        }

        let key = self.node_key();
        let mut label = self.display_name();
        if self.is_stopped() {
            label.push_str("\nSTOPPED");
        }
        dot.open_cluster(&key, &label);
        if self.is_stopped() {
            dot.statement("color=red");
        }
        if dns_ref {
            dot.node(&key, &[("label", "dns")]);
        }

        dot.blank();
        for target in &targets {
            dot.node(&target.node_key(), &[("label", target.label().as_str())]);
        }
        // an empty cluster is invisible
        if targets.is_empty() && !dns_ref {
            dot.node(&key, &[]);
        }
        dot.close();
    }

    fn render_edges(&self, _ctx: &RenderContext<'_, '_>, _dot: &mut DotWriter) {}
}

impl Render for DnsRecord {
    fn render_node(&self, _ctx: &RenderContext<'_, '_>, dot: &mut DotWriter) {
        if !self.is_drawn() {
            return;
        }
        dot.node(&self.node_key(), &[("shape", "cds"), ("label", self.name.as_str())]);
    }

    fn render_edges(&self, ctx: &RenderContext<'_, '_>, dot: &mut DotWriter) {
        if !self.is_drawn() {
            return;
        }
        let inventory = ctx.topology.inventory;
        let dest = match ctx.topology.dns_target(&self.name) {
            Some(DnsTarget::LoadBalancer(arn)) => {
                inventory.load_balancers.get(arn).map(|lb| lb.node_key())
            }
            Some(DnsTarget::Instance(key)) => inventory.instances.get(key).map(|i| i.node_key()),
            None => None,
        };
        if let Some(dest) = dest {
            dot.edge(&self.node_key(), &dest);
        }
    }
}

/// Render the load balancer diagram
pub fn render(ctx: &RenderContext<'_, '_>) -> String {
    let inventory = ctx.topology.inventory;
    let mut dot = DotWriter::digraph();
    dot.statement("rankdir=LR");
    dot.statement("node [ shape=\"rectangle\" ]");

    dot.blank();
    for lb in inventory.load_balancers.values() {
        lb.render_node(ctx, &mut dot);
    }
    for listener in ctx.topology.orphan_listeners() {
        listener.render_node(ctx, &mut dot);
    }
    for group in ctx.topology.orphan_target_groups() {
        group.render_node(ctx, &mut dot);
    }

    dot.blank();
    for instance in inventory.instances.values() {
        instance.render_node(ctx, &mut dot);
    }

    dot.blank();
    for listener in inventory.listeners.values() {
        listener.render_edges(ctx, &mut dot);
    }

    dot.blank();
    for group in inventory.target_groups.values() {
        group.render_edges(ctx, &mut dot);
    }

    dot.blank();
    for record in inventory.dns.values() {
        record.render_node(ctx, &mut dot);
        record.render_edges(ctx, &mut dot);
    }

    dot.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bind::bind;
    use crate::resource::{Loader, Metadata, Record};
    use serde_json::{json, Value};

    fn render_records(records: Vec<(&str, Value)>, show_all_hosts: bool) -> String {
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
        let topology = bind(&inventory);
        render(&RenderContext {
            topology: &topology,
            show_all_hosts,
        })
    }

    const LB: &str = "arn:aws:elasticloadbalancing:r:1:loadbalancer/app/web/50dc";
    const LISTENER: &str = "arn:aws:elasticloadbalancing:r:1:listener/app/web/50dc/f2f7";
    const TG: &str = "arn:aws:elasticloadbalancing:r:1:targetgroup/web-tg/73e2";

    fn topology_records() -> Vec<(&'static str, Value)> {
        vec![
            (
                "aws.elbv2.load_balancers",
                json!({"LoadBalancerArn": LB, "LoadBalancerName": "web"}),
            ),
            (
                "aws.elbv2.listeners",
                json!({"ListenerArn": LISTENER, "LoadBalancerArn": LB, "Port": 443,
                       "Protocol": "HTTPS",
                       "DefaultActions": [{"Type": "forward", "TargetGroupArn": TG}]}),
            ),
            (
                "aws.elbv2.target_groups",
                json!({"TargetGroupArn": TG, "TargetGroupName": "web-tg",
                       "LoadBalancerArns": [LB]}),
            ),
        ]
    }

    #[test]
    fn test_default_actions_used_without_rules() {
        let out = render_records(topology_records(), false);
        assert!(out.contains("subgraph \"cluster_LoadBalancer_web/50dc\" {"));
        assert!(out.contains("\"Listener_web/50dc/f2f7\" -> \"TargetGroup_web-tg/73e2\""));
    }

    #[test]
    fn test_rules_replace_default_actions() {
        let mut records = topology_records();
        records.push((
            "aws.elbv2.rules",
            json!({"RuleArn": format!("{}/r2", LISTENER.replace("listener/", "listener-rule/")),
                   "_listener_arn": LISTENER,
                   "Actions": [
                       {"Type": "fixed-response", "FixedResponseConfig": {"StatusCode": "404"}},
                       {"Type": "redirect", "RedirectConfig":
                           {"Protocol": "HTTPS", "Host": "b.example.com", "Port": "443"}}
                   ]}),
        ));
        let out = render_records(records, false);

        assert!(!out.contains("-> \"TargetGroup_web-tg/73e2\""));
        let fixed = "\"Listener_web/50dc/f2f7\" -> \"Rule_web/50dc/f2f7/r2_fixed-response\"";
        let redirect = "\"Listener_web/50dc/f2f7\" -> \"HTTPS://b.example.com:443\"";
        let fixed_at = out.find(fixed).unwrap();
        let redirect_at = out.find(redirect).unwrap();
        assert!(fixed_at < redirect_at);
        assert!(out.contains("\"Rule_web/50dc/f2f7/r2_fixed-response\" [ label=\"fixed-response\" ]"));
    }

    #[test]
    fn test_unresolved_forward_uses_raw_arn() {
        let records = vec![
            ("aws.elbv2.load_balancers", json!({"LoadBalancerArn": LB})),
            (
                "aws.elbv2.listeners",
                json!({"ListenerArn": LISTENER, "LoadBalancerArn": LB, "Port": 80,
                       "Protocol": "HTTP",
                       "DefaultActions": [{"Type": "forward", "TargetGroupArn": "tg-missing"}]}),
            ),
        ];
        let out = render_records(records, false);
        assert!(out.contains("\"Listener_web/50dc/f2f7\" -> \"tg-missing\""));
    }

    #[test]
    fn test_instance_clusters() {
        let mut records = topology_records();
        records.push((
            "aws.ec2.instances",
            json!({"InstanceId": "i-1", "State": {"Name": "stopped"},
                   "Tags": [{"Key": "Name", "Value": "web-1"}]}),
        ));
        records.push(("aws.ec2.instances", json!({"InstanceId": "i-2"})));
        records.push((
            "aws.elbv2.target_health",
            json!({"_arn": TG, "TargetHealthDescriptions": {
                "i-1/8080": {"Target": {"Id": "i-1", "Port": 8080}}
            }}),
        ));

        let out = render_records(records.clone(), false);
        assert!(out.contains("subgraph \"cluster_Instance_i-1\" {"));
        assert!(out.contains("label=\"web-1\\nSTOPPED\""));
        assert!(out.contains("color=red"));
        assert!(out.contains("\"TargetHealth_i-1/8080\" [ label=\"TCP/8080\" ]"));
        assert!(out.contains("\"TargetGroup_web-tg/73e2\" -> \"TargetHealth_i-1/8080\""));
        assert!(!out.contains("cluster_Instance_i-2"));

        let out = render_records(records, true);
        assert!(out.contains("subgraph \"cluster_Instance_i-2\" {"));
        assert!(out.contains("    \"Instance_i-2\"\n"));
    }

    #[test]
    fn test_orphan_listener_renders_at_top_level() {
        let records = vec![(
            "aws.elbv2.listeners",
            json!({"ListenerArn": LISTENER, "LoadBalancerArn": LB, "Port": 80, "Protocol": "HTTP"}),
        )];
        let out = render_records(records, false);
        assert!(out.contains("\n  \"Listener_web/50dc/f2f7\" [ label=\"HTTP:80\" ]\n"));
    }

    fn aliased_load_balancer() -> (&'static str, Value) {
        (
            "aws.elbv2.load_balancers",
            json!({"LoadBalancerArn": LB, "LoadBalancerName": "web",
                   "DNSName": "web-123.r.elb.amazonaws.com"}),
        )
    }

    #[test]
    fn test_alias_of_undrawn_type_has_no_edge() {
        let records = vec![
            aliased_load_balancer(),
            (
                "aws.route53.resource_record_sets",
                json!({"Name": "v6.example.com.", "Type": "AAAA",
                       "AliasTarget": {"DNSName": "dualstack.web-123.r.elb.amazonaws.com."}}),
            ),
        ];
        let out = render_records(records, false);
        assert!(!out.contains("DNS_v6.example.com"));
        assert!(!out.contains("-> \"LoadBalancer_web/50dc\""));
    }

    #[test]
    fn test_apex_alias_kept_next_to_mx() {
        let records = vec![
            aliased_load_balancer(),
            (
                "aws.route53.resource_record_sets",
                json!({"Name": "example.com.", "Type": "A",
                       "AliasTarget": {"DNSName": "dualstack.web-123.r.elb.amazonaws.com."}}),
            ),
            (
                "aws.route53.resource_record_sets",
                json!({"Name": "example.com.", "Type": "MX",
                       "ResourceRecords": [{"Value": "10 mail.example.com."}]}),
            ),
        ];
        let out = render_records(records, false);
        assert!(out.contains("\"DNS_example.com\" -> \"LoadBalancer_web/50dc\""));
    }

    #[test]
    fn test_same_named_load_balancers_keep_separate_clusters() {
        let east_lb = "arn:aws:elasticloadbalancing:us-east-1:1:loadbalancer/app/web/aaa";
        let west_lb = "arn:aws:elasticloadbalancing:eu-west-1:1:loadbalancer/app/web/bbb";
        let mut records = Vec::new();
        for (lb, listener) in [
            (east_lb, "arn:aws:elasticloadbalancing:us-east-1:1:listener/app/web/aaa/l1"),
            (west_lb, "arn:aws:elasticloadbalancing:eu-west-1:1:listener/app/web/bbb/l2"),
        ] {
            records.push((
                "aws.elbv2.load_balancers",
                json!({"LoadBalancerArn": lb, "LoadBalancerName": "web"}),
            ));
            records.push((
                "aws.elbv2.listeners",
                json!({"ListenerArn": listener, "LoadBalancerArn": lb, "Port": 443,
                       "Protocol": "HTTPS"}),
            ));
        }
        let out = render_records(records, false);

        for (cluster, listener) in [
            ("cluster_LoadBalancer_web/aaa", "\"Listener_web/aaa/l1\" [ label=\"HTTPS:443\" ]"),
            ("cluster_LoadBalancer_web/bbb", "\"Listener_web/bbb/l2\" [ label=\"HTTPS:443\" ]"),
        ] {
            assert_eq!(out.matches(cluster).count(), 1);
            let start = out.find(cluster).unwrap();
            let end = start + out[start..].find("\n  }\n").unwrap();
            let at = out.find(listener).unwrap();
            assert!(start < at && at < end, "{} outside {}", listener, cluster);
            // both clusters keep the shared display name as their label
            assert!(out[start..end].contains("label=\"web\""));
        }
    }
}
