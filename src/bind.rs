//! Bind phase
//!
//! Cross-references between independently dumped resources are resolved here,
//! after the [`Inventory`] is complete. Each pass walks the registry that owns
//! the reference and looks the target up by key. A miss leaves the reference
//! unresolved and records a [`Warning`]; nothing in this module fails.
//!
//! Relations are kept in a [`Bindings`] table of identity keys rather than
//! inside the entities, so the inventory stays immutable and the renderers
//! read both through one [`Topology`].

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{Relation, Warning};
use crate::model::{
    Entity, Instance, Listener, LoadBalancer, Rule, SecurityGroupRule, Subnet, TargetGroup,
    TargetHealth,
};
use crate::resource::{Inventory, Registry};

/// What a DNS record resolved to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DnsTarget {
    /// Load balancer ARN
    LoadBalancer(String),
    /// Instance registry key
    Instance(String),
}

type Children = BTreeMap<String, BTreeSet<String>>;

fn attach(map: &mut Children, parent: &str, child: &str) {
    map.entry(parent.to_string())
        .or_default()
        .insert(child.to_string());
}

/// Resolved relations, all by identity key
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    listeners_by_lb: Children,
    target_groups_by_lb: Children,
    rules_by_listener: Children,
    health_by_group: BTreeMap<String, String>,
    health_by_instance: Children,
    dns_targets: BTreeMap<String, DnsTarget>,
    dns_referenced: BTreeSet<String>,
    sg_instances: Children,
    sg_load_balancers: Children,
    sg_rules: Children,
    subnets_by_vpc: Children,
    instances_by_subnet: Children,
    orphan_listeners: BTreeSet<String>,
    orphan_target_groups: BTreeSet<String>,
    orphan_subnets: BTreeSet<String>,
}

/// The bound entity graph: an inventory plus the relations found in it
#[derive(Debug)]
pub struct Topology<'a> {
    pub inventory: &'a Inventory,
    bindings: Bindings,
    warnings: Vec<Warning>,
}

fn resolve<'r, 'k, T: Entity>(
    registry: &'r Registry<T>,
    keys: Option<&'k BTreeSet<String>>,
) -> impl Iterator<Item = &'r T> + 'k
where
    'r: 'k,
{
    keys.into_iter()
        .flatten()
        .filter_map(move |key| registry.get(key))
}

impl<'a> Topology<'a> {
    /// Listeners bound to a load balancer, by ascending ARN
    pub fn listeners_of(&self, lb_arn: &str) -> impl Iterator<Item = &'a Listener> + '_ {
        resolve(
            &self.inventory.listeners,
            self.bindings.listeners_by_lb.get(lb_arn),
        )
    }

    pub fn target_groups_of(&self, lb_arn: &str) -> impl Iterator<Item = &'a TargetGroup> + '_ {
        resolve(
            &self.inventory.target_groups,
            self.bindings.target_groups_by_lb.get(lb_arn),
        )
    }

    /// Rules bound to a listener, by ascending rule ARN
    pub fn rules_of(&self, listener_arn: &str) -> impl Iterator<Item = &'a Rule> + '_ {
        resolve(
            &self.inventory.rules,
            self.bindings.rules_by_listener.get(listener_arn),
        )
    }

    pub fn health_of(&self, group_arn: &str) -> Option<&'a TargetHealth> {
        let key = self.bindings.health_by_group.get(group_arn)?;
        self.inventory.target_health.get(key)
    }

    /// Target health records naming an instance, by ascending group ARN
    pub fn health_for_instance(
        &self,
        instance_key: &str,
    ) -> impl Iterator<Item = &'a TargetHealth> + '_ {
        resolve(
            &self.inventory.target_health,
            self.bindings.health_by_instance.get(instance_key),
        )
    }

    pub fn dns_target(&self, name: &str) -> Option<&DnsTarget> {
        self.bindings.dns_targets.get(name)
    }

    /// Whether some DNS record resolved to this load balancer ARN or instance key
    pub fn has_dns_ref(&self, key: &str) -> bool {
        self.bindings.dns_referenced.contains(key)
    }

    /// Loaded security groups plus groups that only appear as rule owners
    pub fn security_group_ids(&self) -> BTreeSet<&str> {
        self.inventory
            .security_groups
            .iter()
            .map(|(k, _)| k)
            .chain(self.bindings.sg_rules.keys().map(|k| k.as_str()))
            .collect()
    }

    pub fn group_rules(&self, group_id: &str) -> impl Iterator<Item = &'a SecurityGroupRule> + '_ {
        resolve(
            &self.inventory.security_group_rules,
            self.bindings.sg_rules.get(group_id),
        )
    }

    pub fn group_instances(&self, group_id: &str) -> impl Iterator<Item = &'a Instance> + '_ {
        resolve(
            &self.inventory.instances,
            self.bindings.sg_instances.get(group_id),
        )
    }

    pub fn group_load_balancers(
        &self,
        group_id: &str,
    ) -> impl Iterator<Item = &'a LoadBalancer> + '_ {
        resolve(
            &self.inventory.load_balancers,
            self.bindings.sg_load_balancers.get(group_id),
        )
    }

    pub fn subnets_of(&self, vpc_id: &str) -> impl Iterator<Item = &'a Subnet> + '_ {
        resolve(
            &self.inventory.subnets,
            self.bindings.subnets_by_vpc.get(vpc_id),
        )
    }

    pub fn instances_in(&self, subnet_id: &str) -> impl Iterator<Item = &'a Instance> + '_ {
        resolve(
            &self.inventory.instances,
            self.bindings.instances_by_subnet.get(subnet_id),
        )
    }

    /// Listeners whose load balancer is unknown
    pub fn orphan_listeners(&self) -> impl Iterator<Item = &'a Listener> + '_ {
        resolve(
            &self.inventory.listeners,
            Some(&self.bindings.orphan_listeners),
        )
    }

    /// Target groups with no known owner
    pub fn orphan_target_groups(&self) -> impl Iterator<Item = &'a TargetGroup> + '_ {
        resolve(
            &self.inventory.target_groups,
            Some(&self.bindings.orphan_target_groups),
        )
    }

    /// Subnets whose VPC is not loaded
    pub fn orphan_subnets(&self) -> impl Iterator<Item = &'a Subnet> + '_ {
        resolve(
            &self.inventory.subnets,
            Some(&self.bindings.orphan_subnets),
        )
    }

    /// Warnings raised while binding
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }
}

/// Runs the resolution passes over a complete inventory
pub struct Binder<'a> {
    inventory: &'a Inventory,
    bindings: Bindings,
    warnings: Vec<Warning>,
}

impl<'a> Binder<'a> {
    pub fn new(inventory: &'a Inventory) -> Self {
        Self {
            inventory,
            bindings: Bindings::default(),
            warnings: Vec::new(),
        }
    }

    fn unresolved(&mut self, from: &str, to: &str, relation: Relation) {
        self.warnings.push(Warning::unresolved(from, to, relation));
    }

    pub fn run(mut self) -> Topology<'a> {
        self.bind_listeners();
        self.bind_target_groups();
        self.bind_target_health();
        self.bind_rules();
        self.bind_dns();
        self.bind_security_groups();
        self.bind_network();

        tracing::info!("bind finished with {} unresolved references", self.warnings.len());
        Topology {
            inventory: self.inventory,
            bindings: self.bindings,
            warnings: self.warnings,
        }
    }

    fn bind_listeners(&mut self) {
        let inventory = self.inventory;
        for (arn, listener) in inventory.listeners.iter() {
            match listener.load_balancer_arn.as_deref() {
                Some(lb) if inventory.load_balancers.contains(lb) => {
                    attach(&mut self.bindings.listeners_by_lb, lb, arn);
                }
                other => {
                    self.bindings.orphan_listeners.insert(arn.to_string());
                    self.unresolved(arn, other.unwrap_or("(none)"), Relation::ListenerLoadBalancer);
                }
            }
        }
    }

    fn bind_target_groups(&mut self) {
        let inventory = self.inventory;
        for (arn, group) in inventory.target_groups.iter() {
            match group.owner_arn() {
                Some(lb) if inventory.load_balancers.contains(lb) => {
                    attach(&mut self.bindings.target_groups_by_lb, lb, arn);
                }
                Some(lb) => {
                    self.bindings.orphan_target_groups.insert(arn.to_string());
                    self.unresolved(arn, lb, Relation::TargetGroupLoadBalancer);
                }
                None => {
                    tracing::debug!("target group {} has no load balancer", arn);
                    self.bindings.orphan_target_groups.insert(arn.to_string());
                }
            }
        }
    }

    fn bind_target_health(&mut self) {
        let inventory = self.inventory;
        for (key, health) in inventory.target_health.iter() {
            if inventory.target_groups.contains(&health.group_arn) {
                self.bindings
                    .health_by_group
                    .insert(health.group_arn.clone(), key.to_string());
            } else {
                self.unresolved(key, &health.group_arn, Relation::TargetHealthTargetGroup);
            }

            for target in health.targets() {
                let instance_key = target.instance_key();
                if inventory.instances.contains(&instance_key) {
                    attach(&mut self.bindings.health_by_instance, &instance_key, key);
                } else {
                    self.unresolved(key, &instance_key, Relation::TargetHealthInstance);
                }
            }
        }
    }

    fn bind_rules(&mut self) {
        let inventory = self.inventory;
        for (arn, rule) in inventory.rules.iter() {
            match rule.listener_arn.as_deref() {
                Some(listener) if inventory.listeners.contains(listener) => {
                    attach(&mut self.bindings.rules_by_listener, listener, arn);
                }
                other => self.unresolved(arn, other.unwrap_or("(none)"), Relation::RuleListener),
            }
        }
    }

    fn bind_dns(&mut self) {
        let inventory = self.inventory;
        for (name, record) in inventory.dns.iter() {
            let target = if record.targets_hostname() {
                match inventory.load_balancer_by_fqdn(&record.content) {
                    Some(lb) => DnsTarget::LoadBalancer(lb.identity()),
                    None => {
                        self.unresolved(name, &record.content, Relation::DnsLoadBalancer);
                        continue;
                    }
                }
            } else if record.targets_address() {
                match inventory.instance_by_public_ip(&record.content) {
                    Some(instance) => DnsTarget::Instance(instance.identity()),
                    None => {
                        self.unresolved(name, &record.content, Relation::DnsInstance);
                        continue;
                    }
                }
            } else {
                continue;
            };

            let key = match &target {
                DnsTarget::LoadBalancer(key) | DnsTarget::Instance(key) => key.clone(),
            };
            self.bindings.dns_referenced.insert(key);
            self.bindings.dns_targets.insert(name.to_string(), target);
        }
    }

    /// Membership is only visible from the member side
    fn bind_security_groups(&mut self) {
        let inventory = self.inventory;

        for (key, instance) in inventory.instances.iter() {
            for group in &instance.security_groups {
                if !inventory.security_groups.contains(&group.group_id) {
                    self.unresolved(key, &group.group_id, Relation::InstanceSecurityGroup);
                }
                attach(&mut self.bindings.sg_instances, &group.group_id, key);
            }
        }

        for (arn, lb) in inventory.load_balancers.iter() {
            for group_id in &lb.security_groups {
                if !inventory.security_groups.contains(group_id) {
                    self.unresolved(arn, group_id, Relation::LoadBalancerSecurityGroup);
                }
                attach(&mut self.bindings.sg_load_balancers, group_id, arn);
            }
        }

        for (id, rule) in inventory.security_group_rules.iter() {
            let Some(group_id) = rule.group_id.as_deref() else {
                tracing::debug!("security group rule {} names no group", id);
                continue;
            };
            attach(&mut self.bindings.sg_rules, group_id, id);
        }
    }

    fn bind_network(&mut self) {
        let inventory = self.inventory;

        for (id, subnet) in inventory.subnets.iter() {
            match subnet.vpc_id.as_deref() {
                Some(vpc) if inventory.vpcs.contains(vpc) => {
                    attach(&mut self.bindings.subnets_by_vpc, vpc, id);
                }
                other => {
                    self.bindings.orphan_subnets.insert(id.to_string());
                    self.unresolved(id, other.unwrap_or("(none)"), Relation::SubnetVpc);
                }
            }
        }

        for (key, instance) in inventory.instances.iter() {
            // terminated instances have no subnet
            let Some(subnet) = instance.subnet_id.as_deref() else {
                continue;
            };
            if inventory.subnets.contains(subnet) {
                attach(&mut self.bindings.instances_by_subnet, subnet, key);
            } else {
                self.unresolved(key, subnet, Relation::InstanceSubnet);
            }
        }
    }
}

/// Run every bind pass over `inventory`
pub fn bind(inventory: &Inventory) -> Topology<'_> {
    Binder::new(inventory).run()
}
