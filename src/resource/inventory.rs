//! Inventory - every registry of one report run
//!
//! The load phase writes through a [`Loader`]; [`Loader::finish`] hands back an
//! immutable [`Inventory`]. There is no way to add to an inventory after that,
//! so the binder can never observe a partially loaded registry.

use super::dispatch;
use super::reader::{parse_documents, Record};
use super::registry::{Registry, SecondaryIndex};
use crate::error::{Error, Result, Warning};
use crate::model::{
    DnsRecord, Entity, Instance, Listener, LoadBalancer, NetworkAcl, NetworkInterface, Rule,
    SecurityGroup, SecurityGroupRule, Subnet, TargetGroup, TargetHealth, Vpc,
};
use std::path::Path;

#[derive(Debug, Clone)]
pub struct Inventory {
    pub load_balancers: Registry<LoadBalancer>,
    pub listeners: Registry<Listener>,
    pub rules: Registry<Rule>,
    pub target_groups: Registry<TargetGroup>,
    pub target_health: Registry<TargetHealth>,
    pub instances: Registry<Instance>,
    pub dns: Registry<DnsRecord>,
    pub subnets: Registry<Subnet>,
    pub vpcs: Registry<Vpc>,
    pub security_groups: Registry<SecurityGroup>,
    pub security_group_rules: Registry<SecurityGroupRule>,
    pub network_acls: Registry<NetworkAcl>,
    pub network_interfaces: Registry<NetworkInterface>,
    lb_by_fqdn: SecondaryIndex,
    instance_by_ip: SecondaryIndex,
}

impl Default for Inventory {
    fn default() -> Self {
        Self {
            load_balancers: Registry::new(),
            listeners: Registry::new(),
            rules: Registry::new(),
            target_groups: Registry::new(),
            target_health: Registry::new(),
            instances: Registry::new(),
            dns: Registry::new(),
            subnets: Registry::new(),
            vpcs: Registry::new(),
            security_groups: Registry::new(),
            security_group_rules: Registry::new(),
            network_acls: Registry::new(),
            network_interfaces: Registry::new(),
            lb_by_fqdn: SecondaryIndex::new("load balancer fqdn"),
            instance_by_ip: SecondaryIndex::new("instance public ip"),
        }
    }
}

impl Inventory {
    /// Hostnames compare case-insensitively and without a trailing dot
    pub fn load_balancer_by_fqdn(&self, fqdn: &str) -> Option<&LoadBalancer> {
        self.load_balancers.get(self.lb_by_fqdn.get(&fqdn_key(fqdn))?)
    }

    pub fn instance_by_public_ip(&self, addr: &str) -> Option<&Instance> {
        self.instances.get(self.instance_by_ip.get(addr)?)
    }

    /// Look an instance up by its bare provider id
    pub fn instance_by_id(&self, instance_id: &str) -> Option<&Instance> {
        self.instances.get(&Instance::synthetic_key(instance_id))
    }

    pub fn fqdn_index_len(&self) -> usize {
        self.lb_by_fqdn.len()
    }

    pub fn public_ip_index_len(&self) -> usize {
        self.instance_by_ip.len()
    }

    pub(crate) fn insert_load_balancer(&mut self, lb: LoadBalancer) {
        let key = lb.identity();
        if let Some(fqdn) = lb.fqdn() {
            self.lb_by_fqdn.insert(&fqdn_key(fqdn), &key);
        }
        if let Some(previous) = self.load_balancers.register(lb) {
            self.unindex_load_balancer(&previous, &key);
        }
    }

    pub(crate) fn insert_instance(&mut self, instance: Instance) {
        let key = instance.identity();
        if let Some(addr) = instance.public_ip() {
            self.instance_by_ip.insert(addr, &key);
        }
        if let Some(previous) = self.instances.register(instance) {
            self.unindex_instance(&previous, &key);
        }
    }

    /// One name often carries several record types. A record that is not
    /// drawn never replaces one that is; otherwise the last one wins.
    pub(crate) fn insert_dns(&mut self, record: DnsRecord) {
        if !record.is_drawn() {
            if let Some(existing) = self.dns.get(&record.name).filter(|r| r.is_drawn()) {
                tracing::trace!(
                    "keeping {} record {} over {}",
                    existing.record_type,
                    record.name,
                    record.record_type
                );
                return;
            }
        }
        self.dns.register(record);
    }

    /// Remove index entries only the replaced version had
    fn unindex_load_balancer(&mut self, previous: &LoadBalancer, key: &str) {
        let current = self
            .load_balancers
            .get(key)
            .and_then(|lb| lb.fqdn())
            .map(fqdn_key);
        if let Some(old) = previous.fqdn().map(fqdn_key) {
            if current.as_deref() != Some(old.as_str()) {
                self.lb_by_fqdn.remove(&old, key);
            }
        }
    }

    fn unindex_instance(&mut self, previous: &Instance, key: &str) {
        let current = self.instances.get(key).and_then(|i| i.public_ip());
        if let Some(old) = previous.public_ip() {
            if current != Some(old) {
                self.instance_by_ip.remove(old, key);
            }
        }
    }
}

fn fqdn_key(fqdn: &str) -> String {
    fqdn.trim_end_matches('.').to_ascii_lowercase()
}

/// Load phase: fills an [`Inventory`] and collects warnings
#[derive(Debug, Default)]
pub struct Loader {
    pub(crate) inventory: Inventory,
    warnings: Vec<Warning>,
    records: usize,
}

impl Loader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn(&mut self, warning: Warning) {
        self.warnings.push(warning);
    }

    /// Route one record to its registry. Only invariant violations are fatal.
    pub fn ingest(&mut self, record: &Record) -> Result<()> {
        self.records += 1;
        dispatch::ingest(self, record)
    }

    /// Drain a record stream into the registries
    pub fn ingest_all<I>(&mut self, records: I) -> Result<usize>
    where
        I: IntoIterator<Item = std::result::Result<Record, Warning>>,
    {
        let before = self.records;
        for record in records {
            match record {
                Ok(record) => self.ingest(&record)?,
                Err(warning) => self.warn(warning),
            }
        }
        Ok(self.records - before)
    }

    /// Load a supplemental DNS document: `{result: [{name, type, content}]}`
    ///
    /// These records carry no profile or region and bypass filtering.
    pub fn load_dns_source(&mut self, path: &Path) -> Result<usize> {
        let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut loaded = 0;
        for doc in parse_documents(path, &text) {
            let doc = doc.map_err(|w| Error::DnsSource {
                path: path.to_path_buf(),
                message: w.to_string(),
            })?;
            let Some(entries) = doc.get("result").and_then(|r| r.as_array())
            else {
                return Err(Error::DnsSource {
                    path: path.to_path_buf(),
                    message: "no result list".to_string(),
                });
            };

            for (index, entry) in entries.iter().enumerate() {
                let origin = format!("{}#result.{}", path.display(), index);
                if let Some(record) = dispatch::decode::<DnsRecord>(self, entry, &origin) {
                    self.inventory.insert_dns(record);
                    loaded += 1;
                }
            }
        }

        tracing::info!("loaded {} DNS records from {:?}", loaded, path);
        Ok(loaded)
    }

    /// End of the load phase
    pub fn finish(self) -> (Inventory, Vec<Warning>) {
        tracing::info!(
            "loaded {} records: {} load balancers, {} listeners, {} rules, {} target groups, {} instances, {} dns records",
            self.records,
            self.inventory.load_balancers.len(),
            self.inventory.listeners.len(),
            self.inventory.rules.len(),
            self.inventory.target_groups.len(),
            self.inventory.instances.len(),
            self.inventory.dns.len(),
        );
        (self.inventory, self.warnings)
    }
}
