//! Datatype Dispatch
//!
//! Maps a record's dotted datatype to the registry that ingests it.

use super::inventory::Loader;
use super::reader::Record;
use crate::error::{Error, Result, Warning};
use crate::model::{
    DecodeError, DnsRecord, Entity, Instance, Kind, LoadBalancer, Route53RecordSet, Rule,
    TargetGroup,
};
use serde_json::Value;

/// Ingest one record
pub fn ingest(loader: &mut Loader, record: &Record) -> Result<()> {
    let Some(kind) = Kind::from_datatype(&record.datatype) else {
        tracing::trace!("ignoring datatype {}", record.datatype);
        return Ok(());
    };

    let origin = record.origin();
    let specifics = &record.specifics;

    match kind {
        Kind::LoadBalancer => {
            if let Some(lb) = decode::<LoadBalancer>(loader, specifics, &origin) {
                loader.inventory.insert_load_balancer(lb);
            }
        }
        Kind::Listener => register(loader, specifics, &origin, |inv| &mut inv.listeners),
        Kind::Rule => {
            if let Some(rule) = decode::<Rule>(loader, specifics, &origin) {
                check_rule(loader, &rule)?;
                loader.inventory.rules.register(rule);
            }
        }
        Kind::TargetGroup => {
            if let Some(group) = decode::<TargetGroup>(loader, specifics, &origin) {
                check_target_group(&group)?;
                loader.inventory.target_groups.register(group);
            }
        }
        Kind::TargetHealth => register(loader, specifics, &origin, |inv| &mut inv.target_health),
        Kind::Instance => {
            if let Some(instance) = decode::<Instance>(loader, specifics, &origin) {
                loader.inventory.insert_instance(instance);
            }
        }
        Kind::Dns => {
            if let Some(set) = decode::<Route53RecordSet>(loader, specifics, &origin) {
                loader.inventory.insert_dns(DnsRecord::from(set));
            }
        }
        Kind::Subnet => register(loader, specifics, &origin, |inv| &mut inv.subnets),
        Kind::Vpc => register(loader, specifics, &origin, |inv| &mut inv.vpcs),
        Kind::SecurityGroup => register(loader, specifics, &origin, |inv| &mut inv.security_groups),
        Kind::SecurityGroupRule => {
            register(loader, specifics, &origin, |inv| &mut inv.security_group_rules)
        }
        Kind::NetworkAcl => register(loader, specifics, &origin, |inv| &mut inv.network_acls),
        Kind::NetworkInterface => {
            register(loader, specifics, &origin, |inv| &mut inv.network_interfaces)
        }
    }

    Ok(())
}

/// Decode a typed view, turning failures into warnings
pub(crate) fn decode<T: Entity>(loader: &mut Loader, specifics: &Value, origin: &str) -> Option<T> {
    match T::decode(specifics) {
        Ok(view) => Some(view),
        Err(DecodeError::MissingIdentity) => {
            loader.warn(Warning::MissingIdentityField {
                kind: T::KIND,
                field: T::IDENTITY_FIELD,
                origin: origin.to_string(),
            });
            None
        }
        Err(DecodeError::Malformed(reason)) => {
            loader.warn(Warning::MalformedRecord {
                origin: origin.to_string(),
                reason,
            });
            None
        }
    }
}

fn register<T, F>(loader: &mut Loader, specifics: &Value, origin: &str, registry: F)
where
    T: Entity,
    F: FnOnce(&mut super::Inventory) -> &mut super::Registry<T>,
{
    if let Some(view) = decode::<T>(loader, specifics, origin) {
        registry(&mut loader.inventory).register(view);
    }
}

/// The provider models a target group as attached to at most one load
/// balancer; anything else means the dump no longer fits this model.
fn check_target_group(group: &TargetGroup) -> Result<()> {
    if group.load_balancer_arns.len() > 1 {
        return Err(Error::invariant(
            Kind::TargetGroup,
            &group.target_group_arn,
            format!(
                "owned by {} load balancers: {}",
                group.load_balancer_arns.len(),
                group.load_balancer_arns.join(", ")
            ),
        ));
    }
    Ok(())
}

/// A rule ARN names its listener, so the same ARN turning up under a second
/// listener is a collision rather than an update.
fn check_rule(loader: &Loader, rule: &Rule) -> Result<()> {
    let Some(existing) = loader.inventory.rules.get(&rule.rule_arn) else {
        return Ok(());
    };
    match (&existing.listener_arn, &rule.listener_arn) {
        (Some(a), Some(b)) if a != b => Err(Error::invariant(
            Kind::Rule,
            &rule.rule_arn,
            format!("registered under listeners {} and {}", a, b),
        )),
        _ => Ok(()),
    }
}
