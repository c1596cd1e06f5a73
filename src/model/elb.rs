//! Elastic load balancing views

use super::{arn_field, arn_path, arn_tail, lenient, Entity, Kind};
use serde::de::Deserializer;
use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LoadBalancer {
    pub load_balancer_arn: String,
    #[serde(default)]
    pub load_balancer_name: Option<String>,
    #[serde(rename = "DNSName", default)]
    pub dns_name: Option<String>,
    #[serde(default)]
    pub security_groups: Vec<String>,
    #[serde(default)]
    pub vpc_id: Option<String>,
}

impl LoadBalancer {
    /// Hostname other records use to reach this load balancer
    pub fn fqdn(&self) -> Option<&str> {
        self.dns_name.as_deref().filter(|s| !s.is_empty())
    }
}

impl Entity for LoadBalancer {
    const KIND: Kind = Kind::LoadBalancer;
    const IDENTITY_FIELD: &'static str = "LoadBalancerArn";

    fn identity(&self) -> String {
        self.load_balancer_arn.clone()
    }

    fn display_name(&self) -> String {
        match &self.load_balancer_name {
            Some(name) => name.clone(),
            // arn:...:loadbalancer/app/<name>/<id>
            None => arn_field(&self.load_balancer_arn, 2).to_string(),
        }
    }

    /// `<name>/<id>`: names repeat across regions and accounts
    fn node_key(&self) -> String {
        format!("LoadBalancer_{}", arn_path(&self.load_balancer_arn, 2))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RedirectConfig {
    #[serde(default, deserialize_with = "lenient::string")]
    pub protocol: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub host: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub port: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WeightedTargetGroup {
    pub target_group_arn: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ForwardConfig {
    #[serde(default)]
    pub target_groups: Vec<WeightedTargetGroup>,
}

/// One entry of a listener's `DefaultActions` or a rule's `Actions`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Action {
    #[serde(rename = "Type")]
    pub action_type: String,
    #[serde(default)]
    pub target_group_arn: Option<String>,
    #[serde(default)]
    pub forward_config: Option<ForwardConfig>,
    #[serde(default)]
    pub redirect_config: Option<RedirectConfig>,
}

/// Where an action sends traffic, before any registry lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionTarget<'a> {
    /// `forward`: target group ARN
    Forward(&'a str),
    /// `redirect`: `protocol://host:port`
    Redirect(String),
    FixedResponse,
    Unsupported(&'a str),
}

impl Action {
    /// Destinations in the order they appear in the action
    ///
    /// A forward action names its group either directly or through a
    /// weighted `ForwardConfig`; both shapes occur in dumps.
    pub fn targets(&self) -> Vec<ActionTarget<'_>> {
        match self.action_type.as_str() {
            "forward" => {
                if let Some(arn) = &self.target_group_arn {
                    return vec![ActionTarget::Forward(arn)];
                }
                self.forward_config
                    .iter()
                    .flat_map(|c| c.target_groups.iter())
                    .map(|g| ActionTarget::Forward(&g.target_group_arn))
                    .collect()
            }
            "redirect" => {
                let Some(redir) = &self.redirect_config else {
                    return vec![ActionTarget::Unsupported(&self.action_type)];
                };
                vec![ActionTarget::Redirect(format!(
                    "{}://{}:{}",
                    redir.protocol, redir.host, redir.port
                ))]
            }
            "fixed-response" => vec![ActionTarget::FixedResponse],
            other => vec![ActionTarget::Unsupported(other)],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Listener {
    pub listener_arn: String,
    #[serde(default)]
    pub load_balancer_arn: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub port: Option<String>,
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub default_actions: Vec<Action>,
}

impl Entity for Listener {
    const KIND: Kind = Kind::Listener;
    const IDENTITY_FIELD: &'static str = "ListenerArn";

    fn identity(&self) -> String {
        self.listener_arn.clone()
    }

    fn display_name(&self) -> String {
        format!(
            "{}:{}",
            self.protocol.as_deref().unwrap_or("?"),
            self.port.as_deref().unwrap_or("?")
        )
    }

    fn node_key(&self) -> String {
        // arn:...:listener/app/<lb name>/<lb id>/<listener id>
        format!("Listener_{}", arn_path(&self.listener_arn, 2))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Rule {
    pub rule_arn: String,
    /// Owning listener, stashed into the record by the collector. Older dumps
    /// do not have it.
    #[serde(rename = "_listener_arn", default)]
    pub listener_arn: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub priority: Option<String>,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub actions: Vec<Action>,
}

impl Rule {
    pub fn fixed_response_key(&self) -> String {
        format!("{}_fixed-response", self.node_key())
    }

    pub fn has_fixed_response(&self) -> bool {
        self.actions.iter().any(|a| a.action_type == "fixed-response")
    }
}

impl Entity for Rule {
    const KIND: Kind = Kind::Rule;
    const IDENTITY_FIELD: &'static str = "RuleArn";

    fn identity(&self) -> String {
        self.rule_arn.clone()
    }

    fn display_name(&self) -> String {
        match &self.priority {
            Some(p) => format!("rule {}", p),
            None => format!("rule {}", arn_tail(&self.rule_arn)),
        }
    }

    fn node_key(&self) -> String {
        // arn:...:listener-rule/app/<lb name>/<lb id>/<listener id>/<rule id>
        format!("Rule_{}", arn_path(&self.rule_arn, 2))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TargetGroup {
    pub target_group_arn: String,
    #[serde(default)]
    pub target_group_name: Option<String>,
    #[serde(default)]
    pub load_balancer_arns: Vec<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub port: Option<String>,
    #[serde(default)]
    pub protocol: Option<String>,
}

impl TargetGroup {
    /// The single owning load balancer, if any. Callers must have rejected
    /// groups with more than one owner at ingestion.
    pub fn owner_arn(&self) -> Option<&str> {
        self.load_balancer_arns.first().map(|s| s.as_str())
    }
}

impl Entity for TargetGroup {
    const KIND: Kind = Kind::TargetGroup;
    const IDENTITY_FIELD: &'static str = "TargetGroupArn";

    fn identity(&self) -> String {
        self.target_group_arn.clone()
    }

    fn display_name(&self) -> String {
        match &self.target_group_name {
            Some(name) => name.clone(),
            // arn:...:targetgroup/<name>/<id>
            None => arn_field(&self.target_group_arn, 1).to_string(),
        }
    }

    fn node_key(&self) -> String {
        // arn:...:targetgroup/<name>/<id>
        format!("TargetGroup_{}", arn_path(&self.target_group_arn, 1))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Target {
    #[serde(deserialize_with = "lenient::string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub port: Option<String>,
}

impl Target {
    /// Key of the target health description, `<id>/<port>`
    pub fn key(&self) -> String {
        format!("{}/{}", self.id, self.port.as_deref().unwrap_or("?"))
    }

    /// The target health API returns bare instance ids, so the instance
    /// registry key has to be rebuilt from them.
    pub fn instance_key(&self) -> String {
        super::ec2::Instance::synthetic_key(&self.id)
    }

    pub fn node_key(&self) -> String {
        format!("TargetHealth_{}", self.key())
    }

    pub fn label(&self) -> String {
        format!("TCP/{}", self.port.as_deref().unwrap_or("?"))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TargetDescription {
    pub target: Target,
}

/// Registered targets of one target group
#[derive(Debug, Clone, Deserialize)]
pub struct TargetHealth {
    #[serde(rename = "_arn")]
    pub group_arn: String,
    #[serde(
        rename = "TargetHealthDescriptions",
        default,
        deserialize_with = "descriptions"
    )]
    pub descriptions: BTreeMap<String, TargetDescription>,
}

impl TargetHealth {
    /// Targets in ascending `<id>/<port>` order
    pub fn targets(&self) -> impl Iterator<Item = &Target> {
        self.descriptions.values().map(|d| &d.target)
    }

    pub fn targets_for_instance<'s, 'i>(
        &'s self,
        instance_id: &'i str,
    ) -> impl Iterator<Item = &'s Target> + 'i
    where
        's: 'i,
    {
        self.targets().filter(move |t| t.id == instance_id)
    }
}

/// The collector writes descriptions as a map keyed `<id>/<port>`; a raw API
/// response has them as a list. Both are rekeyed by the target itself.
fn descriptions<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<BTreeMap<String, TargetDescription>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Shape {
        Map(BTreeMap<String, TargetDescription>),
        List(Vec<TargetDescription>),
    }

    let list = match Option::<Shape>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(Shape::Map(map)) => map.into_values().collect(),
        Some(Shape::List(list)) => list,
    };
    Ok(list.into_iter().map(|d| (d.target.key(), d)).collect())
}

impl Entity for TargetHealth {
    const KIND: Kind = Kind::TargetHealth;
    const IDENTITY_FIELD: &'static str = "_arn";

    fn identity(&self) -> String {
        self.group_arn.clone()
    }

    fn display_name(&self) -> String {
        arn_field(&self.group_arn, 1).to_string()
    }

    fn node_key(&self) -> String {
        format!("TargetHealth_{}", arn_path(&self.group_arn, 1))
    }
}
