//! Compute and networking views

use super::{lenient, Entity, Kind, Tags};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InstanceState {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GroupIdentifier {
    pub group_id: String,
    #[serde(default)]
    pub group_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Instance {
    pub instance_id: String,
    #[serde(default)]
    pub tags: Tags,
    #[serde(default)]
    pub state: Option<InstanceState>,
    #[serde(default)]
    pub public_ip_address: Option<String>,
    #[serde(default)]
    pub private_ip_address: Option<String>,
    #[serde(default)]
    pub subnet_id: Option<String>,
    #[serde(default)]
    pub vpc_id: Option<String>,
    #[serde(default)]
    pub security_groups: Vec<GroupIdentifier>,
}

impl Instance {
    const KEY_PREFIX: &'static str = "instance/";

    /// Registry key for an instance id. The provider has no instance ARN in
    /// the places that refer to instances, so every reference rebuilds this.
    pub fn synthetic_key(instance_id: &str) -> String {
        format!("{}{}", Self::KEY_PREFIX, instance_id)
    }

    pub fn is_stopped(&self) -> bool {
        self.state.as_ref().is_some_and(|s| s.name == "stopped")
    }

    pub fn public_ip(&self) -> Option<&str> {
        self.public_ip_address.as_deref().filter(|s| !s.is_empty())
    }

    /// `"name (id)"` for tables
    pub fn labelled(&self) -> String {
        self.tags.labelled(&self.instance_id)
    }
}

impl Entity for Instance {
    const KIND: Kind = Kind::Instance;
    const IDENTITY_FIELD: &'static str = "InstanceId";

    fn identity(&self) -> String {
        Self::synthetic_key(&self.instance_id)
    }

    fn display_name(&self) -> String {
        self.tags
            .name()
            .map(|s| s.to_string())
            .unwrap_or_else(|| self.instance_id.clone())
    }

    fn node_key(&self) -> String {
        format!("Instance_{}", self.instance_id)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Subnet {
    pub subnet_id: String,
    #[serde(default)]
    pub vpc_id: Option<String>,
    #[serde(default)]
    pub cidr_block: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub available_ip_address_count: Option<String>,
    #[serde(default)]
    pub tags: Tags,
}

impl Entity for Subnet {
    const KIND: Kind = Kind::Subnet;
    const IDENTITY_FIELD: &'static str = "SubnetId";

    fn identity(&self) -> String {
        self.subnet_id.clone()
    }

    fn display_name(&self) -> String {
        self.tags
            .name()
            .map(|s| s.to_lowercase())
            .unwrap_or_else(|| self.subnet_id.clone())
    }

    fn node_key(&self) -> String {
        format!("Subnet_{}", self.subnet_id)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Vpc {
    pub vpc_id: String,
    #[serde(default)]
    pub cidr_block: Option<String>,
    #[serde(default)]
    pub tags: Tags,
}

impl Entity for Vpc {
    const KIND: Kind = Kind::Vpc;
    const IDENTITY_FIELD: &'static str = "VpcId";

    fn identity(&self) -> String {
        self.vpc_id.clone()
    }

    fn display_name(&self) -> String {
        self.tags
            .name()
            .map(|s| s.to_lowercase())
            .unwrap_or_else(|| self.vpc_id.clone())
    }

    fn node_key(&self) -> String {
        format!("Vpc_{}", self.vpc_id)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SecurityGroup {
    pub group_id: String,
    #[serde(default)]
    pub group_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub vpc_id: Option<String>,
}

impl SecurityGroup {
    pub fn labelled(&self) -> String {
        let name = self
            .group_name
            .as_deref()
            .map(|s| s.to_lowercase())
            .unwrap_or_else(|| "?".to_string());
        format!("{} ({})", name, self.group_id)
    }
}

impl Entity for SecurityGroup {
    const KIND: Kind = Kind::SecurityGroup;
    const IDENTITY_FIELD: &'static str = "GroupId";

    fn identity(&self) -> String {
        self.group_id.clone()
    }

    fn display_name(&self) -> String {
        self.group_name
            .clone()
            .unwrap_or_else(|| self.group_id.clone())
    }

    fn node_key(&self) -> String {
        format!("SecurityGroup_{}", self.group_id)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReferencedGroup {
    pub group_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SecurityGroupRule {
    pub security_group_rule_id: String,
    #[serde(default)]
    pub group_id: Option<String>,
    #[serde(default)]
    pub is_egress: bool,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub ip_protocol: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub from_port: Option<i64>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub to_port: Option<i64>,
    #[serde(default)]
    pub cidr_ipv4: Option<String>,
    #[serde(default)]
    pub cidr_ipv6: Option<String>,
    #[serde(default)]
    pub prefix_list_id: Option<String>,
    #[serde(default)]
    pub referenced_group_info: Option<ReferencedGroup>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Tags,
}

impl SecurityGroupRule {
    /// The remote end of the rule: a CIDR, a peer group or a prefix list
    pub fn peer(&self) -> String {
        self.cidr_ipv4
            .clone()
            .or_else(|| self.cidr_ipv6.clone())
            .or_else(|| self.referenced_group_info.as_ref().map(|g| g.group_id.clone()))
            .or_else(|| self.prefix_list_id.clone())
            .unwrap_or_else(|| "?".to_string())
    }

    /// `"80"`, `"1024-65535"`, or `"*"` for all ports
    pub fn port_range(&self) -> String {
        match (self.from_port, self.to_port) {
            (None, None) | (Some(-1), _) | (_, Some(-1)) => "*".to_string(),
            (Some(from), Some(to)) if from == to => from.to_string(),
            (Some(from), Some(to)) => format!("{}-{}", from, to),
            (Some(port), None) | (None, Some(port)) => port.to_string(),
        }
    }
}

impl Entity for SecurityGroupRule {
    const KIND: Kind = Kind::SecurityGroupRule;
    const IDENTITY_FIELD: &'static str = "SecurityGroupRuleId";

    fn identity(&self) -> String {
        self.security_group_rule_id.clone()
    }

    fn display_name(&self) -> String {
        self.security_group_rule_id.clone()
    }

    fn node_key(&self) -> String {
        format!("SecurityGroupRule_{}", self.security_group_rule_id)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PortRange {
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub from: Option<i64>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub to: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AclEntry {
    pub rule_number: i64,
    #[serde(default, deserialize_with = "lenient::string")]
    pub protocol: String,
    #[serde(default)]
    pub rule_action: String,
    #[serde(default)]
    pub egress: bool,
    #[serde(default)]
    pub cidr_block: Option<String>,
    #[serde(default)]
    pub ipv6_cidr_block: Option<String>,
    #[serde(default)]
    pub port_range: Option<PortRange>,
}

impl AclEntry {
    pub fn cidr(&self) -> &str {
        self.cidr_block
            .as_deref()
            .or(self.ipv6_cidr_block.as_deref())
            .unwrap_or("*")
    }

    pub fn ports(&self) -> String {
        let Some(range) = &self.port_range else {
            return "*".to_string();
        };
        match (range.from, range.to) {
            (Some(from), Some(to)) if from == to => from.to_string(),
            (Some(from), Some(to)) => format!("{}-{}", from, to),
            _ => "*".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NetworkAcl {
    pub network_acl_id: String,
    #[serde(default)]
    pub vpc_id: Option<String>,
    #[serde(default)]
    pub tags: Tags,
    #[serde(default)]
    pub entries: Vec<AclEntry>,
}

impl NetworkAcl {
    pub fn labelled(&self) -> String {
        self.tags.labelled(&self.network_acl_id)
    }
}

impl Entity for NetworkAcl {
    const KIND: Kind = Kind::NetworkAcl;
    const IDENTITY_FIELD: &'static str = "NetworkAclId";

    fn identity(&self) -> String {
        self.network_acl_id.clone()
    }

    fn display_name(&self) -> String {
        self.tags
            .name()
            .map(|s| s.to_lowercase())
            .unwrap_or_else(|| self.network_acl_id.clone())
    }

    fn node_key(&self) -> String {
        format!("NetworkAcl_{}", self.network_acl_id)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Attachment {
    #[serde(default)]
    pub instance_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Association {
    #[serde(default)]
    pub public_ip: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NetworkInterface {
    pub network_interface_id: String,
    #[serde(default)]
    pub attachment: Option<Attachment>,
    #[serde(default)]
    pub association: Option<Association>,
    #[serde(default)]
    pub tags: Tags,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub subnet_id: Option<String>,
    #[serde(default)]
    pub vpc_id: Option<String>,
    #[serde(default)]
    pub private_ip_address: Option<String>,
}

impl NetworkInterface {
    pub fn attached_instance(&self) -> Option<&str> {
        self.attachment.as_ref()?.instance_id.as_deref()
    }

    pub fn public_ip(&self) -> Option<&str> {
        self.association.as_ref()?.public_ip.as_deref()
    }
}

impl Entity for NetworkInterface {
    const KIND: Kind = Kind::NetworkInterface;
    const IDENTITY_FIELD: &'static str = "NetworkInterfaceId";

    fn identity(&self) -> String {
        self.network_interface_id.clone()
    }

    fn display_name(&self) -> String {
        self.network_interface_id.clone()
    }

    fn node_key(&self) -> String {
        format!("NetworkInterface_{}", self.network_interface_id)
    }
}
