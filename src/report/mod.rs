//! Tabular reports
//!
//! Alternate consumers of the bound topology: each report builds its own rows
//! from the registries and relations, then prints fixed-width tables.
//!
//! # Module Structure
//!
//! - [`acl`] - network ACL entries, one table per ACL
//! - [`security`] - security group rules with their members, one table per group
//! - [`ipaddrs`] - address inventory of interfaces and subnets
//! - [`table`] - fixed-width table rendering
//! - [`sortkey`] - string encodings that sort ports and addresses numerically

pub mod acl;
pub mod ipaddrs;
pub mod security;
pub mod sortkey;
pub mod table;

/// IANA protocol numbers seen in ACLs and security group rules
const PROTOCOLS: &[(u8, &str)] = &[
    (0, "ip"),
    (1, "icmp"),
    (2, "igmp"),
    (4, "ipencap"),
    (6, "tcp"),
    (8, "egp"),
    (17, "udp"),
    (41, "ipv6"),
    (47, "gre"),
    (50, "esp"),
    (51, "ah"),
    (58, "ipv6-icmp"),
    (89, "ospf"),
    (94, "ipip"),
    (103, "pim"),
    (112, "vrrp"),
    (132, "sctp"),
];

/// Name for a protocol field: `-1` is every protocol, numbers are looked up,
/// names pass through
pub fn protocol_name(protocol: &str) -> String {
    if protocol == "-1" {
        return "*".to_string();
    }
    let Ok(number) = protocol.parse::<u8>() else {
        return protocol.to_string();
    };
    PROTOCOLS
        .iter()
        .find(|(n, _)| *n == number)
        .map(|(_, name)| name.to_string())
        .unwrap_or_else(|| protocol.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_name() {
        assert_eq!(protocol_name("-1"), "*");
        assert_eq!(protocol_name("6"), "tcp");
        assert_eq!(protocol_name("58"), "ipv6-icmp");
        assert_eq!(protocol_name("udp"), "udp");
        assert_eq!(protocol_name("253"), "253");
    }
}
