//! Sortable encodings for ports and addresses
//!
//! Table rows sort by plain string comparison, so numeric fields are encoded
//! into fixed-width strings first.

use std::net::Ipv4Addr;

/// IPv6 and anything unparsable sort first
pub const UNSORTABLE_ADDR: &str = "00000000";

/// Zero-padded port number. A range sorts by its first port; `*` and other
/// non-numeric values sort as port 0.
pub fn port_sortable(port: &str) -> String {
    let digits: String = port.chars().take_while(|c| c.is_ascii_digit()).collect();
    let port: u64 = digits.parse().unwrap_or(0);
    format!("{:06}", port)
}

/// IPv4 address as 8 hex digits, with the prefix length appended as a port
/// key when present
pub fn ipaddr_sortable(addr: &str) -> String {
    let (host, prefix) = match addr.split_once('/') {
        Some((host, prefix)) => (host, Some(prefix)),
        None => (addr, None),
    };

    let mut key = match host.parse::<Ipv4Addr>() {
        Ok(ip) => ip.octets().iter().map(|o| format!("{:02x}", o)).collect(),
        Err(_) => UNSORTABLE_ADDR.to_string(),
    };

    if let Some(prefix) = prefix {
        key.push('/');
        key.push_str(&port_sortable(prefix));
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_sortable() {
        assert_eq!(port_sortable("9"), "000009");
        assert_eq!(port_sortable("80"), "000080");
        assert_eq!(port_sortable("1024-65535"), "001024");
        assert_eq!(port_sortable("*"), "000000");
        assert!(port_sortable("9") < port_sortable("80"));
    }

    #[test]
    fn test_ipaddr_sortable() {
        assert_eq!(ipaddr_sortable("10.0.0.1"), "0a000001");
        assert_eq!(ipaddr_sortable("10.0.0.0/8"), "0a000000/000008");
        assert_eq!(ipaddr_sortable("::/0"), "00000000/000000");
        assert_eq!(ipaddr_sortable("$this"), UNSORTABLE_ADDR);
        assert!(ipaddr_sortable("9.0.0.0") < ipaddr_sortable("10.0.0.0"));
    }
}
