//! IP whitelist matching.
//!
//! Whitelist entries are single addresses or CIDR ranges; both IPv4 and
//! IPv6 are handled.

use std::net::IpAddr;

/// CIDR membership check.
pub fn ip_in_cidr(ip: &IpAddr, cidr: &str) -> bool {
    let Some((network, prefix_len)) = cidr.split_once('/') else {
        return false;
    };

    let Ok(prefix_len): Result<u8, _> = prefix_len.parse() else {
        return false;
    };

    let Ok(network_addr) = network.parse::<IpAddr>() else {
        return false;
    };

    match (ip, network_addr) {
        (IpAddr::V4(ip), IpAddr::V4(net)) => {
            if prefix_len > 32 {
                return false;
            }
            let mask = u32::MAX.checked_shl(32 - prefix_len as u32).unwrap_or(0);
            let ip_bits = u32::from_be_bytes(ip.octets());
            let net_bits = u32::from_be_bytes(net.octets());
            (ip_bits & mask) == (net_bits & mask)
        }
        (IpAddr::V6(ip), IpAddr::V6(net)) => {
            if prefix_len > 128 {
                return false;
            }
            let mask = u128::MAX.checked_shl(128 - prefix_len as u32).unwrap_or(0);
            let ip_bits = u128::from_be_bytes(ip.octets());
            let net_bits = u128::from_be_bytes(net.octets());
            (ip_bits & mask) == (net_bits & mask)
        }
        _ => false, // IPv4 vs IPv6 never match
    }
}

/// Whether an IP appears in a whitelist of addresses and CIDR ranges.
pub fn ip_in_whitelist(ip: &str, whitelist: &[String]) -> bool {
    let Ok(ip_addr) = ip.parse::<IpAddr>() else {
        return false;
    };

    for entry in whitelist {
        let entry = entry.trim();
        if entry.contains('/') {
            if ip_in_cidr(&ip_addr, entry) {
                return true;
            }
        } else if let Ok(entry_addr) = entry.parse::<IpAddr>()
            && ip_addr == entry_addr
        {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cidr_v4() {
        let ip: IpAddr = "192.168.1.100".parse().unwrap();
        assert!(ip_in_cidr(&ip, "192.168.1.0/24"));
        assert!(ip_in_cidr(&ip, "192.168.0.0/16"));
        assert!(!ip_in_cidr(&ip, "192.168.2.0/24"));
        assert!(!ip_in_cidr(&ip, "10.0.0.0/8"));
    }

    #[test]
    fn cidr_v6() {
        let ip: IpAddr = "2001:db8::1".parse().unwrap();
        assert!(ip_in_cidr(&ip, "2001:db8::/32"));
        assert!(!ip_in_cidr(&ip, "2001:db9::/32"));
    }

    #[test]
    fn whitelist_mixes_addresses_and_ranges() {
        let whitelist = vec![
            "127.0.0.1".to_string(),
            "10.0.0.0/8".to_string(),
            "::1".to_string(),
        ];
        assert!(ip_in_whitelist("127.0.0.1", &whitelist));
        assert!(ip_in_whitelist("10.20.30.40", &whitelist));
        assert!(ip_in_whitelist("::1", &whitelist));
        assert!(!ip_in_whitelist("8.8.8.8", &whitelist));
        assert!(!ip_in_whitelist("not-an-ip", &whitelist));
    }
}
