//! CIDR allow-list matching.
//!
//! # Responsibilities
//! - Parse `address/prefix` strings (IPv4 and IPv6)
//! - Decide whether a client address falls inside a range
//! - Evaluate an allow-list with OR semantics
//!
//! # Design Decisions
//! - Total over arbitrary strings: anything malformed simply never matches
//! - Address families never cross (IPv4 vs IPv6 is always a miss)
//! - Only the prefix bits are compared; host bits of the network part are ignored

use std::net::IpAddr;
use std::str::FromStr;

/// A parsed CIDR block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CidrRange {
    network: IpAddr,
    prefix_len: u8,
}

impl CidrRange {
    /// Network address as written in the configuration.
    pub fn network(&self) -> IpAddr {
        self.network
    }

    /// Number of leading bits that must match.
    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// Returns true if `address` lies inside this block.
    pub fn contains(&self, address: IpAddr) -> bool {
        match (address, self.network) {
            (IpAddr::V4(a), IpAddr::V4(n)) => prefix_eq(&a.octets(), &n.octets(), self.prefix_len),
            (IpAddr::V6(a), IpAddr::V6(n)) => prefix_eq(&a.octets(), &n.octets(), self.prefix_len),
            _ => false,
        }
    }
}

/// Error returned when a CIDR string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid CIDR range: {0:?}")]
pub struct InvalidCidr(pub String);

impl FromStr for CidrRange {
    type Err = InvalidCidr;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidCidr(s.to_string());
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(invalid());
        }

        let mut parts = trimmed.split('/');
        let (addr, prefix) = match (parts.next(), parts.next(), parts.next()) {
            (Some(addr), Some(prefix), None) => (addr, prefix),
            _ => return Err(invalid()),
        };

        let network: IpAddr = addr.parse().map_err(|_| invalid())?;
        // `u8` parsing rejects signs, whitespace and anything above 255.
        let prefix_len: u8 = prefix.parse().map_err(|_| invalid())?;
        let max = match network {
            IpAddr::V4(_) => 32,
            IpAddr::V6(_) => 128,
        };
        if prefix_len > max {
            return Err(invalid());
        }

        Ok(Self { network, prefix_len })
    }
}

fn prefix_eq(address: &[u8], network: &[u8], prefix_len: u8) -> bool {
    let full_bytes = usize::from(prefix_len / 8);
    let remaining_bits = prefix_len % 8;

    if address[..full_bytes] != network[..full_bytes] {
        return false;
    }
    if remaining_bits == 0 || full_bytes >= network.len() {
        return true;
    }

    let mask = 0xFFu8 << (8 - remaining_bits);
    (address[full_bytes] & mask) == (network[full_bytes] & mask)
}

/// Returns true if `address` is inside the range described by `cidr`.
///
/// Malformed input returns false rather than an error.
pub fn matches(address: IpAddr, cidr: &str) -> bool {
    cidr.parse::<CidrRange>()
        .map(|range| range.contains(address))
        .unwrap_or(false)
}

/// Returns true if any of `ranges` contains `address`.
pub fn is_allowed<I, S>(address: IpAddr, ranges: I) -> bool
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    ranges.into_iter().any(|cidr| matches(address, cidr.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn test_matches_examples() {
        assert!(matches(ip("192.168.1.5"), "192.168.1.0/24"));
        assert!(!matches(ip("192.168.2.5"), "192.168.1.0/24"));
        assert!(matches(ip("10.0.0.1"), "10.0.0.0/7"));
        assert!(matches(ip("11.255.0.1"), "10.0.0.0/7"));
        assert!(!matches(ip("12.0.0.1"), "10.0.0.0/7"));
    }

    #[test]
    fn test_zero_prefix_matches_every_ipv4() {
        for addr in [
            Ipv4Addr::new(0, 0, 0, 0),
            Ipv4Addr::new(127, 0, 0, 1),
            Ipv4Addr::new(203, 0, 113, 77),
            Ipv4Addr::new(255, 255, 255, 255),
        ] {
            assert!(matches(IpAddr::V4(addr), "0.0.0.0/0"), "{addr}");
        }
    }

    #[test]
    fn test_host_prefix_is_exact() {
        assert!(matches(ip("172.16.4.20"), "172.16.4.20/32"));
        assert!(!matches(ip("172.16.4.21"), "172.16.4.20/32"));
        assert!(matches(ip("2001:db8::1"), "2001:db8::1/128"));
        assert!(!matches(ip("2001:db8::2"), "2001:db8::1/128"));
    }

    #[test]
    fn test_cross_family_never_matches() {
        assert!(!matches(ip("::1"), "0.0.0.0/0"));
        assert!(!matches(ip("10.0.0.1"), "::/0"));
        assert!(!matches(IpAddr::V6(Ipv4Addr::new(10, 0, 0, 1).to_ipv6_mapped()), "10.0.0.0/8"));
    }

    #[test]
    fn test_ipv6_partial_byte() {
        assert!(matches(ip("fe80::1234"), "fe80::/10"));
        assert!(matches(ip("febf::1"), "fe80::/10"));
        assert!(!matches(ip("fec0::1"), "fe80::/10"));
        assert!(matches(IpAddr::V6(Ipv6Addr::LOCALHOST), "::/0"));
    }

    #[test]
    fn test_bits_beyond_prefix_are_ignored() {
        // Host bits set in the network part do not matter.
        assert!(matches(ip("192.168.1.200"), "192.168.1.77/24"));
    }

    #[test]
    fn test_malformed_input_is_a_miss() {
        let addr = ip("10.0.0.1");
        for bad in [
            "",
            "   ",
            "10.0.0.0",
            "10.0.0.0/",
            "10.0.0.0/8/8",
            "10.0.0.0/abc",
            "10.0.0.0/-1",
            "10.0.0.0/33",
            "10.0.0/8",
            "not-an-ip/8",
            "::/129",
        ] {
            assert!(!matches(addr, bad), "{bad:?} should not match");
            assert!(bad.parse::<CidrRange>().is_err(), "{bad:?} should not parse");
        }
    }

    #[test]
    fn test_is_allowed_is_logical_or() {
        let ranges = ["garbage", "10.0.0.0/8", "192.168.0.0/16"];
        assert!(is_allowed(ip("192.168.10.1"), ranges));
        assert!(is_allowed(ip("10.1.2.3"), ranges));
        assert!(!is_allowed(ip("172.16.0.1"), ranges));
        assert!(!is_allowed(ip("10.1.2.3"), Vec::<String>::new()));
    }

    #[test]
    fn test_parse_accessors() {
        let range: CidrRange = " 10.0.0.0/7 ".parse().unwrap();
        assert_eq!(range.network(), ip("10.0.0.0"));
        assert_eq!(range.prefix_len(), 7);
    }
}
