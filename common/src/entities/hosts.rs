//! # Host Specification
//!
//! Parses and canonicalizes the host list of a scan target.
//!
//! The manager accepts a comma-separated list whose entries can be:
//! * A single IPv4/IPv6 address (e.g., `10.0.0.5`).
//! * An IPv4 range, full or abbreviated (e.g., `10.0.0.1-10.0.0.20`, `10.0.0.1-20`).
//! * A CIDR block (e.g., `192.168.1.0/24`).
//! * A host name (e.g., `scanme.example.org`).
//!
//! Two specs that cover the same entries compare equal regardless of order,
//! spacing, duplicates or range abbreviation. Target reuse depends on that.

use std::collections::BTreeSet;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

use serde::Serialize;

use crate::error::GmpError;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HostEntry {
    Address(IpAddr),
    Range { start: Ipv4Addr, end: Ipv4Addr },
    Cidr { network: IpAddr, prefix: u8 },
    Name(String),
}

impl fmt::Display for HostEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostEntry::Address(addr) => write!(f, "{addr}"),
            HostEntry::Range { start, end } => write!(f, "{start}-{end}"),
            HostEntry::Cidr { network, prefix } => write!(f, "{network}/{prefix}"),
            HostEntry::Name(name) => f.write_str(name),
        }
    }
}

impl FromStr for HostEntry {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("empty host entry".into());
        }

        if let Ok(addr) = s.parse::<IpAddr>() {
            return Ok(HostEntry::Address(addr));
        }

        if let Some(entry) = parse_cidr(s)? {
            return Ok(entry);
        }

        if let Some(entry) = parse_ip_range(s)? {
            return Ok(entry);
        }

        if is_host_name(s) {
            return Ok(HostEntry::Name(s.to_ascii_lowercase()));
        }

        Err(format!("invalid host: {s}"))
    }
}

/// A canonical, de-duplicated, order-insensitive host list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostSpec {
    entries: BTreeSet<HostEntry>,
}

impl HostSpec {
    pub fn entries(&self) -> impl Iterator<Item = &HostEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in wire form, one string per entry.
    pub fn to_wire(&self) -> Vec<String> {
        self.entries.iter().map(ToString::to_string).collect()
    }
}

impl FromStr for HostSpec {
    type Err = GmpError;

    /// Parses a comma-separated host list (e.g., "10.0.0.5, 10.0.1.1-50, db.local").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut entries = BTreeSet::new();

        for part in s.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let entry = HostEntry::from_str(part)
                .map_err(|e| GmpError::protocol(format!("failed to parse host '{part}': {e}")))?;
            entries.insert(entry);
        }

        if entries.is_empty() {
            return Err(GmpError::protocol("host list is empty"));
        }

        Ok(Self { entries })
    }
}

impl fmt::Display for HostSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wire().join(", "))
    }
}

impl Serialize for HostSpec {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.to_wire())
    }
}

/// Parses a range string like "1.1.1.1-2.2.2.2" or "1.1.1.1-50".
fn parse_ip_range(s: &str) -> Result<Option<HostEntry>, String> {
    let Some((start_str, end_str)) = s.split_once('-') else {
        return Ok(None);
    };

    let Ok(start) = start_str.parse::<Ipv4Addr>() else {
        // Host names may contain dashes.
        return Ok(None);
    };

    let end = parse_range_end_addr(end_str, &start, s)?;
    if u32::from(end) < u32::from(start) {
        return Err(format!("range end {end} precedes start {start}"));
    }

    Ok(Some(HostEntry::Range { start, end }))
}

/// Handles abbreviated forms like "192.168.1.1-50" (implies 192.168.1.50)
/// and full forms like "192.168.1.1-192.168.1.255".
fn parse_range_end_addr(
    end_str: &str,
    start_addr: &Ipv4Addr,
    original_s: &str,
) -> Result<Ipv4Addr, String> {
    if let Ok(full_addr) = end_str.parse::<Ipv4Addr>() {
        return Ok(full_addr);
    }

    let mut end_octets = start_addr.octets();
    let partial_octets: Vec<u8> = end_str
        .split('.')
        .map(|octet_str| octet_str.parse::<u8>())
        .collect::<Result<Vec<u8>, _>>()
        .map_err(|e| format!("Invalid end range '{end_str}': {e}"))?;

    if partial_octets.is_empty() {
        return Err(format!("End range cannot be empty: {original_s}"));
    }
    if partial_octets.len() > 4 {
        return Err(format!("End range has too many octets: {end_str}"));
    }

    let start_index = 4 - partial_octets.len();
    end_octets[start_index..].copy_from_slice(&partial_octets);

    Ok(Ipv4Addr::from(end_octets))
}

/// Parses CIDR notation like "192.168.1.0/24" or "fd00::/64".
fn parse_cidr(s: &str) -> Result<Option<HostEntry>, String> {
    let Some((ip_str, prefix_str)) = s.split_once('/') else {
        return Ok(None);
    };

    let network = ip_str
        .parse::<IpAddr>()
        .map_err(|e| format!("Invalid IP in CIDR '{ip_str}': {e}"))?;

    let prefix = prefix_str
        .parse::<u8>()
        .map_err(|e| format!("Invalid prefix in CIDR '{prefix_str}': {e}"))?;

    let max_prefix = if network.is_ipv4() { 32 } else { 128 };
    if prefix > max_prefix {
        return Err(format!("Prefix /{prefix} too long for {network}"));
    }

    Ok(Some(HostEntry::Cidr { network, prefix }))
}

fn is_host_name(s: &str) -> bool {
    s.len() <= 253
        && s.split('.').all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && label
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        })
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
