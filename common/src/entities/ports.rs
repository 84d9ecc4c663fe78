use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use super::id::EntityId;
use crate::error::GmpError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PortProtocol {
    Tcp,
    Udp,
}

impl PortProtocol {
    fn prefix(self) -> &'static str {
        match self {
            PortProtocol::Tcp => "T",
            PortProtocol::Udp => "U",
        }
    }
}

/// One `first-last` span of a port range, bounds included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PortSpan {
    pub protocol: PortProtocol,
    pub first: u16,
    pub last: u16,
}

impl fmt::Display for PortSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.protocol.prefix(), self.first)?;
        if self.last != self.first {
            write!(f, "-{}", self.last)?;
        }
        Ok(())
    }
}

impl FromStr for PortSpan {
    type Err = String;

    /// `7`, `9-11`, `T:1-3` or `U:53`. Without a prefix the span is TCP.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (protocol, ports) = match s.split_once(':') {
            Some((prefix, ports)) => match prefix.trim() {
                "T" | "t" => (PortProtocol::Tcp, ports),
                "U" | "u" => (PortProtocol::Udp, ports),
                other => return Err(format!("unknown protocol prefix '{other}'")),
            },
            None => (PortProtocol::Tcp, s),
        };

        let port = |raw: &str| -> Result<u16, String> {
            match raw.trim().parse::<u16>() {
                Ok(0) | Err(_) => Err(format!("invalid port '{}'", raw.trim())),
                Ok(port) => Ok(port),
            }
        };
        let (first, last) = match ports.split_once('-') {
            Some((first, last)) => (port(first)?, port(last)?),
            None => {
                let single = port(ports)?;
                (single, single)
            }
        };
        if first > last {
            return Err(format!("port range {first}-{last} is reversed"));
        }

        Ok(Self {
            protocol,
            first,
            last,
        })
    }
}

/// An ad-hoc set of ports given in gvmd's `port_range` syntax, e.g.
/// `T:1-3,U:7`. Kept sorted and free of duplicate spans.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PortRange {
    spans: BTreeSet<PortSpan>,
}

impl PortRange {
    pub fn spans(&self) -> impl Iterator<Item = &PortSpan> {
        self.spans.iter()
    }
}

impl FromStr for PortRange {
    type Err = GmpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut spans = BTreeSet::new();
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let span = part
                .parse::<PortSpan>()
                .map_err(|e| GmpError::protocol(format!("failed to parse ports '{part}': {e}")))?;
            spans.insert(span);
        }

        if spans.is_empty() {
            return Err(GmpError::protocol("port range is empty"));
        }
        Ok(Self { spans })
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let spans: Vec<String> = self.spans.iter().map(ToString::to_string).collect();
        f.write_str(&spans.join(","))
    }
}

impl Serialize for PortRange {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// How a target picks the ports it scans.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PortSelection {
    /// A port list that already exists on the manager.
    List(EntityId),
    /// Ports given inline; the manager creates a port list for the target.
    Range(PortRange),
}

impl fmt::Display for PortSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortSelection::List(id) => write!(f, "{id}"),
            PortSelection::Range(range) => write!(f, "{range}"),
        }
    }
}
