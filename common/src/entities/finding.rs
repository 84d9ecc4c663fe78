//! # Finding Model
//!
//! A finding is one detected vulnerability on one host and port.
//!
//! Identity is the [`FindingKey`] `(host, port, vulnerability id)`. Severity,
//! threat level and description are attributes: two findings with the same
//! key are the same finding observed at different times.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::GmpError;

/// CVSS-style score, always within `0.0..=10.0`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct Severity(f64);

impl Severity {
    pub const MIN: f64 = 0.0;
    pub const MAX: f64 = 10.0;

    pub fn new(score: f64) -> Result<Self, GmpError> {
        if !(Self::MIN..=Self::MAX).contains(&score) {
            return Err(GmpError::protocol(format!(
                "severity {score} outside {}..={}",
                Self::MIN,
                Self::MAX
            )));
        }
        Ok(Self(score))
    }

    pub fn score(&self) -> f64 {
        self.0
    }
}

impl FromStr for Severity {
    type Err = GmpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let score = s
            .trim()
            .parse::<f64>()
            .map_err(|e| GmpError::protocol(format!("invalid severity '{s}': {e}")))?;
        Self::new(score)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreatLevel {
    Critical,
    High,
    Medium,
    Low,
    Log,
    Debug,
    Alarm,
    FalsePositive,
    Error,
}

impl FromStr for ThreatLevel {
    type Err = GmpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let level = match s.trim() {
            "Critical" => ThreatLevel::Critical,
            "High" => ThreatLevel::High,
            "Medium" => ThreatLevel::Medium,
            "Low" => ThreatLevel::Low,
            "Log" => ThreatLevel::Log,
            "Debug" => ThreatLevel::Debug,
            "Alarm" => ThreatLevel::Alarm,
            "False Positive" => ThreatLevel::FalsePositive,
            "Error" => ThreatLevel::Error,
            other => return Err(GmpError::protocol(format!("unknown threat level '{other}'"))),
        };
        Ok(level)
    }
}

impl fmt::Display for ThreatLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ThreatLevel::Critical => "Critical",
            ThreatLevel::High => "High",
            ThreatLevel::Medium => "Medium",
            ThreatLevel::Low => "Low",
            ThreatLevel::Log => "Log",
            ThreatLevel::Debug => "Debug",
            ThreatLevel::Alarm => "Alarm",
            ThreatLevel::FalsePositive => "False Positive",
            ThreatLevel::Error => "Error",
        };
        f.write_str(s)
    }
}

/// A result port as gvmd writes it: `443/tcp`, or `general/tcp` for
/// host-level results. `general` sorts before every numbered port.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Port {
    pub number: Option<u16>,
    pub protocol: String,
}

impl Port {
    pub fn tcp(number: u16) -> Self {
        Self {
            number: Some(number),
            protocol: "tcp".into(),
        }
    }

    pub fn general(protocol: &str) -> Self {
        Self {
            number: None,
            protocol: protocol.to_ascii_lowercase(),
        }
    }
}

impl FromStr for Port {
    type Err = GmpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (number_str, protocol) = s
            .split_once('/')
            .ok_or_else(|| GmpError::protocol(format!("port '{s}' lacks a protocol")))?;

        if protocol.is_empty() || !protocol.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(GmpError::protocol(format!("port '{s}' has an invalid protocol")));
        }

        let number = match number_str {
            "general" => None,
            n => Some(
                n.parse::<u16>()
                    .map_err(|e| GmpError::protocol(format!("invalid port number in '{s}': {e}")))?,
            ),
        };

        Ok(Self {
            number,
            protocol: protocol.to_ascii_lowercase(),
        })
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.number {
            Some(n) => write!(f, "{n}/{}", self.protocol),
            None => write!(f, "general/{}", self.protocol),
        }
    }
}

impl Serialize for Port {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct FindingKey {
    pub host: String,
    pub port: Port,
    pub vulnerability_id: String,
}

impl fmt::Display for FindingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.host, self.port, self.vulnerability_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Finding {
    pub host: String,
    pub port: Port,
    /// NVT OID (or CVE id for CVE scanner results).
    pub vulnerability_id: String,
    pub name: String,
    pub severity: Severity,
    pub threat: ThreatLevel,
    pub description: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cves: Vec<String>,
}

impl Finding {
    pub fn key(&self) -> FindingKey {
        FindingKey {
            host: self.host.clone(),
            port: self.port.clone(),
            vulnerability_id: self.vulnerability_id.clone(),
        }
    }
}
