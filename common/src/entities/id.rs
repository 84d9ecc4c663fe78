use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::GmpError;

/// Opaque identifier the manager assigns to every resource.
///
/// gvmd hands out UUIDs, but nothing here relies on that; the only rules are
/// that the id is non-empty and contains no whitespace, so it can be embedded
/// in an attribute or a filter term unchanged.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(raw: impl Into<String>) -> Result<Self, GmpError> {
        let raw: String = raw.into();
        if raw.is_empty() {
            return Err(GmpError::protocol("empty entity id"));
        }
        if raw.chars().any(char::is_whitespace) {
            return Err(GmpError::protocol(format!("entity id '{raw}' contains whitespace")));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for EntityId {
    type Err = GmpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.trim())
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for EntityId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A reference to another resource as embedded in a parent entity,
/// e.g. the `<port_list id="…"><name>…</name></port_list>` of a target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityRef {
    pub id: EntityId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl EntityRef {
    pub fn new(id: EntityId) -> Self {
        Self { id, name: None }
    }
}
