//! Entity identity.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable unique identifier of a persisted catalog entity.
///
/// Opaque and immutable once assigned at creation. Fact records and outbox
/// ordering are keyed by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub Uuid);

impl EntityId {
    /// Create a new random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Parse an identifier from its hyphenated string form.
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for EntityId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Identity capability: anything persisted exposes a stable identifier.
pub trait Identifiable {
    /// The entity's identifier.
    fn id(&self) -> EntityId;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id_parse_display() {
        let id = EntityId::new();
        let parsed = EntityId::parse(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_entity_id_parse_invalid() {
        assert!(EntityId::parse("not-a-uuid").is_err());
    }

    #[test]
    fn test_entity_id_serializes_as_plain_string() {
        let id = EntityId::parse("6f1c2a7e-3b1d-4c55-9d7e-0a1b2c3d4e5f").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"6f1c2a7e-3b1d-4c55-9d7e-0a1b2c3d4e5f\"");
    }
}
