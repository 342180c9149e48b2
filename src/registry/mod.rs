// Static list of tracked servers

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

/// Which status handshake a server speaks
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    /// Java Edition
    #[serde(rename = "PC")]
    Java,
    /// Bedrock Edition
    #[serde(rename = "PE")]
    Bedrock,
}

impl EntityKind {
    /// Port used when an entity does not configure one
    pub fn default_port(self) -> u16 {
        match self {
            EntityKind::Java => 25565,
            EntityKind::Bedrock => 19132,
        }
    }
}

/// Host plus optional port, as configured
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerAddress {
    #[serde(rename = "ip")]
    pub host: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

impl ServerAddress {
    pub fn port_or_default(&self, kind: EntityKind) -> u16 {
        self.port.unwrap_or_else(|| kind.default_port())
    }
}

impl fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.port {
            Some(port) => write!(f, "{}:{}", self.host, port),
            None => write!(f, "{}", self.host),
        }
    }
}

/// A tracked game server. Immutable once the registry is built.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Unique, stable identifier (e.g., "server-1")
    pub id: String,

    /// Display name
    pub name: String,

    #[serde(flatten)]
    pub address: ServerAddress,

    #[serde(rename = "type")]
    pub kind: EntityKind,

    /// Dashboard color (e.g., "#4CAF50")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("entity id must not be empty")]
    EmptyId,
    #[error("duplicate entity id: {0}")]
    DuplicateId(String),
}

/// Read-only registry of entities, kept in configuration order
#[derive(Debug)]
pub struct EntityRegistry {
    entities: Vec<Entity>,
}

impl EntityRegistry {
    pub fn new(entities: Vec<Entity>) -> Result<Self, RegistryError> {
        let mut seen = HashSet::with_capacity(entities.len());
        for entity in &entities {
            if entity.id.is_empty() {
                return Err(RegistryError::EmptyId);
            }
            if !seen.insert(entity.id.as_str()) {
                return Err(RegistryError::DuplicateId(entity.id.clone()));
            }
        }

        Ok(Self { entities })
    }

    /// All entities, in stable registry order
    pub fn list(&self) -> &[Entity] {
        &self.entities
    }

    pub fn get(&self, id: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id == id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn java(id: &str, host: &str) -> Entity {
        Entity {
            id: id.to_string(),
            name: id.to_uppercase(),
            address: ServerAddress {
                host: host.to_string(),
                port: None,
            },
            kind: EntityKind::Java,
            color: None,
        }
    }

    #[test]
    fn test_list_keeps_configuration_order() {
        let registry = EntityRegistry::new(vec![
            java("b", "b.example"),
            java("a", "a.example"),
            java("c", "c.example"),
        ])
        .unwrap();

        let ids: Vec<&str> = registry.list().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_get_known_and_unknown() {
        let registry = EntityRegistry::new(vec![java("a", "a.example")]).unwrap();

        assert_eq!(registry.get("a").unwrap().address.host, "a.example");
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let result = EntityRegistry::new(vec![java("a", "one"), java("a", "two")]);
        assert_eq!(result.unwrap_err(), RegistryError::DuplicateId("a".to_string()));
    }

    #[test]
    fn test_empty_id_rejected() {
        let result = EntityRegistry::new(vec![java("", "one")]);
        assert_eq!(result.unwrap_err(), RegistryError::EmptyId);
    }

    #[test]
    fn test_default_ports() {
        let mut entity = java("a", "a.example");
        assert_eq!(entity.address.port_or_default(entity.kind), 25565);

        entity.kind = EntityKind::Bedrock;
        assert_eq!(entity.address.port_or_default(entity.kind), 19132);

        entity.address.port = Some(25570);
        assert_eq!(entity.address.port_or_default(entity.kind), 25570);
        assert_eq!(entity.address.to_string(), "a.example:25570");
    }

    #[test]
    fn test_entity_wire_format() {
        let mut entity = java("server-1", "mc.hypixel.net");
        entity.color = Some("#4CAF50".to_string());

        let value = serde_json::to_value(&entity).unwrap();
        assert_eq!(
            value,
            json!({
                "id": "server-1",
                "name": "SERVER-1",
                "ip": "mc.hypixel.net",
                "type": "PC",
                "color": "#4CAF50"
            })
        );

        let parsed: Entity = serde_json::from_value(json!({
            "id": "x",
            "name": "X",
            "ip": "x.example",
            "port": 19133,
            "type": "PE"
        }))
        .unwrap();
        assert_eq!(parsed.kind, EntityKind::Bedrock);
        assert_eq!(parsed.address.port, Some(19133));
        assert!(parsed.color.is_none());
    }
}
