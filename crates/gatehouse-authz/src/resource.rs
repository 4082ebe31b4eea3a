//! Resource descriptors built from domain entities.

use crate::error::{AuthzError, AuthzResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identifier used for entities that do not exist yet (create checks).
pub const NEW_RESOURCE_ID: &str = "new";

/// Field holding an entity's identifier.
pub const ID_FIELD: &str = "id";

/// Anything that can be matched to a decision by resource identifier.
pub trait Identified {
    /// Resource identifier used for correlation.
    fn resource_id(&self) -> &str;
}

/// Authorization-facing view of an entity.
///
/// Attributes are the entity's serialized fields, copied verbatim. The PDP
/// evaluates policy against them, so nothing is filtered or renamed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    kind: String,
    id: String,
    #[serde(default)]
    attributes: Map<String, Value>,
}

impl ResourceDescriptor {
    /// Descriptor for an existing entity.
    pub fn for_entity<E: Serialize + ?Sized>(kind: &str, entity: &E) -> AuthzResult<Self> {
        let value = serde_json::to_value(entity).map_err(|e| AuthzError::InvalidEntity {
            kind: kind.to_string(),
            reason: e.to_string(),
        })?;

        let attributes = match value {
            Value::Object(map) => map,
            other => {
                return Err(AuthzError::InvalidEntity {
                    kind: kind.to_string(),
                    reason: format!("expected an object, got {}", json_type(&other)),
                })
            }
        };

        let id = attributes
            .get(ID_FIELD)
            .and_then(id_string)
            .ok_or_else(|| AuthzError::MissingIdentifier {
                kind: kind.to_string(),
            })?;

        Ok(Self {
            kind: kind.to_string(),
            id,
            attributes,
        })
    }

    /// Descriptor for an entity that is about to be created.
    pub fn for_new(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            id: NEW_RESOURCE_ID.to_string(),
            attributes: Map::new(),
        }
    }

    /// Resource kind, e.g. `contact`.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Resource identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Attribute bag.
    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    /// Whether this describes a not-yet-created entity.
    pub fn is_new(&self) -> bool {
        self.id == NEW_RESOURCE_ID && self.attributes.is_empty()
    }
}

impl Identified for ResourceDescriptor {
    fn resource_id(&self) -> &str {
        &self.id
    }
}

/// Build a descriptor for `entity`, or for a new entity when `None`.
pub fn to_resource<E: Serialize>(
    entity: Option<&E>,
    kind: &str,
) -> AuthzResult<ResourceDescriptor> {
    match entity {
        Some(entity) => ResourceDescriptor::for_entity(kind, entity),
        None => Ok(ResourceDescriptor::for_new(kind)),
    }
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
