//! Cross-reference handles
//!
//! A composer that creates a resource hands out [`Handle`]s to it; later
//! composers embed the handle, never the resource. Handles render as
//! CloudFormation intrinsics so the deployment engine orders creation.

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

/// Non-owning reference to a resource attribute
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Handle {
    /// `{"Ref": logical_id}`
    Ref(String),
    /// `{"Fn::GetAtt": [logical_id, attribute]}`
    GetAtt {
        logical_id: String,
        attribute: &'static str,
    },
    /// A value known at synthesis time, e.g. the ARN of a role created by
    /// the primary region's stack
    Literal(String),
}

impl Handle {
    pub fn get_att(logical_id: impl Into<String>, attribute: &'static str) -> Self {
        Handle::GetAtt {
            logical_id: logical_id.into(),
            attribute,
        }
    }

    /// Logical id this handle depends on, if it points into the same stack
    pub fn target(&self) -> Option<&str> {
        match self {
            Handle::Ref(id) | Handle::GetAtt { logical_id: id, .. } => Some(id),
            Handle::Literal(_) => None,
        }
    }
}

impl Serialize for Handle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Handle::Ref(id) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Ref", id)?;
                map.end()
            }
            Handle::GetAtt {
                logical_id,
                attribute,
            } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Fn::GetAtt", &[logical_id.as_str(), attribute])?;
                map.end()
            }
            Handle::Literal(value) => serializer.serialize_str(value),
        }
    }
}
