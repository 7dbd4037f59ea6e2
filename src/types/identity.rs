//! Object identities: the `(resource type, resource id)` key of one ACL.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier of a domain resource.
///
/// Numeric ids order before textual ids; within a variant the natural order applies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceId {
    Number(i64),
    Text(String),
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

impl From<i64> for ResourceId {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for ResourceId {
    fn from(value: i32) -> Self {
        Self::Number(i64::from(value))
    }
}

impl From<u32> for ResourceId {
    fn from(value: u32) -> Self {
        Self::Number(i64::from(value))
    }
}

impl From<&str> for ResourceId {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ResourceId {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Identifies the single ACL governing one domain resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectIdentity {
    /// Logical domain type name, e.g. `Project`.
    pub resource_type: String,
    pub resource_id: ResourceId,
}

impl ObjectIdentity {
    pub fn new(resource_type: impl Into<String>, resource_id: impl Into<ResourceId>) -> Self {
        Self {
            resource_type: resource_type.into(),
            resource_id: resource_id.into(),
        }
    }
}

impl fmt::Display for ObjectIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.resource_type, self.resource_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_joins_type_and_id() {
        assert_eq!(ObjectIdentity::new("Project", 7).to_string(), "Project:7");
        assert_eq!(
            ObjectIdentity::new("Document", "spec-draft").to_string(),
            "Document:spec-draft"
        );
    }

    #[test]
    fn numeric_ids_sort_before_text() {
        let mut ids = vec![
            ResourceId::from("a"),
            ResourceId::from(10),
            ResourceId::from(2),
        ];
        ids.sort();
        assert_eq!(
            ids,
            vec![
                ResourceId::Number(2),
                ResourceId::Number(10),
                ResourceId::Text("a".into())
            ]
        );
    }
}
