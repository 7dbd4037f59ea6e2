//! Read-only discovery responses.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::identity::{ObjectIdentity, ResourceId};

/// Permissions a caller holds on one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectivePermissions {
    pub identity: ObjectIdentity,
    /// Names from the resource's own granting entries.
    pub granted: BTreeSet<String>,
    /// Names from the immediate parent's granting entries (inheriting ACLs only).
    pub inherited: BTreeSet<String>,
    pub has_access: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ObjectIdentity>,
}

impl EffectivePermissions {
    pub(crate) fn none(identity: ObjectIdentity) -> Self {
        Self {
            identity,
            granted: BTreeSet::new(),
            inherited: BTreeSet::new(),
            has_access: false,
            parent: None,
        }
    }

    /// Union of direct and inherited names.
    #[must_use]
    pub fn all(&self) -> BTreeSet<String> {
        self.granted.union(&self.inherited).cloned().collect()
    }

    /// True if some permission is only reachable through the parent.
    #[must_use]
    pub fn has_inherited_only(&self) -> bool {
        self.inherited.iter().any(|name| !self.granted.contains(name))
    }
}

/// Where a caller's access to a resource comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessSource {
    Direct,
    Inherited,
}

impl fmt::Display for AccessSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct => f.write_str("Direct"),
            Self::Inherited => f.write_str("Inherited"),
        }
    }
}

/// A resource as known to the external catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    pub resource_id: ResourceId,
    pub name: String,
}

impl ResourceDescriptor {
    pub fn new(resource_id: impl Into<ResourceId>, name: impl Into<String>) -> Self {
        Self {
            resource_id: resource_id.into(),
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceAccess {
    pub resource_id: ResourceId,
    pub name: String,
    pub permissions: BTreeSet<String>,
    pub source: AccessSource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessibleResources {
    pub resource_type: String,
    pub resources: Vec<ResourceAccess>,
    pub total_count: usize,
}

/// Display-oriented description of a resource's parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentDescriptor {
    pub identity: ObjectIdentity,
    pub name: String,
    pub permissions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InheritanceInfo {
    pub identity: ObjectIdentity,
    pub name: String,
    pub direct: Vec<String>,
    pub inherited: Vec<String>,
    pub entries_inheriting: bool,
    pub has_parent: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ParentDescriptor>,
}
