//! Audit events and log entries.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::identity::ObjectIdentity;
use super::permission::Permission;
use super::sid::Sid;

/// Kind of mutation recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditOperation {
    Create,
    Ownership,
    Grant,
    Revoke,
    Inheritance,
    Delete,
}

impl AuditOperation {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Ownership => "OWNERSHIP",
            Self::Grant => "GRANT",
            Self::Revoke => "REVOKE",
            Self::Inheritance => "INHERITANCE",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for AuditOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Emitted by the engine after a mutation has been persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AclChangeEvent {
    pub operation: AuditOperation,
    pub identity: ObjectIdentity,
    pub sid: Option<Sid>,
    /// The permissions the caller asked for, not only the ones that changed.
    pub permissions: Vec<Permission>,
    pub actor: String,
}

/// One append-only row of the audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub actor: String,
    pub operation: AuditOperation,
    pub domain_type: String,
    pub object_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
}

impl AuditLogEntry {
    #[must_use]
    pub fn concerns(&self, identity: &ObjectIdentity) -> bool {
        self.domain_type == identity.resource_type
            && self.object_id == identity.resource_id.to_string()
    }
}
