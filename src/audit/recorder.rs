use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use super::AclChangeListener;
use super::log::AuditLogStore;
use crate::constants::{AUDIT_READER_AUTHORITY, UNKNOWN_PERMISSION_NAME};
use crate::registry::PermissionRegistry;
use crate::types::{AclChangeEvent, AuditLogEntry, ObjectIdentity, Sid, SidSet};
use crate::{AclError, Result};

/// Writes one [`AuditLogEntry`] per change event.
#[derive(Debug, Clone)]
pub struct AuditRecorder {
    registry: Arc<PermissionRegistry>,
    log: Arc<dyn AuditLogStore>,
}

impl AuditRecorder {
    pub fn new(registry: Arc<PermissionRegistry>, log: Arc<dyn AuditLogStore>) -> Self {
        Self { registry, log }
    }

    /// Build the row for `event` without writing it.
    #[must_use]
    pub fn entry_for(&self, event: &AclChangeEvent) -> AuditLogEntry {
        let permissions = event
            .permissions
            .iter()
            .map(|permission| {
                self.registry
                    .resolve_name(permission)
                    .unwrap_or(UNKNOWN_PERMISSION_NAME)
                    .to_string()
            })
            .collect();
        AuditLogEntry {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            actor: event.actor.clone(),
            operation: event.operation,
            domain_type: event.identity.resource_type.clone(),
            object_id: event.identity.resource_id.to_string(),
            sid: event.sid.as_ref().map(|sid| sid.value().to_string()),
            permissions,
        }
    }

    #[must_use]
    pub fn trail(&self) -> AuditTrail {
        AuditTrail::new(Arc::clone(&self.log))
    }
}

impl AclChangeListener for AuditRecorder {
    fn on_change(&self, event: &AclChangeEvent) -> Result<()> {
        let entry = self.entry_for(event);
        tracing::debug!(
            audit.operation = %entry.operation,
            audit.domain_type = %entry.domain_type,
            audit.object_id = %entry.object_id,
            audit.actor = %entry.actor,
            "recording acl change"
        );
        self.log.append(&entry)
    }
}

/// Read side of the audit log. Only holders of `ROLE_ADMIN` may read it.
#[derive(Debug, Clone)]
pub struct AuditTrail {
    log: Arc<dyn AuditLogStore>,
}

impl AuditTrail {
    pub fn new(log: Arc<dyn AuditLogStore>) -> Self {
        Self { log }
    }

    /// Every row, oldest first.
    pub fn find_all(&self, caller: &SidSet) -> Result<Vec<AuditLogEntry>> {
        Self::require_reader(caller)?;
        self.log.entries()
    }

    /// Every row without an authority check, for embedding code.
    pub fn entries(&self) -> Result<Vec<AuditLogEntry>> {
        self.log.entries()
    }

    /// Rows about one object identity, oldest first.
    pub fn entries_for(&self, identity: &ObjectIdentity) -> Result<Vec<AuditLogEntry>> {
        Ok(self
            .log
            .entries()?
            .into_iter()
            .filter(|entry| entry.concerns(identity))
            .collect())
    }

    fn require_reader(caller: &SidSet) -> Result<()> {
        if caller.contains(&Sid::Authority(AUDIT_READER_AUTHORITY.to_string())) {
            Ok(())
        } else {
            Err(AclError::AccessDenied {
                reason: format!("reading the audit trail requires {AUDIT_READER_AUTHORITY}"),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::InMemoryAuditLogStore;
    use crate::sid::SidResolver;
    use crate::types::{AuditOperation, Permission};

    fn recorder() -> AuditRecorder {
        AuditRecorder::new(
            Arc::new(PermissionRegistry::standard()),
            Arc::new(InMemoryAuditLogStore::new()),
        )
    }

    #[test]
    fn entry_names_permissions_and_sid() {
        let recorder = recorder();
        let event = AclChangeEvent {
            operation: AuditOperation::Grant,
            identity: ObjectIdentity::new("Project", 42),
            sid: Some(SidResolver::group("ENGINEERING")),
            permissions: vec![Permission::READ, Permission::new(1 << 12, 'Z')],
            actor: "alice".into(),
        };
        let entry = recorder.entry_for(&event);
        assert_eq!(entry.domain_type, "Project");
        assert_eq!(entry.object_id, "42");
        assert_eq!(entry.sid.as_deref(), Some("GROUP_ENGINEERING"));
        assert_eq!(entry.permissions, vec!["READ", "UNKNOWN"]);
    }

    #[test]
    fn trail_requires_admin_role() {
        let recorder = recorder();
        let event = AclChangeEvent {
            operation: AuditOperation::Create,
            identity: ObjectIdentity::new("Project", 1),
            sid: None,
            permissions: Vec::new(),
            actor: "system".into(),
        };
        recorder.on_change(&event).expect("record");

        let trail = recorder.trail();
        let user = SidResolver::sids_for_caller("bob", ["ROLE_USER"]);
        assert!(matches!(
            trail.find_all(&user),
            Err(AclError::AccessDenied { .. })
        ));
        let admin = SidResolver::sids_for_caller("root", ["ROLE_ADMIN"]);
        assert_eq!(trail.find_all(&admin).expect("admin reads").len(), 1);
        assert!(
            trail
                .entries_for(&ObjectIdentity::new("Project", 2))
                .expect("filtered")
                .is_empty()
        );
    }
}
