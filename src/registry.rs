//! Bidirectional mapping between permission names and masks.
//!
//! The registry is the sole authority on which masks are valid. It is populated once at
//! start-up and shared immutably afterwards, so lookups take `&self` and need no locking.

use std::collections::{BTreeMap, HashMap};

use crate::types::Permission;
use crate::{AclError, Result};

#[derive(Debug, Clone, Default)]
pub struct PermissionRegistry {
    by_mask: BTreeMap<u32, (String, Permission)>,
    by_name: HashMap<String, Permission>,
    owner_defaults: Vec<Permission>,
}

impl PermissionRegistry {
    /// An empty registry with no owner defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The base permissions plus SHARE and APPROVE, with the standard owner defaults.
    #[must_use]
    pub fn standard() -> Self {
        let mut registry = Self::new();
        for (name, permission) in [
            ("READ", Permission::READ),
            ("WRITE", Permission::WRITE),
            ("CREATE", Permission::CREATE),
            ("DELETE", Permission::DELETE),
            ("ADMINISTRATION", Permission::ADMINISTRATION),
            ("SHARE", Permission::SHARE),
            ("APPROVE", Permission::APPROVE),
        ] {
            registry.insert(name.to_string(), permission);
        }
        registry.owner_defaults = vec![
            Permission::ADMINISTRATION,
            Permission::READ,
            Permission::WRITE,
            Permission::DELETE,
            Permission::SHARE,
        ];
        registry
    }

    /// Register `permission` under `name` (stored upper-cased).
    pub fn register(&mut self, name: &str, permission: Permission) -> Result<()> {
        if !permission.has_valid_mask() {
            return Err(AclError::InvalidMask {
                mask: permission.mask,
            });
        }
        let key = normalize(name);
        if key.is_empty() {
            return Err(AclError::invalid("permission name must not be empty"));
        }
        if let Some((existing, _)) = self.by_mask.get(&permission.mask) {
            return Err(AclError::DuplicateMask {
                mask: permission.mask,
                existing: existing.clone(),
            });
        }
        if self.by_name.contains_key(&key) {
            return Err(AclError::DuplicatePermissionName { name: key });
        }
        tracing::debug!(permission.name = %key, permission.mask = permission.mask, "registered permission");
        self.insert(key, permission);
        Ok(())
    }

    pub fn by_mask(&self, mask: u32) -> Result<Permission> {
        self.by_mask
            .get(&mask)
            .map(|(_, permission)| *permission)
            .ok_or_else(|| AclError::UnknownPermission {
                value: format!("mask {mask}"),
            })
    }

    /// Case-insensitive lookup.
    pub fn by_name(&self, name: &str) -> Result<Permission> {
        self.by_name
            .get(&normalize(name))
            .copied()
            .ok_or_else(|| AclError::UnknownPermission {
                value: name.to_string(),
            })
    }

    #[must_use]
    pub fn resolve_name(&self, permission: &Permission) -> Option<&str> {
        self.by_mask
            .get(&permission.mask)
            .map(|(name, _)| name.as_str())
    }

    /// Resolve every name, failing on the first unknown one.
    pub fn resolve_names<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<Permission>> {
        names.iter().map(|name| self.by_name(name.as_ref())).collect()
    }

    /// Names of the registered permissions among `permissions`; unknown masks are skipped.
    #[must_use]
    pub fn to_names(&self, permissions: &[Permission]) -> Vec<String> {
        permissions
            .iter()
            .filter_map(|permission| self.resolve_name(permission))
            .map(str::to_string)
            .collect()
    }

    /// The permissions granted to a new owner, in grant order.
    #[must_use]
    pub fn owner_defaults(&self) -> &[Permission] {
        &self.owner_defaults
    }

    pub fn set_owner_defaults(&mut self, defaults: Vec<Permission>) -> Result<()> {
        for permission in &defaults {
            self.by_mask(permission.mask)?;
        }
        self.owner_defaults = defaults;
        Ok(())
    }

    /// Every registered permission in ascending mask order.
    #[must_use]
    pub fn all(&self) -> Vec<Permission> {
        self.by_mask.values().map(|(_, permission)| *permission).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_mask.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_mask.is_empty()
    }

    fn insert(&mut self, key: String, permission: Permission) {
        self.by_name.insert(key.clone(), permission);
        self.by_mask.insert(permission.mask, (key, permission));
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_ascii_uppercase()
}
