//! Read-only permission discovery.
//!
//! These queries look at a resource's own entries and at most its immediate parent; they
//! do not climb further the way evaluation does. `accessible_resources` is a linear scan
//! over every resource of the type.

use std::collections::{BTreeMap, BTreeSet};

use crate::constants::{UNKNOWN_PERMISSION_NAME, UNKNOWN_RESOURCE_NAME};
use crate::engine::lifecycle::AclEngine;
use crate::types::{
    AccessSource, AccessibleResources, Acl, EffectivePermissions, InheritanceInfo,
    ObjectIdentity, ParentDescriptor, Permission, ResourceAccess, ResourceDescriptor, SidSet,
};
use crate::{AclError, Result};

/// Where resources of each type, and their display names, come from.
pub trait ResourceCatalog: Send + Sync {
    /// Canonical spelling of a known resource type, matched case-insensitively.
    fn canonical_type(&self, resource_type: &str) -> Option<String>;

    /// Every resource of `resource_type`.
    fn resources(&self, resource_type: &str) -> Vec<ResourceDescriptor>;

    fn display_name(&self, identity: &ObjectIdentity) -> Option<String>;
}

/// A fixed in-memory catalog.
#[derive(Debug, Clone, Default)]
pub struct StaticResourceCatalog {
    types: BTreeMap<String, Vec<ResourceDescriptor>>,
}

impl StaticResourceCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a resource type with no resources yet.
    pub fn with_type(mut self, resource_type: &str) -> Self {
        self.types.entry(resource_type.to_string()).or_default();
        self
    }

    pub fn with_resource(mut self, resource_type: &str, resource: ResourceDescriptor) -> Self {
        self.insert(resource_type, resource);
        self
    }

    pub fn insert(&mut self, resource_type: &str, resource: ResourceDescriptor) {
        self.types
            .entry(resource_type.to_string())
            .or_default()
            .push(resource);
    }
}

impl ResourceCatalog for StaticResourceCatalog {
    fn canonical_type(&self, resource_type: &str) -> Option<String> {
        let wanted = resource_type.trim();
        self.types
            .keys()
            .find(|known| known.eq_ignore_ascii_case(wanted))
            .cloned()
    }

    fn resources(&self, resource_type: &str) -> Vec<ResourceDescriptor> {
        self.types.get(resource_type).cloned().unwrap_or_default()
    }

    fn display_name(&self, identity: &ObjectIdentity) -> Option<String> {
        self.types
            .get(&identity.resource_type)?
            .iter()
            .find(|resource| resource.resource_id == identity.resource_id)
            .map(|resource| resource.name.clone())
    }
}

impl AclEngine {
    /// Permission names `sids` hold on `identity` directly and through its immediate
    /// parent (inheriting ACLs only). A missing ACL yields empty sets.
    pub fn effective_permissions(
        &self,
        identity: &ObjectIdentity,
        sids: &SidSet,
    ) -> Result<EffectivePermissions> {
        let Some(acl) = self.read_optional(identity)? else {
            tracing::debug!(acl.identity = %identity, "no acl for effective permissions");
            return Ok(EffectivePermissions::none(identity.clone()));
        };

        let granted = acl
            .granting_entries_for(sids)
            .map(|entry| self.permission_name(&entry.permission))
            .collect::<BTreeSet<_>>();
        let mut inherited = BTreeSet::new();
        let mut parent = None;
        if let Some(parent_identity) = acl.inherited_parent() {
            if let Some(parent_acl) = self.read_optional(parent_identity)? {
                inherited.extend(
                    parent_acl
                        .granting_entries_for(sids)
                        .map(|entry| self.permission_name(&entry.permission)),
                );
            } else {
                tracing::warn!(acl.identity = %identity, acl.parent = %parent_identity, "parent acl missing");
            }
            parent = Some(parent_identity.clone());
        }

        let has_access = !granted.is_empty() || !inherited.is_empty();
        Ok(EffectivePermissions {
            identity: identity.clone(),
            granted,
            inherited,
            has_access,
            parent,
        })
    }

    /// Scan `resources` of `resource_type` and keep those `sids` can reach.
    ///
    /// A resource is tagged [`AccessSource::Inherited`] when some permission comes only
    /// from the parent.
    pub fn accessible_resources(
        &self,
        resource_type: &str,
        resources: &[ResourceDescriptor],
        sids: &SidSet,
    ) -> Result<AccessibleResources> {
        let mut accessible = Vec::new();
        for resource in resources {
            let identity = ObjectIdentity::new(resource_type, resource.resource_id.clone());
            let effective = self.effective_permissions(&identity, sids)?;
            if !effective.has_access {
                continue;
            }
            let source = if effective.has_inherited_only() {
                AccessSource::Inherited
            } else {
                AccessSource::Direct
            };
            accessible.push(ResourceAccess {
                resource_id: resource.resource_id.clone(),
                name: resource.name.clone(),
                permissions: effective.all(),
                source,
            });
        }
        tracing::debug!(
            acl.resource_type = resource_type,
            acl.scanned = resources.len(),
            acl.accessible = accessible.len(),
            "scanned accessible resources"
        );
        let total_count = accessible.len();
        Ok(AccessibleResources {
            resource_type: resource_type.to_string(),
            resources: accessible,
            total_count,
        })
    }

    /// [`accessible_resources`](Self::accessible_resources) over everything `catalog`
    /// lists for `resource_type`. Unknown types fail with `InvalidArgument`.
    pub fn accessible_resources_in(
        &self,
        catalog: &dyn ResourceCatalog,
        resource_type: &str,
        sids: &SidSet,
    ) -> Result<AccessibleResources> {
        let canonical = catalog
            .canonical_type(resource_type)
            .ok_or_else(|| AclError::invalid(format!("unknown resource type: {resource_type}")))?;
        let resources = catalog.resources(&canonical);
        self.accessible_resources(&canonical, &resources, sids)
    }

    /// Every granting permission on `identity` and on its parent, regardless of holder.
    pub fn inheritance_info(
        &self,
        catalog: &dyn ResourceCatalog,
        identity: &ObjectIdentity,
    ) -> Result<InheritanceInfo> {
        let name = display_name(catalog, identity);
        let Some(acl) = self.read_optional(identity)? else {
            return Ok(InheritanceInfo {
                identity: identity.clone(),
                name,
                direct: Vec::new(),
                inherited: Vec::new(),
                entries_inheriting: false,
                has_parent: false,
                parent: None,
            });
        };

        let direct = self.granting_names(&acl);
        let parent = match &acl.parent {
            Some(parent_identity) => {
                let permissions = match self.read_optional(parent_identity)? {
                    Some(parent_acl) => self.granting_names(&parent_acl),
                    None => Vec::new(),
                };
                Some(ParentDescriptor {
                    identity: parent_identity.clone(),
                    name: display_name(catalog, parent_identity),
                    permissions,
                })
            }
            None => None,
        };
        let inherited = parent
            .as_ref()
            .map(|parent| parent.permissions.clone())
            .unwrap_or_default();

        Ok(InheritanceInfo {
            identity: identity.clone(),
            name,
            direct,
            inherited,
            entries_inheriting: acl.entries_inheriting,
            has_parent: parent.is_some(),
            parent,
        })
    }

    fn read_optional(&self, identity: &ObjectIdentity) -> Result<Option<Acl>> {
        match self.read_acl(identity) {
            Ok(acl) => Ok(Some(acl)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Distinct names of all granting entries, in entry order.
    fn granting_names(&self, acl: &Acl) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for entry in acl.entries().iter().filter(|entry| entry.granting) {
            let name = self.permission_name(&entry.permission);
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }

    fn permission_name(&self, permission: &Permission) -> String {
        self.registry
            .resolve_name(permission)
            .unwrap_or(UNKNOWN_PERMISSION_NAME)
            .to_string()
    }
}

fn display_name(catalog: &dyn ResourceCatalog, identity: &ObjectIdentity) -> String {
    catalog
        .display_name(identity)
        .unwrap_or_else(|| UNKNOWN_RESOURCE_NAME.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_types_match_case_insensitively() {
        let catalog = StaticResourceCatalog::new()
            .with_resource("Project", ResourceDescriptor::new(1, "Apollo"))
            .with_type("Comment");
        assert_eq!(catalog.canonical_type("PROJECT").as_deref(), Some("Project"));
        assert_eq!(catalog.canonical_type("comment").as_deref(), Some("Comment"));
        assert!(catalog.canonical_type("Invoice").is_none());
        assert_eq!(
            catalog
                .display_name(&ObjectIdentity::new("Project", 1))
                .as_deref(),
            Some("Apollo")
        );
        assert!(catalog.resources("Comment").is_empty());
    }
}
