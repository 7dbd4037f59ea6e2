//! ACL mutations: creation, ownership, grants, revocations, inheritance and deletion.
//!
//! Every mutation follows the same order: read-modify the ACL, persist it, evict the
//! cached copy, then publish one audit event. Nothing is published for a no-op.

use std::collections::HashSet;

use crate::engine::lifecycle::AclEngine;
use crate::sid::SidResolver;
use crate::types::{Acl, AuditOperation, ObjectIdentity, Permission, ResourceId, Sid};
use crate::{AclError, Result};

impl AclEngine {
    /// Return the ACL for `identity`, creating (and auditing) an empty one if absent.
    pub fn ensure_acl(&self, actor: Option<&str>, identity: &ObjectIdentity) -> Result<Acl> {
        match self.store.read(identity) {
            Ok(acl) => Ok(acl),
            Err(err) if err.is_not_found() => {
                let acl = match self.store.create(identity) {
                    Ok(acl) => acl,
                    // Another caller created it between our read and create.
                    Err(AclError::AlreadyExists { .. }) => return self.store.read(identity),
                    Err(err) => return Err(err),
                };
                tracing::debug!(
                    acl.resource_type = %identity.resource_type,
                    acl.id = %identity.resource_id,
                    "created acl"
                );
                self.publish(AuditOperation::Create, identity, None, Vec::new(), actor);
                Ok(acl)
            }
            Err(err) => Err(err),
        }
    }

    /// Make `username` the owner and grant it the registry's owner defaults.
    ///
    /// Returns `true` if the ACL changed.
    pub fn apply_ownership(
        &self,
        actor: Option<&str>,
        identity: &ObjectIdentity,
        username: &str,
    ) -> Result<bool> {
        if username.trim().is_empty() {
            return Err(AclError::invalid("owner username must not be empty"));
        }
        let mut acl = self.ensure_acl(actor, identity)?;
        let owner = SidResolver::principal(username);
        let defaults = self.registry.owner_defaults().to_vec();

        let mut changed = false;
        if acl.owner.as_ref() != Some(&owner) {
            acl.owner = Some(owner.clone());
            changed = true;
        }
        changed |= add_missing(&mut acl, &owner, &defaults);
        if !changed {
            tracing::debug!(acl.identity = %identity, acl.owner = %owner, "ownership unchanged");
            return Ok(false);
        }

        self.persist(&acl)?;
        self.publish(AuditOperation::Ownership, identity, Some(&owner), defaults, actor);
        Ok(true)
    }

    /// Append a granting entry for each permission `sid` does not already hold.
    ///
    /// An empty `permissions` slice is a no-op. The audit event lists every requested
    /// permission, not only the newly added ones. Returns `true` if the ACL changed.
    pub fn grant(
        &self,
        actor: Option<&str>,
        identity: &ObjectIdentity,
        sid: &Sid,
        permissions: &[Permission],
    ) -> Result<bool> {
        if permissions.is_empty() {
            return Ok(false);
        }
        let permissions = self.require_registered(permissions)?;
        let mut acl = self.ensure_acl(actor, identity)?;
        if !add_missing(&mut acl, sid, &permissions) {
            tracing::debug!(acl.identity = %identity, acl.sid = %sid, "grant already present");
            return Ok(false);
        }

        self.persist(&acl)?;
        self.publish(
            AuditOperation::Grant,
            identity,
            Some(sid),
            permissions,
            actor,
        );
        Ok(true)
    }

    pub fn grant_to_user(
        &self,
        actor: Option<&str>,
        identity: &ObjectIdentity,
        username: &str,
        permissions: &[Permission],
    ) -> Result<bool> {
        self.grant(actor, identity, &SidResolver::principal(username), permissions)
    }

    /// Grant to `GROUP_<group_name>`.
    pub fn grant_to_group(
        &self,
        actor: Option<&str>,
        identity: &ObjectIdentity,
        group_name: &str,
        permissions: &[Permission],
    ) -> Result<bool> {
        self.grant(actor, identity, &SidResolver::group(group_name), permissions)
    }

    /// Grant to `ROLE_<role_name>`.
    pub fn grant_to_role(
        &self,
        actor: Option<&str>,
        identity: &ObjectIdentity,
        role_name: &str,
        permissions: &[Permission],
    ) -> Result<bool> {
        self.grant(actor, identity, &SidResolver::role(role_name), permissions)
    }

    pub fn grant_to_authority(
        &self,
        actor: Option<&str>,
        identity: &ObjectIdentity,
        authority: &str,
        permissions: &[Permission],
    ) -> Result<bool> {
        self.grant(actor, identity, &SidResolver::authority(authority), permissions)
    }

    /// [`grant`](Self::grant) with permissions given by registered name.
    pub fn grant_by_names<S: AsRef<str>>(
        &self,
        actor: Option<&str>,
        identity: &ObjectIdentity,
        sid: &Sid,
        names: &[S],
    ) -> Result<bool> {
        let permissions = self.registry.resolve_names(names)?;
        self.grant(actor, identity, sid, &permissions)
    }

    /// Grant to `sid` on each listed resource in turn.
    ///
    /// Not atomic: if one identifier fails, the earlier ones stay granted.
    pub fn bulk_grant<I>(
        &self,
        actor: Option<&str>,
        resource_type: &str,
        ids: I,
        sid: &Sid,
        permissions: &[Permission],
    ) -> Result<()>
    where
        I: IntoIterator,
        I::Item: Into<ResourceId>,
    {
        for id in ids {
            let identity = ObjectIdentity::new(resource_type, id);
            self.grant(actor, &identity, sid, permissions)?;
        }
        Ok(())
    }

    pub fn bulk_grant_to_users<I>(
        &self,
        actor: Option<&str>,
        resource_type: &str,
        ids: I,
        username: &str,
        permissions: &[Permission],
    ) -> Result<()>
    where
        I: IntoIterator,
        I::Item: Into<ResourceId>,
    {
        let sid = SidResolver::principal(username);
        self.bulk_grant(actor, resource_type, ids, &sid, permissions)
    }

    /// Remove every entry of `sid` whose mask is among `permissions`.
    ///
    /// Entries are scanned from the end so deletions do not disturb the indices still to
    /// be visited. An empty `permissions` slice is a no-op. Returns `true` if the ACL
    /// changed.
    pub fn revoke(
        &self,
        actor: Option<&str>,
        identity: &ObjectIdentity,
        sid: &Sid,
        permissions: &[Permission],
    ) -> Result<bool> {
        if permissions.is_empty() {
            return Ok(false);
        }
        let masks: HashSet<u32> = permissions.iter().map(|permission| permission.mask).collect();
        let mut acl = self.ensure_acl(actor, identity)?;
        let removed = remove_matching(&mut acl, |entry_sid, mask| {
            entry_sid == sid && masks.contains(&mask)
        })?;
        if removed.is_empty() {
            tracing::debug!(acl.identity = %identity, acl.sid = %sid, "nothing to revoke");
            return Ok(false);
        }

        self.persist(&acl)?;
        self.publish(
            AuditOperation::Revoke,
            identity,
            Some(sid),
            permissions.to_vec(),
            actor,
        );
        Ok(true)
    }

    pub fn revoke_by_names<S: AsRef<str>>(
        &self,
        actor: Option<&str>,
        identity: &ObjectIdentity,
        sid: &Sid,
        names: &[S],
    ) -> Result<bool> {
        let permissions = self.registry.resolve_names(names)?;
        self.revoke(actor, identity, sid, &permissions)
    }

    /// Revoke from `sid` on each listed resource in turn; not atomic.
    pub fn bulk_revoke<I>(
        &self,
        actor: Option<&str>,
        resource_type: &str,
        ids: I,
        sid: &Sid,
        permissions: &[Permission],
    ) -> Result<()>
    where
        I: IntoIterator,
        I::Item: Into<ResourceId>,
    {
        for id in ids {
            let identity = ObjectIdentity::new(resource_type, id);
            self.revoke(actor, &identity, sid, permissions)?;
        }
        Ok(())
    }

    /// Remove every entry held by `sid`, whatever its permission.
    ///
    /// The audit event lists the removed permissions in entry order.
    pub fn revoke_all_for_sid(
        &self,
        actor: Option<&str>,
        identity: &ObjectIdentity,
        sid: &Sid,
    ) -> Result<bool> {
        let mut acl = self.ensure_acl(actor, identity)?;
        let removed = remove_matching(&mut acl, |entry_sid, _| entry_sid == sid)?;
        if removed.is_empty() {
            return Ok(false);
        }

        self.persist(&acl)?;
        self.publish(AuditOperation::Revoke, identity, Some(sid), removed, actor);
        Ok(true)
    }

    /// Link `child` under `parent`, creating either ACL if needed.
    ///
    /// Overwrites any previous parent. With `reject_parent_cycles` on, a link that would
    /// make `child` its own ancestor fails with [`AclError::CyclicParent`].
    pub fn set_parent(
        &self,
        actor: Option<&str>,
        child: &ObjectIdentity,
        parent: &ObjectIdentity,
        entries_inheriting: bool,
    ) -> Result<bool> {
        if child == parent {
            return Err(AclError::CyclicParent {
                child: child.clone(),
                parent: parent.clone(),
            });
        }
        if self.config.reject_parent_cycles && self.has_ancestor(parent, child)? {
            tracing::warn!(acl.child = %child, acl.parent = %parent, "rejected cyclic parent link");
            return Err(AclError::CyclicParent {
                child: child.clone(),
                parent: parent.clone(),
            });
        }
        let mut child_acl = self.ensure_acl(actor, child)?;
        self.ensure_acl(actor, parent)?;

        let mut changed = false;
        if child_acl.parent.as_ref() != Some(parent) {
            child_acl.parent = Some(parent.clone());
            changed = true;
        }
        if child_acl.entries_inheriting != entries_inheriting {
            child_acl.entries_inheriting = entries_inheriting;
            changed = true;
        }
        if !changed {
            return Ok(false);
        }

        self.persist(&child_acl)?;
        self.publish(AuditOperation::Inheritance, child, None, Vec::new(), actor);
        Ok(true)
    }

    /// Detach `identity` from its parent. A missing ACL is left absent.
    pub fn clear_parent(&self, actor: Option<&str>, identity: &ObjectIdentity) -> Result<bool> {
        let mut acl = match self.store.read(identity) {
            Ok(acl) => acl,
            Err(err) if err.is_not_found() => return Ok(false),
            Err(err) => return Err(err),
        };
        if acl.parent.take().is_none() {
            return Ok(false);
        }

        self.persist(&acl)?;
        self.publish(AuditOperation::Inheritance, identity, None, Vec::new(), actor);
        Ok(true)
    }

    /// Delete the ACL for `identity` and return how many ACLs were removed.
    ///
    /// Without `cascade`, an ACL that is still the parent of others is refused with
    /// [`AclError::ChildrenExist`]. With `cascade`, descendants go first, deepest first.
    pub fn delete_acl(
        &self,
        actor: Option<&str>,
        identity: &ObjectIdentity,
        cascade: bool,
    ) -> Result<usize> {
        self.store.read(identity)?;
        let children = self.store.children(identity)?;
        if !children.is_empty() && !cascade {
            return Err(AclError::ChildrenExist {
                identity: identity.clone(),
                children: children.len(),
            });
        }

        let mut order = Vec::new();
        let mut visited = HashSet::new();
        self.collect_descendants(identity, &mut visited, &mut order)?;
        for doomed in &order {
            self.store.delete(doomed)?;
            self.cache.evict(doomed);
            self.publish(AuditOperation::Delete, doomed, None, Vec::new(), actor);
        }
        tracing::debug!(acl.identity = %identity, acl.deleted = order.len(), "deleted acl");
        Ok(order.len())
    }

    /// Post-order walk: every descendant precedes its parent in `order`.
    fn collect_descendants(
        &self,
        identity: &ObjectIdentity,
        visited: &mut HashSet<ObjectIdentity>,
        order: &mut Vec<ObjectIdentity>,
    ) -> Result<()> {
        if !visited.insert(identity.clone()) {
            return Ok(());
        }
        for child in self.store.children(identity)? {
            self.collect_descendants(&child, visited, order)?;
        }
        order.push(identity.clone());
        Ok(())
    }

    /// Whether `ancestor` is `start` or appears on `start`'s parent chain.
    fn has_ancestor(&self, start: &ObjectIdentity, ancestor: &ObjectIdentity) -> Result<bool> {
        let mut visited = HashSet::new();
        let mut current = Some(start.clone());
        while let Some(identity) = current {
            if &identity == ancestor {
                return Ok(true);
            }
            if !visited.insert(identity.clone()) {
                return Ok(false);
            }
            current = match self.store.read(&identity) {
                Ok(acl) => acl.parent,
                Err(err) if err.is_not_found() => None,
                Err(err) => return Err(err),
            };
        }
        Ok(false)
    }

    /// The registry's own definition of each permission, so entries carry its code.
    fn require_registered(&self, permissions: &[Permission]) -> Result<Vec<Permission>> {
        permissions
            .iter()
            .map(|permission| {
                if !permission.has_valid_mask() {
                    return Err(AclError::InvalidMask {
                        mask: permission.mask,
                    });
                }
                self.registry.by_mask(permission.mask)
            })
            .collect()
    }
}

/// Append a granting entry per permission `sid` does not already hold.
fn add_missing(acl: &mut Acl, sid: &Sid, permissions: &[Permission]) -> bool {
    let mut changed = false;
    for permission in permissions {
        if !acl.has_granting_entry(sid, permission.mask) {
            acl.push_ace(*permission, sid.clone(), true);
            changed = true;
        }
    }
    changed
}

/// Delete matching entries back to front; returns the removed permissions in entry order.
fn remove_matching<F>(acl: &mut Acl, matches: F) -> Result<Vec<Permission>>
where
    F: Fn(&Sid, u32) -> bool,
{
    let mut removed = Vec::new();
    for index in (0..acl.len()).rev() {
        let entry = &acl.entries()[index];
        if matches(&entry.sid, entry.permission.mask) {
            removed.push(acl.delete_ace(index)?.permission);
        }
    }
    removed.reverse();
    Ok(removed)
}
