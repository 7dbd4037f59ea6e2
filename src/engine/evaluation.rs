use std::collections::HashSet;

use crate::Result;
use crate::engine::lifecycle::AclEngine;
use crate::types::{Acl, ObjectIdentity, Permission, SidSet};

impl AclEngine {
    /// Cached read; a miss loads from the store and populates the cache.
    pub fn read_acl(&self, identity: &ObjectIdentity) -> Result<Acl> {
        if let Some(acl) = self.cache.get(identity) {
            tracing::trace!(acl.identity = %identity, "acl cache hit");
            return Ok(acl);
        }
        let generation = self.cache.generation();
        let acl = self.store.read(identity)?;
        // Skipped when an eviction landed while loading; the loaded copy may be stale.
        let cached = self.cache.put_if_current(&acl, generation);
        tracing::trace!(acl.identity = %identity, acl.cached = cached, "acl cache miss");
        Ok(acl)
    }

    /// Whether `sids` hold every one of `permissions` on `identity`.
    ///
    /// Every requested mask is first resolved against the ACL itself: the first entry (in
    /// order) held by any of `sids` for that mask decides it. Only when no requested mask
    /// matched a local entry is the inheriting parent consulted, with the same scan one
    /// level up. Masks left unresolved deny, so one local grant never pulls the others
    /// from the parent. A missing ACL, an empty SID set or an empty permission list all
    /// evaluate to `false`. Never fails.
    pub fn has_permission(
        &self,
        sids: &SidSet,
        identity: &ObjectIdentity,
        permissions: &[Permission],
    ) -> bool {
        if permissions.is_empty() || sids.is_empty() {
            return false;
        }
        let acl = match self.read_acl(identity) {
            Ok(acl) => acl,
            Err(err) => {
                if !err.is_not_found() {
                    tracing::warn!(acl.identity = %identity, error = %err, "acl read failed during evaluation");
                }
                return false;
            }
        };
        let granted = self.resolve(&acl, sids, permissions);
        tracing::debug!(
            acl.identity = %identity,
            acl.permissions = permissions.len(),
            acl.granted = granted,
            "evaluated permission"
        );
        granted
    }

    /// [`has_permission`](Self::has_permission) with permissions given by registered name.
    ///
    /// Fails only for unknown names.
    pub fn check<S: AsRef<str>>(
        &self,
        sids: &SidSet,
        identity: &ObjectIdentity,
        names: &[S],
    ) -> Result<bool> {
        let permissions = self.registry.resolve_names(names)?;
        Ok(self.has_permission(sids, identity, &permissions))
    }

    /// Drop any cached copy of `identity`. Succeeds whether or not one was cached.
    pub fn evict_cache(&self, identity: &ObjectIdentity) {
        self.cache.evict(identity);
    }

    /// Walk up the inheriting chain to the first ACL with any matching entry and decide
    /// all of `permissions` there.
    fn resolve(&self, acl: &Acl, sids: &SidSet, permissions: &[Permission]) -> bool {
        let mut decisions = local_decisions(acl, sids, permissions);
        let mut visited = HashSet::from([acl.identity.clone()]);
        let mut next = acl.inherited_parent().cloned();
        while decisions.iter().all(Option::is_none) {
            let Some(parent_identity) = next else {
                return false;
            };
            if !visited.insert(parent_identity.clone()) {
                tracing::warn!(acl.identity = %acl.identity, acl.parent = %parent_identity, "parent cycle during evaluation");
                return false;
            }
            let parent = match self.read_acl(&parent_identity) {
                Ok(parent) => parent,
                Err(err) => {
                    tracing::warn!(acl.identity = %acl.identity, acl.parent = %parent_identity, error = %err, "parent acl unavailable");
                    return false;
                }
            };
            decisions = local_decisions(&parent, sids, permissions);
            next = parent.inherited_parent().cloned();
        }
        decisions.into_iter().all(|decision| decision == Some(true))
    }
}

/// The `granting` flag of the first entry matching each mask, or `None` without one.
fn local_decisions(acl: &Acl, sids: &SidSet, permissions: &[Permission]) -> Vec<Option<bool>> {
    permissions
        .iter()
        .map(|permission| acl.first_match(sids, permission.mask).map(|entry| entry.granting))
        .collect()
}
