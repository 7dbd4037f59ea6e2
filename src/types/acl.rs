//! Access control lists and their entries.

use serde::{Deserialize, Serialize};

use super::identity::ObjectIdentity;
use super::permission::Permission;
use super::sid::{Sid, SidSet};
use crate::{AclError, Result};

/// One `(sid, permission, granting)` row of an ACL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessControlEntry {
    /// Index within the owning ACL; contiguous from zero.
    pub position: usize,
    pub sid: Sid,
    pub permission: Permission,
    pub granting: bool,
}

impl AccessControlEntry {
    /// Same SID and same mask, regardless of the granting flag.
    #[must_use]
    pub fn matches(&self, sid: &Sid, mask: u32) -> bool {
        self.permission.mask == mask && &self.sid == sid
    }

    #[must_use]
    pub fn applies_to(&self, sids: &SidSet) -> bool {
        sids.contains(&self.sid)
    }
}

/// The full permission record for one object identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acl {
    pub identity: ObjectIdentity,
    /// Unset only between `create` and the first ownership assignment.
    pub owner: Option<Sid>,
    entries: Vec<AccessControlEntry>,
    pub parent: Option<ObjectIdentity>,
    pub entries_inheriting: bool,
}

impl Acl {
    /// A fresh ACL: no owner, no entries, no parent, inheriting.
    #[must_use]
    pub fn new(identity: ObjectIdentity) -> Self {
        Self {
            identity,
            owner: None,
            entries: Vec::new(),
            parent: None,
            entries_inheriting: true,
        }
    }

    #[must_use]
    pub fn entries(&self) -> &[AccessControlEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert an entry at `index`, shifting later entries down.
    pub fn insert_ace(
        &mut self,
        index: usize,
        permission: Permission,
        sid: Sid,
        granting: bool,
    ) -> Result<()> {
        if index > self.entries.len() {
            return Err(AclError::invalid(format!(
                "entry index {index} out of range for {} entries",
                self.entries.len()
            )));
        }
        self.entries.insert(
            index,
            AccessControlEntry {
                position: index,
                sid,
                permission,
                granting,
            },
        );
        self.recompact(index);
        Ok(())
    }

    /// Append an entry at the end of the sequence.
    pub fn push_ace(&mut self, permission: Permission, sid: Sid, granting: bool) {
        let position = self.entries.len();
        self.entries.push(AccessControlEntry {
            position,
            sid,
            permission,
            granting,
        });
    }

    /// Remove the entry at `index` and close the gap.
    pub fn delete_ace(&mut self, index: usize) -> Result<AccessControlEntry> {
        if index >= self.entries.len() {
            return Err(AclError::invalid(format!(
                "entry index {index} out of range for {} entries",
                self.entries.len()
            )));
        }
        let removed = self.entries.remove(index);
        self.recompact(index);
        Ok(removed)
    }

    #[must_use]
    pub fn has_granting_entry(&self, sid: &Sid, mask: u32) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.granting && entry.matches(sid, mask))
    }

    /// First entry (in order) held by any of `sids` for `mask`.
    #[must_use]
    pub fn first_match(&self, sids: &SidSet, mask: u32) -> Option<&AccessControlEntry> {
        self.entries
            .iter()
            .find(|entry| entry.permission.mask == mask && entry.applies_to(sids))
    }

    /// Granting entries held by any of `sids`.
    pub fn granting_entries_for<'a>(
        &'a self,
        sids: &'a SidSet,
    ) -> impl Iterator<Item = &'a AccessControlEntry> + 'a {
        self.entries
            .iter()
            .filter(move |entry| entry.granting && entry.applies_to(sids))
    }

    /// Parent to consult during evaluation, if this ACL inherits.
    #[must_use]
    pub fn inherited_parent(&self) -> Option<&ObjectIdentity> {
        if self.entries_inheriting {
            self.parent.as_ref()
        } else {
            None
        }
    }

    pub(crate) fn from_parts(
        identity: ObjectIdentity,
        owner: Option<Sid>,
        entries: Vec<AccessControlEntry>,
        parent: Option<ObjectIdentity>,
        entries_inheriting: bool,
    ) -> Self {
        let mut acl = Self {
            identity,
            owner,
            entries,
            parent,
            entries_inheriting,
        };
        acl.recompact(0);
        acl
    }

    fn recompact(&mut self, from: usize) {
        for (position, entry) in self.entries.iter_mut().enumerate().skip(from) {
            entry.position = position;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn acl() -> Acl {
        Acl::new(ObjectIdentity::new("Project", 1))
    }

    #[test]
    fn positions_stay_contiguous_after_delete() {
        let mut acl = acl();
        let alice = Sid::Principal("alice".into());
        acl.push_ace(Permission::READ, alice.clone(), true);
        acl.push_ace(Permission::WRITE, alice.clone(), true);
        acl.push_ace(Permission::DELETE, alice, true);

        let removed = acl.delete_ace(1).expect("delete middle entry");
        assert_eq!(removed.permission, Permission::WRITE);
        let positions: Vec<usize> = acl.entries().iter().map(|e| e.position).collect();
        assert_eq!(positions, vec![0, 1]);
        assert_eq!(acl.entries()[1].permission, Permission::DELETE);
    }

    #[test]
    fn insert_shifts_later_entries() {
        let mut acl = acl();
        let bob = Sid::Principal("bob".into());
        acl.push_ace(Permission::READ, bob.clone(), true);
        acl.push_ace(Permission::WRITE, bob.clone(), true);
        acl.insert_ace(0, Permission::SHARE, bob, false)
            .expect("insert at head");

        assert_eq!(acl.entries()[0].permission, Permission::SHARE);
        assert!(!acl.entries()[0].granting);
        assert_eq!(acl.entries()[2].position, 2);
    }

    #[test]
    fn out_of_range_indices_are_rejected() {
        let mut acl = acl();
        assert!(acl.delete_ace(0).is_err());
        assert!(
            acl.insert_ace(2, Permission::READ, Sid::Authority("ROLE_USER".into()), true)
                .is_err()
        );
    }

    #[test]
    fn inherited_parent_requires_flag() {
        let mut acl = acl();
        acl.parent = Some(ObjectIdentity::new("Project", 99));
        assert!(acl.inherited_parent().is_some());
        acl.entries_inheriting = false;
        assert!(acl.inherited_parent().is_none());
    }
}
