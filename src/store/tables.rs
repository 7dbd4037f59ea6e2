//! Normalized persistence records: SIDs, classes, object identities, and entries.
//!
//! Every mutation goes through [`AclTables::validate`] before [`AclTables::apply_validated`],
//! so a rejected operation leaves the tables untouched and a validated one cannot fail
//! halfway. The durable store relies on this to journal an operation only once it is
//! known to apply.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::StoreCounts;
use crate::types::{AccessControlEntry, Acl, ObjectIdentity, Permission, ResourceId, Sid};
use crate::{AclError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct SidRecord {
    pub id: u64,
    pub principal: bool,
    pub sid: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct ClassRecord {
    pub id: u64,
    pub class: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct ObjectIdentityRecord {
    pub id: u64,
    pub class_id: u64,
    pub resource_id: ResourceId,
    pub parent_id: Option<u64>,
    pub owner_sid_id: Option<u64>,
    pub entries_inheriting: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct EntryRecord {
    pub id: u64,
    pub position: usize,
    pub sid_id: u64,
    pub mask: u32,
    pub code: char,
    pub granting: bool,
}

/// One state transition, as journaled by the durable store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) enum StoreOp {
    Create(ObjectIdentity),
    Update(Acl),
    Delete(ObjectIdentity),
}

impl StoreOp {
    pub(crate) fn label(&self) -> &'static str {
        match self {
            Self::Create(_) => "create",
            Self::Update(_) => "update",
            Self::Delete(_) => "delete",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct AclTables {
    sids: BTreeMap<u64, SidRecord>,
    classes: BTreeMap<u64, ClassRecord>,
    object_identities: BTreeMap<u64, ObjectIdentityRecord>,
    /// Keyed by owning object identity id, ordered by position.
    entries: BTreeMap<u64, Vec<EntryRecord>>,
    next_sid_id: u64,
    next_class_id: u64,
    next_object_id: u64,
    next_entry_id: u64,
    #[serde(skip)]
    sid_index: HashMap<(bool, String), u64>,
    #[serde(skip)]
    class_index: HashMap<String, u64>,
    #[serde(skip)]
    identity_index: HashMap<ObjectIdentity, u64>,
}

impl AclTables {
    /// Rebuild the lookup indexes after deserialization.
    pub(crate) fn reindex(&mut self) -> Result<()> {
        self.sid_index = self
            .sids
            .values()
            .map(|record| ((record.principal, record.sid.clone()), record.id))
            .collect();
        self.class_index = self
            .classes
            .values()
            .map(|record| (record.class.clone(), record.id))
            .collect();
        let mut identity_index = HashMap::with_capacity(self.object_identities.len());
        for record in self.object_identities.values() {
            identity_index.insert(self.identity_of(record)?, record.id);
        }
        self.identity_index = identity_index;
        Ok(())
    }

    pub(crate) fn read(&self, identity: &ObjectIdentity) -> Result<Acl> {
        let record = self.record_for(identity)?;
        let owner = record
            .owner_sid_id
            .map(|sid_id| self.sid_of(sid_id))
            .transpose()?;
        let parent = record
            .parent_id
            .map(|parent_id| {
                self.object_identities
                    .get(&parent_id)
                    .ok_or_else(|| dangling("parent", parent_id))
                    .and_then(|parent| self.identity_of(parent))
            })
            .transpose()?;
        let entries = self
            .entries
            .get(&record.id)
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .map(|entry| {
                Ok(AccessControlEntry {
                    position: entry.position,
                    sid: self.sid_of(entry.sid_id)?,
                    permission: Permission::new(entry.mask, entry.code),
                    granting: entry.granting,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Acl::from_parts(
            identity.clone(),
            owner,
            entries,
            parent,
            record.entries_inheriting,
        ))
    }

    pub(crate) fn contains(&self, identity: &ObjectIdentity) -> bool {
        self.identity_index.contains_key(identity)
    }

    pub(crate) fn children(&self, identity: &ObjectIdentity) -> Result<Vec<ObjectIdentity>> {
        let record = self.record_for(identity)?;
        self.object_identities
            .values()
            .filter(|candidate| candidate.parent_id == Some(record.id))
            .map(|child| self.identity_of(child))
            .collect()
    }

    /// All object identities in creation order.
    pub(crate) fn identities(&self) -> Result<Vec<ObjectIdentity>> {
        self.object_identities
            .values()
            .map(|record| self.identity_of(record))
            .collect()
    }

    pub(crate) fn counts(&self) -> StoreCounts {
        StoreCounts {
            sids: self.sids.len(),
            classes: self.classes.len(),
            object_identities: self.object_identities.len(),
            entries: self.entries.values().map(Vec::len).sum(),
        }
    }

    pub(crate) fn apply(&mut self, op: StoreOp) -> Result<()> {
        self.validate(&op)?;
        self.apply_validated(op);
        Ok(())
    }

    pub(crate) fn validate(&self, op: &StoreOp) -> Result<()> {
        match op {
            StoreOp::Create(identity) => {
                if self.contains(identity) {
                    return Err(AclError::AlreadyExists {
                        identity: identity.clone(),
                    });
                }
                if identity.resource_type.trim().is_empty() {
                    return Err(AclError::invalid("resource type must not be empty"));
                }
                Ok(())
            }
            StoreOp::Update(acl) => self.validate_update(acl),
            StoreOp::Delete(identity) => {
                let children = self.children(identity)?;
                if !children.is_empty() {
                    return Err(AclError::ChildrenExist {
                        identity: identity.clone(),
                        children: children.len(),
                    });
                }
                Ok(())
            }
        }
    }

    /// Apply an operation that already passed [`Self::validate`].
    pub(crate) fn apply_validated(&mut self, op: StoreOp) {
        match op {
            StoreOp::Create(identity) => self.insert_identity(identity),
            StoreOp::Update(acl) => self.write_acl(&acl),
            StoreOp::Delete(identity) => self.remove_identity(&identity),
        }
    }

    fn validate_update(&self, acl: &Acl) -> Result<()> {
        let record = self.record_for(&acl.identity)?;
        if let Some(parent) = &acl.parent {
            let parent_id = self
                .identity_index
                .get(parent)
                .ok_or_else(|| AclError::AclNotFound {
                    identity: parent.clone(),
                })?;
            if *parent_id == record.id {
                return Err(AclError::CyclicParent {
                    child: acl.identity.clone(),
                    parent: parent.clone(),
                });
            }
        }
        let mut granting = HashSet::new();
        for entry in acl.entries() {
            if !entry.permission.has_valid_mask() {
                return Err(AclError::InvalidMask {
                    mask: entry.permission.mask,
                });
            }
            if entry.granting && !granting.insert((&entry.sid, entry.permission.mask)) {
                return Err(AclError::invalid(format!(
                    "duplicate granting entry for {} mask {} on {}",
                    entry.sid, entry.permission.mask, acl.identity
                )));
            }
        }
        Ok(())
    }

    fn insert_identity(&mut self, identity: ObjectIdentity) {
        let class_id = self.class_id_or_insert(&identity.resource_type);
        self.next_object_id += 1;
        let id = self.next_object_id;
        self.object_identities.insert(
            id,
            ObjectIdentityRecord {
                id,
                class_id,
                resource_id: identity.resource_id.clone(),
                parent_id: None,
                owner_sid_id: None,
                entries_inheriting: true,
            },
        );
        self.identity_index.insert(identity, id);
    }

    fn write_acl(&mut self, acl: &Acl) {
        let Some(&id) = self.identity_index.get(&acl.identity) else {
            return;
        };
        let parent_id = acl
            .parent
            .as_ref()
            .and_then(|parent| self.identity_index.get(parent).copied());
        let owner_sid_id = acl.owner.as_ref().map(|owner| self.sid_id_or_insert(owner));

        let mut rows = Vec::with_capacity(acl.len());
        for entry in acl.entries() {
            let sid_id = self.sid_id_or_insert(&entry.sid);
            self.next_entry_id += 1;
            rows.push(EntryRecord {
                id: self.next_entry_id,
                position: entry.position,
                sid_id,
                mask: entry.permission.mask,
                code: entry.permission.code,
                granting: entry.granting,
            });
        }

        if let Some(record) = self.object_identities.get_mut(&id) {
            record.parent_id = parent_id;
            record.owner_sid_id = owner_sid_id;
            record.entries_inheriting = acl.entries_inheriting;
        }
        if rows.is_empty() {
            self.entries.remove(&id);
        } else {
            self.entries.insert(id, rows);
        }
    }

    fn remove_identity(&mut self, identity: &ObjectIdentity) {
        if let Some(id) = self.identity_index.remove(identity) {
            self.object_identities.remove(&id);
            self.entries.remove(&id);
        }
    }

    fn sid_id_or_insert(&mut self, sid: &Sid) -> u64 {
        let key = (sid.is_principal(), sid.value().to_string());
        if let Some(id) = self.sid_index.get(&key) {
            return *id;
        }
        self.next_sid_id += 1;
        let id = self.next_sid_id;
        self.sids.insert(
            id,
            SidRecord {
                id,
                principal: key.0,
                sid: key.1.clone(),
            },
        );
        self.sid_index.insert(key, id);
        id
    }

    fn class_id_or_insert(&mut self, class: &str) -> u64 {
        if let Some(id) = self.class_index.get(class) {
            return *id;
        }
        self.next_class_id += 1;
        let id = self.next_class_id;
        self.classes.insert(
            id,
            ClassRecord {
                id,
                class: class.to_string(),
            },
        );
        self.class_index.insert(class.to_string(), id);
        id
    }

    fn record_for(&self, identity: &ObjectIdentity) -> Result<&ObjectIdentityRecord> {
        self.identity_index
            .get(identity)
            .and_then(|id| self.object_identities.get(id))
            .ok_or_else(|| AclError::AclNotFound {
                identity: identity.clone(),
            })
    }

    fn identity_of(&self, record: &ObjectIdentityRecord) -> Result<ObjectIdentity> {
        let class = self
            .classes
            .get(&record.class_id)
            .ok_or_else(|| dangling("class", record.class_id))?;
        Ok(ObjectIdentity::new(
            class.class.clone(),
            record.resource_id.clone(),
        ))
    }

    fn sid_of(&self, sid_id: u64) -> Result<Sid> {
        let record = self.sids.get(&sid_id).ok_or_else(|| dangling("sid", sid_id))?;
        Ok(if record.principal {
            Sid::Principal(record.sid.clone())
        } else {
            Sid::Authority(record.sid.clone())
        })
    }
}

fn dangling(table: &str, id: u64) -> AclError {
    AclError::Serialization {
        reason: format!("dangling {table} reference {id}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: i64) -> ObjectIdentity {
        ObjectIdentity::new("Document", id)
    }

    #[test]
    fn sids_and_classes_are_shared_between_acls() {
        let mut tables = AclTables::default();
        let alice = Sid::Principal("alice".into());
        for id in [1, 2] {
            tables.apply(StoreOp::Create(doc(id))).expect("create");
            let mut acl = tables.read(&doc(id)).expect("read");
            acl.owner = Some(alice.clone());
            acl.push_ace(Permission::READ, alice.clone(), true);
            tables.apply(StoreOp::Update(acl)).expect("update");
        }
        let counts = tables.counts();
        assert_eq!(counts.sids, 1);
        assert_eq!(counts.classes, 1);
        assert_eq!(counts.object_identities, 2);
        assert_eq!(counts.entries, 2);
    }

    #[test]
    fn principal_and_authority_sids_are_distinct_rows() {
        let mut tables = AclTables::default();
        tables.apply(StoreOp::Create(doc(1))).expect("create");
        let mut acl = tables.read(&doc(1)).expect("read");
        acl.push_ace(Permission::READ, Sid::Principal("admin".into()), true);
        acl.push_ace(Permission::READ, Sid::Authority("admin".into()), true);
        tables.apply(StoreOp::Update(acl.clone())).expect("update");
        assert_eq!(tables.counts().sids, 2);
        assert_eq!(tables.read(&doc(1)).expect("read back"), acl);
    }

    #[test]
    fn duplicate_granting_entries_are_rejected() {
        let mut tables = AclTables::default();
        tables.apply(StoreOp::Create(doc(1))).expect("create");
        let mut acl = tables.read(&doc(1)).expect("read");
        let bob = Sid::Principal("bob".into());
        acl.push_ace(Permission::READ, bob.clone(), true);
        acl.push_ace(Permission::READ, bob, true);
        assert!(matches!(
            tables.apply(StoreOp::Update(acl)),
            Err(AclError::InvalidArgument { .. })
        ));
        assert!(tables.read(&doc(1)).expect("unchanged").is_empty());
    }

    #[test]
    fn parent_must_exist_and_blocks_delete() {
        let mut tables = AclTables::default();
        tables.apply(StoreOp::Create(doc(1))).expect("create child");
        let mut child = tables.read(&doc(1)).expect("read");
        child.parent = Some(doc(2));
        assert!(matches!(
            tables.apply(StoreOp::Update(child.clone())),
            Err(AclError::AclNotFound { .. })
        ));

        tables.apply(StoreOp::Create(doc(2))).expect("create parent");
        tables.apply(StoreOp::Update(child)).expect("link");
        assert_eq!(tables.children(&doc(2)).expect("children"), vec![doc(1)]);
        assert!(matches!(
            tables.apply(StoreOp::Delete(doc(2))),
            Err(AclError::ChildrenExist { children: 1, .. })
        ));
        tables.apply(StoreOp::Delete(doc(1))).expect("delete child");
        tables.apply(StoreOp::Delete(doc(2))).expect("delete parent");
        assert_eq!(tables.counts().object_identities, 0);
    }

    #[test]
    fn reindex_restores_lookups_after_serde() {
        let mut tables = AclTables::default();
        tables.apply(StoreOp::Create(doc(7))).expect("create");
        let json = serde_json::to_string(&tables).expect("serialize");
        let mut restored: AclTables = serde_json::from_str(&json).expect("deserialize");
        restored.reindex().expect("reindex");
        assert!(restored.contains(&doc(7)));
        assert!(matches!(
            restored.apply(StoreOp::Create(doc(7))),
            Err(AclError::AlreadyExists { .. })
        ));
    }
}
