use parking_lot::RwLock;

use super::tables::{AclTables, StoreOp};
use super::{AclStore, StoreCounts};
use crate::Result;
use crate::types::{Acl, ObjectIdentity};

/// Process-local store. Contents vanish with the value.
#[derive(Debug, Default)]
pub struct InMemoryAclStore {
    tables: RwLock<AclTables>,
}

impl InMemoryAclStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl AclStore for InMemoryAclStore {
    fn read(&self, identity: &ObjectIdentity) -> Result<Acl> {
        self.tables.read().read(identity)
    }

    fn create(&self, identity: &ObjectIdentity) -> Result<Acl> {
        let mut tables = self.tables.write();
        tables.apply(StoreOp::Create(identity.clone()))?;
        tables.read(identity)
    }

    fn update(&self, acl: &Acl) -> Result<()> {
        self.tables.write().apply(StoreOp::Update(acl.clone()))
    }

    fn delete(&self, identity: &ObjectIdentity) -> Result<()> {
        self.tables.write().apply(StoreOp::Delete(identity.clone()))
    }

    fn children(&self, identity: &ObjectIdentity) -> Result<Vec<ObjectIdentity>> {
        self.tables.read().children(identity)
    }

    fn identities(&self) -> Result<Vec<ObjectIdentity>> {
        self.tables.read().identities()
    }

    fn counts(&self) -> StoreCounts {
        self.tables.read().counts()
    }
}
