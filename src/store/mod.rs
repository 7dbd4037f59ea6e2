//! Persistence of ACLs behind a narrow trait.
//!
//! Two implementations ship with the crate: [`InMemoryAclStore`] for tests and embedded
//! use, and [`FileAclStore`], which journals every mutation and folds the journal into a
//! JSON snapshot.

mod file;
mod memory;
pub(crate) mod tables;

use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use crate::Result;
use crate::types::{Acl, ObjectIdentity};

pub use file::FileAclStore;
pub use memory::InMemoryAclStore;

/// Row counts per normalized table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreCounts {
    pub sids: usize,
    pub classes: usize,
    pub object_identities: usize,
    pub entries: usize,
}

/// Durable home of every ACL.
///
/// `update` replaces the whole ACL atomically: either every field and entry is written
/// or nothing is.
pub trait AclStore: Send + Sync + Debug {
    /// The full ACL, or [`AclError::AclNotFound`](crate::AclError::AclNotFound).
    fn read(&self, identity: &ObjectIdentity) -> Result<Acl>;

    /// A new empty ACL. Fails with `AlreadyExists` if one is present.
    fn create(&self, identity: &ObjectIdentity) -> Result<Acl>;

    fn update(&self, acl: &Acl) -> Result<()>;

    /// Remove one ACL. Fails with `ChildrenExist` while other ACLs name it as parent.
    fn delete(&self, identity: &ObjectIdentity) -> Result<()>;

    /// ACLs whose parent is `identity`.
    fn children(&self, identity: &ObjectIdentity) -> Result<Vec<ObjectIdentity>>;

    /// Every stored object identity.
    fn identities(&self) -> Result<Vec<ObjectIdentity>>;

    fn counts(&self) -> StoreCounts;
}
