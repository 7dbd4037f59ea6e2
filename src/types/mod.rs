//! Public types exposed by the `acl-engine-core` crate.

pub mod acl;
pub mod audit;
pub mod discovery;
pub mod identity;
pub mod options;
pub mod permission;
pub mod sid;

pub use acl::{AccessControlEntry, Acl};
pub use audit::{AclChangeEvent, AuditLogEntry, AuditOperation};
pub use discovery::{
    AccessSource, AccessibleResources, EffectivePermissions, InheritanceInfo, ParentDescriptor,
    ResourceAccess, ResourceDescriptor,
};
pub use identity::{ObjectIdentity, ResourceId};
pub use options::{CacheConfig, EngineConfig, EngineConfigBuilder};
pub use permission::Permission;
pub use sid::{Sid, SidSet};
