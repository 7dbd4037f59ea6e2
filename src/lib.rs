#![deny(clippy::all, clippy::pedantic)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![cfg_attr(
    test,
    allow(
        clippy::useless_vec,
        clippy::uninlined_format_args,
        clippy::cast_possible_truncation
    )
)]
#![allow(clippy::module_name_repetitions)]
//
// Strategic lint exceptions - these are allowed project-wide for pragmatic reasons:
//
// Documentation lints: Many internal/self-documenting functions don't need extensive docs.
// Public APIs should still have proper documentation.
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
//
// Cast safety: counts and offsets are bounded by file sizes and entry counts.
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
//
// Style/complexity
#![allow(clippy::too_many_lines)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::similar_names)]
// e.g., parent_id, child_id, sid_id are intentionally similar
//
// Pattern matching: These pedantic lints often suggest changes that reduce clarity.
#![allow(clippy::manual_let_else)]
#![allow(clippy::match_same_arms)]
//
// Performance/ergonomics trade-offs that are acceptable for this codebase:
#![allow(clippy::needless_pass_by_value)] // Many builders take owned values intentionally
#![allow(clippy::return_self_not_must_use)] // Builder patterns don't need must_use on every method
#![allow(clippy::default_trait_access)]
#![allow(clippy::implicit_hasher)]
#![allow(clippy::should_implement_trait)]
//
// Return value wrapping: Many functions use Result for consistency even when they
// currently can't fail, allowing future error conditions to be added without breaking API.
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::unused_self)]

/// The acl-engine-core crate version (matches `Cargo.toml`).
pub const ACL_ENGINE_CORE_VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod audit;
pub mod cache;
pub mod constants;
pub mod engine;
pub mod error;
pub mod io;
mod registry;
mod sid;
pub mod store;
pub mod types;

pub use audit::{
    AclChangeListener, AuditLogStore, AuditPublisher, AuditRecorder, AuditTrail,
    InMemoryAuditLogStore, JsonlAuditLogStore,
};
pub use cache::{AclCache, CacheStats};
pub use constants::*;
pub use engine::{AclEngine, AclEngineBuilder, ResourceCatalog, StaticResourceCatalog};
pub use error::{AclError, Result};
pub use registry::PermissionRegistry;
pub use sid::SidResolver;
pub use store::{AclStore, FileAclStore, InMemoryAclStore, StoreCounts};
pub use types::{
    AccessControlEntry, AccessSource, AccessibleResources, Acl, AclChangeEvent, AuditLogEntry,
    AuditOperation, CacheConfig, EffectivePermissions, EngineConfig, EngineConfigBuilder,
    InheritanceInfo, ObjectIdentity, ParentDescriptor, Permission, ResourceAccess,
    ResourceDescriptor, ResourceId, Sid, SidSet,
};
