//! The `AclEngine` handle: lifecycle, mutation, evaluation and discovery.

mod discovery;
mod evaluation;
pub mod lifecycle;
mod mutation;

pub use discovery::{ResourceCatalog, StaticResourceCatalog};
pub use lifecycle::{AclEngine, AclEngineBuilder};
