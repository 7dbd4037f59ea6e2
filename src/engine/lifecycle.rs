//! Construction and wiring of the [`AclEngine`] handle.
//!
//! Responsibilities:
//! - Assemble store, cache, registry and audit channel from configuration.
//! - Open a durable engine rooted at a directory (store + JSON-lines audit log).
//! - Provide the shared helpers every mutation path uses: persist-then-evict and publish.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::audit::{
    AclChangeListener, AuditLogStore, AuditPublisher, AuditRecorder, AuditTrail,
    InMemoryAuditLogStore, JsonlAuditLogStore,
};
use crate::cache::{AclCache, CacheStats};
use crate::constants::AUDIT_LOG_FILE_NAME;
use crate::registry::PermissionRegistry;
use crate::store::{AclStore, FileAclStore, InMemoryAclStore, StoreCounts};
use crate::types::{
    Acl, AclChangeEvent, AuditOperation, EngineConfig, ObjectIdentity, Permission, Sid,
};
use crate::Result;

/// Primary handle: owns the store, the read-through cache, the permission registry and
/// the audit channel.
///
/// All methods take `&self`; share the engine across threads with `Arc`. Mutations on the
/// same object identity perform a read-modify-write cycle and must be serialized by the
/// caller.
pub struct AclEngine {
    pub(crate) store: Arc<dyn AclStore>,
    pub(crate) cache: AclCache,
    pub(crate) registry: Arc<PermissionRegistry>,
    pub(crate) publisher: AuditPublisher,
    pub(crate) audit_log: Arc<dyn AuditLogStore>,
    pub(crate) config: EngineConfig,
}

impl fmt::Debug for AclEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AclEngine")
            .field("store", &self.store)
            .field("cache", &self.cache)
            .field("permissions", &self.registry.len())
            .field("publisher", &self.publisher)
            .finish_non_exhaustive()
    }
}

impl AclEngine {
    #[must_use]
    pub fn builder() -> AclEngineBuilder {
        AclEngineBuilder::default()
    }

    /// In-memory store, standard permissions, in-memory audit log, default config.
    pub fn in_memory() -> Result<Self> {
        Self::builder().build()
    }

    /// Durable engine rooted at `dir`: ACL snapshot and journal plus a JSON-lines audit log.
    ///
    /// The directory is locked exclusively until the engine is dropped.
    pub fn open<P: AsRef<Path>>(dir: P, config: EngineConfig) -> Result<Self> {
        let dir = dir.as_ref();
        let store = FileAclStore::open(dir, &config)?;
        let audit_log = JsonlAuditLogStore::open(dir.join(AUDIT_LOG_FILE_NAME))?;
        Self::builder()
            .config(config)
            .store(Arc::new(store))
            .audit_log(Arc::new(audit_log))
            .build()
    }

    #[must_use]
    pub fn registry(&self) -> &PermissionRegistry {
        &self.registry
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn AclStore> {
        &self.store
    }

    #[must_use]
    pub fn store_counts(&self) -> StoreCounts {
        self.store.counts()
    }

    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Read access to the audit log backing this engine.
    #[must_use]
    pub fn audit_trail(&self) -> AuditTrail {
        AuditTrail::new(Arc::clone(&self.audit_log))
    }

    /// Add a listener after construction; it sees only later changes.
    pub fn subscribe(&self, listener: Arc<dyn AclChangeListener>) {
        self.publisher.subscribe(listener);
    }

    /// Write `acl` and drop any cached copy before returning.
    pub(crate) fn persist(&self, acl: &Acl) -> Result<()> {
        self.store.update(acl)?;
        self.cache.evict(&acl.identity);
        Ok(())
    }

    pub(crate) fn publish(
        &self,
        operation: AuditOperation,
        identity: &ObjectIdentity,
        sid: Option<&Sid>,
        permissions: Vec<Permission>,
        actor: Option<&str>,
    ) {
        let event = AclChangeEvent {
            operation,
            identity: identity.clone(),
            sid: sid.cloned(),
            permissions,
            actor: self.actor_name(actor).to_string(),
        };
        self.publisher.publish(&event);
    }

    /// The explicit actor, or the configured system actor when none is given.
    pub(crate) fn actor_name<'a>(&'a self, actor: Option<&'a str>) -> &'a str {
        match actor.map(str::trim) {
            Some(name) if !name.is_empty() => name,
            _ => &self.config.system_actor,
        }
    }
}

/// Assembles an [`AclEngine`]; every component has a default.
pub struct AclEngineBuilder {
    config: EngineConfig,
    registry: Option<PermissionRegistry>,
    store: Option<Arc<dyn AclStore>>,
    audit_log: Option<Arc<dyn AuditLogStore>>,
    listeners: Vec<Arc<dyn AclChangeListener>>,
    record_audit: bool,
}

impl Default for AclEngineBuilder {
    fn default() -> Self {
        Self {
            config: EngineConfig::default(),
            registry: None,
            store: None,
            audit_log: None,
            listeners: Vec::new(),
            record_audit: true,
        }
    }
}

impl AclEngineBuilder {
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Defaults to [`PermissionRegistry::standard`].
    pub fn registry(mut self, registry: PermissionRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Defaults to an [`InMemoryAclStore`].
    pub fn store(mut self, store: Arc<dyn AclStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Defaults to an [`InMemoryAuditLogStore`].
    pub fn audit_log(mut self, audit_log: Arc<dyn AuditLogStore>) -> Self {
        self.audit_log = Some(audit_log);
        self
    }

    /// Extra listeners, notified after the audit recorder in the order added.
    pub fn listener(mut self, listener: Arc<dyn AclChangeListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Turn the built-in audit recorder off; listeners still receive events.
    pub fn record_audit(mut self, enabled: bool) -> Self {
        self.record_audit = enabled;
        self
    }

    pub fn build(self) -> Result<AclEngine> {
        let registry = Arc::new(self.registry.unwrap_or_else(PermissionRegistry::standard));
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(InMemoryAclStore::new()));
        let audit_log = self
            .audit_log
            .unwrap_or_else(|| Arc::new(InMemoryAuditLogStore::new()));
        let cache = AclCache::new(&self.config.cache)?;

        let publisher = AuditPublisher::new();
        if self.record_audit {
            publisher.subscribe(Arc::new(AuditRecorder::new(
                Arc::clone(&registry),
                Arc::clone(&audit_log),
            )));
        }
        for listener in self.listeners {
            publisher.subscribe(listener);
        }

        tracing::debug!(
            engine.permissions = registry.len(),
            engine.cache_capacity = self.config.cache.capacity,
            engine.listeners = publisher.listener_count(),
            "acl engine ready"
        );
        Ok(AclEngine {
            store,
            cache,
            registry,
            publisher,
            audit_log,
            config: self.config,
        })
    }
}
