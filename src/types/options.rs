//! Engine configuration with serde defaults and a fluent builder.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::Result;
use crate::constants::{
    DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_TTI_MS, DEFAULT_CACHE_TTL_MS,
    DEFAULT_COMPACT_AFTER_RECORDS, DEFAULT_SYSTEM_ACTOR,
};

fn default_true() -> bool {
    true
}

fn default_capacity() -> usize {
    DEFAULT_CACHE_CAPACITY
}

fn default_ttl_ms() -> Option<u64> {
    Some(DEFAULT_CACHE_TTL_MS)
}

fn default_tti_ms() -> Option<u64> {
    Some(DEFAULT_CACHE_TTI_MS)
}

fn default_system_actor() -> String {
    DEFAULT_SYSTEM_ACTOR.to_string()
}

fn default_compact_after_records() -> u64 {
    DEFAULT_COMPACT_AFTER_RECORDS
}

/// Bounds of the read-through ACL cache. `None` disables a time bound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    /// Expire an entry this long after it was written.
    #[serde(default = "default_ttl_ms")]
    pub time_to_live_ms: Option<u64>,
    /// Expire an entry this long after it was last read.
    #[serde(default = "default_tti_ms")]
    pub time_to_idle_ms: Option<u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            time_to_live_ms: default_ttl_ms(),
            time_to_idle_ms: default_tti_ms(),
        }
    }
}

impl CacheConfig {
    #[must_use]
    pub fn time_to_live(&self) -> Option<Duration> {
        self.time_to_live_ms.map(Duration::from_millis)
    }

    #[must_use]
    pub fn time_to_idle(&self) -> Option<Duration> {
        self.time_to_idle_ms.map(Duration::from_millis)
    }
}

/// Tunables for an [`AclEngine`](crate::AclEngine) and its durable store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub cache: CacheConfig,
    /// Actor recorded in the audit trail when a caller passes no identity.
    #[serde(default = "default_system_actor")]
    pub system_actor: String,
    #[serde(default = "default_true")]
    pub reject_parent_cycles: bool,
    /// fsync the journal after each append.
    #[serde(default = "default_true")]
    pub journal_sync: bool,
    /// Fold the journal into a snapshot after this many appends (0 = never).
    #[serde(default = "default_compact_after_records")]
    pub compact_after_records: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            system_actor: default_system_actor(),
            reject_parent_cycles: true,
            journal_sync: true,
            compact_after_records: default_compact_after_records(),
        }
    }
}

impl EngineConfig {
    #[must_use]
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Parse a JSON document; absent fields take their defaults.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = fs_err::read_to_string(path.as_ref())?;
        Self::from_json_str(&raw)
    }
}

#[derive(Debug, Clone, Default)]
pub struct EngineConfigBuilder {
    inner: EngineConfig,
}

impl EngineConfigBuilder {
    #[must_use]
    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.inner.cache.capacity = capacity;
        self
    }

    #[must_use]
    pub fn cache_time_to_live(mut self, ttl: Option<Duration>) -> Self {
        self.inner.cache.time_to_live_ms = ttl.map(duration_ms);
        self
    }

    #[must_use]
    pub fn cache_time_to_idle(mut self, tti: Option<Duration>) -> Self {
        self.inner.cache.time_to_idle_ms = tti.map(duration_ms);
        self
    }

    pub fn system_actor<S: Into<String>>(mut self, actor: S) -> Self {
        self.inner.system_actor = actor.into();
        self
    }

    #[must_use]
    pub fn reject_parent_cycles(mut self, enabled: bool) -> Self {
        self.inner.reject_parent_cycles = enabled;
        self
    }

    #[must_use]
    pub fn journal_sync(mut self, enabled: bool) -> Self {
        self.inner.journal_sync = enabled;
        self
    }

    #[must_use]
    pub fn compact_after_records(mut self, records: u64) -> Self {
        self.inner.compact_after_records = records;
        self
    }

    #[must_use]
    pub fn build(self) -> EngineConfig {
        self.inner
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
