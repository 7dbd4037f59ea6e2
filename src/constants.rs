//! Well-known masks, SID prefixes, and on-disk names.

/// Base permission bits (0-4).
pub const READ_MASK: u32 = 1;
pub const WRITE_MASK: u32 = 1 << 1;
pub const CREATE_MASK: u32 = 1 << 2;
pub const DELETE_MASK: u32 = 1 << 3;
pub const ADMINISTRATION_MASK: u32 = 1 << 4;

/// Custom extension bits.
pub const SHARE_MASK: u32 = 1 << 5;
pub const APPROVE_MASK: u32 = 1 << 6;

/// Authority prefix applied to role names.
pub const ROLE_PREFIX: &str = "ROLE_";
/// Authority prefix applied to group names.
pub const GROUP_PREFIX: &str = "GROUP_";
/// Authority required to read the full audit trail.
pub const AUDIT_READER_AUTHORITY: &str = "ROLE_ADMIN";

/// Actor recorded for mutations with no authenticated caller.
pub const DEFAULT_SYSTEM_ACTOR: &str = "system";
/// Display name used when a mask has no registered name.
pub const UNKNOWN_PERMISSION_NAME: &str = "UNKNOWN";
/// Display name used when the resource catalog has no entry.
pub const UNKNOWN_RESOURCE_NAME: &str = "Unknown";

pub const DEFAULT_CACHE_CAPACITY: usize = 2048;
pub const DEFAULT_CACHE_TTL_MS: u64 = 15 * 60 * 1000;
pub const DEFAULT_CACHE_TTI_MS: u64 = 5 * 60 * 1000;
pub const DEFAULT_COMPACT_AFTER_RECORDS: u64 = 4096;

/// File names inside a durable store directory.
pub const SNAPSHOT_FILE_NAME: &str = "acl-snapshot.json";
pub const JOURNAL_FILE_NAME: &str = "acl-journal.log";
pub const LOCK_FILE_NAME: &str = "acl-store.lock";
pub const AUDIT_LOG_FILE_NAME: &str = "acl-audit.jsonl";
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;
