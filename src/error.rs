//! Error taxonomy for the ACL engine.

use thiserror::Error;

use crate::types::ObjectIdentity;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, AclError>;

#[derive(Debug, Error)]
pub enum AclError {
    /// A permission name or mask that the registry does not know.
    #[error("unknown permission: {value}")]
    UnknownPermission { value: String },

    #[error("permission mask {mask} is already registered as {existing}")]
    DuplicateMask { mask: u32, existing: String },

    #[error("permission name {name} is already registered")]
    DuplicatePermissionName { name: String },

    #[error("permission mask {mask} must be a single non-zero bit")]
    InvalidMask { mask: u32 },

    #[error("no ACL exists for {identity}")]
    AclNotFound { identity: ObjectIdentity },

    #[error("an ACL already exists for {identity}")]
    AlreadyExists { identity: ObjectIdentity },

    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },

    #[error("linking {child} under {parent} would create a parent cycle")]
    CyclicParent {
        child: ObjectIdentity,
        parent: ObjectIdentity,
    },

    #[error("{identity} is the parent of {children} other ACL(s)")]
    ChildrenExist {
        identity: ObjectIdentity,
        children: usize,
    },

    #[error("access denied: {reason}")]
    AccessDenied { reason: String },

    #[error("journal corrupted at offset {offset}: {reason}")]
    JournalCorruption { offset: u64, reason: String },

    #[error("serialization failed: {reason}")]
    Serialization { reason: String },

    #[error("lock error: {0}")]
    Lock(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for AclError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            reason: err.to_string(),
        }
    }
}

impl From<bincode::error::EncodeError> for AclError {
    fn from(err: bincode::error::EncodeError) -> Self {
        Self::Serialization {
            reason: err.to_string(),
        }
    }
}

impl From<bincode::error::DecodeError> for AclError {
    fn from(err: bincode::error::DecodeError) -> Self {
        Self::Serialization {
            reason: err.to_string(),
        }
    }
}

impl AclError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// True for the "no ACL" condition the read path recovers from.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::AclNotFound { .. })
    }
}
