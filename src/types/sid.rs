//! Subject identifiers.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A subject an entry can be granted to.
///
/// Two SIDs are equal iff they carry the same variant and the same string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sid {
    /// A single user, keyed by username.
    Principal(String),
    /// A granted authority: `ROLE_*`, `GROUP_*`, or any raw authority string.
    Authority(String),
}

impl Sid {
    /// The underlying principal name or authority string.
    #[must_use]
    pub fn value(&self) -> &str {
        match self {
            Self::Principal(value) | Self::Authority(value) => value,
        }
    }

    #[must_use]
    pub fn is_principal(&self) -> bool {
        matches!(self, Self::Principal(_))
    }
}

impl fmt::Display for Sid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Principal(value) => write!(f, "principal:{value}"),
            Self::Authority(value) => write!(f, "authority:{value}"),
        }
    }
}

/// The OR-set of SIDs representing one caller during evaluation.
pub type SidSet = BTreeSet<Sid>;
