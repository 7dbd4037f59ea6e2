//! Maps users, roles, groups, and raw authorities to canonical SIDs.

use crate::constants::{GROUP_PREFIX, ROLE_PREFIX};
use crate::types::{Sid, SidSet};
use crate::{AclError, Result};

/// Stateless SID construction.
#[derive(Debug, Clone, Copy, Default)]
pub struct SidResolver;

impl SidResolver {
    #[must_use]
    pub fn principal(username: &str) -> Sid {
        Sid::Principal(username.to_string())
    }

    /// `ROLE_<name>`.
    #[must_use]
    pub fn role(role_name: &str) -> Sid {
        Sid::Authority(format!("{ROLE_PREFIX}{role_name}"))
    }

    /// `GROUP_<name>`.
    #[must_use]
    pub fn group(group_name: &str) -> Sid {
        Sid::Authority(format!("{GROUP_PREFIX}{group_name}"))
    }

    #[must_use]
    pub fn authority(raw_name: &str) -> Sid {
        Sid::Authority(raw_name.to_string())
    }

    /// The caller's own principal plus one authority SID per granted authority.
    pub fn sids_for_caller<I, S>(principal_name: &str, authority_names: I) -> SidSet
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut sids = SidSet::new();
        sids.insert(Self::principal(principal_name));
        sids.extend(
            authority_names
                .into_iter()
                .map(|name| Self::authority(name.as_ref())),
        );
        sids
    }

    /// An unauthenticated caller holds no SIDs and is denied everything.
    #[must_use]
    pub fn anonymous() -> SidSet {
        SidSet::new()
    }

    /// Resolve a boundary subject descriptor such as `("group", "ENGINEERING")`.
    pub fn resolve(subject_type: &str, name: &str) -> Result<Sid> {
        if name.trim().is_empty() {
            return Err(AclError::invalid("subject name must not be empty"));
        }
        match subject_type.trim().to_ascii_lowercase().as_str() {
            "user" | "principal" => Ok(Self::principal(name)),
            "role" => Ok(Self::role(name)),
            "group" => Ok(Self::group(name)),
            "authority" => Ok(Self::authority(name)),
            other => Err(AclError::invalid(format!("unknown subject type: {other}"))),
        }
    }
}
