//! Permission bit flags.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{
    ADMINISTRATION_MASK, APPROVE_MASK, CREATE_MASK, DELETE_MASK, READ_MASK, SHARE_MASK,
    WRITE_MASK,
};

/// A single permission: one mask bit plus a display code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Permission {
    pub mask: u32,
    pub code: char,
}

impl Permission {
    pub const READ: Self = Self::new(READ_MASK, 'R');
    pub const WRITE: Self = Self::new(WRITE_MASK, 'W');
    pub const CREATE: Self = Self::new(CREATE_MASK, 'C');
    pub const DELETE: Self = Self::new(DELETE_MASK, 'D');
    pub const ADMINISTRATION: Self = Self::new(ADMINISTRATION_MASK, 'A');
    pub const SHARE: Self = Self::new(SHARE_MASK, 'S');
    pub const APPROVE: Self = Self::new(APPROVE_MASK, 'A');

    #[must_use]
    pub const fn new(mask: u32, code: char) -> Self {
        Self { mask, code }
    }

    /// Masks must be a single set bit.
    #[must_use]
    pub const fn has_valid_mask(&self) -> bool {
        self.mask.is_power_of_two()
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.code, self.mask)
    }
}
