//! Condition codes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The N/Z/P condition flags.
///
/// Exactly one flag is ever set. The discriminants are the PSR bit
/// positions, which are also the `nzp` field layout of `BR`.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum ConditionCode {
    /// Negative (bit 15 set)
    Negative = 0b100,
    /// Zero
    Zero = 0b010,
    /// Positive (nonzero, bit 15 clear)
    Positive = 0b001,
}

impl ConditionCode {
    /// Derive the condition code for a register value.
    #[inline]
    pub const fn from_value(value: u16) -> Self {
        if value == 0 {
            ConditionCode::Zero
        } else if value & 0x8000 != 0 {
            ConditionCode::Negative
        } else {
            ConditionCode::Positive
        }
    }

    /// PSR bits for this flag.
    #[inline]
    pub const fn bits(self) -> u16 {
        self as u16
    }

    /// Does this flag satisfy a `BR` mask?
    #[inline]
    pub const fn matches(self, nzp: u16) -> bool {
        self.bits() & nzp != 0
    }
}

impl Default for ConditionCode {
    fn default() -> Self {
        ConditionCode::Zero
    }
}

impl fmt::Debug for ConditionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = match self {
            ConditionCode::Negative => 'N',
            ConditionCode::Zero => 'Z',
            ConditionCode::Positive => 'P',
        };
        write!(f, "{}", c)
    }
}
