//! Currency amounts in the network's smallest unit.

use std::fmt;
use std::str::FromStr;

use alloy_primitives::U256;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TransactionError;

/// Winston per whole token (10^12).
pub const WINSTON_PER_AR: u64 = 1_000_000_000_000;

/// A non-negative amount of winston.
///
/// Amounts are unbounded on the wire, so this wraps a [`U256`]. The textual
/// form is plain decimal, which is also how amounts enter the signature.
///
/// ```
/// use weft_transaction::Winston;
///
/// let fee: Winston = "1500000".parse().unwrap();
/// assert_eq!(fee.to_string(), "1500000");
/// assert!("-1".parse::<Winston>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Winston(U256);

impl Winston {
    /// Zero winston
    pub const ZERO: Self = Self(U256::ZERO);

    /// Create an amount from a u64
    pub const fn new(amount: u64) -> Self {
        Self(U256::from_limbs([amount, 0, 0, 0]))
    }

    /// Convert whole tokens to winston
    pub fn from_ar(ar: u64) -> Self {
        Self(U256::from(ar) * U256::from(WINSTON_PER_AR))
    }

    /// The amount as a 256-bit integer
    #[inline]
    pub const fn as_u256(&self) -> U256 {
        self.0
    }

    /// Whether the amount is zero
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Add, returning `None` on overflow
    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }
}

impl From<u64> for Winston {
    fn from(amount: u64) -> Self {
        Self::new(amount)
    }
}

impl From<U256> for Winston {
    fn from(amount: U256) -> Self {
        Self(amount)
    }
}

impl fmt::Display for Winston {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for Winston {
    type Err = TransactionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(TransactionError::invalid_field("winston", "empty amount"));
        }
        if !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(TransactionError::invalid_field(
                "winston",
                format!("`{s}` is not a non-negative decimal integer"),
            ));
        }
        U256::from_str_radix(s, 10)
            .map(Self)
            .map_err(|e| TransactionError::invalid_field("winston", e.to_string()))
    }
}

impl Serialize for Winston {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Winston {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
