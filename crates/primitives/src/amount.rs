// primitives/src/amount.rs

use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Errors produced while building amounts from external input
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("Invalid amount: {0}")]
    Parse(String),

    #[error("Amount exceeds 256 bits")]
    OutOfRange,
}

fn max_raw() -> &'static BigUint {
    static MAX: OnceLock<BigUint> = OnceLock::new();
    MAX.get_or_init(|| BigUint::from(2u32).pow(256) - 1u32)
}

/// Token or value amount with uint256 semantics.
///
/// Every arithmetic helper is checked: a result above `2^256 - 1` (or below
/// zero) yields `None` instead of wrapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(BigUint);

impl Amount {
    /// Wrap a raw value, rejecting anything wider than 256 bits
    pub fn new(value: BigUint) -> Option<Self> {
        if &value > max_raw() {
            None
        } else {
            Some(Self(value))
        }
    }

    pub fn zero() -> Self {
        Self(BigUint::zero())
    }

    pub fn from_u64(value: u64) -> Self {
        Self(BigUint::from(value))
    }

    pub fn from_u128(value: u128) -> Self {
        Self(BigUint::from(value))
    }

    /// Largest representable amount (`2^256 - 1`)
    pub fn max_value() -> Self {
        Self(max_raw().clone())
    }

    /// `10^exp`
    pub fn pow10(exp: u32) -> Self {
        Self(BigUint::from(10u32).pow(exp))
    }

    pub fn inner(&self) -> &BigUint {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn to_u128(&self) -> Option<u128> {
        self.0.to_u128()
    }

    pub fn checked_add(&self, other: &Amount) -> Option<Amount> {
        Amount::new(&self.0 + &other.0)
    }

    pub fn checked_sub(&self, other: &Amount) -> Option<Amount> {
        if self.0 < other.0 {
            None
        } else {
            Some(Amount(&self.0 - &other.0))
        }
    }

    pub fn checked_mul(&self, other: &Amount) -> Option<Amount> {
        Amount::new(&self.0 * &other.0)
    }

    /// Truncating division; `None` on division by zero
    pub fn checked_div(&self, other: &Amount) -> Option<Amount> {
        if other.is_zero() {
            None
        } else {
            Some(Amount(&self.0 / &other.0))
        }
    }

    /// Remainder of truncating division; `None` on division by zero
    pub fn checked_rem(&self, other: &Amount) -> Option<Amount> {
        if other.is_zero() {
            None
        } else {
            Some(Amount(&self.0 % &other.0))
        }
    }

    pub fn saturating_sub(&self, other: &Amount) -> Amount {
        self.checked_sub(other).unwrap_or_else(Amount::zero)
    }
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Amount::from_u64(value)
    }
}

impl From<u128> for Amount {
    fn from(value: u128) -> Self {
        Amount::from_u128(value)
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let cleaned: String = s.trim().chars().filter(|c| *c != '_').collect();
        let value = BigUint::from_str(&cleaned).map_err(|e| AmountError::Parse(format!("{}: {}", s, e)))?;
        Amount::new(value).ok_or(AmountError::OutOfRange)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

struct AmountVisitor;

impl<'de> de::Visitor<'de> for AmountVisitor {
    type Value = Amount;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a non-negative integer or a decimal string")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Amount, E> {
        Ok(Amount::from_u64(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Amount, E> {
        u64::try_from(v)
            .map(Amount::from_u64)
            .map_err(|_| E::custom("amount must not be negative"))
    }

    fn visit_u128<E: de::Error>(self, v: u128) -> Result<Amount, E> {
        Ok(Amount::from_u128(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Amount, E> {
        Amount::from_str(v).map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(AmountVisitor)
    }
}
