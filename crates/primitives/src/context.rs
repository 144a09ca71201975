// primitives/src/context.rs

use crate::{Address, Amount, Timestamp};
use serde::{Deserialize, Serialize};

/// Caller identity, attached value and current time for one operation.
///
/// Nothing in the workspace reads a wall clock: every time dependent rule
/// (tap rollover, phase lookup) is evaluated against `timestamp`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallContext {
    /// Account invoking the operation
    pub caller: Address,
    /// Value (wei) attached to the call
    pub value: Amount,
    /// Current time in Unix seconds
    pub timestamp: Timestamp,
}

impl CallContext {
    /// Context without attached value
    pub fn new(caller: Address, timestamp: Timestamp) -> Self {
        Self {
            caller,
            value: Amount::zero(),
            timestamp,
        }
    }

    pub fn with_value(mut self, value: Amount) -> Self {
        self.value = value;
        self
    }

    /// Context for a nested call made by `caller` (e.g. a sale contract
    /// calling into the token) at the same instant, without value.
    pub fn forward(&self, caller: Address) -> Self {
        Self::new(caller, self.timestamp)
    }
}
