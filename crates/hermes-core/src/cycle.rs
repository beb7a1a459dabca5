//! Recursion guard for hook chains.
//!
//! A hook may call back into the gateway, which may in turn invoke another
//! hook. The gateway passes a `cycleCounter` on every such nested call and
//! Hermes refuses to go on once the counter reaches the ceiling.

use crate::error::{HookError, HookResult};
use serde::{Deserialize, Serialize};

/// Ceiling used when none is configured.
pub const DEFAULT_RECURSION_LIMIT: u32 = 16;

/// Name of the form field carrying the inbound counter.
pub const CYCLE_COUNTER_FIELD: &str = "cycleCounter";

/// Header used to forward the counter on nested gateway calls.
pub const CYCLE_COUNTER_HEADER: &str = "Wg-Cycle-Counter";

/// Number of times a request chain has re-entered the gateway.
///
/// Absent on the first external call, which is treated as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CycleCounter(u32);

impl CycleCounter {
    /// Creates a counter with the given value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }

    /// Checks the counter against `limit` and returns the value to forward.
    ///
    /// Fails once the counter has reached `limit`.
    ///
    /// ```
    /// use hermes_core::CycleCounter;
    ///
    /// assert_eq!(CycleCounter::new(15).check_and_advance(16).unwrap().value(), 16);
    /// assert!(CycleCounter::new(16).check_and_advance(16).is_err());
    /// ```
    pub fn check_and_advance(self, limit: u32) -> HookResult<Self> {
        if self.0 >= limit {
            return Err(HookError::recursion_limit(limit));
        }
        Ok(Self(self.0 + 1))
    }

    /// Renders the counter as a header value.
    pub fn to_header_value(self) -> String {
        self.0.to_string()
    }
}

impl From<u32> for CycleCounter {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for CycleCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Free-function form of [`CycleCounter::check_and_advance`].
///
/// A missing counter counts as zero.
pub fn check_and_advance(counter: Option<u32>, limit: u32) -> HookResult<u32> {
    CycleCounter::new(counter.unwrap_or(0))
        .check_and_advance(limit)
        .map(CycleCounter::value)
}
