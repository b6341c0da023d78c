//! Replaceable wall-clock source and completion-id generation.
//!
//! Response ids are derived from the clock's nanosecond timestamp, so
//! uniqueness is probabilistic: two ids collide only if they are generated
//! in the same nanosecond. That tradeoff is accepted; these ids are exchange
//! identifiers, not durable keys.

use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;

/// A cloneable time source. Production code uses [`Clock::system`]; tests
/// inject [`Clock::fixed`] to make timestamps and ids deterministic.
///
/// The clock is passed into the translators as an explicit capability.
/// There is no process-wide provider; substituting a fixed clock in tests
/// touches no shared state.
#[derive(Clone)]
pub struct Clock {
    provider: Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>,
}

impl Clock {
    /// The real wall clock.
    pub fn system() -> Self {
        Self {
            provider: Arc::new(Utc::now),
        }
    }

    /// A clock frozen at `at`. Every call to [`Clock::now`] returns the same
    /// instant, so translating the same input twice yields identical output.
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self {
            provider: Arc::new(move || at),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.provider)()
    }

    /// Epoch seconds, as used in the `created` field of responses.
    pub fn unix_seconds(&self) -> i64 {
        self.now().timestamp()
    }

    /// A fresh `chatcmpl-<nanos>` identifier.
    pub fn completion_id(&self) -> String {
        let nanos = self.now().timestamp_nanos_opt().unwrap_or_default();
        format!("chatcmpl-{nanos}")
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::system()
    }
}

impl fmt::Debug for Clock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Clock").finish_non_exhaustive()
    }
}
