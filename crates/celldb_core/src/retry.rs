//! Bounded-retry transaction acquisition.

use crate::error::{CoreError, CoreResult};
use crate::store::CellStore;
use crate::transaction::Transaction;
use std::time::Duration;
use tracing::{trace, warn};

/// Attempt budget and inter-attempt delay for
/// [`CellStore::retry_transaction_with`].
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum transaction-open attempts before giving up.
    pub max_attempts: u32,
    /// Delay handed to the sleep function between attempts.
    pub delay: Duration,
}

impl RetryPolicy {
    /// Creates a policy.
    #[must_use]
    pub const fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(10, Duration::from_millis(500))
    }
}

impl CellStore {
    /// Repeatedly attempts to open a transaction on `subject` and run
    /// `callback` inside it, committing on normal return.
    ///
    /// Contention failures sleep for the configured delay and retry,
    /// up to the configured attempt budget; exhaustion fails with
    /// [`CoreError::RetryExceeded`]. Errors raised by the callback
    /// itself propagate immediately with the lock released, without
    /// consuming a retry attempt.
    ///
    /// Uses the store's [`crate::Config`] policy and a real
    /// `thread::sleep`. For deterministic tests, use
    /// [`CellStore::retry_transaction_with`] and inject the sleep.
    ///
    /// # Errors
    ///
    /// [`CoreError::RetryExceeded`] on a consumed attempt budget; any
    /// callback or commit error as-is.
    pub fn retry_transaction<T, F>(&self, subject: &str, callback: F) -> CoreResult<T>
    where
        F: FnMut(&mut Transaction) -> CoreResult<T>,
    {
        let policy = RetryPolicy::new(
            self.config().retry_max_attempts,
            self.config().retry_delay,
        );
        self.retry_transaction_with(subject, policy, std::thread::sleep, callback)
    }

    /// [`CellStore::retry_transaction`] with an explicit policy and an
    /// injectable sleep function.
    ///
    /// The sleep function is called once after every contended
    /// attempt, including the last.
    ///
    /// # Errors
    ///
    /// As for [`CellStore::retry_transaction`].
    pub fn retry_transaction_with<T, F, S>(
        &self,
        subject: &str,
        policy: RetryPolicy,
        mut sleep: S,
        mut callback: F,
    ) -> CoreResult<T>
    where
        F: FnMut(&mut Transaction) -> CoreResult<T>,
        S: FnMut(Duration),
    {
        for attempt in 1..=policy.max_attempts {
            match self.transaction(subject) {
                Ok(mut txn) => {
                    // A callback error drops the transaction, which
                    // releases the lock, and propagates immediately.
                    let value = callback(&mut txn)?;
                    txn.commit()?;
                    return Ok(value);
                }
                Err(err) if err.is_contention() => {
                    trace!(subject, attempt, "transaction contended, retrying");
                    sleep(policy.delay);
                }
                Err(err) => return Err(err),
            }
        }
        warn!(subject, attempts = policy.max_attempts, "retry budget exhausted");
        Err(CoreError::RetryExceeded)
    }
}
