//! Per-subject exclusive transactions.

use crate::error::{CoreError, CoreResult};
use crate::store::{CellStore, SetOptions};
use celldb_backend::{CellWrite, SubjectData, Timestamp, WriteBatch};
use parking_lot::Mutex;
use std::collections::HashSet;
use tracing::{debug, trace};

/// The set of subjects currently held by open transactions.
///
/// Acquisition is fail-fast: a held subject is reported immediately,
/// there is no queueing. Locks are purely per-subject, so
/// transactions on distinct subjects never block each other.
pub(crate) struct LockTable {
    locked: Mutex<HashSet<String>>,
}

impl LockTable {
    pub(crate) fn new() -> Self {
        Self {
            locked: Mutex::new(HashSet::new()),
        }
    }

    /// Returns true if the subject's lock was acquired.
    pub(crate) fn try_acquire(&self, subject: &str) -> bool {
        self.locked.lock().insert(subject.to_string())
    }

    pub(crate) fn release(&self, subject: &str) {
        self.locked.lock().remove(subject);
    }

    #[cfg(test)]
    pub(crate) fn is_locked(&self, subject: &str) -> bool {
        self.locked.lock().contains(subject)
    }
}

/// An exclusive, atomic staged-mutation session on one subject.
///
/// While the transaction is open no other transaction can be opened on
/// the same subject. `set` and `delete_attributes` stage mutations
/// privately; `resolve` reads through the staged view. Nothing is
/// visible to other readers until [`Transaction::commit`] applies the
/// staged mutations as one atomic step.
///
/// Dropping an uncommitted transaction abandons it: the staged
/// mutations are discarded and the subject's lock is released, even on
/// error exits.
pub struct Transaction {
    store: CellStore,
    subject: String,
    staged: WriteBatch,
    committed: bool,
}

impl CellStore {
    /// Opens a transaction on a subject, acquiring its exclusive lock.
    ///
    /// Acquisition is fail-fast: if another open transaction holds the
    /// subject, this returns [`CoreError::Contention`] immediately
    /// rather than blocking. Layer retry behavior on top with
    /// [`CellStore::retry_transaction`].
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Contention`] if the subject is locked, or
    /// [`CoreError::StoreClosed`].
    pub fn transaction(&self, subject: &str) -> CoreResult<Transaction> {
        self.ensure_open()?;
        if !self.inner.locks.try_acquire(subject) {
            return Err(CoreError::contention(subject));
        }
        trace!(subject, "transaction opened");
        Ok(Transaction {
            store: self.clone(),
            subject: subject.to_string(),
            staged: WriteBatch::new(),
            committed: false,
        })
    }
}

impl Transaction {
    /// Returns the subject this transaction is bound to.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Returns the number of staged operations.
    #[must_use]
    pub fn staged_len(&self) -> usize {
        self.staged.len()
    }

    /// Stages a cell write, stamped with the current wall clock,
    /// replacing prior versions on commit.
    pub fn set(&mut self, predicate: &str, value: impl Into<Vec<u8>>) {
        self.set_with(predicate, value, SetOptions::new());
    }

    /// Stages a cell write with explicit options.
    pub fn set_with(&mut self, predicate: &str, value: impl Into<Vec<u8>>, options: SetOptions) {
        self.staged.write(CellWrite {
            predicate: predicate.to_string(),
            value: value.into(),
            timestamp: options.timestamp.unwrap_or_else(Timestamp::now),
            replace: !options.keep_versions,
        });
    }

    /// Stages deletion of all versions of the named predicates.
    pub fn delete_attributes<P: AsRef<str>>(&mut self, predicates: &[P]) {
        for predicate in predicates {
            self.staged.delete_versions(predicate.as_ref());
        }
    }

    /// Returns the newest version of a predicate as seen through this
    /// transaction's private view: staged mutations first, then the
    /// last committed state.
    ///
    /// # Errors
    ///
    /// Returns an error on backend failure.
    pub fn resolve(&self, predicate: &str) -> CoreResult<Option<(Vec<u8>, Timestamp)>> {
        self.store.ensure_open()?;
        let mut data = self.store.snapshot(&self.subject)?.unwrap_or_else(SubjectData::new);
        data.apply(&self.staged);
        Ok(data
            .newest(predicate)
            .map(|(value, ts)| (value.to_vec(), ts)))
    }

    /// Applies all staged mutations as one atomic step and releases
    /// the subject's lock.
    ///
    /// After commit returns, the staged values are the subject's
    /// current state for every subsequent reader. On error the store
    /// is left in its pre-transaction state; the lock is released
    /// either way.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the batch.
    pub fn commit(mut self) -> CoreResult<()> {
        self.store.ensure_open()?;
        self.store
            .inner
            .backend
            .apply(&self.subject, &self.staged)?;
        self.committed = true;
        debug!(subject = %self.subject, ops = self.staged.len(), "transaction committed");
        Ok(())
        // Drop releases the lock.
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        self.store.inner.locks.release(&self.subject);
        if !self.committed {
            trace!(subject = %self.subject, "transaction abandoned");
        }
    }
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("subject", &self.subject)
            .field("staged", &self.staged.len())
            .finish_non_exhaustive()
    }
}
