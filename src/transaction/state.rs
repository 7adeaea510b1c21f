// ============================================================================
// Transaction State Management
// ============================================================================
//
// Each transaction moves through defined states:
//
//   InProgress ──commit──> Committed
//     │    │
//     │    └──set_abort_cause──> MustAbort ──commit/abort──> Aborted
//     └──abort──> Aborted
//
// A transaction in MustAbort keeps accepting enlistments so the current
// operation can finish; it can never commit.
//
// ============================================================================

use super::{ChangeKind, ChangeSet};
use crate::adapter::Handle;
use crate::core::{ConcurrencyFault, Result, SyncError};
use std::sync::atomic::{AtomicU64, Ordering};

/// Global transaction ID counter
static NEXT_TXN_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransactionId(pub u64);

impl TransactionId {
    /// Generate a new unique transaction ID
    pub fn new() -> Self {
        TransactionId(NEXT_TXN_ID.fetch_add(1, Ordering::SeqCst))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "txn_{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    InProgress,
    /// An abort cause has been recorded; commit is no longer possible.
    MustAbort,
    Committed,
    Aborted,
}

impl TransactionState {
    /// Check if the transaction still accepts enlistments
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            TransactionState::InProgress | TransactionState::MustAbort
        )
    }
}

impl std::fmt::Display for TransactionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionState::InProgress => write!(f, "IN_PROGRESS"),
            TransactionState::MustAbort => write!(f, "MUST_ABORT"),
            TransactionState::Committed => write!(f, "COMMITTED"),
            TransactionState::Aborted => write!(f, "ABORTED"),
        }
    }
}

/// The unit of work a session's synchronizer enlists changes into.
#[derive(Debug)]
pub struct Transaction {
    id: TransactionId,
    state: TransactionState,
    changes: ChangeSet,
    abort_cause: Option<ConcurrencyFault>,
}

impl Transaction {
    pub fn new(id: TransactionId) -> Self {
        Self {
            id,
            state: TransactionState::InProgress,
            changes: ChangeSet::new(),
            abort_cause: None,
        }
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    pub fn changes(&self) -> &ChangeSet {
        &self.changes
    }

    pub fn abort_cause(&self) -> Option<&ConcurrencyFault> {
        self.abort_cause.as_ref()
    }

    /// # Errors
    /// Returns error if transaction is not active
    pub fn enlist(&mut self, kind: ChangeKind, handle: &Handle) -> Result<()> {
        if !self.state.is_active() {
            return Err(SyncError::TransactionError(format!(
                "Cannot enlist {} as {}: transaction {} is {}",
                handle, kind, self.id, self.state
            )));
        }
        self.changes.enlist(kind, handle);
        Ok(())
    }

    /// Records why the transaction must abort. The first cause wins.
    pub fn set_abort_cause(&mut self, fault: ConcurrencyFault) -> Result<()> {
        if !self.state.is_active() {
            return Err(SyncError::TransactionError(format!(
                "Cannot set abort cause: transaction {} is {}",
                self.id, self.state
            )));
        }
        if self.abort_cause.is_none() {
            self.abort_cause = Some(fault);
        }
        self.state = TransactionState::MustAbort;
        Ok(())
    }

    /// # Errors
    /// Fails if the transaction is not in progress; a transaction with an
    /// abort cause is aborted and the cause returned.
    pub fn commit(&mut self) -> Result<()> {
        let state = self.state;
        match state {
            TransactionState::InProgress => {
                self.state = TransactionState::Committed;
                Ok(())
            }
            TransactionState::MustAbort => {
                self.state = TransactionState::Aborted;
                self.changes.clear();
                match self.abort_cause.clone() {
                    Some(fault) => Err(SyncError::Concurrency(fault)),
                    None => Err(SyncError::TransactionError(format!(
                        "Transaction {} was marked for abort",
                        self.id
                    ))),
                }
            }
            _ => Err(SyncError::TransactionError(format!(
                "Cannot commit: transaction {} is already {}",
                self.id, state
            ))),
        }
    }

    /// Mark transaction as aborted and discard changes
    pub fn abort(&mut self) -> Result<()> {
        if !self.state.is_active() {
            return Err(SyncError::TransactionError(format!(
                "Cannot abort: transaction {} is already {}",
                self.id, self.state
            )));
        }
        self.changes.clear();
        self.state = TransactionState::Aborted;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Oid, Version};

    fn fault() -> ConcurrencyFault {
        ConcurrencyFault {
            user: "ann".into(),
            oid: Oid::persistent("Order", "1"),
            expected: Version::new(1),
            actual: Version::new(2),
        }
    }

    #[test]
    fn test_transaction_id_generation() {
        let id1 = TransactionId::new();
        let id2 = TransactionId::new();
        assert!(id2.as_u64() > id1.as_u64());
    }

    #[test]
    fn test_transaction_lifecycle() {
        let mut txn = Transaction::new(TransactionId::new());
        assert!(txn.state().is_active());
        txn.commit().unwrap();
        assert_eq!(txn.state(), TransactionState::Committed);
        assert!(txn.commit().is_err());
    }

    #[test]
    fn test_abort_cause_prevents_commit() {
        let mut txn = Transaction::new(TransactionId::new());
        txn.set_abort_cause(fault()).unwrap();
        assert_eq!(txn.state(), TransactionState::MustAbort);

        let err = txn.commit().unwrap_err();
        assert!(matches!(err, SyncError::Concurrency(f) if f == fault()));
        assert_eq!(txn.state(), TransactionState::Aborted);
    }

    #[test]
    fn test_first_abort_cause_wins() {
        let mut txn = Transaction::new(TransactionId::new());
        txn.set_abort_cause(fault()).unwrap();
        let mut later = fault();
        later.oid = Oid::persistent("Order", "2");
        txn.set_abort_cause(later).unwrap();
        assert_eq!(txn.abort_cause(), Some(&fault()));
    }

    #[test]
    fn test_cannot_abort_twice() {
        let mut txn = Transaction::new(TransactionId::new());
        txn.abort().unwrap();
        assert!(txn.abort().is_err());
    }
}
