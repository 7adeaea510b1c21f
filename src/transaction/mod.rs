// ============================================================================
// Transaction Module
// ============================================================================
//
// The session-level unit of work: which handles were created, updated or
// deleted, and whether a concurrency conflict has doomed the transaction.
// Flushing the change set to the store is the caller's business.
//
// ============================================================================

pub mod change;
pub mod state;

pub use change::{ChangeKind, ChangeSet, Enlistment};
pub use state::{Transaction, TransactionId, TransactionState};
