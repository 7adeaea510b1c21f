use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::{Oid, ResolveState, Version};

/// Detected version mismatch between what this session last saw and what
/// the store now reports. Carried on the transaction as its abort cause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConcurrencyFault {
    pub user: String,
    pub oid: Oid,
    pub expected: Version,
    pub actual: Version,
}

impl fmt::Display for ConcurrencyFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} was changed by {} (expected version {}, found {}) while {} was working on it",
            self.oid,
            self.actual.user().unwrap_or("another user"),
            self.expected.sequence(),
            self.actual.sequence(),
            self.user
        )
    }
}

/// Broad classification of faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// Version mismatch; the user may retry.
    Concurrency,
    /// Synchronization defect; never retried.
    InternalConsistency,
    /// Bad input from the caller.
    IdentityArgument,
}

#[derive(Error, Debug, Clone)]
pub enum SyncError {
    #[error("Concurrency conflict: {0}")]
    Concurrency(ConcurrencyFault),

    #[error("Invalid resolve state transition for {subject}: {from} -> {to}")]
    InvalidTransition {
        subject: String,
        from: ResolveState,
        to: ResolveState,
    },

    #[error("Object store and framework out of agreement: {0}")]
    OutOfAgreement(String),

    #[error("Malformed oid '{input}': {reason}")]
    MalformedOid { input: String, reason: String },

    #[error("No specification registered for type '{0}'")]
    UnknownType(String),

    #[error("Type '{object_type}' is not a {expected}")]
    WrongKind { object_type: String, expected: String },

    #[error("Object not found: {0}")]
    ObjectNotFound(String),

    #[error("No transaction in progress: {0}")]
    NoTransaction(String),

    #[error("Transaction error: {0}")]
    TransactionError(String),

    #[error("Object store error: {0}")]
    Store(String),

    #[error("Lock error: {0}")]
    LockError(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SyncError {
    pub fn kind(&self) -> FaultKind {
        match self {
            Self::Concurrency(_) => FaultKind::Concurrency,
            Self::MalformedOid { .. }
            | Self::UnknownType(_)
            | Self::WrongKind { .. }
            | Self::ObjectNotFound(_)
            | Self::Config(_) => FaultKind::IdentityArgument,
            Self::InvalidTransition { .. }
            | Self::OutOfAgreement(_)
            | Self::NoTransaction(_)
            | Self::TransactionError(_)
            | Self::Store(_)
            | Self::LockError(_) => FaultKind::InternalConsistency,
        }
    }

    /// Only concurrency faults are meant to be shown to end users.
    pub fn is_user_recoverable(&self) -> bool {
        self.kind() == FaultKind::Concurrency
    }

    pub(crate) fn malformed_oid(input: &str, reason: impl Into<String>) -> Self {
        Self::MalformedOid {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;

impl<T> From<std::sync::PoisonError<T>> for SyncError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_classification() {
        let fault = ConcurrencyFault {
            user: "sven".into(),
            oid: Oid::persistent("Customer", "7"),
            expected: Version::new(1),
            actual: Version::new(2),
        };
        assert!(SyncError::Concurrency(fault).is_user_recoverable());
        assert_eq!(
            SyncError::UnknownType("Nope".into()).kind(),
            FaultKind::IdentityArgument
        );
        assert_eq!(
            SyncError::OutOfAgreement("x".into()).kind(),
            FaultKind::InternalConsistency
        );
    }

    #[test]
    fn test_concurrency_fault_message_names_oid() {
        let fault = ConcurrencyFault {
            user: "sven".into(),
            oid: Oid::persistent("Customer", "7"),
            expected: Version::new(1),
            actual: Version::new(2).with_user("dick"),
        };
        let msg = SyncError::Concurrency(fault).to_string();
        assert!(msg.contains("Customer:7"));
        assert!(msg.contains("dick"));
    }
}
