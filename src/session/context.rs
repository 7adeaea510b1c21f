use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

/// Whether a detected version mismatch is a fault or merely logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConcurrencyChecking {
    Check,
    NoCheck,
}

impl ConcurrencyChecking {
    pub fn is_checking(&self) -> bool {
        matches!(self, ConcurrencyChecking::Check)
    }
}

/// Per-session state threaded through every synchronizer call: who is
/// working, and whether concurrency checking is currently on.
#[derive(Debug)]
pub struct InteractionContext {
    interaction_id: Uuid,
    user: String,
    checking: AtomicBool,
}

impl InteractionContext {
    pub fn new(user: impl Into<String>, mode: ConcurrencyChecking) -> Self {
        Self {
            interaction_id: Uuid::new_v4(),
            user: user.into(),
            checking: AtomicBool::new(mode.is_checking()),
        }
    }

    pub fn interaction_id(&self) -> Uuid {
        self.interaction_id
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn concurrency_checking(&self) -> ConcurrencyChecking {
        if self.checking.load(Ordering::SeqCst) {
            ConcurrencyChecking::Check
        } else {
            ConcurrencyChecking::NoCheck
        }
    }

    /// Runs `f` with the given mode, restoring the previous mode afterwards,
    /// including when `f` fails or panics.
    pub fn with_concurrency_checking<R>(&self, mode: ConcurrencyChecking, f: impl FnOnce() -> R) -> R {
        let _restore = ModeGuard {
            context: self,
            previous: self.checking.swap(mode.is_checking(), Ordering::SeqCst),
        };
        f()
    }
}

struct ModeGuard<'a> {
    context: &'a InteractionContext,
    previous: bool,
}

impl Drop for ModeGuard<'_> {
    fn drop(&mut self) {
        self.context.checking.store(self.previous, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scoped_mode_is_restored() {
        let ctx = InteractionContext::new("ann", ConcurrencyChecking::Check);
        let seen = ctx.with_concurrency_checking(ConcurrencyChecking::NoCheck, || {
            ctx.concurrency_checking()
        });
        assert_eq!(seen, ConcurrencyChecking::NoCheck);
        assert_eq!(ctx.concurrency_checking(), ConcurrencyChecking::Check);
    }

    #[test]
    fn test_nested_scopes_unwind_in_order() {
        let ctx = InteractionContext::new("ann", ConcurrencyChecking::NoCheck);
        ctx.with_concurrency_checking(ConcurrencyChecking::Check, || {
            ctx.with_concurrency_checking(ConcurrencyChecking::NoCheck, || {
                assert_eq!(ctx.concurrency_checking(), ConcurrencyChecking::NoCheck);
            });
            assert_eq!(ctx.concurrency_checking(), ConcurrencyChecking::Check);
        });
        assert_eq!(ctx.concurrency_checking(), ConcurrencyChecking::NoCheck);
    }

    #[test]
    fn test_restored_after_panic() {
        let ctx = InteractionContext::new("ann", ConcurrencyChecking::Check);
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            ctx.with_concurrency_checking(ConcurrencyChecking::NoCheck, || -> () { panic!("boom") })
        }));
        assert!(outcome.is_err());
        assert_eq!(ctx.concurrency_checking(), ConcurrencyChecking::Check);
    }
}
