use crate::core::{Oid, Pojo, ResolveState, Result, SyncError, Version};
use crate::metamodel::ObjectKind;
use log::debug;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Global handle ID counter
static NEXT_HANDLE_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleId(u64);

impl HandleId {
    fn next() -> Self {
        HandleId(NEXT_HANDLE_ID.fetch_add(1, Ordering::SeqCst))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "handle_{}", self.0)
    }
}

#[derive(Debug)]
struct HandleState {
    pojo: Pojo,
    oid: Option<Oid>,
    resolve_state: ResolveState,
    version: Option<Version>,
}

#[derive(Debug)]
struct HandleInner {
    id: HandleId,
    kind: ObjectKind,
    state: Mutex<HandleState>,
}

/// The framework's wrapper around one live domain object.
///
/// Cloning a `Handle` yields another reference to the same wrapper; two
/// handles compare equal only when they are the same wrapper. The internal
/// lock is never held across calls out of this type, so handles may be read
/// from inside lifecycle hooks and reentrant store callbacks.
#[derive(Clone)]
pub struct Handle {
    inner: Arc<HandleInner>,
}

impl Handle {
    pub(crate) fn new(pojo: Pojo, oid: Option<Oid>, kind: ObjectKind) -> Self {
        Self {
            inner: Arc::new(HandleInner {
                id: HandleId::next(),
                kind,
                state: Mutex::new(HandleState {
                    pojo,
                    oid,
                    resolve_state: ResolveState::New,
                    version: None,
                }),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, HandleState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn id(&self) -> HandleId {
        self.inner.id
    }

    pub fn kind(&self) -> ObjectKind {
        self.inner.kind
    }

    pub fn pojo(&self) -> Pojo {
        self.state().pojo.clone()
    }

    pub fn oid(&self) -> Option<Oid> {
        self.state().oid.clone()
    }

    pub fn resolve_state(&self) -> ResolveState {
        self.state().resolve_state
    }

    pub fn version(&self) -> Option<Version> {
        self.state().version.clone()
    }

    pub fn is_transient(&self) -> bool {
        self.state().oid.as_ref().is_some_and(Oid::is_transient)
    }

    pub fn is_persistent(&self) -> bool {
        self.state().oid.as_ref().is_some_and(Oid::is_persistent)
    }

    pub fn is_service(&self) -> bool {
        self.inner.kind == ObjectKind::Service
    }

    pub fn same_handle(&self, other: &Handle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Moves to `target`, failing if the transition table forbids it.
    pub fn change_state(&self, target: ResolveState) -> Result<()> {
        let mut state = self.state();
        let from = state.resolve_state;
        if !from.is_valid_to_change_to(target) {
            let subject = describe(&state);
            return Err(SyncError::InvalidTransition {
                subject,
                from,
                to: target,
            });
        }
        state.resolve_state = target;
        drop(state);
        debug!("{} resolve state {} -> {}", self, from.code(), target.code());
        Ok(())
    }

    /// Completes a RESOLVING or UPDATING state; no-op otherwise.
    pub fn collapse_transitional(&self) -> Result<()> {
        match self.resolve_state().end_state() {
            Some(end) => self.change_state(end),
            None => Ok(()),
        }
    }

    pub fn set_version(&self, version: Option<Version>) {
        self.state().version = version;
    }

    /// Re-points the handle at a different instance of the same object.
    pub(crate) fn replace_pojo(&self, pojo: Pojo) -> Pojo {
        std::mem::replace(&mut self.state().pojo, pojo)
    }

    pub(crate) fn replace_oid(&self, oid: Oid) -> Option<Oid> {
        self.state().oid.replace(oid)
    }
}

fn describe(state: &HandleState) -> String {
    match &state.oid {
        Some(oid) => oid.enstring(),
        None => format!("{:?}", state.pojo),
    }
}

impl PartialEq for Handle {
    fn eq(&self, other: &Self) -> bool {
        self.same_handle(other)
    }
}

impl Eq for Handle {}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        write!(
            f,
            "{}[{} {}]",
            self.inner.id,
            describe(&state),
            state.resolve_state.code()
        )
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("Handle")
            .field("id", &self.inner.id)
            .field("kind", &self.inner.kind)
            .field("pojo", &state.pojo)
            .field("oid", &state.oid)
            .field("resolve_state", &state.resolve_state)
            .field("version", &state.version)
            .finish()
    }
}
