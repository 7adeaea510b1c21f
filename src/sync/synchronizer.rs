// ============================================================================
// Synchronizer
// ============================================================================
//
// Keeps the identity map, the resolve state of each handle, the active
// transaction and the store's own view of an object in step. Each step
// either leaves all of them consistent or fails; nothing is repaired
// silently.
//
// ============================================================================

use crate::adapter::Handle;
use crate::core::{ConcurrencyFault, LifecycleEvent, Oid, Pojo, ResolveState, Result, SyncError, Version};
use crate::session::PersistenceSession;
use crate::transaction::ChangeKind;
use log::{debug, warn};
use std::sync::Arc;
use tracing::{Level, event};

/// Subscriber to user-visible lifecycle hooks.
///
/// The session is passed in so that observers may load further objects;
/// such calls reenter the synchronizer.
pub trait LifecycleObserver: Send + Sync {
    fn on_event(
        &self,
        session: &PersistenceSession,
        event: LifecycleEvent,
        handle: &Handle,
    ) -> Result<()>;
}

#[derive(Clone)]
pub struct Synchronizer {
    observers: Vec<Arc<dyn LifecycleObserver>>,
    strict_agreement: bool,
}

impl Synchronizer {
    pub fn new(strict_agreement: bool) -> Self {
        Self {
            observers: Vec::new(),
            strict_agreement,
        }
    }

    pub fn add_observer(&mut self, observer: Arc<dyn LifecycleObserver>) {
        self.observers.push(observer);
    }

    /// The object was just read from the store.
    pub fn post_load(&self, session: &PersistenceSession, pojo: &Pojo) -> Result<()> {
        let store = session.store();
        let identity_map = session.identity_map();
        let reported = store.current_version(pojo);

        let (handle, first_binding) = match identity_map.lookup_pojo(pojo) {
            Some(handle) => (handle, false),
            None => {
                let spec = session.specs().spec_for_pojo(pojo)?;
                let oid = session
                    .oid_generator()
                    .create_persistent_or_view_model_oid(pojo, &spec, store)?;
                let known = identity_map.handle_for_oid(&oid).is_some();
                (identity_map.bind_existing(&oid, pojo)?, !known)
            }
        };

        // Resolved at the reported version even when the check fails.
        let conflict = if first_binding {
            Ok(())
        } else {
            self.check_version(session, &handle, reported.as_ref())
        };

        drive_to_resolved(&handle)?;
        if reported.is_some() {
            handle.set_version(reported);
        }
        conflict?;

        if first_binding {
            self.fire(session, LifecycleEvent::Loaded, &handle)?;
        }

        if store.is_deleted(pojo) {
            destroy(&handle)?;
        }

        self.ensure_in_agreement(session, &handle, pojo)
    }

    /// The store is about to write the object.
    pub fn pre_store(&self, session: &PersistenceSession, pojo: &Pojo) -> Result<()> {
        let identity_map = session.identity_map();
        let handle = match identity_map.lookup_pojo(pojo) {
            Some(handle) => handle,
            // Persisted by reachability from another object.
            None => identity_map.handle_for_pojo(pojo)?,
        };

        if handle.is_transient() {
            session.require_transaction(&format!("persist {}", handle))?;
            self.fire(session, LifecycleEvent::Persisting, &handle)
        } else {
            let reported = session.store().current_version(pojo);
            self.check_version(session, &handle, reported.as_ref())
        }
    }

    /// The store has written the object.
    pub fn post_store(&self, session: &PersistenceSession, pojo: &Pojo) -> Result<()> {
        let store = session.store();
        if !store.is_persistent(pojo) {
            return Err(SyncError::OutOfAgreement(format!(
                "{:?} was reported stored but the store does not consider it persistent",
                pojo
            )));
        }

        let handle = self.ensure_mapped(session, pojo)?;
        if let Some(transient_oid) = handle.oid().filter(Oid::is_transient) {
            session.require_transaction(&format!("persist {}", handle))?;
            let spec = session.specs().spec_for_pojo(pojo)?;
            let persistent_oid = session
                .oid_generator()
                .create_persistent_or_view_model_oid(pojo, &spec, store)?;
            session
                .identity_map()
                .rekey(&handle, &transient_oid, &persistent_oid)?;
            handle.change_state(ResolveState::Resolved)?;
            handle.set_version(store.current_version(pojo));

            self.fire(session, LifecycleEvent::Persisted, &handle)?;
            session.enlist(ChangeKind::Created, &handle)?;
        } else {
            handle.collapse_transitional()?;
            if let Some(version) = store.current_version(pojo) {
                handle.set_version(Some(version));
            }
            self.fire(session, LifecycleEvent::Updated, &handle)?;
        }

        self.ensure_in_agreement(session, &handle, pojo)
    }

    /// A field of the object is about to be written.
    pub fn pre_dirty(&self, session: &PersistenceSession, pojo: &Pojo) -> Result<()> {
        let identity_map = session.identity_map();
        let handle = match identity_map.lookup_pojo(pojo) {
            Some(handle) => handle,
            None => match self.lazily_loaded(session, pojo)? {
                Some(handle) => handle,
                None => identity_map.handle_for_pojo(pojo)?,
            },
        };

        if handle.resolve_state().is_transient() {
            debug!("ignoring pre-dirty for transient {}", handle);
            return Ok(());
        }

        session.require_transaction(&format!("update {}", handle))?;
        self.fire(session, LifecycleEvent::Updating, &handle)?;
        session.enlist(ChangeKind::Updating, &handle)?;
        if handle
            .resolve_state()
            .is_valid_to_change_to(ResolveState::Updating)
        {
            handle.change_state(ResolveState::Updating)?;
        }

        self.ensure_in_agreement(session, &handle, pojo)
    }

    /// The store is about to delete the object.
    pub fn pre_delete(&self, session: &PersistenceSession, pojo: &Pojo) -> Result<()> {
        let handle = self.ensure_mapped(session, pojo)?;
        session.require_transaction(&format!("delete {}", handle))?;
        session.enlist(ChangeKind::Deleting, &handle)?;
        self.fire(session, LifecycleEvent::Removing, &handle)?;
        self.ensure_in_agreement(session, &handle, pojo)
    }

    /// The store has deleted the object. No hook fires: the instance must
    /// not be touched any more.
    pub fn post_delete(&self, session: &PersistenceSession, pojo: &Pojo) -> Result<()> {
        let Some(handle) = session.identity_map().lookup_pojo(pojo) else {
            debug!("post-delete for unmapped {:?}", pojo);
            return Ok(());
        };
        destroy(&handle)?;
        self.ensure_in_agreement(session, &handle, pojo)
    }

    /// Binds an instance the store produced without reporting a load.
    pub fn lazily_loaded(
        &self,
        session: &PersistenceSession,
        pojo: &Pojo,
    ) -> Result<Option<Handle>> {
        session
            .recreator()
            .lazily_loaded(pojo, session.identity_map())
    }

    pub(crate) fn fire(
        &self,
        session: &PersistenceSession,
        lifecycle_event: LifecycleEvent,
        handle: &Handle,
    ) -> Result<()> {
        event!(Level::DEBUG, hook = %lifecycle_event, handle = %handle, "lifecycle hook");
        handle.pojo().object().on_lifecycle(lifecycle_event)?;
        for observer in &self.observers {
            observer.on_event(session, lifecycle_event, handle)?;
        }
        Ok(())
    }

    fn ensure_mapped(&self, session: &PersistenceSession, pojo: &Pojo) -> Result<Handle> {
        if let Some(handle) = session.identity_map().lookup_pojo(pojo) {
            return Ok(handle);
        }
        self.lazily_loaded(session, pojo)?
            .ok_or_else(|| SyncError::ObjectNotFound(format!("no handle for {:?}", pojo)))
    }

    fn check_version(
        &self,
        session: &PersistenceSession,
        handle: &Handle,
        reported: Option<&Version>,
    ) -> Result<()> {
        let (Some(expected), Some(actual)) = (handle.version(), reported) else {
            return Ok(());
        };
        if !expected.different(actual) {
            return Ok(());
        }

        let oid = handle.oid().ok_or_else(|| {
            SyncError::OutOfAgreement(format!("{} carries a version but no oid", handle))
        })?;
        let fault = ConcurrencyFault {
            user: session.context().user().to_string(),
            oid,
            expected,
            actual: actual.clone(),
        };

        if session.context().concurrency_checking().is_checking() {
            event!(Level::WARN, oid = %fault.oid, "concurrency conflict");
            session.record_concurrency_fault(fault)
        } else {
            warn!("concurrency checking disabled, ignoring: {}", fault);
            Ok(())
        }
    }

    /// Store and framework must tell the same story about the object.
    fn ensure_in_agreement(
        &self,
        session: &PersistenceSession,
        handle: &Handle,
        pojo: &Pojo,
    ) -> Result<()> {
        if !self.strict_agreement {
            return Ok(());
        }

        let store = session.store();
        let state = handle.resolve_state();
        let oid = handle.oid();
        let deleted = store.is_deleted(pojo);
        let persistent = store.is_persistent(pojo);

        let agreed = if deleted {
            state.is_destroyed()
        } else if !persistent {
            state.is_transient() && oid.as_ref().is_some_and(Oid::is_transient)
        } else {
            state.represents_persistent() && oid.as_ref().is_some_and(Oid::is_persistent)
        };

        if agreed {
            return Ok(());
        }
        event!(Level::ERROR, handle = %handle, persistent, deleted, "frameworks disagree");
        Err(SyncError::OutOfAgreement(format!(
            "{} while the store reports persistent={}, deleted={}",
            handle, persistent, deleted
        )))
    }
}

impl Default for Synchronizer {
    fn default() -> Self {
        Self::new(true)
    }
}

fn drive_to_resolved(handle: &Handle) -> Result<()> {
    let state = handle.resolve_state();
    if state.is_resolved() {
        return Ok(());
    }
    if state.is_transitional() {
        return handle.collapse_transitional();
    }
    handle.change_state(ResolveState::Resolving)?;
    handle.collapse_transitional()
}

fn destroy(handle: &Handle) -> Result<()> {
    if handle.resolve_state().is_destroyed() {
        return Ok(());
    }
    handle.collapse_transitional()?;
    handle.change_state(ResolveState::Destroyed)
}
