// ============================================================================
// Identity Map
// ============================================================================
//
// Two side tables over the same set of handles:
//
//   Oid        -> Handle   (every handle that has an oid)
//   ObjectTag  -> Handle   (every handle; keyed on instance identity)
//
// Every operation takes the table lock for the duration of its own
// bookkeeping only. Nothing calls out to domain code or the store while the
// lock is held, so synchronizer callbacks may reenter freely. Creation is
// lookup-before-create: if a reentrant call bound the object first, the
// earlier handle wins.
//
// ============================================================================

use super::{Handle, OidGenerator};
use crate::core::{ObjectTag, Oid, Pojo, ResolveState, Result, SyncError};
use crate::metamodel::{ObjectKind, ObjectSpec, SpecificationLoader};
use log::debug;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Identifier used for every framework service oid.
pub const SERVICE_IDENTIFIER: &str = "1";

#[derive(Default)]
struct Tables {
    by_oid: HashMap<Oid, Handle>,
    by_tag: HashMap<ObjectTag, Handle>,
}

pub struct IdentityMap {
    tables: Mutex<Tables>,
    specs: Arc<SpecificationLoader>,
    oid_generator: Arc<OidGenerator>,
}

impl IdentityMap {
    pub fn new(specs: Arc<SpecificationLoader>, oid_generator: Arc<OidGenerator>) -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            specs,
            oid_generator,
        }
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Handle bound to this exact instance, if any. Never creates.
    pub fn lookup_pojo(&self, pojo: &Pojo) -> Option<Handle> {
        self.tables().by_tag.get(&pojo.tag()).cloned()
    }

    /// Handle bound to this exact instance, creating one if needed.
    ///
    /// Values get a VALUE handle without an oid, services a resolved handle
    /// with the fixed service oid, everything else a TRANSIENT handle with a
    /// freshly minted transient oid.
    pub fn handle_for_pojo(&self, pojo: &Pojo) -> Result<Handle> {
        if let Some(existing) = self.lookup_pojo(pojo) {
            return Ok(existing);
        }

        let spec = self.specs.spec_for_pojo(pojo)?;
        let handle = match spec.kind() {
            ObjectKind::Value => {
                let handle = Handle::new(pojo.clone(), None, ObjectKind::Value);
                handle.change_state(ResolveState::Value)?;
                handle
            }
            ObjectKind::Service => {
                let oid = Oid::persistent(spec.object_type(), SERVICE_IDENTIFIER);
                let handle = Handle::new(pojo.clone(), Some(oid), ObjectKind::Service);
                resolve_fully(&handle)?;
                handle
            }
            kind => {
                let oid = self.oid_generator.create_transient_oid(spec.object_type());
                let handle = Handle::new(pojo.clone(), Some(oid), kind);
                handle.change_state(ResolveState::Transient)?;
                handle
            }
        };

        Ok(self.insert(handle))
    }

    pub fn handle_for_oid(&self, oid: &Oid) -> Option<Handle> {
        self.tables().by_oid.get(oid).cloned()
    }

    /// Binds an instance the store handed back for a known identity.
    ///
    /// An existing handle for `oid` is re-pointed at `pojo`; otherwise a new
    /// handle is created in the state implied by the oid: TRANSIENT for
    /// transient oids, RESOLVED for view models and GHOST for persistent
    /// oids.
    pub fn bind_existing(&self, oid: &Oid, pojo: &Pojo) -> Result<Handle> {
        if let Some(existing) = self.repoint(oid, pojo)? {
            return Ok(existing);
        }

        let spec = self.specs.spec_for(oid.object_type())?;
        let handle = Handle::new(pojo.clone(), Some(oid.clone()), spec.kind());
        initial_state_for(&handle, oid, &spec)?;

        let mut tables = self.tables();
        if let Some(existing) = tables.by_oid.get(oid).cloned() {
            // A reentrant call got there first.
            drop(tables);
            return self.repoint(oid, pojo)?.ok_or_else(|| {
                SyncError::OutOfAgreement(format!("{} vanished while binding", existing))
            });
        }
        if let Some(other) = tables.by_tag.get(&pojo.tag()) {
            return Err(SyncError::OutOfAgreement(format!(
                "{:?} is already bound to {} and cannot also be {}",
                pojo, other, oid
            )));
        }
        tables.by_oid.insert(oid.clone(), handle.clone());
        tables.by_tag.insert(pojo.tag(), handle.clone());
        drop(tables);

        debug!("bound {} to {:?}", handle, pojo);
        Ok(handle)
    }

    fn repoint(&self, oid: &Oid, pojo: &Pojo) -> Result<Option<Handle>> {
        let mut tables = self.tables();
        let Some(handle) = tables.by_oid.get(oid).cloned() else {
            return Ok(None);
        };

        let current = handle.pojo();
        if current.same_instance(pojo) {
            return Ok(Some(handle));
        }
        if let Some(other) = tables.by_tag.get(&pojo.tag()) {
            if !other.same_handle(&handle) {
                return Err(SyncError::OutOfAgreement(format!(
                    "{:?} is already bound to {} and cannot also be {}",
                    pojo, other, oid
                )));
            }
        }

        tables.by_tag.remove(&current.tag());
        tables.by_tag.insert(pojo.tag(), handle.clone());
        handle.replace_pojo(pojo.clone());
        drop(tables);

        debug!("re-pointed {} from {:?} to {:?}", handle, current, pojo);
        Ok(Some(handle))
    }

    /// Replaces `old_oid` with `new_oid` for `handle`, keeping the handle
    /// and its instance entry.
    pub fn rekey(&self, handle: &Handle, old_oid: &Oid, new_oid: &Oid) -> Result<()> {
        let mut tables = self.tables();

        match tables.by_oid.get(old_oid) {
            Some(bound) if bound.same_handle(handle) => {}
            Some(bound) => {
                return Err(SyncError::OutOfAgreement(format!(
                    "cannot rekey {}: {} is bound to {}",
                    handle, old_oid, bound
                )));
            }
            None => {
                return Err(SyncError::OutOfAgreement(format!(
                    "cannot rekey {}: {} is not mapped",
                    handle, old_oid
                )));
            }
        }
        if let Some(bound) = tables.by_oid.get(new_oid) {
            if !bound.same_handle(handle) {
                return Err(SyncError::OutOfAgreement(format!(
                    "cannot rekey {} to {}: already bound to {}",
                    handle, new_oid, bound
                )));
            }
        }

        tables.by_oid.remove(old_oid);
        tables.by_oid.insert(new_oid.clone(), handle.clone());
        handle.replace_oid(new_oid.clone());
        drop(tables);

        debug!("rekeyed {} -> {}", old_oid, new_oid);
        Ok(())
    }

    /// Removes the handle from both tables. Returns whether it was mapped.
    pub fn remove(&self, handle: &Handle) -> bool {
        let mut tables = self.tables();
        let mut removed = false;

        let tag = handle.pojo().tag();
        if tables.by_tag.get(&tag).is_some_and(|h| h.same_handle(handle)) {
            tables.by_tag.remove(&tag);
            removed = true;
        }
        if let Some(oid) = handle.oid() {
            if tables.by_oid.get(&oid).is_some_and(|h| h.same_handle(handle)) {
                tables.by_oid.remove(&oid);
                removed = true;
            }
        }
        removed
    }

    pub fn remove_oid(&self, oid: &Oid) -> Option<Handle> {
        let handle = self.handle_for_oid(oid)?;
        self.remove(&handle);
        Some(handle)
    }

    /// Drops every handle except those of framework services.
    pub fn reset(&self) {
        let mut tables = self.tables();
        let before = tables.by_tag.len();
        tables.by_oid.retain(|_, handle| handle.is_service());
        tables.by_tag.retain(|_, handle| handle.is_service());
        debug!(
            "identity map reset: {} of {} handles retained",
            tables.by_tag.len(),
            before
        );
    }

    /// Drops every handle, services included.
    pub fn clear(&self) {
        let mut tables = self.tables();
        tables.by_oid.clear();
        tables.by_tag.clear();
    }

    pub fn len(&self) -> usize {
        self.tables().by_tag.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of all mapped handles, ordered by creation.
    pub fn handles(&self) -> Vec<Handle> {
        let mut handles: Vec<Handle> = self.tables().by_tag.values().cloned().collect();
        handles.sort_by_key(Handle::id);
        handles
    }

    fn insert(&self, handle: Handle) -> Handle {
        let pojo = handle.pojo();
        let mut tables = self.tables();
        if let Some(existing) = tables.by_tag.get(&pojo.tag()) {
            return existing.clone();
        }
        if let Some(oid) = handle.oid() {
            tables.by_oid.insert(oid, handle.clone());
        }
        tables.by_tag.insert(pojo.tag(), handle.clone());
        drop(tables);

        debug!("created {}", handle);
        handle
    }
}

fn resolve_fully(handle: &Handle) -> Result<()> {
    handle.change_state(ResolveState::Ghost)?;
    handle.change_state(ResolveState::Resolving)?;
    handle.change_state(ResolveState::Resolved)
}

fn initial_state_for(handle: &Handle, oid: &Oid, spec: &ObjectSpec) -> Result<()> {
    if oid.is_transient() {
        handle.change_state(ResolveState::Transient)
    } else if oid.is_view_model() || spec.is_service() {
        resolve_fully(handle)
    } else {
        handle.change_state(ResolveState::Ghost)
    }
}
