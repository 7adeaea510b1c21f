use crate::core::{Oid, Pojo, Result, SyncError};
use crate::metamodel::ObjectSpec;
use crate::sync::ObjectStore;
use std::sync::atomic::{AtomicU64, Ordering};

/// Mints transient oids and derives persistent or view-model oids.
#[derive(Debug)]
pub struct OidGenerator {
    next_transient: AtomicU64,
}

impl OidGenerator {
    pub fn new(start: u64) -> Self {
        Self {
            next_transient: AtomicU64::new(start),
        }
    }

    pub fn create_transient_oid(&self, object_type: &str) -> Oid {
        let seq = self.next_transient.fetch_add(1, Ordering::SeqCst);
        Oid::transient(object_type, seq)
    }

    /// View models take their memento; everything else asks the store for
    /// the identifier it assigned.
    pub fn create_persistent_or_view_model_oid(
        &self,
        pojo: &Pojo,
        spec: &ObjectSpec,
        store: &dyn ObjectStore,
    ) -> Result<Oid> {
        if spec.is_view_model() {
            let memento = pojo.object().view_model_memento().ok_or_else(|| {
                SyncError::OutOfAgreement(format!("view model {:?} has no memento", pojo))
            })?;
            return Ok(Oid::view_model(spec.object_type(), memento));
        }

        let identifier = store.object_identifier(pojo).ok_or_else(|| {
            SyncError::OutOfAgreement(format!("store has no identifier for {:?}", pojo))
        })?;
        Ok(Oid::persistent(spec.object_type(), identifier))
    }
}

impl Default for OidGenerator {
    fn default() -> Self {
        Self::new(1)
    }
}
