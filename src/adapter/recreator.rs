use super::{Handle, IdentityMap};
use crate::core::{Oid, OidKey, Pojo, Result};
use crate::metamodel::SpecificationLoader;
use crate::sync::{LifecycleListener, ObjectStore};
use log::debug;

/// Materializes domain objects from identity alone.
pub struct PojoRecreator<'a> {
    specs: &'a SpecificationLoader,
    store: &'a dyn ObjectStore,
}

impl<'a> PojoRecreator<'a> {
    pub fn new(specs: &'a SpecificationLoader, store: &'a dyn ObjectStore) -> Self {
        Self { specs, store }
    }

    /// Transient and view-model oids get a blank instance of the declared
    /// type, view models then restored from the memento. Persistent oids are
    /// loaded by the store, which reports the load through `listener`.
    pub fn recreate(&self, oid: &Oid, listener: &dyn LifecycleListener) -> Result<Pojo> {
        match oid.key() {
            OidKey::Transient(_) => {
                let spec = self.specs.spec_for(oid.object_type())?;
                Ok(Pojo::from_box(spec.instantiate()?))
            }
            OidKey::ViewModel(memento) => {
                let spec = self.specs.spec_for(oid.object_type())?;
                let mut object = spec.instantiate()?;
                object.init_from_memento(memento)?;
                Ok(Pojo::from_box(object))
            }
            OidKey::Persistent(_) => self.store.load_by_primary_key(oid, listener),
        }
    }

    /// Binds an instance the store materialized outside the normal load
    /// path. Returns `None` when the store cannot say what it is.
    pub fn lazily_loaded(&self, pojo: &Pojo, identity_map: &IdentityMap) -> Result<Option<Handle>> {
        if let Some(existing) = identity_map.lookup_pojo(pojo) {
            return Ok(Some(existing));
        }
        if !self.store.is_persistent(pojo) {
            return Ok(None);
        }
        let Some(identifier) = self.store.object_identifier(pojo) else {
            return Ok(None);
        };

        let spec = self.specs.spec_for_pojo(pojo)?;
        let oid = Oid::persistent(spec.object_type(), identifier);
        let handle = identity_map.bind_existing(&oid, pojo)?;
        debug!("lazily loaded {}", handle);
        Ok(Some(handle))
    }
}
