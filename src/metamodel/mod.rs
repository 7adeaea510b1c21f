// ============================================================================
// Metamodel boundary
// ============================================================================
//
// The full metamodel (annotations, facets, actions) lives elsewhere. The
// synchronizer only needs to know, per declared type, what kind of object it
// is and how to instantiate a blank one.
//
// ============================================================================

use crate::core::{DomainObject, Pojo, Result, SyncError};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

pub type ObjectFactory = Arc<dyn Fn() -> Box<dyn DomainObject> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    /// Stored by the object store.
    Entity,
    /// Rebuilt from a memento; never stored.
    ViewModel,
    /// Immutable value; handles carry no oid.
    Value,
    /// Framework-level singleton.
    Service,
}

#[derive(Clone)]
pub struct ObjectSpec {
    object_type: String,
    kind: ObjectKind,
    factory: Option<ObjectFactory>,
}

impl ObjectSpec {
    pub fn entity<F>(object_type: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Box<dyn DomainObject> + Send + Sync + 'static,
    {
        Self::with_factory(object_type, ObjectKind::Entity, factory)
    }

    pub fn view_model<F>(object_type: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Box<dyn DomainObject> + Send + Sync + 'static,
    {
        Self::with_factory(object_type, ObjectKind::ViewModel, factory)
    }

    pub fn value(object_type: impl Into<String>) -> Self {
        Self {
            object_type: object_type.into(),
            kind: ObjectKind::Value,
            factory: None,
        }
    }

    pub fn service(object_type: impl Into<String>) -> Self {
        Self {
            object_type: object_type.into(),
            kind: ObjectKind::Service,
            factory: None,
        }
    }

    fn with_factory<F>(object_type: impl Into<String>, kind: ObjectKind, factory: F) -> Self
    where
        F: Fn() -> Box<dyn DomainObject> + Send + Sync + 'static,
    {
        Self {
            object_type: object_type.into(),
            kind,
            factory: Some(Arc::new(factory)),
        }
    }

    pub fn object_type(&self) -> &str {
        &self.object_type
    }

    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    pub fn is_value(&self) -> bool {
        self.kind == ObjectKind::Value
    }

    pub fn is_view_model(&self) -> bool {
        self.kind == ObjectKind::ViewModel
    }

    pub fn is_service(&self) -> bool {
        self.kind == ObjectKind::Service
    }

    /// Blank instance of this type.
    pub fn instantiate(&self) -> Result<Box<dyn DomainObject>> {
        let factory = self.factory.as_ref().ok_or_else(|| {
            SyncError::UnknownType(format!("{} cannot be instantiated", self.object_type))
        })?;
        Ok(factory())
    }
}

impl fmt::Debug for ObjectSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectSpec")
            .field("object_type", &self.object_type)
            .field("kind", &self.kind)
            .field("instantiable", &self.factory.is_some())
            .finish()
    }
}

/// Registry of object specifications, keyed by declared type name.
#[derive(Debug, Default, Clone)]
pub struct SpecificationLoader {
    specs: HashMap<String, Arc<ObjectSpec>>,
}

impl SpecificationLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, spec: ObjectSpec) -> Self {
        self.specs
            .insert(spec.object_type().to_string(), Arc::new(spec));
        self
    }

    pub fn lookup(&self, object_type: &str) -> Option<Arc<ObjectSpec>> {
        self.specs.get(object_type).cloned()
    }

    pub fn spec_for(&self, object_type: &str) -> Result<Arc<ObjectSpec>> {
        self.lookup(object_type)
            .ok_or_else(|| SyncError::UnknownType(object_type.to_string()))
    }

    pub fn spec_for_pojo(&self, pojo: &Pojo) -> Result<Arc<ObjectSpec>> {
        self.spec_for(pojo.object_type())
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Widget;

    impl DomainObject for Widget {
        fn object_type(&self) -> &str {
            "Widget"
        }
    }

    #[test]
    fn test_lookup_and_instantiate() {
        let loader = SpecificationLoader::new()
            .register(ObjectSpec::entity("Widget", || Box::new(Widget)))
            .register(ObjectSpec::value("Money"));

        let spec = loader.spec_for("Widget").unwrap();
        assert_eq!(spec.kind(), ObjectKind::Entity);
        assert_eq!(spec.instantiate().unwrap().object_type(), "Widget");

        assert!(loader.spec_for("Money").unwrap().instantiate().is_err());
    }

    #[test]
    fn test_unknown_type_is_an_error() {
        let loader = SpecificationLoader::new();
        assert!(matches!(
            loader.spec_for("Ghost"),
            Err(SyncError::UnknownType(name)) if name == "Ghost"
        ));
    }
}
