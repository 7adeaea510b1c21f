use std::fmt;
use std::sync::Arc;

use super::Result;

/// Opaque identity of one in-memory object instance.
///
/// The tag is the address of the shared allocation, so every `Pojo` over the
/// same `Arc` carries the same tag and the identity map never calls the
/// domain object's own equality. The address cannot be reused while any
/// `Pojo` over it is alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectTag(usize);

impl ObjectTag {
    fn of(object: &Arc<dyn DomainObject>) -> Self {
        ObjectTag(Arc::as_ptr(object) as *const () as usize)
    }

    pub fn as_usize(&self) -> usize {
        self.0
    }
}

impl fmt::Display for ObjectTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{:x}", self.0)
    }
}

/// User-visible lifecycle hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    Created,
    Loaded,
    Persisting,
    Persisted,
    Updating,
    Updated,
    Removing,
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Created => "created",
            Self::Loaded => "loaded",
            Self::Persisting => "persisting",
            Self::Persisted => "persisted",
            Self::Updating => "updating",
            Self::Updated => "updated",
            Self::Removing => "removing",
        };
        f.write_str(label)
    }
}

/// A plain domain object as seen by the framework.
///
/// Implementations keep their own state behind whatever interior mutability
/// they need; the framework only ever holds shared references.
pub trait DomainObject: Send + Sync + fmt::Debug {
    /// Name of the declared type, as registered with the specification loader.
    fn object_type(&self) -> &str;

    /// Lifecycle callback. Errors propagate out of the synchronizer step that
    /// fired the hook.
    fn on_lifecycle(&self, _event: LifecycleEvent) -> Result<()> {
        Ok(())
    }

    /// Memento for view models; `None` for everything else.
    fn view_model_memento(&self) -> Option<String> {
        None
    }

    /// Restores a freshly instantiated view model from its memento.
    fn init_from_memento(&mut self, _memento: &str) -> Result<()> {
        Ok(())
    }
}

/// Shared reference to a live domain object instance.
#[derive(Clone)]
pub struct Pojo {
    tag: ObjectTag,
    object: Arc<dyn DomainObject>,
}

impl Pojo {
    pub fn new(object: impl DomainObject + 'static) -> Self {
        Self::from_arc(Arc::new(object))
    }

    pub fn from_box(object: Box<dyn DomainObject>) -> Self {
        Self::from_arc(Arc::from(object))
    }

    pub fn from_arc(object: Arc<dyn DomainObject>) -> Self {
        Self {
            tag: ObjectTag::of(&object),
            object,
        }
    }

    pub fn tag(&self) -> ObjectTag {
        self.tag
    }

    pub fn object(&self) -> &dyn DomainObject {
        self.object.as_ref()
    }

    pub fn object_type(&self) -> &str {
        self.object.object_type()
    }

    /// Instance identity, never value equality.
    pub fn same_instance(&self, other: &Pojo) -> bool {
        self.tag == other.tag
    }
}

impl fmt::Debug for Pojo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.object.object_type(), self.tag)
    }
}
