// ============================================================================
// ObjectSync Library
// ============================================================================
//
// Keeps a domain-object framework and an object store in agreement about
// which objects exist, what identity each has and where each is in its
// lifecycle. The store reports native callbacks (post-load, pre-store, ...);
// the synchronizer turns them into identity-map updates, resolve-state
// transitions, transaction enlistments and user-visible lifecycle hooks.
//
// ============================================================================

pub mod adapter;
pub mod core;
pub mod metamodel;
pub mod prelude;
pub mod session;
pub mod store;
pub mod sync;
pub mod transaction;

// Re-export main types for convenience
pub use crate::adapter::{Handle, IdentityMap};
pub use crate::core::{
    ConcurrencyFault, DomainObject, FaultKind, LifecycleEvent, Oid, Pojo, ResolveState, Result,
    SyncError, Version,
};
pub use crate::metamodel::{ObjectSpec, SpecificationLoader};
pub use crate::session::{ConcurrencyChecking, PersistenceSession, SessionConfig};
pub use crate::store::InMemoryObjectStore;
pub use crate::sync::{LifecycleListener, LifecycleObserver, ObjectStore, StoreEvent};
