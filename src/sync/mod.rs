// ============================================================================
// Store synchronization
// ============================================================================
//
//   store ──StoreEvent──> SessionListener ──> Synchronizer
//                                               │
//                 identity map <─ resolve state ┼─> hooks ─> transaction
//
// ============================================================================

pub mod listener;
pub mod object_store;
pub mod synchronizer;

pub use listener::{LifecycleListener, SessionListener, StoreEvent};
pub use object_store::ObjectStore;
pub use synchronizer::{LifecycleObserver, Synchronizer};
