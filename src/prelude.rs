//! Types most applications need, in one import.
//!
//! The crate's `Result` alias is left out so that `std::result::Result`
//! stays usable unqualified.

pub use crate::adapter::{Handle, SERVICE_IDENTIFIER};
pub use crate::core::{
    ConcurrencyFault, DomainObject, FaultKind, LifecycleEvent, Oid, OidKey, Pojo, ResolveState,
    SyncError, Version,
};
pub use crate::metamodel::{ObjectKind, ObjectSpec, SpecificationLoader};
pub use crate::session::{ConcurrencyChecking, PersistenceSession, SessionConfig};
pub use crate::store::InMemoryObjectStore;
pub use crate::sync::{LifecycleListener, LifecycleObserver, ObjectStore, StoreEvent};
pub use crate::transaction::{ChangeKind, TransactionState};
