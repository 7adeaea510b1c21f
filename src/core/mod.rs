pub mod error;
pub mod object;
pub mod oid;
pub mod resolve_state;
pub mod version;

pub use error::{ConcurrencyFault, FaultKind, Result, SyncError};
pub use object::{DomainObject, LifecycleEvent, ObjectTag, Pojo};
pub use oid::{Oid, OidKey};
pub use resolve_state::ResolveState;
pub use version::Version;
