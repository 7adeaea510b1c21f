// ============================================================================
// Handles and their identity map
// ============================================================================

pub mod handle;
pub mod identity_map;
pub mod oid_generator;
pub mod recreator;

pub use handle::{Handle, HandleId};
pub use identity_map::{IdentityMap, SERVICE_IDENTIFIER};
pub use oid_generator::OidGenerator;
pub use recreator::PojoRecreator;
