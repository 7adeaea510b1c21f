use super::LifecycleListener;
use crate::core::{Oid, Pojo, Result, Version};

/// The persistence engine as seen by the synchronizer.
///
/// Queries must answer from the store's own bookkeeping and must not call
/// back into the listener. Loads report each materialized object through the
/// supplied listener before returning it; a load may report related objects
/// first, which reenters the synchronizer.
pub trait ObjectStore: Send + Sync {
    /// Optimistic-lock token of the stored revision, if the store tracks one.
    fn current_version(&self, pojo: &Pojo) -> Option<Version>;

    fn is_persistent(&self, pojo: &Pojo) -> bool;

    fn is_deleted(&self, pojo: &Pojo) -> bool;

    /// Primary key the store assigned to this instance, if any.
    fn object_identifier(&self, pojo: &Pojo) -> Option<String>;

    fn load_by_primary_key(&self, oid: &Oid, listener: &dyn LifecycleListener) -> Result<Pojo>;
}
