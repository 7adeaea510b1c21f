// ============================================================================
// Transaction Change Set
// ============================================================================
//
// Records which handles a transaction created, updated or deleted. Each
// handle appears at most once; a later enlistment merges with the earlier:
//
//   Created  + Updating -> Created
//   Created  + Deleting -> (dropped: never reached the store)
//   Updating + Deleting -> Deleting
//   Deleting + anything -> Deleting
//
// ============================================================================

use crate::adapter::Handle;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Created,
    Updating,
    Deleting,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::Created => write!(f, "CREATED"),
            ChangeKind::Updating => write!(f, "UPDATING"),
            ChangeKind::Deleting => write!(f, "DELETING"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Enlistment {
    pub handle: Handle,
    pub kind: ChangeKind,
}

#[derive(Debug, Default, Clone)]
pub struct ChangeSet {
    entries: Vec<Enlistment>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enlist(&mut self, kind: ChangeKind, handle: &Handle) {
        let Some(pos) = self.position(handle) else {
            self.entries.push(Enlistment {
                handle: handle.clone(),
                kind,
            });
            return;
        };

        let previous = self.entries[pos].kind;
        match (previous, kind) {
            (ChangeKind::Created, ChangeKind::Deleting) => {
                self.entries.remove(pos);
            }
            (ChangeKind::Updating, ChangeKind::Deleting) => {
                self.entries[pos].kind = ChangeKind::Deleting;
            }
            _ => {}
        }
    }

    pub fn kind_of(&self, handle: &Handle) -> Option<ChangeKind> {
        self.position(handle).map(|pos| self.entries[pos].kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Enlistment> {
        self.entries.iter()
    }

    pub fn of_kind(&self, kind: ChangeKind) -> impl Iterator<Item = &Handle> {
        self.entries
            .iter()
            .filter(move |e| e.kind == kind)
            .map(|e| &e.handle)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn position(&self, handle: &Handle) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.handle.same_handle(handle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{IdentityMap, OidGenerator};
    use crate::core::{DomainObject, Pojo};
    use crate::metamodel::{ObjectSpec, SpecificationLoader};
    use std::sync::Arc;

    #[derive(Debug)]
    struct Item;

    impl DomainObject for Item {
        fn object_type(&self) -> &str {
            "Item"
        }
    }

    fn handle() -> Handle {
        let specs = SpecificationLoader::new().register(ObjectSpec::entity("Item", || Box::new(Item)));
        let map = IdentityMap::new(Arc::new(specs), Arc::new(OidGenerator::default()));
        map.handle_for_pojo(&Pojo::new(Item)).unwrap()
    }

    #[test]
    fn test_created_then_updating_stays_created() {
        let h = handle();
        let mut set = ChangeSet::new();
        set.enlist(ChangeKind::Created, &h);
        set.enlist(ChangeKind::Updating, &h);
        assert_eq!(set.len(), 1);
        assert_eq!(set.kind_of(&h), Some(ChangeKind::Created));
    }

    #[test]
    fn test_created_then_deleting_cancels() {
        let h = handle();
        let mut set = ChangeSet::new();
        set.enlist(ChangeKind::Created, &h);
        set.enlist(ChangeKind::Deleting, &h);
        assert!(set.is_empty());
    }

    #[test]
    fn test_updating_then_deleting_becomes_deleting() {
        let h = handle();
        let other = handle();
        let mut set = ChangeSet::new();
        set.enlist(ChangeKind::Updating, &h);
        set.enlist(ChangeKind::Updating, &other);
        set.enlist(ChangeKind::Deleting, &h);
        set.enlist(ChangeKind::Updating, &h);

        assert_eq!(set.kind_of(&h), Some(ChangeKind::Deleting));
        assert_eq!(set.of_kind(ChangeKind::Updating).count(), 1);
        assert_eq!(set.of_kind(ChangeKind::Deleting).count(), 1);
    }
}
