/// Identity map tests
///
/// Instance identity, transient-to-persistent rekeying, services and reset.
/// Run with: cargo test --test identity_map_tests

mod common;

use common::fixtures::*;
use objectsync::prelude::*;
use std::sync::Arc;

#[test]
fn test_handle_for_returns_same_handle() {
    let store = Arc::new(InMemoryObjectStore::new());
    let session = session(&store);

    let pojo = Pojo::new(Customer::default());
    let first = session.handle_for(&pojo).unwrap();
    let second = session.handle_for(&pojo.clone()).unwrap();

    assert_eq!(first, second);
    assert_eq!(first.resolve_state(), ResolveState::Transient);
    assert!(first.oid().unwrap().is_transient());
    assert_eq!(session.identity_map().len(), 1);
}

#[test]
fn test_same_allocation_wrapped_twice_shares_a_handle() {
    let store = Arc::new(InMemoryObjectStore::new());
    let session = session(&store);

    let object: Arc<dyn DomainObject> = Arc::new(Order);
    let first = session.handle_for(&Pojo::from_arc(object.clone())).unwrap();
    let second = session.handle_for(&Pojo::from_arc(object)).unwrap();

    assert_eq!(first, second);
    assert_eq!(session.identity_map().len(), 1);
}

#[test]
fn test_equal_looking_instances_get_distinct_handles() {
    let store = Arc::new(InMemoryObjectStore::new());
    let session = session(&store);

    let a = session.handle_for(&Pojo::new(Order)).unwrap();
    let b = session.handle_for(&Pojo::new(Order)).unwrap();

    assert_ne!(a, b);
    assert_ne!(a.oid(), b.oid());
}

#[test]
fn test_transient_oids_follow_configured_start() {
    let store = Arc::new(InMemoryObjectStore::new());
    let session = session_with(&store, SessionConfig::new("ann").transient_oid_start(100));

    let handle = session.handle_for(&Pojo::new(Order)).unwrap();
    assert_eq!(handle.oid(), Some(Oid::transient("Order", 100)));
}

#[test]
fn test_value_handle() {
    let store = Arc::new(InMemoryObjectStore::new());
    let session = session(&store);

    let handle = session.handle_for(&Pojo::new(Address)).unwrap();
    assert_eq!(handle.resolve_state(), ResolveState::Value);
    assert_eq!(handle.oid(), None);
    assert!(handle.change_state(ResolveState::Resolved).is_err());
}

#[test]
fn test_rekey_moves_handle_to_persistent_oid() {
    let store = Arc::new(InMemoryObjectStore::new());
    let session = session(&store);

    session.begin_transaction().unwrap();
    let handle = session.new_transient_instance("Customer").unwrap();
    let transient_oid = handle.oid().unwrap();

    let persistent_oid = store
        .make_persistent(&handle.pojo(), &session.listener())
        .unwrap();

    assert!(session.handle_for_oid(&transient_oid).is_none());
    assert_eq!(session.handle_for_oid(&persistent_oid), Some(handle.clone()));
    assert_eq!(session.handle_for(&handle.pojo()).unwrap(), handle);
    assert_eq!(handle.oid(), Some(persistent_oid));
    assert_eq!(session.identity_map().len(), 1);
}

#[test]
fn test_service_handle() {
    let store = Arc::new(InMemoryObjectStore::new());
    let session = session(&store);

    let handle = session.register_service(&Pojo::new(Clock)).unwrap();
    assert_eq!(handle.oid(), Some(Oid::persistent("Clock", SERVICE_IDENTIFIER)));
    assert_eq!(handle.resolve_state(), ResolveState::Resolved);
    assert!(handle.is_service());
}

#[test]
fn test_register_service_rejects_entities() {
    let store = Arc::new(InMemoryObjectStore::new());
    let session = session(&store);

    let err = session.register_service(&Pojo::new(Order)).unwrap_err();
    assert!(matches!(err, SyncError::WrongKind { .. }));
    assert_eq!(err.kind(), FaultKind::IdentityArgument);
}

#[test]
fn test_reset_keeps_services() {
    let store = Arc::new(InMemoryObjectStore::new());
    let session = session(&store);

    let clock = session.register_service(&Pojo::new(Clock)).unwrap();
    let order = session.handle_for(&Pojo::new(Order)).unwrap();
    session.handle_for(&Pojo::new(Address)).unwrap();
    assert_eq!(session.identity_map().len(), 3);

    session.identity_map().reset();

    assert_eq!(session.identity_map().handles(), vec![clock.clone()]);
    assert_eq!(session.handle_for_oid(&clock.oid().unwrap()), Some(clock));
    assert!(session.handle_for_oid(&order.oid().unwrap()).is_none());
}

#[test]
fn test_remove_and_close() {
    let store = Arc::new(InMemoryObjectStore::new());
    let session = session(&store);

    let order = session.handle_for(&Pojo::new(Order)).unwrap();
    assert!(session.remove(&order));
    assert!(!session.remove(&order));

    session.register_service(&Pojo::new(Clock)).unwrap();
    session.close();
    assert!(session.identity_map().is_empty());
}

#[test]
fn test_unknown_type() {
    #[derive(Debug)]
    struct Stray;

    impl DomainObject for Stray {
        fn object_type(&self) -> &str {
            "Stray"
        }
    }

    let store = Arc::new(InMemoryObjectStore::new());
    let session = session(&store);

    let err = session.handle_for(&Pojo::new(Stray)).unwrap_err();
    assert!(matches!(err, SyncError::UnknownType(ref t) if t == "Stray"));
}
