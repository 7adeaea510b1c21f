/// Shared fixtures for the integration tests: a small domain, a recording
/// observer and session helpers.
#[allow(dead_code)]
pub mod fixtures {
    use objectsync::prelude::*;
    use std::sync::{Arc, Mutex};

    /// Entity that logs its own lifecycle hooks into a shared list.
    #[derive(Debug, Default)]
    pub struct Customer {
        pub hooks: Arc<Mutex<Vec<LifecycleEvent>>>,
    }

    impl Customer {
        pub fn logging_to(hooks: &Arc<Mutex<Vec<LifecycleEvent>>>) -> Self {
            Self {
                hooks: hooks.clone(),
            }
        }
    }

    impl DomainObject for Customer {
        fn object_type(&self) -> &str {
            "Customer"
        }

        fn on_lifecycle(&self, event: LifecycleEvent) -> Result<(), SyncError> {
            self.hooks.lock().unwrap().push(event);
            Ok(())
        }
    }

    #[derive(Debug, Default)]
    pub struct Order;

    impl DomainObject for Order {
        fn object_type(&self) -> &str {
            "Order"
        }
    }

    #[derive(Debug)]
    pub struct Address;

    impl DomainObject for Address {
        fn object_type(&self) -> &str {
            "Address"
        }
    }

    #[derive(Debug)]
    pub struct Clock;

    impl DomainObject for Clock {
        fn object_type(&self) -> &str {
            "Clock"
        }
    }

    #[derive(Debug, Default)]
    pub struct Search {
        pub query: String,
    }

    impl DomainObject for Search {
        fn object_type(&self) -> &str {
            "Search"
        }

        fn view_model_memento(&self) -> Option<String> {
            Some(self.query.clone())
        }

        fn init_from_memento(&mut self, memento: &str) -> Result<(), SyncError> {
            self.query = memento.to_string();
            Ok(())
        }
    }

    pub fn specs() -> Arc<SpecificationLoader> {
        Arc::new(
            SpecificationLoader::new()
                .register(ObjectSpec::entity("Customer", || Box::new(Customer::default())))
                .register(ObjectSpec::entity("Order", || Box::new(Order)))
                .register(ObjectSpec::value("Address"))
                .register(ObjectSpec::service("Clock"))
                .register(ObjectSpec::view_model("Search", || Box::new(Search::default()))),
        )
    }

    pub fn session(store: &Arc<InMemoryObjectStore>) -> PersistenceSession {
        session_with(store, SessionConfig::new("ann"))
    }

    pub fn session_with(store: &Arc<InMemoryObjectStore>, config: SessionConfig) -> PersistenceSession {
        PersistenceSession::new(config, specs(), store.clone())
    }

    /// One hook firing as seen by an observer.
    #[derive(Debug, Clone, PartialEq)]
    pub struct Fired {
        pub event: LifecycleEvent,
        pub object_type: String,
        pub oid: Option<Oid>,
    }

    #[derive(Debug, Default)]
    pub struct Recorder {
        fired: Mutex<Vec<Fired>>,
    }

    impl Recorder {
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        pub fn fired(&self) -> Vec<Fired> {
            self.fired.lock().unwrap().clone()
        }

        pub fn events(&self) -> Vec<LifecycleEvent> {
            self.fired().into_iter().map(|f| f.event).collect()
        }

        pub fn count(&self, event: LifecycleEvent) -> usize {
            self.fired().iter().filter(|f| f.event == event).count()
        }
    }

    impl LifecycleObserver for Recorder {
        fn on_event(
            &self,
            _session: &PersistenceSession,
            event: LifecycleEvent,
            handle: &Handle,
        ) -> Result<(), SyncError> {
            self.fired.lock().unwrap().push(Fired {
                event,
                object_type: handle.pojo().object_type().to_string(),
                oid: handle.oid(),
            });
            Ok(())
        }
    }

    /// Persists a fresh customer through `session` inside its own transaction.
    pub fn persisted_customer(
        session: &PersistenceSession,
        store: &InMemoryObjectStore,
    ) -> (Handle, Oid) {
        session.begin_transaction().unwrap();
        let handle = session.new_transient_instance("Customer").unwrap();
        let oid = store
            .make_persistent(&handle.pojo(), &session.listener())
            .unwrap();
        session.commit_transaction().unwrap();
        (handle, oid)
    }
}
