use super::{ConcurrencyChecking, InteractionContext, SessionConfig};
use crate::adapter::{Handle, IdentityMap, OidGenerator, PojoRecreator};
use crate::core::{ConcurrencyFault, LifecycleEvent, Oid, Pojo, Result, SyncError};
use crate::metamodel::SpecificationLoader;
use crate::sync::{LifecycleObserver, ObjectStore, SessionListener, Synchronizer};
use crate::transaction::{ChangeKind, Transaction, TransactionId};
use log::{debug, warn};
use std::sync::{Arc, Mutex, PoisonError};

/// One working session: its identity map, its current transaction and the
/// collaborators the synchronizer needs, all passed in explicitly.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use objectsync::prelude::*;
///
/// #[derive(Debug, Default)]
/// struct Customer;
///
/// impl DomainObject for Customer {
///     fn object_type(&self) -> &str {
///         "Customer"
///     }
/// }
///
/// # fn main() -> Result<(), SyncError> {
/// let specs = SpecificationLoader::new()
///     .register(ObjectSpec::entity("Customer", || Box::new(Customer)));
/// let store = Arc::new(InMemoryObjectStore::new());
/// let session = PersistenceSession::new(SessionConfig::new("ann"), Arc::new(specs), store.clone());
///
/// session.begin_transaction()?;
/// let customer = session.new_transient_instance("Customer")?;
/// store.make_persistent(&customer.pojo(), &session.listener())?;
/// assert!(customer.is_persistent());
/// session.commit_transaction()?;
/// # Ok(())
/// # }
/// ```
pub struct PersistenceSession {
    config: SessionConfig,
    context: InteractionContext,
    specs: Arc<SpecificationLoader>,
    store: Arc<dyn ObjectStore>,
    oid_generator: Arc<OidGenerator>,
    identity_map: IdentityMap,
    synchronizer: Synchronizer,
    transaction: Mutex<Option<Transaction>>,
}

impl PersistenceSession {
    pub fn new(
        config: SessionConfig,
        specs: Arc<SpecificationLoader>,
        store: Arc<dyn ObjectStore>,
    ) -> Self {
        let oid_generator = Arc::new(OidGenerator::new(config.transient_oid_start));
        let identity_map = IdentityMap::new(specs.clone(), oid_generator.clone());
        let context = InteractionContext::new(config.user.clone(), config.concurrency_checking);
        let synchronizer = Synchronizer::new(config.strict_agreement);

        debug!(
            "opened session {} for {}",
            context.interaction_id(),
            config.user
        );

        Self {
            config,
            context,
            specs,
            store,
            oid_generator,
            identity_map,
            synchronizer,
            transaction: Mutex::new(None),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn LifecycleObserver>) -> Self {
        self.synchronizer.add_observer(observer);
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn context(&self) -> &InteractionContext {
        &self.context
    }

    pub fn specs(&self) -> &SpecificationLoader {
        &self.specs
    }

    pub fn store(&self) -> &dyn ObjectStore {
        self.store.as_ref()
    }

    pub fn oid_generator(&self) -> &OidGenerator {
        &self.oid_generator
    }

    pub fn identity_map(&self) -> &IdentityMap {
        &self.identity_map
    }

    pub fn synchronizer(&self) -> &Synchronizer {
        &self.synchronizer
    }

    /// The listener a store must be given to report callbacks to this session.
    pub fn listener(&self) -> SessionListener<'_> {
        SessionListener::new(self)
    }

    pub fn recreator(&self) -> PojoRecreator<'_> {
        PojoRecreator::new(&self.specs, self.store.as_ref())
    }

    // ------------------------------------------------------------------
    // Handles
    // ------------------------------------------------------------------

    pub fn handle_for(&self, pojo: &Pojo) -> Result<Handle> {
        self.identity_map.handle_for_pojo(pojo)
    }

    pub fn handle_for_oid(&self, oid: &Oid) -> Option<Handle> {
        self.identity_map.handle_for_oid(oid)
    }

    pub fn remove(&self, handle: &Handle) -> bool {
        self.identity_map.remove(handle)
    }

    pub fn remove_oid(&self, oid: &Oid) -> Option<Handle> {
        self.identity_map.remove_oid(oid)
    }

    /// Handle for `oid`, materializing the object if it is not resident.
    pub fn load(&self, oid: &Oid) -> Result<Handle> {
        if let Some(handle) = self.identity_map.handle_for_oid(oid) {
            return Ok(handle);
        }

        let pojo = self.recreator().recreate(oid, &self.listener())?;

        // Persistent loads were bound by the store's post-load callback.
        if let Some(handle) = self.identity_map.handle_for_oid(oid) {
            return Ok(handle);
        }
        self.identity_map.bind_existing(oid, &pojo)
    }

    /// Instantiates a blank object of `object_type` and binds it as transient.
    pub fn new_transient_instance(&self, object_type: &str) -> Result<Handle> {
        let spec = self.specs.spec_for(object_type)?;
        if spec.is_value() || spec.is_service() {
            return Err(SyncError::WrongKind {
                object_type: object_type.to_string(),
                expected: "entity or view model".to_string(),
            });
        }

        let pojo = Pojo::from_box(spec.instantiate()?);
        let handle = self.identity_map.handle_for_pojo(&pojo)?;
        self.synchronizer
            .fire(self, LifecycleEvent::Created, &handle)?;
        Ok(handle)
    }

    /// Binds a framework service. Service handles survive `reset`.
    pub fn register_service(&self, pojo: &Pojo) -> Result<Handle> {
        let spec = self.specs.spec_for_pojo(pojo)?;
        if !spec.is_service() {
            return Err(SyncError::WrongKind {
                object_type: spec.object_type().to_string(),
                expected: "service".to_string(),
            });
        }
        self.identity_map.handle_for_pojo(pojo)
    }

    /// Runs `f` with concurrency checking set to `mode`; the previous mode is
    /// restored afterwards.
    pub fn with_concurrency_checking<R>(
        &self,
        mode: ConcurrencyChecking,
        f: impl FnOnce(&Self) -> R,
    ) -> R {
        self.context.with_concurrency_checking(mode, || f(self))
    }

    // ------------------------------------------------------------------
    // Transactions
    // ------------------------------------------------------------------

    pub fn begin_transaction(&self) -> Result<TransactionId> {
        let mut slot = self.transaction.lock()?;
        if let Some(current) = slot.as_ref() {
            return Err(SyncError::TransactionError(format!(
                "transaction {} is already in progress",
                current.id()
            )));
        }
        let transaction = Transaction::new(TransactionId::new());
        let id = transaction.id();
        *slot = Some(transaction);
        debug!("began {}", id);
        Ok(id)
    }

    pub fn in_transaction(&self) -> bool {
        self.with_transaction(|_| ()).is_some()
    }

    /// Read access to the current transaction, if any.
    pub fn with_transaction<R>(&self, f: impl FnOnce(&Transaction) -> R) -> Option<R> {
        let slot = self.transaction.lock().unwrap_or_else(PoisonError::into_inner);
        slot.as_ref().map(f)
    }

    /// Commits the current transaction and drops destroyed handles from the
    /// identity map. A transaction carrying a concurrency fault is aborted
    /// and the fault returned.
    pub fn commit_transaction(&self) -> Result<Transaction> {
        let mut transaction = self.take_transaction("commit")?;
        let outcome = transaction.commit();
        self.purge_destroyed();
        outcome?;
        debug!("committed {}", transaction.id());
        Ok(transaction)
    }

    pub fn abort_transaction(&self) -> Result<Transaction> {
        let mut transaction = self.take_transaction("abort")?;
        transaction.abort()?;
        self.purge_destroyed();
        debug!("aborted {}", transaction.id());
        Ok(transaction)
    }

    /// Aborts any open transaction and forgets every handle.
    pub fn close(&self) {
        if self.in_transaction() {
            if let Err(err) = self.abort_transaction() {
                warn!("closing session: {}", err);
            }
        }
        self.identity_map.clear();
        debug!("closed session {}", self.context.interaction_id());
    }

    /// Fails unless a transaction is open, before a step changes anything.
    pub(crate) fn require_transaction(&self, action: &str) -> Result<()> {
        if self.transaction.lock()?.is_some() {
            return Ok(());
        }
        Err(SyncError::NoTransaction(format!("cannot {}", action)))
    }

    pub(crate) fn enlist(&self, kind: ChangeKind, handle: &Handle) -> Result<()> {
        let mut slot = self.transaction.lock()?;
        let transaction = slot.as_mut().ok_or_else(|| {
            SyncError::NoTransaction(format!("cannot enlist {} as {}", handle, kind))
        })?;
        transaction.enlist(kind, handle)
    }

    pub(crate) fn record_concurrency_fault(&self, fault: ConcurrencyFault) -> Result<()> {
        let mut slot = self.transaction.lock()?;
        match slot.as_mut() {
            Some(transaction) => transaction.set_abort_cause(fault),
            None => Err(SyncError::Concurrency(fault)),
        }
    }

    fn take_transaction(&self, action: &str) -> Result<Transaction> {
        self.transaction
            .lock()?
            .take()
            .ok_or_else(|| SyncError::NoTransaction(format!("nothing to {}", action)))
    }

    fn purge_destroyed(&self) {
        for handle in self.identity_map.handles() {
            if handle.resolve_state().is_destroyed() {
                self.identity_map.remove(&handle);
                debug!("released {}", handle);
            }
        }
    }
}
