use crate::core::{Pojo, Result};
use crate::session::PersistenceSession;
use std::fmt;
use tracing::{Level, debug_span, event};

/// Native lifecycle callbacks a store raises for one object instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreEvent {
    PostCreate,
    PreStore,
    PostStore,
    PreDirty,
    PostDirty,
    PreDelete,
    PostDelete,
    PostLoad,
    /// The store materialized an instance outside its normal load path.
    LazilyLoaded,
}

impl fmt::Display for StoreEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::PostCreate => "post-create",
            Self::PreStore => "pre-store",
            Self::PostStore => "post-store",
            Self::PreDirty => "pre-dirty",
            Self::PostDirty => "post-dirty",
            Self::PreDelete => "pre-delete",
            Self::PostDelete => "post-delete",
            Self::PostLoad => "post-load",
            Self::LazilyLoaded => "lazily-loaded",
        };
        f.write_str(label)
    }
}

/// Receiver of store callbacks.
pub trait LifecycleListener {
    fn on_store_event(&self, event: StoreEvent, pojo: &Pojo) -> Result<()>;
}

/// Routes store callbacks into a session's synchronizer.
#[derive(Clone, Copy)]
pub struct SessionListener<'a> {
    session: &'a PersistenceSession,
}

impl<'a> SessionListener<'a> {
    pub fn new(session: &'a PersistenceSession) -> Self {
        Self { session }
    }
}

impl LifecycleListener for SessionListener<'_> {
    fn on_store_event(&self, store_event: StoreEvent, pojo: &Pojo) -> Result<()> {
        let session = self.session;
        let span = debug_span!(
            "store_event",
            event = %store_event,
            pojo = ?pojo,
            interaction = %session.context().interaction_id()
        );
        let _enter = span.enter();

        let synchronizer = session.synchronizer();
        let outcome = match store_event {
            StoreEvent::PostCreate | StoreEvent::PostDirty => {
                event!(Level::TRACE, "nothing to synchronize");
                Ok(())
            }
            StoreEvent::PreStore => synchronizer.pre_store(session, pojo),
            StoreEvent::PostStore => synchronizer.post_store(session, pojo),
            StoreEvent::PreDirty => synchronizer.pre_dirty(session, pojo),
            StoreEvent::PreDelete => synchronizer.pre_delete(session, pojo),
            StoreEvent::PostDelete => synchronizer.post_delete(session, pojo),
            StoreEvent::PostLoad => synchronizer.post_load(session, pojo),
            StoreEvent::LazilyLoaded => synchronizer.lazily_loaded(session, pojo).map(|_| ()),
        };

        if let Err(err) = &outcome {
            event!(Level::ERROR, error = %err, "synchronization failed");
        }
        outcome
    }
}
