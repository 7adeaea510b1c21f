use crate::core::{ObjectTag, Oid, Pojo, Result, SyncError, Version};
use crate::sync::{LifecycleListener, ObjectStore, StoreEvent};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

type RowKey = (String, String);

#[derive(Debug)]
struct Row {
    pojo: Pojo,
    version: Version,
    deleted: bool,
}

#[derive(Debug, Default)]
struct Rows {
    by_key: HashMap<RowKey, Row>,
    by_tag: HashMap<ObjectTag, RowKey>,
    next_id: u64,
}

impl Rows {
    fn row_for(&self, pojo: &Pojo) -> Option<(&RowKey, &Row)> {
        let key = self.by_tag.get(&pojo.tag())?;
        self.by_key.get(key).map(|row| (key, row))
    }

    fn row_for_mut(&mut self, pojo: &Pojo) -> Option<&mut Row> {
        let key = self.by_tag.get(&pojo.tag())?;
        self.by_key.get_mut(key)
    }

    fn insert(&mut self, pojo: &Pojo) -> RowKey {
        self.next_id += 1;
        let key = (pojo.object_type().to_string(), self.next_id.to_string());
        self.by_tag.insert(pojo.tag(), key.clone());
        self.by_key.insert(
            key.clone(),
            Row {
                pojo: pojo.clone(),
                version: Version::new(1).with_time(Utc::now()),
                deleted: false,
            },
        );
        key
    }
}

/// Reference object store that keeps rows in memory and raises the native
/// lifecycle callbacks a real engine would.
///
/// The lock on the rows is always released before a callback is raised.
#[derive(Debug, Default)]
pub struct InMemoryObjectStore {
    rows: Mutex<Rows>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn rows(&self) -> MutexGuard<'_, Rows> {
        self.rows.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores a new object, assigning it an identifier and version 1.
    pub fn make_persistent(&self, pojo: &Pojo, listener: &dyn LifecycleListener) -> Result<Oid> {
        if self.is_persistent(pojo) {
            return Err(SyncError::Store(format!("{:?} is already persistent", pojo)));
        }

        listener.on_store_event(StoreEvent::PostCreate, pojo)?;
        listener.on_store_event(StoreEvent::PreStore, pojo)?;
        let (object_type, identifier) = self.rows.lock()?.insert(pojo);
        listener.on_store_event(StoreEvent::PostStore, pojo)?;

        Ok(Oid::persistent(object_type, identifier))
    }

    /// Announces that a field of a stored object is about to change.
    pub fn mark_dirty(&self, pojo: &Pojo, listener: &dyn LifecycleListener) -> Result<()> {
        self.ensure_live(pojo)?;
        listener.on_store_event(StoreEvent::PreDirty, pojo)?;
        listener.on_store_event(StoreEvent::PostDirty, pojo)
    }

    /// Flushes an update, bumping the stored version.
    pub fn store_changes(&self, pojo: &Pojo, listener: &dyn LifecycleListener) -> Result<()> {
        self.ensure_live(pojo)?;
        listener.on_store_event(StoreEvent::PreStore, pojo)?;
        {
            let mut rows = self.rows.lock()?;
            let row = rows
                .row_for_mut(pojo)
                .ok_or_else(|| SyncError::Store(format!("{:?} vanished during store", pojo)))?;
            row.version = Version::new(row.version.sequence() + 1).with_time(Utc::now());
        }
        listener.on_store_event(StoreEvent::PostStore, pojo)
    }

    pub fn delete(&self, pojo: &Pojo, listener: &dyn LifecycleListener) -> Result<()> {
        self.ensure_live(pojo)?;
        listener.on_store_event(StoreEvent::PreDelete, pojo)?;
        if let Some(row) = self.rows.lock()?.row_for_mut(pojo) {
            row.deleted = true;
        }
        listener.on_store_event(StoreEvent::PostDelete, pojo)
    }

    /// Adds a row without raising any callback, as a store does when it
    /// materializes a related object on its own.
    pub fn insert_silently(&self, pojo: &Pojo) -> Result<Oid> {
        let (object_type, identifier) = self.rows.lock()?.insert(pojo);
        Ok(Oid::persistent(object_type, identifier))
    }

    /// Simulates another session committing a change to `oid`.
    pub fn bump_version(&self, oid: &Oid, user: &str) -> Result<Version> {
        let mut rows = self.rows.lock()?;
        let row = rows
            .by_key
            .get_mut(&row_key(oid))
            .ok_or_else(|| SyncError::ObjectNotFound(oid.enstring()))?;
        row.version = Version::new(row.version.sequence() + 1)
            .with_user(user)
            .with_time(Utc::now());
        Ok(row.version.clone())
    }

    /// Makes later loads of `oid` hand back `pojo` instead of the instance
    /// held so far, as after an eviction and re-fetch.
    pub fn replace_instance(&self, oid: &Oid, pojo: &Pojo) -> Result<()> {
        let mut rows = self.rows.lock()?;
        let key = row_key(oid);
        let row = rows
            .by_key
            .get_mut(&key)
            .ok_or_else(|| SyncError::ObjectNotFound(oid.enstring()))?;
        let previous = std::mem::replace(&mut row.pojo, pojo.clone());
        rows.by_tag.remove(&previous.tag());
        rows.by_tag.insert(pojo.tag(), key);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rows().by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn ensure_live(&self, pojo: &Pojo) -> Result<()> {
        match self.rows().row_for(pojo) {
            Some((_, row)) if !row.deleted => Ok(()),
            Some(_) => Err(SyncError::Store(format!("{:?} is deleted", pojo))),
            None => Err(SyncError::Store(format!("{:?} is not persistent", pojo))),
        }
    }
}

fn row_key(oid: &Oid) -> RowKey {
    (oid.object_type().to_string(), oid.identifier())
}

impl ObjectStore for InMemoryObjectStore {
    fn current_version(&self, pojo: &Pojo) -> Option<Version> {
        self.rows().row_for(pojo).map(|(_, row)| row.version.clone())
    }

    fn is_persistent(&self, pojo: &Pojo) -> bool {
        self.rows().row_for(pojo).is_some()
    }

    fn is_deleted(&self, pojo: &Pojo) -> bool {
        self.rows().row_for(pojo).is_some_and(|(_, row)| row.deleted)
    }

    fn object_identifier(&self, pojo: &Pojo) -> Option<String> {
        self.rows().row_for(pojo).map(|(key, _)| key.1.clone())
    }

    fn load_by_primary_key(&self, oid: &Oid, listener: &dyn LifecycleListener) -> Result<Pojo> {
        if !oid.is_persistent() {
            return Err(SyncError::ObjectNotFound(format!(
                "{} is not a persistent oid",
                oid
            )));
        }

        let pojo = {
            let rows = self.rows.lock()?;
            match rows.by_key.get(&row_key(oid)) {
                Some(row) if !row.deleted => row.pojo.clone(),
                _ => return Err(SyncError::ObjectNotFound(oid.enstring())),
            }
        };

        listener.on_store_event(StoreEvent::PostLoad, &pojo)?;
        Ok(pojo)
    }
}
