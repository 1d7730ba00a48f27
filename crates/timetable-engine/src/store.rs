//! Persistence port for whole timetables.
//!
//! Plain get/replace semantics: `load` of an owner that was never saved yields
//! an empty timetable, `save` overwrites whatever was there.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use tracing::debug;

use crate::collection::TimetableCollection;
use crate::error::{Result, TimetableError};
use crate::interval::OwnerRef;

#[async_trait]
pub trait TimetableStore: Send + Sync {
    async fn load(&self, owner: &OwnerRef) -> Result<TimetableCollection>;
    async fn save(&self, collection: &TimetableCollection) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    timetables: RwLock<HashMap<OwnerRef, TimetableCollection>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> TimetableError {
    TimetableError::Store("timetable store lock poisoned".to_string())
}

#[async_trait]
impl TimetableStore for InMemoryStore {
    async fn load(&self, owner: &OwnerRef) -> Result<TimetableCollection> {
        let timetables = self.timetables.read().map_err(|_| poisoned())?;
        Ok(timetables
            .get(owner)
            .cloned()
            .unwrap_or_else(|| TimetableCollection::new(owner.clone())))
    }

    async fn save(&self, collection: &TimetableCollection) -> Result<()> {
        let mut timetables = self.timetables.write().map_err(|_| poisoned())?;
        debug!(owner = %collection.owner, entries = collection.len(), "saving timetable");
        timetables.insert(collection.owner.clone(), collection.clone());
        Ok(())
    }
}
