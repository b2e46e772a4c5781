use crate::table::Table;
use std::sync::{Arc, RwLock};

/// Single-entry cache holding the last successfully loaded table and the source it came from.
///
/// Readers clone the `Arc` and never block each other. A store replaces the whole entry under
/// the write lock, so a reader sees either the old table or the new one, never a mix.
#[derive(Default)]
pub struct CacheSlot {
    entry: RwLock<Option<(String, Arc<Table>)>>,
}

impl CacheSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached table for `source`, if the slot currently holds that source.
    pub fn get(&self, source: &str) -> Option<Arc<Table>> {
        let guard = self.entry.read().unwrap_or_else(|e| e.into_inner());
        match guard.as_ref() {
            Some((key, table)) if key == source => Some(Arc::clone(table)),
            _ => None,
        }
    }

    /// Replace the entry. Any previously cached source is evicted.
    pub fn store(&self, source: &str, table: Arc<Table>) {
        let mut guard = self.entry.write().unwrap_or_else(|e| e.into_inner());
        *guard = Some((source.to_string(), table));
    }

    /// Drop the cached entry so the next load fetches again.
    pub fn invalidate(&self) {
        let mut guard = self.entry.write().unwrap_or_else(|e| e.into_inner());
        *guard = None;
    }

    /// Source identifier currently cached.
    pub fn cached_source(&self) -> Option<String> {
        let guard = self.entry.read().unwrap_or_else(|e| e.into_inner());
        guard.as_ref().map(|(key, _)| key.clone())
    }
}
