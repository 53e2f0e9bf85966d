//! Bounded cache of parsed schemas.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;
use tracing::debug;

use crate::error::SchemaError;
use crate::schema::{parse_schema_with_options, Schema};

/// Default number of schemas kept.
pub const DEFAULT_CAPACITY: NonZeroUsize = match NonZeroUsize::new(32) {
    Some(capacity) => capacity,
    None => panic!("capacity must be nonzero"),
};

/// LRU cache of parsed schemas keyed by schema text.
///
/// Hosts that decode many payloads against a handful of schemas parse each
/// schema once. Failed parses are not cached. The cache is safe to share
/// between threads; the lock is held only for lookups and inserts, never
/// while parsing.
#[derive(Debug)]
pub struct SchemaCache {
    entries: Mutex<LruCache<String, Arc<Schema>>>,
    strict: bool,
}

impl Default for SchemaCache {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaCache {
    /// Create a cache holding up to 32 schemas.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: NonZeroUsize) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            strict: false,
        }
    }

    /// Parse schemas with strict name validation.
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Return the cached schema for `text`, parsing it on a miss.
    pub fn get_or_parse(&self, text: &str) -> Result<Arc<Schema>, SchemaError> {
        if let Some(schema) = self.entries.lock().get(text) {
            return Ok(Arc::clone(schema));
        }

        let parsed = Arc::new(parse_schema_with_options(text, self.strict)?);

        let mut entries = self.entries.lock();
        // Another thread may have inserted the same text meanwhile; keep its copy
        let schema = Arc::clone(entries.get_or_insert(text.to_string(), || parsed));
        debug!(cached = entries.len(), "schema cache miss");
        Ok(schema)
    }

    /// Number of cached schemas.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn capacity(&self) -> NonZeroUsize {
        self.entries.lock().cap()
    }

    /// Drop every cached schema.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}
