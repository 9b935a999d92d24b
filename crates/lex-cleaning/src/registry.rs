//! Registry of uploads that have already been cleaned.
//!
//! The pipeline only talks to the [`ContentRegistry`] trait; where hashes are
//! stored is the caller's decision. [`InMemoryRegistry`] keeps them for the
//! lifetime of the process.

use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::collections::HashSet;

/// Lower-case hex SHA-256 of raw file bytes.
pub fn content_hash(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Remembers content hashes across runs.
pub trait ContentRegistry: Send + Sync {
    fn contains(&self, hash: &str) -> bool;
    fn record(&self, hash: &str);
}

#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    seen: Mutex<HashSet<String>>,
}

static_assertions::assert_impl_all!(InMemoryRegistry: Send, Sync);

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.seen.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.lock().is_empty()
    }
}

impl ContentRegistry for InMemoryRegistry {
    fn contains(&self, hash: &str) -> bool {
        self.seen.lock().contains(hash)
    }

    fn record(&self, hash: &str) {
        self.seen.lock().insert(hash.to_string());
    }
}
