//! Scripted field reader
//!
//! Stands in for the byte-level reader of a real process. Each address is
//! scripted to return a value or to fail, and every read is counted so tests
//! can assert how often the cache went back to the source.

// Test doubles keep their panics and error docs implicit
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};
use procmirror_domain::{Address, FetchError};

use crate::cache::FieldReader;

enum Script<F> {
    Value(F),
    Fail(String),
}

/// [`FieldReader`] answering from a per-address script.
///
/// Unscripted addresses fail with `"unmapped address"`.
pub struct ScriptedReader<F> {
    scripts: RwLock<HashMap<Address, Script<F>>>,
    reads: AtomicU64,
    reads_by_address: Mutex<HashMap<Address, u64>>,
}

impl<F> ScriptedReader<F>
where
    F: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            scripts: RwLock::new(HashMap::new()),
            reads: AtomicU64::new(0),
            reads_by_address: Mutex::new(HashMap::new()),
        }
    }

    /// Reader pre-scripted with `values`.
    pub fn with_values(values: impl IntoIterator<Item = (Address, F)>) -> Self {
        let reader = Self::new();
        for (address, value) in values {
            reader.set(address, value);
        }
        reader
    }

    /// Answer reads at `address` with `value` from now on.
    pub fn set(&self, address: Address, value: F) {
        self.scripts.write().insert(address, Script::Value(value));
    }

    /// Fail reads at `address` with `reason` from now on.
    pub fn fail(&self, address: Address, reason: impl Into<String>) {
        self.scripts.write().insert(address, Script::Fail(reason.into()));
    }

    /// Make `address` unmapped again.
    pub fn forget(&self, address: Address) {
        self.scripts.write().remove(&address);
    }

    /// Total reads across all addresses.
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    /// Reads attempted at `address`.
    pub fn reads_at(&self, address: Address) -> u64 {
        self.reads_by_address.lock().get(&address).copied().unwrap_or(0)
    }
}

impl<F> Default for ScriptedReader<F>
where
    F: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<F> FieldReader for ScriptedReader<F>
where
    F: Clone + Send + Sync + 'static,
{
    type Fields = F;

    fn read_fields(&self, address: Address) -> Result<F, FetchError> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        *self.reads_by_address.lock().entry(address).or_insert(0) += 1;

        match self.scripts.read().get(&address) {
            Some(Script::Value(value)) => Ok(value.clone()),
            Some(Script::Fail(reason)) => Err(FetchError::new(address, reason.clone())),
            None => Err(FetchError::new(address, "unmapped address")),
        }
    }
}

impl<F> fmt::Debug for ScriptedReader<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptedReader")
            .field("scripted", &self.scripts.read().len())
            .field("reads", &self.reads.load(Ordering::Relaxed))
            .finish()
    }
}
