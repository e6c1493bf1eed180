//! In-memory row source implementation for testing and development

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use crate::traits::RowSource;
use crate::types::{Provenance, RawRow, RekonError, RekonResult};

/// In-memory [`RowSource`] for tests and demos
///
/// Batches are keyed by (bank code, provenance). Banks registered through
/// [`MemoryRowSource::fail_bank`] error on fetch, which exercises the
/// orchestrator's per-bank failure isolation.
#[derive(Debug, Clone)]
pub struct MemoryRowSource {
    batches: Arc<RwLock<HashMap<(String, Provenance), Vec<RawRow>>>>,
    failing: Arc<RwLock<HashSet<String>>>,
}

impl MemoryRowSource {
    /// Create a new empty source
    pub fn new() -> Self {
        Self {
            batches: Arc::new(RwLock::new(HashMap::new())),
            failing: Arc::new(RwLock::new(HashSet::new())),
        }
    }

    /// Register a batch of raw rows for one bank and side
    pub fn push_batch(&self, bank_code: &str, provenance: Provenance, rows: Vec<RawRow>) {
        self.batches
            .write()
            .unwrap()
            .entry((bank_code.to_string(), provenance))
            .or_default()
            .extend(rows);
    }

    /// Make every fetch for a bank fail with a source error
    pub fn fail_bank(&self, bank_code: &str) {
        self.failing.write().unwrap().insert(bank_code.to_string());
    }

    /// Clear all data (useful for testing)
    pub fn clear(&self) {
        self.batches.write().unwrap().clear();
        self.failing.write().unwrap().clear();
    }
}

impl Default for MemoryRowSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RowSource for MemoryRowSource {
    async fn fetch_rows(
        &self,
        bank_code: &str,
        provenance: Provenance,
    ) -> RekonResult<Vec<RawRow>> {
        if self.failing.read().unwrap().contains(bank_code) {
            return Err(RekonError::Source(format!(
                "simulated ingestion failure for bank '{}'",
                bank_code
            )));
        }

        Ok(self
            .batches
            .read()
            .unwrap()
            .get(&(bank_code.to_string(), provenance))
            .cloned()
            .unwrap_or_default())
    }
}
