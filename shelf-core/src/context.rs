//! Per-run state handed to adapters.
//!
//! Static lookup tables (genre names, category dictionaries) are read at most
//! once per run and kept in a [`LookupCache`] owned by the [`RunContext`].
//! Nothing here outlives one reconciliation invocation.

use std::collections::HashMap;

use crate::normalize::Normalizer;

/// A per-run cache of `code -> display name` dictionaries, keyed by table name.
#[derive(Debug, Default)]
pub struct LookupCache {
    tables: HashMap<String, HashMap<String, String>>,
    fills: usize,
}

impl LookupCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the dictionary for `table`, calling `fill` only the first time.
    ///
    /// A failed fill is not cached, so the next call retries.
    pub fn get_or_fill<F, E>(&mut self, table: &str, fill: F) -> Result<&HashMap<String, String>, E>
    where
        F: FnOnce() -> Result<HashMap<String, String>, E>,
    {
        if !self.tables.contains_key(table) {
            let dict = fill()?;
            log::debug!("Lookup table '{}' filled with {} entries", table, dict.len());
            self.fills += 1;
            self.tables.insert(table.to_string(), dict);
        }
        Ok(&self.tables[table])
    }

    pub fn get(&self, table: &str) -> Option<&HashMap<String, String>> {
        self.tables.get(table)
    }

    /// Number of times any table was filled. Useful to verify one read per run.
    pub fn fill_count(&self) -> usize {
        self.fills
    }
}

/// Everything an adapter may need to carry across tables of one run.
#[derive(Debug, Default)]
pub struct RunContext {
    pub normalizer: Normalizer,
    pub lookups: LookupCache,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }
}
