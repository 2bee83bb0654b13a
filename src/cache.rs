//! Client-side company cache
//!
//! The cache mirrors the full company list as last returned by the server.
//! It is only ever replaced wholesale: derived fields (latest price,
//! statistics) are joined server-side and cannot be rebuilt from a write
//! payload, so there is no per-row patching.

use crate::api::types::Company;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Local filter over symbol, name and sector; blank components match all
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompanyFilter {
    pub symbol: Option<String>,
    pub name: Option<String>,
    pub sector: Option<String>,
}

impl CompanyFilter {
    pub fn new(symbol: Option<&str>, name: Option<&str>, sector: Option<&str>) -> Self {
        Self {
            symbol: symbol.map(str::to_string),
            name: name.map(str::to_string),
            sector: sector.map(str::to_string),
        }
    }

    fn needle(value: &Option<String>) -> Option<String> {
        value
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }

    /// Case-insensitive substring match on every non-blank component
    pub fn matches(&self, company: &Company) -> bool {
        let symbol_ok = Self::needle(&self.symbol)
            .map(|n| company.symbol.to_lowercase().contains(&n))
            .unwrap_or(true);

        let name_ok = Self::needle(&self.name)
            .map(|n| company.name.to_lowercase().contains(&n))
            .unwrap_or(true);

        // A company without a sector never matches a sector filter
        let sector_ok = Self::needle(&self.sector)
            .map(|n| {
                company
                    .sector
                    .as_deref()
                    .map(|s| s.to_lowercase().contains(&n))
                    .unwrap_or(false)
            })
            .unwrap_or(true);

        symbol_ok && name_ok && sector_ok
    }

    pub fn is_empty(&self) -> bool {
        Self::needle(&self.symbol).is_none()
            && Self::needle(&self.name).is_none()
            && Self::needle(&self.sector).is_none()
    }
}

/// One immutable generation of cached companies
#[derive(Debug, Default)]
struct Snapshot {
    companies: Vec<Company>,
    by_id: HashMap<i64, usize>,
}

impl Snapshot {
    fn build(companies: Vec<Company>) -> Self {
        let by_id = companies
            .iter()
            .enumerate()
            .map(|(idx, c)| (c.id, idx))
            .collect();
        Self { companies, by_id }
    }
}

/// Ordered company list plus id index, swapped atomically on load
#[derive(Debug, Default)]
pub struct CompanyCache {
    snapshot: RwLock<Arc<Snapshot>>,
    generation: RwLock<u64>,
}

impl CompanyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole cache; returns the number of companies now cached
    pub fn replace(&self, companies: Vec<Company>) -> usize {
        let count = companies.len();
        let snapshot = Arc::new(Snapshot::build(companies));

        *self.snapshot.write() = snapshot;
        *self.generation.write() += 1;

        tracing::info!("Loaded {} companies into cache", count);
        count
    }

    /// Number of successful loads so far
    pub fn generation(&self) -> u64 {
        *self.generation.read()
    }

    pub fn is_loaded(&self) -> bool {
        self.generation() > 0
    }

    pub fn len(&self) -> usize {
        self.snapshot.read().companies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Full contents in server order
    pub fn all(&self) -> Vec<Company> {
        self.snapshot.read().companies.clone()
    }

    /// Local lookup only; `None` means "not currently cached"
    pub fn find_by_id(&self, id: i64) -> Option<Company> {
        let snapshot = self.snapshot.read().clone();
        snapshot
            .by_id
            .get(&id)
            .and_then(|idx| snapshot.companies.get(*idx))
            .cloned()
    }

    pub fn find_by_symbol(&self, symbol: &str) -> Option<Company> {
        self.snapshot
            .read()
            .companies
            .iter()
            .find(|c| c.symbol == symbol)
            .cloned()
    }

    /// Pure view over the cache, order preserved
    pub fn filter(&self, filter: &CompanyFilter) -> Vec<Company> {
        let snapshot = self.snapshot.read().clone();
        snapshot
            .companies
            .iter()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect()
    }
}
