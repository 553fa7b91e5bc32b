//! Per-package symbol usage aggregation.
//!
//! The registry records, for every bound package, which of its symbols the
//! project references and at which distinct locations. Recording is set
//! based, so repeated or overlapping query results merge cleanly.

use std::collections::{HashMap, HashSet};

use crate::graph::PackageKey;
use crate::oracle::{FileId, Location, SymbolId, SymbolReference};

type SymbolLocations = HashMap<SymbolId, HashSet<Location>>;

/// Aggregated symbol references of one project.
#[derive(Debug, Default)]
pub struct UsageRegistry {
    packages: HashMap<PackageKey, SymbolLocations>,
}

impl UsageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a package with no references. Existing entries are kept.
    pub fn add_package(&mut self, key: &PackageKey) {
        self.packages.entry(key.clone()).or_default();
    }

    /// Records `locations` as references to `symbol` of package `key`.
    ///
    /// Returns the number of locations that were not already recorded. An
    /// empty location set records nothing, not even the symbol.
    pub fn add_references<I>(&mut self, key: &PackageKey, symbol: &SymbolId, locations: I) -> usize
    where
        I: IntoIterator<Item = Location>,
    {
        let mut locations = locations.into_iter().peekable();
        let symbols = self.packages.entry(key.clone()).or_default();
        if locations.peek().is_none() {
            return 0;
        }

        let recorded = symbols.entry(symbol.clone()).or_default();
        locations.filter(|loc| recorded.insert(loc.clone())).count()
    }

    /// Records the results of one reference query.
    pub fn add_symbol_references(&mut self, key: &PackageKey, references: Vec<SymbolReference>) -> usize {
        let mut by_symbol: HashMap<SymbolId, Vec<Location>> = HashMap::new();
        for reference in references {
            by_symbol
                .entry(reference.symbol)
                .or_default()
                .push(reference.location);
        }

        by_symbol
            .into_iter()
            .map(|(symbol, locations)| self.add_references(key, &symbol, locations))
            .sum()
    }

    /// Number of distinct symbols of `key` referenced at least once.
    pub fn used_symbol_count(&self, key: &PackageKey) -> usize {
        self.packages.get(key).map_or(0, |symbols| symbols.len())
    }

    /// Distinct files containing at least one reference into `key`.
    pub fn distinct_referencing_files(&self, key: &PackageKey) -> HashSet<&FileId> {
        self.packages
            .get(key)
            .map(|symbols| {
                symbols
                    .values()
                    .flat_map(|locations| locations.iter().map(|loc| &loc.file))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Total distinct locations recorded for `key`.
    pub fn reference_count(&self, key: &PackageKey) -> usize {
        self.packages
            .get(key)
            .map_or(0, |symbols| symbols.values().map(HashSet::len).sum())
    }

    pub fn package_count(&self) -> usize {
        self.packages.len()
    }
}
