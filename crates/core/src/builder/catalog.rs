use crate::domain::catalog::CatalogEntry;

pub const MAX_SEARCH_RESULTS: usize = 10;

#[derive(Clone, Debug)]
struct IndexedEntry {
    entry: CatalogEntry,
    name: String,
    sku: String,
    brand: Option<String>,
}

impl IndexedEntry {
    fn new(entry: CatalogEntry) -> Self {
        Self {
            name: entry.name.to_lowercase(),
            sku: entry.sku.as_str().to_lowercase(),
            brand: entry.brand.as_deref().map(str::to_lowercase),
            entry,
        }
    }

    fn matches(&self, needle: &str) -> bool {
        self.name.contains(needle)
            || self.sku.contains(needle)
            || self.brand.as_deref().is_some_and(|brand| brand.contains(needle))
    }
}

/// In-memory product search over a catalog fetched once per session.
///
/// Results come back in catalog order, not by relevance. Every search is a
/// single linear scan over keys lowercased at load time.
#[derive(Clone, Debug, Default)]
pub struct CatalogMatcher {
    entries: Vec<IndexedEntry>,
}

impl CatalogMatcher {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        let mut matcher = Self::default();
        matcher.load(entries);
        matcher
    }

    pub fn load(&mut self, entries: Vec<CatalogEntry>) {
        self.entries = entries.into_iter().map(IndexedEntry::new).collect();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// A blank query is suppressed rather than matching everything.
    pub fn search(&self, query: &str) -> Vec<&CatalogEntry> {
        if query.trim().is_empty() {
            return Vec::new();
        }

        let needle = query.to_lowercase();
        self.entries
            .iter()
            .filter(|indexed| indexed.matches(&needle))
            .map(|indexed| &indexed.entry)
            .take(MAX_SEARCH_RESULTS)
            .collect()
    }

    pub fn find_by_sku(&self, sku: &str) -> Option<&CatalogEntry> {
        let needle = sku.trim().to_lowercase();
        self.entries.iter().find(|indexed| indexed.sku == needle).map(|indexed| &indexed.entry)
    }
}
