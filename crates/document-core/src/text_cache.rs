//! Cache of laid-out texts, owned by whoever renders documents.
//!
//! Entries are keyed by document and layout width. Looking an entry up with
//! [`TextCache::find_fit`] takes it out of the cache: the caller owns the layout again until it
//! hands it back with [`TextCache::add`].

use crate::ids::DocumentId;
use std::collections::HashMap;
use tracing::trace;

/// Layout cache keyed by `(document, width)`.
#[derive(Debug, Clone)]
pub struct TextCache<T> {
    entries: HashMap<(DocumentId, u32), T>,
}

impl<T> Default for TextCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TextCache<T> {
    /// Empty cache.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Store `layout` for `doc` at `width`, returning the entry it replaces.
    pub fn add(&mut self, doc: DocumentId, width: u32, layout: T) -> Option<T> {
        trace!(document = %doc, width, "text cache add");
        self.entries.insert((doc, width), layout)
    }

    /// Take the entry for `doc` at exactly `width` out of the cache.
    pub fn find_fit(&mut self, doc: DocumentId, width: u32) -> Option<T> {
        self.entries.remove(&(doc, width))
    }

    /// Returns `true` if an entry for `doc` at `width` exists.
    pub fn contains(&self, doc: DocumentId, width: u32) -> bool {
        self.entries.contains_key(&(doc, width))
    }

    /// Drop every entry of `doc`. Returns how many were dropped.
    pub fn remove_all_with(&mut self, doc: DocumentId) -> usize {
        let before = self.entries.len();
        self.entries.retain(|(owner, _), _| *owner != doc);
        let removed = before - self.entries.len();
        trace!(document = %doc, removed, "text cache purged");
        removed
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_fit_takes_entry() {
        let doc = DocumentId::next();
        let mut cache = TextCache::new();
        assert_eq!(cache.add(doc, 80, "layout"), None);
        assert!(cache.contains(doc, 80));
        assert_eq!(cache.find_fit(doc, 72), None);
        assert_eq!(cache.find_fit(doc, 80), Some("layout"));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_remove_all_with() {
        let a = DocumentId::next();
        let b = DocumentId::next();
        let mut cache = TextCache::new();
        cache.add(a, 80, 1);
        cache.add(a, 100, 2);
        cache.add(b, 80, 3);
        assert_eq!(cache.remove_all_with(a), 2);
        assert_eq!(cache.len(), 1);
        assert!(cache.contains(b, 80));
        cache.clear();
        assert!(cache.is_empty());
    }
}
