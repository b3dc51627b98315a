//! Bounded translation cache with insertion-order eviction.

use std::collections::{HashMap, VecDeque};

use crate::types::{Translation, TranslationRequest};

/// Caches completed translations keyed by the full request.
///
/// Eviction is strictly insertion-ordered: when full, the oldest entry
/// goes, regardless of how recently it was read. Lookups never refresh
/// an entry's position.
pub struct TranslationCache {
    entries: HashMap<TranslationRequest, Translation>,
    order: VecDeque<TranslationRequest>,
    capacity: usize,
}

impl TranslationCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn get(&self, request: &TranslationRequest) -> Option<&Translation> {
        self.entries.get(request)
    }

    /// Stores a translation, evicting the oldest entry if at capacity.
    /// Re-inserting an existing key overwrites the value in place.
    pub fn insert(&mut self, request: TranslationRequest, translation: Translation) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.contains_key(&request) {
            self.entries.insert(request, translation);
            return;
        }
        if self.entries.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
        self.order.push_back(request.clone());
        self.entries.insert(request, translation);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(text: &str) -> TranslationRequest {
        TranslationRequest::new(text, "es", "en")
    }

    fn tr(text: &str) -> Translation {
        Translation {
            text: text.into(),
            provider: "test",
        }
    }

    #[test]
    fn stores_and_retrieves() {
        let mut cache = TranslationCache::new(4);
        cache.insert(req("hola"), tr("hello"));
        assert_eq!(cache.get(&req("hola")).unwrap().text, "hello");
        assert!(cache.get(&req("adios")).is_none());
    }

    #[test]
    fn evicts_oldest_insertion_first() {
        let mut cache = TranslationCache::new(2);
        cache.insert(req("uno"), tr("one"));
        cache.insert(req("dos"), tr("two"));
        cache.insert(req("tres"), tr("three"));

        assert!(cache.get(&req("uno")).is_none());
        assert!(cache.get(&req("dos")).is_some());
        assert!(cache.get(&req("tres")).is_some());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn reads_do_not_refresh_position() {
        let mut cache = TranslationCache::new(2);
        cache.insert(req("uno"), tr("one"));
        cache.insert(req("dos"), tr("two"));

        // Touch the oldest entry, then overflow. It must still be evicted.
        assert!(cache.get(&req("uno")).is_some());
        cache.insert(req("tres"), tr("three"));
        assert!(cache.get(&req("uno")).is_none());
    }

    #[test]
    fn reinsert_overwrites_without_eviction() {
        let mut cache = TranslationCache::new(2);
        cache.insert(req("uno"), tr("one"));
        cache.insert(req("dos"), tr("two"));
        cache.insert(req("uno"), tr("ONE"));

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&req("uno")).unwrap().text, "ONE");
        assert!(cache.get(&req("dos")).is_some());
    }

    #[test]
    fn different_targets_are_distinct_keys() {
        let mut cache = TranslationCache::new(4);
        cache.insert(TranslationRequest::new("hola", "es", "en"), tr("hello"));
        cache.insert(TranslationRequest::new("hola", "es", "fr"), tr("salut"));
        assert_eq!(
            cache
                .get(&TranslationRequest::new("hola", "es", "en"))
                .unwrap()
                .text,
            "hello"
        );
        assert_eq!(
            cache
                .get(&TranslationRequest::new("hola", "es", "fr"))
                .unwrap()
                .text,
            "salut"
        );
    }

    #[test]
    fn zero_capacity_never_stores() {
        let mut cache = TranslationCache::new(0);
        cache.insert(req("hola"), tr("hello"));
        assert!(cache.is_empty());
    }
}
