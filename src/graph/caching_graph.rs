//! Result cache in front of a [`Graph`].
//!
//! Two LRU tables keyed by [`TripleMatch`]: one holds the triples of
//! `find`, the other the answer of `contains`. Every key owns a slot whose
//! lock is held while the wrapped graph computes it, so concurrent callers
//! asking for the same missing key wait for one computation instead of
//! starting their own.
//!
//! The estimated size of a find bucket is the weighted length of its terms.
//! A bucket larger than the whole byte budget is remembered as out of space
//! and later lookups for it go straight to the wrapped graph.
//!
//! # Configuration
//!
//! See [`ResultCacheConfig`]; environment variables `RELGRAPH_CACHE_*`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::errors::GraphError;
use super::graph::Graph;
use super::triple::{Triple, TripleMatch};
use crate::config::ResultCacheConfig;
use crate::node_maker::node::{OWL_NS, RDFS_NS, RDF_NS, XSD_NS};
use crate::node_maker::Node;

const VOCABULARY_NAMESPACES: [&str; 4] = [RDF_NS, RDFS_NS, OWL_NS, XSD_NS];

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Cached value of one key
#[derive(Debug, Clone)]
enum Cached<V> {
    Value(V),
    OutOfSpace,
}

/// One key's entry; its value lock doubles as the in-flight computation lock.
struct CacheSlot<V> {
    value: Mutex<Option<Cached<V>>>,
    /// Estimated bytes, counted once the value is stored
    cost: AtomicUsize,
    /// Tick of the last lookup (for LRU)
    last_accessed: AtomicU64,
}

impl<V> CacheSlot<V> {
    fn new(tick: u64) -> Self {
        CacheSlot {
            value: Mutex::new(None),
            cost: AtomicUsize::new(0),
            last_accessed: AtomicU64::new(tick),
        }
    }
}

struct CacheTable<V> {
    slots: HashMap<TripleMatch, Arc<CacheSlot<V>>>,
    size_bytes: usize,
}

impl<V> CacheTable<V> {
    fn new() -> Self {
        CacheTable {
            slots: HashMap::new(),
            size_bytes: 0,
        }
    }
}

/// Read-only caching decorator for a [`Graph`].
pub struct CachingGraph<G> {
    inner: G,
    config: ResultCacheConfig,
    find_cache: Mutex<CacheTable<Vec<Triple>>>,
    exists_cache: Mutex<CacheTable<bool>>,
    clock: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    bypasses: AtomicU64,
    evictions: AtomicU64,
}

impl<G: Graph> CachingGraph<G> {
    pub fn new(inner: G, config: ResultCacheConfig) -> Self {
        CachingGraph {
            inner,
            config,
            find_cache: Mutex::new(CacheTable::new()),
            exists_cache: Mutex::new(CacheTable::new()),
            clock: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            bypasses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn with_defaults(inner: G) -> Self {
        Self::new(inner, ResultCacheConfig::default())
    }

    pub fn inner(&self) -> &G {
        &self.inner
    }

    pub fn config(&self) -> &ResultCacheConfig {
        &self.config
    }

    /// Estimated size of one term.
    pub fn term_cost(&self, node: &Node) -> usize {
        match node {
            Node::Uri(uri) if VOCABULARY_NAMESPACES.iter().any(|ns| uri.starts_with(ns)) => 0,
            Node::Uri(uri) => uri.len() * self.config.uri_weight,
            Node::Literal(literal) => literal.lexical.len() * self.config.literal_weight,
            Node::Blank(label) => label.len() * self.config.blank_weight,
        }
    }

    /// Estimated size of a find bucket.
    pub fn bucket_cost(&self, triples: &[Triple]) -> usize {
        triples
            .iter()
            .map(|t| self.term_cost(&t.subject) + self.term_cost(&t.predicate) + self.term_cost(&t.object))
            .sum()
    }

    /// Clear both tables
    pub fn clear(&self) {
        let mut finds = lock(&self.find_cache);
        finds.slots.clear();
        finds.size_bytes = 0;
        lock(&self.exists_cache).slots.clear();
    }

    pub fn metrics(&self) -> CacheMetrics {
        let (find_entries, size_bytes) = {
            let finds = lock(&self.find_cache);
            (finds.slots.len(), finds.size_bytes)
        };
        CacheMetrics {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            bypasses: self.bypasses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            find_entries,
            exists_entries: lock(&self.exists_cache).slots.len(),
            size_bytes,
            max_size_bytes: self.config.max_size_bytes,
        }
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// The slot for `key`, created empty when missing.
    fn slot<V>(&self, table: &Mutex<CacheTable<V>>, key: &TripleMatch) -> Arc<CacheSlot<V>> {
        let tick = self.tick();
        let mut table = lock(table);
        let slot = table
            .slots
            .entry(key.clone())
            .or_insert_with(|| Arc::new(CacheSlot::new(tick)));
        slot.last_accessed.store(tick, Ordering::Relaxed);
        Arc::clone(slot)
    }

    /// Adds a stored slot's cost to its table and evicts least recently used
    /// entries until both limits hold again. `key` itself is never evicted.
    fn account<V>(
        &self,
        table: &Mutex<CacheTable<V>>,
        key: &TripleMatch,
        slot: &Arc<CacheSlot<V>>,
        max_entries: usize,
    ) {
        let mut table = lock(table);
        // Evicted while it was being computed
        if !table.slots.get(key).is_some_and(|s| Arc::ptr_eq(s, slot)) {
            return;
        }
        table.size_bytes += slot.cost.load(Ordering::Relaxed);

        while table.slots.len() > max_entries || table.size_bytes > self.config.max_size_bytes {
            let Some(victim) = table
                .slots
                .iter()
                .filter(|(k, _)| *k != key)
                .min_by_key(|(_, s)| s.last_accessed.load(Ordering::Relaxed))
                .map(|(k, _)| k.clone())
            else {
                break;
            };
            if let Some(evicted) = table.slots.remove(&victim) {
                table.size_bytes = table
                    .size_bytes
                    .saturating_sub(evicted.cost.load(Ordering::Relaxed));
                self.evictions.fetch_add(1, Ordering::Relaxed);
                log::trace!("Evicted cached result for {}", victim);
            }
        }
    }

    /// Drops a slot whose computation failed so the next caller retries.
    fn forget<V>(&self, table: &Mutex<CacheTable<V>>, key: &TripleMatch, slot: &Arc<CacheSlot<V>>) {
        let mut table = lock(table);
        if table.slots.get(key).is_some_and(|s| Arc::ptr_eq(s, slot)) {
            table.slots.remove(key);
        }
    }
}

impl<G: Graph> Graph for CachingGraph<G> {
    fn find(&self, pattern: &TripleMatch) -> Result<Vec<Triple>, GraphError> {
        if !self.config.enabled {
            return self.inner.find(pattern);
        }

        let slot = self.slot(&self.find_cache, pattern);
        let mut value = lock(&slot.value);
        match value.as_ref() {
            Some(Cached::Value(triples)) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(triples.clone());
            }
            Some(Cached::OutOfSpace) => {
                drop(value);
                self.bypasses.fetch_add(1, Ordering::Relaxed);
                log::debug!("Result for {} is too large to cache; querying directly", pattern);
                return self.inner.find(pattern);
            }
            None => {}
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let triples = match self.inner.find(pattern) {
            Ok(triples) => triples,
            Err(e) => {
                drop(value);
                self.forget(&self.find_cache, pattern, &slot);
                return Err(e);
            }
        };
        let cost = self.bucket_cost(&triples);
        if cost > self.config.max_size_bytes {
            log::debug!(
                "Result for {} needs {} bytes, over the {} byte budget",
                pattern,
                cost,
                self.config.max_size_bytes
            );
            *value = Some(Cached::OutOfSpace);
        } else {
            slot.cost.store(cost, Ordering::Relaxed);
            *value = Some(Cached::Value(triples.clone()));
        }
        drop(value);

        self.account(&self.find_cache, pattern, &slot, self.config.max_find_entries);
        Ok(triples)
    }

    fn contains(&self, pattern: &TripleMatch) -> Result<bool, GraphError> {
        if !self.config.enabled {
            return self.inner.contains(pattern);
        }

        let slot = self.slot(&self.exists_cache, pattern);
        let mut value = lock(&slot.value);
        if let Some(Cached::Value(found)) = value.as_ref() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(*found);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let found = match self.inner.contains(pattern) {
            Ok(found) => found,
            Err(e) => {
                drop(value);
                self.forget(&self.exists_cache, pattern, &slot);
                return Err(e);
            }
        };
        *value = Some(Cached::Value(found));
        drop(value);

        self.account(&self.exists_cache, pattern, &slot, self.config.max_exists_entries);
        Ok(found)
    }

    fn add(&self, _triple: &Triple) -> Result<(), GraphError> {
        Err(GraphError::ReadOnly { operation: "add" })
    }

    fn delete(&self, _triple: &Triple) -> Result<(), GraphError> {
        Err(GraphError::ReadOnly { operation: "delete" })
    }
}

/// Cache metrics for monitoring
#[derive(Debug, Clone, PartialEq)]
pub struct CacheMetrics {
    pub hits: u64,
    pub misses: u64,
    pub bypasses: u64,
    pub evictions: u64,
    pub find_entries: usize,
    pub exists_entries: usize,
    pub size_bytes: usize,
    pub max_size_bytes: usize,
}

impl CacheMetrics {
    /// Calculate cache hit rate (0.0 to 1.0)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses + self.bypasses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Calculate memory utilization (0.0 to 1.0)
    pub fn memory_utilization(&self) -> f64 {
        if self.max_size_bytes == 0 {
            0.0
        } else {
            self.size_bytes as f64 / self.max_size_bytes as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::Duration;

    use mockall::predicate::eq;

    use super::*;
    use crate::graph::graph::MockGraph;
    use crate::node_maker::node::RDF_TYPE;

    fn config(max_size_bytes: usize) -> ResultCacheConfig {
        ResultCacheConfig {
            max_size_bytes,
            ..ResultCacheConfig::default()
        }
    }

    fn triple(subject: &str, object: &str) -> Triple {
        Triple::new(
            Node::uri(subject),
            Node::uri("http://ex/p"),
            Node::plain_literal(object),
        )
    }

    fn by_subject(subject: &str) -> TripleMatch {
        TripleMatch::new(Some(Node::uri(subject)), None, None)
    }

    #[test]
    fn test_find_is_served_from_cache() {
        let mut mock = MockGraph::new();
        mock.expect_find()
            .with(eq(by_subject("http://ex/a")))
            .times(1)
            .returning(|_| Ok(vec![triple("http://ex/a", "x")]));
        let cache = CachingGraph::new(mock, config(1024));

        let first = cache.find(&by_subject("http://ex/a")).unwrap();
        let second = cache.find(&by_subject("http://ex/a")).unwrap();
        assert_eq!(first, second);

        let metrics = cache.metrics();
        assert_eq!((metrics.hits, metrics.misses), (1, 1));
        assert_eq!(metrics.find_entries, 1);
        // "http://ex/a" + "http://ex/p" + "x"
        assert_eq!(metrics.size_bytes, 11 + 11 + 1);
        assert_eq!(metrics.hit_rate(), 0.5);
    }

    #[test]
    fn test_oversized_bucket_bypasses_cache() {
        let mut mock = MockGraph::new();
        mock.expect_find()
            .times(2)
            .returning(|_| Ok(vec![triple("http://ex/a", "x"), triple("http://ex/b", "y")]));
        let cache = CachingGraph::new(mock, config(30));

        let key = TripleMatch::any();
        assert_eq!(cache.find(&key).unwrap().len(), 2);
        assert_eq!(cache.find(&key).unwrap().len(), 2);

        let metrics = cache.metrics();
        assert_eq!(metrics.misses, 1);
        assert_eq!(metrics.bypasses, 1);
        assert_eq!(metrics.hits, 0);
        assert_eq!(metrics.size_bytes, 0);
    }

    #[test]
    fn test_vocabulary_terms_are_free() {
        let cache = CachingGraph::new(MockGraph::new(), config(1024));
        assert_eq!(cache.term_cost(&Node::uri(RDF_TYPE)), 0);
        assert_eq!(cache.term_cost(&Node::uri("http://ex/a")), 11);
        assert_eq!(cache.term_cost(&Node::blank("b1")), 2);
        assert_eq!(cache.term_cost(&Node::lang_literal("chat", "fr")), 4);

        let weighted = CachingGraph::new(
            MockGraph::new(),
            ResultCacheConfig {
                uri_weight: 3,
                ..ResultCacheConfig::default()
            },
        );
        assert_eq!(weighted.term_cost(&Node::uri("http://ex/a")), 33);
    }

    #[test]
    fn test_least_recently_used_entry_is_evicted() {
        let mut mock = MockGraph::new();
        mock.expect_find()
            .with(eq(by_subject("http://ex/a")))
            .times(2)
            .returning(|_| Ok(vec![triple("http://ex/a", "x")]));
        mock.expect_find()
            .with(eq(by_subject("http://ex/b")))
            .times(1)
            .returning(|_| Ok(vec![triple("http://ex/b", "y")]));
        mock.expect_find()
            .with(eq(by_subject("http://ex/c")))
            .times(1)
            .returning(|_| Ok(vec![triple("http://ex/c", "z")]));
        let cache = CachingGraph::new(
            mock,
            ResultCacheConfig {
                max_find_entries: 2,
                ..ResultCacheConfig::default()
            },
        );

        cache.find(&by_subject("http://ex/a")).unwrap();
        cache.find(&by_subject("http://ex/b")).unwrap();
        cache.find(&by_subject("http://ex/b")).unwrap();
        // Evicts a, the least recently used
        cache.find(&by_subject("http://ex/c")).unwrap();
        cache.find(&by_subject("http://ex/b")).unwrap();
        cache.find(&by_subject("http://ex/a")).unwrap();

        let metrics = cache.metrics();
        assert_eq!(metrics.find_entries, 2);
        assert_eq!(metrics.evictions, 2);
    }

    #[test]
    fn test_byte_budget_evicts_and_frees() {
        let mut mock = MockGraph::new();
        mock.expect_find()
            .returning(|m| Ok(vec![Triple::new(
                m.subject.clone().unwrap_or_else(|| Node::uri("http://ex/z")),
                Node::uri(RDF_TYPE),
                Node::plain_literal("0123456789"),
            )]));
        let cache = CachingGraph::new(mock, config(50));

        cache.find(&by_subject("http://ex/a")).unwrap();
        cache.find(&by_subject("http://ex/b")).unwrap();
        assert_eq!(cache.metrics().size_bytes, 42);
        cache.find(&by_subject("http://ex/c")).unwrap();

        let metrics = cache.metrics();
        assert_eq!(metrics.find_entries, 2);
        assert_eq!(metrics.size_bytes, 42);
        assert_eq!(metrics.evictions, 1);
    }

    #[test]
    fn test_contains_is_cached_separately() {
        let mut mock = MockGraph::new();
        mock.expect_contains().times(1).returning(|_| Ok(true));
        mock.expect_find().times(1).returning(|_| Ok(Vec::new()));
        let cache = CachingGraph::new(mock, config(1024));

        let key = by_subject("http://ex/a");
        assert!(cache.contains(&key).unwrap());
        assert!(cache.contains(&key).unwrap());
        assert!(cache.find(&key).unwrap().is_empty());
        assert_eq!(cache.metrics().exists_entries, 1);
    }

    #[test]
    fn test_failures_are_not_cached() {
        let mut mock = MockGraph::new();
        let mut calls = 0;
        mock.expect_contains().times(2).returning(move |_| {
            calls += 1;
            if calls == 1 {
                Err(GraphError::ReadOnly { operation: "test" })
            } else {
                Ok(false)
            }
        });
        let cache = CachingGraph::new(mock, config(1024));
        let key = TripleMatch::any();
        assert!(cache.contains(&key).is_err());
        assert!(!cache.contains(&key).unwrap());
    }

    #[test]
    fn test_concurrent_misses_compute_once() {
        let mut mock = MockGraph::new();
        mock.expect_find().times(1).returning(|_| {
            thread::sleep(Duration::from_millis(50));
            Ok(vec![triple("http://ex/a", "x")])
        });
        let cache = Arc::new(CachingGraph::new(mock, config(1024)));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || cache.find(&by_subject("http://ex/a")).unwrap())
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), vec![triple("http://ex/a", "x")]);
        }
        let metrics = cache.metrics();
        assert_eq!((metrics.hits, metrics.misses), (3, 1));
    }

    #[test]
    fn test_disabled_cache_passes_through() {
        let mut mock = MockGraph::new();
        mock.expect_find().times(2).returning(|_| Ok(Vec::new()));
        let cache = CachingGraph::new(
            mock,
            ResultCacheConfig {
                enabled: false,
                ..ResultCacheConfig::default()
            },
        );
        cache.find(&TripleMatch::any()).unwrap();
        cache.find(&TripleMatch::any()).unwrap();
        assert_eq!(cache.metrics().find_entries, 0);
    }

    #[test]
    fn test_mutation_is_rejected() {
        let cache = CachingGraph::new(MockGraph::new(), config(1024));
        let t = triple("http://ex/a", "x");
        assert_eq!(cache.add(&t), Err(GraphError::ReadOnly { operation: "add" }));
        assert_eq!(cache.delete(&t), Err(GraphError::ReadOnly { operation: "delete" }));
    }
}
