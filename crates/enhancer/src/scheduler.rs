use crate::enhancer::{merge_suggestions, RelationshipEnhancer};
use compass_protocol::{OntologyGraph, Relationship};
use lru::LruCache;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;

pub const DEFAULT_CACHE_CAPACITY: usize = 32;

#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    /// Quiet period after the last submission before the capability is called.
    pub debounce: Duration,
    /// Node sets whose suggestions are remembered. Least recently used go first.
    pub cache_capacity: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_secs(2),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

/// A published enhancement result.
#[derive(Debug, Clone, PartialEq)]
pub struct EnhancedGraph {
    pub generation: u64,
    pub graph: OntologyGraph,
    /// Suggestions were re-applied from an earlier call for the same node set.
    pub from_cache: bool,
}

/// Debounced, generation-guarded driver around [`RelationshipEnhancer`].
///
/// Every [`submit`](Self::submit) bumps the generation. Work started for an
/// older generation may still finish (its suggestions are cached), but only
/// a result whose generation is still current is ever published. At most one
/// capability call runs per node set; later submissions for the same set
/// wait for it and reuse its suggestions.
#[derive(Clone)]
pub struct EnhancementScheduler {
    inner: Arc<SchedulerInner>,
}

type NodeSetKey = Vec<String>;

struct SchedulerInner {
    enhancer: RelationshipEnhancer,
    config: SchedulerConfig,
    generation: AtomicU64,
    cache: Mutex<LruCache<NodeSetKey, Vec<Relationship>>>,
    in_flight: Mutex<HashMap<NodeSetKey, watch::Receiver<bool>>>,
    result_tx: watch::Sender<Option<EnhancedGraph>>,
}

enum Claim<'a> {
    Lead(InFlight<'a>),
    Follow(watch::Receiver<bool>),
}

/// Marks a node set as being fetched. Dropping it releases followers.
struct InFlight<'a> {
    inner: &'a SchedulerInner,
    key: NodeSetKey,
    done: watch::Sender<bool>,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.inner
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
        self.done.send_replace(true);
    }
}

impl EnhancementScheduler {
    #[must_use]
    pub fn new(enhancer: RelationshipEnhancer, config: SchedulerConfig) -> Self {
        let (result_tx, _) = watch::channel(None);
        let capacity = NonZeroUsize::new(config.cache_capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Arc::new(SchedulerInner {
                enhancer,
                config,
                generation: AtomicU64::new(0),
                cache: Mutex::new(LruCache::new(capacity)),
                in_flight: Mutex::new(HashMap::new()),
                result_tx,
            }),
        }
    }

    /// Schedule enhancement of `base` and return its generation.
    ///
    /// Cached node sets and graphs with fewer than two nodes publish
    /// immediately. Otherwise a task is spawned on the current tokio
    /// runtime; it waits out the debounce and gives up if a newer
    /// submission arrived meanwhile.
    pub fn submit(&self, base: OntologyGraph) -> u64 {
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;

        if base.nodes.len() < 2 {
            self.inner.publish(generation, base, false);
            return generation;
        }

        let key = base.node_set_key();
        if let Some(edges) = self.inner.cached(&key) {
            log::debug!(
                "Generation {generation}: re-applying {} cached suggestion(s)",
                edges.len()
            );
            self.inner
                .publish(generation, merge_suggestions(base, edges), true);
            return generation;
        }

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            tokio::time::sleep(inner.config.debounce).await;
            if !inner.is_current(generation) {
                log::debug!("Generation {generation} superseded during debounce");
                return;
            }

            let (graph, from_cache) = loop {
                if let Some(edges) = inner.cached(&key) {
                    break (merge_suggestions(base, edges), true);
                }
                match inner.claim(&key) {
                    Claim::Follow(mut done) => {
                        log::debug!("Generation {generation}: joining in-flight request for the same node set");
                        let _ = done.wait_for(|finished| *finished).await;
                        if !inner.is_current(generation) {
                            return;
                        }
                    }
                    Claim::Lead(flight) => {
                        let result = inner.enhancer.suggest_edges(&base).await;
                        if let Ok(edges) = &result {
                            inner.remember(key.clone(), edges.clone());
                        }
                        drop(flight);
                        break match result {
                            Ok(edges) => (merge_suggestions(base, edges), false),
                            Err(err) => {
                                log::warn!("Generation {generation}: enhancement failed, keeping base graph: {err}");
                                (base, false)
                            }
                        };
                    }
                }
            };

            if !inner.publish(generation, graph, from_cache) {
                log::debug!("Dropping stale enhancement result for generation {generation}");
            }
        });

        generation
    }

    /// Invalidate everything in flight. Pending results will be dropped.
    pub fn cancel(&self) -> u64 {
        self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    #[must_use]
    pub fn current_generation(&self) -> u64 {
        self.inner.generation.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<EnhancedGraph>> {
        self.inner.result_tx.subscribe()
    }

    #[must_use]
    pub fn latest(&self) -> Option<EnhancedGraph> {
        self.inner.result_tx.borrow().clone()
    }

    pub fn invalidate_cache(&self) {
        self.inner
            .cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl SchedulerInner {
    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    fn cached(&self, key: &[String]) -> Option<Vec<Relationship>> {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn remember(&self, key: NodeSetKey, edges: Vec<Relationship>) {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .put(key, edges);
    }

    fn claim(&self, key: &[String]) -> Claim<'_> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(done) = in_flight.get(key) {
            return Claim::Follow(done.clone());
        }
        let (done, watcher) = watch::channel(false);
        in_flight.insert(key.to_vec(), watcher);
        Claim::Lead(InFlight {
            inner: self,
            key: key.to_vec(),
            done,
        })
    }

    /// Publishes under the channel lock so a newer submission can never be
    /// overwritten by an older one. Returns whether anything was published.
    fn publish(&self, generation: u64, graph: OntologyGraph, from_cache: bool) -> bool {
        self.result_tx.send_if_modified(|slot| {
            if !self.is_current(generation) {
                return false;
            }
            *slot = Some(EnhancedGraph {
                generation,
                graph,
                from_cache,
            });
            true
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enhancer::EnhancerConfig;
    use crate::suggester::{GraphSummary, RelationshipSuggester, SuggestedRelationship};
    use async_trait::async_trait;
    use compass_protocol::{Node, NodeType};
    use pretty_assertions::assert_eq;
    use std::sync::atomic::AtomicUsize;

    /// Links the first two summary nodes after an optional delay.
    struct CountingSuggester {
        calls: AtomicUsize,
        delay: Duration,
        fail: bool,
    }

    impl CountingSuggester {
        fn new(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                delay,
                fail: false,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RelationshipSuggester for CountingSuggester {
        async fn suggest(&self, summary: &GraphSummary) -> anyhow::Result<Vec<SuggestedRelationship>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            if self.fail {
                anyhow::bail!("capability offline");
            }
            Ok(vec![SuggestedRelationship {
                source_id: summary.nodes[0].id.clone(),
                target_id: summary.nodes[1].id.clone(),
                relation_type: "supports".into(),
                strength: 60.0,
                confidence: 80.0,
                explanation: None,
            }])
        }
    }

    fn graph(ids: &[&str]) -> OntologyGraph {
        OntologyGraph {
            nodes: ids
                .iter()
                .map(|id| Node {
                    id: (*id).to_string(),
                    node_type: NodeType::Value,
                    label: (*id).to_string(),
                    text: None,
                    layer: NodeType::Value.layer(),
                    semantic_tags: Vec::new(),
                })
                .collect(),
            ..OntologyGraph::default()
        }
    }

    fn scheduler(suggester: Arc<CountingSuggester>) -> EnhancementScheduler {
        scheduler_with_capacity(suggester, DEFAULT_CACHE_CAPACITY)
    }

    fn scheduler_with_capacity(suggester: Arc<CountingSuggester>, cache_capacity: usize) -> EnhancementScheduler {
        EnhancementScheduler::new(
            RelationshipEnhancer::new(suggester, EnhancerConfig::default()),
            SchedulerConfig {
                debounce: Duration::from_millis(100),
                cache_capacity,
            },
        )
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_submissions_call_the_capability_once() {
        let suggester = CountingSuggester::new(Duration::ZERO);
        let scheduler = scheduler(suggester.clone());
        let mut rx = scheduler.subscribe();

        scheduler.submit(graph(&["value-a", "value-b"]));
        tokio::time::sleep(Duration::from_millis(50)).await;
        let last = scheduler.submit(graph(&["value-a", "value-b", "value-c"]));

        rx.changed().await.unwrap();
        let published = rx.borrow().clone().unwrap();
        assert_eq!(published.generation, last);
        assert_eq!(published.graph.nodes.len(), 3);
        assert_eq!(published.graph.relationships.len(), 1);
        assert!(!published.from_cache);
        assert_eq!(suggester.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_in_flight_result_is_cached_but_never_published() {
        let suggester = CountingSuggester::new(Duration::from_secs(5));
        let scheduler = scheduler(suggester.clone());

        let first = scheduler.submit(graph(&["value-a", "value-b"]));
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(suggester.calls(), 1);
        let cancelled = scheduler.cancel();
        assert!(cancelled > first);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(scheduler.latest(), None);

        let again = scheduler.submit(graph(&["value-b", "value-a"]));
        let published = scheduler.latest().unwrap();
        assert_eq!(published.generation, again);
        assert!(published.from_cache);
        assert_eq!(published.graph.relationships.len(), 1);
        assert_eq!(suggester.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn same_node_set_reuses_cached_suggestions() {
        let suggester = CountingSuggester::new(Duration::ZERO);
        let scheduler = scheduler(suggester.clone());
        let mut rx = scheduler.subscribe();

        scheduler.submit(graph(&["value-a", "value-b"]));
        rx.changed().await.unwrap();
        assert!(!rx.borrow_and_update().as_ref().unwrap().from_cache);

        let mut relabeled = graph(&["value-a", "value-b"]);
        relabeled.nodes[0].label = "Renamed".into();
        scheduler.submit(relabeled);
        let published = scheduler.latest().unwrap();
        assert!(published.from_cache);
        assert_eq!(published.graph.nodes[0].label, "Renamed");
        assert_eq!(suggester.calls(), 1);

        scheduler.invalidate_cache();
        scheduler.submit(graph(&["value-a", "value-b"]));
        rx.changed().await.unwrap();
        rx.changed().await.unwrap();
        assert_eq!(suggester.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn edit_during_in_flight_call_joins_it() {
        let suggester = CountingSuggester::new(Duration::from_secs(5));
        let scheduler = scheduler(suggester.clone());
        let mut rx = scheduler.subscribe();

        scheduler.submit(graph(&["value-a", "value-b"]));
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(suggester.calls(), 1);

        let mut relabeled = graph(&["value-a", "value-b"]);
        relabeled.nodes[0].label = "Renamed".into();
        let second = scheduler.submit(relabeled);

        rx.changed().await.unwrap();
        let published = rx.borrow().clone().unwrap();
        assert_eq!(published.generation, second);
        assert!(published.from_cache);
        assert_eq!(published.graph.nodes[0].label, "Renamed");
        assert_eq!(published.graph.relationships.len(), 1);
        assert_eq!(suggester.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cache_keeps_only_recent_node_sets() {
        let suggester = CountingSuggester::new(Duration::ZERO);
        let scheduler = scheduler_with_capacity(suggester.clone(), 1);
        let mut rx = scheduler.subscribe();

        scheduler.submit(graph(&["value-a", "value-b"]));
        rx.changed().await.unwrap();
        scheduler.submit(graph(&["value-a", "value-c"]));
        rx.changed().await.unwrap();
        assert_eq!(suggester.calls(), 2);

        // The first set was evicted by the second.
        scheduler.submit(graph(&["value-a", "value-b"]));
        rx.changed().await.unwrap();
        assert!(!rx.borrow().as_ref().unwrap().from_cache);
        assert_eq!(suggester.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_publishes_the_base_graph() {
        let suggester = Arc::new(CountingSuggester {
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
            fail: true,
        });
        let scheduler = scheduler(suggester.clone());
        let mut rx = scheduler.subscribe();

        let base = graph(&["value-a", "value-b"]);
        scheduler.submit(base.clone());
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().as_ref().unwrap().graph, base);

        // Failures are not cached; the next submission retries.
        scheduler.submit(base);
        rx.changed().await.unwrap();
        assert_eq!(suggester.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn tiny_graph_publishes_without_debounce() {
        let suggester = CountingSuggester::new(Duration::ZERO);
        let scheduler = scheduler(suggester.clone());
        let generation = scheduler.submit(graph(&["purpose"]));
        assert_eq!(scheduler.latest().unwrap().generation, generation);
        assert_eq!(scheduler.current_generation(), generation);
        assert_eq!(suggester.calls(), 0);
    }
}
