use async_trait::async_trait;
use augur_core::types::{AgentState, StateStore};
use augur_core::{AugurError, Result};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// In-memory layer over another store that never silently loses a write
///
/// Reads are served from memory once an agent has been seen. When the inner
/// store rejects a save with a retryable error, the new value stays cached,
/// the agent is marked dirty and the caller gets
/// [`AugurError::Unpersisted`]; [`flush`](StateStore::flush) retries every
/// dirty agent. Errors that retrying cannot fix roll the cache back and are
/// returned as-is.
///
/// Every inner write for an agent runs under that agent's writer lock, so a
/// retry can never land after (and overwrite) a newer save.
pub struct CachedStateStore<S> {
    inner: S,
    cache: RwLock<HashMap<String, AgentState>>,
    dirty: RwLock<BTreeSet<String>>,
    writers: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl<S: StateStore> CachedStateStore<S> {
    /// Wrap a store
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            cache: RwLock::new(HashMap::new()),
            dirty: RwLock::new(BTreeSet::new()),
            writers: Mutex::new(HashMap::new()),
        }
    }

    /// The wrapped store
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Agents whose latest state has not reached the inner store
    pub fn pending(&self) -> Vec<String> {
        self.dirty.read().iter().cloned().collect()
    }

    fn writer(&self, agent_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.writers
            .lock()
            .entry(agent_id.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// Drop the writer entry once nobody else holds or waits on it
    fn release_writer(&self, agent_id: &str) {
        let mut writers = self.writers.lock();
        if writers
            .get(agent_id)
            .is_some_and(|w| Arc::strong_count(w) == 1)
        {
            writers.remove(agent_id);
        }
    }

    /// Write one agent through; caller holds the agent's writer lock
    async fn write_through(&self, agent_id: &str, state: &AgentState) -> Result<()> {
        let previous = self
            .cache
            .write()
            .insert(agent_id.to_string(), state.clone());

        match self.inner.save(agent_id, state).await {
            Ok(()) => {
                self.dirty.write().remove(agent_id);
                Ok(())
            }
            Err(e) if e.is_retryable() => {
                let pending = {
                    let mut dirty = self.dirty.write();
                    dirty.insert(agent_id.to_string());
                    dirty.len()
                };
                warn!(
                    "Save for agent '{}' failed; keeping state in memory ({} pending): {}",
                    agent_id, pending, e
                );
                Err(AugurError::Unpersisted {
                    agent_id: agent_id.to_string(),
                    message: e.to_string(),
                    pending,
                })
            }
            Err(e) => {
                warn!("Save for agent '{}' rejected: {}", agent_id, e);
                let mut cache = self.cache.write();
                match previous {
                    Some(previous) => {
                        cache.insert(agent_id.to_string(), previous);
                    }
                    None => {
                        cache.remove(agent_id);
                    }
                }
                Err(e)
            }
        }
    }

    /// Retry one dirty agent with its latest cached value
    async fn retry(&self, agent_id: &str) -> Result<()> {
        let writer = self.writer(agent_id);
        let result = {
            let _guard = writer.lock().await;
            if !self.dirty.read().contains(agent_id) {
                Ok(())
            } else {
                let cached = self.cache.read().get(agent_id).cloned();
                match cached {
                    Some(state) => self.inner.save(agent_id, &state).await.map(|()| {
                        self.dirty.write().remove(agent_id);
                        info!("Persisted pending state for agent '{}'", agent_id);
                    }),
                    None => {
                        self.dirty.write().remove(agent_id);
                        Ok(())
                    }
                }
            }
        };
        drop(writer);
        self.release_writer(agent_id);
        result
    }
}

#[async_trait]
impl<S: StateStore> StateStore for CachedStateStore<S> {
    async fn load(&self, agent_id: &str) -> Result<Option<AgentState>> {
        if let Some(state) = self.cache.read().get(agent_id).cloned() {
            return Ok(Some(state));
        }

        let loaded = self.inner.load(agent_id).await?;
        if let Some(state) = &loaded {
            debug!("Caching state for agent '{}'", agent_id);
            self.cache
                .write()
                .entry(agent_id.to_string())
                .or_insert_with(|| state.clone());
        }
        Ok(loaded)
    }

    async fn save(&self, agent_id: &str, state: &AgentState) -> Result<()> {
        let writer = self.writer(agent_id);
        let result = {
            let _guard = writer.lock().await;
            self.write_through(agent_id, state).await
        };
        drop(writer);
        self.release_writer(agent_id);
        result
    }

    async fn flush(&self) -> Result<()> {
        let mut failures = Vec::new();
        for agent_id in self.pending() {
            if let Err(e) = self.retry(&agent_id).await {
                failures.push((agent_id, e));
            }
        }

        if let Some((_, first)) = failures.first() {
            let agents: Vec<&str> = failures.iter().map(|(id, _)| id.as_str()).collect();
            return Err(AugurError::storage(format!(
                "{} agent state(s) still unpersisted ({}): {}",
                failures.len(),
                agents.join(", "),
                first
            )));
        }
        self.inner.flush().await
    }

    fn name(&self) -> &str {
        "cached"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStateStore;
    use chrono::Utc;
    use mockall::mock;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::time::Duration;
    use tokio::sync::Notify;

    mock! {
        pub Store {}

        #[async_trait]
        impl StateStore for Store {
            async fn load(&self, agent_id: &str) -> Result<Option<AgentState>>;
            async fn save(&self, agent_id: &str, state: &AgentState) -> Result<()>;
        }
    }

    fn state(version: u32) -> AgentState {
        let mut state = AgentState::new(Utc::now());
        state.version = version;
        state
    }

    fn switchable_store(healthy: Arc<AtomicBool>) -> MockStore {
        let mut inner = MockStore::new();
        inner.expect_save().returning(move |_, _| {
            if healthy.load(Ordering::SeqCst) {
                Ok(())
            } else {
                Err(AugurError::storage("disk full"))
            }
        });
        inner
    }

    /// Records durable versions; can fail every write or park one version mid-write
    #[derive(Default)]
    struct GatedStore {
        durable: Mutex<HashMap<String, u32>>,
        failing: AtomicBool,
        hold_version: AtomicU32,
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl StateStore for GatedStore {
        async fn load(&self, _agent_id: &str) -> Result<Option<AgentState>> {
            Ok(None)
        }

        async fn save(&self, agent_id: &str, state: &AgentState) -> Result<()> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(AugurError::storage("offline"));
            }
            if state.version == self.hold_version.load(Ordering::SeqCst) {
                self.entered.notify_one();
                self.release.notified().await;
            }
            self.durable
                .lock()
                .insert(agent_id.to_string(), state.version);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_load_is_cached() {
        let mut inner = MockStore::new();
        inner.expect_load().times(1).returning(|_| Ok(Some(state(3))));

        let store = CachedStateStore::new(inner);
        assert_eq!(store.load("a").await.unwrap().unwrap().version, 3);
        assert_eq!(store.load("a").await.unwrap().unwrap().version, 3);
    }

    #[tokio::test]
    async fn test_load_failure_is_not_masked() {
        let mut inner = MockStore::new();
        inner
            .expect_load()
            .returning(|_| Err(AugurError::storage("offline")));

        let store = CachedStateStore::new(inner);
        assert!(store.load("a").await.is_err());
    }

    #[tokio::test]
    async fn test_failed_save_keeps_value_and_retries_on_flush() {
        let healthy = Arc::new(AtomicBool::new(false));
        let store = CachedStateStore::new(switchable_store(healthy.clone()));

        let err = store.save("a", &state(5)).await.unwrap_err();
        match err {
            AugurError::Unpersisted { agent_id, pending, .. } => {
                assert_eq!(agent_id, "a");
                assert_eq!(pending, 1);
            }
            other => panic!("unexpected error {:?}", other),
        }

        // Readers still see the latest value
        assert_eq!(store.load("a").await.unwrap().unwrap().version, 5);
        assert_eq!(store.pending(), vec!["a"]);
        assert!(store.flush().await.is_err());

        healthy.store(true, Ordering::SeqCst);
        store.flush().await.unwrap();
        assert!(store.pending().is_empty());
        assert!(store.writers.lock().is_empty());
    }

    #[tokio::test]
    async fn test_save_leaves_other_dirty_agents_to_flush() {
        let healthy = Arc::new(AtomicBool::new(false));
        let store = CachedStateStore::new(switchable_store(healthy.clone()));

        assert!(store.save("a", &state(1)).await.is_err());
        healthy.store(true, Ordering::SeqCst);

        store.save("b", &state(2)).await.unwrap();
        assert_eq!(store.pending(), vec!["a"]);

        store.flush().await.unwrap();
        assert!(store.pending().is_empty());
    }

    #[tokio::test]
    async fn test_non_retryable_error_rolls_back_cache() {
        let mut inner = MockStore::new();
        inner.expect_save().returning(|_, state| {
            if state.version == 2 {
                Err(AugurError::other("document rejected"))
            } else {
                Ok(())
            }
        });

        let store = CachedStateStore::new(inner);
        store.save("a", &state(1)).await.unwrap();

        let err = store.save("a", &state(2)).await.unwrap_err();
        assert!(matches!(err, AugurError::Other(_)));
        assert_eq!(store.load("a").await.unwrap().unwrap().version, 1);
        assert!(store.pending().is_empty());
    }

    #[tokio::test]
    async fn test_retry_in_flight_cannot_overwrite_newer_save() {
        let store = Arc::new(CachedStateStore::new(GatedStore::default()));

        store.inner().failing.store(true, Ordering::SeqCst);
        assert!(store.save("a", &state(10)).await.is_err());
        store.inner().failing.store(false, Ordering::SeqCst);
        store.inner().hold_version.store(10, Ordering::SeqCst);

        // Flush parks inside the inner write of version 10
        let flusher = {
            let store = store.clone();
            tokio::spawn(async move { store.flush().await })
        };
        store.inner().entered.notified().await;

        let writer = {
            let store = store.clone();
            tokio::spawn(async move {
                let newer = state(11);
                store.save("a", &newer).await
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!writer.is_finished());

        store.inner().release.notify_one();
        flusher.await.unwrap().unwrap();
        writer.await.unwrap().unwrap();

        assert_eq!(store.inner().durable.lock().get("a"), Some(&11));
        assert!(store.pending().is_empty());
        assert_eq!(store.load("a").await.unwrap().unwrap().version, 11);
    }

    #[tokio::test]
    async fn test_concurrent_agents_with_failing_inner_store() {
        let store = Arc::new(CachedStateStore::new(GatedStore::default()));
        store.inner().failing.store(true, Ordering::SeqCst);

        let mut handles = Vec::new();
        for (agent, version) in [("a", 20), ("b", 21), ("a", 22), ("b", 23)] {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let next = state(version);
                store.save(agent, &next).await
            }));
        }
        for handle in handles {
            let err = handle.await.unwrap().unwrap_err();
            assert!(matches!(err, AugurError::Unpersisted { .. }));
        }
        assert_eq!(store.pending(), vec!["a", "b"]);

        store.inner().failing.store(false, Ordering::SeqCst);
        store.flush().await.unwrap();

        let durable = store.inner().durable.lock().clone();
        let cached_a = store.load("a").await.unwrap().unwrap().version;
        let cached_b = store.load("b").await.unwrap().unwrap().version;
        assert_eq!(durable.get("a"), Some(&cached_a));
        assert_eq!(durable.get("b"), Some(&cached_b));
        assert!(store.pending().is_empty());
    }

    #[tokio::test]
    async fn test_writes_through_to_inner_store() {
        let store = CachedStateStore::new(MemoryStateStore::new());
        store.save("a", &state(9)).await.unwrap();
        assert_eq!(store.inner().len(), 1);
        assert_eq!(store.inner().load("a").await.unwrap().unwrap().version, 9);
    }
}
