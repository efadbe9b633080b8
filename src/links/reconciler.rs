use std::sync::Arc;
use std::time::Duration;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::debug;
use crate::errors::Result;
use crate::media::{MediaRecord, NewLink};
use super::store::LinkStore;

pub const DEFAULT_LINKS_TTL: Duration = Duration::from_secs(5 * 60);

pub type Records = Arc<Vec<MediaRecord>>;

struct CacheState {
    /// Bumped by every read-through and every mutation
    generation: u64,
    cached: Option<(Records, Instant)>,
}

/// Read-through cache over a [`LinkStore`].
///
/// Only fetch results replace the published list. Mutations invalidate the
/// cache and never merge locally; callers refresh afterwards. When fetches
/// overlap, the most recently issued one wins and older responses are dropped.
pub struct LinkReconciler {
    store: Arc<dyn LinkStore>,
    ttl: Duration,
    state: Mutex<CacheState>,
    records_tx: watch::Sender<Records>,
}

impl LinkReconciler {
    pub fn new(store: Arc<dyn LinkStore>, ttl: Duration) -> Self {
        let (records_tx, _) = watch::channel(Arc::new(Vec::new()));

        Self {
            store,
            ttl,
            state: Mutex::new(CacheState {
                generation: 0,
                cached: None,
            }),
            records_tx,
        }
    }

    /// Display list as of the last installed fetch
    pub fn current(&self) -> Records {
        self.records_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Records> {
        self.records_tx.subscribe()
    }

    /// Cached list while fresh, otherwise a read-through
    pub async fn fetch(&self) -> Result<Records> {
        if let Some(records) = self.fresh() {
            return Ok(records);
        }

        self.refresh().await
    }

    /// Always reads through.
    ///
    /// A read orphaned by a newer fetch yields that fetch's list; one
    /// orphaned by a mutation reads again.
    pub async fn refresh(&self) -> Result<Records> {
        loop {
            let generation = {
                let mut state = self.state.lock();
                state.generation += 1;
                state.generation
            };

            let records = Arc::new(self.store.fetch().await?);

            let installed = {
                let mut state = self.state.lock();
                if state.generation == generation {
                    state.cached = Some((records.clone(), Instant::now()));
                    self.records_tx.send_replace(records.clone());
                    Some(records)
                } else {
                    debug!(generation, latest = state.generation, "Discarding stale link fetch");
                    state.cached.as_ref().map(|(records, _)| records.clone())
                }
            };

            if let Some(records) = installed {
                return Ok(records);
            }
        }
    }

    pub async fn create(&self, link: NewLink) -> Result<()> {
        self.invalidate();
        let result = self.store.create(link).await;
        self.invalidate();
        result
    }

    pub async fn delete(&self, public_id: &str) -> Result<()> {
        self.invalidate();
        let result = self.store.delete(public_id).await;
        self.invalidate();
        result
    }

    pub async fn delete_and_refresh(&self, public_id: &str) -> Result<Records> {
        self.delete(public_id).await?;
        self.refresh().await
    }

    /// Drop the cached list and orphan any fetch still in flight
    pub fn invalidate(&self) {
        let mut state = self.state.lock();
        state.generation += 1;
        state.cached = None;
    }

    fn fresh(&self) -> Option<Records> {
        let state = self.state.lock();
        state.cached
            .as_ref()
            .filter(|(_, fetched_at)| fetched_at.elapsed() < self.ttl)
            .map(|(records, _)| records.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use async_trait::async_trait;
    use tokio::sync::Notify;
    use crate::links::InMemoryLinkStore;

    fn new_link(public_id: &str) -> NewLink {
        NewLink {
            url: format!("https://cdn.test/{}.png", public_id),
            public_id: public_id.to_string(),
            original_filename: None,
            resource_type: Some("image".to_string()),
            bytes: 1,
            created_at: None,
        }
    }

    struct CountingStore {
        inner: InMemoryLinkStore,
        fetches: AtomicUsize,
    }

    #[async_trait]
    impl LinkStore for CountingStore {
        async fn fetch(&self) -> Result<Vec<MediaRecord>> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.inner.fetch().await
        }

        async fn create(&self, link: NewLink) -> Result<()> {
            self.inner.create(link).await
        }

        async fn delete(&self, public_id: &str) -> Result<()> {
            self.inner.delete(public_id).await
        }
    }

    fn counting() -> Arc<CountingStore> {
        Arc::new(CountingStore {
            inner: InMemoryLinkStore::new(),
            fetches: AtomicUsize::new(0),
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_is_cached_within_ttl() {
        let store = counting();
        let reconciler = LinkReconciler::new(store.clone(), Duration::from_secs(60));

        reconciler.fetch().await.unwrap();
        reconciler.fetch().await.unwrap();
        assert_eq!(store.fetches.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(61)).await;
        reconciler.fetch().await.unwrap();
        assert_eq!(store.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_mutation_invalidates_cache() {
        let store = counting();
        let reconciler = LinkReconciler::new(store.clone(), DEFAULT_LINKS_TTL);

        assert!(reconciler.fetch().await.unwrap().is_empty());
        reconciler.create(new_link("a")).await.unwrap();

        // no local merge
        assert!(reconciler.current().is_empty());

        let records = reconciler.fetch().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(store.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_mutation_still_invalidates() {
        let store = counting();
        let reconciler = LinkReconciler::new(store.clone(), DEFAULT_LINKS_TTL);

        reconciler.fetch().await.unwrap();
        assert!(reconciler.delete("missing").await.is_err());
        reconciler.fetch().await.unwrap();

        assert_eq!(store.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_delete_and_refresh_publishes() {
        let store = counting();
        let reconciler = LinkReconciler::new(store.clone(), DEFAULT_LINKS_TTL);
        reconciler.create(new_link("abc123")).await.unwrap();
        reconciler.create(new_link("keep")).await.unwrap();
        reconciler.refresh().await.unwrap();

        let mut rx = reconciler.subscribe();
        let records = reconciler.delete_and_refresh("abc123").await.unwrap();

        assert!(records.iter().all(|r| r.public_id != "abc123"));
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().len(), 1);
    }

    /// Fetch that parks until released, to force overlap
    struct GatedStore {
        gate: Notify,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LinkStore for GatedStore {
        async fn fetch(&self) -> Result<Vec<MediaRecord>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call == 0 {
                self.gate.notified().await;
            }
            let link = new_link(if call == 0 { "old" } else { "new" });
            Ok(vec![MediaRecord::from_new_link(&link)])
        }

        async fn create(&self, _link: NewLink) -> Result<()> {
            Ok(())
        }

        async fn delete(&self, _public_id: &str) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_last_fetch_wins() {
        let store = Arc::new(GatedStore {
            gate: Notify::new(),
            calls: AtomicUsize::new(0),
        });
        let reconciler = Arc::new(LinkReconciler::new(store.clone(), DEFAULT_LINKS_TTL));

        let slow = tokio::spawn({
            let reconciler = reconciler.clone();
            async move { reconciler.refresh().await }
        });
        while store.calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        reconciler.refresh().await.unwrap();
        store.gate.notify_one();
        slow.await.unwrap().unwrap();

        assert_eq!(reconciler.current()[0].public_id, "new");
    }

    /// Takes its snapshot, then parks the first fetch until released
    struct SnapshotThenParkStore {
        inner: InMemoryLinkStore,
        gate: Notify,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LinkStore for SnapshotThenParkStore {
        async fn fetch(&self) -> Result<Vec<MediaRecord>> {
            let snapshot = self.inner.fetch().await?;
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                self.gate.notified().await;
            }
            Ok(snapshot)
        }

        async fn create(&self, link: NewLink) -> Result<()> {
            self.inner.create(link).await
        }

        async fn delete(&self, public_id: &str) -> Result<()> {
            self.inner.delete(public_id).await
        }
    }

    #[tokio::test]
    async fn test_fetch_overtaken_by_mutation_reads_again() {
        let store = Arc::new(SnapshotThenParkStore {
            inner: InMemoryLinkStore::new(),
            gate: Notify::new(),
            calls: AtomicUsize::new(0),
        });
        let reconciler = Arc::new(LinkReconciler::new(store.clone(), DEFAULT_LINKS_TTL));

        let parked = tokio::spawn({
            let reconciler = reconciler.clone();
            async move { reconciler.fetch().await }
        });
        while store.calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        reconciler.create(new_link("a")).await.unwrap();
        store.gate.notify_one();

        let records = parked.await.unwrap().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].public_id, "a");
        assert_eq!(reconciler.current().len(), 1);
        assert_eq!(store.calls.load(Ordering::SeqCst), 2);
    }
}
