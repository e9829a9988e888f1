//! The feed synchronization engine.
//!
//! The [`Reconciler`] is the single owner of [`FeedState`]. It runs as a
//! background task in front of an mpsc command channel; push signals,
//! explicit refresh requests, and retry ticks all funnel through one loop,
//! so every mutation of the feed is serialized. Published views flow out
//! through a watch channel as immutable [`FeedSnapshot`]s.
//!
//! Push notifications are signals, never data: each one only schedules an
//! authoritative refresh. The loop drains all queued signals before a
//! cycle, which bounds a burst of N notifications to at most one in-flight
//! refresh plus one follow-up.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, trace, warn};

use crate::app::error::{Result, TributaryError};
use crate::auth::Session;
use crate::domain::{FeedSnapshot, FeedState, ShareEvent};
use crate::enricher::MetadataEnricher;
use crate::fetcher::FeedFetcher;

#[derive(Debug)]
enum ReconcilerMessage {
    PushEvent(ShareEvent),
    Refresh,
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SyncState {
    Idle,
    Refreshing,
    Enriching,
}

/// Cloneable handle for delivering signals and reading the published view.
#[derive(Clone)]
pub struct ReconcilerHandle {
    tx: mpsc::Sender<ReconcilerMessage>,
    view: watch::Receiver<FeedSnapshot>,
}

impl ReconcilerHandle {
    /// Deliver a decoded push event. Returns false when the reconciler is
    /// gone (session over).
    pub async fn on_push_event(&self, event: ShareEvent) -> bool {
        self.tx
            .send(ReconcilerMessage::PushEvent(event))
            .await
            .is_ok()
    }

    /// Request an authoritative refresh (e.g. initial load after login).
    pub async fn request_refresh(&self) -> bool {
        self.tx.send(ReconcilerMessage::Refresh).await.is_ok()
    }

    /// Latest fully-committed snapshot. Never blocks.
    pub fn current_view(&self) -> FeedSnapshot {
        self.view.borrow().clone()
    }

    /// A receiver that wakes whenever a new snapshot is published.
    pub fn view_changes(&self) -> watch::Receiver<FeedSnapshot> {
        self.view.clone()
    }

    pub async fn shutdown(&self) {
        let _ = self.tx.send(ReconcilerMessage::Shutdown).await;
    }
}

pub struct Reconciler {
    fetcher: Arc<dyn FeedFetcher>,
    enricher: Arc<dyn MetadataEnricher>,
    session: Session,
    retry_interval: Duration,
    feed: FeedState,
    state: SyncState,
    retry_armed: bool,
    rx: mpsc::Receiver<ReconcilerMessage>,
    view_tx: watch::Sender<FeedSnapshot>,
}

impl Reconciler {
    pub fn new(
        fetcher: Arc<dyn FeedFetcher>,
        enricher: Arc<dyn MetadataEnricher>,
        session: Session,
        retry_interval: Duration,
    ) -> (Self, ReconcilerHandle) {
        let (tx, rx) = mpsc::channel(100);
        let (view_tx, view_rx) = watch::channel(FeedSnapshot::default());

        let handle = ReconcilerHandle { tx, view: view_rx };
        let reconciler = Self {
            fetcher,
            enricher,
            session,
            retry_interval,
            feed: FeedState::new(),
            state: SyncState::Idle,
            retry_armed: false,
            rx,
            view_tx,
        };
        (reconciler, handle)
    }

    /// Run until shutdown or session-fatal error.
    ///
    /// Returns `Err(AuthFailure)` when the backing store rejects the
    /// session's credential; the session layer should force re-login.
    /// Transient failures are absorbed: the last-known-good view stays
    /// published and a retry timer re-arms the refresh.
    pub async fn run(mut self) -> Result<()> {
        info!("reconciler started for {}", self.session.identity);

        loop {
            let msg = if self.retry_armed {
                tokio::select! {
                    msg = self.rx.recv() => msg,
                    _ = tokio::time::sleep(self.retry_interval) => {
                        debug!("retry timer fired");
                        Some(ReconcilerMessage::Refresh)
                    }
                }
            } else {
                self.rx.recv().await
            };

            let Some(first) = msg else { break };

            // Coalesce everything already queued into this one cycle.
            let mut refresh_wanted = false;
            let mut stop = false;
            let queued = std::iter::once(first).chain(std::iter::from_fn(|| self.rx.try_recv().ok()));
            for msg in queued {
                match msg {
                    ReconcilerMessage::PushEvent(event) => {
                        debug!(
                            "push signal: {} shared by {}",
                            event.content_id, event.sharer_identity
                        );
                        refresh_wanted = true;
                    }
                    ReconcilerMessage::Refresh => refresh_wanted = true,
                    ReconcilerMessage::Shutdown => stop = true,
                }
            }

            if stop {
                break;
            }
            if refresh_wanted {
                self.run_cycle().await?;
            }
        }

        info!("reconciler stopped");
        Ok(())
    }

    /// One refresh cycle: authoritative pull, then at most one batched
    /// enrichment for whatever came back unresolved.
    async fn run_cycle(&mut self) -> Result<()> {
        self.set_state(SyncState::Refreshing);

        let pulled = match self.fetcher.fetch_all(&self.session).await {
            Ok(pulled) => pulled,
            Err(e @ TributaryError::AuthFailure(_)) => return Err(e),
            Err(e) => {
                warn!("refresh failed, keeping last known view: {}", e);
                self.retry_armed = true;
                self.set_state(SyncState::Idle);
                return Ok(());
            }
        };

        self.retry_armed = false;
        let epoch = self.feed.apply_pull(pulled);
        self.publish();

        let unresolved = self.feed.unresolved_ids();
        if !unresolved.is_empty() {
            self.set_state(SyncState::Enriching);
            match self.enricher.lookup(&unresolved).await {
                Ok(metadata) => {
                    if self.feed.apply_metadata(epoch, metadata) {
                        self.publish();
                    }
                }
                Err(e) => {
                    // Not fatal: the omitted ids are retried next cycle.
                    warn!(
                        "metadata lookup failed, {} entries stay unresolved: {}",
                        unresolved.len(),
                        e
                    );
                }
            }
        }

        self.set_state(SyncState::Idle);
        Ok(())
    }

    fn publish(&self) {
        self.view_tx.send_replace(self.feed.snapshot());
    }

    fn set_state(&mut self, state: SyncState) {
        if self.state != state {
            trace!("{:?} -> {:?}", self.state, state);
            self.state = state;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::{HashMap, VecDeque};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::enricher::VideoMetadata;

    fn session() -> Session {
        Session {
            access_token: "t-123".into(),
            identity: "alice".into(),
        }
    }

    fn event(id: &str, who: &str) -> ShareEvent {
        ShareEvent {
            content_id: id.into(),
            sharer_identity: who.into(),
        }
    }

    fn meta(title: &str, description: &str) -> VideoMetadata {
        VideoMetadata {
            title: title.into(),
            description: description.into(),
        }
    }

    /// Replays a scripted sequence of pull results; repeats an empty pull
    /// once the script runs out.
    struct ScriptedFetcher {
        calls: AtomicUsize,
        script: Mutex<VecDeque<Result<Vec<ShareEvent>>>>,
    }

    impl ScriptedFetcher {
        fn new(script: Vec<Result<Vec<ShareEvent>>>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                script: Mutex::new(script.into()),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl FeedFetcher for ScriptedFetcher {
        async fn fetch_all(&self, _session: &Session) -> Result<Vec<ShareEvent>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Vec::new()))
        }

        async fn submit_share(&self, _session: &Session, _content_id: &str) -> Result<()> {
            Ok(())
        }
    }

    struct ScriptedEnricher {
        requests: Mutex<Vec<Vec<String>>>,
        script: Mutex<VecDeque<Result<HashMap<String, VideoMetadata>>>>,
    }

    impl ScriptedEnricher {
        fn new(script: Vec<Result<HashMap<String, VideoMetadata>>>) -> Arc<Self> {
            Arc::new(Self {
                requests: Mutex::new(Vec::new()),
                script: Mutex::new(script.into()),
            })
        }

        fn requests(&self) -> Vec<Vec<String>> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MetadataEnricher for ScriptedEnricher {
        async fn lookup(&self, content_ids: &[String]) -> Result<HashMap<String, VideoMetadata>> {
            self.requests.lock().unwrap().push(content_ids.to_vec());
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(HashMap::new()))
        }
    }

    async fn wait_for_view<F>(handle: &ReconcilerHandle, mut accept: F) -> FeedSnapshot
    where
        F: FnMut(&FeedSnapshot) -> bool,
    {
        let mut view = handle.view_changes();
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                {
                    let snap = view.borrow_and_update().clone();
                    if accept(&snap) {
                        return snap;
                    }
                }
                view.changed().await.expect("reconciler gone");
            }
        })
        .await
        .expect("timed out waiting for view")
    }

    async fn wait_until<F>(mut check: F)
    where
        F: FnMut() -> bool,
    {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !check() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("timed out waiting for condition");
    }

    #[tokio::test]
    async fn test_push_event_drives_full_cycle() {
        let fetcher = ScriptedFetcher::new(vec![Ok(vec![event("abc123", "alice")])]);
        let enricher = ScriptedEnricher::new(vec![Ok(HashMap::from([(
            "abc123".to_string(),
            meta("Cats", "funny"),
        )]))]);

        let (reconciler, handle) = Reconciler::new(
            fetcher.clone(),
            enricher.clone(),
            session(),
            Duration::from_secs(30),
        );
        let task = tokio::spawn(reconciler.run());

        assert!(handle.on_push_event(event("abc123", "alice")).await);

        let snap = wait_for_view(&handle, |s| {
            s.entries.len() == 1 && s.entries[0].resolved
        })
        .await;

        let entry = &snap.entries[0];
        assert_eq!(entry.record.content_id, "abc123");
        assert_eq!(entry.record.sharer_identity, "alice");
        assert_eq!(entry.record.sequence, 0);
        assert_eq!(entry.title.as_deref(), Some("Cats"));
        assert_eq!(entry.description.as_deref(), Some("funny"));

        handle.shutdown().await;
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_burst_of_push_events_coalesces_to_one_refresh() {
        let fetcher = ScriptedFetcher::new(vec![]);
        let enricher = ScriptedEnricher::new(vec![]);

        let (reconciler, handle) = Reconciler::new(
            fetcher.clone(),
            enricher.clone(),
            session(),
            Duration::from_secs(30),
        );

        // Queue the burst before the loop starts draining.
        for _ in 0..3 {
            assert!(handle.on_push_event(event("abc123", "alice")).await);
        }

        let task = tokio::spawn(reconciler.run());
        wait_for_view(&handle, |s| s.epoch == 1).await;

        handle.shutdown().await;
        task.await.unwrap().unwrap();

        assert_eq!(fetcher.calls(), 1);
        assert!(enricher.requests().is_empty());
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_last_known_view() {
        let fetcher = ScriptedFetcher::new(vec![
            Ok(vec![event("a", "alice"), event("b", "bob")]),
            Err(TributaryError::Unavailable("down".into())),
        ]);
        let enricher = ScriptedEnricher::new(vec![Ok(HashMap::from([
            ("a".to_string(), meta("A", "first")),
            ("b".to_string(), meta("B", "second")),
        ]))]);

        let (reconciler, handle) = Reconciler::new(
            fetcher.clone(),
            enricher.clone(),
            session(),
            Duration::from_secs(30),
        );
        let task = tokio::spawn(reconciler.run());

        handle.request_refresh().await;
        wait_for_view(&handle, |s| s.entries.iter().all(|e| e.resolved) && s.entries.len() == 2)
            .await;

        handle.request_refresh().await;
        wait_until(|| fetcher.calls() == 2).await;

        // Stale-but-available: the failed pull changed nothing.
        let snap = handle.current_view();
        assert_eq!(snap.epoch, 1);
        assert_eq!(snap.entries.len(), 2);
        assert!(snap.entries.iter().all(|e| e.resolved));

        handle.shutdown().await;
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_retry_timer_refreshes_after_failure() {
        let fetcher = ScriptedFetcher::new(vec![
            Err(TributaryError::Unavailable("down".into())),
            Ok(vec![event("a", "alice")]),
        ]);
        let enricher = ScriptedEnricher::new(vec![Ok(HashMap::from([(
            "a".to_string(),
            meta("A", "first"),
        )]))]);

        let (reconciler, handle) = Reconciler::new(
            fetcher.clone(),
            enricher.clone(),
            session(),
            Duration::from_millis(50),
        );
        let task = tokio::spawn(reconciler.run());

        // The failed refresh arms the retry timer; no further signals are
        // sent, yet the view recovers on its own.
        handle.request_refresh().await;
        let snap = wait_for_view(&handle, |s| s.entries.len() == 1 && s.entries[0].resolved).await;
        assert_eq!(snap.entries[0].record.content_id, "a");
        assert!(fetcher.calls() >= 2);

        handle.shutdown().await;
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_partial_enrichment_retries_only_missing_ids() {
        let fetcher = ScriptedFetcher::new(vec![
            Ok(vec![event("a", "alice"), event("b", "bob")]),
            Ok(vec![event("a", "alice"), event("b", "bob")]),
        ]);
        let enricher = ScriptedEnricher::new(vec![
            Ok(HashMap::from([("a".to_string(), meta("A", "first"))])),
            Ok(HashMap::from([("b".to_string(), meta("B", "second"))])),
        ]);

        let (reconciler, handle) = Reconciler::new(
            fetcher.clone(),
            enricher.clone(),
            session(),
            Duration::from_secs(30),
        );
        let task = tokio::spawn(reconciler.run());

        handle.request_refresh().await;
        wait_for_view(&handle, |s| s.entries.len() == 2 && s.entries[0].resolved).await;

        handle.request_refresh().await;
        let snap = wait_for_view(&handle, |s| s.entries.iter().all(|e| e.resolved)).await;
        assert_eq!(snap.epoch, 2);

        handle.shutdown().await;
        task.await.unwrap().unwrap();

        // Already-resolved "a" is never re-requested.
        assert_eq!(
            enricher.requests(),
            vec![vec!["a".to_string(), "b".to_string()], vec!["b".to_string()]]
        );
    }

    #[tokio::test]
    async fn test_enrichment_failure_is_not_fatal() {
        let fetcher = ScriptedFetcher::new(vec![Ok(vec![event("a", "alice")])]);
        let enricher =
            ScriptedEnricher::new(vec![Err(TributaryError::Unavailable("quota".into()))]);

        let (reconciler, handle) =
            Reconciler::new(fetcher, enricher, session(), Duration::from_secs(30));
        let task = tokio::spawn(reconciler.run());

        handle.request_refresh().await;
        let snap = wait_for_view(&handle, |s| s.entries.len() == 1).await;
        assert!(!snap.entries[0].resolved);
        assert_eq!(snap.entries[0].display_title(), "(pending metadata)");

        handle.shutdown().await;
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_auth_failure_ends_the_session() {
        let fetcher =
            ScriptedFetcher::new(vec![Err(TributaryError::AuthFailure("expired".into()))]);
        let enricher = ScriptedEnricher::new(vec![]);

        let (reconciler, handle) =
            Reconciler::new(fetcher, enricher, session(), Duration::from_secs(30));
        let task = tokio::spawn(reconciler.run());

        handle.request_refresh().await;

        let result = tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(result, Err(TributaryError::AuthFailure(_))));
    }

    #[tokio::test]
    async fn test_current_view_before_first_refresh_is_empty() {
        let fetcher = ScriptedFetcher::new(vec![]);
        let enricher = ScriptedEnricher::new(vec![]);
        let (_reconciler, handle) =
            Reconciler::new(fetcher, enricher, session(), Duration::from_secs(30));

        let snap = handle.current_view();
        assert_eq!(snap.epoch, 0);
        assert!(snap.entries.is_empty());
        assert!(snap.refreshed_at.is_none());
    }
}
