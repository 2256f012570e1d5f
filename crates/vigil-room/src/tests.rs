//! Watch lifecycle tests against a scripted in-memory room service.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use tokio::sync::mpsc;

use super::*;

struct ScriptedInner {
    connects: AtomicUsize,
    open_connections: AtomicUsize,
    fail_connects: AtomicBool,
    stall_queries: AtomicBool,
    media: StdMutex<RoomMedia>,
    user_count: AtomicUsize,
    change_feeds: StdMutex<Vec<mpsc::UnboundedSender<()>>>,
}

#[derive(Clone)]
struct ScriptedRoomService {
    inner: Arc<ScriptedInner>,
}

impl ScriptedRoomService {
    fn new() -> Self {
        Self {
            inner: Arc::new(ScriptedInner {
                connects: AtomicUsize::new(0),
                open_connections: AtomicUsize::new(0),
                fail_connects: AtomicBool::new(false),
                stall_queries: AtomicBool::new(false),
                media: StdMutex::new(RoomMedia {
                    media_id: "dQw4w9WgXcQ".to_string(),
                    title: "first title".to_string(),
                    media_type: "yt".to_string(),
                }),
                user_count: AtomicUsize::new(7),
                change_feeds: StdMutex::new(Vec::new()),
            }),
        }
    }

    fn connects(&self) -> usize {
        self.inner.connects.load(Ordering::SeqCst)
    }

    fn open_connections(&self) -> usize {
        self.inner.open_connections.load(Ordering::SeqCst)
    }

    fn set_fail_connects(&self, fail: bool) {
        self.inner.fail_connects.store(fail, Ordering::SeqCst);
    }

    fn set_stall_queries(&self, stall: bool) {
        self.inner.stall_queries.store(stall, Ordering::SeqCst);
    }

    fn set_media_title(&self, title: &str) {
        self.inner.media.lock().expect("media lock").title = title.to_string();
    }

    fn trigger_change(&self) {
        for feed in self.inner.change_feeds.lock().expect("feeds lock").iter() {
            let _ = feed.send(());
        }
    }

    fn drop_change_feeds(&self) {
        self.inner.change_feeds.lock().expect("feeds lock").clear();
    }
}

struct ScriptedConnection {
    inner: Arc<ScriptedInner>,
    changes: mpsc::UnboundedReceiver<()>,
}

impl Drop for ScriptedConnection {
    fn drop(&mut self) {
        self.inner.open_connections.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl RoomConnection for ScriptedConnection {
    async fn current_media(&mut self) -> Result<RoomMedia> {
        if self.inner.stall_queries.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        Ok(self.inner.media.lock().expect("media lock").clone())
    }

    async fn user_count(&mut self) -> Result<usize> {
        Ok(self.inner.user_count.load(Ordering::SeqCst))
    }

    async fn next_media_change(&mut self) -> Result<bool> {
        Ok(self.changes.recv().await.is_some())
    }

    async fn close(&mut self) {}
}

#[async_trait]
impl RoomConnector for ScriptedRoomService {
    async fn connect(&self, room: &str) -> Result<Box<dyn RoomConnection>, RoomWatchError> {
        self.inner.connects.fetch_add(1, Ordering::SeqCst);
        if self.inner.fail_connects.load(Ordering::SeqCst) {
            return Err(RoomWatchError::connect(room, "scripted connect failure"));
        }
        self.inner.open_connections.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.change_feeds.lock().expect("feeds lock").push(tx);
        Ok(Box::new(ScriptedConnection {
            inner: Arc::clone(&self.inner),
            changes: rx,
        }))
    }
}

struct RecordingListener {
    changes: mpsc::UnboundedSender<RoomInfo>,
    closures: mpsc::UnboundedSender<(String, String)>,
    fail_next_change: AtomicBool,
}

impl RecordingListener {
    fn new() -> (
        Arc<Self>,
        mpsc::UnboundedReceiver<RoomInfo>,
        mpsc::UnboundedReceiver<(String, String)>,
    ) {
        let (changes_tx, changes_rx) = mpsc::unbounded_channel();
        let (closures_tx, closures_rx) = mpsc::unbounded_channel();
        (
            Arc::new(Self {
                changes: changes_tx,
                closures: closures_tx,
                fail_next_change: AtomicBool::new(false),
            }),
            changes_rx,
            closures_rx,
        )
    }
}

#[async_trait]
impl RoomChangeListener for RecordingListener {
    async fn media_changed(&self, info: RoomInfo) -> Result<()> {
        let _ = self.changes.send(info);
        if self.fail_next_change.swap(false, Ordering::SeqCst) {
            bail!("scripted listener failure");
        }
        Ok(())
    }

    async fn watch_closed(&self, room: &str, reason: &str) {
        let _ = self.closures.send((room.to_string(), reason.to_string()));
    }
}

fn fast_config() -> RoomWatchSupervisorConfig {
    RoomWatchSupervisorConfig {
        info_timeout: Duration::from_millis(200),
        reconnect_delay: Duration::from_millis(10),
        max_failure_streak: 2,
    }
}

async fn recv_with_deadline<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> T {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("notification within deadline")
        .expect("channel open")
}

#[tokio::test]
async fn functional_info_fetches_over_a_fresh_connection_and_closes_it() {
    let service = ScriptedRoomService::new();
    let supervisor = RoomWatchSupervisor::new(Arc::new(service.clone()), fast_config());

    let info = supervisor.info("lobby").await.expect("info");
    assert_eq!(info.room, "lobby");
    assert_eq!(info.media_title, "first title");
    assert_eq!(info.user_count, 7);
    assert_eq!(
        info.media_url.as_deref(),
        Some("https://www.youtube.com/watch?v=dQw4w9WgXcQ")
    );
    assert_eq!(service.connects(), 1);
    assert_eq!(service.open_connections(), 0);
}

#[tokio::test]
async fn functional_info_timeout_leaves_no_dangling_connection() {
    let service = ScriptedRoomService::new();
    service.set_stall_queries(true);
    let supervisor = RoomWatchSupervisor::new(Arc::new(service.clone()), fast_config());

    let error = supervisor.info("lobby").await.expect_err("must time out");
    assert!(error.is_timeout(), "expected timeout, got {error}");
    assert_eq!(service.open_connections(), 0);
}

#[tokio::test]
async fn functional_double_watch_keeps_exactly_one_live_connection() {
    let service = ScriptedRoomService::new();
    let supervisor = RoomWatchSupervisor::new(Arc::new(service.clone()), fast_config());
    let (listener, _changes, _closures) = RecordingListener::new();

    let first = supervisor
        .watch("lobby", listener.clone())
        .await
        .expect("first watch");
    let second = supervisor
        .watch("lobby", listener.clone())
        .await
        .expect("second watch");

    assert!(first);
    assert!(!second);
    assert_eq!(service.connects(), 1);
    assert_eq!(supervisor.watched_rooms().await, vec!["lobby".to_string()]);
}

#[tokio::test]
async fn unit_unwatch_on_never_watched_room_is_a_no_op() {
    let service = ScriptedRoomService::new();
    let supervisor = RoomWatchSupervisor::new(Arc::new(service.clone()), fast_config());

    assert!(!supervisor.unwatch("ghost-room").await);
    assert_eq!(service.connects(), 0);
}

#[tokio::test]
async fn functional_change_event_rederives_info_and_notifies_listener() {
    let service = ScriptedRoomService::new();
    let supervisor = RoomWatchSupervisor::new(Arc::new(service.clone()), fast_config());
    let (listener, mut changes, _closures) = RecordingListener::new();

    supervisor.watch("lobby", listener).await.expect("watch");
    service.set_media_title("second title");
    service.trigger_change();

    let info = recv_with_deadline(&mut changes).await;
    assert_eq!(info.media_title, "second title");
    // One persistent connection plus one fresh query connection.
    assert_eq!(service.connects(), 2);
    assert!(supervisor.is_watched("lobby").await);
}

#[tokio::test]
async fn regression_failing_listener_does_not_end_the_subscription() {
    let service = ScriptedRoomService::new();
    let supervisor = RoomWatchSupervisor::new(Arc::new(service.clone()), fast_config());
    let (listener, mut changes, _closures) = RecordingListener::new();

    supervisor
        .watch("lobby", listener.clone())
        .await
        .expect("watch");

    listener.fail_next_change.store(true, Ordering::SeqCst);
    service.trigger_change();
    let _ = recv_with_deadline(&mut changes).await;

    service.trigger_change();
    let info = recv_with_deadline(&mut changes).await;
    assert_eq!(info.room, "lobby");
    assert!(supervisor.is_watched("lobby").await);
}

#[tokio::test]
async fn functional_exhausted_reconnect_budget_closes_the_watch_once() {
    let service = ScriptedRoomService::new();
    let supervisor = RoomWatchSupervisor::new(Arc::new(service.clone()), fast_config());
    let (listener, _changes, mut closures) = RecordingListener::new();

    supervisor.watch("lobby", listener).await.expect("watch");
    service.set_fail_connects(true);
    service.drop_change_feeds();

    let (room, reason) = recv_with_deadline(&mut closures).await;
    assert_eq!(room, "lobby");
    assert!(reason.contains("consecutive"));
    assert!(!supervisor.is_watched("lobby").await);
    assert!(closures.try_recv().is_err(), "watch_closed fired twice");
}

#[tokio::test]
async fn regression_unwatch_cancels_without_a_closure_notification() {
    let service = ScriptedRoomService::new();
    let supervisor = RoomWatchSupervisor::new(Arc::new(service.clone()), fast_config());
    let (listener, _changes, mut closures) = RecordingListener::new();

    supervisor.watch("lobby", listener).await.expect("watch");
    assert!(supervisor.unwatch("lobby").await);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(closures.try_recv().is_err());
    assert!(!supervisor.is_watched("lobby").await);
    assert_eq!(service.open_connections(), 0);
}
