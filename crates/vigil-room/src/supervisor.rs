use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use crate::connector::{canonical_media_url, RoomConnection, RoomConnector, RoomInfo};
use crate::error::RoomWatchError;

/// Deadline for one-shot room queries, including the ones a watch task
/// performs after a change event.
pub const DEFAULT_INFO_TIMEOUT: Duration = Duration::from_secs(10);

/// Receives watch notifications. A failing `media_changed` is logged
/// and swallowed; the subscription survives it.
#[async_trait]
pub trait RoomChangeListener: Send + Sync {
    async fn media_changed(&self, info: RoomInfo) -> Result<()>;

    /// Invoked exactly once when a watch is torn down for good after
    /// its reconnect budget is exhausted. Not invoked on `unwatch`.
    async fn watch_closed(&self, room: &str, reason: &str);
}

#[derive(Debug, Clone)]
pub struct RoomWatchSupervisorConfig {
    pub info_timeout: Duration,
    pub reconnect_delay: Duration,
    /// Consecutive connect/stream failures tolerated before a watch is
    /// declared unrecoverable. A delivered change resets the streak.
    pub max_failure_streak: u32,
}

impl Default for RoomWatchSupervisorConfig {
    fn default() -> Self {
        Self {
            info_timeout: DEFAULT_INFO_TIMEOUT,
            reconnect_delay: Duration::from_secs(10),
            max_failure_streak: 6,
        }
    }
}

struct RoomWatchHandle {
    watch_id: u64,
    cancel_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Owns every live room connection for one process: one-shot queries,
/// persistent watches, reconnect supervision, and dedup by room name.
pub struct RoomWatchSupervisor {
    connector: Arc<dyn RoomConnector>,
    config: RoomWatchSupervisorConfig,
    next_watch_id: AtomicU64,
    watches: Mutex<HashMap<String, RoomWatchHandle>>,
}

impl RoomWatchSupervisor {
    pub fn new(connector: Arc<dyn RoomConnector>, config: RoomWatchSupervisorConfig) -> Arc<Self> {
        Arc::new(Self {
            connector,
            config,
            next_watch_id: AtomicU64::new(0),
            watches: Mutex::new(HashMap::new()),
        })
    }

    /// Fetches a room snapshot over a fresh connection, racing the
    /// fixed deadline. The connection is opened and closed inside this
    /// call; it is never shared with a watch.
    pub async fn info(&self, room: &str) -> Result<RoomInfo, RoomWatchError> {
        fetch_room_info(self.connector.as_ref(), room, self.config.info_timeout).await
    }

    /// Starts a persistent watch. Returns `Ok(false)` without opening
    /// anything when the room is already watched; a setup connection
    /// failure propagates to the caller.
    pub async fn watch(
        self: &Arc<Self>,
        room: &str,
        listener: Arc<dyn RoomChangeListener>,
    ) -> Result<bool, RoomWatchError> {
        if self.watches.lock().await.contains_key(room) {
            return Ok(false);
        }

        let mut connection = self.connector.connect(room).await?;

        let mut watches = self.watches.lock().await;
        if watches.contains_key(room) {
            // Lost the race against a concurrent watch call.
            connection.close().await;
            return Ok(false);
        }
        let watch_id = self.next_watch_id.fetch_add(1, Ordering::SeqCst);
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let task = tokio::spawn(run_watch_loop(
            Arc::clone(self),
            room.to_string(),
            watch_id,
            listener,
            connection,
            cancel_rx,
        ));
        watches.insert(
            room.to_string(),
            RoomWatchHandle {
                watch_id,
                cancel_tx,
                task,
            },
        );
        Ok(true)
    }

    /// Cancels a watch. Returns `false` (still a success) when the
    /// room was never watched.
    pub async fn unwatch(&self, room: &str) -> bool {
        let handle = self.watches.lock().await.remove(room);
        match handle {
            Some(handle) => {
                let _ = handle.cancel_tx.send(true);
                // The task closes its connection and exits on its own;
                // dropping the JoinHandle detaches it.
                drop(handle.task);
                true
            }
            None => false,
        }
    }

    pub async fn is_watched(&self, room: &str) -> bool {
        self.watches.lock().await.contains_key(room)
    }

    pub async fn watched_rooms(&self) -> Vec<String> {
        let mut rooms: Vec<String> = self.watches.lock().await.keys().cloned().collect();
        rooms.sort();
        rooms
    }

    /// Removes the bookkeeping entry only when it still belongs to the
    /// calling watch task; a room that was unwatched and re-watched in
    /// the meantime keeps its new entry.
    async fn remove_watch_entry(&self, room: &str, watch_id: u64) -> bool {
        let mut watches = self.watches.lock().await;
        if watches.get(room).map(|handle| handle.watch_id) == Some(watch_id) {
            watches.remove(room);
            true
        } else {
            false
        }
    }
}

/// One-shot snapshot fetch with the deadline race. Losing the race
/// drops the in-flight future, and with it the connection; trait
/// implementations release their transport on drop, so no connection
/// outlives a timeout.
pub(crate) async fn fetch_room_info(
    connector: &dyn RoomConnector,
    room: &str,
    deadline: Duration,
) -> Result<RoomInfo, RoomWatchError> {
    let fetch = async {
        let mut connection = connector.connect(room).await?;
        let media = connection
            .current_media()
            .await
            .map_err(|error| RoomWatchError::query(room, error.to_string()))?;
        let user_count = connection
            .user_count()
            .await
            .map_err(|error| RoomWatchError::query(room, error.to_string()))?;
        connection.close().await;
        Ok(RoomInfo {
            room: room.to_string(),
            media_url: canonical_media_url(&media.media_type, &media.media_id),
            media_title: media.title,
            media_type: media.media_type,
            user_count,
        })
    };
    match tokio::time::timeout(deadline, fetch).await {
        Ok(result) => result,
        Err(_) => Err(RoomWatchError::Timeout {
            room: room.to_string(),
            timeout_ms: deadline.as_millis().try_into().unwrap_or(u64::MAX),
        }),
    }
}

async fn run_watch_loop(
    supervisor: Arc<RoomWatchSupervisor>,
    room: String,
    watch_id: u64,
    listener: Arc<dyn RoomChangeListener>,
    mut connection: Box<dyn RoomConnection>,
    mut cancel_rx: watch::Receiver<bool>,
) {
    enum StreamTurn {
        Cancelled,
        Stream(Result<bool>),
    }

    let mut failure_streak: u32 = 0;
    let close_reason;

    'supervise: loop {
        loop {
            let turn = tokio::select! {
                _ = cancel_rx.changed() => StreamTurn::Cancelled,
                changed = connection.next_media_change() => StreamTurn::Stream(changed),
            };
            match turn {
                StreamTurn::Cancelled => {
                    connection.close().await;
                    return;
                }
                StreamTurn::Stream(Ok(true)) => {
                    failure_streak = 0;
                    // Fresh connection per query: the service is known
                    // to fail a second request on a reused one.
                    let info = fetch_room_info(
                        supervisor.connector.as_ref(),
                        &room,
                        supervisor.config.info_timeout,
                    )
                    .await;
                    match info {
                        Ok(info) => {
                            if let Err(error) = listener.media_changed(info).await {
                                tracing::warn!(
                                    room = room.as_str(),
                                    %error,
                                    "media-change listener failed; watch continues"
                                );
                            }
                        }
                        Err(error) => {
                            tracing::warn!(
                                room = room.as_str(),
                                %error,
                                "post-change info fetch failed; watch continues"
                            );
                        }
                    }
                }
                StreamTurn::Stream(Ok(false)) => {
                    connection.close().await;
                    failure_streak = failure_streak.saturating_add(1);
                    tracing::debug!(room = room.as_str(), failure_streak, "room stream closed");
                    break;
                }
                StreamTurn::Stream(Err(error)) => {
                    connection.close().await;
                    failure_streak = failure_streak.saturating_add(1);
                    tracing::warn!(room = room.as_str(), failure_streak, %error, "room stream failed");
                    break;
                }
            }
        }

        loop {
            if failure_streak >= supervisor.config.max_failure_streak {
                close_reason = format!("{failure_streak} consecutive connection failures");
                break 'supervise;
            }
            tokio::select! {
                _ = cancel_rx.changed() => {
                    return;
                }
                _ = tokio::time::sleep(supervisor.config.reconnect_delay) => {}
            }
            match supervisor.connector.connect(&room).await {
                Ok(next_connection) => {
                    connection = next_connection;
                    tracing::debug!(room = room.as_str(), "room watch reconnected");
                    continue 'supervise;
                }
                Err(error) => {
                    failure_streak = failure_streak.saturating_add(1);
                    tracing::warn!(room = room.as_str(), failure_streak, %error, "room reconnect failed");
                }
            }
        }
    }

    if supervisor.remove_watch_entry(&room, watch_id).await {
        tracing::warn!(room = room.as_str(), %close_reason, "room watch unrecoverable");
        listener.watch_closed(&room, &close_reason).await;
    }
}
