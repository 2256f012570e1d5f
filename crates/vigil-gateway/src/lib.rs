//! Reconnect supervision for the upstream chat-platform link.
//!
//! The platform library's own reconnect behavior is deliberately not
//! relied on: unexpected disconnects feed this explicit state machine,
//! which runs at most one reconnect loop on a fixed interval and
//! performs one-time ready initialization exactly once per process.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::Mutex;

/// Link lifecycle: `Disconnected → Connecting → Connected →
/// (error/closed) → Reconnecting → Connecting → …`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayLinkState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

/// Opens the upstream link. `connect` resolving cleanly means the
/// transport is up; the platform's ready event arrives separately and
/// is reported via [`GatewayConnectionSupervisor::handle_connected`].
#[async_trait]
pub trait GatewayTransport: Send + Sync {
    async fn connect(&self) -> Result<()>;
}

#[derive(Debug)]
struct SupervisorState {
    link: GatewayLinkState,
    reconnect_active: bool,
    ready_initialized: bool,
}

/// Owns the link state and the single guarded reconnect loop.
pub struct GatewayConnectionSupervisor {
    transport: Arc<dyn GatewayTransport>,
    reconnect_interval: Duration,
    state: Mutex<SupervisorState>,
}

impl GatewayConnectionSupervisor {
    pub fn new(
        transport: Arc<dyn GatewayTransport>,
        reconnect_interval: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            transport,
            reconnect_interval,
            state: Mutex::new(SupervisorState {
                link: GatewayLinkState::Disconnected,
                reconnect_active: false,
                ready_initialized: false,
            }),
        })
    }

    /// Initial connect at process start. A failure here is handled
    /// like any later disconnect: the reconnect loop takes over.
    pub async fn start(self: &Arc<Self>) -> Result<()> {
        self.state.lock().await.link = GatewayLinkState::Connecting;
        match self.transport.connect().await {
            Ok(()) => Ok(()),
            Err(error) => {
                tracing::warn!(%error, "initial gateway connect failed");
                self.handle_connection_lost("initial connect failed").await;
                Ok(())
            }
        }
    }

    /// Reports the platform's ready event. Returns `true` exactly once
    /// per process: the caller runs its one-time initialization on
    /// that first ready and must skip it on duplicates.
    pub async fn handle_connected(&self) -> bool {
        let mut state = self.state.lock().await;
        state.link = GatewayLinkState::Connected;
        state.reconnect_active = false;
        if state.ready_initialized {
            false
        } else {
            state.ready_initialized = true;
            true
        }
    }

    /// Reports an unexpected error or socket close. Spawns the
    /// reconnect loop unless one is already active.
    pub async fn handle_connection_lost(self: &Arc<Self>, reason: &str) {
        {
            let mut state = self.state.lock().await;
            state.link = GatewayLinkState::Reconnecting;
            if state.reconnect_active {
                tracing::debug!(reason, "gateway reconnect already in progress");
                return;
            }
            state.reconnect_active = true;
        }
        tracing::warn!(reason, "gateway link lost; reconnecting");
        let supervisor = Arc::clone(self);
        tokio::spawn(async move {
            supervisor.run_reconnect_loop().await;
        });
    }

    async fn run_reconnect_loop(&self) {
        loop {
            tokio::time::sleep(self.reconnect_interval).await;
            {
                let mut state = self.state.lock().await;
                if !state.reconnect_active {
                    // Connected in the meantime; the loop is done.
                    return;
                }
                state.link = GatewayLinkState::Connecting;
            }
            match self.transport.connect().await {
                Ok(()) => {
                    // Transport is up again; ready arrives separately.
                    let mut state = self.state.lock().await;
                    state.reconnect_active = false;
                    return;
                }
                Err(error) => {
                    let mut state = self.state.lock().await;
                    state.link = GatewayLinkState::Reconnecting;
                    drop(state);
                    tracing::warn!(%error, "gateway reconnect attempt failed");
                }
            }
        }
    }

    pub async fn link_state(&self) -> GatewayLinkState {
        self.state.lock().await.link
    }

    pub async fn is_reconnecting(&self) -> bool {
        self.state.lock().await.reconnect_active
    }
}
