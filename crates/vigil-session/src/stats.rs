use std::sync::atomic::{AtomicUsize, Ordering};

use vigil_core::current_unix_timestamp_ms;

/// Process-wide totals updated by the session manager as communities
/// join. Pure aggregation; no state machine.
#[derive(Debug, Default)]
pub struct ProcessStats {
    guilds: AtomicUsize,
    users: AtomicUsize,
}

/// Point-in-time totals for the periodic stats log line and the `info`
/// command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub guilds: usize,
    pub users: usize,
    pub watched_rooms: usize,
    pub generated_unix_ms: u64,
}

impl ProcessStats {
    pub fn record_guild(&self, member_count: usize) {
        self.guilds.fetch_add(1, Ordering::SeqCst);
        self.users.fetch_add(member_count, Ordering::SeqCst);
    }

    pub fn guilds(&self) -> usize {
        self.guilds.load(Ordering::SeqCst)
    }

    pub fn users(&self) -> usize {
        self.users.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self, watched_rooms: usize) -> StatsSnapshot {
        StatsSnapshot {
            guilds: self.guilds(),
            users: self.users(),
            watched_rooms,
            generated_unix_ms: current_unix_timestamp_ms(),
        }
    }
}
