//! Resource governor: gates model tier selection on host RAM/swap/VRAM,
//! and serializes model use behind a process-wide exclusive lock so two
//! reasoning passes never load two large models at once.

pub mod model;
pub mod probe;

use std::time::Duration;

use kg_core::{CoreError, CoreResult};
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{info, warn};

pub use model::{ModelBackend, ModelConfig, ModelRegistry, ModelTier};
pub use probe::{HostSnapshot, NullVramProbe, SysinfoProbe, VramProbe};

/// Below this much free RAM, reasoning-tier requests are downgraded to
/// extraction tier (spec §4.8).
pub const MIN_FREE_RAM_BYTES: u64 = 2 * 1024 * 1024 * 1024;

/// Above this much swap in use, reasoning-tier requests are downgraded too —
/// active swapping means we're already under memory pressure even if "free"
/// looks adequate.
pub const MAX_SWAP_BYTES: u64 = 1024 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GovernorEvent {
    TierDowngraded,
    Paused,
    Resumed,
}

pub struct ResourceGovernor {
    probe: Box<dyn VramProbe>,
    sys: Mutex<sysinfo::System>,
    exclusive: Mutex<()>,
    events: broadcast::Sender<GovernorEvent>,
}

impl ResourceGovernor {
    pub fn new(probe: Box<dyn VramProbe>) -> Self {
        let (tx, _rx) = broadcast::channel(16);
        Self {
            probe,
            sys: Mutex::new(sysinfo::System::new_all()),
            exclusive: Mutex::new(()),
            events: tx,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GovernorEvent> {
        self.events.subscribe()
    }

    pub fn snapshot(&self) -> HostSnapshot {
        let mut sys = self.sys.lock();
        sys.refresh_memory();
        HostSnapshot {
            free_ram_bytes: sys.available_memory(),
            swap_used_bytes: sys.used_swap(),
            vram_free_bytes: self.probe.free_vram_bytes(),
        }
    }

    /// Downgrades `requested` to `Extract` if the host is under memory
    /// pressure (spec §4.8); otherwise returns it unchanged.
    pub fn select_tier(&self, requested: ModelTier) -> ModelTier {
        let snapshot = self.snapshot();
        self.select_tier_for(requested, snapshot)
    }

    /// Same decision as `select_tier`, against a supplied snapshot instead of
    /// a live sysinfo read — the seam integration tests and scenario
    /// simulations use to exercise the downgrade path deterministically.
    pub fn select_tier_for(&self, requested: ModelTier, snapshot: HostSnapshot) -> ModelTier {
        if requested == ModelTier::Extract {
            return requested;
        }
        if snapshot.free_ram_bytes < MIN_FREE_RAM_BYTES || snapshot.swap_used_bytes > MAX_SWAP_BYTES {
            warn!(free_ram = snapshot.free_ram_bytes, swap = snapshot.swap_used_bytes, "downgrading reason tier to extract under memory pressure");
            let _ = self.events.send(GovernorEvent::TierDowngraded);
            ModelTier::Extract
        } else {
            requested
        }
    }

    /// Runs `f` under the process-wide exclusive lock, broadcasting
    /// pause/resume so any other in-flight phase knows to yield while a
    /// model is loaded (spec §4.8 "pause/resume broadcast").
    pub async fn run_exclusive<F, Fut, T>(&self, f: F) -> CoreResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = CoreResult<T>>,
    {
        let _guard = self.exclusive.lock();
        let _ = self.events.send(GovernorEvent::Paused);
        info!("acquired exclusive model-execution lock");
        let result = f().await;
        let _ = self.events.send(GovernorEvent::Resumed);
        result
    }
}

/// Per-tier call timeout (spec §4.8).
pub fn timeout_for(tier: ModelTier) -> Duration {
    match tier {
        ModelTier::Extract => Duration::from_secs(30),
        ModelTier::Reason => Duration::from_secs(120),
    }
}

pub async fn call_with_timeout<F>(tier: ModelTier, fut: F) -> CoreResult<F::Output>
where
    F: std::future::Future,
{
    tokio::time::timeout(timeout_for(tier), fut).await.map_err(|_| CoreError::Timeout(timeout_for(tier)))
}
