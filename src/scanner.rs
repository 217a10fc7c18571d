//! Background scan loop.
//!
//! Each pass drains the added-item queue, then runs the decision pipeline over the nearby
//! references that survive the governor's checks. Passes are never interrupted: shutdown is
//! only observed between passes.

use crate::hardening::{MAX_SCAN_INTERVAL_SECS, MIN_SCAN_DELAY};
use crate::looting::TryLoot;
use crate::models::lootability::Lootability;
use crate::models::types::RefId;
use crate::state::registry::Registry;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Why a pass did not run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassSkipped {
    NotReady,
    SearchDisallowed,
    LocationUnstable,
}

/// Verdict for each reference the pass dispatched.
pub type PassReport = Vec<(RefId, Lootability)>;

/// One pass. Returns why it was skipped when a gate is closed.
pub fn run_pass(registry: &Registry) -> Result<PassReport, PassSkipped> {
    if !registry.is_ready() {
        return Err(PassSkipped::NotReady);
    }
    if !registry.governor.is_allowed() {
        return Err(PassSkipped::SearchDisallowed);
    }
    if !registry.world.location.is_stable() {
        return Err(PassSkipped::LocationUnstable);
    }

    registry.collections.process_added_items();

    let settings = registry.settings();
    let nearby = registry.world.references.nearby_references();
    let targets = registry.governor.select_targets(nearby, &registry.blocks, &settings);
    let ctx = registry.loot_context(&settings);

    let report: PassReport = targets
        .iter()
        .map(|refr| (refr.id, TryLoot::new(&ctx, refr, false).process(false)))
        .collect();
    tracing::debug!(targets = report.len(), "scan pass done");
    Ok(report)
}

pub struct ScanWorker {
    registry: Arc<Registry>,
    delay: Duration,
}

impl ScanWorker {
    pub fn new(registry: Arc<Registry>) -> Self {
        // a hand-built Config skips validation
        let secs = registry.config.scan_interval_secs.clamp(0.0, MAX_SCAN_INTERVAL_SECS);
        let configured = Duration::try_from_secs_f64(secs).unwrap_or(MIN_SCAN_DELAY);
        Self { registry, delay: configured.max(MIN_SCAN_DELAY) }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Spawns the loop. Each completed pass is sent to `on_pass`. The loop exits when
    /// `shutdown` flips to true or its sender is dropped.
    pub fn spawn<F>(self, mut shutdown: watch::Receiver<bool>, mut on_pass: F) -> JoinHandle<()>
    where
        F: FnMut(&Registry, PassReport) + Send + 'static,
    {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.delay);
            loop {
                tokio::select! {
                    _ = interval.tick() => {}
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                        continue;
                    }
                }

                match run_pass(&self.registry) {
                    Ok(report) => on_pass(self.registry.as_ref(), report),
                    Err(skipped) => tracing::trace!(?skipped, "pass skipped"),
                }
                // ask for pushed items and time while sleeping
                self.registry.collections.refresh();
            }
            tracing::info!("scan worker stopped");
        })
    }
}
