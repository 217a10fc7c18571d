use crate::collections::CollectionManager;
use crate::config::Config;
use crate::error::LoadError;
use crate::looting::{EventSink, LootBlocks, LootContext, LootingSettings, ScanGovernor, TryLoot};
use crate::models::lootability::Lootability;
use crate::models::reference::ObjectRef;
use crate::models::types::{FormId, RefId};
use crate::world::WorldPorts;
use parking_lot::RwLock;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Composition root. Owns every service the scan worker and the event callbacks share.
pub struct Registry {
    pub world: WorldPorts,
    pub collections: Arc<CollectionManager>,
    pub governor: Arc<ScanGovernor>,
    pub blocks: Arc<LootBlocks>,
    pub events: Arc<dyn EventSink>,
    pub config: Arc<Config>,
    settings: RwLock<Arc<LootingSettings>>,
    ready: AtomicBool,
}

impl Registry {
    pub fn new(world: WorldPorts, events: Arc<dyn EventSink>, settings: LootingSettings, config: Arc<Config>) -> Self {
        let collections = Arc::new(CollectionManager::new(
            world.catalog.clone(),
            world.inventory.clone(),
            world.location.clone(),
            events.clone(),
        ));
        collections.set_added_template(&settings.collection_added_template);

        Self {
            governor: Arc::new(ScanGovernor::new(events.clone())),
            blocks: Arc::new(LootBlocks::new()),
            settings: RwLock::new(Arc::new(settings)),
            ready: AtomicBool::new(false),
            world,
            collections,
            events,
            config,
        }
    }

    /// Snapshot of the current settings. A push during a pass does not affect that pass.
    pub fn settings(&self) -> Arc<LootingSettings> {
        self.settings.read().clone()
    }

    /// Plugin data is loaded and the worker may scan.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    /// One-time definition load. Scanning is enabled either way: a failed load only turns
    /// collections off.
    pub fn load_definitions(&self, dir: &Path) -> Result<usize, LoadError> {
        let loaded = self.collections.process_definitions(dir);
        self.collections.set_enabled(self.config.collections_enabled && loaded.is_ok());
        self.ready.store(true, Ordering::SeqCst);
        if let Ok(n) = &loaded {
            tracing::info!(collections = n, active = self.collections.is_active(), "definitions loaded");
        }
        loaded
    }

    /// Clears per-visit state. A game reload also forgets everything the governor and
    /// block lists learned.
    pub fn reset_state(&self, game_reload: bool) {
        self.blocks.reset_blocked_references();
        self.governor.reset_looted_dynamic_refs();
        if game_reload {
            self.blocks.reset();
            self.governor.clear();
            self.collections
                .on_game_reload(self.config.collections_enabled && self.collections.is_ready());
        }
        tracing::debug!(game_reload, "state reset");
    }

    pub fn on_settings_pushed(&self, settings: LootingSettings) {
        self.collections.set_added_template(&settings.collection_added_template);
        *self.settings.write() = Arc::new(settings);
        // looting types or thresholds may have changed
        self.blocks.reset_blocked_forms();
        self.governor.reset_looted_containers();
        tracing::info!("looting settings updated");
    }

    pub fn set_managed_lists(&self, whitelist: Vec<FormId>, blacklist: Vec<FormId>) {
        self.blocks.set_whitelist(whitelist);
        self.blocks.set_blacklist(blacklist);
        self.blocks.reset_blocked_forms();
    }

    pub fn on_location_change(&self) {
        self.reset_state(false);
        self.governor.clear_glow_expiration();
        self.governor.release_theft_locks();
    }

    /// Stops the worker before the game state is swapped out. `on_game_loaded` resumes it.
    pub fn prepare_for_reload(&self) {
        self.governor.disallow();
        tracing::debug!("scanning paused for reload");
    }

    pub fn on_game_loaded(&self) {
        self.reset_state(true);
        self.governor.allow();
    }

    pub fn update_game_time(&self, game_time: f32) {
        self.collections.update_game_time(game_time);
    }

    // ========================================================================
    // CALLBACKS FROM THE SCRIPT LAYER
    // ========================================================================

    /// A dispatched harvest finished. Releases the reference and queues the item for
    /// collection matching.
    pub fn on_harvest_complete(&self, refr: RefId, item: FormId, silent: bool) {
        if !self.governor.unlock_harvest(refr, silent) {
            tracing::debug!(%refr, "harvest completion for unlocked reference");
        }
        self.collections.check_enqueue_added_item(item);
    }

    pub fn on_producer_resolved(&self, producer: FormId, lootable: Option<FormId>) {
        match lootable {
            Some(_) => {
                self.blocks.set_lootable_for_producer(producer, lootable);
            }
            None => {
                // nothing to harvest, stop asking
                self.blocks.block_form_permanently(producer, Lootability::PendingProducerIngredient);
            }
        }
    }

    /// The undetected theft check passed. The reference is looted without another check,
    /// under the lock the check held.
    pub fn on_theft_check_passed(&self, refr: &ObjectRef) -> Lootability {
        let verdict = self.try_loot(Some(refr), true, false);
        // not taken over when the pipeline stopped before dispatch
        self.governor.release_theft_lock(refr.id);
        verdict
    }

    /// The theft would have been seen. The reference is left alone until the next cell visit.
    pub fn on_theft_check_detected(&self, refr: RefId) {
        self.governor.release_theft_lock(refr);
        self.blocks.block_reference(refr, Lootability::ItemTheftTriggered);
    }

    /// Runs the decision pipeline on one reference.
    pub fn try_loot(&self, refr: Option<&ObjectRef>, stolen: bool, dry_run: bool) -> Lootability {
        let Some(refr) = refr else {
            return Lootability::NullReference;
        };
        let settings = self.settings();
        let ctx = self.loot_context(&settings);
        TryLoot::new(&ctx, refr, stolen).process(dry_run)
    }

    pub fn loot_context<'a>(&'a self, settings: &'a LootingSettings) -> LootContext<'a> {
        LootContext {
            world: &self.world,
            collections: &self.collections,
            governor: &self.governor,
            blocks: &self.blocks,
            settings,
            events: self.events.as_ref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::looting::RecordingEventSink;
    use crate::models::form::Form;
    use crate::models::object_type::ObjectType;
    use crate::models::types::{Scope, Signature};
    use crate::world::{LoadOrder, MemoryWorld};

    fn registry() -> (Registry, Arc<RecordingEventSink>) {
        let mut lo = LoadOrder::new();
        lo.add_plugin("Skyrim.esm", false);
        let mut w = MemoryWorld::new(lo);
        w.add_form(Form::new(FormId(0x10), Signature::Ingredient, ObjectType::Ingredient));
        let sink = Arc::new(RecordingEventSink::new());
        let cfg = Arc::new(Config {
            definitions_dir: "unused".into(),
            world_file: "unused".into(),
            scan_interval_secs: 1.0,
            collections_enabled: true,
            settings_file: None,
            passes: 1,
        });
        let r = Registry::new(WorldPorts::from_memory(Arc::new(w)), sink.clone(), LootingSettings::default(), cfg);
        (r, sink)
    }

    #[test]
    fn t_null_reference() {
        let (r, _) = registry();
        assert_eq!(r.try_loot(None, false, false), Lootability::NullReference);
    }

    #[test]
    fn t_harvest_completion_releases_lock() {
        let (r, sink) = registry();
        let item = ObjectRef::new(RefId(1), FormId(0x10), Scope::ItemObjects);
        assert_eq!(r.try_loot(Some(&item), false, false), Lootability::Lootable);
        assert_eq!(r.try_loot(Some(&item), false, false), Lootability::HarvestOperationPending);
        r.on_harvest_complete(RefId(1), FormId(0x10), true);
        assert!(!r.governor.is_locked_for_harvest(RefId(1)));
        assert_eq!(sink.harvests(), 1);
    }

    #[test]
    fn t_detected_theft_releases_and_blocks() {
        let (r, sink) = registry();
        r.on_settings_pushed(LootingSettings {
            ownership_rule: crate::models::lootability::OwnershipRule::AllowCrimeIfUndetected,
            ..Default::default()
        });
        let mut item = ObjectRef::new(RefId(2), FormId(0x10), Scope::ItemObjects);
        item.off_limits = true;
        assert_eq!(r.try_loot(Some(&item), false, false), Lootability::ItemTheftTriggered);
        assert_eq!(r.try_loot(Some(&item), false, false), Lootability::HarvestOperationPending);
        r.on_theft_check_detected(RefId(2));
        assert!(!r.governor.is_locked_for_harvest(RefId(2)));
        assert!(r.blocks.is_reference_blocked(RefId(2)));
        assert_eq!(sink.harvests(), 0);
    }

    #[test]
    fn t_reload_pauses_and_clears() {
        let (r, _) = registry();
        r.blocks.blacklist_reference(RefId(5));
        r.prepare_for_reload();
        assert!(!r.governor.is_allowed());
        r.on_game_loaded();
        assert!(r.governor.is_allowed());
        assert!(!r.blocks.is_reference_blacklisted(RefId(5)));
    }

    #[test]
    fn t_settings_push_replaces_snapshot() {
        let (r, _) = registry();
        let before = r.settings();
        r.on_settings_pushed(LootingSettings { valuable_threshold: 42, ..Default::default() });
        assert_eq!(before.valuable_threshold, 500);
        assert_eq!(r.settings().valuable_threshold, 42);
    }

    #[test]
    fn t_missing_definitions_dir_still_ready() {
        let (r, _) = registry();
        let dir = tempfile::tempdir().unwrap();
        assert!(r.load_definitions(&dir.path().join("absent")).is_err());
        assert!(r.is_ready());
        assert!(!r.collections.is_active());
    }
}
