use crate::hardening::MAX_REFS_PER_PASS;
use crate::looting::blocks::LootBlocks;
use crate::looting::events::EventSink;
use crate::looting::settings::LootingSettings;
use crate::models::lootability::{DeadBodyLooting, GlowReason, Lootability};
use crate::models::reference::ObjectRef;
use crate::models::types::{FormId, RefId, Scope};
use dashmap::{DashMap, DashSet};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Per-reference dispatch lock plus the "already handled" memory of the scanner.
///
/// Lock order: callers holding the collection manager lock release it before calling in
/// here. Nothing in the governor calls back into the manager.
pub struct ScanGovernor {
    harvest_lock: DashSet<RefId>,
    // locks held while the script layer runs an undetected-theft check
    theft_pending: DashSet<RefId>,
    pending_notifies: AtomicUsize,
    search_allowed: AtomicBool,
    glow_expiration: DashMap<RefId, Instant>,
    // (reference, base) so a recycled dynamic reference id does not match
    looted_dynamic: Mutex<HashSet<(RefId, FormId)>>,
    looted_containers: Mutex<HashSet<RefId>>,
    locked_containers: Mutex<HashSet<RefId>>,
    events: Arc<dyn EventSink>,
}

impl ScanGovernor {
    pub fn new(events: Arc<dyn EventSink>) -> Self {
        Self {
            harvest_lock: DashSet::new(),
            theft_pending: DashSet::new(),
            pending_notifies: AtomicUsize::new(0),
            search_allowed: AtomicBool::new(true),
            glow_expiration: DashMap::new(),
            looted_dynamic: Mutex::new(HashSet::new()),
            looted_containers: Mutex::new(HashSet::new()),
            locked_containers: Mutex::new(HashSet::new()),
            events,
        }
    }

    // ========================================================================
    // HARVEST LOCK
    // ========================================================================

    /// False when a harvest of this reference is already in flight.
    pub fn lock_harvest(&self, refr: RefId, silent: bool) -> bool {
        if !self.harvest_lock.insert(refr) {
            tracing::debug!(%refr, "harvest already pending");
            return false;
        }
        if !silent {
            self.pending_notifies.fetch_add(1, Ordering::SeqCst);
        }
        true
    }

    pub fn is_locked_for_harvest(&self, refr: RefId) -> bool {
        self.harvest_lock.contains(&refr)
    }

    pub fn unlock_harvest(&self, refr: RefId, silent: bool) -> bool {
        if self.harvest_lock.remove(&refr).is_none() {
            return false;
        }
        if !silent {
            let _ = self
                .pending_notifies
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| Some(n.saturating_sub(1)));
        }
        true
    }

    /// Keeps the reference locked until the theft check reports back.
    pub fn hold_for_theft_check(&self, refr: RefId) {
        self.theft_pending.insert(refr);
    }

    /// Lock for the re-dispatch after a passed theft check. Takes over the lock the check
    /// held, or acquires a fresh one when there was none.
    pub fn lock_after_theft(&self, refr: RefId, silent: bool) -> bool {
        if self.theft_pending.remove(&refr).is_none() {
            return self.lock_harvest(refr, silent);
        }
        if !silent {
            self.pending_notifies.fetch_add(1, Ordering::SeqCst);
        }
        true
    }

    /// Drops a lock still held for a theft check. False when none was held.
    pub fn release_theft_lock(&self, refr: RefId) -> bool {
        if self.theft_pending.remove(&refr).is_none() {
            return false;
        }
        self.harvest_lock.remove(&refr);
        true
    }

    /// Location change: checks still outstanding will never report back.
    pub fn release_theft_locks(&self) {
        let held: Vec<RefId> = self.theft_pending.iter().map(|r| *r).collect();
        for refr in held {
            self.release_theft_lock(refr);
        }
    }

    pub fn pending_harvest_notifications(&self) -> usize {
        self.pending_notifies.load(Ordering::SeqCst)
    }

    pub fn clear_pending_harvest_notifications(&self) {
        self.pending_notifies.store(0, Ordering::SeqCst);
    }

    // ========================================================================
    // SEARCH GATE
    // ========================================================================

    pub fn allow(&self) {
        self.search_allowed.store(true, Ordering::SeqCst);
    }

    pub fn disallow(&self) {
        self.search_allowed.store(false, Ordering::SeqCst);
    }

    pub fn is_allowed(&self) -> bool {
        self.search_allowed.load(Ordering::SeqCst)
    }

    // ========================================================================
    // LOOTED MEMORY
    // ========================================================================

    pub fn mark_container_looted(&self, refr: &ObjectRef) {
        if refr.dynamic {
            self.looted_dynamic.lock().insert((refr.id, refr.base));
        } else {
            self.looted_containers.lock().insert(refr.id);
        }
        tracing::debug!(refr = %refr.id, dynamic = refr.dynamic, "looted");
    }

    pub fn is_looted_container(&self, refr: &ObjectRef) -> bool {
        self.looted_containers.lock().contains(&refr.id)
    }

    pub fn is_looted_dynamic(&self, refr: &ObjectRef) -> bool {
        self.looted_dynamic.lock().contains(&(refr.id, refr.base))
    }

    /// Location change.
    pub fn reset_looted_dynamic_refs(&self) {
        self.looted_dynamic.lock().clear();
    }

    /// Reload or settings refresh.
    pub fn reset_looted_containers(&self) {
        self.looted_containers.lock().clear();
    }

    /// A container once seen locked stays locked until reload, even after the player opens it.
    pub fn is_reference_locked_container(&self, refr: &ObjectRef) -> bool {
        let mut locked = self.locked_containers.lock();
        if refr.locked {
            locked.insert(refr.id);
        }
        locked.contains(&refr.id)
    }

    pub fn forget_locked_containers(&self) {
        self.locked_containers.lock().clear();
    }

    // ========================================================================
    // GLOW
    // ========================================================================

    /// Emits a glow unless one is still running on the reference.
    pub fn glow_object(&self, refr: RefId, seconds: u32, reason: GlowReason) {
        let now = Instant::now();
        let until = now + Duration::from_secs(u64::from(seconds));
        let mut started = false;
        self.glow_expiration
            .entry(refr)
            .and_modify(|expiry| {
                if *expiry <= now {
                    *expiry = until;
                    started = true;
                }
            })
            .or_insert_with(|| {
                started = true;
                until
            });
        if started {
            self.events.trigger_glow(refr, seconds, reason);
        }
    }

    pub fn clear_glow_expiration(&self) {
        self.glow_expiration.clear();
    }

    // ========================================================================
    // TARGET SELECTION
    // ========================================================================

    /// Cheap checks that rule a reference out before the decision pipeline runs.
    pub fn validate_target(&self, refr: &ObjectRef, blocks: &LootBlocks, settings: &LootingSettings) -> Lootability {
        match refr.scope {
            Scope::ItemObjects if !settings.harvest_loose_items => return Lootability::HarvestLooseItemDisabled,
            Scope::Containers if !settings.loot_containers => return Lootability::LootContainersDisabled,
            Scope::DeadBodies if settings.dead_body_looting == DeadBodyLooting::DoNotLoot => {
                return Lootability::LootDeadBodyDisabled;
            }
            _ => {}
        }
        if blocks.is_reference_blacklisted(refr.id) || blocks.is_reference_blocked(refr.id) {
            return Lootability::ReferenceBlacklisted;
        }
        if blocks.is_form_blocked(refr.base) {
            return Lootability::BaseObjectBlocked;
        }
        if refr.dynamic && self.is_looted_dynamic(refr) {
            return Lootability::DynamicReferenceLootedAlready;
        }
        if refr.is_container_like() && self.is_looted_container(refr) {
            return Lootability::ContainerLootedAlready;
        }
        Lootability::Lootable
    }

    /// Candidates for one pass: valid targets only, capped per pass.
    pub fn select_targets(&self, refs: Vec<ObjectRef>, blocks: &LootBlocks, settings: &LootingSettings) -> Vec<ObjectRef> {
        let mut seen = HashSet::new();
        refs.into_iter()
            .filter(|r| seen.insert(r.id))
            .filter(|r| {
                let v = self.validate_target(r, blocks, settings);
                if v != Lootability::Lootable {
                    tracing::trace!(refr = %r.id, verdict = %v, "skip target");
                }
                v == Lootability::Lootable
            })
            .take(MAX_REFS_PER_PASS)
            .collect()
    }

    /// Reload: forget everything.
    pub fn clear(&self) {
        self.harvest_lock.clear();
        self.theft_pending.clear();
        self.clear_pending_harvest_notifications();
        self.clear_glow_expiration();
        self.reset_looted_dynamic_refs();
        self.reset_looted_containers();
        self.forget_locked_containers();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::looting::events::RecordingEventSink;

    fn governor() -> (ScanGovernor, Arc<RecordingEventSink>) {
        let sink = Arc::new(RecordingEventSink::new());
        (ScanGovernor::new(sink.clone()), sink)
    }

    #[test]
    fn t_harvest_lock_is_exclusive() {
        let (g, _) = governor();
        assert!(g.lock_harvest(RefId(1), false));
        assert!(!g.lock_harvest(RefId(1), false));
        assert_eq!(g.pending_harvest_notifications(), 1);
        assert!(g.unlock_harvest(RefId(1), false));
        assert!(!g.unlock_harvest(RefId(1), false));
        assert_eq!(g.pending_harvest_notifications(), 0);
        assert!(g.lock_harvest(RefId(1), true));
        assert_eq!(g.pending_harvest_notifications(), 0);
    }

    #[test]
    fn t_dynamic_looted_keyed_by_base() {
        let (g, _) = governor();
        let mut r = ObjectRef::new(RefId(0xff000001), FormId(10), Scope::DeadBodies);
        r.dynamic = true;
        g.mark_container_looted(&r);
        assert!(g.is_looted_dynamic(&r));
        let reused = ObjectRef { base: FormId(11), ..r.clone() };
        assert!(!g.is_looted_dynamic(&reused));
        g.reset_looted_dynamic_refs();
        assert!(!g.is_looted_dynamic(&r));
    }

    #[test]
    fn t_locked_memory_survives_unlock() {
        let (g, _) = governor();
        let mut r = ObjectRef::new(RefId(2), FormId(20), Scope::Containers);
        r.locked = true;
        assert!(g.is_reference_locked_container(&r));
        r.locked = false;
        assert!(g.is_reference_locked_container(&r));
        g.forget_locked_containers();
        assert!(!g.is_reference_locked_container(&r));
    }

    #[test]
    fn t_glow_deduplicated_until_expiry() {
        let (g, sink) = governor();
        g.glow_object(RefId(3), 10, GlowReason::Valuable);
        g.glow_object(RefId(3), 10, GlowReason::QuestObject);
        assert_eq!(sink.glows(), vec![(RefId(3), GlowReason::Valuable)]);
        g.clear_glow_expiration();
        g.glow_object(RefId(3), 10, GlowReason::QuestObject);
        assert_eq!(sink.glows().len(), 2);
    }

    #[test]
    fn t_glow_emitted_once_under_contention() {
        let (g, sink) = governor();
        let barrier = std::sync::Barrier::new(4);
        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    barrier.wait();
                    g.glow_object(RefId(4), 10, GlowReason::LockedContainer);
                });
            }
        });
        assert_eq!(sink.glows().len(), 1);
    }

    #[test]
    fn t_theft_lock_handed_over() {
        let (g, _) = governor();
        assert!(g.lock_harvest(RefId(5), true));
        g.hold_for_theft_check(RefId(5));
        assert!(!g.lock_harvest(RefId(5), true));
        assert!(g.lock_after_theft(RefId(5), false));
        assert_eq!(g.pending_harvest_notifications(), 1);
        assert!(!g.release_theft_lock(RefId(5)));
        assert!(g.is_locked_for_harvest(RefId(5)));

        assert!(g.lock_harvest(RefId(6), true));
        g.hold_for_theft_check(RefId(6));
        g.release_theft_locks();
        assert!(!g.is_locked_for_harvest(RefId(6)));
    }

    #[test]
    fn t_validate_and_cap() {
        let (g, _) = governor();
        let blocks = LootBlocks::new();
        let settings = LootingSettings::default();
        blocks.blacklist_reference(RefId(1));
        let refs: Vec<ObjectRef> = (0..200).map(|i| ObjectRef::new(RefId(i), FormId(500), Scope::ItemObjects)).collect();
        let picked = g.select_targets(refs, &blocks, &settings);
        assert_eq!(picked.len(), MAX_REFS_PER_PASS);
        assert!(picked.iter().all(|r| r.id != RefId(1)));

        let c = ObjectRef::new(RefId(900), FormId(600), Scope::Containers);
        g.mark_container_looted(&c);
        assert_eq!(g.validate_target(&c, &blocks, &settings), Lootability::ContainerLootedAlready);
        blocks.block_form(FormId(500), Lootability::ValueWeightPreventsLooting);
        let item = ObjectRef::new(RefId(901), FormId(500), Scope::ItemObjects);
        assert_eq!(g.validate_target(&item, &blocks, &settings), Lootability::BaseObjectBlocked);
    }

    #[test]
    fn t_disabled_scopes() {
        let (g, _) = governor();
        let blocks = LootBlocks::new();
        let settings = LootingSettings { loot_containers: false, dead_body_looting: DeadBodyLooting::DoNotLoot, ..Default::default() };
        let c = ObjectRef::new(RefId(1), FormId(1), Scope::Containers);
        let d = ObjectRef::new(RefId(2), FormId(2), Scope::DeadBodies);
        assert_eq!(g.validate_target(&c, &blocks, &settings), Lootability::LootContainersDisabled);
        assert_eq!(g.validate_target(&d, &blocks, &settings), Lootability::LootDeadBodyDisabled);
    }
}
