use crate::collections::collection::{Collection, CollectionEntry, CollectionPolicy};
use crate::collections::condition::ConditionMatcher;
use crate::collections::definition::{build_tree, discover_files, group_from_file_name, parse_group, GroupDefinition};
use crate::error::{AppResult, DefinitionError, DomainError, LoadError};
use crate::hardening::INVENTORY_RECONCILE_INTERVAL;
use crate::looting::events::EventSink;
use crate::models::lootability::CollectibleHandling;
use crate::models::types::{FormId, Scope, COLLECTIBLE_SIGNATURES};
use crate::util::render_template;
use crate::world::{FormCatalog, LocationState, PlayerInventory};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

const DEFAULT_ADDED_TEMPLATE: &str = "{ITEMNAME} added to {COLLECTION}";

#[derive(Debug)]
struct GroupInfo {
    file: String,
    policy: CollectionPolicy,
    use_mcm: bool,
    labels: Vec<String>,            // file order
}

#[derive(Debug, Default)]
struct ManagerState {
    collections: BTreeMap<String, Collection>,
    groups: BTreeMap<String, GroupInfo>,
    by_form: HashMap<FormId, Vec<String>>,
    non_collectible: HashSet<FormId>,
    queue: Vec<FormId>,
    last_inventory: HashSet<FormId>,
    last_check: Option<Instant>,
    game_time: f32,
    added_template: String,
}

/// Owns every collection and answers collectibility queries for the decision pipeline.
///
/// All mutable state sits behind one coarse lock. Lock order: the manager lock is taken
/// first and released before any governor lock or event sink call. World ports may be read
/// while it is held, they never call back in.
pub struct CollectionManager {
    ready: AtomicBool,
    enabled: AtomicBool,
    state: Mutex<ManagerState>,
    catalog: Arc<dyn FormCatalog>,
    inventory: Arc<dyn PlayerInventory>,
    location: Arc<dyn LocationState>,
    events: Arc<dyn EventSink>,
}

pub fn make_label(group: &str, name: &str) -> String {
    format!("{group}/{name}")
}

/// Items in `current` that were not in `previous`, first occurrence order, no repeats.
pub fn inventory_delta(previous: &HashSet<FormId>, current: &[FormId]) -> Vec<FormId> {
    let mut seen = HashSet::new();
    current
        .iter()
        .copied()
        .filter(|id| !previous.contains(id) && seen.insert(*id))
        .collect()
}

impl CollectionManager {
    pub fn new(
        catalog: Arc<dyn FormCatalog>,
        inventory: Arc<dyn PlayerInventory>,
        location: Arc<dyn LocationState>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            ready: AtomicBool::new(false),
            enabled: AtomicBool::new(false),
            state: Mutex::new(ManagerState {
                added_template: DEFAULT_ADDED_TEMPLATE.to_string(),
                ..Default::default()
            }),
            catalog,
            inventory,
            location,
            events,
        }
    }

    /// Definitions loaded and collections switched on.
    pub fn is_active(&self) -> bool {
        self.ready.load(Ordering::SeqCst) && self.enabled.load(Ordering::SeqCst)
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn set_added_template(&self, template: &str) {
        self.state.lock().added_template = template.to_string();
    }

    // ========================================================================
    // LOADING
    // ========================================================================

    /// One-time load from a directory of `*.Collections.<group>.json` files. A structural
    /// failure leaves the manager empty and inactive.
    pub fn process_definitions(&self, dir: &Path) -> Result<usize, LoadError> {
        if self.is_ready() {
            return Ok(self.state.lock().collections.len());
        }
        let files = discover_files(dir).map_err(LoadError::Directory);
        let files = match files {
            Ok(f) => f,
            Err(e) => {
                tracing::error!(error = %e, dir = %dir.display(), "collection definitions not loadable");
                return Err(e);
            }
        };
        let mut sources = Vec::with_capacity(files.len());
        for file in files {
            match std::fs::read_to_string(&file.path) {
                Ok(contents) => sources.push((file.name, contents)),
                Err(e) => tracing::warn!(file = %file.name, error = %e, "skip unreadable definition file"),
            }
        }
        self.process_sources(sources)
    }

    /// Loads definitions already read into memory, as `(file name, contents)`.
    pub fn process_sources<I>(&self, sources: I) -> Result<usize, LoadError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        if self.is_ready() {
            return Ok(self.state.lock().collections.len());
        }
        if self.catalog.load_order().is_empty() {
            tracing::error!("collections disabled, load order is empty");
            return Err(LoadError::EmptyLoadOrder);
        }

        let mut state = self.state.lock();
        for (file, contents) in sources {
            let Some(group) = group_from_file_name(&file) else {
                tracing::debug!(file = %file, "skip, does not match collection file pattern");
                continue;
            };
            match parse_group(&file, &contents) {
                Ok(def) => {
                    let added = self.build_group(&mut state, &group, &file, def);
                    tracing::info!(file = %file, group = %group, collections = added, "collection definitions loaded");
                }
                Err(e) => tracing::warn!(error = %e, "collection definitions rejected"),
            }
        }

        self.print_definitions_locked(&state);
        self.resolve_membership(&mut state);
        let count = state.collections.len();
        drop(state);

        self.ready.store(true, Ordering::SeqCst);
        Ok(count)
    }

    /// Parses and adds one group outside the directory walk. Used by tools that feed single
    /// files. Membership is not resolved until `resolve_all`.
    pub fn load_group_from_str(&self, file: &str, contents: &str) -> Result<usize, DefinitionError> {
        let group = group_from_file_name(file).ok_or_else(|| DefinitionError::BadFileName { file: file.to_string() })?;
        let def = parse_group(file, contents)?;
        let mut state = self.state.lock();
        Ok(self.build_group(&mut state, &group, file, def))
    }

    pub fn resolve_all(&self) {
        let mut state = self.state.lock();
        self.resolve_membership(&mut state);
        drop(state);
        self.ready.store(true, Ordering::SeqCst);
    }

    fn build_group(&self, state: &mut ManagerState, group: &str, file: &str, def: GroupDefinition) -> usize {
        if state.groups.contains_key(group) {
            tracing::warn!(group = %group, file = %file, "duplicate group, first definition wins");
            return 0;
        }
        let mut info = GroupInfo {
            file: file.to_string(),
            policy: def.group_policy,
            use_mcm: def.use_mcm,
            labels: Vec::new(),
        };
        for c in def.collections {
            let label = make_label(group, &c.name);
            if state.collections.contains_key(&label) {
                tracing::warn!(label = %label, "duplicate collection, first definition wins");
                continue;
            }
            let tree = build_tree(&c.root_filter, 0, self.catalog.as_ref());
            let policy = c.policy.unwrap_or(def.group_policy);
            let collection = Collection::new(&c.name, &c.description, policy, c.policy.is_some(), tree);
            state.collections.insert(label.clone(), collection);
            info.labels.push(label);
        }
        let added = info.labels.len();
        state.groups.insert(group.to_string(), info);
        added
    }

    /// Evaluates every collection against every collectible-category form. Runs once, after
    /// the catalog and placed objects are known.
    fn resolve_membership(&self, state: &mut ManagerState) {
        let ManagerState { collections, by_form, .. } = state;
        by_form.clear();
        let mut unique = HashSet::new();
        let mut placed = 0usize;
        for sig in COLLECTIBLE_SIGNATURES.iter().copied() {
            for id in self.catalog.forms_with_signature(sig) {
                let Some(form) = self.catalog.form(id) else { continue };
                for (label, collection) in collections.iter_mut() {
                    let mut matcher = ConditionMatcher::new(&form);
                    if collection.matches_filter(&mut matcher) {
                        tracing::trace!(form = %id, collection = %label, "member");
                        by_form.entry(id).or_default().push(label.clone());
                        if unique.insert(id) && self.catalog.is_placed_object(id) {
                            placed += 1;
                        }
                    }
                }
            }
        }
        tracing::info!(members = unique.len(), placed, collections = collections.len(), "collection membership resolved");
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    /// `None` when the form is not collectible for this scope. Otherwise the most
    /// restrictive action across claiming collections. A blacklist claim wins outright.
    pub fn treat_as_collectible(&self, form: FormId, scope: Option<Scope>) -> Option<CollectibleHandling> {
        if !self.is_active() {
            return None;
        }
        let mut state = self.state.lock();
        if state.non_collectible.contains(&form) {
            return None;
        }
        let Some(labels) = state.by_form.get(&form) else {
            tracing::trace!(%form, "record as non-collectible");
            state.non_collectible.insert(form);
            return None;
        };

        let mut action: Option<CollectibleHandling> = None;
        for label in labels {
            let Some(collection) = state.collections.get(label) else { continue };
            if !collection.in_scope_and_collectible_for(form, scope) {
                continue;
            }
            let a = collection.policy().action;
            if a == CollectibleHandling::DoNotLoot {
                return Some(a);
            }
            action = Some(action.map_or(a, |cur| cur.most_restrictive(a)));
        }
        action
    }

    pub fn is_member(&self, form: FormId) -> bool {
        self.state.lock().by_form.contains_key(&form)
    }

    /// Records a sighting in every claiming, non-blacklist collection. Notifies once per
    /// collection on the first record.
    pub fn record_item(&self, form: FormId, game_time: f32, place: Option<FormId>) {
        if !self.is_active() {
            return;
        }
        let notes = {
            let mut state = self.state.lock();
            self.add_to_relevant_collections(&mut state, form, game_time, place)
        };
        self.notify(notes);
    }

    fn add_to_relevant_collections(
        &self,
        state: &mut ManagerState,
        id: FormId,
        game_time: f32,
        place: Option<FormId>,
    ) -> Vec<String> {
        let Some(form) = self.catalog.form(id) else {
            return Vec::new();
        };
        let ManagerState { collections, by_form, added_template, .. } = state;
        let Some(labels) = by_form.get(&id) else {
            return Vec::new();
        };
        let mut notes = Vec::new();
        for label in labels {
            let Some(collection) = collections.get_mut(label) else { continue };
            // blacklist collections never record sightings
            if collection.policy().action == CollectibleHandling::DoNotLoot || !collection.is_member_of(id) {
                continue;
            }
            if collection.record_item(CollectionEntry::new(id, game_time, place)) && collection.policy().notify {
                let name = form.display_name();
                notes.push(render_template(added_template, &[("ITEMNAME", name.as_str()), ("COLLECTION", collection.name())]));
            }
        }
        notes
    }

    fn notify(&self, notes: Vec<String>) {
        for n in notes {
            self.events.show_notification(&n);
        }
    }

    // ========================================================================
    // ADDED ITEM QUEUE
    // ========================================================================

    /// Producer side. Only forms claimed by at least one collection are queued.
    pub fn check_enqueue_added_item(&self, form: FormId) {
        if !self.is_active() {
            return;
        }
        let mut state = self.state.lock();
        if state.by_form.contains_key(&form) {
            state.queue.push(form);
        }
    }

    /// Consumer side, once per pass. Reconciles the inventory when due, swaps the queue out
    /// and records each item with the lock taken per item only.
    pub fn process_added_items(&self) {
        if !self.is_active() {
            return;
        }
        let place = self.location.player_place();
        let queued = {
            let mut state = self.state.lock();
            let due = state.last_check.is_none_or(|t| t.elapsed() >= INVENTORY_RECONCILE_INTERVAL);
            if due {
                tracing::debug!("inventory reconciliation");
                state.last_check = Some(Instant::now());
                let adds = self.reconcile_locked(&mut state);
                state.queue.extend(adds);
            }
            std::mem::take(&mut state.queue)
        };

        for id in queued {
            let notes = {
                let mut state = self.state.lock();
                if state.by_form.contains_key(&id) {
                    let game_time = state.game_time;
                    self.add_to_relevant_collections(&mut state, id, game_time, place)
                } else {
                    if state.non_collectible.insert(id) {
                        tracing::trace!(form = %id, "record as non-collectible");
                    }
                    Vec::new()
                }
            };
            self.notify(notes);
        }
    }

    /// Diffs the inventory against the last snapshot and queues new collection members.
    pub fn reconcile_inventory(&self) -> Vec<FormId> {
        let mut state = self.state.lock();
        let adds = self.reconcile_locked(&mut state);
        state.queue.extend(adds.iter().copied());
        adds
    }

    fn reconcile_locked(&self, state: &mut ManagerState) -> Vec<FormId> {
        let current = self.inventory.inventory_forms();
        let adds: Vec<FormId> = inventory_delta(&state.last_inventory, &current)
            .into_iter()
            .filter(|id| state.by_form.contains_key(id))
            .collect();
        state.last_inventory = current.into_iter().collect();
        adds
    }

    pub fn pending_items(&self) -> usize {
        self.state.lock().queue.len()
    }

    /// Requests added items and game time to be pushed while the worker sleeps.
    pub fn refresh(&self) {
        if self.is_active() {
            self.events.trigger_flush_added_items();
        }
    }

    pub fn update_game_time(&self, game_time: f32) {
        self.state.lock().game_time = game_time;
    }

    /// Resets transient state. Static membership survives.
    pub fn on_game_reload(&self, enabled: bool) {
        let mut state = self.state.lock();
        state.last_inventory.clear();
        state.last_check = None;
        self.enabled.store(enabled, Ordering::SeqCst);
        tracing::info!(enabled, "collections reloaded");
        if enabled {
            for c in state.collections.values_mut() {
                c.reset();
            }
        }
    }

    // ========================================================================
    // POLICY
    // ========================================================================

    fn with_collection<T>(&self, group: &str, name: &str, f: impl FnOnce(&mut Collection) -> T) -> AppResult<T> {
        let label = make_label(group, name);
        let mut state = self.state.lock();
        state
            .collections
            .get_mut(&label)
            .map(f)
            .ok_or(DomainError::UnknownCollection(label))
    }

    pub fn policy_action(&self, group: &str, name: &str) -> AppResult<CollectibleHandling> {
        self.with_collection(group, name, |c| c.policy().action)
    }

    pub fn policy_notify(&self, group: &str, name: &str) -> AppResult<bool> {
        self.with_collection(group, name, |c| c.policy().notify)
    }

    pub fn policy_repeat(&self, group: &str, name: &str) -> AppResult<bool> {
        self.with_collection(group, name, |c| c.policy().repeat)
    }

    pub fn policy_set_action(&self, group: &str, name: &str, action: CollectibleHandling) -> AppResult<()> {
        self.with_collection(group, name, |c| c.policy_mut().action = action)
    }

    pub fn policy_set_notify(&self, group: &str, name: &str, notify: bool) -> AppResult<()> {
        self.with_collection(group, name, |c| c.policy_mut().notify = notify)
    }

    pub fn policy_set_repeat(&self, group: &str, name: &str, repeat: bool) -> AppResult<()> {
        self.with_collection(group, name, |c| c.policy_mut().repeat = repeat)
    }

    fn with_group<T>(&self, group: &str, f: impl FnOnce(&mut ManagerState, &str) -> T) -> AppResult<T> {
        let mut state = self.state.lock();
        if !state.groups.contains_key(group) {
            return Err(DomainError::UnknownGroup(group.to_string()));
        }
        Ok(f(&mut state, group))
    }

    pub fn group_policy(&self, group: &str) -> AppResult<CollectionPolicy> {
        self.with_group(group, |s, g| s.groups[g].policy)
    }

    pub fn group_uses_mcm(&self, group: &str) -> AppResult<bool> {
        self.with_group(group, |s, g| s.groups[g].use_mcm)
    }

    pub fn group_policy_set_action(&self, group: &str, action: CollectibleHandling) -> AppResult<()> {
        self.update_group_policy(group, |p| p.action = action)
    }

    pub fn group_policy_set_notify(&self, group: &str, notify: bool) -> AppResult<()> {
        self.update_group_policy(group, |p| p.notify = notify)
    }

    pub fn group_policy_set_repeat(&self, group: &str, repeat: bool) -> AppResult<()> {
        self.update_group_policy(group, |p| p.repeat = repeat)
    }

    /// Applies to the group and to every collection in it without its own policy.
    fn update_group_policy(&self, group: &str, update: impl Fn(&mut CollectionPolicy)) -> AppResult<()> {
        self.with_group(group, |state, g| {
            let ManagerState { groups, collections, .. } = state;
            let Some(info) = groups.get_mut(g) else { return };
            update(&mut info.policy);
            for label in &info.labels {
                if let Some(c) = collections.get_mut(label)
                    && !c.overrides_group()
                {
                    update(c.policy_mut());
                }
            }
        })
    }

    // ========================================================================
    // DIAGNOSTICS
    // ========================================================================

    pub fn total_items(&self, group: &str, name: &str) -> AppResult<usize> {
        self.with_collection(group, name, |c| c.member_count())
    }

    pub fn items_obtained(&self, group: &str, name: &str) -> AppResult<usize> {
        self.with_collection(group, name, |c| c.observed_count())
    }

    pub fn number_of_files(&self) -> usize {
        self.state.lock().groups.len()
    }

    pub fn group_name_by_index(&self, index: usize) -> Option<String> {
        self.state.lock().groups.keys().nth(index).cloned()
    }

    pub fn group_file_by_index(&self, index: usize) -> Option<String> {
        self.state.lock().groups.values().nth(index).map(|g| g.file.clone())
    }

    pub fn number_of_collections(&self, group: &str) -> usize {
        self.state.lock().groups.get(group).map_or(0, |g| g.labels.len())
    }

    pub fn name_by_group_index(&self, group: &str, index: usize) -> Option<String> {
        let state = self.state.lock();
        let label = state.groups.get(group)?.labels.get(index)?;
        state.collections.get(label).map(|c| c.name().to_string())
    }

    pub fn labels(&self) -> Vec<String> {
        self.state.lock().collections.keys().cloned().collect()
    }

    pub fn definition_json(&self, label: &str) -> Option<serde_json::Value> {
        self.state.lock().collections.get(label).map(|c| c.to_json())
    }

    pub fn members_report(&self, label: &str) -> Option<String> {
        let state = self.state.lock();
        state.collections.get(label).map(|c| c.print_members(self.catalog.as_ref()))
    }

    pub fn print_definitions(&self) {
        let state = self.state.lock();
        self.print_definitions_locked(&state);
    }

    fn print_definitions_locked(&self, state: &ManagerState) {
        for (label, c) in &state.collections {
            tracing::info!("Collection {label}:\n{}", c.print_definition());
        }
    }

    pub fn print_memberships(&self) {
        let state = self.state.lock();
        for (label, c) in &state.collections {
            tracing::info!(
                observed = c.observed_count(),
                "Collection {label}:\n{}",
                c.print_members(self.catalog.as_ref())
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::looting::events::RecordingEventSink;
    use crate::models::form::Form;
    use crate::models::object_type::ObjectType;
    use crate::models::types::Signature;
    use crate::world::{LoadOrder, MemoryWorld};

    const FILE: &str = "SHSE.Collections.Food.json";

    fn group(collections: &str) -> String {
        format!(
            r#"{{"groupPolicy": {{"action": "glow", "notify": true, "repeat": false}}, "collections": [{collections}]}}"#
        )
    }

    fn world() -> Arc<MemoryWorld> {
        let mut lo = LoadOrder::new();
        lo.add_plugin("Skyrim.esm", false);
        let mut w = MemoryWorld::new(lo);
        w.add_keyword("IsFood", FormId(0x900));
        for (id, kw) in [(1u32, true), (2, false), (3, true), (4, true)] {
            let mut f = Form::new(FormId(id), Signature::Ingredient, ObjectType::Ingredient);
            f.name = format!("Ingredient {id}");
            if kw {
                f.keywords.push(FormId(0x900));
            }
            w.add_form(f);
        }
        Arc::new(w)
    }

    fn manager(w: &Arc<MemoryWorld>) -> (CollectionManager, Arc<RecordingEventSink>) {
        let sink = Arc::new(RecordingEventSink::new());
        let m = CollectionManager::new(w.clone(), w.clone(), w.clone(), sink.clone());
        (m, sink)
    }

    const FOOD: &str = r#"{"name": "Food", "rootFilter": {"operator": "and",
        "condition": {"signature": ["INGR"], "keyword": ["IsFood"]}}}"#;

    #[test]
    fn t_end_to_end_membership() {
        let w = world();
        let (m, _) = manager(&w);
        let n = m.process_sources([(FILE.to_string(), group(FOOD))]).unwrap();
        assert_eq!(n, 1);
        m.set_enabled(true);
        assert_eq!(m.total_items("Food", "Food").unwrap(), 3);
        assert_eq!(m.treat_as_collectible(FormId(1), None), Some(CollectibleHandling::Glow));
        assert_eq!(m.treat_as_collectible(FormId(2), None), None);
        // negative cache hit gives the same answer
        assert_eq!(m.treat_as_collectible(FormId(2), None), None);
        assert_eq!(m.treat_as_collectible(FormId(1), None), Some(CollectibleHandling::Glow));
    }

    #[test]
    fn t_inactive_until_enabled() {
        let w = world();
        let (m, _) = manager(&w);
        m.process_sources([(FILE.to_string(), group(FOOD))]).unwrap();
        assert!(!m.is_active());
        assert_eq!(m.treat_as_collectible(FormId(1), None), None);
        m.on_game_reload(true);
        assert!(m.is_active());
    }

    #[test]
    fn t_blacklist_claim_wins() {
        let w = world();
        let (m, _) = manager(&w);
        let leave = r#"{"name": "Never", "policy": {"action": "leave", "notify": false, "repeat": true},
            "rootFilter": {"operator": "and", "condition": {"signature": ["INGR"]}}}"#;
        m.process_sources([(FILE.to_string(), group(&format!("{FOOD},{leave}")))]).unwrap();
        m.set_enabled(true);
        assert_eq!(m.treat_as_collectible(FormId(1), None), Some(CollectibleHandling::DoNotLoot));
    }

    #[test]
    fn t_record_item_notifies_once_and_hides_repeat() {
        let w = world();
        let (m, sink) = manager(&w);
        m.process_sources([(FILE.to_string(), group(FOOD))]).unwrap();
        m.set_enabled(true);
        m.record_item(FormId(1), 2.5, Some(FormId(0x77)));
        m.record_item(FormId(1), 3.0, None);
        assert_eq!(sink.notifications(), vec!["Ingredient 1 added to Food".to_string()]);
        assert_eq!(m.items_obtained("Food", "Food").unwrap(), 1);
        // repeat=false: no longer collectible
        assert_eq!(m.treat_as_collectible(FormId(1), None), None);
        m.on_game_reload(true);
        assert_eq!(m.treat_as_collectible(FormId(1), None), Some(CollectibleHandling::Glow));
    }

    #[test]
    fn t_blacklist_collection_never_records() {
        let w = world();
        let (m, sink) = manager(&w);
        let leave = r#"{"name": "Never", "policy": {"action": "leave", "notify": true, "repeat": false},
            "rootFilter": {"operator": "and", "condition": {"signature": ["INGR"]}}}"#;
        m.process_sources([(FILE.to_string(), group(leave))]).unwrap();
        m.set_enabled(true);
        m.record_item(FormId(2), 1.0, None);
        assert_eq!(m.items_obtained("Food", "Never").unwrap(), 0);
        assert!(sink.notifications().is_empty());
        assert_eq!(m.treat_as_collectible(FormId(2), None), Some(CollectibleHandling::DoNotLoot));
    }

    #[test]
    fn t_queue_and_reconciliation() {
        let w = world();
        let (m, _) = manager(&w);
        m.process_sources([(FILE.to_string(), group(FOOD))]).unwrap();
        m.set_enabled(true);
        w.set_inventory(vec![FormId(1)]);
        // first pass reconciles: 1 is new
        m.process_added_items();
        assert_eq!(m.items_obtained("Food", "Food").unwrap(), 1);

        m.check_enqueue_added_item(FormId(2)); // not a member, dropped
        m.check_enqueue_added_item(FormId(3));
        assert_eq!(m.pending_items(), 1);
        m.process_added_items();
        assert_eq!(m.pending_items(), 0);
        assert_eq!(m.items_obtained("Food", "Food").unwrap(), 2);

        w.set_inventory(vec![FormId(1), FormId(4), FormId(2)]);
        assert_eq!(m.reconcile_inventory(), vec![FormId(4)]);
    }

    #[test]
    fn t_inventory_delta() {
        let prev: HashSet<FormId> = [1, 2, 3].into_iter().map(FormId).collect();
        let cur: Vec<FormId> = [2, 3, 4].into_iter().map(FormId).collect();
        assert_eq!(inventory_delta(&prev, &cur), vec![FormId(4)]);
    }

    #[test]
    fn t_policy_accessors_and_group_policy() {
        let w = world();
        let (m, _) = manager(&w);
        let own = r#"{"name": "Own", "policy": {"action": "take", "notify": false, "repeat": true},
            "rootFilter": {"operator": "and", "condition": {"signature": ["INGR"]}}}"#;
        m.process_sources([(FILE.to_string(), group(&format!("{FOOD},{own}")))]).unwrap();
        assert_eq!(m.number_of_files(), 1);
        assert_eq!(m.group_name_by_index(0).as_deref(), Some("Food"));
        assert_eq!(m.group_file_by_index(0).as_deref(), Some(FILE));
        assert_eq!(m.number_of_collections("Food"), 2);
        assert_eq!(m.name_by_group_index("Food", 1).as_deref(), Some("Own"));

        m.group_policy_set_action("Food", CollectibleHandling::Print).unwrap();
        assert_eq!(m.policy_action("Food", "Food").unwrap(), CollectibleHandling::Print);
        assert_eq!(m.policy_action("Food", "Own").unwrap(), CollectibleHandling::Loot);
        m.policy_set_repeat("Food", "Food", true).unwrap();
        assert!(m.policy_repeat("Food", "Food").unwrap());
        assert!(matches!(m.policy_notify("Food", "Nope"), Err(DomainError::UnknownCollection(_))));
        assert!(matches!(m.group_policy("Nope"), Err(DomainError::UnknownGroup(_))));
        assert!(!m.group_uses_mcm("Food").unwrap());
    }

    #[test]
    fn t_bad_file_skipped_duplicate_discarded() {
        let w = world();
        let (m, _) = manager(&w);
        let n = m
            .process_sources([
                (FILE.to_string(), group(&format!("{FOOD},{FOOD}"))),
                ("SHSE.Collections.Broken.json".to_string(), "{not json".to_string()),
                ("readme.json".to_string(), "{}".to_string()),
            ])
            .unwrap();
        assert_eq!(n, 1);
        assert_eq!(m.number_of_files(), 1);
    }

    #[test]
    fn t_empty_load_order_is_fatal() {
        let w = Arc::new(MemoryWorld::new(LoadOrder::new()));
        let (m, _) = manager(&w);
        assert!(matches!(m.process_sources([(FILE.to_string(), group(FOOD))]), Err(LoadError::EmptyLoadOrder)));
        m.set_enabled(true);
        assert!(!m.is_active());
    }
}
