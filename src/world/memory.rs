use crate::error::AppResult;
use crate::models::form::Form;
use crate::models::reference::{ContainerItem, ObjectRef};
use crate::models::types::{FormId, RefId, Signature};
use crate::world::load_order::LoadOrder;
use crate::world::{ContainerAccess, FormCatalog, LocationState, PlayerInventory, ReferenceSource};
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormListEntry {
    pub id: FormId,
    pub entries: Vec<FormId>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerContents {
    pub reference: RefId,
    #[serde(default)]
    pub items: Vec<ContainerItem>,
    #[serde(default)]
    pub stuck: bool,            // transfers report success but remove nothing
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationFlags {
    #[serde(default)]
    pub place: Option<FormId>,
    #[serde(default)]
    pub whitelisted: bool,
    #[serde(default)]
    pub restricted_settlement: bool,
    #[serde(default = "default_true")]
    pub friendly_cell: bool,
    #[serde(default = "default_true")]
    pub stable: bool,
}

impl Default for LocationFlags {
    fn default() -> Self {
        Self { place: None, whitelisted: false, restricted_settlement: false, friendly_cell: true, stable: true }
    }
}

fn default_true() -> bool {
    true
}

/// World state as read from a JSON snapshot file.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldSnapshot {
    #[serde(default)]
    pub plugins: LoadOrder,
    #[serde(default)]
    pub forms: Vec<Form>,
    #[serde(default)]
    pub keywords: HashMap<String, FormId>,
    #[serde(default)]
    pub form_lists: Vec<FormListEntry>,
    #[serde(default)]
    pub placed: Vec<FormId>,
    #[serde(default)]
    pub references: Vec<ObjectRef>,
    #[serde(default)]
    pub containers: Vec<ContainerContents>,
    #[serde(default)]
    pub inventory: Vec<FormId>,
    #[serde(default)]
    pub location: LocationFlags,
}

struct MemContainer {
    items: Vec<ContainerItem>,
    stuck: bool,
}

/// In-memory engine stand-in. Backs the binaries and the tests.
pub struct MemoryWorld {
    load_order: LoadOrder,
    forms: HashMap<FormId, Form>,
    keywords: HashMap<String, FormId>,
    form_lists: HashMap<FormId, Vec<FormId>>,
    placed: HashSet<FormId>,
    references: RwLock<Vec<ObjectRef>>,
    containers: DashMap<RefId, MemContainer>,
    inventory: RwLock<Vec<FormId>>,
    location: RwLock<LocationFlags>,
    copies: RwLock<Vec<(FormId, u32)>>,
}

impl MemoryWorld {
    pub fn new(load_order: LoadOrder) -> Self {
        Self {
            load_order,
            forms: HashMap::new(),
            keywords: HashMap::new(),
            form_lists: HashMap::new(),
            placed: HashSet::new(),
            references: RwLock::new(Vec::new()),
            containers: DashMap::new(),
            inventory: RwLock::new(Vec::new()),
            location: RwLock::new(LocationFlags::default()),
            copies: RwLock::new(Vec::new()),
        }
    }

    pub fn from_snapshot(snapshot: WorldSnapshot) -> Self {
        let mut world = Self::new(snapshot.plugins);
        for f in snapshot.forms {
            world.add_form(f);
        }
        for (editor_id, id) in snapshot.keywords {
            world.add_keyword(&editor_id, id);
        }
        for fl in snapshot.form_lists {
            world.add_form_list(fl.id, fl.entries);
        }
        world.placed.extend(snapshot.placed);
        *world.references.write() = snapshot.references;
        for c in snapshot.containers {
            world.containers.insert(c.reference, MemContainer { items: c.items, stuck: c.stuck });
        }
        *world.inventory.write() = snapshot.inventory;
        *world.location.write() = snapshot.location;
        world
    }

    pub fn load<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let data = std::fs::read_to_string(path)?;
        let snapshot: WorldSnapshot = serde_json::from_str(&data)?;
        Ok(Self::from_snapshot(snapshot))
    }

    // ========================================================================
    // SETUP
    // ========================================================================

    pub fn add_form(&mut self, form: Form) {
        self.forms.insert(form.id, form);
    }

    pub fn add_keyword(&mut self, editor_id: &str, id: FormId) {
        self.keywords.insert(editor_id.to_ascii_lowercase(), id);
    }

    pub fn add_form_list(&mut self, id: FormId, entries: Vec<FormId>) {
        self.form_lists.insert(id, entries);
    }

    pub fn mark_placed(&mut self, id: FormId) {
        self.placed.insert(id);
    }

    // ========================================================================
    // RUNTIME STATE
    // ========================================================================

    pub fn add_reference(&self, reference: ObjectRef) {
        self.references.write().push(reference);
    }

    /// Picked up or destroyed.
    pub fn remove_reference(&self, id: RefId) -> Option<ObjectRef> {
        let mut refs = self.references.write();
        let pos = refs.iter().position(|r| r.id == id)?;
        Some(refs.remove(pos))
    }

    pub fn reference(&self, id: RefId) -> Option<ObjectRef> {
        self.references.read().iter().find(|r| r.id == id).cloned()
    }

    pub fn clear_references(&self) {
        self.references.write().clear();
    }

    pub fn set_container(&self, container: RefId, items: Vec<ContainerItem>, stuck: bool) {
        self.containers.insert(container, MemContainer { items, stuck });
    }

    pub fn set_inventory(&self, items: Vec<FormId>) {
        *self.inventory.write() = items;
    }

    pub fn add_to_inventory(&self, item: FormId) {
        self.inventory.write().push(item);
    }

    pub fn set_location(&self, flags: LocationFlags) {
        *self.location.write() = flags;
    }

    pub fn copies(&self) -> Vec<(FormId, u32)> {
        self.copies.read().clone()
    }
}

impl FormCatalog for MemoryWorld {
    fn load_order(&self) -> &LoadOrder {
        &self.load_order
    }

    fn form(&self, id: FormId) -> Option<Form> {
        self.forms.get(&id).cloned()
    }

    fn forms_with_signature(&self, signature: Signature) -> Vec<FormId> {
        let mut ids: Vec<FormId> = self
            .forms
            .values()
            .filter(|f| f.signature == signature)
            .map(|f| f.id)
            .collect();
        ids.sort();
        ids
    }

    fn keyword(&self, editor_id: &str) -> Option<FormId> {
        self.keywords.get(&editor_id.to_ascii_lowercase()).copied()
    }

    fn form_list(&self, id: FormId) -> Option<Vec<FormId>> {
        self.form_lists.get(&id).cloned()
    }

    fn is_placed_object(&self, id: FormId) -> bool {
        self.placed.contains(&id)
    }
}

impl LocationState for MemoryWorld {
    fn player_place(&self) -> Option<FormId> {
        self.location.read().place
    }

    fn in_whitelisted_place(&self) -> bool {
        self.location.read().whitelisted
    }

    fn in_restricted_settlement(&self) -> bool {
        self.location.read().restricted_settlement
    }

    fn in_friendly_cell(&self) -> bool {
        self.location.read().friendly_cell
    }

    fn is_stable(&self) -> bool {
        self.location.read().stable
    }
}

impl PlayerInventory for MemoryWorld {
    fn inventory_forms(&self) -> Vec<FormId> {
        self.inventory.read().clone()
    }
}

impl ContainerAccess for MemoryWorld {
    fn contents(&self, container: RefId) -> Vec<ContainerItem> {
        self.containers.get(&container).map(|c| c.items.clone()).unwrap_or_default()
    }

    fn take_all(&self, container: RefId, item: &ContainerItem, _inline: bool) -> u32 {
        let Some(mut c) = self.containers.get_mut(&container) else {
            return 0;
        };
        if c.stuck {
            return item.count;
        }
        let Some(pos) = c.items.iter().position(|i| i.form == item.form) else {
            return 0;
        };
        let taken = c.items.remove(pos);
        drop(c);
        self.inventory.write().push(taken.form);
        taken.count
    }

    fn make_copies(&self, item: FormId, count: u32) {
        self.copies.write().push((item, count));
        self.inventory.write().push(item);
    }
}

impl ReferenceSource for MemoryWorld {
    fn nearby_references(&self) -> Vec<ObjectRef> {
        self.references.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::object_type::ObjectType;
    use crate::models::types::Scope;

    const SNAPSHOT: &str = r#"{
        "plugins": [{"name": "Skyrim.esm"}],
        "forms": [
            {"id": 100, "signature": "INGR", "name": "Wheat", "objectType": "ingredient"},
            {"id": 101, "signature": "MISC", "name": "Cup"}
        ],
        "keywords": {"VendorItemFood": 900},
        "formLists": [{"id": 500, "entries": [100, 501]}],
        "containers": [{"reference": 7000, "items": [{"form": 101, "count": 2}]}],
        "inventory": [100]
    }"#;

    #[test]
    fn t_snapshot_loads() {
        let snapshot: WorldSnapshot = serde_json::from_str(SNAPSHOT).unwrap();
        let world = MemoryWorld::from_snapshot(snapshot);
        assert_eq!(world.form(FormId(100)).unwrap().object_type, ObjectType::Ingredient);
        assert_eq!(world.keyword("vendoritemfood"), Some(FormId(900)));
        assert_eq!(world.forms_with_signature(Signature::Misc), vec![FormId(101)]);
        assert_eq!(world.form_list(FormId(500)).unwrap().len(), 2);
        assert!(world.in_friendly_cell());
        assert_eq!(world.inventory_forms(), vec![FormId(100)]);
    }

    #[test]
    fn t_take_all_moves_stack() {
        let world = MemoryWorld::from_snapshot(serde_json::from_str(SNAPSHOT).unwrap());
        let item = ContainerItem::new(FormId(101), 2);
        assert_eq!(world.take_all(RefId(7000), &item, true), 2);
        assert!(world.contents(RefId(7000)).is_empty());
        assert!(world.inventory_forms().contains(&FormId(101)));
        assert_eq!(world.take_all(RefId(7000), &item, true), 0);
    }

    #[test]
    fn t_stuck_container_keeps_items() {
        let world = MemoryWorld::new(LoadOrder::new());
        world.set_container(RefId(1), vec![ContainerItem::new(FormId(5), 1)], true);
        assert_eq!(world.take_all(RefId(1), &ContainerItem::new(FormId(5), 1), true), 1);
        assert_eq!(world.contents(RefId(1)).len(), 1);
        world.add_reference(ObjectRef::new(RefId(1), FormId(9), Scope::Containers));
        assert_eq!(world.nearby_references().len(), 1);
    }
}
