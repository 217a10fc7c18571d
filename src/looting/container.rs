use crate::collections::CollectionManager;
use crate::looting::blocks::LootBlocks;
use crate::looting::settings::LootingSettings;
use crate::models::form::Form;
use crate::models::lootability::CollectibleHandling;
use crate::models::object_type::ObjectType;
use crate::models::reference::{ContainerItem, ObjectRef};
use crate::world::{ContainerAccess, FormCatalog};

/// One stack in a container that passed the basic lootability filter.
#[derive(Debug, Clone)]
pub struct LootableItem {
    pub item: ContainerItem,
    pub form: Form,
    pub quest: bool,
    pub enchanted: bool,
    pub valuable: bool,
    pub collectible: Option<CollectibleHandling>,
}

impl LootableItem {
    /// Category used for looting rules. Player-enchanted gear moves to its enchanted category.
    pub fn object_type(&self) -> ObjectType {
        if self.item.player_enchanted {
            self.form.object_type.enchanted()
        } else {
            self.form.object_type
        }
    }
}

/// Analyzes the contents of a container or dead body and tracks which special items are in it.
pub struct ContainerLister<'a> {
    container: &'a ObjectRef,
    catalog: &'a dyn FormCatalog,
    contents: &'a dyn ContainerAccess,
    collections: &'a CollectionManager,
    blocks: &'a LootBlocks,
    settings: &'a LootingSettings,
    items: Vec<LootableItem>,
    collectible_action: Option<CollectibleHandling>,
}

impl<'a> ContainerLister<'a> {
    pub fn new(
        container: &'a ObjectRef,
        catalog: &'a dyn FormCatalog,
        contents: &'a dyn ContainerAccess,
        collections: &'a CollectionManager,
        blocks: &'a LootBlocks,
        settings: &'a LootingSettings,
    ) -> Self {
        Self {
            container,
            catalog,
            contents,
            collections,
            blocks,
            settings,
            items: Vec::new(),
            collectible_action: None,
        }
    }

    /// Re-reads the contents. Returns the number of lootable stacks.
    pub fn analyze_lootable_items(&mut self) -> usize {
        self.items.clear();
        self.collectible_action = None;
        for item in self.contents.contents(self.container.id) {
            if item.count == 0 {
                continue;
            }
            let Some(form) = self.catalog.form(item.form) else { continue };
            if !form.playable || self.blocks.is_form_blocked(form.id) {
                continue;
            }
            let enchanted = item.player_enchanted
                || matches!(
                    form.object_type,
                    ObjectType::EnchantedWeapon | ObjectType::EnchantedArmor | ObjectType::EnchantedJewelry
                );
            let collectible = self.collections.treat_as_collectible(form.id, Some(self.container.scope));
            if let Some(a) = collectible {
                self.collectible_action = Some(self.collectible_action.map_or(a, |cur| cur.most_restrictive(a)));
            }
            self.items.push(LootableItem {
                quest: item.quest_item,
                enchanted,
                valuable: self.settings.is_valuable(&form),
                collectible,
                item,
                form,
            });
        }
        self.items.len()
    }

    pub fn lootable_items(&self) -> &[LootableItem] {
        &self.items
    }

    pub fn has_quest_item(&self) -> bool {
        self.items.iter().any(|i| i.quest)
    }

    pub fn has_enchanted_item(&self) -> bool {
        self.items.iter().any(|i| i.enchanted)
    }

    pub fn has_valuable_item(&self) -> bool {
        self.items.iter().any(|i| i.valuable)
    }

    pub fn has_collectible_item(&self) -> bool {
        self.collectible_action.is_some()
    }

    /// Most restrictive action over the collectible items.
    pub fn collectible_action(&self) -> Option<CollectibleHandling> {
        self.collectible_action
    }

    pub fn exclude_quest_items(&mut self) {
        self.items.retain(|i| !i.quest);
    }

    pub fn exclude_enchanted_items(&mut self) {
        self.items.retain(|i| !i.enchanted);
    }

    pub fn exclude_valuable_items(&mut self) {
        self.items.retain(|i| !i.valuable);
    }

    pub fn exclude_collectible_items(&mut self) {
        self.items.retain(|i| i.collectible.is_none());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::looting::events::RecordingEventSink;
    use crate::models::types::{FormId, RefId, Scope, Signature};
    use crate::world::{LoadOrder, MemoryWorld};
    use std::sync::Arc;

    #[test]
    fn t_analyze_flags_and_excludes() {
        let mut lo = LoadOrder::new();
        lo.add_plugin("Skyrim.esm", false);
        let mut w = MemoryWorld::new(lo);
        let mut gem = Form::new(FormId(1), Signature::Misc, ObjectType::Gem);
        gem.value = 900;
        w.add_form(gem);
        w.add_form(Form::new(FormId(2), Signature::Weapon, ObjectType::Weapon));
        w.add_form(Form::new(FormId(3), Signature::Misc, ObjectType::Clutter));
        let mut hidden = Form::new(FormId(4), Signature::Misc, ObjectType::Clutter);
        hidden.playable = false;
        w.add_form(hidden);
        let w = Arc::new(w);

        let mut sword = ContainerItem::new(FormId(2), 1);
        sword.player_enchanted = true;
        let mut note = ContainerItem::new(FormId(3), 2);
        note.quest_item = true;
        w.set_container(
            RefId(50),
            vec![ContainerItem::new(FormId(1), 1), sword, note, ContainerItem::new(FormId(4), 1), ContainerItem::new(FormId(3), 0)],
            false,
        );

        let sink = Arc::new(RecordingEventSink::new());
        let cm = CollectionManager::new(w.clone(), w.clone(), w.clone(), sink);
        let blocks = LootBlocks::new();
        let settings = LootingSettings::default();
        let chest = ObjectRef::new(RefId(50), FormId(99), Scope::Containers);
        let mut lister = ContainerLister::new(&chest, w.as_ref(), w.as_ref(), &cm, &blocks, &settings);

        assert_eq!(lister.analyze_lootable_items(), 3);
        assert!(lister.has_valuable_item());
        assert!(lister.has_enchanted_item());
        assert!(lister.has_quest_item());
        assert!(!lister.has_collectible_item());
        assert_eq!(lister.lootable_items()[1].object_type(), ObjectType::EnchantedWeapon);

        lister.exclude_valuable_items();
        lister.exclude_quest_items();
        assert_eq!(lister.lootable_items().len(), 1);
        lister.exclude_enchanted_items();
        assert!(lister.lootable_items().is_empty());
    }
}
