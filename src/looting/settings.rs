use crate::error::{AppResult, ConfigErrorKind, DomainError};
use crate::models::form::Form;
use crate::models::lootability::{
    ContainerAnimation, DeadBodyLooting, LootingType, OwnershipRule, SpecialObjectHandling,
};
use crate::models::object_type::ObjectType;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Player-facing looting rules, pushed from the menu layer.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LootingSettings {
    pub harvest_loose_items: bool,
    pub loot_containers: bool,

    pub quest_object_loot: SpecialObjectHandling,
    /// Only items carrying the quest flag count as quest targets
    pub quest_object_full_flags: bool,
    pub valuable_item_loot: SpecialObjectHandling,
    pub valuable_threshold: i32,
    pub locked_chest_loot: SpecialObjectHandling,
    pub boss_chest_loot: SpecialObjectHandling,
    pub enchant_item_glow: bool,

    pub belongings_check: SpecialObjectHandling,
    pub ownership_rule: OwnershipRule,
    pub loot_owned_collectibles: bool,

    pub looting_types: BTreeMap<ObjectType, LootingType>,
    /// Minimum value per unit weight, per object type
    pub value_weight: BTreeMap<ObjectType, f64>,
    pub check_weightless_value: bool,
    pub weightless_min_value: i32,

    pub dead_body_looting: DeadBodyLooting,
    /// Types still harvested inside restricted settlements
    pub population_center_exempt: BTreeSet<ObjectType>,
    /// Keyword editor ids that make an unread book glow
    pub glowable_book_keywords: Vec<String>,
    pub loot_fired_ammo: bool,

    pub container_animation: ContainerAnimation,
    pub manual_loot_notify: bool,

    pub single_loot_template: String,
    pub multi_loot_template: String,
    pub collection_added_template: String,
    pub manual_loot_template: String,

    pub glow_special_secs: u32,
    pub glow_looted_secs: u32,
}

impl Default for LootingSettings {
    fn default() -> Self {
        Self {
            harvest_loose_items: true,
            loot_containers: true,
            quest_object_loot: SpecialObjectHandling::GlowTarget,
            quest_object_full_flags: false,
            valuable_item_loot: SpecialObjectHandling::GlowTarget,
            valuable_threshold: 500,
            locked_chest_loot: SpecialObjectHandling::GlowTarget,
            boss_chest_loot: SpecialObjectHandling::GlowTarget,
            enchant_item_glow: true,
            belongings_check: SpecialObjectHandling::DoNotLoot,
            ownership_rule: OwnershipRule::LawAbiding,
            loot_owned_collectibles: false,
            looting_types: BTreeMap::new(),
            value_weight: BTreeMap::new(),
            check_weightless_value: false,
            weightless_min_value: 0,
            dead_body_looting: DeadBodyLooting::LootExcludingArmor,
            population_center_exempt: [ObjectType::Flora, ObjectType::Critter, ObjectType::OreVein]
                .into_iter()
                .collect(),
            glowable_book_keywords: Vec::new(),
            loot_fired_ammo: true,
            container_animation: ContainerAnimation::Glow,
            manual_loot_notify: true,
            single_loot_template: "{ITEMNAME} taken".to_string(),
            multi_loot_template: "{ITEMNAME} ({COUNT}) taken".to_string(),
            collection_added_template: "{ITEMNAME} added to {COLLECTION}".to_string(),
            manual_loot_template: "{ITEMNAME} needs manual looting".to_string(),
            glow_special_secs: 10,
            glow_looted_secs: 2,
        }
    }
}

impl LootingSettings {
    pub fn load<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|e| DomainError::Config {
            path: path.to_path_buf(),
            source: ConfigErrorKind::Read(e),
        })?;
        toml::from_str(&data).map_err(|e| DomainError::Config {
            path: path.to_path_buf(),
            source: ConfigErrorKind::Parse(e),
        })
    }

    /// Configured looting type, silent looting when the type is not listed.
    pub fn looting_type(&self, object_type: ObjectType) -> LootingType {
        self.looting_types.get(&object_type).copied().unwrap_or_default()
    }

    pub fn is_valuable(&self, form: &Form) -> bool {
        self.valuable_threshold > 0 && form.value >= self.valuable_threshold
    }

    pub fn is_exempt_in_population_center(&self, object_type: ObjectType) -> bool {
        self.population_center_exempt.contains(&object_type)
    }

    /// Whether the value/weight test applies to an item of this type and weight.
    pub fn looting_depends_on_value_weight(&self, looting_type: LootingType, object_type: ObjectType, weight: f64) -> bool {
        if !object_type.always_value_weight_exempt() && weight <= 0.0 && self.check_weightless_value {
            return true;
        }
        if object_type.value_weight_exempt() {
            return false;
        }
        looting_type.depends_on_value()
    }

    pub fn value_weight_too_low(&self, form: &Form, object_type: ObjectType) -> bool {
        match form.value_per_weight() {
            None => self.check_weightless_value && form.value < self.weightless_min_value,
            Some(ratio) => {
                let min = self.value_weight.get(&object_type).copied().unwrap_or(0.0);
                min > 0.0 && ratio < min
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::types::{FormId, Signature};

    #[test]
    fn t_defaults_and_partial_toml() {
        let s: LootingSettings = toml::from_str(
            r#"
            ownership_rule = "ownerless"
            valuable_threshold = 1000
            [looting_types]
            clutter = "leaveBehind"
            ingredient = "lootIfValuableEnoughNotify"
            [value_weight]
            ingredient = 5.0
            "#,
        )
        .unwrap();
        assert_eq!(s.ownership_rule, OwnershipRule::Ownerless);
        assert_eq!(s.valuable_threshold, 1000);
        assert_eq!(s.looting_type(ObjectType::Clutter), LootingType::LeaveBehind);
        assert_eq!(s.looting_type(ObjectType::Weapon), LootingType::LootAlwaysSilent);
        assert_eq!(s.quest_object_loot, SpecialObjectHandling::GlowTarget);
        assert!(s.is_exempt_in_population_center(ObjectType::Flora));
    }

    #[test]
    fn t_value_weight() {
        let mut s = LootingSettings::default();
        s.value_weight.insert(ObjectType::Ingredient, 5.0);
        let mut f = Form::new(FormId(1), Signature::Ingredient, ObjectType::Ingredient);
        f.value = 2;
        f.weight = 1.0;
        assert!(s.value_weight_too_low(&f, ObjectType::Ingredient));
        f.value = 10;
        assert!(!s.value_weight_too_low(&f, ObjectType::Ingredient));

        assert!(s.looting_depends_on_value_weight(LootingType::LootIfValuableEnoughSilent, ObjectType::Ingredient, 1.0));
        assert!(!s.looting_depends_on_value_weight(LootingType::LootAlwaysNotify, ObjectType::Ingredient, 1.0));
        assert!(!s.looting_depends_on_value_weight(LootingType::LootIfValuableEnoughSilent, ObjectType::Key, 1.0));
    }

    #[test]
    fn t_weightless_check() {
        let mut s = LootingSettings::default();
        s.check_weightless_value = true;
        s.weightless_min_value = 10;
        assert!(s.looting_depends_on_value_weight(LootingType::LootAlwaysSilent, ObjectType::LockPick, 0.0));
        assert!(!s.looting_depends_on_value_weight(LootingType::LootAlwaysSilent, ObjectType::Septims, 0.0));
        let f = Form::new(FormId(2), Signature::Misc, ObjectType::Clutter);
        assert!(s.value_weight_too_low(&f, ObjectType::Clutter));
    }
}
