use crate::error::DomainError;
use serde::{Deserialize, Serialize};

/// Harvest category of a template object. Drives per-category looting rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ObjectType {
    Unknown,
    Flora,
    Critter,
    Ingredient,
    Septims,
    Gem,
    LockPick,
    AnimalHide,
    OreIngot,
    SoulGem,
    Key,
    Clutter,
    Light,
    Book,
    SpellBook,
    SkillBook,
    BookRead,
    SpellBookRead,
    SkillBookRead,
    Scroll,
    Ammo,
    Weapon,
    EnchantedWeapon,
    Armor,
    EnchantedArmor,
    Jewelry,
    EnchantedJewelry,
    Potion,
    Poison,
    Food,
    Drink,
    OreVein,
}

impl ObjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectType::Unknown => "unknown",
            ObjectType::Flora => "flora",
            ObjectType::Critter => "critter",
            ObjectType::Ingredient => "ingredient",
            ObjectType::Septims => "septims",
            ObjectType::Gem => "gem",
            ObjectType::LockPick => "lockPick",
            ObjectType::AnimalHide => "animalHide",
            ObjectType::OreIngot => "oreIngot",
            ObjectType::SoulGem => "soulGem",
            ObjectType::Key => "key",
            ObjectType::Clutter => "clutter",
            ObjectType::Light => "light",
            ObjectType::Book => "book",
            ObjectType::SpellBook => "spellBook",
            ObjectType::SkillBook => "skillBook",
            ObjectType::BookRead => "bookRead",
            ObjectType::SpellBookRead => "spellBookRead",
            ObjectType::SkillBookRead => "skillBookRead",
            ObjectType::Scroll => "scroll",
            ObjectType::Ammo => "ammo",
            ObjectType::Weapon => "weapon",
            ObjectType::EnchantedWeapon => "enchantedWeapon",
            ObjectType::Armor => "armor",
            ObjectType::EnchantedArmor => "enchantedArmor",
            ObjectType::Jewelry => "jewelry",
            ObjectType::EnchantedJewelry => "enchantedJewelry",
            ObjectType::Potion => "potion",
            ObjectType::Poison => "poison",
            ObjectType::Food => "food",
            ObjectType::Drink => "drink",
            ObjectType::OreVein => "oreVein",
        }
    }

    /// Player-enchanted weapons, armor and jewelry are looted under their enchanted category.
    pub fn enchanted(&self) -> ObjectType {
        match self {
            ObjectType::Weapon => ObjectType::EnchantedWeapon,
            ObjectType::Armor => ObjectType::EnchantedArmor,
            ObjectType::Jewelry => ObjectType::EnchantedJewelry,
            other => *other,
        }
    }

    pub fn is_armor(&self) -> bool {
        matches!(self, ObjectType::Armor | ObjectType::EnchantedArmor)
    }

    pub fn is_book(&self) -> bool {
        matches!(
            self,
            ObjectType::Book
                | ObjectType::SpellBook
                | ObjectType::SkillBook
                | ObjectType::BookRead
                | ObjectType::SpellBookRead
                | ObjectType::SkillBookRead
        )
    }

    /// Never value/weight tested, not even when weightless.
    pub fn always_value_weight_exempt(&self) -> bool {
        matches!(self, ObjectType::Septims | ObjectType::Key | ObjectType::OreVein)
    }

    /// Not value/weight tested unless weightless. Lockpicks land here.
    pub fn value_weight_exempt(&self) -> bool {
        self.always_value_weight_exempt() || matches!(self, ObjectType::LockPick)
    }
}

impl std::fmt::Display for ObjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ObjectType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL_OBJECT_TYPES
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| DomainError::InvalidObjectType(s.to_string()))
    }
}

const ALL_OBJECT_TYPES: &[ObjectType] = &[
    ObjectType::Unknown,
    ObjectType::Flora,
    ObjectType::Critter,
    ObjectType::Ingredient,
    ObjectType::Septims,
    ObjectType::Gem,
    ObjectType::LockPick,
    ObjectType::AnimalHide,
    ObjectType::OreIngot,
    ObjectType::SoulGem,
    ObjectType::Key,
    ObjectType::Clutter,
    ObjectType::Light,
    ObjectType::Book,
    ObjectType::SpellBook,
    ObjectType::SkillBook,
    ObjectType::BookRead,
    ObjectType::SpellBookRead,
    ObjectType::SkillBookRead,
    ObjectType::Scroll,
    ObjectType::Ammo,
    ObjectType::Weapon,
    ObjectType::EnchantedWeapon,
    ObjectType::Armor,
    ObjectType::EnchantedArmor,
    ObjectType::Jewelry,
    ObjectType::EnchantedJewelry,
    ObjectType::Potion,
    ObjectType::Poison,
    ObjectType::Food,
    ObjectType::Drink,
    ObjectType::OreVein,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn t_names_parse_back() {
        for t in ALL_OBJECT_TYPES {
            assert_eq!(t.as_str().parse::<ObjectType>().unwrap(), *t);
        }
        assert_eq!("OREVEIN".parse::<ObjectType>().unwrap(), ObjectType::OreVein);
    }

    #[test]
    fn t_enchanted_promotion() {
        assert_eq!(ObjectType::Weapon.enchanted(), ObjectType::EnchantedWeapon);
        assert_eq!(ObjectType::Jewelry.enchanted(), ObjectType::EnchantedJewelry);
        assert_eq!(ObjectType::Food.enchanted(), ObjectType::Food);
    }

    #[test]
    fn t_value_weight_exemptions() {
        assert!(ObjectType::Septims.always_value_weight_exempt());
        assert!(!ObjectType::LockPick.always_value_weight_exempt());
        assert!(ObjectType::LockPick.value_weight_exempt());
        assert!(!ObjectType::Clutter.value_weight_exempt());
    }
}
