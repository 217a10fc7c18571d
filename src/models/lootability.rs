use serde::{Deserialize, Serialize};

/// Terminal verdict of one decision call. Exactly one is produced per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Lootability {
    Lootable,
    NullReference,
    ReferenceBlacklisted,
    BaseObjectBlocked,
    ContainerLootedAlready,
    DynamicReferenceLootedAlready,
    LootContainersDisabled,
    LootDeadBodyDisabled,
    HarvestLooseItemDisabled,
    PendingProducerIngredient,
    ObjectTypeUnknown,
    ManualLootTarget,
    BaseObjectOnBlacklist,
    CannotLootQuestTarget,
    ObjectIsInBlacklistCollection,
    CannotLootValuableObject,
    CannotLootAmmo,
    PlayerOwned,
    CrimeToLoot,
    CellOrItemOwnerPreventsOwnerlessLooting,
    PopulousLocationRestrictsLooting,
    ItemInBlacklistCollection,
    CollectibleItemSetToGlow,
    LawAbidingSoNoWhitelistItemLooting,
    ItemIsBlacklisted,
    ItemTypeIsSetToPreventLooting,
    ValueWeightPreventsLooting,
    ItemTheftTriggered,
    HarvestOperationPending,
    CannotMineTwiceInSameCellVisit,
    ContainerHasNoLootableItems,
    ContainerIsLocked,
    ContainerIsBossChest,
    ContainerHasQuestObject,
    ContainerHasValuableObject,
    ReferencesBlacklistedContainer,
}

impl Lootability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Lootability::Lootable => "Lootable",
            Lootability::NullReference => "NullReference",
            Lootability::ReferenceBlacklisted => "ReferenceBlacklisted",
            Lootability::BaseObjectBlocked => "BaseObjectBlocked",
            Lootability::ContainerLootedAlready => "ContainerLootedAlready",
            Lootability::DynamicReferenceLootedAlready => "DynamicReferenceLootedAlready",
            Lootability::LootContainersDisabled => "LootContainersDisabled",
            Lootability::LootDeadBodyDisabled => "LootDeadBodyDisabled",
            Lootability::HarvestLooseItemDisabled => "HarvestLooseItemDisabled",
            Lootability::PendingProducerIngredient => "PendingProducerIngredient",
            Lootability::ObjectTypeUnknown => "ObjectTypeUnknown",
            Lootability::ManualLootTarget => "ManualLootTarget",
            Lootability::BaseObjectOnBlacklist => "BaseObjectOnBlacklist",
            Lootability::CannotLootQuestTarget => "CannotLootQuestTarget",
            Lootability::ObjectIsInBlacklistCollection => "ObjectIsInBlacklistCollection",
            Lootability::CannotLootValuableObject => "CannotLootValuableObject",
            Lootability::CannotLootAmmo => "CannotLootAmmo",
            Lootability::PlayerOwned => "PlayerOwned",
            Lootability::CrimeToLoot => "CrimeToLoot",
            Lootability::CellOrItemOwnerPreventsOwnerlessLooting => "CellOrItemOwnerPreventsOwnerlessLooting",
            Lootability::PopulousLocationRestrictsLooting => "PopulousLocationRestrictsLooting",
            Lootability::ItemInBlacklistCollection => "ItemOnBlacklistCollection",
            Lootability::CollectibleItemSetToGlow => "CollectibleItemSetToGlow",
            Lootability::LawAbidingSoNoWhitelistItemLooting => "CrimeCheckPreventsWhitelistItemLooting",
            Lootability::ItemIsBlacklisted => "ItemIsBlacklisted",
            Lootability::ItemTypeIsSetToPreventLooting => "ItemTypeIsSetToPreventLooting",
            Lootability::ValueWeightPreventsLooting => "ValueWeightPreventsLooting",
            Lootability::ItemTheftTriggered => "ItemTheftTriggered",
            Lootability::HarvestOperationPending => "HarvestOperationPending",
            Lootability::CannotMineTwiceInSameCellVisit => "CannotMineTwiceInSameCellVisit",
            Lootability::ContainerHasNoLootableItems => "ContainerHasNoLootableItems",
            Lootability::ContainerIsLocked => "ContainerIsLocked",
            Lootability::ContainerIsBossChest => "ContainerIsBossChest",
            Lootability::ContainerHasQuestObject => "ContainerHasQuestObject",
            Lootability::ContainerHasValuableObject => "ContainerHasValuableObject",
            Lootability::ReferencesBlacklistedContainer => "ReferencesBlacklistedContainer",
        }
    }
}

impl std::fmt::Display for Lootability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an object glows. Declaration order is precedence: earlier variants win.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GlowReason {
    BossContainer,
    QuestObject,
    Collectible,
    Valuable,
    EnchantedItem,
    LockedContainer,
    PlayerProperty,
    SimpleTarget,
    None,
}

impl GlowReason {
    /// Keeps the higher-precedence reason of the two.
    pub fn merge(self, next: GlowReason) -> GlowReason {
        self.min(next)
    }
}

/// Action a collection policy applies to its members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CollectibleHandling {
    #[serde(rename = "leave")]
    DoNotLoot,
    #[serde(rename = "take")]
    Loot,
    #[serde(rename = "glow")]
    Glow,
    #[serde(rename = "print")]
    Print,
}

impl CollectibleHandling {
    /// Rank in DoNotLoot > Print > Glow > Loot.
    fn restrictiveness(&self) -> u8 {
        match self {
            CollectibleHandling::DoNotLoot => 3,
            CollectibleHandling::Print => 2,
            CollectibleHandling::Glow => 1,
            CollectibleHandling::Loot => 0,
        }
    }

    pub fn most_restrictive(self, other: CollectibleHandling) -> CollectibleHandling {
        if other.restrictiveness() > self.restrictiveness() { other } else { self }
    }

    pub fn can_loot(&self) -> bool {
        *self == CollectibleHandling::Loot
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CollectibleHandling::DoNotLoot => "leave",
            CollectibleHandling::Loot => "take",
            CollectibleHandling::Glow => "glow",
            CollectibleHandling::Print => "print",
        }
    }
}

/// Config-level handling of quest, valuable, locked and boss objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SpecialObjectHandling {
    DoLoot,
    DoNotLoot,
    #[default]
    GlowTarget,
}

impl SpecialObjectHandling {
    pub fn is_lootable(&self) -> bool {
        *self == SpecialObjectHandling::DoLoot
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LootingType {
    LeaveBehind,
    #[default]
    LootAlwaysSilent,
    LootAlwaysNotify,
    LootIfValuableEnoughSilent,
    LootIfValuableEnoughNotify,
}

impl LootingType {
    pub fn requires_notification(&self) -> bool {
        matches!(self, LootingType::LootAlwaysNotify | LootingType::LootIfValuableEnoughNotify)
    }

    pub fn depends_on_value(&self) -> bool {
        matches!(self, LootingType::LootIfValuableEnoughSilent | LootingType::LootIfValuableEnoughNotify)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OwnershipRule {
    AllowCrimeIfUndetected,
    #[default]
    LawAbiding,
    Ownerless,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeadBodyLooting {
    DoNotLoot,
    LootAll,
    #[default]
    LootExcludingArmor,
}

/// Feedback played on a container after it is emptied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContainerAnimation {
    None,
    Animate,
    #[default]
    Glow,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn t_glow_precedence() {
        let mut g = GlowReason::None;
        g = g.merge(GlowReason::Valuable);
        g = g.merge(GlowReason::SimpleTarget);
        assert_eq!(g, GlowReason::Valuable);
        g = g.merge(GlowReason::BossContainer);
        assert_eq!(g, GlowReason::BossContainer);
    }

    #[test]
    fn t_most_restrictive_action() {
        use CollectibleHandling::*;
        assert_eq!(Glow.most_restrictive(DoNotLoot), DoNotLoot);
        assert_eq!(Loot.most_restrictive(Glow), Glow);
        assert_eq!(Print.most_restrictive(Glow), Print);
        assert_eq!(DoNotLoot.most_restrictive(Print), DoNotLoot);
        assert_eq!(Loot.most_restrictive(Loot), Loot);
    }

    #[test]
    fn t_lootability_names() {
        assert_eq!(Lootability::HarvestOperationPending.to_string(), "HarvestOperationPending");
        assert_eq!(Lootability::ItemInBlacklistCollection.as_str(), "ItemOnBlacklistCollection");
    }
}
