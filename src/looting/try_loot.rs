use crate::collections::CollectionManager;
use crate::hardening::HARVEST_SPAM_LIMIT;
use crate::looting::blocks::LootBlocks;
use crate::looting::container::{ContainerLister, LootableItem};
use crate::looting::events::EventSink;
use crate::looting::governor::ScanGovernor;
use crate::looting::settings::LootingSettings;
use crate::models::form::Form;
use crate::models::lootability::{
    CollectibleHandling, ContainerAnimation, DeadBodyLooting, GlowReason, Lootability, LootingType, OwnershipRule,
    SpecialObjectHandling,
};
use crate::models::object_type::ObjectType;
use crate::models::reference::ObjectRef;
use crate::models::types::Scope;
use crate::util::render_template;
use crate::world::WorldPorts;

/// Services one decision call reads. Built once per scan pass.
pub struct LootContext<'a> {
    pub world: &'a WorldPorts,
    pub collections: &'a CollectionManager,
    pub governor: &'a ScanGovernor,
    pub blocks: &'a LootBlocks,
    pub settings: &'a LootingSettings,
    pub events: &'a dyn EventSink,
}

/// A container stack picked for transfer.
struct Target {
    item: LootableItem,
    notify: bool,
    collectible: bool,
    count: u32,
}

/// Decision pipeline for one reference. Produces exactly one verdict per `process` call.
pub struct TryLoot<'a> {
    ctx: &'a LootContext<'a>,
    candidate: &'a ObjectRef,
    stolen: bool,                   // delayed re-dispatch after an undetected-theft check
    glow: GlowReason,
}

impl<'a> TryLoot<'a> {
    pub fn new(ctx: &'a LootContext<'a>, candidate: &'a ObjectRef, stolen: bool) -> Self {
        Self { ctx, candidate, stolen, glow: GlowReason::None }
    }

    pub fn process(&mut self, dry_run: bool) -> Lootability {
        self.glow = GlowReason::None;
        let verdict = match self.candidate.scope {
            Scope::ItemObjects => self.process_item(dry_run),
            Scope::Containers | Scope::DeadBodies => self.process_container(dry_run),
        };
        tracing::debug!(refr = %self.candidate.id, base = %self.candidate.base, %verdict, dry_run, "lootability");
        verdict
    }

    fn update_glow(&mut self, reason: GlowReason) {
        self.glow = self.glow.merge(reason);
    }

    // ========================================================================
    // LOOSE ITEMS
    // ========================================================================

    fn process_item(&mut self, dry_run: bool) -> Lootability {
        let ctx = self.ctx;
        let candidate = self.candidate;
        let settings = ctx.settings;
        let base = ctx.world.catalog.form(candidate.base);
        let object_type = base.as_ref().map_or(ObjectType::Unknown, |f| f.object_type);

        // producers (critters and the like) yield a different lootable form
        let mut lootable: Option<Form> = base.clone();
        if !dry_run && object_type == ObjectType::Critter {
            match ctx.blocks.lootable_for_producer(candidate.base) {
                Some(Some(resolved)) => {
                    tracing::debug!(producer = %candidate.base, lootable = %resolved, "producer resolved");
                    lootable = ctx.world.catalog.form(resolved);
                }
                _ => {
                    if ctx.blocks.set_lootable_for_producer(candidate.base, None) {
                        ctx.events.trigger_get_producer_lootable(candidate);
                    }
                    return Lootability::PendingProducerIngredient;
                }
            }
        }

        let mut result = Lootability::Lootable;
        let mut skip = false;

        // collections first, manual loot targets may not have a usable object type
        let mut collectible = lootable
            .as_ref()
            .and_then(|f| ctx.collections.treat_as_collectible(f.id, Some(Scope::ItemObjects)));
        if let Some(action) = collectible
            && !action.can_loot()
        {
            collectible = None;
            skip = true;
            match action {
                CollectibleHandling::Print => {
                    if !dry_run {
                        self.process_manual_loot_item(lootable.as_ref());
                    }
                    return Lootability::ManualLootTarget;
                }
                CollectibleHandling::Glow => {
                    self.update_glow(GlowReason::Collectible);
                    result = Lootability::CollectibleItemSetToGlow;
                }
                _ => {
                    if !dry_run {
                        ctx.blocks.block_form_permanently(candidate.base, Lootability::ObjectIsInBlacklistCollection);
                    }
                    return Lootability::ObjectIsInBlacklistCollection;
                }
            }
        }

        let (Some(base), Some(lootable)) = (base, lootable) else {
            if !dry_run {
                ctx.blocks.blacklist_reference(candidate.id);
            }
            return Lootability::ObjectTypeUnknown;
        };
        if object_type == ObjectType::Unknown {
            if !dry_run {
                ctx.blocks.blacklist_reference(candidate.id);
            }
            return Lootability::ObjectTypeUnknown;
        }

        if ctx.blocks.is_blacklisted(base.id) {
            return Lootability::BaseObjectOnBlacklist;
        }

        let quest_loot = settings.quest_object_loot;
        if candidate.quest.is_quest_item(settings.quest_object_full_flags) {
            if quest_loot == SpecialObjectHandling::GlowTarget {
                self.update_glow(GlowReason::QuestObject);
            }
            if !quest_loot.is_lootable() {
                skip = true;
                collectible = None;
                result = Lootability::CannotLootQuestTarget;
            }
        } else if quest_loot == SpecialObjectHandling::GlowTarget
            && object_type == ObjectType::Book
            && self.is_book_glowable(&base)
        {
            // unread notes are often quest related
            self.update_glow(GlowReason::SimpleTarget);
        }

        let valuable_loot = settings.valuable_item_loot;
        if settings.is_valuable(&lootable) {
            if valuable_loot == SpecialObjectHandling::GlowTarget {
                self.update_glow(GlowReason::Valuable);
            }
            if !valuable_loot.is_lootable() {
                skip = true;
                result = Lootability::CannotLootValuableObject;
            }
        }

        if object_type == ObjectType::Ammo && candidate.fired_projectile && !settings.loot_fired_ammo {
            skip = true;
            result = Lootability::CannotLootAmmo;
        }

        // after the glow checks, many quest objects are owned
        let forbidden = self.item_looting_legality(collectible.is_some());
        if forbidden != Lootability::Lootable {
            skip = true;
            result = forbidden;
        }

        if !dry_run && self.glow != GlowReason::None {
            ctx.governor.glow_object(candidate.id, settings.glow_special_secs, self.glow);
        }

        let location = &ctx.world.location;
        if !location.in_whitelisted_place()
            && location.in_restricted_settlement()
            && !settings.is_exempt_in_population_center(object_type)
        {
            result = Lootability::PopulousLocationRestrictsLooting;
            skip = true;
        }

        let mut looting_type = LootingType::LeaveBehind;
        if collectible.is_some() {
            // collectibles are looted silently, legality still applies
            skip = forbidden != Lootability::Lootable;
            if !skip {
                result = Lootability::Lootable;
            }
            looting_type = LootingType::LootAlwaysSilent;
        } else if ctx.blocks.is_whitelisted(base.id) {
            skip = forbidden != Lootability::Lootable;
            result = if skip { Lootability::LawAbidingSoNoWhitelistItemLooting } else { Lootability::Lootable };
            looting_type = LootingType::LootAlwaysSilent;
        } else if !skip {
            looting_type = settings.looting_type(object_type);
            if looting_type == LootingType::LeaveBehind {
                if !dry_run {
                    ctx.blocks.block_reference(candidate.id, Lootability::ItemTypeIsSetToPreventLooting);
                }
                skip = true;
                result = Lootability::ItemTypeIsSetToPreventLooting;
            } else if settings.looting_depends_on_value_weight(looting_type, object_type, lootable.weight)
                && settings.value_weight_too_low(&lootable, object_type)
            {
                if !dry_run {
                    ctx.blocks.block_form(base.id, Lootability::ValueWeightPreventsLooting);
                }
                skip = true;
                result = Lootability::ValueWeightPreventsLooting;
            }
        }

        if skip || dry_run {
            return result;
        }

        let theft = self.needs_theft_check();
        let ore = object_type == ObjectType::OreVein;
        let silent = theft || ore || !looting_type.requires_notification();
        if let Err(verdict) = self.claim(silent) {
            return verdict;
        }
        if theft {
            return self.dispatch_theft_check();
        }

        if ore {
            // depleted or excluded veins are left alone until the next cell visit
            ctx.blocks.block_reference(candidate.id, Lootability::CannotMineTwiceInSameCellVisit);
            ctx.events.trigger_mining(candidate, settings.manual_loot_notify);
            ctx.governor.unlock_harvest(candidate.id, silent);
        } else {
            // held until the script layer reports the harvest done
            let spam = ctx.governor.pending_harvest_notifications() > HARVEST_SPAM_LIMIT;
            ctx.events
                .trigger_harvest(candidate, object_type, candidate.count, silent || spam, collectible.is_some());
        }
        result
    }

    fn process_manual_loot_item(&self, form: Option<&Form>) {
        if !self.ctx.settings.manual_loot_notify {
            return;
        }
        let name = form.map_or_else(|| self.candidate.name.clone(), |f| f.display_name());
        let text = render_template(&self.ctx.settings.manual_loot_template, &[("ITEMNAME", name.as_str())]);
        self.ctx.events.show_notification(&text);
    }

    fn is_book_glowable(&self, form: &Form) -> bool {
        let catalog = &self.ctx.world.catalog;
        self.ctx
            .settings
            .glowable_book_keywords
            .iter()
            .filter_map(|k| catalog.keyword(k))
            .any(|k| form.has_keyword(k))
    }

    /// Off-limits targets under the undetected-crime rule are handed to the theft check
    /// instead of being looted. A re-dispatch after that check is not sent again.
    fn needs_theft_check(&self) -> bool {
        !self.stolen
            && self.candidate.off_limits
            && self.ctx.settings.ownership_rule == OwnershipRule::AllowCrimeIfUndetected
    }

    /// Caller holds the dispatch lock. It stays held until the check reports back.
    fn dispatch_theft_check(&self) -> Lootability {
        self.ctx.governor.hold_for_theft_check(self.candidate.id);
        self.ctx.events.trigger_theft_check(self.candidate);
        Lootability::ItemTheftTriggered
    }

    /// Takes the per-reference dispatch lock. Another dispatch in flight, or one that
    /// finished while this call was deciding, wins.
    fn claim(&self, silent: bool) -> Result<(), Lootability> {
        let governor = self.ctx.governor;
        let id = self.candidate.id;
        let locked = if self.stolen { governor.lock_after_theft(id, silent) } else { governor.lock_harvest(id, silent) };
        if !locked {
            return Err(Lootability::HarvestOperationPending);
        }
        if let Some(done) = self.already_handled() {
            governor.unlock_harvest(id, silent);
            return Err(done);
        }
        Ok(())
    }

    fn already_handled(&self) -> Option<Lootability> {
        let candidate = self.candidate;
        let blocks = self.ctx.blocks;
        let governor = self.ctx.governor;
        if blocks.is_reference_blacklisted(candidate.id) || blocks.is_reference_blocked(candidate.id) {
            return Some(Lootability::ReferenceBlacklisted);
        }
        if candidate.dynamic && governor.is_looted_dynamic(candidate) {
            return Some(Lootability::DynamicReferenceLootedAlready);
        }
        if candidate.is_container_like() && governor.is_looted_container(candidate) {
            return Some(Lootability::ContainerLootedAlready);
        }
        None
    }

    // ========================================================================
    // CONTAINERS AND DEAD BODIES
    // ========================================================================

    fn process_container(&mut self, dry_run: bool) -> Lootability {
        let ctx = self.ctx;
        let candidate = self.candidate;
        let settings = ctx.settings;
        let scope = candidate.scope;

        // copied or emptied containers are never revisited
        if let Some(done) = self.already_handled() {
            return done;
        }

        // armor stays on dead bodies unless configured otherwise
        let exclude_armor = scope == Scope::DeadBodies && settings.dead_body_looting == DeadBodyLooting::LootExcludingArmor;
        let mut lister = ContainerLister::new(
            candidate,
            ctx.world.catalog.as_ref(),
            ctx.world.containers.as_ref(),
            ctx.collections,
            ctx.blocks,
            settings,
        );
        let initial = lister.analyze_lootable_items();
        if initial == 0 {
            if !dry_run {
                ctx.governor.mark_container_looted(candidate);
            }
            return Lootability::ContainerHasNoLootableItems;
        }

        let mut result = Lootability::Lootable;
        let mut skip = false;
        if scope == Scope::Containers {
            if ctx.governor.is_reference_locked_container(candidate) {
                if settings.locked_chest_loot == SpecialObjectHandling::GlowTarget {
                    self.update_glow(GlowReason::LockedContainer);
                }
                if !settings.locked_chest_loot.is_lootable() {
                    skip = true;
                    result = Lootability::ContainerIsLocked;
                }
            }
            if candidate.boss_container {
                if settings.boss_chest_loot == SpecialObjectHandling::GlowTarget {
                    self.update_glow(GlowReason::BossContainer);
                }
                if !settings.boss_chest_loot.is_lootable() {
                    skip = true;
                    result = Lootability::ContainerIsBossChest;
                }
            }
        }

        // special contents block only themselves, the rest of the container stays lootable
        if lister.has_quest_item() {
            if settings.quest_object_loot == SpecialObjectHandling::GlowTarget {
                self.update_glow(GlowReason::QuestObject);
            }
            if !settings.quest_object_loot.is_lootable() {
                lister.exclude_quest_items();
                result = Lootability::ContainerHasQuestObject;
            }
        }

        if lister.has_enchanted_item() && settings.enchant_item_glow {
            self.update_glow(GlowReason::EnchantedItem);
            lister.exclude_enchanted_items();
        }

        if lister.has_valuable_item() {
            if settings.valuable_item_loot == SpecialObjectHandling::GlowTarget {
                self.update_glow(GlowReason::Valuable);
            }
            if !settings.valuable_item_loot.is_lootable() {
                lister.exclude_valuable_items();
                result = Lootability::ContainerHasValuableObject;
            }
        }

        if let Some(action) = lister.collectible_action()
            && !action.can_loot()
        {
            lister.exclude_collectible_items();
            result = match action {
                CollectibleHandling::Glow => {
                    self.update_glow(GlowReason::Collectible);
                    Lootability::CollectibleItemSetToGlow
                }
                CollectibleHandling::Print => Lootability::ManualLootTarget,
                _ => Lootability::ItemInBlacklistCollection,
            };
        }

        // legality of the container itself gates every item in it
        let forbidden = self.looting_legality(scope);
        if forbidden != Lootability::Lootable {
            skip = true;
            result = forbidden;
        } else if ctx.blocks.is_blacklisted(candidate.base) {
            skip = true;
            result = Lootability::ReferencesBlacklistedContainer;
        }

        // dead bodies are always fair game, even in towns
        let location = &ctx.world.location;
        if !skip
            && scope != Scope::DeadBodies
            && !location.in_whitelisted_place()
            && location.in_restricted_settlement()
        {
            skip = true;
            result = Lootability::PopulousLocationRestrictsLooting;
        }

        if !dry_run && self.glow != GlowReason::None {
            ctx.governor.glow_object(candidate.id, settings.glow_special_secs, self.glow);
        }

        if dry_run || skip {
            return result;
        }

        // notifications are per item, the container lock itself is silent
        if let Err(verdict) = self.claim(true) {
            return verdict;
        }
        if self.needs_theft_check() {
            return self.dispatch_theft_check();
        }

        let mut targets = Vec::with_capacity(lister.lootable_items().len());
        for li in lister.lootable_items() {
            let form_id = li.form.id;
            if ctx.blocks.is_blacklisted(form_id) {
                continue;
            }
            let object_type = li.object_type();
            if exclude_armor && object_type.is_armor() {
                continue;
            }

            let looting_type = match li.collectible {
                Some(action) if action.can_loot() => LootingType::LootAlwaysSilent,
                Some(_) => continue,
                None if ctx.blocks.is_whitelisted(form_id) => LootingType::LootAlwaysSilent,
                None => {
                    let lt = settings.looting_type(object_type);
                    if lt == LootingType::LeaveBehind {
                        ctx.blocks.block_form(form_id, Lootability::ItemTypeIsSetToPreventLooting);
                        continue;
                    }
                    if settings.looting_depends_on_value_weight(lt, object_type, li.form.weight)
                        && settings.value_weight_too_low(&li.form, object_type)
                    {
                        ctx.blocks.block_form(form_id, Lootability::ValueWeightPreventsLooting);
                        continue;
                    }
                    lt
                }
            };

            if self.item_looting_legality(li.collectible.is_some()) != Lootability::Lootable {
                continue;
            }
            tracing::debug!(item = %form_id, container = %candidate.id, "take from container");
            targets.push(Target {
                item: li.clone(),
                notify: looting_type.requires_notification(),
                collectible: li.collectible.is_some(),
                count: 0,
            });
        }

        if !targets.is_empty() {
            let mut animation = settings.container_animation;
            if animation != ContainerAnimation::None && (scope == Scope::DeadBodies || !candidate.animated) {
                animation = ContainerAnimation::Glow;
            }
            self.get_loot_from_container(&mut targets, animation, scope == Scope::Containers);
        }

        // a transfer that removed nothing is not retried: copy the items and stop scanning it
        if scope == Scope::Containers && !targets.is_empty() && lister.analyze_lootable_items() >= initial {
            tracing::warn!(container = %candidate.id, items = targets.len(), "container transfer was a no-op, making copies");
            self.copy_loot_from_container(&targets);
            ctx.blocks.blacklist_reference(candidate.id);
        } else {
            ctx.governor.mark_container_looted(candidate);
        }
        ctx.governor.unlock_harvest(candidate.id, true);
        result
    }

    fn get_loot_from_container(&self, targets: &mut [Target], animation: ContainerAnimation, inline: bool) {
        let ctx = self.ctx;
        let settings = ctx.settings;
        match animation {
            ContainerAnimation::Animate => ctx.events.trigger_container_animation(self.candidate.id),
            ContainerAnimation::Glow => {
                ctx.governor.glow_object(self.candidate.id, settings.glow_looted_secs, GlowReason::SimpleTarget)
            }
            ContainerAnimation::None => {}
        }

        for target in targets.iter_mut() {
            let count = ctx.world.containers.take_all(self.candidate.id, &target.item.item, inline);
            target.count = count;
            tracing::trace!(item = %target.item.form.id, count, collectible = target.collectible, "transferred");
            if target.notify {
                let name = target.item.form.display_name();
                let text = if count > 1 {
                    let count = count.to_string();
                    render_template(
                        &settings.multi_loot_template,
                        &[("ITEMNAME", name.as_str()), ("COUNT", count.as_str())],
                    )
                } else {
                    render_template(&settings.single_loot_template, &[("ITEMNAME", name.as_str())])
                };
                ctx.events.show_notification(&text);
            }
            ctx.collections.check_enqueue_added_item(target.item.form.id);
        }
    }

    fn copy_loot_from_container(&self, targets: &[Target]) {
        for target in targets {
            self.ctx.world.containers.make_copies(target.item.form.id, target.count);
        }
    }

    // ========================================================================
    // LEGALITY
    // ========================================================================

    fn item_looting_legality(&mut self, collectible: bool) -> Lootability {
        let result = self.looting_legality(Scope::ItemObjects);
        if collectible && self.loot_owned_if_collectible(result) {
            tracing::debug!(refr = %self.candidate.id, overridden = %result, "collectible overrides ownership");
            return Lootability::Lootable;
        }
        result
    }

    /// Crime is never lifted, ownership is when configured.
    fn loot_owned_if_collectible(&self, result: Lootability) -> bool {
        self.ctx.settings.loot_owned_collectibles
            && matches!(
                result,
                Lootability::PlayerOwned | Lootability::CellOrItemOwnerPreventsOwnerlessLooting
            )
    }

    fn looting_legality(&mut self, scope: Scope) -> Lootability {
        if self.stolen || scope == Scope::DeadBodies {
            return Lootability::Lootable;
        }
        let settings = self.ctx.settings;
        let candidate = self.candidate;
        let player_owned = candidate.player_owned;
        // fired arrows count as player owned, pickup is always fine
        let fired = candidate.fired_projectile;
        let crime = candidate.off_limits;

        if !crime && player_owned && !fired {
            if !settings.belongings_check.is_lootable() {
                if settings.belongings_check == SpecialObjectHandling::GlowTarget {
                    self.update_glow(GlowReason::PlayerProperty);
                }
                return Lootability::PlayerOwned;
            }
        } else if settings.ownership_rule != OwnershipRule::AllowCrimeIfUndetected {
            if crime {
                return Lootability::CrimeToLoot;
            }
            if settings.ownership_rule == OwnershipRule::Ownerless
                && !player_owned
                && !fired
                && (candidate.owner.is_some() || !self.ctx.world.location.in_friendly_cell())
            {
                return Lootability::CellOrItemOwnerPreventsOwnerlessLooting;
            }
        }
        Lootability::Lootable
    }
}
