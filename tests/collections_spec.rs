mod common;

use common::*;
use harvest_engine::looting::LootingSettings;
use harvest_engine::models::lootability::CollectibleHandling;
use harvest_engine::models::types::Scope;
use harvest_engine::world::PlayerInventory;

#[test]
fn signature_and_keyword_select_one_member() {
    let h = Harness::new(&[("Food", group("take", false, true, &[FOOD]))], LootingSettings::default());
    let cm = &h.registry.collections;
    assert!(cm.is_active());
    assert_eq!(cm.total_items("Food", "Food").unwrap(), 1);
    assert!(cm.is_member(WHEAT));
    assert!(!cm.is_member(NIGHTSHADE));
    assert_eq!(cm.treat_as_collectible(WHEAT, Some(Scope::ItemObjects)), Some(CollectibleHandling::Loot));
}

#[test]
fn negative_answers_are_stable() {
    let h = Harness::new(&[("Food", group("take", false, true, &[FOOD]))], LootingSettings::default());
    let cm = &h.registry.collections;
    for _ in 0..3 {
        assert_eq!(cm.treat_as_collectible(NIGHTSHADE, None), None);
        assert_eq!(cm.treat_as_collectible(WHEAT, None), Some(CollectibleHandling::Loot));
    }
}

#[test]
fn blacklist_claim_wins_and_records_nothing() {
    let h = Harness::new(
        &[
            ("Glow", group("glow", true, true, &[FOOD])),
            ("Leave", group("leave", true, true, &[FOOD])),
        ],
        LootingSettings::default(),
    );
    let cm = &h.registry.collections;
    assert_eq!(cm.treat_as_collectible(WHEAT, None), Some(CollectibleHandling::DoNotLoot));

    cm.record_item(WHEAT, 1.5, None);
    assert_eq!(cm.items_obtained("Glow", "Food").unwrap(), 1);
    assert_eq!(cm.items_obtained("Leave", "Food").unwrap(), 0);
}

#[test]
fn repeat_false_hides_recorded_member() {
    let h = Harness::new(&[("Food", group("take", true, false, &[FOOD]))], LootingSettings::default());
    let cm = &h.registry.collections;
    cm.record_item(WHEAT, 2.0, None);
    cm.record_item(WHEAT, 3.0, None);
    assert_eq!(cm.treat_as_collectible(WHEAT, None), None);
    assert!(cm.is_member(WHEAT));
    assert_eq!(h.sink.notifications(), vec!["Wheat added to Food".to_string()]);
}

#[test]
fn scope_restricted_collection_rejects_other_scopes() {
    let chest_only = r#"{"name": "Chest Herbs", "rootFilter": {"operator": "and",
        "condition": {"signature": ["INGR"], "scope": ["container"]}}}"#;
    let h = Harness::new(&[("Herbs", group("take", false, true, &[chest_only]))], LootingSettings::default());
    let cm = &h.registry.collections;
    assert_eq!(cm.total_items("Herbs", "Chest Herbs").unwrap(), 2);
    assert_eq!(cm.treat_as_collectible(WHEAT, Some(Scope::ItemObjects)), None);
    assert_eq!(cm.treat_as_collectible(WHEAT, Some(Scope::Containers)), Some(CollectibleHandling::Loot));
}

#[test]
fn inventory_reconciliation_records_new_members() {
    let h = Harness::new(&[("Food", group("take", false, true, &[FOOD]))], LootingSettings::default());
    let cm = &h.registry.collections;
    h.world.set_inventory(vec![NIGHTSHADE]);
    cm.process_added_items();
    assert_eq!(cm.items_obtained("Food", "Food").unwrap(), 0);

    h.world.add_to_inventory(WHEAT);
    assert_eq!(h.world.inventory_forms().len(), 2);
    assert_eq!(cm.reconcile_inventory(), vec![WHEAT]);
    cm.process_added_items();
    assert_eq!(cm.items_obtained("Food", "Food").unwrap(), 1);
    assert_eq!(cm.pending_items(), 0);
}

#[test]
fn rejected_files_do_not_stop_loading() {
    let h = Harness::new(
        &[
            ("Broken", "{ not json".to_string()),
            ("Food", group("take", false, true, &[FOOD])),
        ],
        LootingSettings::default(),
    );
    let cm = &h.registry.collections;
    assert_eq!(cm.number_of_files(), 1);
    assert_eq!(cm.labels(), vec!["Food/Food".to_string()]);
}

#[test]
fn group_policy_change_reaches_collections() {
    let h = Harness::new(&[("Food", group("take", false, true, &[FOOD]))], LootingSettings::default());
    let cm = &h.registry.collections;
    cm.group_policy_set_action("Food", CollectibleHandling::Glow).unwrap();
    assert_eq!(cm.policy_action("Food", "Food").unwrap(), CollectibleHandling::Glow);
    assert!(cm.group_policy_set_action("Nope", CollectibleHandling::Glow).is_err());
}

#[test]
fn reload_clears_observed_but_keeps_members() {
    let h = Harness::new(&[("Food", group("take", false, false, &[FOOD]))], LootingSettings::default());
    let cm = &h.registry.collections;
    cm.record_item(WHEAT, 1.0, None);
    assert_eq!(cm.treat_as_collectible(WHEAT, None), None);
    h.registry.prepare_for_reload();
    h.registry.on_game_loaded();
    assert_eq!(cm.items_obtained("Food", "Food").unwrap(), 0);
    assert_eq!(cm.treat_as_collectible(WHEAT, None), Some(CollectibleHandling::Loot));
}
