#![allow(dead_code)]

use harvest_engine::Registry;
use harvest_engine::config::Config;
use harvest_engine::looting::{LootingSettings, RecordingEventSink};
use harvest_engine::models::form::Form;
use harvest_engine::models::object_type::ObjectType;
use harvest_engine::models::types::{FormId, Signature};
use harvest_engine::world::{LoadOrder, MemoryWorld, WorldPorts};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

pub const WHEAT: FormId = FormId(0x100);
pub const NIGHTSHADE: FormId = FormId(0x101);
pub const RUBY: FormId = FormId(0x200);
pub const CHEST: FormId = FormId(0x300);
pub const IRON_VEIN: FormId = FormId(0x400);
pub const IS_FOOD: FormId = FormId(0x900);

pub const FOOD: &str = r#"{"name": "Food", "rootFilter": {"operator": "and",
    "condition": {"signature": ["INGR"], "keyword": ["IsFood"]}}}"#;

pub const GEMS: &str = r#"{"name": "Gems", "rootFilter": {"operator": "and",
    "condition": {"signature": ["MISC"]}}}"#;

pub fn world() -> MemoryWorld {
    let mut load_order = LoadOrder::new();
    load_order.add_plugin("Skyrim.esm", false);
    let mut w = MemoryWorld::new(load_order);
    w.add_keyword("IsFood", IS_FOOD);

    let mut wheat = Form::new(WHEAT, Signature::Ingredient, ObjectType::Ingredient);
    wheat.name = "Wheat".into();
    wheat.value = 2;
    wheat.weight = 0.1;
    wheat.keywords.push(IS_FOOD);
    w.add_form(wheat);

    let mut nightshade = Form::new(NIGHTSHADE, Signature::Ingredient, ObjectType::Ingredient);
    nightshade.name = "Nightshade".into();
    nightshade.value = 8;
    nightshade.weight = 0.1;
    w.add_form(nightshade);

    let mut ruby = Form::new(RUBY, Signature::Misc, ObjectType::Gem);
    ruby.name = "Ruby".into();
    ruby.value = 900;
    ruby.weight = 0.1;
    w.add_form(ruby);

    w.add_form(Form::new(CHEST, Signature::Container, ObjectType::Unknown));
    w.add_form(Form::new(IRON_VEIN, Signature::Activator, ObjectType::OreVein));
    w
}

/// Group file with the given policy wrapped around `collections`.
pub fn group(action: &str, notify: bool, repeat: bool, collections: &[&str]) -> String {
    format!(
        r#"{{"groupPolicy": {{"action": "{action}", "notify": {notify}, "repeat": {repeat}}}, "collections": [{}]}}"#,
        collections.join(",")
    )
}

pub fn write_group(dir: &Path, name: &str, body: &str) {
    std::fs::write(dir.join(format!("SHSE.Collections.{name}.json")), body).unwrap();
}

pub struct Harness {
    pub dir: TempDir,
    pub world: Arc<MemoryWorld>,
    pub sink: Arc<RecordingEventSink>,
    pub registry: Arc<Registry>,
}

impl Harness {
    pub fn new(groups: &[(&str, String)], settings: LootingSettings) -> Self {
        let dir = tempfile::tempdir().unwrap();
        for (name, body) in groups {
            write_group(dir.path(), name, body);
        }
        let world = Arc::new(world());
        let sink = Arc::new(RecordingEventSink::new());
        let config = Arc::new(Config {
            definitions_dir: dir.path().to_path_buf(),
            world_file: dir.path().join("world.json"),
            scan_interval_secs: 0.0,
            collections_enabled: true,
            settings_file: None,
            passes: 1,
        });
        let registry = Arc::new(Registry::new(
            WorldPorts::from_memory(world.clone()),
            sink.clone(),
            settings,
            config.clone(),
        ));
        registry.load_definitions(&config.definitions_dir).unwrap();
        Self { dir, world, sink, registry }
    }
}
