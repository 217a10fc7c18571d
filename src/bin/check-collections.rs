use anyhow::Context;
use clap::Parser;
use harvest_engine::collections::CollectionManager;
use harvest_engine::looting::LogEventSink;
use harvest_engine::world::{LoadOrder, MemoryWorld};
use std::path::PathBuf;
use std::sync::Arc;

// cargo run --bin check-collections -- --definitions data/collections --world data/world.json

#[derive(Debug, Parser)]
#[command(name = "check-collections", version, about = "Validate collection definitions and print their members")]
struct Args {
    /// Directory holding the `*.Collections.<group>.json` files
    #[arg(long)]
    definitions: PathBuf,

    /// World snapshot to resolve members against (eg: "data/world.json")
    #[arg(long)]
    world: Option<PathBuf>,

    /// Plugins to use when no world snapshot is given, in load order
    #[arg(long = "plugin", default_value = "Skyrim.esm")]
    plugins: Vec<String>,

    /// Dump each definition as JSON instead of the readable form
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();

    let world = match &args.world {
        Some(path) => MemoryWorld::load(path).with_context(|| format!("loading world snapshot {}", path.display()))?,
        None => {
            let mut load_order = LoadOrder::new();
            for plugin in &args.plugins {
                load_order.add_plugin(plugin, plugin.ends_with(".esl"));
            }
            MemoryWorld::new(load_order)
        }
    };
    let world = Arc::new(world);

    let manager = CollectionManager::new(world.clone(), world.clone(), world.clone(), Arc::new(LogEventSink));
    let loaded = manager
        .process_definitions(&args.definitions)
        .with_context(|| format!("loading definitions from {}", args.definitions.display()))?;
    println!("{loaded} collections in {} files", manager.number_of_files());

    for label in manager.labels() {
        if args.json {
            if let Some(def) = manager.definition_json(&label) {
                println!("{}", serde_json::to_string_pretty(&def)?);
            }
        }
        if let Some(report) = manager.members_report(&label) {
            println!("{label}\n{report}");
        }
    }
    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, prelude::*};

    let _ = color_eyre::install();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(tracing_error::ErrorLayer::default())
        .init();
}
