use anyhow::Context;
use harvest_engine::{
    Registry, ScanWorker, config,
    looting::{LootingSettings, RecordingEventSink, events::Event},
    world::{MemoryWorld, WorldPorts},
};
use std::sync::Arc;
use tokio::sync::watch;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cfg = Arc::new(config::Config::from_env()?);

    let settings = match &cfg.settings_file {
        Some(path) => LootingSettings::load(path)?,
        None => LootingSettings::default(),
    };

    let world = Arc::new(
        MemoryWorld::load(&cfg.world_file)
            .with_context(|| format!("loading world snapshot {}", cfg.world_file.display()))?,
    );

    // The runner plays the script layer: it drains emitted events after each pass
    let sink = Arc::new(RecordingEventSink::new());
    let registry = Arc::new(Registry::new(
        WorldPorts::from_memory(world.clone()),
        sink.clone(),
        settings,
        cfg.clone(),
    ));

    if let Err(e) = registry.load_definitions(&cfg.definitions_dir) {
        tracing::warn!(error = %e, "collections inactive");
    }

    let (stop_tx, stop_rx) = watch::channel(false);
    let passes = cfg.passes;
    let mut done = 0u32;
    let worker = ScanWorker::new(registry.clone());
    tracing::info!(delay = ?worker.delay(), passes, "harvest engine running");

    let mut worker_jh = worker.spawn(stop_rx, move |registry, report| {
        done += 1;
        for (refr, verdict) in &report {
            tracing::info!(pass = done, %refr, %verdict, "verdict");
        }
        play_events(registry, &world, &sink);
        if done >= passes {
            let _ = stop_tx.send(true);
        }
    });

    tokio::select! {
        res = &mut worker_jh => {
            if let Err(e) = res {
                tracing::error!(error = %e, "scan worker failed");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupted");
            worker_jh.abort();
        }
    }

    registry.collections.print_memberships();
    Ok(())
}

/// Completes what the script layer would do with each event.
fn play_events(registry: &Registry, world: &MemoryWorld, sink: &RecordingEventSink) {
    for event in sink.take() {
        match event {
            Event::Harvest { target, silent, .. } => {
                if let Some(refr) = world.remove_reference(target) {
                    world.add_to_inventory(refr.base);
                    registry.on_harvest_complete(target, refr.base, silent);
                }
            }
            Event::TheftCheck { target } => {
                if let Some(refr) = world.reference(target) {
                    let verdict = registry.on_theft_check_passed(&refr);
                    tracing::info!(%target, %verdict, "theft went unnoticed");
                }
            }
            Event::Notification(text) => tracing::info!("{text}"),
            other => tracing::debug!(?other, "event"),
        }
    }
}

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, prelude::*};

    let _ = color_eyre::install();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info,harvest_engine=debug"))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(tracing_error::ErrorLayer::default())
        .init();
}
