use anyhow::Result;
use sandglass::events::HourglassEvent;
use sandglass::prelude::*;
use sandglass::surface::MemorySurface;
use std::env;
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    // 2. Load the configuration: an optional TOML path as the first argument,
    //    then SANDGLASS__* environment overrides.
    let config_path = env::args().nth(1).map(PathBuf::from);
    let config = SandglassConfig::load(config_path.as_deref())?;
    info!("Loaded configuration: {:?}", config);

    // 3. Create the engine against an in-memory surface.
    let surface = MemorySurface::new(ContainerGeometry::new(200.0, 300.0));
    let engine = SandglassEngine::new(config, surface.view());

    // 4. Spawn concurrent tasks to listen to the event streams.
    spawn_event_listeners(&engine, surface);

    // 5. Show the hourglass and run until Ctrl+C.
    engine.select_style(ClockStyle::Hourglass);
    engine.run().await?;

    Ok(())
}

/// Spawns several tasks, each subscribing to a different event stream from the engine.
fn spawn_event_listeners(engine: &SandglassEngine, surface: MemorySurface) {
    let mut system_rx = engine.subscribe_system_events();
    tokio::spawn(async move {
        while let Ok(event) = system_rx.recv().await {
            info!("[SYSTEM] => {:?}", event);
        }
    });

    let mut hourglass_rx = engine.subscribe_hourglass_events();
    tokio::spawn(async move {
        while let Ok(event) = hourglass_rx.recv().await {
            match event {
                HourglassEvent::Updated {
                    sample,
                    fill,
                    particles,
                } => {
                    let state = surface.snapshot();
                    info!(
                        "[HOURGLASS] {:02}:{:02}:{:02} top {:5.1}% bottom {:5.1}% | grains live {} (spawned {}, retired {}) | hour slot {:?} minute slot {:?}",
                        sample.hours,
                        sample.minutes,
                        sample.seconds,
                        fill.top_percent(),
                        fill.bottom_percent(),
                        particles.live,
                        particles.spawned,
                        particles.retired,
                        state.active_hour(),
                        state.active_minute(),
                    );
                }
                other => info!("[HOURGLASS] => {:?}", other),
            }
        }
    });

    let mut face_rx = engine.subscribe_face_events();
    tokio::spawn(async move {
        while let Ok(event) = face_rx.recv().await {
            debug!("[FACE:{}] => {:?}", event.style, event.readout);
        }
    });
}
