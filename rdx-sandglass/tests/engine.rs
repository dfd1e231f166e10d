use chrono::Weekday;
use sandglass::events::{HourglassEvent, SystemEvent};
use sandglass::faces::FaceReadout;
use sandglass::prelude::*;
use sandglass::surface::MemorySurface;
use sandglass::time::FixedTimeSource;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

struct Harness {
    engine: SandglassEngine,
    surface: MemorySurface,
    source: Arc<FixedTimeSource>,
    runner: JoinHandle<anyhow::Result<()>>,
}

fn start(initial: TimeSample) -> Harness {
    let surface = MemorySurface::new(ContainerGeometry::new(200.0, 300.0));
    let source = Arc::new(FixedTimeSource::new(initial));
    let mut config = SandglassConfig::default();
    config.particles.seed = Some(5);
    let engine = SandglassEngine::with_time_source(config, surface.view(), source.clone());
    let handle = engine.clone();
    let runner = tokio::spawn(async move {
        handle
            .run_until(std::future::pending::<anyhow::Result<()>>())
            .await
    });
    Harness {
        engine,
        surface,
        source,
        runner,
    }
}

async fn settle(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

#[tokio::test(start_paused = true)]
async fn hourglass_follows_the_clock_and_selection() {
    let h = start(TimeSample::new(1, 0, 0, Weekday::Mon));
    let mut hourglass_rx = h.engine.subscribe_hourglass_events();
    settle(10).await;
    assert!(!h.engine.is_hourglass_active().await);

    h.engine.select_style(ClockStyle::Hourglass);
    match hourglass_rx.recv().await.unwrap() {
        HourglassEvent::Activated => {}
        other => panic!("expected activation, got {:?}", other),
    }
    settle(10).await;
    let state = h.surface.snapshot();
    assert_eq!(state.top_percent, Some(100.0));
    assert_eq!(state.bottom_percent, Some(0.0));
    assert_eq!(state.markers.len(), 60);
    assert_eq!(state.active_minute(), Some(0));
    assert_eq!(state.active_hour(), Some(5));

    h.source.set(TimeSample::new(1, 30, 0, Weekday::Mon));
    settle(1100).await;
    let state = h.surface.snapshot();
    assert_eq!(state.top_percent, Some(50.0));
    assert_eq!(state.bottom_percent, Some(50.0));
    assert_eq!(state.active_minute(), Some(30));
    assert!(h.engine.particle_stats().await.spawned > 0);
    assert!(h.surface.live_particles() > 0);

    h.engine.select_style(ClockStyle::Digital);
    settle(10).await;
    assert!(!h.engine.is_hourglass_active().await);
    let state = h.surface.snapshot();
    assert!(state.markers.is_empty());
    assert!(state.particles.is_empty());

    settle(3000).await;
    assert!(h.surface.snapshot().particles.is_empty());

    h.engine.shutdown();
    h.runner.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn faces_are_projected_for_the_selected_style() {
    let h = start(TimeSample::new(7, 5, 9, Weekday::Sun));
    let mut face_rx = h.engine.subscribe_face_events();
    let mut system_rx = h.engine.subscribe_system_events();
    settle(10).await;

    h.engine.select_style(ClockStyle::Digital);
    loop {
        let event = face_rx.recv().await.unwrap();
        if event.style != ClockStyle::Digital {
            continue;
        }
        assert_eq!(
            event.readout,
            FaceReadout::Digital {
                day: "SUN",
                hours: "07".into(),
                minutes: "05".into(),
                seconds: "09".into(),
            }
        );
        break;
    }

    let mut saw_change = false;
    while let Ok(event) = system_rx.try_recv() {
        if let SystemEvent::StyleChanged { from, to } = event {
            assert_eq!(from, ClockStyle::Analog);
            assert_eq!(to, ClockStyle::Digital);
            saw_change = true;
        }
    }
    assert!(saw_change);

    h.engine.shutdown();
    h.runner.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn shutdown_deactivates_the_hourglass() {
    let h = start(TimeSample::new(9, 10, 0, Weekday::Wed));
    h.engine.select_style(ClockStyle::Hourglass);
    settle(600).await;
    assert!(h.surface.live_particles() > 0);

    h.engine.shutdown();
    h.runner.await.unwrap().unwrap();
    let state = h.surface.snapshot();
    assert!(state.particles.is_empty());
    assert!(state.markers.is_empty());
}
