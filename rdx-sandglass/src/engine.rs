//! The core engine that orchestrates the entire Sandglass system.

use crate::config::SandglassConfig;
use crate::controller::{HourglassController, Transition};
use crate::events::{FaceEvent, HourglassEvent, SystemEvent};
use crate::faces::{self, ClockStyle};
use crate::stream::StreamStats;
use crate::surface::HourglassView;
use crate::time::{LocalTimeSource, SystemClock, TickEvent, TimeSample, TimeSource};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{broadcast, watch, Mutex};
use tracing::{debug, error, info, trace};

/// The main Sandglass engine.
///
/// This struct is the central point of control. It holds the configuration,
/// the injected time source and the hourglass controller, and drives the
/// event loop. The engine is designed to be cloned and shared across tasks,
/// providing a handle to the running instance.
#[derive(Clone)]
pub struct SandglassEngine {
    config: Arc<SandglassConfig>,
    time_source: Arc<dyn TimeSource>,
    tick_sender: broadcast::Sender<Arc<TickEvent>>,
    system_event_sender: broadcast::Sender<SystemEvent>,
    hourglass_event_sender: broadcast::Sender<HourglassEvent>,
    face_event_sender: broadcast::Sender<FaceEvent>,
    shutdown_sender: broadcast::Sender<()>,
    style_sender: Arc<watch::Sender<ClockStyle>>,
    controller: Arc<Mutex<HourglassController>>,
}

/// State the dispatcher carries from one tick to the next.
struct DispatchState {
    style: ClockStyle,
    previous_sample: Option<TimeSample>,
}

// Core implementation block for internal logic.
impl SandglassEngine {
    /// Creates an engine that reads the host's local clock.
    pub fn new(config: SandglassConfig, view: HourglassView) -> Self {
        Self::with_time_source(config, view, Arc::new(LocalTimeSource))
    }

    /// Creates an engine with an explicit time source.
    pub fn with_time_source(
        config: SandglassConfig,
        view: HourglassView,
        time_source: Arc<dyn TimeSource>,
    ) -> Self {
        const CHANNEL_CAPACITY: usize = 256;
        let (tick_sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        let (system_event_sender, _) = broadcast::channel(64);
        let (hourglass_event_sender, _) = broadcast::channel(64);
        let (face_event_sender, _) = broadcast::channel(64);
        let (shutdown_sender, _) = broadcast::channel(1);
        let (style_sender, _) = watch::channel(config.initial_style);

        let controller = HourglassController::new(&config, view);

        Self {
            config: Arc::new(config),
            time_source,
            tick_sender,
            system_event_sender,
            hourglass_event_sender,
            face_event_sender,
            shutdown_sender,
            style_sender: Arc::new(style_sender),
            controller: Arc::new(Mutex::new(controller)),
        }
    }

    /// Runs the engine until Ctrl+C or `shutdown` is called.
    pub async fn run(&self) -> anyhow::Result<()> {
        self.run_until(async { tokio::signal::ctrl_c().await.map_err(anyhow::Error::from) })
            .await
    }

    /// Runs the engine until `signal` resolves or `shutdown` is called.
    ///
    /// This method will:
    /// 1. Spawn the `SystemClock` task.
    /// 2. Spawn the dispatcher task that reacts to ticks and style changes.
    /// 3. Wait for the shutdown signal, then stop both and deactivate the hourglass.
    pub async fn run_until<F>(&self, signal: F) -> anyhow::Result<()>
    where
        F: Future<Output = anyhow::Result<()>>,
    {
        info!("SandglassEngine starting up...");
        let mut stop_rx = self.shutdown_sender.subscribe();

        let tick_rx = self.tick_sender.subscribe();
        let dispatcher = self.clone();
        let dispatcher_shutdown_rx = self.shutdown_sender.subscribe();
        let dispatcher_handle = tokio::spawn(async move {
            dispatcher
                .dispatcher_loop(tick_rx, dispatcher_shutdown_rx)
                .await
        });

        let clock = SystemClock::new(
            self.config.tick_interval(),
            self.time_source.clone(),
            self.tick_sender.clone(),
        );
        let clock_shutdown_rx = self.shutdown_sender.subscribe();
        let clock_handle = tokio::spawn(async move { clock.run(clock_shutdown_rx).await });

        info!(
            "Engine running with a {:?} tick and {} fps particles.",
            self.config.tick_interval(),
            self.config.resolution.frames_per_second()
        );

        let outcome = tokio::select! {
            result = signal => result,
            _ = stop_rx.recv() => Ok(()),
        };

        info!("Shutdown signal received. Broadcasting to all tasks...");
        if self.shutdown_sender.send(()).is_err() {
            error!("Failed to send shutdown signal. Some tasks may not terminate gracefully.");
        }
        dispatcher_handle.await.ok();
        clock_handle.await.ok();

        if let Some(stats) = self.controller.lock().await.deactivate() {
            self.hourglass_event_sender
                .send(HourglassEvent::Deactivated { particles: stats })
                .ok();
        }
        self.system_event_sender
            .send(SystemEvent::EngineShutdown)
            .ok();
        info!("SandglassEngine has shut down.");
        outcome
    }

    #[doc(hidden)]
    async fn dispatcher_loop(
        self,
        mut tick_rx: broadcast::Receiver<Arc<TickEvent>>,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) {
        let mut style_rx = self.style_sender.subscribe();
        self.system_event_sender
            .send(SystemEvent::EngineStarted {
                timestamp: tokio::time::Instant::now(),
            })
            .ok();

        let initial = *style_rx.borrow_and_update();
        let mut state = DispatchState {
            style: initial,
            previous_sample: None,
        };
        self.apply_transition(initial).await;

        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => break,
                changed = style_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let next = *style_rx.borrow_and_update();
                    self.process_style_change(&mut state, next).await;
                }
                Ok(tick) = tick_rx.recv() => {
                    trace!("Tick #{} received.", tick.tick_count);
                    self.process_tick(&mut state, tick.sample).await;
                }
            }
        }
    }

    #[doc(hidden)]
    async fn process_style_change(&self, state: &mut DispatchState, next: ClockStyle) {
        if next == state.style {
            return;
        }
        info!("Clock style changed: {} -> {}.", state.style, next);
        self.system_event_sender
            .send(SystemEvent::StyleChanged {
                from: state.style,
                to: next,
            })
            .ok();
        state.style = next;
        state.previous_sample = None;
        self.apply_transition(next).await;
        // Show the new face right away instead of waiting for the next tick.
        if next != ClockStyle::Hourglass {
            let sample = self.time_source.sample();
            self.process_tick(state, sample).await;
        }
    }

    #[doc(hidden)]
    async fn apply_transition(&self, style: ClockStyle) {
        let mut controller = self.controller.lock().await;
        let sample = self.time_source.sample();
        match controller.on_style_change(style, &sample) {
            Transition::Activated => {
                self.hourglass_event_sender
                    .send(HourglassEvent::Activated)
                    .ok();
                if let Some(fill) = controller.tick(&sample) {
                    self.hourglass_event_sender
                        .send(HourglassEvent::Updated {
                            sample,
                            fill,
                            particles: controller.stream_stats(),
                        })
                        .ok();
                }
            }
            Transition::Deactivated(stats) => {
                self.hourglass_event_sender
                    .send(HourglassEvent::Deactivated { particles: stats })
                    .ok();
            }
            Transition::Unchanged => debug!("Style {} needs no hourglass transition.", style),
        }
    }

    #[doc(hidden)]
    async fn process_tick(&self, state: &mut DispatchState, sample: TimeSample) {
        if state.style == ClockStyle::Hourglass {
            let mut controller = self.controller.lock().await;
            if let Some(fill) = controller.tick(&sample) {
                self.hourglass_event_sender
                    .send(HourglassEvent::Updated {
                        sample,
                        fill,
                        particles: controller.stream_stats(),
                    })
                    .ok();
            }
        } else if let Some(readout) =
            faces::project(state.style, &sample, state.previous_sample.as_ref())
        {
            self.face_event_sender
                .send(FaceEvent {
                    style: state.style,
                    sample,
                    readout,
                })
                .ok();
        }
        state.previous_sample = Some(sample);
    }
}

// Public API implementation block.
impl SandglassEngine {
    /// Selects the clock style. The running engine reacts to transitions into
    /// and out of the hourglass; selecting the current style again is ignored.
    pub fn select_style(&self, style: ClockStyle) {
        self.style_sender.send_replace(style);
    }

    /// The most recently selected style.
    pub fn current_style(&self) -> ClockStyle {
        *self.style_sender.borrow()
    }

    /// Asks a running engine to shut down.
    pub fn shutdown(&self) {
        self.shutdown_sender.send(()).ok();
    }

    pub fn config(&self) -> &SandglassConfig {
        &self.config
    }

    pub fn time_source(&self) -> Arc<dyn TimeSource> {
        self.time_source.clone()
    }

    /// Particle counters of the hourglass, zero while it is inactive.
    pub async fn particle_stats(&self) -> StreamStats {
        self.controller.lock().await.stream_stats()
    }

    pub async fn is_hourglass_active(&self) -> bool {
        self.controller.lock().await.is_active()
    }

    /// Subscribes to the raw `TickEvent` stream.
    pub fn subscribe_tick_events(&self) -> broadcast::Receiver<Arc<TickEvent>> {
        self.tick_sender.subscribe()
    }

    /// Subscribes to the `SystemEvent` stream.
    pub fn subscribe_system_events(&self) -> broadcast::Receiver<SystemEvent> {
        self.system_event_sender.subscribe()
    }

    /// Subscribes to the `HourglassEvent` stream.
    pub fn subscribe_hourglass_events(&self) -> broadcast::Receiver<HourglassEvent> {
        self.hourglass_event_sender.subscribe()
    }

    /// Subscribes to the `FaceEvent` stream.
    pub fn subscribe_face_events(&self) -> broadcast::Receiver<FaceEvent> {
        self.face_event_sender.subscribe()
    }
}
