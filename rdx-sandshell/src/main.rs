mod clock;
mod render;

use anyhow::Result;
use clock::{parse_clock_time, ShellClock};
use colored::Colorize;
use rustyline::highlight::Highlighter;
use rustyline::Editor;
use rustyline_derive::{Completer, Helper, Hinter, Validator};
use sandglass::events::FaceEvent;
use sandglass::prelude::*;
use sandglass::surface::MemorySurface;
use sandglass::{ENGINE_NAME, VERSION as LIB_VERSION};
use std::borrow::Cow;
use std::env;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

const SHELL_VERSION: &str = env!("CARGO_PKG_VERSION");

const LOGO_TEXT: &str = r"
   ____                  _       _
  / ___|  __ _ _ __   __| | __ _| | __ _ ___ ___
  \___ \ / _` | '_ \ / _` |/ _` | |/ _` / __/ __|
   ___) | (_| | | | | (_| | (_| | | (_| \__ \__ \
  |____/ \__,_|_| |_|\__,_|\__, |_|\__,_|___/___/
                           |___/
";

/// A custom helper struct for rustyline that enables syntax highlighting.
#[derive(Completer, Helper, Hinter, Validator)]
struct MyHighlighter;

impl Highlighter for MyHighlighter {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if let Some((command, rest)) = line.split_once(' ') {
            Cow::Owned(format!("{} {}", command.yellow().bold(), rest.yellow()))
        } else {
            Cow::Owned(line.yellow().bold().to_string())
        }
    }
    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

fn print_banner() {
    if env::var("QUIET_MODE").is_ok() {
        return;
    }
    println!("{}", LOGO_TEXT.cyan());
    let version_string = format!(
        "          Shell   v{:<8} Library   v{:<8}",
        SHELL_VERSION, LIB_VERSION
    );
    println!("{}", "-".repeat(64).dimmed());
    println!("{}", version_string);
    println!(
        "{}",
        "    Distributed under the MIT OR Apache-2.0 license. Use at your own risk.".dimmed()
    );
    println!("{}", "-".repeat(64).dimmed());
}

/// Prints face readouts while the shared flag is set.
fn spawn_face_listener(engine: &SandglassEngine, is_watching_faces: Arc<AtomicBool>) {
    let mut face_rx = engine.subscribe_face_events();
    tokio::spawn(async move {
        while let Ok(event) = face_rx.recv().await {
            if is_watching_faces.load(Ordering::Relaxed) {
                println!("<-- [{}] {}", event.style.to_string().cyan(), describe_face(&event));
            }
        }
    });
}

fn describe_face(event: &FaceEvent) -> String {
    match &event.readout {
        FaceReadout::Digital {
            day,
            hours,
            minutes,
            seconds,
        } => format!("{} {}:{}:{}", day, hours, minutes, seconds),
        FaceReadout::Analog {
            hour_degrees,
            minute_degrees,
            second_degrees,
        } => format!(
            "hour {:.1}deg minute {:.1}deg second {:.1}deg",
            hour_degrees, minute_degrees, second_degrees
        ),
        FaceReadout::Circular {
            hours,
            minutes,
            seconds,
            hour_arc,
            minute_arc,
            second_arc,
        } => format!(
            "{}:{}:{} arcs {:.0}/{:.0}/{:.0}",
            hours, minutes, seconds, hour_arc, minute_arc, second_arc
        ),
        FaceReadout::Flip { cards } => cards
            .iter()
            .map(|c| {
                if c.flipped {
                    format!("[{}]", c.value)
                } else {
                    format!(" {} ", c.value)
                }
            })
            .collect::<Vec<_>>()
            .join(" "),
    }
}

async fn show_hourglass(engine: &SandglassEngine, surface: &MemorySurface) {
    if !engine.is_hourglass_active().await {
        println!("The hourglass is not shown. Try 'style hourglass'.");
        return;
    }
    let state = surface.snapshot();
    for line in render::render_hourglass(&state, &engine.config().particles) {
        println!("    {}", line.yellow());
    }
    println!(
        "    top {:5.1}%  bottom {:5.1}%",
        state.top_percent.unwrap_or(0.0),
        state.bottom_percent.unwrap_or(0.0)
    );
    println!("    dial {}", render::render_dial(&state).cyan());
}

fn print_help() {
    println!("Available commands:");
    println!("  style <NAME>          - Selects a clock style.");
    println!("  styles                - Lists the clock styles.");
    println!("  show                  - Draws the hourglass and its dial.");
    println!("  stats                 - Shows particle counters.");
    println!("  time set <HH:MM[:SS]> - Pins the clock to a time of day.");
    println!("  time live             - Returns to the host clock.");
    println!("  start faces           - Prints face readouts every tick.");
    println!("  stop faces            - Stops printing face readouts.");
    println!("  exit                  - Quits the shell.");
}

#[tokio::main]
async fn main() -> Result<()> {
    print_banner();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    let config_path = env::var_os("SANDGLASS_CONFIG").map(PathBuf::from);
    let config = SandglassConfig::load(config_path.as_deref())?;
    let surface = MemorySurface::new(ContainerGeometry::new(200.0, 300.0));
    let clock = Arc::new(ShellClock::default());
    let engine = SandglassEngine::with_time_source(config, surface.view(), clock.clone());
    let engine_handle = engine.clone();

    let is_watching_faces = Arc::new(AtomicBool::new(false));
    spawn_face_listener(&engine_handle, is_watching_faces.clone());

    info!("Spawning {} in the background...", ENGINE_NAME);
    let runner = tokio::spawn(async move {
        if let Err(e) = engine.run().await {
            eprintln!("\nEngine stopped with an error: {}", e);
        }
    });

    tokio::time::sleep(Duration::from_millis(100)).await;

    let mut rl = Editor::new()?;
    rl.set_helper(Some(MyHighlighter));

    println!(
        "{} is running with the {} style. Type 'help' for commands or 'exit' to quit.",
        ENGINE_NAME.cyan(),
        engine_handle.current_style()
    );

    loop {
        let prompt = format!("{}", ">> ".cyan().bold());
        let line = match rl.readline(&prompt) {
            Ok(line) => line,
            Err(_) => {
                println!("Exiting sandshell...");
                break;
            }
        };
        rl.add_history_entry(line.as_str())?;
        let args = line.split_whitespace().collect::<Vec<_>>();
        let Some(command) = args.first() else {
            continue;
        };

        match *command {
            "style" => match args.get(1).map(|name| name.parse::<ClockStyle>()) {
                Some(Ok(style)) => {
                    engine_handle.select_style(style);
                    println!("--> Selected the {} style.", style);
                }
                Some(Err(e)) => println!("Error: {}. Use 'styles' to list them.", e),
                None => println!("Usage: style <NAME>"),
            },
            "styles" => {
                let current = engine_handle.current_style();
                for style in ClockStyle::ALL {
                    let marker = if style == current { "*" } else { " " };
                    println!("  {} {}", marker, style);
                }
            }
            "show" => show_hourglass(&engine_handle, &surface).await,
            "stats" => {
                let stats = engine_handle.particle_stats().await;
                println!(
                    "Grains: {} live, {} spawned, {} retired.",
                    stats.live, stats.spawned, stats.retired
                );
            }
            "time" => match (args.get(1), args.get(2)) {
                (Some(&"set"), Some(text)) => match parse_clock_time(text) {
                    Some(sample) => {
                        clock.pin(sample);
                        println!("--> Clock pinned to {}.", text);
                    }
                    None => println!("Error: '{}' is not a valid HH:MM[:SS] time.", text),
                },
                (Some(&"live"), _) => {
                    clock.unpin();
                    println!("--> Following the host clock.");
                }
                _ => println!("Usage: time set <HH:MM[:SS]> | time live"),
            },
            "start" => {
                if let Some(&"faces") = args.get(1) {
                    is_watching_faces.store(true, Ordering::Relaxed);
                    println!("--> Started printing face readouts.");
                } else {
                    println!("Unknown 'start' command. Try 'start faces'.");
                }
            }
            "stop" => {
                if let Some(&"faces") = args.get(1) {
                    is_watching_faces.store(false, Ordering::Relaxed);
                    println!("--> Stopped printing face readouts.");
                } else {
                    println!("Unknown 'stop' command. Try 'stop faces'.");
                }
            }
            "help" => print_help(),
            "exit" => break,
            _ => println!("Unknown command: '{}'. Type 'help'.", line.trim()),
        }
    }

    engine_handle.shutdown();
    runner.await.ok();
    Ok(())
}
