use swipe_conductor::chord_table::{default_arrangement, load_arrangement};
use swipe_conductor::console_display;
use swipe_conductor::coordinator;
use swipe_conductor::data_logger;
use swipe_conductor::osc_sender;
use swipe_conductor::session_reader::{self, SessionReader};
use swipe_conductor::simulator;
use swipe_conductor::types::*;

use clap::Parser;
use crossbeam_channel::{bounded, unbounded};
use log::{error, info};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::process;
use std::thread;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "swipe-conductor")]
#[command(about = "Turns swipe gestures into notes, chords and phrases")]
struct Cli {
    /// Simulator script: "basic" (default), "chords" (every zone and finger count), or "improv"
    #[arg(long, default_value = "basic")]
    demo: String,

    /// Replay a recorded gestures.jsonl instead of simulating
    #[arg(long)]
    replay: Option<PathBuf>,

    /// Arrangement JSON (name, chord_table, sequence); built-in E major if omitted
    #[arg(long)]
    arrangement: Option<PathBuf>,

    /// Simulated surface width (points)
    #[arg(long, default_value_t = 400.0)]
    surface_width: f64,

    /// Simulated surface height (points)
    #[arg(long, default_value_t = 600.0)]
    surface_height: f64,

    /// Gesture sample rate of the simulator (Hz)
    #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u32).range(1..=simulator::MAX_SAMPLE_RATE_HZ as i64))]
    sample_rate: u32,

    /// Quiet time that ends a phrase (ms)
    #[arg(long, default_value_t = RELEASE_TIME.as_millis() as u64)]
    release_ms: u64,

    /// Enable OSC output
    #[arg(long)]
    osc: bool,

    /// OSC target address
    #[arg(long, default_value = "127.0.0.1:9000")]
    osc_target: String,

    /// Record the session (gestures + events)
    #[arg(long)]
    log_data: bool,

    /// Output directory for recorded sessions
    #[arg(long, default_value = "./sessions")]
    output_dir: PathBuf,

    /// Enable console display
    #[arg(long)]
    console: bool,
}

fn main() {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    )
    .format_timestamp_millis()
    .init();

    let cli = Cli::parse();

    let arrangement = match &cli.arrangement {
        Some(path) => load_arrangement(path).unwrap_or_else(|e| {
            error!("{}", e);
            process::exit(1);
        }),
        None => default_arrangement(),
    };
    let surface = SurfaceBounds::new(cli.surface_width, cli.surface_height).unwrap_or_else(|e| {
        error!("{}", e);
        process::exit(1);
    });
    let variant_count = arrangement.chord_table.variant_count();
    if cli.replay.is_none() {
        let needed = simulator::demo_required_variants(&cli.demo);
        if variant_count < needed {
            error!(
                "Demo {:?} needs {} chord variants, arrangement {:?} has {}",
                cli.demo, needed, arrangement.name, variant_count
            );
            process::exit(1);
        }
    }
    let clock = SessionClock::new();

    info!("═══════════════════════════════════════════════");
    info!("  SWIPE CONDUCTOR v{}", env!("CARGO_PKG_VERSION"));
    info!("  Arrangement: {}", arrangement.name);
    info!(
        "  Table: {} variants × {} chords × {} steps, sequence {:?}",
        arrangement.chord_table.variant_count(),
        arrangement.chord_table.chord_count(),
        arrangement.chord_table.step_count(),
        arrangement.sequence.steps()
    );
    match &cli.replay {
        Some(path) => info!("  Mode: REPLAY {:?}", path),
        None => info!("  Mode: SIMULATOR ({})", cli.demo),
    }
    if cli.osc { info!("  Output: OSC → {}", cli.osc_target); }
    if cli.console { info!("  Output: Console monitor"); }
    info!("═══════════════════════════════════════════════");

    // Channel: gesture source → coordinator
    let (input_tx, input_rx) = bounded::<GestureFrame>(4096);

    // Channels: coordinator → consumers
    let mut event_txs: Vec<crossbeam_channel::Sender<ConductorEvent>> = Vec::new();

    // Gesture recording channel
    let (gesture_log_tx, gesture_log_rx) = unbounded::<GestureFrame>();

    let mut handles = Vec::new();

    // ─── Console display ────────────────────────────────────────────
    if cli.console {
        let (tx, rx) = bounded::<ConductorEvent>(1024);
        event_txs.push(tx);
        let regions = arrangement.chord_table.chord_count();
        handles.push(spawn("display", move || {
            console_display::ConsoleDisplay::new(rx, regions, 4).run();
        }));
    }

    // ─── OSC sender ─────────────────────────────────────────────────
    if cli.osc {
        let (tx, rx) = bounded::<ConductorEvent>(1024);
        event_txs.push(tx);
        let target = cli.osc_target.clone();
        handles.push(spawn("osc", move || {
            osc_sender::OscSender::new(rx, target).run();
        }));
    }

    // ─── Data logger ────────────────────────────────────────────────
    if cli.log_data {
        let (tx, rx) = bounded::<ConductorEvent>(4096);
        match data_logger::DataLogger::new(
            rx,
            gesture_log_rx,
            &cli.output_dir,
            arrangement.clone(),
            cli.sample_rate,
        ) {
            Ok(logger) => {
                event_txs.push(tx);
                handles.push(spawn("logger", move || logger.run()));
            }
            Err(e) => error!("Session recording disabled: {}", e),
        }
    }

    // ─── Coordinator ────────────────────────────────────────────────
    let gesture_tx = if cli.log_data { Some(gesture_log_tx) } else { None };
    let mut coord = match coordinator::Coordinator::new(
        input_rx,
        event_txs,
        gesture_tx,
        arrangement,
        clock.clone(),
    ) {
        Ok(c) => c.with_release_time(Duration::from_millis(cli.release_ms)),
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    };
    handles.push(spawn("coordinator", move || coord.run()));

    // ─── Input source ───────────────────────────────────────────────
    match cli.replay {
        Some(path) => {
            let frames = match File::open(&path)
                .map_err(|e| format!("open {:?}: {}", path, e))
                .and_then(|f| SessionReader::open(BufReader::new(f)))
                .map(|r| r.with_variant_count(variant_count))
            {
                Ok(reader) => {
                    info!("Session recorded with {:?}", reader.header.arrangement_name);
                    reader.read_all()
                }
                Err(e) => {
                    error!("{}", e);
                    Vec::new()
                }
            };
            handles.push(spawn("replay", move || {
                session_reader::replay(&frames, &input_tx);
            }));
        }
        None => {
            let demo = cli.demo.clone();
            let rate = cli.sample_rate;
            handles.push(spawn("simulator", move || {
                simulator::Simulator::new(clock, input_tx, surface, rate).run(&demo);
            }));
        }
    }

    // Each stage exits once its input channel closes.
    let mut failed = false;
    for h in handles {
        let name = h.thread().name().unwrap_or("worker").to_string();
        if h.join().is_err() {
            error!("{} thread panicked", name);
            failed = true;
        }
    }
    if failed {
        process::exit(1);
    }
    info!("Done.");
}

fn spawn<F: FnOnce() + Send + 'static>(name: &str, f: F) -> thread::JoinHandle<()> {
    thread::Builder::new()
        .name(name.into())
        .spawn(f)
        .unwrap_or_else(|e| {
            error!("Failed to spawn {} thread: {}", name, e);
            process::exit(1);
        })
}
