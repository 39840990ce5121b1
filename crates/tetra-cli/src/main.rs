//! tetra: headless host for the tetra sequencing engine
//!
//! Usage: `tetra [config.toml]`. Without an argument the config is read from
//! the user config directory; without a config file built-in defaults apply.

mod config;

use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;
use tetra_core::{create_sequencer, note_name, NoteEvent, SequencerState};
use tetra_services::{apply_all, ClockDriver, Command, OfflineTicks, TickBatch};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::SessionConfig;

#[derive(Serialize)]
struct EventLine<'a> {
    master_tick: u64,
    step_secs: f64,
    #[serde(flatten)]
    event: &'a NoteEvent,
}

fn print_batch(out: &mut impl Write, batch: &TickBatch, json: bool) -> Result<()> {
    for event in batch.events.iter().filter(|e| e.gate) {
        if json {
            let line = EventLine { master_tick: batch.master_tick, step_secs: batch.step_secs, event };
            writeln!(out, "{}", serde_json::to_string(&line)?)?;
        } else {
            writeln!(
                out,
                "{:>6}  out {}  {:<4} vel {:>3}  mod {:.2}  len {:.2}  x{}{}",
                batch.master_tick,
                event.output + 1,
                note_name(event.pitch),
                event.velocity,
                event.modulation,
                event.gate_length,
                event.ratchet_count,
                if event.slide > 0.0 { format!("  slide {:.2}s", event.slide) } else { String::new() },
            )?;
        }
    }
    Ok(())
}

fn run_offline(state: &SequencerState, config: &SessionConfig) -> Result<()> {
    let mut out = io::stdout().lock();
    for batch in OfflineTicks::new(state, config.ticks, &[]) {
        print_batch(&mut out, &batch, config.json)?;
    }
    Ok(())
}

fn run_realtime(state: SequencerState, config: &SessionConfig) -> Result<()> {
    let mut driver = ClockDriver::new(state);
    let events = driver.events();
    driver.start().context("Failed to start clock")?;
    driver.send(Command::SetPlaying(true))?;

    let timeout = Duration::from_secs(2);
    let mut out = io::stdout().lock();
    for _ in 0..config.ticks {
        let batch = events.recv_timeout(timeout).context("Clock stalled")?;
        print_batch(&mut out, &batch, config.json)?;
        out.flush()?;
    }

    driver.stop()?;
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("tetra=info".parse()?))
        .init();

    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(config::config_path);
    let config = config::load_config(&path);

    let commands = config.commands().context("Invalid track config")?;
    let state = apply_all(&create_sequencer(), &commands);

    tracing::info!(
        seed = config.seed,
        bpm = state.transport.bpm,
        ticks = config.ticks,
        realtime = config.realtime,
        "Starting session"
    );

    if config.realtime {
        run_realtime(state, &config)
    } else {
        run_offline(&state, &config)
    }
}
