//! Real-time clock thread that owns the sequencer state
//!
//! The thread is the only writer: it applies queued commands between ticks,
//! ticks at a 16th note of the current tempo while the transport plays, and
//! publishes a snapshot for readers after every change.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use serde::Serialize;
use tetra_core::{tick, NoteEvent, SequencerState};
use thiserror::Error;
use tracing::{debug, info, trace, warn};

use crate::command::Command;

/// Batches buffered for a slow consumer before new ones are dropped
pub const DEFAULT_BATCH_CAPACITY: usize = 256;

/// How often a stopped transport checks for shutdown
const IDLE_POLL: Duration = Duration::from_millis(20);

#[derive(Debug, Error)]
pub enum ClockError {
    #[error("Clock already running")]
    AlreadyRunning,
    #[error("Clock not running")]
    NotRunning,
    #[error("Clock thread disconnected")]
    Disconnected,
    #[error("Failed to spawn clock thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Events of one master tick, with the step length they were played at
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickBatch {
    pub master_tick: u64,
    pub events: Vec<NoteEvent>,
    /// Seconds until the next tick
    pub step_secs: f64,
}

impl TickBatch {
    pub fn step_duration(&self) -> Duration {
        Duration::from_secs_f64(self.step_secs)
    }
}

struct Worker {
    commands: Sender<Command>,
    handle: JoinHandle<()>,
}

/// Timing driver for one sequencer session
pub struct ClockDriver {
    snapshot: Arc<Mutex<SequencerState>>,
    running: Arc<AtomicBool>,
    batch_tx: Sender<TickBatch>,
    batch_rx: Receiver<TickBatch>,
    worker: Option<Worker>,
}

impl ClockDriver {
    pub fn new(state: SequencerState) -> Self {
        Self::with_capacity(state, DEFAULT_BATCH_CAPACITY)
    }

    pub fn with_capacity(state: SequencerState, capacity: usize) -> Self {
        let (batch_tx, batch_rx) = bounded(capacity.max(1));
        Self {
            snapshot: Arc::new(Mutex::new(state)),
            running: Arc::new(AtomicBool::new(false)),
            batch_tx,
            batch_rx,
            worker: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Receiver for tick batches; clones share one queue
    pub fn events(&self) -> Receiver<TickBatch> {
        self.batch_rx.clone()
    }

    pub fn with_state<F, R>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&SequencerState) -> R,
    {
        self.snapshot.lock().ok().map(|s| f(&s))
    }

    /// Latest published state
    pub fn snapshot(&self) -> Option<SequencerState> {
        self.with_state(SequencerState::clone)
    }

    /// Queue a command for the clock thread
    pub fn send(&self, command: Command) -> Result<(), ClockError> {
        let worker = self.worker.as_ref().ok_or(ClockError::NotRunning)?;
        worker.commands.send(command).map_err(|_| ClockError::Disconnected)
    }

    pub fn start(&mut self) -> Result<(), ClockError> {
        if self.worker.is_some() {
            return Err(ClockError::AlreadyRunning);
        }

        let (commands, command_rx) = unbounded();
        let snapshot = self.snapshot.clone();
        let running = self.running.clone();
        let batch_tx = self.batch_tx.clone();
        running.store(true, Ordering::SeqCst);

        let handle = thread::Builder::new()
            .name("tetra-clock".into())
            .spawn(move || Self::run_loop(command_rx, batch_tx, snapshot, running))
            .inspect_err(|_| self.running.store(false, Ordering::SeqCst))?;

        self.worker = Some(Worker { commands, handle });
        info!("Clock started");
        Ok(())
    }

    pub fn stop(&mut self) -> Result<(), ClockError> {
        let worker = self.worker.take().ok_or(ClockError::NotRunning)?;
        self.running.store(false, Ordering::SeqCst);
        drop(worker.commands);
        worker.handle.join().map_err(|_| ClockError::Disconnected)?;
        info!("Clock stopped");
        Ok(())
    }

    fn publish(snapshot: &Mutex<SequencerState>, state: &SequencerState) {
        if let Ok(mut shared) = snapshot.lock() {
            *shared = state.clone();
        }
    }

    fn apply(state: &SequencerState, command: &Command) -> SequencerState {
        if let Err(e) = command.validate(state) {
            warn!(error = %e, ?command, "Command ignored");
            return state.clone();
        }
        debug!(?command, "Command applied");
        command.apply(state)
    }

    fn run_loop(
        commands: Receiver<Command>,
        batches: Sender<TickBatch>,
        snapshot: Arc<Mutex<SequencerState>>,
        running: Arc<AtomicBool>,
    ) {
        let mut state = match snapshot.lock() {
            Ok(shared) => shared.clone(),
            Err(_) => return,
        };
        let mut deadline = Instant::now();

        while running.load(Ordering::SeqCst) {
            let timeout = if state.transport.playing {
                deadline.saturating_duration_since(Instant::now())
            } else {
                IDLE_POLL
            };

            match commands.recv_timeout(timeout) {
                Ok(command) => {
                    let was_playing = state.transport.playing;
                    state = Self::apply(&state, &command);
                    if state.transport.playing && !was_playing {
                        deadline = Instant::now();
                    }
                    Self::publish(&snapshot, &state);
                    continue;
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }

            if !state.transport.playing {
                continue;
            }

            let step = state.transport.step_duration();
            let master_tick = state.transport.master_tick;
            let result = tick(&state);
            state = result.state;
            Self::publish(&snapshot, &state);

            let batch = TickBatch { master_tick, events: result.events, step_secs: step.as_secs_f64() };
            match batches.try_send(batch) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => trace!(master_tick, "Batch dropped, consumer lagging"),
                Err(TrySendError::Disconnected(_)) => break,
            }

            deadline += step;
            let now = Instant::now();
            if deadline + step < now {
                // Fell more than a step behind; resync instead of bursting
                deadline = now;
            }
        }

        running.store(false, Ordering::SeqCst);
    }
}

impl Drop for ClockDriver {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}
