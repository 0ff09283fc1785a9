//! Background layout workers and their lifecycle.
//!
//! Each active layout kind runs on its own thread with its own copy of the
//! simulation state. The owner thread talks to it through a command channel
//! and receives position frames through a bounded frame channel; nothing is
//! shared by reference.

mod thread;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::time::{Duration, Instant};

use eframe::egui::Vec2;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::WorkerConfig;
use crate::layout::{LayoutInput, LayoutKind, LayoutSettings};

use thread::{WorkerCommand, spawn_worker};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Idle,
    Running,
    Paused,
    Terminated,
}

/// Positions computed by one tick of one run.
#[derive(Clone, Debug)]
pub struct LayoutFrame {
    pub kind: LayoutKind,
    pub generation: u64,
    pub run_id: u64,
    pub tick: u64,
    pub ids: Arc<[String]>,
    pub positions: Vec<Vec2>,
    pub moving: bool,
    /// How many resumes the worker had processed when it produced the frame.
    pub resumes: u64,
}

/// Handle on one background run. Dropping it terminates the thread.
pub struct LayoutWorkerHandle {
    kind: LayoutKind,
    settings: LayoutSettings,
    generation: u64,
    run_id: u64,
    state: WorkerState,
    commands: Sender<WorkerCommand>,
    frames: Option<Receiver<LayoutFrame>>,
    running_since: Option<Instant>,
    resumes: u64,
}

impl LayoutWorkerHandle {
    fn spawn(
        settings: LayoutSettings,
        input: LayoutInput,
        run_id: u64,
        config: &WorkerConfig,
    ) -> Self {
        let (commands, command_rx) = mpsc::channel();
        let (frame_tx, frames) = mpsc::sync_channel(config.frame_buffer.max(1));
        let kind = settings.kind();
        let generation = input.generation;

        spawn_worker(
            settings.build_strategy(),
            input,
            run_id,
            config.tick_interval(),
            command_rx,
            frame_tx,
        );

        Self {
            kind,
            settings,
            generation,
            run_id,
            state: WorkerState::Running,
            commands,
            frames: Some(frames),
            running_since: Some(Instant::now()),
            resumes: 0,
        }
    }

    pub fn kind(&self) -> LayoutKind {
        self.kind
    }

    pub fn settings(&self) -> &LayoutSettings {
        &self.settings
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn run_id(&self) -> u64 {
        self.run_id
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// Resumes a paused run. No-op unless paused.
    pub fn start(&mut self) {
        if self.state != WorkerState::Paused {
            return;
        }
        if self.commands.send(WorkerCommand::Resume).is_ok() {
            self.state = WorkerState::Running;
            self.running_since = Some(Instant::now());
            self.resumes += 1;
        } else {
            self.kill();
        }
    }

    /// Pauses iteration; the thread keeps its simulation state.
    pub fn stop(&mut self) {
        if self.state != WorkerState::Running {
            return;
        }
        if self.commands.send(WorkerCommand::Pause).is_ok() {
            self.state = WorkerState::Paused;
            self.running_since = None;
        } else {
            self.kill();
        }
    }

    /// Ends the run. Once this returns no further frame can be received.
    pub fn kill(&mut self) {
        if self.state == WorkerState::Terminated {
            return;
        }
        let _ = self.commands.send(WorkerCommand::Shutdown);
        self.frames = None;
        self.running_since = None;
        self.state = WorkerState::Terminated;
    }

    fn running_for(&self) -> Option<Duration> {
        self.running_since.map(|since| since.elapsed())
    }

    /// Drains pending frames and returns the newest one from this run.
    fn latest_frame(&mut self) -> Option<LayoutFrame> {
        let frames = self.frames.as_ref()?;
        let mut latest = None;
        loop {
            match frames.try_recv() {
                Ok(frame) if frame.run_id == self.run_id => latest = Some(frame),
                Ok(frame) => debug!(run_id = frame.run_id, "dropping frame from superseded run"),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    debug!(kind = %self.kind, "layout worker exited");
                    self.frames = None;
                    self.state = WorkerState::Terminated;
                    break;
                }
            }
        }
        latest
    }
}

impl Drop for LayoutWorkerHandle {
    fn drop(&mut self) {
        self.kill();
    }
}

/// Starts, pauses and kills layout runs, at most one per [`LayoutKind`].
///
/// Running both kinds against the same graph is allowed unless
/// [`WorkerConfig::exclusive`] is set; the owner applies their frames in
/// arrival order, so the last frame applied decides a node's position.
pub struct LayoutSupervisor {
    config: WorkerConfig,
    workers: BTreeMap<LayoutKind, LayoutWorkerHandle>,
    next_run_id: u64,
}

impl LayoutSupervisor {
    pub fn new(config: WorkerConfig) -> Self {
        Self {
            config,
            workers: BTreeMap::new(),
            next_run_id: 1,
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Starts or resumes the run for `settings.kind()`.
    ///
    /// Already running with the same settings and generation is a no-op;
    /// paused with the same settings resumes the retained simulation. Any
    /// other case replaces the run with a fresh one built from `input`.
    pub fn start(&mut self, settings: LayoutSettings, input: LayoutInput) -> WorkerState {
        let kind = settings.kind();

        if self.config.exclusive {
            let others = self
                .workers
                .keys()
                .copied()
                .filter(|other| *other != kind)
                .collect::<Vec<_>>();
            for other in others {
                self.kill(other);
            }
        }

        if let Some(handle) = self.workers.get_mut(&kind)
            && handle.settings == settings
            && handle.generation == input.generation
        {
            match handle.state {
                WorkerState::Running => return WorkerState::Running,
                WorkerState::Paused => {
                    handle.start();
                    info!(kind = %kind, run_id = handle.run_id, "layout resumed");
                    return handle.state;
                }
                WorkerState::Idle | WorkerState::Terminated => {}
            }
        }

        self.kill(kind);
        let run_id = self.next_run_id;
        self.next_run_id += 1;
        info!(
            kind = %kind,
            run_id,
            generation = input.generation,
            nodes = input.len(),
            edges = input.edges.len(),
            "layout started"
        );
        let handle = LayoutWorkerHandle::spawn(settings, input, run_id, &self.config);
        let state = handle.state;
        self.workers.insert(kind, handle);
        state
    }

    pub fn stop(&mut self, kind: LayoutKind) {
        if let Some(handle) = self.workers.get_mut(&kind)
            && handle.state == WorkerState::Running
        {
            handle.stop();
            info!(kind = %kind, run_id = handle.run_id, "layout stopped");
        }
    }

    /// Terminates and forgets the run. Safe on an idle kind.
    pub fn kill(&mut self, kind: LayoutKind) {
        if let Some(mut handle) = self.workers.remove(&kind) {
            handle.kill();
            info!(kind = %kind, run_id = handle.run_id, "layout killed");
        }
    }

    pub fn kill_all(&mut self) {
        let kinds = self.workers.keys().copied().collect::<Vec<_>>();
        for kind in kinds {
            self.kill(kind);
        }
    }

    pub fn state(&self, kind: LayoutKind) -> WorkerState {
        self.workers
            .get(&kind)
            .map_or(WorkerState::Idle, |handle| handle.state)
    }

    pub fn handle(&self, kind: LayoutKind) -> Option<&LayoutWorkerHandle> {
        self.workers.get(&kind)
    }

    pub fn settings(&self, kind: LayoutKind) -> Option<&LayoutSettings> {
        self.workers.get(&kind).map(|handle| &handle.settings)
    }

    pub fn running_kinds(&self) -> Vec<LayoutKind> {
        self.workers
            .iter()
            .filter(|(_, handle)| handle.state == WorkerState::Running)
            .map(|(kind, _)| *kind)
            .collect()
    }

    /// Latest frame of every live run. Also enforces the wall-clock budget
    /// and pauses runs that report they have settled.
    pub fn collect_frames(&mut self) -> Vec<LayoutFrame> {
        let budget = self.config.auto_stop_after();
        let mut frames = Vec::new();
        let mut finished = Vec::new();

        for (kind, handle) in &mut self.workers {
            if let Some(frame) = handle.latest_frame() {
                // A settled frame buffered before the last resume says nothing about the resumed run.
                if !frame.moving
                    && frame.resumes == handle.resumes
                    && handle.state == WorkerState::Running
                {
                    debug!(kind = %kind, tick = frame.tick, "layout settled");
                    handle.stop();
                }
                frames.push(frame);
            }

            if let (Some(budget), Some(elapsed)) = (budget, handle.running_for())
                && elapsed >= budget
            {
                debug!(kind = %kind, ?elapsed, "layout budget exhausted");
                handle.stop();
            }

            if handle.state == WorkerState::Terminated {
                finished.push(*kind);
            }
        }

        for kind in finished {
            self.workers.remove(&kind);
        }
        frames
    }
}

impl Drop for LayoutSupervisor {
    fn drop(&mut self) {
        self.kill_all();
    }
}
