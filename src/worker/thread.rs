use std::sync::mpsc::{Receiver, SyncSender, TryRecvError};
use std::thread;
use std::time::Duration;

use tracing::{trace, warn};

use super::LayoutFrame;
use crate::layout::{LayoutInput, LayoutState, LayoutStrategy};

pub(super) enum WorkerCommand {
    Pause,
    Resume,
    Shutdown,
}

pub(super) fn spawn_worker(
    mut strategy: Box<dyn LayoutStrategy>,
    input: LayoutInput,
    run_id: u64,
    tick_interval: Duration,
    commands: Receiver<WorkerCommand>,
    frames: SyncSender<LayoutFrame>,
) {
    let kind = strategy.kind();
    let spawned = thread::Builder::new()
        .name(format!("layout-{}", kind.label().to_ascii_lowercase()))
        .spawn(move || {
            let mut state = LayoutState::from_input(&input);
            let mut running = true;
            let mut tick = 0u64;
            let mut resumes = 0u64;

            loop {
                // Paused workers block on the next command instead of spinning.
                let command = if running {
                    match commands.try_recv() {
                        Ok(command) => Some(command),
                        Err(TryRecvError::Empty) => None,
                        Err(TryRecvError::Disconnected) => break,
                    }
                } else {
                    match commands.recv() {
                        Ok(command) => Some(command),
                        Err(_) => break,
                    }
                };

                match command {
                    Some(WorkerCommand::Pause) => {
                        running = false;
                        continue;
                    }
                    Some(WorkerCommand::Resume) => {
                        running = true;
                        resumes += 1;
                    }
                    Some(WorkerCommand::Shutdown) => break,
                    None => {}
                }

                if !running {
                    continue;
                }

                let moving = strategy.tick(&mut state);
                tick += 1;
                trace!(kind = %kind, run_id, tick, moving, "layout tick");

                let frame = LayoutFrame {
                    kind,
                    generation: input.generation,
                    run_id,
                    tick,
                    ids: input.ids.clone(),
                    positions: state.positions.clone(),
                    moving,
                    resumes,
                };
                if frames.send(frame).is_err() {
                    break;
                }

                if !tick_interval.is_zero() {
                    thread::sleep(tick_interval);
                }
            }

            trace!(kind = %kind, run_id, ticks = tick, "layout worker finished");
        });

    if let Err(error) = spawned {
        warn!(kind = %kind, %error, "failed to spawn layout worker");
    }
}
