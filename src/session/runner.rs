//! Real-time driver for a [`SessionController`].
//!
//! Ticks on a tokio interval, measuring the actual time between ticks so a
//! late wake-up advances the sequence by the time that really passed.

use super::{SessionConfig, SessionController, SessionRecord, SessionState};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

const COMMAND_CAPACITY: usize = 16;

/// User controls delivered while a session runs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SessionCommand {
    Pause,
    Resume,
    Stop,
    SetVolume(f32),
}

pub struct SessionRunner {
    controller: SessionController,
    tick_interval: Duration,
}

impl SessionRunner {
    pub fn new(controller: SessionController) -> Self {
        let tick_interval = controller.tick_interval();
        Self {
            controller,
            tick_interval,
        }
    }

    #[must_use]
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval.max(Duration::from_millis(1));
        self
    }

    pub fn controller(&self) -> &SessionController {
        &self.controller
    }

    pub fn into_controller(self) -> SessionController {
        self.controller
    }

    /// Run one session to completion, stop, or cancellation.
    ///
    /// Returns the record the session emitted, if any.
    pub async fn run(
        &mut self,
        config: SessionConfig,
        mut commands: mpsc::Receiver<SessionCommand>,
        cancel: CancellationToken,
    ) -> Option<SessionRecord> {
        self.controller.start(config).await;

        let mut interval = tokio::time::interval(self.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // First tick completes immediately.
        interval.tick().await;
        let mut last = Instant::now();
        let mut commands_open = true;

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    info!("session cancelled");
                    return self.controller.stop();
                }
                command = commands.recv(), if commands_open => {
                    match command {
                        Some(SessionCommand::Pause) => self.controller.pause(),
                        Some(SessionCommand::Resume) => {
                            self.controller.resume().await;
                            last = Instant::now();
                        }
                        Some(SessionCommand::Stop) => return self.controller.stop(),
                        Some(SessionCommand::SetVolume(v)) => self.controller.set_volume(v),
                        None => {
                            debug!("command channel closed");
                            commands_open = false;
                        }
                    }
                }
                now = interval.tick() => {
                    let delta = now.duration_since(last).as_secs_f64();
                    last = now;
                    self.controller.tick(delta).await;
                    if self.controller.state() == SessionState::Complete {
                        return self.controller.last_record().cloned().filter(|r| r.completed);
                    }
                }
            }
        }
    }

    /// Run on a tokio task, returning a handle for the user controls.
    pub fn spawn(mut self, config: SessionConfig) -> SessionHandle {
        let (tx, rx) = mpsc::channel(COMMAND_CAPACITY);
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let task = tokio::spawn(async move {
            let record = self.run(config, rx, token).await;
            (record, self.controller)
        });
        SessionHandle {
            commands: tx,
            cancel,
            task,
        }
    }
}

/// Controls for a spawned session.
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    cancel: CancellationToken,
    task: JoinHandle<(Option<SessionRecord>, SessionController)>,
}

impl SessionHandle {
    /// Send a command. Returns `false` once the session has ended.
    pub async fn send(&self, command: SessionCommand) -> bool {
        self.commands.send(command).await.is_ok()
    }

    pub async fn pause(&self) -> bool {
        self.send(SessionCommand::Pause).await
    }

    pub async fn resume(&self) -> bool {
        self.send(SessionCommand::Resume).await
    }

    pub async fn stop(&self) -> bool {
        self.send(SessionCommand::Stop).await
    }

    pub async fn set_volume(&self, volume: f32) -> bool {
        self.send(SessionCommand::SetVolume(volume)).await
    }

    /// Stop the session without going through the command queue.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the session to end.
    ///
    /// # Errors
    ///
    /// Returns [`crate::BreathlineError::Channel`] if the session task panicked.
    pub async fn finished(self) -> crate::Result<(Option<SessionRecord>, SessionController)> {
        self.task
            .await
            .map_err(|e| crate::BreathlineError::Channel(format!("session task failed: {e}")))
    }
}
