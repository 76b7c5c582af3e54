//! ViewportSync - runs a `ViewportSyncController` on a single tokio task.
//!
//! Viewport events, debounce expiry, query responses and create completions
//! are all processed one at a time by that task, so controller state needs no
//! locking. Queries and creates run on their own tasks and report back over a
//! channel tagged with their generation / local id.
//!
//! ## Example
//!
//! ```ignore
//! use privy_pin::sync::{SyncConfig, ViewportSync};
//!
//! let (handle, task) = ViewportSync::spawn(source, surface, SyncConfig::default());
//! handle.viewport_changed(rect).await?;
//! let pin = handle.drop_pin("Lobby restroom", 121.0, 14.55).await?;
//! let surface = handle.shutdown(task).await;
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

use super::controller::{
    ApplyOutcome, LocalPinStatus, QueryGeneration, SyncState, ViewportSyncController,
};
use super::source::PinSource;
use super::surface::MarkerSurface;
use super::SyncError;
use crate::error::PinError;
use crate::model::{NewPin, Pin, ViewportRect};

/// Configuration for the sync driver.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    debounce: Duration,
    channel_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(300),
            channel_capacity: 64,
        }
    }
}

impl SyncConfig {
    /// Set the debounce window applied to viewport changes.
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Set the command/completion channel capacity (minimum 1).
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Idle,
    Debouncing,
    Querying,
}

/// Snapshot published after every processed event.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncStatus {
    pub phase: SyncPhase,
    pub generation: QueryGeneration,
    /// Ids with a marker on the map, sorted.
    pub rendered: Vec<String>,
    pub last_error: Option<PinError>,
    pub pending_local: Vec<String>,
    pub failed_local: Vec<String>,
    /// Responses dropped because a newer query had been issued.
    pub discarded: u64,
}

impl Default for SyncStatus {
    fn default() -> Self {
        Self {
            phase: SyncPhase::Idle,
            generation: QueryGeneration::default(),
            rendered: Vec::new(),
            last_error: None,
            pending_local: Vec::new(),
            failed_local: Vec::new(),
            discarded: 0,
        }
    }
}

impl SyncStatus {
    pub fn is_idle(&self) -> bool {
        self.phase == SyncPhase::Idle
    }
}

type PinReply = oneshot::Sender<Result<Pin, SyncError>>;

enum Command {
    ViewportChanged(ViewportRect),
    DropPin { draft: NewPin, reply: PinReply },
    RetryPin { local_id: String, reply: PinReply },
    RollbackPin { local_id: String, reply: PinReply },
    RefreshPin(Pin),
    ForgetPin(String),
    Shutdown,
}

enum Completion {
    Query {
        generation: QueryGeneration,
        result: Result<Vec<Pin>, PinError>,
    },
    Create {
        local_id: String,
        result: Result<Pin, PinError>,
    },
}

/// Cloneable handle for feeding events to a running sync task.
#[derive(Clone)]
pub struct SyncHandle {
    commands: mpsc::Sender<Command>,
    status: watch::Receiver<SyncStatus>,
}

impl SyncHandle {
    async fn send(&self, command: Command) -> Result<(), SyncError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| SyncError::Closed)
    }

    async fn request(
        &self,
        build: impl FnOnce(PinReply) -> Command,
    ) -> Result<Pin, SyncError> {
        let (reply, response) = oneshot::channel();
        self.send(build(reply)).await?;
        response.await.map_err(|_| SyncError::Closed)?
    }

    /// Report that the map viewport moved.
    pub async fn viewport_changed(&self, rect: ViewportRect) -> Result<(), SyncError> {
        self.send(Command::ViewportChanged(rect)).await
    }

    /// Show a pin immediately and wait for the server to confirm it.
    ///
    /// On `SyncError::CreateFailed` the pin stays on the map under its local
    /// id; follow up with `retry_pin` or `rollback_pin`.
    pub async fn drop_pin(
        &self,
        name: impl Into<String>,
        longitude: f64,
        latitude: f64,
    ) -> Result<Pin, SyncError> {
        let draft = NewPin::new(name, longitude, latitude);
        self.request(|reply| Command::DropPin { draft, reply }).await
    }

    /// Resubmit a failed optimistic pin.
    pub async fn retry_pin(&self, local_id: impl Into<String>) -> Result<Pin, SyncError> {
        let local_id = local_id.into();
        self.request(|reply| Command::RetryPin { local_id, reply })
            .await
    }

    /// Remove an optimistic pin from the map, returning it.
    pub async fn rollback_pin(&self, local_id: impl Into<String>) -> Result<Pin, SyncError> {
        let local_id = local_id.into();
        self.request(|reply| Command::RollbackPin { local_id, reply })
            .await
    }

    /// Push new content for an already-rendered pin.
    pub async fn refresh_pin(&self, pin: Pin) -> Result<(), SyncError> {
        self.send(Command::RefreshPin(pin)).await
    }

    /// Remove a pin deleted elsewhere.
    pub async fn forget_pin(&self, id: impl Into<String>) -> Result<(), SyncError> {
        self.send(Command::ForgetPin(id.into())).await
    }

    /// Latest published status.
    pub fn status(&self) -> SyncStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.status.clone()
    }

    /// Wait until a status matching `predicate` is published.
    pub async fn wait_for(
        &self,
        predicate: impl FnMut(&SyncStatus) -> bool,
    ) -> Result<SyncStatus, SyncError> {
        let mut status = self.status.clone();
        let matched = status
            .wait_for(predicate)
            .await
            .map_err(|_| SyncError::Closed)?;
        Ok(matched.clone())
    }

    /// Stop the task and get the surface back.
    pub async fn shutdown<M>(self, task: JoinHandle<M>) -> Result<M, SyncError> {
        // The task may already have stopped; the join below reports that.
        let _ = self.commands.send(Command::Shutdown).await;
        task.await.map_err(|_| SyncError::Closed)
    }
}

pub struct ViewportSync<P, M: MarkerSurface> {
    source: Arc<P>,
    controller: ViewportSyncController<M>,
    commands: mpsc::Receiver<Command>,
    completions: mpsc::Receiver<Completion>,
    completions_tx: mpsc::Sender<Completion>,
    status: watch::Sender<SyncStatus>,
    waiting: HashMap<String, PinReply>,
    discarded: u64,
}

impl<P, M> ViewportSync<P, M>
where
    P: PinSource,
    M: MarkerSurface + Send + 'static,
    M::Handle: Send,
{
    /// Start the sync loop on the current tokio runtime.
    pub fn spawn(source: P, surface: M, config: SyncConfig) -> (SyncHandle, JoinHandle<M>) {
        let (commands_tx, commands) = mpsc::channel(config.channel_capacity);
        let (completions_tx, completions) = mpsc::channel(config.channel_capacity);
        let (status_tx, status_rx) = watch::channel(SyncStatus::default());

        let driver = ViewportSync {
            source: Arc::new(source),
            controller: ViewportSyncController::new(surface, config.debounce),
            commands,
            completions,
            completions_tx,
            status: status_tx,
            waiting: HashMap::new(),
            discarded: 0,
        };

        info!(
            debounce_ms = config.debounce.as_millis() as u64,
            "viewport sync started"
        );
        let task = tokio::spawn(driver.run());
        (
            SyncHandle {
                commands: commands_tx,
                status: status_rx,
            },
            task,
        )
    }

    async fn run(mut self) -> M {
        loop {
            let deadline = self.controller.next_deadline();
            tokio::select! {
                command = self.commands.recv() => match command {
                    None | Some(Command::Shutdown) => break,
                    Some(command) => self.handle_command(command),
                },
                Some(done) = self.completions.recv() => self.handle_completion(done),
                _ = sleep_until(deadline) => self.handle_timer(),
            }
            self.publish();
        }

        for (local_id, reply) in self.waiting.drain() {
            debug!(%local_id, "sync stopped before create completed");
            let _ = reply.send(Err(SyncError::Closed));
        }
        info!("viewport sync stopped");
        self.controller.into_surface()
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::ViewportChanged(rect) => {
                self.controller.viewport_changed(rect, now());
            }
            Command::DropPin { draft, reply } => match self.controller.drop_pin(draft) {
                Ok(local) => {
                    let draft = NewPin {
                        name: local.name.clone(),
                        location: local.location,
                    };
                    self.submit(local.id, draft, reply);
                }
                Err(err) => {
                    let _ = reply.send(Err(err));
                }
            },
            Command::RetryPin { local_id, reply } => {
                if self.waiting.contains_key(&local_id) {
                    let _ = reply.send(Err(SyncError::CreateInFlight(local_id)));
                    return;
                }
                match self.controller.retry_pin(&local_id) {
                    Ok(draft) => self.submit(local_id, draft, reply),
                    Err(err) => {
                        let _ = reply.send(Err(err));
                    }
                }
            }
            Command::RollbackPin { local_id, reply } => {
                if self.waiting.contains_key(&local_id) {
                    let _ = reply.send(Err(SyncError::CreateInFlight(local_id)));
                    return;
                }
                let _ = reply.send(self.controller.rollback_pin(&local_id));
            }
            Command::RefreshPin(pin) => {
                self.controller.refresh_pin(&pin);
            }
            Command::ForgetPin(id) => {
                self.controller.forget_pin(&id);
            }
            Command::Shutdown => {}
        }
    }

    fn handle_timer(&mut self) {
        let Some(ticket) = self.controller.timer_fired(now()) else {
            return;
        };
        let source = Arc::clone(&self.source);
        let completions = self.completions_tx.clone();
        tokio::spawn(async move {
            let result = source.fetch_viewport(ticket.rect).await;
            let _ = completions
                .send(Completion::Query {
                    generation: ticket.generation,
                    result,
                })
                .await;
        });
    }

    fn submit(&mut self, local_id: String, draft: NewPin, reply: PinReply) {
        self.waiting.insert(local_id.clone(), reply);
        let source = Arc::clone(&self.source);
        let completions = self.completions_tx.clone();
        tokio::spawn(async move {
            let result = source.submit_pin(draft).await;
            let _ = completions
                .send(Completion::Create { local_id, result })
                .await;
        });
    }

    fn handle_completion(&mut self, done: Completion) {
        match done {
            Completion::Query { generation, result } => {
                let outcome = self.controller.apply_response(generation, result);
                if matches!(outcome, ApplyOutcome::Discarded { .. }) {
                    self.discarded += 1;
                }
            }
            Completion::Create { local_id, result } => {
                let reply = self.waiting.remove(&local_id);
                let answer = match result {
                    Ok(pin) => self
                        .controller
                        .confirm_pin(&local_id, pin.clone())
                        .map(|()| pin),
                    Err(source) => self
                        .controller
                        .fail_pin(&local_id, source.clone())
                        .and(Err(SyncError::CreateFailed { local_id, source })),
                };
                if let Some(reply) = reply {
                    let _ = reply.send(answer);
                }
            }
        }
    }

    fn publish(&self) {
        let phase = match self.controller.state() {
            SyncState::Idle => SyncPhase::Idle,
            SyncState::Debouncing { .. } => SyncPhase::Debouncing,
            SyncState::Querying { .. } => SyncPhase::Querying,
        };
        let mut pending_local = Vec::new();
        let mut failed_local = Vec::new();
        for local in self.controller.local_pins() {
            match local.status {
                LocalPinStatus::Pending => pending_local.push(local.pin.id.clone()),
                LocalPinStatus::Failed(_) => failed_local.push(local.pin.id.clone()),
            }
        }

        let status = SyncStatus {
            phase,
            generation: self.controller.generation(),
            rendered: self.controller.markers().ids(),
            last_error: self.controller.last_error().cloned(),
            pending_local,
            failed_local,
            discarded: self.discarded,
        };
        self.status.send_replace(status);
    }
}

fn now() -> std::time::Instant {
    Instant::now().into_std()
}

async fn sleep_until(deadline: Option<std::time::Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(Instant::from_std(deadline)).await,
        None => std::future::pending().await,
    }
}
