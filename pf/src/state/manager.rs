//! StateManager - actor that owns the session
//!
//! Processes commands via channels so every mutation is serialized, then
//! publishes a `StateEvent` and hands the session to the persistence adapter.

use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info, warn};

use super::messages::{StateCommand, StateError, StateResponse};
use super::session::{MemorySessionPersistence, Session, SessionPersistence};
use crate::domain::{
    ChatMessage, ChatRole, GeneratedSlice, PipelineStage, ProductData, SliceCollection, SliceField, SlicePatch,
};

/// Event broadcast after a state change
#[derive(Debug, Clone, PartialEq)]
pub enum StateEvent {
    /// The pipeline moved to a new stage
    StageChanged { from: PipelineStage, to: PipelineStage },
    /// A slice was appended at `index`; `total` slices exist now
    SliceAppended { index: usize, total: usize },
    /// A slice's text was replaced
    SlicePatched { index: usize },
    /// The focus moved
    FocusChanged { index: usize },
    /// All slices were removed
    Cleared,
    /// A chat message was logged
    ChatAppended { role: ChatRole },
}

/// Handle to send commands to the StateManager
#[derive(Clone)]
pub struct StateManager {
    tx: mpsc::Sender<StateCommand>,
    /// Broadcast sender for state change notifications
    event_tx: broadcast::Sender<StateEvent>,
}

impl StateManager {
    /// Spawn a new StateManager actor over `persistence`
    ///
    /// A stored session is restored and normalized; an unreadable one is
    /// logged and replaced by an empty session.
    pub fn spawn(persistence: impl SessionPersistence + 'static) -> Self {
        debug!("spawn: called");
        let session = match persistence.load() {
            Ok(Some(session)) => {
                info!(slices = session.slices.len(), stage = %session.stage, "Restored session");
                session.normalized()
            }
            Ok(None) => {
                debug!("spawn: no stored session");
                Session::default()
            }
            Err(e) => {
                warn!(error = %e, "Failed to load session, starting empty");
                Session::default()
            }
        };

        let (tx, rx) = mpsc::channel(256);
        let (event_tx, _) = broadcast::channel(64);

        let actor = Actor {
            session,
            persistence: Box::new(persistence),
            event_tx: event_tx.clone(),
        };
        tokio::spawn(actor.run(rx));

        info!("StateManager spawned");
        Self { tx, event_tx }
    }

    /// Spawn an actor that keeps its session in memory only
    pub fn in_memory() -> Self {
        Self::spawn(MemorySessionPersistence::new())
    }

    /// Subscribe to state change events
    pub fn subscribe_events(&self) -> broadcast::Receiver<StateEvent> {
        self.event_tx.subscribe()
    }

    async fn request<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> StateCommand) -> StateResponse<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(build(reply_tx))
            .await
            .map_err(|_| StateError::ChannelError)?;
        reply_rx.await.map_err(|_| StateError::ChannelError)
    }

    // === Reads ===

    /// Full session snapshot
    pub async fn snapshot(&self) -> StateResponse<Session> {
        debug!("snapshot: called");
        self.request(|reply| StateCommand::Snapshot { reply }).await
    }

    /// Current slice collection; later mutations never change it
    pub async fn slices(&self) -> StateResponse<SliceCollection> {
        debug!("slices: called");
        self.request(|reply| StateCommand::Slices { reply }).await
    }

    /// Whole chat log, oldest first
    pub async fn chat_history(&self) -> StateResponse<Vec<ChatMessage>> {
        debug!("chat_history: called");
        self.request(|reply| StateCommand::ChatHistory { reply }).await
    }

    // === Slice operations ===

    /// Append a slice; returns the new slice count
    pub async fn append(&self, slice: GeneratedSlice) -> StateResponse<usize> {
        debug!(title = %slice.title, "append: called");
        self.request(|reply| StateCommand::Append { slice, reply }).await?
    }

    /// Move the focus, clamped to `[0, len - 1]`; returns the applied index
    pub async fn set_focus(&self, index: usize) -> StateResponse<usize> {
        debug!(index, "set_focus: called");
        self.request(|reply| StateCommand::SetFocus { index, reply }).await
    }

    /// Replace one field of one slice
    pub async fn patch_field(
        &self,
        index: usize,
        field: SliceField,
        value: impl Into<String>,
    ) -> StateResponse<GeneratedSlice> {
        debug!(index, %field, "patch_field: called");
        let value = value.into();
        self.request(|reply| StateCommand::PatchField {
            index,
            field,
            value,
            reply,
        })
        .await?
    }

    /// Replace the provided subset of one slice's fields
    pub async fn patch_fields(&self, index: usize, patch: SlicePatch) -> StateResponse<GeneratedSlice> {
        debug!(index, ?patch, "patch_fields: called");
        self.request(|reply| StateCommand::PatchFields { index, patch, reply })
            .await?
    }

    /// Remove all slices and reset the focus
    pub async fn clear(&self) -> StateResponse<()> {
        debug!("clear: called");
        self.request(|reply| StateCommand::Clear { reply }).await
    }

    // === Run lifecycle ===

    /// Start a run: enter `thinking`, clear slices and focus, remember `product`
    ///
    /// Rejected with `Busy` while another run is in flight.
    pub async fn begin_run(&self, product: ProductData) -> StateResponse<()> {
        debug!(name = %product.name, "begin_run: called");
        self.request(|reply| StateCommand::BeginRun { product, reply }).await?
    }

    /// Move to `stage` if the transition table allows it
    pub async fn set_stage(&self, stage: PipelineStage) -> StateResponse<()> {
        debug!(%stage, "set_stage: called");
        self.request(|reply| StateCommand::SetStage { stage, reply }).await?
    }

    /// Enter `error` and record `message`; slices are kept
    pub async fn record_failure(&self, message: impl Into<String>) -> StateResponse<()> {
        let message = message.into();
        debug!(%message, "record_failure: called");
        self.request(|reply| StateCommand::RecordFailure { message, reply })
            .await?
    }

    // === Chat log ===

    pub async fn push_chat(&self, message: ChatMessage) -> StateResponse<()> {
        debug!(role = ?message.role, "push_chat: called");
        self.request(|reply| StateCommand::PushChat { message, reply }).await
    }

    // === Persistence ===

    /// Save the session now, reporting failure to the caller
    pub async fn flush(&self) -> StateResponse<()> {
        debug!("flush: called");
        self.request(|reply| StateCommand::Flush { reply }).await?
    }

    /// Shutdown the StateManager
    pub async fn shutdown(&self) -> Result<(), StateError> {
        debug!("shutdown: called");
        self.tx
            .send(StateCommand::Shutdown)
            .await
            .map_err(|_| StateError::ChannelError)
    }
}

/// Actor state: the session plus its outlets
struct Actor {
    session: Session,
    persistence: Box<dyn SessionPersistence>,
    event_tx: broadcast::Sender<StateEvent>,
}

impl Actor {
    async fn run(mut self, mut rx: mpsc::Receiver<StateCommand>) {
        debug!("StateManager actor started");
        while let Some(cmd) = rx.recv().await {
            if !self.handle(cmd) {
                break;
            }
        }
        debug!("StateManager actor stopped");
    }

    /// Process one command; `false` stops the actor
    fn handle(&mut self, cmd: StateCommand) -> bool {
        match cmd {
            StateCommand::Snapshot { reply } => {
                debug!("actor: Snapshot command");
                let _ = reply.send(self.session.clone());
            }

            StateCommand::Slices { reply } => {
                debug!("actor: Slices command");
                let _ = reply.send(self.session.slices.clone());
            }

            StateCommand::ChatHistory { reply } => {
                debug!("actor: ChatHistory command");
                let _ = reply.send(self.session.chat.clone());
            }

            StateCommand::Append { slice, reply } => {
                debug!(title = %slice.title, "actor: Append command");
                self.session.slices = self.session.slices.appended(slice);
                let total = self.session.slices.len();
                self.changed(StateEvent::SliceAppended {
                    index: total - 1,
                    total,
                });
                let _ = reply.send(Ok(total));
            }

            StateCommand::SetFocus { index, reply } => {
                let clamped = self.session.slices.clamp_index(index);
                debug!(index, clamped, "actor: SetFocus command");
                if clamped != self.session.focus {
                    self.session.focus = clamped;
                    self.changed(StateEvent::FocusChanged { index: clamped });
                }
                let _ = reply.send(clamped);
            }

            StateCommand::PatchField {
                index,
                field,
                value,
                reply,
            } => {
                debug!(index, %field, "actor: PatchField command");
                let next = self.session.slices.with_field(index, field, &value);
                let _ = reply.send(self.replace_slices(index, next));
            }

            StateCommand::PatchFields { index, patch, reply } => {
                debug!(index, "actor: PatchFields command");
                let next = self.session.slices.with_patch(index, &patch);
                let _ = reply.send(self.replace_slices(index, next));
            }

            StateCommand::Clear { reply } => {
                debug!("actor: Clear command");
                self.session.slices = SliceCollection::new();
                self.session.focus = 0;
                self.changed(StateEvent::Cleared);
                let _ = reply.send(());
            }

            StateCommand::BeginRun { product, reply } => {
                debug!(name = %product.name, "actor: BeginRun command");
                let _ = reply.send(self.begin_run(product));
            }

            StateCommand::SetStage { stage, reply } => {
                debug!(%stage, "actor: SetStage command");
                let _ = reply.send(self.transition(stage));
            }

            StateCommand::RecordFailure { message, reply } => {
                debug!(%message, "actor: RecordFailure command");
                let result = self.transition(PipelineStage::Error).map(|_| {
                    self.session.last_error = Some(message);
                    self.persist();
                });
                let _ = reply.send(result);
            }

            StateCommand::PushChat { message, reply } => {
                debug!(role = ?message.role, "actor: PushChat command");
                let role = message.role;
                self.session.chat.push(message);
                self.changed(StateEvent::ChatAppended { role });
                let _ = reply.send(());
            }

            StateCommand::Flush { reply } => {
                debug!("actor: Flush command");
                let result = self
                    .persistence
                    .save(&self.session)
                    .map_err(|e| StateError::Persistence(e.to_string()));
                let _ = reply.send(result);
            }

            StateCommand::Shutdown => {
                info!("StateManager shutting down");
                return false;
            }
        }
        true
    }

    fn begin_run(&mut self, product: ProductData) -> StateResponse<()> {
        let stage = self.session.stage;
        if stage.is_in_flight() {
            debug!(%stage, "begin_run: run already in flight");
            return Err(StateError::Busy(stage));
        }
        self.session.slices = SliceCollection::new();
        self.session.focus = 0;
        self.session.last_error = None;
        self.session.product = Some(product);
        let _ = self.event_tx.send(StateEvent::Cleared);
        self.transition(PipelineStage::Thinking)
    }

    fn transition(&mut self, to: PipelineStage) -> StateResponse<()> {
        let from = self.session.stage;
        if !from.can_transition_to(to) {
            return Err(StateError::InvalidTransition { from, to });
        }
        self.session.stage = to;
        info!(%from, %to, "Stage changed");
        self.changed(StateEvent::StageChanged { from, to });
        Ok(())
    }

    fn replace_slices(&mut self, index: usize, next: Option<SliceCollection>) -> StateResponse<GeneratedSlice> {
        let len = self.session.slices.len();
        let Some(next) = next else {
            debug!(index, len, "replace_slices: index out of range");
            return Err(StateError::IndexOutOfRange { index, len });
        };
        let slice = next.get(index).cloned().ok_or(StateError::IndexOutOfRange { index, len })?;
        self.session.slices = next;
        self.changed(StateEvent::SlicePatched { index });
        Ok(slice)
    }

    /// Publish `event` and persist
    fn changed(&mut self, event: StateEvent) {
        // No subscribers is fine
        let _ = self.event_tx.send(event);
        self.persist();
    }

    fn persist(&self) {
        if let Err(e) = self.persistence.save(&self.session) {
            warn!(error = %e, "Failed to persist session");
        }
    }
}
