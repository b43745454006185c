use crate::models::{UpdateReport, UpdateResult};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;

/// State transitions of a check or update run, in the order they happen.
///
/// Per artifact the order is always `UpdateStarted`, zero or more
/// `Downloading`, then exactly one of `UpdateCompleted` / `UpdateFailed`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum UpdateEvent {
    UpdateCheckStarted {
        artifact_count: usize,
    },
    CheckingMod {
        name: String,
        position: usize,
        total: usize,
    },
    UpdateCheckCompleted {
        reports: Vec<UpdateReport>,
        updates_available: usize,
    },
    BatchUpdateProgress {
        current: usize,
        total: usize,
        name: String,
    },
    UpdateStarted {
        name: String,
    },
    Downloading {
        name: String,
        percent: f64,
    },
    UpdateCompleted {
        name: String,
        old_version: String,
        new_version: String,
    },
    UpdateFailed {
        name: String,
        error: String,
    },
    BatchUpdateCompleted {
        results: Vec<UpdateResult>,
    },
}

/// Receives update events.
/// Implementations forward them to the UI, a log, or a channel.
pub trait UpdateListener: Send + Sync {
    fn on_event(&self, event: UpdateEvent);
}

/// A listener that drops every event.
pub struct SilentListener;

impl UpdateListener for SilentListener {
    fn on_event(&self, _event: UpdateEvent) {}
}

/// Forwards events into an unbounded tokio channel.
pub struct ChannelListener {
    tx: mpsc::UnboundedSender<UpdateEvent>,
}

impl ChannelListener {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<UpdateEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl UpdateListener for ChannelListener {
    fn on_event(&self, event: UpdateEvent) {
        if self.tx.send(event).is_err() {
            log::trace!("[Events] Receiver dropped, event discarded");
        }
    }
}

/// Delivers every event to each inner listener, in registration order.
#[derive(Default)]
pub struct FanOutListener {
    listeners: Vec<Arc<dyn UpdateListener>>,
}

impl FanOutListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, listener: Arc<dyn UpdateListener>) -> Self {
        self.listeners.push(listener);
        self
    }
}

impl UpdateListener for FanOutListener {
    fn on_event(&self, event: UpdateEvent) {
        if let Some((last, rest)) = self.listeners.split_last() {
            for listener in rest {
                listener.on_event(event.clone());
            }
            last.on_event(event);
        }
    }
}
