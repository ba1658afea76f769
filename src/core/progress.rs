//! Events emitted by the converter and the sinks that deliver them.

use std::sync::{Arc, Mutex, PoisonError};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::core::item::{ItemId, StatusKind};

/// Progress message type
#[derive(Debug, Deserialize, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ProgressType {
    Start,
    Progress,
    Complete,
}

/// Aggregate progress of one batch run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    /// Progress type (start, progress, complete)
    pub progress_type: ProgressType,
    /// Items that reached a terminal status in this run
    pub completed_tasks: usize,
    /// Items that converted successfully
    pub succeeded_tasks: usize,
    /// Items snapshotted when the run started
    pub total_tasks: usize,
    /// round(100 × completed / total)
    pub progress_percentage: u8,
}

impl Progress {
    pub fn new(
        progress_type: ProgressType,
        completed_tasks: usize,
        succeeded_tasks: usize,
        total_tasks: usize,
    ) -> Self {
        Self {
            progress_type,
            completed_tasks,
            succeeded_tasks,
            total_tasks,
            progress_percentage: percentage(completed_tasks, total_tasks),
        }
    }
}

/// round(100 × done / total), 0 for an empty run, never above 100
pub fn percentage(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let pct = (done.min(total) as f64 / total as f64 * 100.0).round();
    pct as u8
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Success,
    Error,
    Info,
}

/// Transient user-facing message; display and expiry belong to the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self { level: NotificationLevel::Success, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { level: NotificationLevel::Error, message: message.into() }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self { level: NotificationLevel::Info, message: message.into() }
    }
}

/// Everything the UI can observe.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ConverterEvent {
    #[serde(rename_all = "camelCase")]
    ItemProgress { id: ItemId, progress: u8 },
    #[serde(rename_all = "camelCase")]
    ItemStatus {
        id: ItemId,
        status: StatusKind,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    Batch(Progress),
    Notification(Notification),
}

/// Destination for converter events.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: ConverterEvent);
}

impl<F> EventSink for F
where
    F: Fn(ConverterEvent) + Send + Sync,
{
    fn emit(&self, event: ConverterEvent) {
        self(event)
    }
}

/// Drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn emit(&self, _event: ConverterEvent) {}
}

/// Forwards events over an unbounded tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<ConverterEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ConverterEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: ConverterEvent) {
        // A closed receiver means nobody is watching
        let _ = self.tx.send(event);
    }
}

/// Keeps every event in memory, in emission order.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    events: Arc<Mutex<Vec<ConverterEvent>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ConverterEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Progress values reported for one item, in order
    pub fn progress_of(&self, id: &ItemId) -> Vec<u8> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ConverterEvent::ItemProgress { id: event_id, progress } if &event_id == id => {
                    Some(progress)
                }
                _ => None,
            })
            .collect()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ConverterEvent::Notification(n) => Some(n),
                _ => None,
            })
            .collect()
    }

    pub fn batch_updates(&self) -> Vec<Progress> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ConverterEvent::Batch(p) => Some(p),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: ConverterEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}
