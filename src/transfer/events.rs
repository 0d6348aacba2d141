//! Transfer lifecycle events
//!
//! Observers receive events in order (`headers`, optional `directory`, `file`,
//! `stream`, then exactly one of `end`/`error`) together with the response, so
//! they can adjust headers before anything is committed.

use super::store::ResourceDescriptor;
use crate::context::ResponseContext;
use crate::error::TransferError;
use std::ops::Range;
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferEvent {
    /// Transfer started for the decoded request path
    Headers { path: String },
    /// Path resolved to a directory
    Directory { path: String },
    /// File about to be sent, after index and extension resolution
    File {
        path: String,
        resource: ResourceDescriptor,
    },
    /// Body stream opened over `window`
    Stream { path: String, window: Range<u64> },
    End,
    Error(TransferError),
}

impl TransferEvent {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Headers { .. } => "headers",
            Self::Directory { .. } => "directory",
            Self::File { .. } => "file",
            Self::Stream { .. } => "stream",
            Self::End => "end",
            Self::Error(_) => "error",
        }
    }
}

/// Receives transfer events as they happen
pub trait TransferObserver: Send {
    fn on_event(&mut self, event: &TransferEvent, response: &mut ResponseContext);
}

/// Ignores every event
impl TransferObserver for () {
    fn on_event(&mut self, _event: &TransferEvent, _response: &mut ResponseContext) {}
}

/// Records every event it sees
#[derive(Debug, Default, Clone)]
pub struct EventLog {
    events: Vec<TransferEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[TransferEvent] {
        &self.events
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.events.iter().map(TransferEvent::name).collect()
    }
}

impl TransferObserver for EventLog {
    fn on_event(&mut self, event: &TransferEvent, _response: &mut ResponseContext) {
        self.events.push(event.clone());
    }
}

/// Forwards events to a channel; a closed receiver is ignored
impl TransferObserver for mpsc::UnboundedSender<TransferEvent> {
    fn on_event(&mut self, event: &TransferEvent, _response: &mut ResponseContext) {
        let _ = self.send(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_log_records_in_order() {
        let mut log = EventLog::new();
        let mut res = ResponseContext::new();
        log.on_event(&TransferEvent::Headers { path: "/a".into() }, &mut res);
        log.on_event(&TransferEvent::End, &mut res);
        assert_eq!(log.names(), vec!["headers", "end"]);
    }

    #[tokio::test]
    async fn test_channel_observer() {
        let (mut tx, mut rx) = mpsc::unbounded_channel::<TransferEvent>();
        let mut res = ResponseContext::new();
        tx.on_event(&TransferEvent::Error(TransferError::NotFound), &mut res);
        assert_eq!(
            rx.recv().await,
            Some(TransferEvent::Error(TransferError::NotFound))
        );

        drop(rx);
        tx.on_event(&TransferEvent::End, &mut res);
    }
}
