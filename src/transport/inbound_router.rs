use std::sync::Arc;

use serde::Serialize;
use strum_macros::Display;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::TransportError;
use crate::sysex::{DumpCollector, FrameCodec};

use super::{InboundMessage, InboundReceiver};

/// Kind of a routed inbound message.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Display, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// System-exclusive message.
    Sysex,
    /// Channel or system-common message.
    Channel,
}

/// Inbound message in full wire form, delimiters restored.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ReceivedMessage {
    kind: MessageKind,
    bytes: Vec<u8>,
    timestamp_micros: u64,
}

impl ReceivedMessage {
    /// Returns the message kind.
    #[must_use]
    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    /// Returns the wire bytes; SysEx messages start with `F0` and end with `F7`.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the backend timestamp in microseconds.
    #[must_use]
    pub fn timestamp_micros(&self) -> u64 {
        self.timestamp_micros
    }
}

impl From<InboundMessage> for ReceivedMessage {
    fn from(message: InboundMessage) -> Self {
        match message {
            InboundMessage::Sysex {
                data,
                timestamp_micros,
            } => Self {
                kind: MessageKind::Sysex,
                bytes: FrameCodec::wrap(&data).into_bytes(),
                timestamp_micros,
            },
            InboundMessage::Channel {
                bytes,
                timestamp_micros,
            } => Self {
                kind: MessageKind::Channel,
                bytes,
                timestamp_micros,
            },
        }
    }
}

/// Background task feeding inbound traffic to the collector and listeners.
///
/// Messages are handled one at a time in arrival order. A flush is answered
/// only after every message delivered before it has been routed. The task
/// stops when the transport drops its sender or
/// the router is dropped.
#[derive(Debug)]
pub(crate) struct InboundRouter {
    flushes: mpsc::UnboundedSender<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl InboundRouter {
    /// Spawns the routing task on the current runtime.
    pub(crate) fn spawn(
        mut inbound: InboundReceiver,
        collector: Arc<DumpCollector>,
        listeners: broadcast::Sender<ReceivedMessage>,
    ) -> Self {
        let (flushes, mut pending_flushes) = mpsc::unbounded_channel::<oneshot::Sender<()>>();
        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    // Drain delivered traffic before answering a flush.
                    biased;
                    message = inbound.recv() => {
                        let Some(message) = message else { break };
                        route(message, &collector, &listeners);
                    }
                    Some(flushed) = pending_flushes.recv() => {
                        let _waiting = flushed.send(());
                    }
                }
            }
            tracing::debug!("inbound MIDI stream closed");
        });

        Self { flushes, task }
    }

    /// Resolves once every message delivered so far has been routed.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InboundClosed`] when the inbound stream has
    /// ended and nothing more can be routed.
    pub(crate) async fn flush(&self) -> Result<(), TransportError> {
        let (flushed, acknowledged) = oneshot::channel();
        self.flushes
            .send(flushed)
            .map_err(|_closed| TransportError::InboundClosed)?;
        acknowledged
            .await
            .map_err(|_closed| TransportError::InboundClosed)
    }
}

fn route(
    message: InboundMessage,
    collector: &DumpCollector,
    listeners: &broadcast::Sender<ReceivedMessage>,
) {
    let received = ReceivedMessage::from(message);
    tracing::trace!(
        kind = %received.kind,
        len = received.bytes.len(),
        "routing inbound message"
    );
    if received.kind == MessageKind::Sysex {
        collector.on_frame_received(&received.bytes);
    }
    // Nobody listening is fine.
    let _receivers = listeners.send(received);
}

impl Drop for InboundRouter {
    fn drop(&mut self) {
        self.task.abort();
    }
}
