use std::fmt::{self, Display, Formatter};

use crate::cli::listen::{ListenStopReason, ListenSummary};
use crate::protocol::DeviceId;
use crate::transport::ReceivedMessage;

use super::painter::Painter;

/// Renders the line printed before the first message.
pub(crate) struct ListenReadyView<'a> {
    device_id: DeviceId,
    max_messages: Option<usize>,
    painter: &'a Painter,
}

impl<'a> ListenReadyView<'a> {
    pub(crate) fn new(
        device_id: DeviceId,
        max_messages: Option<usize>,
        painter: &'a Painter,
    ) -> Self {
        Self {
            device_id,
            max_messages,
            painter,
        }
    }
}

impl Display for ListenReadyView<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let until = match self.max_messages {
            Some(limit) => format!("(stopping after {limit} message(s))"),
            None => "(Ctrl+C to stop)".to_string(),
        };
        write!(
            f,
            "{} device {} {}",
            self.painter.heading("Listening:"),
            self.painter.value(self.device_id.to_string()),
            self.painter.muted(until)
        )
    }
}

/// Renders one received message.
pub(crate) struct ListenMessageView<'a> {
    index: usize,
    message: &'a ReceivedMessage,
    painter: &'a Painter,
}

impl<'a> ListenMessageView<'a> {
    pub(crate) fn new(index: usize, message: &'a ReceivedMessage, painter: &'a Painter) -> Self {
        Self {
            index,
            message,
            painter,
        }
    }
}

impl Display for ListenMessageView<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} raw={}",
            self.painter.muted(format!("[{:04}]", self.index)),
            self.painter.value(self.message.kind().to_string()),
            self.painter.bytes(self.message.bytes())
        )
    }
}

/// Renders the listen session summary.
pub(crate) struct ListenSummaryView<'a> {
    summary: &'a ListenSummary,
    painter: &'a Painter,
}

impl<'a> ListenSummaryView<'a> {
    pub(crate) fn new(summary: &'a ListenSummary, painter: &'a Painter) -> Self {
        Self { summary, painter }
    }
}

impl Display for ListenSummaryView<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let stop_reason = self.summary.stop_reason().to_string();
        let stop_reason = match self.summary.stop_reason() {
            ListenStopReason::ReachedLimit(_) => self.painter.success(stop_reason),
            ListenStopReason::Interrupted | ListenStopReason::StreamClosed => {
                self.painter.warning(stop_reason)
            }
        };
        write!(
            f,
            "{} {} {}",
            self.painter.heading("Stopped:"),
            stop_reason,
            self.painter.value(format!(
                "- received {} message(s)",
                self.summary.received_messages()
            ))
        )
    }
}
