use std::fmt;
use std::io;

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

use crate::cli::OutputFormat;
use crate::cli::output::{CommandResult, write_json_line};
use crate::session::SysexSession;

use super::ui::{ListenMessageView, ListenReadyView, ListenSummaryView, Painter};

/// Arguments for the `listen` command.
#[derive(Debug, Args)]
pub struct ListenArgs {
    /// Stop after this many messages. If omitted, listen until Ctrl+C.
    #[arg(long)]
    max_messages: Option<usize>,
}

impl ListenArgs {
    /// Creates listen arguments with an optional message limit.
    #[must_use]
    pub fn new(max_messages: Option<usize>) -> Self {
        Self { max_messages }
    }
}

/// Why a listen session ended.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ListenStopReason {
    /// The requested number of messages arrived.
    ReachedLimit(usize),
    /// Ctrl+C was pressed.
    Interrupted,
    /// The transport closed its inbound stream.
    StreamClosed,
}

impl fmt::Display for ListenStopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReachedLimit(limit) => write!(f, "reached limit of {limit} message(s)"),
            Self::Interrupted => write!(f, "interrupted"),
            Self::StreamClosed => write!(f, "inbound stream closed"),
        }
    }
}

/// Outcome of a listen session.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct ListenSummary {
    received_messages: usize,
    stop_reason: ListenStopReason,
}

impl ListenSummary {
    pub(crate) fn new(received_messages: usize, stop_reason: ListenStopReason) -> Self {
        Self {
            received_messages,
            stop_reason,
        }
    }

    #[must_use]
    pub fn received_messages(&self) -> usize {
        self.received_messages
    }

    #[must_use]
    pub fn stop_reason(&self) -> ListenStopReason {
        self.stop_reason
    }
}

/// Executes the `listen` command.
pub(crate) async fn run<W>(
    session: &SysexSession,
    args: &ListenArgs,
    out: &mut W,
    output_format: OutputFormat,
    painter: &Painter,
) -> Result<()>
where
    W: io::Write,
{
    let mut messages = session.received_messages();
    if output_format == OutputFormat::Pretty {
        writeln!(
            out,
            "{}",
            ListenReadyView::new(session.config().device_id(), args.max_messages, painter)
        )?;
    }

    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);
    let mut received = 0_usize;

    let stop_reason = loop {
        if args.max_messages.is_some_and(|limit| received >= limit) {
            break ListenStopReason::ReachedLimit(received);
        }

        tokio::select! {
            signal = &mut interrupt => {
                signal?;
                break ListenStopReason::Interrupted;
            }
            next = messages.next() => match next {
                None => break ListenStopReason::StreamClosed,
                Some(Err(BroadcastStreamRecvError::Lagged(skipped))) => {
                    tracing::warn!(skipped, "listener fell behind; messages were dropped");
                }
                Some(Ok(message)) => {
                    match output_format {
                        OutputFormat::Pretty => writeln!(
                            out,
                            "{}",
                            ListenMessageView::new(received, &message, painter)
                        )?,
                        OutputFormat::Json => write_json_line(
                            out,
                            &CommandResult::Message {
                                index: received,
                                kind: message.kind(),
                                timestamp_micros: message.timestamp_micros(),
                                bytes: message.bytes().to_vec(),
                            },
                        )?,
                    }
                    received += 1;
                }
            }
        }
    };

    let summary = ListenSummary::new(received, stop_reason);
    match output_format {
        OutputFormat::Pretty => {
            writeln!(out)?;
            writeln!(out, "{}", ListenSummaryView::new(&summary, painter))?;
        }
        OutputFormat::Json => write_json_line(
            out,
            &CommandResult::ListenSummary {
                received_messages: summary.received_messages(),
                stop_reason: summary.stop_reason(),
            },
        )?,
    }
    Ok(())
}
