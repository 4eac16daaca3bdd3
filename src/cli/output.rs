use std::io;
use std::path::PathBuf;

use anyhow::Result;
use serde::Serialize;
use serde_with::formats::Uppercase;
use serde_with::hex::Hex;
use serde_with::serde_as;

use crate::cli::listen::ListenStopReason;
use crate::sysex::PayloadKind;
use crate::transport::MessageKind;

/// JSON result emitted by a command.
#[serde_as]
#[derive(Debug, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub(crate) enum CommandResult {
    Request {
        request: String,
        #[serde_as(as = "Hex<Uppercase>")]
        frame: Vec<u8>,
    },
    Param {
        param_id: u8,
        value: u8,
        #[serde_as(as = "Hex<Uppercase>")]
        frame: Vec<u8>,
    },
    Export {
        request: String,
        path: PathBuf,
        bytes_written: usize,
    },
    Import {
        kind: PayloadKind,
        path: PathBuf,
        bytes_sent: usize,
    },
    Validate {
        path: PathBuf,
        len: usize,
        kind: Option<PayloadKind>,
    },
    Message {
        index: usize,
        kind: MessageKind,
        timestamp_micros: u64,
        #[serde_as(as = "Hex<Uppercase>")]
        bytes: Vec<u8>,
    },
    ListenSummary {
        received_messages: usize,
        stop_reason: ListenStopReason,
    },
}

pub(crate) fn write_json_line(out: &mut impl io::Write, value: &impl Serialize) -> Result<()> {
    serde_json::to_writer(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}
