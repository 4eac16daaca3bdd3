use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::sysex::PayloadKind;

/// Errors returned by a MIDI transport adapter.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum TransportError {
    #[error("no MIDI output is open")]
    NotConfigured,
    #[error("the MIDI port has been closed")]
    PortClosed,
    #[error("the inbound MIDI stream has ended")]
    InboundClosed,
    #[error("MIDI backend failure: {message}")]
    Backend { message: String },
}

/// Errors returned by SysEx session operations.
#[derive(Debug, Error)]
pub enum SysexError {
    #[error("MIDI transport is unavailable")]
    TransportUnavailable(#[from] TransportError),
    #[error(
        "dump incomplete: {received} byte(s) received without a closing F7 within {timeout_ms}ms"
    )]
    IncompleteDump { received: usize, timeout_ms: u64 },
    #[error("invalid Wavestation {kind} payload ({len} bytes); nothing was sent")]
    InvalidPayload { kind: PayloadKind, len: usize },
    #[error("failed to access `{}`", path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("dump collection was cancelled")]
    Cancelled,
}

/// Errors returned when parsing fake transport fixtures.
#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("fixture payloads cannot be empty")]
    EmptyPayload,
    #[error("fixture payload is not valid hexadecimal")]
    InvalidHex(#[from] hex::FromHexError),
}

/// Errors returned when validating runtime options.
#[derive(Debug, Error)]
pub(crate) enum CliConfigError {
    #[error("invalid device ID `{value}`; expected 0..=127 in decimal or 0x-prefixed hex")]
    InvalidDeviceId { value: String },
}

/// Errors returned by telemetry initialisation.
#[derive(Debug, Error)]
pub(crate) enum TelemetryError {
    #[error("failed to install tracing subscriber")]
    Subscriber(#[from] tracing_subscriber::util::TryInitError),
}
