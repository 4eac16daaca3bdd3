use std::io;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::instrument;

use crate::cli::ui::Painter;
use crate::cli::{Command, FakeArgs, LogLevel, OutputFormat};
use crate::error::TransportError;
use crate::session::{SessionConfig, SysexSession};
use crate::sysex::SysexFrame;
use crate::telemetry;
use crate::terminal::{SystemTerminalClient, TerminalClient};
use crate::transport::{FakeTransport, InboundReceiver, MidiTransport};

/// Creates a transport backed by the in-process fake Wavestation.
#[must_use]
pub fn fake_transport(fake_args: FakeArgs) -> Arc<dyn MidiTransport> {
    Arc::new(FakeTransport::new(fake_args.into_transport_config()))
}

/// Creates the transport used when no MIDI output has been opened.
///
/// Every operation fails with [`TransportError::NotConfigured`].
#[must_use]
pub fn unconfigured_transport() -> Arc<dyn MidiTransport> {
    Arc::new(UnconfiguredTransport)
}

#[derive(Debug)]
struct UnconfiguredTransport;

#[async_trait]
impl MidiTransport for UnconfiguredTransport {
    async fn send(
        &self,
        _frame: &SysexFrame,
        _pacing: std::time::Duration,
    ) -> Result<(), TransportError> {
        Err(TransportError::NotConfigured)
    }

    fn subscribe(&self) -> Result<InboundReceiver, TransportError> {
        Err(TransportError::NotConfigured)
    }
}

/// Runs the CLI command against `transport`.
///
/// ```
/// # async fn run() -> anyhow::Result<()> {
/// use clap::Parser;
///
/// let args = wsx::Args::try_parse_from([
///     "wsx",
///     "--fake",
///     "--fake-dump",
///     "F04230283E000102F7",
///     "export",
///     "program",
///     "3",
///     "p3.syx",
/// ])?;
/// let config = args.session_config();
/// let (command, maybe_fake_args) = args.into_command_and_fake_args();
/// let transport = match maybe_fake_args {
///     Some(fake_args) => wsx::fake_transport(fake_args),
///     None => wsx::unconfigured_transport(),
/// };
/// let mut out = Vec::new();
/// wsx::run(command, &mut out, transport, config, wsx::OutputFormat::Json).await?;
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns an error if tracing initialisation fails, the transport is
/// unavailable, a dump is incomplete, a payload is invalid, a file cannot be
/// accessed, or output writing fails.
pub async fn run<W>(
    command: Command,
    out: &mut W,
    transport: Arc<dyn MidiTransport>,
    config: SessionConfig,
    output_format: OutputFormat,
) -> Result<()>
where
    W: io::Write,
{
    run_with_log_level(command, out, transport, config, output_format, None).await
}

/// Runs the CLI command with an explicit telemetry log-level override.
///
/// # Errors
///
/// Returns the same errors as [`run`].
pub async fn run_with_log_level<W>(
    command: Command,
    out: &mut W,
    transport: Arc<dyn MidiTransport>,
    config: SessionConfig,
    output_format: OutputFormat,
    log_level: Option<LogLevel>,
) -> Result<()>
where
    W: io::Write,
{
    run_with_clients(
        command,
        out,
        &SystemTerminalClient,
        transport,
        config,
        output_format,
        log_level,
    )
    .await
}

/// Runs the CLI command with injected clients and explicit telemetry settings.
///
/// # Errors
///
/// Returns the same errors as [`run`].
#[instrument(
    skip(out, terminal_client, transport),
    level = "info",
    fields(command = command.name(), device_id = %config.device_id(), ?output_format)
)]
pub async fn run_with_clients<W>(
    command: Command,
    out: &mut W,
    terminal_client: &dyn TerminalClient,
    transport: Arc<dyn MidiTransport>,
    config: SessionConfig,
    output_format: OutputFormat,
    log_level: Option<LogLevel>,
) -> Result<()>
where
    W: io::Write,
{
    telemetry::initialise_tracing(
        "wsx",
        terminal_client.stderr_is_terminal(),
        log_level.map(LogLevel::as_level_filter),
    )?;
    let painter = Painter::new(terminal_client.stdout_is_terminal());

    let open_session = || SysexSession::open(Arc::clone(&transport), config);
    match &command {
        // Validation never touches the transport.
        Command::Validate(args) => {
            crate::cli::transfer::run_validate(args, out, output_format, &painter).await
        }
        Command::Request(args) => {
            let session = open_session()?;
            crate::cli::request::run_request(&session, args, out, output_format).await
        }
        Command::Param(args) => {
            let session = open_session()?;
            crate::cli::request::run_param(&session, args, out, output_format).await
        }
        Command::Export(args) => {
            let session = open_session()?;
            crate::cli::transfer::run_export(&session, args, out, output_format).await
        }
        Command::Import(args) => {
            let session = open_session()?;
            crate::cli::transfer::run_import(&session, args, out, output_format).await
        }
        Command::Listen(args) => {
            let session = open_session()?;
            crate::cli::listen::run(&session, args, out, output_format, &painter).await
        }
    }
}
