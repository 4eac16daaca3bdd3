use std::time::Duration;

use bon::Builder;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::level_filters::LevelFilter;

use crate::cli::listen::ListenArgs;
use crate::cli::request::{ParamArgs, RequestArgs};
use crate::cli::transfer::{ExportArgs, ImportArgs, ValidateArgs};
use crate::error::{CliConfigError, FixtureError};
use crate::protocol::DeviceId;
use crate::session::SessionConfig;
use crate::sysex::CompletionPolicy;
use crate::transport::{FakeReply, FakeTransportConfig};

const DEFAULT_FAKE_REPLY_DELAY: Duration = Duration::from_millis(20);

/// Command-line options for the Wavestation SysEx tool.
#[derive(Debug, Parser)]
#[command(
    name = "wsx",
    about = "Exchange SysEx dumps and patches with a Korg Wavestation."
)]
pub struct Args {
    /// SysEx device ID of the target unit, decimal or `0x`-prefixed hex.
    #[arg(long, global = true, default_value = "0x30", value_parser = parse_device_id)]
    device_id: DeviceId,
    /// Hold after every outbound message (e.g. `30ms`).
    #[arg(long, global = true, default_value = "30ms", value_parser = parse_duration)]
    pacing: Duration,
    /// How long an export waits for the requested dump (e.g. `1s`).
    #[arg(long, global = true, default_value = "1s", value_parser = parse_duration)]
    dump_timeout: Duration,
    /// Always wait out the whole dump window instead of stopping at the first complete frame.
    #[arg(long, global = true)]
    full_window: bool,
    /// Log verbosity; overrides `RUST_LOG`.
    #[arg(long, global = true, value_enum)]
    log_level: Option<LogLevel>,
    /// Output format; defaults to pretty on a terminal and JSON otherwise.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputFormat>,
    /// Uses an in-process fake Wavestation instead of a MIDI port.
    #[arg(long, global = true)]
    fake: bool,
    /// Fake reply to the next dump request, as comma-separated hexadecimal messages.
    #[arg(long, global = true, requires = "fake")]
    fake_dump: Vec<FakeReply>,
    /// Fake unsolicited messages delivered when the session opens.
    #[arg(long, global = true, requires = "fake")]
    fake_inbound: Option<FakeReply>,
    /// Delay before the fake unit answers a dump request (e.g. `20ms`).
    #[arg(long, global = true, requires = "fake", value_parser = parse_duration)]
    fake_reply_delay: Option<Duration>,
    #[command(subcommand)]
    command: Command,
}

impl Args {
    /// Creates argument values directly without CLI parsing.
    ///
    /// ```
    /// use wsx::{Args, Command, ListenArgs};
    ///
    /// let args = Args::new(Command::Listen(ListenArgs::new(Some(4))));
    /// let (command, fake_args) = args.into_command_and_fake_args();
    ///
    /// assert!(matches!(command, Command::Listen(_)));
    /// assert!(fake_args.is_none());
    /// ```
    #[must_use]
    pub fn new(command: Command) -> Self {
        Self {
            device_id: DeviceId::default(),
            pacing: SessionConfig::default().pacing_delay(),
            dump_timeout: SessionConfig::default().dump_timeout(),
            full_window: false,
            log_level: None,
            format: None,
            fake: false,
            fake_dump: Vec::new(),
            fake_inbound: None,
            fake_reply_delay: None,
            command,
        }
    }

    /// Enables fake transport mode with pre-parsed fake configuration.
    #[must_use]
    pub fn with_fake(mut self, fake: FakeArgs) -> Self {
        let FakeArgs {
            dumps,
            inbound,
            reply_delay,
        } = fake;

        self.fake = true;
        self.fake_dump = dumps;
        self.fake_inbound = inbound;
        self.fake_reply_delay = Some(reply_delay);
        self
    }

    /// Overrides the output format.
    #[must_use]
    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.format = Some(format);
        self
    }

    /// Returns the explicit log-level override, if any.
    #[must_use]
    pub fn log_level(&self) -> Option<LogLevel> {
        self.log_level
    }

    /// Returns the explicit output format, if any.
    #[must_use]
    pub fn output_format(&self) -> Option<OutputFormat> {
        self.format
    }

    /// Returns the session settings selected by the global flags.
    #[must_use]
    pub fn session_config(&self) -> SessionConfig {
        let completion = if self.full_window {
            CompletionPolicy::FullWindow
        } else {
            CompletionPolicy::FirstCompleteFrame
        };

        SessionConfig::builder()
            .device_id(self.device_id)
            .pacing_delay(self.pacing)
            .dump_timeout(self.dump_timeout)
            .completion(completion)
            .build()
    }

    /// Splits parsed CLI arguments into command and optional fake-transport settings.
    #[must_use]
    pub fn into_command_and_fake_args(self) -> (Command, Option<FakeArgs>) {
        let Args {
            fake,
            fake_dump,
            fake_inbound,
            fake_reply_delay,
            command,
            ..
        } = self;

        let fake_args = fake.then(|| FakeArgs {
            dumps: fake_dump,
            inbound: fake_inbound,
            reply_delay: fake_reply_delay.unwrap_or(DEFAULT_FAKE_REPLY_DELAY),
        });

        (command, fake_args)
    }
}

/// Fake transport arguments for programmatic runs.
///
/// ```
/// use wsx::MidiTransport;
///
/// let fake = wsx::FakeArgs::builder()
///     .dumps(vec!["F04230283E00F7".parse()?])
///     .inbound("F8")?
///     .build();
/// let transport = wsx::fake_transport(fake);
///
/// assert!(transport.subscribe().is_ok());
/// # Ok::<(), wsx::FixtureError>(())
/// ```
#[derive(Debug, Clone, Builder)]
pub struct FakeArgs {
    /// Replies consumed in order, one per dump request.
    #[builder(default)]
    dumps: Vec<FakeReply>,
    #[builder(with = |value: &str| -> std::result::Result<_, FixtureError> { value.parse() })]
    inbound: Option<FakeReply>,
    #[builder(default = DEFAULT_FAKE_REPLY_DELAY)]
    reply_delay: Duration,
}

impl FakeArgs {
    pub(crate) fn into_transport_config(self) -> FakeTransportConfig {
        let Self {
            dumps,
            inbound,
            reply_delay,
        } = self;

        FakeTransportConfig::builder()
            .replies(dumps)
            .maybe_inbound(inbound)
            .reply_delay(reply_delay)
            .build()
    }
}

/// Log verbosity selected on the command line.
#[derive(Debug, Clone, Copy, Eq, PartialEq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub(crate) fn as_level_filter(self) -> LevelFilter {
        match self {
            Self::Error => LevelFilter::ERROR,
            Self::Warn => LevelFilter::WARN,
            Self::Info => LevelFilter::INFO,
            Self::Debug => LevelFilter::DEBUG,
            Self::Trace => LevelFilter::TRACE,
        }
    }
}

/// How command results are written to stdout.
#[derive(Debug, Clone, Copy, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable lines, coloured on a terminal.
    Pretty,
    /// One JSON document per result.
    Json,
}

/// Supported CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Send a dump request without waiting for the reply.
    Request(RequestArgs),
    /// Send one parameter change.
    Param(ParamArgs),
    /// Request a dump, wait for it, and save it to a `.syx` file.
    Export(ExportArgs),
    /// Validate a `.syx` file and send it to the unit.
    Import(ImportArgs),
    /// Classify a `.syx` file as patch, bank, or invalid without sending it.
    Validate(ValidateArgs),
    /// Print inbound MIDI messages as hex lines.
    Listen(ListenArgs),
}

impl Command {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Self::Request(_args) => "request",
            Self::Param(_args) => "param",
            Self::Export(_args) => "export",
            Self::Import(_args) => "import",
            Self::Validate(_args) => "validate",
            Self::Listen(_args) => "listen",
        }
    }
}

fn parse_device_id(value: &str) -> Result<DeviceId, CliConfigError> {
    let invalid = || CliConfigError::InvalidDeviceId {
        value: value.to_string(),
    };
    let raw = match value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        Some(hex_digits) => u8::from_str_radix(hex_digits, 16).map_err(|_error| invalid())?,
        None => value.parse::<u8>().map_err(|_error| invalid())?,
    };
    if raw > 0x7F {
        return Err(invalid());
    }
    Ok(DeviceId::new(raw))
}

fn parse_duration(value: &str) -> Result<Duration, String> {
    humantime::parse_duration(value).map_err(|error| error.to_string())
}
