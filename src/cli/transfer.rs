use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use clap::{Args, Subcommand};
use owo_colors::OwoColorize;
use tokio_util::sync::CancellationToken;
use tracing::instrument;
use tracing_indicatif::span_ext::IndicatifSpanExt;

use crate::cli::OutputFormat;
use crate::cli::output::{CommandResult, write_json_line};
use crate::cli::ui::{Painter, ValidationView};
use crate::protocol::{BankId, DumpRequest};
use crate::session::SysexSession;
use crate::store::PatchStore;
use crate::sysex::{PayloadKind, PayloadValidator};

/// Arguments for the `export` command.
#[derive(Debug, Args)]
pub struct ExportArgs {
    #[command(subcommand)]
    target: ExportTarget,
}

impl ExportArgs {
    /// Creates export arguments.
    #[must_use]
    pub fn new(target: ExportTarget) -> Self {
        Self { target }
    }
}

/// Dump to export and the file receiving it.
#[derive(Debug, Clone, Subcommand)]
pub enum ExportTarget {
    /// Global settings.
    Global {
        /// Destination `.syx` file.
        file: PathBuf,
    },
    /// One program.
    Program {
        /// Program number (0..=127).
        #[arg(value_parser = clap::value_parser!(u8).range(0..=127))]
        program: u8,
        /// Destination `.syx` file.
        file: PathBuf,
    },
    /// A full bank.
    Bank {
        /// One of `ram1`, `ram2`, `rom1`, `rom2`.
        bank: BankId,
        /// Destination `.syx` file.
        file: PathBuf,
    },
}

impl ExportTarget {
    fn request(&self) -> DumpRequest {
        match self {
            Self::Global { .. } => DumpRequest::Global,
            Self::Program { program, .. } => DumpRequest::Program(*program),
            Self::Bank { bank, .. } => DumpRequest::Bank(*bank),
        }
    }

    fn file(&self) -> &Path {
        match self {
            Self::Global { file } | Self::Program { file, .. } | Self::Bank { file, .. } => file,
        }
    }
}

/// Arguments for the `import` command.
#[derive(Debug, Args)]
pub struct ImportArgs {
    #[command(subcommand)]
    target: ImportTarget,
}

impl ImportArgs {
    /// Creates import arguments.
    #[must_use]
    pub fn new(target: ImportTarget) -> Self {
        Self { target }
    }
}

/// Payload class expected in the imported file.
#[derive(Debug, Clone, Subcommand)]
pub enum ImportTarget {
    /// A single-program patch.
    Patch {
        /// Source `.syx` file.
        file: PathBuf,
    },
    /// A full bank.
    Bank {
        /// Source `.syx` file.
        file: PathBuf,
    },
}

impl ImportTarget {
    fn kind(&self) -> PayloadKind {
        match self {
            Self::Patch { .. } => PayloadKind::Patch,
            Self::Bank { .. } => PayloadKind::Bank,
        }
    }

    fn file(&self) -> &Path {
        match self {
            Self::Patch { file } | Self::Bank { file } => file,
        }
    }
}

/// Arguments for the `validate` command.
#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// `.syx` file to classify.
    file: PathBuf,
}

impl ValidateArgs {
    /// Creates validate arguments.
    #[must_use]
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self { file: file.into() }
    }
}

/// Executes the `export` command. Ctrl+C abandons the wait.
#[instrument(skip(session, args, out), level = "info", fields(request = %args.target.request()))]
pub(crate) async fn run_export<W>(
    session: &SysexSession,
    args: &ExportArgs,
    out: &mut W,
    output_format: OutputFormat,
) -> Result<()>
where
    W: io::Write,
{
    let request = args.target.request();
    let span = tracing::Span::current();
    span.pb_set_message(&format!("Waiting for {request}"));

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.cancel();
        }
    });
    let export_result = session
        .export_dump(request, args.target.file(), &cancel)
        .await;
    watcher.abort();

    let receipt = match export_result {
        Ok(receipt) => receipt,
        Err(error) => {
            span.pb_set_finish_message(&format!("{} Export failed", "✗".red()));
            return Err(error.into());
        }
    };
    span.pb_set_finish_message(&format!("{} Exported {request}", "✓".green()));

    match output_format {
        OutputFormat::Pretty => writeln!(
            out,
            "Exported {} to {} ({} bytes)",
            receipt.request(),
            receipt.path().display(),
            receipt.bytes_written()
        )?,
        OutputFormat::Json => write_json_line(
            out,
            &CommandResult::Export {
                request: receipt.request().to_string(),
                path: receipt.path().to_path_buf(),
                bytes_written: receipt.bytes_written(),
            },
        )?,
    }
    Ok(())
}

/// Executes the `import` command.
#[instrument(skip(session, args, out), level = "info", fields(kind = %args.target.kind()))]
pub(crate) async fn run_import<W>(
    session: &SysexSession,
    args: &ImportArgs,
    out: &mut W,
    output_format: OutputFormat,
) -> Result<()>
where
    W: io::Write,
{
    let receipt = session
        .import_file(args.target.kind(), args.target.file())
        .await?;

    match output_format {
        OutputFormat::Pretty => writeln!(
            out,
            "Imported {} from {} ({} bytes)",
            receipt.kind(),
            receipt.path().display(),
            receipt.bytes_sent()
        )?,
        OutputFormat::Json => write_json_line(
            out,
            &CommandResult::Import {
                kind: receipt.kind(),
                path: receipt.path().to_path_buf(),
                bytes_sent: receipt.bytes_sent(),
            },
        )?,
    }
    Ok(())
}

/// Executes the `validate` command. Invalid files are reported, then fail the run.
#[instrument(skip(args, out, painter), level = "info", fields(file = %args.file.display()))]
pub(crate) async fn run_validate<W>(
    args: &ValidateArgs,
    out: &mut W,
    output_format: OutputFormat,
    painter: &Painter,
) -> Result<()>
where
    W: io::Write,
{
    let payload = PatchStore::load(&args.file).await?;
    let kind = PayloadValidator::classify(&payload);

    match output_format {
        OutputFormat::Pretty => writeln!(
            out,
            "{}",
            ValidationView::new(&args.file, &payload, kind, painter)
        )?,
        OutputFormat::Json => write_json_line(
            out,
            &CommandResult::Validate {
                path: args.file.clone(),
                len: payload.len(),
                kind,
            },
        )?,
    }

    if kind.is_none() {
        bail!(
            "`{}` is neither a Wavestation patch nor a bank",
            args.file.display()
        );
    }
    Ok(())
}
