use std::io;

use anyhow::Result;
use clap::{Args, Subcommand};
use tracing::instrument;

use crate::cli::OutputFormat;
use crate::cli::output::{CommandResult, write_json_line};
use crate::protocol::{BankId, DumpRequest};
use crate::session::SysexSession;

/// Arguments for the `request` command.
#[derive(Debug, Args)]
pub struct RequestArgs {
    #[command(subcommand)]
    target: DumpTarget,
}

impl RequestArgs {
    /// Creates request arguments for one dump.
    #[must_use]
    pub fn new(target: DumpTarget) -> Self {
        Self { target }
    }
}

/// Dump selected on the command line.
#[derive(Debug, Clone, Copy, Subcommand)]
pub enum DumpTarget {
    /// Global settings.
    Global,
    /// One program.
    Program {
        /// Program number (0..=127).
        #[arg(value_parser = clap::value_parser!(u8).range(0..=127))]
        program: u8,
    },
    /// A full bank.
    Bank {
        /// One of `ram1`, `ram2`, `rom1`, `rom2`.
        bank: BankId,
    },
}

impl From<DumpTarget> for DumpRequest {
    fn from(target: DumpTarget) -> Self {
        match target {
            DumpTarget::Global => Self::Global,
            DumpTarget::Program { program } => Self::Program(program),
            DumpTarget::Bank { bank } => Self::Bank(bank),
        }
    }
}

/// Arguments for the `param` command.
#[derive(Debug, Args)]
pub struct ParamArgs {
    /// Parameter number (0..=127).
    #[arg(value_parser = clap::value_parser!(u8).range(0..=127))]
    param_id: u8,
    /// New value (0..=127).
    #[arg(value_parser = clap::value_parser!(u8).range(0..=127))]
    value: u8,
}

impl ParamArgs {
    /// Creates parameter-change arguments; both operands are masked on the wire.
    #[must_use]
    pub fn new(param_id: u8, value: u8) -> Self {
        Self { param_id, value }
    }
}

/// Executes the `request` command.
#[instrument(skip(session, out), level = "info", fields(target = ?args.target))]
pub(crate) async fn run_request<W>(
    session: &SysexSession,
    args: &RequestArgs,
    out: &mut W,
    output_format: OutputFormat,
) -> Result<()>
where
    W: io::Write,
{
    let request = DumpRequest::from(args.target);
    let frame = session.builder().dump_request(request);
    session.request_dump(request).await?;

    match output_format {
        OutputFormat::Pretty => writeln!(out, "Sent {request} request: {frame}")?,
        OutputFormat::Json => write_json_line(
            out,
            &CommandResult::Request {
                request: request.to_string(),
                frame: frame.into_bytes(),
            },
        )?,
    }
    Ok(())
}

/// Executes the `param` command.
#[instrument(skip(session, out), level = "info")]
pub(crate) async fn run_param<W>(
    session: &SysexSession,
    args: &ParamArgs,
    out: &mut W,
    output_format: OutputFormat,
) -> Result<()>
where
    W: io::Write,
{
    let frame = session.builder().parameter_change(args.param_id, args.value);
    session
        .send_parameter_change(args.param_id, args.value)
        .await?;

    match output_format {
        OutputFormat::Pretty => writeln!(
            out,
            "Sent parameter {} = {}: {frame}",
            args.param_id, args.value
        )?,
        OutputFormat::Json => write_json_line(
            out,
            &CommandResult::Param {
                param_id: args.param_id,
                value: args.value,
                frame: frame.into_bytes(),
            },
        )?,
    }
    Ok(())
}
