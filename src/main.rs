use std::io::IsTerminal;
use std::process::ExitCode;

use clap::Parser;

use wsx::{Args, OutputFormat, fake_transport, run_with_log_level, unconfigured_transport};

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let mut stdout = std::io::stdout();

    let log_level = args.log_level();
    let output_format = args.output_format().unwrap_or(if stdout.is_terminal() {
        OutputFormat::Pretty
    } else {
        OutputFormat::Json
    });
    let config = args.session_config();
    let (command, maybe_fake_args) = args.into_command_and_fake_args();
    let transport = match maybe_fake_args {
        Some(fake_args) => fake_transport(fake_args),
        None => unconfigured_transport(),
    };

    let run_result = run_with_log_level(
        command,
        &mut stdout,
        transport,
        config,
        output_format,
        log_level,
    )
    .await;

    match run_result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::from(1)
        }
    }
}
