pub(crate) mod command;
pub(crate) mod listen;
mod output;
pub(crate) mod request;
pub(crate) mod transfer;
pub(crate) mod ui;

pub use self::command::{Args, Command, FakeArgs, LogLevel, OutputFormat};
pub use self::listen::{ListenArgs, ListenStopReason, ListenSummary};
pub use self::request::{DumpTarget, ParamArgs, RequestArgs};
pub use self::transfer::{ExportArgs, ExportTarget, ImportArgs, ImportTarget, ValidateArgs};
