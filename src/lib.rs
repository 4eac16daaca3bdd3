mod app;
mod cli;
mod error;
mod protocol;
mod session;
mod store;
mod sysex;
mod telemetry;
mod terminal;
mod transport;
mod utils;

pub use app::{fake_transport, run, run_with_clients, run_with_log_level, unconfigured_transport};
pub use cli::{
    Args, Command, DumpTarget, ExportArgs, ExportTarget, FakeArgs, ImportArgs, ImportTarget,
    ListenArgs, ListenStopReason, ListenSummary, LogLevel, OutputFormat, ParamArgs, RequestArgs,
    ValidateArgs,
};
pub use error::{FixtureError, SysexError, TransportError};
pub use protocol::{BankId, DeviceId, DumpRequest, KORG_ID, WAVESTATION_MODEL_ID};
pub use session::{ExportReceipt, ImportReceipt, SessionConfig, SysexSession};
pub use store::PatchStore;
pub use sysex::{
    BANK_MIN_LEN, CollectorState, CompletionPolicy, DumpCollector, FrameCodec, FrameCodecError,
    MessageBuilder, PATCH_MIN_LEN, PayloadKind, PayloadValidator, SYSEX_END, SYSEX_START,
    SysexFrame, WaitOutcome,
};
pub use terminal::{SystemTerminalClient, TerminalClient};
pub use transport::{
    FakeReply, FakeTransport, FakeTransportConfig, InboundMessage, InboundReceiver, MessageKind,
    MidiTransport, ReceivedMessage, hold_for_pacing,
};
