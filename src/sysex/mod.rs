mod dump_collector;
mod frame_codec;
mod message_builder;
mod validator;

pub use self::dump_collector::{CollectorState, CompletionPolicy, DumpCollector, WaitOutcome};
pub use self::frame_codec::{FrameCodec, FrameCodecError, SYSEX_END, SYSEX_START, SysexFrame};
pub use self::message_builder::MessageBuilder;
pub use self::validator::{BANK_MIN_LEN, PATCH_MIN_LEN, PayloadKind, PayloadValidator};
