mod fake_transport;
mod inbound_router;
mod midi_transport;

pub use self::fake_transport::{FakeReply, FakeTransport, FakeTransportConfig};
pub use self::inbound_router::{MessageKind, ReceivedMessage};
pub(crate) use self::inbound_router::InboundRouter;
pub use self::midi_transport::{InboundMessage, InboundReceiver, MidiTransport, hold_for_pacing};
