use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::sleep;

use crate::error::TransportError;
use crate::sysex::{FrameCodec, SysexFrame};

/// Ordered inbound message channel for one registered listener.
pub type InboundReceiver = mpsc::UnboundedReceiver<InboundMessage>;

/// One message delivered by a MIDI input.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum InboundMessage {
    /// SysEx data with the outer `F0`/`F7` already stripped by the backend.
    Sysex { data: Vec<u8>, timestamp_micros: u64 },
    /// Any other MIDI message, passed through verbatim.
    Channel { bytes: Vec<u8>, timestamp_micros: u64 },
}

impl InboundMessage {
    /// Classifies raw wire bytes the way MIDI backends report them.
    ///
    /// Framed SysEx loses its delimiters; everything else is kept as-is.
    ///
    /// ```
    /// use wsx::InboundMessage;
    ///
    /// let message = InboundMessage::from_wire(vec![0xF0, 0x42, 0xF7], 0);
    /// assert_eq!(
    ///     InboundMessage::Sysex { data: vec![0x42], timestamp_micros: 0 },
    ///     message
    /// );
    /// ```
    #[must_use]
    pub fn from_wire(bytes: Vec<u8>, timestamp_micros: u64) -> Self {
        if FrameCodec::is_framed(&bytes) {
            let data = bytes[1..bytes.len() - 1].to_vec();
            Self::Sysex {
                data,
                timestamp_micros,
            }
        } else {
            Self::Channel {
                bytes,
                timestamp_micros,
            }
        }
    }

    /// Returns the backend timestamp in microseconds.
    #[must_use]
    pub fn timestamp_micros(&self) -> u64 {
        match self {
            Self::Sysex {
                timestamp_micros, ..
            }
            | Self::Channel {
                timestamp_micros, ..
            } => *timestamp_micros,
        }
    }
}

/// Outbound and inbound MIDI plumbing consumed by a session.
///
/// Device enumeration, port opening, and backend wiring live outside this
/// crate; an adapter only has to move bytes.
#[async_trait]
pub trait MidiTransport: Send + Sync + fmt::Debug {
    /// Sends one complete frame, then holds the sending task for `pacing`.
    ///
    /// The pacing hold must not stall inbound delivery.
    async fn send(&self, frame: &SysexFrame, pacing: Duration) -> Result<(), TransportError>;

    /// Registers a listener. Messages arrive on the returned channel in the
    /// order the backend received them.
    fn subscribe(&self) -> Result<InboundReceiver, TransportError>;
}

/// Holds the sending task for the hardware's inter-message spacing.
pub async fn hold_for_pacing(delay: Duration) {
    if !delay.is_zero() {
        sleep(delay).await;
    }
}
