use std::collections::VecDeque;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use bon::Builder;
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep};
use tracing::instrument;

use super::{InboundMessage, InboundReceiver, MidiTransport, hold_for_pacing};
use crate::error::{FixtureError, TransportError};
use crate::protocol::{
    BANK_DUMP, BANK_REQUEST_DATA, COMMAND_FAMILY, GLOBAL_DUMP_REQUEST, KORG_ID,
    PROGRAM_DUMP_REQUEST, WAVESTATION_MODEL_ID,
};
use crate::sysex::SysexFrame;

const DEFAULT_REPLY_DELAY: Duration = Duration::from_millis(20);

/// Messages the fake unit transmits in one burst, in full wire form.
///
/// Parsed from comma-separated hexadecimal messages, e.g. `F04230F7,F8`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct FakeReply {
    messages: Vec<Vec<u8>>,
}

impl FakeReply {
    /// Creates a reply from wire-form messages.
    #[must_use]
    pub fn new(messages: Vec<Vec<u8>>) -> Self {
        Self { messages }
    }

    /// Creates a reply holding one message.
    #[must_use]
    pub fn single(message: Vec<u8>) -> Self {
        Self::new(vec![message])
    }
}

impl FromStr for FakeReply {
    type Err = FixtureError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let messages = value
            .split(',')
            .map(parse_hex)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { messages })
    }
}

/// Settings for a fake MIDI transport.
#[derive(Debug, Clone, Builder)]
pub struct FakeTransportConfig {
    /// Replies consumed in order, one per dump request sent.
    #[builder(default)]
    replies: Vec<FakeReply>,
    /// Messages delivered to every listener as soon as it subscribes.
    inbound: Option<FakeReply>,
    #[builder(default = DEFAULT_REPLY_DELAY)]
    reply_delay: Duration,
    /// Starts with the port closed, as if the device was never opened.
    #[builder(default)]
    closed: bool,
}

/// In-process stand-in for a Wavestation on a MIDI port.
///
/// Answers dump requests from a scripted reply queue and records every frame
/// it is sent.
#[derive(Debug)]
pub struct FakeTransport {
    replies: Mutex<VecDeque<FakeReply>>,
    inbound: Option<FakeReply>,
    reply_delay: Duration,
    closed: AtomicBool,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<InboundMessage>>>,
    sent: Mutex<Vec<SysexFrame>>,
    opened_at: Instant,
}

impl FakeTransport {
    /// Creates a fake transport from explicit settings.
    #[must_use]
    pub fn new(config: FakeTransportConfig) -> Self {
        let FakeTransportConfig {
            replies,
            inbound,
            reply_delay,
            closed,
        } = config;

        Self {
            replies: Mutex::new(replies.into()),
            inbound,
            reply_delay,
            closed: AtomicBool::new(closed),
            subscribers: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
            opened_at: Instant::now(),
        }
    }

    /// Returns every frame sent so far, oldest first.
    #[must_use]
    pub fn sent_frames(&self) -> Vec<SysexFrame> {
        lock(&self.sent).clone()
    }

    /// Delivers `reply` to every current listener immediately.
    pub fn inject(&self, reply: &FakeReply) {
        deliver(&self.subscribers, reply, self.timestamp_micros());
    }

    /// Closes the port. Later sends fail and listener streams end.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        lock(&self.subscribers).clear();
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn timestamp_micros(&self) -> u64 {
        u64::try_from(self.opened_at.elapsed().as_micros()).unwrap_or(u64::MAX)
    }

    fn schedule_reply(&self, reply: FakeReply) {
        let listeners = lock(&self.subscribers).clone();
        let delay = self.reply_delay;
        let timestamp_micros = self.timestamp_micros().saturating_add(micros(delay));
        tokio::spawn(async move {
            sleep(delay).await;
            for message in reply.messages {
                let message = InboundMessage::from_wire(message, timestamp_micros);
                for listener in &listeners {
                    let _delivered = listener.send(message.clone());
                }
            }
        });
    }
}

#[async_trait]
impl MidiTransport for FakeTransport {
    #[instrument(skip(self, frame), level = "debug", fields(%frame, pacing_ms = pacing.as_millis()))]
    async fn send(&self, frame: &SysexFrame, pacing: Duration) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::PortClosed);
        }

        lock(&self.sent).push(frame.clone());
        if is_dump_request(frame) {
            let next_reply = lock(&self.replies).pop_front();
            match next_reply {
                Some(reply) => self.schedule_reply(reply),
                None => tracing::debug!("fake unit has no scripted reply"),
            }
        }

        hold_for_pacing(pacing).await;
        Ok(())
    }

    fn subscribe(&self) -> Result<InboundReceiver, TransportError> {
        if self.is_closed() {
            return Err(TransportError::PortClosed);
        }

        let (sender, receiver) = mpsc::unbounded_channel();
        if let Some(inbound) = &self.inbound {
            let timestamp_micros = self.timestamp_micros();
            for message in &inbound.messages {
                let _delivered =
                    sender.send(InboundMessage::from_wire(message.clone(), timestamp_micros));
            }
        }
        lock(&self.subscribers).push(sender);
        Ok(receiver)
    }
}

fn is_dump_request(frame: &SysexFrame) -> bool {
    matches!(
        frame.body(),
        [KORG_ID, _, COMMAND_FAMILY, GLOBAL_DUMP_REQUEST]
            | [KORG_ID, _, COMMAND_FAMILY, PROGRAM_DUMP_REQUEST, _]
            | [KORG_ID, _, WAVESTATION_MODEL_ID, BANK_REQUEST_DATA, BANK_DUMP, _]
    )
}

fn deliver(
    subscribers: &Mutex<Vec<mpsc::UnboundedSender<InboundMessage>>>,
    reply: &FakeReply,
    timestamp_micros: u64,
) {
    let listeners = lock(subscribers);
    for message in &reply.messages {
        let message = InboundMessage::from_wire(message.clone(), timestamp_micros);
        for listener in listeners.iter() {
            let _delivered = listener.send(message.clone());
        }
    }
}

fn parse_hex(raw_value: &str) -> Result<Vec<u8>, FixtureError> {
    let cleaned: String = raw_value.chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        return Err(FixtureError::EmptyPayload);
    }
    Ok(hex::decode(cleaned)?)
}

fn micros(duration: Duration) -> u64 {
    u64::try_from(duration.as_micros()).unwrap_or(u64::MAX)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
