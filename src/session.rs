use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as SyncMutex, PoisonError};
use std::time::Duration;

use bon::Builder;
use tokio::sync::{Mutex, broadcast};
use tokio_stream::wrappers::BroadcastStream;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::error::SysexError;
use crate::protocol::{BankId, DeviceId, DumpRequest};
use crate::store::PatchStore;
use crate::sysex::{
    CompletionPolicy, DumpCollector, MessageBuilder, PayloadKind, PayloadValidator, SysexFrame,
    WaitOutcome,
};
use crate::transport::{InboundRouter, MidiTransport, ReceivedMessage};

const DEFAULT_PACING_DELAY: Duration = Duration::from_millis(30);
const DEFAULT_DUMP_TIMEOUT: Duration = Duration::from_secs(1);
const RECEIVED_CHANNEL_CAPACITY: usize = 64;

/// Settings for one SysEx session.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Builder)]
pub struct SessionConfig {
    /// Address of the target unit.
    #[builder(default)]
    device_id: DeviceId,
    /// Post-send hold honouring the unit's minimum message spacing.
    #[builder(default = DEFAULT_PACING_DELAY)]
    pacing_delay: Duration,
    /// How long an export waits for the requested dump.
    #[builder(default = DEFAULT_DUMP_TIMEOUT)]
    dump_timeout: Duration,
    #[builder(default)]
    completion: CompletionPolicy,
}

impl SessionConfig {
    #[must_use]
    pub fn device_id(&self) -> DeviceId {
        self.device_id
    }

    #[must_use]
    pub fn pacing_delay(&self) -> Duration {
        self.pacing_delay
    }

    #[must_use]
    pub fn dump_timeout(&self) -> Duration {
        self.dump_timeout
    }

    #[must_use]
    pub fn completion(&self) -> CompletionPolicy {
        self.completion
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Outcome of a successful export.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ExportReceipt {
    request: DumpRequest,
    path: PathBuf,
    bytes_written: usize,
}

impl ExportReceipt {
    #[must_use]
    pub fn request(&self) -> DumpRequest {
        self.request
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn bytes_written(&self) -> usize {
        self.bytes_written
    }
}

/// Outcome of a successful import.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ImportReceipt {
    kind: PayloadKind,
    path: PathBuf,
    bytes_sent: usize,
}

impl ImportReceipt {
    #[must_use]
    pub fn kind(&self) -> PayloadKind {
        self.kind
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn bytes_sent(&self) -> usize {
        self.bytes_sent
    }
}

/// A conversation with one Wavestation over a MIDI transport.
///
/// Requests are fire-and-forget. Exports and imports are serialised per
/// session because they share the session's dump collector.
pub struct SysexSession {
    transport: Arc<dyn MidiTransport>,
    builder: MessageBuilder,
    config: SessionConfig,
    collector: Arc<DumpCollector>,
    // The router owns the only strong sender, so listener streams end with it.
    received: broadcast::WeakSender<ReceivedMessage>,
    first_listener: SyncMutex<Option<broadcast::Receiver<ReceivedMessage>>>,
    transfer: Mutex<()>,
    router: InboundRouter,
}

impl SysexSession {
    /// Subscribes to `transport` and starts routing inbound traffic.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`SysexError::TransportUnavailable`] when the transport refuses
    /// the subscription.
    #[instrument(skip(transport), level = "debug", fields(device_id = %config.device_id))]
    pub fn open(
        transport: Arc<dyn MidiTransport>,
        config: SessionConfig,
    ) -> Result<Self, SysexError> {
        let inbound = transport.subscribe()?;
        let collector = Arc::new(DumpCollector::new());
        let (received, first_listener) = broadcast::channel(RECEIVED_CHANNEL_CAPACITY);
        let weak_received = received.downgrade();
        let router = InboundRouter::spawn(inbound, Arc::clone(&collector), received);

        Ok(Self {
            transport,
            builder: MessageBuilder::new(config.device_id),
            config,
            collector,
            received: weak_received,
            first_listener: SyncMutex::new(Some(first_listener)),
            transfer: Mutex::new(()),
            router,
        })
    }

    /// Returns the session settings.
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Returns the message builder bound to this session's device.
    #[must_use]
    pub fn builder(&self) -> MessageBuilder {
        self.builder
    }

    /// Returns the dump collector fed by this session's inbound traffic.
    #[must_use]
    pub fn collector(&self) -> &DumpCollector {
        &self.collector
    }

    /// Streams every inbound message with delimiters restored.
    ///
    /// The first call also yields messages received since the session
    /// opened; later calls only see new traffic. Streams end once the
    /// transport closes its inbound side.
    #[must_use]
    pub fn received_messages(&self) -> BroadcastStream<ReceivedMessage> {
        let first = self
            .first_listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let receiver = first
            .or_else(|| self.received.upgrade().map(|sender| sender.subscribe()))
            .unwrap_or_else(|| broadcast::channel(1).1);
        BroadcastStream::new(receiver)
    }

    /// Asks the unit for its global settings.
    ///
    /// # Errors
    ///
    /// Returns [`SysexError::TransportUnavailable`] when the send fails.
    pub async fn request_global_dump(&self) -> Result<(), SysexError> {
        self.request_dump(DumpRequest::Global).await
    }

    /// Asks the unit for one program; `program` is masked to 7 bits.
    ///
    /// # Errors
    ///
    /// Returns [`SysexError::TransportUnavailable`] when the send fails.
    pub async fn request_program_dump(&self, program: u8) -> Result<(), SysexError> {
        self.request_dump(DumpRequest::Program(program)).await
    }

    /// Asks the unit for a full bank.
    ///
    /// # Errors
    ///
    /// Returns [`SysexError::TransportUnavailable`] when the send fails.
    pub async fn request_bank_dump(&self, bank: BankId) -> Result<(), SysexError> {
        self.request_dump(DumpRequest::Bank(bank)).await
    }

    /// Sends the request frame for `request`.
    ///
    /// # Errors
    ///
    /// Returns [`SysexError::TransportUnavailable`] when the send fails.
    #[instrument(skip(self), level = "debug")]
    pub async fn request_dump(&self, request: DumpRequest) -> Result<(), SysexError> {
        self.transmit(&self.builder.dump_request(request)).await
    }

    /// Sends one parameter change; both operands are masked to 7 bits.
    ///
    /// # Errors
    ///
    /// Returns [`SysexError::TransportUnavailable`] when the send fails.
    #[instrument(skip(self), level = "debug")]
    pub async fn send_parameter_change(&self, param_id: u8, value: u8) -> Result<(), SysexError> {
        self.transmit(&self.builder.parameter_change(param_id, value))
            .await
    }

    /// Validates and transmits a full patch verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`SysexError::InvalidPayload`] without sending anything when
    /// the payload is not a well-formed patch, or
    /// [`SysexError::TransportUnavailable`] when the send fails.
    pub async fn send_full_patch(&self, payload: &[u8]) -> Result<(), SysexError> {
        self.send_payload(PayloadKind::Patch, payload).await
    }

    /// Validates and transmits a full bank verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`SysexError::InvalidPayload`] without sending anything when
    /// the payload is not a well-formed bank, or
    /// [`SysexError::TransportUnavailable`] when the send fails.
    pub async fn send_full_bank(&self, payload: &[u8]) -> Result<(), SysexError> {
        self.send_payload(PayloadKind::Bank, payload).await
    }

    /// Returns whether `payload` is a well-formed Wavestation patch.
    #[must_use]
    pub fn is_valid_patch(&self, payload: &[u8]) -> bool {
        PayloadValidator::is_valid_patch(payload)
    }

    /// Returns whether `payload` is a well-formed Wavestation bank.
    #[must_use]
    pub fn is_valid_bank(&self, payload: &[u8]) -> bool {
        PayloadValidator::is_valid_bank(payload)
    }

    /// Requests a dump and waits for it to accumulate.
    ///
    /// The collector is armed behind any traffic already delivered, before the
    /// request goes out, and disarmed when the wait ends or the returned
    /// future is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`SysexError::IncompleteDump`] when no well-framed dump arrives
    /// within the configured window, [`SysexError::Cancelled`] when `cancel`
    /// fires first (nothing is sent if it already has), or
    /// [`SysexError::TransportUnavailable`] when the inbound stream has ended
    /// or the request cannot be sent.
    pub async fn collect_dump(
        &self,
        request: DumpRequest,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, SysexError> {
        let _transfer = self.transfer.lock().await;
        self.collect_dump_exclusive(request, cancel).await
    }

    /// Requests a dump and writes it byte-for-byte to `path`.
    ///
    /// Nothing is written unless a complete dump was collected.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`SysexSession::collect_dump`], or
    /// [`SysexError::Io`] when the file cannot be written.
    #[instrument(skip(self, cancel), level = "info", fields(path = %path.display()))]
    pub async fn export_dump(
        &self,
        request: DumpRequest,
        path: &Path,
        cancel: &CancellationToken,
    ) -> Result<ExportReceipt, SysexError> {
        let _transfer = self.transfer.lock().await;
        let dump = self.collect_dump_exclusive(request, cancel).await?;
        PatchStore::save(path, &dump).await?;
        tracing::info!(bytes_written = dump.len(), "exported dump");

        Ok(ExportReceipt {
            request,
            path: path.to_path_buf(),
            bytes_written: dump.len(),
        })
    }

    /// Loads `path`, validates it as `kind`, and transmits it verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`SysexError::Io`] when the file cannot be read,
    /// [`SysexError::InvalidPayload`] when it fails validation (nothing is
    /// sent), or [`SysexError::TransportUnavailable`] when the send fails.
    #[instrument(skip(self), level = "info", fields(path = %path.display()))]
    pub async fn import_file(
        &self,
        kind: PayloadKind,
        path: &Path,
    ) -> Result<ImportReceipt, SysexError> {
        let _transfer = self.transfer.lock().await;
        let payload = PatchStore::load(path).await?;
        self.send_payload(kind, &payload).await?;
        tracing::info!(bytes_sent = payload.len(), "imported {kind}");

        Ok(ImportReceipt {
            kind,
            path: path.to_path_buf(),
            bytes_sent: payload.len(),
        })
    }

    #[instrument(skip(self, cancel), level = "debug")]
    async fn collect_dump_exclusive(
        &self,
        request: DumpRequest,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, SysexError> {
        if cancel.is_cancelled() {
            return Err(SysexError::Cancelled);
        }
        self.router.flush().await?;
        let armed = ArmedCollector::arm(&self.collector);
        self.request_dump(request).await?;
        let outcome = self
            .collector
            .wait_for_completion(self.config.dump_timeout, self.config.completion, cancel)
            .await;
        drop(armed);

        if outcome == WaitOutcome::Cancelled {
            tracing::debug!("dump collection cancelled");
            return Err(SysexError::Cancelled);
        }
        if !self.collector.is_complete() {
            let received = self.collector.received_len();
            tracing::warn!(received, "dump incomplete");
            return Err(SysexError::IncompleteDump {
                received,
                timeout_ms: u64::try_from(self.config.dump_timeout.as_millis())
                    .unwrap_or(u64::MAX),
            });
        }

        Ok(self.collector.full_dump())
    }

    async fn send_payload(&self, kind: PayloadKind, payload: &[u8]) -> Result<(), SysexError> {
        let invalid = || SysexError::InvalidPayload {
            kind,
            len: payload.len(),
        };
        if !PayloadValidator::is_valid(kind, payload) {
            tracing::warn!(%kind, len = payload.len(), "refusing to send invalid payload");
            return Err(invalid());
        }

        let frame = SysexFrame::try_from(payload.to_vec()).map_err(|_error| invalid())?;
        self.transmit(&frame).await
    }

    async fn transmit(&self, frame: &SysexFrame) -> Result<(), SysexError> {
        tracing::debug!(%frame, "sending SysEx");
        self.transport
            .send(frame, self.config.pacing_delay)
            .await?;
        Ok(())
    }
}

impl fmt::Debug for SysexSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SysexSession")
            .field("transport", &self.transport)
            .field("config", &self.config)
            .field("collector", &self.collector)
            .finish_non_exhaustive()
    }
}

/// Keeps the collector armed for its lifetime.
struct ArmedCollector<'a> {
    collector: &'a DumpCollector,
}

impl<'a> ArmedCollector<'a> {
    fn arm(collector: &'a DumpCollector) -> Self {
        collector.start();
        Self { collector }
    }
}

impl Drop for ArmedCollector<'_> {
    fn drop(&mut self) {
        self.collector.stop();
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::error::TransportError;
    use crate::sysex::CollectorState;
    use crate::transport::{FakeReply, FakeTransport, FakeTransportConfig};

    const PROGRAM_DUMP: [u8; 12] = [
        0xF0, 0x42, 0x30, 0x28, 0x40, 0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0xF7,
    ];

    fn session_with(config: FakeTransportConfig) -> (Arc<FakeTransport>, SysexSession) {
        let transport = Arc::new(FakeTransport::new(config));
        let session = SysexSession::open(transport.clone(), SessionConfig::default())
            .expect("fake transport should accept the session");
        (transport, session)
    }

    #[test]
    fn default_config_matches_unit_timing() {
        let config = SessionConfig::default();
        assert_eq!(DeviceId::GLOBAL, config.device_id());
        assert_eq!(Duration::from_millis(30), config.pacing_delay());
        assert_eq!(Duration::from_secs(1), config.dump_timeout());
        assert_eq!(CompletionPolicy::FirstCompleteFrame, config.completion());
    }

    #[tokio::test(start_paused = true)]
    async fn collect_dump_returns_reply_and_disarms() {
        let (_transport, session) = session_with(
            FakeTransportConfig::builder()
                .replies(vec![FakeReply::single(PROGRAM_DUMP.to_vec())])
                .build(),
        );

        let dump = session
            .collect_dump(DumpRequest::Program(0), &CancellationToken::new())
            .await
            .expect("scripted dump should be collected");

        assert_eq!(PROGRAM_DUMP.to_vec(), dump);
        assert_eq!(CollectorState::Idle, session.collector().state());
    }

    #[tokio::test(start_paused = true)]
    async fn collect_dump_without_reply_is_incomplete() {
        let (_transport, session) = session_with(FakeTransportConfig::builder().build());

        let result = session
            .collect_dump(DumpRequest::Global, &CancellationToken::new())
            .await;

        assert_matches!(
            result,
            Err(SysexError::IncompleteDump {
                received: 0,
                timeout_ms: 1000
            })
        );
        assert!(!session.collector().is_collecting());
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_collection_sends_nothing() {
        let (transport, session) = session_with(FakeTransportConfig::builder().build());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = session.collect_dump(DumpRequest::Global, &cancel).await;

        assert_matches!(result, Err(SysexError::Cancelled));
        assert!(!session.collector().is_collecting());
        assert!(transport.sent_frames().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn traffic_before_the_request_is_not_collected() {
        let (transport, session) = session_with(
            FakeTransportConfig::builder()
                .replies(vec![FakeReply::single(PROGRAM_DUMP.to_vec())])
                .build(),
        );
        transport.inject(&FakeReply::single(vec![0xF0, 0x7E, 0x00, 0xF7]));

        let dump = session
            .collect_dump(DumpRequest::Program(0), &CancellationToken::new())
            .await
            .expect("scripted dump should be collected");

        assert_eq!(PROGRAM_DUMP.to_vec(), dump);
    }

    #[tokio::test(start_paused = true)]
    async fn collection_on_a_closed_input_fails_fast() {
        let (transport, session) = session_with(FakeTransportConfig::builder().build());
        transport.close();

        let started = tokio::time::Instant::now();
        let result = session
            .collect_dump(DumpRequest::Global, &CancellationToken::new())
            .await;

        assert_matches!(
            result,
            Err(SysexError::TransportUnavailable(TransportError::InboundClosed))
        );
        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(transport.sent_frames().is_empty());
    }

    #[tokio::test]
    async fn invalid_patch_is_not_sent() {
        let (transport, session) = session_with(FakeTransportConfig::builder().build());

        let result = session.send_full_patch(&[0xF0, 0x42, 0xF7]).await;

        assert_matches!(
            result,
            Err(SysexError::InvalidPayload {
                kind: PayloadKind::Patch,
                len: 3
            })
        );
        assert!(transport.sent_frames().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn valid_patch_is_sent_verbatim() {
        let (transport, session) = session_with(FakeTransportConfig::builder().build());

        session
            .send_full_patch(&PROGRAM_DUMP)
            .await
            .expect("valid patch should be sent");

        let sent: Vec<Vec<u8>> = transport
            .sent_frames()
            .into_iter()
            .map(SysexFrame::into_bytes)
            .collect();
        assert_eq!(vec![PROGRAM_DUMP.to_vec()], sent);
    }

    #[tokio::test]
    async fn closed_transport_is_reported_on_send() {
        let (transport, session) = session_with(FakeTransportConfig::builder().build());
        transport.close();

        let result = session.send_parameter_change(0x10, 0x40).await;

        assert_matches!(result, Err(SysexError::TransportUnavailable(_)));
    }
}
