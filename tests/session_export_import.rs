use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use tokio::time::sleep;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use wsx::{
    BankId, CollectorState, CompletionPolicy, DeviceId, DumpRequest, FakeReply, FakeTransport,
    FakeTransportConfig, MessageBuilder, MessageKind, PayloadKind, SessionConfig, SysexError,
    SysexSession, TransportError,
};

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("wsx-session-{}-{name}.syx", std::process::id()))
}

/// `F0 42 30 28 40 <filler> F7`, `len` bytes in total.
fn program_dump(len: usize) -> Vec<u8> {
    let mut dump = vec![0x00; len];
    dump[..5].copy_from_slice(&[0xF0, 0x42, 0x30, 0x28, 0x40]);
    for (index, byte) in dump.iter_mut().enumerate().take(len - 1).skip(5) {
        *byte = u8::try_from(index % 0x80).expect("masked index fits in a byte");
    }
    dump[len - 1] = 0xF7;
    dump
}

fn open(
    transport: FakeTransportConfig,
    config: SessionConfig,
) -> (Arc<FakeTransport>, SysexSession) {
    let transport = Arc::new(FakeTransport::new(transport));
    let session = SysexSession::open(transport.clone(), config)
        .expect("open fake transport should accept a session");
    (transport, session)
}

fn sent_bytes(transport: &FakeTransport) -> Vec<Vec<u8>> {
    transport
        .sent_frames()
        .into_iter()
        .map(wsx::SysexFrame::into_bytes)
        .collect()
}

#[tokio::test(start_paused = true)]
async fn program_export_writes_the_dump_byte_for_byte() {
    let dump = program_dump(2000);
    let (transport, session) = open(
        FakeTransportConfig::builder()
            .replies(vec![FakeReply::single(dump.clone())])
            .build(),
        SessionConfig::default(),
    );
    let path = temp_path("program-3");

    let receipt = session
        .export_dump(DumpRequest::Program(3), &path, &CancellationToken::new())
        .await
        .expect("scripted dump should export");

    assert_eq!(2000, receipt.bytes_written());
    assert_eq!(DumpRequest::Program(3), receipt.request());
    assert_eq!(dump, std::fs::read(&path).expect("export should write the file"));
    assert_eq!(
        vec![vec![0xF0, 0x42, 0x30, 0x3E, 0x01, 0x03, 0xF7]],
        sent_bytes(&transport)
    );
    std::fs::remove_file(&path).expect("exported file should be removable");
}

#[tokio::test(start_paused = true)]
async fn export_without_reply_is_incomplete_and_writes_nothing() {
    let (_transport, session) = open(
        FakeTransportConfig::builder().build(),
        SessionConfig::default(),
    );
    let path = temp_path("no-reply");

    let started = tokio::time::Instant::now();
    let result = session
        .export_dump(DumpRequest::Global, &path, &CancellationToken::new())
        .await;

    assert_matches!(
        result,
        Err(SysexError::IncompleteDump {
            received: 0,
            timeout_ms: 1000
        })
    );
    assert!(started.elapsed() >= Duration::from_secs(1));
    assert!(!path.exists());
    assert_eq!(CollectorState::Idle, session.collector().state());
}

#[tokio::test(start_paused = true)]
async fn replies_after_the_window_are_ignored() {
    let (_transport, session) = open(
        FakeTransportConfig::builder()
            .replies(vec![FakeReply::single(program_dump(64))])
            .reply_delay(Duration::from_secs(2))
            .build(),
        SessionConfig::default(),
    );

    let result = session
        .collect_dump(DumpRequest::Program(0), &CancellationToken::new())
        .await;
    assert_matches!(result, Err(SysexError::IncompleteDump { received: 0, .. }));

    sleep(Duration::from_secs(2)).await;
    assert_eq!(0, session.collector().received_len());
}

#[tokio::test(start_paused = true)]
async fn full_window_concatenates_multi_message_bank_dumps() {
    let first = vec![0xF0, 0x42, 0x30, 0x28, 0x4C, 0x01, 0xF7];
    let second = vec![0xF0, 0x42, 0x30, 0x28, 0x4C, 0x02, 0xF7];
    let config = SessionConfig::builder()
        .completion(CompletionPolicy::FullWindow)
        .build();
    let (transport, session) = open(
        FakeTransportConfig::builder()
            .replies(vec![FakeReply::new(vec![first.clone(), second.clone()])])
            .build(),
        config,
    );

    let dump = session
        .collect_dump(DumpRequest::Bank(BankId::Ram2), &CancellationToken::new())
        .await
        .expect("both bank messages should be collected");

    assert_eq!([first, second].concat(), dump);
    assert_eq!(
        vec![vec![0xF0, 0x42, 0x30, 0x28, 0x10, 0x01, 0x01, 0xF7]],
        sent_bytes(&transport)
    );
}

#[tokio::test(start_paused = true)]
async fn first_complete_frame_resolves_before_the_window() {
    let (_transport, session) = open(
        FakeTransportConfig::builder()
            .replies(vec![FakeReply::single(program_dump(32))])
            .build(),
        SessionConfig::default(),
    );

    let started = tokio::time::Instant::now();
    session
        .collect_dump(DumpRequest::Program(1), &CancellationToken::new())
        .await
        .expect("scripted dump should be collected");

    assert!(started.elapsed() < Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn cancelling_an_export_disarms_and_writes_nothing() {
    let (_transport, session) = open(
        FakeTransportConfig::builder().build(),
        SessionConfig::default(),
    );
    let path = temp_path("cancelled");
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        sleep(Duration::from_millis(200)).await;
        trigger.cancel();
    });

    let result = session
        .export_dump(DumpRequest::Bank(BankId::Rom1), &path, &cancel)
        .await;

    assert_matches!(result, Err(SysexError::Cancelled));
    assert!(!path.exists());
    assert!(!session.collector().is_collecting());
}

#[tokio::test(start_paused = true)]
async fn concurrent_exports_take_turns() {
    let (_transport, session) = open(
        FakeTransportConfig::builder()
            .replies(vec![
                FakeReply::single(program_dump(16)),
                FakeReply::single(program_dump(24)),
            ])
            .build(),
        SessionConfig::default(),
    );
    let cancel = CancellationToken::new();

    let (first, second) = tokio::join!(
        session.collect_dump(DumpRequest::Program(1), &cancel),
        session.collect_dump(DumpRequest::Program(2), &cancel),
    );

    assert_eq!(16, first.expect("first export should complete").len());
    assert_eq!(24, second.expect("second export should complete").len());
}

#[tokio::test(start_paused = true)]
async fn bank_import_is_sent_verbatim() {
    let bank = program_dump(10_001);
    let path = temp_path("bank-import");
    std::fs::write(&path, &bank).expect("temporary file should be writable");
    let (transport, session) = open(
        FakeTransportConfig::builder().build(),
        SessionConfig::default(),
    );

    let receipt = session
        .import_file(PayloadKind::Bank, &path)
        .await
        .expect("valid bank should import");

    assert_eq!(10_001, receipt.bytes_sent());
    assert_eq!(vec![bank], sent_bytes(&transport));
    std::fs::remove_file(&path).expect("temporary file should be removable");
}

#[tokio::test]
async fn invalid_import_sends_nothing() {
    let path = temp_path("short-patch");
    std::fs::write(&path, [0xF0, 0x42, 0xF7]).expect("temporary file should be writable");
    let (transport, session) = open(
        FakeTransportConfig::builder().build(),
        SessionConfig::default(),
    );

    let result = session.import_file(PayloadKind::Patch, &path).await;

    assert_matches!(
        result,
        Err(SysexError::InvalidPayload {
            kind: PayloadKind::Patch,
            len: 3
        })
    );
    assert!(transport.sent_frames().is_empty());
    std::fs::remove_file(&path).expect("temporary file should be removable");
}

#[tokio::test]
async fn patch_sized_file_is_not_a_bank() {
    let path = temp_path("patch-as-bank");
    std::fs::write(&path, program_dump(200)).expect("temporary file should be writable");
    let (transport, session) = open(
        FakeTransportConfig::builder().build(),
        SessionConfig::default(),
    );

    let result = session.import_file(PayloadKind::Bank, &path).await;

    assert_matches!(
        result,
        Err(SysexError::InvalidPayload {
            kind: PayloadKind::Bank,
            len: 200
        })
    );
    assert!(transport.sent_frames().is_empty());
    std::fs::remove_file(&path).expect("temporary file should be removable");
}

#[tokio::test]
async fn missing_import_file_is_an_io_error() {
    let path = temp_path("does-not-exist");
    let (_transport, session) = open(
        FakeTransportConfig::builder().build(),
        SessionConfig::default(),
    );

    let result = session.import_file(PayloadKind::Patch, &path).await;

    assert_matches!(result, Err(SysexError::Io { path: failed, .. }) if failed == path);
}

#[tokio::test]
async fn closed_port_refuses_a_session() {
    let transport = Arc::new(FakeTransport::new(
        FakeTransportConfig::builder().closed(true).build(),
    ));

    let result = SysexSession::open(transport, SessionConfig::default());

    assert_matches!(
        result,
        Err(SysexError::TransportUnavailable(TransportError::PortClosed))
    );
}

#[tokio::test(start_paused = true)]
async fn export_after_close_fails_fast_and_writes_nothing() {
    let (transport, session) = open(
        FakeTransportConfig::builder()
            .replies(vec![FakeReply::single(program_dump(32))])
            .build(),
        SessionConfig::default(),
    );
    let path = temp_path("closed");
    transport.close();

    let result = session
        .export_dump(DumpRequest::Program(0), &path, &CancellationToken::new())
        .await;

    assert_matches!(
        result,
        Err(SysexError::TransportUnavailable(TransportError::InboundClosed))
    );
    assert!(!path.exists());
    assert!(!session.collector().is_collecting());
    assert!(transport.sent_frames().is_empty());
}

#[tokio::test(start_paused = true)]
async fn unsolicited_traffic_before_export_stays_out_of_the_file() {
    let dump = vec![
        0xF0, 0x42, 0x30, 0x28, 0x40, 0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0xF7,
    ];
    let (transport, session) = open(
        FakeTransportConfig::builder()
            .inbound(FakeReply::single(vec![0xF0, 0x7E, 0x00, 0xF7]))
            .replies(vec![FakeReply::single(dump.clone())])
            .build(),
        SessionConfig::default(),
    );
    transport.inject(&FakeReply::new(vec![vec![0xF8], vec![0xF0, 0x41, 0x10, 0xF7]]));
    let path = temp_path("unsolicited");

    session
        .export_dump(DumpRequest::Program(0), &path, &CancellationToken::new())
        .await
        .expect("scripted dump should export");

    assert_eq!(dump, std::fs::read(&path).expect("export should write the file"));
    std::fs::remove_file(&path).expect("exported file should be removable");
}

#[tokio::test(start_paused = true)]
async fn device_id_reaches_every_request() {
    let config = SessionConfig::builder()
        .device_id(DeviceId::new(0x02))
        .build();
    let (transport, session) = open(FakeTransportConfig::builder().build(), config);

    session
        .request_global_dump()
        .await
        .expect("global request should send");
    session
        .request_bank_dump(BankId::Ram1)
        .await
        .expect("bank request should send");
    session
        .send_parameter_change(0x10, 200)
        .await
        .expect("parameter change should send");

    let builder = MessageBuilder::new(DeviceId::new(0x02));
    assert_eq!(
        vec![
            builder.global_dump_request().into_bytes(),
            vec![0xF0, 0x42, 0x32, 0x28, 0x10, 0x01, 0x00, 0xF7],
            vec![0xF0, 0x42, 0x02, 0x3E, 0x10, 0x10, 0x48, 0xF7],
        ],
        sent_bytes(&transport)
    );
}

#[tokio::test]
async fn listeners_see_delimited_messages_until_close() {
    let (transport, session) = open(
        FakeTransportConfig::builder()
            .inbound(FakeReply::new(vec![vec![0xF8], vec![0xF0, 0x7E, 0x00, 0xF7]]))
            .build(),
        SessionConfig::default(),
    );
    let mut messages = session.received_messages();

    let first = messages
        .next()
        .await
        .expect("first message should arrive")
        .expect("listener should not lag");
    let second = messages
        .next()
        .await
        .expect("second message should arrive")
        .expect("listener should not lag");
    transport.close();

    assert_eq!(MessageKind::Channel, first.kind());
    assert_eq!(&[0xF8], first.bytes());
    assert_eq!(MessageKind::Sysex, second.kind());
    assert_eq!(&[0xF0, 0x7E, 0x00, 0xF7], second.bytes());
    assert!(messages.next().await.is_none());
}
