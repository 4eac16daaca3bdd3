use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use strum_macros::Display;
use tokio::sync::watch;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use super::FrameCodec;

/// Whether the collector is currently accepting inbound frames.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum CollectorState {
    /// Disarmed; inbound frames are ignored.
    Idle,
    /// Armed; inbound frames are appended.
    Collecting,
}

/// How a dump wait decides it is finished.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum CompletionPolicy {
    /// Resolve as soon as the buffer first looks complete, or at the window end.
    #[default]
    FirstCompleteFrame,
    /// Always wait out the whole window, then check once.
    FullWindow,
}

/// Result of waiting for a dump to accumulate.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum WaitOutcome {
    /// The buffer was complete when the wait ended.
    Complete,
    /// The window elapsed without a complete buffer.
    TimedOut,
    /// The caller cancelled the wait.
    Cancelled,
}

#[derive(Debug, Default)]
struct DumpBuffer {
    bytes: Vec<u8>,
    armed: bool,
}

/// Start/stop-gated accumulator for inbound SysEx frames.
///
/// The orchestration task arms, disarms, and inspects the collector while the
/// inbound routing task appends to it, so the buffer and the armed flag share
/// one lock. Every append republishes completeness on a watch channel that
/// [`DumpCollector::wait_for_completion`] listens to.
#[derive(Debug)]
pub struct DumpCollector {
    buffer: Mutex<DumpBuffer>,
    complete: watch::Sender<bool>,
}

impl DumpCollector {
    /// Creates an idle, empty collector.
    #[must_use]
    pub fn new() -> Self {
        let (complete, _receiver) = watch::channel(false);
        Self {
            buffer: Mutex::new(DumpBuffer::default()),
            complete,
        }
    }

    /// Clears accumulated bytes and arms the collector.
    pub fn start(&self) {
        let mut buffer = self.lock();
        buffer.bytes.clear();
        buffer.armed = true;
        self.complete.send_replace(false);
    }

    /// Disarms the collector, keeping accumulated bytes.
    pub fn stop(&self) {
        self.lock().armed = false;
    }

    /// Appends `frame` verbatim if armed. Returns whether it was appended.
    #[instrument(skip(self, frame), level = "trace", fields(frame_len = frame.len()))]
    pub fn on_frame_received(&self, frame: &[u8]) -> bool {
        let mut buffer = self.lock();
        if !buffer.armed {
            return false;
        }

        buffer.bytes.extend_from_slice(frame);
        self.complete
            .send_replace(FrameCodec::is_framed(&buffer.bytes));
        true
    }

    /// Returns whether the buffer starts with `F0` and ends with `F7`.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        FrameCodec::is_framed(&self.lock().bytes)
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> CollectorState {
        if self.lock().armed {
            CollectorState::Collecting
        } else {
            CollectorState::Idle
        }
    }

    /// Returns whether the collector is armed.
    #[must_use]
    pub fn is_collecting(&self) -> bool {
        self.state() == CollectorState::Collecting
    }

    /// Returns a copy of the accumulated bytes.
    #[must_use]
    pub fn full_dump(&self) -> Vec<u8> {
        self.lock().bytes.clone()
    }

    /// Returns the number of accumulated bytes.
    #[must_use]
    pub fn received_len(&self) -> usize {
        self.lock().bytes.len()
    }

    /// Waits up to `window` for the buffer to become complete.
    ///
    /// Does not arm or disarm the collector; callers bracket the wait with
    /// [`DumpCollector::start`] and [`DumpCollector::stop`].
    #[instrument(
        skip(self, cancel),
        level = "debug",
        fields(window_ms = window.as_millis(), %policy)
    )]
    pub async fn wait_for_completion(
        &self,
        window: Duration,
        policy: CompletionPolicy,
        cancel: &CancellationToken,
    ) -> WaitOutcome {
        let mut complete = self.complete.subscribe();
        let settled = async {
            match policy {
                CompletionPolicy::FullWindow => sleep(window).await,
                CompletionPolicy::FirstCompleteFrame => {
                    let _outcome = timeout(window, complete.wait_for(|complete| *complete)).await;
                }
            }
        };

        tokio::select! {
            () = cancel.cancelled() => WaitOutcome::Cancelled,
            () = settled => {
                if self.is_complete() {
                    WaitOutcome::Complete
                } else {
                    WaitOutcome::TimedOut
                }
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, DumpBuffer> {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for DumpCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    const WINDOW: Duration = Duration::from_secs(1);

    #[test]
    fn new_collector_is_idle_and_empty() {
        let collector = DumpCollector::new();
        assert_eq!(CollectorState::Idle, collector.state());
        assert_eq!(Vec::<u8>::new(), collector.full_dump());
        assert!(!collector.is_complete());
    }

    #[test]
    fn frames_split_across_messages_concatenate() {
        let collector = DumpCollector::new();
        collector.start();
        collector.on_frame_received(&[0xF0, 0x42, 0x30]);
        assert!(!collector.is_complete());
        collector.on_frame_received(&[0x28, 0x40, 0xF7]);

        assert!(collector.is_complete());
        assert_eq!(
            vec![0xF0, 0x42, 0x30, 0x28, 0x40, 0xF7],
            collector.full_dump()
        );
    }

    #[test]
    fn frames_before_start_are_ignored() {
        let collector = DumpCollector::new();
        let appended = collector.on_frame_received(&[0xF0, 0x42, 0xF7]);

        assert!(!appended);
        assert_eq!(0, collector.received_len());
    }

    #[test]
    fn frames_after_stop_are_ignored_and_buffer_is_kept() {
        let collector = DumpCollector::new();
        collector.start();
        collector.on_frame_received(&[0xF0, 0x42, 0xF7]);
        collector.stop();
        let appended = collector.on_frame_received(&[0xF0, 0x00, 0xF7]);

        assert!(!appended);
        assert_eq!(CollectorState::Idle, collector.state());
        assert_eq!(vec![0xF0, 0x42, 0xF7], collector.full_dump());
        assert!(collector.is_complete());
    }

    #[test]
    fn restart_clears_previous_dump() {
        let collector = DumpCollector::new();
        collector.start();
        collector.on_frame_received(&[0xF0, 0x42, 0xF7]);
        collector.stop();
        collector.start();

        assert!(collector.is_collecting());
        assert_eq!(0, collector.received_len());
        assert!(!collector.is_complete());
    }

    #[tokio::test(start_paused = true)]
    async fn wait_resolves_when_frame_arrives() {
        let collector = Arc::new(DumpCollector::new());
        collector.start();
        let feeder = Arc::clone(&collector);
        tokio::spawn(async move {
            sleep(Duration::from_millis(100)).await;
            feeder.on_frame_received(&[0xF0, 0x42, 0x30, 0xF7]);
        });

        let started = tokio::time::Instant::now();
        let outcome = collector
            .wait_for_completion(WINDOW, CompletionPolicy::FirstCompleteFrame, &CancellationToken::new())
            .await;

        assert_eq!(WaitOutcome::Complete, outcome);
        assert!(started.elapsed() < WINDOW);
    }

    #[rstest]
    #[case::first_frame(CompletionPolicy::FirstCompleteFrame)]
    #[case::full_window(CompletionPolicy::FullWindow)]
    #[tokio::test(start_paused = true)]
    async fn wait_times_out_without_frames(#[case] policy: CompletionPolicy) {
        let collector = DumpCollector::new();
        collector.start();

        let started = tokio::time::Instant::now();
        let outcome = collector
            .wait_for_completion(WINDOW, policy, &CancellationToken::new())
            .await;

        assert_eq!(WaitOutcome::TimedOut, outcome);
        assert!(started.elapsed() >= WINDOW);
    }

    #[tokio::test(start_paused = true)]
    async fn full_window_keeps_collecting_after_first_frame() {
        let collector = Arc::new(DumpCollector::new());
        collector.start();
        let feeder = Arc::clone(&collector);
        tokio::spawn(async move {
            sleep(Duration::from_millis(100)).await;
            feeder.on_frame_received(&[0xF0, 0x01, 0xF7]);
            sleep(Duration::from_millis(100)).await;
            feeder.on_frame_received(&[0xF0, 0x02, 0xF7]);
        });

        let outcome = collector
            .wait_for_completion(WINDOW, CompletionPolicy::FullWindow, &CancellationToken::new())
            .await;

        assert_eq!(WaitOutcome::Complete, outcome);
        assert_eq!(6, collector.received_len());
    }

    #[tokio::test(start_paused = true)]
    async fn wait_honours_cancellation() {
        let collector = DumpCollector::new();
        collector.start();
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let outcome = collector
            .wait_for_completion(WINDOW, CompletionPolicy::FirstCompleteFrame, &cancel)
            .await;

        assert_eq!(WaitOutcome::Cancelled, outcome);
    }
}
