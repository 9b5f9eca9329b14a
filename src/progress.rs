//! Ingestion progress reporting.
//!
//! The ingestion pipeline emits [`IngestFrame`]s through a
//! [`ProgressReporter`]: integer percents while batches land, an optional
//! serialized error body, and a single terminal `[DONE]` sentinel so
//! caller read-loops always terminate. Reporters adapt the frames to their
//! transport: an HTTP response stream, stderr for the CLI, or a buffer for
//! tests.

use tokio::sync::mpsc;

/// Literal sentinel written as the final frame of every ingestion stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// One frame of an ingestion response stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestFrame {
    /// Percent complete, in `[0, 100]`.
    Progress(u8),
    /// Serialized error body; precedes the sentinel on failed runs.
    Failure(String),
    /// Terminal sentinel, emitted exactly once per run.
    Done,
}

impl IngestFrame {
    /// Wire form of the frame: the bare percent, the serialized error
    /// body, or the literal `[DONE]`.
    pub fn as_wire(&self) -> String {
        match self {
            IngestFrame::Progress(pct) => pct.to_string(),
            IngestFrame::Failure(body) => body.clone(),
            IngestFrame::Done => DONE_SENTINEL.to_string(),
        }
    }
}

/// Receives ingestion frames as the pipeline produces them.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, frame: IngestFrame);
}

/// Forwards frames into an unbounded channel, for bridging into a
/// streaming HTTP response body.
pub struct ChannelReporter {
    tx: mpsc::UnboundedSender<IngestFrame>,
}

impl ChannelReporter {
    pub fn new(tx: mpsc::UnboundedSender<IngestFrame>) -> Self {
        Self { tx }
    }
}

impl ProgressReporter for ChannelReporter {
    fn report(&self, frame: IngestFrame) {
        // The receiver disappearing (client hung up) is not the pipeline's
        // problem; the run finishes and the frames are dropped.
        let _ = self.tx.send(frame);
    }
}

/// Human-readable progress on stderr for the CLI path.
pub struct StderrReporter;

impl ProgressReporter for StderrReporter {
    fn report(&self, frame: IngestFrame) {
        match frame {
            IngestFrame::Progress(pct) => eprintln!("ingest  {}%", pct),
            IngestFrame::Failure(body) => eprintln!("ingest  failed: {}", body),
            IngestFrame::Done => eprintln!("ingest  done"),
        }
    }
}

/// Buffers every frame, for asserting on frame sequences in tests.
#[derive(Default)]
pub struct CollectingReporter {
    frames: std::sync::Mutex<Vec<IngestFrame>>,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> Vec<IngestFrame> {
        self.frames.lock().unwrap().clone()
    }
}

impl ProgressReporter for CollectingReporter {
    fn report(&self, frame: IngestFrame) {
        self.frames.lock().unwrap().push(frame);
    }
}

/// Discards all frames.
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _frame: IngestFrame) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_forms() {
        assert_eq!(IngestFrame::Progress(44).as_wire(), "44");
        assert_eq!(IngestFrame::Done.as_wire(), "[DONE]");
        assert_eq!(
            IngestFrame::Failure("{\"error\":{}}".to_string()).as_wire(),
            "{\"error\":{}}"
        );
    }

    #[test]
    fn collecting_reporter_keeps_order() {
        let reporter = CollectingReporter::new();
        reporter.report(IngestFrame::Progress(30));
        reporter.report(IngestFrame::Progress(65));
        reporter.report(IngestFrame::Done);
        assert_eq!(
            reporter.frames(),
            vec![
                IngestFrame::Progress(30),
                IngestFrame::Progress(65),
                IngestFrame::Done
            ]
        );
    }
}
