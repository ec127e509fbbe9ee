//! Line Streaming
//!
//! This module reads one output stream of a scanner process line by line
//! and forwards the lines worth showing over a channel.
//!
//! Every [`LineStreamer`] finishes by sending exactly one
//! [`StreamEvent::End`] for its stream, whether the stream was empty, the
//! process failed, or reading broke off with an I/O error. The runner relies
//! on that sentinel to know when a stream is exhausted.

use std::fmt;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Substrings of container-orchestration startup chatter that are dropped
pub const DEFAULT_NOISE_PATTERNS: &[&str] = &["Network", "Creating", "Created"];

/// Which pipe of the child process a line came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamSource {
    Stdout,
    Stderr,
}

impl StreamSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamSource::Stdout => "stdout",
            StreamSource::Stderr => "stderr",
        }
    }
}

impl fmt::Display for StreamSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded, right-trimmed line of scanner output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLine {
    pub source: StreamSource,
    pub text: String,
}

impl OutputLine {
    pub fn is_error(&self) -> bool {
        self.source == StreamSource::Stderr
    }
}

/// Item sent from a streamer to the runner
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A line that survived filtering
    Line(OutputLine),

    /// End-of-stream sentinel, sent exactly once per stream
    End(StreamSource),
}

/// Substring denylist applied to every decoded line
///
/// Matching is case-sensitive: a line is noise when it contains any of the
/// patterns verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoiseFilter {
    patterns: Vec<String>,
}

impl Default for NoiseFilter {
    fn default() -> Self {
        Self::new(DEFAULT_NOISE_PATTERNS.iter().map(|p| p.to_string()))
    }
}

impl NoiseFilter {
    /// Create a filter from a list of substrings (empty patterns are ignored)
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            patterns: patterns
                .into_iter()
                .map(Into::<String>::into)
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    /// A filter that lets every line through
    pub fn none() -> Self {
        Self {
            patterns: Vec::new(),
        }
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn is_noise(&self, line: &str) -> bool {
        self.patterns.iter().any(|p| line.contains(p.as_str()))
    }
}

/// A line that was not valid UTF-8
///
/// Carries the text with every malformed sequence replaced by U+FFFD so the
/// caller can still show it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Malformed UTF-8 in scanner output at byte {valid_up_to}")]
pub struct MalformedLine {
    /// Length of the valid prefix
    pub valid_up_to: usize,

    /// Lossy decoding of the whole line
    pub replaced: String,
}

/// Decode one raw line
pub fn decode_line(raw: &[u8]) -> Result<String, MalformedLine> {
    match std::str::from_utf8(raw) {
        Ok(text) => Ok(text.to_string()),
        Err(e) => Err(MalformedLine {
            valid_up_to: e.valid_up_to(),
            replaced: String::from_utf8_lossy(raw).into_owned(),
        }),
    }
}

/// Reads one scanner stream and forwards its lines
pub struct LineStreamer {
    source: StreamSource,
    filter: NoiseFilter,
    tx: mpsc::Sender<StreamEvent>,
}

impl LineStreamer {
    pub fn new(source: StreamSource, filter: NoiseFilter, tx: mpsc::Sender<StreamEvent>) -> Self {
        Self { source, filter, tx }
    }

    /// Read `reader` to EOF, then send the end-of-stream sentinel
    ///
    /// Returns the number of lines forwarded. Decode problems are logged and
    /// the replaced text is forwarded; a read error ends the stream early.
    pub async fn stream<R>(self, reader: R) -> usize
    where
        R: AsyncRead + Unpin,
    {
        let source = self.source;
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::with_capacity(1024);
        let mut forwarded = 0;

        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) => {
                    warn!(stream = %source, error = %e, "Failed to read scanner output");
                    break;
                }
            }

            let text = match decode_line(&buf) {
                Ok(text) => text,
                Err(malformed) => {
                    warn!(stream = %source, "{}", malformed);
                    malformed.replaced
                }
            };

            let line = text.trim_end();
            if line.is_empty() || self.filter.is_noise(line) {
                continue;
            }

            let event = StreamEvent::Line(OutputLine {
                source,
                text: line.to_string(),
            });
            if self.tx.send(event).await.is_err() {
                debug!(stream = %source, "Output receiver dropped, stopping stream");
                break;
            }
            forwarded += 1;
        }

        // Receiver may already be gone; the sentinel is best-effort then
        let _ = self.tx.send(StreamEvent::End(source)).await;
        debug!(stream = %source, lines = forwarded, "Stream finished");
        forwarded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::{AsyncWriteExt, ReadBuf};

    async fn collect(input: &[u8], filter: NoiseFilter) -> Vec<StreamEvent> {
        let (tx, mut rx) = mpsc::channel(4096);
        LineStreamer::new(StreamSource::Stdout, filter, tx)
            .stream(input)
            .await;

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    fn texts(events: &[StreamEvent]) -> Vec<&str> {
        events
            .iter()
            .filter_map(|e| match e {
                StreamEvent::Line(line) => Some(line.text.as_str()),
                StreamEvent::End(_) => None,
            })
            .collect()
    }

    fn sentinel_count(events: &[StreamEvent]) -> usize {
        events
            .iter()
            .filter(|e| matches!(e, StreamEvent::End(_)))
            .count()
    }

    /// Reader that yields one line and then fails
    struct FailingReader {
        sent: bool,
    }

    impl AsyncRead for FailingReader {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            if self.sent {
                Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed")))
            } else {
                self.sent = true;
                buf.put_slice(b"partial output\n");
                Poll::Ready(Ok(()))
            }
        }
    }

    #[tokio::test]
    async fn test_forwards_lines_then_sentinel() {
        let events = collect(b"first\nsecond\nthird\n", NoiseFilter::default()).await;

        assert_eq!(texts(&events), vec!["first", "second", "third"]);
        assert_eq!(events.len(), 4);
        assert_eq!(events.last(), Some(&StreamEvent::End(StreamSource::Stdout)));
    }

    #[tokio::test]
    async fn test_empty_stream_sends_only_sentinel() {
        let events = collect(b"", NoiseFilter::default()).await;
        assert_eq!(events, vec![StreamEvent::End(StreamSource::Stdout)]);
    }

    #[tokio::test]
    async fn test_filters_orchestration_noise() {
        let input = b"Creating network foo\nscan started\n Network xscan_default  Created\nfinding: AWS key\n";
        let events = collect(input, NoiseFilter::default()).await;

        assert_eq!(texts(&events), vec!["scan started", "finding: AWS key"]);
        assert_eq!(sentinel_count(&events), 1);
    }

    #[tokio::test]
    async fn test_noise_matching_is_case_sensitive() {
        let events = collect(b"creating report\n", NoiseFilter::default()).await;
        assert_eq!(texts(&events), vec!["creating report"]);
    }

    #[tokio::test]
    async fn test_only_noise_still_terminates() {
        let events = collect(b"Creating network foo\n", NoiseFilter::default()).await;
        assert_eq!(events, vec![StreamEvent::End(StreamSource::Stdout)]);
    }

    #[tokio::test]
    async fn test_custom_filter() {
        let filter = NoiseFilter::new(["Pulling"]);
        let events = collect(b"Pulling image\nCreating network foo\n", filter).await;
        assert_eq!(texts(&events), vec!["Creating network foo"]);
    }

    #[tokio::test]
    async fn test_skips_blank_lines_and_trims_trailing_whitespace() {
        let events = collect(b"\n   \n  indented  \r\nlast\t\n\n", NoiseFilter::none()).await;
        assert_eq!(texts(&events), vec!["  indented", "last"]);
    }

    #[tokio::test]
    async fn test_final_line_without_newline() {
        let events = collect(b"one\ntwo", NoiseFilter::none()).await;
        assert_eq!(texts(&events), vec!["one", "two"]);
        assert_eq!(sentinel_count(&events), 1);
    }

    #[tokio::test]
    async fn test_malformed_bytes_are_replaced() {
        let events = collect(b"ok line\n\xff\xfe bad\n", NoiseFilter::default()).await;

        assert_eq!(texts(&events), vec!["ok line", "\u{FFFD}\u{FFFD} bad"]);
        assert_eq!(sentinel_count(&events), 1);
    }

    #[tokio::test]
    async fn test_read_error_still_sends_sentinel() {
        let (tx, mut rx) = mpsc::channel(16);
        let forwarded = LineStreamer::new(StreamSource::Stderr, NoiseFilter::none(), tx)
            .stream(FailingReader { sent: false })
            .await;

        assert_eq!(forwarded, 1);
        let first = rx.recv().await.unwrap();
        assert_eq!(
            first,
            StreamEvent::Line(OutputLine {
                source: StreamSource::Stderr,
                text: "partial output".to_string(),
            })
        );
        assert_eq!(rx.recv().await, Some(StreamEvent::End(StreamSource::Stderr)));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_dropped_receiver_does_not_hang() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        let forwarded = LineStreamer::new(StreamSource::Stdout, NoiseFilter::none(), tx)
            .stream(&b"a\nb\nc\n"[..])
            .await;
        assert_eq!(forwarded, 0);
    }

    #[tokio::test]
    async fn test_streams_incrementally_over_pipe() {
        let (mut writer, reader) = tokio::io::duplex(64);
        let (tx, mut rx) = mpsc::channel(16);

        let task = tokio::spawn(
            LineStreamer::new(StreamSource::Stdout, NoiseFilter::default(), tx).stream(reader),
        );

        writer.write_all(b"progress 1\n").await.unwrap();
        assert_eq!(
            rx.recv().await,
            Some(StreamEvent::Line(OutputLine {
                source: StreamSource::Stdout,
                text: "progress 1".to_string(),
            }))
        );

        writer.write_all(b"progress 2\n").await.unwrap();
        drop(writer);

        assert!(matches!(rx.recv().await, Some(StreamEvent::Line(_))));
        assert_eq!(rx.recv().await, Some(StreamEvent::End(StreamSource::Stdout)));
        assert_eq!(task.await.unwrap(), 2);
    }

    #[test]
    fn test_decode_line() {
        assert_eq!(decode_line(b"plain").unwrap(), "plain");

        let err = decode_line(b"ab\xffcd").unwrap_err();
        assert_eq!(err.valid_up_to, 2);
        assert_eq!(err.replaced, "ab\u{FFFD}cd");
    }

    #[test]
    fn test_noise_filter_defaults() {
        let filter = NoiseFilter::default();
        assert_eq!(filter.patterns(), &["Network", "Creating", "Created"]);
        assert!(filter.is_noise("Container xscan-trivy-run  Created"));
        assert!(!filter.is_noise("network scan complete"));
        assert!(!NoiseFilter::none().is_noise("Creating network foo"));
    }

    #[test]
    fn test_noise_filter_ignores_empty_patterns() {
        let filter = NoiseFilter::new(["", "Pulling"]);
        assert_eq!(filter.patterns(), &["Pulling"]);
        assert!(!filter.is_noise("anything"));
    }

    proptest! {
        #[test]
        fn prop_clean_lines_forwarded_in_order(
            lines in prop::collection::vec("[a-z0-9][a-z0-9 _.:-]{0,40}[a-z0-9]", 0..50)
        ) {
            let input: String = lines.iter().map(|l| format!("{}\n", l)).collect();

            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let events = rt.block_on(collect(input.as_bytes(), NoiseFilter::default()));

            prop_assert_eq!(events.len(), lines.len() + 1);
            prop_assert_eq!(texts(&events), lines.iter().map(String::as_str).collect::<Vec<_>>());
            prop_assert_eq!(events.last(), Some(&StreamEvent::End(StreamSource::Stdout)));
        }

        #[test]
        fn prop_arbitrary_bytes_always_terminate(
            bytes in prop::collection::vec(any::<u8>(), 0..512)
        ) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let events = rt.block_on(collect(&bytes, NoiseFilter::default()));

            prop_assert_eq!(sentinel_count(&events), 1);
            prop_assert_eq!(events.last(), Some(&StreamEvent::End(StreamSource::Stdout)));
        }
    }
}
