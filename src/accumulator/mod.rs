//! Change accumulation and narration batching
//!
//! [`ChangeAccumulator`] receives successive renderings of a screen as plain
//! text, works out which part is genuinely new, appends it to a running
//! session transcript, and hands the unsent tail of that transcript to a
//! [`NarrationSink`] once enough has built up (size threshold) or it has
//! waited long enough (time threshold).
//!
//! # Invariants
//!
//! - The transcript only grows.
//! - `last_sent_index` never decreases and never exceeds the transcript length.
//! - Every appended byte reaches the sink exactly once, in order; chunks never
//!   overlap.
//! - The time window opens only when new content arrives. Observing an
//!   unchanged screen never opens, extends, or fires it.
//!
//! Calls must be serialized by the caller. For async use, [`task`] wraps an
//! accumulator in a single-owner actor with its own idle timer.

mod clock;
pub mod overlap;
mod sink;
#[cfg(feature = "streaming")]
pub mod task;

#[cfg(feature = "streaming")]
pub use clock::TokioClock;
pub use clock::{Clock, ManualClock, SystemClock};
#[cfg(feature = "streaming")]
pub use sink::ChannelSink;
pub use sink::{NarrationChunk, NarrationSink};

use overlap::{find_overlap, screen_lines, Overlap};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default pending-size threshold in characters
pub const DEFAULT_SIZE_THRESHOLD: usize = 100;
/// Default time threshold
pub const DEFAULT_TIME_THRESHOLD: Duration = Duration::from_secs(2);
/// Default marker placed before content that does not continue prior output
pub const DEFAULT_DISCONTINUITY_MARKER: &str = "--- screen cleared ---\n";

/// Flush thresholds and formatting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccumulatorConfig {
    /// Flush once this many characters are pending
    pub size_threshold: usize,
    /// Flush once the oldest pending content is this old
    pub time_threshold: Duration,
    /// Prefixed to new content after a clear or full-screen rewrite
    pub discontinuity_marker: String,
}

impl Default for AccumulatorConfig {
    fn default() -> Self {
        Self {
            size_threshold: DEFAULT_SIZE_THRESHOLD,
            time_threshold: DEFAULT_TIME_THRESHOLD,
            discontinuity_marker: DEFAULT_DISCONTINUITY_MARKER.to_string(),
        }
    }
}

/// Why a flush happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushReason {
    Size,
    Time,
    Forced,
}

/// Per-session change accumulator
pub struct ChangeAccumulator {
    config: AccumulatorConfig,
    sink: Box<dyn NarrationSink>,
    clock: Arc<dyn Clock>,
    /// Everything observed, append-only
    transcript: String,
    /// Byte offset into `transcript` already delivered
    last_sent_index: usize,
    /// Last observed screen, normalized
    previous_lines: Vec<String>,
    /// Characters appended since the last flush
    pending_size: usize,
    accumulation_started_at: Option<Instant>,
    /// A screen went blank; the next content is not contiguous
    discontinuity_pending: bool,
    clear_count: u64,
    stopped: bool,
}

impl ChangeAccumulator {
    /// Create an accumulator on the system clock
    pub fn new(config: AccumulatorConfig, sink: impl NarrationSink + 'static) -> Self {
        Self::with_clock(config, sink, Arc::new(SystemClock))
    }

    pub fn with_clock(
        config: AccumulatorConfig,
        sink: impl NarrationSink + 'static,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            sink: Box::new(sink),
            clock,
            transcript: String::new(),
            last_sent_index: 0,
            previous_lines: Vec::new(),
            pending_size: 0,
            accumulation_started_at: None,
            discontinuity_pending: false,
            clear_count: 0,
            stopped: false,
        }
    }

    /// Observe the current screen text.
    ///
    /// Returns the flush this observation triggered, if any.
    pub fn observe(&mut self, screen_text: &str) -> Option<FlushReason> {
        if self.stopped {
            tracing::warn!("Observation after stop ignored");
            return None;
        }

        let lines = screen_lines(screen_text);
        let content = self.new_content(&lines);
        self.previous_lines = lines;

        if !content.is_empty() {
            self.pending_size += content.chars().count();
            self.transcript.push_str(&content);
            if self.accumulation_started_at.is_none() {
                self.accumulation_started_at = Some(self.clock.now());
            }
        }

        self.check_thresholds()
    }

    /// Compute the text to append for a newly observed screen
    fn new_content(&mut self, lines: &[String]) -> String {
        let new_from = match find_overlap(&self.previous_lines, lines) {
            Overlap::Initial => 0,
            Overlap::Continues { new_from } => new_from,
            Overlap::Discontinuous => {
                self.clear_count += 1;
                tracing::debug!(clears = self.clear_count, "Screen discontinuity detected");
                if lines.is_empty() {
                    self.discontinuity_pending = true;
                    return String::new();
                }
                return self.with_marker(lines);
            }
        };

        let fresh = &lines[new_from..];
        if fresh.is_empty() {
            return String::new();
        }
        if self.discontinuity_pending {
            return self.with_marker(fresh);
        }
        join_lines(fresh)
    }

    fn with_marker(&mut self, lines: &[String]) -> String {
        self.discontinuity_pending = false;
        let mut content = self.config.discontinuity_marker.clone();
        content.push_str(&join_lines(lines));
        content
    }

    /// Timer check: flush if the time window has elapsed.
    ///
    /// A no-op when no window is open, so a timer that fires after the
    /// window was already flushed does nothing.
    pub fn poll(&mut self) -> Option<FlushReason> {
        if self.stopped {
            return None;
        }
        self.check_thresholds()
    }

    fn check_thresholds(&mut self) -> Option<FlushReason> {
        let started = self.accumulation_started_at?;
        let reason = if self.pending_size >= self.config.size_threshold {
            FlushReason::Size
        } else if self.clock.now().saturating_duration_since(started) >= self.config.time_threshold
        {
            FlushReason::Time
        } else {
            return None;
        };
        self.flush(reason);
        Some(reason)
    }

    /// Flush any pending content now
    pub fn force_flush(&mut self) -> bool {
        if self.last_sent_index == self.transcript.len() {
            return false;
        }
        self.flush(FlushReason::Forced);
        true
    }

    /// Flush pending content and refuse further observations
    pub fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.force_flush();
        self.stopped = true;
    }

    fn flush(&mut self, reason: FlushReason) {
        let chunk = self.transcript[self.last_sent_index..].to_string();
        let changed = self.pending_size;
        self.last_sent_index = self.transcript.len();
        self.pending_size = 0;
        self.accumulation_started_at = None;

        if chunk.is_empty() {
            return;
        }
        tracing::debug!(?reason, chars = changed, "Flushing narration chunk");
        self.sink.on_chunk_ready(chunk, changed);
    }

    /// When the open time window will elapse, if one is open
    pub fn deadline(&self) -> Option<Instant> {
        self.accumulation_started_at
            .map(|started| started + self.config.time_threshold)
    }

    pub fn is_window_open(&self) -> bool {
        self.accumulation_started_at.is_some()
    }

    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    pub fn last_sent_index(&self) -> usize {
        self.last_sent_index
    }

    pub fn pending_size(&self) -> usize {
        self.pending_size
    }

    /// Previously observed screen, normalized into lines
    pub fn previous_lines(&self) -> &[String] {
        &self.previous_lines
    }

    /// Number of clears / full rewrites detected
    pub fn clear_count(&self) -> u64 {
        self.clear_count
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn config(&self) -> &AccumulatorConfig {
        &self.config
    }
}

impl std::fmt::Debug for ChangeAccumulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeAccumulator")
            .field("config", &self.config)
            .field("transcript_len", &self.transcript.len())
            .field("last_sent_index", &self.last_sent_index)
            .field("pending_size", &self.pending_size)
            .field("window_open", &self.is_window_open())
            .field("stopped", &self.stopped)
            .finish_non_exhaustive()
    }
}

fn join_lines(lines: &[String]) -> String {
    let mut out = String::with_capacity(lines.iter().map(|l| l.len() + 1).sum());
    for line in lines {
        out.push_str(line);
        out.push('\n');
    }
    out
}
