//! Streaming response aggregation.
//!
//! One [`StreamAggregator`] consumes the incremental deltas of a single
//! streaming session and reassembles the final answer. Providers that expose
//! reasoning models interleave "thinking" fragments (`reasoning_content`)
//! with the actual answer (`content`); only the latter contributes to the
//! aggregated output. Progress reporting is a stderr-only side effect and can
//! be suppressed entirely without changing the result.

use std::io::Write;
use std::time::Instant;

/// Position of a streaming session in its lifecycle.
///
/// The phase only ever moves forward within one session: once content has
/// arrived, later reasoning fragments cannot move it back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamPhase {
    /// No delta with text has arrived yet.
    Waiting,
    /// Reasoning fragments have arrived, but no final content yet.
    Thinking,
    /// Final content has started arriving.
    Content,
}

/// One incremental delta from a streaming session.
///
/// Either field may be absent; a delta with neither is a keep-alive.
#[derive(Debug, Clone, Default)]
pub struct StreamDelta {
    /// Fragment of the final answer.
    pub content: Option<String>,
    /// Fragment of intermediate reasoning, reported but not aggregated.
    pub reasoning: Option<String>,
}

/// Reassembles one streaming session into the final answer text.
pub struct StreamAggregator {
    phase: StreamPhase,
    parts: Vec<String>,
    reporter: ProgressReporter,
}

impl StreamAggregator {
    /// Creates an aggregator for a new session.
    pub fn new(reporter: ProgressReporter) -> Self {
        Self {
            phase: StreamPhase::Waiting,
            parts: Vec::new(),
            reporter,
        }
    }

    /// Feeds one delta into the session.
    pub fn push(&mut self, delta: StreamDelta) {
        if let Some(reasoning) = delta.reasoning {
            if !reasoning.is_empty() {
                if self.phase == StreamPhase::Waiting {
                    self.phase = StreamPhase::Thinking;
                    self.reporter.phase_changed(self.phase);
                }
                self.reporter.reasoning_received(&reasoning);
            }
        }

        if let Some(content) = delta.content {
            if !content.is_empty() {
                if self.phase != StreamPhase::Content {
                    self.phase = StreamPhase::Content;
                    self.reporter.phase_changed(self.phase);
                }
                self.reporter.content_received(&content);
                self.parts.push(content);
            }
        }
    }

    /// Current phase of the session.
    pub fn phase(&self) -> StreamPhase {
        self.phase
    }

    /// Ends the session and returns the joined content fragments.
    pub fn finish(mut self) -> String {
        self.reporter.finished();
        self.parts.concat()
    }
}

/// Stderr progress reporting for a streaming session.
///
/// Tracks phase, elapsed time, and character counters. With `quiet` set the
/// reporter emits nothing; aggregation behaviour is identical either way.
pub struct ProgressReporter {
    quiet: bool,
    started: Instant,
    reasoning_chars: usize,
    content_chars: usize,
}

impl ProgressReporter {
    /// Creates a reporter. `quiet` suppresses all output.
    pub fn new(quiet: bool) -> Self {
        Self {
            quiet,
            started: Instant::now(),
            reasoning_chars: 0,
            content_chars: 0,
        }
    }

    fn phase_changed(&mut self, phase: StreamPhase) {
        if self.quiet {
            return;
        }
        let label = match phase {
            StreamPhase::Waiting => return,
            StreamPhase::Thinking => "thinking",
            StreamPhase::Content => "writing",
        };
        eprint!("\r\x1b[2K⏳ {label}...");
        let _ = std::io::stderr().flush();
    }

    fn reasoning_received(&mut self, fragment: &str) {
        self.reasoning_chars += fragment.chars().count();
        self.redraw();
    }

    fn content_received(&mut self, fragment: &str) {
        self.content_chars += fragment.chars().count();
        self.redraw();
    }

    fn redraw(&self) {
        if self.quiet {
            return;
        }
        let elapsed = self.started.elapsed().as_secs();
        let label = if self.content_chars > 0 {
            "writing"
        } else {
            "thinking"
        };
        eprint!(
            "\r\x1b[2K⏳ {label}... {elapsed}s (reasoning: {} chars, content: {} chars)",
            self.reasoning_chars, self.content_chars
        );
        let _ = std::io::stderr().flush();
    }

    fn finished(&mut self) {
        if self.quiet {
            return;
        }
        let elapsed = self.started.elapsed().as_secs_f32();
        eprintln!("\r\x1b[2K✓ generated in {elapsed:.1}s");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delta(reasoning: Option<&str>, content: Option<&str>) -> StreamDelta {
        StreamDelta {
            reasoning: reasoning.map(String::from),
            content: content.map(String::from),
        }
    }

    fn quiet_aggregator() -> StreamAggregator {
        StreamAggregator::new(ProgressReporter::new(true))
    }

    #[test]
    fn starts_waiting() {
        let agg = quiet_aggregator();
        assert_eq!(agg.phase(), StreamPhase::Waiting);
    }

    #[test]
    fn reasoning_moves_to_thinking() {
        let mut agg = quiet_aggregator();
        agg.push(delta(Some("hmm"), None));
        assert_eq!(agg.phase(), StreamPhase::Thinking);
    }

    #[test]
    fn content_moves_to_content_from_waiting() {
        let mut agg = quiet_aggregator();
        agg.push(delta(None, Some("feat")));
        assert_eq!(agg.phase(), StreamPhase::Content);
    }

    #[test]
    fn phase_never_regresses() {
        let mut agg = quiet_aggregator();
        agg.push(delta(Some("thinking"), None));
        agg.push(delta(None, Some("feat: ")));
        // A trailing reasoning fragment must not move the phase backwards.
        agg.push(delta(Some("more thinking"), None));
        assert_eq!(agg.phase(), StreamPhase::Content);
        agg.push(delta(None, Some("add parser")));
        assert_eq!(agg.phase(), StreamPhase::Content);
    }

    #[test]
    fn only_content_is_aggregated() {
        let mut agg = quiet_aggregator();
        agg.push(delta(Some("let me think about this"), None));
        agg.push(delta(None, Some("fix: ")));
        agg.push(delta(Some("actually..."), Some("handle ")));
        agg.push(delta(None, Some("empty input")));
        assert_eq!(agg.finish(), "fix: handle empty input");
    }

    #[test]
    fn keep_alive_deltas_are_ignored() {
        let mut agg = quiet_aggregator();
        agg.push(StreamDelta::default());
        assert_eq!(agg.phase(), StreamPhase::Waiting);
        agg.push(delta(None, Some("chore: bump")));
        agg.push(StreamDelta::default());
        assert_eq!(agg.finish(), "chore: bump");
    }

    #[test]
    fn empty_fragments_do_not_advance_phase() {
        let mut agg = quiet_aggregator();
        agg.push(delta(Some(""), Some("")));
        assert_eq!(agg.phase(), StreamPhase::Waiting);
    }

    #[test]
    fn loud_and_quiet_reporters_aggregate_identically() {
        let feed = [
            delta(Some("consider the diff"), None),
            delta(None, Some("docs: ")),
            delta(None, Some("clarify usage")),
        ];
        let mut quiet = StreamAggregator::new(ProgressReporter::new(true));
        let mut loud = StreamAggregator::new(ProgressReporter::new(false));
        for d in &feed {
            quiet.push(d.clone());
            loud.push(d.clone());
        }
        assert_eq!(quiet.finish(), loud.finish());
    }
}
