use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Upper bounds for every sampling scan.
///
/// Detection is bounded structurally by these sizes, never by wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleLimits {
    /// Lines inspected when looking for a comment marker.
    pub comment_lines: usize,
    /// Lines inspected when validating a comment marker.
    pub comment_validation_lines: usize,
    /// Lines inspected by the escape-prefix detector.
    pub escape_lines: usize,
    /// Characters inspected by the record-delimiter detector.
    pub record_delimiter_chars: usize,
    /// Non-escaped characters folded into the qualifier shape string.
    pub qualifier_chars: usize,
    /// Rows inspected by the start-row detector.
    pub start_rows: usize,
    /// Rows inspected by the delimiter-frequency counter.
    pub delimiter_rows: usize,
}

impl Default for SampleLimits {
    fn default() -> Self {
        Self {
            comment_lines: 50,
            comment_validation_lines: 100,
            escape_lines: 500,
            record_delimiter_chars: 8192,
            qualifier_chars: 2000,
            start_rows: 50,
            delimiter_rows: 100,
        }
    }
}

/// Cooperative cancellation flag shared between a caller and a running scan.
///
/// Detectors treat cancellation as a soft stop and return their best answer
/// so far; the tokenizer treats it as a hard stop.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Returns true once `cancel` has been called on any clone.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
