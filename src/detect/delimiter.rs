//! Per-row delimiter frequency statistics and delimiter selection.

use foldhash::{HashMap, HashMapExt};
use tracing::debug;

use crate::error::Result;
use crate::reader::CharReader;
use crate::sample::{CancelToken, SampleLimits};
use crate::sampler::Sampler;

/// Candidate field delimiters, in priority order.
pub const DELIMITER_CANDIDATES: &[char] = &[
    '\t',       // Tab
    ',',        // Comma
    ';',        // Semicolon
    '\u{060C}', // Arabic comma
    '\u{061B}', // Arabic semicolon
    '|',        // Pipe
    '\u{00A6}', // Broken bar
    '*',        // Asterisk
    '`',        // Backtick
    '\u{1c}',   // File separator
    '\u{1d}',   // Group separator
    '\u{1e}',   // Record separator
    '\u{1f}',   // Unit separator
];

/// Occurrence counts of every candidate delimiter, per sampled row.
#[derive(Debug, Clone)]
pub struct DelimiterCounter {
    candidates: Vec<char>,
    /// `counts[c][r]`: occurrences of candidate `c` in row `r`.
    counts: Vec<Vec<usize>>,
}

impl Default for DelimiterCounter {
    fn default() -> Self {
        Self::new(None)
    }
}

impl DelimiterCounter {
    /// Counter over the standard candidates plus the locale list separator,
    /// when it is not already a candidate.
    pub fn new(list_separator: Option<char>) -> Self {
        let mut candidates = DELIMITER_CANDIDATES.to_vec();
        if let Some(sep) = list_separator
            && !candidates.contains(&sep)
        {
            candidates.push(sep);
        }
        let counts = vec![Vec::new(); candidates.len()];
        Self { candidates, counts }
    }

    /// Candidates in priority order.
    pub fn candidates(&self) -> &[char] {
        &self.candidates
    }

    /// Number of rows recorded.
    pub fn num_rows(&self) -> usize {
        self.counts.first().map_or(0, Vec::len)
    }

    /// Per-row counts recorded for `delimiter`, if it is a candidate.
    pub fn row_counts(&self, delimiter: char) -> Option<&[usize]> {
        let idx = self.candidates.iter().position(|&c| c == delimiter)?;
        Some(&self.counts[idx])
    }

    /// Record one row of text, ignoring characters between `quote` pairs.
    pub fn add_row(&mut self, row: &str, quote: Option<char>) {
        let mut row_counts = vec![0usize; self.candidates.len()];
        let mut in_quotes = false;
        for c in row.chars() {
            if Some(c) == quote {
                in_quotes = !in_quotes;
                continue;
            }
            if in_quotes {
                continue;
            }
            if let Some(idx) = self.candidates.iter().position(|&d| d == c) {
                row_counts[idx] += 1;
            }
        }
        for (column, count) in self.counts.iter_mut().zip(row_counts) {
            column.push(count);
        }
    }

    /// Modal non-zero count of a candidate and how many rows share it.
    fn modal_count(counts: &[usize]) -> (usize, usize) {
        let mut freq: HashMap<usize, usize> = HashMap::with_capacity(counts.len());
        for &count in counts.iter().filter(|&&c| c > 0) {
            *freq.entry(count).or_insert(0) += 1;
        }
        // Deterministic tie-break: prefer the higher count.
        freq.into_iter()
            .max_by(|(count_a, rows_a), (count_b, rows_b)| {
                rows_a.cmp(rows_b).then_with(|| count_a.cmp(count_b))
            })
            .unwrap_or((0, 0))
    }

    /// The delimiter with the most rows sharing one non-zero modal count.
    /// Ties go to the earlier candidate.
    pub fn best(&self) -> Option<char> {
        let mut best: Option<(char, usize)> = None;
        for (&candidate, counts) in self.candidates.iter().zip(&self.counts) {
            let (mode, rows) = Self::modal_count(counts);
            if rows == 0 {
                continue;
            }
            debug!(delimiter = ?candidate, mode, rows, "delimiter candidate");
            if best.is_none_or(|(_, best_rows)| rows > best_rows) {
                best = Some((candidate, rows));
            }
        }
        best.map(|(c, _)| c)
    }
}

/// Sample rows from the reader's current position and count candidate
/// delimiters outside `quote` pairs. Blank rows and rows starting with
/// `comment` are not recorded.
pub fn count_delimiters(
    reader: &mut CharReader<'_>,
    quote: Option<char>,
    comment: Option<&str>,
    list_separator: Option<char>,
    limits: &SampleLimits,
    cancel: &CancelToken,
) -> Result<DelimiterCounter> {
    let mut counter = DelimiterCounter::new(list_separator);
    let mut sampler = Sampler::new(reader);
    let mut row = String::new();
    let mut in_quotes = false;

    while counter.num_rows() < limits.delimiter_rows && !cancel.is_cancelled() {
        let next = sampler.read()?;
        let row_ended = match next {
            None => true,
            Some(c) if Some(c) == quote => {
                in_quotes = !in_quotes;
                row.push(c);
                false
            }
            Some('\r') if !in_quotes => {
                if sampler.reader().peek()? == Some('\n') {
                    sampler.reader().move_next()?;
                }
                true
            }
            Some('\n') if !in_quotes => true,
            Some(c) => {
                row.push(c);
                false
            }
        };

        if row_ended {
            let is_comment = comment.is_some_and(|m| !m.is_empty() && row.starts_with(m));
            if !row.is_empty() && !is_comment {
                counter.add_row(&row, quote);
            }
            row.clear();
            in_quotes = false;
            if next.is_none() {
                break;
            }
        }
    }

    Ok(counter)
}
