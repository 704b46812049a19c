//! Escape-prefix detection.
//!
//! An escape character earns points when it sits in front of something that
//! needs escaping and loses a point everywhere else, so characters that occur
//! naturally in text (slashes in paths and URLs, question marks) score low.

use tracing::debug;

use crate::error::Result;
use crate::reader::CharReader;
use crate::sample::{CancelToken, SampleLimits};
use crate::sampler::Sampler;

/// Default escape candidates, in priority order.
pub const ESCAPE_CANDIDATES: &[char] = &['\\', '/', '?'];

/// Characters commonly written with an escape prefix.
const COMMONLY_ESCAPED: &[char] = &['"', '\'', '\\'];

/// Outcome of escape detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscapeDetection {
    /// The winning escape prefix, or `None` when no candidate scored above zero.
    pub escape: Option<char>,
    /// Score per candidate, in candidate order.
    pub scores: Vec<(char, i64)>,
}

/// Score every candidate over up to `limits.escape_lines` sampled lines.
pub fn detect_escape(
    reader: &mut CharReader<'_>,
    delimiter: char,
    quote: Option<char>,
    candidates: &[char],
    limits: &SampleLimits,
    cancel: &CancelToken,
) -> Result<EscapeDetection> {
    let mut scores = vec![0i64; candidates.len()];
    let mut sampler = Sampler::new(reader);
    let mut lines = 0;

    while lines < limits.escape_lines && !cancel.is_cancelled() {
        let Some(line) = sampler.read_line()? else {
            break;
        };
        lines += 1;
        score_line(&line, delimiter, quote, candidates, &mut scores);
    }

    let mut escape = None;
    let mut best = 0;
    for (&candidate, &score) in candidates.iter().zip(&scores) {
        if score > best {
            best = score;
            escape = Some(candidate);
        }
    }

    match escape {
        Some(c) => debug!(escape = ?c, score = best, lines, "escape prefix detected"),
        None => debug!(lines, "no escape candidate scored above zero"),
    }

    Ok(EscapeDetection {
        escape,
        scores: candidates.iter().copied().zip(scores).collect(),
    })
}

fn score_line(
    line: &str,
    delimiter: char,
    quote: Option<char>,
    candidates: &[char],
    scores: &mut [i64],
) {
    let chars: Vec<char> = line.chars().collect();
    for (idx, &candidate) in candidates.iter().enumerate() {
        let mut i = 0;
        while i + 1 < chars.len() {
            if chars[i] != candidate {
                i += 1;
                continue;
            }
            let next = chars[i + 1];
            if next == delimiter || Some(next) == quote || COMMONLY_ESCAPED.contains(&next) {
                scores[idx] += 2;
                // The escaped character is consumed with its prefix.
                i += 2;
            } else {
                scores[idx] -= 1;
                i += 1;
            }
        }
    }
}
