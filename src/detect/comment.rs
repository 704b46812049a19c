//! Comment-line marker detection and validation.

use tracing::debug;

use crate::error::Result;
use crate::reader::CharReader;
use crate::sample::SampleLimits;
use crate::sampler::Sampler;

/// Candidate comment markers. Longer markers precede their prefixes so a
/// line is only counted once.
pub const COMMENT_MARKERS: &[&str] = &[
    "<!--", "##", "//", "==", "\\\\", "''", "#", "/", "\\", "'",
];

/// Allowed deviation of a marker line's delimiter count from the average of
/// ordinary lines.
const DELIMITER_BAND: f64 = 0.1;

/// Find the marker that starts the most lines near the top of the stream.
pub fn detect_comment(reader: &mut CharReader<'_>, limits: &SampleLimits) -> Result<Option<String>> {
    let mut counts = [0usize; COMMENT_MARKERS.len()];
    let mut sampler = Sampler::from_beginning(reader)?;
    let mut lines = 0;

    while lines < limits.comment_lines {
        let Some(line) = sampler.read_line()? else {
            break;
        };
        lines += 1;
        if let Some(idx) = COMMENT_MARKERS.iter().position(|m| line.starts_with(*m)) {
            counts[idx] += 1;
        }
    }

    let mut winner: Option<(usize, usize)> = None;
    for (idx, &count) in counts.iter().enumerate() {
        if count > 0 && winner.is_none_or(|(_, best)| count > best) {
            winner = Some((idx, count));
        }
    }

    match winner {
        Some((idx, count)) => {
            debug!(marker = COMMENT_MARKERS[idx], lines = count, "comment marker candidate");
            Ok(Some(COMMENT_MARKERS[idx].to_string()))
        }
        None => {
            debug!(lines, "no comment marker found");
            Ok(None)
        }
    }
}

/// Check that `marker` behaves like a comment marker for `delimiter`.
///
/// More than two marker lines are accepted outright. With one or two, each
/// marker line's delimiter count must lie within ±10% of the average count of
/// the other non-blank lines.
pub fn validate_comment(
    reader: &mut CharReader<'_>,
    marker: &str,
    delimiter: char,
    limits: &SampleLimits,
) -> Result<bool> {
    if marker.is_empty() {
        return Ok(false);
    }

    let mut marker_counts = Vec::new();
    let mut other_counts = Vec::new();
    let mut sampler = Sampler::from_beginning(reader)?;
    let mut lines = 0;

    while lines < limits.comment_validation_lines {
        let Some(line) = sampler.read_line()? else {
            break;
        };
        lines += 1;
        let delimiters = line.chars().filter(|&c| c == delimiter).count();
        if line.starts_with(marker) {
            marker_counts.push(delimiters);
        } else if !line.is_empty() {
            other_counts.push(delimiters);
        }
    }

    if marker_counts.is_empty() {
        debug!(marker, "no line starts with the comment marker");
        return Ok(false);
    }
    if marker_counts.len() > 2 || other_counts.is_empty() {
        return Ok(true);
    }

    let average = other_counts.iter().sum::<usize>() as f64 / other_counts.len() as f64;
    let low = average * (1.0 - DELIMITER_BAND);
    let high = average * (1.0 + DELIMITER_BAND);
    let valid = marker_counts
        .iter()
        .all(|&count| (low..=high).contains(&(count as f64)));

    if !valid {
        debug!(
            marker,
            ?marker_counts,
            average,
            "comment marker rejected: marker lines fall outside the delimiter band"
        );
    }
    Ok(valid)
}
