//! Qualifier (quote character) detection.
//!
//! The sample is reduced to a "shape" string: quote candidates are kept,
//! line breaks become the delimiter and every other run of characters
//! becomes a single placeholder. A real qualifier opens right after a
//! delimiter and closes right before one; a character that merely appears in
//! text does not.

use tracing::debug;

use crate::error::Result;
use crate::metadata::Quote;
use crate::reader::CharReader;
use crate::sample::{CancelToken, SampleLimits};
use crate::sampler::Sampler;

/// Default quote candidates; the first is the primary candidate.
pub const QUOTE_CANDIDATES: &[char] = &['"', '\''];

/// Stands in for any run of ordinary field characters.
const PLACEHOLDER: char = '\u{E000}';

/// A candidate needs at least this many closes per open.
const CLOSE_RATIO: f64 = 1.5;

/// Occurrence statistics for one quote candidate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuoteCounts {
    /// Every occurrence in the shape string.
    pub total: usize,
    /// Occurrences that start a field.
    pub opens: usize,
    /// Occurrences that end a field.
    pub closes: usize,
}

impl QuoteCounts {
    /// Returns false when there are too few closes for the opens seen.
    pub fn is_balanced(&self) -> bool {
        self.closes as f64 * CLOSE_RATIO >= self.opens as f64
    }
}

/// Outcome of qualifier detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualifierDetection {
    /// The selected qualifier.
    pub quote: Quote,
    /// Statistics per candidate, in candidate order.
    pub counts: Vec<(char, QuoteCounts)>,
    /// The escape prefix was seen directly before the selected qualifier.
    pub escaped_qualifier: bool,
    /// The selected qualifier was seen doubled next to field content.
    pub duplicate_qualifier: bool,
}

struct Shape {
    chars: Vec<char>,
    /// Candidates that were seen right after the escape prefix.
    escaped: Vec<char>,
}

/// Detect the qualifier for `delimiter` among `candidates`.
pub fn detect_qualifier(
    reader: &mut CharReader<'_>,
    delimiter: char,
    escape: Option<char>,
    candidates: &[char],
    limits: &SampleLimits,
    cancel: &CancelToken,
) -> Result<QualifierDetection> {
    let candidates: Vec<char> = candidates
        .iter()
        .copied()
        .filter(|&c| c != delimiter && Some(c) != escape)
        .collect();
    let shape = read_shape(reader, delimiter, escape, &candidates, limits, cancel)?;

    let counts: Vec<(char, QuoteCounts)> = candidates
        .iter()
        .map(|&q| (q, count_quote(&shape.chars, delimiter, q)))
        .collect();

    let quote = select(&counts);
    let (escaped_qualifier, duplicate_qualifier) = match quote {
        Quote::Some(q) => (
            shape.escaped.contains(&q),
            has_duplicate(&shape.chars, q),
        ),
        Quote::None => (false, false),
    };

    debug!(%quote, ?counts, escaped_qualifier, duplicate_qualifier, "qualifier detected");

    Ok(QualifierDetection {
        quote,
        counts,
        escaped_qualifier,
        duplicate_qualifier,
    })
}

fn read_shape(
    reader: &mut CharReader<'_>,
    delimiter: char,
    escape: Option<char>,
    candidates: &[char],
    limits: &SampleLimits,
    cancel: &CancelToken,
) -> Result<Shape> {
    let mut sampler = Sampler::new(reader);
    let mut chars = vec![delimiter];
    let mut escaped_quotes = Vec::new();
    let mut escaped = false;
    let mut taken = 0;

    while taken < limits.qualifier_chars && !cancel.is_cancelled() {
        let Some(c) = sampler.read()? else {
            break;
        };
        if escaped {
            escaped = false;
            continue;
        }
        if Some(c) == escape {
            escaped = true;
            if let Some(next) = sampler.reader().peek()?
                && candidates.contains(&next)
                && !escaped_quotes.contains(&next)
            {
                escaped_quotes.push(next);
            }
            continue;
        }
        taken += 1;

        let mapped = if candidates.contains(&c) {
            c
        } else if c == delimiter || c == '\r' || c == '\n' {
            delimiter
        } else {
            PLACEHOLDER
        };
        let collapsible = mapped == PLACEHOLDER || mapped == delimiter;
        if collapsible && chars.last() == Some(&mapped) {
            continue;
        }
        chars.push(mapped);
    }

    chars.push(delimiter);
    chars.push(delimiter);
    Ok(Shape {
        chars,
        escaped: escaped_quotes,
    })
}

fn count_quote(shape: &[char], delimiter: char, quote: char) -> QuoteCounts {
    let mut counts = QuoteCounts::default();
    for i in 1..shape.len().saturating_sub(1) {
        if shape[i] != quote {
            continue;
        }
        counts.total += 1;

        let prev = shape[i - 1];
        let next = shape[i + 1];
        let after = shape.get(i + 2).copied();
        if prev == delimiter
            && (next == PLACEHOLDER || (next == quote && after != Some(delimiter)))
        {
            counts.opens += 1;
        }
        if prev == PLACEHOLDER && next == delimiter {
            counts.closes += 1;
        }
    }
    counts
}

/// A doubled qualifier touching field content, as in `a""b` or `"""a"`.
fn has_duplicate(shape: &[char], quote: char) -> bool {
    shape.windows(4).any(|w| {
        w[1] == quote && w[2] == quote && (w[0] == PLACEHOLDER || w[3] == PLACEHOLDER)
    })
}

fn select(counts: &[(char, QuoteCounts)]) -> Quote {
    let mut best: Option<(char, usize)> = None;
    for &(q, c) in counts {
        if c.opens > 0 && c.is_balanced() && best.is_none_or(|(_, opens)| c.opens > opens) {
            best = Some((q, c.opens));
        }
    }
    if let Some((q, _)) = best {
        return Quote::Some(q);
    }

    if counts.iter().all(|(_, c)| c.opens == 0) {
        let mut frequent: Option<(char, usize)> = None;
        for &(q, c) in counts {
            if c.total >= 2 && frequent.is_none_or(|(_, total)| c.total > total) {
                frequent = Some((q, c.total));
            }
        }
        if let Some((q, _)) = frequent {
            return Quote::Some(q);
        }
    }

    // An absent primary qualifier is harmless, so keep it.
    match counts.first() {
        Some(&(q, c)) if c.total == 0 => Quote::Some(q),
        _ => Quote::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detect(text: &str, escape: Option<char>) -> QualifierDetection {
        let mut reader = CharReader::from_text(text);
        detect_qualifier(
            &mut reader,
            ',',
            escape,
            QUOTE_CANDIDATES,
            &SampleLimits::default(),
            &CancelToken::new(),
        )
        .unwrap()
    }

    #[test]
    fn test_double_quotes() {
        let detection = detect("\"a\",\"b\",\"c\"\n\"d\",\"e\",\"f\"", None);
        assert_eq!(detection.quote, Quote::Some('"'));
        let counts = detection.counts[0].1;
        assert_eq!(counts.opens, 6);
        assert_eq!(counts.closes, 6);
        assert_eq!(counts.total, 12);
    }

    #[test]
    fn test_single_quotes() {
        let detection = detect("'name','value'\n'hello, world','123'\n", None);
        assert_eq!(detection.quote, Quote::Some('\''));
    }

    #[test]
    fn test_absent_primary_is_kept() {
        let detection = detect("a,b,c\n1,2,3\n", None);
        assert_eq!(detection.quote, Quote::Some('"'));
        assert_eq!(detection.counts[0].1.total, 0);
    }

    #[test]
    fn test_unbalanced_is_rejected() {
        let detection = detect("\"a,\"b,\"c\n\"d,\"e\n", None);
        assert!(!detection.counts[0].1.is_balanced());
        assert_eq!(detection.quote, Quote::None);
    }

    #[test]
    fn test_frequency_fallback() {
        // Quotes only ever appear mid-field.
        let detection = detect("a\"b,c\nd\"e,f\n", None);
        assert_eq!(detection.counts[0].1.opens, 0);
        assert_eq!(detection.quote, Quote::Some('"'));
    }

    #[test]
    fn test_duplicate_qualifier() {
        let detection = detect("\"a\"\"b\",\"c\"\n\"\",\"d\"\n", None);
        assert_eq!(detection.quote, Quote::Some('"'));
        assert!(detection.duplicate_qualifier);
        assert!(!detection.escaped_qualifier);
    }

    #[test]
    fn test_empty_quoted_field_is_not_duplicate() {
        let detection = detect("\"\",\"a\"\n\"b\",\"\"\n", None);
        assert!(!detection.duplicate_qualifier);
    }

    #[test]
    fn test_escaped_qualifier() {
        let detection = detect("\"a\\\"b\",\"c\"\n\"d\",\"e\"\n", Some('\\'));
        assert_eq!(detection.quote, Quote::Some('"'));
        assert!(detection.escaped_qualifier);
    }
}
