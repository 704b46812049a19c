//! Record terminator detection.

use tracing::debug;

use crate::error::Result;
use crate::metadata::RecordDelimiter;
use crate::reader::CharReader;
use crate::sample::{CancelToken, SampleLimits};
use crate::sampler::Sampler;

/// Styles in tie-break order: unambiguous machine separators first.
const TIE_ORDER: [RecordDelimiter; 6] = [
    RecordDelimiter::RecordSeparator,
    RecordDelimiter::UnitSeparator,
    RecordDelimiter::Cr,
    RecordDelimiter::Lf,
    RecordDelimiter::CrLf,
    RecordDelimiter::LfCr,
];

/// Terminator counts observed outside quoted fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TerminatorCounts {
    pub cr: usize,
    pub lf: usize,
    pub crlf: usize,
    pub lfcr: usize,
    pub record_separator: usize,
    pub unit_separator: usize,
}

impl TerminatorCounts {
    /// Count for one style.
    pub const fn get(&self, style: RecordDelimiter) -> usize {
        match style {
            RecordDelimiter::Cr => self.cr,
            RecordDelimiter::Lf => self.lf,
            RecordDelimiter::CrLf => self.crlf,
            RecordDelimiter::LfCr => self.lfcr,
            RecordDelimiter::RecordSeparator => self.record_separator,
            RecordDelimiter::UnitSeparator => self.unit_separator,
            RecordDelimiter::None => 0,
        }
    }

    /// The most frequent style, or `RecordDelimiter::None` when nothing was seen.
    pub fn winner(&self) -> RecordDelimiter {
        let mut best = RecordDelimiter::None;
        let mut best_count = 0;
        for style in TIE_ORDER {
            let count = self.get(style);
            if count > best_count {
                best = style;
                best_count = count;
            }
        }
        best
    }
}

/// Tally terminators over up to `limits.record_delimiter_chars` characters,
/// ignoring breaks inside quoted fields.
pub fn count_terminators(
    reader: &mut CharReader<'_>,
    quote: Option<char>,
    limits: &SampleLimits,
    cancel: &CancelToken,
) -> Result<TerminatorCounts> {
    let mut counts = TerminatorCounts::default();
    let mut sampler = Sampler::new(reader);
    let mut in_quotes = false;
    let mut chars = 0;

    while chars < limits.record_delimiter_chars && !cancel.is_cancelled() {
        let Some(c) = sampler.read()? else {
            break;
        };
        chars += 1;

        if Some(c) == quote {
            if in_quotes && sampler.reader().peek()? == quote {
                // Doubled qualifier: literal, still quoted.
                sampler.reader().move_next()?;
                chars += 1;
            } else {
                in_quotes = !in_quotes;
            }
            continue;
        }
        if in_quotes {
            continue;
        }

        match c {
            '\r' => {
                if sampler.reader().peek()? == Some('\n') {
                    sampler.reader().move_next()?;
                    chars += 1;
                    counts.crlf += 1;
                } else {
                    counts.cr += 1;
                }
            }
            '\n' => {
                if sampler.reader().peek()? == Some('\r') {
                    sampler.reader().move_next()?;
                    chars += 1;
                    counts.lfcr += 1;
                } else {
                    counts.lf += 1;
                }
            }
            '\u{1e}' => counts.record_separator += 1,
            '\u{1f}' => counts.unit_separator += 1,
            _ => {}
        }
    }

    Ok(counts)
}

/// Detect the record terminator style.
pub fn detect_record_delimiter(
    reader: &mut CharReader<'_>,
    quote: Option<char>,
    limits: &SampleLimits,
    cancel: &CancelToken,
) -> Result<RecordDelimiter> {
    let counts = count_terminators(reader, quote, limits, cancel)?;
    let style = counts.winner();
    debug!(?counts, %style, "record delimiter detected");
    Ok(style)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detect(text: &str) -> RecordDelimiter {
        let mut reader = CharReader::from_text(text);
        detect_record_delimiter(
            &mut reader,
            Some('"'),
            &SampleLimits::default(),
            &CancelToken::new(),
        )
        .unwrap()
    }

    #[test]
    fn test_basic_styles() {
        assert_eq!(detect("a,b\nc,d\n"), RecordDelimiter::Lf);
        assert_eq!(detect("a,b\r\nc,d\r\n"), RecordDelimiter::CrLf);
        assert_eq!(detect("a,b\rc,d\r"), RecordDelimiter::Cr);
        assert_eq!(detect("a,b\n\rc,d\n\r"), RecordDelimiter::LfCr);
        assert_eq!(detect("a,b\u{1e}c,d\u{1e}"), RecordDelimiter::RecordSeparator);
        assert_eq!(detect("a,b\u{1f}c,d\u{1f}"), RecordDelimiter::UnitSeparator);
    }

    #[test]
    fn test_none_when_no_break() {
        assert_eq!(detect("a,b,c"), RecordDelimiter::None);
    }

    #[test]
    fn test_breaks_inside_quotes_ignored() {
        // Two embedded CRLFs inside quotes, two real LF terminators.
        assert_eq!(
            detect("\"x\r\ny\r\nz\",1\n\"a\"\"b\",2\n"),
            RecordDelimiter::Lf
        );
    }

    #[test]
    fn test_tie_prefers_separators() {
        assert_eq!(detect("a\u{1e}b\nc"), RecordDelimiter::RecordSeparator);
        assert_eq!(detect("a\rb\nc"), RecordDelimiter::Cr);
    }

    #[test]
    fn test_winner_counts() {
        let counts = TerminatorCounts {
            crlf: 3,
            lf: 3,
            ..Default::default()
        };
        assert_eq!(counts.winner(), RecordDelimiter::Lf);
    }
}
