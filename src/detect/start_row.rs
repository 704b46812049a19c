//! Header offset detection.
//!
//! Files exported by reporting tools often carry a preamble (titles, export
//! dates, notes) above the table. Preamble rows have noticeably fewer
//! delimiters than the rows of the table itself.

use tracing::debug;

use crate::error::Result;
use crate::metadata::RecordDelimiter;
use crate::reader::CharReader;
use crate::sample::{CancelToken, SampleLimits};
use crate::sampler::Sampler;

/// A row counts as short when it falls this far below the average.
const DROP_RATIO: f64 = 0.9;

/// Rows at the end of the sample used to establish the average.
const TAIL_ROWS: usize = 10;

/// The heuristic only runs with at least this many non-comment rows.
const MIN_ROWS: usize = 4;

/// Per-row statistics gathered by the start-row scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RowStats {
    /// Delimiters outside quoted, escaped and commented content.
    pub delimiters: usize,
    /// The row starts with the comment marker.
    pub is_comment: bool,
    /// The row has no characters at all.
    pub is_blank: bool,
}

/// Dialect pieces the scan needs.
#[derive(Debug, Clone, Copy)]
pub struct RowDialect<'d> {
    pub delimiter: char,
    pub quote: Option<char>,
    pub escape: Option<char>,
    pub comment: Option<&'d str>,
    /// Rows end where the tokenizer ends records.
    pub record_delimiter: RecordDelimiter,
}

/// Collect statistics for up to `limits.start_rows` rows from the true start.
pub fn scan_rows(
    reader: &mut CharReader<'_>,
    dialect: RowDialect<'_>,
    limits: &SampleLimits,
    cancel: &CancelToken,
) -> Result<Vec<RowStats>> {
    let marker = dialect.comment.filter(|m| !m.is_empty());
    let marker_len = marker.map_or(0, |m| m.chars().count());

    let mut rows = Vec::new();
    let mut sampler = Sampler::from_beginning(reader)?;
    let mut current = RowStats::default();
    let mut prefix = String::new();
    let mut row_len = 0;
    let mut in_quotes = false;
    let mut escaped = false;

    while rows.len() < limits.start_rows && !cancel.is_cancelled() {
        let Some(c) = sampler.read()? else {
            if row_len > 0 {
                rows.push(current);
            }
            break;
        };

        if !in_quotes && !escaped && ends_row(&mut sampler, c, dialect.record_delimiter)? {
            current.is_blank = row_len == 0;
            rows.push(current);
            current = RowStats::default();
            prefix.clear();
            row_len = 0;
            continue;
        }

        row_len += 1;
        if row_len <= marker_len {
            prefix.push(c);
            if marker == Some(prefix.as_str()) {
                current.is_comment = true;
            }
        }
        if current.is_comment {
            // Quotes inside a comment must not swallow the line break.
            continue;
        }

        if escaped {
            escaped = false;
        } else if Some(c) == dialect.escape {
            escaped = true;
        } else if Some(c) == dialect.quote {
            in_quotes = !in_quotes;
        } else if c == dialect.delimiter && !in_quotes {
            current.delimiters += 1;
        }
    }

    Ok(rows)
}

/// Returns true when `c` ends a row, consuming the second half of a CRLF
/// pair (or LFCR pair for `LfCr` files).
fn ends_row(sampler: &mut Sampler<'_, '_>, c: char, style: RecordDelimiter) -> Result<bool> {
    if let Some(separator) = style.separator() {
        return Ok(c == separator);
    }
    let pair = match c {
        '\r' => '\n',
        '\n' if style == RecordDelimiter::LfCr => '\r',
        '\n' => return Ok(true),
        _ => return Ok(false),
    };
    if sampler.reader().peek()? == Some(pair) {
        sampler.reader().move_next()?;
    }
    Ok(true)
}

/// Infer how many rows to skip before the data begins.
pub fn infer_skip_rows(rows: &[RowStats]) -> usize {
    let data: Vec<(usize, RowStats)> = rows
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, r)| !r.is_comment)
        .collect();
    if data.len() < MIN_ROWS {
        debug!(rows = data.len(), "too few rows to infer a start row");
        return 0;
    }

    let counts = repair_doubled(&data.iter().map(|(_, r)| r.delimiters).collect::<Vec<_>>());

    let tail: Vec<usize> = counts
        .iter()
        .rev()
        .copied()
        .filter(|&c| c > 0)
        .take(TAIL_ROWS)
        .collect();
    if tail.is_empty() {
        return 0;
    }
    let average = tail.iter().sum::<usize>() as f64 / tail.len() as f64;
    let threshold = average * DROP_RATIO;
    let typical = average.round() as usize;

    if counts[0] as f64 >= threshold {
        return 0;
    }

    for j in (0..counts.len()).rev() {
        if counts[j] as f64 >= threshold {
            continue;
        }
        // A blank line followed by regular rows belongs to the data region.
        let (_, row) = data[j];
        if row.is_blank
            && j + 2 < counts.len()
            && counts[j + 1] == typical
            && counts[j + 2] == typical
        {
            continue;
        }
        // A short final row is a truncated record, not a preamble.
        if j + 1 < counts.len() {
            let start = data[j + 1].0;
            debug!(start, average, "data starts after the last short row");
            return start;
        }
    }

    let first = data
        .iter()
        .zip(&counts)
        .find(|(_, c)| **c > 0)
        .map_or(0, |((idx, _), _)| *idx);
    debug!(start = first, average, "no short row found, using the first delimited row");
    first
}

/// A row with exactly twice the delimiters of both neighbours is taken to be
/// two records glued together by a missing line break, and is counted like
/// its neighbours. Best-effort: a legitimately wide row can trip it.
fn repair_doubled(counts: &[usize]) -> Vec<usize> {
    let mut repaired = counts.to_vec();
    for i in 1..counts.len().saturating_sub(1) {
        let (before, here, after) = (counts[i - 1], counts[i], counts[i + 1]);
        if here > 0 && here == before * 2 && here == after * 2 {
            repaired[i] = before;
        }
    }
    repaired
}

/// Detect the number of preamble rows.
pub fn detect_start_row(
    reader: &mut CharReader<'_>,
    dialect: RowDialect<'_>,
    limits: &SampleLimits,
    cancel: &CancelToken,
) -> Result<usize> {
    let rows = scan_rows(reader, dialect, limits, cancel)?;
    Ok(infer_skip_rows(&rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dialect(comment: Option<&str>, record_delimiter: RecordDelimiter) -> RowDialect<'_> {
        RowDialect {
            delimiter: ',',
            quote: Some('"'),
            escape: None,
            comment,
            record_delimiter,
        }
    }

    fn detect(text: &str, comment: Option<&str>) -> usize {
        detect_with(text, comment, RecordDelimiter::Lf)
    }

    fn detect_with(text: &str, comment: Option<&str>, style: RecordDelimiter) -> usize {
        let mut reader = CharReader::from_text(text);
        detect_start_row(
            &mut reader,
            dialect(comment, style),
            &SampleLimits::default(),
            &CancelToken::new(),
        )
        .unwrap()
    }

    fn table(rows: usize) -> String {
        (0..rows).map(|i| format!("{i},b,c,d,e\n")).collect()
    }

    #[test]
    fn test_preamble_is_skipped() {
        let text = format!(
            "Quarterly report\nGenerated, today\nby the export tool\nPage 1\nnotes, none\n{}",
            table(20)
        );
        assert_eq!(detect(&text, None), 5);
    }

    #[test]
    fn test_no_preamble() {
        assert_eq!(detect(&table(20), None), 0);
    }

    #[test]
    fn test_too_few_rows() {
        assert_eq!(detect("title\na,b\nc,d\n", None), 0);
    }

    #[test]
    fn test_quoted_delimiters_ignored() {
        let text = format!("\"Report, with, commas\"\n{}", table(10));
        assert_eq!(detect(&text, None), 1);
    }

    #[test]
    fn test_comment_rows_are_counted_but_not_scored() {
        let text = format!("# a,b,c,d,e,f,g,h\nTitle\n{}", table(10));
        assert_eq!(detect(&text, Some("#")), 2);
    }

    #[test]
    fn test_blank_line_inside_data() {
        let text = format!("Title\n{}\n{}", table(5), table(5));
        assert_eq!(detect(&text, None), 1);
    }

    #[test]
    fn test_truncated_last_row() {
        let text = format!("Title\n{}x\n", table(10));
        assert_eq!(detect(&text, None), 1);
    }

    #[test]
    fn test_doubled_row_is_repaired() {
        assert_eq!(repair_doubled(&[4, 8, 4]), vec![4, 4, 4]);
        assert_eq!(repair_doubled(&[4, 8, 5]), vec![4, 8, 5]);
        assert_eq!(repair_doubled(&[0, 0, 0]), vec![0, 0, 0]);
    }

    #[test]
    fn test_scan_rows_flags() {
        let mut reader = CharReader::from_text("# it's,x\n\na,\"b,c\"\r\nd,e");
        let rows = scan_rows(
            &mut reader,
            RowDialect {
                delimiter: ',',
                quote: Some('\''),
                escape: None,
                comment: Some("#"),
                record_delimiter: RecordDelimiter::CrLf,
            },
            &SampleLimits::default(),
            &CancelToken::new(),
        )
        .unwrap();
        assert_eq!(rows.len(), 4);
        assert!(rows[0].is_comment);
        assert!(rows[1].is_blank);
        assert_eq!(rows[2].delimiters, 2);
        assert_eq!(rows[3].delimiters, 1);
    }

    const PREAMBLE: &str = "Quarterly report\nGenerated, today\nby the export tool\nPage 1\nnotes, none\n";

    #[test]
    fn test_preamble_with_each_line_ending() {
        let lf = format!("{PREAMBLE}{}", table(20));
        for (ending, style) in [
            ("\r", RecordDelimiter::Cr),
            ("\r\n", RecordDelimiter::CrLf),
            ("\n\r", RecordDelimiter::LfCr),
        ] {
            let text = lf.replace('\n', ending);
            assert_eq!(detect_with(&text, None, style), 5, "{style}");
        }
    }

    #[test]
    fn test_lfcr_pairs_are_one_row() {
        let mut reader = CharReader::from_text("a,b\n\rc,d\n\r\n\re,f");
        let rows = scan_rows(
            &mut reader,
            dialect(None, RecordDelimiter::LfCr),
            &SampleLimits::default(),
            &CancelToken::new(),
        )
        .unwrap();
        assert_eq!(rows.len(), 4);
        assert!(rows[2].is_blank);
        assert!(rows.iter().filter(|r| !r.is_blank).all(|r| r.delimiters == 1));
    }

    #[test]
    fn test_separator_rows_keep_line_breaks() {
        let text = format!("Title\u{1e}x,\ny,z\u{1e}{}\u{1e}", "1,2,3\u{1e}".repeat(6));
        let mut reader = CharReader::from_text(text.as_str());
        let rows = scan_rows(
            &mut reader,
            dialect(None, RecordDelimiter::RecordSeparator),
            &SampleLimits::default(),
            &CancelToken::new(),
        )
        .unwrap();
        assert_eq!(rows.len(), 9);
        assert_eq!(rows[1].delimiters, 2);
        assert!(rows[8].is_blank);
    }

    #[test]
    fn test_doubled_row_inside_data() {
        let text = "Title\n0,b,c,d,e\n1,b,c,d,e\n2,b,c,d,e2,b,c,d,e\n3,b,c,d,e\n4,b,c,d,e\n";
        assert_eq!(detect(text, None), 1);
    }
}
