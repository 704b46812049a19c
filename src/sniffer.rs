//! Main Sniffer builder and sniff methods.
//!
//! The sniffer runs the detectors in dependency order over one reader:
//! comment marker, delimiter, comment validation, escape prefix, qualifier,
//! record delimiter and start row. Any parameter can be forced, which skips
//! its detector.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::{debug, info};

use crate::detect::comment::{detect_comment, validate_comment};
use crate::detect::delimiter::count_delimiters;
use crate::detect::escape::{ESCAPE_CANDIDATES, detect_escape};
use crate::detect::qualifier::{QUOTE_CANDIDATES, detect_qualifier};
use crate::detect::record_delimiter::detect_record_delimiter;
use crate::detect::start_row::{RowDialect, detect_start_row};
use crate::encoding::decode;
use crate::error::{Result, SnifferError};
use crate::metadata::{Dialect, Metadata, Quote, RecordDelimiter};
use crate::reader::CharReader;
use crate::sample::{CancelToken, SampleLimits};

/// Delimiter used when no candidate was ever seen.
const FALLBACK_DELIMITER: char = ',';

/// Delimited-text dialect sniffer.
///
/// # Example
///
/// ```
/// use csv_sleuth::{Quote, Sniffer};
///
/// let metadata = Sniffer::new()
///     .sniff_str("id;name\n1;\"Smith; J\"\n2;Jones\n3;Brown\n")
///     .unwrap();
/// assert_eq!(metadata.dialect.delimiter, ';');
/// assert_eq!(metadata.dialect.quote, Quote::Some('"'));
/// ```
#[derive(Debug, Clone)]
pub struct Sniffer {
    limits: SampleLimits,
    cancel: CancelToken,
    list_separator: Option<char>,
    escape_candidates: Vec<char>,
    quote_candidates: Vec<char>,
    forced_delimiter: Option<char>,
    forced_quote: Option<Quote>,
    forced_escape: Option<Option<char>>,
    forced_record_delimiter: Option<RecordDelimiter>,
    forced_comment: Option<Option<String>>,
    forced_skip_rows: Option<usize>,
}

impl Default for Sniffer {
    fn default() -> Self {
        Self::new()
    }
}

impl Sniffer {
    /// Create a new Sniffer with default settings.
    pub fn new() -> Self {
        Self {
            limits: SampleLimits::default(),
            cancel: CancelToken::new(),
            list_separator: None,
            escape_candidates: ESCAPE_CANDIDATES.to_vec(),
            quote_candidates: QUOTE_CANDIDATES.to_vec(),
            forced_delimiter: None,
            forced_quote: None,
            forced_escape: None,
            forced_record_delimiter: None,
            forced_comment: None,
            forced_skip_rows: None,
        }
    }

    /// Set the scan bounds.
    pub fn limits(&mut self, limits: SampleLimits) -> &mut Self {
        self.limits = limits;
        self
    }

    /// Share a cancellation token with the caller.
    pub fn cancel_token(&mut self, cancel: CancelToken) -> &mut Self {
        self.cancel = cancel;
        self
    }

    /// Add the locale's list separator to the delimiter candidates.
    pub fn list_separator(&mut self, separator: char) -> &mut Self {
        self.list_separator = Some(separator);
        self
    }

    /// Replace the escape-prefix candidates.
    pub fn escape_candidates(&mut self, candidates: &[char]) -> &mut Self {
        self.escape_candidates = candidates.to_vec();
        self
    }

    /// Replace the qualifier candidates. The first one is the primary.
    pub fn quote_candidates(&mut self, candidates: &[char]) -> &mut Self {
        self.quote_candidates = candidates.to_vec();
        self
    }

    /// Force a specific delimiter (skip delimiter detection).
    pub fn delimiter(&mut self, delimiter: char) -> &mut Self {
        self.forced_delimiter = Some(delimiter);
        self
    }

    /// Force a specific quote character.
    pub fn quote(&mut self, quote: Quote) -> &mut Self {
        self.forced_quote = Some(quote);
        self
    }

    /// Force the escape prefix; `None` disables escaping.
    pub fn escape(&mut self, escape: Option<char>) -> &mut Self {
        self.forced_escape = Some(escape);
        self
    }

    /// Force the record terminator style.
    pub fn record_delimiter(&mut self, record_delimiter: RecordDelimiter) -> &mut Self {
        self.forced_record_delimiter = Some(record_delimiter);
        self
    }

    /// Force the comment marker; `None` disables comment handling.
    pub fn comment(&mut self, comment: Option<&str>) -> &mut Self {
        self.forced_comment = Some(comment.map(str::to_owned));
        self
    }

    /// Force the number of preamble rows.
    pub fn skip_rows(&mut self, skip_rows: usize) -> &mut Self {
        self.forced_skip_rows = Some(skip_rows);
        self
    }

    /// Sniff a file at the given path.
    pub fn sniff_path<P: AsRef<Path>>(&self, path: P) -> Result<Metadata> {
        let file = File::open(path.as_ref())?;
        self.sniff_reader(BufReader::new(file))
    }

    /// Sniff a UTF-8 stream. The stream is read only as far as the scans need.
    pub fn sniff_reader<R: BufRead>(&self, reader: R) -> Result<Metadata> {
        let mut reader = CharReader::from_reader(reader);
        self.sniff(&mut reader)
    }

    /// Sniff raw bytes, decoding them first.
    pub fn sniff_bytes(&self, data: &[u8]) -> Result<Metadata> {
        let text = decode(data);
        self.sniff_str(&text)
    }

    /// Sniff in-memory text.
    pub fn sniff_str(&self, text: &str) -> Result<Metadata> {
        let mut reader = CharReader::from_text(text);
        self.sniff(&mut reader)
    }

    /// Run the detection sequence over `reader` from its true start.
    ///
    /// The reader is left rewound, ready for a
    /// [`Tokenizer`](crate::tokenizer::Tokenizer).
    pub fn sniff(&self, reader: &mut CharReader<'_>) -> Result<Metadata> {
        self.validate()?;
        reader.to_beginning()?;
        if reader.end_of_stream()? {
            return Err(SnifferError::EmptyData);
        }

        let limits = &self.limits;
        let cancel = &self.cancel;
        let primary_quote = match self.forced_quote {
            Some(quote) => quote.char(),
            None => self.quote_candidates.first().copied(),
        };

        let detected_comment = match &self.forced_comment {
            Some(comment) => comment.clone(),
            None => detect_comment(reader, limits)?,
        };

        let delimiter = match self.forced_delimiter {
            Some(delimiter) => delimiter,
            None => {
                // A marker that looks like a qualifier must not hide quoted rows.
                let skip_marker = detected_comment.as_deref().filter(|m| {
                    self.forced_comment.is_some()
                        || !self.quote_candidates.iter().any(|&q| m.starts_with(q))
                });
                reader.to_beginning()?;
                let counter = count_delimiters(
                    reader,
                    primary_quote,
                    skip_marker,
                    self.list_separator,
                    limits,
                    cancel,
                )?;
                counter.best().unwrap_or_else(|| {
                    debug!("no delimiter candidate seen, falling back to comma");
                    FALLBACK_DELIMITER
                })
            }
        };

        let comment = match (&self.forced_comment, detected_comment) {
            (Some(_), comment) => comment,
            (None, Some(marker)) => {
                if validate_comment(reader, &marker, delimiter, limits)? {
                    Some(marker)
                } else {
                    debug!(%marker, "comment marker rejected by validation");
                    None
                }
            }
            (None, None) => None,
        };

        let escape = match self.forced_escape {
            Some(escape) => escape,
            None => {
                reader.to_beginning()?;
                detect_escape(
                    reader,
                    delimiter,
                    primary_quote,
                    &self.escape_candidates,
                    limits,
                    cancel,
                )?
                .escape
            }
        };

        let (quote, escaped_qualifier, duplicate_qualifier) = match self.forced_quote {
            Some(Quote::None) => (Quote::None, false, false),
            forced => {
                let candidates = match forced {
                    Some(Quote::Some(q)) => vec![q],
                    _ => self.quote_candidates.clone(),
                };
                reader.to_beginning()?;
                let detection =
                    detect_qualifier(reader, delimiter, escape, &candidates, limits, cancel)?;
                let quote = forced.unwrap_or(detection.quote);
                (
                    quote,
                    detection.escaped_qualifier,
                    detection.duplicate_qualifier,
                )
            }
        };

        let comment = match (&self.forced_comment, comment, quote.char()) {
            (None, Some(marker), Some(q)) if marker.starts_with(q) => {
                debug!(%marker, "comment marker is the qualifier, ignoring it");
                None
            }
            (_, comment, _) => comment,
        };

        let record_delimiter = match self.forced_record_delimiter {
            Some(record_delimiter) => record_delimiter,
            None => {
                reader.to_beginning()?;
                detect_record_delimiter(reader, quote.char(), limits, cancel)?
            }
        };

        let skip_rows = match self.forced_skip_rows {
            Some(skip_rows) => skip_rows,
            None => detect_start_row(
                reader,
                RowDialect {
                    delimiter,
                    quote: quote.char(),
                    escape,
                    comment: comment.as_deref(),
                    record_delimiter,
                },
                limits,
                cancel,
            )?,
        };

        reader.to_beginning()?;
        let dialect = Dialect::new(delimiter, quote, escape, record_delimiter, comment, skip_rows);
        info!(
            delimiter = ?dialect.delimiter,
            quote = %dialect.quote,
            escape = ?dialect.escape,
            record_delimiter = %dialect.record_delimiter,
            comment = ?dialect.comment,
            skip_rows = dialect.skip_rows,
            "dialect detected"
        );
        Ok(Metadata::new(dialect, escaped_qualifier, duplicate_qualifier))
    }

    fn validate(&self) -> Result<()> {
        if self.forced_quote.is_none() && self.quote_candidates.is_empty() {
            return Err(SnifferError::InvalidConfig(
                "at least one quote candidate is required".to_string(),
            ));
        }
        if let (Some(delimiter), Some(Quote::Some(quote))) = (self.forced_delimiter, self.forced_quote)
            && delimiter == quote
        {
            return Err(SnifferError::InvalidConfig(format!(
                "delimiter and quote are both {delimiter:?}"
            )));
        }
        if let Some(Some(comment)) = &self.forced_comment
            && comment.is_empty()
        {
            return Err(SnifferError::InvalidConfig(
                "comment marker must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
