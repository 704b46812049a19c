//! Character-level record and field tokenizer.
//!
//! Each field runs through a small state machine:
//! `PreData -> (Quoted | Unquoted) -> PostData`, with an escape flag carried
//! across characters. Line breaks inside quoted fields are data.

use crate::error::{Result, SnifferError};
use crate::metadata::{Dialect, RecordDelimiter};
use crate::reader::CharReader;
use crate::sample::CancelToken;

/// One record: field texts in order. An empty record is a blank line,
/// distinct from a record holding a single empty field.
pub type Record = Vec<String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldState {
    PreData,
    Quoted,
    Unquoted,
    PostData,
}

#[derive(Debug)]
struct Field {
    text: String,
    quoted: bool,
    ends_record: bool,
}

/// Pull-style tokenizer over a borrowed reader.
#[derive(Debug)]
pub struct Tokenizer<'r, 'a> {
    reader: &'r mut CharReader<'a>,
    delimiter: char,
    quote: Option<char>,
    escape: Option<char>,
    record_delimiter: RecordDelimiter,
    comment: Option<String>,
    pending_skip: usize,
    cancel: CancelToken,
    done: bool,
}

impl<'r, 'a> Tokenizer<'r, 'a> {
    /// Tokenize from the reader's current position.
    pub fn new(reader: &'r mut CharReader<'a>, dialect: &Dialect) -> Self {
        Self {
            reader,
            delimiter: dialect.delimiter,
            quote: dialect.quote.char(),
            escape: dialect.escape,
            record_delimiter: dialect.record_delimiter,
            comment: dialect.comment.clone().filter(|m| !m.is_empty()),
            pending_skip: dialect.skip_rows,
            cancel: CancelToken::new(),
            done: false,
        }
    }

    /// Rewind the reader and tokenize the whole stream. The reader's replay
    /// history is released, so it cannot be rewound afterwards.
    pub fn from_start(reader: &'r mut CharReader<'a>, dialect: &Dialect) -> Result<Self> {
        reader.to_beginning()?;
        reader.release_history();
        Ok(Self::new(reader, dialect))
    }

    /// Stop with [`SnifferError::Cancelled`] once `cancel` fires.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Line the reader is on.
    pub fn line(&self) -> usize {
        self.reader.line()
    }

    /// Read the next record, or `None` at end of stream.
    pub fn read_record(&mut self) -> Result<Option<Record>> {
        self.read_record_with(&mut |_: char| {})
    }

    /// Read the next record, passing every character consumed for it to
    /// `observer`. Skipped rows and comment lines are not observed.
    pub fn read_record_with<F: FnMut(char)>(&mut self, observer: &mut F) -> Result<Option<Record>> {
        while self.pending_skip > 0 {
            self.check_cancel()?;
            self.pending_skip -= 1;
            if self.read_raw(&mut |_: char| {}, false)?.is_none() {
                return Ok(None);
            }
        }
        self.read_raw(observer, true)
    }

    fn check_cancel(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(SnifferError::Cancelled);
        }
        Ok(())
    }

    fn read_raw<F: FnMut(char)>(
        &mut self,
        observer: &mut F,
        skip_comments: bool,
    ) -> Result<Option<Record>> {
        let has_marker = skip_comments && self.comment.is_some();
        loop {
            self.check_cancel()?;
            if self.reader.end_of_stream()? {
                return Ok(None);
            }

            // The first field decides whether the line is a comment, so its
            // characters are held back until then.
            let mut held = Vec::new();
            let first = if has_marker {
                self.read_field(&mut |c: char| held.push(c))?
            } else {
                self.read_field(observer)?
            };

            let is_comment = has_marker
                && !first.quoted
                && self
                    .comment
                    .as_deref()
                    .is_some_and(|marker| first.text.starts_with(marker));
            if is_comment {
                if !first.ends_record {
                    self.skip_line()?;
                }
                continue;
            }
            for c in held {
                observer(c);
            }

            if first.ends_record && first.text.is_empty() && !first.quoted {
                return Ok(Some(Vec::new()));
            }

            let mut ends_record = first.ends_record;
            let mut record = vec![first.text];
            while !ends_record {
                let field = self.read_field(observer)?;
                ends_record = field.ends_record;
                record.push(field.text);
            }
            return Ok(Some(record));
        }
    }

    fn read_field<F: FnMut(char)>(&mut self, observer: &mut F) -> Result<Field> {
        let mut text = String::new();
        let mut state = FieldState::PreData;
        let mut quoted = false;
        let mut escaped = false;

        loop {
            let Some(c) = self.reader.read()? else {
                return Ok(Field {
                    text,
                    quoted,
                    ends_record: true,
                });
            };
            observer(c);

            if escaped {
                // The prefix never survives in front of structural characters.
                if Some(c) == self.quote || c == self.delimiter || Some(c) == self.escape {
                    text.pop();
                }
                text.push(c);
                escaped = false;
                continue;
            }
            if Some(c) == self.escape {
                text.push(c);
                escaped = true;
                if state == FieldState::PreData {
                    state = FieldState::Unquoted;
                }
                continue;
            }

            match state {
                FieldState::PreData => {
                    if c == ' ' || (c == '\t' && self.delimiter != '\t') {
                        text.push(c);
                    } else if Some(c) == self.quote {
                        text.clear();
                        quoted = true;
                        state = FieldState::Quoted;
                    } else if c == self.delimiter {
                        return Ok(Field {
                            text,
                            quoted,
                            ends_record: false,
                        });
                    } else if self.end_of_record(c, observer)? {
                        return Ok(Field {
                            text,
                            quoted,
                            ends_record: true,
                        });
                    } else {
                        text.push(c);
                        state = FieldState::Unquoted;
                    }
                }
                FieldState::Quoted => {
                    if Some(c) == self.quote {
                        if self.reader.peek()? == self.quote {
                            self.reader.move_next()?;
                            observer(c);
                            text.push(c);
                        } else {
                            state = FieldState::PostData;
                        }
                    } else {
                        text.push(c);
                    }
                }
                FieldState::Unquoted | FieldState::PostData => {
                    if c == self.delimiter {
                        return Ok(Field {
                            text,
                            quoted,
                            ends_record: false,
                        });
                    }
                    if self.end_of_record(c, observer)? {
                        return Ok(Field {
                            text,
                            quoted,
                            ends_record: true,
                        });
                    }
                    text.push(c);
                }
            }
        }
    }

    /// Returns true when `c` terminates a record, consuming the second half
    /// of a CRLF (or, for `LfCr` files, LFCR) pair.
    fn end_of_record<F: FnMut(char)>(&mut self, c: char, observer: &mut F) -> Result<bool> {
        if let Some(separator) = self.record_delimiter.separator() {
            return Ok(c == separator);
        }
        match c {
            '\r' => {
                if self.reader.peek()? == Some('\n') {
                    self.reader.move_next()?;
                    observer('\n');
                }
                Ok(true)
            }
            '\n' => {
                if self.record_delimiter == RecordDelimiter::LfCr
                    && self.reader.peek()? == Some('\r')
                {
                    self.reader.move_next()?;
                    observer('\r');
                }
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Discard the rest of a physical line.
    fn skip_line(&mut self) -> Result<()> {
        while let Some(c) = self.reader.read()? {
            if self.end_of_record(c, &mut |_: char| {})? {
                break;
            }
        }
        Ok(())
    }
}

impl Iterator for Tokenizer<'_, '_> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.read_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
