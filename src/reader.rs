//! Rewindable, peekable character source.
//!
//! Every detector and the tokenizer read through a [`CharReader`]. In-memory
//! text is natively seekable; streams are made rewindable by recording every
//! decoded character since the true start of the stream and replaying it.

use std::borrow::Cow;
use std::fmt;
use std::io::{self, BufRead};

use crate::error::{Result, SnifferError};

/// Once history has been released, consumed characters are compacted away in
/// chunks of this size.
const COMPACT_THRESHOLD: usize = 4096;

enum Source<'a> {
    /// Natively seekable text; `offset` is a byte offset into `text`.
    Text { text: Cow<'a, str>, offset: usize },
    /// Forward-only byte stream decoded as UTF-8. `pending` holds the bytes of
    /// a sequence split across two reads.
    Stream {
        inner: Box<dyn BufRead + 'a>,
        pending: Vec<u8>,
    },
}

/// Buffered character reader with one-character lookahead, a line counter
/// and the ability to restart from the logical beginning.
pub struct CharReader<'a> {
    source: Source<'a>,
    /// Characters decoded from a stream. Index `cursor` is the next to read.
    buffer: Vec<char>,
    cursor: usize,
    /// Number of characters dropped from the front of `buffer`.
    released: usize,
    /// Set once the replay history is given up; the stream can no longer be
    /// rewound.
    forgetful: bool,
    history_limit: Option<usize>,
    line: usize,
    prev: Option<char>,
}

impl<'a> CharReader<'a> {
    /// Reader over in-memory text.
    pub fn from_text<T: Into<Cow<'a, str>>>(text: T) -> Self {
        Self::with_source(Source::Text {
            text: text.into(),
            offset: 0,
        })
    }

    /// Reader over a UTF-8 byte stream that need not be seekable.
    pub fn from_reader<R: BufRead + 'a>(reader: R) -> Self {
        Self::with_source(Source::Stream {
            inner: Box::new(reader),
            pending: Vec::new(),
        })
    }

    fn with_source(source: Source<'a>) -> Self {
        Self {
            source,
            buffer: Vec::new(),
            cursor: 0,
            released: 0,
            forgetful: false,
            history_limit: None,
            line: 1,
            prev: None,
        }
    }

    /// Cap the replay history kept for streams. Once more than `limit`
    /// characters have been consumed the history is dropped and
    /// [`to_beginning`](Self::to_beginning) starts failing.
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = Some(limit);
        self
    }

    /// Current 1-based line number.
    #[inline]
    pub fn line(&self) -> usize {
        self.line
    }

    /// Returns true while a call to [`to_beginning`](Self::to_beginning) would succeed.
    pub fn is_rewindable(&self) -> bool {
        match self.source {
            Source::Text { .. } => true,
            Source::Stream { .. } => !self.forgetful,
        }
    }

    /// Look at the next character without consuming it.
    pub fn peek(&mut self) -> Result<Option<char>> {
        match &self.source {
            Source::Text { text, offset } => Ok(text[*offset..].chars().next()),
            Source::Stream { .. } => {
                if self.cursor >= self.buffer.len() && !self.fill()? {
                    return Ok(None);
                }
                Ok(self.buffer.get(self.cursor).copied())
            }
        }
    }

    /// Consume and return the next character.
    pub fn read(&mut self) -> Result<Option<char>> {
        let next = self.peek()?;
        if let Some(c) = next {
            self.advance(c);
        }
        Ok(next)
    }

    /// Consume the next character without returning it. Used to swallow the
    /// second half of a CR/LF pair or a doubled qualifier.
    pub fn move_next(&mut self) -> Result<()> {
        self.read().map(|_| ())
    }

    /// Returns true when no characters remain.
    pub fn end_of_stream(&mut self) -> Result<bool> {
        Ok(self.peek()?.is_none())
    }

    /// Restart from the logical beginning of the source and reset the line
    /// counter to 1.
    pub fn to_beginning(&mut self) -> Result<()> {
        match &mut self.source {
            Source::Text { offset, .. } => *offset = 0,
            Source::Stream { .. } => {
                if self.forgetful {
                    return Err(SnifferError::RewindUnavailable {
                        discarded: self.released,
                    });
                }
                self.cursor = 0;
            }
        }
        self.line = 1;
        self.prev = None;
        Ok(())
    }

    /// Drop the replay history of a stream. Called before a full forward pass
    /// so memory stays bounded; afterwards the reader cannot be rewound.
    pub fn release_history(&mut self) {
        if !matches!(self.source, Source::Stream { .. }) {
            return;
        }
        self.forgetful = true;
        if self.cursor > 0 {
            self.buffer.drain(..self.cursor);
            self.released += self.cursor;
            self.cursor = 0;
        }
    }

    /// Read one physical line without its terminator. CR, LF and CRLF each
    /// end a line.
    pub fn read_line(&mut self) -> Result<Option<String>> {
        let Some(mut c) = self.read()? else {
            return Ok(None);
        };
        let mut line = String::new();
        loop {
            match c {
                '\r' => {
                    if self.peek()? == Some('\n') {
                        self.move_next()?;
                    }
                    break;
                }
                '\n' => break,
                other => line.push(other),
            }
            match self.read()? {
                Some(next) => c = next,
                None => break,
            }
        }
        Ok(Some(line))
    }

    fn advance(&mut self, c: char) {
        match &mut self.source {
            Source::Text { offset, .. } => *offset += c.len_utf8(),
            Source::Stream { .. } => {
                self.cursor += 1;
                if self.forgetful {
                    if self.cursor >= COMPACT_THRESHOLD {
                        self.release_history();
                    }
                } else if self.history_limit.is_some_and(|limit| self.cursor > limit) {
                    self.release_history();
                }
            }
        }

        // CR, LF and CRLF each count as one line break.
        match c {
            '\r' => self.line += 1,
            '\n' if self.prev != Some('\r') => self.line += 1,
            _ => {}
        }
        self.prev = Some(c);
    }

    /// Decode more characters from the stream. Returns false at end of stream.
    fn fill(&mut self) -> Result<bool> {
        let Source::Stream { inner, pending } = &mut self.source else {
            return Ok(false);
        };
        let before = self.buffer.len();
        while self.buffer.len() == before {
            let chunk = inner.fill_buf()?;
            if chunk.is_empty() {
                if !pending.is_empty() {
                    return Err(invalid_data("stream ends inside a UTF-8 sequence").into());
                }
                return Ok(false);
            }
            let len = chunk.len();
            pending.extend_from_slice(chunk);
            inner.consume(len);

            let valid = match simdutf8::compat::from_utf8(pending) {
                Ok(_) => pending.len(),
                Err(e) if e.error_len().is_none() => e.valid_up_to(),
                Err(_) => return Err(invalid_data("stream is not valid UTF-8").into()),
            };
            let text = std::str::from_utf8(&pending[..valid])
                .map_err(|_| invalid_data("stream is not valid UTF-8"))?;
            self.buffer.extend(text.chars());
            pending.drain(..valid);
        }
        Ok(true)
    }
}

fn invalid_data(message: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message.to_string())
}

impl fmt::Debug for CharReader<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.source {
            Source::Text { .. } => "text",
            Source::Stream { .. } => "stream",
        };
        f.debug_struct("CharReader")
            .field("source", &kind)
            .field("line", &self.line)
            .field("buffered", &self.buffer.len())
            .field("released", &self.released)
            .field("rewindable", &self.is_rewindable())
            .finish()
    }
}
