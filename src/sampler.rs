//! One-pass wraparound sampling over a [`CharReader`].
//!
//! A detector may start scanning in the middle of a stream (after skipped
//! rows). The sampler lets it read to the end, wrap to the beginning exactly
//! once and stop when it reaches its starting line again, so every line is
//! seen once per pass.

use crate::error::Result;
use crate::reader::CharReader;

/// Exclusive borrow of a reader for the duration of one bounded scan.
#[derive(Debug)]
pub struct Sampler<'r, 'a> {
    reader: &'r mut CharReader<'a>,
    start_line: usize,
    wrapped: bool,
}

impl<'r, 'a> Sampler<'r, 'a> {
    /// Start sampling at the reader's current position.
    pub fn new(reader: &'r mut CharReader<'a>) -> Self {
        let start_line = reader.line();
        Self {
            reader,
            start_line,
            wrapped: false,
        }
    }

    /// Rewind the reader and start sampling at its true beginning.
    pub fn from_beginning(reader: &'r mut CharReader<'a>) -> Result<Self> {
        reader.to_beginning()?;
        Ok(Self::new(reader))
    }

    /// The sampled reader.
    #[inline]
    pub fn reader(&mut self) -> &mut CharReader<'a> {
        self.reader
    }

    /// Line the scan started on.
    pub fn start_line(&self) -> usize {
        self.start_line
    }

    /// Wrap to the beginning of the stream if the scan started past it and
    /// has not wrapped yet. Returns false when no wrap happened.
    pub fn can_start_from_beginning(&mut self) -> Result<bool> {
        if self.wrapped || self.start_line <= 1 {
            return Ok(false);
        }
        self.wrapped = true;
        self.reader.to_beginning()?;
        Ok(true)
    }

    /// True once every line has been visited exactly once.
    pub fn all_read(&mut self) -> Result<bool> {
        if self.wrapped && self.reader.line() >= self.start_line {
            return Ok(true);
        }
        let can_wrap = !self.wrapped && self.start_line > 1;
        Ok(!can_wrap && self.reader.end_of_stream()?)
    }

    /// Next character of the pass, wrapping once at end of stream.
    pub fn read(&mut self) -> Result<Option<char>> {
        if self.all_read()? {
            return Ok(None);
        }
        match self.reader.read()? {
            Some(c) => Ok(Some(c)),
            None if self.can_start_from_beginning()? && !self.all_read()? => self.reader.read(),
            None => Ok(None),
        }
    }

    /// Next physical line of the pass, wrapping once at end of stream.
    pub fn read_line(&mut self) -> Result<Option<String>> {
        if self.all_read()? {
            return Ok(None);
        }
        match self.reader.read_line()? {
            Some(line) => Ok(Some(line)),
            None if self.can_start_from_beginning()? && !self.all_read()? => {
                self.reader.read_line()
            }
            None => Ok(None),
        }
    }
}
