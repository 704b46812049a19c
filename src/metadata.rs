use std::fmt;

/// Result of a full detection pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Metadata {
    /// The detected dialect.
    pub dialect: Dialect,
    /// An escape prefix was seen directly in front of a qualifier.
    pub escaped_qualifier: bool,
    /// Doubled qualifiers were seen inside field content.
    pub duplicate_qualifier: bool,
}

impl Metadata {
    /// Create a new Metadata instance.
    pub const fn new(dialect: Dialect, escaped_qualifier: bool, duplicate_qualifier: bool) -> Self {
        Self {
            dialect,
            escaped_qualifier,
            duplicate_qualifier,
        }
    }
}

/// Delimited-text dialect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dialect {
    /// Field delimiter character.
    pub delimiter: char,
    /// Quote character configuration.
    pub quote: Quote,
    /// Escape prefix, if any.
    pub escape: Option<char>,
    /// Record terminator style.
    pub record_delimiter: RecordDelimiter,
    /// Comment-line marker, if any.
    pub comment: Option<String>,
    /// Number of records to skip before data begins.
    pub skip_rows: usize,
}

impl Default for Dialect {
    fn default() -> Self {
        Self {
            delimiter: ',',
            quote: Quote::Some('"'),
            escape: None,
            record_delimiter: RecordDelimiter::Lf,
            comment: None,
            skip_rows: 0,
        }
    }
}

impl Dialect {
    /// Create a new Dialect with the given parameters.
    pub const fn new(
        delimiter: char,
        quote: Quote,
        escape: Option<char>,
        record_delimiter: RecordDelimiter,
        comment: Option<String>,
        skip_rows: usize,
    ) -> Self {
        Self {
            delimiter,
            quote,
            escape,
            record_delimiter,
            comment,
            skip_rows,
        }
    }

    /// Dialect with the given delimiter and everything else defaulted.
    pub fn with_delimiter(delimiter: char) -> Self {
        Self {
            delimiter,
            ..Self::default()
        }
    }
}

/// Quote character configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quote {
    /// No quoting.
    None,
    /// Quote with the specified character.
    Some(char),
}

impl Default for Quote {
    fn default() -> Self {
        Quote::Some('"')
    }
}

impl Quote {
    /// Returns the quote character if set.
    pub fn char(&self) -> Option<char> {
        match self {
            Quote::None => None,
            Quote::Some(c) => Some(*c),
        }
    }
}

impl fmt::Display for Quote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quote::None => write!(f, "none"),
            Quote::Some(c) => write!(f, "{c}"),
        }
    }
}

/// Record terminator styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RecordDelimiter {
    /// Unix-style line ending (\n).
    #[default]
    Lf,
    /// Old Mac-style line ending (\r).
    Cr,
    /// Windows-style line ending (\r\n).
    CrLf,
    /// Reversed pair (\n\r).
    LfCr,
    /// ASCII record separator (0x1E).
    RecordSeparator,
    /// ASCII unit separator (0x1F).
    UnitSeparator,
    /// No record terminator was observed.
    None,
}

impl RecordDelimiter {
    /// Returns the character sequence for this terminator.
    pub const fn as_str(&self) -> &'static str {
        match self {
            RecordDelimiter::Lf => "\n",
            RecordDelimiter::Cr => "\r",
            RecordDelimiter::CrLf => "\r\n",
            RecordDelimiter::LfCr => "\n\r",
            RecordDelimiter::RecordSeparator => "\u{1e}",
            RecordDelimiter::UnitSeparator => "\u{1f}",
            RecordDelimiter::None => "",
        }
    }

    /// Control character that alone ends a record, for the separator styles.
    pub const fn separator(&self) -> Option<char> {
        match self {
            RecordDelimiter::RecordSeparator => Some('\u{1e}'),
            RecordDelimiter::UnitSeparator => Some('\u{1f}'),
            _ => None,
        }
    }
}

impl fmt::Display for RecordDelimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecordDelimiter::Lf => "LF",
            RecordDelimiter::Cr => "CR",
            RecordDelimiter::CrLf => "CRLF",
            RecordDelimiter::LfCr => "LFCR",
            RecordDelimiter::RecordSeparator => "RS",
            RecordDelimiter::UnitSeparator => "US",
            RecordDelimiter::None => "none",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_char() {
        assert_eq!(Quote::Some('\'').char(), Some('\''));
        assert_eq!(Quote::None.char(), None);
        assert_eq!(Quote::None.to_string(), "none");
    }

    #[test]
    fn test_record_delimiter_separator() {
        assert_eq!(RecordDelimiter::RecordSeparator.separator(), Some('\u{1e}'));
        assert_eq!(RecordDelimiter::CrLf.separator(), None);
        assert_eq!(RecordDelimiter::LfCr.as_str(), "\n\r");
        assert_eq!(RecordDelimiter::CrLf.to_string(), "CRLF");
    }
}
