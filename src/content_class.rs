//! Coarse content classes of field values.
//!
//! Classes are flags, not exclusive types: `"2020.01.01"` is both
//! `DECIMAL`-punctuated and `DATE`-punctuated, `"ab"` is `WORD`, `SHORT` and
//! `VERY_SHORT`. Columns are compared by intersecting flag sets.

use bitflags::bitflags;
use regex::Regex;
use std::sync::LazyLock;

/// Fields up to this many characters are `SHORT`.
const SHORT_LEN: usize = 10;

/// Fields up to this many characters are `VERY_SHORT`.
const VERY_SHORT_LEN: usize = 3;

static NUMERIC_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-+]?\d+$").expect("Invalid numeric pattern"));

static DECIMAL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-+]?(?:\d+[.,])+\d+$").expect("Invalid decimal pattern"));

static DATE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{1,4}[-/.]\d{1,2}[-/.]\d{1,4}(?:[T ]\d{1,2}:\d{2}(?::\d{2})?)?$")
        .expect("Invalid date pattern")
});

static WORD_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\p{L}[\p{L}\p{M}\s.'&-]*$").expect("Invalid word pattern")
});

bitflags! {
    /// Set of content classes a field value belongs to.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ContentClass: u8 {
        /// Empty or whitespace only.
        const EMPTY = 1;
        /// Whole number.
        const NUMERIC = 1 << 1;
        /// Digits separated by `.` or `,`.
        const DECIMAL = 1 << 2;
        /// Digits separated like a date, optionally followed by a time.
        const DATE = 1 << 3;
        /// Letters, without digits.
        const WORD = 1 << 4;
        /// At most ten characters.
        const SHORT = 1 << 5;
        /// At most three characters.
        const VERY_SHORT = 1 << 6;
    }
}

impl ContentClass {
    /// Classify a field value.
    pub fn of(field: &str) -> Self {
        let value = field.trim();
        if value.is_empty() {
            return ContentClass::EMPTY;
        }

        let mut class = ContentClass::empty();
        if NUMERIC_PATTERN.is_match(value) {
            class |= ContentClass::NUMERIC;
        }
        if DECIMAL_PATTERN.is_match(value) {
            class |= ContentClass::DECIMAL;
        }
        if DATE_PATTERN.is_match(value) {
            class |= ContentClass::DATE;
        }
        if WORD_PATTERN.is_match(value) {
            class |= ContentClass::WORD;
        }

        let len = value.chars().count();
        if len <= SHORT_LEN {
            class |= ContentClass::SHORT;
        }
        if len <= VERY_SHORT_LEN {
            class |= ContentClass::VERY_SHORT;
        }
        class
    }

    /// Classes shared by every non-empty value in `classes`. Returns `EMPTY`
    /// when all values are empty and no classes when there are no values.
    pub fn consistent<I: IntoIterator<Item = ContentClass>>(classes: I) -> Self {
        let mut seen_any = false;
        let mut shared: Option<ContentClass> = None;
        for class in classes {
            seen_any = true;
            if class == ContentClass::EMPTY {
                continue;
            }
            shared = Some(shared.map_or(class, |s| s & class));
        }
        match shared {
            Some(s) => s,
            None if seen_any => ContentClass::EMPTY,
            None => ContentClass::empty(),
        }
    }
}
