//! Repair of rows that split into too many fields.
//!
//! Typical cause: an unquoted delimiter inside a value (`Acme, Inc`). The
//! realigner keeps a bounded random sample of well-formed rows, learns which
//! content classes each column consistently shows, and merges a field into
//! its left neighbour when it does not fit the column it landed in.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::warn;

use crate::content_class::ContentClass;
use crate::tokenizer::Record;

/// Number of well-formed rows kept as the column reference.
pub const RESERVOIR_CAPACITY: usize = 30;

/// A column-level warning raised while realigning a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnWarning {
    /// Zero-based column of the field that was merged away.
    pub column: usize,
    pub message: String,
}

/// A processed row and the warnings raised for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Realigned {
    pub fields: Record,
    pub warnings: Vec<ColumnWarning>,
}

/// Reservoir of well-formed rows and the merge heuristic that uses it.
#[derive(Debug)]
pub struct RowRealigner {
    expected: usize,
    reservoir: Vec<Vec<ContentClass>>,
    seen: usize,
    rng: StdRng,
}

impl RowRealigner {
    /// Realigner for rows of `expected` fields.
    pub fn new(expected: usize) -> Self {
        Self::with_rng(expected, StdRng::from_os_rng())
    }

    /// Realigner with a deterministic reservoir.
    pub fn with_seed(expected: usize, seed: u64) -> Self {
        Self::with_rng(expected, StdRng::seed_from_u64(seed))
    }

    fn with_rng(expected: usize, rng: StdRng) -> Self {
        Self {
            expected,
            reservoir: Vec::with_capacity(RESERVOIR_CAPACITY),
            seen: 0,
            rng,
        }
    }

    /// Expected number of fields per row.
    pub fn expected(&self) -> usize {
        self.expected
    }

    /// Number of rows currently in the reservoir.
    pub fn reservoir_len(&self) -> usize {
        self.reservoir.len()
    }

    /// Offer a well-formed row to the reservoir. Once full, the row replaces a
    /// uniformly random slot with probability `capacity / rows seen`.
    pub fn accept(&mut self, row: &[String]) {
        self.seen += 1;
        let classes: Vec<ContentClass> = row.iter().map(|f| ContentClass::of(f)).collect();
        if self.reservoir.len() < RESERVOIR_CAPACITY {
            self.reservoir.push(classes);
            return;
        }
        let slot = self.rng.random_range(0..self.seen);
        if slot < RESERVOIR_CAPACITY {
            self.reservoir[slot] = classes;
        }
    }

    /// Classes each column consistently showed across the reservoir.
    pub fn expected_classes(&self) -> Vec<ContentClass> {
        (0..self.expected)
            .map(|column| {
                ContentClass::consistent(
                    self.reservoir
                        .iter()
                        .filter_map(|row| row.get(column).copied()),
                )
            })
            .collect()
    }

    /// Accept well-formed rows, realign rows that are too wide and pass
    /// everything else through.
    pub fn process(&mut self, row: Record) -> Realigned {
        if row.len() == self.expected {
            self.accept(&row);
        }
        if row.len() > self.expected {
            return self.realign(row);
        }
        Realigned {
            fields: row,
            warnings: Vec::new(),
        }
    }

    /// Merge misfit fields leftwards until the row has the expected width or
    /// no field is out of place.
    pub fn realign(&self, row: Record) -> Realigned {
        let expected = self.expected_classes();
        let mut fields = row;
        let mut warnings = Vec::new();
        let mut column = 1;

        while fields.len() > self.expected && column < fields.len() {
            let actual = ContentClass::of(&fields[column]);
            // Columns past the expected width have no place in the row.
            let fits = match expected.get(column) {
                None => false,
                // Nothing known about this column or the previous one.
                Some(classes) if classes.is_empty() && actual.is_empty() => expected
                    .get(column - 1)
                    .is_some_and(|previous| !previous.is_empty()),
                Some(&classes) => actual.contains(classes),
            };
            if fits {
                column += 1;
                continue;
            }

            let merged = fields.remove(column);
            let target = &mut fields[column - 1];
            target.push(' ');
            target.push_str(&merged);

            let message = format!(
                "field {column} does not match its column and was merged into field {}",
                column - 1
            );
            warn!(column, %message, "realigned row");
            warnings.push(ColumnWarning { column, message });
        }

        Realigned { fields, warnings }
    }
}
