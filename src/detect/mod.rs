//! Dialect detectors.
//!
//! Each detector borrows the reader for the duration of one bounded scan,
//! wrapped in its own [`Sampler`](crate::sampler::Sampler), and returns a
//! neutral result when the input is ambiguous.

pub mod comment;
pub mod delimiter;
pub mod escape;
pub mod qualifier;
pub mod record_delimiter;
pub mod start_row;
