//! csv-sleuth: delimited-text dialect inference and tokenization
//!
//! Infers the dialect of a "probably delimited" character stream by sampling
//! it with bounded, restartable scans, then tokenizes the stream into records
//! according to the inferred (or forced) dialect.
//!
//! # Quick Start
//!
//! ```
//! use csv_sleuth::{CharReader, Sniffer, Tokenizer};
//!
//! let data = "Export of 2024-01-05\nid,name\n1,\"Smith, J\"\n2,Jones\n3,Brown\n4,White\n";
//! let mut reader = CharReader::from_text(data);
//!
//! let metadata = Sniffer::new().sniff(&mut reader).unwrap();
//! assert_eq!(metadata.dialect.delimiter, ',');
//! assert_eq!(metadata.dialect.skip_rows, 1);
//!
//! let records: Vec<_> = Tokenizer::from_start(&mut reader, &metadata.dialect)
//!     .unwrap()
//!     .collect::<Result<_, _>>()
//!     .unwrap();
//! assert_eq!(records[0], vec!["id", "name"]);
//! assert_eq!(records[1], vec!["1", "Smith, J"]);
//! ```
//!
//! # Detectors
//!
//! Each detector in [`detect`] borrows the reader for one bounded scan. They
//! can be run individually when only part of the dialect is unknown:
//!
//! ```
//! use csv_sleuth::detect::record_delimiter::detect_record_delimiter;
//! use csv_sleuth::{CancelToken, CharReader, RecordDelimiter, SampleLimits};
//!
//! let mut reader = CharReader::from_text("a,b\r\nc,d\r\n");
//! let style = detect_record_delimiter(
//!     &mut reader,
//!     Some('"'),
//!     &SampleLimits::default(),
//!     &CancelToken::new(),
//! )
//! .unwrap();
//! assert_eq!(style, RecordDelimiter::CrLf);
//! ```

mod content_class;
pub mod detect;
mod encoding;
mod error;
mod metadata;
mod reader;
mod realign;
mod sample;
mod sampler;
mod sniffer;
mod tokenizer;

pub use content_class::ContentClass;
pub use encoding::{SourceEncoding, decode, decode_with_encoding, is_utf8, skip_bom};
pub use error::{Result, SnifferError};
pub use metadata::{Dialect, Metadata, Quote, RecordDelimiter};
pub use reader::CharReader;
pub use realign::{ColumnWarning, RESERVOIR_CAPACITY, Realigned, RowRealigner};
pub use sample::{CancelToken, SampleLimits};
pub use sampler::Sampler;
pub use sniffer::Sniffer;
pub use tokenizer::{Record, Tokenizer};
