#![warn(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::panic)]
#![deny(clippy::unwrap_used)]
//! Implements a binary range coder in Rust.
//!
//! The coder compresses symbols drawn from any caller-supplied cumulative
//! frequency distribution into a byte stream of near-entropy length and
//! reverses the process exactly. Its main features are:
//!
//! * Accumulator widths from 1 to 32 bits
//! * Denominators up to `2^(precision_bits - 1) + 1`
//! * Carry propagation in O(1) regardless of how many settled 1-bits it flips
//! * Byte-aligned streams with the shortest possible termination
//! * Pull-based streaming in both directions, without any I/O
//!
//! The engine lives in [`RangeEncoder`] and [`RangeDecoder`]. The functions
//! [`encode_stream`] and [`decode_stream`] drive them over a sequence of
//! symbols that all use one [`CumulativeTable`].
//!
//! ```
//! use range_coder::{decode_stream, encode_stream, CoderConfiguration, CumulativeTable, Symbols, SymbolWidth};
//!
//! # fn main() -> Result<(), range_coder::CoderError> {
//! let configuration = CoderConfiguration::default();
//! let table = CumulativeTable::new(&[0, 1, 2])?;
//!
//! let stream = encode_stream(&configuration, &[0_u8, 1, 0, 1], &table)?;
//! let symbols = decode_stream(&configuration, &stream, 4, SymbolWidth::Narrow, &table)?;
//! assert_eq!(symbols, Symbols::Narrow(vec![0, 1, 0, 1]));
//! # Ok(())
//! # }
//! ```
//!
//! A coder state belongs to exactly one stream. It's not meant to be shared
//! between threads and must be reset before it codes another stream.
pub use error::*;
pub use range_coder::{
    CoderConfiguration, Decoded, Mode, Output, RangeCoder, RangeDecoder, RangeEncoder, Tell,
    DEFAULT_PRECISION_BITS, DEFAULT_READY_THRESHOLD, MAX_PRECISION_BITS, MAX_READY_THRESHOLD,
    MIN_READY_THRESHOLD,
};
pub use symbol_stream::*;

mod error;
pub(crate) mod math;
pub mod range_coder;
mod symbol_stream;
