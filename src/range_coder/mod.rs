//! Implements the range coder.
//!
//! This is a binary arithmetic coder in the tradition of [Pas76] and [Mar79].
//! The current interval `[low, low + range)` lives in a fixed-point accumulator
//! of `precision_bits` bits. Every coded symbol narrows the interval to the
//! symbol's share of a cumulative-frequency table. Whenever the range falls to
//! half of the accumulator, its top bit is settled and the interval is doubled.
//!
//! Narrowing can push `low` past the top of the accumulator, which adds one to
//! the bits that were already settled. Those carries may ripple through
//! arbitrarily long runs of 1-bits, so the settled bits are kept in a
//! run-length compressed queue where a carry costs O(1) regardless of the run
//! length. Bytes only leave the queue once enough runs follow them that no
//! carry can reach them anymore.
//!
//! End of stream is handled by writing out the smallest number of bits that
//! ensures that the stream will be correctly decoded if it's followed by an
//! infinite run of 1-bits, padded with 1-bits to a whole byte. The decoder
//! appends exactly that run once its input is exhausted.
//!
//! Both sides talk to their caller through pull-based signals: the encoder
//! answers [`Output::NotReady`] while no byte is safe to emit, the decoder
//! answers [`Decoded::NeedMoreInput`] until it got enough input bits.
//!
//! There is no integrity check. Decoding bytes that weren't produced by the
//! encoder with the same table and precision yields some symbol sequence
//! without any error.
//!
//! * Pas76: "Source coding algorithms for fast data compression"
//!          by Richard Clark Pasco (1976).
//!
//! * Mar79: "Range encoding: an algorithm for removing redundancy from a digitised message"
//!          by Martin, G.N.N. (1979)
//!
//! * MNW98: "Arithmetic Coding Revisited"
//!          by Alistair Moffat and Radford Neal and Ian H. Witten (1998).
pub use decoder::RangeDecoder;
pub use encoder::RangeEncoder;

use crate::error::CoderError;
use crate::math::Log;

mod decoder;
mod encoder;
mod queue;

/// Number of slots of the bit queues. Must be a power of two.
pub(crate) const QUEUE_CAPACITY: usize = 128;
/// The default width of the accumulator.
pub const DEFAULT_PRECISION_BITS: u32 = 32;
/// The widest supported accumulator.
pub const MAX_PRECISION_BITS: u32 = 32;
/// Runs the encoder has to hold back before it releases a byte.
pub const DEFAULT_READY_THRESHOLD: usize = 10;
/// Popping a byte may consume up to 8 runs. At least two more runs (and
/// therefore at least one 0-run) have to remain to absorb any later carry.
pub const MIN_READY_THRESHOLD: usize = 10;
/// Above this the encoder would refuse new symbols before a byte is ready.
pub const MAX_READY_THRESHOLD: usize = QUEUE_CAPACITY / 2;

const _: () = assert!(QUEUE_CAPACITY & (QUEUE_CAPACITY - 1) == 0);

/// Configures a coder on creation.
///
/// The encoder and the decoder of a stream must use the same `precision_bits`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CoderConfiguration {
    /// Width of the fixed-point accumulator, in `1..=32`. Default: 32.
    ///
    /// Cumulative-frequency tables may have a denominator of at most
    /// `2^(precision_bits - 1) + 1`.
    pub precision_bits: u32,
    /// Number of settled bit runs the encoder holds back from `get_byte()`,
    /// in `10..=64`. Default: 10.
    pub ready_threshold: usize,
}

impl Default for CoderConfiguration {
    fn default() -> Self {
        Self {
            precision_bits: DEFAULT_PRECISION_BITS,
            ready_threshold: DEFAULT_READY_THRESHOLD,
        }
    }
}

impl CoderConfiguration {
    pub(crate) fn validate(&self) -> Result<(), CoderError> {
        if self.precision_bits == 0 || self.precision_bits > MAX_PRECISION_BITS {
            return Err(CoderError::BadArguments(
                "precision bits must be between 1 and 32",
            ));
        }
        if self.ready_threshold < MIN_READY_THRESHOLD || self.ready_threshold > MAX_READY_THRESHOLD
        {
            return Err(CoderError::BadArguments(
                "ready threshold must be between 10 and 64",
            ));
        }

        Ok(())
    }
}

/// Derived constants of an accumulator width.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct Precision {
    pub(crate) bits: u32,
    pub(crate) norm: u64,
    pub(crate) half: u64,
}

impl Precision {
    pub(crate) fn new(bits: u32) -> Self {
        let norm = 1_u64 << bits;
        Self {
            bits,
            norm,
            half: norm >> 1,
        }
    }

    /// The largest denominator an interval may use.
    #[inline(always)]
    pub(crate) fn max_denominator(&self) -> u64 {
        self.half + 1
    }

    pub(crate) fn check_denominator(&self, den: u32) -> Result<(), CoderError> {
        if den == 0 {
            return Err(CoderError::BadArguments("denominator must not be zero"));
        }
        if u64::from(den) > self.max_denominator() {
            return Err(CoderError::BadArguments(
                "denominator exceeds the precision of the coder",
            ));
        }

        Ok(())
    }

    pub(crate) fn check_interval(&self, low: u32, high: u32, den: u32) -> Result<(), CoderError> {
        self.check_denominator(den)?;
        if low >= high || high > den {
            return Err(CoderError::BadArguments(
                "interval must satisfy low < high <= denominator",
            ));
        }

        Ok(())
    }

    /// Returns the offset and the width of `[low, high) / den` within `range`.
    #[inline(always)]
    pub(crate) fn scale(range: u64, low: u32, high: u32, den: u32) -> (u64, u64) {
        let den = u64::from(den);
        let offset = range * u64::from(low) / den;
        let width = range * u64::from(high) / den - offset;
        (offset, width)
    }
}

/// Result of asking the encoder for the next output byte.
#[must_use]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Output {
    /// The next byte of the stream.
    Byte(u8),
    /// No byte is safe to emit yet. Encode more symbols or call `finish()`.
    NotReady,
}

/// Result of asking the decoder for the next code.
#[must_use]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Decoded {
    /// A value in `[0, denominator)` that falls into the interval of the coded symbol.
    Code(u32),
    /// More input is needed. Call `add_byte()` or `finish()` and retry.
    NeedMoreInput,
}

/// Provides common functionality for the range encoder and decoder.
pub trait Tell {
    /// Must return the total number of whole bits the accumulator has moved by.
    fn bits_total(&self) -> u64;
    /// Must return the width of the current interval.
    fn range(&self) -> u64;

    /// Returns the number of bits "used" by the encoded or decoded symbols so far.
    ///
    /// The encoder and the decoder report the same value after the same symbol.
    ///
    /// This will always be slightly larger than the exact value (e.g., all
    /// rounding error is in the positive direction).
    fn tell(&self) -> u64 {
        self.bits_total() - u64::from(self.range().floor_log2())
    }
}

/// The direction a [`RangeCoder`] works in.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Mode {
    /// Symbols in, bytes out.
    Encode,
    /// Bytes in, symbols out.
    Decode,
}

/// A range coder whose direction is chosen at runtime.
///
/// Calls that don't belong to the coder's mode fail with `CoderError::WrongMode`.
#[derive(Clone, Debug)]
pub enum RangeCoder {
    /// An encoding coder.
    Encoder(RangeEncoder),
    /// A decoding coder.
    Decoder(RangeDecoder),
}

impl RangeCoder {
    /// Creates a new coder for the given mode.
    pub fn new(mode: Mode, configuration: &CoderConfiguration) -> Result<Self, CoderError> {
        Ok(match mode {
            Mode::Encode => RangeCoder::Encoder(RangeEncoder::new(configuration)?),
            Mode::Decode => RangeCoder::Decoder(RangeDecoder::new(configuration)?),
        })
    }

    /// Returns the mode of the coder.
    pub fn mode(&self) -> Mode {
        match self {
            RangeCoder::Encoder(_) => Mode::Encode,
            RangeCoder::Decoder(_) => Mode::Decode,
        }
    }

    /// See [`RangeEncoder::encode`].
    pub fn encode(&mut self, low: u32, high: u32, den: u32) -> Result<(), CoderError> {
        match self {
            RangeCoder::Encoder(enc) => enc.encode(low, high, den),
            RangeCoder::Decoder(_) => Err(CoderError::WrongMode),
        }
    }

    /// See [`RangeEncoder::get_byte`].
    pub fn get_byte(&mut self) -> Result<Output, CoderError> {
        match self {
            RangeCoder::Encoder(enc) => Ok(enc.get_byte()),
            RangeCoder::Decoder(_) => Err(CoderError::WrongMode),
        }
    }

    /// See [`RangeDecoder::decode`].
    pub fn decode(&mut self, den: u32) -> Result<Decoded, CoderError> {
        match self {
            RangeCoder::Encoder(_) => Err(CoderError::WrongMode),
            RangeCoder::Decoder(dec) => dec.decode(den),
        }
    }

    /// See [`RangeDecoder::scale`].
    pub fn scale(&mut self, low: u32, high: u32, den: u32) -> Result<(), CoderError> {
        match self {
            RangeCoder::Encoder(_) => Err(CoderError::WrongMode),
            RangeCoder::Decoder(dec) => dec.scale(low, high, den),
        }
    }

    /// See [`RangeDecoder::add_byte`].
    pub fn add_byte(&mut self, byte: u8) -> Result<(), CoderError> {
        match self {
            RangeCoder::Encoder(_) => Err(CoderError::WrongMode),
            RangeCoder::Decoder(dec) => dec.add_byte(byte),
        }
    }

    /// Finishes the stream in either mode. Calling it twice has no further effect.
    pub fn finish(&mut self) -> Result<(), CoderError> {
        match self {
            RangeCoder::Encoder(enc) => enc.finish(),
            RangeCoder::Decoder(dec) => {
                dec.finish();
                Ok(())
            }
        }
    }

    /// Resets the coder to the state it was created in.
    pub fn reset(&mut self) {
        match self {
            RangeCoder::Encoder(enc) => enc.reset(),
            RangeCoder::Decoder(dec) => dec.reset(),
        }
    }

    /// Returns `true` once `finish()` was called.
    pub fn is_finished(&self) -> bool {
        match self {
            RangeCoder::Encoder(enc) => enc.is_finished(),
            RangeCoder::Decoder(dec) => dec.is_finished(),
        }
    }
}
