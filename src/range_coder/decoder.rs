//! Implements the range decoder.
use crate::error::CoderError;
use crate::range_coder::queue::BitQueue;
use crate::range_coder::{CoderConfiguration, Decoded, Precision, Tell};

/// The range decoder.
///
/// Decoding a symbol takes two calls. `decode()` returns a code that falls into
/// the interval of the coded symbol, the caller looks the symbol up and narrows
/// the interval with `scale()`. `decode()` can't be called more than once without
/// a corresponding call to `scale()`.
///
/// Input arrives one byte at a time through `add_byte()` whenever `decode()`
/// asks for it. Once the input is exhausted, `finish()` makes the decoder read
/// an infinite run of 1-bits, which is how the encoder terminated the stream.
#[derive(Clone, Debug)]
pub struct RangeDecoder {
    precision: Precision,
    /// The difference between the input value and the low end of the current range.
    low: u64,
    /// The number of values in the current range.
    range: u64,
    /// Raw input bits.
    queue: BitQueue,
    /// The total number of bits shifted into `low`.
    consumed: u64,
    finished: bool,
}

impl Tell for RangeDecoder {
    #[inline(always)]
    fn bits_total(&self) -> u64 {
        self.consumed
    }

    #[inline(always)]
    fn range(&self) -> u64 {
        self.range
    }
}

impl RangeDecoder {
    /// Creates a new decoder with the given configuration.
    pub fn new(configuration: &CoderConfiguration) -> Result<Self, CoderError> {
        configuration.validate()?;

        Ok(Self {
            precision: Precision::new(configuration.precision_bits),
            low: 0,
            range: 1,
            queue: BitQueue::new(),
            consumed: 0,
            finished: false,
        })
    }

    /// Resets the state of the decoder.
    pub fn reset(&mut self) {
        self.low = 0;
        self.range = 1;
        self.queue = BitQueue::new();
        self.consumed = 0;
        self.finished = false;
    }

    /// Returns the width of the accumulator.
    pub fn precision_bits(&self) -> u32 {
        self.precision.bits
    }

    /// Returns `true` once `finish()` was called.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Returns how many input bits can be added before the queue overflows.
    ///
    /// `add_byte()` needs at least 9 free bits.
    pub fn free_bits(&self) -> usize {
        self.queue.free()
    }

    /// Adds an input byte to the decoding queue.
    pub fn add_byte(&mut self, byte: u8) -> Result<(), CoderError> {
        if self.finished {
            return Err(CoderError::Finished);
        }
        if self.queue.free() <= 8 {
            return Err(CoderError::QueueOverflow);
        }
        for i in (0..8).rev() {
            self.queue.push(byte >> i & 1 == 1)?;
        }

        Ok(())
    }

    /// Signals that there is no more input. Calling it again has no effect.
    pub fn finish(&mut self) {
        if !self.finished {
            log::trace!(
                "range decoder input exhausted after {} bits",
                self.consumed + self.queue.len() as u64
            );
        }
        self.finished = true;
    }

    /// Shifts input bits into `low` until the range is larger than half of the accumulator.
    fn normalize(&mut self) -> Result<(), CoderError> {
        while self.range <= self.precision.half {
            let bit = self
                .queue
                .pop()
                .ok_or(CoderError::InternalError("input queue ran empty"))?;
            self.low = (self.low << 1) | u64::from(bit);
            self.range <<= 1;
            self.consumed += 1;
        }

        Ok(())
    }

    /// Calculates the code of the next symbol.
    ///
    /// # Arguments
    /// * `den` - The total frequency of the symbols in the alphabet the
    ///           next symbol was encoded with.
    ///
    /// Returns `Decoded::Code` with a value in `[0, den)`. If the cumulative
    /// frequency of all the symbols before the one that was encoded was `low`,
    /// and the cumulative frequency of all the symbols up to and including the
    /// one encoded is `high`, then the code falls in the range `[low, high)`.
    ///
    /// Returns `Decoded::NeedMoreInput` if the decoder needs another byte first.
    pub fn decode(&mut self, den: u32) -> Result<Decoded, CoderError> {
        self.precision.check_denominator(den)?;

        if self.queue.len() < self.precision.bits as usize {
            if !self.finished {
                return Ok(Decoded::NeedMoreInput);
            }
            self.queue.fill_ones();
        }

        self.normalize()?;

        let den = u64::from(den);
        let code = (self.low * den + den - 1) / self.range;
        debug_assert!(code < den);

        Ok(Decoded::Code(code as u32))
    }

    /// Advances the decoder past the symbol whose interval contains the last code.
    ///
    /// # Arguments
    /// * `low`  - The cumulative frequency of all symbols that come before the symbol
    ///            decoded.
    /// * `high` - The cumulative frequency of all symbols up to and including the symbol
    ///            decoded.
    /// * `den`  - The total frequency of the symbols in the alphabet the symbol decoded
    ///            was encoded in. This must be the same as passed to the preceding call
    ///            to decode().
    ///
    /// Fails with `CoderError::InvalidStream` if the interval doesn't contain the
    /// decoder's value. The decoder must not be used any further in that case.
    pub fn scale(&mut self, low: u32, high: u32, den: u32) -> Result<(), CoderError> {
        self.precision.check_interval(low, high, den)?;

        let (offset, width) = Precision::scale(self.range, low, high, den);
        if self.low < offset || self.low - offset >= width {
            return Err(CoderError::InvalidStream);
        }
        self.low -= offset;
        self.range = width;

        Ok(())
    }
}
