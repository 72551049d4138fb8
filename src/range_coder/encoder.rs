//! Implements the range encoder.
use crate::error::CoderError;
use crate::range_coder::queue::RunQueue;
use crate::range_coder::{CoderConfiguration, Output, Precision, Tell, QUEUE_CAPACITY};

/// The range encoder.
///
/// Symbols go in through `encode()`, bytes come out of `get_byte()`. The caller
/// has to drain every ready byte after each `encode()`, otherwise the settled
/// bit queue runs full and `encode()` fails with `CoderError::QueueOverflow`.
///
/// See the module documentation for details.
#[derive(Clone, Debug)]
pub struct RangeEncoder {
    precision: Precision,
    /// Number of runs held back from `get_byte()`.
    ready_threshold: usize,
    /// The low end of the current range.
    low: u64,
    /// The number of values in the current range.
    range: u64,
    /// Settled bits that were not yet handed out.
    queue: RunQueue,
    /// The total number of settled bits, including the ones already handed out.
    settled: u64,
    finished: bool,
}

impl Tell for RangeEncoder {
    #[inline(always)]
    fn bits_total(&self) -> u64 {
        self.settled + u64::from(self.precision.bits)
    }

    #[inline(always)]
    fn range(&self) -> u64 {
        self.range
    }
}

impl RangeEncoder {
    /// Creates a new encoder with the given configuration.
    pub fn new(configuration: &CoderConfiguration) -> Result<Self, CoderError> {
        configuration.validate()?;
        let precision = Precision::new(configuration.precision_bits);

        Ok(Self {
            precision,
            ready_threshold: configuration.ready_threshold,
            low: 0,
            range: precision.norm,
            queue: RunQueue::new(),
            settled: 0,
            finished: false,
        })
    }

    /// Resets the state of the encoder.
    pub fn reset(&mut self) {
        self.low = 0;
        self.range = self.precision.norm;
        self.queue = RunQueue::new();
        self.settled = 0;
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

    /// Settles the top bit of `low` until the range is larger than half of the accumulator.
    fn normalize(&mut self) -> Result<(), CoderError> {
        let Precision { norm, half, .. } = self.precision;
        while self.range <= half {
            self.queue.push(self.low & half != 0)?;
            self.settled += 1;
            self.low = (self.low << 1) & (norm - 1);
            self.range <<= 1;
        }

        Ok(())
    }

    /// Encodes a symbol given its frequency information.
    ///
    /// The frequency information must be discernible by the decoder, assuming it
    /// has read only the previous symbols from the stream.
    ///
    /// # Arguments
    /// * `low`  - The cumulative frequency of all symbols that come before the one to be
    ///            encoded.
    /// * `high` - The cumulative frequency of all symbols up to and including the one to
    ///            be encoded.
    /// * `den`  - The sum of the frequencies of all the symbols. At most
    ///            `2^(precision_bits - 1) + 1`.
    ///
    pub fn encode(&mut self, low: u32, high: u32, den: u32) -> Result<(), CoderError> {
        if self.finished {
            return Err(CoderError::Finished);
        }
        self.precision.check_interval(low, high, den)?;
        if self.queue.runs() > QUEUE_CAPACITY / 2 {
            return Err(CoderError::QueueOverflow);
        }

        self.normalize()?;

        let (offset, width) = Precision::scale(self.range, low, high, den);
        self.low += offset;
        self.range = width;

        if self.low >= self.precision.norm {
            self.low -= self.precision.norm;
            self.queue.propagate_carry()?;
        }

        Ok(())
    }

    /// Indicates that there are no more symbols to encode.
    ///
    /// Settles the minimum number of bits that ensures that the symbols encoded
    /// thus far will be decoded correctly when followed by 1-bits, then pads
    /// with 1-bits up to a whole byte. Calling it again has no effect.
    pub fn finish(&mut self) -> Result<(), CoderError> {
        if self.finished {
            return Ok(());
        }
        if self.queue.runs() > QUEUE_CAPACITY / 2 {
            return Err(CoderError::QueueOverflow);
        }

        let norm = self.precision.norm;
        let mut low = self.low;
        let mut dif = low ^ (low + self.range);
        while dif < norm {
            low = (low << 1) & ((norm << 1) - 1);
            dif <<= 1;
            self.queue.push(low & norm != 0)?;
            self.settled += 1;
        }

        let pad = (8 - self.queue.bits() % 8) % 8;
        self.queue.push_run(true, pad)?;
        self.settled += pad;
        self.finished = true;

        log::debug!(
            "range encoder finished with {} settled bits ({} padding)",
            self.settled,
            pad
        );

        Ok(())
    }

    /// Returns the next byte of the stream, or `Output::NotReady` if a later carry
    /// may still change it.
    ///
    /// Once the encoder is finished every remaining byte is ready.
    pub fn get_byte(&mut self) -> Output {
        let runs = self.queue.runs();
        if runs < self.ready_threshold && (!self.finished || runs == 0) {
            return Output::NotReady;
        }

        match self.queue.pop_byte() {
            Some(byte) => Output::Byte(byte),
            None => Output::NotReady,
        }
    }

    /// Appends every ready byte to `out`.
    pub fn drain(&mut self, out: &mut Vec<u8>) {
        while let Output::Byte(byte) = self.get_byte() {
            out.push(byte);
        }
    }
}
