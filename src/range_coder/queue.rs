//! Bit queues that sit between the interval arithmetic and the byte stream.
use crate::error::CoderError;
use crate::range_coder::QUEUE_CAPACITY;

const QUEUE_MASK: usize = QUEUE_CAPACITY - 1;

/// Queue of settled output bits, stored as alternating runs.
///
/// Every slot holds the length of a run. Slots at even positions hold runs of
/// 0-bits, slots at odd positions hold runs of 1-bits, so consecutive live
/// slots always alternate. This keeps carry propagation O(1): flipping a run of
/// trailing 1-bits only moves its counter into the next 0-slot.
///
/// The live runs are the `runs` slots ending at `tail`. Slots outside of them
/// are always zero.
#[derive(Clone, Debug)]
pub(crate) struct RunQueue {
    counts: [u64; QUEUE_CAPACITY],
    tail: usize,
    runs: usize,
    bits: u64,
}

impl RunQueue {
    pub(crate) fn new() -> Self {
        Self {
            counts: [0; QUEUE_CAPACITY],
            tail: 0,
            runs: 0,
            bits: 0,
        }
    }

    /// Number of live runs.
    #[inline(always)]
    pub(crate) fn runs(&self) -> usize {
        self.runs
    }

    /// Number of queued bits.
    #[inline(always)]
    pub(crate) fn bits(&self) -> u64 {
        self.bits
    }

    #[inline(always)]
    fn head(&self) -> usize {
        (self.tail + QUEUE_CAPACITY + 1 - self.runs) & QUEUE_MASK
    }

    /// Appends `count` copies of `bit` to the tail of the queue.
    pub(crate) fn push_run(&mut self, bit: bool, count: u64) -> Result<(), CoderError> {
        if count == 0 {
            return Ok(());
        }
        let parity = usize::from(bit);
        if self.runs == 0 || self.tail & 1 != parity {
            if self.tail & 1 != parity {
                if self.runs >= QUEUE_CAPACITY - 1 {
                    return Err(CoderError::QueueOverflow);
                }
                self.tail = (self.tail + 1) & QUEUE_MASK;
            }
            debug_assert_eq!(self.counts[self.tail], 0);
            self.runs += 1;
        }
        self.counts[self.tail] += count;
        self.bits += count;

        Ok(())
    }

    #[inline(always)]
    pub(crate) fn push(&mut self, bit: bool) -> Result<(), CoderError> {
        self.push_run(bit, 1)
    }

    /// Adds one to the queued bits, read as a binary number whose last bit
    /// is the least significant one.
    ///
    /// Fails if the 0-bit that absorbs the carry was already handed out.
    pub(crate) fn propagate_carry(&mut self) -> Result<(), CoderError> {
        let has_zero = match self.runs {
            0 => false,
            1 => self.tail & 1 == 0,
            _ => true,
        };
        if !has_zero {
            return Err(CoderError::InternalError(
                "carry reached bits that were already emitted",
            ));
        }

        // Trailing 1-bits turn into 0-bits.
        let mut ones = 0;
        if self.tail & 1 == 1 {
            ones = self.counts[self.tail];
            self.counts[self.tail] = 0;
            self.tail = (self.tail + QUEUE_MASK) & QUEUE_MASK;
            self.runs -= 1;
        }

        // The last 0-bit turns into a 1-bit.
        self.counts[self.tail] -= 1;
        if self.counts[self.tail] == 0 {
            // The 0-run vanished, the new 1-bit joins the preceding 1-run.
            self.tail = (self.tail + QUEUE_MASK) & QUEUE_MASK;
            if self.runs == 1 {
                debug_assert_eq!(self.counts[self.tail], 0);
            } else {
                self.runs -= 1;
            }
        } else {
            self.tail = (self.tail + 1) & QUEUE_MASK;
            self.runs += 1;
        }
        self.counts[self.tail] += 1;

        if ones > 0 {
            self.tail = (self.tail + 1) & QUEUE_MASK;
            self.counts[self.tail] = ones;
            self.runs += 1;
        }

        Ok(())
    }

    /// Removes the first bit of the queue.
    pub(crate) fn pop(&mut self) -> Option<bool> {
        if self.runs == 0 {
            return None;
        }
        let head = self.head();
        self.counts[head] -= 1;
        if self.counts[head] == 0 {
            self.runs -= 1;
        }
        self.bits -= 1;

        Some(head & 1 == 1)
    }

    /// Removes the first 8 bits of the queue, most significant bit first.
    pub(crate) fn pop_byte(&mut self) -> Option<u8> {
        if self.bits < 8 {
            return None;
        }
        let mut byte = 0_u8;
        for _ in 0..8 {
            let bit = self.pop()?;
            byte = byte << 1 | u8::from(bit);
        }

        Some(byte)
    }
}

/// Circular buffer of raw input bits for the decoder.
#[derive(Clone, Debug)]
pub(crate) struct BitQueue {
    bits: [bool; QUEUE_CAPACITY],
    head: usize,
    len: usize,
}

impl BitQueue {
    pub(crate) fn new() -> Self {
        Self {
            bits: [false; QUEUE_CAPACITY],
            head: 0,
            len: 0,
        }
    }

    /// Number of queued bits.
    #[inline(always)]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Number of bits that can still be pushed.
    #[inline(always)]
    pub(crate) fn free(&self) -> usize {
        QUEUE_CAPACITY - self.len
    }

    pub(crate) fn push(&mut self, bit: bool) -> Result<(), CoderError> {
        if self.len == QUEUE_CAPACITY {
            return Err(CoderError::QueueOverflow);
        }
        self.bits[(self.head + self.len) & QUEUE_MASK] = bit;
        self.len += 1;

        Ok(())
    }

    /// Fills every free slot with a 1-bit.
    pub(crate) fn fill_ones(&mut self) {
        while self.len < QUEUE_CAPACITY {
            self.bits[(self.head + self.len) & QUEUE_MASK] = true;
            self.len += 1;
        }
    }

    pub(crate) fn pop(&mut self) -> Option<bool> {
        if self.len == 0 {
            return None;
        }
        let bit = self.bits[self.head];
        self.head = (self.head + 1) & QUEUE_MASK;
        self.len -= 1;

        Some(bit)
    }
}
