use std::mem::size_of;

use num_traits::{PrimInt, Zero};

/// Commonly used logarithms on integer primitives.
pub(crate) trait Log: PrimInt + Zero {
    /// The minimum number of bits required to store a positive integer in binary, or 0 for zero.
    #[inline(always)]
    fn bit_length(self) -> u32 {
        (size_of::<Self>() * 8) as u32 - self.leading_zeros()
    }

    /// Log base 2. Self needs to be > 0.
    #[inline(always)]
    fn floor_log2(self) -> u32 {
        debug_assert!(!self.is_zero());
        self.bit_length() - 1
    }
}

impl Log for u64 {}
