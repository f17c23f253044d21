#[doc(hidden)]
pub(crate) trait DivCeil: Sized {
    fn msrv_div_ceil(self, rhs: Self) -> Self;
}

impl DivCeil for usize {
    #[inline]
    fn msrv_div_ceil(self, rhs: Self) -> Self {
        let d = self / rhs;
        let r = self % rhs;
        if r > 0 {
            d + 1
        } else {
            d
        }
    }
}

/// Number of significant bits of `n`, at least one.
///
/// Equal to `ceil(log2(n))` when `n` is not a power of two, and one more than it otherwise.
#[inline]
pub fn bit_length(n: usize) -> usize {
    Ord::max(1, (usize::BITS - n.leading_zeros()) as usize)
}

pub mod thread;
