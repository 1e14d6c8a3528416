//! Branchless bitmask helpers computing quoting & escaping state over a block
//! of tokens, one bit per token, with an explicit carry between blocks.
use std::fmt;
use std::ops::{BitAnd, BitOr, BitXor, Not, Shl, Shr};

pub(crate) trait Mask:
    Copy
    + Eq
    + fmt::Debug
    + BitAnd<Output = Self>
    + BitOr<Output = Self>
    + BitXor<Output = Self>
    + Not<Output = Self>
    + Shl<u32, Output = Self>
    + Shr<u32, Output = Self>
{
    const BITS: u32;
    const ZERO: Self;
    const ONE: Self;
    /// `0b...0101`
    const EVEN_BITS: Self;

    fn carrying_add(self, rhs: Self) -> (Self, bool);

    #[inline(always)]
    fn from_bool(value: bool) -> Self {
        if value {
            Self::ONE
        } else {
            Self::ZERO
        }
    }

    #[inline(always)]
    fn high_bit(self) -> bool {
        self >> (Self::BITS - 1) == Self::ONE
    }
}

macro_rules! impl_mask {
    ($($t: ty),*) => {
        $(
            impl Mask for $t {
                const BITS: u32 = <$t>::BITS;
                const ZERO: Self = 0;
                const ONE: Self = 1;
                const EVEN_BITS: Self = <$t>::MAX / 3;

                #[inline(always)]
                fn carrying_add(self, rhs: Self) -> (Self, bool) {
                    self.overflowing_add(rhs)
                }
            }
        )*
    };
}

impl_mask!(u32, u64);

/// Bit `i` of the result is the parity of the set bits at positions `<= i`.
#[inline(always)]
pub(crate) fn prefix_xor<M: Mask>(bits: M) -> M {
    let mut mask = bits;
    let mut shift = 1;

    while shift < M::BITS {
        mask = mask ^ (mask << shift);
        shift <<= 1;
    }

    mask
}

/// Carry-less multiplication by an all-ones operand is a prefix xor.
///
/// # Safety
///
/// The `pclmulqdq` target feature must be available.
#[cfg(target_arch = "x86_64")]
#[inline]
#[target_feature(enable = "pclmulqdq")]
pub(crate) unsafe fn prefix_xor_clmul(bits: u64) -> u64 {
    use core::arch::x86_64::{
        _mm_clmulepi64_si128, _mm_cvtsi128_si64, _mm_set1_epi8, _mm_set_epi64x,
    };

    _mm_cvtsi128_si64(_mm_clmulepi64_si128(
        _mm_set_epi64x(0, bits as i64),
        _mm_set1_epi8(-1),
        0,
    )) as u64
}

/// Given the positions of unescaped quotes, returns a mask of the positions
/// lying inside a quoted region (opening quote included, closing quote
/// excluded).
///
/// `inside` is whether the block starts inside quotes, and is updated to
/// whether the next block does.
#[cfg(test)]
#[inline(always)]
pub(crate) fn quote_mask<M: Mask>(quotes: M, inside: &mut bool) -> M {
    apply_quote_carry(prefix_xor(quotes), inside)
}

#[inline(always)]
pub(crate) fn apply_quote_carry<M: Mask>(parity: M, inside: &mut bool) -> M {
    let mask = if *inside { !parity } else { parity };
    *inside = mask.high_bit();
    mask
}

/// Classifies a block of escape tokens.
///
/// Inside a run of consecutive escape tokens, the first escapes the second,
/// the third escapes the fourth and so on, which means a run only escapes the
/// token following it when its length is odd. Runs are classified by the
/// parity of their starting position: adding the starts of even-positioned
/// runs to the mask clears those runs through carry propagation.
///
/// Returns `(escapes, escaped)`: the effective escape tokens, and the tokens
/// they escape (which can themselves be escape tokens). `carry` is whether
/// the first token of the block is escaped, and is updated for the next
/// block.
#[inline(always)]
pub(crate) fn escape_classification<M: Mask>(bits: M, carry: &mut bool) -> (M, M) {
    let carried = M::from_bool(*carry);
    let start_edges = bits & !(bits << 1);

    // NOTE: when the first token is escaped, a run starting there has its
    // escape tokens on odd positions.
    let even_starts = start_edges & (M::EVEN_BITS ^ carried);
    let (cleared, _) = bits.carrying_add(even_starts);
    let even_runs = bits & !cleared;
    let odd_runs = bits & !even_runs;

    let escapes = (even_runs & M::EVEN_BITS) | (odd_runs & !M::EVEN_BITS);
    let escaped = (escapes << 1) | carried;

    *carry = escapes.high_bit();

    (escapes, escaped)
}

/// Positions of the tokens directly following an odd-length run of escape
/// tokens, i.e. the escaped tokens that are not escape tokens themselves.
#[cfg(test)]
#[inline(always)]
pub(crate) fn odd_run_ends<M: Mask>(bits: M, carry: &mut bool) -> M {
    let (_, escaped) = escape_classification(bits, carry);
    escaped & !bits
}
