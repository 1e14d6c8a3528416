//! Minimal vector operations the SIMD tokenizer is written against: splat,
//! unaligned load and comparison to a bitmask, with one implementation per
//! architecture & token width.
use crate::token::Token;

/// Number of tokens whose masks are assembled into a single `u64` block.
pub(crate) const BLOCK: usize = 64;

pub(crate) trait Lanes<T: Token>: Copy {
    const LANES: usize;

    unsafe fn splat(token: T) -> Self;

    /// # Safety
    ///
    /// `ptr` must be valid for reading `LANES` tokens.
    unsafe fn load(ptr: *const T) -> Self;

    /// Bit `i` of the result is set when lane `i` of both vectors are equal.
    unsafe fn cmpeq(self, other: Self) -> u64;

    /// Prefix xor of a block mask, see [`crate::bits::prefix_xor`].
    #[inline(always)]
    unsafe fn prefix_xor(bits: u64) -> u64 {
        crate::bits::prefix_xor(bits)
    }
}

/// Builds a block mask of the positions of `needle` in the `BLOCK` tokens
/// starting at `ptr`.
///
/// # Safety
///
/// `ptr` must be valid for reading `BLOCK` tokens.
#[inline(always)]
pub(crate) unsafe fn block_mask<T: Token, V: Lanes<T>>(ptr: *const T, needle: V) -> u64 {
    let mut mask = 0;
    let mut i = 0;

    while i < BLOCK {
        mask |= V::load(ptr.add(i)).cmpeq(needle) << i;
        i += V::LANES;
    }

    mask
}

#[inline]
fn find_unrolled<T: Token>(needle: T, haystack: &[T]) -> Option<usize> {
    let mut i = 0;

    while i + 8 <= haystack.len() {
        let chunk = &haystack[i..i + 8];

        if chunk.contains(&needle) {
            break;
        }

        i += 8;
    }

    haystack[i..]
        .iter()
        .position(|t| *t == needle)
        .map(|offset| offset + i)
}

/// Vectorized search over a haystack, falling back to unrolled scalar code
/// for its tail.
///
/// # Safety
///
/// The CPU must support the instructions used by `V`.
#[inline(always)]
unsafe fn find_with<T: Token, V: Lanes<T>>(needle: T, haystack: &[T]) -> Option<usize> {
    let ptr = haystack.as_ptr();
    let splat = V::splat(needle);
    let mut i = 0;

    while i + V::LANES <= haystack.len() {
        let mask = V::load(ptr.add(i)).cmpeq(splat);

        if mask != 0 {
            return Some(i + mask.trailing_zeros() as usize);
        }

        i += V::LANES;
    }

    find_unrolled(needle, &haystack[i..]).map(|offset| offset + i)
}

pub(crate) fn find_u16(needle: u16, haystack: &[u16]) -> Option<usize> {
    #[cfg(target_arch = "x86_64")]
    {
        unsafe { find_with::<u16, x86_64::Sse2Wide>(needle, haystack) }
    }

    #[cfg(target_arch = "aarch64")]
    {
        unsafe { find_with::<u16, aarch64::NeonWide>(needle, haystack) }
    }

    #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
    {
        find_unrolled(needle, haystack)
    }
}

#[cfg(target_arch = "x86_64")]
pub(crate) mod x86_64 {
    use super::Lanes;

    use core::arch::x86_64::{
        __m128i, __m256i, _mm256_cmpeq_epi8, _mm256_loadu_si256, _mm256_movemask_epi8,
        _mm256_set1_epi8, _mm_cmpeq_epi16, _mm_cmpeq_epi8, _mm_loadu_si128, _mm_movemask_epi8,
        _mm_packs_epi16, _mm_set1_epi16, _mm_set1_epi8,
    };

    #[derive(Debug, Clone, Copy)]
    pub(crate) struct Sse2(__m128i);

    impl Lanes<u8> for Sse2 {
        const LANES: usize = 16;

        #[inline(always)]
        unsafe fn splat(token: u8) -> Self {
            Self(_mm_set1_epi8(token as i8))
        }

        #[inline(always)]
        unsafe fn load(ptr: *const u8) -> Self {
            Self(_mm_loadu_si128(ptr as *const __m128i))
        }

        #[inline(always)]
        unsafe fn cmpeq(self, other: Self) -> u64 {
            _mm_movemask_epi8(_mm_cmpeq_epi8(self.0, other.0)) as u16 as u64
        }
    }

    /// Two 128-bit registers of 8 code units, narrowed into a single byte
    /// mask.
    #[derive(Debug, Clone, Copy)]
    pub(crate) struct Sse2Wide(__m128i, __m128i);

    impl Lanes<u16> for Sse2Wide {
        const LANES: usize = 16;

        #[inline(always)]
        unsafe fn splat(token: u16) -> Self {
            let v = _mm_set1_epi16(token as i16);
            Self(v, v)
        }

        #[inline(always)]
        unsafe fn load(ptr: *const u16) -> Self {
            Self(
                _mm_loadu_si128(ptr as *const __m128i),
                _mm_loadu_si128(ptr.add(8) as *const __m128i),
            )
        }

        #[inline(always)]
        unsafe fn cmpeq(self, other: Self) -> u64 {
            // NOTE: lanes are either 0 or -1, which signed saturation keeps
            let low = _mm_cmpeq_epi16(self.0, other.0);
            let high = _mm_cmpeq_epi16(self.1, other.1);

            _mm_movemask_epi8(_mm_packs_epi16(low, high)) as u16 as u64
        }
    }

    #[derive(Debug, Clone, Copy)]
    pub(crate) struct Avx2(__m256i);

    impl Lanes<u8> for Avx2 {
        const LANES: usize = 32;

        #[inline(always)]
        unsafe fn splat(token: u8) -> Self {
            Self(_mm256_set1_epi8(token as i8))
        }

        #[inline(always)]
        unsafe fn load(ptr: *const u8) -> Self {
            Self(_mm256_loadu_si256(ptr as *const __m256i))
        }

        #[inline(always)]
        unsafe fn cmpeq(self, other: Self) -> u64 {
            _mm256_movemask_epi8(_mm256_cmpeq_epi8(self.0, other.0)) as u32 as u64
        }

        #[inline(always)]
        unsafe fn prefix_xor(bits: u64) -> u64 {
            crate::bits::prefix_xor_clmul(bits)
        }
    }
}

#[cfg(target_arch = "aarch64")]
pub(crate) mod aarch64 {
    use super::Lanes;

    use core::arch::aarch64::{
        uint16x8_t, uint8x16_t, vaddv_u8, vandq_u8, vceqq_u16, vceqq_u8, vcombine_u8,
        vdupq_n_u16, vdupq_n_u8, vget_high_u8, vget_low_u8, vld1q_u16, vld1q_u8, vmovn_u16,
    };

    const WEIGHTS: [u8; 16] = [1, 2, 4, 8, 16, 32, 64, 128, 1, 2, 4, 8, 16, 32, 64, 128];

    // NEON has no movemask: each lane keeps its own bit weight, then both
    // halves are summed horizontally.
    #[inline(always)]
    unsafe fn neon_movemask(v: uint8x16_t) -> u64 {
        let weighted = vandq_u8(v, vld1q_u8(WEIGHTS.as_ptr()));
        let low = vaddv_u8(vget_low_u8(weighted)) as u64;
        let high = vaddv_u8(vget_high_u8(weighted)) as u64;

        low | (high << 8)
    }

    #[derive(Debug, Clone, Copy)]
    pub(crate) struct Neon(uint8x16_t);

    impl Lanes<u8> for Neon {
        const LANES: usize = 16;

        #[inline(always)]
        unsafe fn splat(token: u8) -> Self {
            Self(vdupq_n_u8(token))
        }

        #[inline(always)]
        unsafe fn load(ptr: *const u8) -> Self {
            Self(vld1q_u8(ptr))
        }

        #[inline(always)]
        unsafe fn cmpeq(self, other: Self) -> u64 {
            neon_movemask(vceqq_u8(self.0, other.0))
        }
    }

    #[derive(Debug, Clone, Copy)]
    pub(crate) struct NeonWide(uint16x8_t, uint16x8_t);

    impl Lanes<u16> for NeonWide {
        const LANES: usize = 16;

        #[inline(always)]
        unsafe fn splat(token: u16) -> Self {
            let v = vdupq_n_u16(token);
            Self(v, v)
        }

        #[inline(always)]
        unsafe fn load(ptr: *const u16) -> Self {
            Self(vld1q_u16(ptr), vld1q_u16(ptr.add(8)))
        }

        #[inline(always)]
        unsafe fn cmpeq(self, other: Self) -> u64 {
            let low = vmovn_u16(vceqq_u16(self.0, other.0));
            let high = vmovn_u16(vceqq_u16(self.1, other.1));

            neon_movemask(vcombine_u8(low, high))
        }
    }
}
