use std::fmt;

use crate::simd::{self, Kernel};
use crate::vector;

mod private {
    pub trait Sealed {}

    impl Sealed for u8 {}
    impl Sealed for u16 {}
}

/// A unit of CSV input: either a byte (`u8`) or a UTF-16 code unit (`u16`).
///
/// This trait is sealed and cannot be implemented outside of this crate.
pub trait Token:
    private::Sealed + Copy + Eq + Ord + Default + fmt::Debug + Send + Sync + 'static
{
    /// Byte order mark skipped at the very beginning of a stream, if any.
    #[doc(hidden)]
    const BOM: &'static [Self];

    #[doc(hidden)]
    fn from_ascii(byte: u8) -> Self;

    /// Numeric value of the token.
    fn to_u32(self) -> u32;

    /// Returns whether the token is an ASCII character.
    #[inline(always)]
    fn is_ascii(self) -> bool {
        self.to_u32() < 0x80
    }

    /// Offset of the first occurrence of `needle` in `haystack`.
    #[doc(hidden)]
    fn find(needle: Self, haystack: &[Self]) -> Option<usize>;

    /// Number of occurrences of `needle` in `haystack`.
    #[doc(hidden)]
    fn count(needle: Self, haystack: &[Self]) -> usize;

    /// Lossy textual rendering used in diagnostics.
    #[doc(hidden)]
    fn render(data: &[Self]) -> String;

    #[doc(hidden)]
    #[allow(private_interfaces)]
    fn simd_kernel() -> Option<(&'static str, Kernel<Self>)>;
}

// Diagnostics never render more than this many tokens of a field.
const RENDER_LIMIT: usize = 256;

#[allow(private_interfaces)]
impl Token for u8 {
    const BOM: &'static [Self] = b"\xef\xbb\xbf";

    #[inline(always)]
    fn from_ascii(byte: u8) -> Self {
        byte
    }

    #[inline(always)]
    fn to_u32(self) -> u32 {
        self as u32
    }

    #[inline(always)]
    fn find(needle: Self, haystack: &[Self]) -> Option<usize> {
        memchr::memchr(needle, haystack)
    }

    #[inline]
    fn count(needle: Self, haystack: &[Self]) -> usize {
        memchr::memchr_iter(needle, haystack).count()
    }

    fn render(data: &[Self]) -> String {
        let mut string = String::from_utf8_lossy(&data[..data.len().min(RENDER_LIMIT)]).into_owned();

        if data.len() > RENDER_LIMIT {
            string.push_str("...");
        }

        string
    }

    fn simd_kernel() -> Option<(&'static str, Kernel<Self>)> {
        simd::kernel_u8()
    }
}

#[allow(private_interfaces)]
impl Token for u16 {
    const BOM: &'static [Self] = &[];

    #[inline(always)]
    fn from_ascii(byte: u8) -> Self {
        byte as u16
    }

    #[inline(always)]
    fn to_u32(self) -> u32 {
        self as u32
    }

    #[inline(always)]
    fn find(needle: Self, haystack: &[Self]) -> Option<usize> {
        vector::find_u16(needle, haystack)
    }

    #[inline]
    fn count(needle: Self, haystack: &[Self]) -> usize {
        let mut count = 0;
        let mut offset = 0;

        while let Some(i) = vector::find_u16(needle, &haystack[offset..]) {
            count += 1;
            offset += i + 1;
        }

        count
    }

    fn render(data: &[Self]) -> String {
        let mut string = char::decode_utf16(data[..data.len().min(RENDER_LIMIT)].iter().copied())
            .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect::<String>();

        if data.len() > RENDER_LIMIT {
            string.push_str("...");
        }

        string
    }

    fn simd_kernel() -> Option<(&'static str, Kernel<Self>)> {
        simd::kernel_u16()
    }
}
