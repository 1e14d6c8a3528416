//! Unescaping engines, collapsing doubled quotes or escape sequences of a
//! field into a destination at least as long as the field.
//!
//! Both engines jump from one special token to the next using
//! [`Token::find`], which relies on `memchr` for bytes and on vector
//! comparisons for UTF-16, and copy the clean runs in between in one go.
use crate::error::FormatErrorKind;
use crate::token::Token;

#[inline]
fn copy<T: Token>(src: &[T], dst: &mut [T], written: usize) -> usize {
    dst[written..written + src.len()].copy_from_slice(src);
    written + src.len()
}

/// Unescapes the inside of a RFC4180 quoted field, wrapping quotes already
/// removed, where every quote must be doubled.
///
/// `quotes` is the number of quote tokens `src` is expected to contain.
/// Returns the number of tokens written into `dst`.
pub(crate) fn unescape_rfc4180<T: Token>(
    src: &[T],
    dst: &mut [T],
    quote: T,
    quotes: u32,
) -> Result<usize, FormatErrorKind> {
    debug_assert!(dst.len() >= src.len());

    let mismatch = || FormatErrorKind::QuoteCountMismatch {
        expected: quotes,
        actual: T::count(quote, src) as u32,
    };

    if quotes & 1 == 1 {
        return Err(mismatch());
    }

    let mut remaining = quotes;
    let mut pos = 0;
    let mut written = 0;

    while remaining > 0 {
        let at = match T::find(quote, &src[pos..]) {
            Some(offset) => pos + offset,
            None => return Err(mismatch()),
        };

        if src.get(at + 1) != Some(&quote) {
            return Err(mismatch());
        }

        // Copying the gap along with the first quote of the pair
        written = copy(&src[pos..=at], dst, written);
        pos = at + 2;
        remaining -= 2;
    }

    if T::find(quote, &src[pos..]).is_some() {
        return Err(mismatch());
    }

    Ok(copy(&src[pos..], dst, written))
}

/// Removes escape tokens from `src`, keeping the tokens they escape as-is.
///
/// `escapes` is the number of effective escape tokens `src` is expected to
/// contain. Returns the number of tokens written into `dst`.
pub(crate) fn unescape_escaped<T: Token>(
    src: &[T],
    dst: &mut [T],
    escape: T,
    escapes: u32,
) -> Result<usize, FormatErrorKind> {
    debug_assert!(dst.len() >= src.len());

    let mut consumed = 0;
    let mut pos = 0;
    let mut written = 0;

    while consumed < escapes {
        let at = match T::find(escape, &src[pos..]) {
            Some(offset) => pos + offset,
            None => break,
        };

        if at + 1 == src.len() {
            return Err(FormatErrorKind::DanglingEscape);
        }

        written = copy(&src[pos..at], dst, written);
        dst[written] = src[at + 1];
        written += 1;
        pos = at + 2;
        consumed += 1;
    }

    let leftover = T::count(escape, &src[pos..]) as u32;

    if consumed < escapes || leftover > 0 {
        return Err(FormatErrorKind::EscapeCountMismatch {
            expected: escapes,
            actual: consumed + leftover,
        });
    }

    Ok(copy(&src[pos..], dst, written))
}

/// Number of effective escape tokens in `src`, i.e. the ones not escaped
/// themselves. Used when a field's count saturated.
pub(crate) fn count_escapes<T: Token>(src: &[T], escape: T) -> u32 {
    let mut count = 0;
    let mut pos = 0;

    while let Some(offset) = T::find(escape, &src[pos..]) {
        count += 1;
        pos += offset + 2;

        if pos >= src.len() {
            break;
        }
    }

    count
}
