//! Block tokenizer classifying 64 tokens at a time.
//!
//! Each block is turned into one bitmask per structural token, quoted regions
//! and escaped tokens are then removed from the delimiter & newline masks with
//! a prefix xor and an escape run classification, and the remaining bits are
//! emitted as field boundaries. The only state carried from one block to the
//! next is whether it starts inside quotes, whether its first token is
//! escaped, whether its first token completes a two-token newline, and the
//! special token counts of the field spanning the block boundary.
use std::fmt;

use crate::bits::{apply_quote_carry, escape_classification};
use crate::dialect::Dialect;
use crate::error;
use crate::meta::Meta;
use crate::token::Token;
use crate::tokenizer::{Emitter, FieldBuffer, Resume};
use crate::vector::{block_mask, Lanes, BLOCK};

/// Amount of unread tokens under which handing the window to the block
/// tokenizer is not worth it anymore.
pub(crate) const PREFERRED_REMAINING: usize = 2 * BLOCK;

pub(crate) type Kernel<T> =
    unsafe fn(&SimdTokenizer<T>, FieldBuffer<'_>, Resume, &[T]) -> error::Result<usize>;

#[derive(Clone)]
pub(crate) struct SimdTokenizer<T> {
    delimiter: T,
    quote: T,
    escape: Option<T>,
    newline: T,
    second_newline: Option<T>,
    name: &'static str,
    kernel: Kernel<T>,
}

impl<T> fmt::Debug for SimdTokenizer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimdTokenizer")
            .field("kernel", &self.name)
            .finish()
    }
}

impl<T: Token> SimdTokenizer<T> {
    /// Returns `None` when the dialect uses non-ASCII tokens or when no
    /// vector instructions are available for this token width.
    pub(crate) fn new(dialect: &Dialect<T>) -> Option<Self> {
        if !dialect.is_ascii() {
            tracing::debug!("dialect is not ascii, using the scalar tokenizer only");
            return None;
        }

        let (name, kernel) = T::simd_kernel()?;

        tracing::debug!(kernel = name, "selected simd kernel");

        Some(Self::with_kernel(dialect, name, kernel))
    }

    pub(crate) fn with_kernel(dialect: &Dialect<T>, name: &'static str, kernel: Kernel<T>) -> Self {
        let newline = dialect.newline();

        Self {
            delimiter: dialect.delimiter(),
            quote: dialect.quote(),
            escape: dialect.escape(),
            newline: newline.first(),
            second_newline: newline.second(),
            name,
            kernel,
        }
    }

    pub(crate) fn name(&self) -> &'static str {
        self.name
    }

    /// Tokenizes whole blocks of `data` starting at `resume.start`, as long
    /// as the buffer can hold a whole block of boundaries. The field crossing
    /// the last processed block is left for a later pass.
    #[inline]
    pub(crate) fn tokenize(
        &self,
        buffer: FieldBuffer<'_>,
        resume: Resume,
        data: &[T],
    ) -> error::Result<usize> {
        // SAFETY: kernels are only selected once their target features have
        // been detected at runtime.
        unsafe { (self.kernel)(self, buffer, resume, data) }
    }
}

/// # Safety
///
/// The CPU must support the instructions used by `V`.
#[inline(always)]
unsafe fn tokenize_blocks<T: Token, V: Lanes<T>>(
    tokenizer: &SimdTokenizer<T>,
    buffer: FieldBuffer<'_>,
    resume: Resume,
    data: &[T],
) -> error::Result<usize> {
    let len = data.len();
    let ptr = data.as_ptr();
    let mut emitter = Emitter::new(buffer, data, resume.start, tokenizer.escape.is_some());

    let delimiter = V::splat(tokenizer.delimiter);
    let quote = V::splat(tokenizer.quote);
    let newline = V::splat(tokenizer.newline);
    let escape = tokenizer.escape.map(|token| V::splat(token));
    let second = tokenizer
        .second_newline
        .map(|token| (token, V::splat(token)));
    let lookahead = second.is_some() as usize;

    let mut inside = false;
    let mut escape_carry = false;
    let mut skip_first = 0u64;
    let mut quotes: u32 = 0;
    let mut escapes: u32 = 0;
    let mut pos = resume.start;

    while pos + BLOCK + lookahead <= len && emitter.remaining() >= BLOCK {
        let block = ptr.add(pos);

        let (escape_bits, escaped) = match escape {
            Some(escape) => escape_classification(block_mask(block, escape), &mut escape_carry),
            None => (0, 0),
        };

        let quote_bits = block_mask(block, quote) & !escaped;
        let inside_bits = apply_quote_carry(V::prefix_xor(quote_bits), &mut inside);
        let outside = !(inside_bits | escaped);

        let delimiters = block_mask(block, delimiter) & outside;
        let mut newlines = block_mask(block, newline) & outside;
        let mut pairs = 0u64;

        if let Some((token, second)) = second {
            let seconds = block_mask(block, second) & outside & !skip_first;
            let next = (*ptr.add(pos + BLOCK) == token) as u64;

            pairs = newlines & ((seconds >> 1) | (next << 63));
            newlines |= seconds & !(pairs << 1);
            skip_first = pairs >> 63;
        }

        let mut bits = delimiters | newlines;
        let mut taken = 0u64;

        while bits != 0 {
            let bit = bits.trailing_zeros();
            bits &= bits - 1;

            let upto = u64::MAX >> (63 - bit);
            let segment = upto & !taken;
            let end = pos + bit as usize;

            let meta = if (delimiters >> bit) & 1 == 1 {
                Meta::delimiter(end)
            } else {
                Meta::eol(end, (pairs >> bit) & 1 == 1)
            };

            let pushed = emitter.push(
                meta,
                quotes + (quote_bits & segment).count_ones(),
                escapes + (escape_bits & segment).count_ones(),
            );

            if let Err(err) = pushed {
                return emitter.fail(err);
            }

            quotes = 0;
            escapes = 0;
            taken = upto;
        }

        quotes += (quote_bits & !taken).count_ones();
        escapes += (escape_bits & !taken).count_ones();
        pos += BLOCK;
    }

    Ok(emitter.written())
}

#[cfg(target_arch = "x86_64")]
mod x86_64 {
    use super::*;
    use crate::vector::x86_64::{Avx2, Sse2, Sse2Wide};

    #[target_feature(enable = "avx2,pclmulqdq")]
    pub(super) unsafe fn avx2(
        tokenizer: &SimdTokenizer<u8>,
        buffer: FieldBuffer<'_>,
        resume: Resume,
        data: &[u8],
    ) -> error::Result<usize> {
        tokenize_blocks::<u8, Avx2>(tokenizer, buffer, resume, data)
    }

    #[target_feature(enable = "sse2")]
    pub(super) unsafe fn sse2(
        tokenizer: &SimdTokenizer<u8>,
        buffer: FieldBuffer<'_>,
        resume: Resume,
        data: &[u8],
    ) -> error::Result<usize> {
        tokenize_blocks::<u8, Sse2>(tokenizer, buffer, resume, data)
    }

    #[target_feature(enable = "sse2")]
    pub(super) unsafe fn sse2_wide(
        tokenizer: &SimdTokenizer<u16>,
        buffer: FieldBuffer<'_>,
        resume: Resume,
        data: &[u16],
    ) -> error::Result<usize> {
        tokenize_blocks::<u16, Sse2Wide>(tokenizer, buffer, resume, data)
    }
}

#[cfg(target_arch = "aarch64")]
mod aarch64 {
    use super::*;
    use crate::vector::aarch64::{Neon, NeonWide};

    #[target_feature(enable = "neon")]
    pub(super) unsafe fn neon(
        tokenizer: &SimdTokenizer<u8>,
        buffer: FieldBuffer<'_>,
        resume: Resume,
        data: &[u8],
    ) -> error::Result<usize> {
        tokenize_blocks::<u8, Neon>(tokenizer, buffer, resume, data)
    }

    #[target_feature(enable = "neon")]
    pub(super) unsafe fn neon_wide(
        tokenizer: &SimdTokenizer<u16>,
        buffer: FieldBuffer<'_>,
        resume: Resume,
        data: &[u16],
    ) -> error::Result<usize> {
        tokenize_blocks::<u16, NeonWide>(tokenizer, buffer, resume, data)
    }
}

pub(crate) fn kernel_u8() -> Option<(&'static str, Kernel<u8>)> {
    #[cfg(target_arch = "x86_64")]
    {
        if is_x86_feature_detected!("avx2") && is_x86_feature_detected!("pclmulqdq") {
            return Some(("avx2", x86_64::avx2 as Kernel<u8>));
        }

        Some(("sse2", x86_64::sse2 as Kernel<u8>))
    }

    #[cfg(target_arch = "aarch64")]
    {
        Some(("neon", aarch64::neon as Kernel<u8>))
    }

    #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
    {
        None
    }
}

pub(crate) fn kernel_u16() -> Option<(&'static str, Kernel<u16>)> {
    #[cfg(target_arch = "x86_64")]
    {
        Some(("sse2", x86_64::sse2_wide as Kernel<u16>))
    }

    #[cfg(target_arch = "aarch64")]
    {
        Some(("neon", aarch64::neon_wide as Kernel<u16>))
    }

    #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
    {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bits::tests::Rng;
    use crate::dialect::{Newline, Trimming};
    use crate::meta::Special;
    use crate::scalar::tests::{escape_dialect, RECORD_START};
    use crate::scalar::ScalarTokenizer;
    use crate::tokenizer::tests::Fields;
    use crate::vector::portable::Portable;

    unsafe fn portable<T: Token>(
        tokenizer: &SimdTokenizer<T>,
        buffer: FieldBuffer<'_>,
        resume: Resume,
        data: &[T],
    ) -> error::Result<usize> {
        tokenize_blocks::<T, Portable<T>>(tokenizer, buffer, resume, data)
    }

    fn kernels<T: Token>() -> Vec<(&'static str, Kernel<T>)> {
        let mut kernels = vec![("portable", portable::<T> as Kernel<T>)];
        kernels.extend(T::simd_kernel());
        kernels
    }

    type Boundaries = Vec<(Meta, Special)>;

    fn collect(fields: &Fields, written: usize, into: &mut Boundaries) -> Resume {
        into.extend(
            fields.fields[..written]
                .iter()
                .copied()
                .zip(fields.specials[..written].iter().copied()),
        );

        let last = fields.fields[written - 1];

        Resume {
            start: last.next_start(),
            at_record_start: last.is_eol(),
        }
    }

    fn scalar<T: Token>(dialect: &Dialect<T>, data: &[T]) -> error::Result<Boundaries> {
        let tokenizer = ScalarTokenizer::new(dialect);
        let mut fields = Fields::new(data.len() + 1);
        let mut boundaries = Vec::new();
        let mut resume = RECORD_START;

        // More than one pass only happens when an error was deferred
        loop {
            let written = tokenizer.tokenize(fields.buffer(), resume, data, false)?;

            if written == 0 {
                return Ok(boundaries);
            }

            resume = collect(&fields, written, &mut boundaries);
        }
    }

    /// Alternates block passes & scalar passes the way the reader does, with
    /// a small buffer to force many resumptions.
    fn mixed<T: Token>(
        tokenizer: &SimdTokenizer<T>,
        dialect: &Dialect<T>,
        data: &[T],
        capacity: usize,
    ) -> error::Result<Boundaries> {
        let fallback = ScalarTokenizer::new(dialect);
        let mut fields = Fields::new(capacity);
        let mut boundaries = Vec::new();
        let mut resume = RECORD_START;

        loop {
            let mut written = tokenizer.tokenize(fields.buffer(), resume, data)?;

            if written == 0 {
                written = fallback.tokenize(fields.buffer(), resume, data, false)?;
            }

            if written == 0 {
                break;
            }

            resume = collect(&fields, written, &mut boundaries);
        }

        Ok(boundaries)
    }

    fn check<T: Token>(dialect: &Dialect<T>, data: &[T], capacity: usize) {
        let expected = scalar(dialect, data);

        for (name, kernel) in kernels::<T>() {
            let tokenizer = SimdTokenizer::with_kernel(dialect, name, kernel);

            // A single block pass must produce a prefix of the scalar output
            let mut fields = Fields::new(data.len() + BLOCK);
            let single = tokenizer.tokenize(fields.buffer(), RECORD_START, data);

            match (&expected, single) {
                (Ok(expected), Ok(written)) => {
                    assert!(written <= expected.len(), "kernel {}", name);

                    for i in 0..written {
                        assert_eq!(
                            (fields.fields[i], fields.specials[i]),
                            expected[i],
                            "kernel {}, boundary {} of {:?}",
                            name,
                            i,
                            T::render(data)
                        );
                    }
                }
                (Ok(_), Err(err)) => panic!("kernel {} failed alone: {}", name, err),
                (Err(_), _) => (),
            }

            match (&expected, mixed(&tokenizer, dialect, data, capacity)) {
                (Ok(expected), Ok(boundaries)) => assert_eq!(
                    &boundaries,
                    expected,
                    "kernel {} on {:?}",
                    name,
                    T::render(data)
                ),
                (Err(_), Err(_)) => (),
                (expected, found) => panic!(
                    "kernel {} disagrees on {:?}: {:?} vs {:?}",
                    name,
                    T::render(data),
                    expected.as_ref().map(|b| b.len()),
                    found.map(|b| b.len())
                ),
            }
        }
    }

    fn random_data(rng: &mut Rng, alphabet: &[u8], len: usize) -> Vec<u8> {
        (0..len)
            .map(|_| {
                // Plain tokens are over-represented to get realistic fields
                if rng.below(3) == 0 {
                    b'x'
                } else {
                    alphabet[rng.below(alphabet.len())]
                }
            })
            .collect()
    }

    #[test]
    fn test_example() {
        let data = b"1,\"hello, world\",3\r\na,b,c\r\n".repeat(20);

        check(&Dialect::default(), &data, 64);
        check(&Dialect::default(), &data, 200);
    }

    #[test]
    fn test_block_boundaries() {
        let dialect = Dialect::<u8>::default();

        // A two-token newline straddling two blocks
        let mut data = vec![b'a'; 63];
        data.extend_from_slice(b"\r\nb,c\r\n");
        data.extend(vec![b'x'; 130]);
        check(&dialect, &data, 64);

        // A quoted region spanning several blocks
        let mut data = b"\"".to_vec();
        data.extend(b"a,\n".repeat(60));
        data.extend_from_slice(b"\",b\n");
        data.extend(vec![b'x'; 130]);
        check(&dialect, &data, 64);

        // An escape at the end of a block
        let escape = escape_dialect();
        let mut data = vec![b'a'; 63];
        data.extend_from_slice(b"\\,b,c\n");
        data.extend(vec![b'x'; 130]);
        check(&escape, &data, 64);
    }

    #[test]
    fn test_random_u8() -> error::Result<()> {
        let mut rng = Rng::new(0x5eed);
        let lf = Dialect::new(b';', b'\'', None, Newline::lf(), Trimming::None, &[])?;
        let dialects = [
            (Dialect::default(), &b",\"\r\n "[..]),
            (escape_dialect(), &b",\"\r\n\\"[..]),
            (lf, &b";'\n\r,"[..]),
        ];

        for (dialect, alphabet) in dialects.iter() {
            for _ in 0..300 {
                let len = rng.below(700);
                let data = random_data(&mut rng, alphabet, len);
                let capacity = BLOCK + rng.below(100);

                check(dialect, &data, capacity);
            }
        }

        Ok(())
    }

    #[test]
    fn test_random_u16() {
        let mut rng = Rng::new(0xfeed);
        let dialect = Dialect::<u16>::default();

        for _ in 0..200 {
            let len = rng.below(500);
            let data = random_data(&mut rng, b",\"\r\n ", len)
                .into_iter()
                .map(|byte| match byte {
                    b'x' => 0xe9,
                    // Same low byte as the delimiter
                    b' ' => 0x12c,
                    _ => byte as u16,
                })
                .collect::<Vec<_>>();

            check(&dialect, &data, BLOCK + 7);
        }
    }

    #[test]
    fn test_full_buffer() -> error::Result<()> {
        let dialect = Dialect::<u8>::default();
        let data = b"a,".repeat(200);

        for (name, kernel) in kernels::<u8>() {
            let tokenizer = SimdTokenizer::with_kernel(&dialect, name, kernel);
            let mut fields = Fields::new(BLOCK + 10);

            // Only one block fits
            let written = tokenizer.tokenize(fields.buffer(), RECORD_START, &data)?;
            assert_eq!(written, 32);
            assert_eq!(fields.fields[31], Meta::delimiter(63));

            let mut fields = Fields::new(BLOCK - 1);
            assert_eq!(tokenizer.tokenize(fields.buffer(), RECORD_START, &data)?, 0);
        }

        Ok(())
    }

    #[test]
    fn test_non_ascii_dialect() -> error::Result<()> {
        let dialect = Dialect::new(0xa7u8, b'"', None, Newline::lf(), Trimming::None, &[])?;

        assert!(SimdTokenizer::new(&dialect).is_none());

        Ok(())
    }
}
