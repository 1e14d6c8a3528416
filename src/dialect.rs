use crate::error::{self, Error, ErrorKind};
use crate::token::Token;

/// The sequence of tokens ending a record.
///
/// With a two-token newline, a lone first or second token is also accepted as
/// a record end, so that the default `\r\n` dialect is able to read files
/// using `\n` or `\r` only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Newline<T> {
    One(T),
    Two(T, T),
}

impl<T: Token> Newline<T> {
    /// A single `\n`.
    pub fn lf() -> Self {
        Self::One(T::from_ascii(b'\n'))
    }

    /// `\r\n`, also accepting lone `\r` and `\n`.
    pub fn crlf() -> Self {
        Self::Two(T::from_ascii(b'\r'), T::from_ascii(b'\n'))
    }

    #[inline(always)]
    pub fn first(&self) -> T {
        match *self {
            Self::One(first) | Self::Two(first, _) => first,
        }
    }

    #[inline(always)]
    pub fn second(&self) -> Option<T> {
        match *self {
            Self::One(_) => None,
            Self::Two(_, second) => Some(second),
        }
    }

    /// Number of tokens of the full newline sequence.
    #[inline(always)]
    pub fn len(&self) -> usize {
        match self {
            Self::One(_) => 1,
            Self::Two(..) => 2,
        }
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Which unquoted field boundaries get stripped of whitespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Trimming {
    #[default]
    None,
    Leading,
    Trailing,
    Both,
}

impl Trimming {
    #[inline(always)]
    fn leading(self) -> bool {
        matches!(self, Self::Leading | Self::Both)
    }

    #[inline(always)]
    fn trailing(self) -> bool {
        matches!(self, Self::Trailing | Self::Both)
    }
}

/// An immutable and validated description of a CSV format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dialect<T> {
    delimiter: T,
    quote: T,
    escape: Option<T>,
    newline: Newline<T>,
    trimming: Trimming,
    whitespace: Vec<T>,
}

impl<T: Token> Default for Dialect<T> {
    fn default() -> Self {
        Self {
            delimiter: T::from_ascii(b','),
            quote: T::from_ascii(b'"'),
            escape: None,
            newline: Newline::crlf(),
            trimming: Trimming::None,
            whitespace: vec![T::from_ascii(b' ')],
        }
    }
}

fn invalid<T>(msg: String) -> error::Result<T> {
    Err(Error::new(ErrorKind::InvalidDialect(msg)))
}

impl<T: Token> Dialect<T> {
    /// Validate and build a new [`Dialect`].
    ///
    /// Delimiter, quote, escape and newline tokens must all be distinct, must
    /// not be `\0`, and must not appear in the whitespace set. `\r` and `\n` can
    /// only be used as newline tokens.
    pub fn new(
        delimiter: T,
        quote: T,
        escape: Option<T>,
        newline: Newline<T>,
        trimming: Trimming,
        whitespace: &[T],
    ) -> error::Result<Self> {
        let nul = T::from_ascii(b'\0');
        let cr = T::from_ascii(b'\r');
        let lf = T::from_ascii(b'\n');

        let mut named = vec![("delimiter", delimiter), ("quote", quote)];

        if let Some(escape) = escape {
            named.push(("escape", escape));
        }

        for &(name, token) in named.iter() {
            if token == cr || token == lf {
                return invalid(format!("{} cannot be a newline character", name));
            }
        }

        named.push(("newline", newline.first()));

        if let Some(second) = newline.second() {
            named.push(("second newline", second));
        }

        for (i, &(name, token)) in named.iter().enumerate() {
            if token == nul {
                return invalid(format!("{} cannot be the null character", name));
            }

            if let Some(&(other, _)) = named[..i].iter().find(|(_, t)| *t == token) {
                return invalid(format!("{} and {} must be different", other, name));
            }

            if whitespace.contains(&token) {
                return invalid(format!("{} cannot be part of the whitespace set", name));
            }
        }

        Ok(Self {
            delimiter,
            quote,
            escape,
            newline,
            trimming,
            whitespace: whitespace.to_vec(),
        })
    }

    #[inline(always)]
    pub fn delimiter(&self) -> T {
        self.delimiter
    }

    #[inline(always)]
    pub fn quote(&self) -> T {
        self.quote
    }

    #[inline(always)]
    pub fn escape(&self) -> Option<T> {
        self.escape
    }

    #[inline(always)]
    pub fn newline(&self) -> Newline<T> {
        self.newline
    }

    #[inline(always)]
    pub fn trimming(&self) -> Trimming {
        self.trimming
    }

    pub fn whitespace(&self) -> &[T] {
        &self.whitespace
    }

    /// Returns whether every structural token is ASCII, which is required by
    /// the SIMD tokenizer.
    pub fn is_ascii(&self) -> bool {
        self.delimiter.is_ascii()
            && self.quote.is_ascii()
            && self.escape.map_or(true, |e| e.is_ascii())
            && self.newline.first().is_ascii()
            && self.newline.second().map_or(true, |s| s.is_ascii())
    }

    /// Bounds of `field` once configured whitespace has been trimmed.
    #[inline]
    pub(crate) fn trim_bounds(&self, field: &[T]) -> (usize, usize) {
        let mut start = 0;
        let mut end = field.len();

        if self.trimming == Trimming::None || self.whitespace.is_empty() {
            return (start, end);
        }

        if self.trimming.leading() {
            while start < end && self.whitespace.contains(&field[start]) {
                start += 1;
            }
        }

        if self.trimming.trailing() {
            while end > start && self.whitespace.contains(&field[end - 1]) {
                end -= 1;
            }
        }

        (start, end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dialect(delimiter: u8, quote: u8, escape: Option<u8>) -> error::Result<Dialect<u8>> {
        Dialect::new(
            delimiter,
            quote,
            escape,
            Newline::crlf(),
            Trimming::None,
            b" ",
        )
    }

    #[test]
    fn test_validation() {
        assert!(dialect(b',', b'"', None).is_ok());
        assert!(dialect(b';', b'\'', Some(b'\\')).is_ok());
        assert!(dialect(b',', b',', None).is_err());
        assert!(dialect(b',', b'"', Some(b'"')).is_err());
        assert!(dialect(b',', b'"', Some(b',')).is_err());
        assert!(dialect(b'\n', b'"', None).is_err());
        assert!(dialect(b' ', b'"', None).is_err());
        assert!(dialect(b'\0', b'"', None).is_err());

        let err = Dialect::<u8>::new(
            b',',
            b'"',
            None,
            Newline::Two(b'\n', b'\n'),
            Trimming::None,
            &[],
        )
        .unwrap_err();

        assert!(matches!(err.kind(), ErrorKind::InvalidDialect(_)));
    }

    #[test]
    fn test_is_ascii() -> error::Result<()> {
        assert!(Dialect::<u8>::default().is_ascii());
        assert!(!dialect(0xa7, b'"', None)?.is_ascii());

        let utf16 = Dialect::<u16>::new(
            '§' as u16,
            b'"' as u16,
            None,
            Newline::lf(),
            Trimming::None,
            &[],
        )?;

        assert!(!utf16.is_ascii());

        Ok(())
    }

    #[test]
    fn test_trim_bounds() -> error::Result<()> {
        let both = Dialect::new(b',', b'"', None, Newline::lf(), Trimming::Both, b" \t")?;
        let leading = Dialect::new(b',', b'"', None, Newline::lf(), Trimming::Leading, b" ")?;

        assert_eq!(both.trim_bounds(b" \t\"a b\" "), (2, 7));
        assert_eq!(both.trim_bounds(b"   "), (3, 3));
        assert_eq!(leading.trim_bounds(b"  a  "), (2, 5));
        assert_eq!(Dialect::<u8>::default().trim_bounds(b" a "), (0, 3));

        Ok(())
    }
}
