use std::{error, fmt, io, result};

/// The specific kind of a [`FormatError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum FormatErrorKind {
    /// A quoted field was still open when the data ended.
    UnterminatedQuote,
    /// The data ended right after an escape token.
    DanglingEscape,
    /// A quote inside a quoted field was not doubled, or the field did not
    /// contain the expected number of quotes.
    QuoteCountMismatch {
        /// Number of quotes the tokenizer reported
        expected: u32,
        /// Number of quotes actually consumed
        actual: u32,
    },
    /// An escaped field did not contain the expected number of escapes, or
    /// contained an escape token in a position where it escapes nothing.
    EscapeCountMismatch {
        /// Number of escapes the tokenizer reported
        expected: u32,
        /// Number of escapes actually consumed
        actual: u32,
    },
    /// A field containing quotes was not wrapped in quotes.
    InvalidQuotedField,
    /// A field using escapes had a number of quotes other than 0 or 2.
    InvalidEscapedField {
        /// Number of unescaped quotes found in the field
        quotes: u32,
    },
}

/// A malformed piece of CSV data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatError {
    pub(crate) kind: FormatErrorKind,
    pub(crate) position: Option<u64>,
    pub(crate) field: String,
}

impl FormatError {
    pub(crate) fn new(kind: FormatErrorKind, field: String) -> Self {
        Self {
            kind,
            position: None,
            field,
        }
    }

    pub(crate) fn at(mut self, position: u64) -> Self {
        self.position = Some(position);
        self
    }

    /// Translates a position relative to a window into an absolute one.
    pub(crate) fn offset_by(mut self, base: u64) -> Self {
        self.position = self.position.map(|position| position + base);
        self
    }

    /// Return the kind of malformation.
    pub fn kind(&self) -> FormatErrorKind {
        self.kind
    }

    /// Return the absolute token offset of the offending field, if known.
    pub fn position(&self) -> Option<u64> {
        self.position
    }

    /// Return a lossy rendering of the offending field.
    pub fn field(&self) -> &str {
        &self.field
    }
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.kind {
            FormatErrorKind::UnterminatedQuote => write!(f, "unterminated quoted field")?,
            FormatErrorKind::DanglingEscape => write!(f, "field ends with a dangling escape")?,
            FormatErrorKind::QuoteCountMismatch { expected, actual } => write!(
                f,
                "quote count was invalid (expected {}, actual was {})",
                expected, actual
            )?,
            FormatErrorKind::EscapeCountMismatch { expected, actual } => write!(
                f,
                "escape count was invalid (expected {}, actual was {})",
                expected, actual
            )?,
            FormatErrorKind::InvalidQuotedField => {
                write!(f, "field containing quotes is not wrapped in quotes")?
            }
            FormatErrorKind::InvalidEscapedField { quotes } => write!(
                f,
                "field with escapes must have 0 or 2 quotes, found {}",
                quotes
            )?,
        }

        if let Some(position) = self.position {
            write!(f, " at position {}", position)?;
        }

        write!(f, ", field was: [{}]", self.field)
    }
}

/// The specific type of an error.
#[derive(Debug)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Wrap a [std::io::Error].
    Io(io::Error),

    /// Malformed CSV data.
    Format(FormatError),

    /// Indicate that a non-flexible reader attempted to read a record having
    /// an incorrect number of fields.
    UnequalLengths {
        /// Expected number of fields
        expected_len: usize,
        /// Actual and incorrect number of fields observed
        len: usize,
        /// Optional position `(token_offset, record_index)`
        pos: Option<(u64, u64)>,
    },

    /// The configured dialect is not usable.
    InvalidDialect(String),

    /// A single record has more fields than the configured ceiling.
    TooManyFields {
        /// Configured ceiling
        max: usize,
    },

    /// A single record does not fit in the largest representable window.
    RecordTooLong {
        /// Number of buffered tokens without any record boundary
        len: usize,
    },

    /// The reader was used after being disposed.
    Disposed,

    /// The underlying source cannot be rewound.
    ResetUnsupported,
}

/// An error occurring when reading CSV data.
#[derive(Debug)]
pub struct Error(ErrorKind);

impl Error {
    pub(crate) fn new(kind: ErrorKind) -> Self {
        Self(kind)
    }

    /// Return whether the wrapped error is a [`std::io::Error`].
    pub fn is_io_error(&self) -> bool {
        matches!(self.0, ErrorKind::Io(_))
    }

    /// Return whether the error comes from malformed data.
    pub fn is_format_error(&self) -> bool {
        matches!(
            self.0,
            ErrorKind::Format(_) | ErrorKind::UnequalLengths { .. }
        )
    }

    /// Return a reference to the underlying [`ErrorKind`].
    pub fn kind(&self) -> &ErrorKind {
        &self.0
    }

    /// Unwraps the error into its underlying [`ErrorKind`].
    pub fn into_kind(self) -> ErrorKind {
        self.0
    }

    pub(crate) fn offset_by(self, base: u64) -> Self {
        match self.0 {
            ErrorKind::Format(err) => Self(ErrorKind::Format(err.offset_by(base))),
            kind => Self(kind),
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Self(ErrorKind::Io(err))
    }
}

impl From<FormatError> for Error {
    fn from(err: FormatError) -> Self {
        Self(ErrorKind::Format(err))
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        match err.0 {
            ErrorKind::Io(err) => err,
            _ => Self::new(io::ErrorKind::InvalidData, err),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self.0 {
            ErrorKind::Io(ref err) => Some(err),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.0 {
            ErrorKind::Io(ref err) => err.fmt(f),
            ErrorKind::Format(ref err) => write!(f, "CSV error: {}", err),
            ErrorKind::UnequalLengths {
                expected_len,
                len,
                pos: Some((offset, index)),
            } => write!(
                f,
                "CSV error: record {} (position: {}): found record with {} fields, but the previous record has {} fields",
                index, offset, len, expected_len
            ),
            ErrorKind::UnequalLengths {
                expected_len,
                len,
                pos: None,
            } => write!(
                f,
                "CSV error: found record with {} fields, but the previous record has {} fields",
                len, expected_len
            ),
            ErrorKind::InvalidDialect(ref msg) => write!(f, "CSV error: invalid dialect: {}", msg),
            ErrorKind::TooManyFields { max } => write!(
                f,
                "CSV error: record has more than {} fields, raise the reader's field ceiling to read it",
                max
            ),
            ErrorKind::RecordTooLong { len } => write!(
                f,
                "CSV error: found no record boundary in {} buffered tokens",
                len
            ),
            ErrorKind::Disposed => write!(f, "CSV error: reader has been disposed"),
            ErrorKind::ResetUnsupported => {
                write!(f, "CSV error: underlying source cannot be rewound")
            }
        }
    }
}

/// A type alias for `Result<T, simd_csv_tokenizer::Error>`.
pub type Result<T> = result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = Error::from(
            FormatError::new(FormatErrorKind::UnterminatedQuote, "\"b\"\"".to_string()).at(2),
        );

        assert!(err.is_format_error());
        assert_eq!(
            err.to_string(),
            "CSV error: unterminated quoted field at position 2, field was: [\"b\"\"]"
        );

        let io_err: io::Error = Error::new(ErrorKind::Disposed).into();
        assert_eq!(io_err.kind(), io::ErrorKind::InvalidData);
    }
}
