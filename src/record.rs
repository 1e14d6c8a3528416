use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Index;

use crate::debug;
use crate::dialect::Dialect;
use crate::error::{self, FormatError, FormatErrorKind};
use crate::meta::{Meta, Special};
use crate::token::Token;
use crate::unescape::{count_escapes, unescape_escaped, unescape_rfc4180};

/// A view of the current record of a [`Reader`](crate::Reader), borrowing
/// its buffers until the next read.
///
/// Fields are only unquoted and unescaped when accessed, and only fields
/// actually containing quotes or escapes are copied, into a scratch buffer
/// owned by the reader.
pub struct Record<'r, T: Token> {
    window: &'r [T],
    metas: &'r [Meta],
    specials: &'r [Special],
    dialect: &'r Dialect<T>,
    scratch: &'r mut Vec<T>,
    position: u64,
    index: u64,
}

impl<'r, T: Token> Record<'r, T> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        window: &'r [T],
        metas: &'r [Meta],
        specials: &'r [Special],
        dialect: &'r Dialect<T>,
        scratch: &'r mut Vec<T>,
        position: u64,
        index: u64,
    ) -> Self {
        debug_assert!(metas.len() >= 2 && metas.len() == specials.len());

        Self {
            window,
            metas,
            specials,
            dialect,
            scratch,
            position,
            index,
        }
    }

    /// Number of fields of the record.
    #[inline]
    pub fn len(&self) -> usize {
        self.metas.len() - 1
    }

    /// Always `false`: an empty line still is a record with a single empty
    /// field.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline(always)]
    fn bounds(&self, index: usize) -> (usize, usize) {
        (self.metas[index].next_start(), self.metas[index + 1].end())
    }

    /// Absolute token offset of the start of the record.
    #[inline]
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Zero-based index of the record in the stream.
    #[inline]
    pub fn index(&self) -> u64 {
        self.index
    }

    /// Returns the nth field as found in the data, quotes & escapes
    /// included, if it is not out-of-bounds.
    #[inline]
    pub fn raw_field(&self, index: usize) -> Option<&'r [T]> {
        if index >= self.len() {
            return None;
        }

        let (start, end) = self.bounds(index);

        Some(&self.window[start..end])
    }

    /// Returns the whole record, without its newline.
    #[inline]
    pub fn as_slice(&self) -> &'r [T] {
        let start = self.metas[0].next_start();
        let end = self.metas[self.len()].end();

        &self.window[start..end]
    }

    /// Returns the whole record, with its newline when it has one.
    #[inline]
    pub fn as_slice_with_newline(&self) -> &'r [T] {
        let start = self.metas[0].next_start();
        let last = self.metas[self.len()];
        let end = (last.end() + last.newline_len()).min(self.window.len());

        &self.window[start..end]
    }

    /// Returns the nth field, trimmed, unquoted and unescaped according to
    /// the reader's dialect, if it is not out-of-bounds.
    pub fn field(&mut self, index: usize) -> error::Result<Option<&[T]>> {
        if index >= self.len() {
            return Ok(None);
        }

        self.decode(index).map(Some)
    }

    fn decode(&mut self, index: usize) -> error::Result<&[T]> {
        let (start, end) = self.bounds(index);
        let raw = &self.window[start..end];
        let (trim_start, trim_end) = self.dialect.trim_bounds(raw);
        let field = &raw[trim_start..trim_end];
        let special = self.specials[index + 1];

        if special.is_plain() {
            return Ok(field);
        }

        let decoded = if special.is_escape() {
            decode_escaped(field, special, self.dialect, self.scratch)
        } else {
            decode_quoted(field, special, self.dialect.quote(), self.scratch)
        };

        decoded.map_err(|kind| {
            let position = self.position + (start + trim_start - self.metas[0].next_start()) as u64;

            FormatError::new(kind, T::render(field)).at(position).into()
        })
    }

    /// Decodes every field into an [`OwnedRecord`].
    pub fn to_owned_record(&mut self) -> error::Result<OwnedRecord<T>> {
        let mut record = OwnedRecord::with_capacity(self.as_slice().len(), self.len());

        for i in 0..self.len() {
            record.push_field(self.decode(i)?);
        }

        Ok(record)
    }
}

impl<T: Token> fmt::Debug for Record<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Record(")?;
        f.debug_list()
            .entries((0..self.len()).filter_map(|i| self.raw_field(i).map(debug::Tokens)))
            .finish()?;
        write!(f, ")")
    }
}

fn decode_quoted<'a, T: Token>(
    field: &'a [T],
    special: Special,
    quote: T,
    scratch: &'a mut Vec<T>,
) -> Result<&'a [T], FormatErrorKind> {
    let len = field.len();

    if len < 2 || field[0] != quote || field[len - 1] != quote {
        return Err(FormatErrorKind::InvalidQuotedField);
    }

    let inner = &field[1..len - 1];
    let quotes = match special.count() {
        Some(2) => return Ok(inner),
        Some(count) => count - 2,
        None => T::count(quote, inner) as u32,
    };

    scratch.clear();
    scratch.resize(inner.len(), T::default());

    let written = unescape_rfc4180(inner, scratch, quote, quotes)?;

    Ok(&scratch[..written])
}

fn decode_escaped<'a, T: Token>(
    field: &'a [T],
    special: Special,
    dialect: &Dialect<T>,
    scratch: &'a mut Vec<T>,
) -> Result<&'a [T], FormatErrorKind> {
    let quote = dialect.quote();
    let len = field.len();

    // Escape dialects only support wrapping quotes
    let inner = if len > 0 && field[0] == quote {
        if len < 2 || field[len - 1] != quote {
            return Err(FormatErrorKind::InvalidQuotedField);
        }

        &field[1..len - 1]
    } else {
        field
    };

    let escape = match dialect.escape() {
        Some(escape) => escape,
        None => return Ok(inner),
    };

    let escapes = match special.count() {
        Some(count) => count,
        None => count_escapes(inner, escape),
    };

    scratch.clear();
    scratch.resize(inner.len(), T::default());

    let written = unescape_escaped(inner, scratch, escape, escapes)?;

    Ok(&scratch[..written])
}

/// An owned record, able to outlive the reader it was read from.
#[derive(Default, Clone)]
pub struct OwnedRecord<T> {
    data: Vec<T>,
    bounds: Vec<(usize, usize)>,
}

impl<T: Token> OwnedRecord<T> {
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            bounds: Vec::new(),
        }
    }

    pub fn with_capacity(data: usize, fields: usize) -> Self {
        Self {
            data: Vec::with_capacity(data),
            bounds: Vec::with_capacity(fields),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bounds.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn clear(&mut self) {
        self.data.clear();
        self.bounds.clear();
    }

    #[inline]
    pub fn push_field(&mut self, field: &[T]) {
        let start = self.data.len();
        self.data.extend_from_slice(field);
        self.bounds.push((start, self.data.len()));
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&[T]> {
        self.bounds
            .get(index)
            .map(|(start, end)| &self.data[*start..*end])
    }

    #[inline]
    pub fn iter(&self) -> OwnedRecordIter<'_, T> {
        OwnedRecordIter {
            record: self,
            current_forward: 0,
            current_backward: self.len(),
        }
    }
}

impl<T: Token> PartialEq for OwnedRecord<T> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other.iter()).all(|(a, b)| a == b)
    }
}

impl<T: Token> Eq for OwnedRecord<T> {}

impl<T: Token + Hash> Hash for OwnedRecord<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.len());

        for field in self.iter() {
            field.hash(state);
        }
    }
}

impl<T: Token> Index<usize> for OwnedRecord<T> {
    type Output = [T];

    #[inline]
    fn index(&self, i: usize) -> &[T] {
        let (start, end) = self.bounds[i];
        &self.data[start..end]
    }
}

impl<T: Token, F: AsRef<[T]>> Extend<F> for OwnedRecord<T> {
    fn extend<I: IntoIterator<Item = F>>(&mut self, iter: I) {
        for field in iter {
            self.push_field(field.as_ref());
        }
    }
}

impl<T: Token, F: AsRef<[T]>> FromIterator<F> for OwnedRecord<T> {
    fn from_iter<I: IntoIterator<Item = F>>(iter: I) -> Self {
        let mut record = Self::new();
        record.extend(iter);
        record
    }
}

impl<'r, T: Token> IntoIterator for &'r OwnedRecord<T> {
    type IntoIter = OwnedRecordIter<'r, T>;
    type Item = &'r [T];

    #[inline]
    fn into_iter(self) -> OwnedRecordIter<'r, T> {
        self.iter()
    }
}

impl<T: Token> fmt::Debug for OwnedRecord<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "OwnedRecord(")?;
        f.debug_list().entries(self.iter().map(debug::Tokens)).finish()?;
        write!(f, ")")
    }
}

pub struct OwnedRecordIter<'a, T> {
    record: &'a OwnedRecord<T>,
    current_forward: usize,
    current_backward: usize,
}

impl<T: Token> ExactSizeIterator for OwnedRecordIter<'_, T> {}

impl<'a, T: Token> Iterator for OwnedRecordIter<'a, T> {
    type Item = &'a [T];

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        if self.current_forward == self.current_backward {
            None
        } else {
            let (start, end) = self.record.bounds[self.current_forward];

            self.current_forward += 1;

            Some(&self.record.data[start..end])
        }
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let size = self.current_backward - self.current_forward;

        (size, Some(size))
    }
}

impl<T: Token> DoubleEndedIterator for OwnedRecordIter<'_, T> {
    #[inline]
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.current_forward == self.current_backward {
            None
        } else {
            self.current_backward -= 1;

            let (start, end) = self.record.bounds[self.current_backward];

            Some(&self.record.data[start..end])
        }
    }
}
