use crate::error::{self, Error, FormatError, FormatErrorKind};
use crate::meta::{Meta, Special};
use crate::token::Token;

/// Write space handed to a tokenizer pass.
#[derive(Debug)]
pub(crate) struct FieldBuffer<'a> {
    pub(crate) fields: &'a mut [Meta],
    pub(crate) specials: &'a mut [Special],
}

/// Where a tokenizer pass must resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Resume {
    /// Offset of the first token not yet attributed to a field.
    pub(crate) start: usize,
    /// Whether `start` is the beginning of a record.
    pub(crate) at_record_start: bool,
}

/// Writes field boundaries found by a tokenizer pass.
pub(crate) struct Emitter<'a, 'd, T> {
    buffer: FieldBuffer<'a>,
    data: &'d [T],
    escape_mode: bool,
    written: usize,
    field_start: usize,
}

impl<'a, 'd, T: Token> Emitter<'a, 'd, T> {
    #[inline]
    pub(crate) fn new(buffer: FieldBuffer<'a>, data: &'d [T], start: usize, escape_mode: bool) -> Self {
        debug_assert_eq!(buffer.fields.len(), buffer.specials.len());

        Self {
            buffer,
            data,
            escape_mode,
            written: 0,
            field_start: start,
        }
    }

    #[inline(always)]
    pub(crate) fn written(&self) -> usize {
        self.written
    }

    #[inline(always)]
    pub(crate) fn remaining(&self) -> usize {
        self.buffer.fields.len() - self.written
    }

    #[inline(always)]
    pub(crate) fn is_full(&self) -> bool {
        self.written == self.buffer.fields.len()
    }

    /// Start of the field currently being scanned.
    #[inline(always)]
    pub(crate) fn field_start(&self) -> usize {
        self.field_start
    }

    #[inline(always)]
    pub(crate) fn push(&mut self, meta: Meta, quotes: u32, escapes: u32) -> error::Result<()> {
        debug_assert!(!self.is_full());

        let special = if escapes == 0 {
            Special::quotes(quotes)
        } else if quotes == 0 || quotes == 2 {
            debug_assert!(self.escape_mode);
            Special::escapes(escapes)
        } else {
            return Err(self
                .error(FormatErrorKind::InvalidEscapedField { quotes }, meta.end())
                .into());
        };

        self.buffer.fields[self.written] = meta;
        self.buffer.specials[self.written] = special;
        self.written += 1;
        self.field_start = meta.next_start();

        Ok(())
    }

    /// Ends the pass on `err`, unless boundaries were already written: those
    /// get committed first and the next pass, resuming right at the
    /// offending field, reports the error.
    #[cold]
    pub(crate) fn fail(&self, err: Error) -> error::Result<usize> {
        if self.written > 0 {
            return Ok(self.written);
        }

        Err(err)
    }

    /// Error about the field currently being scanned, ending at `end`.
    #[cold]
    pub(crate) fn error(&self, kind: FormatErrorKind, end: usize) -> FormatError {
        let end = end.min(self.data.len());
        let start = self.field_start.min(end);

        FormatError::new(kind, T::render(&self.data[start..end])).at(start as u64)
    }
}
