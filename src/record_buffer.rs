use crate::error::{self, Error, ErrorKind};
use crate::meta::{Meta, Special};
use crate::tokenizer::{FieldBuffer, Resume};

/// Default number of field boundaries the buffer can hold before growing.
pub(crate) const DEFAULT_FIELD_CAPACITY: usize = 4096;

/// Default ceiling on the number of fields of a single record.
pub const DEFAULT_MAX_RECORD_FIELDS: usize = 1 << 20;

/// Amount of write space under which a tokenizer pass would be wasted.
pub(crate) const MIN_UNREAD: usize = crate::vector::BLOCK;

/// A complete record: `fields[start]` is the boundary preceding it and
/// `fields[end]` its record end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RecordView {
    pub(crate) start: usize,
    pub(crate) end: usize,
}

impl RecordView {
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.end - self.start
    }
}

/// Accumulates field boundaries across tokenizer passes and hands out
/// complete records.
///
/// `fields[0]` always is the boundary preceding the first unread field of
/// the window: either the start sentinel, or the end of the last popped
/// record. Committed boundaries live in `fields[1..=field_count]`.
#[derive(Debug)]
pub(crate) struct RecordBuffer {
    fields: Vec<Meta>,
    specials: Vec<Special>,
    eols: Vec<usize>,
    eol_index: usize,
    field_index: usize,
    field_count: usize,
    max_fields: usize,
}

impl RecordBuffer {
    pub(crate) fn with_capacity(capacity: usize, max_fields: usize) -> Self {
        let capacity = capacity.max(MIN_UNREAD + 1);

        Self {
            fields: vec![Meta::START; capacity],
            specials: vec![Special::PLAIN; capacity],
            eols: Vec::new(),
            eol_index: 0,
            field_index: 0,
            field_count: 0,
            max_fields: max_fields.max(1),
        }
    }

    #[cfg(test)]
    pub(crate) fn capacity(&self) -> usize {
        self.fields.len()
    }

    /// Number of committed boundaries not yet popped as part of a record.
    #[inline]
    pub(crate) fn pending(&self) -> usize {
        self.field_count - self.field_index
    }

    fn grow(&mut self, len: usize) {
        tracing::debug!(from = self.fields.len(), to = len, "growing record buffer");

        self.fields.resize(len, Meta::START);
        self.specials.resize(len, Special::PLAIN);
    }

    /// Write space for the next tokenizer pass, holding at least `min`
    /// boundaries, and where that pass must resume.
    pub(crate) fn unread(&mut self, min: usize) -> (FieldBuffer<'_>, Resume) {
        let start = self.field_count + 1;

        if self.fields.len() - start < min {
            self.grow((self.fields.len() * 2).max(start + min));
        }

        let resume = self.resume();

        let buffer = FieldBuffer {
            fields: &mut self.fields[start..],
            specials: &mut self.specials[start..],
        };

        (buffer, resume)
    }

    /// Where the next tokenizer pass must resume.
    #[inline]
    pub(crate) fn resume(&self) -> Resume {
        let last = self.fields[self.field_count];

        Resume {
            start: last.next_start(),
            at_record_start: last.is_eol() || last.is_start(),
        }
    }

    /// Returns whether complete records are waiting to be popped.
    #[inline]
    pub(crate) fn has_records(&self) -> bool {
        self.eol_index < self.eols.len()
    }

    /// Commits `n` boundaries written by the last tokenizer pass.
    pub(crate) fn set_fields_read(&mut self, n: usize) {
        let start = self.field_count + 1;

        debug_assert!(start + n <= self.fields.len());

        for i in start..start + n {
            if self.fields[i].is_eol() {
                self.eols.push(i);
            }
        }

        self.field_count += n;
    }

    /// Pops the oldest complete record, if any.
    pub(crate) fn try_pop(&mut self) -> error::Result<Option<RecordView>> {
        let end = match self.eols.get(self.eol_index) {
            Some(end) => *end,
            None => return Ok(None),
        };

        let view = RecordView {
            start: self.field_index,
            end,
        };

        if view.len() > self.max_fields {
            return Err(Error::new(ErrorKind::TooManyFields {
                max: self.max_fields,
            }));
        }

        self.eol_index += 1;
        self.field_index = end;

        Ok(Some(view))
    }

    /// Boundaries & special counts of a popped record, sentinel included.
    #[inline]
    pub(crate) fn record(&self, view: RecordView) -> (&[Meta], &[Special]) {
        (
            &self.fields[view.start..=view.end],
            &self.specials[view.start..=view.end],
        )
    }

    /// Number of window tokens spanned by the records popped since the last
    /// reset.
    #[inline]
    pub(crate) fn consumed(&self) -> usize {
        self.fields[self.field_index].next_start()
    }

    /// Drops every popped record and rebases the pending boundaries on the
    /// start of the first unread field, returning that start, i.e. the number
    /// of window tokens no pending boundary refers to anymore.
    ///
    /// A record end located past the window (the one closing a last record
    /// without a newline) yields an offset the caller must clamp.
    pub(crate) fn reset(&mut self) -> usize {
        if self.field_index == 0 {
            return 0;
        }

        let offset = self.consumed();
        let pending = self.pending();

        for i in self.field_index + 1..=self.field_count {
            self.fields[i] = self.fields[i].shifted(offset);
        }

        let range = self.field_index + 1..=self.field_count;
        self.fields.copy_within(range.clone(), 1);
        self.specials.copy_within(range, 1);
        self.fields[0] = Meta::START;

        let shift = self.field_index;
        let unpopped = self.eols.len() - self.eol_index;

        self.eols.copy_within(self.eol_index.., 0);
        self.eols.truncate(unpopped);
        self.eols.iter_mut().for_each(|eol| *eol -= shift);

        self.eol_index = 0;
        self.field_index = 0;
        self.field_count = pending;

        offset
    }

    /// Grows the storage when the last pass stopped for lack of space
    /// without completing a record. Returns whether another pass is worth
    /// trying.
    pub(crate) fn ensure_capacity(&mut self) -> error::Result<bool> {
        if self.fields.len() - (self.field_count + 1) >= MIN_UNREAD {
            return Ok(false);
        }

        if self.pending() >= self.max_fields {
            return Err(Error::new(ErrorKind::TooManyFields {
                max: self.max_fields,
            }));
        }

        self.grow(self.fields.len() * 2);

        Ok(true)
    }

    /// Frees the storage. The buffer must not be used afterwards.
    pub(crate) fn release(&mut self) {
        self.clear();
        self.fields = Vec::new();
        self.specials = Vec::new();
        self.eols = Vec::new();
    }

    /// Forgets everything, keeping the allocated storage.
    pub(crate) fn clear(&mut self) {
        self.fields[0] = Meta::START;
        self.eols.clear();
        self.eol_index = 0;
        self.field_index = 0;
        self.field_count = 0;
    }
}
