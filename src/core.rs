//! Sans-IO reader core, shared by the sync and async frontends.
//!
//! The core never touches the source itself. Frontends alternate between
//! [`CoreReader::try_read_line`], which only works on what is already
//! buffered, and a pull made of [`CoreReader::begin_pull`], the source's
//! own advance & fill, and [`CoreReader::end_pull`]. Pulling is therefore
//! the only place where a frontend may block or suspend.
use crate::dialect::Dialect;
use crate::error::{self, Error, ErrorKind};
use crate::meta::MAX_FIELD_END;
use crate::record::Record;
use crate::record_buffer::{RecordBuffer, RecordView, DEFAULT_FIELD_CAPACITY, MIN_UNREAD};
use crate::scalar::ScalarTokenizer;
use crate::simd::{SimdTokenizer, PREFERRED_REMAINING};
use crate::token::Token;

/// Lifecycle of a reader.
///
/// States are ordered: a reader only ever moves forward, except between
/// [`Reading`](Self::Reading) & [`DataExhausted`](Self::DataExhausted), and
/// when rewound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ReaderState {
    /// Nothing was pulled yet.
    Initialized,
    /// The window holds data that was not entirely tokenized.
    Reading,
    /// More data must be pulled before any progress can be made.
    DataExhausted,
    /// The source is completed, the window still has to be drained.
    ReaderCompleted,
    /// Everything was tokenized, no more records will be read.
    ReadToEnd,
    /// The reader was disposed of and cannot be used anymore.
    Disposed,
}

/// What a frontend must do with its source before calling
/// [`CoreReader::end_pull`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Pull {
    /// Number of tokens to advance the source by.
    pub(crate) advance: usize,
    /// Whether to fill the source. When `false`, the source either already
    /// buffers more than the last window could hold, or is completed.
    pub(crate) fill: bool,
}

/// A popped record, waiting to be viewed through [`CoreReader::record`].
#[derive(Debug, Clone, Copy)]
pub(crate) struct Line {
    view: RecordView,
    position: u64,
    index: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    /// Block tokenizer when available, scalar otherwise.
    Fast,
    Scalar,
    /// Scalar tokenizer, accepting a last record without newline.
    Final,
}

fn disposed() -> Error {
    Error::new(ErrorKind::Disposed)
}

#[derive(Debug)]
pub(crate) struct CoreReader<T> {
    dialect: Dialect<T>,
    scalar: ScalarTokenizer<T>,
    simd: Option<SimdTokenizer<T>>,
    records: RecordBuffer,
    state: ReaderState,
    bom_checked: bool,
    // Window into the source's buffer
    window_start: usize,
    window_len: usize,
    clamped: bool,
    max_window: usize,
    // Whether the source said it would never yield more data
    source_completed: bool,
    // Absolute token offset of the window start
    position: u64,
    index: u64,
    expected_len: Option<usize>,
    flexible: bool,
    skip_empty_lines: bool,
}

impl<T: Token> CoreReader<T> {
    pub(crate) fn new(
        dialect: Dialect<T>,
        simd: bool,
        max_record_fields: usize,
        flexible: bool,
        skip_empty_lines: bool,
    ) -> Self {
        let simd = if simd {
            SimdTokenizer::new(&dialect)
        } else {
            tracing::debug!("simd tokenizer disabled");
            None
        };

        Self {
            scalar: ScalarTokenizer::new(&dialect),
            simd,
            dialect,
            records: RecordBuffer::with_capacity(DEFAULT_FIELD_CAPACITY, max_record_fields),
            state: ReaderState::Initialized,
            bom_checked: false,
            window_start: 0,
            window_len: 0,
            clamped: false,
            max_window: MAX_FIELD_END,
            source_completed: false,
            position: 0,
            index: 0,
            expected_len: None,
            flexible,
            skip_empty_lines,
        }
    }

    #[cfg(test)]
    pub(crate) fn set_max_window(&mut self, max_window: usize) {
        self.max_window = max_window.clamp(1, MAX_FIELD_END);
    }

    #[inline]
    pub(crate) fn state(&self) -> ReaderState {
        self.state
    }

    /// Absolute token offset right after the last read record.
    pub(crate) fn position(&self) -> u64 {
        if self.state == ReaderState::Disposed {
            return self.position;
        }

        self.position + self.records.consumed().min(self.window_len) as u64
    }

    pub(crate) fn simd_kernel(&self) -> Option<&'static str> {
        self.simd.as_ref().map(|simd| simd.name())
    }

    pub(crate) fn check_disposed(&self) -> error::Result<()> {
        if self.state == ReaderState::Disposed {
            return Err(disposed());
        }

        Ok(())
    }

    fn transition(&mut self, state: ReaderState) {
        if self.state != state {
            tracing::trace!(from = ?self.state, to = ?state, "reader state transition");
            self.state = state;
        }
    }

    /// Ends the reading on an error nothing can be read past.
    #[cold]
    fn fatal(&mut self, err: Error) -> Error {
        self.transition(ReaderState::ReadToEnd);
        err
    }

    #[inline]
    fn window<'b>(&self, buffer: &'b [T]) -> &'b [T] {
        &buffer[self.window_start..self.window_start + self.window_len]
    }

    /// Views a line returned by [`Self::try_read_line`]. `buffer` must be the
    /// source's buffer the line was read from.
    #[inline]
    pub(crate) fn record<'r>(
        &'r self,
        buffer: &'r [T],
        line: Line,
        scratch: &'r mut Vec<T>,
    ) -> Record<'r, T> {
        let (metas, specials) = self.records.record(line.view);

        Record::new(
            self.window(buffer),
            metas,
            specials,
            &self.dialect,
            scratch,
            line.position,
            line.index,
        )
    }

    /// Pops the next record, tokenizing the current window if needed. Never
    /// pulls: `Ok(None)` means either that the reader needs a pull, or that
    /// it reached [`ReaderState::ReadToEnd`].
    pub(crate) fn try_read_line(&mut self, buffer: &[T]) -> error::Result<Option<Line>> {
        self.check_disposed()?;

        loop {
            let view = match self.records.try_pop().map_err(|err| self.fatal(err))? {
                Some(view) => view,
                None => {
                    if self.try_fill_buffer(buffer).map_err(|err| self.fatal(err))? {
                        continue;
                    }

                    return Ok(None);
                }
            };

            let (metas, specials) = self.records.record(view);
            let start = metas[0].next_start();

            if self.skip_empty_lines
                && view.len() == 1
                && specials[1].is_plain()
                && metas[1].end() == start
            {
                continue;
            }

            let line = Line {
                view,
                position: self.position + start as u64,
                index: self.index,
            };

            self.index += 1;

            if !self.flexible {
                match self.expected_len {
                    None => self.expected_len = Some(view.len()),
                    Some(expected_len) if expected_len != view.len() => {
                        return Err(Error::new(ErrorKind::UnequalLengths {
                            expected_len,
                            len: view.len(),
                            pos: Some((line.position, line.index)),
                        }));
                    }
                    _ => (),
                }
            }

            return Ok(Some(line));
        }
    }

    /// Returns whether new records can be popped.
    fn try_fill_buffer(&mut self, buffer: &[T]) -> error::Result<bool> {
        self.reset_window();

        match self.state {
            ReaderState::Reading => {
                if self.try_fill_core(buffer, Pass::Fast)? {
                    return Ok(true);
                }

                // A full window cannot grow, so its tail must be handled
                // here rather than after the next pull.
                if self.window_len >= self.max_window
                    && self.simd.is_some()
                    && self.try_fill_core(buffer, Pass::Scalar)?
                {
                    return Ok(true);
                }

                self.transition(ReaderState::DataExhausted);

                Ok(false)
            }
            ReaderState::ReaderCompleted => {
                if self.simd.is_some() && self.try_fill_core(buffer, Pass::Fast)? {
                    return Ok(true);
                }

                if self.try_fill_core(buffer, Pass::Final)? {
                    return Ok(true);
                }

                self.transition(ReaderState::ReadToEnd);

                Ok(false)
            }
            _ => Ok(false),
        }
    }

    /// Runs tokenizer passes over the window until a record is complete,
    /// growing the record buffer when a single record does not fit.
    fn try_fill_core(&mut self, buffer: &[T], pass: Pass) -> error::Result<bool> {
        let window = self.window(buffer);

        loop {
            let (fields, resume) = self.records.unread(MIN_UNREAD);

            let result = match (&self.simd, pass) {
                (Some(simd), Pass::Fast) => simd.tokenize(fields, resume, window),
                (_, Pass::Final) => self.scalar.tokenize(fields, resume, window, true),
                _ => self.scalar.tokenize(fields, resume, window, false),
            };

            let written = result.map_err(|err| err.offset_by(self.position))?;

            if written == 0 {
                return Ok(false);
            }

            self.records.set_fields_read(written);

            if self.state == ReaderState::Reading
                && self.window_len.saturating_sub(self.records.resume().start)
                    < PREFERRED_REMAINING
            {
                self.transition(ReaderState::DataExhausted);
            }

            if self.records.has_records() {
                return Ok(true);
            }

            // A final pass only stops short of a record end when the buffer is
            // full, or before reporting a malformed field.
            if !self.records.ensure_capacity()? && pass != Pass::Final {
                return Ok(false);
            }
        }
    }

    /// Slides the window past the records popped so far.
    fn reset_window(&mut self) {
        let consumed = self.records.reset().min(self.window_len);

        if consumed > 0 {
            tracing::debug!(consumed, position = self.position, "resetting window");

            self.window_start += consumed;
            self.window_len -= consumed;
            self.position += consumed as u64;
        }
    }

    /// Prepares a pull, returning `None` when the source must not be pulled
    /// anymore.
    pub(crate) fn begin_pull(&mut self) -> error::Result<Option<Pull>> {
        match self.state {
            ReaderState::Disposed => return Err(disposed()),
            ReaderState::ReaderCompleted | ReaderState::ReadToEnd => return Ok(None),
            _ => (),
        }

        self.reset_window();

        if self.state == ReaderState::DataExhausted
            && self.window_start == 0
            && self.window_len >= self.max_window
        {
            let err = Error::new(ErrorKind::RecordTooLong {
                len: self.window_len,
            });

            return Err(self.fatal(err));
        }

        let advance = self.window_start;
        self.window_start = 0;

        Ok(Some(Pull {
            advance,
            fill: !self.clamped && !self.source_completed,
        }))
    }

    /// Sets the window over the source's buffer after a pull.
    pub(crate) fn end_pull(&mut self, buffer: &[T], completed: bool) {
        debug_assert_eq!(self.window_start, 0);

        self.source_completed |= completed;

        if !self.bom_checked {
            if !T::BOM.is_empty() && buffer.starts_with(T::BOM) {
                tracing::debug!("skipping byte order mark");

                self.window_start = T::BOM.len();
                self.position += T::BOM.len() as u64;
                self.bom_checked = true;
            } else if !self.source_completed && T::BOM.starts_with(buffer) {
                // Too short to tell yet
                self.window_len = 0;
                self.clamped = false;
                self.transition(ReaderState::DataExhausted);
                return;
            } else {
                self.bom_checked = true;
            }
        }

        let available = buffer.len() - self.window_start;

        self.window_len = available.min(self.max_window);
        self.clamped = available > self.max_window;

        if self.clamped {
            tracing::debug!(available, window = self.window_len, "clamping window");
        }

        if self.source_completed && !self.clamped {
            self.transition(ReaderState::ReaderCompleted);
        } else {
            self.transition(ReaderState::Reading);
        }
    }

    /// Forgets everything read so far, after the source was rewound.
    pub(crate) fn rewind(&mut self) {
        self.records.clear();
        self.bom_checked = false;
        self.window_start = 0;
        self.window_len = 0;
        self.clamped = false;
        self.source_completed = false;
        self.position = 0;
        self.index = 0;
        self.expected_len = None;
        self.transition(ReaderState::Initialized);
    }

    pub(crate) fn dispose(&mut self) {
        if self.state == ReaderState::Disposed {
            return;
        }

        self.records.release();
        self.window_start = 0;
        self.window_len = 0;
        self.transition(ReaderState::Disposed);
    }
}
