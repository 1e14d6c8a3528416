use std::io::{self, Read};

use crate::token::Token;

/// Default minimum amount of bytes requested from a reader at once.
pub const DEFAULT_BUFFER_CAPACITY: usize = 8 * (1 << 10);

/// A pull-based source of tokens, buffering data until it is advanced
/// past.
///
/// Chunk sizes are never assumed to be aligned with records.
pub trait BufferSource<T> {
    /// Pulls more data, appending it to [`Self::buffer`]. Returns whether the
    /// source is completed, i.e. the buffer now holds everything the source
    /// will ever yield. Once completed, a source keeps returning `true`.
    fn fill(&mut self) -> io::Result<bool>;

    /// Data pulled but not yet advanced past.
    fn buffer(&self) -> &[T];

    /// Discards the first `amount` tokens of [`Self::buffer`].
    ///
    /// # Panics
    ///
    /// Panics if `amount` is larger than the buffered length.
    fn advance(&mut self, amount: usize);

    /// Rewinds the source to its beginning, if it supports it. Returns
    /// whether it did.
    fn try_reset(&mut self) -> io::Result<bool> {
        Ok(false)
    }
}

/// Growable byte buffer filled by chunks, compacted before each fill.
#[derive(Debug)]
pub(crate) struct ReadBuffer {
    data: Vec<u8>,
    start: usize,
    end: usize,
    min_read: usize,
    eof: bool,
}

impl ReadBuffer {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        let min_read = capacity.max(64);

        Self {
            data: vec![0; min_read],
            start: 0,
            end: 0,
            min_read,
            eof: false,
        }
    }

    #[inline]
    pub(crate) fn is_eof(&self) -> bool {
        self.eof
    }

    #[inline]
    pub(crate) fn unread(&self) -> &[u8] {
        &self.data[self.start..self.end]
    }

    /// Space to read into, moving unread data to the front and growing the
    /// buffer first if needed.
    pub(crate) fn prepare(&mut self) -> &mut [u8] {
        if self.start > 0 {
            self.data.copy_within(self.start..self.end, 0);
            self.end -= self.start;
            self.start = 0;
        }

        if self.data.len() - self.end < self.min_read {
            let len = (self.data.len() * 2).max(self.end + self.min_read);

            tracing::debug!(from = self.data.len(), to = len, "growing read buffer");

            self.data.resize(len, 0);
        }

        &mut self.data[self.end..]
    }

    /// Records the result of a read into the space given by
    /// [`Self::prepare`].
    pub(crate) fn commit(&mut self, read: usize) -> bool {
        if read == 0 {
            self.eof = true;
        }

        self.end += read;
        self.eof
    }

    pub(crate) fn advance(&mut self, amount: usize) {
        assert!(
            amount <= self.end - self.start,
            "cannot advance {} tokens past a buffer of {}",
            amount,
            self.end - self.start
        );

        self.start += amount;
    }
}

/// A [`BufferSource`] of bytes read from any [`Read`] implementation.
#[derive(Debug)]
pub struct IoSource<R> {
    inner: R,
    buffer: ReadBuffer,
}

impl<R: Read> IoSource<R> {
    pub fn new(inner: R) -> Self {
        Self::with_capacity(DEFAULT_BUFFER_CAPACITY, inner)
    }

    pub fn with_capacity(capacity: usize, inner: R) -> Self {
        Self {
            inner,
            buffer: ReadBuffer::with_capacity(capacity),
        }
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> BufferSource<u8> for IoSource<R> {
    fn fill(&mut self) -> io::Result<bool> {
        if self.buffer.is_eof() {
            return Ok(true);
        }

        loop {
            match self.inner.read(self.buffer.prepare()) {
                Ok(read) => return Ok(self.buffer.commit(read)),
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        }
    }

    #[inline]
    fn buffer(&self) -> &[u8] {
        self.buffer.unread()
    }

    #[inline]
    fn advance(&mut self, amount: usize) {
        self.buffer.advance(amount);
    }
}

/// A [`BufferSource`] over data already in memory, which is always
/// completed and can be rewound.
#[derive(Debug, Clone)]
pub struct SliceSource<'a, T> {
    data: &'a [T],
    pos: usize,
}

impl<'a, T: Token> SliceSource<'a, T> {
    pub fn new(data: &'a [T]) -> Self {
        Self { data, pos: 0 }
    }

    #[inline]
    fn advance_by(&mut self, amount: usize) {
        assert!(
            amount <= self.data.len() - self.pos,
            "cannot advance {} tokens past a buffer of {}",
            amount,
            self.data.len() - self.pos
        );

        self.pos += amount;
    }
}

impl<T: Token> BufferSource<T> for SliceSource<'_, T> {
    #[inline]
    fn fill(&mut self) -> io::Result<bool> {
        Ok(true)
    }

    #[inline]
    fn buffer(&self) -> &[T] {
        &self.data[self.pos..]
    }

    #[inline]
    fn advance(&mut self, amount: usize) {
        self.advance_by(amount);
    }

    fn try_reset(&mut self) -> io::Result<bool> {
        self.pos = 0;
        Ok(true)
    }
}

#[cfg(feature = "tokio")]
mod asynchronous {
    use std::io;

    use tokio::io::{AsyncRead, AsyncReadExt};

    use super::{ReadBuffer, SliceSource, DEFAULT_BUFFER_CAPACITY};
    use crate::token::Token;

    /// Async counterpart of [`BufferSource`](super::BufferSource): pulling
    /// is the only operation that may suspend.
    #[allow(async_fn_in_trait)]
    pub trait AsyncBufferSource<T> {
        /// See [`BufferSource::fill`](super::BufferSource::fill).
        async fn fill(&mut self) -> io::Result<bool>;

        fn buffer(&self) -> &[T];

        fn advance(&mut self, amount: usize);

        async fn try_reset(&mut self) -> io::Result<bool> {
            Ok(false)
        }
    }

    /// An [`AsyncBufferSource`] of bytes read from any [`AsyncRead`]
    /// implementation.
    #[derive(Debug)]
    pub struct AsyncIoSource<R> {
        inner: R,
        buffer: ReadBuffer,
    }

    impl<R: AsyncRead + Unpin> AsyncIoSource<R> {
        pub fn new(inner: R) -> Self {
            Self::with_capacity(DEFAULT_BUFFER_CAPACITY, inner)
        }

        pub fn with_capacity(capacity: usize, inner: R) -> Self {
            Self {
                inner,
                buffer: ReadBuffer::with_capacity(capacity),
            }
        }

        pub fn into_inner(self) -> R {
            self.inner
        }
    }

    impl<R: AsyncRead + Unpin> AsyncBufferSource<u8> for AsyncIoSource<R> {
        async fn fill(&mut self) -> io::Result<bool> {
            if self.buffer.is_eof() {
                return Ok(true);
            }

            loop {
                match self.inner.read(self.buffer.prepare()).await {
                    Ok(read) => return Ok(self.buffer.commit(read)),
                    Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                    Err(err) => return Err(err),
                }
            }
        }

        #[inline]
        fn buffer(&self) -> &[u8] {
            self.buffer.unread()
        }

        #[inline]
        fn advance(&mut self, amount: usize) {
            self.buffer.advance(amount);
        }
    }

    impl<T: Token> AsyncBufferSource<T> for SliceSource<'_, T> {
        async fn fill(&mut self) -> io::Result<bool> {
            Ok(true)
        }

        #[inline]
        fn buffer(&self) -> &[T] {
            super::BufferSource::buffer(self)
        }

        #[inline]
        fn advance(&mut self, amount: usize) {
            self.advance_by(amount);
        }

        async fn try_reset(&mut self) -> io::Result<bool> {
            super::BufferSource::try_reset(self)
        }
    }
}

#[cfg(feature = "tokio")]
pub use asynchronous::{AsyncBufferSource, AsyncIoSource};
