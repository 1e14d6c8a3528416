//! Async frontend, driving the same core as [`Reader`](crate::Reader) over
//! an [`AsyncBufferSource`].
use crate::core::{CoreReader, ReaderState};
use crate::error::{self, Error, ErrorKind};
use crate::record::Record;
use crate::source::AsyncBufferSource;
use crate::token::Token;

/// An already configured CSV reader, pulling data from an
/// [`AsyncBufferSource`].
///
/// Only pulling data suspends: tokenizing & unescaping never do. Dropping a
/// pending [`AsyncReader::read_record`] future is safe and loses nothing,
/// the next call picks up where the reader was.
///
/// Build one with [`ReaderBuilder::from_async_reader`](crate::ReaderBuilder::from_async_reader)
/// or [`ReaderBuilder::from_async_source`](crate::ReaderBuilder::from_async_source).
pub struct AsyncReader<S, T: Token = u8> {
    source: S,
    core: CoreReader<T>,
    scratch: Vec<T>,
}

impl<S: AsyncBufferSource<T>, T: Token> AsyncReader<S, T> {
    pub(crate) fn new(source: S, core: CoreReader<T>) -> Self {
        Self {
            source,
            core,
            scratch: Vec::new(),
        }
    }

    async fn try_advance(&mut self) -> error::Result<bool> {
        let pull = match self.core.begin_pull()? {
            Some(pull) => pull,
            None => return Ok(false),
        };

        self.source.advance(pull.advance);

        let completed = pull.fill && self.source.fill().await?;

        self.core.end_pull(self.source.buffer(), completed);

        Ok(true)
    }

    /// Read the next record, returning `None` once all records were read.
    pub async fn read_record(&mut self) -> error::Result<Option<Record<'_, T>>> {
        loop {
            if let Some(line) = self.core.try_read_line(self.source.buffer())? {
                return Ok(Some(self.core.record(
                    self.source.buffer(),
                    line,
                    &mut self.scratch,
                )));
            }

            if !self.try_advance().await? {
                return Ok(None);
            }
        }
    }

    /// Rewind the reader to its beginning, if its source supports it.
    pub async fn try_reset(&mut self) -> error::Result<()> {
        self.core.check_disposed()?;

        if !self.source.try_reset().await? {
            return Err(Error::new(ErrorKind::ResetUnsupported));
        }

        self.core.rewind();

        Ok(())
    }

    pub fn dispose(&mut self) {
        self.core.dispose();
        self.scratch = Vec::new();
    }

    pub fn is_disposed(&self) -> bool {
        self.core.state() == ReaderState::Disposed
    }

    pub fn state(&self) -> ReaderState {
        self.core.state()
    }

    pub fn position(&self) -> u64 {
        self.core.position()
    }

    pub fn into_source(self) -> S {
        self.source
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    use tokio::io::{AsyncRead, ReadBuf};

    use super::*;
    use crate::record::OwnedRecord;
    use crate::ReaderBuilder;

    /// Async reader yielding at most `chunk` bytes per read, returning
    /// pending every other poll.
    struct Trickle<'a> {
        data: &'a [u8],
        chunk: usize,
        pending: bool,
    }

    impl AsyncRead for Trickle<'_> {
        fn poll_read(
            mut self: Pin<&mut Self>,
            cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            self.pending = !self.pending;

            if self.pending {
                cx.waker().wake_by_ref();
                return Poll::Pending;
            }

            let data = self.data;
            let len = self.chunk.min(buf.remaining()).min(data.len());
            buf.put_slice(&data[..len]);
            self.data = &data[len..];

            Poll::Ready(Ok(()))
        }
    }

    async fn read_all<S: AsyncBufferSource<u8>>(
        reader: &mut AsyncReader<S>,
    ) -> error::Result<Vec<OwnedRecord<u8>>> {
        let mut records = Vec::new();

        while let Some(mut record) = reader.read_record().await? {
            records.push(record.to_owned_record()?);
        }

        Ok(records)
    }

    #[tokio::test]
    async fn test_async_reader() -> error::Result<()> {
        let data = b"name,surname\r\njohn,\"landy, the \"\"everlasting\"\"\"\r\n\r\nlucy,rose";
        let expected = vec![
            rec!["name", "surname"],
            rec!["john", "landy, the \"everlasting\""],
            rec!["lucy", "rose"],
        ];

        for chunk in [1, 3, 64] {
            let trickle = Trickle {
                data,
                chunk,
                pending: false,
            };

            let mut reader = ReaderBuilder::with_capacity(0).from_async_reader(trickle)?;

            assert_eq!(read_all(&mut reader).await?, expected);
            assert_eq!(reader.state(), ReaderState::ReadToEnd);
        }

        let mut reader = ReaderBuilder::new().from_async_reader(&data[..])?;
        assert!(matches!(
            reader.try_reset().await.err().unwrap().kind(),
            ErrorKind::ResetUnsupported
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_async_slice() -> error::Result<()> {
        let mut reader = ReaderBuilder::new()
            .from_async_source(crate::SliceSource::new(b"a,b\nc,d\n"))?;

        assert_eq!(read_all(&mut reader).await?, vec![rec!["a", "b"], rec!["c", "d"]]);

        reader.try_reset().await?;
        assert_eq!(read_all(&mut reader).await?.len(), 2);

        reader.dispose();
        assert!(reader.is_disposed());
        assert!(matches!(
            reader.read_record().await.err().unwrap().kind(),
            ErrorKind::Disposed
        ));

        Ok(())
    }
}
