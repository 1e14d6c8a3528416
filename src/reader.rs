use std::io::Read;

use crate::core::{CoreReader, ReaderState};
use crate::dialect::{Dialect, Newline, Trimming};
use crate::error::{self, Error, ErrorKind};
use crate::record::{OwnedRecord, Record};
use crate::record_buffer::DEFAULT_MAX_RECORD_FIELDS;
use crate::source::{BufferSource, IoSource, SliceSource, DEFAULT_BUFFER_CAPACITY};
use crate::token::Token;

#[cfg(feature = "tokio")]
use crate::aio::AsyncReader;
#[cfg(feature = "tokio")]
use crate::source::{AsyncBufferSource, AsyncIoSource};
#[cfg(feature = "tokio")]
use tokio::io::AsyncRead;

/// Builds a [`Reader`] with given configuration.
///
/// Tokens are bytes by default; use [`ReaderBuilder::utf16`] to read
/// already decoded UTF-16 data.
#[derive(Debug, Clone)]
pub struct ReaderBuilder<T = u8> {
    delimiter: T,
    quote: T,
    escape: Option<T>,
    newline: Newline<T>,
    trimming: Trimming,
    whitespace: Vec<T>,
    buffer_capacity: usize,
    max_record_fields: usize,
    flexible: bool,
    skip_empty_lines: bool,
    simd: bool,
}

impl<T: Token> Default for ReaderBuilder<T> {
    fn default() -> Self {
        Self {
            delimiter: T::from_ascii(b','),
            quote: T::from_ascii(b'"'),
            escape: None,
            newline: Newline::crlf(),
            trimming: Trimming::None,
            whitespace: vec![T::from_ascii(b' ')],
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            max_record_fields: DEFAULT_MAX_RECORD_FIELDS,
            flexible: false,
            skip_empty_lines: true,
            simd: true,
        }
    }
}

impl ReaderBuilder<u8> {
    /// Create a new [`ReaderBuilder`] of bytes with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new [`ReaderBuilder`] of bytes with provided `capacity`.
    pub fn with_capacity(capacity: usize) -> Self {
        let mut reader = Self::default();
        reader.buffer_capacity(capacity);
        reader
    }

    /// Create a new [`Reader`] using the provided reader implementing
    /// [`std::io::Read`].
    pub fn from_reader<R: Read>(&self, reader: R) -> error::Result<Reader<IoSource<R>>> {
        self.from_source(IoSource::with_capacity(self.buffer_capacity, reader))
    }

    /// Create a new [`AsyncReader`] using the provided reader implementing
    /// [`tokio::io::AsyncRead`].
    #[cfg(feature = "tokio")]
    pub fn from_async_reader<R: AsyncRead + Unpin>(
        &self,
        reader: R,
    ) -> error::Result<AsyncReader<AsyncIoSource<R>>> {
        self.from_async_source(AsyncIoSource::with_capacity(self.buffer_capacity, reader))
    }
}

impl ReaderBuilder<u16> {
    /// Create a new [`ReaderBuilder`] of UTF-16 code units with default
    /// configuration.
    pub fn utf16() -> Self {
        Self::default()
    }
}

impl<T: Token> ReaderBuilder<T> {
    /// Set the delimiter to be used by the created [`Reader`].
    ///
    /// Will default to a comma.
    pub fn delimiter(&mut self, delimiter: T) -> &mut Self {
        self.delimiter = delimiter;
        self
    }

    /// Set the quote token to be used by the created [`Reader`].
    ///
    /// Will default to a double quote.
    pub fn quote(&mut self, quote: T) -> &mut Self {
        self.quote = quote;
        self
    }

    /// Set an escape token, which makes the created [`Reader`] read fields
    /// where special tokens are escaped instead of quotes being doubled.
    ///
    /// Will default to `None`.
    pub fn escape(&mut self, escape: Option<T>) -> &mut Self {
        self.escape = escape;
        self
    }

    /// Set the record terminator.
    ///
    /// Will default to `\r\n`. Note that with a two tokens newline, each
    /// of its tokens found alone also terminates a record.
    pub fn newline(&mut self, newline: Newline<T>) -> &mut Self {
        self.newline = newline;
        self
    }

    /// Set which boundaries of unquoted fields get trimmed.
    ///
    /// Will default to [`Trimming::None`].
    pub fn trimming(&mut self, trimming: Trimming) -> &mut Self {
        self.trimming = trimming;
        self
    }

    /// Set the tokens considered whitespace when trimming.
    ///
    /// Will default to a single space.
    pub fn whitespace(&mut self, whitespace: &[T]) -> &mut Self {
        self.whitespace = whitespace.to_vec();
        self
    }

    /// Set the minimum amount of data requested from the underlying reader
    /// at once. Has no effect on sources built by the caller.
    pub fn buffer_capacity(&mut self, capacity: usize) -> &mut Self {
        self.buffer_capacity = capacity;
        self
    }

    /// Set the maximum number of fields a single record can have before
    /// reading fails with [`ErrorKind::TooManyFields`].
    ///
    /// Will default to 2^20.
    pub fn max_record_fields(&mut self, max: usize) -> &mut Self {
        self.max_record_fields = max;
        self
    }

    /// Indicate whether the created [`Reader`] should be "flexible",
    /// i.e. whether it should allow reading records having different number of
    /// fields than the first one.
    ///
    /// Will default to `false`.
    pub fn flexible(&mut self, yes: bool) -> &mut Self {
        self.flexible = yes;
        self
    }

    /// Indicate whether empty lines should be skipped rather than read as
    /// records with a single empty field.
    ///
    /// Will default to `true`.
    pub fn skip_empty_lines(&mut self, yes: bool) -> &mut Self {
        self.skip_empty_lines = yes;
        self
    }

    /// Indicate whether SIMD instructions may be used, when available.
    ///
    /// Will default to `true`.
    pub fn simd(&mut self, yes: bool) -> &mut Self {
        self.simd = yes;
        self
    }

    /// Validate the configured dialect.
    pub fn dialect(&self) -> error::Result<Dialect<T>> {
        Dialect::new(
            self.delimiter,
            self.quote,
            self.escape,
            self.newline,
            self.trimming,
            &self.whitespace,
        )
    }

    fn core(&self, dialect: Dialect<T>) -> CoreReader<T> {
        CoreReader::new(
            dialect,
            self.simd,
            self.max_record_fields,
            self.flexible,
            self.skip_empty_lines,
        )
    }

    /// Create a new [`Reader`] over data already in memory.
    pub fn from_slice<'a>(&self, data: &'a [T]) -> error::Result<Reader<SliceSource<'a, T>, T>> {
        self.from_source(SliceSource::new(data))
    }

    /// Create a new [`Reader`] pulling data from any [`BufferSource`].
    pub fn from_source<S: BufferSource<T>>(&self, source: S) -> error::Result<Reader<S, T>> {
        Ok(Reader::new(source, self.core(self.dialect()?)))
    }

    /// Create a new [`AsyncReader`] pulling data from any
    /// [`AsyncBufferSource`].
    #[cfg(feature = "tokio")]
    pub fn from_async_source<S: AsyncBufferSource<T>>(
        &self,
        source: S,
    ) -> error::Result<AsyncReader<S, T>> {
        Ok(AsyncReader::new(source, self.core(self.dialect()?)))
    }
}

/// An already configured CSV reader, pulling data from a [`BufferSource`].
///
/// # Configuration
///
/// To configure a [`Reader`], if you need a custom delimiter for instance,
/// or to read UTF-16 data, check out the [`ReaderBuilder`].
pub struct Reader<S, T: Token = u8> {
    source: S,
    core: CoreReader<T>,
    scratch: Vec<T>,
}

impl<R: Read> Reader<IoSource<R>> {
    pub fn from_reader(reader: R) -> Self {
        Reader::new(
            IoSource::new(reader),
            ReaderBuilder::new().core(Dialect::default()),
        )
    }
}

impl<'a, T: Token> Reader<SliceSource<'a, T>, T> {
    pub fn from_slice(data: &'a [T]) -> Self {
        Reader::new(
            SliceSource::new(data),
            ReaderBuilder::<T>::default().core(Dialect::default()),
        )
    }
}

impl<S: BufferSource<T>, T: Token> Reader<S, T> {
    fn new(source: S, core: CoreReader<T>) -> Self {
        Self {
            source,
            core,
            scratch: Vec::new(),
        }
    }

    /// Pulls one more chunk. Returns `false` if the source must not be
    /// pulled anymore.
    fn try_advance(&mut self) -> error::Result<bool> {
        let pull = match self.core.begin_pull()? {
            Some(pull) => pull,
            None => return Ok(false),
        };

        self.source.advance(pull.advance);

        let completed = pull.fill && self.source.fill()?;

        self.core.end_pull(self.source.buffer(), completed);

        Ok(true)
    }

    /// Read the next record, returning `None` once all records were read.
    ///
    /// The record borrows the reader and must be dropped before reading the
    /// next one, see [`Record::to_owned_record`] to keep it.
    pub fn read_record(&mut self) -> error::Result<Option<Record<'_, T>>> {
        loop {
            if let Some(line) = self.core.try_read_line(self.source.buffer())? {
                return Ok(Some(self.core.record(
                    self.source.buffer(),
                    line,
                    &mut self.scratch,
                )));
            }

            if !self.try_advance()? {
                return Ok(None);
            }
        }
    }

    /// Iterate over owned records.
    pub fn records(&mut self) -> RecordsIter<'_, S, T> {
        RecordsIter { reader: self }
    }

    /// Rewind the reader to its beginning, if its source supports it.
    pub fn try_reset(&mut self) -> error::Result<()> {
        self.core.check_disposed()?;

        if !self.source.try_reset()? {
            return Err(Error::new(ErrorKind::ResetUnsupported));
        }

        self.core.rewind();

        Ok(())
    }

    /// Release the reader's buffers. Any later operation fails with
    /// [`ErrorKind::Disposed`].
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

    /// Absolute token offset right after the last read record.
    pub fn position(&self) -> u64 {
        self.core.position()
    }

    /// Name of the SIMD kernel in use, if any.
    pub fn simd_kernel(&self) -> Option<&'static str> {
        self.core.simd_kernel()
    }

    pub fn get_ref(&self) -> &S {
        &self.source
    }

    pub fn into_source(self) -> S {
        self.source
    }
}

pub struct RecordsIter<'r, S, T: Token> {
    reader: &'r mut Reader<S, T>,
}

impl<S: BufferSource<T>, T: Token> Iterator for RecordsIter<'_, S, T> {
    type Item = error::Result<OwnedRecord<T>>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.reader.read_record() {
            Err(err) => Some(Err(err)),
            Ok(Some(mut record)) => Some(record.to_owned_record()),
            Ok(None) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use bstr::ByteSlice;

    use super::*;
    use crate::bits::tests::Rng;
    use crate::error::FormatErrorKind;
    use crate::source::tests::Chunked;

    const DATA: &str = "name,surname,age\n\"john\",\"landy, the \"\"everlasting\"\" bastard\",45\r\n\"\"\"ok\"\"\",whatever,dude\nlucy,rose,\"67\"\njermaine,jackson,\"89\"\n\nkarine,loucan,\"52\"\nrose,\"glib\",12\n\"guillaume\",\"plique\",\"42\"\r\n";

    fn expected() -> Vec<OwnedRecord<u8>> {
        vec![
            rec!["name", "surname", "age"],
            rec!["john", "landy, the \"everlasting\" bastard", "45"],
            rec!["\"ok\"", "whatever", "dude"],
            rec!["lucy", "rose", "67"],
            rec!["jermaine", "jackson", "89"],
            rec!["karine", "loucan", "52"],
            rec!["rose", "glib", "12"],
            rec!["guillaume", "plique", "42"],
        ]
    }

    fn read_all<S: BufferSource<u8>>(reader: &mut Reader<S>) -> error::Result<Vec<OwnedRecord<u8>>> {
        reader.records().collect()
    }

    fn format_kind(err: &Error) -> FormatErrorKind {
        match err.kind() {
            ErrorKind::Format(err) => err.kind(),
            kind => panic!("expected a format error, got {:?}", kind),
        }
    }

    #[test]
    fn test_example() -> error::Result<()> {
        let mut reader = Reader::from_slice(b"1,\"hello, world\",3\r\na,b,c\r\n");

        {
            let mut record = reader.read_record()?.unwrap();

            assert_eq!(record.len(), 3);
            assert_eq!(record.raw_field(1), Some(&b"\"hello, world\""[..]));
            assert_eq!(record.field(1)?, Some(&b"hello, world"[..]));
            assert_eq!(record.field(3)?, None);
            assert_eq!(record.as_slice(), b"1,\"hello, world\",3");
            assert_eq!(record.as_slice_with_newline(), b"1,\"hello, world\",3\r\n");
            assert_eq!(record.position(), 0);
            assert_eq!(record.index(), 0);
        }

        let mut record = reader.read_record()?.unwrap();
        assert_eq!(record.to_owned_record()?, rec!["a", "b", "c"]);
        assert_eq!(record.position(), 20);
        assert_eq!(record.index(), 1);

        assert!(reader.read_record()?.is_none());
        assert!(reader.read_record()?.is_none());
        assert_eq!(reader.state(), ReaderState::ReadToEnd);

        Ok(())
    }

    #[test]
    fn test_chunks() -> error::Result<()> {
        for simd in [true, false] {
            for chunk in [1, 2, 4, 17, 128, 8096] {
                let mut reader = ReaderBuilder::with_capacity(0)
                    .simd(simd)
                    .from_reader(Chunked::new(DATA.as_bytes(), chunk))?;

                assert_eq!(read_all(&mut reader)?, expected(), "chunk {}", chunk);
            }
        }

        let mut reader = Reader::from_reader(Cursor::new(DATA));
        assert_eq!(read_all(&mut reader)?, expected());

        Ok(())
    }

    #[test]
    fn test_empty() -> error::Result<()> {
        for data in ["", "\n", "\r\n\r\n\n"] {
            let mut reader = Reader::from_slice(data.as_bytes());
            assert!(reader.read_record()?.is_none());
        }

        let mut reader = ReaderBuilder::new()
            .skip_empty_lines(false)
            .from_slice(b"a\n\nb")?;

        assert_eq!(
            read_all(&mut reader)?,
            vec![rec!["a"], rec![""], rec!["b"]]
        );

        // Quoted empty fields are not empty lines
        let mut reader = Reader::from_slice(b"name\n\"\"\nlucy\n\"\"");

        assert_eq!(
            read_all(&mut reader)?,
            vec![rec!["name"], rec![""], rec!["lucy"], rec![""]]
        );

        Ok(())
    }

    /// Random well-formed CSV data, along with the records it holds.
    fn random_csv(rng: &mut Rng) -> (Vec<u8>, Vec<OwnedRecord<u8>>) {
        let alphabet = b"ab ,\"\r\n\xc3\xa9";
        let mut data = Vec::new();
        let mut records = Vec::new();

        for _ in 0..rng.below(40) {
            let mut record = OwnedRecord::new();

            for i in 0..rng.below(6) + 1 {
                let len = rng.below(if i == 0 { 12 } else { 8 }) + (i == 0) as usize;
                let value = (0..len)
                    .map(|_| alphabet[rng.below(alphabet.len())])
                    .collect::<Vec<_>>();

                if i > 0 {
                    data.push(b',');
                }

                if value.iter().any(|b| b"\",\r\n".contains(b)) || rng.below(4) == 0 {
                    data.push(b'"');

                    for &byte in value.iter() {
                        if byte == b'"' {
                            data.push(b'"');
                        }

                        data.push(byte);
                    }

                    data.push(b'"');
                } else {
                    data.extend_from_slice(&value);
                }

                record.push_field(&value);
            }

            data.extend_from_slice(if rng.below(2) == 0 { b"\n" } else { b"\r\n" });
            records.push(record);
        }

        if rng.below(2) == 0 {
            let trimmed = data.len() - (data.ends_with(b"\r\n") as usize + 1).min(data.len());
            data.truncate(trimmed);
        }

        (data, records)
    }

    #[test]
    fn test_random() -> error::Result<()> {
        let mut rng = Rng::new(7);

        for _ in 0..300 {
            let (data, records) = random_csv(&mut rng);
            let chunk = rng.below(100) + 1;

            let mut reader = ReaderBuilder::new()
                .flexible(true)
                .from_reader(Chunked::new(&data, chunk))?;

            assert_eq!(
                read_all(&mut reader)?,
                records,
                "chunk: {}, data: {:?}",
                chunk,
                data.as_bstr()
            );

            let mut reader = ReaderBuilder::new()
                .flexible(true)
                .simd(false)
                .from_slice(&data)?;

            assert_eq!(read_all(&mut reader)?, records, "data: {:?}", data.as_bstr());
        }

        Ok(())
    }

    #[test]
    fn test_csv_crate() -> error::Result<()> {
        let mut rng = Rng::new(13);

        for _ in 0..100 {
            let (data, _) = random_csv(&mut rng);

            let mut expected = Vec::new();
            let mut reference = csv::ReaderBuilder::new()
                .has_headers(false)
                .flexible(true)
                .from_reader(&data[..]);

            for record in reference.byte_records() {
                let record = record.expect("valid csv");
                expected.push(record.iter().collect::<OwnedRecord<u8>>());
            }

            let mut reader = ReaderBuilder::new().flexible(true).from_slice(&data)?;

            assert_eq!(read_all(&mut reader)?, expected);
        }

        Ok(())
    }

    #[test]
    fn test_small_windows() -> error::Result<()> {
        let data = DATA.repeat(10);

        for max_window in [60, 64, 65, 130, 200] {
            for chunk in [3, 64, 8096] {
                let mut reader = ReaderBuilder::with_capacity(0)
                    .from_reader(Chunked::new(data.as_bytes(), chunk))?;
                reader.core.set_max_window(max_window);

                let records = read_all(&mut reader)?;
                assert_eq!(records.len(), 80);
                assert_eq!(records[..8], expected()[..]);
                assert_eq!(records[72..], expected()[..]);
            }
        }

        // The last window of a completed source is exactly full
        for simd in [true, false] {
            let data = b"a,b\n".repeat(10);
            let mut reader = ReaderBuilder::new().simd(simd).from_slice(&data)?;
            reader.core.set_max_window(8);

            assert_eq!(read_all(&mut reader)?, vec![rec!["a", "b"]; 10]);
            assert_eq!(reader.position(), data.len() as u64);
        }

        let mut reader = Reader::from_slice(b"a,b\nccccccccccccccccccccccccccccccccccccc\n");
        reader.core.set_max_window(16);

        assert!(reader.read_record()?.is_some());

        let err = reader.read_record().err().unwrap();
        assert!(matches!(err.kind(), ErrorKind::RecordTooLong { len: 16 }));

        // Nothing can be read past that point
        assert!(reader.read_record()?.is_none());

        Ok(())
    }

    #[test]
    #[ignore = "allocates more than a gigabyte"]
    fn test_max_window() -> error::Result<()> {
        let line = b"abcdefghijklmnopqrstuvwxyz,0123456789\n";
        let data = line.repeat((1 << 30) / line.len() + 2);
        assert!(data.len() > crate::meta::MAX_FIELD_END);

        let mut reader = Reader::from_slice(&data);
        let mut count = 0;

        while let Some(mut record) = reader.read_record()? {
            assert_eq!(record.field(1)?, Some(&b"0123456789"[..]));
            count += 1;
        }

        assert_eq!(count, data.len() / line.len());

        Ok(())
    }

    #[test]
    fn test_bom() -> error::Result<()> {
        let data = b"\xef\xbb\xbfname,surname\njohn,landy\n";

        for chunk in [1, 2, 64] {
            let mut reader = ReaderBuilder::new().from_reader(Chunked::new(data, chunk))?;

            let record = reader.read_record()?.unwrap();
            assert_eq!(record.position(), 3);
            drop(record);

            assert_eq!(read_all(&mut reader)?, vec![rec!["john", "landy"]]);
            assert_eq!(reader.position(), data.len() as u64);
        }

        Ok(())
    }

    #[test]
    fn test_malformed() -> error::Result<()> {
        let mut reader = Reader::from_slice(b"\"a,\"b\"");
        let err = reader.read_record().err().unwrap();
        assert_eq!(format_kind(&err), FormatErrorKind::UnterminatedQuote);

        let mut reader = Reader::from_slice(b"a,\"b\"\"");
        let err = reader.read_record().err().unwrap();

        match err.kind() {
            ErrorKind::Format(err) => {
                assert_eq!(err.field(), "\"b\"\"");
                assert_eq!(err.position(), Some(2));
            }
            kind => panic!("expected a format error, got {:?}", kind),
        }

        // Not doubled quote, found when unescaping
        let mut reader = Reader::from_slice(b"x,y\n\"a\"b\"\",c\n");
        assert_eq!(reader.read_record()?.unwrap().to_owned_record()?, rec!["x", "y"]);

        let mut record = reader.read_record()?.unwrap();
        let err = record.field(0).unwrap_err();

        match err.kind() {
            ErrorKind::Format(err) => {
                assert_eq!(
                    err.kind(),
                    FormatErrorKind::QuoteCountMismatch {
                        expected: 2,
                        actual: 2
                    }
                );
                assert_eq!(err.position(), Some(4));
            }
            kind => panic!("expected a format error, got {:?}", kind),
        }

        // The rest of the record is fine
        assert_eq!(record.field(1)?, Some(&b"c"[..]));

        Ok(())
    }

    #[test]
    fn test_unequal_lengths() -> error::Result<()> {
        let mut reader = Reader::from_slice(b"a,b\nc\nd,e\n");

        assert!(reader.read_record()?.is_some());

        let err = reader.read_record().err().unwrap();
        assert!(err.is_format_error());
        assert!(matches!(
            err.kind(),
            ErrorKind::UnequalLengths {
                expected_len: 2,
                len: 1,
                pos: Some((4, 1))
            }
        ));

        // Reading goes on
        assert_eq!(read_all(&mut reader)?, vec![rec!["d", "e"]]);

        let mut reader = ReaderBuilder::new().flexible(true).from_slice(b"a,b\nc\n")?;
        assert_eq!(read_all(&mut reader)?, vec![rec!["a", "b"], rec!["c"]]);

        Ok(())
    }

    #[test]
    fn test_too_many_fields() -> error::Result<()> {
        let mut reader = ReaderBuilder::new()
            .max_record_fields(3)
            .from_slice(b"a,b,c\nd,e,f,g\n")?;

        assert!(reader.read_record()?.is_some());

        let err = reader.read_record().err().unwrap();
        assert!(matches!(err.kind(), ErrorKind::TooManyFields { max: 3 }));

        // Wider than the record buffer
        let data = ",".repeat(10_000);
        let mut reader = ReaderBuilder::new()
            .max_record_fields(5000)
            .from_slice(data.as_bytes())?;

        let err = reader.read_record().err().unwrap();
        assert!(matches!(err.kind(), ErrorKind::TooManyFields { max: 5000 }));

        let mut reader = Reader::from_slice(data.as_bytes());
        assert_eq!(reader.read_record()?.unwrap().len(), 10_001);

        Ok(())
    }

    #[test]
    fn test_dialects() -> error::Result<()> {
        let mut reader = ReaderBuilder::new()
            .delimiter(b'\t')
            .newline(Newline::lf())
            .trimming(Trimming::Both)
            .from_slice(b" a \t\" b \"\tc\r\n")?;

        assert_eq!(read_all(&mut reader)?, vec![rec!["a", " b ", "c\r"]]);

        let mut reader = ReaderBuilder::new()
            .escape(Some(b'\\'))
            .from_slice(b"a\\,b,\"c\\\"d\",e\\\\\n")?;

        assert_eq!(read_all(&mut reader)?, vec![rec!["a,b", "c\"d", "e\\"]]);

        let err = ReaderBuilder::new()
            .quote(b',')
            .from_slice(b"")
            .err()
            .unwrap();
        assert!(matches!(err.kind(), ErrorKind::InvalidDialect(_)));

        Ok(())
    }

    #[test]
    fn test_utf16() -> error::Result<()> {
        let data = "é,\"«»,\"\"\"\r\nà,b\r\n".encode_utf16().collect::<Vec<_>>();
        let mut reader = ReaderBuilder::utf16().from_slice(&data)?;

        let mut fields = Vec::new();

        while let Some(mut record) = reader.read_record()? {
            let mut i = 0;

            while let Some(field) = record.field(i)? {
                fields.push(String::from_utf16_lossy(field));
                i += 1;
            }
        }

        assert_eq!(fields, vec!["é", "«»,\"", "à", "b"]);

        Ok(())
    }

    #[test]
    fn test_reset() -> error::Result<()> {
        let mut reader = Reader::from_slice(DATA.as_bytes());

        assert_eq!(read_all(&mut reader)?, expected());
        reader.try_reset()?;
        assert_eq!(reader.state(), ReaderState::Initialized);
        assert_eq!(read_all(&mut reader)?, expected());

        let mut reader = Reader::from_reader(Cursor::new(DATA));
        let err = reader.try_reset().err().unwrap();
        assert!(matches!(err.kind(), ErrorKind::ResetUnsupported));

        Ok(())
    }

    #[test]
    fn test_dispose() -> error::Result<()> {
        let mut reader = Reader::from_slice(DATA.as_bytes());

        assert!(reader.read_record()?.is_some());

        reader.dispose();
        assert!(reader.is_disposed());

        let err = reader.read_record().err().unwrap();
        assert!(matches!(err.kind(), ErrorKind::Disposed));

        let err = reader.try_reset().err().unwrap();
        assert!(matches!(err.kind(), ErrorKind::Disposed));

        Ok(())
    }
}
