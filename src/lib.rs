/*!
The `simd-csv-tokenizer` crate provides a streaming CSV reader able to
leverage [SIMD](https://en.wikipedia.org/wiki/Single_instruction,_multiple_data)
instructions to find field & record boundaries, over bytes or already decoded
UTF-16 code units.

It is not a drop-in replacement for the [`csv`](https://docs.rs/csv/) crate:
records are only handed out as borrowed views, and there is no serde layer nor
writer. What it does is splitting very large amounts of CSV data into fields
fast, while still unescaping quoted data correctly.

# Examples

*Reading a CSV file*

```
use std::fs::File;
use simd_csv_tokenizer::Reader;

let mut reader = Reader::from_reader(File::open("data.csv")?);

while let Some(mut record) = reader.read_record()? {
    for i in 0..record.len() {
        dbg!(record.field(i)?);
    }
}
```

*Using a builder to configure your reader*

```
use std::fs::File;
use simd_csv_tokenizer::{ReaderBuilder, Trimming};

let mut reader = ReaderBuilder::new()
    .delimiter(b'\t')
    .escape(Some(b'\\'))
    .trimming(Trimming::Both)
    .buffer_capacity(16 * (1 << 10))
    .from_reader(File::open("data.tsv")?)?;
```

*Reading UTF-16 data*

```
use simd_csv_tokenizer::ReaderBuilder;

let data: Vec<u16> = "name,surname\njohn,landy\n".encode_utf16().collect();
let mut reader = ReaderBuilder::utf16().from_slice(&data)?;

for record in reader.records() {
    dbg!(String::from_utf16_lossy(record?.get(0).unwrap()));
}
```

*Reading asynchronously* (requires the `tokio` feature)

```
use simd_csv_tokenizer::ReaderBuilder;

let file = tokio::fs::File::open("data.csv").await?;
let mut reader = ReaderBuilder::new().from_async_reader(file)?;

while let Some(record) = reader.read_record().await? {
    dbg!(record.as_slice());
}
```

# Sources

A [`Reader`] pulls its data from a [`BufferSource`]: [`IoSource`] wraps any
[`std::io::Read`] implementation, [`SliceSource`] reads data already in
memory and is the only one that can be rewound with [`Reader::try_reset`].
[`AsyncReader`] does the same over an `AsyncBufferSource`.

Chunks are never assumed to be aligned with records.

# Supported targets

- On `x86_64` targets, `sse2` instructions are used. `avx2` instructions
  will also be used if their availability is detected at runtime.
- On `aarch64` targets, `neon` instructions are used.
- On every other target, and for dialects using non-ASCII tokens, a scalar
  tokenizer is used. It is also used on the tail of the data, shorter than a
  SIMD block.

Use [`ReaderBuilder::simd`] to force the scalar tokenizer and
[`Reader::simd_kernel`] to know which kernel was picked.

# Design notes

## Tokenizing

The data is processed by 64-token blocks. For each block, masks of quotes,
delimiters & newline tokens are computed using vector comparisons, then
quoted regions are found using a prefix xor of the quote mask (a carry-less
multiplication when available). Boundaries that are not inside quotes are
then popped one bit at a time.

A boundary is stored as a single `u32`, a [`Meta`], packing the offset of
the field's end in its 30 lower bits and the kind of boundary in its 2 upper
bits. A companion [`Special`] byte tells whether the field needs unescaping
at all, so that most fields are never copied.

The tokenizer never keeps any state between calls: it is always restarted
at the beginning of a field, and the reader makes sure it is.

## Windows

Since field ends are 30-bit offsets, the reader tokenizes its buffered data
through a window of at most `2^30 - 1` tokens, which slides forward as
records are consumed. A single record longer than this cannot be read and
yields [`ErrorKind::RecordTooLong`].

# Caveats

- When a newline is two tokens long (`\r\n`, the default), a lone `\n` or a
  lone `\r` is also accepted as a record terminator.
- A field containing quotes must be wrapped in quotes and have its inner
  quotes doubled, else accessing it fails with a [`FormatError`]. The `csv`
  crate is more lenient here.
- Empty lines are skipped by default, use
  [`ReaderBuilder::skip_empty_lines`] to keep them as single empty fields.
*/
#[cfg(test)]
macro_rules! rec {
    () => {{
        $crate::record::OwnedRecord::<u8>::new()
    }};

    ($($x: expr),*) => {{
        let mut r = $crate::record::OwnedRecord::<u8>::new();

        $(
            r.push_field($x.as_bytes());
        )*

        r
    }};
}

#[cfg(feature = "tokio")]
mod aio;
mod bits;
mod core;
mod debug;
mod dialect;
mod error;
mod meta;
mod reader;
mod record;
mod record_buffer;
mod scalar;
mod simd;
mod source;
mod token;
mod tokenizer;
mod unescape;
mod vector;

#[cfg(feature = "tokio")]
pub use aio::AsyncReader;
pub use self::core::ReaderState;
pub use dialect::{Dialect, Newline, Trimming};
pub use error::{Error, ErrorKind, FormatError, FormatErrorKind, Result};
pub use meta::{Meta, Special, MAX_FIELD_END};
pub use reader::{Reader, ReaderBuilder, RecordsIter};
pub use record::{OwnedRecord, OwnedRecordIter, Record};
pub use record_buffer::DEFAULT_MAX_RECORD_FIELDS;
#[cfg(feature = "tokio")]
pub use source::{AsyncBufferSource, AsyncIoSource};
pub use source::{BufferSource, IoSource, SliceSource, DEFAULT_BUFFER_CAPACITY};
pub use token::Token;
