use crate::dialect::Dialect;
use crate::error::{self, FormatErrorKind};
use crate::meta::Meta;
use crate::token::Token;
use crate::tokenizer::{Emitter, FieldBuffer, Resume};

/// Token-by-token tokenizer, able to handle any dialect and to process the
/// very end of the data.
#[derive(Debug, Clone)]
pub(crate) struct ScalarTokenizer<T> {
    delimiter: T,
    quote: T,
    escape: Option<T>,
    newline: T,
    second_newline: Option<T>,
    lut: [bool; 256],
    wide: bool,
}

impl<T: Token> ScalarTokenizer<T> {
    pub(crate) fn new(dialect: &Dialect<T>) -> Self {
        let newline = dialect.newline();
        let tokens = [
            Some(dialect.delimiter()),
            Some(dialect.quote()),
            dialect.escape(),
            Some(newline.first()),
            newline.second(),
        ];

        let mut lut = [false; 256];
        let mut wide = false;

        for token in tokens.into_iter().flatten() {
            match token.to_u32() {
                index @ 0..=255 => lut[index as usize] = true,
                _ => wide = true,
            }
        }

        Self {
            delimiter: dialect.delimiter(),
            quote: dialect.quote(),
            escape: dialect.escape(),
            newline: newline.first(),
            second_newline: newline.second(),
            lut,
            wide,
        }
    }

    #[inline(always)]
    fn is_special(&self, token: T) -> bool {
        match token.to_u32() {
            index @ 0..=255 => self.lut[index as usize],
            _ => {
                self.wide
                    && (token == self.delimiter
                        || token == self.quote
                        || Some(token) == self.escape
                        || token == self.newline
                        || Some(token) == self.second_newline)
            }
        }
    }

    /// Index of the next special token at or after `i`.
    #[inline(always)]
    fn skip_plain(&self, data: &[T], mut i: usize) -> usize {
        while i + 4 <= data.len() {
            if self.is_special(data[i])
                || self.is_special(data[i + 1])
                || self.is_special(data[i + 2])
                || self.is_special(data[i + 3])
            {
                break;
            }

            i += 4;
        }

        while i < data.len() && !self.is_special(data[i]) {
            i += 1;
        }

        i
    }

    /// Scans `data` from `resume.start`, writing one [`Meta`] per field
    /// boundary until either the data or the buffer is exhausted.
    ///
    /// Unless `read_to_end` is set, the trailing field without a newline is
    /// left for a later pass. Otherwise it is terminated by a record end
    /// located at `data.len()`.
    pub(crate) fn tokenize(
        &self,
        buffer: FieldBuffer<'_>,
        resume: Resume,
        data: &[T],
        read_to_end: bool,
    ) -> error::Result<usize> {
        let len = data.len();
        let mut emitter = Emitter::new(buffer, data, resume.start, self.escape.is_some());
        let mut at_record_start = resume.at_record_start;
        let mut quotes: u32 = 0;
        let mut escapes: u32 = 0;
        let mut i = resume.start;

        loop {
            i = self.skip_plain(data, i);

            if i >= len {
                break;
            }

            let token = data[i];

            if Some(token) == self.escape {
                if i + 1 >= len {
                    if read_to_end {
                        return emitter.fail(emitter.error(FormatErrorKind::DanglingEscape, len).into());
                    }

                    return Ok(emitter.written());
                }

                escapes += 1;
                i += 2;
                continue;
            }

            if token == self.quote {
                quotes += 1;
                i += 1;
                continue;
            }

            if quotes & 1 == 1 {
                i += 1;
                continue;
            }

            let meta = if token == self.delimiter {
                Meta::delimiter(i)
            } else {
                let two_tokens = match self.second_newline {
                    Some(second) if token == self.newline => {
                        if i + 1 < len {
                            data[i + 1] == second
                        } else if read_to_end {
                            false
                        } else {
                            // Cannot tell yet whether this is a lone newline
                            return Ok(emitter.written());
                        }
                    }
                    _ => false,
                };

                Meta::eol(i, two_tokens)
            };

            if emitter.is_full() {
                return Ok(emitter.written());
            }

            if let Err(err) = emitter.push(meta, quotes, escapes) {
                return emitter.fail(err);
            }

            at_record_start = meta.is_eol();
            quotes = 0;
            escapes = 0;
            i = meta.next_start();
        }

        if !read_to_end {
            return Ok(emitter.written());
        }

        if quotes & 1 == 1 {
            return emitter.fail(emitter.error(FormatErrorKind::UnterminatedQuote, len).into());
        }

        let pending_field = emitter.field_start() < len || !at_record_start;

        if pending_field {
            if emitter.is_full() {
                return Ok(emitter.written());
            }

            if let Err(err) = emitter.push(Meta::eol(len, false), quotes, escapes) {
                return emitter.fail(err);
            }
        }

        Ok(emitter.written())
    }
}
