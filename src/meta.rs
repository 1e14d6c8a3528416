use std::fmt;

/// Largest field end representable by a [`Meta`], and therefore the largest
/// window a tokenizer will ever be given.
pub const MAX_FIELD_END: usize = (1 << 30) - 1;

const END_MASK: u32 = MAX_FIELD_END as u32;
const TAG_SHIFT: u32 = 30;

const TAG_DELIMITER: u32 = 0b00;
const TAG_START: u32 = 0b01;
const TAG_EOL: u32 = 0b10;
const TAG_EOL_TWO: u32 = 0b11;

/// Packed metadata of a single field boundary.
///
/// The low 30 bits hold the exclusive end of the field in the current window,
/// the top two bits tell what follows it: a delimiter, a one-token newline, a
/// two-token newline, or nothing at all for the sentinel marking the start of
/// the window.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Meta(u32);

impl Meta {
    pub(crate) const START: Self = Self(TAG_START << TAG_SHIFT);

    #[inline(always)]
    fn pack(end: usize, tag: u32) -> Self {
        debug_assert!(end <= MAX_FIELD_END);
        Self(end as u32 | (tag << TAG_SHIFT))
    }

    #[inline(always)]
    pub(crate) fn delimiter(end: usize) -> Self {
        Self::pack(end, TAG_DELIMITER)
    }

    #[inline(always)]
    pub(crate) fn eol(end: usize, two_tokens: bool) -> Self {
        Self::pack(end, if two_tokens { TAG_EOL_TWO } else { TAG_EOL })
    }

    #[inline(always)]
    fn tag(self) -> u32 {
        self.0 >> TAG_SHIFT
    }

    /// Exclusive end of the field.
    #[inline(always)]
    pub fn end(self) -> usize {
        (self.0 & END_MASK) as usize
    }

    /// Returns whether the field is the last of its record.
    #[inline(always)]
    pub fn is_eol(self) -> bool {
        self.tag() & TAG_EOL != 0
    }

    #[inline(always)]
    pub(crate) fn is_start(self) -> bool {
        self.tag() == TAG_START
    }

    /// Number of newline tokens following the field.
    #[inline(always)]
    pub fn newline_len(self) -> usize {
        match self.tag() {
            TAG_EOL => 1,
            TAG_EOL_TWO => 2,
            _ => 0,
        }
    }

    /// Offset where the next field starts.
    #[inline(always)]
    pub fn next_start(self) -> usize {
        match self.tag() {
            TAG_START => self.end(),
            TAG_EOL_TWO => self.end() + 2,
            _ => self.end() + 1,
        }
    }

    /// Same boundary, in a window starting `offset` tokens later.
    #[inline(always)]
    pub(crate) fn shifted(self, offset: usize) -> Self {
        debug_assert!(self.end() >= offset);
        Self(self.0 - offset as u32)
    }
}

impl Default for Meta {
    fn default() -> Self {
        Self::START
    }
}

impl fmt::Debug for Meta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.tag() {
            TAG_DELIMITER => "delimiter",
            TAG_START => "start",
            TAG_EOL => "eol",
            _ => "eol2",
        };

        write!(f, "Meta({}, {})", self.end(), kind)
    }
}

const COUNT_MASK: u8 = 0x7f;
const ESCAPE_FLAG: u8 = 0x80;

/// Count of special tokens found in a field.
///
/// For plain and RFC4180 fields this is the number of quotes. In escape
/// dialects, a field containing escapes stores its number of escapes instead.
/// Counts saturate at 127, in which case they must be recounted.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct Special(u8);

impl Special {
    pub(crate) const PLAIN: Self = Self(0);

    #[inline(always)]
    pub(crate) fn quotes(count: u32) -> Self {
        Self(count.min(COUNT_MASK as u32) as u8)
    }

    #[inline(always)]
    pub(crate) fn escapes(count: u32) -> Self {
        debug_assert!(count > 0);
        Self(ESCAPE_FLAG | count.min(COUNT_MASK as u32) as u8)
    }

    /// Returns whether the field contains neither quotes nor escapes.
    #[inline(always)]
    pub fn is_plain(self) -> bool {
        self.0 == 0
    }

    /// Returns whether the count is a number of escapes.
    #[inline(always)]
    pub fn is_escape(self) -> bool {
        self.0 & ESCAPE_FLAG != 0
    }

    /// The exact count, or `None` if it saturated.
    #[inline(always)]
    pub fn count(self) -> Option<u32> {
        match self.0 & COUNT_MASK {
            COUNT_MASK => None,
            count => Some(count as u32),
        }
    }
}
