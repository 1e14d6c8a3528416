use std::fmt;

use crate::token::Token;

/// Lossy rendering of tokens in debug output.
pub(crate) struct Tokens<'a, T>(pub(crate) &'a [T]);

impl<T: Token> fmt::Debug for Tokens<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", T::render(self.0))
    }
}
