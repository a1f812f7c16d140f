//! Input cursor for the interpreter.
//!
//! A [`Cursor`] is an immutable pointer into the source string. Matching a
//! prefix yields a new cursor; backtracking is reverting to a previously
//! saved cursor value. The line and column are tracked alongside the byte
//! offset because the minimum-column rule and reported failures are both
//! column-addressed.

use tla_ir::Pos;

/// Immutable position in the input.
///
/// Invariant: `offset` always lies on a character boundary of the source
/// the cursor was advanced over.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct Cursor {
    offset: u32,
    line: u32,
    column: u32,
}

impl Cursor {
    /// Cursor at the start of the input.
    pub fn start() -> Cursor {
        Cursor {
            offset: 0,
            line: 1,
            column: 1,
        }
    }

    /// Byte offset from the start of the input.
    #[inline]
    pub fn offset(self) -> usize {
        self.offset as usize
    }

    /// The position as a [`Pos`].
    #[inline]
    pub fn pos(self) -> Pos {
        Pos {
            offset: self.offset,
            line: self.line,
            column: self.column,
        }
    }

    /// The remaining input after this cursor.
    #[inline]
    pub fn rest(self, source: &str) -> &str {
        &source[self.offset()..]
    }

    /// True if the cursor has consumed the whole input.
    #[inline]
    pub fn is_at_end(self, source: &str) -> bool {
        self.offset() >= source.len()
    }

    /// A new cursor positioned after `consumed`, which must be the prefix of
    /// the remaining input that was just matched.
    #[must_use]
    pub fn advanced_over(self, consumed: &str) -> Cursor {
        let mut line = self.line;
        let mut column = self.column;
        for ch in consumed.chars() {
            if ch == '\n' {
                line += 1;
                column = 1;
            } else {
                column += 1;
            }
        }
        Cursor {
            offset: self.offset + consumed.len() as u32,
            line,
            column,
        }
    }
}
