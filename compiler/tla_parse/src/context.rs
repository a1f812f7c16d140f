//! Parse-time variable context.
//!
//! The context threads parameters through recursive evaluation without
//! global mutable state. It is passed by value; a dependent sequence rebinds
//! it for the dynamic extent of a sub-grammar and the original value is
//! untouched when evaluation returns.
//!
//! Today the context carries one parameter: the minimum column a token may
//! start at, which implements the indentation rule for bulleted `/\` and
//! `\/` chains. Everything that can change a grammar's outcome must also
//! appear in the memoization key, so the whole context is part of the key.

/// Context values threaded through grammar evaluation.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct ParseContext {
    min_column: i32,
}

impl ParseContext {
    /// Sentinel disabling the minimum-column constraint.
    pub const NO_MIN_COLUMN: i32 = -1;

    /// A context with no active constraints.
    #[inline]
    pub fn new() -> ParseContext {
        ParseContext {
            min_column: Self::NO_MIN_COLUMN,
        }
    }

    /// The ambient minimum column, or [`Self::NO_MIN_COLUMN`].
    #[inline]
    pub fn min_column(self) -> i32 {
        self.min_column
    }

    /// Rebind the minimum column.
    #[inline]
    #[must_use]
    pub fn with_min_column(self, min_column: i32) -> ParseContext {
        ParseContext { min_column }
    }

    /// True if a token starting at `column` satisfies the constraint.
    #[inline]
    pub fn allows_column(self, column: u32) -> bool {
        self.min_column < 0 || column as i32 >= self.min_column
    }
}

impl Default for ParseContext {
    fn default() -> ParseContext {
        ParseContext::new()
    }
}
