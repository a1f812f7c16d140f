//! Backtracking grammar-combinator parser for TLA+.
//!
//! The crate has two layers:
//!
//! - [`combinator`]: a declarative, composable backtracking-parser engine
//!   with packrat memoization, cut-based commit, context-threaded
//!   (indentation-sensitive) evaluation, and forward references for cyclic
//!   grammars. Failures are values carrying the furthest failure position.
//! - the TLA+ grammar built on it: the full expression grammar (generated
//!   per precedence level from the operator tables), units, and modules.
//!
//! Parsing is all-or-nothing per entry point: on failure a [`ParseFailure`]
//! reports the deepest failure span and what was expected there, and no
//! partial AST is produced.
//!
//! ```
//! let expr = tla_parse::read_expression("1 + 2 * 3").unwrap();
//! # let _ = expr;
//! ```

pub mod combinator;
mod context;
mod cursor;
mod error;
mod grammar;
mod lexical;
mod operators;
mod stack;

pub use context::ParseContext;
pub use cursor::Cursor;
pub use error::ParseFailure;

use combinator::{Grammar, Session};
use tla_ir::{Expr, Located, Module, Unit};

/// Run a grammar against a source string from the start.
///
/// This is the generic entry for grammars built from [`combinator`]; the
/// `read_*` functions below cover the TLA+ surface.
pub fn run_grammar<T: 'static>(
    source: &str,
    grammar: &Grammar<T>,
) -> Result<Located<T>, ParseFailure> {
    let mut session = Session::new(source);
    match grammar.run(&mut session, Cursor::start(), ParseContext::new()) {
        Ok((value, _rest)) => Ok(value),
        Err(_) => Err(session.into_failure()),
    }
}

/// Parse a complete expression. The whole input must be consumed (modulo
/// trailing whitespace and comments).
pub fn read_expression(source: &str) -> Result<Expr, ParseFailure> {
    run_grammar(source, &grammar::grammar_set().expression_entry).map(|located| located.value)
}

/// Parse a single unit: an operator/function/instance/module definition, a
/// variable/constant declaration, an assumption, a theorem, or a nested
/// module. The whole input must be consumed.
pub fn read_unit(source: &str) -> Result<Unit, ParseFailure> {
    run_grammar(source, &grammar::grammar_set().unit_entry).map(|located| located.value)
}

/// Parse as many leading units as match.
pub fn read_units(source: &str) -> Result<Vec<Unit>, ParseFailure> {
    run_grammar(source, &grammar::grammar_set().units_entry).map(|located| located.value)
}

/// Parse one or more modules, skipping arbitrary text around the
/// four-or-more-dash module start markers, so modules can be embedded in
/// larger documents.
pub fn read_modules(source: &str) -> Result<Vec<Module>, ParseFailure> {
    run_grammar(source, &grammar::grammar_set().modules_entry).map(|located| located.value)
}
