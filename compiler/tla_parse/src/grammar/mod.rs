//! One-time construction of the TLA+ grammar set.
//!
//! All grammars are built exactly once, on first use, and shared read-only
//! across every parse call. Mutual recursion (an expression contains
//! parenthesized expressions, a module contains units, a unit may be a
//! nested module) is tied through forward references declared here and
//! resolved by the sub-module builders.

mod expr;
mod precedence;
mod unit;

pub(crate) use expr::quantifier_bound;

use once_cell::sync::Lazy;
use tla_ir::{Expr, GeneralIdentifierPart, Module, Unit};

use crate::combinator::{eof, repeat, repeat1, Grammar, Recursive};
use crate::context::ParseContext;
use crate::lexical::{consume_after_module_end, find_module_start, skip_whitespace_and_comments};

/// The shared, mutually-referential grammars the builders plug into.
pub(crate) struct SharedGrammars {
    pub(crate) expression: Grammar<Expr>,
    pub(crate) no_operators: Grammar<Expr>,
    pub(crate) unit: Grammar<Unit>,
    pub(crate) module: Grammar<Module>,
    pub(crate) instance_prefix: Grammar<Vec<GeneralIdentifierPart>>,
}

/// The entry-point grammars backing the public `read_*` functions.
pub(crate) struct GrammarSet {
    pub(crate) expression_entry: Grammar<Expr>,
    pub(crate) unit_entry: Grammar<Unit>,
    pub(crate) units_entry: Grammar<Vec<Unit>>,
    pub(crate) modules_entry: Grammar<Vec<Module>>,
}

static GRAMMAR: Lazy<GrammarSet> = Lazy::new(build);

/// The process-wide grammar set.
pub(crate) fn grammar_set() -> &'static GrammarSet {
    &GRAMMAR
}

fn build() -> GrammarSet {
    let expression: Recursive<Expr> = Recursive::declare();
    let no_operators: Recursive<Expr> = Recursive::declare();
    let unit_ref: Recursive<Unit> = Recursive::declare();
    let module_ref: Recursive<Module> = Recursive::declare();

    let shared = SharedGrammars {
        expression: expression.grammar(),
        no_operators: no_operators.grammar(),
        unit: unit_ref.grammar(),
        module: module_ref.grammar(),
        instance_prefix: precedence::instance_prefix(&expression.grammar()),
    };

    no_operators.define(expr::expression_no_operators(&shared));
    expression.define(precedence::expression_grammar(&shared));
    // units and modules are parsed outside any bulleted chain, so the
    // minimum-column constraint is disabled for their dynamic extent
    unit_ref.define(
        unit::unit_grammar(&shared)
            .with_context(|ctx| ctx.with_min_column(ParseContext::NO_MIN_COLUMN)),
    );
    module_ref.define(
        unit::module_grammar(&shared)
            .with_context(|ctx| ctx.with_min_column(ParseContext::NO_MIN_COLUMN)),
    );

    let expression_entry = shared
        .expression
        .clone()
        .with_context(|ctx| ctx.with_min_column(ParseContext::NO_MIN_COLUMN))
        .then_ignore(skip_whitespace_and_comments())
        .then_ignore(eof());
    let unit_entry = shared
        .unit
        .clone()
        .then_ignore(skip_whitespace_and_comments())
        .then_ignore(eof());
    let units_entry = repeat(shared.unit.clone());
    let root_module = find_module_start()
        .ignore_then(shared.module.clone())
        .then_ignore(consume_after_module_end());
    let modules_entry = repeat1(root_module);

    GrammarSet {
        expression_entry,
        unit_entry,
        units_entry,
        modules_entry,
    }
}
