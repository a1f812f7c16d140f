//! The operator-free expression forms and the ordered alternation over
//! them.
//!
//! Each function mirrors one surface form of the language. The alternation
//! order matters under first-success alternation: forms that share a prefix
//! are ordered so that the one needing the longer marker is tried first
//! (`<<A>>_v` before `<<...>>`), and forms that commit do so only on tokens
//! no later sibling could consume.

use tla_ir::{
    BoundTargets, CaseArm, Expr, ExprKind, FairnessKind, Ident, IdentifierOrTuple, QuantifierBound,
    RecordField, RecordSetField, SubstitutionKey, SubstitutionPair, Symbol, Unit,
};

use super::unit::{function_definition, module_definition, operator_definition};
use super::SharedGrammars;
use crate::combinator::{choice, cut, memoize, nop, repeat, repeat1, Grammar};
use crate::lexical::{
    comma_list, tla_identifier, tla_number, tla_string_literal, tla_token, tla_token_one_of,
};

/// `<<a, b, c>>` as a list of identifiers (possibly empty).
fn identifier_tuple() -> Grammar<Vec<Ident>> {
    tla_token("<<")
        .ignore_then(choice(vec![
            comma_list(tla_identifier()),
            nop().map(|()| Vec::new()),
        ]))
        .then_ignore(tla_token(">>"))
}

/// A bare identifier or an identifier tuple.
fn identifier_or_tuple() -> Grammar<IdentifierOrTuple> {
    choice(vec![
        tla_identifier().map(IdentifierOrTuple::Identifier),
        identifier_tuple().map_with_span(|ids, span| IdentifierOrTuple::Tuple { span, ids }),
    ])
}

/// `x \in S`, `x, y \in S`, or `<<x, y>> \in S`.
pub(crate) fn quantifier_bound(shared: &SharedGrammars) -> Grammar<QuantifierBound> {
    choice(vec![
        identifier_tuple()
            .then_ignore(tla_token("\\in"))
            .then(shared.expression.clone())
            .map_with_span(|(ids, set), span| QuantifierBound {
                span,
                targets: BoundTargets::Tuple(ids),
                set,
            }),
        comma_list(tla_identifier())
            .then_ignore(tla_token("\\in"))
            .then(shared.expression.clone())
            .map_with_span(|(ids, set), span| QuantifierBound {
                span,
                targets: BoundTargets::Names(ids),
                set,
            }),
    ])
}

fn number(_shared: &SharedGrammars) -> Grammar<Expr> {
    tla_number().map_with_span(|(value, base), span| Expr::new(ExprKind::Number { value, base }, span))
}

fn string(_shared: &SharedGrammars) -> Grammar<Expr> {
    tla_string_literal().map_with_span(|value, span| Expr::new(ExprKind::String(value), span))
}

fn boolean(_shared: &SharedGrammars) -> Grammar<Expr> {
    tla_token_one_of(&["TRUE", "FALSE"])
        .map_with_span(|token, span| Expr::new(ExprKind::Bool(token == "TRUE"), span))
}

fn group(shared: &SharedGrammars) -> Grammar<Expr> {
    tla_token("(")
        .ignore_then(cut(shared.expression.clone()))
        .then_ignore(tla_token(")"))
}

/// `<<A>>_vars`.
fn required_action(shared: &SharedGrammars) -> Grammar<Expr> {
    tla_token("<<")
        .ignore_then(memoize(shared.expression.clone()))
        .then_ignore(tla_token(">>_"))
        .then(cut(shared.expression.clone()))
        .map_with_span(|(body, vars), span| {
            Expr::new(
                ExprKind::RequiredAction {
                    body: Box::new(body),
                    vars: Box::new(vars),
                },
                span,
            )
        })
}

fn tuple(shared: &SharedGrammars) -> Grammar<Expr> {
    tla_token("<<")
        .ignore_then(choice(vec![
            comma_list(cut(memoize(shared.expression.clone()))),
            nop().map(|()| Vec::new()),
        ]))
        .then_ignore(tla_token(">>"))
        .map_with_span(|elements, span| Expr::new(ExprKind::Tuple(elements), span))
}

fn operator_call(shared: &SharedGrammars) -> Grammar<Expr> {
    memoize(shared.instance_prefix.clone())
        .then(tla_identifier())
        .then_ignore(tla_token("("))
        .then(comma_list(cut(shared.expression.clone())))
        .then_ignore(tla_token(")"))
        .map_with_span(|((prefix, name), args), span| {
            Expr::new(ExprKind::OperatorCall { prefix, name, args }, span)
        })
}

fn general_identifier(shared: &SharedGrammars) -> Grammar<Expr> {
    memoize(shared.instance_prefix.clone())
        .then(tla_identifier())
        .map_with_span(|(prefix, name), span| Expr::new(ExprKind::Ident { prefix, name }, span))
}

/// `WF_vars(A)` / `SF_vars(A)`.
///
/// The subscript must stop short of the parenthesized action, so it is a
/// restricted form (identifier, tuple, or parenthesized expression) rather
/// than a full expression.
fn fairness_constraint(shared: &SharedGrammars) -> Grammar<Expr> {
    let subscript = choice(vec![
        tuple(shared),
        general_identifier(shared),
        group(shared),
    ]);
    choice(vec![
        tla_token("WF_").map(|()| FairnessKind::Weak),
        tla_token("SF_").map(|()| FairnessKind::Strong),
    ])
    .then(subscript)
    .then_ignore(tla_token("("))
    .then(cut(shared.expression.clone()))
    .then_ignore(tla_token(")"))
    .map_with_span(|((kind, vars), body), span| {
        Expr::new(
            ExprKind::Fairness {
                kind,
                vars: Box::new(vars),
                body: Box::new(body),
            },
            span,
        )
    })
}

/// A bulleted `/\` or `\/` chain.
///
/// The first bullet's column defines the chain: its operand parses with the
/// minimum column one past the bullet, sibling bullets must start at or
/// beyond the bullet's own column, and anything to the left of it
/// terminates the chain. A single-bullet chain is just its operand.
fn conjunct_or_disjunct(which: &'static str, shared: &SharedGrammars) -> Grammar<Expr> {
    let bullet = || tla_token(which).map_with_span(|(), span| span);

    let continuation = bullet().then_with_context(cut(shared.expression.clone()), |_sym, ctx| {
        ctx.with_min_column(ctx.min_column() + 1)
    });

    bullet()
        .then_with_context(cut(shared.expression.clone()), |sym, ctx| {
            ctx.with_min_column(sym.span.start.column as i32 + 1)
        })
        .then_with_context(repeat(continuation), |first, ctx| {
            ctx.with_min_column(first.span.start.column as i32)
        })
        .map(move |((first_sym, first_expr), rest)| {
            if rest.is_empty() {
                return first_expr;
            }
            let mut lhs = first_expr;
            for (index, (sym_span, rhs)) in rest.into_iter().enumerate() {
                let op_span = if index == 0 { first_sym } else { sym_span };
                let span = lhs.span.merge(sym_span).merge(rhs.span);
                lhs = Expr::new(
                    ExprKind::Binary {
                        op: Symbol::new(op_span, which),
                        prefix: Vec::new(),
                        lhs: Box::new(lhs),
                        rhs: Box::new(rhs),
                    },
                    span,
                );
            }
            lhs
        })
}

fn conjunct(shared: &SharedGrammars) -> Grammar<Expr> {
    conjunct_or_disjunct("/\\", shared)
}

fn disjunct(shared: &SharedGrammars) -> Grammar<Expr> {
    conjunct_or_disjunct("\\/", shared)
}

fn if_expression(shared: &SharedGrammars) -> Grammar<Expr> {
    cut(tla_token("IF"))
        .ignore_then(shared.expression.clone())
        .then_ignore(tla_token("THEN"))
        .then(shared.expression.clone())
        .then_ignore(tla_token("ELSE"))
        .then(shared.expression.clone())
        .map_with_span(|((condition, then_branch), else_branch), span| {
            Expr::new(
                ExprKind::If {
                    condition: Box::new(condition),
                    then_branch: Box::new(then_branch),
                    else_branch: Box::new(else_branch),
                },
                span,
            )
        })
}

fn case_expression(shared: &SharedGrammars) -> Grammar<Expr> {
    let arm = || {
        shared
            .expression
            .clone()
            .then_ignore(tla_token("->"))
            .then(shared.expression.clone())
            .map_with_span(|(guard, body), span| CaseArm { span, guard, body })
    };
    cut(tla_token("CASE"))
        .ignore_then(arm())
        .then(repeat(tla_token("[]").ignore_then(arm())))
        .then(choice(vec![
            tla_token("[]")
                .ignore_then(tla_token("OTHER"))
                .ignore_then(tla_token("->"))
                .ignore_then(shared.expression.clone())
                .map(Some),
            nop().map(|()| None),
        ]))
        .map_with_span(|((first, rest), other), span| {
            let mut arms = vec![first];
            arms.extend(rest);
            Expr::new(
                ExprKind::Case {
                    arms,
                    other: other.map(Box::new),
                },
                span,
            )
        })
}

fn let_expression(shared: &SharedGrammars) -> Grammar<Expr> {
    let definition: Grammar<Unit> = choice(vec![
        operator_definition(shared, false),
        function_definition(shared, false),
        module_definition(shared, false),
    ]);
    cut(tla_token("LET"))
        .ignore_then(repeat1(definition))
        .then_ignore(tla_token("IN"))
        .then(shared.expression.clone())
        .map_with_span(|(definitions, body), span| {
            Expr::new(
                ExprKind::Let {
                    definitions,
                    body: Box::new(body),
                },
                span,
            )
        })
}

/// `[x \in S |-> e]`.
fn function_constructor(shared: &SharedGrammars) -> Grammar<Expr> {
    tla_token("[")
        .ignore_then(comma_list(quantifier_bound(shared)))
        .then_ignore(cut(tla_token("|->")))
        .then(shared.expression.clone())
        .then_ignore(tla_token("]"))
        .map_with_span(|(bounds, body), span| {
            Expr::new(
                ExprKind::Function {
                    bounds,
                    body: Box::new(body),
                },
                span,
            )
        })
}

/// `[a : S, b : T]`.
fn record_set(shared: &SharedGrammars) -> Grammar<Expr> {
    let field = tla_identifier()
        .then_ignore(cut(tla_token(":")))
        .then(shared.expression.clone())
        .map_with_span(|(name, set), span| RecordSetField { span, name, set });
    tla_token("[")
        .ignore_then(comma_list(field))
        .then_ignore(tla_token("]"))
        .map_with_span(|fields, span| Expr::new(ExprKind::RecordSet(fields), span))
}

/// `[a |-> 1, b |-> 2]`.
fn record_constructor(shared: &SharedGrammars) -> Grammar<Expr> {
    let field = tla_identifier()
        .then_ignore(cut(tla_token("|->")))
        .then(shared.expression.clone())
        .map_with_span(|(name, value), span| RecordField { span, name, value });
    tla_token("[")
        .ignore_then(comma_list(field))
        .then_ignore(tla_token("]"))
        .map_with_span(|fields, span| Expr::new(ExprKind::RecordConstructor(fields), span))
}

/// `[S -> T]`.
fn function_set(shared: &SharedGrammars) -> Grammar<Expr> {
    tla_token("[")
        .ignore_then(memoize(shared.expression.clone()))
        .then_ignore(cut(tla_token("->")))
        .then(shared.expression.clone())
        .then_ignore(tla_token("]"))
        .map_with_span(|(domain, range), span| {
            Expr::new(
                ExprKind::FunctionSet {
                    domain: Box::new(domain),
                    range: Box::new(range),
                },
                span,
            )
        })
}

/// `[A]_vars`.
fn maybe_action(shared: &SharedGrammars) -> Grammar<Expr> {
    tla_token("[")
        .ignore_then(memoize(shared.expression.clone()))
        .then_ignore(cut(tla_token("]_")))
        .then(shared.expression.clone())
        .map_with_span(|(body, vars), span| {
            Expr::new(
                ExprKind::MaybeAction {
                    body: Box::new(body),
                    vars: Box::new(vars),
                },
                span,
            )
        })
}

/// `[f EXCEPT !.a = 1, ![i, j] = 2]`.
fn function_substitution(shared: &SharedGrammars) -> Grammar<Expr> {
    let dot_key = tla_token(".")
        .ignore_then(tla_identifier())
        .map_with_span(|field, span| SubstitutionKey {
            span,
            indices: vec![Expr::new(ExprKind::String(field.name), field.span)],
        });
    let bracket_key = tla_token("[")
        .ignore_then(comma_list(cut(shared.expression.clone())))
        .then_ignore(tla_token("]"))
        .map_with_span(|indices, span| SubstitutionKey { span, indices });
    let pair = tla_token("!")
        .ignore_then(repeat1(choice(vec![dot_key, bracket_key])))
        .then_ignore(tla_token("="))
        .then(shared.expression.clone())
        .map_with_span(|(keys, value), span| SubstitutionPair { span, keys, value });
    tla_token("[")
        .ignore_then(memoize(shared.expression.clone()))
        .then_ignore(cut(tla_token("EXCEPT")))
        .then(comma_list(pair))
        .then_ignore(tla_token("]"))
        .map_with_span(|(source, substitutions), span| {
            Expr::new(
                ExprKind::FunctionSubstitution {
                    source: Box::new(source),
                    substitutions,
                },
                span,
            )
        })
}

fn quantified_existential(shared: &SharedGrammars) -> Grammar<Expr> {
    tla_token("\\E")
        .ignore_then(comma_list(quantifier_bound(shared)))
        .then_ignore(tla_token(":"))
        .then(cut(shared.expression.clone()))
        .map_with_span(|(bounds, body), span| {
            Expr::new(
                ExprKind::QuantifiedExistential {
                    bounds,
                    body: Box::new(body),
                },
                span,
            )
        })
}

fn quantified_universal(shared: &SharedGrammars) -> Grammar<Expr> {
    tla_token("\\A")
        .ignore_then(comma_list(quantifier_bound(shared)))
        .then_ignore(tla_token(":"))
        .then(cut(shared.expression.clone()))
        .map_with_span(|(bounds, body), span| {
            Expr::new(
                ExprKind::QuantifiedUniversal {
                    bounds,
                    body: Box::new(body),
                },
                span,
            )
        })
}

fn unquantified_existential(shared: &SharedGrammars) -> Grammar<Expr> {
    choice(vec![tla_token("\\EE"), tla_token("\\E")])
        .ignore_then(comma_list(tla_identifier()))
        .then_ignore(tla_token(":"))
        .then(cut(shared.expression.clone()))
        .map_with_span(|(ids, body), span| {
            Expr::new(
                ExprKind::Existential {
                    ids,
                    body: Box::new(body),
                },
                span,
            )
        })
}

fn unquantified_universal(shared: &SharedGrammars) -> Grammar<Expr> {
    choice(vec![tla_token("\\AA"), tla_token("\\A")])
        .ignore_then(comma_list(tla_identifier()))
        .then_ignore(tla_token(":"))
        .then(cut(shared.expression.clone()))
        .map_with_span(|(ids, body), span| {
            Expr::new(
                ExprKind::Universal {
                    ids,
                    body: Box::new(body),
                },
                span,
            )
        })
}

/// `{e1, ..., en}`.
fn set_constructor(shared: &SharedGrammars) -> Grammar<Expr> {
    tla_token("{")
        .ignore_then(choice(vec![
            comma_list(memoize(shared.expression.clone())),
            nop().map(|()| Vec::new()),
        ]))
        .then_ignore(tla_token("}"))
        .map_with_span(|elements, span| Expr::new(ExprKind::SetConstructor(elements), span))
}

/// `{x \in S : P}`.
fn set_refinement(shared: &SharedGrammars) -> Grammar<Expr> {
    tla_token("{")
        .ignore_then(identifier_or_tuple())
        .then_ignore(tla_token("\\in"))
        .then(cut(shared.expression.clone()))
        .then_ignore(tla_token(":"))
        .then(cut(shared.expression.clone()))
        .then_ignore(tla_token("}"))
        .map_with_span(|((binding, set), condition), span| {
            Expr::new(
                ExprKind::SetRefinement {
                    binding,
                    set: Box::new(set),
                    condition: Box::new(condition),
                },
                span,
            )
        })
}

/// `{e : x \in S}`.
fn set_comprehension(shared: &SharedGrammars) -> Grammar<Expr> {
    tla_token("{")
        .ignore_then(memoize(shared.expression.clone()))
        .then_ignore(tla_token(":"))
        .then(comma_list(quantifier_bound(shared)))
        .then_ignore(tla_token("}"))
        .map_with_span(|(body, bounds), span| {
            Expr::new(
                ExprKind::SetComprehension {
                    body: Box::new(body),
                    bounds,
                },
                span,
            )
        })
}

/// The ordered alternation over every operator-free expression form.
pub(crate) fn expression_no_operators(shared: &SharedGrammars) -> Grammar<Expr> {
    choice(vec![
        number(shared),
        string(shared),
        boolean(shared),
        group(shared),
        // <<A>>_v must be tried before a tuple would eat its `<<A>>`
        required_action(shared),
        tuple(shared),
        operator_call(shared),
        // looks like an operator call but is different (WF_.* / SF_.*)
        fairness_constraint(shared),
        conjunct(shared),
        disjunct(shared),
        if_expression(shared),
        general_identifier(shared),
        let_expression(shared),
        case_expression(shared),
        // starting with [
        function_constructor(shared),
        record_set(shared),
        record_constructor(shared),
        function_set(shared),
        maybe_action(shared),
        function_substitution(shared),
        // starting with \E, \EE, \A, \AA
        quantified_existential(shared),
        quantified_universal(shared),
        unquantified_existential(shared),
        unquantified_universal(shared),
        // starting with {
        set_constructor(shared),
        set_refinement(shared),
        set_comprehension(shared),
    ])
}
