//! The precedence-level grammar generator.
//!
//! One grammar is synthesized per precedence level 1..=17. A level admits an
//! infix operator iff the level lies inside the operator's range, with
//! operands drawn from the level just past the operator's upper bound
//! (generalized precedence climbing over ranged operators). Level 18 is the
//! operator-free expression grammar.
//!
//! Per level the resolution order is: infix first (a successful deeper
//! parse on the left disambiguates from a bare operand), then
//! postfix-or-bare-operand, prefix last — trying prefix first would commit
//! to a tight parse before checking whether the token is really the left
//! operand of a looser infix or postfix chain.

use tla_ir::{Expr, ExprKind, GeneralIdentifierPart, Span, Symbol};

use super::SharedGrammars;
use crate::combinator::{
    choice, cut, match_string, memoize, nop, reject, repeat, repeat1, Grammar, Recursive,
};
use crate::lexical::{comma_list, tla_identifier, tla_token, tla_token_one_of};
use crate::operators::{InfixOp, INFIX_OPERATORS, POSTFIX_OPERATORS, PREFIX_OPERATORS};

/// A postfix continuation applied after a base operand: a bracketed
/// function application or an explicit postfix operator.
struct PostfixPart {
    span: Span,
    kind: PostfixPartKind,
}

enum PostfixPartKind {
    Call(Vec<Expr>),
    Op {
        prefix: Vec<GeneralIdentifierPart>,
        op: Symbol,
    },
}

fn apply_postfix(mut base: Expr, parts: Vec<PostfixPart>) -> Expr {
    for part in parts {
        let span = base.span.merge(part.span);
        base = match part.kind {
            PostfixPartKind::Call(args) => Expr::new(
                ExprKind::FunctionCall {
                    function: Box::new(base),
                    args,
                },
                span,
            ),
            PostfixPartKind::Op { prefix, op } => Expr::new(
                ExprKind::Unary {
                    op,
                    prefix,
                    operand: Box::new(base),
                },
                span,
            ),
        };
    }
    base
}

/// An instance prefix: zero or more `Id!` / `Id(args)!` segments.
///
/// The `!` is refused when another `!` follows so that the `!!` infix
/// operator is left for the operator grammar.
pub(crate) fn instance_prefix(expression: &Grammar<Expr>) -> Grammar<Vec<GeneralIdentifierPart>> {
    let bang = tla_token("!").then_ignore(reject(match_string("!")));
    repeat(
        tla_identifier()
            .then(choice(vec![
                tla_token("(")
                    .ignore_then(comma_list(cut(expression.clone())))
                    .then_ignore(tla_token(")")),
                nop().map(|()| Vec::new()),
            ]))
            .then_ignore(bang)
            .map_with_span(|(name, args), span| GeneralIdentifierPart { span, name, args }),
    )
}

/// Build the full expression grammar from the operator tables.
pub(crate) fn expression_grammar(shared: &SharedGrammars) -> Grammar<Expr> {
    let levels: Vec<Recursive<Expr>> = (1..=17).map(|_| Recursive::declare()).collect();
    let handles: Vec<Grammar<Expr>> = levels.iter().map(Recursive::grammar).collect();
    for precedence in 1..=17u8 {
        levels[usize::from(precedence) - 1].define(level_grammar(precedence, &handles, shared));
    }
    handles[0].clone()
}

/// The grammar for the given level, or the operator-free base for 18.
fn level(handles: &[Grammar<Expr>], shared: &SharedGrammars, precedence: u8) -> Grammar<Expr> {
    if precedence >= 18 {
        shared.no_operators.clone()
    } else {
        handles[usize::from(precedence) - 1].clone()
    }
}

fn level_grammar(precedence: u8, handles: &[Grammar<Expr>], shared: &SharedGrammars) -> Grammar<Expr> {
    if precedence == 17 {
        return dot_level(shared);
    }

    let infix_options: Vec<Grammar<Expr>> = INFIX_OPERATORS
        .iter()
        .filter(|op| op.low <= precedence && precedence <= op.high)
        .map(|op| infix_option(op, handles, shared))
        .collect();

    let postfix_or_operand = memoize(level(handles, shared, precedence + 1))
        .then(repeat(choice(postfix_part_options(precedence, shared))))
        .map(|(base, parts)| apply_postfix(base, parts));

    choice(vec![
        choice(infix_options),
        postfix_or_operand,
        prefix_grammar(precedence, handles, shared),
    ])
}

fn infix_option(
    op: &'static InfixOp,
    handles: &[Grammar<Expr>],
    shared: &SharedGrammars,
) -> Grammar<Expr> {
    let operand = level(handles, shared, op.high + 1);
    let link = memoize(shared.instance_prefix.clone())
        .then(infix_operator_token(op.token))
        .then(operand.clone());
    // a left-associative operator folds repeated applications at its own
    // level; anything else admits a single pair
    let links = if op.left_assoc {
        repeat1(link)
    } else {
        link.map(|single| vec![single])
    };
    let token = op.token;
    memoize(operand).then(links).map(move |(first, links)| {
        let mut lhs = first;
        for ((prefix, op_span), rhs) in links {
            let span = lhs.span.merge(op_span).merge(rhs.span);
            lhs = Expr::new(
                ExprKind::Binary {
                    op: Symbol::new(op_span, token),
                    prefix,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                span,
            );
        }
        lhs
    })
}

/// Match an infix operator token, refusing it when a longer infix token
/// starts with it (`<` must not eat the `<` of `<=`).
fn infix_operator_token(token: &'static str) -> Grammar<Span> {
    let supersets: Vec<&'static str> = INFIX_OPERATORS
        .iter()
        .map(|op| op.token)
        .filter(|t| t.len() > token.len() && t.starts_with(token))
        .collect();
    let base = tla_token(token).map_with_span(|(), span| span);
    if supersets.is_empty() {
        base
    } else {
        let longer = choice(supersets.into_iter().map(tla_token).collect());
        reject(longer).ignore_then(base)
    }
}

fn prefix_grammar(precedence: u8, handles: &[Grammar<Expr>], shared: &SharedGrammars) -> Grammar<Expr> {
    let options: Recursive<Expr> = Recursive::declare();
    let per_op: Vec<Grammar<(Symbol, Expr)>> = PREFIX_OPERATORS
        .iter()
        .filter(|op| op.high >= precedence)
        .map(|op| {
            // `-` is the one token that is both unary and binary; the unary
            // occurrence is renamed to keep the two apart
            let name = if op.token == "-" { "-_" } else { op.token };
            tla_token(op.token)
                .map_with_span(move |(), span| Symbol::new(span, name))
                .then(choice(vec![
                    options.grammar(),
                    level(handles, shared, op.high + 1),
                ]))
        })
        .collect();
    options.define(
        memoize(shared.instance_prefix.clone())
            .then(choice(per_op))
            .map_with_span(|(prefix, (op, operand)), span| {
                Expr::new(
                    ExprKind::Unary {
                        op,
                        prefix,
                        operand: Box::new(operand),
                    },
                    span,
                )
            }),
    );
    options.grammar()
}

fn postfix_part_options(precedence: u8, shared: &SharedGrammars) -> Vec<Grammar<PostfixPart>> {
    let mut options = Vec::new();
    if precedence <= 16 {
        options.push(
            tla_token("[")
                .ignore_then(comma_list(cut(shared.expression.clone())))
                .then_ignore(tla_token("]"))
                .map_with_span(|args, span| PostfixPart {
                    span,
                    kind: PostfixPartKind::Call(args),
                }),
        );
    }
    let relevant: Vec<&'static str> = POSTFIX_OPERATORS
        .iter()
        .filter(|op| op.precedence >= precedence)
        .map(|op| op.token)
        .collect();
    options.push(
        shared
            .instance_prefix
            .clone()
            .then(tla_token_one_of(&relevant).spanned())
            .map_with_span(|(prefix, op), span| PostfixPart {
                span,
                kind: PostfixPartKind::Op {
                    prefix,
                    op: Symbol::new(op.span, op.value),
                },
            }),
    );
    options
}

/// Level 17: chained dot access, tried ahead of the generic handling.
///
/// Each link may first consume one postfix part of lower precedence: a
/// postfix operator may legally terminate mid-chain before a dot continues
/// it (`a'.b`). This carve-out is unique to the dot operator, since every
/// other infix operator binds looser than postfix.
fn dot_level(shared: &SharedGrammars) -> Grammar<Expr> {
    let mut fallback: Vec<Grammar<Option<PostfixPart>>> = postfix_part_options(1, shared)
        .into_iter()
        .map(|g| g.map(Some))
        .collect();
    fallback.push(nop().map(|()| None));

    let link = choice(fallback)
        .then_ignore(tla_token("."))
        .then(tla_identifier());

    choice(vec![
        memoize(shared.no_operators.clone())
            .then(repeat1(link))
            .map(|(base, links)| {
                let mut lhs = base;
                for (part, field) in links {
                    if let Some(part) = part {
                        lhs = apply_postfix(lhs, vec![part]);
                    }
                    let span = lhs.span.merge(field.span);
                    lhs = Expr::new(
                        ExprKind::Dot {
                            value: Box::new(lhs),
                            field,
                        },
                        span,
                    );
                }
                lhs
            }),
        memoize(shared.no_operators.clone()),
    ])
}
