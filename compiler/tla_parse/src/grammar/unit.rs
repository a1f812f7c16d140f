//! Units (definitions and declarations) and module structure.

use tla_ir::{
    Ident, Instance, InstanceRemapping, Module, OpDecl, OpDeclKind, Unit, UnitKind,
};

use super::{quantifier_bound, SharedGrammars};
use crate::combinator::{choice, cut, nop, reject, repeat, Grammar};
use crate::lexical::{
    comma_list, parse_4_dashes_or_more, parse_4_equals_or_more, parse_start_translation,
    tla_identifier, tla_token, tla_token_one_of,
};
use crate::operators::{infix_tokens, postfix_tokens, prefix_tokens};

/// A declared operator shape: `name`, `name(_, _)`, `op _`, `_ op _`, `_ op`.
pub(crate) fn op_decl() -> Grammar<OpDecl> {
    choice(vec![
        tla_identifier()
            .then_ignore(tla_token("("))
            .then(comma_list(tla_token("_")))
            .then_ignore(tla_token(")"))
            .map_with_span(|(name, params), span| OpDecl {
                span,
                kind: OpDeclKind::Named {
                    name,
                    arity: params.len() as u32,
                },
            }),
        tla_identifier().map_with_span(|name, span| OpDecl {
            span,
            kind: OpDeclKind::Id(name),
        }),
        tla_token_one_of(&prefix_tokens())
            .spanned()
            .then_ignore(tla_token("_"))
            .map_with_span(|op, span| {
                // `-` declared prefix is the unary minus `-_`
                let name = if op.value == "-" { "-_" } else { op.value };
                OpDecl {
                    span,
                    kind: OpDeclKind::Prefix(Ident::new(op.span, name)),
                }
            }),
        tla_token("_")
            .ignore_then(tla_token_one_of(&infix_tokens()).spanned())
            .then_ignore(tla_token("_"))
            .map_with_span(|op, span| OpDecl {
                span,
                kind: OpDeclKind::Infix(Ident::new(op.span, op.value)),
            }),
        tla_token("_")
            .ignore_then(tla_token_one_of(&postfix_tokens()).spanned())
            .map_with_span(|op, span| OpDecl {
                span,
                kind: OpDeclKind::Postfix(Ident::new(op.span, op.value)),
            }),
    ])
}

/// Operator definitions in all four surface shapes.
pub(crate) fn operator_definition(shared: &SharedGrammars, local: bool) -> Grammar<Unit> {
    let prefix_definition = tla_token_one_of(&prefix_tokens())
        .spanned()
        .then(tla_identifier())
        .then_ignore(tla_token("=="))
        .then(cut(shared.expression.clone()))
        .map_with_span(move |((op, param), body), span| {
            let name = if op.value == "-" { "-_" } else { op.value };
            Unit::new(
                UnitKind::OperatorDefinition {
                    name: Ident::new(op.span, name),
                    params: vec![OpDecl {
                        span: param.span,
                        kind: OpDeclKind::Id(param),
                    }],
                    body,
                    local,
                },
                span,
            )
        });
    let infix_definition = tla_identifier()
        .then(tla_token_one_of(&infix_tokens()).spanned())
        .then(tla_identifier())
        .then_ignore(tla_token("=="))
        .then(cut(shared.expression.clone()))
        .map_with_span(move |(((lhs, op), rhs), body), span| {
            Unit::new(
                UnitKind::OperatorDefinition {
                    name: Ident::new(op.span, op.value),
                    params: vec![
                        OpDecl {
                            span: lhs.span,
                            kind: OpDeclKind::Id(lhs),
                        },
                        OpDecl {
                            span: rhs.span,
                            kind: OpDeclKind::Id(rhs),
                        },
                    ],
                    body,
                    local,
                },
                span,
            )
        });
    let postfix_definition = tla_identifier()
        .then(tla_token_one_of(&postfix_tokens()).spanned())
        .then_ignore(tla_token("=="))
        .then(cut(shared.expression.clone()))
        .map_with_span(move |((param, op), body), span| {
            Unit::new(
                UnitKind::OperatorDefinition {
                    name: Ident::new(op.span, op.value),
                    params: vec![OpDecl {
                        span: param.span,
                        kind: OpDeclKind::Id(param),
                    }],
                    body,
                    local,
                },
                span,
            )
        });
    let general_definition = tla_identifier()
        .then(choice(vec![
            tla_token("(")
                .ignore_then(comma_list(op_decl()))
                .then_ignore(tla_token(")")),
            nop().map(|()| Vec::new()),
        ]))
        .then_ignore(tla_token("=="))
        .then(cut(shared.expression.clone()))
        .map_with_span(move |((name, params), body), span| {
            Unit::new(
                UnitKind::OperatorDefinition {
                    name,
                    params,
                    body,
                    local,
                },
                span,
            )
        });
    choice(vec![
        prefix_definition,
        infix_definition,
        postfix_definition,
        general_definition,
    ])
}

/// `f[x \in S] == body`.
pub(crate) fn function_definition(shared: &SharedGrammars, local: bool) -> Grammar<Unit> {
    tla_identifier()
        .then_ignore(tla_token("["))
        .then(comma_list(quantifier_bound(shared)))
        .then_ignore(tla_token("]"))
        .then_ignore(tla_token("=="))
        .then(cut(shared.expression.clone()))
        .map_with_span(move |((name, bounds), body), span| {
            Unit::new(
                UnitKind::FunctionDefinition {
                    name,
                    bounds,
                    body,
                    local,
                },
                span,
            )
        })
}

/// `INSTANCE M [WITH a <- e, + <- op, ...]`.
pub(crate) fn instance(shared: &SharedGrammars, local: bool) -> Grammar<Instance> {
    let remap_name = choice(vec![
        tla_identifier(),
        tla_token_one_of(&prefix_tokens())
            .spanned()
            .map(|op| Ident::new(op.span, op.value)),
        tla_token_one_of(&infix_tokens())
            .spanned()
            .map(|op| Ident::new(op.span, op.value)),
        tla_token_one_of(&postfix_tokens())
            .spanned()
            .map(|op| Ident::new(op.span, op.value)),
    ]);
    let remapping = remap_name
        .then_ignore(tla_token("<-"))
        .then(cut(shared.expression.clone()))
        .map_with_span(|(from, to), span| InstanceRemapping { span, from, to });
    tla_token("INSTANCE")
        .ignore_then(tla_identifier())
        .then(choice(vec![
            tla_token("WITH").ignore_then(comma_list(remapping)),
            nop().map(|()| Vec::new()),
        ]))
        .map_with_span(move |(module, remappings), span| Instance {
            span,
            module,
            remappings,
            local,
        })
}

/// `M(params) == INSTANCE N WITH ...`.
pub(crate) fn module_definition(shared: &SharedGrammars, local: bool) -> Grammar<Unit> {
    tla_identifier()
        .then(choice(vec![
            tla_token("(")
                .ignore_then(comma_list(op_decl()))
                .then_ignore(tla_token(")")),
            nop().map(|()| Vec::new()),
        ]))
        .then_ignore(tla_token("=="))
        .then(instance(shared, local))
        .map_with_span(move |((name, params), inst), span| {
            Unit::new(
                UnitKind::ModuleDefinition {
                    name,
                    params,
                    instance: inst,
                    local,
                },
                span,
            )
        })
}

fn variable_declaration() -> Grammar<Unit> {
    tla_token_one_of(&["VARIABLES", "VARIABLE"])
        .ignore_then(comma_list(tla_identifier()))
        .map_with_span(|vars, span| Unit::new(UnitKind::VariableDeclaration(vars), span))
}

fn constant_declaration() -> Grammar<Unit> {
    tla_token_one_of(&["CONSTANTS", "CONSTANT"])
        .ignore_then(comma_list(op_decl()))
        .map_with_span(|decls, span| Unit::new(UnitKind::ConstantDeclaration(decls), span))
}

fn assumption(shared: &SharedGrammars) -> Grammar<Unit> {
    tla_token_one_of(&["ASSUME", "ASSUMPTION", "AXIOM"])
        .ignore_then(cut(shared.expression.clone()))
        .map_with_span(|body, span| Unit::new(UnitKind::Assumption(body), span))
}

fn theorem(shared: &SharedGrammars) -> Grammar<Unit> {
    tla_token("THEOREM")
        .ignore_then(cut(shared.expression.clone()))
        .map_with_span(|body, span| Unit::new(UnitKind::Theorem(body), span))
}

/// Any top-level unit, optionally preceded by a `----` separator line.
pub(crate) fn unit_grammar(shared: &SharedGrammars) -> Grammar<Unit> {
    let instance_unit = |local: bool| {
        instance(shared, local)
            .map_with_span(|inst, span| Unit::new(UnitKind::Instance(inst), span))
    };
    let local_group = cut(tla_token("LOCAL")).ignore_then(choice(vec![
        instance_unit(true),
        module_definition(shared, true),
        function_definition(shared, true),
        operator_definition(shared, true),
    ]));
    let plain_group = choice(vec![
        instance_unit(false),
        module_definition(shared, false),
        function_definition(shared, false),
        operator_definition(shared, false),
        variable_declaration(),
        constant_declaration(),
        assumption(shared),
        theorem(shared),
        shared
            .module
            .clone()
            .map_with_span(|module, span| Unit::new(UnitKind::Module(module), span)),
    ]);
    let body = choice(vec![local_group, plain_group]);
    // a separator line may precede a unit, but a nested module parses its
    // own leading dashes, so the undashed alternative must stay available
    choice(vec![
        parse_4_dashes_or_more().ignore_then(body.clone()),
        body,
    ])
}

/// `---- MODULE Name ---- [EXTENDS ...] units (==== | translation marker)`.
pub(crate) fn module_grammar(shared: &SharedGrammars) -> Grammar<Module> {
    let extends = tla_token("EXTENDS").ignore_then(comma_list(tla_identifier()));
    parse_4_dashes_or_more()
        .ignore_then(cut(tla_token("MODULE")))
        .ignore_then(tla_identifier())
        .then_ignore(parse_4_dashes_or_more())
        .then(choice(vec![extends, nop().map(|()| Vec::new())]))
        .then(repeat(
            reject(parse_start_translation()).ignore_then(shared.unit.clone()),
        ))
        .then_ignore(choice(vec![
            parse_start_translation(),
            parse_4_equals_or_more(),
        ]))
        .map_with_span(|((name, extends), units), span| Module {
            span,
            name,
            extends,
            units,
        })
}
