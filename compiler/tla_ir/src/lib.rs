//! Source locations and AST types for the TLA+ front end.
//!
//! This crate is pure data: the parser constructs these values and later
//! phases consume them. Every node carries the [`Span`] it was read from.

mod ast;
mod span;

pub use ast::{
    BoundTargets, CaseArm, Expr, ExprKind, FairnessKind, GeneralIdentifierPart, Ident,
    IdentifierOrTuple, Instance, InstanceRemapping, Module, NumberBase, OpDecl, OpDeclKind,
    QuantifierBound, RecordField, RecordSetField, SubstitutionKey, SubstitutionPair, Symbol, Unit,
    UnitKind,
};
pub use span::{Located, Pos, Span};
