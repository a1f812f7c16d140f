//! Unit- and module-level integration tests.

use pretty_assertions::assert_eq;
use tla_ir::{ExprKind, OpDeclKind, UnitKind};
use tla_parse::{read_modules, read_unit, read_units};

fn unit(source: &str) -> tla_ir::Unit {
    read_unit(source).unwrap_or_else(|e| panic!("{source:?} failed to parse: {e}"))
}

#[test]
fn operator_definitions() {
    let parsed = unit("Foo == 1");
    match parsed.kind {
        UnitKind::OperatorDefinition {
            name,
            params,
            local,
            ..
        } => {
            assert_eq!(name.name, "Foo");
            assert!(params.is_empty());
            assert!(!local);
        }
        other => panic!("expected operator definition, got {other:?}"),
    }

    let parsed = unit("Add(a, b) == a + b");
    match parsed.kind {
        UnitKind::OperatorDefinition { name, params, .. } => {
            assert_eq!(name.name, "Add");
            assert_eq!(params.len(), 2);
        }
        other => panic!("expected operator definition, got {other:?}"),
    }

    // infix definition: the operator is the defined name
    let parsed = unit("a \\oplus b == a + b");
    match parsed.kind {
        UnitKind::OperatorDefinition { name, params, .. } => {
            assert_eq!(name.name, "\\oplus");
            assert_eq!(params.len(), 2);
        }
        other => panic!("expected operator definition, got {other:?}"),
    }

    // prefix definition of unary minus gets the `-_` name
    let parsed = unit("- x == 0 - x");
    match parsed.kind {
        UnitKind::OperatorDefinition { name, .. } => assert_eq!(name.name, "-_"),
        other => panic!("expected operator definition, got {other:?}"),
    }

    // postfix definition
    let parsed = unit("x ' == x + 1");
    match parsed.kind {
        UnitKind::OperatorDefinition { name, params, .. } => {
            assert_eq!(name.name, "'");
            assert_eq!(params.len(), 1);
        }
        other => panic!("expected operator definition, got {other:?}"),
    }
}

#[test]
fn function_definitions() {
    let parsed = unit("f[x \\in S, y \\in T] == x + y");
    match parsed.kind {
        UnitKind::FunctionDefinition { name, bounds, .. } => {
            assert_eq!(name.name, "f");
            assert_eq!(bounds.len(), 2);
        }
        other => panic!("expected function definition, got {other:?}"),
    }
}

#[test]
fn declarations() {
    let parsed = unit("VARIABLES x, y");
    match parsed.kind {
        UnitKind::VariableDeclaration(vars) => {
            let names: Vec<_> = vars.iter().map(|v| v.name.as_str()).collect();
            assert_eq!(names, vec!["x", "y"]);
        }
        other => panic!("expected variable declaration, got {other:?}"),
    }

    let parsed = unit("CONSTANTS c, op(_, _), _ \\prec _");
    match parsed.kind {
        UnitKind::ConstantDeclaration(decls) => {
            assert_eq!(decls.len(), 3);
            assert!(matches!(decls[0].kind, OpDeclKind::Id(_)));
            assert!(
                matches!(&decls[1].kind, OpDeclKind::Named { arity, .. } if *arity == 2)
            );
            assert!(matches!(decls[2].kind, OpDeclKind::Infix(_)));
        }
        other => panic!("expected constant declaration, got {other:?}"),
    }
}

#[test]
fn assumptions_and_theorems() {
    assert!(matches!(unit("ASSUME x > 0").kind, UnitKind::Assumption(_)));
    assert!(matches!(unit("AXIOM TRUE").kind, UnitKind::Assumption(_)));
    let parsed = unit("THEOREM x = 1 => x > 0");
    match parsed.kind {
        UnitKind::Theorem(body) => assert!(matches!(body.kind, ExprKind::Binary { .. })),
        other => panic!("expected theorem, got {other:?}"),
    }
}

#[test]
fn instances_and_module_definitions() {
    let parsed = unit("INSTANCE Naturals");
    match parsed.kind {
        UnitKind::Instance(instance) => {
            assert_eq!(instance.module.name, "Naturals");
            assert!(instance.remappings.is_empty());
            assert!(!instance.local);
        }
        other => panic!("expected instance, got {other:?}"),
    }

    let parsed = unit("LOCAL INSTANCE Sequences WITH a <- 1, + <- plus");
    match parsed.kind {
        UnitKind::Instance(instance) => {
            assert!(instance.local);
            assert_eq!(instance.remappings.len(), 2);
            assert_eq!(instance.remappings[0].from.name, "a");
            assert_eq!(instance.remappings[1].from.name, "+");
        }
        other => panic!("expected instance, got {other:?}"),
    }

    let parsed = unit("M(a, b) == INSTANCE N WITH c <- a");
    match parsed.kind {
        UnitKind::ModuleDefinition {
            name,
            params,
            instance,
            ..
        } => {
            assert_eq!(name.name, "M");
            assert_eq!(params.len(), 2);
            assert_eq!(instance.module.name, "N");
        }
        other => panic!("expected module definition, got {other:?}"),
    }
}

#[test]
fn units_consume_as_many_as_match() {
    let units = read_units("VARIABLE x\nInit == x = 0\nNext == x' = x + 1\n").expect("units");
    assert_eq!(units.len(), 3);
    assert!(matches!(units[0].kind, UnitKind::VariableDeclaration(_)));
    assert!(matches!(
        units[1].kind,
        UnitKind::OperatorDefinition { .. }
    ));

    // trailing text that is not a unit is simply left unconsumed
    let units = read_units("Foo == 1\n====").expect("units");
    assert_eq!(units.len(), 1);
}

#[test]
fn modules_parse_with_surrounding_text() {
    let source = "\
This prose precedes the module and is skipped.

---- MODULE Counter ----
EXTENDS Naturals, Sequences
VARIABLE x

Init == x = 0
Next == x' = x + 1
Spec == Init /\\ [][Next]_x
====
And this prose trails it.";
    let modules = read_modules(source).expect("modules");
    assert_eq!(modules.len(), 1);
    let module = &modules[0];
    assert_eq!(module.name.name, "Counter");
    let extends: Vec<_> = module.extends.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(extends, vec!["Naturals", "Sequences"]);
    assert_eq!(module.units.len(), 4);
}

#[test]
fn modules_require_at_least_one() {
    assert!(read_modules("no module here").is_err());
}

#[test]
fn multiple_modules_in_one_document() {
    let source = "\
---- MODULE A ----
Foo == 1
====
interlude
---- MODULE B ----
Bar == 2
====";
    let modules = read_modules(source).expect("modules");
    assert_eq!(modules.len(), 2);
    assert_eq!(modules[0].name.name, "A");
    assert_eq!(modules[1].name.name, "B");
}

#[test]
fn nested_modules_are_units() {
    let source = "\
---- MODULE Outer ----
VARIABLE x
---- MODULE Inner ----
Foo == 1
====
Bar == 2
====";
    let modules = read_modules(source).expect("modules");
    assert_eq!(modules.len(), 1);
    let outer = &modules[0];
    assert_eq!(outer.name.name, "Outer");
    assert_eq!(outer.units.len(), 3);
    match &outer.units[1].kind {
        UnitKind::Module(inner) => {
            assert_eq!(inner.name.name, "Inner");
            assert_eq!(inner.units.len(), 1);
        }
        other => panic!("expected nested module, got {other:?}"),
    }
}

#[test]
fn units_separated_by_dashes() {
    let source = "\
---- MODULE T ----
A == 1
----
B == 2
====";
    let modules = read_modules(source).expect("modules");
    assert_eq!(modules[0].units.len(), 2);
}

#[test]
fn translation_marker_terminates_unit_scan() {
    let source = "\
---- MODULE T ----
VARIABLE x
\\* BEGIN TRANSLATION
this text was generated and is not reparsed ====
====";
    let modules = read_modules(source).expect("modules");
    assert_eq!(modules.len(), 1);
    assert_eq!(modules[0].units.len(), 1);
}

#[test]
fn local_definitions() {
    let parsed = unit("LOCAL Helper(x) == x + 1");
    match parsed.kind {
        UnitKind::OperatorDefinition { local, .. } => assert!(local),
        other => panic!("expected operator definition, got {other:?}"),
    }
}

#[test]
fn module_errors_point_inside_the_module() {
    let source = "\
---- MODULE Bad ----
THEOREM +++
====";
    let failure = read_modules(source).unwrap_err();
    assert!(
        failure.span.start.line >= 2,
        "failure should be inside the module body, got {failure:?}"
    );
}

#[test]
fn parsing_modules_is_deterministic() {
    let source = "---- MODULE D ----\nFoo == <<1, \"two\", TRUE>>\n====";
    assert_eq!(
        read_modules(source).expect("modules"),
        read_modules(source).expect("modules")
    );
}
