use sable_checker::ast::builder::{
    binding_pattern, generic_ty, literal_pattern, param, ty, variant_pattern, wildcard,
    ProgramBuilder,
};
use sable_checker::ast::{Literal, MatchArm, StmtId};
use sable_checker::{check_program, CheckOptions, DiagnosticLevel, Diagnostics};

fn check(builder: ProgramBuilder) -> Diagnostics {
    let program = builder.finish();
    check_program(&program, &CheckOptions::default()).diagnostics
}

fn result_enum(b: &mut ProgramBuilder) {
    let decl = b.enum_(
        "Result",
        &["T", "E"],
        vec![("Ok", vec![ty("T")]), ("Err", vec![ty("E")])],
    );
    b.push_item(decl);
}

/// `match Ok(1) { <arms> }`
fn match_ok_literal(b: &mut ProgramBuilder, arms: Vec<MatchArm>) -> StmtId {
    let one = b.int("1");
    let one = b.positional(one);
    let subject = b.call_named("Ok", vec![one]);
    let stmt = b.match_(subject, arms);
    b.push_item(stmt)
}

#[test]
fn missing_variant_is_a_warning_naming_it() {
    let mut b = ProgramBuilder::new();
    result_enum(&mut b);
    let arm = b.arm(variant_pattern("Ok", &["v"]), Vec::new());
    match_ok_literal(&mut b, vec![arm]);
    let diagnostics = check(b);
    assert_eq!(diagnostics.codes(), vec!["W2601"]);
    let warning = &diagnostics.entries()[0];
    assert_eq!(warning.level, DiagnosticLevel::Warning);
    assert!(warning.message.contains("'Err'"), "{}", warning.message);
    assert!(!diagnostics.has_errors());
}

#[test]
fn covering_every_variant_is_exhaustive() {
    let mut b = ProgramBuilder::new();
    result_enum(&mut b);
    let ok = b.arm(variant_pattern("Ok", &["v"]), Vec::new());
    let err = b.arm(variant_pattern("Err", &["e"]), Vec::new());
    match_ok_literal(&mut b, vec![ok, err]);
    assert!(check(b).is_empty());
}

#[test]
fn wildcard_and_bindings_are_catch_all() {
    let mut b = ProgramBuilder::new();
    result_enum(&mut b);
    let ok = b.arm(variant_pattern("Ok", &["v"]), Vec::new());
    let rest = b.arm(wildcard(), Vec::new());
    match_ok_literal(&mut b, vec![ok, rest]);
    let ok = b.arm(variant_pattern("Ok", &["v"]), Vec::new());
    let other = b.arm(binding_pattern("other"), Vec::new());
    match_ok_literal(&mut b, vec![ok, other]);
    assert!(check(b).is_empty());
}

fn color_enum(b: &mut ProgramBuilder) -> StmtId {
    let decl = b.enum_(
        "Color",
        &[],
        vec![("Red", Vec::new()), ("Green", Vec::new()), ("Blue", Vec::new())],
    );
    b.push_item(decl);
    let red = b.ident("Red");
    let stmt = b.let_("c", Some(ty("Color")), Some(red));
    b.push_item(stmt)
}

#[test]
fn unit_variants_match_by_name() {
    let mut b = ProgramBuilder::new();
    color_enum(&mut b);
    let arms = ["Red", "Green"]
        .into_iter()
        .map(|name| b.arm(binding_pattern(name), Vec::new()))
        .collect();
    let subject = b.ident("c");
    let stmt = b.match_(subject, arms);
    b.push_item(stmt);
    let diagnostics = check(b);
    assert_eq!(diagnostics.codes(), vec!["W2601"]);
    assert!(diagnostics.entries()[0].message.contains("'Blue'"));
}

#[test]
fn several_missing_variants_are_listed_together() {
    let mut b = ProgramBuilder::new();
    color_enum(&mut b);
    let arm = b.arm(binding_pattern("Red"), Vec::new());
    let subject = b.ident("c");
    let stmt = b.match_(subject, vec![arm]);
    b.push_item(stmt);
    let diagnostics = check(b);
    assert_eq!(diagnostics.len(), 1);
    let message = &diagnostics.entries()[0].message;
    assert!(message.contains("'Green'") && message.contains("'Blue'"), "{message}");
}

#[test]
fn foreign_variant_is_an_error_and_suppresses_the_warning() {
    let mut b = ProgramBuilder::new();
    color_enum(&mut b);
    let other = b.enum_("Size", &[], vec![("Small", Vec::new())]);
    b.push_item(other);
    let arm = b.arm(binding_pattern("Small"), Vec::new());
    let subject = b.ident("c");
    let stmt = b.match_(subject, vec![arm]);
    b.push_item(stmt);
    assert_eq!(check(b).codes(), vec!["E2603"]);
}

#[test]
fn payload_arity_is_checked() {
    let mut b = ProgramBuilder::new();
    result_enum(&mut b);
    let ok = b.arm(variant_pattern("Ok", &["a", "b"]), Vec::new());
    match_ok_literal(&mut b, vec![ok]);
    assert_eq!(check(b).codes(), vec!["E2601"]);
}

#[test]
fn pattern_names_must_be_variants() {
    let mut b = ProgramBuilder::new();
    result_enum(&mut b);
    let helper = b.function("helper", &[], Vec::new(), None, Vec::new());
    b.push_item(helper);
    let bad = b.arm(variant_pattern("helper", &["x"]), Vec::new());
    let unknown = b.arm(variant_pattern("Nope", &[]), Vec::new());
    match_ok_literal(&mut b, vec![bad, unknown]);
    assert_eq!(check(b).codes(), vec!["E2604", "E2001"]);
}

#[test]
fn literal_patterns_must_fit_the_subject() {
    let mut b = ProgramBuilder::new();
    let one = b.int("1");
    let number = b.let_("n", Some(ty("i32")), Some(one));
    b.push_item(number);
    let fits = b.arm(literal_pattern(Literal::Integer("1".to_string())), Vec::new());
    let mismatched = b.arm(literal_pattern(Literal::String("one".to_string())), Vec::new());
    let subject = b.ident("n");
    let stmt = b.match_(subject, vec![fits, mismatched]);
    b.push_item(stmt);
    assert_eq!(check(b).codes(), vec!["E2602"]);
}

#[test]
fn payload_bindings_take_substituted_types() {
    let mut b = ProgramBuilder::new();
    result_enum(&mut b);
    let value = b.ident("v");
    let misuse = b.let_("s", Some(ty("string")), Some(value));
    let ok = b.arm(variant_pattern("Ok", &["v"]), vec![misuse]);
    let error = b.ident("e");
    let fine = b.let_("s", Some(ty("string")), Some(error));
    let err = b.arm(variant_pattern("Err", &["e"]), vec![fine]);
    let subject = b.ident("r");
    let matched = b.match_(subject, vec![ok, err]);
    let function = b.function(
        "inspect",
        &[],
        vec![param("r", Some(generic_ty("Result", vec![ty("i32"), ty("string")])))],
        None,
        vec![matched],
    );
    b.push_item(function);
    assert_eq!(check(b).codes(), vec!["E2101"]);
}

#[test]
fn nullable_enum_subject_is_still_checked() {
    let mut b = ProgramBuilder::new();
    color_enum(&mut b);
    let arm = b.arm(binding_pattern("Red"), Vec::new());
    let subject = b.ident("maybe");
    let matched = b.match_(subject, vec![arm]);
    let function = b.function(
        "paint",
        &[],
        vec![param(
            "maybe",
            Some(sable_checker::ast::builder::union_ty(vec![ty("Color"), ty("null")])),
        )],
        None,
        vec![matched],
    );
    b.push_item(function);
    assert_eq!(check(b).codes(), vec!["W2601"]);
}
