use sable_checker::ast::builder::{param, ty, union_ty, ProgramBuilder};
use sable_checker::ast::{BinaryOperator, ExprId, StmtId};
use sable_checker::{check_program, CheckOptions};

fn codes(builder: ProgramBuilder) -> Vec<&'static str> {
    let program = builder.finish();
    check_program(&program, &CheckOptions::default())
        .diagnostics
        .codes()
}

fn optional_string() -> sable_checker::ast::TypeExpression {
    union_ty(vec![ty("string"), ty("null")])
}

/// `let <binding>: <annotation> = <name>;`
fn use_as(b: &mut ProgramBuilder, binding: &str, annotation: &str, name: &str) -> StmtId {
    let value = b.ident(name);
    b.let_(binding, Some(ty(annotation)), Some(value))
}

fn null_check(b: &mut ProgramBuilder, operator: BinaryOperator, null_first: bool) -> ExprId {
    let name = b.ident("name");
    let null = b.null();
    if null_first {
        b.binary(operator, null, name)
    } else {
        b.binary(operator, name, null)
    }
}

/// Wraps `body` in `fn greet(name: string | null) { ... }`.
fn in_function(b: &mut ProgramBuilder, body: Vec<StmtId>) {
    let function = b.function(
        "greet",
        &[],
        vec![param("name", Some(optional_string()))],
        None,
        body,
    );
    b.push_item(function);
}

#[test]
fn inequality_narrows_both_branches() {
    let mut b = ProgramBuilder::new();
    let condition = null_check(&mut b, BinaryOperator::NotEqual, false);
    let present = use_as(&mut b, "s", "string", "name");
    let consequent = b.block(vec![present]);
    let absent = use_as(&mut b, "n", "null", "name");
    let alternative = b.block(vec![absent]);
    let branch = b.if_(condition, consequent, Some(alternative));
    let after = use_as(&mut b, "t", "string", "name");
    in_function(&mut b, vec![branch, after]);
    assert_eq!(codes(b), vec!["E2101"]);
}

#[test]
fn equality_with_null_first_narrows_the_else_branch() {
    let mut b = ProgramBuilder::new();
    let condition = null_check(&mut b, BinaryOperator::Equal, true);
    let absent = use_as(&mut b, "n", "null", "name");
    let consequent = b.block(vec![absent]);
    let present = use_as(&mut b, "s", "string", "name");
    let alternative = b.block(vec![present]);
    let branch = b.if_(condition, consequent, Some(alternative));
    in_function(&mut b, vec![branch]);
    assert!(codes(b).is_empty());
}

#[test]
fn without_a_null_check_the_union_is_kept() {
    let mut b = ProgramBuilder::new();
    let usage = use_as(&mut b, "s", "string", "name");
    in_function(&mut b, vec![usage]);
    assert_eq!(codes(b), vec!["E2101"]);
}

#[test]
fn narrowing_ignores_parentheses() {
    let mut b = ProgramBuilder::new();
    let condition = null_check(&mut b, BinaryOperator::NotEqual, false);
    let condition = b.grouping(condition);
    let present = use_as(&mut b, "s", "string", "name");
    let consequent = b.block(vec![present]);
    let branch = b.if_(condition, consequent, None);
    in_function(&mut b, vec![branch]);
    assert!(codes(b).is_empty());
}

#[test]
fn other_comparisons_do_not_narrow() {
    let mut b = ProgramBuilder::new();
    let name = b.ident("name");
    let text = b.string("x");
    let condition = b.binary(BinaryOperator::NotEqual, name, text);
    let present = use_as(&mut b, "s", "string", "name");
    let consequent = b.block(vec![present]);
    let branch = b.if_(condition, consequent, None);
    in_function(&mut b, vec![branch]);
    assert_eq!(codes(b), vec!["E2101"]);
}

#[test]
fn assignment_drops_narrowing() {
    let mut b = ProgramBuilder::new();
    let initial = b.string("value");
    let declared = b.let_("name", Some(optional_string()), Some(initial));
    let condition = null_check(&mut b, BinaryOperator::NotEqual, false);
    let target = b.ident("name");
    let null = b.null();
    let reset = b.assign(target, null);
    let reset = b.expr_stmt(reset);
    let usage = use_as(&mut b, "s", "string", "name");
    let consequent = b.block(vec![reset, usage]);
    let branch = b.if_(condition, consequent, None);
    b.push_item(declared);
    b.push_item(branch);
    assert_eq!(codes(b), vec!["E2101"]);
}

#[test]
fn narrowing_is_branch_local() {
    let mut b = ProgramBuilder::new();
    let initial = b.null();
    let declared = b.let_("name", Some(optional_string()), Some(initial));
    let condition = null_check(&mut b, BinaryOperator::NotEqual, false);
    let present = use_as(&mut b, "s", "string", "name");
    let consequent = b.block(vec![present]);
    let branch = b.if_(condition, consequent, None);
    let after = use_as(&mut b, "t", "string", "name");
    for stmt in [declared, branch, after] {
        b.push_item(stmt);
    }
    assert_eq!(codes(b), vec!["E2101"]);
}

#[test]
fn a_new_binding_shadows_the_narrowed_name() {
    let mut b = ProgramBuilder::new();
    let condition = null_check(&mut b, BinaryOperator::NotEqual, false);
    let one = b.int("1");
    let shadow = b.let_("name", Some(ty("i32")), Some(one));
    let usage = use_as(&mut b, "k", "i32", "name");
    let consequent = b.block(vec![shadow, usage]);
    let branch = b.if_(condition, consequent, None);
    in_function(&mut b, vec![branch]);
    assert!(codes(b).is_empty());
}

#[test]
fn assignment_in_a_nested_block_drops_narrowing() {
    let mut b = ProgramBuilder::new();
    let initial = b.string("value");
    let declared = b.let_("name", Some(optional_string()), Some(initial));
    let condition = null_check(&mut b, BinaryOperator::NotEqual, false);
    let target = b.ident("name");
    let null = b.null();
    let reset = b.assign(target, null);
    let reset = b.expr_stmt(reset);
    let inner = b.block(vec![reset]);
    let inner = b.stmt(sable_checker::ast::StatementKind::Block(inner));
    let usage = use_as(&mut b, "s", "string", "name");
    let consequent = b.block(vec![inner, usage]);
    let branch = b.if_(condition, consequent, None);
    b.push_item(declared);
    b.push_item(branch);
    assert_eq!(codes(b), vec!["E2101"]);
}
