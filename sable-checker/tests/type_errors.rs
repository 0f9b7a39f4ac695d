use sable_checker::ast::builder::{
    function_ty, generic_ty, param, tuple_ty, ty, union_ty, ProgramBuilder,
};
use sable_checker::ast::{BinaryOperator, ExprId, UnaryOperator};
use sable_checker::{
    check_program, CheckOptions, CheckResult, ConditionPolicy, DiagnosticCode, Primitive,
};

fn run(builder: ProgramBuilder, options: &CheckOptions) -> CheckResult {
    let program = builder.finish();
    check_program(&program, options)
}

fn codes(builder: ProgramBuilder) -> Vec<&'static str> {
    run(builder, &CheckOptions::default()).diagnostics.codes()
}

fn codes_with(builder: ProgramBuilder, options: CheckOptions) -> Vec<&'static str> {
    run(builder, &options).diagnostics.codes()
}

/// `let x: <annotation> = <digits>;`
fn integer_let(annotation: &str, digits: &str) -> ProgramBuilder {
    let mut b = ProgramBuilder::new();
    let value = b.int(digits);
    let stmt = b.let_("x", Some(ty(annotation)), Some(value));
    b.push_item(stmt);
    b
}

#[test]
fn integer_literal_out_of_signed_range() {
    let result = run(integer_let("i8", "999"), &CheckOptions::default());
    assert_eq!(result.diagnostics.codes(), vec!["E2401"]);
    let message = &result.diagnostics.entries()[0].message;
    assert!(message.contains("127"), "expected the i8 bound in {message:?}");
}

#[test]
fn unsigned_range_boundary() {
    assert!(codes(integer_let("u8", "255")).is_empty());
    assert_eq!(codes(integer_let("u8", "256")), vec!["E2401"]);
}

#[test]
fn negated_literal_uses_its_sign() {
    let mut b = ProgramBuilder::new();
    let value = b.int("128");
    let negated = b.unary(UnaryOperator::Negative, value);
    let stmt = b.let_("x", Some(ty("i8")), Some(negated));
    b.push_item(stmt);
    assert!(codes(b).is_empty());

    let mut b = ProgramBuilder::new();
    let value = b.int("1");
    let negated = b.unary(UnaryOperator::Negative, value);
    let stmt = b.let_("x", Some(ty("u32")), Some(negated));
    b.push_item(stmt);
    assert_eq!(codes(b), vec!["E2401"]);
}

#[test]
fn huge_literals_are_out_of_range_everywhere() {
    let digits = "340282366920938463463374607431768211456000";
    assert_eq!(codes(integer_let("u64", digits)), vec!["E2401"]);
}

#[test]
fn unannotated_literals_use_the_configured_default() {
    let mut b = ProgramBuilder::new();
    let value = b.int("3_000_000_000");
    let stmt = b.let_("x", None, Some(value));
    b.push_item(stmt);
    assert_eq!(codes(b), vec!["E2401"]);

    let mut b = ProgramBuilder::new();
    let value = b.int("3_000_000_000");
    let stmt = b.let_("x", None, Some(value));
    b.push_item(stmt);
    let options = CheckOptions {
        default_integer: Primitive::I64,
        ..CheckOptions::default()
    };
    assert!(codes_with(b, options).is_empty());
}

#[test]
fn literal_adopts_integer_member_of_expected_union() {
    let mut b = ProgramBuilder::new();
    let value = b.int("300");
    let stmt = b.let_("x", Some(union_ty(vec![ty("u8"), ty("null")])), Some(value));
    b.push_item(stmt);
    assert_eq!(codes(b), vec!["E2401"]);
}

#[test]
fn redeclaration_reports_once_and_keeps_first_type() {
    let mut b = ProgramBuilder::new();
    let one = b.int("1");
    let first = b.let_("x", Some(ty("i32")), Some(one));
    let text = b.string("a");
    let second = b.let_("x", Some(ty("string")), Some(text));
    let x = b.ident("x");
    let third = b.let_("y", Some(ty("i32")), Some(x));
    for stmt in [first, second, third] {
        b.push_item(stmt);
    }
    assert_eq!(codes(b), vec!["E2002"]);
}

#[test]
fn shadowing_in_a_nested_block_is_allowed() {
    let mut b = ProgramBuilder::new();
    let one = b.int("1");
    let outer = b.let_("x", Some(ty("i32")), Some(one));
    let text = b.string("a");
    let inner = b.let_("x", Some(ty("string")), Some(text));
    let block = b.block(vec![inner]);
    let block = b.stmt(sable_checker::ast::StatementKind::Block(block));
    b.push_item(outer);
    b.push_item(block);
    assert!(codes(b).is_empty());
}

fn struct_s(b: &mut ProgramBuilder) {
    let decl = b.struct_("S", &[], vec![("num", ty("i32"))], Vec::new());
    b.push_item(decl);
}

#[test]
fn struct_literal_with_unknown_field() {
    let mut b = ProgramBuilder::new();
    struct_s(&mut b);
    let one = b.int("1");
    let two = b.int("2");
    let literal = b.struct_literal("S", vec![("num", one), ("bad", two)]);
    let stmt = b.let_("s", None, Some(literal));
    b.push_item(stmt);
    let result = run(b, &CheckOptions::default());
    assert_eq!(result.diagnostics.codes(), vec!["E2104"]);
    assert!(result.diagnostics.entries()[0].message.contains("'bad'"));
}

#[test]
fn struct_literal_missing_field() {
    let mut b = ProgramBuilder::new();
    struct_s(&mut b);
    let literal = b.struct_literal("S", Vec::new());
    let stmt = b.let_("s", None, Some(literal));
    b.push_item(stmt);
    assert_eq!(codes(b), vec!["E2103"]);
}

#[test]
fn struct_literal_field_rules() {
    let mut b = ProgramBuilder::new();
    struct_s(&mut b);
    let one = b.int("1");
    let two = b.int("2");
    let duplicated = b.struct_literal("S", vec![("num", one), ("num", two)]);
    let first = b.let_("a", None, Some(duplicated));
    let text = b.string("x");
    let mistyped = b.struct_literal("S", vec![("num", text)]);
    let second = b.let_("b", None, Some(mistyped));
    b.push_item(first);
    b.push_item(second);
    assert_eq!(codes(b), vec!["E2106", "E2101"]);
}

#[test]
fn struct_literal_must_name_a_struct() {
    let mut b = ProgramBuilder::new();
    let decl = b.enum_("E", &[], vec![("A", Vec::new())]);
    b.push_item(decl);
    let literal = b.struct_literal("E", Vec::new());
    let stmt = b.expr_stmt(literal);
    b.push_item(stmt);
    let literal = b.struct_literal("Missing", Vec::new());
    let stmt = b.expr_stmt(literal);
    b.push_item(stmt);
    assert_eq!(codes(b), vec!["E2107", "E2003"]);
}

#[test]
fn member_access_on_structs() {
    let mut b = ProgramBuilder::new();
    struct_s(&mut b);
    let one = b.int("1");
    let literal = b.struct_literal("S", vec![("num", one)]);
    let decl = b.let_("s", None, Some(literal));
    let s = b.ident("s");
    let num = b.member(s, "num");
    let good = b.let_("n", Some(ty("i32")), Some(num));
    let s = b.ident("s");
    let missing = b.member(s, "nope");
    let bad = b.expr_stmt(missing);
    for stmt in [decl, good, bad] {
        b.push_item(stmt);
    }
    assert_eq!(codes(b), vec!["E2104"]);
}

#[test]
fn generic_struct_fields_are_substituted() {
    let mut b = ProgramBuilder::new();
    let decl = b.struct_("Boxed", &["T"], vec![("value", ty("T"))], Vec::new());
    b.push_item(decl);
    let boxed = b.ident("boxed");
    let value = b.member(boxed, "value");
    let body = b.let_("n", Some(ty("i32")), Some(value));
    let holder = b.function(
        "read",
        &[],
        vec![param("boxed", Some(generic_ty("Boxed", vec![ty("string")])))],
        None,
        vec![body],
    );
    b.push_item(holder);
    assert_eq!(codes(b), vec!["E2101"]);
}

#[test]
fn alias_cycle_is_reported_once() {
    let mut b = ProgramBuilder::new();
    let a = b.alias("A", ty("B"));
    let second = b.alias("B", ty("A"));
    let one = b.int("1");
    let usage = b.let_("x", Some(ty("A")), Some(one));
    for stmt in [a, second, usage] {
        b.push_item(stmt);
    }
    assert_eq!(codes(b), vec!["E2004"]);
}

#[test]
fn self_referential_alias_is_a_cycle() {
    let mut b = ProgramBuilder::new();
    let alias = b.alias("Loop", generic_ty("Array", vec![ty("Loop")]));
    b.push_item(alias);
    assert_eq!(codes(b), vec!["E2004"]);
}

#[test]
fn aliases_expand_to_their_target() {
    let mut b = ProgramBuilder::new();
    let alias = b.alias("Name", union_ty(vec![ty("string"), ty("null")]));
    b.push_item(alias);
    let value = b.null();
    let stmt = b.let_("n", Some(ty("Name")), Some(value));
    b.push_item(stmt);
    let value = b.int("1");
    let stmt = b.let_("m", Some(ty("Name")), Some(value));
    b.push_item(stmt);
    assert_eq!(codes(b), vec!["E2101"]);
}

#[test]
fn generic_arity_and_unknown_types() {
    let mut b = ProgramBuilder::new();
    let values = b.array(Vec::new());
    let two_arguments = generic_ty("Array", vec![ty("i32"), ty("i32")]);
    let too_many = b.let_("xs", Some(two_arguments), Some(values));
    let one = b.int("1");
    let primitive_args = b.let_("n", Some(generic_ty("i32", vec![ty("bool")])), Some(one));
    let two = b.int("2");
    let unknown = b.let_("m", Some(ty("Nope")), Some(two));
    for stmt in [too_many, primitive_args, unknown] {
        b.push_item(stmt);
    }
    assert_eq!(codes(b), vec!["E2005", "E2005", "E2003"]);
}

fn expression_codes(build: impl FnOnce(&mut ProgramBuilder) -> ExprId) -> Vec<&'static str> {
    let mut b = ProgramBuilder::new();
    let expression = build(&mut b);
    let stmt = b.expr_stmt(expression);
    b.push_item(stmt);
    codes(b)
}

#[test]
fn operator_rules() {
    let concat = expression_codes(|b| {
        let left = b.string("a");
        let right = b.string("b");
        b.binary(BinaryOperator::Add, left, right)
    });
    assert!(concat.is_empty());

    let mixed = expression_codes(|b| {
        let left = b.int("1");
        let right = b.string("a");
        b.binary(BinaryOperator::Add, left, right)
    });
    assert_eq!(mixed, vec!["E2301"]);

    let widths = expression_codes(|b| {
        let left = b.int("1");
        let right = b.float(2.0);
        b.binary(BinaryOperator::Multiply, left, right)
    });
    assert_eq!(widths, vec!["E2301"]);

    let logical = expression_codes(|b| {
        let left = b.boolean(true);
        let right = b.int("1");
        b.binary(BinaryOperator::And, left, right)
    });
    assert_eq!(logical, vec!["E2303"]);

    let ordering = expression_codes(|b| {
        let left = b.int("1");
        let right = b.string("a");
        b.binary(BinaryOperator::Less, left, right)
    });
    assert_eq!(ordering, vec!["E2302"]);

    let equality = expression_codes(|b| {
        let left = b.int("1");
        let right = b.string("a");
        b.binary(BinaryOperator::Equal, left, right)
    });
    assert_eq!(equality, vec!["E2304"]);

    let negated = expression_codes(|b| {
        let operand = b.string("a");
        b.unary(UnaryOperator::Negative, operand)
    });
    assert_eq!(negated, vec!["E2305"]);

    let not = expression_codes(|b| {
        let operand = b.string("a");
        b.unary(UnaryOperator::Not, operand)
    });
    assert!(not.is_empty());

    let identity = expression_codes(|b| {
        let left = b.int("1");
        let right = b.int("2");
        b.binary(BinaryOperator::Is, left, right)
    });
    assert_eq!(identity, vec!["E2502", "E2502"]);
}

#[test]
fn identity_accepts_aliasable_operands() {
    let found = expression_codes(|b| {
        let one = b.int("1");
        let left = b.array(vec![one]);
        let two = b.int("2");
        let right = b.array(vec![two]);
        b.binary(BinaryOperator::Is, left, right)
    });
    assert!(found.is_empty());
}

#[test]
fn literal_operand_adopts_the_other_side() {
    let mut b = ProgramBuilder::new();
    let zero = b.int("0");
    let byte = b.let_("b", Some(ty("u8")), Some(zero));
    let one = b.int("1");
    let name = b.ident("b");
    let sum = b.binary(BinaryOperator::Add, one, name);
    let total = b.let_("t", Some(ty("u8")), Some(sum));
    b.push_item(byte);
    b.push_item(total);
    assert!(codes(b).is_empty());
}

#[test]
fn casts() {
    let primitive = expression_codes(|b| {
        let value = b.string("12");
        b.cast(value, ty("i32"))
    });
    assert!(primitive.is_empty());

    let invalid = expression_codes(|b| {
        let one = b.int("1");
        let value = b.array(vec![one]);
        b.cast(value, ty("i32"))
    });
    assert_eq!(invalid, vec!["E2105"]);

    let same_struct = expression_codes(|b| {
        struct_s(b);
        let one = b.int("1");
        let value = b.struct_literal("S", vec![("num", one)]);
        b.cast(value, ty("S"))
    });
    assert_eq!(same_struct, vec!["E2105"]);

    let unresolved = expression_codes(|b| {
        let value = b.ident("missing");
        b.cast(value, ty("S"))
    });
    assert_eq!(unresolved, vec!["E2001", "E2003"]);
}

#[test]
fn assignment_rules() {
    let mut b = ProgramBuilder::new();
    let one = b.int("1");
    let constant = b.const_("c", Some(ty("i32")), Some(one));
    let target = b.ident("c");
    let two = b.int("2");
    let through_const = b.assign(target, two);
    let through_const = b.expr_stmt(through_const);

    let three = b.int("3");
    let variable = b.let_("v", Some(ty("i32")), Some(three));
    let target = b.ident("v");
    let text = b.string("s");
    let mistyped = b.assign(target, text);
    let mistyped = b.expr_stmt(mistyped);

    let left = b.int("1");
    let right = b.int("2");
    let literal_target = b.assign(left, right);
    let literal_target = b.expr_stmt(literal_target);

    let target = b.ident("v");
    let four = b.int("4");
    let compound = b.compound_assign(BinaryOperator::Add, target, four);
    let compound = b.expr_stmt(compound);

    for stmt in [constant, through_const, variable, mistyped, literal_target, compound] {
        b.push_item(stmt);
    }
    assert_eq!(codes(b), vec!["E2501", "E2101", "E2504"]);
}

#[test]
fn assignment_through_const_member_path() {
    let mut b = ProgramBuilder::new();
    struct_s(&mut b);
    let one = b.int("1");
    let literal = b.struct_literal("S", vec![("num", one)]);
    let constant = b.const_("s", None, Some(literal));
    let s = b.ident("s");
    let field = b.member(s, "num");
    let two = b.int("2");
    let assignment = b.assign(field, two);
    let assignment = b.expr_stmt(assignment);
    b.push_item(constant);
    b.push_item(assignment);
    assert_eq!(codes(b), vec!["E2501"]);
}

#[test]
fn parameters_need_mut_to_be_assigned() {
    let mut b = ProgramBuilder::new();
    let target = b.ident("a");
    let one = b.int("1");
    let assignment = b.assign(target, one);
    let body = b.expr_stmt(assignment);
    let immutable = b.function("f", &[], vec![param("a", Some(ty("i32")))], None, vec![body]);

    let target = b.ident("a");
    let one = b.int("1");
    let assignment = b.assign(target, one);
    let body = b.expr_stmt(assignment);
    let mutable_param = param("a", Some(ty("i32"))).mutable();
    let mutable = b.function("g", &[], vec![mutable_param], None, vec![body]);

    b.push_item(immutable);
    b.push_item(mutable);
    assert_eq!(codes(b), vec!["E2503"]);
}

#[test]
fn const_requires_initializer() {
    let mut b = ProgramBuilder::new();
    let stmt = b.const_("c", Some(ty("i32")), None);
    b.push_item(stmt);
    assert_eq!(codes(b), vec!["E2505"]);
}

#[test]
fn unknown_identifiers_and_placeholders() {
    let unknown = expression_codes(|b| b.ident("missing"));
    assert_eq!(unknown, vec!["E2001"]);
    let placeholder = expression_codes(|b| b.placeholder());
    assert_eq!(placeholder, vec!["E2001"]);
}

#[test]
fn errors_do_not_cascade() {
    let mut b = ProgramBuilder::new();
    let missing = b.ident("missing");
    let one = b.int("1");
    let sum = b.binary(BinaryOperator::Add, missing, one);
    let stmt = b.let_("x", Some(ty("string")), Some(sum));
    b.push_item(stmt);
    assert_eq!(codes(b), vec!["E2001"]);
}

fn condition_program(condition: impl FnOnce(&mut ProgramBuilder) -> ExprId) -> ProgramBuilder {
    let mut b = ProgramBuilder::new();
    let condition = condition(&mut b);
    let body = b.block(Vec::new());
    let stmt = b.if_(condition, body, None);
    b.push_item(stmt);
    b
}

#[test]
fn condition_policies() {
    let string_condition = |b: &mut ProgramBuilder| b.string("s");
    assert!(codes(condition_program(string_condition)).is_empty());

    let bool_only = CheckOptions {
        condition_policy: ConditionPolicy::Bool,
        ..CheckOptions::default()
    };
    assert_eq!(codes_with(condition_program(string_condition), bool_only.clone()), vec!["E2701"]);
    assert!(codes_with(condition_program(|b| b.boolean(true)), bool_only).is_empty());

    let truthy = CheckOptions {
        condition_policy: ConditionPolicy::Truthy,
        ..CheckOptions::default()
    };
    assert!(codes_with(condition_program(string_condition), truthy.clone()).is_empty());
    let tuple_condition = |b: &mut ProgramBuilder| {
        let one = b.int("1");
        let two = b.int("2");
        b.tuple(vec![one, two])
    };
    assert_eq!(codes_with(condition_program(tuple_condition), truthy), vec!["E2701"]);
}

#[test]
fn return_rules() {
    let mut b = ProgramBuilder::new();
    let stray = b.ret(None);
    b.push_item(stray);
    let text = b.string("s");
    let body = b.ret(Some(text));
    let annotated = b.function("f", &[], Vec::new(), Some(ty("i32")), vec![body]);
    b.push_item(annotated);
    assert_eq!(codes(b), vec!["E2702", "E2101"]);
}

#[test]
fn return_type_is_inferred_from_returns() {
    let mut b = ProgramBuilder::new();
    let one = b.int("1");
    let body = b.ret(Some(one));
    let producer = b.function("produce", &[], Vec::new(), None, vec![body]);
    let call = b.call_named("produce", Vec::new());
    let usage = b.let_("s", Some(ty("string")), Some(call));
    let consumer = b.function("consume", &[], Vec::new(), None, vec![usage]);
    b.push_item(producer);
    b.push_item(consumer);
    assert_eq!(codes(b), vec!["E2101"]);
}

#[test]
fn function_typed_annotations_resolve() {
    let mut b = ProgramBuilder::new();
    let callback = param("callback", Some(function_ty(vec![ty("i32")], ty("bool"))));
    let pair = param("pair", Some(tuple_ty(vec![ty("i32"), ty("string")])));
    let pair_ref = b.ident("pair");
    let zero = b.int("0");
    let first = b.index(pair_ref, zero);
    let callback_ref = b.ident("callback");
    let argument = b.positional(first);
    let call = b.call(callback_ref, vec![argument]);
    let stmt = b.let_("ok", Some(ty("bool")), Some(call));
    let function = b.function("run", &[], vec![callback, pair], None, vec![stmt]);
    b.push_item(function);
    assert!(codes(b).is_empty());
}

#[test]
fn methods_see_self_and_their_return_types() {
    let mut b = ProgramBuilder::new();
    let receiver = b.ident("self");
    let count = b.member(receiver, "count");
    let body = b.ret(Some(count));
    let getter = b.function("get", &[], Vec::new(), Some(ty("i32")), vec![body]);
    let decl = b.struct_("Counter", &[], vec![("count", ty("i32"))], vec![getter]);
    b.push_item(decl);

    let zero = b.int("0");
    let literal = b.struct_literal("Counter", vec![("count", zero)]);
    let counter = b.let_("c", None, Some(literal));
    let c = b.ident("c");
    let method = b.member(c, "get");
    let call = b.call(method, Vec::new());
    let mistyped = b.let_("s", Some(ty("string")), Some(call));
    let c = b.ident("c");
    let missing = b.member(c, "reset");
    let call = b.call(missing, Vec::new());
    let missing = b.expr_stmt(call);
    for stmt in [counter, mistyped, missing] {
        b.push_item(stmt);
    }
    assert_eq!(codes(b), vec!["E2101", "E2104"]);
}

#[test]
fn struct_methods_cannot_assign_through_self() {
    let mut b = ProgramBuilder::new();
    let receiver = b.ident("self");
    let count = b.member(receiver, "count");
    let zero = b.int("0");
    let assignment = b.assign(count, zero);
    let body = b.expr_stmt(assignment);
    let reset = b.function("reset", &[], Vec::new(), None, vec![body]);
    let decl = b.struct_("Counter", &[], vec![("count", ty("i32"))], vec![reset]);
    b.push_item(decl);
    assert_eq!(codes(b), vec!["E2503"]);

    let mut b = ProgramBuilder::new();
    let receiver = b.ident("self");
    let count = b.member(receiver, "count");
    let zero = b.int("0");
    let assignment = b.assign(count, zero);
    let body = b.expr_stmt(assignment);
    let reset = b.function("reset", &[], Vec::new(), None, vec![body]);
    let decl = b.class("Counter", &[], vec![("count", ty("i32"))], vec![reset]);
    b.push_item(decl);
    assert!(codes(b).is_empty());
}

#[test]
fn container_members_are_unchecked_by_default() {
    let build = || {
        let mut b = ProgramBuilder::new();
        let one = b.int("1");
        let values = b.array(vec![one]);
        let decl = b.let_("xs", None, Some(values));
        let xs = b.ident("xs");
        let len = b.member(xs, "len");
        let call = b.call(len, Vec::new());
        let length = b.expr_stmt(call);
        let xs = b.ident("xs");
        let missing = b.member(xs, "shuffle");
        let missing = b.expr_stmt(missing);
        for stmt in [decl, length, missing] {
            b.push_item(stmt);
        }
        b
    };
    assert!(codes(build()).is_empty());

    let validating = CheckOptions {
        validate_container_members: true,
        ..CheckOptions::default()
    };
    assert_eq!(codes_with(build(), validating), vec!["E2104"]);
}

#[test]
fn index_expressions() {
    let mut b = ProgramBuilder::new();
    let one = b.int("1");
    let values = b.array(vec![one]);
    let decl = b.let_("xs", None, Some(values));
    let xs = b.ident("xs");
    let key = b.string("zero");
    let bad_index = b.index(xs, key);
    let bad_index = b.expr_stmt(bad_index);
    let xs = b.ident("xs");
    let zero = b.int("0");
    let element = b.index(xs, zero);
    let element = b.let_("first", Some(ty("string")), Some(element));
    for stmt in [decl, bad_index, element] {
        b.push_item(stmt);
    }
    assert_eq!(codes(b), vec!["E2101", "E2101"]);
}

#[test]
fn every_expression_type_is_recorded() {
    let mut b = ProgramBuilder::new();
    let one = b.int("1");
    let two = b.int("2");
    let sum = b.binary(BinaryOperator::Add, one, two);
    let stmt = b.let_("x", Some(ty("i64")), Some(sum));
    b.push_item(stmt);
    let result = run(b, &CheckOptions::default());
    assert!(result.diagnostics.is_empty());
    let i64_type = sable_checker::Type::Primitive(Primitive::I64);
    for id in [one, two, sum] {
        assert_eq!(result.types.get(id), Some(&i64_type));
    }
}

#[test]
fn literal_operand_diagnostics_keep_source_order() {
    let mut b = ProgramBuilder::new();
    let a = b.ident("a");
    let ret = b.ret(Some(a));
    let params = vec![param("a", Some(ty("i8")))];
    let narrow = b.function("narrow", &[], params, Some(ty("i8")), vec![ret]);
    b.push_item(narrow);

    let big = b.int("999");
    let one = b.int("1");
    let two = b.int("2");
    let arguments = vec![b.positional(one), b.positional(two)];
    let call = b.call_named("narrow", arguments);
    let sum = b.binary(BinaryOperator::Add, big, call);
    let stmt = b.let_("x", Some(ty("i8")), Some(sum));
    b.push_item(stmt);
    assert_eq!(codes(b), vec!["E2401", "E2205"]);
}
