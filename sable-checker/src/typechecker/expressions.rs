use std::collections::{HashMap, HashSet};

use sable_support::{mismatch, quoted};

use super::TypeChecker;
use crate::ast::{
    BinaryOperator, ExprId, ExpressionKind, FieldInit, Identifier, Literal, MapEntry, SourceSpan,
    TypeExpression, UnaryOperator,
};
use crate::diagnostics::DiagnosticCode;
use crate::scope::{SymbolId, SymbolKind};
use crate::types::{
    is_assignable, make_union, type_argument_mapping, Primitive, Type, ARRAY_TYPE, MAP_TYPE,
};

/// Outcome of resolving `object.name`.
pub(super) enum MemberLookup {
    Found {
        ty: Type,
        method: Option<SymbolId>,
        mapping: HashMap<String, Type>,
    },
    /// The object's type is tracked but has no such member. Carries the
    /// printable owner type.
    Missing(String),
    /// Nothing is known about the object's members.
    Untracked,
}

impl<'a> TypeChecker<'a> {
    /// Checks an expression bottom-up and records its type. `expected` is a
    /// hint for literal defaulting only; callers do their own assignability
    /// checks.
    pub(super) fn check_expr(&mut self, id: ExprId, expected: Option<&Type>) -> Type {
        let ty = self.infer_expression(id, expected);
        self.record(id, ty.clone());
        ty
    }

    fn infer_expression(&mut self, id: ExprId, expected: Option<&Type>) -> Type {
        let program = self.program;
        let expression = program.expression(id);
        let span = expression.span;
        match &expression.kind {
            ExpressionKind::Identifier(name) => self.type_from_identifier(name, span),
            ExpressionKind::Literal(literal) => {
                self.type_from_literal(literal, expected, span, false)
            }
            ExpressionKind::Unary { operator, operand } => {
                self.type_from_unary(*operator, *operand, expected, span)
            }
            ExpressionKind::Binary {
                operator,
                left,
                right,
            } => self.type_from_binary(*operator, *left, *right, expected, span),
            ExpressionKind::Assignment {
                operator,
                target,
                value,
            } => self.type_from_assignment(*operator, *target, *value, span),
            ExpressionKind::Call { callee, arguments } => {
                self.type_from_call(*callee, arguments, span)
            }
            ExpressionKind::Member { object, property } => self.type_from_member(*object, property),
            ExpressionKind::Index { object, index } => self.type_from_index(*object, *index),
            ExpressionKind::StructLiteral { name, fields } => {
                self.type_from_struct_literal(name, fields)
            }
            ExpressionKind::ArrayLiteral(elements) => self.type_from_array(elements, expected),
            ExpressionKind::MapLiteral(entries) => self.type_from_map(entries, expected),
            ExpressionKind::TupleLiteral(elements) => self.type_from_tuple(elements, expected),
            ExpressionKind::Cast { value, target } => self.type_from_cast(*value, target, span),
            ExpressionKind::Grouping(inner) => self.check_expr(*inner, expected),
            ExpressionKind::Placeholder => {
                self.report(
                    DiagnosticCode::UnknownIdentifier,
                    "expression could not be parsed",
                    span,
                );
                Type::Error
            }
        }
    }

    fn type_from_identifier(&mut self, name: &str, span: SourceSpan) -> Type {
        match self.scopes.lookup_value_type(name, &self.symbols) {
            Some(ty) => ty,
            None => {
                self.report(
                    DiagnosticCode::UnknownIdentifier,
                    format!("unknown identifier {}", quoted(name)),
                    span,
                );
                Type::Error
            }
        }
    }

    pub(super) fn type_from_literal(
        &mut self,
        literal: &Literal,
        expected: Option<&Type>,
        span: SourceSpan,
        negative: bool,
    ) -> Type {
        match literal {
            Literal::Integer(digits) => {
                let width = self.integer_width(expected);
                let fits = parse_integer(digits)
                    .is_some_and(|magnitude| width.fits_integer(magnitude, negative));
                if !fits {
                    let (min, max) = width.integer_bounds().unwrap_or((0, 0));
                    let sign = if negative { "-" } else { "" };
                    self.report(
                        DiagnosticCode::IntegerOutOfRange,
                        format!(
                            "integer literal {sign}{digits} is out of range for {width} ({min}..={max})"
                        ),
                        span,
                    );
                }
                Type::Primitive(width)
            }
            Literal::Float(_) => Type::Primitive(self.float_width(expected)),
            Literal::String(_) => Type::STRING,
            Literal::Bool(_) => Type::BOOL,
            Literal::Null => Type::NULL,
        }
    }

    fn integer_width(&self, expected: Option<&Type>) -> Primitive {
        expected
            .and_then(|ty| numeric_member(ty, Primitive::is_integer))
            .unwrap_or(self.options.default_integer)
    }

    fn float_width(&self, expected: Option<&Type>) -> Primitive {
        expected
            .and_then(|ty| numeric_member(ty, Primitive::is_float))
            .unwrap_or(self.options.default_float)
    }

    fn type_from_unary(
        &mut self,
        operator: UnaryOperator,
        operand: ExprId,
        expected: Option<&Type>,
        span: SourceSpan,
    ) -> Type {
        let program = self.program;
        if operator == UnaryOperator::Negative {
            if let ExpressionKind::Literal(literal @ Literal::Integer(_)) =
                &program.expression(operand).kind
            {
                let ty = self.type_from_literal(literal, expected, span, true);
                self.record(operand, ty.clone());
                return ty;
            }
        }

        match operator {
            UnaryOperator::Not => {
                self.check_expr(operand, None);
                Type::BOOL
            }
            UnaryOperator::Positive | UnaryOperator::Negative => {
                let ty = self.check_expr(operand, expected);
                if ty.is_absorbing() || ty.is_numeric() {
                    return ty;
                }
                let symbol = if operator == UnaryOperator::Negative { "-" } else { "+" };
                self.report(
                    DiagnosticCode::UnaryOperand,
                    format!("unary '{symbol}' expects a numeric operand, found {ty}"),
                    span,
                );
                Type::Error
            }
        }
    }

    fn type_from_binary(
        &mut self,
        operator: BinaryOperator,
        left: ExprId,
        right: ExprId,
        expected: Option<&Type>,
        span: SourceSpan,
    ) -> Type {
        match operator {
            BinaryOperator::Is => {
                let left_type = self.check_expr(left, None);
                let right_type = self.check_expr(right, None);
                for (ty, side) in [(left_type, left), (right_type, right)] {
                    if !ty.is_absorbing() && !ty.is_aliasable() {
                        let side_span = self.span_of(side);
                        self.report(
                            DiagnosticCode::IsOperand,
                            format!(
                                "'is' compares aliasable values (arrays, maps or class instances), found {ty}"
                            ),
                            side_span,
                        );
                    }
                }
                Type::BOOL
            }
            BinaryOperator::And | BinaryOperator::Or => {
                for side in [left, right] {
                    let ty = self.check_expr(side, Some(&Type::BOOL));
                    if !ty.is_absorbing() && ty != Type::BOOL {
                        let side_span = self.span_of(side);
                        self.report(
                            DiagnosticCode::LogicalOperand,
                            format!(
                                "operator '{}' expects bool operands, found {ty}",
                                operator.symbol()
                            ),
                            side_span,
                        );
                    }
                }
                Type::BOOL
            }
            BinaryOperator::Equal | BinaryOperator::NotEqual => {
                let (left_type, right_type) = self.check_operands(left, right, None);
                if !is_assignable(&left_type, &right_type)
                    && !is_assignable(&right_type, &left_type)
                {
                    self.report(
                        DiagnosticCode::EqualityOperand,
                        format!("cannot compare {left_type} with {right_type}"),
                        span,
                    );
                }
                Type::BOOL
            }
            BinaryOperator::Greater
            | BinaryOperator::GreaterEqual
            | BinaryOperator::Less
            | BinaryOperator::LessEqual => {
                let (left_type, right_type) = self.check_operands(left, right, None);
                let absorbed = left_type.is_absorbing() || right_type.is_absorbing();
                if !absorbed && !(left_type.is_numeric() && left_type == right_type) {
                    self.report(
                        DiagnosticCode::OrderingOperand,
                        format!(
                            "operator '{}' requires identical numeric operands, found {left_type} and {right_type}",
                            operator.symbol()
                        ),
                        span,
                    );
                }
                Type::BOOL
            }
            BinaryOperator::Add
            | BinaryOperator::Subtract
            | BinaryOperator::Multiply
            | BinaryOperator::Divide
            | BinaryOperator::Modulo
            | BinaryOperator::BitOr => {
                let (left_type, right_type) = self.check_operands(left, right, expected);
                self.arithmetic_result(operator, &left_type, &right_type, span)
            }
        }
    }

    /// Checks both operands, letting a literal side default to the other
    /// side's type.
    fn check_operands(
        &mut self,
        left: ExprId,
        right: ExprId,
        hint: Option<&Type>,
    ) -> (Type, Type) {
        if self.is_literal(left) && !self.is_literal(right) {
            let start = self.diagnostics.len();
            let right_type = self.check_expr(right, hint);
            let split = self.diagnostics.len();
            let left_type = self.check_expr(left, Some(&right_type));
            // Report in source order even though the right side went first.
            self.diagnostics.hoist_since(start, split);
            (left_type, right_type)
        } else {
            let left_type = self.check_expr(left, hint);
            let right_type = self.check_expr(right, Some(&left_type));
            (left_type, right_type)
        }
    }

    fn is_literal(&self, id: ExprId) -> bool {
        match &self.program.expression(id).kind {
            ExpressionKind::Literal(_) => true,
            ExpressionKind::Unary {
                operator: UnaryOperator::Negative | UnaryOperator::Positive,
                operand,
            } => matches!(
                self.program.expression(*operand).kind,
                ExpressionKind::Literal(_)
            ),
            ExpressionKind::Grouping(inner) => self.is_literal(*inner),
            _ => false,
        }
    }

    fn arithmetic_result(
        &mut self,
        operator: BinaryOperator,
        left: &Type,
        right: &Type,
        span: SourceSpan,
    ) -> Type {
        if left.is_error() || right.is_error() {
            return Type::Error;
        }
        if left.is_absorbing() || right.is_absorbing() {
            return Type::Unknown;
        }
        if operator == BinaryOperator::Add && (left.is_string() || right.is_string()) {
            if left.is_string() && right.is_string() {
                return Type::STRING;
            }
            self.report(
                DiagnosticCode::ArithmeticOperand,
                format!(
                    "cannot concatenate {left} and {right}; both operands of '+' must be strings"
                ),
                span,
            );
            return Type::Error;
        }
        if left.is_numeric() && left == right {
            return left.clone();
        }
        self.report(
            DiagnosticCode::ArithmeticOperand,
            format!(
                "operator '{}' requires identical numeric operands, found {left} and {right}",
                operator.symbol()
            ),
            span,
        );
        Type::Error
    }

    fn type_from_assignment(
        &mut self,
        operator: Option<BinaryOperator>,
        target: ExprId,
        value: ExprId,
        span: SourceSpan,
    ) -> Type {
        let target_type = self.check_assignment_target(target);
        let value_type = self.check_expr(value, Some(&target_type));
        let assigned = match operator {
            Some(operator) => self.arithmetic_result(operator, &target_type, &value_type, span),
            None => value_type,
        };
        if !is_assignable(&assigned, &target_type) {
            let value_span = self.span_of(value);
            self.report(
                DiagnosticCode::TypeMismatch,
                mismatch("assignment", &target_type, &assigned),
                value_span,
            );
        }

        // A write invalidates narrowing established by an enclosing branch.
        let program = self.program;
        if let ExpressionKind::Identifier(name) = &program.expression(target).kind {
            self.scopes.clear_narrowing(name);
        }
        target_type
    }

    /// Checks the left side of an assignment and returns its declared type.
    fn check_assignment_target(&mut self, target: ExprId) -> Type {
        let program = self.program;
        let expression = program.expression(target);
        let ty = match &expression.kind {
            ExpressionKind::Identifier(name) => match self.scopes.lookup_value(name) {
                None => {
                    self.report(
                        DiagnosticCode::UnknownIdentifier,
                        format!("unknown identifier {}", quoted(name)),
                        expression.span,
                    );
                    Type::Error
                }
                Some(symbol_id) => {
                    let symbol = self.symbols.get(symbol_id);
                    let declared = symbol.ty.clone().unwrap_or(Type::Unknown);
                    let violation = if matches!(
                        symbol.kind,
                        SymbolKind::Function | SymbolKind::Variant
                    ) {
                        Some((
                            DiagnosticCode::InvalidAssignmentTarget,
                            format!("cannot assign to {} {}", symbol.kind.describe(), quoted(name)),
                        ))
                    } else {
                        self.mutation_violation(symbol_id)
                    };
                    if let Some((code, message)) = violation {
                        self.report(code, message, expression.span);
                    }
                    declared
                }
            },
            ExpressionKind::Member { .. } | ExpressionKind::Index { .. } => {
                let ty = self.infer_expression(target, None);
                if let Some(root) = root_identifier(program, target) {
                    if let Some(symbol_id) = self.scopes.lookup_value(root) {
                        if let Some((code, message)) = self.mutation_violation(symbol_id) {
                            self.report(code, message, expression.span);
                        }
                    }
                }
                ty
            }
            ExpressionKind::Grouping(inner) => self.check_assignment_target(*inner),
            _ => {
                let ty = self.infer_expression(target, None);
                self.report(
                    DiagnosticCode::InvalidAssignmentTarget,
                    "invalid assignment target",
                    expression.span,
                );
                ty
            }
        };
        self.record(target, ty.clone());
        ty
    }

    fn mutation_violation(&self, symbol_id: SymbolId) -> Option<(DiagnosticCode, String)> {
        let symbol = self.symbols.get(symbol_id);
        if symbol.is_const {
            Some((
                DiagnosticCode::ConstAssignment,
                format!("cannot assign through const {}", quoted(&symbol.name)),
            ))
        } else if symbol.is_parameter && !symbol.is_mutable {
            Some((
                DiagnosticCode::ParameterAssignment,
                format!(
                    "cannot assign to parameter {}; declare it 'mut'",
                    quoted(&symbol.name)
                ),
            ))
        } else {
            None
        }
    }

    fn type_from_member(&mut self, object: ExprId, property: &Identifier) -> Type {
        let object_type = self.check_expr(object, None);
        match self.lookup_member(&object_type, &property.name) {
            MemberLookup::Found { ty, .. } => ty,
            MemberLookup::Missing(owner) => {
                self.report(
                    DiagnosticCode::UnknownMember,
                    format!("{owner} has no member {}", quoted(&property.name)),
                    property.span,
                );
                Type::Error
            }
            MemberLookup::Untracked => Type::Unknown,
        }
    }

    pub(super) fn lookup_member(&self, object_type: &Type, name: &str) -> MemberLookup {
        let Type::Named(named) = object_type else {
            return MemberLookup::Untracked;
        };

        if let Some(symbol_id) = named.symbol {
            let symbol = self.symbols.get(symbol_id);
            if !symbol.is_record() {
                return MemberLookup::Untracked;
            }
            let mapping =
                type_argument_mapping(&symbol.type_parameters, named.type_arguments.as_deref());
            return match symbol.member(name) {
                Some(member) => MemberLookup::Found {
                    ty: member.ty.substitute(&mapping),
                    method: member.method,
                    mapping,
                },
                None => MemberLookup::Missing(format!(
                    "{} {}",
                    symbol.kind.describe(),
                    quoted(&symbol.name)
                )),
            };
        }

        if !self.options.validate_container_members {
            return MemberLookup::Untracked;
        }
        match container_member(object_type, name) {
            Some(ty) => MemberLookup::Found {
                ty,
                method: None,
                mapping: HashMap::new(),
            },
            None if named.name == ARRAY_TYPE || named.name == MAP_TYPE => {
                MemberLookup::Missing(object_type.to_string())
            }
            None => MemberLookup::Untracked,
        }
    }

    fn type_from_index(&mut self, object: ExprId, index: ExprId) -> Type {
        let object_type = self.check_expr(object, None);

        if let Some(element) = object_type.array_element() {
            let index_type = self.check_expr(index, None);
            let integral = index_type.primitive().is_some_and(Primitive::is_integer);
            if !index_type.is_absorbing() && !integral {
                let index_span = self.span_of(index);
                self.report(
                    DiagnosticCode::TypeMismatch,
                    mismatch("array index", "an integer", &index_type),
                    index_span,
                );
            }
            return element;
        }

        if let Some((key, value)) = object_type.map_entry() {
            let index_type = self.check_expr(index, Some(&key));
            if !is_assignable(&index_type, &key) {
                let index_span = self.span_of(index);
                self.report(
                    DiagnosticCode::TypeMismatch,
                    mismatch("map key", &key, &index_type),
                    index_span,
                );
            }
            return value;
        }

        self.check_expr(index, None);
        if let Type::Tuple(elements) = &object_type {
            let program = self.program;
            let index_kind = &program.expression(index).kind;
            if let ExpressionKind::Literal(Literal::Integer(digits)) = index_kind {
                let position = parse_integer(digits).and_then(|value| usize::try_from(value).ok());
                return match position.and_then(|position| elements.get(position)) {
                    Some(element) => element.clone(),
                    None => {
                        let index_span = self.span_of(index);
                        self.report(
                            DiagnosticCode::UnknownMember,
                            format!("tuple {object_type} has no element {digits}"),
                            index_span,
                        );
                        Type::Error
                    }
                };
            }
        }

        if object_type.is_error() {
            Type::Error
        } else {
            Type::Unknown
        }
    }

    fn type_from_struct_literal(&mut self, name: &Identifier, fields: &[FieldInit]) -> Type {
        let symbol_id = match self.scopes.lookup_type_symbol(&name.name) {
            None => {
                self.report(
                    DiagnosticCode::UnknownType,
                    format!("unknown type {}", quoted(&name.name)),
                    name.span,
                );
                self.check_field_values(fields);
                return Type::Error;
            }
            Some(id) if self.symbols.get(id).kind != SymbolKind::Struct => {
                let kind = self.symbols.get(id).kind.describe();
                self.report(
                    DiagnosticCode::NotAStruct,
                    format!("{} is a {kind}, not a struct", quoted(&name.name)),
                    name.span,
                );
                self.check_field_values(fields);
                return Type::Error;
            }
            Some(id) => id,
        };

        let declared: Vec<(String, Type)> = self
            .symbols
            .get(symbol_id)
            .members
            .iter()
            .filter(|member| member.method.is_none())
            .map(|member| (member.name.clone(), member.ty.clone()))
            .collect();

        let mut seen: HashSet<&str> = HashSet::new();
        for field in fields {
            let Some((field_name, expected)) = declared
                .iter()
                .find(|(declared_name, _)| *declared_name == field.name.name)
            else {
                self.report(
                    DiagnosticCode::UnknownMember,
                    format!(
                        "struct {} has no field {}",
                        quoted(&name.name),
                        quoted(&field.name.name)
                    ),
                    field.name.span,
                );
                self.check_expr(field.value, None);
                continue;
            };

            if !seen.insert(field_name.as_str()) {
                self.report(
                    DiagnosticCode::DuplicateField,
                    format!("field {} is given more than once", quoted(field_name)),
                    field.name.span,
                );
                self.check_expr(field.value, None);
                continue;
            }

            let actual = self.check_expr(field.value, Some(expected));
            if !is_assignable(&actual, expected) {
                let value_span = self.span_of(field.value);
                self.report(
                    DiagnosticCode::TypeMismatch,
                    mismatch(&format!("field {}", quoted(field_name)), expected, &actual),
                    value_span,
                );
            }
        }

        for (field_name, _) in &declared {
            if !seen.contains(field_name.as_str()) {
                self.report(
                    DiagnosticCode::MissingField,
                    format!(
                        "missing field {} in literal of struct {}",
                        quoted(field_name),
                        quoted(&name.name)
                    ),
                    name.span,
                );
            }
        }

        Type::named(name.name.clone(), Some(symbol_id))
    }

    fn check_field_values(&mut self, fields: &[FieldInit]) {
        for field in fields {
            self.check_expr(field.value, None);
        }
    }

    fn type_from_array(&mut self, elements: &[ExprId], expected: Option<&Type>) -> Type {
        let hint = expected.and_then(Type::array_element);
        let types: Vec<Type> = elements
            .iter()
            .map(|element| self.check_expr(*element, hint.as_ref()))
            .collect();
        if types.is_empty() {
            return Type::array(hint.unwrap_or(Type::Unknown));
        }
        Type::array(make_union(types))
    }

    fn type_from_map(&mut self, entries: &[MapEntry], expected: Option<&Type>) -> Type {
        let (key_hint, value_hint) = match expected.and_then(Type::map_entry) {
            Some((key, value)) => (Some(key), Some(value)),
            None => (None, None),
        };
        let mut keys = Vec::with_capacity(entries.len());
        let mut values = Vec::with_capacity(entries.len());
        for entry in entries {
            keys.push(self.check_expr(entry.key, key_hint.as_ref()));
            values.push(self.check_expr(entry.value, value_hint.as_ref()));
        }
        if entries.is_empty() {
            return Type::map(
                key_hint.unwrap_or(Type::Unknown),
                value_hint.unwrap_or(Type::Unknown),
            );
        }
        Type::map(make_union(keys), make_union(values))
    }

    fn type_from_tuple(&mut self, elements: &[ExprId], expected: Option<&Type>) -> Type {
        let hints: &[Type] = match expected {
            Some(Type::Tuple(hints)) => hints,
            _ => &[],
        };
        Type::Tuple(
            elements
                .iter()
                .enumerate()
                .map(|(position, element)| self.check_expr(*element, hints.get(position)))
                .collect(),
        )
    }

    fn type_from_cast(&mut self, value: ExprId, target: &TypeExpression, span: SourceSpan) -> Type {
        let source = self.check_expr(value, None);
        let target_type = self.resolve_type(target);
        let allowed = source.is_absorbing()
            || target_type.is_absorbing()
            || (source.primitive().is_some() && target_type.primitive().is_some());
        if !allowed {
            self.report(
                DiagnosticCode::InvalidCast,
                format!("cannot cast {source} to {target_type}"),
                span,
            );
        }
        target_type
    }
}

/// The first integer (or float) primitive an expected type offers.
fn numeric_member(ty: &Type, predicate: fn(Primitive) -> bool) -> Option<Primitive> {
    match ty {
        Type::Primitive(primitive) if predicate(*primitive) => Some(*primitive),
        Type::Union(members) => members
            .iter()
            .find_map(|member| member.primitive().filter(|primitive| predicate(*primitive))),
        _ => None,
    }
}

/// Magnitude of an integer literal. `None` when it exceeds every width.
pub(super) fn parse_integer(digits: &str) -> Option<u128> {
    let cleaned: String = digits.chars().filter(|c| *c != '_').collect();
    let lowered = cleaned.to_ascii_lowercase();
    let (radix, body) = if let Some(rest) = lowered.strip_prefix("0x") {
        (16, rest)
    } else if let Some(rest) = lowered.strip_prefix("0o") {
        (8, rest)
    } else if let Some(rest) = lowered.strip_prefix("0b") {
        (2, rest)
    } else {
        (10, lowered.as_str())
    };
    u128::from_str_radix(body, radix).ok()
}

/// The identifier a member/index path is rooted at, if any.
fn root_identifier(program: &crate::ast::Program, mut id: ExprId) -> Option<&str> {
    loop {
        match &program.expression(id).kind {
            ExpressionKind::Identifier(name) => return Some(name),
            ExpressionKind::Member { object, .. } | ExpressionKind::Index { object, .. } => {
                id = *object
            }
            ExpressionKind::Grouping(inner) => id = *inner,
            _ => return None,
        }
    }
}

/// Built-in members of `Array` and `Map`, used when container members are
/// validated.
fn container_member(container: &Type, name: &str) -> Option<Type> {
    let length = Type::Primitive(Primitive::I64);
    if let Some(element) = container.array_element() {
        let optional = make_union([element.clone(), Type::NULL]);
        return match name {
            "len" => Some(Type::function(Vec::new(), length)),
            "push" => Some(Type::function(vec![element], Type::VOID)),
            "pop" => Some(Type::function(Vec::new(), optional)),
            "contains" => Some(Type::function(vec![element], Type::BOOL)),
            _ => None,
        };
    }
    let (key, value) = container.map_entry()?;
    let optional = make_union([value.clone(), Type::NULL]);
    match name {
        "len" => Some(Type::function(Vec::new(), length)),
        "get" | "remove" => Some(Type::function(vec![key], optional)),
        "insert" => Some(Type::function(vec![key, value], Type::VOID)),
        "contains" => Some(Type::function(vec![key], Type::BOOL)),
        "keys" => Some(Type::function(Vec::new(), Type::array(key))),
        "values" => Some(Type::function(Vec::new(), Type::array(value))),
        _ => None,
    }
}
