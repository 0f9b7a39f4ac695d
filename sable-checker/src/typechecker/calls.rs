use std::collections::{HashMap, HashSet};

use sable_support::{mismatch, plural, quoted};

use super::expressions::MemberLookup;
use super::TypeChecker;
use crate::ast::{Argument, ArgumentKind, ExprId, ExpressionKind, Literal, SourceSpan};
use crate::diagnostics::DiagnosticCode;
use crate::scope::{ParamInfo, SymbolId, SymbolKind};
use crate::types::{is_assignable, make_union, NamedType, Type};

/// What is known about the thing being called.
enum Callee {
    /// Full parameter information: functions, methods, variants and class
    /// constructors.
    Bound {
        name: String,
        params: Vec<ParamInfo>,
        result: Type,
    },
    /// A value of function type; only parameter positions are known.
    Positional { params: Vec<Type>, result: Type },
    /// Nothing to check against.
    Dynamic(Type),
}

/// A value bound to a positional slot: either an argument expression or one
/// element of a spread tuple whose elements have no expression of their own.
#[derive(Clone, Copy)]
enum Supplied<'t> {
    Expression(ExprId),
    Element(&'t Type, SourceSpan),
}

/// Left-to-right binding state for one call.
struct BindState {
    /// Indices of the parameters that accept positional arguments, in order.
    positional: Vec<usize>,
    cursor: usize,
    supplied: HashSet<String>,
    variadic: Option<usize>,
    kw_variadic: Option<usize>,
    /// Set by spreads whose contents are not statically known, which may
    /// fill any parameter.
    opaque: bool,
}

impl BindState {
    fn new(params: &[ParamInfo]) -> Self {
        Self {
            positional: params
                .iter()
                .enumerate()
                .filter(|(_, param)| param.is_ordinary() && !param.is_named_only)
                .map(|(index, _)| index)
                .collect(),
            cursor: 0,
            supplied: HashSet::new(),
            variadic: params.iter().position(|param| param.is_variadic),
            kw_variadic: params.iter().position(|param| param.is_kw_variadic),
            opaque: false,
        }
    }
}

impl<'a> TypeChecker<'a> {
    pub(super) fn type_from_call(
        &mut self,
        callee: ExprId,
        arguments: &[Argument],
        span: SourceSpan,
    ) -> Type {
        match self.resolve_callee(callee) {
            Callee::Bound {
                name,
                params,
                result,
            } => {
                self.bind_arguments(&name, &params, arguments, span);
                result
            }
            Callee::Positional { params, result } => {
                self.check_positional_call(&params, arguments, span);
                result
            }
            Callee::Dynamic(result) => {
                for argument in arguments {
                    self.check_expr(argument.value, None);
                }
                result
            }
        }
    }

    fn resolve_callee(&mut self, callee: ExprId) -> Callee {
        let program = self.program;
        let expression = program.expression(callee);
        match &expression.kind {
            ExpressionKind::Identifier(name) => {
                if let Some(symbol_id) = self.scopes.lookup_value(name) {
                    let kind = self.symbols.get(symbol_id).kind;
                    match kind {
                        SymbolKind::Function => return self.function_callee(callee, symbol_id),
                        SymbolKind::Variant => return self.variant_callee(callee, symbol_id),
                        _ => {}
                    }
                } else if let Some(type_id) = self.scopes.lookup_type_symbol(name) {
                    return self.constructor_callee(callee, type_id, expression.span);
                }
            }
            ExpressionKind::Member { object, property } => {
                let object_type = self.check_expr(*object, None);
                match self.lookup_member(&object_type, &property.name) {
                    MemberLookup::Found {
                        method: Some(method),
                        mapping,
                        ..
                    } => return self.method_callee(callee, method, &mapping),
                    MemberLookup::Found { ty, .. } => {
                        self.record(callee, ty.clone());
                        return self.callee_from_type(ty, expression.span);
                    }
                    MemberLookup::Missing(owner) => {
                        self.report(
                            DiagnosticCode::UnknownMember,
                            format!("{owner} has no member {}", quoted(&property.name)),
                            property.span,
                        );
                        self.record(callee, Type::Error);
                        return Callee::Dynamic(Type::Error);
                    }
                    MemberLookup::Untracked => {
                        self.record(callee, Type::Unknown);
                        return Callee::Dynamic(Type::Unknown);
                    }
                }
            }
            _ => {}
        }

        let ty = self.check_expr(callee, None);
        self.callee_from_type(ty, expression.span)
    }

    fn function_callee(&mut self, callee: ExprId, symbol_id: SymbolId) -> Callee {
        let symbol = self.symbols.get(symbol_id);
        let ty = symbol.ty.clone().unwrap_or(Type::Unknown);
        let result = match &ty {
            Type::Function(function) => (*function.return_type).clone(),
            _ => Type::Unknown,
        };
        let name = symbol.name.clone();
        let params = symbol.params.clone().unwrap_or_default();
        self.record(callee, ty);
        Callee::Bound {
            name,
            params,
            result,
        }
    }

    fn method_callee(
        &mut self,
        callee: ExprId,
        method: SymbolId,
        mapping: &HashMap<String, Type>,
    ) -> Callee {
        let symbol = self.symbols.get(method);
        let ty = symbol
            .ty
            .as_ref()
            .map(|ty| ty.substitute(mapping))
            .unwrap_or(Type::Unknown);
        let result = match &ty {
            Type::Function(function) => (*function.return_type).clone(),
            _ => Type::Unknown,
        };
        let name = symbol.name.clone();
        let params = symbol
            .params
            .iter()
            .flatten()
            .map(|param| ParamInfo {
                ty: param.ty.substitute(mapping),
                ..param.clone()
            })
            .collect();
        self.record(callee, ty);
        Callee::Bound {
            name,
            params,
            result,
        }
    }

    /// Variants take their payload positionally. The result omits type
    /// arguments so it fits any instantiation of the enum.
    fn variant_callee(&mut self, callee: ExprId, symbol_id: SymbolId) -> Callee {
        let symbol = self.symbols.get(symbol_id);
        let enum_name = symbol
            .owner
            .map(|owner| self.symbols.get(owner).name.clone())
            .unwrap_or_default();
        let result = Type::named(enum_name, symbol.owner);
        let params = symbol
            .payload
            .iter()
            .enumerate()
            .map(|(position, ty)| ParamInfo {
                name: position.to_string(),
                ty: ty.clone(),
                is_named_only: false,
                has_default: false,
                is_variadic: false,
                is_kw_variadic: false,
                is_mutable: false,
                span: symbol.span,
            })
            .collect();
        let name = symbol.name.clone();
        let ty = symbol.ty.clone().unwrap_or(Type::Unknown);
        self.record(callee, ty);
        Callee::Bound {
            name,
            params,
            result,
        }
    }

    /// `C(args)` constructs a class, binding against its `init` method when
    /// it declares one.
    fn constructor_callee(
        &mut self,
        callee: ExprId,
        type_id: SymbolId,
        span: SourceSpan,
    ) -> Callee {
        let symbol = self.symbols.get(type_id);
        if symbol.kind != SymbolKind::Class {
            let message = if symbol.kind == SymbolKind::Struct {
                format!(
                    "struct {} cannot be called; use a struct literal",
                    quoted(&symbol.name)
                )
            } else {
                format!("{} {} is not callable", symbol.kind.describe(), quoted(&symbol.name))
            };
            self.report(DiagnosticCode::NotCallable, message, span);
            self.record(callee, Type::Error);
            return Callee::Dynamic(Type::Error);
        }

        let result = Type::Named(NamedType {
            name: symbol.name.clone(),
            symbol: Some(type_id),
            type_arguments: None,
            aliasable: true,
        });
        let params = symbol
            .member("init")
            .and_then(|member| member.method)
            .and_then(|init| self.symbols.get(init).params.clone())
            .unwrap_or_default();
        let name = symbol.name.clone();
        let param_types = params.iter().map(|param| param.ty.clone()).collect();
        self.record(callee, Type::function(param_types, result.clone()));
        Callee::Bound {
            name,
            params,
            result,
        }
    }

    fn callee_from_type(&mut self, ty: Type, span: SourceSpan) -> Callee {
        match ty {
            Type::Function(function) => Callee::Positional {
                params: function.params,
                result: *function.return_type,
            },
            Type::Error => Callee::Dynamic(Type::Error),
            absorbing if absorbing.is_absorbing() => Callee::Dynamic(Type::Unknown),
            other => {
                self.report(
                    DiagnosticCode::NotCallable,
                    format!("{other} is not callable"),
                    span,
                );
                Callee::Dynamic(Type::Error)
            }
        }
    }

    fn bind_arguments(
        &mut self,
        callee: &str,
        params: &[ParamInfo],
        arguments: &[Argument],
        call_span: SourceSpan,
    ) {
        let program = self.program;
        let mut state = BindState::new(params);

        for argument in arguments {
            match &argument.kind {
                ArgumentKind::Positional => {
                    self.bind_positional(
                        callee,
                        params,
                        &mut state,
                        Supplied::Expression(argument.value),
                    );
                }
                ArgumentKind::Named(name) => {
                    if !state.supplied.insert(name.name.clone()) {
                        self.report(
                            DiagnosticCode::DuplicateArgument,
                            format!("argument {} is supplied more than once", quoted(&name.name)),
                            name.span,
                        );
                        self.check_expr(argument.value, None);
                        continue;
                    }
                    self.bind_named(callee, params, &state, &name.name, argument.value, name.span);
                }
                ArgumentKind::Spread => {
                    if let ExpressionKind::TupleLiteral(elements) =
                        &program.expression(argument.value).kind
                    {
                        let mut element_types = Vec::with_capacity(elements.len());
                        for &element in elements {
                            let ty = self.bind_positional(
                                callee,
                                params,
                                &mut state,
                                Supplied::Expression(element),
                            );
                            element_types.push(ty);
                        }
                        self.record(argument.value, Type::Tuple(element_types));
                        continue;
                    }
                    let ty = self.check_expr(argument.value, None);
                    self.bind_spread(callee, params, &mut state, &ty, argument.span);
                }
                ArgumentKind::KeywordSpread => {
                    self.bind_keyword_spread(callee, params, &mut state, argument);
                }
            }
        }

        if state.opaque {
            return;
        }
        for param in params {
            if param.is_ordinary() && !param.has_default && !state.supplied.contains(&param.name) {
                self.report(
                    DiagnosticCode::MissingArgument,
                    format!(
                        "missing argument for parameter {} of {}",
                        quoted(&param.name),
                        quoted(callee)
                    ),
                    call_span,
                );
            }
        }
    }

    /// Binds the next positional slot, overflowing into the variadic
    /// parameter. Returns the type of the supplied value.
    fn bind_positional(
        &mut self,
        callee: &str,
        params: &[ParamInfo],
        state: &mut BindState,
        supplied: Supplied<'_>,
    ) -> Type {
        if let Some(&index) = state.positional.get(state.cursor) {
            state.cursor += 1;
            let param = &params[index];
            if !state.supplied.insert(param.name.clone()) {
                let span = self.supplied_span(supplied);
                self.report(
                    DiagnosticCode::DuplicateArgument,
                    format!("argument {} is supplied more than once", quoted(&param.name)),
                    span,
                );
            }
            return self.check_supplied(param, &param.ty, supplied);
        }

        if let Some(variadic) = state.variadic {
            let param = &params[variadic];
            let element = param.ty.array_element().unwrap_or(Type::Unknown);
            return self.check_supplied(param, &element, supplied);
        }

        let span = self.supplied_span(supplied);
        self.report(
            DiagnosticCode::TooManyPositional,
            format!(
                "too many positional arguments: {} takes {}",
                quoted(callee),
                plural(state.positional.len(), "positional argument")
            ),
            span,
        );
        match supplied {
            Supplied::Expression(value) => self.check_expr(value, None),
            Supplied::Element(ty, _) => ty.clone(),
        }
    }

    fn bind_named(
        &mut self,
        callee: &str,
        params: &[ParamInfo],
        state: &BindState,
        name: &str,
        value: ExprId,
        span: SourceSpan,
    ) -> Type {
        if let Some(param) = params
            .iter()
            .find(|param| param.is_ordinary() && param.name == name)
        {
            return self.check_supplied(param, &param.ty, Supplied::Expression(value));
        }
        if let Some(kw_variadic) = state.kw_variadic {
            let param = &params[kw_variadic];
            let value_type = param
                .ty
                .map_entry()
                .map(|(_, value)| value)
                .unwrap_or(Type::Unknown);
            return self.check_supplied(param, &value_type, Supplied::Expression(value));
        }
        self.report(
            DiagnosticCode::UnknownNamedArgument,
            format!("{} has no parameter named {}", quoted(callee), quoted(name)),
            span,
        );
        self.check_expr(value, None)
    }

    fn bind_spread(
        &mut self,
        callee: &str,
        params: &[ParamInfo],
        state: &mut BindState,
        ty: &Type,
        span: SourceSpan,
    ) {
        if let Type::Tuple(elements) = ty {
            for element in elements {
                self.bind_positional(callee, params, state, Supplied::Element(element, span));
            }
            return;
        }
        if ty.is_absorbing() {
            state.opaque = true;
            return;
        }
        let Some(element) = ty.array_element() else {
            self.report(
                DiagnosticCode::InvalidSpread,
                format!("cannot spread {ty}; expected a tuple or an array"),
                span,
            );
            return;
        };
        let Some(variadic) = state.variadic else {
            self.report(
                DiagnosticCode::InvalidSpread,
                format!(
                    "cannot spread {ty} into {}, which has no variadic parameter",
                    quoted(callee)
                ),
                span,
            );
            return;
        };
        let expected = params[variadic].ty.array_element().unwrap_or(Type::Unknown);
        if !is_assignable(&element, &expected) {
            self.report(
                DiagnosticCode::TypeMismatch,
                mismatch(
                    &format!("spread into {}", quoted(&params[variadic].name)),
                    &expected,
                    &element,
                ),
                span,
            );
        }
    }

    fn bind_keyword_spread(
        &mut self,
        callee: &str,
        params: &[ParamInfo],
        state: &mut BindState,
        argument: &Argument,
    ) {
        let program = self.program;
        if let ExpressionKind::MapLiteral(entries) = &program.expression(argument.value).kind {
            let mut keys = Vec::with_capacity(entries.len());
            let mut literal_keys = Vec::with_capacity(entries.len());
            for entry in entries {
                let key_type = self.check_expr(entry.key, Some(&Type::STRING));
                if !key_type.is_string() && !key_type.is_absorbing() {
                    let key_span = self.span_of(entry.key);
                    self.report(
                        DiagnosticCode::NonStringSpreadKey,
                        format!("keyword spread keys must be strings, found {key_type}"),
                        key_span,
                    );
                }
                if let ExpressionKind::Literal(Literal::String(key)) =
                    &program.expression(entry.key).kind
                {
                    literal_keys.push(key.as_str());
                }
                keys.push(key_type);
            }

            if literal_keys.len() != entries.len() {
                for entry in entries {
                    self.check_expr(entry.value, None);
                }
                state.opaque = true;
                self.record(argument.value, Type::map(Type::STRING, Type::Unknown));
                return;
            }

            let mut values = Vec::with_capacity(entries.len());
            for (entry, key) in entries.iter().zip(literal_keys) {
                let key_span = self.span_of(entry.key);
                if !state.supplied.insert(key.to_string()) {
                    self.report(
                        DiagnosticCode::KeywordSpreadOverlap,
                        format!("keyword spread supplies {}, which is already given", quoted(key)),
                        key_span,
                    );
                    values.push(self.check_expr(entry.value, None));
                    continue;
                }
                values.push(self.bind_named(callee, params, state, key, entry.value, key_span));
            }
            let map_type = if entries.is_empty() {
                Type::map(Type::STRING, Type::Unknown)
            } else {
                Type::map(make_union(keys), make_union(values))
            };
            self.record(argument.value, map_type);
            return;
        }

        let ty = self.check_expr(argument.value, None);
        if ty.is_absorbing() {
            state.opaque = true;
            return;
        }
        let Some((key, value)) = ty.map_entry() else {
            self.report(
                DiagnosticCode::InvalidSpread,
                format!("cannot keyword-spread {ty}; expected a map"),
                argument.span,
            );
            return;
        };
        if !key.is_string() && !key.is_absorbing() {
            self.report(
                DiagnosticCode::NonStringSpreadKey,
                format!("keyword spread keys must be strings, found {key}"),
                argument.span,
            );
        }
        if let Some(kw_variadic) = state.kw_variadic {
            let expected = params[kw_variadic]
                .ty
                .map_entry()
                .map(|(_, value)| value)
                .unwrap_or(Type::Unknown);
            if !is_assignable(&value, &expected) {
                self.report(
                    DiagnosticCode::TypeMismatch,
                    mismatch(
                        &format!("keyword spread into {}", quoted(&params[kw_variadic].name)),
                        &expected,
                        &value,
                    ),
                    argument.span,
                );
            }
        }
        state.opaque = true;
    }

    /// Checks one supplied value against the type its parameter expects,
    /// including the `mut` requirement.
    fn check_supplied(
        &mut self,
        param: &ParamInfo,
        expected: &Type,
        supplied: Supplied<'_>,
    ) -> Type {
        let (actual, span) = match supplied {
            Supplied::Expression(value) => {
                (self.check_expr(value, Some(expected)), self.span_of(value))
            }
            Supplied::Element(ty, span) => (ty.clone(), span),
        };
        if !is_assignable(&actual, expected) {
            self.report(
                DiagnosticCode::TypeMismatch,
                mismatch(&format!("argument {}", quoted(&param.name)), expected, &actual),
                span,
            );
        }
        if param.is_mutable && !self.is_mutable_binding(supplied) {
            self.report(
                DiagnosticCode::MutableArgument,
                format!(
                    "parameter {} is 'mut'; pass a mutable variable",
                    quoted(&param.name)
                ),
                span,
            );
        }
        actual
    }

    fn is_mutable_binding(&self, supplied: Supplied<'_>) -> bool {
        let Supplied::Expression(value) = supplied else {
            return false;
        };
        let ExpressionKind::Identifier(name) = &self.program.expression(value).kind else {
            return false;
        };
        self.scopes.lookup_value(name).is_some_and(|id| {
            let symbol = self.symbols.get(id);
            symbol.kind == SymbolKind::Value && symbol.is_mutable && !symbol.is_const
        })
    }

    fn supplied_span(&self, supplied: Supplied<'_>) -> SourceSpan {
        match supplied {
            Supplied::Expression(value) => self.span_of(value),
            Supplied::Element(_, span) => span,
        }
    }

    /// Calls through a function-typed value: parameters are positional only.
    fn check_positional_call(
        &mut self,
        params: &[Type],
        arguments: &[Argument],
        call_span: SourceSpan,
    ) {
        let program = self.program;
        let mut supplied = 0usize;
        let mut opaque = false;

        for argument in arguments {
            match &argument.kind {
                ArgumentKind::Positional => {
                    self.check_positional_value(params.get(supplied), argument.value);
                    supplied += 1;
                }
                ArgumentKind::Named(name) => {
                    self.report(
                        DiagnosticCode::UnknownNamedArgument,
                        format!(
                            "named argument {} needs a callee with known parameter names",
                            quoted(&name.name)
                        ),
                        name.span,
                    );
                    self.check_expr(argument.value, None);
                }
                ArgumentKind::Spread => {
                    if let ExpressionKind::TupleLiteral(elements) =
                        &program.expression(argument.value).kind
                    {
                        let mut element_types = Vec::with_capacity(elements.len());
                        for &element in elements {
                            let ty = self.check_positional_value(params.get(supplied), element);
                            element_types.push(ty);
                            supplied += 1;
                        }
                        self.record(argument.value, Type::Tuple(element_types));
                        continue;
                    }
                    match self.check_expr(argument.value, None) {
                        Type::Tuple(elements) => {
                            for element in &elements {
                                if let Some(expected) = params.get(supplied) {
                                    if !is_assignable(element, expected) {
                                        self.report(
                                            DiagnosticCode::TypeMismatch,
                                            mismatch("argument", expected, element),
                                            argument.span,
                                        );
                                    }
                                }
                                supplied += 1;
                            }
                        }
                        ty if ty.is_absorbing() || ty.array_element().is_some() => opaque = true,
                        ty => self.report(
                            DiagnosticCode::InvalidSpread,
                            format!("cannot spread {ty}; expected a tuple or an array"),
                            argument.span,
                        ),
                    }
                }
                ArgumentKind::KeywordSpread => {
                    self.check_expr(argument.value, None);
                    self.report(
                        DiagnosticCode::InvalidSpread,
                        "keyword spread needs a callee with known parameter names",
                        argument.span,
                    );
                }
            }
        }

        if opaque {
            return;
        }
        if supplied > params.len() {
            self.report(
                DiagnosticCode::TooManyPositional,
                format!(
                    "too many arguments: expected {}, found {supplied}",
                    params.len()
                ),
                call_span,
            );
        } else if supplied < params.len() {
            self.report(
                DiagnosticCode::MissingArgument,
                format!(
                    "missing arguments: expected {}, found {supplied}",
                    params.len()
                ),
                call_span,
            );
        }
    }

    fn check_positional_value(&mut self, expected: Option<&Type>, value: ExprId) -> Type {
        let actual = self.check_expr(value, expected);
        if let Some(expected) = expected {
            if !is_assignable(&actual, expected) {
                let span = self.span_of(value);
                self.report(
                    DiagnosticCode::TypeMismatch,
                    mismatch("argument", expected, &actual),
                    span,
                );
            }
        }
        actual
    }
}
