use std::collections::HashSet;

use sable_support::quoted;
use tracing::debug;

use super::TypeChecker;
use crate::ast::{
    FieldDecl, FunctionDecl, ParameterKind, SourceSpan, StatementKind, StmtId, TypeParameter,
};
use crate::diagnostics::DiagnosticCode;
use crate::scope::{MemberInfo, ParamInfo, Symbol, SymbolId, SymbolKind};
use crate::types::{NamedType, Type};

impl<'a> TypeChecker<'a> {
    /// Registers every type and function declared in `statements` so that
    /// bodies may refer to them regardless of order.
    pub(super) fn register_declarations(&mut self, statements: &[StmtId]) {
        let program = self.program;

        // First pass: type names, so field and signature types can refer
        // to any of them.
        let mut registered = Vec::new();
        for &id in statements {
            if let Some(symbol) = self.register_type_name(id) {
                registered.push((id, symbol));
            }
        }

        // Second pass: fields, variants, methods and alias targets.
        for &(id, symbol) in &registered {
            self.populate_type(id, symbol);
        }

        let mut functions = 0;
        for &id in statements {
            if let StatementKind::Function(decl) = &program.statement(id).kind {
                self.register_function(id, decl);
                functions += 1;
            }
        }

        debug!(
            types = registered.len(),
            functions, "registered declarations"
        );
    }

    /// Registers a declaration met inside a block, unless the pre-pass
    /// already saw it.
    pub(super) fn ensure_registered(&mut self, id: StmtId) -> Option<SymbolId> {
        if let Some(symbol) = self.declarations.get(&id) {
            return Some(*symbol);
        }
        let program = self.program;
        match &program.statement(id).kind {
            StatementKind::Function(decl) => Some(self.register_function(id, decl)),
            _ => {
                let symbol = self.register_type_name(id)?;
                self.populate_type(id, symbol);
                Some(symbol)
            }
        }
    }

    fn register_type_name(&mut self, id: StmtId) -> Option<SymbolId> {
        let program = self.program;
        let (kind, name, type_parameters, is_public) = match &program.statement(id).kind {
            StatementKind::Struct(decl) => (
                SymbolKind::Struct,
                &decl.name,
                &decl.type_parameters,
                decl.is_public,
            ),
            StatementKind::Class(decl) => (
                SymbolKind::Class,
                &decl.name,
                &decl.type_parameters,
                decl.is_public,
            ),
            StatementKind::Enum(decl) => (
                SymbolKind::Enum,
                &decl.name,
                &decl.type_parameters,
                decl.is_public,
            ),
            StatementKind::Alias(decl) => {
                let mut symbol =
                    Symbol::new(decl.name.name.clone(), SymbolKind::Alias, decl.name.span);
                symbol.node = Some(id);
                symbol.is_public = decl.is_public;
                symbol.alias_target = Some(decl.target.clone());
                let symbol_id = self.symbols.alloc(symbol);
                self.declare_type(&decl.name.name, symbol_id, decl.name.span);
                self.declarations.insert(id, symbol_id);
                return Some(symbol_id);
            }
            _ => return None,
        };

        let mut symbol = Symbol::new(name.name.clone(), kind, name.span);
        symbol.node = Some(id);
        symbol.is_public = is_public;
        symbol.type_parameters = type_parameters.iter().map(|param| param.name.clone()).collect();
        let symbol_id = self.symbols.alloc(symbol);
        self.declare_type(&name.name, symbol_id, name.span);
        self.declarations.insert(id, symbol_id);
        Some(symbol_id)
    }

    fn populate_type(&mut self, id: StmtId, symbol_id: SymbolId) {
        let program = self.program;
        match &program.statement(id).kind {
            StatementKind::Struct(decl) => {
                self.populate_record(symbol_id, &decl.type_parameters, &decl.fields, &decl.methods)
            }
            StatementKind::Class(decl) => {
                self.populate_record(symbol_id, &decl.type_parameters, &decl.fields, &decl.methods)
            }
            StatementKind::Enum(decl) => {
                self.scopes.push();
                self.declare_type_parameters(&decl.type_parameters);
                let variants: Vec<(String, SourceSpan, Vec<Type>)> = decl
                    .variants
                    .iter()
                    .map(|variant| {
                        let payload = variant
                            .payload
                            .iter()
                            .map(|ty| self.resolve_type(ty))
                            .collect();
                        (variant.name.clone(), variant.span, payload)
                    })
                    .collect();
                self.scopes.pop();

                let enum_type = Type::named(decl.name.name.clone(), Some(symbol_id));
                let mut variant_ids = Vec::with_capacity(variants.len());
                for (name, span, payload) in variants {
                    let ty = if payload.is_empty() {
                        enum_type.clone()
                    } else {
                        Type::function(payload.clone(), enum_type.clone())
                    };
                    let mut variant =
                        Symbol::new(name.clone(), SymbolKind::Variant, span).with_type(ty);
                    variant.node = Some(id);
                    variant.owner = Some(symbol_id);
                    variant.payload = payload;
                    variant.is_public = decl.is_public;
                    let variant_id = self.symbols.alloc(variant);
                    self.declare_value(&name, variant_id, span);
                    variant_ids.push(variant_id);
                }
                self.symbols.get_mut(symbol_id).variants = variant_ids;
            }
            StatementKind::Alias(_) => {
                self.expand_alias_symbol(symbol_id);
            }
            _ => {}
        }
    }

    fn populate_record(
        &mut self,
        symbol_id: SymbolId,
        type_parameters: &[TypeParameter],
        fields: &[FieldDecl],
        methods: &[StmtId],
    ) {
        let program = self.program;
        let owner = self.symbols.get(symbol_id).name.clone();
        let mut members: Vec<MemberInfo> = Vec::new();
        let mut seen = HashSet::new();

        self.scopes.push();
        self.declare_type_parameters(type_parameters);
        for field in fields {
            let ty = self.resolve_type(&field.type_annotation);
            if !seen.insert(field.name.clone()) {
                self.report(
                    DiagnosticCode::DuplicateSymbol,
                    format!("duplicate field {} in {}", quoted(&field.name), quoted(&owner)),
                    field.span,
                );
                continue;
            }
            members.push(MemberInfo {
                name: field.name.clone(),
                ty,
                method: None,
                span: field.span,
            });
        }

        for &method_id in methods {
            let StatementKind::Function(decl) = &program.statement(method_id).kind else {
                continue;
            };
            let method = self.function_symbol(method_id, decl);
            if !seen.insert(decl.name.name.clone()) {
                self.report(
                    DiagnosticCode::DuplicateSymbol,
                    format!(
                        "duplicate member {} in {}",
                        quoted(&decl.name.name),
                        quoted(&owner)
                    ),
                    decl.name.span,
                );
                continue;
            }
            let ty = self.symbols.get(method).ty.clone().unwrap_or(Type::Unknown);
            members.push(MemberInfo {
                name: decl.name.name.clone(),
                ty,
                method: Some(method),
                span: decl.name.span,
            });
        }
        self.scopes.pop();

        self.symbols.get_mut(symbol_id).members = members;
    }

    fn register_function(&mut self, id: StmtId, decl: &FunctionDecl) -> SymbolId {
        let symbol_id = self.function_symbol(id, decl);
        self.declare_value(&decl.name.name, symbol_id, decl.name.span);
        symbol_id
    }

    /// Builds the symbol for a function or method with its parameter list.
    /// The function type is only filled here when the return type is
    /// annotated; otherwise it is inferred once the body has been checked.
    fn function_symbol(&mut self, id: StmtId, decl: &FunctionDecl) -> SymbolId {
        if let Some(symbol) = self.declarations.get(&id) {
            return *symbol;
        }

        self.scopes.push();
        self.declare_type_parameters(&decl.type_parameters);
        let params = self.parameter_infos(decl);
        let return_type = decl
            .return_type
            .as_ref()
            .map(|annotation| self.resolve_type(annotation));
        self.scopes.pop();

        let mut symbol = Symbol::new(decl.name.name.clone(), SymbolKind::Function, decl.name.span);
        symbol.node = Some(id);
        symbol.is_public = decl.is_public;
        symbol.type_parameters = decl
            .type_parameters
            .iter()
            .map(|param| param.name.clone())
            .collect();
        if let Some(return_type) = return_type {
            let param_types = params.iter().map(|param| param.ty.clone()).collect();
            symbol.ty = Some(Type::function(param_types, return_type));
        }
        symbol.params = Some(params);

        let symbol_id = self.symbols.alloc(symbol);
        self.declarations.insert(id, symbol_id);
        symbol_id
    }

    fn parameter_infos(&mut self, decl: &FunctionDecl) -> Vec<ParamInfo> {
        let mut infos = Vec::with_capacity(decl.parameters.len());
        let mut named_only = false;
        for param in &decl.parameters {
            let annotated = param
                .type_annotation
                .as_ref()
                .map(|annotation| self.resolve_type(annotation))
                .unwrap_or(Type::Unknown);
            let (ty, is_variadic, is_kw_variadic) = match param.kind {
                ParameterKind::Separator => {
                    named_only = true;
                    continue;
                }
                ParameterKind::Ordinary => (annotated, false, false),
                ParameterKind::Variadic => (Type::array(annotated), true, false),
                ParameterKind::KwVariadic => (Type::map(Type::STRING, annotated), false, true),
            };
            infos.push(ParamInfo {
                name: param.name.clone(),
                ty,
                is_named_only: named_only && !is_variadic && !is_kw_variadic,
                has_default: param.default_value.is_some(),
                is_variadic,
                is_kw_variadic,
                is_mutable: param.is_mutable,
                span: param.span,
            });
            if is_variadic {
                named_only = true;
            }
        }
        infos
    }

    pub(super) fn declare_type_parameters(&mut self, type_parameters: &[TypeParameter]) {
        for param in type_parameters {
            let symbol = Symbol::new(param.name.clone(), SymbolKind::TypeParam, param.span)
                .with_type(Type::TypeParam(param.name.clone()));
            let symbol_id = self.symbols.alloc(symbol);
            self.declare_type(&param.name, symbol_id, param.span);
        }
    }

    /// The type of `self` inside a method of the given struct or class.
    pub(super) fn self_type(&self, record: SymbolId) -> Type {
        let symbol = self.symbols.get(record);
        Type::Named(NamedType {
            name: symbol.name.clone(),
            symbol: Some(record),
            type_arguments: (!symbol.type_parameters.is_empty()).then(|| {
                symbol
                    .type_parameters
                    .iter()
                    .map(|param| Type::TypeParam(param.clone()))
                    .collect()
            }),
            aliasable: symbol.kind == SymbolKind::Class,
        })
    }
}
