use std::collections::HashSet;
use std::ops::{Deref, DerefMut};

use sable_support::{plural, quoted};
use tracing::debug;

use super::TypeChecker;
use crate::ast::{SourceSpan, TypeExpression, TypeExpressionKind};
use crate::diagnostics::DiagnosticCode;
use crate::scope::{SymbolId, SymbolKind};
use crate::types::{make_union, NamedType, Primitive, Type, ARRAY_TYPE, MAP_TYPE};

/// Aliases currently being expanded along one resolution path.
#[derive(Debug, Default)]
pub(super) struct AliasExpansion {
    active: Vec<String>,
    cyclic: HashSet<String>,
}

impl AliasExpansion {
    /// Marks `name` as in progress until the returned guard drops. `None`
    /// means `name` is already being expanded, i.e. a cycle.
    fn enter(&mut self, name: &str) -> Option<AliasGuard<'_>> {
        if let Some(position) = self.active.iter().position(|active| active == name) {
            let members: Vec<String> = self.active[position..].to_vec();
            self.cyclic.extend(members);
            return None;
        }
        self.active.push(name.to_string());
        Some(AliasGuard { expansion: self })
    }
}

struct AliasGuard<'s> {
    expansion: &'s mut AliasExpansion,
}

impl Deref for AliasGuard<'_> {
    type Target = AliasExpansion;

    fn deref(&self) -> &AliasExpansion {
        self.expansion
    }
}

impl DerefMut for AliasGuard<'_> {
    fn deref_mut(&mut self) -> &mut AliasExpansion {
        self.expansion
    }
}

impl Drop for AliasGuard<'_> {
    fn drop(&mut self) {
        self.expansion.active.pop();
    }
}

impl<'a> TypeChecker<'a> {
    pub(super) fn resolve_type(&mut self, expression: &TypeExpression) -> Type {
        let mut expansion = AliasExpansion::default();
        self.resolve_type_in(expression, &mut expansion)
    }

    fn resolve_type_in(
        &mut self,
        expression: &TypeExpression,
        expansion: &mut AliasExpansion,
    ) -> Type {
        match &expression.kind {
            TypeExpressionKind::Named { name, arguments } => {
                let arguments: Vec<Type> = arguments
                    .iter()
                    .map(|argument| self.resolve_type_in(argument, expansion))
                    .collect();
                self.resolve_named(name, arguments, expression.span, expansion)
            }
            TypeExpressionKind::Union(members) => {
                let members: Vec<Type> = members
                    .iter()
                    .map(|member| self.resolve_type_in(member, expansion))
                    .collect();
                make_union(members)
            }
            TypeExpressionKind::Tuple(elements) => Type::Tuple(
                elements
                    .iter()
                    .map(|element| self.resolve_type_in(element, expansion))
                    .collect(),
            ),
            TypeExpressionKind::Function {
                parameters,
                return_type,
            } => {
                let params = parameters
                    .iter()
                    .map(|param| self.resolve_type_in(param, expansion))
                    .collect();
                let return_type = self.resolve_type_in(return_type, expansion);
                Type::function(params, return_type)
            }
            TypeExpressionKind::Placeholder => {
                self.report(
                    DiagnosticCode::UnknownType,
                    "unresolved type in annotation",
                    expression.span,
                );
                Type::Error
            }
        }
    }

    fn resolve_named(
        &mut self,
        name: &str,
        arguments: Vec<Type>,
        span: SourceSpan,
        expansion: &mut AliasExpansion,
    ) -> Type {
        if let Some(primitive) = Primitive::from_name(name) {
            self.check_generic_arity(name, 0, arguments.len(), span);
            return Type::Primitive(primitive);
        }

        match name {
            ARRAY_TYPE => {
                self.check_generic_arity(name, 1, arguments.len(), span);
                let element = arguments.into_iter().next().unwrap_or(Type::Unknown);
                return Type::array(element);
            }
            MAP_TYPE => {
                self.check_generic_arity(name, 2, arguments.len(), span);
                let mut arguments = arguments.into_iter();
                let key = arguments.next().unwrap_or(Type::Unknown);
                let value = arguments.next().unwrap_or(Type::Unknown);
                return Type::map(key, value);
            }
            _ => {}
        }

        let Some(symbol_id) = self.scopes.lookup_type_symbol(name) else {
            self.report(
                DiagnosticCode::UnknownType,
                format!("unknown type {}", quoted(name)),
                span,
            );
            return Type::Error;
        };

        let symbol = self.symbols.get(symbol_id);
        let kind = symbol.kind;
        let expected_arity = symbol.type_parameters.len();
        match kind {
            SymbolKind::TypeParam => {
                self.check_generic_arity(name, 0, arguments.len(), span);
                Type::TypeParam(name.to_string())
            }
            SymbolKind::Struct | SymbolKind::Enum | SymbolKind::Class => {
                self.check_generic_arity(name, expected_arity, arguments.len(), span);
                Type::Named(NamedType {
                    name: name.to_string(),
                    symbol: Some(symbol_id),
                    type_arguments: (!arguments.is_empty()).then_some(arguments),
                    aliasable: kind == SymbolKind::Class,
                })
            }
            SymbolKind::Alias => {
                self.check_generic_arity(name, 0, arguments.len(), span);
                self.expand_alias(symbol_id, span, expansion)
            }
            SymbolKind::Value | SymbolKind::Function | SymbolKind::Variant => {
                self.report(
                    DiagnosticCode::UnknownType,
                    format!("{} is not a type", quoted(name)),
                    span,
                );
                Type::Error
            }
        }
    }

    /// Expands an alias once and memoizes the result on its symbol.
    pub(super) fn expand_alias_symbol(&mut self, symbol_id: SymbolId) -> Type {
        let span = self.symbols.get(symbol_id).span;
        let mut expansion = AliasExpansion::default();
        self.expand_alias(symbol_id, span, &mut expansion)
    }

    fn expand_alias(
        &mut self,
        symbol_id: SymbolId,
        span: SourceSpan,
        expansion: &mut AliasExpansion,
    ) -> Type {
        let symbol = self.symbols.get(symbol_id);
        if let Some(resolved) = &symbol.ty {
            return resolved.clone();
        }
        let name = symbol.name.clone();
        let Some(target) = symbol.alias_target.clone() else {
            return Type::Error;
        };

        let Some(mut guard) = expansion.enter(&name) else {
            debug!(alias = %name, "type alias cycle detected");
            self.report(
                DiagnosticCode::AliasCycle,
                format!("type alias {} refers to itself", quoted(&name)),
                span,
            );
            return Type::Error;
        };
        let expanded = self.resolve_type_in(&target, &mut guard);
        let resolved = if guard.cyclic.contains(&name) {
            Type::Error
        } else {
            expanded
        };
        drop(guard);

        let symbol = self.symbols.get_mut(symbol_id);
        if symbol.ty.is_none() {
            symbol.ty = Some(resolved.clone());
        }
        resolved
    }

    fn check_generic_arity(&mut self, name: &str, expected: usize, found: usize, span: SourceSpan) {
        if expected == found {
            return;
        }
        let message = if expected == 0 {
            format!("type {} does not take type arguments", quoted(name))
        } else {
            format!(
                "type {} expects {}, found {found}",
                quoted(name),
                plural(expected, "type argument")
            )
        };
        self.report(DiagnosticCode::GenericArity, message, span);
    }
}
