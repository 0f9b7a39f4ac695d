use std::collections::{HashMap, HashSet};

use sable_support::{join_quoted, plural, quoted};

use super::TypeChecker;
use crate::ast::{Identifier, MatchStatement, Pattern, PatternKind, SourceSpan};
use crate::diagnostics::DiagnosticCode;
use crate::scope::{SymbolId, SymbolKind};
use crate::types::{is_assignable, type_argument_mapping, NamedType, Type};

/// The enum backing a match subject, with the subject's type arguments.
struct MatchedEnum {
    symbol: SymbolId,
    mapping: HashMap<String, Type>,
}

enum PatternOutcome {
    /// Wildcards and plain bindings.
    CatchAll,
    Variant(SymbolId),
    Literal,
    Invalid,
}

impl<'a> TypeChecker<'a> {
    pub(super) fn check_match(&mut self, stmt: &MatchStatement, span: SourceSpan) {
        let subject = self.check_expr(stmt.subject, None);
        let matched = self.subject_enum(&subject);

        let mut seen: HashSet<SymbolId> = HashSet::new();
        let mut catch_all = false;
        let mut pattern_error = false;
        for arm in &stmt.arms {
            self.scopes.push();
            match self.check_pattern(&arm.pattern, &subject, matched.as_ref()) {
                PatternOutcome::CatchAll => catch_all = true,
                PatternOutcome::Variant(variant) => {
                    seen.insert(variant);
                }
                PatternOutcome::Literal => {}
                PatternOutcome::Invalid => pattern_error = true,
            }
            self.check_statements(&arm.body.statements);
            self.scopes.pop();
        }

        let Some(matched) = matched else {
            return;
        };
        if catch_all || pattern_error {
            return;
        }
        let enum_symbol = self.symbols.get(matched.symbol);
        let missing: Vec<&str> = enum_symbol
            .variants
            .iter()
            .filter(|variant| !seen.contains(variant))
            .map(|variant| self.symbols.get(*variant).name.as_str())
            .collect();
        if missing.is_empty() {
            return;
        }
        let noun = if missing.len() == 1 { "variant" } else { "variants" };
        let message = format!(
            "match on {} is not exhaustive; missing {noun} {}",
            quoted(&enum_symbol.name),
            join_quoted(&missing)
        );
        self.report(DiagnosticCode::NonExhaustiveMatch, message, span);
    }

    /// A direct enum type, or the only enum member of a union.
    fn subject_enum(&self, subject: &Type) -> Option<MatchedEnum> {
        let is_enum = |named: &&NamedType| {
            named
                .symbol
                .is_some_and(|symbol| self.symbols.get(symbol).kind == SymbolKind::Enum)
        };
        let named = match subject {
            Type::Named(named) => Some(named).filter(is_enum),
            Type::Union(members) => {
                let mut enums = members.iter().filter_map(Type::named_type).filter(is_enum);
                match (enums.next(), enums.next()) {
                    (Some(named), None) => Some(named),
                    _ => None,
                }
            }
            _ => None,
        }?;
        let symbol = named.symbol?;
        let mapping = type_argument_mapping(
            &self.symbols.get(symbol).type_parameters,
            named.type_arguments.as_deref(),
        );
        Some(MatchedEnum { symbol, mapping })
    }

    fn check_pattern(
        &mut self,
        pattern: &Pattern,
        subject: &Type,
        matched: Option<&MatchedEnum>,
    ) -> PatternOutcome {
        match &pattern.kind {
            PatternKind::Wildcard => PatternOutcome::CatchAll,
            PatternKind::Identifier(name) => {
                let variant = self
                    .scopes
                    .lookup_value(name)
                    .filter(|symbol| self.symbols.get(*symbol).kind == SymbolKind::Variant);
                if let Some(variant) = variant {
                    return self.check_variant_pattern(variant, &[], pattern.span, matched);
                }
                self.declare_binding(name, subject.clone(), pattern.span);
                PatternOutcome::CatchAll
            }
            PatternKind::Literal(literal) => {
                let ty = self.type_from_literal(literal, Some(subject), pattern.span, false);
                if is_assignable(&ty, subject) {
                    PatternOutcome::Literal
                } else {
                    self.report(
                        DiagnosticCode::LiteralPattern,
                        format!("a {ty} literal cannot match a subject of type {subject}"),
                        pattern.span,
                    );
                    PatternOutcome::Invalid
                }
            }
            PatternKind::Variant { name, bindings } => {
                let Some(symbol) = self.scopes.lookup_value(&name.name) else {
                    self.report(
                        DiagnosticCode::UnknownIdentifier,
                        format!("unknown identifier {}", quoted(&name.name)),
                        name.span,
                    );
                    self.bind_unknown(bindings);
                    return PatternOutcome::Invalid;
                };
                if self.symbols.get(symbol).kind != SymbolKind::Variant {
                    self.report(
                        DiagnosticCode::NotAVariant,
                        format!("{} is not an enum variant", quoted(&name.name)),
                        name.span,
                    );
                    self.bind_unknown(bindings);
                    return PatternOutcome::Invalid;
                }
                self.check_variant_pattern(symbol, bindings, name.span, matched)
            }
        }
    }

    fn check_variant_pattern(
        &mut self,
        variant: SymbolId,
        bindings: &[Identifier],
        span: SourceSpan,
        matched: Option<&MatchedEnum>,
    ) -> PatternOutcome {
        let symbol = self.symbols.get(variant);
        let name = symbol.name.clone();
        let owner = symbol.owner;
        let payload = symbol.payload.clone();
        let mut invalid = false;

        let mapping = match matched {
            Some(matched) => {
                if owner != Some(matched.symbol) {
                    let enum_name = self.symbols.get(matched.symbol).name.clone();
                    self.report(
                        DiagnosticCode::ForeignVariant,
                        format!(
                            "variant {} does not belong to enum {}",
                            quoted(&name),
                            quoted(&enum_name)
                        ),
                        span,
                    );
                    invalid = true;
                }
                matched.mapping.clone()
            }
            None => HashMap::new(),
        };

        if bindings.len() != payload.len() {
            self.report(
                DiagnosticCode::PatternArity,
                format!(
                    "variant {} carries {}, but the pattern binds {}",
                    quoted(&name),
                    plural(payload.len(), "value"),
                    bindings.len()
                ),
                span,
            );
            invalid = true;
        }

        for (position, binding) in bindings.iter().enumerate() {
            let ty = payload
                .get(position)
                .map(|ty| ty.substitute(&mapping))
                .unwrap_or(Type::Unknown);
            self.declare_binding(&binding.name, ty, binding.span);
        }

        if invalid {
            PatternOutcome::Invalid
        } else {
            PatternOutcome::Variant(variant)
        }
    }

    fn bind_unknown(&mut self, bindings: &[Identifier]) {
        for binding in bindings {
            self.declare_binding(&binding.name, Type::Unknown, binding.span);
        }
    }
}
