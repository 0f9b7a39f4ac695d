mod calls;
mod declarations;
mod expressions;
mod patterns;
mod statements;
mod type_resolver;

use std::collections::HashMap;

use tracing::debug;

use crate::ast::{ExprId, Program, SourceSpan, StmtId};
use crate::diagnostics::{DiagnosticCode, Diagnostics};
use crate::options::CheckOptions;
use crate::scope::{ScopeStack, Symbol, SymbolId, SymbolKind, SymbolTable};
use crate::types::Type;

/// Type recorded for each checked expression, indexed by [`ExprId`].
#[derive(Debug, Default)]
pub struct TypeTable {
    types: Vec<Option<Type>>,
}

impl TypeTable {
    fn with_capacity(count: usize) -> Self {
        Self {
            types: vec![None; count],
        }
    }

    fn record(&mut self, id: ExprId, ty: Type) {
        let index = id.index();
        if index >= self.types.len() {
            self.types.resize(index + 1, None);
        }
        self.types[index] = Some(ty);
    }

    pub fn get(&self, id: ExprId) -> Option<&Type> {
        self.types.get(id.index()).and_then(Option::as_ref)
    }

    pub fn len(&self) -> usize {
        self.types.iter().filter(|ty| ty.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (ExprId, &Type)> {
        self.types
            .iter()
            .enumerate()
            .filter_map(|(index, ty)| ty.as_ref().map(|ty| (ExprId(index as u32), ty)))
    }
}

#[derive(Debug)]
pub struct CheckResult {
    pub diagnostics: Diagnostics,
    pub types: TypeTable,
}

#[derive(Debug)]
struct FunctionContext {
    declared_return: Option<Type>,
    returns: Vec<Type>,
}

/// Checks one file. Instances share nothing, so separate files may be checked
/// on separate threads.
pub struct TypeChecker<'a> {
    program: &'a Program,
    options: CheckOptions,
    symbols: SymbolTable,
    scopes: ScopeStack,
    diagnostics: Diagnostics,
    types: TypeTable,
    contexts: Vec<FunctionContext>,
    declarations: HashMap<StmtId, SymbolId>,
}

pub fn check_program(program: &Program, options: &CheckOptions) -> CheckResult {
    TypeChecker::new(program, options.clone()).check()
}

impl<'a> TypeChecker<'a> {
    pub fn new(program: &'a Program, options: CheckOptions) -> Self {
        Self {
            program,
            options,
            symbols: SymbolTable::new(),
            scopes: ScopeStack::new(),
            diagnostics: Diagnostics::new(),
            types: TypeTable::with_capacity(program.expression_count()),
            contexts: Vec::new(),
            declarations: HashMap::new(),
        }
    }

    /// Pre-declares a binding imported from another module. Import
    /// visibility has already been validated, so the value is Unknown-typed.
    pub fn declare_import(&mut self, name: &str, span: SourceSpan) {
        let mut symbol = Symbol::new(name, SymbolKind::Value, span).with_type(Type::Unknown);
        symbol.is_const = true;
        let id = self.symbols.alloc(symbol);
        self.declare_value(name, id, span);
    }

    pub fn check(mut self) -> CheckResult {
        let span = tracing::debug_span!("check", items = self.program.items.len());
        let _entered = span.enter();

        let items = self.program.items.clone();
        self.register_declarations(&items);
        self.check_statements(&items);

        debug!(
            diagnostics = self.diagnostics.len(),
            symbols = self.symbols.len(),
            "check finished"
        );
        CheckResult {
            diagnostics: self.diagnostics,
            types: self.types,
        }
    }

    fn report<S: Into<String>>(&mut self, code: DiagnosticCode, message: S, span: SourceSpan) {
        self.diagnostics.push(code, message, Some(span));
    }

    fn declare_value(&mut self, name: &str, symbol: SymbolId, span: SourceSpan) {
        if let Err(collision) = self.scopes.declare_value(name, symbol) {
            let existing = self.symbols.get(collision.existing).kind.describe();
            self.report(
                DiagnosticCode::DuplicateSymbol,
                format!(
                    "{} is already declared as a {existing} in this scope",
                    sable_support::quoted(name)
                ),
                span,
            );
        }
    }

    fn declare_type(&mut self, name: &str, symbol: SymbolId, span: SourceSpan) {
        if let Err(collision) = self.scopes.declare_type(name, symbol) {
            let existing = self.symbols.get(collision.existing).kind.describe();
            self.report(
                DiagnosticCode::DuplicateSymbol,
                format!(
                    "type {} is already declared as a {existing} in this scope",
                    sable_support::quoted(name)
                ),
                span,
            );
        }
    }

    fn record(&mut self, id: ExprId, ty: Type) {
        self.types.record(id, ty);
    }

    fn span_of(&self, id: ExprId) -> SourceSpan {
        self.program.expression(id).span
    }
}
