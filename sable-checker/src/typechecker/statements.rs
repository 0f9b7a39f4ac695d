use sable_support::{mismatch, quoted};
use tracing::debug;

use super::{FunctionContext, TypeChecker};
use crate::ast::{
    BinaryOperator, Block, ExprId, ExpressionKind, FunctionDecl, IfStatement, LetStatement,
    Literal, ReturnStatement, SourceSpan, StatementKind, StmtId, TypeParameter,
};
use crate::diagnostics::DiagnosticCode;
use crate::options::ConditionPolicy;
use crate::scope::{Symbol, SymbolId, SymbolKind};
use crate::types::{is_assignable, make_union, remove_null, Type};

/// Override types for the two branches of an `if` testing a binding
/// against `null`.
struct NullNarrowing<'p> {
    name: &'p str,
    consequent: Type,
    alternative: Type,
}

impl<'a> TypeChecker<'a> {
    pub(super) fn check_statements(&mut self, statements: &[StmtId]) {
        for &id in statements {
            self.check_statement(id);
        }
    }

    fn check_statement(&mut self, id: StmtId) {
        let program = self.program;
        let statement = program.statement(id);
        match &statement.kind {
            StatementKind::Let(stmt) => self.check_let(stmt),
            StatementKind::Function(decl) => {
                if let Some(symbol) = self.ensure_registered(id) {
                    self.check_function(symbol, decl, None);
                }
            }
            StatementKind::Struct(decl) => {
                if let Some(record) = self.ensure_registered(id) {
                    self.check_methods(record, &decl.type_parameters, &decl.methods);
                }
            }
            StatementKind::Class(decl) => {
                if let Some(record) = self.ensure_registered(id) {
                    self.check_methods(record, &decl.type_parameters, &decl.methods);
                }
            }
            StatementKind::Enum(_) | StatementKind::Alias(_) => {
                self.ensure_registered(id);
            }
            StatementKind::If(stmt) => self.check_if(stmt),
            StatementKind::While(stmt) => {
                self.check_condition(stmt.condition);
                self.check_block(&stmt.body);
            }
            StatementKind::For(stmt) => {
                self.check_expr(stmt.iterable, None);
                self.scopes.push();
                self.declare_binding(&stmt.binding.name, Type::Unknown, stmt.binding.span);
                self.check_statements(&stmt.body.statements);
                self.scopes.pop();
            }
            StatementKind::Return(stmt) => self.check_return(stmt, statement.span),
            StatementKind::Break | StatementKind::Continue => {}
            StatementKind::Match(stmt) => self.check_match(stmt, statement.span),
            StatementKind::Expression(expression) => {
                self.check_expr(*expression, None);
            }
            StatementKind::Block(block) => self.check_block(block),
        }
    }

    fn check_block(&mut self, block: &Block) {
        self.scopes.push();
        self.check_statements(&block.statements);
        self.scopes.pop();
    }

    fn check_let(&mut self, stmt: &LetStatement) {
        let declared = stmt
            .type_annotation
            .as_ref()
            .map(|annotation| self.resolve_type(annotation));

        let ty = match stmt.initializer {
            Some(initializer) => {
                let actual = self.check_expr(initializer, declared.as_ref());
                match declared {
                    Some(declared) => {
                        if !is_assignable(&actual, &declared) {
                            let span = self.span_of(initializer);
                            self.report(
                                DiagnosticCode::TypeMismatch,
                                mismatch(
                                    &format!("initializer of {}", quoted(&stmt.name.name)),
                                    &declared,
                                    &actual,
                                ),
                                span,
                            );
                        }
                        declared
                    }
                    None => actual,
                }
            }
            None => {
                if stmt.is_const {
                    self.report(
                        DiagnosticCode::ConstWithoutInitializer,
                        format!("const {} must be initialized", quoted(&stmt.name.name)),
                        stmt.name.span,
                    );
                }
                declared.unwrap_or(Type::Unknown)
            }
        };

        let mut symbol = Symbol::new(stmt.name.name.clone(), SymbolKind::Value, stmt.name.span)
            .with_type(ty);
        symbol.is_const = stmt.is_const;
        symbol.is_mutable = !stmt.is_const;
        let symbol_id = self.symbols.alloc(symbol);
        self.declare_value(&stmt.name.name, symbol_id, stmt.name.span);
    }

    /// Declares an immutable local such as a loop variable or pattern binding.
    pub(super) fn declare_binding(&mut self, name: &str, ty: Type, span: SourceSpan) {
        let symbol = Symbol::new(name, SymbolKind::Value, span).with_type(ty);
        let symbol_id = self.symbols.alloc(symbol);
        self.declare_value(name, symbol_id, span);
    }

    fn check_methods(
        &mut self,
        record: SymbolId,
        type_parameters: &[TypeParameter],
        methods: &[StmtId],
    ) {
        let program = self.program;
        self.scopes.push();
        self.declare_type_parameters(type_parameters);
        for &method in methods {
            let StatementKind::Function(decl) = &program.statement(method).kind else {
                continue;
            };
            if let Some(&symbol) = self.declarations.get(&method) {
                self.check_function(symbol, decl, Some(record));
            }
        }
        self.scopes.pop();
    }

    /// Checks a function body in a fresh scope. `receiver` is the owning
    /// struct or class for methods, which get `self` declared first.
    fn check_function(
        &mut self,
        symbol_id: SymbolId,
        decl: &FunctionDecl,
        receiver: Option<SymbolId>,
    ) {
        self.scopes.push();
        self.declare_type_parameters(&decl.type_parameters);

        if let Some(record) = receiver {
            let mut receiver_symbol = Symbol::new("self", SymbolKind::Value, decl.name.span)
                .with_type(self.self_type(record));
            receiver_symbol.is_parameter = true;
            receiver_symbol.is_mutable = self.symbols.get(record).kind == SymbolKind::Class;
            let receiver_id = self.symbols.alloc(receiver_symbol);
            self.declare_value("self", receiver_id, decl.name.span);
        }

        let params = self.symbols.get(symbol_id).params.clone().unwrap_or_default();

        // Defaults are evaluated before any parameter is in scope.
        for param in &decl.parameters {
            let Some(default) = param.default_value else {
                continue;
            };
            let expected = params
                .iter()
                .find(|info| info.name == param.name)
                .map(|info| info.ty.clone())
                .unwrap_or(Type::Unknown);
            let actual = self.check_expr(default, Some(&expected));
            if !is_assignable(&actual, &expected) {
                let span = self.span_of(default);
                self.report(
                    DiagnosticCode::TypeMismatch,
                    mismatch(
                        &format!("default of parameter {}", quoted(&param.name)),
                        &expected,
                        &actual,
                    ),
                    span,
                );
            }
        }

        for info in &params {
            let mut symbol = Symbol::new(info.name.clone(), SymbolKind::Value, info.span)
                .with_type(info.ty.clone());
            symbol.is_parameter = true;
            symbol.is_mutable = info.is_mutable;
            let param_id = self.symbols.alloc(symbol);
            self.declare_value(&info.name, param_id, info.span);
        }

        let declared_return = match (&decl.return_type, &self.symbols.get(symbol_id).ty) {
            (Some(_), Some(Type::Function(function))) => Some((*function.return_type).clone()),
            _ => None,
        };
        self.contexts.push(FunctionContext {
            declared_return,
            returns: Vec::new(),
        });
        self.check_statements(&decl.body.statements);
        let returns = self
            .contexts
            .pop()
            .map(|context| context.returns)
            .unwrap_or_default();
        self.scopes.pop();

        if decl.return_type.is_some() {
            return;
        }
        let inferred = if returns.is_empty() {
            Type::VOID
        } else {
            make_union(returns)
        };
        debug!(function = %decl.name.name, return_type = %inferred, "inferred return type");
        let param_types = params.iter().map(|param| param.ty.clone()).collect();
        let function_type = Type::function(param_types, inferred);
        self.symbols.get_mut(symbol_id).ty = Some(function_type.clone());
        if let Some(record) = receiver {
            let members = &mut self.symbols.get_mut(record).members;
            if let Some(member) = members
                .iter_mut()
                .find(|member| member.method == Some(symbol_id))
            {
                member.ty = function_type;
            }
        }
    }

    fn check_return(&mut self, stmt: &ReturnStatement, span: SourceSpan) {
        let Some(context) = self.contexts.last() else {
            self.report(
                DiagnosticCode::ReturnOutsideFunction,
                "'return' outside of a function",
                span,
            );
            if let Some(value) = stmt.value {
                self.check_expr(value, None);
            }
            return;
        };

        let declared = context.declared_return.clone();
        let (ty, value_span) = match stmt.value {
            Some(value) => (self.check_expr(value, declared.as_ref()), self.span_of(value)),
            None => (Type::VOID, span),
        };
        if let Some(declared) = &declared {
            if !is_assignable(&ty, declared) {
                self.report(
                    DiagnosticCode::TypeMismatch,
                    mismatch("return value", declared, &ty),
                    value_span,
                );
            }
        }
        if let Some(context) = self.contexts.last_mut() {
            context.returns.push(ty);
        }
    }

    fn check_if(&mut self, stmt: &IfStatement) {
        self.check_condition(stmt.condition);
        let narrowing = self.null_narrowing(stmt.condition);

        self.scopes.push();
        if let Some(narrowing) = &narrowing {
            self.scopes
                .set_override(narrowing.name, narrowing.consequent.clone());
        }
        self.check_statements(&stmt.consequent.statements);
        self.scopes.pop();

        if let Some(alternative) = &stmt.alternative {
            self.scopes.push();
            if let Some(narrowing) = &narrowing {
                self.scopes
                    .set_override(narrowing.name, narrowing.alternative.clone());
            }
            self.check_statements(&alternative.statements);
            self.scopes.pop();
        }
    }

    fn check_condition(&mut self, condition: ExprId) {
        let ty = self.check_expr(condition, Some(&Type::BOOL));
        let (accepted, requirement) = match self.options.condition_policy {
            ConditionPolicy::Any => (true, ""),
            ConditionPolicy::Truthy => (ty.is_truthy(), "a truthy type"),
            ConditionPolicy::Bool => (ty.is_absorbing() || ty == Type::BOOL, "bool"),
        };
        if !accepted {
            let span = self.span_of(condition);
            self.report(
                DiagnosticCode::ConditionType,
                format!("condition must be {requirement}, found {ty}"),
                span,
            );
        }
    }

    /// Recognizes `name == null` and `name != null` in either operand order.
    fn null_narrowing(&self, condition: ExprId) -> Option<NullNarrowing<'a>> {
        let program = self.program;
        let mut condition = condition;
        while let ExpressionKind::Grouping(inner) = &program.expression(condition).kind {
            condition = *inner;
        }
        let ExpressionKind::Binary {
            operator,
            left,
            right,
        } = &program.expression(condition).kind
        else {
            return None;
        };
        if !matches!(operator, BinaryOperator::Equal | BinaryOperator::NotEqual) {
            return None;
        }
        let name = match (
            &program.expression(*left).kind,
            &program.expression(*right).kind,
        ) {
            (ExpressionKind::Identifier(name), ExpressionKind::Literal(Literal::Null))
            | (ExpressionKind::Literal(Literal::Null), ExpressionKind::Identifier(name)) => name,
            _ => return None,
        };

        let current = self.scopes.lookup_value_type(name, &self.symbols)?;
        if current.is_absorbing() {
            return None;
        }
        let non_null = remove_null(&current);
        let (consequent, alternative) = if *operator == BinaryOperator::NotEqual {
            (non_null, Type::NULL)
        } else {
            (Type::NULL, non_null)
        };
        Some(NullNarrowing {
            name,
            consequent,
            alternative,
        })
    }
}
