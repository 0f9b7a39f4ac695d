//! Arena allocation helpers for constructing a [`Program`].
//!
//! The parser collaborator allocates through [`ProgramBuilder::expr_at`] and
//! [`ProgramBuilder::stmt_at`] with real spans. The shorthand constructors
//! synthesise a distinct span per node (one line each), which is what the
//! integration tests rely on.

use super::{
    AliasDecl, Argument, ArgumentKind, BinaryOperator, Block, ClassDecl, EnumDecl, ExprId,
    Expression, ExpressionKind, FieldDecl, FieldInit, ForStatement, FunctionDecl, Identifier,
    IfStatement, LetStatement, Literal, MapEntry, MatchArm, MatchStatement, Parameter,
    ParameterKind, Pattern, PatternKind, Program, ReturnStatement, SourceSpan, Statement,
    StatementKind, StmtId, StructDecl, TypeExpression, TypeExpressionKind, TypeParameter,
    UnaryOperator, VariantDecl, WhileStatement,
};

#[derive(Debug, Default)]
pub struct ProgramBuilder {
    program: Program,
    next_line: usize,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn finish(self) -> Program {
        self.program
    }

    fn next_span(&mut self) -> SourceSpan {
        self.next_line += 1;
        let start = self.next_line * 100;
        SourceSpan::new(self.next_line, 1, self.next_line, 80, start, start + 80)
    }

    pub fn span_of(&self, id: ExprId) -> SourceSpan {
        self.program.expression(id).span
    }

    pub fn statement_span(&self, id: StmtId) -> SourceSpan {
        self.program.statement(id).span
    }

    pub fn expr_at(&mut self, kind: ExpressionKind, span: SourceSpan) -> ExprId {
        let id = ExprId(self.program.expressions.len() as u32);
        self.program.expressions.push(Expression { span, kind });
        id
    }

    pub fn stmt_at(&mut self, kind: StatementKind, span: SourceSpan) -> StmtId {
        let id = StmtId(self.program.statements.len() as u32);
        self.program.statements.push(Statement { span, kind });
        id
    }

    pub fn expr(&mut self, kind: ExpressionKind) -> ExprId {
        let span = self.next_span();
        self.expr_at(kind, span)
    }

    pub fn stmt(&mut self, kind: StatementKind) -> StmtId {
        let span = self.next_span();
        self.stmt_at(kind, span)
    }

    /// Appends an already allocated statement to the top level.
    pub fn push_item(&mut self, id: StmtId) -> StmtId {
        self.program.items.push(id);
        id
    }

    pub fn item(&mut self, kind: StatementKind) -> StmtId {
        let id = self.stmt(kind);
        self.push_item(id)
    }

    pub fn identifier(&mut self, name: &str) -> Identifier {
        let span = self.next_span();
        Identifier::new(name, span)
    }

    // Expressions

    pub fn ident(&mut self, name: &str) -> ExprId {
        self.expr(ExpressionKind::Identifier(name.to_string()))
    }

    pub fn int(&mut self, digits: &str) -> ExprId {
        self.expr(ExpressionKind::Literal(Literal::Integer(digits.to_string())))
    }

    pub fn float(&mut self, value: f64) -> ExprId {
        self.expr(ExpressionKind::Literal(Literal::Float(value)))
    }

    pub fn string(&mut self, value: &str) -> ExprId {
        self.expr(ExpressionKind::Literal(Literal::String(value.to_string())))
    }

    pub fn boolean(&mut self, value: bool) -> ExprId {
        self.expr(ExpressionKind::Literal(Literal::Bool(value)))
    }

    pub fn null(&mut self) -> ExprId {
        self.expr(ExpressionKind::Literal(Literal::Null))
    }

    pub fn placeholder(&mut self) -> ExprId {
        self.expr(ExpressionKind::Placeholder)
    }

    pub fn unary(&mut self, operator: UnaryOperator, operand: ExprId) -> ExprId {
        self.expr(ExpressionKind::Unary { operator, operand })
    }

    pub fn binary(&mut self, operator: BinaryOperator, left: ExprId, right: ExprId) -> ExprId {
        self.expr(ExpressionKind::Binary {
            operator,
            left,
            right,
        })
    }

    pub fn assign(&mut self, target: ExprId, value: ExprId) -> ExprId {
        self.expr(ExpressionKind::Assignment {
            operator: None,
            target,
            value,
        })
    }

    pub fn compound_assign(
        &mut self,
        operator: BinaryOperator,
        target: ExprId,
        value: ExprId,
    ) -> ExprId {
        self.expr(ExpressionKind::Assignment {
            operator: Some(operator),
            target,
            value,
        })
    }

    pub fn call(&mut self, callee: ExprId, arguments: Vec<Argument>) -> ExprId {
        self.expr(ExpressionKind::Call { callee, arguments })
    }

    /// `name(arguments...)`
    pub fn call_named(&mut self, name: &str, arguments: Vec<Argument>) -> ExprId {
        let callee = self.ident(name);
        self.call(callee, arguments)
    }

    pub fn member(&mut self, object: ExprId, property: &str) -> ExprId {
        let property = self.identifier(property);
        self.expr(ExpressionKind::Member { object, property })
    }

    pub fn index(&mut self, object: ExprId, index: ExprId) -> ExprId {
        self.expr(ExpressionKind::Index { object, index })
    }

    pub fn struct_literal(&mut self, name: &str, fields: Vec<(&str, ExprId)>) -> ExprId {
        let name = self.identifier(name);
        let fields = fields
            .into_iter()
            .map(|(field, value)| FieldInit {
                name: self.identifier(field),
                value,
            })
            .collect();
        self.expr(ExpressionKind::StructLiteral { name, fields })
    }

    pub fn array(&mut self, elements: Vec<ExprId>) -> ExprId {
        self.expr(ExpressionKind::ArrayLiteral(elements))
    }

    pub fn map(&mut self, entries: Vec<(ExprId, ExprId)>) -> ExprId {
        let entries = entries
            .into_iter()
            .map(|(key, value)| MapEntry { key, value })
            .collect();
        self.expr(ExpressionKind::MapLiteral(entries))
    }

    pub fn tuple(&mut self, elements: Vec<ExprId>) -> ExprId {
        self.expr(ExpressionKind::TupleLiteral(elements))
    }

    pub fn cast(&mut self, value: ExprId, target: TypeExpression) -> ExprId {
        self.expr(ExpressionKind::Cast { value, target })
    }

    pub fn grouping(&mut self, inner: ExprId) -> ExprId {
        self.expr(ExpressionKind::Grouping(inner))
    }

    // Arguments

    pub fn positional(&self, value: ExprId) -> Argument {
        Argument {
            span: self.span_of(value),
            kind: ArgumentKind::Positional,
            value,
        }
    }

    pub fn named(&mut self, name: &str, value: ExprId) -> Argument {
        let name = self.identifier(name);
        Argument {
            span: SourceSpan::union(&name.span, &self.span_of(value)),
            kind: ArgumentKind::Named(name),
            value,
        }
    }

    pub fn spread(&self, value: ExprId) -> Argument {
        Argument {
            span: self.span_of(value),
            kind: ArgumentKind::Spread,
            value,
        }
    }

    pub fn keyword_spread(&self, value: ExprId) -> Argument {
        Argument {
            span: self.span_of(value),
            kind: ArgumentKind::KeywordSpread,
            value,
        }
    }

    // Statements

    pub fn block(&mut self, statements: Vec<StmtId>) -> Block {
        let span = self.next_span();
        Block { statements, span }
    }

    pub fn let_(
        &mut self,
        name: &str,
        type_annotation: Option<TypeExpression>,
        initializer: Option<ExprId>,
    ) -> StmtId {
        let name = self.identifier(name);
        self.stmt(StatementKind::Let(LetStatement {
            is_const: false,
            name,
            type_annotation,
            initializer,
        }))
    }

    pub fn const_(
        &mut self,
        name: &str,
        type_annotation: Option<TypeExpression>,
        initializer: Option<ExprId>,
    ) -> StmtId {
        let name = self.identifier(name);
        self.stmt(StatementKind::Let(LetStatement {
            is_const: true,
            name,
            type_annotation,
            initializer,
        }))
    }

    pub fn expr_stmt(&mut self, expression: ExprId) -> StmtId {
        let span = self.span_of(expression);
        self.stmt_at(StatementKind::Expression(expression), span)
    }

    pub fn ret(&mut self, value: Option<ExprId>) -> StmtId {
        self.stmt(StatementKind::Return(ReturnStatement { value }))
    }

    pub fn if_(
        &mut self,
        condition: ExprId,
        consequent: Block,
        alternative: Option<Block>,
    ) -> StmtId {
        self.stmt(StatementKind::If(IfStatement {
            condition,
            consequent,
            alternative,
        }))
    }

    pub fn while_(&mut self, condition: ExprId, body: Block) -> StmtId {
        self.stmt(StatementKind::While(WhileStatement { condition, body }))
    }

    pub fn for_(&mut self, binding: &str, iterable: ExprId, body: Block) -> StmtId {
        let binding = self.identifier(binding);
        self.stmt(StatementKind::For(ForStatement {
            binding,
            iterable,
            body,
        }))
    }

    pub fn match_(&mut self, subject: ExprId, arms: Vec<MatchArm>) -> StmtId {
        self.stmt(StatementKind::Match(MatchStatement { subject, arms }))
    }

    pub fn arm(&mut self, pattern: Pattern, body: Vec<StmtId>) -> MatchArm {
        let body = self.block(body);
        MatchArm { pattern, body }
    }

    pub fn function(
        &mut self,
        name: &str,
        type_parameters: &[&str],
        parameters: Vec<Parameter>,
        return_type: Option<TypeExpression>,
        body: Vec<StmtId>,
    ) -> StmtId {
        let decl = self.function_decl(name, type_parameters, parameters, return_type, body);
        self.stmt(StatementKind::Function(decl))
    }

    pub fn function_decl(
        &mut self,
        name: &str,
        type_parameters: &[&str],
        parameters: Vec<Parameter>,
        return_type: Option<TypeExpression>,
        body: Vec<StmtId>,
    ) -> FunctionDecl {
        let name = self.identifier(name);
        let type_parameters = self.type_parameters(type_parameters);
        let body = self.block(body);
        FunctionDecl {
            is_public: false,
            name,
            type_parameters,
            parameters,
            return_type,
            body,
        }
    }

    pub fn struct_(
        &mut self,
        name: &str,
        type_parameters: &[&str],
        fields: Vec<(&str, TypeExpression)>,
        methods: Vec<StmtId>,
    ) -> StmtId {
        let name = self.identifier(name);
        let type_parameters = self.type_parameters(type_parameters);
        let fields = self.fields(fields);
        self.stmt(StatementKind::Struct(StructDecl {
            is_public: false,
            name,
            type_parameters,
            fields,
            methods,
        }))
    }

    pub fn class(
        &mut self,
        name: &str,
        type_parameters: &[&str],
        fields: Vec<(&str, TypeExpression)>,
        methods: Vec<StmtId>,
    ) -> StmtId {
        let name = self.identifier(name);
        let type_parameters = self.type_parameters(type_parameters);
        let fields = self.fields(fields);
        self.stmt(StatementKind::Class(ClassDecl {
            is_public: false,
            name,
            type_parameters,
            fields,
            methods,
        }))
    }

    pub fn enum_(
        &mut self,
        name: &str,
        type_parameters: &[&str],
        variants: Vec<(&str, Vec<TypeExpression>)>,
    ) -> StmtId {
        let name = self.identifier(name);
        let type_parameters = self.type_parameters(type_parameters);
        let variants = variants
            .into_iter()
            .map(|(variant, payload)| VariantDecl {
                name: variant.to_string(),
                span: self.next_span(),
                payload,
            })
            .collect();
        self.stmt(StatementKind::Enum(EnumDecl {
            is_public: false,
            name,
            type_parameters,
            variants,
        }))
    }

    pub fn alias(&mut self, name: &str, target: TypeExpression) -> StmtId {
        let name = self.identifier(name);
        self.stmt(StatementKind::Alias(AliasDecl {
            is_public: false,
            name,
            target,
        }))
    }

    fn type_parameters(&mut self, names: &[&str]) -> Vec<TypeParameter> {
        names
            .iter()
            .map(|name| TypeParameter {
                name: name.to_string(),
                span: self.next_span(),
            })
            .collect()
    }

    fn fields(&mut self, fields: Vec<(&str, TypeExpression)>) -> Vec<FieldDecl> {
        fields
            .into_iter()
            .map(|(name, type_annotation)| FieldDecl {
                name: name.to_string(),
                span: self.next_span(),
                type_annotation,
            })
            .collect()
    }
}

// Type syntax

pub fn ty(name: &str) -> TypeExpression {
    generic_ty(name, Vec::new())
}

pub fn generic_ty(name: &str, arguments: Vec<TypeExpression>) -> TypeExpression {
    TypeExpression {
        span: SourceSpan::default(),
        kind: TypeExpressionKind::Named {
            name: name.to_string(),
            arguments,
        },
    }
}

pub fn union_ty(members: Vec<TypeExpression>) -> TypeExpression {
    TypeExpression {
        span: SourceSpan::default(),
        kind: TypeExpressionKind::Union(members),
    }
}

pub fn tuple_ty(elements: Vec<TypeExpression>) -> TypeExpression {
    TypeExpression {
        span: SourceSpan::default(),
        kind: TypeExpressionKind::Tuple(elements),
    }
}

pub fn function_ty(parameters: Vec<TypeExpression>, return_type: TypeExpression) -> TypeExpression {
    TypeExpression {
        span: SourceSpan::default(),
        kind: TypeExpressionKind::Function {
            parameters,
            return_type: Box::new(return_type),
        },
    }
}

// Parameters

pub fn param(name: &str, type_annotation: Option<TypeExpression>) -> Parameter {
    Parameter {
        name: name.to_string(),
        span: SourceSpan::default(),
        kind: ParameterKind::Ordinary,
        is_mutable: false,
        type_annotation,
        default_value: None,
    }
}

/// A bare `*` separator.
pub fn separator() -> Parameter {
    Parameter {
        kind: ParameterKind::Separator,
        ..param("*", None)
    }
}

impl Parameter {
    pub fn mutable(mut self) -> Self {
        self.is_mutable = true;
        self
    }

    pub fn variadic(mut self) -> Self {
        self.kind = ParameterKind::Variadic;
        self
    }

    pub fn kw_variadic(mut self) -> Self {
        self.kind = ParameterKind::KwVariadic;
        self
    }

    pub fn with_default(mut self, value: ExprId) -> Self {
        self.default_value = Some(value);
        self
    }
}

// Patterns

pub fn wildcard() -> Pattern {
    Pattern {
        span: SourceSpan::default(),
        kind: PatternKind::Wildcard,
    }
}

pub fn binding_pattern(name: &str) -> Pattern {
    Pattern {
        span: SourceSpan::default(),
        kind: PatternKind::Identifier(name.to_string()),
    }
}

pub fn literal_pattern(literal: Literal) -> Pattern {
    Pattern {
        span: SourceSpan::default(),
        kind: PatternKind::Literal(literal),
    }
}

pub fn variant_pattern(name: &str, bindings: &[&str]) -> Pattern {
    Pattern {
        span: SourceSpan::default(),
        kind: PatternKind::Variant {
            name: Identifier::new(name, SourceSpan::default()),
            bindings: bindings
                .iter()
                .map(|binding| Identifier::new(*binding, SourceSpan::default()))
                .collect(),
        },
    }
}
