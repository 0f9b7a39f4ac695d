pub mod builder;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SourceSpan {
    pub line: usize,
    pub column: usize,
    pub end_line: usize,
    pub end_column: usize,
    pub start: usize,
    pub end: usize,
}

impl SourceSpan {
    pub const fn new(
        line: usize,
        column: usize,
        end_line: usize,
        end_column: usize,
        start: usize,
        end: usize,
    ) -> Self {
        Self {
            line,
            column,
            end_line,
            end_column,
            start,
            end,
        }
    }

    pub fn single_point(line: usize, column: usize, offset: usize) -> Self {
        Self::new(line, column, line, column, offset, offset)
    }

    pub fn union(a: &Self, b: &Self) -> Self {
        if a.line == 0 {
            return *b;
        }
        if b.line == 0 {
            return *a;
        }

        let (line, column, start) = if a.start <= b.start {
            (a.line, a.column, a.start)
        } else {
            (b.line, b.column, b.start)
        };
        let (end_line, end_column, end) = if a.end >= b.end {
            (a.end_line, a.end_column, a.end)
        } else {
            (b.end_line, b.end_column, b.end)
        };

        Self::new(line, column, end_line, end_column, start, end)
    }
}

impl Default for SourceSpan {
    fn default() -> Self {
        Self::new(0, 0, 0, 0, 0, 0)
    }
}

/// Index of an expression node inside [`Program::expressions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ExprId(pub u32);

/// Index of a statement node inside [`Program::statements`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct StmtId(pub u32);

impl ExprId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl StmtId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A parsed file. Nodes live in two arenas and refer to each other by index;
/// `items` holds the top-level statements in source order.
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub expressions: Vec<Expression>,
    pub statements: Vec<Statement>,
    pub items: Vec<StmtId>,
}

/// Stands in for an id that points past the arena; checks as a parse error.
static DANGLING_EXPRESSION: Expression = Expression {
    span: SourceSpan::new(0, 0, 0, 0, 0, 0),
    kind: ExpressionKind::Placeholder,
};

static DANGLING_STATEMENT: Statement = Statement {
    span: SourceSpan::new(0, 0, 0, 0, 0, 0),
    kind: StatementKind::Block(Block {
        statements: Vec::new(),
        span: SourceSpan::new(0, 0, 0, 0, 0, 0),
    }),
};

impl Program {
    pub fn expression(&self, id: ExprId) -> &Expression {
        self.expressions
            .get(id.index())
            .unwrap_or(&DANGLING_EXPRESSION)
    }

    /// An out-of-range id reads as an empty block.
    pub fn statement(&self, id: StmtId) -> &Statement {
        self.statements
            .get(id.index())
            .unwrap_or(&DANGLING_STATEMENT)
    }

    pub fn expression_count(&self) -> usize {
        self.expressions.len()
    }
}

#[derive(Debug, Clone)]
pub struct Statement {
    pub span: SourceSpan,
    pub kind: StatementKind,
}

#[derive(Debug, Clone)]
pub enum StatementKind {
    Let(LetStatement),
    Function(FunctionDecl),
    Struct(StructDecl),
    Enum(EnumDecl),
    Class(ClassDecl),
    Alias(AliasDecl),
    If(IfStatement),
    While(WhileStatement),
    For(ForStatement),
    Return(ReturnStatement),
    Break,
    Continue,
    Match(MatchStatement),
    Expression(ExprId),
    Block(Block),
}

#[derive(Debug, Clone, Default)]
pub struct Block {
    pub statements: Vec<StmtId>,
    pub span: SourceSpan,
}

#[derive(Debug, Clone)]
pub struct Identifier {
    pub name: String,
    pub span: SourceSpan,
}

impl Identifier {
    pub fn new(name: impl Into<String>, span: SourceSpan) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LetStatement {
    pub is_const: bool,
    pub name: Identifier,
    pub type_annotation: Option<TypeExpression>,
    pub initializer: Option<ExprId>,
}

#[derive(Debug, Clone)]
pub struct TypeParameter {
    pub name: String,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterKind {
    Ordinary,
    /// `*rest`
    Variadic,
    /// `**rest`
    KwVariadic,
    /// A bare `*` or `**`; every later ordinary parameter is named-only.
    Separator,
}

#[derive(Debug, Clone)]
pub struct Parameter {
    pub name: String,
    pub span: SourceSpan,
    pub kind: ParameterKind,
    pub is_mutable: bool,
    pub type_annotation: Option<TypeExpression>,
    pub default_value: Option<ExprId>,
}

#[derive(Debug, Clone)]
pub struct FunctionDecl {
    pub is_public: bool,
    pub name: Identifier,
    pub type_parameters: Vec<TypeParameter>,
    pub parameters: Vec<Parameter>,
    pub return_type: Option<TypeExpression>,
    pub body: Block,
}

#[derive(Debug, Clone)]
pub struct FieldDecl {
    pub name: String,
    pub span: SourceSpan,
    pub type_annotation: TypeExpression,
}

#[derive(Debug, Clone)]
pub struct StructDecl {
    pub is_public: bool,
    pub name: Identifier,
    pub type_parameters: Vec<TypeParameter>,
    pub fields: Vec<FieldDecl>,
    pub methods: Vec<StmtId>,
}

#[derive(Debug, Clone)]
pub struct ClassDecl {
    pub is_public: bool,
    pub name: Identifier,
    pub type_parameters: Vec<TypeParameter>,
    pub fields: Vec<FieldDecl>,
    pub methods: Vec<StmtId>,
}

#[derive(Debug, Clone)]
pub struct VariantDecl {
    pub name: String,
    pub span: SourceSpan,
    pub payload: Vec<TypeExpression>,
}

#[derive(Debug, Clone)]
pub struct EnumDecl {
    pub is_public: bool,
    pub name: Identifier,
    pub type_parameters: Vec<TypeParameter>,
    pub variants: Vec<VariantDecl>,
}

#[derive(Debug, Clone)]
pub struct AliasDecl {
    pub is_public: bool,
    pub name: Identifier,
    pub target: TypeExpression,
}

#[derive(Debug, Clone)]
pub struct IfStatement {
    pub condition: ExprId,
    pub consequent: Block,
    pub alternative: Option<Block>,
}

#[derive(Debug, Clone)]
pub struct WhileStatement {
    pub condition: ExprId,
    pub body: Block,
}

#[derive(Debug, Clone)]
pub struct ForStatement {
    pub binding: Identifier,
    pub iterable: ExprId,
    pub body: Block,
}

#[derive(Debug, Clone)]
pub struct ReturnStatement {
    pub value: Option<ExprId>,
}

#[derive(Debug, Clone)]
pub struct MatchStatement {
    pub subject: ExprId,
    pub arms: Vec<MatchArm>,
}

#[derive(Debug, Clone)]
pub struct MatchArm {
    pub pattern: Pattern,
    pub body: Block,
}

#[derive(Debug, Clone)]
pub struct Pattern {
    pub span: SourceSpan,
    pub kind: PatternKind,
}

#[derive(Debug, Clone)]
pub enum PatternKind {
    Wildcard,
    Identifier(String),
    Literal(Literal),
    Variant {
        name: Identifier,
        bindings: Vec<Identifier>,
    },
}

#[derive(Debug, Clone)]
pub struct TypeExpression {
    pub span: SourceSpan,
    pub kind: TypeExpressionKind,
}

#[derive(Debug, Clone)]
pub enum TypeExpressionKind {
    Named {
        name: String,
        arguments: Vec<TypeExpression>,
    },
    Union(Vec<TypeExpression>),
    Tuple(Vec<TypeExpression>),
    Function {
        parameters: Vec<TypeExpression>,
        return_type: Box<TypeExpression>,
    },
    /// Left behind by parser recovery.
    Placeholder,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Digits as lexed: decimal, or `0x`/`0o`/`0b` prefixed, `_` separators allowed.
    Integer(String),
    Float(f64),
    String(String),
    Bool(bool),
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Positive,
    Negative,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    BitOr,
    Equal,
    NotEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    And,
    Or,
    Is,
}

impl BinaryOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
            BinaryOperator::BitOr => "|",
            BinaryOperator::Equal => "==",
            BinaryOperator::NotEqual => "!=",
            BinaryOperator::Greater => ">",
            BinaryOperator::GreaterEqual => ">=",
            BinaryOperator::Less => "<",
            BinaryOperator::LessEqual => "<=",
            BinaryOperator::And => "&&",
            BinaryOperator::Or => "||",
            BinaryOperator::Is => "is",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Expression {
    pub span: SourceSpan,
    pub kind: ExpressionKind,
}

#[derive(Debug, Clone)]
pub enum ExpressionKind {
    Identifier(String),
    Literal(Literal),
    Unary {
        operator: UnaryOperator,
        operand: ExprId,
    },
    Binary {
        operator: BinaryOperator,
        left: ExprId,
        right: ExprId,
    },
    Assignment {
        /// `Some` for compound assignment such as `+=`.
        operator: Option<BinaryOperator>,
        target: ExprId,
        value: ExprId,
    },
    Call {
        callee: ExprId,
        arguments: Vec<Argument>,
    },
    Member {
        object: ExprId,
        property: Identifier,
    },
    Index {
        object: ExprId,
        index: ExprId,
    },
    StructLiteral {
        name: Identifier,
        fields: Vec<FieldInit>,
    },
    ArrayLiteral(Vec<ExprId>),
    MapLiteral(Vec<MapEntry>),
    TupleLiteral(Vec<ExprId>),
    Cast {
        value: ExprId,
        target: TypeExpression,
    },
    Grouping(ExprId),
    /// Left behind by parser recovery.
    Placeholder,
}

#[derive(Debug, Clone)]
pub struct FieldInit {
    pub name: Identifier,
    pub value: ExprId,
}

#[derive(Debug, Clone)]
pub struct MapEntry {
    pub key: ExprId,
    pub value: ExprId,
}

#[derive(Debug, Clone)]
pub enum ArgumentKind {
    Positional,
    Named(Identifier),
    /// `*expr`
    Spread,
    /// `**expr`
    KeywordSpread,
}

#[derive(Debug, Clone)]
pub struct Argument {
    pub span: SourceSpan,
    pub kind: ArgumentKind,
    pub value: ExprId,
}
