use std::fmt;

use serde::Serialize;

use crate::ast::SourceSpan;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticLevel {
    Error,
    Warning,
}

/// Stable diagnostic codes. Each checker rule maps to exactly one code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticCode {
    UnknownIdentifier,
    DuplicateSymbol,
    UnknownType,
    AliasCycle,
    GenericArity,
    TypeMismatch,
    NotCallable,
    MissingField,
    UnknownMember,
    InvalidCast,
    DuplicateField,
    NotAStruct,
    UnknownNamedArgument,
    DuplicateArgument,
    KeywordSpreadOverlap,
    MutableArgument,
    TooManyPositional,
    InvalidSpread,
    MissingArgument,
    NonStringSpreadKey,
    ArithmeticOperand,
    OrderingOperand,
    LogicalOperand,
    EqualityOperand,
    UnaryOperand,
    IntegerOutOfRange,
    ConstAssignment,
    IsOperand,
    ParameterAssignment,
    InvalidAssignmentTarget,
    ConstWithoutInitializer,
    PatternArity,
    LiteralPattern,
    ForeignVariant,
    NotAVariant,
    ConditionType,
    ReturnOutsideFunction,
    NonExhaustiveMatch,
}

impl DiagnosticCode {
    pub fn as_str(self) -> &'static str {
        match self {
            DiagnosticCode::UnknownIdentifier => "E2001",
            DiagnosticCode::DuplicateSymbol => "E2002",
            DiagnosticCode::UnknownType => "E2003",
            DiagnosticCode::AliasCycle => "E2004",
            DiagnosticCode::GenericArity => "E2005",
            DiagnosticCode::TypeMismatch => "E2101",
            DiagnosticCode::NotCallable => "E2102",
            DiagnosticCode::MissingField => "E2103",
            DiagnosticCode::UnknownMember => "E2104",
            DiagnosticCode::InvalidCast => "E2105",
            DiagnosticCode::DuplicateField => "E2106",
            DiagnosticCode::NotAStruct => "E2107",
            DiagnosticCode::UnknownNamedArgument => "E2201",
            DiagnosticCode::DuplicateArgument => "E2202",
            DiagnosticCode::KeywordSpreadOverlap => "E2203",
            DiagnosticCode::MutableArgument => "E2204",
            DiagnosticCode::TooManyPositional => "E2205",
            DiagnosticCode::InvalidSpread => "E2206",
            DiagnosticCode::MissingArgument => "E2207",
            DiagnosticCode::NonStringSpreadKey => "E2208",
            DiagnosticCode::ArithmeticOperand => "E2301",
            DiagnosticCode::OrderingOperand => "E2302",
            DiagnosticCode::LogicalOperand => "E2303",
            DiagnosticCode::EqualityOperand => "E2304",
            DiagnosticCode::UnaryOperand => "E2305",
            DiagnosticCode::IntegerOutOfRange => "E2401",
            DiagnosticCode::ConstAssignment => "E2501",
            DiagnosticCode::IsOperand => "E2502",
            DiagnosticCode::ParameterAssignment => "E2503",
            DiagnosticCode::InvalidAssignmentTarget => "E2504",
            DiagnosticCode::ConstWithoutInitializer => "E2505",
            DiagnosticCode::PatternArity => "E2601",
            DiagnosticCode::LiteralPattern => "E2602",
            DiagnosticCode::ForeignVariant => "E2603",
            DiagnosticCode::NotAVariant => "E2604",
            DiagnosticCode::ConditionType => "E2701",
            DiagnosticCode::ReturnOutsideFunction => "E2702",
            DiagnosticCode::NonExhaustiveMatch => "W2601",
        }
    }

    pub fn level(self) -> DiagnosticLevel {
        match self {
            DiagnosticCode::NonExhaustiveMatch => DiagnosticLevel::Warning,
            _ => DiagnosticLevel::Error,
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for DiagnosticCode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    pub message: String,
    pub level: DiagnosticLevel,
    pub span: Option<SourceSpan>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.level {
            DiagnosticLevel::Error => "error",
            DiagnosticLevel::Warning => "warning",
        };
        match self.span {
            Some(span) => write!(
                f,
                "{}:{}: {level}[{}]: {}",
                span.line, span.column, self.code, self.message
            ),
            None => write!(f, "{level}[{}]: {}", self.code, self.message),
        }
    }
}

/// Accumulates diagnostics in emission order.
#[derive(Debug, Default, Serialize)]
#[serde(transparent)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn push<S: Into<String>>(
        &mut self,
        code: DiagnosticCode,
        message: S,
        span: Option<SourceSpan>,
    ) {
        self.entries.push(Diagnostic {
            code,
            message: message.into(),
            level: code.level(),
            span,
        });
    }

    /// Moves the entries pushed since `split` ahead of those pushed between
    /// `start` and `split`.
    pub(crate) fn hoist_since(&mut self, start: usize, split: usize) {
        if start <= split && split <= self.entries.len() {
            self.entries[start..].rotate_left(split - start);
        }
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.entries.extend(other.entries);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.entries
            .iter()
            .any(|diagnostic| diagnostic.level == DiagnosticLevel::Error)
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn codes(&self) -> Vec<&'static str> {
        self.entries
            .iter()
            .map(|diagnostic| diagnostic.code.as_str())
            .collect()
    }

    pub fn count(&self, code: DiagnosticCode) -> usize {
        self.entries
            .iter()
            .filter(|diagnostic| diagnostic.code == code)
            .count()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
