mod diagnostics;
mod options;
mod scope;
mod typechecker;
mod types;

pub use crate::diagnostics::{Diagnostic, DiagnosticCode, DiagnosticLevel, Diagnostics};
pub use crate::options::{CheckOptions, ConditionPolicy, OptionsError};
pub use crate::scope::{
    MemberInfo, ParamInfo, Redeclaration, ScopeId, ScopeStack, Symbol, SymbolId, SymbolKind,
    SymbolTable,
};
pub use crate::typechecker::{check_program, CheckResult, TypeChecker, TypeTable};
pub use crate::types::{
    is_assignable, make_union, remove_null, type_argument_mapping, FunctionType, NamedType,
    Primitive, Type, ARRAY_TYPE, MAP_TYPE,
};

pub mod ast;
