use std::collections::HashMap;

use serde::Serialize;

use crate::ast::{SourceSpan, StmtId, TypeExpression};
use crate::types::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SymbolId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Value,
    Function,
    Struct,
    Enum,
    Class,
    Alias,
    Variant,
    TypeParam,
}

impl SymbolKind {
    pub fn describe(self) -> &'static str {
        match self {
            SymbolKind::Value => "value",
            SymbolKind::Function => "function",
            SymbolKind::Struct => "struct",
            SymbolKind::Enum => "enum",
            SymbolKind::Class => "class",
            SymbolKind::Alias => "type alias",
            SymbolKind::Variant => "enum variant",
            SymbolKind::TypeParam => "type parameter",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ParamInfo {
    pub name: String,
    pub ty: Type,
    pub is_named_only: bool,
    pub has_default: bool,
    pub is_variadic: bool,
    pub is_kw_variadic: bool,
    pub is_mutable: bool,
    pub span: SourceSpan,
}

impl ParamInfo {
    pub fn is_ordinary(&self) -> bool {
        !self.is_variadic && !self.is_kw_variadic
    }
}

/// A field or method of a struct or class.
#[derive(Debug, Clone)]
pub struct MemberInfo {
    pub name: String,
    pub ty: Type,
    /// Set for methods so calls can bind against their parameter list.
    pub method: Option<SymbolId>,
    pub span: SourceSpan,
}

#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub node: Option<StmtId>,
    pub span: SourceSpan,
    /// Filled once, possibly lazily (alias expansion, inferred return types).
    pub ty: Option<Type>,
    pub params: Option<Vec<ParamInfo>>,
    pub is_mutable: bool,
    pub is_const: bool,
    pub is_public: bool,
    pub is_parameter: bool,
    pub type_parameters: Vec<String>,
    pub members: Vec<MemberInfo>,
    /// For variants: the owning enum.
    pub owner: Option<SymbolId>,
    pub payload: Vec<Type>,
    /// For enums: variants in declaration order.
    pub variants: Vec<SymbolId>,
    pub alias_target: Option<TypeExpression>,
}

impl Symbol {
    pub fn new(name: impl Into<String>, kind: SymbolKind, span: SourceSpan) -> Self {
        Self {
            name: name.into(),
            kind,
            node: None,
            span,
            ty: None,
            params: None,
            is_mutable: false,
            is_const: false,
            is_public: false,
            is_parameter: false,
            type_parameters: Vec::new(),
            members: Vec::new(),
            owner: None,
            payload: Vec::new(),
            variants: Vec::new(),
            alias_target: None,
        }
    }

    pub fn with_type(mut self, ty: Type) -> Self {
        self.ty = Some(ty);
        self
    }

    pub fn member(&self, name: &str) -> Option<&MemberInfo> {
        self.members.iter().find(|member| member.name == name)
    }

    pub fn is_record(&self) -> bool {
        matches!(self.kind, SymbolKind::Struct | SymbolKind::Class)
    }
}

#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, symbol: Symbol) -> SymbolId {
        let id = SymbolId(self.symbols.len() as u32);
        self.symbols.push(symbol);
        id
    }

    pub fn get(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.0 as usize]
    }

    pub fn get_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeId(pub u32);

#[derive(Debug, Default)]
pub struct Scope {
    pub parent: Option<ScopeId>,
    values: HashMap<String, SymbolId>,
    types: HashMap<String, SymbolId>,
    overrides: HashMap<String, Type>,
}

/// Returned by a declaration that collided with an existing binding in the
/// same scope. The first binding is kept.
#[derive(Debug, Clone, Copy)]
pub struct Redeclaration {
    pub existing: SymbolId,
}

/// Scopes in strict LIFO order: the innermost scope is the last element and
/// each scope's parent is the one below it.
#[derive(Debug)]
pub struct ScopeStack {
    scopes: Vec<Scope>,
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeStack {
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::default()],
        }
    }

    pub fn current(&self) -> ScopeId {
        ScopeId((self.scopes.len() - 1) as u32)
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn push(&mut self) -> ScopeId {
        let parent = self.current();
        self.scopes.push(Scope {
            parent: Some(parent),
            ..Scope::default()
        });
        self.current()
    }

    /// Discards the innermost scope. The root scope is never popped.
    pub fn pop(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    fn innermost(&mut self) -> &mut Scope {
        let index = self.scopes.len() - 1;
        &mut self.scopes[index]
    }

    fn walk(&self) -> impl Iterator<Item = &Scope> {
        let mut next = Some(self.current());
        std::iter::from_fn(move || {
            let id = next?;
            let scope = &self.scopes[id.0 as usize];
            next = scope.parent;
            Some(scope)
        })
    }

    /// A successful declaration also ends any narrowing of `name` in the
    /// innermost scope, so the new binding is what later lookups see.
    pub fn declare_value(&mut self, name: &str, symbol: SymbolId) -> Result<(), Redeclaration> {
        let scope = self.innermost();
        declare(&mut scope.values, name, symbol)?;
        scope.overrides.remove(name);
        Ok(())
    }

    pub fn declare_type(&mut self, name: &str, symbol: SymbolId) -> Result<(), Redeclaration> {
        declare(&mut self.innermost().types, name, symbol)
    }

    pub fn lookup_value(&self, name: &str) -> Option<SymbolId> {
        self.walk().find_map(|scope| scope.values.get(name).copied())
    }

    pub fn lookup_type_symbol(&self, name: &str) -> Option<SymbolId> {
        self.walk().find_map(|scope| scope.types.get(name).copied())
    }

    /// The tracked type of a value: at each level an override (narrowing)
    /// wins over a declaration, so the innermost of either is returned.
    pub fn lookup_value_type(&self, name: &str, symbols: &SymbolTable) -> Option<Type> {
        for scope in self.walk() {
            if let Some(narrowed) = scope.overrides.get(name) {
                return Some(narrowed.clone());
            }
            if let Some(symbol) = scope.values.get(name) {
                return Some(symbols.get(*symbol).ty.clone().unwrap_or(Type::Unknown));
            }
        }
        None
    }

    pub fn set_override(&mut self, name: &str, ty: Type) {
        self.innermost().overrides.insert(name.to_string(), ty);
    }

    /// Drops every override of `name` between the innermost scope and the
    /// scope that declares it, so the declared type shows through.
    pub fn clear_narrowing(&mut self, name: &str) {
        for scope in self.scopes.iter_mut().rev() {
            scope.overrides.remove(name);
            if scope.values.contains_key(name) {
                break;
            }
        }
    }

    pub fn is_narrowed(&self, name: &str) -> bool {
        for scope in self.walk() {
            if scope.overrides.contains_key(name) {
                return true;
            }
            if scope.values.contains_key(name) {
                return false;
            }
        }
        false
    }
}

fn declare(
    map: &mut HashMap<String, SymbolId>,
    name: &str,
    symbol: SymbolId,
) -> Result<(), Redeclaration> {
    if let Some(existing) = map.get(name) {
        return Err(Redeclaration {
            existing: *existing,
        });
    }
    map.insert(name.to_string(), symbol);
    Ok(())
}
