use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::scope::SymbolId;

pub const ARRAY_TYPE: &str = "Array";
pub const MAP_TYPE: &str = "Map";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Primitive {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Bool,
    String,
    Null,
    Void,
}

impl Primitive {
    pub const ALL: [Primitive; 14] = [
        Primitive::I8,
        Primitive::I16,
        Primitive::I32,
        Primitive::I64,
        Primitive::U8,
        Primitive::U16,
        Primitive::U32,
        Primitive::U64,
        Primitive::F32,
        Primitive::F64,
        Primitive::Bool,
        Primitive::String,
        Primitive::Null,
        Primitive::Void,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|primitive| primitive.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            Primitive::I8 => "i8",
            Primitive::I16 => "i16",
            Primitive::I32 => "i32",
            Primitive::I64 => "i64",
            Primitive::U8 => "u8",
            Primitive::U16 => "u16",
            Primitive::U32 => "u32",
            Primitive::U64 => "u64",
            Primitive::F32 => "f32",
            Primitive::F64 => "f64",
            Primitive::Bool => "bool",
            Primitive::String => "string",
            Primitive::Null => "null",
            Primitive::Void => "void",
        }
    }

    pub fn is_integer(self) -> bool {
        self.integer_layout().is_some()
    }

    pub fn is_float(self) -> bool {
        matches!(self, Primitive::F32 | Primitive::F64)
    }

    pub fn is_numeric(self) -> bool {
        self.is_integer() || self.is_float()
    }

    /// `(signed, bits)` for the integer family.
    pub fn integer_layout(self) -> Option<(bool, u32)> {
        match self {
            Primitive::I8 => Some((true, 8)),
            Primitive::I16 => Some((true, 16)),
            Primitive::I32 => Some((true, 32)),
            Primitive::I64 => Some((true, 64)),
            Primitive::U8 => Some((false, 8)),
            Primitive::U16 => Some((false, 16)),
            Primitive::U32 => Some((false, 32)),
            Primitive::U64 => Some((false, 64)),
            _ => None,
        }
    }

    /// Whether an integer of the given magnitude and sign fits this width.
    /// Always false for non-integer primitives.
    pub fn fits_integer(self, magnitude: u128, negative: bool) -> bool {
        let Some((signed, bits)) = self.integer_layout() else {
            return false;
        };
        if signed {
            let limit = 1u128 << (bits - 1);
            if negative {
                magnitude <= limit
            } else {
                magnitude < limit
            }
        } else if negative {
            magnitude == 0
        } else {
            magnitude <= (1u128 << bits) - 1
        }
    }

    /// Printable `[min, max]` bounds for range diagnostics.
    pub fn integer_bounds(self) -> Option<(i128, u128)> {
        let (signed, bits) = self.integer_layout()?;
        if signed {
            let limit = 1i128 << (bits - 1);
            Some((-limit, (limit - 1) as u128))
        } else {
            Some((0, (1u128 << bits) - 1))
        }
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone)]
pub struct NamedType {
    pub name: String,
    pub symbol: Option<SymbolId>,
    /// `None` when the type arguments were omitted (e.g. a bare enum
    /// constructor); such a type is assignable to any instantiation.
    pub type_arguments: Option<Vec<Type>>,
    /// Arrays, maps and class instances.
    pub aliasable: bool,
}

#[derive(Debug, Clone)]
pub struct FunctionType {
    pub params: Vec<Type>,
    pub return_type: Box<Type>,
}

#[derive(Debug, Clone)]
pub enum Type {
    Primitive(Primitive),
    Named(NamedType),
    /// Flattened, deduplicated, at least two members.
    Union(Vec<Type>),
    Tuple(Vec<Type>),
    Function(FunctionType),
    TypeParam(String),
    Error,
    Unknown,
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Type::Primitive(left), Type::Primitive(right)) => left == right,
            (Type::Named(left), Type::Named(right)) => {
                left.name == right.name && left.type_arguments == right.type_arguments
            }
            (Type::Union(left), Type::Union(right)) => {
                left.len() == right.len() && left.iter().all(|member| right.contains(member))
            }
            (Type::Tuple(left), Type::Tuple(right)) => left == right,
            (Type::Function(left), Type::Function(right)) => {
                left.params == right.params && left.return_type == right.return_type
            }
            (Type::TypeParam(left), Type::TypeParam(right)) => left == right,
            (Type::Error, Type::Error) | (Type::Unknown, Type::Unknown) => true,
            _ => false,
        }
    }
}

impl Eq for Type {}

impl Type {
    pub const BOOL: Type = Type::Primitive(Primitive::Bool);
    pub const STRING: Type = Type::Primitive(Primitive::String);
    pub const NULL: Type = Type::Primitive(Primitive::Null);
    pub const VOID: Type = Type::Primitive(Primitive::Void);

    pub fn named(name: impl Into<String>, symbol: Option<SymbolId>) -> Self {
        Type::Named(NamedType {
            name: name.into(),
            symbol,
            type_arguments: None,
            aliasable: false,
        })
    }

    pub fn array(element: Type) -> Self {
        Type::Named(NamedType {
            name: ARRAY_TYPE.to_string(),
            symbol: None,
            type_arguments: Some(vec![element]),
            aliasable: true,
        })
    }

    pub fn map(key: Type, value: Type) -> Self {
        Type::Named(NamedType {
            name: MAP_TYPE.to_string(),
            symbol: None,
            type_arguments: Some(vec![key, value]),
            aliasable: true,
        })
    }

    pub fn function(params: Vec<Type>, return_type: Type) -> Self {
        Type::Function(FunctionType {
            params,
            return_type: Box::new(return_type),
        })
    }

    pub fn primitive(&self) -> Option<Primitive> {
        match self {
            Type::Primitive(primitive) => Some(*primitive),
            _ => None,
        }
    }

    /// Error, Unknown and type parameters absorb every check.
    pub fn is_absorbing(&self) -> bool {
        matches!(self, Type::Error | Type::Unknown | Type::TypeParam(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Type::Error)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Type::Primitive(Primitive::Null))
    }

    pub fn is_numeric(&self) -> bool {
        self.primitive().is_some_and(Primitive::is_numeric)
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Type::Primitive(Primitive::String))
    }

    pub fn is_aliasable(&self) -> bool {
        match self {
            Type::Named(named) => named.aliasable,
            Type::Union(members) => members.iter().all(Type::is_aliasable),
            _ => false,
        }
    }

    /// Types a condition may test without comparison: bool, null, numbers,
    /// strings and aliasable types.
    pub fn is_truthy(&self) -> bool {
        match self {
            Type::Primitive(primitive) => !matches!(primitive, Primitive::Void),
            Type::Named(named) => named.aliasable,
            Type::Union(members) => members.iter().all(Type::is_truthy),
            Type::Tuple(_) | Type::Function(_) => false,
            Type::TypeParam(_) | Type::Error | Type::Unknown => true,
        }
    }

    pub fn named_type(&self) -> Option<&NamedType> {
        match self {
            Type::Named(named) => Some(named),
            _ => None,
        }
    }

    pub fn is_named(&self, name: &str) -> bool {
        self.named_type().is_some_and(|named| named.name == name)
    }

    /// Element type of an `Array`, Unknown when not statically known.
    pub fn array_element(&self) -> Option<Type> {
        let named = self.named_type().filter(|named| named.name == ARRAY_TYPE)?;
        Some(
            named
                .type_arguments
                .as_ref()
                .and_then(|arguments| arguments.first().cloned())
                .unwrap_or(Type::Unknown),
        )
    }

    /// `(key, value)` of a `Map`, Unknown components when not statically known.
    pub fn map_entry(&self) -> Option<(Type, Type)> {
        let named = self.named_type().filter(|named| named.name == MAP_TYPE)?;
        let arguments = named.type_arguments.as_deref().unwrap_or(&[]);
        Some((
            arguments.first().cloned().unwrap_or(Type::Unknown),
            arguments.get(1).cloned().unwrap_or(Type::Unknown),
        ))
    }

    pub fn substitute(&self, mapping: &HashMap<String, Type>) -> Type {
        if mapping.is_empty() {
            return self.clone();
        }
        match self {
            Type::TypeParam(name) => mapping
                .get(name)
                .cloned()
                .unwrap_or_else(|| Type::TypeParam(name.clone())),
            Type::Named(named) => Type::Named(NamedType {
                type_arguments: named.type_arguments.as_ref().map(|arguments| {
                    arguments
                        .iter()
                        .map(|argument| argument.substitute(mapping))
                        .collect()
                }),
                ..named.clone()
            }),
            Type::Union(members) => {
                make_union(members.iter().map(|member| member.substitute(mapping)))
            }
            Type::Tuple(elements) => Type::Tuple(
                elements
                    .iter()
                    .map(|element| element.substitute(mapping))
                    .collect(),
            ),
            Type::Function(function) => Type::function(
                function
                    .params
                    .iter()
                    .map(|param| param.substitute(mapping))
                    .collect(),
                function.return_type.substitute(mapping),
            ),
            other => other.clone(),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Primitive(primitive) => write!(f, "{primitive}"),
            Type::Named(named) => {
                f.write_str(&named.name)?;
                match &named.type_arguments {
                    Some(arguments) if !arguments.is_empty() => {
                        write!(f, "<{}>", join_types(arguments, ", "))
                    }
                    _ => Ok(()),
                }
            }
            Type::Union(members) => f.write_str(&join_types(members, " | ")),
            Type::Tuple(elements) => write!(f, "({})", join_types(elements, ", ")),
            Type::Function(function) => write!(
                f,
                "fn({}) -> {}",
                join_types(&function.params, ", "),
                function.return_type
            ),
            Type::TypeParam(name) => f.write_str(name),
            Type::Error => f.write_str("<error>"),
            Type::Unknown => f.write_str("<unknown>"),
        }
    }
}

fn join_types(types: &[Type], separator: &str) -> String {
    types
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(separator)
}

pub fn is_assignable(from: &Type, to: &Type) -> bool {
    if from == to || from.is_absorbing() || to.is_absorbing() {
        return true;
    }
    if let Type::Union(members) = from {
        if members.iter().all(|member| is_assignable(member, to)) {
            return true;
        }
    }
    if let Type::Union(members) = to {
        if members.iter().any(|member| is_assignable(from, member)) {
            return true;
        }
    }

    match (from, to) {
        (Type::Named(source), Type::Named(target)) if source.name == target.name => {
            match (&source.type_arguments, &target.type_arguments) {
                (None, _) | (_, None) => true,
                (Some(left), Some(right)) => {
                    left.len() == right.len()
                        && left
                            .iter()
                            .zip(right)
                            .all(|(left, right)| is_assignable(left, right))
                }
            }
        }
        (Type::Tuple(left), Type::Tuple(right)) => {
            left.len() == right.len()
                && left
                    .iter()
                    .zip(right)
                    .all(|(left, right)| is_assignable(left, right))
        }
        (Type::Function(source), Type::Function(target)) => {
            source.params.len() == target.params.len()
                && target
                    .params
                    .iter()
                    .zip(&source.params)
                    .all(|(expected, actual)| is_assignable(expected, actual))
                && is_assignable(&source.return_type, &target.return_type)
        }
        _ => false,
    }
}

/// Flattens nested unions and drops duplicates, keeping first occurrences in
/// order. No members yields Error, one member yields that member.
pub fn make_union<I>(members: I) -> Type
where
    I: IntoIterator<Item = Type>,
{
    let mut flattened: Vec<Type> = Vec::new();
    for member in members {
        match member {
            Type::Union(inner) => {
                for nested in inner {
                    if !flattened.contains(&nested) {
                        flattened.push(nested);
                    }
                }
            }
            other => {
                if !flattened.contains(&other) {
                    flattened.push(other);
                }
            }
        }
    }

    match flattened.len() {
        0 => Type::Error,
        1 => flattened.pop().unwrap_or(Type::Error),
        _ => Type::Union(flattened),
    }
}

pub fn remove_null(ty: &Type) -> Type {
    match ty {
        Type::Union(members) => {
            make_union(members.iter().filter(|member| !member.is_null()).cloned())
        }
        other if other.is_null() => Type::Error,
        other => other.clone(),
    }
}

/// Maps declared type parameter names to the supplied type arguments.
/// Omitted arguments leave the parameters unmapped.
pub fn type_argument_mapping(
    parameters: &[String],
    arguments: Option<&[Type]>,
) -> HashMap<String, Type> {
    match arguments {
        Some(arguments) => parameters
            .iter()
            .cloned()
            .zip(arguments.iter().cloned())
            .collect(),
        None => HashMap::new(),
    }
}
