// Shapeshift Program Types
// Closed type representation for type-checked source programs

use crate::ast::DeclarationId;
use std::fmt;

/// Built-in primitive types of the source language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Primitive {
    Number,
    String,
    Boolean,
    BigInt,
    Symbol,
    Null,
    Undefined,
    Void,
}

impl Primitive {
    /// Source-language keyword for this primitive
    pub fn keyword(&self) -> &'static str {
        match self {
            Primitive::Number => "number",
            Primitive::String => "string",
            Primitive::Boolean => "boolean",
            Primitive::BigInt => "bigint",
            Primitive::Symbol => "symbol",
            Primitive::Null => "null",
            Primitive::Undefined => "undefined",
            Primitive::Void => "void",
        }
    }

    /// All primitive keywords, in declaration order
    pub fn all() -> [Primitive; 8] {
        [
            Primitive::Number,
            Primitive::String,
            Primitive::Boolean,
            Primitive::BigInt,
            Primitive::Symbol,
            Primitive::Null,
            Primitive::Undefined,
            Primitive::Void,
        ]
    }
}

/// Literal (unit) types such as `"red"`, `3` or `true`
///
/// Numeric and bigint literals keep the checker's canonical text so that
/// literal types stay hashable and totally ordered.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LiteralType {
    String(String),
    Number(String),
    BigInt(String),
    Boolean(bool),
}

impl LiteralType {
    /// The primitive a literal widens to
    pub fn widened(&self) -> Primitive {
        match self {
            LiteralType::String(_) => Primitive::String,
            LiteralType::Number(_) => Primitive::Number,
            LiteralType::BigInt(_) => Primitive::BigInt,
            LiteralType::Boolean(_) => Primitive::Boolean,
        }
    }
}

/// Reference to a type parameter of a generic declaration
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeParamRef {
    pub owner: DeclarationId,
    pub index: usize,
    pub name: String,
}

/// Named property of an object shape
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Property {
    pub name: String,
    pub ty: Type,
    pub optional: bool,
}

impl Property {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
            optional: false,
        }
    }

    pub fn optional(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
            optional: true,
        }
    }
}

/// `[key: K]: V` index signature of an object shape
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IndexSignature {
    pub key: Box<Type>,
    pub value: Box<Type>,
}

/// Anonymous object shape: `{ width: number; color?: string }`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ObjectShape {
    pub properties: Vec<Property>,
    pub index: Option<IndexSignature>,
}

impl ObjectShape {
    pub fn new(properties: Vec<Property>) -> Self {
        Self {
            properties,
            index: None,
        }
    }

    /// Shape with only an index signature
    pub fn indexed(key: Type, value: Type) -> Self {
        Self {
            properties: Vec::new(),
            index: Some(IndexSignature {
                key: Box::new(key),
                value: Box::new(value),
            }),
        }
    }

    /// Look up a property by name
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Sorted property names
    pub fn property_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.properties.iter().map(|p| p.name.clone()).collect();
        names.sort();
        names
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty() && self.index.is_none()
    }
}

/// Element of a tuple type
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TupleElement {
    pub ty: Type,
    pub optional: bool,
    pub rest: bool,
}

impl TupleElement {
    pub fn required(ty: Type) -> Self {
        Self {
            ty,
            optional: false,
            rest: false,
        }
    }

    pub fn optional(ty: Type) -> Self {
        Self {
            ty,
            optional: true,
            rest: false,
        }
    }

    pub fn rest(ty: Type) -> Self {
        Self {
            ty,
            optional: false,
            rest: true,
        }
    }
}

/// Function type: `(a: A, ...rest: R[]) => Ret`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FunctionType {
    pub params: Vec<Type>,
    pub rest: Option<Box<Type>>,
    pub return_type: Box<Type>,
}

/// Conditional type: `Check extends Test ? Then : Else`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConditionalType {
    pub check: Box<Type>,
    pub extends: Box<Type>,
    pub then_type: Box<Type>,
    pub else_type: Box<Type>,
}

/// Unified type representation produced by the front-end checker
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Type {
    Primitive(Primitive),
    Literal(LiteralType),
    Any,
    Unknown,
    Never,

    /// Declared nominal type: classes, interfaces, aliases resolved by the checker
    Named { name: String, args: Vec<Type> },

    /// Type parameter of a generic declaration
    Param(TypeParamRef),

    Array(Box<Type>),
    Tuple(Vec<TupleElement>),
    Object(ObjectShape),
    Union(Vec<Type>),
    Function(FunctionType),
    Conditional(ConditionalType),

    /// Polymorphic `this`
    This,
}

impl Type {
    pub fn number() -> Self {
        Type::Primitive(Primitive::Number)
    }

    pub fn string() -> Self {
        Type::Primitive(Primitive::String)
    }

    pub fn boolean() -> Self {
        Type::Primitive(Primitive::Boolean)
    }

    pub fn undefined() -> Self {
        Type::Primitive(Primitive::Undefined)
    }

    pub fn void() -> Self {
        Type::Primitive(Primitive::Void)
    }

    pub fn string_literal(value: impl Into<String>) -> Self {
        Type::Literal(LiteralType::String(value.into()))
    }

    pub fn number_literal(value: impl ToString) -> Self {
        Type::Literal(LiteralType::Number(value.to_string()))
    }

    pub fn boolean_literal(value: bool) -> Self {
        Type::Literal(LiteralType::Boolean(value))
    }

    /// Nominal type without arguments
    pub fn named(name: impl Into<String>) -> Self {
        Type::Named {
            name: name.into(),
            args: Vec::new(),
        }
    }

    /// Nominal type with generic arguments
    pub fn generic_named(name: impl Into<String>, args: Vec<Type>) -> Self {
        Type::Named {
            name: name.into(),
            args,
        }
    }

    pub fn param(owner: DeclarationId, index: usize, name: impl Into<String>) -> Self {
        Type::Param(TypeParamRef {
            owner,
            index,
            name: name.into(),
        })
    }

    pub fn array(element: Type) -> Self {
        Type::Array(Box::new(element))
    }

    /// Tuple of required elements
    pub fn tuple(elements: Vec<Type>) -> Self {
        Type::Tuple(elements.into_iter().map(TupleElement::required).collect())
    }

    pub fn object(properties: Vec<Property>) -> Self {
        Type::Object(ObjectShape::new(properties))
    }

    pub fn union(members: Vec<Type>) -> Self {
        Type::Union(members)
    }

    pub fn function(params: Vec<Type>, return_type: Type) -> Self {
        Type::Function(FunctionType {
            params,
            rest: None,
            return_type: Box::new(return_type),
        })
    }

    pub fn conditional(check: Type, extends: Type, then_type: Type, else_type: Type) -> Self {
        Type::Conditional(ConditionalType {
            check: Box::new(check),
            extends: Box::new(extends),
            then_type: Box::new(then_type),
            else_type: Box::new(else_type),
        })
    }

    /// Visit this type and every nested type, parents before children
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Type)) {
        visit(self);
        match self {
            Type::Named { args, .. } => args.iter().for_each(|arg| arg.walk(visit)),
            Type::Array(element) => element.walk(visit),
            Type::Tuple(elements) => elements.iter().for_each(|e| e.ty.walk(visit)),
            Type::Object(shape) => {
                shape.properties.iter().for_each(|p| p.ty.walk(visit));
                if let Some(index) = &shape.index {
                    index.key.walk(visit);
                    index.value.walk(visit);
                }
            }
            Type::Union(members) => members.iter().for_each(|m| m.walk(visit)),
            Type::Function(function) => {
                function.params.iter().for_each(|p| p.walk(visit));
                if let Some(rest) = &function.rest {
                    rest.walk(visit);
                }
                function.return_type.walk(visit);
            }
            Type::Conditional(conditional) => {
                conditional.check.walk(visit);
                conditional.extends.walk(visit);
                conditional.then_type.walk(visit);
                conditional.else_type.walk(visit);
            }
            Type::Primitive(_)
            | Type::Literal(_)
            | Type::Any
            | Type::Unknown
            | Type::Never
            | Type::Param(_)
            | Type::This => {}
        }
    }

    /// Check whether any nested type satisfies the predicate
    pub fn any(&self, predicate: impl Fn(&Type) -> bool) -> bool {
        let mut found = false;
        self.walk(&mut |ty| found = found || predicate(ty));
        found
    }

    /// Check if this type mentions any type parameter
    pub fn mentions_params(&self) -> bool {
        self.any(|ty| matches!(ty, Type::Param(_)))
    }

    /// Check if this type mentions a type parameter owned by `owner`
    pub fn mentions_params_of(&self, owner: DeclarationId) -> bool {
        self.any(|ty| matches!(ty, Type::Param(p) if p.owner == owner))
    }

    /// Check if this type mentions the polymorphic `this` type
    pub fn mentions_this(&self) -> bool {
        self.any(|ty| matches!(ty, Type::This))
    }

    /// Check if a conditional type appears anywhere inside this type
    pub fn contains_conditional(&self) -> bool {
        self.any(|ty| matches!(ty, Type::Conditional(_)))
    }

    /// Conditional types nested in this type whose check or test mention `owner`'s parameters
    pub fn dependent_conditionals(&self, owner: DeclarationId) -> Vec<&ConditionalType> {
        let mut found = Vec::new();
        self.walk(&mut |ty| {
            if let Type::Conditional(conditional) = ty {
                if conditional.check.mentions_params_of(owner)
                    || conditional.extends.mentions_params_of(owner)
                {
                    found.push(conditional);
                }
            }
        });
        found
    }

    /// A type is concrete when nothing in it still has to be instantiated
    pub fn is_concrete(&self) -> bool {
        !self.any(|ty| matches!(ty, Type::Param(_) | Type::This | Type::Conditional(_)))
    }

    /// Nesting depth of this type (a primitive has depth 1)
    pub fn depth(&self) -> usize {
        let children = match self {
            Type::Named { args, .. } => args.iter().map(Type::depth).max(),
            Type::Array(element) => Some(element.depth()),
            Type::Tuple(elements) => elements.iter().map(|e| e.ty.depth()).max(),
            Type::Object(shape) => {
                let props = shape.properties.iter().map(|p| p.ty.depth()).max();
                let index = shape
                    .index
                    .as_ref()
                    .map(|i| i.key.depth().max(i.value.depth()));
                props.max(index)
            }
            Type::Union(members) => members.iter().map(Type::depth).max(),
            Type::Function(function) => {
                let params = function.params.iter().map(Type::depth).max();
                let rest = function.rest.as_ref().map(|r| r.depth());
                params.max(rest).max(Some(function.return_type.depth()))
            }
            Type::Conditional(conditional) => Some(
                conditional
                    .check
                    .depth()
                    .max(conditional.extends.depth())
                    .max(conditional.then_type.depth())
                    .max(conditional.else_type.depth()),
            ),
            _ => None,
        };
        1 + children.unwrap_or(0)
    }

    /// Widen literal types to their primitive, recursively
    pub fn widened(&self) -> Type {
        match self {
            Type::Literal(literal) => Type::Primitive(literal.widened()),
            Type::Array(element) => Type::array(element.widened()),
            Type::Tuple(elements) => Type::Tuple(
                elements
                    .iter()
                    .map(|e| TupleElement {
                        ty: e.ty.widened(),
                        optional: e.optional,
                        rest: e.rest,
                    })
                    .collect(),
            ),
            Type::Object(shape) => Type::Object(ObjectShape {
                properties: shape
                    .properties
                    .iter()
                    .map(|p| Property {
                        name: p.name.clone(),
                        ty: p.ty.widened(),
                        optional: p.optional,
                    })
                    .collect(),
                index: shape.index.clone(),
            }),
            Type::Union(members) => Type::Union(members.iter().map(Type::widened).collect()),
            other => other.clone(),
        }
    }

    pub fn as_object(&self) -> Option<&ObjectShape> {
        match self {
            Type::Object(shape) => Some(shape),
            _ => None,
        }
    }
}

impl From<Primitive> for Type {
    fn from(primitive: Primitive) -> Self {
        Type::Primitive(primitive)
    }
}

fn write_joined<T: fmt::Display>(
    f: &mut fmt::Formatter<'_>,
    items: impl IntoIterator<Item = T>,
    separator: &str,
) -> fmt::Result {
    for (i, item) in items.into_iter().enumerate() {
        if i > 0 {
            write!(f, "{separator}")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl fmt::Display for LiteralType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiteralType::String(value) => write!(f, "{value:?}"),
            LiteralType::Number(value) => write!(f, "{value}"),
            LiteralType::BigInt(value) => write!(f, "{value}n"),
            LiteralType::Boolean(value) => write!(f, "{value}"),
        }
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = if self.optional { "?" } else { "" };
        write!(f, "{}{}: {}", self.name, marker, self.ty)
    }
}

impl fmt::Display for ObjectShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "{{}}");
        }
        write!(f, "{{ ")?;
        write_joined(f, &self.properties, "; ")?;
        if let Some(index) = &self.index {
            if !self.properties.is_empty() {
                write!(f, "; ")?;
            }
            write!(f, "[key: {}]: {}", index.key, index.value)?;
        }
        write!(f, " }}")
    }
}

/// Display implementation for types, in source-language syntax (for diagnostics)
impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Primitive(primitive) => write!(f, "{}", primitive.keyword()),
            Type::Literal(literal) => write!(f, "{literal}"),
            Type::Any => write!(f, "any"),
            Type::Unknown => write!(f, "unknown"),
            Type::Never => write!(f, "never"),
            Type::Named { name, args } => {
                write!(f, "{name}")?;
                if !args.is_empty() {
                    write!(f, "<")?;
                    write_joined(f, args, ", ")?;
                    write!(f, ">")?;
                }
                Ok(())
            }
            Type::Param(param) => write!(f, "{}", param.name),
            Type::Array(element) => match element.as_ref() {
                Type::Union(_) | Type::Function(_) | Type::Conditional(_) => {
                    write!(f, "({element})[]")
                }
                _ => write!(f, "{element}[]"),
            },
            Type::Tuple(elements) => {
                write!(f, "[")?;
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    if element.rest {
                        write!(f, "...")?;
                    }
                    write!(f, "{}", element.ty)?;
                    if element.optional {
                        write!(f, "?")?;
                    }
                }
                write!(f, "]")
            }
            Type::Object(shape) => write!(f, "{shape}"),
            Type::Union(members) => write_joined(f, members, " | "),
            Type::Function(function) => {
                write!(f, "(")?;
                for (i, param) in function.params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "arg{i}: {param}")?;
                }
                if let Some(rest) = &function.rest {
                    if !function.params.is_empty() {
                        write!(f, ", ")?;
                    }
                    write!(f, "...rest: {rest}")?;
                }
                write!(f, ") => {}", function.return_type)
            }
            Type::Conditional(conditional) => write!(
                f,
                "{} extends {} ? {} : {}",
                conditional.check, conditional.extends, conditional.then_type, conditional.else_type
            ),
            Type::This => write!(f, "this"),
        }
    }
}
