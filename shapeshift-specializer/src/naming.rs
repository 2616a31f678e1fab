//! Deterministic, identifier-safe names for generated declarations
//!
//! Every type serializes to text over `[A-Za-z0-9_]`. Inside a serialized
//! type an underscore is always followed by a digit:
//!
//! - `_0` / `_1` / `_2` open, close and separate a list
//! - `_3` starts a literal (`_3s`, `_3n`, `_3b` + escaped text, `_3t`, `_3f`)
//! - `_4` array, `_5` tuple, `_6` object
//! - `_7` + letter for the remaining forms (union, function, optional, ...)
//! - `_8` + six hex digits escapes any other character
//! - `_9` is a literal underscore
//!
//! Top-level components are therefore joined by a bare `_` without
//! ambiguity, and the base name is separated from them by `__`.
//!
//! Escaped base names never start with `_7`, so synthesized adapter names
//! use `_7s` (interface) and `_7c` (copy helper) prefixes and cannot meet a
//! specialization name.

use crate::error::{SpecializerError, SpecializerResult};
use indexmap::IndexMap;
use lazy_static::lazy_static;
use shapeshift_program::{
    DeclarationId, DeclarationKind, GenericDeclaration, LiteralType, ObjectShape, Primitive,
    Program, Type,
};
use std::collections::{HashMap, HashSet};
use std::fmt::Write;

lazy_static! {
    /// Names a nominal type cannot serialize to verbatim
    static ref RESERVED_NAMES: HashSet<&'static str> = {
        let mut names: HashSet<&'static str> =
            Primitive::all().iter().map(Primitive::keyword).collect();
        names.extend(["any", "unknown", "never", "this", "true", "false"]);
        names
    };
}

/// Check whether a nominal type name needs the reserved-name marker
pub fn is_reserved(name: &str) -> bool {
    RESERVED_NAMES.contains(name)
}

/// Escape an arbitrary source name into identifier-safe text
///
/// A leading digit is escaped so that a component never starts with one.
pub fn escape_name(name: &str) -> String {
    escape_text(name, true)
}

fn escape_text(text: &str, escape_leading_digit: bool) -> String {
    let mut escaped = String::with_capacity(text.len());
    for (i, c) in text.chars().enumerate() {
        match c {
            '_' => escaped.push_str("_9"),
            c if c.is_ascii_digit() && i == 0 && escape_leading_digit => {
                push_escaped(&mut escaped, c)
            }
            c if c.is_ascii_alphanumeric() => escaped.push(c),
            c => push_escaped(&mut escaped, c),
        }
    }
    escaped
}

fn push_escaped(out: &mut String, c: char) {
    // Infallible for String
    let _ = write!(out, "_8{:06x}", c as u32);
}

/// Recursive, injective type serializer
#[derive(Debug, Clone, Copy, Default)]
pub struct TypeSerializer;

impl TypeSerializer {
    /// Serialize a single type
    pub fn serialize(ty: &Type) -> String {
        let mut out = String::new();
        Self::write_type(ty, &mut out);
        out
    }

    /// Serialize an ordered tuple of types, joined by `_`
    pub fn serialize_components(components: &[Type]) -> String {
        components
            .iter()
            .map(Self::serialize)
            .collect::<Vec<_>>()
            .join("_")
    }

    /// Serialize an object shape
    pub fn serialize_shape(shape: &ObjectShape) -> String {
        let mut out = String::new();
        Self::write_shape(shape, &mut out);
        out
    }

    fn write_list<'a, T: 'a>(
        items: impl IntoIterator<Item = &'a T>,
        out: &mut String,
        mut write_item: impl FnMut(&'a T, &mut String),
    ) {
        out.push_str("_0");
        for (i, item) in items.into_iter().enumerate() {
            if i > 0 {
                out.push_str("_2");
            }
            write_item(item, out);
        }
        out.push_str("_1");
    }

    fn write_type(ty: &Type, out: &mut String) {
        match ty {
            Type::Primitive(primitive) => out.push_str(primitive.keyword()),
            Type::Literal(literal) => match literal {
                LiteralType::String(text) => {
                    out.push_str("_3s");
                    out.push_str(&escape_text(text, false));
                }
                LiteralType::Number(text) => {
                    out.push_str("_3n");
                    out.push_str(&escape_text(text, false));
                }
                LiteralType::BigInt(text) => {
                    out.push_str("_3b");
                    out.push_str(&escape_text(text, false));
                }
                LiteralType::Boolean(true) => out.push_str("_3t"),
                LiteralType::Boolean(false) => out.push_str("_3f"),
            },
            Type::Any => out.push_str("_7a"),
            Type::Unknown => out.push_str("_7k"),
            Type::Never => out.push_str("_7v"),
            Type::This => out.push_str("_7h"),
            Type::Named { name, args } => {
                if is_reserved(name) {
                    out.push_str("_7n");
                }
                out.push_str(&escape_name(name));
                if !args.is_empty() {
                    Self::write_list(args, out, Self::write_type);
                }
            }
            Type::Param(param) => {
                let _ = write!(out, "_7p_0{}_2{}_1", param.owner.0, param.index);
            }
            Type::Array(element) => {
                out.push_str("_4");
                Self::write_type(element, out);
            }
            Type::Tuple(elements) => {
                out.push_str("_5");
                Self::write_list(elements, out, |element, out| {
                    if element.optional {
                        out.push_str("_7o");
                    }
                    if element.rest {
                        out.push_str("_7r");
                    }
                    Self::write_type(&element.ty, out);
                });
            }
            Type::Object(shape) => Self::write_shape(shape, out),
            Type::Union(members) => {
                out.push_str("_7u");
                Self::write_list(members, out, Self::write_type);
            }
            Type::Function(function) => {
                out.push_str("_7f_0");
                for (i, param) in function.params.iter().enumerate() {
                    if i > 0 {
                        out.push_str("_2");
                    }
                    Self::write_type(param, out);
                }
                if let Some(rest) = &function.rest {
                    if !function.params.is_empty() {
                        out.push_str("_2");
                    }
                    out.push_str("_7r");
                    Self::write_type(rest, out);
                }
                out.push_str("_1_0");
                Self::write_type(&function.return_type, out);
                out.push_str("_1");
            }
            Type::Conditional(conditional) => {
                out.push_str("_7c");
                let parts = [
                    conditional.check.as_ref(),
                    conditional.extends.as_ref(),
                    conditional.then_type.as_ref(),
                    conditional.else_type.as_ref(),
                ];
                Self::write_list(parts, out, |part, out| Self::write_type(part, out));
            }
        }
    }

    fn write_shape(shape: &ObjectShape, out: &mut String) {
        out.push_str("_6_0");
        let mut first = true;
        for property in &shape.properties {
            if !first {
                out.push_str("_2");
            }
            first = false;
            out.push_str(&escape_name(&property.name));
            if property.optional {
                out.push_str("_7o");
            }
            out.push_str("_0");
            Self::write_type(&property.ty, out);
            out.push_str("_1");
        }
        if let Some(index) = &shape.index {
            if !first {
                out.push_str("_2");
            }
            out.push_str("_7i_0");
            Self::write_type(&index.key, out);
            out.push_str("_2");
            Self::write_type(&index.value, out);
            out.push_str("_1");
        }
        out.push_str("_1");
    }
}

/// Undeduplicated base name of a declaration
pub fn raw_base_name(declaration: &GenericDeclaration) -> String {
    match &declaration.kind {
        DeclarationKind::Method { class } => {
            format!("{}_7m{}", escape_name(class), escape_name(&declaration.name))
        }
        DeclarationKind::Function | DeclarationKind::Class => escape_name(&declaration.name),
    }
}

/// `<base>__<arg1>_<arg2>...`
pub fn specialization_name(base: &str, components: &[Type]) -> String {
    format!("{}__{}", base, TypeSerializer::serialize_components(components))
}

/// Nominal interface synthesized for a structural constraint
pub fn interface_name(shape: &ObjectShape) -> String {
    format!("_7s{}", TypeSerializer::serialize_shape(shape))
}

/// Wrapper type implementing `interface` for a literal carrying `extras`
pub fn wrapper_name(interface: &str, extras: &ObjectShape) -> String {
    if extras.is_empty() {
        format!("{interface}__exact")
    } else {
        format!("{}__{}", interface, TypeSerializer::serialize_shape(extras))
    }
}

/// Copy routine converting a value of `source` type into `interface`
pub fn copy_helper_name(source: &Type, interface: &str) -> String {
    format!("_7c{}__{}", TypeSerializer::serialize(source), interface)
}

/// Whole-program registry of generated names
///
/// Base names are deduplicated once, in declaration id order; every generated
/// name is then claimed by exactly one owner.
#[derive(Debug, Clone, Default)]
pub struct NameRegistry {
    bases: IndexMap<DeclarationId, String>,
    claimed: HashMap<String, String>,
}

impl NameRegistry {
    /// Create a registry with base names for every declaration of `program`
    pub fn new(program: &Program) -> Self {
        let mut bases = IndexMap::new();
        let mut seen: HashMap<String, usize> = HashMap::new();

        for declaration in program.sorted_declarations() {
            let raw = raw_base_name(declaration);
            let count = seen.entry(raw.clone()).or_insert(0);
            let base = if *count == 0 {
                raw
            } else {
                format!("{raw}_7d{count}")
            };
            *count += 1;
            bases.insert(declaration.id, base);
        }

        Self {
            bases,
            claimed: HashMap::new(),
        }
    }

    /// Deduplicated base name for a declaration
    pub fn base(&self, declaration: DeclarationId) -> SpecializerResult<&str> {
        self.bases
            .get(&declaration)
            .map(String::as_str)
            .ok_or(SpecializerError::UnknownDeclaration { declaration })
    }

    /// Claim `name` for `owner`; claiming again for the same owner is a no-op
    pub fn claim(&mut self, name: &str, owner: &str) -> SpecializerResult<()> {
        match self.claimed.get(name) {
            Some(existing) if existing != owner => Err(SpecializerError::NameCollision {
                name: name.to_string(),
                first: existing.clone(),
                second: owner.to_string(),
            }),
            Some(_) => Ok(()),
            None => {
                self.claimed.insert(name.to_string(), owner.to_string());
                Ok(())
            }
        }
    }

    pub fn claimed_count(&self) -> usize {
        self.claimed.len()
    }
}
