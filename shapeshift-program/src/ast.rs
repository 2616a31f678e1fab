// Shapeshift Program Model
// Type-checked declarations, call sites and class hierarchy handed over by the front end

use crate::body::Body;
use crate::error::ProgramError;
use crate::types::{Property, Type};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Source position information for program nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Stable identifier of a generic declaration, valid for the whole pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeclarationId(pub u32);

/// Stable identifier of a call, construction or reference expression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallSiteId(pub u32);

impl fmt::Display for DeclarationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "decl#{}", self.0)
    }
}

impl fmt::Display for CallSiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "site#{}", self.0)
    }
}

/// What kind of entity a generic declaration is
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DeclarationKind {
    Function,
    /// Method declared on `class`
    Method { class: String },
    Class,
}

/// Constraint on a type parameter, as written in the source
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConstraintDescriptor {
    /// `T extends SomeDeclaredType`
    Nominal(Type),
    /// `T extends { width: number }`
    Structural(Vec<Property>),
    /// `T extends { [key: K]: V }`
    IndexSignature { key: Type, value: Type },
    Unconstrained,
}

/// Type parameter of a generic declaration
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeParameter {
    pub name: String,
    pub constraint: ConstraintDescriptor,
    pub default: Option<Type>,
}

/// Value parameter of a function, method or constructor
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Parameter {
    pub name: String,
    pub ty: Type,
    pub optional: bool,
    pub rest: bool,
}

/// A generic function, method or class, created once by the front end
#[derive(Debug, Clone, PartialEq)]
pub struct GenericDeclaration {
    pub id: DeclarationId,
    pub name: String,
    pub kind: DeclarationKind,
    pub type_params: Vec<TypeParameter>,
    /// Function/method parameters, or constructor parameters for classes
    pub params: Vec<Parameter>,
    /// Declared return type, or the instance type for classes
    pub return_type: Type,
    pub body: Body,
    /// Part of the compiled unit's exported surface
    pub exported: bool,
    pub span: Option<Span>,
}

impl GenericDeclaration {
    /// Reference type for the type parameter at `index`
    pub fn type_param_ref(&self, index: usize) -> Option<Type> {
        self.type_params
            .get(index)
            .map(|tp| Type::param(self.id, index, tp.name.clone()))
    }

    /// The rest parameter, if any
    pub fn rest_parameter(&self) -> Option<(usize, &Parameter)> {
        self.params.iter().enumerate().find(|(_, p)| p.rest)
    }

    /// Declaring class for methods
    pub fn owning_class(&self) -> Option<&str> {
        match &self.kind {
            DeclarationKind::Method { class } => Some(class),
            _ => None,
        }
    }

    /// Methods whose signature mentions the polymorphic `this` type
    pub fn is_self_typed(&self) -> bool {
        self.owning_class().is_some()
            && (self.return_type.mentions_this() || self.params.iter().any(|p| p.ty.mentions_this()))
    }

    /// Qualified name for diagnostics: `Class.method` or `name`
    pub fn display_name(&self) -> String {
        match &self.kind {
            DeclarationKind::Method { class } => format!("{}.{}", class, self.name),
            _ => self.name.clone(),
        }
    }
}

/// How a declaration is referenced at a call site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    Call,
    Construct,
    /// Used as a first-class value (`const f = pick`); no instantiation is known
    Reference,
}

/// Whether an argument expression is an object literal written at the call site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgumentKind {
    ObjectLiteral,
    Value,
}

/// Argument expression at a call site, with its checker-resolved type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Argument {
    pub ty: Type,
    pub kind: ArgumentKind,
}

impl Argument {
    pub fn value(ty: Type) -> Self {
        Self {
            ty,
            kind: ArgumentKind::Value,
        }
    }

    /// Object literal argument `{ a: .., b: .. }`
    pub fn object_literal(properties: Vec<Property>) -> Self {
        Self {
            ty: Type::object(properties),
            kind: ArgumentKind::ObjectLiteral,
        }
    }

    pub fn is_object_literal(&self) -> bool {
        self.kind == ArgumentKind::ObjectLiteral
    }
}

/// A call, construction or reference expression targeting a generic declaration
#[derive(Debug, Clone, PartialEq)]
pub struct CallSite {
    pub id: CallSiteId,
    pub target: DeclarationId,
    pub kind: CallKind,
    /// Checker-resolved type arguments; trailing omitted ones take declared defaults
    pub type_args: Vec<Type>,
    pub arguments: Vec<Argument>,
    /// Receiver type for method calls
    pub receiver: Option<Type>,
    /// Generic declaration whose body contains this call site
    pub enclosing: Option<DeclarationId>,
    pub span: Option<Span>,
}

/// Class declaration, used to reason about inheritance chains
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDeclaration {
    pub name: String,
    pub extends: Option<String>,
    pub exported: bool,
}

/// Type-checked program snapshot
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    pub declarations: Vec<GenericDeclaration>,
    pub call_sites: Vec<CallSite>,
    pub classes: Vec<ClassDeclaration>,
    /// Names of declared nominal types (interfaces, aliases, classes)
    pub declared_types: Vec<String>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a declaration by id
    pub fn declaration(&self, id: DeclarationId) -> Option<&GenericDeclaration> {
        self.declarations.iter().find(|d| d.id == id)
    }

    /// Get a call site by id
    pub fn call_site(&self, id: CallSiteId) -> Option<&CallSite> {
        self.call_sites.iter().find(|c| c.id == id)
    }

    /// All call sites targeting `target`, in id order
    pub fn call_sites_for(&self, target: DeclarationId) -> Vec<&CallSite> {
        let mut sites: Vec<&CallSite> = self
            .call_sites
            .iter()
            .filter(|c| c.target == target)
            .collect();
        sites.sort_by_key(|c| c.id);
        sites
    }

    /// Get a class declaration by name
    pub fn class(&self, name: &str) -> Option<&ClassDeclaration> {
        self.classes.iter().find(|c| c.name == name)
    }

    /// Check whether `name` refers to a declared nominal type or class
    pub fn is_declared_type(&self, name: &str) -> bool {
        self.declared_types.iter().any(|t| t == name) || self.class(name).is_some()
    }

    /// Declarations sorted by id
    pub fn sorted_declarations(&self) -> Vec<&GenericDeclaration> {
        let mut declarations: Vec<&GenericDeclaration> = self.declarations.iter().collect();
        declarations.sort_by_key(|d| d.id);
        declarations
    }

    /// Check the structural preconditions the specializer relies on
    pub fn validate(&self) -> Result<(), ProgramError> {
        let mut seen = HashSet::new();
        for declaration in &self.declarations {
            if !seen.insert(declaration.id) {
                return Err(ProgramError::DuplicateDeclaration {
                    declaration: declaration.id,
                    name: declaration.name.clone(),
                });
            }

            let rest_count = declaration.params.iter().filter(|p| p.rest).count();
            if rest_count > 1 {
                return Err(ProgramError::MultipleRestParameters {
                    declaration: declaration.id,
                    name: declaration.display_name(),
                });
            }
            if let Some((index, _)) = declaration.rest_parameter() {
                if index + 1 != declaration.params.len() {
                    return Err(ProgramError::RestParameterNotLast {
                        declaration: declaration.id,
                        name: declaration.display_name(),
                    });
                }
            }
        }

        let classes: HashMap<&str, &ClassDeclaration> =
            self.classes.iter().map(|c| (c.name.as_str(), c)).collect();
        for class in &self.classes {
            if let Some(parent) = &class.extends {
                if !classes.contains_key(parent.as_str()) {
                    return Err(ProgramError::UnknownSuperclass {
                        class: class.name.clone(),
                        superclass: parent.clone(),
                    });
                }
            }
        }

        let mut seen_sites = HashSet::new();
        for site in &self.call_sites {
            if !seen_sites.insert(site.id) {
                return Err(ProgramError::DuplicateCallSite { call_site: site.id });
            }

            let target = self
                .declaration(site.target)
                .ok_or(ProgramError::UnknownDeclaration {
                    call_site: site.id,
                    declaration: site.target,
                })?;

            if site.type_args.len() > target.type_params.len() {
                return Err(ProgramError::TooManyTypeArguments {
                    call_site: site.id,
                    name: target.display_name(),
                    expected: target.type_params.len(),
                    found: site.type_args.len(),
                });
            }

            if site.kind != CallKind::Reference {
                for (index, tp) in target.type_params.iter().enumerate().skip(site.type_args.len()) {
                    if tp.default.is_none() {
                        return Err(ProgramError::MissingTypeArgument {
                            call_site: site.id,
                            name: target.display_name(),
                            parameter: tp.name.clone(),
                            index,
                        });
                    }
                }
            }

            match site.enclosing {
                Some(enclosing) => {
                    if self.declaration(enclosing).is_none() {
                        return Err(ProgramError::UnknownDeclaration {
                            call_site: site.id,
                            declaration: enclosing,
                        });
                    }
                }
                None => {
                    let is_open = |ty: &Type| ty.mentions_params() || ty.mentions_this();
                    let open = site.type_args.iter().any(is_open)
                        || site.receiver.as_ref().is_some_and(is_open);
                    if open {
                        return Err(ProgramError::OpenTypeArguments { call_site: site.id });
                    }
                }
            }

            for (index, argument) in site.arguments.iter().enumerate() {
                if argument.is_object_literal() && argument.ty.as_object().is_none() {
                    return Err(ProgramError::LiteralArgumentNotObject {
                        call_site: site.id,
                        index,
                    });
                }
            }
        }

        Ok(())
    }
}
