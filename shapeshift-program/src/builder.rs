// Shapeshift Program Builder
// Incremental construction of type-checked programs with stable ids

use crate::ast::{
    Argument, CallKind, CallSite, CallSiteId, ClassDeclaration, ConstraintDescriptor,
    DeclarationId, DeclarationKind, GenericDeclaration, Parameter, Program, Span, TypeParameter,
};
use crate::body::{Body, Statement};
use crate::error::ProgramResult;
use crate::types::Type;

/// Builds a [`Program`], handing out declaration and call-site ids in creation order
#[derive(Debug, Default)]
pub struct ProgramBuilder {
    program: Program,
    next_declaration: u32,
    next_call_site: u32,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a declared nominal type (interface or alias)
    pub fn declare_type(&mut self, name: impl Into<String>) -> &mut Self {
        self.program.declared_types.push(name.into());
        self
    }

    /// Register a class, optionally extending another
    pub fn class(&mut self, name: impl Into<String>, extends: Option<&str>) -> &mut Self {
        self.program.classes.push(ClassDeclaration {
            name: name.into(),
            extends: extends.map(str::to_string),
            exported: false,
        });
        self
    }

    /// Register a class that is part of the exported surface
    pub fn exported_class(&mut self, name: impl Into<String>, extends: Option<&str>) -> &mut Self {
        self.program.classes.push(ClassDeclaration {
            name: name.into(),
            extends: extends.map(str::to_string),
            exported: true,
        });
        self
    }

    /// Declare a generic function
    pub fn function(
        &mut self,
        name: impl Into<String>,
        build: impl FnOnce(&mut DeclarationBuilder<'_>),
    ) -> DeclarationId {
        self.declare(name.into(), DeclarationKind::Function, build)
    }

    /// Declare a generic method on `class`
    pub fn method(
        &mut self,
        class: impl Into<String>,
        name: impl Into<String>,
        build: impl FnOnce(&mut DeclarationBuilder<'_>),
    ) -> DeclarationId {
        self.declare(
            name.into(),
            DeclarationKind::Method {
                class: class.into(),
            },
            build,
        )
    }

    /// Declare a generic class
    pub fn generic_class(
        &mut self,
        name: impl Into<String>,
        build: impl FnOnce(&mut DeclarationBuilder<'_>),
    ) -> DeclarationId {
        self.declare(name.into(), DeclarationKind::Class, build)
    }

    fn declare(
        &mut self,
        name: String,
        kind: DeclarationKind,
        build: impl FnOnce(&mut DeclarationBuilder<'_>),
    ) -> DeclarationId {
        let id = DeclarationId(self.next_declaration);
        self.next_declaration += 1;

        let declaration = GenericDeclaration {
            id,
            name,
            kind,
            type_params: Vec::new(),
            params: Vec::new(),
            return_type: Type::void(),
            body: Body::default(),
            exported: false,
            span: None,
        };

        let mut builder = DeclarationBuilder {
            builder: self,
            declaration,
        };
        build(&mut builder);
        let declaration = builder.declaration;

        self.program.declarations.push(declaration);
        id
    }

    /// Start a call site targeting `target` at the top level of the compiled unit
    pub fn call(&mut self, target: DeclarationId) -> CallSiteBuilder<'_> {
        self.start_call(target, None)
    }

    fn start_call(
        &mut self,
        target: DeclarationId,
        enclosing: Option<DeclarationId>,
    ) -> CallSiteBuilder<'_> {
        let id = CallSiteId(self.next_call_site);
        self.next_call_site += 1;
        CallSiteBuilder {
            builder: self,
            site: CallSite {
                id,
                target,
                kind: CallKind::Call,
                type_args: Vec::new(),
                arguments: Vec::new(),
                receiver: None,
                enclosing,
                span: None,
            },
        }
    }

    /// Validate and return the finished program
    pub fn build(self) -> ProgramResult<Program> {
        self.program.validate()?;
        Ok(self.program)
    }

    /// Return the program without validation
    pub fn build_unchecked(self) -> Program {
        self.program
    }
}

/// Builder for a single generic declaration
#[derive(Debug)]
pub struct DeclarationBuilder<'a> {
    builder: &'a mut ProgramBuilder,
    declaration: GenericDeclaration,
}

impl DeclarationBuilder<'_> {
    pub fn id(&self) -> DeclarationId {
        self.declaration.id
    }

    /// Add a type parameter and return a reference type for it
    pub fn type_param(&mut self, name: impl Into<String>, constraint: ConstraintDescriptor) -> Type {
        self.push_type_param(name.into(), constraint, None)
    }

    /// Add a type parameter with a default type
    pub fn type_param_with_default(
        &mut self,
        name: impl Into<String>,
        constraint: ConstraintDescriptor,
        default: Type,
    ) -> Type {
        self.push_type_param(name.into(), constraint, Some(default))
    }

    fn push_type_param(
        &mut self,
        name: String,
        constraint: ConstraintDescriptor,
        default: Option<Type>,
    ) -> Type {
        let index = self.declaration.type_params.len();
        self.declaration.type_params.push(TypeParameter {
            name: name.clone(),
            constraint,
            default,
        });
        Type::param(self.declaration.id, index, name)
    }

    pub fn param(&mut self, name: impl Into<String>, ty: Type) -> &mut Self {
        self.push_param(name.into(), ty, false, false)
    }

    pub fn optional_param(&mut self, name: impl Into<String>, ty: Type) -> &mut Self {
        self.push_param(name.into(), ty, true, false)
    }

    pub fn rest_param(&mut self, name: impl Into<String>, ty: Type) -> &mut Self {
        self.push_param(name.into(), ty, false, true)
    }

    fn push_param(&mut self, name: String, ty: Type, optional: bool, rest: bool) -> &mut Self {
        self.declaration.params.push(Parameter {
            name,
            ty,
            optional,
            rest,
        });
        self
    }

    pub fn returns(&mut self, ty: Type) -> &mut Self {
        self.declaration.return_type = ty;
        self
    }

    /// Mark the declaration as part of the exported surface
    pub fn exported(&mut self) -> &mut Self {
        self.declaration.exported = true;
        self
    }

    pub fn span(&mut self, span: Span) -> &mut Self {
        self.declaration.span = Some(span);
        self
    }

    pub fn statement(&mut self, statement: Statement) -> &mut Self {
        self.declaration.body.statements.push(statement);
        self
    }

    /// Start a call site inside this declaration's body
    pub fn call(&mut self, target: DeclarationId) -> CallSiteBuilder<'_> {
        let enclosing = self.declaration.id;
        self.builder.start_call(target, Some(enclosing))
    }
}

/// Builder for a single call site
#[derive(Debug)]
pub struct CallSiteBuilder<'a> {
    builder: &'a mut ProgramBuilder,
    site: CallSite,
}

impl CallSiteBuilder<'_> {
    pub fn type_args(mut self, type_args: Vec<Type>) -> Self {
        self.site.type_args = type_args;
        self
    }

    pub fn type_arg(mut self, ty: Type) -> Self {
        self.site.type_args.push(ty);
        self
    }

    pub fn argument(mut self, argument: Argument) -> Self {
        self.site.arguments.push(argument);
        self
    }

    pub fn receiver(mut self, receiver: Type) -> Self {
        self.site.receiver = Some(receiver);
        self
    }

    pub fn kind(mut self, kind: CallKind) -> Self {
        self.site.kind = kind;
        self
    }

    pub fn span(mut self, span: Span) -> Self {
        self.site.span = Some(span);
        self
    }

    /// Record the call site and return its id
    pub fn finish(self) -> CallSiteId {
        let id = self.site.id;
        self.builder.program.call_sites.push(self.site);
        id
    }
}
