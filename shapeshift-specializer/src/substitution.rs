//! Type parameter substitution for instantiating generic declarations

use shapeshift_program::{
    DeclarationId, FunctionType, GenericDeclaration, IndexSignature, ObjectShape, Property,
    TupleElement, Type,
};
use std::collections::HashMap;

/// Bindings from type parameters (owner, index) to types, plus an optional `this` binding
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Substitution {
    mappings: HashMap<(DeclarationId, usize), Type>,
    this_type: Option<Type>,
}

impl Substitution {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind every type parameter of `declaration` positionally
    pub fn for_declaration(declaration: &GenericDeclaration, type_args: &[Type]) -> Self {
        let mut substitution = Self::new();
        for (index, arg) in type_args.iter().enumerate() {
            substitution.insert(declaration.id, index, arg.clone());
        }
        substitution
    }

    /// Add a mapping from type parameter to type
    pub fn insert(&mut self, owner: DeclarationId, index: usize, ty: Type) {
        self.mappings.insert((owner, index), ty);
    }

    /// Bind the polymorphic `this` type
    pub fn with_this(mut self, this_type: Type) -> Self {
        self.this_type = Some(this_type);
        self
    }

    pub fn get(&self, owner: DeclarationId, index: usize) -> Option<&Type> {
        self.mappings.get(&(owner, index))
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty() && self.this_type.is_none()
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    /// Apply this substitution to a type
    ///
    /// Bound types are inserted as they are, without being substituted again.
    /// Conditional types are substituted structurally; evaluating them is the
    /// evaluator's job.
    pub fn apply(&self, ty: &Type) -> Type {
        match ty {
            Type::Param(param) => match self.get(param.owner, param.index) {
                Some(bound) => bound.clone(),
                None => ty.clone(),
            },
            Type::This => match &self.this_type {
                Some(this_type) => this_type.clone(),
                None => Type::This,
            },
            Type::Named { name, args } => Type::Named {
                name: name.clone(),
                args: args.iter().map(|arg| self.apply(arg)).collect(),
            },
            Type::Array(element) => Type::array(self.apply(element)),
            Type::Tuple(elements) => Type::Tuple(
                elements
                    .iter()
                    .map(|element| TupleElement {
                        ty: self.apply(&element.ty),
                        optional: element.optional,
                        rest: element.rest,
                    })
                    .collect(),
            ),
            Type::Object(shape) => Type::Object(self.apply_shape(shape)),
            Type::Union(members) => Type::Union(members.iter().map(|m| self.apply(m)).collect()),
            Type::Function(function) => Type::Function(FunctionType {
                params: function.params.iter().map(|p| self.apply(p)).collect(),
                rest: function.rest.as_ref().map(|r| Box::new(self.apply(r))),
                return_type: Box::new(self.apply(&function.return_type)),
            }),
            Type::Conditional(conditional) => Type::conditional(
                self.apply(&conditional.check),
                self.apply(&conditional.extends),
                self.apply(&conditional.then_type),
                self.apply(&conditional.else_type),
            ),
            Type::Primitive(_) | Type::Literal(_) | Type::Any | Type::Unknown | Type::Never => {
                ty.clone()
            }
        }
    }

    pub fn apply_shape(&self, shape: &ObjectShape) -> ObjectShape {
        ObjectShape {
            properties: shape
                .properties
                .iter()
                .map(|property| Property {
                    name: property.name.clone(),
                    ty: self.apply(&property.ty),
                    optional: property.optional,
                })
                .collect(),
            index: shape.index.as_ref().map(|index| IndexSignature {
                key: Box::new(self.apply(&index.key)),
                value: Box::new(self.apply(&index.value)),
            }),
        }
    }
}
