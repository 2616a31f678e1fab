//! Compile-time evaluation of type-level computation over the closed type representation
//!
//! Conditional types are resolved against concrete bindings by assignability.
//! A conditional whose check is a naked type parameter distributes over a
//! union bound to that parameter, and an `any` check selects both branches.

use crate::collector::canonicalize;
use crate::hierarchy::ClassHierarchy;
use crate::substitution::Substitution;
use shapeshift_program::{ConditionalType, FunctionType, ObjectShape, Primitive, TupleElement, Type};
use std::fmt;

/// Which branch of a conditional type was taken
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Branch {
    Then,
    Else,
    /// `any` as check type selects both branches
    Both,
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Branch::Then => write!(f, "then"),
            Branch::Else => write!(f, "else"),
            Branch::Both => write!(f, "both"),
        }
    }
}

/// Record of one conditional evaluation
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BranchSelection {
    /// The conditional as written in the declaration
    pub conditional: String,
    /// Concrete check type the branch was selected for
    pub check: Type,
    pub branch: Branch,
}

/// A type with every resolvable conditional evaluated
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluated {
    pub ty: Type,
    pub selections: Vec<BranchSelection>,
}

/// Static outcome of a body-level type guard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardOutcome {
    /// Subject is always assignable to the test type
    Then,
    /// Subject and test type are disjoint
    Else,
    /// Subject may or may not match; keep the guard as ordinary narrowing
    Keep,
}

/// Assignability and conditional evaluation against a class hierarchy
#[derive(Debug, Clone, Copy)]
pub struct TypeEvaluator<'a> {
    hierarchy: &'a ClassHierarchy,
}

impl<'a> TypeEvaluator<'a> {
    pub fn new(hierarchy: &'a ClassHierarchy) -> Self {
        Self { hierarchy }
    }

    /// Check whether a value of type `source` can be used where `target` is expected
    pub fn is_assignable(&self, source: &Type, target: &Type) -> bool {
        if source == target {
            return true;
        }

        match (source, target) {
            (_, Type::Any | Type::Unknown) => true,
            (Type::Any | Type::Never, _) => true,
            (Type::Union(members), _) => members.iter().all(|m| self.is_assignable(m, target)),
            (_, Type::Union(members)) => members.iter().any(|m| self.is_assignable(source, m)),

            (Type::Literal(literal), Type::Primitive(primitive)) => literal.widened() == *primitive,
            (Type::Primitive(Primitive::Undefined), Type::Primitive(Primitive::Void)) => true,

            (
                Type::Named { name, args },
                Type::Named {
                    name: target_name,
                    args: target_args,
                },
            ) => {
                if name == target_name {
                    args.len() == target_args.len()
                        && args
                            .iter()
                            .zip(target_args)
                            .all(|(a, b)| self.is_assignable(a, b))
                } else {
                    args.is_empty()
                        && target_args.is_empty()
                        && self.hierarchy.is_subclass_of(name, target_name)
                }
            }

            (Type::Array(element), Type::Array(target_element)) => {
                self.is_assignable(element, target_element)
            }
            (Type::Tuple(elements), Type::Array(target_element)) => elements
                .iter()
                .all(|e| self.is_assignable(&e.ty, target_element)),
            (Type::Tuple(elements), Type::Tuple(target_elements)) => {
                self.tuple_assignable(elements, target_elements)
            }

            (Type::Object(shape), Type::Object(target_shape)) => {
                self.shape_assignable(shape, target_shape)
            }

            (Type::Function(function), Type::Function(target_function)) => {
                self.function_assignable(function, target_function)
            }

            _ => false,
        }
    }

    fn tuple_assignable(&self, elements: &[TupleElement], targets: &[TupleElement]) -> bool {
        let required = targets.iter().filter(|t| !t.optional && !t.rest).count();
        if elements.len() < required {
            return false;
        }
        let mut targets_iter = targets.iter();
        let mut rest_target: Option<&TupleElement> = None;
        for element in elements {
            let target = match rest_target {
                Some(rest) => rest,
                None => match targets_iter.next() {
                    Some(t) if t.rest => {
                        rest_target = Some(t);
                        t
                    }
                    Some(t) => t,
                    None => return false,
                },
            };
            let target_ty = match (&target.ty, target.rest) {
                (Type::Array(inner), true) => inner.as_ref(),
                (ty, _) => ty,
            };
            if !self.is_assignable(&element.ty, target_ty) {
                return false;
            }
        }
        true
    }

    fn shape_assignable(&self, shape: &ObjectShape, target: &ObjectShape) -> bool {
        let properties_ok = target.properties.iter().all(|wanted| {
            match shape.property(&wanted.name) {
                Some(found) => {
                    (wanted.optional || !found.optional) && self.is_assignable(&found.ty, &wanted.ty)
                }
                None => wanted.optional,
            }
        });
        let index_ok = match &target.index {
            Some(index) => shape
                .properties
                .iter()
                .all(|p| self.is_assignable(&p.ty, &index.value)),
            None => true,
        };
        properties_ok && index_ok
    }

    fn function_assignable(&self, function: &FunctionType, target: &FunctionType) -> bool {
        function.params.len() <= target.params.len()
            && function
                .params
                .iter()
                .zip(&target.params)
                .all(|(param, target_param)| self.is_assignable(target_param, param))
            && self.is_assignable(&function.return_type, &target.return_type)
    }

    /// Check whether values of the two types can coincide
    pub fn overlaps(&self, a: &Type, b: &Type) -> bool {
        match (a, b) {
            (Type::Union(members), _) => members.iter().any(|m| self.overlaps(m, b)),
            (_, Type::Union(members)) => members.iter().any(|m| self.overlaps(a, m)),
            _ => self.is_assignable(a, b) || self.is_assignable(b, a),
        }
    }

    /// Decide a type guard statically
    pub fn resolve_guard(&self, subject: &Type, test: &Type) -> GuardOutcome {
        if !subject.is_concrete() || !test.is_concrete() {
            return GuardOutcome::Keep;
        }
        if self.is_assignable(subject, test) {
            GuardOutcome::Then
        } else if !self.overlaps(subject, test) {
            GuardOutcome::Else
        } else {
            GuardOutcome::Keep
        }
    }

    /// Substitute `substitution` into `ty` and evaluate every conditional that becomes decidable
    pub fn instantiate(&self, ty: &Type, substitution: &Substitution) -> Evaluated {
        let mut selections = Vec::new();
        let ty = canonicalize(&self.instantiate_into(ty, substitution, &mut selections));
        Evaluated { ty, selections }
    }

    fn instantiate_into(
        &self,
        ty: &Type,
        substitution: &Substitution,
        selections: &mut Vec<BranchSelection>,
    ) -> Type {
        match ty {
            Type::Conditional(conditional) => {
                self.evaluate_conditional(conditional, substitution, selections)
            }
            Type::Named { name, args } => Type::Named {
                name: name.clone(),
                args: args
                    .iter()
                    .map(|arg| self.instantiate_into(arg, substitution, selections))
                    .collect(),
            },
            Type::Array(element) => {
                Type::array(self.instantiate_into(element, substitution, selections))
            }
            Type::Tuple(elements) => Type::Tuple(
                elements
                    .iter()
                    .map(|element| TupleElement {
                        ty: self.instantiate_into(&element.ty, substitution, selections),
                        optional: element.optional,
                        rest: element.rest,
                    })
                    .collect(),
            ),
            Type::Object(shape) => {
                let mut instantiated = substitution.apply_shape(shape);
                for (property, original) in instantiated.properties.iter_mut().zip(&shape.properties)
                {
                    property.ty = self.instantiate_into(&original.ty, substitution, selections);
                }
                Type::Object(instantiated)
            }
            Type::Union(members) => Type::Union(
                members
                    .iter()
                    .map(|m| self.instantiate_into(m, substitution, selections))
                    .collect(),
            ),
            Type::Function(function) => Type::Function(FunctionType {
                params: function
                    .params
                    .iter()
                    .map(|p| self.instantiate_into(p, substitution, selections))
                    .collect(),
                rest: function
                    .rest
                    .as_ref()
                    .map(|r| Box::new(self.instantiate_into(r, substitution, selections))),
                return_type: Box::new(self.instantiate_into(
                    &function.return_type,
                    substitution,
                    selections,
                )),
            }),
            other => substitution.apply(other),
        }
    }

    fn evaluate_conditional(
        &self,
        conditional: &ConditionalType,
        substitution: &Substitution,
        selections: &mut Vec<BranchSelection>,
    ) -> Type {
        // Distribute over a union bound to a naked type parameter
        if let Type::Param(param) = conditional.check.as_ref() {
            if let Some(Type::Union(members)) = substitution.get(param.owner, param.index) {
                let results = members
                    .iter()
                    .map(|member| {
                        let mut narrowed = substitution.clone();
                        narrowed.insert(param.owner, param.index, member.clone());
                        self.evaluate_conditional(conditional, &narrowed, selections)
                    })
                    .collect();
                return canonicalize(&Type::Union(results));
            }
            if let Some(Type::Never) = substitution.get(param.owner, param.index) {
                return Type::Never;
            }
        }

        let check = self.instantiate_into(&conditional.check, substitution, selections);
        let extends = self.instantiate_into(&conditional.extends, substitution, selections);

        if !check.is_concrete() || !extends.is_concrete() {
            return Type::conditional(
                check,
                extends,
                substitution.apply(&conditional.then_type),
                substitution.apply(&conditional.else_type),
            );
        }

        let written = Type::Conditional(conditional.clone()).to_string();
        let branch = if check == Type::Any {
            Branch::Both
        } else if self.is_assignable(&check, &extends) {
            Branch::Then
        } else {
            Branch::Else
        };
        selections.push(BranchSelection {
            conditional: written,
            check,
            branch,
        });

        match branch {
            Branch::Then => self.instantiate_into(&conditional.then_type, substitution, selections),
            Branch::Else => self.instantiate_into(&conditional.else_type, substitution, selections),
            Branch::Both => {
                let then_type = self.instantiate_into(&conditional.then_type, substitution, selections);
                let else_type = self.instantiate_into(&conditional.else_type, substitution, selections);
                canonicalize(&Type::Union(vec![then_type, else_type]))
            }
        }
    }
}
