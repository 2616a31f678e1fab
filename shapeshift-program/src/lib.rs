//! Shapeshift Program Model
//!
//! Type-checked program snapshot consumed by the specialization pass.
//!
//! ## Contents
//!
//! - **Types**: closed representation of every type the checker can resolve
//! - **Declarations**: generic functions, methods and classes with their constraints
//! - **Call sites**: calls, constructions and references with resolved type arguments
//! - **Bodies**: typed statement IR carrying type guards and nested call sites
//! - **Builder**: id-allocating construction API used by front ends and tests

pub mod ast;
pub mod body;
pub mod builder;
pub mod error;
pub mod types;

pub use ast::{
    Argument, ArgumentKind, CallKind, CallSite, CallSiteId, ClassDeclaration,
    ConstraintDescriptor, DeclarationId, DeclarationKind, GenericDeclaration, Parameter, Program,
    Span, TypeParameter,
};
pub use body::{Body, Expression, LiteralValue, Statement, TypeGuard};
pub use builder::{CallSiteBuilder, DeclarationBuilder, ProgramBuilder};
pub use error::{ProgramError, ProgramResult};
pub use types::{
    ConditionalType, FunctionType, IndexSignature, LiteralType, ObjectShape, Primitive, Property,
    TupleElement, Type, TypeParamRef,
};

#[cfg(test)]
mod tests;
