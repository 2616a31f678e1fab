//! Fatal errors for the specialization pass
//!
//! User-facing problems are accumulated as diagnostics (see `diagnostics`);
//! everything here aborts the pass.

use miette::Diagnostic;
use shapeshift_program::{DeclarationId, ProgramError};
use thiserror::Error;

/// Errors that stop the pass for the whole compiled unit
#[derive(Error, Diagnostic, Debug, Clone, PartialEq)]
pub enum SpecializerError {
    #[error("Generated name {name} is claimed by both {first} and {second}")]
    #[diagnostic(
        code(shapeshift::specialize::name_collision),
        help("The type serializer must be injective; this is a bug in the naming scheme")
    )]
    NameCollision {
        name: String,
        first: String,
        second: String,
    },

    #[error("Declaration {declaration} is referenced but missing from the program")]
    #[diagnostic(code(shapeshift::specialize::unknown_declaration))]
    UnknownDeclaration { declaration: DeclarationId },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Program(#[from] ProgramError),
}

pub type SpecializerResult<T> = Result<T, SpecializerError>;
