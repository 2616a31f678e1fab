// Shapeshift Program Errors
// Precondition violations in the program handed over by the front end

use crate::ast::{CallSiteId, DeclarationId};
use miette::Diagnostic;
use thiserror::Error;

/// Malformed upstream input. These are front-end bugs, not user diagnostics.
#[derive(Error, Diagnostic, Debug, Clone, PartialEq)]
pub enum ProgramError {
    #[error("Declaration {declaration} ({name}) is defined more than once")]
    #[diagnostic(
        code(shapeshift::program::duplicate_declaration),
        help("Declaration ids must be unique for the whole pass")
    )]
    DuplicateDeclaration {
        declaration: DeclarationId,
        name: String,
    },

    #[error("Call site {call_site} is defined more than once")]
    #[diagnostic(code(shapeshift::program::duplicate_call_site))]
    DuplicateCallSite { call_site: CallSiteId },

    #[error("Call site {call_site} references unknown declaration {declaration}")]
    #[diagnostic(
        code(shapeshift::program::unknown_declaration),
        help("Every call site must resolve to a declaration in the compiled unit")
    )]
    UnknownDeclaration {
        call_site: CallSiteId,
        declaration: DeclarationId,
    },

    #[error("Call site {call_site} passes {found} type arguments to {name}, which declares {expected}")]
    #[diagnostic(code(shapeshift::program::too_many_type_arguments))]
    TooManyTypeArguments {
        call_site: CallSiteId,
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("Call site {call_site} omits type argument {parameter} (#{index}) of {name}, which has no default")]
    #[diagnostic(
        code(shapeshift::program::missing_type_argument),
        help("The checker must resolve every type argument without a declared default")
    )]
    MissingTypeArgument {
        call_site: CallSiteId,
        name: String,
        parameter: String,
        index: usize,
    },

    #[error("Call site {call_site} has open type arguments but no enclosing generic declaration")]
    #[diagnostic(code(shapeshift::program::open_type_arguments))]
    OpenTypeArguments { call_site: CallSiteId },

    #[error("Argument {index} at call site {call_site} is marked as an object literal but is not an object type")]
    #[diagnostic(code(shapeshift::program::literal_not_object))]
    LiteralArgumentNotObject { call_site: CallSiteId, index: usize },

    #[error("{name} declares more than one rest parameter")]
    #[diagnostic(code(shapeshift::program::multiple_rest_parameters))]
    MultipleRestParameters {
        declaration: DeclarationId,
        name: String,
    },

    #[error("The rest parameter of {name} is not its last parameter")]
    #[diagnostic(code(shapeshift::program::rest_parameter_not_last))]
    RestParameterNotLast {
        declaration: DeclarationId,
        name: String,
    },

    #[error("Class {class} extends unknown class {superclass}")]
    #[diagnostic(code(shapeshift::program::unknown_superclass))]
    UnknownSuperclass { class: String, superclass: String },
}

pub type ProgramResult<T> = Result<T, ProgramError>;
