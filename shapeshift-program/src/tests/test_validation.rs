//! Tests for program precondition checks

use crate::ast::{Argument, ArgumentKind, CallKind, ConstraintDescriptor, DeclarationId};
use crate::builder::ProgramBuilder;
use crate::error::ProgramError;
use crate::types::Type;
use pretty_assertions::assert_eq;

fn identity(builder: &mut ProgramBuilder) -> DeclarationId {
    builder.function("identity", |d| {
        let t = d.type_param("T", ConstraintDescriptor::Unconstrained);
        d.param("value", t.clone()).returns(t);
    })
}

#[test]
fn test_unknown_target_is_rejected() {
    let mut builder = ProgramBuilder::new();
    let site = builder.call(DeclarationId(42)).finish();
    let error = builder.build().unwrap_err();
    assert_eq!(
        error,
        ProgramError::UnknownDeclaration {
            call_site: site,
            declaration: DeclarationId(42),
        }
    );
}

#[test]
fn test_missing_type_argument_without_default() {
    let mut builder = ProgramBuilder::new();
    let target = identity(&mut builder);
    builder.call(target).finish();
    assert!(matches!(
        builder.build(),
        Err(ProgramError::MissingTypeArgument { index: 0, .. })
    ));
}

#[test]
fn test_missing_type_argument_with_default_is_accepted() {
    let mut builder = ProgramBuilder::new();
    let target = builder.function("wrap", |d| {
        d.type_param_with_default("T", ConstraintDescriptor::Unconstrained, Type::string());
    });
    builder.call(target).finish();
    assert!(builder.build().is_ok());
}

#[test]
fn test_references_may_omit_type_arguments() {
    let mut builder = ProgramBuilder::new();
    let target = identity(&mut builder);
    builder.call(target).kind(CallKind::Reference).finish();
    assert!(builder.build().is_ok());
}

#[test]
fn test_too_many_type_arguments() {
    let mut builder = ProgramBuilder::new();
    let target = identity(&mut builder);
    builder
        .call(target)
        .type_args(vec![Type::number(), Type::string()])
        .finish();
    assert!(matches!(
        builder.build(),
        Err(ProgramError::TooManyTypeArguments {
            expected: 1,
            found: 2,
            ..
        })
    ));
}

#[test]
fn test_open_type_arguments_need_enclosing_declaration() {
    let mut builder = ProgramBuilder::new();
    let target = identity(&mut builder);
    builder
        .call(target)
        .type_arg(Type::param(target, 0, "T"))
        .finish();
    assert!(matches!(
        builder.build(),
        Err(ProgramError::OpenTypeArguments { .. })
    ));
}

#[test]
fn test_top_level_receiver_cannot_mention_this() {
    let mut builder = ProgramBuilder::new();
    builder.class("Shape", None);
    let clone = builder.method("Shape", "clone", |d| {
        d.returns(Type::This);
    });
    let site = builder.call(clone).receiver(Type::This).finish();
    assert_eq!(
        builder.build(),
        Err(ProgramError::OpenTypeArguments { call_site: site })
    );
}

#[test]
fn test_rest_parameter_must_be_last() {
    let mut builder = ProgramBuilder::new();
    builder.function("spread", |d| {
        let t = d.type_param("T", ConstraintDescriptor::Unconstrained);
        d.rest_param("items", t.clone()).param("last", t);
    });
    assert!(matches!(
        builder.build(),
        Err(ProgramError::RestParameterNotLast { .. })
    ));
}

#[test]
fn test_unknown_superclass() {
    let mut builder = ProgramBuilder::new();
    builder.class("Circle", Some("Shape"));
    assert_eq!(
        builder.build().unwrap_err(),
        ProgramError::UnknownSuperclass {
            class: "Circle".to_string(),
            superclass: "Shape".to_string(),
        }
    );
}

#[test]
fn test_object_literal_argument_must_be_object() {
    let mut builder = ProgramBuilder::new();
    let target = identity(&mut builder);
    builder
        .call(target)
        .type_arg(Type::number())
        .argument(Argument {
            ty: Type::number(),
            kind: ArgumentKind::ObjectLiteral,
        })
        .finish();
    assert!(matches!(
        builder.build(),
        Err(ProgramError::LiteralArgumentNotObject { index: 0, .. })
    ));
}
