//! Tests for incremental program construction

use crate::ast::{Argument, CallKind, ConstraintDescriptor, DeclarationId, DeclarationKind};
use crate::body::{Expression, Statement};
use crate::builder::ProgramBuilder;
use crate::types::{Property, Type};
use pretty_assertions::assert_eq;

#[test]
fn test_ids_follow_creation_order() {
    let mut builder = ProgramBuilder::new();
    let first = builder.function("first", |d| {
        d.type_param("T", ConstraintDescriptor::Unconstrained);
    });
    let second = builder.function("second", |d| {
        d.type_param("U", ConstraintDescriptor::Unconstrained);
    });
    assert_eq!(first, DeclarationId(0));
    assert_eq!(second, DeclarationId(1));

    let program = builder.build().unwrap();
    assert_eq!(program.declaration(second).unwrap().name, "second");
}

#[test]
fn test_type_param_refs_point_at_owner() {
    let mut builder = ProgramBuilder::new();
    let mut captured = None;
    let id = builder.function("identity", |d| {
        let t = d.type_param("T", ConstraintDescriptor::Unconstrained);
        d.param("value", t.clone()).returns(t.clone());
        captured = Some(t);
    });
    let program = builder.build().unwrap();
    let declaration = program.declaration(id).unwrap();

    assert_eq!(captured, declaration.type_param_ref(0));
    assert_eq!(declaration.return_type, Type::param(id, 0, "T"));
}

#[test]
fn test_nested_calls_record_enclosing_declaration() {
    let mut builder = ProgramBuilder::new();
    let inner = builder.function("inner", |d| {
        let t = d.type_param("T", ConstraintDescriptor::Unconstrained);
        d.param("value", t);
    });
    let outer = builder.function("outer", |d| {
        let u = d.type_param("U", ConstraintDescriptor::Unconstrained);
        d.param("value", u.clone());
        let site = d
            .call(inner)
            .type_arg(u.clone())
            .argument(Argument::value(u.clone()))
            .finish();
        d.statement(Statement::Expression(Expression::Call {
            call_site: site,
            callee: "inner".to_string(),
            arguments: vec![Expression::variable("value", u)],
            ty: Type::void(),
        }));
    });
    let top = builder
        .call(outer)
        .type_arg(Type::number())
        .argument(Argument::value(Type::number()))
        .finish();

    let program = builder.build().unwrap();
    let nested = &program.call_sites_for(inner)[0];
    assert_eq!(nested.enclosing, Some(outer));
    assert_eq!(program.call_site(top).unwrap().enclosing, None);
    assert_eq!(
        program.declaration(outer).unwrap().body.call_sites(),
        vec![nested.id]
    );
}

#[test]
fn test_methods_and_classes() {
    let mut builder = ProgramBuilder::new();
    builder.class("Shape", None).class("Circle", Some("Shape"));
    let method = builder.method("Shape", "with", |d| {
        let k = d.type_param("K", ConstraintDescriptor::Unconstrained);
        d.param("key", k).returns(Type::This);
    });
    builder
        .call(method)
        .type_arg(Type::string())
        .receiver(Type::named("Circle"))
        .kind(CallKind::Call)
        .finish();

    let program = builder.build().unwrap();
    let declaration = program.declaration(method).unwrap();
    assert_eq!(
        declaration.kind,
        DeclarationKind::Method {
            class: "Shape".to_string()
        }
    );
    assert!(declaration.is_self_typed());
    assert_eq!(declaration.display_name(), "Shape.with");
    assert!(program.is_declared_type("Circle"));
}

#[test]
fn test_object_literal_arguments() {
    let mut builder = ProgramBuilder::new();
    let target = builder.function("area", |d| {
        let t = d.type_param(
            "T",
            ConstraintDescriptor::Structural(vec![Property::new("width", Type::number())]),
        );
        d.param("shape", t);
    });
    let site = builder
        .call(target)
        .type_arg(Type::object(vec![Property::new("width", Type::number())]))
        .argument(Argument::object_literal(vec![Property::new(
            "width",
            Type::number(),
        )]))
        .finish();

    let program = builder.build().unwrap();
    assert!(program.call_site(site).unwrap().arguments[0].is_object_literal());
}
