//! Tests for type queries and display

use crate::ast::DeclarationId;
use crate::types::{Property, Type};
use pretty_assertions::assert_eq;

fn param(index: usize, name: &str) -> Type {
    Type::param(DeclarationId(0), index, name)
}

#[test]
fn test_display_uses_source_syntax() {
    let ty = Type::object(vec![
        Property::new("width", Type::number()),
        Property::optional("label", Type::string()),
    ]);
    assert_eq!(ty.to_string(), "{ width: number; label?: string }");

    let union = Type::array(Type::union(vec![Type::string_literal("a"), Type::number()]));
    assert_eq!(union.to_string(), "(\"a\" | number)[]");

    let generic = Type::generic_named("Map", vec![Type::string(), param(0, "T")]);
    assert_eq!(generic.to_string(), "Map<string, T>");
}

#[test]
fn test_mentions_params_of_owner() {
    let ty = Type::array(Type::param(DeclarationId(3), 0, "T"));
    assert!(ty.mentions_params());
    assert!(ty.mentions_params_of(DeclarationId(3)));
    assert!(!ty.mentions_params_of(DeclarationId(4)));
}

#[test]
fn test_concreteness() {
    assert!(Type::tuple(vec![Type::number(), Type::string()]).is_concrete());
    assert!(!Type::array(param(0, "T")).is_concrete());
    assert!(!Type::This.is_concrete());
    let conditional = Type::conditional(
        Type::number(),
        Type::string(),
        Type::boolean_literal(true),
        Type::boolean_literal(false),
    );
    assert!(!conditional.is_concrete());
}

#[test]
fn test_dependent_conditionals() {
    let t = param(0, "T");
    let ty = Type::array(Type::conditional(
        t.clone(),
        Type::string(),
        Type::number(),
        Type::boolean(),
    ));
    assert_eq!(ty.dependent_conditionals(DeclarationId(0)).len(), 1);
    assert!(ty.dependent_conditionals(DeclarationId(1)).is_empty());
}

#[test]
fn test_depth() {
    assert_eq!(Type::number().depth(), 1);
    assert_eq!(Type::array(Type::number()).depth(), 2);
    assert_eq!(
        Type::array(Type::array(Type::tuple(vec![Type::number()]))).depth(),
        4
    );
}

#[test]
fn test_widening() {
    let ty = Type::object(vec![
        Property::new("kind", Type::string_literal("circle")),
        Property::new("size", Type::number_literal(3)),
    ]);
    let expected = Type::object(vec![
        Property::new("kind", Type::string()),
        Property::new("size", Type::number()),
    ]);
    assert_eq!(ty.widened(), expected);
}
