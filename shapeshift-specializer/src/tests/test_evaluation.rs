//! Tests for assignability and compile-time conditional evaluation

use crate::evaluation::{Branch, GuardOutcome, TypeEvaluator};
use crate::hierarchy::ClassHierarchy;
use crate::substitution::Substitution;
use pretty_assertions::assert_eq;
use shapeshift_program::{DeclarationId, ProgramBuilder, Property, Type};

fn hierarchy() -> ClassHierarchy {
    let mut builder = ProgramBuilder::new();
    builder
        .class("Animal", None)
        .class("Dog", Some("Animal"))
        .class("Puppy", Some("Dog"))
        .class("Rock", None);
    ClassHierarchy::from_program(&builder.build().unwrap())
}

fn param(index: usize) -> Type {
    Type::param(DeclarationId(0), index, format!("T{index}"))
}

#[test]
fn test_assignability_basics() {
    let hierarchy = hierarchy();
    let evaluator = TypeEvaluator::new(&hierarchy);

    assert!(evaluator.is_assignable(&Type::string_literal("a"), &Type::string()));
    assert!(!evaluator.is_assignable(&Type::string(), &Type::string_literal("a")));
    assert!(evaluator.is_assignable(&Type::number(), &Type::Unknown));
    assert!(evaluator.is_assignable(&Type::Never, &Type::number()));
    assert!(evaluator.is_assignable(
        &Type::number(),
        &Type::union(vec![Type::number(), Type::string()])
    ));
    assert!(!evaluator.is_assignable(
        &Type::union(vec![Type::number(), Type::string()]),
        &Type::number()
    ));
    assert!(evaluator.is_assignable(
        &Type::tuple(vec![Type::number(), Type::number()]),
        &Type::array(Type::number())
    ));
}

#[test]
fn test_subclasses_are_assignable_to_ancestors() {
    let hierarchy = hierarchy();
    let evaluator = TypeEvaluator::new(&hierarchy);

    assert!(evaluator.is_assignable(&Type::named("Puppy"), &Type::named("Animal")));
    assert!(!evaluator.is_assignable(&Type::named("Animal"), &Type::named("Dog")));
    assert!(!evaluator.is_assignable(&Type::named("Rock"), &Type::named("Animal")));
}

#[test]
fn test_object_shapes_are_structural() {
    let hierarchy = hierarchy();
    let evaluator = TypeEvaluator::new(&hierarchy);

    let wide = Type::object(vec![
        Property::new("width", Type::number_literal(3)),
        Property::new("color", Type::string_literal("red")),
    ]);
    let wanted = Type::object(vec![Property::new("width", Type::number())]);
    let optional = Type::object(vec![
        Property::new("width", Type::number()),
        Property::optional("depth", Type::number()),
    ]);

    assert!(evaluator.is_assignable(&wide, &wanted));
    assert!(evaluator.is_assignable(&wide, &optional));
    assert!(!evaluator.is_assignable(&wanted, &wide));
}

#[test]
fn test_conditional_selects_branch_by_assignability() {
    let hierarchy = hierarchy();
    let evaluator = TypeEvaluator::new(&hierarchy);
    let conditional = Type::conditional(param(0), Type::string(), Type::number(), Type::boolean());

    let mut substitution = Substitution::new();
    substitution.insert(DeclarationId(0), 0, Type::string_literal("x"));
    let evaluated = evaluator.instantiate(&conditional, &substitution);
    assert_eq!(evaluated.ty, Type::number());
    assert_eq!(evaluated.selections.len(), 1);
    assert_eq!(evaluated.selections[0].branch, Branch::Then);
    assert_eq!(evaluated.selections[0].check, Type::string_literal("x"));

    let mut substitution = Substitution::new();
    substitution.insert(DeclarationId(0), 0, Type::number());
    let evaluated = evaluator.instantiate(&conditional, &substitution);
    assert_eq!(evaluated.ty, Type::boolean());
    assert_eq!(evaluated.selections[0].branch, Branch::Else);
}

#[test]
fn test_conditional_distributes_over_unions() {
    let hierarchy = hierarchy();
    let evaluator = TypeEvaluator::new(&hierarchy);
    let conditional = Type::conditional(
        param(0),
        Type::string(),
        Type::array(param(0)),
        Type::Never,
    );

    let mut substitution = Substitution::new();
    substitution.insert(
        DeclarationId(0),
        0,
        Type::union(vec![Type::string(), Type::number(), Type::string_literal("a")]),
    );
    let evaluated = evaluator.instantiate(&conditional, &substitution);

    assert_eq!(
        evaluated.ty,
        Type::union(vec![
            Type::array(Type::string()),
            Type::array(Type::string_literal("a")),
        ])
    );
    let branches: Vec<Branch> = evaluated.selections.iter().map(|s| s.branch).collect();
    assert_eq!(branches, vec![Branch::Then, Branch::Else, Branch::Then]);
}

#[test]
fn test_any_selects_both_branches() {
    let hierarchy = hierarchy();
    let evaluator = TypeEvaluator::new(&hierarchy);
    let conditional = Type::conditional(param(0), Type::string(), Type::number(), Type::boolean());

    let mut substitution = Substitution::new();
    substitution.insert(DeclarationId(0), 0, Type::Any);
    let evaluated = evaluator.instantiate(&conditional, &substitution);

    assert_eq!(evaluated.ty, Type::union(vec![Type::number(), Type::boolean()]));
    assert_eq!(evaluated.selections[0].branch, Branch::Both);
}

#[test]
fn test_unresolved_conditionals_are_kept() {
    let hierarchy = hierarchy();
    let evaluator = TypeEvaluator::new(&hierarchy);
    let conditional = Type::conditional(param(1), Type::string(), Type::number(), Type::boolean());

    let mut substitution = Substitution::new();
    substitution.insert(DeclarationId(0), 0, Type::string());
    let evaluated = evaluator.instantiate(&conditional, &substitution);

    assert_eq!(evaluated.ty, conditional);
    assert!(evaluated.selections.is_empty());
}

#[test]
fn test_guard_resolution() {
    let hierarchy = hierarchy();
    let evaluator = TypeEvaluator::new(&hierarchy);

    assert_eq!(
        evaluator.resolve_guard(&Type::string_literal("a"), &Type::string()),
        GuardOutcome::Then
    );
    assert_eq!(
        evaluator.resolve_guard(&Type::number(), &Type::string()),
        GuardOutcome::Else
    );
    assert_eq!(
        evaluator.resolve_guard(
            &Type::union(vec![Type::number(), Type::string()]),
            &Type::string()
        ),
        GuardOutcome::Keep
    );
    assert_eq!(
        evaluator.resolve_guard(&param(0), &Type::string()),
        GuardOutcome::Keep
    );
}
