//! Tests for treatment classification

use crate::classifier::{ClassificationTable, Feature, ShapeClassifier, Treatment};
use crate::collector::{InstantiationCollector, UnboundedReason};
use crate::config::{GenericStrategy, SpecializerConfig};
use crate::diagnostics::{Severity, SpecializationDiagnostic};
use crate::hierarchy::ClassHierarchy;
use pretty_assertions::assert_eq;
use shapeshift_program::{
    Argument, ConstraintDescriptor, DeclarationId, Expression, Program, ProgramBuilder, Property,
    Statement, Type, TypeGuard,
};

fn classify(
    program: &Program,
    config: &SpecializerConfig,
) -> (ClassificationTable, Vec<SpecializationDiagnostic>) {
    let instantiations = InstantiationCollector::new(program, config).collect();
    let hierarchy = ClassHierarchy::from_program(program);
    ShapeClassifier::new(program, &instantiations, &hierarchy, config).classify()
}

/// `name<T>(value: T): T extends string ? number : boolean`
fn conditional_function(builder: &mut ProgramBuilder, name: &str, exported: bool) -> DeclarationId {
    builder.function(name, |d| {
        let t = d.type_param("T", ConstraintDescriptor::Unconstrained);
        d.param("value", t.clone()).returns(Type::conditional(
            t,
            Type::string(),
            Type::number(),
            Type::boolean(),
        ));
        if exported {
            d.exported();
        }
    })
}

#[test]
fn test_unconstrained_and_nominal_parameters_stay_native() {
    let mut builder = ProgramBuilder::new();
    builder.declare_type("Comparable");
    let plain = builder.function("identity", |d| {
        let t = d.type_param("T", ConstraintDescriptor::Unconstrained);
        d.param("value", t.clone()).returns(t);
    });
    let nominal = builder.function("max", |d| {
        let t = d.type_param(
            "T",
            ConstraintDescriptor::Nominal(Type::named("Comparable")),
        );
        d.param("a", t.clone()).param("b", t.clone()).returns(t);
    });
    let program = builder.build().unwrap();

    let (table, diagnostics) = classify(&program, &SpecializerConfig::default());

    assert_eq!(table.treatment(plain), Some(Treatment::Native));
    assert_eq!(table.get(plain).unwrap().trigger, Feature::Unconstrained);
    assert_eq!(table.treatment(nominal), Some(Treatment::Native));
    assert_eq!(table.get(nominal).unwrap().trigger, Feature::NominalConstraint);
    assert!(diagnostics.is_empty());
}

#[test]
fn test_undeclared_nominal_constraint_warns() {
    let mut builder = ProgramBuilder::new();
    let id = builder.function("sortBy", |d| {
        d.type_param("T", ConstraintDescriptor::Nominal(Type::named("Missing")));
    });
    let program = builder.build().unwrap();

    let (table, diagnostics) = classify(&program, &SpecializerConfig::default());

    assert_eq!(table.treatment(id), Some(Treatment::Native));
    assert_eq!(table.get(id).unwrap().trigger, Feature::UndeclaredNominal);
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].severity(), Severity::Warning);
    assert_eq!(
        diagnostics[0].code_name(),
        "shapeshift::specialize::undeclared_nominal_constraint"
    );
}

#[test]
fn test_structural_constraints_need_adapters() {
    let mut builder = ProgramBuilder::new();
    let structural = builder.function("widthOf", |d| {
        d.type_param(
            "T",
            ConstraintDescriptor::Structural(vec![Property::new("width", Type::number())]),
        );
    });
    let indexed = builder.function("lookup", |d| {
        d.type_param(
            "T",
            ConstraintDescriptor::IndexSignature {
                key: Type::string(),
                value: Type::number(),
            },
        );
    });
    let program = builder.build().unwrap();

    let (table, _) = classify(&program, &SpecializerConfig::default());

    assert_eq!(table.treatment(structural), Some(Treatment::StructuralAdapter));
    assert_eq!(table.treatment(indexed), Some(Treatment::StructuralAdapter));
    assert_eq!(
        table.get(indexed).unwrap().trigger,
        Feature::IndexSignatureConstraint
    );
}

#[test]
fn test_conditional_return_specializes() {
    let mut builder = ProgramBuilder::new();
    let id = conditional_function(&mut builder, "convert", false);
    builder
        .call(id)
        .type_arg(Type::string())
        .argument(Argument::value(Type::string()))
        .finish();
    let program = builder.build().unwrap();

    let (table, diagnostics) = classify(&program, &SpecializerConfig::default());

    let classification = table.get(id).unwrap();
    assert_eq!(classification.treatment, Treatment::Specialize);
    assert_eq!(classification.trigger, Feature::ConditionalReturn);
    assert_eq!(classification.name, "convert");
    assert!(diagnostics.is_empty());
}

#[test]
fn test_type_guard_and_variadic_features() {
    let mut builder = ProgramBuilder::new();
    let guarded = builder.function("describe", |d| {
        let t = d.type_param("T", ConstraintDescriptor::Unconstrained);
        d.param("value", t.clone());
        d.statement(Statement::TypeGuard(TypeGuard {
            subject: Expression::variable("value", t),
            test: Type::string(),
            then_branch: vec![Statement::Return(Some(Expression::string("text")))],
            else_branch: vec![Statement::Return(Some(Expression::string("other")))],
        }));
    });
    let variadic = builder.function("call", |d| {
        let t = d.type_param("T", ConstraintDescriptor::Unconstrained);
        d.rest_param("args", t);
    });
    let program = builder.build().unwrap();

    let (table, _) = classify(&program, &SpecializerConfig::default());

    assert_eq!(table.treatment(guarded), Some(Treatment::Specialize));
    assert_eq!(
        table.get(guarded).unwrap().trigger,
        Feature::ConditionalTypeGuard
    );
    assert_eq!(table.treatment(variadic), Some(Treatment::Specialize));
    assert_eq!(
        table.get(variadic).unwrap().trigger,
        Feature::VariadicParameter
    );
}

#[test]
fn test_self_type_specializes_only_on_inheritance_chains() {
    let mut builder = ProgramBuilder::new();
    builder
        .class("Shape", None)
        .class("Circle", Some("Shape"))
        .class("Leaf", None);
    let chained = builder.method("Shape", "clone", |d| {
        d.returns(Type::This);
    });
    let single = builder.method("Leaf", "clone", |d| {
        d.returns(Type::This);
    });
    let program = builder.build().unwrap();

    let (table, _) = classify(&program, &SpecializerConfig::default());

    assert_eq!(table.treatment(chained), Some(Treatment::Specialize));
    assert_eq!(table.get(chained).unwrap().trigger, Feature::SelfType);
    assert_eq!(table.treatment(single), Some(Treatment::Native));
}

#[test]
fn test_strongest_feature_wins() {
    let mut builder = ProgramBuilder::new();
    let id = builder.function("measure", |d| {
        let t = d.type_param(
            "T",
            ConstraintDescriptor::Structural(vec![Property::new("width", Type::number())]),
        );
        d.param("value", t.clone()).returns(Type::conditional(
            t,
            Type::object(vec![Property::new("height", Type::number())]),
            Type::number(),
            Type::undefined(),
        ));
    });
    let program = builder.build().unwrap();

    let (table, _) = classify(&program, &SpecializerConfig::default());
    let classification = table.get(id).unwrap();

    assert_eq!(classification.treatment, Treatment::Specialize);
    assert_eq!(classification.trigger, Feature::ConditionalReturn);
    assert_eq!(
        classification.features,
        vec![Feature::StructuralConstraint, Feature::ConditionalReturn]
    );
}

#[test]
fn test_monomorphize_all_escalates_native_declarations() {
    let mut builder = ProgramBuilder::new();
    let id = builder.function("pick", |d| {
        let t = d.type_param("T", ConstraintDescriptor::Unconstrained);
        d.param("value", t.clone()).returns(t);
    });
    builder.call(id).type_arg(Type::number()).finish();
    let program = builder.build().unwrap();

    let config = SpecializerConfig::new().with_generic_strategy(GenericStrategy::MonomorphizeAll);
    let (table, _) = classify(&program, &config);

    assert_eq!(table.treatment(id), Some(Treatment::Specialize));
    assert_eq!(table.get(id).unwrap().trigger, Feature::Unconstrained);
}

#[test]
fn test_unbounded_sets_propagate_to_dependent_declarations() {
    let mut builder = ProgramBuilder::new();
    let inner = conditional_function(&mut builder, "inner", false);
    let outer = builder.function("outer", |d| {
        let t = d.type_param("T", ConstraintDescriptor::Unconstrained);
        d.param("value", t.clone()).returns(Type::conditional(
            t.clone(),
            Type::number(),
            Type::string(),
            Type::boolean(),
        ));
        let site = d
            .call(inner)
            .type_arg(t.clone())
            .argument(Argument::value(t.clone()))
            .finish();
        d.statement(Statement::Expression(Expression::Call {
            call_site: site,
            callee: "inner".to_string(),
            arguments: vec![Expression::variable("value", t.clone())],
            ty: Type::Unknown,
        }));
        d.exported();
    });
    let program = builder.build().unwrap();

    let (table, diagnostics) = classify(&program, &SpecializerConfig::default());

    assert_eq!(table.treatment(outer), Some(Treatment::Unsupported));
    assert_eq!(
        table.get(outer).unwrap().unbounded,
        Some(UnboundedReason::ExportedWithoutCallSites)
    );
    assert_eq!(table.treatment(inner), Some(Treatment::Unsupported));
    assert_eq!(
        table.get(inner).unwrap().unbounded,
        Some(UnboundedReason::DependentOnUnspecialized { enclosing: outer })
    );

    let mut declarations: Vec<DeclarationId> =
        diagnostics.iter().map(|d| d.declaration()).collect();
    declarations.sort();
    assert_eq!(declarations, vec![inner, outer]);
    assert!(diagnostics.iter().all(|d| d.severity() == Severity::Error));
}

#[test]
fn test_parallel_classification_matches_sequential() {
    let mut builder = ProgramBuilder::new();
    builder.declare_type("Comparable");
    for index in 0..24 {
        let name = format!("f{index}");
        let id = match index % 3 {
            0 => conditional_function(&mut builder, &name, false),
            1 => builder.function(name, |d| {
                d.type_param(
                    "T",
                    ConstraintDescriptor::Structural(vec![Property::new("id", Type::number())]),
                );
            }),
            _ => builder.function(name, |d| {
                d.type_param(
                    "T",
                    ConstraintDescriptor::Nominal(Type::named("Comparable")),
                );
            }),
        };
        if index % 3 == 0 {
            builder.call(id).type_arg(Type::number()).finish();
        }
    }
    let program = builder.build().unwrap();

    let sequential = classify(&program, &SpecializerConfig::default());
    let parallel = classify(&program, &SpecializerConfig::new().with_parallel(true));

    assert_eq!(sequential, parallel);
}
