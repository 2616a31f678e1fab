//! Tests for instantiation collection

use crate::collector::{canonicalize, InstantiationCollector, InstantiationKey, UnboundedReason};
use crate::config::{ExportPolicy, SpecializerConfig};
use pretty_assertions::assert_eq;
use shapeshift_program::{
    Argument, CallKind, ConstraintDescriptor, DeclarationId, Expression, Program, ProgramBuilder,
    Property, Statement, Type,
};

fn unconstrained_function(builder: &mut ProgramBuilder, name: &str) -> DeclarationId {
    builder.function(name, |d| {
        let t = d.type_param("T", ConstraintDescriptor::Unconstrained);
        d.param("value", t.clone()).returns(t);
    })
}

/// `outer<U>(value: U)` whose body calls `inner<U>(value)`
fn nested_program() -> (Program, DeclarationId, DeclarationId) {
    let mut builder = ProgramBuilder::new();
    let inner = unconstrained_function(&mut builder, "inner");
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
            arguments: vec![Expression::variable("value", u.clone())],
            ty: u,
        }));
    });
    builder
        .call(outer)
        .type_arg(Type::string())
        .argument(Argument::value(Type::string()))
        .finish();
    (builder.build().unwrap(), inner, outer)
}

#[test]
fn test_canonicalize_sorts_and_flattens_unions() {
    let nested = Type::union(vec![
        Type::string(),
        Type::union(vec![Type::number(), Type::string()]),
        Type::Never,
    ]);
    assert_eq!(
        canonicalize(&nested),
        Type::union(vec![Type::number(), Type::string()])
    );
    assert_eq!(
        canonicalize(&Type::union(vec![Type::number(), Type::Any])),
        Type::Any
    );
    assert_eq!(
        canonicalize(&Type::union(vec![Type::boolean()])),
        Type::boolean()
    );
}

#[test]
fn test_structurally_equal_tuples_share_one_key() {
    let mut builder = ProgramBuilder::new();
    let pick = unconstrained_function(&mut builder, "pick");
    let first = builder
        .call(pick)
        .type_arg(Type::union(vec![Type::string(), Type::number()]))
        .finish();
    let second = builder
        .call(pick)
        .type_arg(Type::union(vec![Type::number(), Type::string()]))
        .finish();
    builder
        .call(pick)
        .type_arg(Type::object(vec![
            Property::new("b", Type::number()),
            Property::new("a", Type::string()),
        ]))
        .finish();
    builder
        .call(pick)
        .type_arg(Type::object(vec![
            Property::new("a", Type::string()),
            Property::new("b", Type::number()),
        ]))
        .finish();
    let program = builder.build().unwrap();

    let set = InstantiationCollector::new(&program, &SpecializerConfig::default()).collect();

    assert_eq!(set.instantiation_count(pick), 2);
    assert_eq!(set.records().len(), 4);

    let union_key = set.record_for(first).unwrap().key.clone();
    assert_eq!(union_key.as_str(), "0:_7u_0number_2string_1");
    assert_eq!(set.record_for(second).unwrap().key, union_key);
    assert_eq!(set.call_sites(&union_key), &[first, second]);

    let keys: Vec<&InstantiationKey> = set.instantiations(pick).map(|(key, _)| key).collect();
    assert_eq!(
        keys.iter().map(|k| k.as_str()).collect::<Vec<_>>(),
        vec!["0:_6_0a_0string_1_2b_0number_1_1", "0:_7u_0number_2string_1"]
    );
}

#[test]
fn test_defaults_fill_omitted_type_arguments() {
    let mut builder = ProgramBuilder::new();
    let wrap = builder.function("wrap", |d| {
        let t = d.type_param("T", ConstraintDescriptor::Unconstrained);
        d.type_param_with_default(
            "C",
            ConstraintDescriptor::Unconstrained,
            Type::array(t.clone()),
        );
        d.param("value", t);
    });
    let site = builder.call(wrap).type_arg(Type::number()).finish();
    let program = builder.build().unwrap();

    let set = InstantiationCollector::new(&program, &SpecializerConfig::default()).collect();
    let record = set.record_for(site).unwrap();

    assert_eq!(
        record.tuple.type_args,
        vec![Type::number(), Type::array(Type::number())]
    );
}

#[test]
fn test_references_make_the_set_unbounded() {
    let mut builder = ProgramBuilder::new();
    let pick = unconstrained_function(&mut builder, "pick");
    builder.call(pick).type_arg(Type::number()).finish();
    let reference = builder.call(pick).kind(CallKind::Reference).finish();
    let program = builder.build().unwrap();

    let set = InstantiationCollector::new(&program, &SpecializerConfig::default()).collect();

    assert_eq!(
        set.unbounded_reason(pick),
        Some(&UnboundedReason::EscapingReference {
            call_site: reference
        })
    );
    assert_eq!(set.records().len(), 1);
}

#[test]
fn test_open_calls_inside_generic_bodies_are_dependent_uses() {
    let (program, inner, outer) = nested_program();
    let set = InstantiationCollector::new(&program, &SpecializerConfig::default()).collect();

    assert_eq!(set.instantiation_count(inner), 0);
    assert_eq!(set.instantiation_count(outer), 1);

    let uses = set.dependent_uses_in(outer);
    assert_eq!(uses.len(), 1);
    assert_eq!(uses[0].target, inner);
    assert_eq!(uses[0].type_args, vec![Type::param(outer, 0, "U")]);
    assert_eq!(set.dependent_uses_of(inner).len(), 1);
}

#[test]
fn test_export_policy() {
    let mut builder = ProgramBuilder::new();
    let uncalled = builder.function("identity", |d| {
        let t = d.type_param("T", ConstraintDescriptor::Unconstrained);
        d.param("value", t.clone()).returns(t).exported();
    });
    let called = builder.function("pick", |d| {
        let t = d.type_param("T", ConstraintDescriptor::Unconstrained);
        d.param("value", t.clone()).returns(t).exported();
    });
    builder.call(called).type_arg(Type::number()).finish();
    let program = builder.build().unwrap();

    let set = InstantiationCollector::new(&program, &SpecializerConfig::default()).collect();
    assert_eq!(
        set.unbounded_reason(uncalled),
        Some(&UnboundedReason::ExportedWithoutCallSites)
    );
    assert!(!set.is_unbounded(called));

    let strict = SpecializerConfig::new().with_export_policy(ExportPolicy::AlwaysUnbounded);
    let set = InstantiationCollector::new(&program, &strict).collect();
    assert_eq!(
        set.unbounded_reason(called),
        Some(&UnboundedReason::ExportedSurface)
    );
    assert_eq!(
        set.unbounded_reason(uncalled),
        Some(&UnboundedReason::ExportedSurface)
    );
}

#[test]
fn test_collection_order_does_not_depend_on_call_site_order() {
    let build = |reverse: bool| {
        let mut builder = ProgramBuilder::new();
        let pick = unconstrained_function(&mut builder, "pick");
        let mut args = vec![Type::number(), Type::string(), Type::boolean()];
        if reverse {
            args.reverse();
        }
        for arg in args {
            builder.call(pick).type_arg(arg).finish();
        }
        let program = builder.build().unwrap();
        let set = InstantiationCollector::new(&program, &SpecializerConfig::default()).collect();
        set.instantiations(pick)
            .map(|(key, tuple)| (key.clone(), tuple.clone()))
            .collect::<Vec<_>>()
    };

    assert_eq!(build(false), build(true));
}
