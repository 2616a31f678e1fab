//! Adapter synthesis for structurally constrained generics
//!
//! A structural constraint becomes one nominal interface per canonical shape.
//! Object literals passed for a constrained parameter are replaced by a
//! wrapper type implementing that interface, one wrapper per distinct
//! literal signature; other values are converted by a copy routine invoked
//! at the call site.

use crate::classifier::{ClassificationTable, Feature, Treatment};
use crate::collector::{canonicalize, canonicalize_shape, InstantiationSet};
use crate::diagnostics::SpecializationDiagnostic;
use crate::evaluation::TypeEvaluator;
use crate::hierarchy::ClassHierarchy;
use crate::naming::{copy_helper_name, interface_name, wrapper_name};
use indexmap::IndexMap;
use shapeshift_program::{
    Argument, CallKind, CallSiteId, ConstraintDescriptor, DeclarationId, GenericDeclaration,
    LiteralType, ObjectShape, Primitive, Program, Property, Type,
};
use tracing::{debug, info, instrument};

/// Where a wrapper field comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldOrigin {
    /// Member required by the interface
    Constraint,
    /// Extra literal property kept as an ordinary member
    Extra,
    /// Literal property admitted by the interface's index signature
    Indexed,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WrapperField {
    pub name: String,
    pub ty: Type,
    pub optional: bool,
    pub origin: FieldOrigin,
}

/// Nominal type implementing an adapter interface for one literal signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrapperPlan {
    /// Sorted, widened property list actually present on the literal
    pub signature: ObjectShape,
    pub name: String,
    pub interface: String,
    pub fields: Vec<WrapperField>,
}

impl WrapperPlan {
    /// Check that this wrapper exposes every member of `plan`'s interface with the declared type
    pub fn satisfies(&self, plan: &AdapterPlan) -> bool {
        let members_ok = plan.shape.properties.iter().all(|member| {
            match self.fields.iter().find(|f| f.name == member.name) {
                Some(field) => field.ty == member.ty && (member.optional || !field.optional),
                None => member.optional,
            }
        });
        let index_ok = match &plan.shape.index {
            Some(index) => self
                .fields
                .iter()
                .filter(|f| f.origin == FieldOrigin::Indexed)
                .all(|f| f.ty == *index.value),
            None => !self.fields.iter().any(|f| f.origin == FieldOrigin::Indexed),
        };
        self.interface == plan.interface && members_ok && index_ok
    }

    /// Extra members beyond the interface, sorted by name
    pub fn extras(&self) -> impl Iterator<Item = &WrapperField> {
        self.fields
            .iter()
            .filter(|f| f.origin == FieldOrigin::Extra)
    }
}

/// Routine copying a non-literal value into a fresh interface instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyHelperPlan {
    pub source: Type,
    pub name: String,
    pub interface: String,
    /// Members copied from the source
    pub members: Vec<Property>,
}

/// Synthesized interface for one canonical constraint shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterPlan {
    pub shape: ObjectShape,
    pub interface: String,
    pub wrappers: Vec<WrapperPlan>,
    pub copy_helpers: Vec<CopyHelperPlan>,
}

impl AdapterPlan {
    pub fn wrapper(&self, name: &str) -> Option<&WrapperPlan> {
        self.wrappers.iter().find(|w| w.name == name)
    }
}

/// How one argument is adapted at a call site
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArgumentAdaptation {
    /// Construct `wrapper` in place of the literal at position `argument`
    Wrap {
        argument: usize,
        wrapper: String,
        interface: String,
    },
    /// Pass the value at position `argument` through `helper`
    Copy {
        argument: usize,
        helper: String,
        interface: String,
    },
}

impl ArgumentAdaptation {
    pub fn argument(&self) -> usize {
        match self {
            ArgumentAdaptation::Wrap { argument, .. } | ArgumentAdaptation::Copy { argument, .. } => {
                *argument
            }
        }
    }
}

/// Adaptation of one call: routed type arguments plus per-argument conversions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdaptedCall {
    /// Type arguments with structurally constrained ones replaced by their interface type
    pub type_args: Vec<Type>,
    pub adaptations: Vec<ArgumentAdaptation>,
}

/// Every adapter plan of the pass, keyed by interface name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdapterSet {
    plans: IndexMap<String, AdapterPlan>,
    calls: IndexMap<CallSiteId, AdaptedCall>,
}

impl AdapterSet {
    pub fn plans(&self) -> impl Iterator<Item = &AdapterPlan> {
        self.plans.values()
    }

    pub fn plan(&self, interface: &str) -> Option<&AdapterPlan> {
        self.plans.get(interface)
    }

    /// Adaptation of a direct call site
    pub fn call(&self, call_site: CallSiteId) -> Option<&AdaptedCall> {
        self.calls.get(&call_site)
    }

    pub fn len(&self) -> usize {
        self.plans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }

    pub fn wrapper_count(&self) -> usize {
        self.plans.values().map(|p| p.wrappers.len()).sum()
    }
}

/// Interface shape for each structurally constrained type parameter
#[derive(Debug, Clone)]
struct Routing {
    /// (type parameter index, interface name)
    interfaces: Vec<(usize, String)>,
}

/// Builds adapter plans and call-site adaptations
#[derive(Debug, Clone)]
pub struct AdapterSynthesizer<'a> {
    program: &'a Program,
    evaluator: TypeEvaluator<'a>,
    set: AdapterSet,
    routing: IndexMap<DeclarationId, Routing>,
    /// Literal arguments rejected by an index signature, one entry per distinct problem
    rejected: Vec<SpecializationDiagnostic>,
}

impl<'a> AdapterSynthesizer<'a> {
    pub fn new(program: &'a Program, hierarchy: &'a ClassHierarchy) -> Self {
        Self {
            program,
            evaluator: TypeEvaluator::new(hierarchy),
            set: AdapterSet::default(),
            routing: IndexMap::new(),
            rejected: Vec::new(),
        }
    }

    /// Create interfaces for every structurally constrained declaration and adapt its direct call sites
    ///
    /// Declarations whose constraint cannot be named are demoted to Unsupported.
    #[instrument(skip_all)]
    pub fn synthesize(
        &mut self,
        classifications: &mut ClassificationTable,
        instantiations: &InstantiationSet,
    ) -> Vec<SpecializationDiagnostic> {
        let mut diagnostics = Vec::new();

        for declaration in self.program.sorted_declarations() {
            let treatment = classifications.treatment(declaration.id);
            if !matches!(
                treatment,
                Some(Treatment::StructuralAdapter | Treatment::Specialize)
            ) {
                continue;
            }

            match self.route(declaration) {
                Ok(Some(routing)) => {
                    self.routing.insert(declaration.id, routing);
                }
                Ok(None) => {}
                Err(diagnostic) => {
                    debug!(
                        declaration = %declaration.display_name(),
                        "demoted: unrepresentable constraint key"
                    );
                    classifications.demote(declaration.id, Feature::IndexSignatureConstraint, None);
                    diagnostics.push(diagnostic);
                }
            }
        }

        let program = self.program;
        let routed: Vec<DeclarationId> = self.routing.keys().copied().collect();
        for declaration_id in routed {
            let Some(declaration) = program.declaration(declaration_id) else {
                continue;
            };
            for site in program.call_sites_for(declaration_id) {
                if site.kind == CallKind::Reference {
                    continue;
                }
                let Some(record) = instantiations.record_for(site.id) else {
                    continue;
                };
                if let Some(call) =
                    self.adapt_call(declaration, &record.tuple.type_args, &site.arguments)
                {
                    self.set.calls.insert(site.id, call);
                }
            }
        }

        info!(
            interfaces = self.set.plans.len(),
            wrappers = self.set.wrapper_count(),
            adapted_calls = self.set.calls.len(),
            "synthesized adapters"
        );
        diagnostics
    }

    /// Interface for each structural type parameter of `declaration`
    fn route(
        &mut self,
        declaration: &GenericDeclaration,
    ) -> Result<Option<Routing>, SpecializationDiagnostic> {
        let mut interfaces = Vec::new();
        for (index, param) in declaration.type_params.iter().enumerate() {
            let shape = match &param.constraint {
                ConstraintDescriptor::Structural(properties) => {
                    canonicalize_shape(&ObjectShape::new(properties.clone()))
                }
                ConstraintDescriptor::IndexSignature { key, value } => {
                    match index_shape(key, value) {
                        Some(shape) => canonicalize_shape(&shape),
                        None => {
                            return Err(SpecializationDiagnostic::unrepresentable_key(
                                declaration.id,
                                declaration.display_name(),
                                param.name.clone(),
                                key.clone(),
                                declaration.span,
                            ))
                        }
                    }
                }
                ConstraintDescriptor::Nominal(_) | ConstraintDescriptor::Unconstrained => continue,
            };
            let interface = self.ensure_plan(shape);
            interfaces.push((index, interface));
        }
        Ok((!interfaces.is_empty()).then_some(Routing { interfaces }))
    }

    fn ensure_plan(&mut self, shape: ObjectShape) -> String {
        let interface = interface_name(&shape);
        self.set
            .plans
            .entry(interface.clone())
            .or_insert_with(|| {
                debug!(%interface, "new adapter interface");
                AdapterPlan {
                    shape,
                    interface: interface.clone(),
                    wrappers: Vec::new(),
                    copy_helpers: Vec::new(),
                }
            });
        interface
    }

    /// Adapt one call of a routed declaration with concrete `type_args` and `arguments`
    pub fn adapt_call(
        &mut self,
        declaration: &GenericDeclaration,
        type_args: &[Type],
        arguments: &[Argument],
    ) -> Option<AdaptedCall> {
        let routing = self.routing.get(&declaration.id)?.clone();

        let mut routed_args = type_args.to_vec();
        let mut adaptations = Vec::new();
        for (param_index, interface) in &routing.interfaces {
            if let Some(slot) = routed_args.get_mut(*param_index) {
                *slot = Type::named(interface.clone());
            }

            for (argument_index, param) in declaration.params.iter().enumerate() {
                let carries = matches!(
                    &param.ty,
                    Type::Param(p) if p.owner == declaration.id && p.index == *param_index
                );
                if !carries {
                    continue;
                }
                let Some(argument) = arguments.get(argument_index) else {
                    continue;
                };
                if let Some(adaptation) =
                    self.adapt_argument(declaration, interface, argument_index, argument)
                {
                    adaptations.push(adaptation);
                }
            }
        }
        adaptations.sort_by_key(ArgumentAdaptation::argument);

        Some(AdaptedCall {
            type_args: routed_args,
            adaptations,
        })
    }

    fn adapt_argument(
        &mut self,
        declaration: &GenericDeclaration,
        interface: &str,
        argument_index: usize,
        argument: &Argument,
    ) -> Option<ArgumentAdaptation> {
        let evaluator = self.evaluator;
        let plan = self.set.plans.get_mut(interface)?;

        if argument.is_object_literal() {
            let literal = canonicalize_shape(argument.ty.as_object()?);
            let wrapper = match wrapper_for(plan, &literal, evaluator) {
                Ok(wrapper) => wrapper,
                Err(rejected) => {
                    debug!(
                        %interface,
                        property = %rejected.name,
                        "literal property rejected by index signature"
                    );
                    let value_type = plan
                        .shape
                        .index
                        .as_ref()
                        .map(|index| index.value.as_ref().clone())
                        .unwrap_or(Type::Never);
                    let diagnostic = SpecializationDiagnostic::incompatible_index_value(
                        declaration.id,
                        declaration.display_name(),
                        rejected.name,
                        rejected.ty,
                        value_type,
                        declaration.span,
                    );
                    if !self.rejected.contains(&diagnostic) {
                        self.rejected.push(diagnostic);
                    }
                    return None;
                }
            };
            let name = wrapper.name.clone();
            if plan.wrapper(&name).is_none() {
                debug!(%interface, wrapper = %name, "new wrapper");
                plan.wrappers.push(wrapper);
                plan.wrappers.sort_by(|a, b| a.name.cmp(&b.name));
            }
            return Some(ArgumentAdaptation::Wrap {
                argument: argument_index,
                wrapper: name,
                interface: interface.to_string(),
            });
        }

        let source = canonicalize(&argument.ty);
        if source == Type::named(interface) {
            return None;
        }
        let helper = copy_helper_name(&source, interface);
        if !plan.copy_helpers.iter().any(|h| h.name == helper) {
            debug!(%interface, %helper, "new copy helper");
            plan.copy_helpers.push(CopyHelperPlan {
                source,
                name: helper.clone(),
                interface: interface.to_string(),
                members: plan.shape.properties.clone(),
            });
            plan.copy_helpers.sort_by(|a, b| a.name.cmp(&b.name));
        }
        Some(ArgumentAdaptation::Copy {
            argument: argument_index,
            helper,
            interface: interface.to_string(),
        })
    }

    /// Adaptation already computed for a direct call site
    pub fn adapted_call(&self, call_site: CallSiteId) -> Option<&AdaptedCall> {
        self.set.calls.get(&call_site)
    }

    /// Finish synthesis with plans sorted by interface name
    ///
    /// Also returns a diagnostic for every literal argument left unadapted
    /// because a property does not fit the interface's index signature.
    pub fn finish(mut self) -> (AdapterSet, Vec<SpecializationDiagnostic>) {
        self.set.plans.sort_keys();
        self.set.calls.sort_keys();
        (self.set, self.rejected)
    }
}

/// Object shape exposing an index signature constraint, or `None` when the key has no target equivalent
fn index_shape(key: &Type, value: &Type) -> Option<ObjectShape> {
    match key {
        Type::Primitive(Primitive::String | Primitive::Number) => {
            Some(ObjectShape::indexed(key.clone(), value.clone()))
        }
        Type::Literal(LiteralType::String(name)) => Some(ObjectShape::new(vec![Property::new(
            name.clone(),
            value.clone(),
        )])),
        Type::Union(members) => {
            let names: Option<Vec<&String>> = members
                .iter()
                .map(|member| match member {
                    Type::Literal(LiteralType::String(name)) => Some(name),
                    _ => None,
                })
                .collect();
            let properties = names?
                .into_iter()
                .map(|name| Property::new(name.clone(), value.clone()))
                .collect();
            Some(ObjectShape::new(properties))
        }
        _ => None,
    }
}

/// Wrapper plan for a literal signature against `plan`'s interface
///
/// Fails with the first literal property an index signature does not admit.
fn wrapper_for(
    plan: &AdapterPlan,
    literal: &ObjectShape,
    evaluator: TypeEvaluator<'_>,
) -> Result<WrapperPlan, Property> {
    let signature = match canonicalize(&Type::Object(literal.clone()).widened()) {
        Type::Object(shape) => shape,
        _ => literal.clone(),
    };

    let mut fields = Vec::new();
    // Properties beyond the declared members; they identify the wrapper
    let mut carried = Vec::new();
    for property in &signature.properties {
        if let Some(member) = plan.shape.property(&property.name) {
            fields.push(WrapperField {
                name: property.name.clone(),
                ty: member.ty.clone(),
                optional: member.optional,
                origin: FieldOrigin::Constraint,
            });
            continue;
        }

        let (ty, origin) = match &plan.shape.index {
            Some(index) => {
                if !evaluator.is_assignable(&property.ty, &index.value) {
                    return Err(property.clone());
                }
                (index.value.as_ref().clone(), FieldOrigin::Indexed)
            }
            None => (property.ty.clone(), FieldOrigin::Extra),
        };
        fields.push(WrapperField {
            name: property.name.clone(),
            ty: ty.clone(),
            optional: property.optional,
            origin,
        });
        carried.push(Property {
            name: property.name.clone(),
            ty,
            optional: property.optional,
        });
    }
    for member in &plan.shape.properties {
        if signature.property(&member.name).is_none() {
            fields.push(WrapperField {
                name: member.name.clone(),
                ty: member.ty.clone(),
                optional: member.optional,
                origin: FieldOrigin::Constraint,
            });
        }
    }
    fields.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(WrapperPlan {
        name: wrapper_name(&plan.interface, &ObjectShape::new(carried)),
        interface: plan.interface.clone(),
        signature,
        fields,
    })
}
