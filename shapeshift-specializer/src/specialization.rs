//! Specialization generation
//!
//! Every Specialize declaration gets one plan per instantiation key, with its
//! type parameters substituted, conditional types evaluated and type guards
//! resolved. Plans are produced from a worklist: specializing a body turns its
//! dependent uses into new requests on their targets until no new keys appear.

use crate::adapter::{AdapterSynthesizer, ArgumentAdaptation};
use crate::classifier::{ClassificationTable, Treatment};
use crate::collector::{
    canonicalize, DependentUse, InstantiationKey, InstantiationSet, InstantiationTuple,
    UnboundedReason,
};
use crate::error::{SpecializerError, SpecializerResult};
use crate::evaluation::{Branch, BranchSelection, GuardOutcome, TypeEvaluator};
use crate::hierarchy::ClassHierarchy;
use crate::naming::{specialization_name, NameRegistry};
use crate::rewrite::{CallSiteRewrite, RewriteSite, RewriteTable};
use crate::substitution::Substitution;
use indexmap::IndexMap;
use shapeshift_program::{
    Argument, Body, CallSiteId, DeclarationId, Expression, GenericDeclaration, Program, Statement,
    Type, TypeGuard,
};
use std::collections::{HashMap, VecDeque};
use tracing::{debug, info, instrument, warn};

/// Value parameter of a specialization
#[derive(Debug, Clone, PartialEq)]
pub struct SpecializedParameter {
    pub name: String,
    pub ty: Type,
    pub optional: bool,
    pub rest: bool,
}

/// One concrete copy of a generic declaration
#[derive(Debug, Clone, PartialEq)]
pub struct SpecializationPlan {
    pub declaration: DeclarationId,
    pub key: InstantiationKey,
    /// Generated name: `<base>__<components>`
    pub name: String,
    /// Concrete binding of each type parameter, in declaration order
    pub type_args: Vec<Type>,
    /// Class bound to `this`, for self-typed methods
    pub receiver: Option<Type>,
    pub params: Vec<SpecializedParameter>,
    pub return_type: Type,
    pub body: Body,
    /// Conditional and guard branches chosen for this instantiation, sorted
    pub selected_branches: Vec<BranchSelection>,
}

impl SpecializationPlan {
    pub fn param(&self, name: &str) -> Option<&SpecializedParameter> {
        self.params.iter().find(|p| p.name == name)
    }
}

/// Whole-program plan cache keyed by instantiation key
///
/// Inserting a key that already has a plan keeps the cached plan.
#[derive(Debug, Clone, Default)]
pub struct PlanCache {
    entries: IndexMap<InstantiationKey, SpecializationPlan>,
    by_declaration: HashMap<DeclarationId, Vec<InstantiationKey>>,
}

impl PlanCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `plan` unless its key is already cached; returns whether it was inserted
    pub fn insert_if_absent(&mut self, plan: SpecializationPlan) -> bool {
        if self.entries.contains_key(&plan.key) {
            return false;
        }
        self.by_declaration
            .entry(plan.declaration)
            .or_default()
            .push(plan.key.clone());
        self.entries.insert(plan.key.clone(), plan);
        true
    }

    pub fn get(&self, key: &InstantiationKey) -> Option<&SpecializationPlan> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &InstantiationKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Plans of one declaration, in generation order
    pub fn plans_for(&self, declaration: DeclarationId) -> Vec<&SpecializationPlan> {
        self.by_declaration
            .get(&declaration)
            .map(|keys| keys.iter().filter_map(|key| self.entries.get(key)).collect())
            .unwrap_or_default()
    }

    pub fn plans(&self) -> impl Iterator<Item = &SpecializationPlan> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All plans ordered by declaration id, then key
    pub fn into_sorted(self) -> Vec<SpecializationPlan> {
        let mut plans: Vec<SpecializationPlan> = self.entries.into_values().collect();
        plans.sort_by(|a, b| (a.declaration, &a.key).cmp(&(b.declaration, &b.key)));
        plans
    }
}

/// Request to specialize `declaration` for `tuple`, originating at `site`
#[derive(Debug, Clone)]
struct Request {
    declaration: DeclarationId,
    tuple: InstantiationTuple,
    site: RewriteSite,
    adaptations: Vec<ArgumentAdaptation>,
}

/// How a dependent use is handled inside one specialization
enum NestedCall {
    Invoke { request: Request, specialization: String },
    Rewrite(CallSiteRewrite),
}

#[derive(Debug, Default)]
struct Attempt {
    cache: PlanCache,
    rewrites: RewriteTable,
    failures: IndexMap<DeclarationId, UnboundedReason>,
}

/// Output of the generator
#[derive(Debug, Default)]
pub struct Generation {
    pub plans: PlanCache,
    /// Rewrites of direct call sites to Specialize targets and of every nested call site
    pub rewrites: RewriteTable,
    /// Declarations that could not be specialized after all, in id order
    pub demoted: IndexMap<DeclarationId, UnboundedReason>,
}

pub struct SpecializationGenerator<'a> {
    program: &'a Program,
    classifications: &'a ClassificationTable,
    instantiations: &'a InstantiationSet,
    evaluator: TypeEvaluator<'a>,
    max_type_depth: usize,
}

impl<'a> SpecializationGenerator<'a> {
    pub fn new(
        program: &'a Program,
        classifications: &'a ClassificationTable,
        instantiations: &'a InstantiationSet,
        hierarchy: &'a ClassHierarchy,
        max_type_depth: usize,
    ) -> Self {
        Self {
            program,
            classifications,
            instantiations,
            evaluator: TypeEvaluator::new(hierarchy),
            max_type_depth,
        }
    }

    /// Generate plans for every Specialize declaration
    ///
    /// A declaration that fails during generation is excluded together with
    /// every declaration instantiated from its body, and generation restarts
    /// until it completes without failures.
    #[instrument(skip_all)]
    pub fn generate(
        &self,
        names: &mut NameRegistry,
        adapters: &mut AdapterSynthesizer<'_>,
    ) -> SpecializerResult<Generation> {
        let mut excluded: IndexMap<DeclarationId, UnboundedReason> = IndexMap::new();

        loop {
            let mut attempt_adapters = adapters.clone();
            let attempt = self.attempt(&excluded, names, &mut attempt_adapters)?;

            if attempt.failures.is_empty() {
                *adapters = attempt_adapters;
                excluded.sort_keys();
                info!(
                    plans = attempt.cache.len(),
                    demoted = excluded.len(),
                    "generated specializations"
                );
                return Ok(Generation {
                    plans: attempt.cache,
                    rewrites: attempt.rewrites,
                    demoted: excluded,
                });
            }

            for (declaration, reason) in attempt.failures {
                excluded.entry(declaration).or_insert(reason);
            }
            self.exclude_dependents(&mut excluded);
            debug!(excluded = excluded.len(), "restarting generation");
        }
    }

    /// Exclude every Specialize declaration instantiated from the body of an excluded one
    fn exclude_dependents(&self, excluded: &mut IndexMap<DeclarationId, UnboundedReason>) {
        loop {
            let mut added = Vec::new();
            for declaration in self.classifications.with_treatment(Treatment::Specialize) {
                if excluded.contains_key(&declaration) {
                    continue;
                }
                let blocked = self
                    .instantiations
                    .dependent_uses_of(declaration)
                    .into_iter()
                    .find(|u| excluded.contains_key(&u.enclosing));
                if let Some(dependent) = blocked {
                    added.push((
                        declaration,
                        UnboundedReason::DependentOnUnspecialized {
                            enclosing: dependent.enclosing,
                        },
                    ));
                }
            }
            if added.is_empty() {
                return;
            }
            excluded.extend(added);
        }
    }

    fn attempt(
        &self,
        excluded: &IndexMap<DeclarationId, UnboundedReason>,
        names: &mut NameRegistry,
        adapters: &mut AdapterSynthesizer<'_>,
    ) -> SpecializerResult<Attempt> {
        let mut attempt = Attempt::default();
        let mut queue: VecDeque<Request> = self.seed(excluded, adapters).into();

        while let Some(request) = queue.pop_front() {
            if excluded.contains_key(&request.declaration)
                || attempt.failures.contains_key(&request.declaration)
            {
                continue;
            }

            // The depth limit applies to transitively discovered requests only
            let nested = matches!(request.site, RewriteSite::Nested { .. });
            let depth = request
                .tuple
                .components()
                .iter()
                .map(Type::depth)
                .max()
                .unwrap_or(0);
            if nested && depth > self.max_type_depth {
                warn!(
                    declaration = %request.declaration,
                    depth,
                    limit = self.max_type_depth,
                    "type arguments exceed the depth limit"
                );
                attempt.failures.insert(
                    request.declaration,
                    UnboundedReason::PolymorphicRecursion { depth },
                );
                continue;
            }

            let key = InstantiationKey::new(request.declaration, &request.tuple);
            let name = self.specialization_name(names, request.declaration, &request.tuple)?;
            names.claim(&name, key.as_str())?;

            attempt.rewrites.insert(
                request.site.clone(),
                CallSiteRewrite::InvokeSpecialization {
                    declaration: request.declaration,
                    specialization: name.clone(),
                    key: key.clone(),
                    adaptations: request.adaptations,
                },
            );

            if attempt.cache.contains(&key) {
                continue;
            }

            let declaration = self.declaration(request.declaration)?;
            let (plan, nested) = self.specialize(
                declaration,
                key,
                name,
                request.tuple,
                excluded,
                names,
                adapters,
                &mut attempt.rewrites,
            )?;
            debug!(specialization = %plan.name, nested = nested.len(), "specialized");
            attempt.cache.insert_if_absent(plan);
            queue.extend(nested);
        }

        Ok(attempt)
    }

    /// Requests for every direct call site of a Specialize declaration, in declaration then call-site order
    fn seed(
        &self,
        excluded: &IndexMap<DeclarationId, UnboundedReason>,
        adapters: &AdapterSynthesizer<'_>,
    ) -> Vec<Request> {
        let mut requests = Vec::new();
        for declaration in self.classifications.with_treatment(Treatment::Specialize) {
            if excluded.contains_key(&declaration) {
                continue;
            }
            let records = self
                .instantiations
                .records()
                .iter()
                .filter(|r| r.declaration == declaration);
            for record in records {
                let adapted = adapters.adapted_call(record.call_site);
                requests.push(Request {
                    declaration,
                    tuple: InstantiationTuple {
                        receiver: record.tuple.receiver.clone(),
                        type_args: adapted
                            .map(|call| call.type_args.clone())
                            .unwrap_or_else(|| record.tuple.type_args.clone()),
                    },
                    site: RewriteSite::Direct(record.call_site),
                    adaptations: adapted
                        .map(|call| call.adaptations.clone())
                        .unwrap_or_default(),
                });
            }
        }
        requests
    }

    fn declaration(&self, id: DeclarationId) -> SpecializerResult<&'a GenericDeclaration> {
        self.program
            .declaration(id)
            .ok_or(SpecializerError::UnknownDeclaration { declaration: id })
    }

    fn specialization_name(
        &self,
        names: &NameRegistry,
        declaration: DeclarationId,
        tuple: &InstantiationTuple,
    ) -> SpecializerResult<String> {
        Ok(specialization_name(
            names.base(declaration)?,
            &tuple.components(),
        ))
    }

    fn treatment(
        &self,
        declaration: DeclarationId,
        excluded: &IndexMap<DeclarationId, UnboundedReason>,
    ) -> Treatment {
        if excluded.contains_key(&declaration) {
            return Treatment::Unsupported;
        }
        self.classifications
            .treatment(declaration)
            .unwrap_or(Treatment::Native)
    }

    #[allow(clippy::too_many_arguments)]
    fn specialize(
        &self,
        declaration: &GenericDeclaration,
        key: InstantiationKey,
        name: String,
        tuple: InstantiationTuple,
        excluded: &IndexMap<DeclarationId, UnboundedReason>,
        names: &NameRegistry,
        adapters: &mut AdapterSynthesizer<'_>,
        rewrites: &mut RewriteTable,
    ) -> SpecializerResult<(SpecializationPlan, Vec<Request>)> {
        let mut substitution = Substitution::for_declaration(declaration, &tuple.type_args);
        if let Some(receiver) = &tuple.receiver {
            substitution = substitution.with_this(receiver.clone());
        }

        let mut callees: HashMap<CallSiteId, String> = HashMap::new();
        let mut requests = Vec::new();
        let mut selections = Vec::new();

        // Concrete calls written inside the body
        for call_site in declaration.body.call_sites() {
            let Some(record) = self.instantiations.record_for(call_site) else {
                continue;
            };
            if self.treatment(record.declaration, excluded) != Treatment::Specialize {
                continue;
            }
            let type_args = adapters
                .adapted_call(call_site)
                .map(|call| call.type_args.clone())
                .unwrap_or_else(|| record.tuple.type_args.clone());
            let routed = InstantiationTuple {
                receiver: record.tuple.receiver.clone(),
                type_args,
            };
            callees.insert(
                call_site,
                self.specialization_name(names, record.declaration, &routed)?,
            );
        }

        for dependent in self.instantiations.dependent_uses_in(declaration.id) {
            let site = RewriteSite::Nested {
                call_site: dependent.call_site,
                within: name.clone(),
            };
            match self.nested_call(
                dependent,
                &substitution,
                site.clone(),
                excluded,
                names,
                adapters,
                &mut selections,
            )? {
                NestedCall::Invoke {
                    request,
                    specialization,
                } => {
                    callees.insert(dependent.call_site, specialization);
                    requests.push(request);
                }
                NestedCall::Rewrite(rewrite) => rewrites.insert(site, rewrite),
            }
        }

        let mut rewriter = BodyRewriter {
            evaluator: self.evaluator,
            substitution: &substitution,
            callees: &callees,
            selections,
        };

        let mut params = Vec::new();
        let mut prologue = Vec::new();
        for param in &declaration.params {
            let ty = rewriter.ty(&param.ty);
            match &ty {
                Type::Tuple(elements) if param.rest && elements.iter().all(|e| !e.rest) => {
                    let mut spread = Vec::with_capacity(elements.len());
                    for (index, element) in elements.iter().enumerate() {
                        let expanded = format!("{}_{}", param.name, index);
                        spread.push(Expression::variable(expanded.clone(), element.ty.clone()));
                        params.push(SpecializedParameter {
                            name: expanded,
                            ty: element.ty.clone(),
                            optional: element.optional,
                            rest: false,
                        });
                    }
                    prologue.push(Statement::Let {
                        name: param.name.clone(),
                        ty: ty.clone(),
                        value: Expression::ArrayLiteral {
                            elements: spread,
                            ty: ty.clone(),
                        },
                    });
                }
                _ => params.push(SpecializedParameter {
                    name: param.name.clone(),
                    ty,
                    optional: param.optional,
                    rest: param.rest,
                }),
            }
        }

        let return_type = rewriter.ty(&declaration.return_type);
        let mut statements = prologue;
        statements.extend(rewriter.statements(&declaration.body.statements));

        let mut selected_branches = rewriter.selections;
        selected_branches.sort();
        selected_branches.dedup();

        let plan = SpecializationPlan {
            declaration: declaration.id,
            key,
            name,
            type_args: tuple.type_args,
            receiver: tuple.receiver,
            params,
            return_type,
            body: Body::new(statements),
            selected_branches,
        };
        Ok((plan, requests))
    }

    #[allow(clippy::too_many_arguments)]
    fn nested_call(
        &self,
        dependent: &DependentUse,
        substitution: &Substitution,
        site: RewriteSite,
        excluded: &IndexMap<DeclarationId, UnboundedReason>,
        names: &NameRegistry,
        adapters: &mut AdapterSynthesizer<'_>,
        selections: &mut Vec<BranchSelection>,
    ) -> SpecializerResult<NestedCall> {
        let mut type_args = Vec::with_capacity(dependent.type_args.len());
        for arg in &dependent.type_args {
            let evaluated = self.evaluator.instantiate(arg, substitution);
            selections.extend(evaluated.selections);
            type_args.push(evaluated.ty);
        }
        let receiver = dependent
            .receiver
            .as_ref()
            .map(|r| canonicalize(&substitution.apply(r)));
        let arguments: Vec<Argument> = dependent
            .arguments
            .iter()
            .map(|a| Argument {
                ty: canonicalize(&substitution.apply(&a.ty)),
                kind: a.kind,
            })
            .collect();

        let open = type_args
            .iter()
            .chain(receiver.iter())
            .any(|t| t.mentions_params() || t.mentions_this());
        if open {
            return Ok(NestedCall::Rewrite(CallSiteRewrite::KeepGeneric));
        }

        let target = self.declaration(dependent.target)?;
        let rewrite = match self.treatment(target.id, excluded) {
            Treatment::Native => CallSiteRewrite::Unchanged,
            Treatment::Unsupported => CallSiteRewrite::KeepGeneric,
            Treatment::StructuralAdapter => match adapters.adapt_call(target, &type_args, &arguments) {
                Some(call) => CallSiteRewrite::WrapArguments {
                    type_args: call.type_args,
                    adaptations: call.adaptations,
                },
                None => CallSiteRewrite::Unchanged,
            },
            Treatment::Specialize => {
                let (type_args, adaptations) =
                    match adapters.adapt_call(target, &type_args, &arguments) {
                        Some(call) => (call.type_args, call.adaptations),
                        None => (type_args, Vec::new()),
                    };
                let tuple = InstantiationTuple {
                    receiver,
                    type_args,
                };
                let specialization = self.specialization_name(names, target.id, &tuple)?;
                return Ok(NestedCall::Invoke {
                    request: Request {
                        declaration: target.id,
                        tuple,
                        site,
                        adaptations,
                    },
                    specialization,
                });
            }
        };
        Ok(NestedCall::Rewrite(rewrite))
    }
}

/// Substitutes one body under a fixed set of bindings
struct BodyRewriter<'r> {
    evaluator: TypeEvaluator<'r>,
    substitution: &'r Substitution,
    callees: &'r HashMap<CallSiteId, String>,
    selections: Vec<BranchSelection>,
}

impl BodyRewriter<'_> {
    fn ty(&mut self, ty: &Type) -> Type {
        let evaluated = self.evaluator.instantiate(ty, self.substitution);
        self.selections.extend(evaluated.selections);
        evaluated.ty
    }

    fn statements(&mut self, statements: &[Statement]) -> Vec<Statement> {
        statements.iter().map(|s| self.statement(s)).collect()
    }

    fn statement(&mut self, statement: &Statement) -> Statement {
        match statement {
            Statement::Let { name, ty, value } => Statement::Let {
                name: name.clone(),
                ty: self.ty(ty),
                value: self.expression(value),
            },
            Statement::Return(value) => Statement::Return(value.as_ref().map(|v| self.expression(v))),
            Statement::Expression(value) => Statement::Expression(self.expression(value)),
            Statement::TypeGuard(guard) => self.guard(guard),
            Statement::Block(statements) => Statement::Block(self.statements(statements)),
        }
    }

    /// Inline the statically selected branch of a guard, or keep it when both remain possible
    fn guard(&mut self, guard: &TypeGuard) -> Statement {
        let subject = self.expression(&guard.subject);
        let test = self.ty(&guard.test);

        let branch = match self.evaluator.resolve_guard(subject.ty(), &test) {
            GuardOutcome::Then => Branch::Then,
            GuardOutcome::Else => Branch::Else,
            GuardOutcome::Keep => {
                return Statement::TypeGuard(TypeGuard {
                    subject,
                    test,
                    then_branch: self.statements(&guard.then_branch),
                    else_branch: self.statements(&guard.else_branch),
                })
            }
        };

        self.selections.push(BranchSelection {
            conditional: format!("is {}", guard.test),
            check: subject.ty().clone(),
            branch,
        });
        let taken = match branch {
            Branch::Then => &guard.then_branch,
            Branch::Else | Branch::Both => &guard.else_branch,
        };
        Statement::Block(self.statements(taken))
    }

    fn expression(&mut self, expression: &Expression) -> Expression {
        match expression {
            Expression::Literal { value, ty } => Expression::Literal {
                value: value.clone(),
                ty: self.ty(ty),
            },
            Expression::Variable { name, ty } => Expression::Variable {
                name: name.clone(),
                ty: self.ty(ty),
            },
            Expression::Property { object, name, ty } => Expression::Property {
                object: Box::new(self.expression(object)),
                name: name.clone(),
                ty: self.ty(ty),
            },
            Expression::ObjectLiteral { properties, ty } => Expression::ObjectLiteral {
                properties: properties
                    .iter()
                    .map(|(name, value)| (name.clone(), self.expression(value)))
                    .collect(),
                ty: self.ty(ty),
            },
            Expression::ArrayLiteral { elements, ty } => Expression::ArrayLiteral {
                elements: elements.iter().map(|e| self.expression(e)).collect(),
                ty: self.ty(ty),
            },
            Expression::Call {
                call_site,
                callee,
                arguments,
                ty,
            } => Expression::Call {
                call_site: *call_site,
                callee: self
                    .callees
                    .get(call_site)
                    .cloned()
                    .unwrap_or_else(|| callee.clone()),
                arguments: arguments.iter().map(|a| self.expression(a)).collect(),
                ty: self.ty(ty),
            },
            Expression::Cast { value, ty } => Expression::Cast {
                value: Box::new(self.expression(value)),
                ty: self.ty(ty),
            },
        }
    }
}
