//! Shape classification
//!
//! Each generic declaration gets exactly one [`Treatment`], escalated over its
//! features to the strongest one required:
//! `Native < StructuralAdapter < Specialize < Unsupported`.

use crate::collector::{InstantiationSet, UnboundedReason};
use crate::config::{GenericStrategy, SpecializerConfig};
use crate::diagnostics::SpecializationDiagnostic;
use crate::hierarchy::ClassHierarchy;
use indexmap::{IndexMap, IndexSet};
use rayon::prelude::*;
use shapeshift_program::{ConstraintDescriptor, DeclarationId, GenericDeclaration, Program, Type};
use std::fmt;
use tracing::{debug, info, instrument, warn};

/// How the target represents a generic declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Treatment {
    /// Real target generic with a nominal constraint clause
    Native,
    /// Synthesized nominal interface plus wrapper types
    StructuralAdapter,
    /// One concrete unit per instantiation
    Specialize,
    /// Keeps its generic form; reported through a diagnostic
    Unsupported,
}

impl fmt::Display for Treatment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Treatment::Native => write!(f, "native"),
            Treatment::StructuralAdapter => write!(f, "structural adapter"),
            Treatment::Specialize => write!(f, "specialize"),
            Treatment::Unsupported => write!(f, "unsupported"),
        }
    }
}

/// Source feature that drives a treatment decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Feature {
    Unconstrained,
    NominalConstraint,
    /// Nominal constraint naming a type missing from the program's type table
    UndeclaredNominal,
    StructuralConstraint,
    IndexSignatureConstraint,
    ConditionalReturn,
    /// Type guard in the body that tests a type parameter
    ConditionalTypeGuard,
    VariadicParameter,
    SelfType,
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Feature::Unconstrained => "unconstrained type parameter",
            Feature::NominalConstraint => "nominal constraint",
            Feature::UndeclaredNominal => "undeclared nominal constraint",
            Feature::StructuralConstraint => "structural constraint",
            Feature::IndexSignatureConstraint => "index signature constraint",
            Feature::ConditionalReturn => "conditional return type",
            Feature::ConditionalTypeGuard => "conditional type guard",
            Feature::VariadicParameter => "variadic parameter",
            Feature::SelfType => "self type",
        };
        write!(f, "{text}")
    }
}

/// Treatment decision for one declaration
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub declaration: DeclarationId,
    pub name: String,
    pub treatment: Treatment,
    /// Feature that set the final treatment
    pub trigger: Feature,
    /// Every feature detected, sorted
    pub features: Vec<Feature>,
    /// Set when the declaration could not be specialized for lack of a closed instantiation set
    pub unbounded: Option<UnboundedReason>,
}

/// One treatment entry per declaration, in id order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassificationTable {
    entries: IndexMap<DeclarationId, Classification>,
}

impl ClassificationTable {
    pub fn get(&self, declaration: DeclarationId) -> Option<&Classification> {
        self.entries.get(&declaration)
    }

    pub fn treatment(&self, declaration: DeclarationId) -> Option<Treatment> {
        self.entries.get(&declaration).map(|c| c.treatment)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Classification> {
        self.entries.values()
    }

    /// Declarations with the given treatment, in id order
    pub fn with_treatment(&self, treatment: Treatment) -> Vec<DeclarationId> {
        self.entries
            .values()
            .filter(|c| c.treatment == treatment)
            .map(|c| c.declaration)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Demote a declaration to Unsupported after a later stage failed on it
    pub fn demote(
        &mut self,
        declaration: DeclarationId,
        trigger: Feature,
        unbounded: Option<UnboundedReason>,
    ) {
        if let Some(entry) = self.entries.get_mut(&declaration) {
            entry.treatment = Treatment::Unsupported;
            entry.trigger = trigger;
            if unbounded.is_some() {
                entry.unbounded = unbounded;
            }
        }
    }
}

/// Result of classifying one declaration in isolation
#[derive(Debug, Clone)]
struct Proposal {
    classification: Classification,
    diagnostics: Vec<SpecializationDiagnostic>,
}

/// Assigns treatments to every generic declaration
#[derive(Debug)]
pub struct ShapeClassifier<'a> {
    program: &'a Program,
    instantiations: &'a InstantiationSet,
    hierarchy: &'a ClassHierarchy,
    strategy: GenericStrategy,
    parallel: bool,
}

impl<'a> ShapeClassifier<'a> {
    pub fn new(
        program: &'a Program,
        instantiations: &'a InstantiationSet,
        hierarchy: &'a ClassHierarchy,
        config: &SpecializerConfig,
    ) -> Self {
        Self {
            program,
            instantiations,
            hierarchy,
            strategy: config.generic_strategy,
            parallel: config.parallel,
        }
    }

    /// Classify every declaration, returning the table and any diagnostics
    #[instrument(skip_all, fields(declarations = self.program.declarations.len(), parallel = self.parallel))]
    pub fn classify(&self) -> (ClassificationTable, Vec<SpecializationDiagnostic>) {
        let declarations = self.program.sorted_declarations();

        let proposals: Vec<Proposal> = if self.parallel {
            declarations
                .par_iter()
                .map(|declaration| self.propose(declaration))
                .collect()
        } else {
            declarations
                .iter()
                .map(|declaration| self.propose(declaration))
                .collect()
        };

        let mut entries = IndexMap::new();
        let mut diagnostics = Vec::new();
        for proposal in proposals {
            diagnostics.extend(proposal.diagnostics);
            entries.insert(proposal.classification.declaration, proposal.classification);
        }

        diagnostics.extend(self.settle_boundedness(&mut entries));

        let table = ClassificationTable { entries };
        info!(
            native = table.with_treatment(Treatment::Native).len(),
            adapter = table.with_treatment(Treatment::StructuralAdapter).len(),
            specialize = table.with_treatment(Treatment::Specialize).len(),
            unsupported = table.with_treatment(Treatment::Unsupported).len(),
            "classified declarations"
        );
        (table, diagnostics)
    }

    fn propose(&self, declaration: &GenericDeclaration) -> Proposal {
        let mut detected: Vec<(Treatment, Feature)> = Vec::new();
        let mut diagnostics = Vec::new();

        for param in &declaration.type_params {
            let entry = match &param.constraint {
                ConstraintDescriptor::Unconstrained => (Treatment::Native, Feature::Unconstrained),
                ConstraintDescriptor::Nominal(constraint) => {
                    if self.is_declared(constraint) {
                        (Treatment::Native, Feature::NominalConstraint)
                    } else {
                        warn!(
                            declaration = %declaration.display_name(),
                            parameter = %param.name,
                            %constraint,
                            "nominal constraint names an undeclared type"
                        );
                        diagnostics.push(SpecializationDiagnostic::undeclared_nominal(
                            declaration.id,
                            declaration.display_name(),
                            param.name.clone(),
                            constraint.clone(),
                            declaration.span,
                        ));
                        (Treatment::Native, Feature::UndeclaredNominal)
                    }
                }
                ConstraintDescriptor::Structural(_) => {
                    (Treatment::StructuralAdapter, Feature::StructuralConstraint)
                }
                ConstraintDescriptor::IndexSignature { .. } => {
                    (Treatment::StructuralAdapter, Feature::IndexSignatureConstraint)
                }
            };
            detected.push(entry);
        }

        let signature_conditional = !declaration
            .return_type
            .dependent_conditionals(declaration.id)
            .is_empty()
            || declaration
                .params
                .iter()
                .any(|p| !p.ty.dependent_conditionals(declaration.id).is_empty());
        if signature_conditional {
            detected.push((Treatment::Specialize, Feature::ConditionalReturn));
        }

        let guarded = declaration.body.type_guards().iter().any(|guard| {
            guard.test.mentions_params_of(declaration.id)
                || guard.subject.ty().mentions_params_of(declaration.id)
        });
        if guarded {
            detected.push((Treatment::Specialize, Feature::ConditionalTypeGuard));
        }

        if let Some((_, rest)) = declaration.rest_parameter() {
            if rest.ty.mentions_params_of(declaration.id) {
                detected.push((Treatment::Specialize, Feature::VariadicParameter));
            }
        }

        if declaration.is_self_typed() {
            let chained = declaration
                .owning_class()
                .is_some_and(|class| self.hierarchy.is_inheritance_chain(class));
            let treatment = if chained {
                Treatment::Specialize
            } else {
                Treatment::Native
            };
            detected.push((treatment, Feature::SelfType));
        }

        let (mut treatment, trigger) = detected
            .iter()
            .fold(None, |strongest: Option<(Treatment, Feature)>, &(t, f)| {
                match strongest {
                    Some((best, _)) if best >= t => strongest,
                    _ => Some((t, f)),
                }
            })
            .unwrap_or((Treatment::Native, Feature::Unconstrained));

        if self.strategy == GenericStrategy::MonomorphizeAll
            && treatment < Treatment::Specialize
            && !detected.is_empty()
        {
            treatment = Treatment::Specialize;
        }

        let mut features: Vec<Feature> = detected.iter().map(|(_, f)| *f).collect();
        features.sort();
        features.dedup();

        debug!(
            declaration = %declaration.display_name(),
            %treatment,
            %trigger,
            "proposed treatment"
        );

        Proposal {
            classification: Classification {
                declaration: declaration.id,
                name: declaration.display_name(),
                treatment,
                trigger,
                features,
                unbounded: None,
            },
            diagnostics,
        }
    }

    fn is_declared(&self, constraint: &Type) -> bool {
        match constraint {
            Type::Named { name, .. } => self.program.is_declared_type(name),
            _ => true,
        }
    }

    /// Drop Specialize candidates whose instantiation set is not closed, to a fixed point
    fn settle_boundedness(
        &self,
        entries: &mut IndexMap<DeclarationId, Classification>,
    ) -> Vec<SpecializationDiagnostic> {
        let mut specialized: IndexSet<DeclarationId> = entries
            .values()
            .filter(|c| c.treatment == Treatment::Specialize)
            .map(|c| c.declaration)
            .collect();
        let mut dropped: IndexMap<DeclarationId, UnboundedReason> = IndexMap::new();

        loop {
            let mut changed = false;
            for &declaration in specialized.iter() {
                let reason = self
                    .instantiations
                    .unbounded_reason(declaration)
                    .cloned()
                    .or_else(|| {
                        self.instantiations
                            .dependent_uses_of(declaration)
                            .iter()
                            .find(|u| !specialized.contains(&u.enclosing))
                            .map(|u| UnboundedReason::DependentOnUnspecialized {
                                enclosing: u.enclosing,
                            })
                    });
                if let Some(reason) = reason {
                    dropped.insert(declaration, reason);
                    changed = true;
                }
            }
            specialized.retain(|d| !dropped.contains_key(d));
            if !changed {
                break;
            }
        }

        dropped.sort_keys();
        let mut diagnostics = Vec::new();
        for (declaration, reason) in dropped {
            let Some(entry) = entries.get_mut(&declaration) else {
                continue;
            };
            debug!(declaration = %entry.name, %reason, "unbounded instantiation");
            entry.treatment = Treatment::Unsupported;
            entry.unbounded = Some(reason.clone());
            let span = self
                .program
                .declaration(declaration)
                .and_then(|d| d.span);
            diagnostics.push(SpecializationDiagnostic::unbounded(
                declaration,
                entry.name.clone(),
                entry.trigger,
                reason,
                span,
            ));
        }
        diagnostics
    }
}
