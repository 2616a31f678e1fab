//! Shapeshift Specializer
//!
//! Generic-instantiation resolution and specialization for a type-checked
//! program whose target has nominal, invariant generics only.
//!
//! ## Stages
//!
//! - **Instantiation Collector**: closed set of concrete instantiations per declaration
//! - **Shape Classifier**: one treatment per declaration, from native generic to unsupported
//! - **Adapter Synthesizer**: nominal interfaces and wrapper types for structural constraints
//! - **Specialization Generator**: named, substituted copies of declarations that need them
//!
//! [`specialize_program`] runs all four over a [`shapeshift_program::Program`]
//! and returns plans, call-site rewrites and diagnostics for the printer.

pub mod adapter;
pub mod classifier;
pub mod collector;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod evaluation;
pub mod hierarchy;
pub mod naming;
pub mod pipeline;
pub mod rewrite;
pub mod specialization;
pub mod substitution;

pub use adapter::{
    AdaptedCall, AdapterPlan, AdapterSet, AdapterSynthesizer, ArgumentAdaptation,
    CopyHelperPlan, FieldOrigin, WrapperField, WrapperPlan,
};
pub use classifier::{Classification, ClassificationTable, Feature, ShapeClassifier, Treatment};
pub use collector::{
    DependentUse, InstantiationCollector, InstantiationKey, InstantiationRecord, InstantiationSet,
    InstantiationTuple, UnboundedReason,
};
pub use config::{ExportPolicy, GenericStrategy, SpecializerConfig};
pub use diagnostics::{DiagnosticCollector, DiagnosticSummary, Severity, SpecializationDiagnostic};
pub use error::{SpecializerError, SpecializerResult};
pub use evaluation::{Branch, BranchSelection, TypeEvaluator};
pub use hierarchy::ClassHierarchy;
pub use naming::{NameRegistry, TypeSerializer};
pub use pipeline::{specialize_program, SpecializationOutput};
pub use rewrite::{CallSiteRewrite, RewriteSite, RewriteTable};
pub use specialization::{
    Generation, PlanCache, SpecializationGenerator, SpecializationPlan, SpecializedParameter,
};
pub use substitution::Substitution;

#[cfg(test)]
mod tests;
