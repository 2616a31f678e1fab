// Shapeshift Specializer Diagnostics
// User-facing diagnostics, severity levels, and accumulation across the pass

use crate::classifier::Feature;
use crate::collector::UnboundedReason;
use miette::{Diagnostic, SourceSpan};
use shapeshift_program::{DeclarationId, Span, Type};
use std::fmt;
use thiserror::Error;

/// Severity level for diagnostic messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Output is produced but the printer may need to intervene
    Warning,
    /// The declaration keeps its generic form and cannot be emitted as is
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// Diagnostic produced instead of a plan
#[derive(Error, Diagnostic, Debug, Clone, PartialEq)]
pub enum SpecializationDiagnostic {
    #[error("Cannot enumerate the instantiations of {name}: {reason} (triggered by {feature})")]
    #[diagnostic(
        code(shapeshift::specialize::unbounded_instantiation),
        severity(Error),
        help("Call it with concrete type arguments inside the compiled unit, or keep it off the exported surface")
    )]
    UnboundedInstantiation {
        declaration: DeclarationId,
        name: String,
        feature: Feature,
        reason: UnboundedReason,
        #[label("instantiation set is not closed")]
        span: Option<SourceSpan>,
    },

    #[error("Constraint on {parameter} of {name} uses key type {key_type}, which has no target equivalent")]
    #[diagnostic(
        code(shapeshift::specialize::unrepresentable_constraint_key),
        severity(Error),
        help("Index signature keys must be string, number, or a union of string literals")
    )]
    UnrepresentableConstraintKey {
        declaration: DeclarationId,
        name: String,
        parameter: String,
        key_type: Type,
        #[label("unrepresentable key")]
        span: Option<SourceSpan>,
    },

    #[error("Property {property} of a literal passed to {name} has type {property_type}, which the index signature value type {value_type} does not admit")]
    #[diagnostic(
        code(shapeshift::specialize::incompatible_index_value),
        severity(Error),
        help("The argument is passed without a wrapper; check the literal against the constraint")
    )]
    IncompatibleIndexValue {
        declaration: DeclarationId,
        name: String,
        property: String,
        property_type: Type,
        value_type: Type,
        #[label("index signature constraint")]
        span: Option<SourceSpan>,
    },

    #[error("Constraint on {parameter} of {name} names undeclared type {constraint}")]
    #[diagnostic(
        code(shapeshift::specialize::undeclared_nominal_constraint),
        severity(Warning),
        help("The constraint is emitted as written; declare {constraint} for the target")
    )]
    UndeclaredNominalConstraint {
        declaration: DeclarationId,
        name: String,
        parameter: String,
        constraint: Type,
        #[label("undeclared constraint type")]
        span: Option<SourceSpan>,
    },
}

impl SpecializationDiagnostic {
    /// Create an unbounded instantiation diagnostic
    pub fn unbounded(
        declaration: DeclarationId,
        name: String,
        feature: Feature,
        reason: UnboundedReason,
        span: Option<Span>,
    ) -> Self {
        SpecializationDiagnostic::UnboundedInstantiation {
            declaration,
            name,
            feature,
            reason,
            span: to_source_span(span),
        }
    }

    /// Create an unrepresentable constraint key diagnostic
    pub fn unrepresentable_key(
        declaration: DeclarationId,
        name: String,
        parameter: String,
        key_type: Type,
        span: Option<Span>,
    ) -> Self {
        SpecializationDiagnostic::UnrepresentableConstraintKey {
            declaration,
            name,
            parameter,
            key_type,
            span: to_source_span(span),
        }
    }

    /// Create a diagnostic for a literal property rejected by an index signature
    pub fn incompatible_index_value(
        declaration: DeclarationId,
        name: String,
        property: String,
        property_type: Type,
        value_type: Type,
        span: Option<Span>,
    ) -> Self {
        SpecializationDiagnostic::IncompatibleIndexValue {
            declaration,
            name,
            property,
            property_type,
            value_type,
            span: to_source_span(span),
        }
    }

    /// Create an undeclared nominal constraint warning
    pub fn undeclared_nominal(
        declaration: DeclarationId,
        name: String,
        parameter: String,
        constraint: Type,
        span: Option<Span>,
    ) -> Self {
        SpecializationDiagnostic::UndeclaredNominalConstraint {
            declaration,
            name,
            parameter,
            constraint,
            span: to_source_span(span),
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            SpecializationDiagnostic::UnboundedInstantiation { .. }
            | SpecializationDiagnostic::UnrepresentableConstraintKey { .. }
            | SpecializationDiagnostic::IncompatibleIndexValue { .. } => Severity::Error,
            SpecializationDiagnostic::UndeclaredNominalConstraint { .. } => Severity::Warning,
        }
    }

    /// The declaration this diagnostic is about
    pub fn declaration(&self) -> DeclarationId {
        match self {
            SpecializationDiagnostic::UnboundedInstantiation { declaration, .. }
            | SpecializationDiagnostic::UnrepresentableConstraintKey { declaration, .. }
            | SpecializationDiagnostic::IncompatibleIndexValue { declaration, .. }
            | SpecializationDiagnostic::UndeclaredNominalConstraint { declaration, .. } => {
                *declaration
            }
        }
    }

    /// Stable diagnostic code, matching the miette code
    pub fn code_name(&self) -> &'static str {
        match self {
            SpecializationDiagnostic::UnboundedInstantiation { .. } => {
                "shapeshift::specialize::unbounded_instantiation"
            }
            SpecializationDiagnostic::UnrepresentableConstraintKey { .. } => {
                "shapeshift::specialize::unrepresentable_constraint_key"
            }
            SpecializationDiagnostic::IncompatibleIndexValue { .. } => {
                "shapeshift::specialize::incompatible_index_value"
            }
            SpecializationDiagnostic::UndeclaredNominalConstraint { .. } => {
                "shapeshift::specialize::undeclared_nominal_constraint"
            }
        }
    }

    fn sort_key(&self) -> (DeclarationId, &'static str, String) {
        (self.declaration(), self.code_name(), self.to_string())
    }
}

fn to_source_span(span: Option<Span>) -> Option<SourceSpan> {
    span.map(|s| SourceSpan::new(s.start.into(), s.len()))
}

/// Accumulates diagnostics so one pass reports every problem at once
#[derive(Debug, Clone)]
pub struct DiagnosticCollector {
    diagnostics: Vec<SpecializationDiagnostic>,
    /// Maximum number of diagnostics kept
    max_diagnostics: usize,
    /// Diagnostics dropped after reaching the cap
    suppressed: usize,
}

impl DiagnosticCollector {
    /// Create a new diagnostic collector
    pub fn new(max_diagnostics: usize) -> Self {
        Self {
            diagnostics: Vec::new(),
            max_diagnostics,
            suppressed: 0,
        }
    }

    /// Add a diagnostic to the collection
    pub fn add(&mut self, diagnostic: SpecializationDiagnostic) {
        if self.diagnostics.len() < self.max_diagnostics {
            self.diagnostics.push(diagnostic);
        } else {
            self.suppressed += 1;
        }
    }

    /// Add multiple diagnostics at once
    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = SpecializationDiagnostic>) {
        for diagnostic in diagnostics {
            self.add(diagnostic);
        }
    }

    /// Check if there are any error-severity diagnostics
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity() == Severity::Error)
    }

    pub fn diagnostics(&self) -> &[SpecializationDiagnostic] {
        &self.diagnostics
    }

    /// Order diagnostics by declaration, then code, then message
    pub fn sort(&mut self) {
        self.diagnostics.sort_by_key(|d| d.sort_key());
    }

    pub fn suppressed(&self) -> usize {
        self.suppressed
    }

    /// Create miette reports for all diagnostics
    pub fn create_reports(&self) -> Vec<miette::Report> {
        self.diagnostics
            .iter()
            .map(|diagnostic| miette::Report::new(diagnostic.clone()))
            .collect()
    }

    /// Get a summary of diagnostic counts
    pub fn summary(&self) -> DiagnosticSummary {
        let errors = self
            .diagnostics
            .iter()
            .filter(|d| d.severity() == Severity::Error)
            .count();
        DiagnosticSummary {
            total: self.diagnostics.len(),
            errors,
            warnings: self.diagnostics.len() - errors,
            suppressed: self.suppressed,
        }
    }

    pub fn into_diagnostics(self) -> Vec<SpecializationDiagnostic> {
        self.diagnostics
    }
}

/// Summary of diagnostic counts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticSummary {
    pub total: usize,
    pub errors: usize,
    pub warnings: usize,
    pub suppressed: usize,
}

impl fmt::Display for DiagnosticSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.total == 0 {
            return write!(f, "No diagnostics");
        }
        write!(
            f,
            "{} total ({} errors, {} warnings)",
            self.total, self.errors, self.warnings
        )?;
        if self.suppressed > 0 {
            write!(f, ", {} suppressed", self.suppressed)?;
        }
        Ok(())
    }
}
