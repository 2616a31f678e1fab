//! Whole-program specialization pass

use crate::adapter::{AdapterSet, AdapterSynthesizer};
use crate::classifier::{ClassificationTable, ShapeClassifier, Treatment};
use crate::collector::{InstantiationCollector, InstantiationSet};
use crate::config::SpecializerConfig;
use crate::diagnostics::{DiagnosticCollector, DiagnosticSummary, SpecializationDiagnostic};
use crate::error::SpecializerResult;
use crate::hierarchy::ClassHierarchy;
use crate::naming::NameRegistry;
use crate::rewrite::{CallSiteRewrite, RewriteSite, RewriteTable};
use crate::specialization::{SpecializationGenerator, SpecializationPlan};
use shapeshift_program::{CallSite, DeclarationId, Program, Type};
use tracing::{info, instrument};

/// Everything the printer needs to emit the program
#[derive(Debug, Clone)]
pub struct SpecializationOutput {
    pub classifications: ClassificationTable,
    pub adapters: AdapterSet,
    /// Ordered by declaration id, then instantiation key
    pub specializations: Vec<SpecializationPlan>,
    pub rewrites: RewriteTable,
    /// Sorted by declaration, then code
    pub diagnostics: Vec<SpecializationDiagnostic>,
    pub summary: DiagnosticSummary,
}

impl SpecializationOutput {
    pub fn specializations_for(&self, declaration: DeclarationId) -> Vec<&SpecializationPlan> {
        self.specializations
            .iter()
            .filter(|plan| plan.declaration == declaration)
            .collect()
    }

    pub fn specialization(&self, name: &str) -> Option<&SpecializationPlan> {
        self.specializations.iter().find(|plan| plan.name == name)
    }

    pub fn diagnostics_for(&self, declaration: DeclarationId) -> Vec<&SpecializationDiagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.declaration() == declaration)
            .collect()
    }

    pub fn has_errors(&self) -> bool {
        self.summary.errors > 0
    }
}

/// Run the full pass over a validated program
///
/// Returns `Err` only for precondition violations and name collisions; every
/// other problem is reported through the output's diagnostics.
#[instrument(skip_all, fields(
    declarations = program.declarations.len(),
    call_sites = program.call_sites.len()
))]
pub fn specialize_program(
    program: &Program,
    config: &SpecializerConfig,
) -> SpecializerResult<SpecializationOutput> {
    program.validate()?;

    let mut diagnostics = DiagnosticCollector::new(config.max_diagnostics);
    let hierarchy = ClassHierarchy::from_program(program);

    let instantiations = InstantiationCollector::new(program, config).collect();

    let (mut classifications, classified) =
        ShapeClassifier::new(program, &instantiations, &hierarchy, config).classify();
    diagnostics.extend(classified);

    let mut names = NameRegistry::new(program);
    let mut synthesizer = AdapterSynthesizer::new(program, &hierarchy);
    diagnostics.extend(synthesizer.synthesize(&mut classifications, &instantiations));

    let generation = SpecializationGenerator::new(
        program,
        &classifications,
        &instantiations,
        &hierarchy,
        config.max_type_depth,
    )
    .generate(&mut names, &mut synthesizer)?;
    let (adapters, rejected) = synthesizer.finish();
    diagnostics.extend(rejected);

    for (declaration, reason) in &generation.demoted {
        let Some(entry) = classifications.get(*declaration) else {
            continue;
        };
        let diagnostic = SpecializationDiagnostic::unbounded(
            *declaration,
            entry.name.clone(),
            entry.trigger,
            reason.clone(),
            program.declaration(*declaration).and_then(|d| d.span),
        );
        let trigger = entry.trigger;
        classifications.demote(*declaration, trigger, Some(reason.clone()));
        diagnostics.add(diagnostic);
    }

    claim_adapter_names(&mut names, &adapters)?;

    let mut rewrites = generation.rewrites;
    rewrites.merge(direct_rewrites(
        program,
        &classifications,
        &instantiations,
        &adapters,
        &rewrites,
    ));
    rewrites.sort();

    diagnostics.sort();
    let summary = diagnostics.summary();
    let specializations = generation.plans.into_sorted();

    info!(
        specializations = specializations.len(),
        interfaces = adapters.len(),
        rewrites = rewrites.len(),
        %summary,
        "specialization complete"
    );

    Ok(SpecializationOutput {
        classifications,
        adapters,
        specializations,
        rewrites,
        diagnostics: diagnostics.into_diagnostics(),
        summary,
    })
}

fn claim_adapter_names(names: &mut NameRegistry, adapters: &AdapterSet) -> SpecializerResult<()> {
    for plan in adapters.plans() {
        names.claim(
            &plan.interface,
            &format!("interface {}", Type::Object(plan.shape.clone())),
        )?;
        for wrapper in &plan.wrappers {
            let extras: Vec<String> = wrapper.extras().map(|f| f.name.clone()).collect();
            names.claim(
                &wrapper.name,
                &format!("wrapper of {} with [{}]", plan.interface, extras.join(", ")),
            )?;
        }
        for helper in &plan.copy_helpers {
            names.claim(
                &helper.name,
                &format!("copy {} to {}", helper.source, helper.interface),
            )?;
        }
    }
    Ok(())
}

/// Rewrites for every call site in the program not already handled by generation
fn direct_rewrites(
    program: &Program,
    classifications: &ClassificationTable,
    instantiations: &InstantiationSet,
    adapters: &AdapterSet,
    generated: &RewriteTable,
) -> RewriteTable {
    let mut sites: Vec<&CallSite> = program.call_sites.iter().collect();
    sites.sort_by_key(|site| site.id);

    let mut rewrites = RewriteTable::new();
    for site in sites {
        let entry = RewriteSite::Direct(site.id);
        if generated.contains(&entry) {
            continue;
        }

        // Open calls inside a specialized body are rewritten per specialization
        let in_specialized_body = site
            .enclosing
            .is_some_and(|e| classifications.treatment(e) == Some(Treatment::Specialize));
        if in_specialized_body && instantiations.record_for(site.id).is_none() {
            continue;
        }

        let rewrite = match classifications.treatment(site.target) {
            Some(Treatment::Native) | None => CallSiteRewrite::Unchanged,
            Some(Treatment::StructuralAdapter) => match adapters.call(site.id) {
                Some(call) => CallSiteRewrite::WrapArguments {
                    type_args: call.type_args.clone(),
                    adaptations: call.adaptations.clone(),
                },
                None => CallSiteRewrite::Unchanged,
            },
            Some(Treatment::Specialize | Treatment::Unsupported) => CallSiteRewrite::KeepGeneric,
        };
        rewrites.insert(entry, rewrite);
    }
    rewrites
}
