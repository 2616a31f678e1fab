// Shapeshift Specializer Configuration
// Tunables for a single specialization pass

/// How exported generic declarations are treated when computing boundedness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportPolicy {
    /// Exported declarations are unbounded only when nothing in the unit calls them
    #[default]
    UnboundedWhenUncalled,
    /// Every exported declaration is unbounded, whatever its internal call sites
    AlwaysUnbounded,
}

/// Which target representation unconstrained and structurally-constrained generics get
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GenericStrategy {
    /// Emit native target generics wherever the classification rules allow
    #[default]
    PreferNative,
    /// Monomorphize every generic declaration with a bounded instantiation set
    MonomorphizeAll,
}

/// Configuration for [`crate::specialize_program`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecializerConfig {
    pub export_policy: ExportPolicy,
    pub generic_strategy: GenericStrategy,
    /// Classify independent declarations on the rayon thread pool
    pub parallel: bool,
    /// Maximum nesting depth of a transitively discovered type argument
    pub max_type_depth: usize,
    /// Maximum number of diagnostics kept by the collector
    pub max_diagnostics: usize,
}

impl SpecializerConfig {
    /// Create a configuration with default settings
    pub fn new() -> Self {
        Self {
            export_policy: ExportPolicy::default(),
            generic_strategy: GenericStrategy::default(),
            parallel: false,
            max_type_depth: 16,
            max_diagnostics: 100,
        }
    }

    pub fn with_export_policy(mut self, export_policy: ExportPolicy) -> Self {
        self.export_policy = export_policy;
        self
    }

    pub fn with_generic_strategy(mut self, generic_strategy: GenericStrategy) -> Self {
        self.generic_strategy = generic_strategy;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_max_type_depth(mut self, max_type_depth: usize) -> Self {
        self.max_type_depth = max_type_depth;
        self
    }

    pub fn with_max_diagnostics(mut self, max_diagnostics: usize) -> Self {
        self.max_diagnostics = max_diagnostics;
        self
    }
}

impl Default for SpecializerConfig {
    fn default() -> Self {
        Self::new()
    }
}
