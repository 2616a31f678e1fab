//! Call-site rewrite table handed to the printer

use crate::adapter::ArgumentAdaptation;
use crate::collector::InstantiationKey;
use indexmap::IndexMap;
use shapeshift_program::{CallSiteId, DeclarationId, Type};
use std::fmt;

/// A call site, either in the original program or inside a generated specialization
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RewriteSite {
    /// Call site as written in a non-specialized body or at top level
    Direct(CallSiteId),
    /// Copy of a call site inside the body of the named specialization
    Nested {
        call_site: CallSiteId,
        within: String,
    },
}

impl fmt::Display for RewriteSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RewriteSite::Direct(call_site) => write!(f, "{call_site}"),
            RewriteSite::Nested { call_site, within } => write!(f, "{call_site} in {within}"),
        }
    }
}

/// What the printer does with one call site
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallSiteRewrite {
    /// Native generic: emit as written
    Unchanged,
    /// Structural adapter: pass interface type arguments and convert arguments
    WrapArguments {
        type_args: Vec<Type>,
        adaptations: Vec<ArgumentAdaptation>,
    },
    /// Call the generated specialization directly
    InvokeSpecialization {
        declaration: DeclarationId,
        specialization: String,
        key: InstantiationKey,
        adaptations: Vec<ArgumentAdaptation>,
    },
    /// Unsupported target keeps its generic form
    KeepGeneric,
}

impl CallSiteRewrite {
    pub fn specialization(&self) -> Option<&str> {
        match self {
            CallSiteRewrite::InvokeSpecialization { specialization, .. } => Some(specialization),
            _ => None,
        }
    }

    pub fn adaptations(&self) -> &[ArgumentAdaptation] {
        match self {
            CallSiteRewrite::WrapArguments { adaptations, .. }
            | CallSiteRewrite::InvokeSpecialization { adaptations, .. } => adaptations,
            CallSiteRewrite::Unchanged | CallSiteRewrite::KeepGeneric => &[],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RewriteTable {
    entries: IndexMap<RewriteSite, CallSiteRewrite>,
}

impl RewriteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, site: RewriteSite, rewrite: CallSiteRewrite) {
        self.entries.insert(site, rewrite);
    }

    pub fn get(&self, site: &RewriteSite) -> Option<&CallSiteRewrite> {
        self.entries.get(site)
    }

    pub fn direct(&self, call_site: CallSiteId) -> Option<&CallSiteRewrite> {
        self.entries.get(&RewriteSite::Direct(call_site))
    }

    pub fn nested(&self, call_site: CallSiteId, within: &str) -> Option<&CallSiteRewrite> {
        self.entries.get(&RewriteSite::Nested {
            call_site,
            within: within.to_string(),
        })
    }

    pub fn contains(&self, site: &RewriteSite) -> bool {
        self.entries.contains_key(site)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RewriteSite, &CallSiteRewrite)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn merge(&mut self, other: RewriteTable) {
        self.entries.extend(other.entries);
    }

    pub(crate) fn sort(&mut self) {
        self.entries.sort_keys();
    }
}
