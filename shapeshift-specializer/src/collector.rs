//! Instantiation collection
//!
//! A single pass over every call site records, per generic declaration, the
//! set of concrete type-argument tuples it is used with. Structurally equal
//! tuples collapse to one [`InstantiationKey`] regardless of discovery order.

use crate::config::{ExportPolicy, SpecializerConfig};
use crate::naming::TypeSerializer;
use crate::substitution::Substitution;
use indexmap::IndexMap;
use shapeshift_program::{
    Argument, CallKind, CallSite, CallSiteId, DeclarationId, FunctionType, GenericDeclaration,
    IndexSignature, ObjectShape, Program, Property, TupleElement, Type,
};
use std::fmt;
use tracing::{debug, info, instrument, trace};

/// Canonical form of a type: unions flattened, de-duplicated and sorted,
/// object properties sorted by name
pub fn canonicalize(ty: &Type) -> Type {
    match ty {
        Type::Union(members) => {
            let mut flat = Vec::new();
            flatten_union(members, &mut flat);
            if flat.contains(&Type::Any) {
                return Type::Any;
            }
            if flat.contains(&Type::Unknown) {
                return Type::Unknown;
            }
            flat.retain(|m| *m != Type::Never);
            flat.sort();
            flat.dedup();
            match flat.len() {
                0 => Type::Never,
                1 => flat.remove(0),
                _ => Type::Union(flat),
            }
        }
        Type::Object(shape) => Type::Object(canonicalize_shape(shape)),
        Type::Named { name, args } => Type::Named {
            name: name.clone(),
            args: args.iter().map(canonicalize).collect(),
        },
        Type::Array(element) => Type::array(canonicalize(element)),
        Type::Tuple(elements) => Type::Tuple(
            elements
                .iter()
                .map(|e| TupleElement {
                    ty: canonicalize(&e.ty),
                    optional: e.optional,
                    rest: e.rest,
                })
                .collect(),
        ),
        Type::Function(function) => Type::Function(FunctionType {
            params: function.params.iter().map(canonicalize).collect(),
            rest: function.rest.as_ref().map(|r| Box::new(canonicalize(r))),
            return_type: Box::new(canonicalize(&function.return_type)),
        }),
        Type::Conditional(conditional) => Type::conditional(
            canonicalize(&conditional.check),
            canonicalize(&conditional.extends),
            canonicalize(&conditional.then_type),
            canonicalize(&conditional.else_type),
        ),
        other => other.clone(),
    }
}

fn flatten_union(members: &[Type], flat: &mut Vec<Type>) {
    for member in members {
        match canonicalize(member) {
            Type::Union(inner) => flat.extend(inner),
            other => flat.push(other),
        }
    }
}

/// Canonical form of an object shape
pub fn canonicalize_shape(shape: &ObjectShape) -> ObjectShape {
    let mut properties: Vec<Property> = shape
        .properties
        .iter()
        .map(|p| Property {
            name: p.name.clone(),
            ty: canonicalize(&p.ty),
            optional: p.optional,
        })
        .collect();
    properties.sort_by(|a, b| a.name.cmp(&b.name));
    ObjectShape {
        properties,
        index: shape.index.as_ref().map(|index| IndexSignature {
            key: Box::new(canonicalize(&index.key)),
            value: Box::new(canonicalize(&index.value)),
        }),
    }
}

/// Canonical identity of one instantiation: `<declaration>:<serialized tuple>`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstantiationKey(String);

impl InstantiationKey {
    pub fn new(declaration: DeclarationId, tuple: &InstantiationTuple) -> Self {
        InstantiationKey(format!(
            "{}:{}",
            declaration.0,
            TypeSerializer::serialize_components(&tuple.components())
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstantiationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Concrete arguments of one instantiation
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstantiationTuple {
    /// Receiver class for self-typed methods
    pub receiver: Option<Type>,
    /// Type arguments with defaults filled in
    pub type_args: Vec<Type>,
}

impl InstantiationTuple {
    /// Receiver first, then type arguments
    pub fn components(&self) -> Vec<Type> {
        self.receiver
            .iter()
            .chain(self.type_args.iter())
            .cloned()
            .collect()
    }
}

/// One use of a declaration with a concrete instantiation
#[derive(Debug, Clone, PartialEq)]
pub struct InstantiationRecord {
    pub declaration: DeclarationId,
    pub key: InstantiationKey,
    pub tuple: InstantiationTuple,
    pub call_site: CallSiteId,
}

/// Why a declaration's instantiation set cannot be enumerated
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UnboundedReason {
    ExportedWithoutCallSites,
    ExportedSurface,
    EscapingReference { call_site: CallSiteId },
    DependentOnUnspecialized { enclosing: DeclarationId },
    PolymorphicRecursion { depth: usize },
}

impl fmt::Display for UnboundedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnboundedReason::ExportedWithoutCallSites => {
                write!(f, "it is exported and has no call sites in the compiled unit")
            }
            UnboundedReason::ExportedSurface => {
                write!(f, "it is part of the exported surface")
            }
            UnboundedReason::EscapingReference { call_site } => {
                write!(f, "it is used as a first-class value at {call_site}")
            }
            UnboundedReason::DependentOnUnspecialized { enclosing } => {
                write!(f, "it is instantiated from the generic body of {enclosing}, which is not specialized")
            }
            UnboundedReason::PolymorphicRecursion { depth } => {
                write!(f, "its type arguments grow without bound (depth {depth})")
            }
        }
    }
}

/// A call inside a generic body whose type arguments mention the enclosing declaration's parameters
#[derive(Debug, Clone, PartialEq)]
pub struct DependentUse {
    pub call_site: CallSiteId,
    pub target: DeclarationId,
    pub enclosing: DeclarationId,
    /// Default-filled, still open type arguments
    pub type_args: Vec<Type>,
    /// Open receiver for self-typed targets
    pub receiver: Option<Type>,
    pub arguments: Vec<Argument>,
}

/// Output of the collector
#[derive(Debug, Clone, Default)]
pub struct InstantiationSet {
    records: Vec<InstantiationRecord>,
    by_declaration: IndexMap<DeclarationId, IndexMap<InstantiationKey, InstantiationTuple>>,
    call_sites: IndexMap<InstantiationKey, Vec<CallSiteId>>,
    unbounded: IndexMap<DeclarationId, UnboundedReason>,
    dependent_uses: Vec<DependentUse>,
}

impl InstantiationSet {
    /// Distinct instantiations of a declaration, sorted by key
    pub fn instantiations(
        &self,
        declaration: DeclarationId,
    ) -> impl Iterator<Item = (&InstantiationKey, &InstantiationTuple)> {
        self.by_declaration
            .get(&declaration)
            .into_iter()
            .flat_map(|keys| keys.iter())
    }

    pub fn instantiation_count(&self, declaration: DeclarationId) -> usize {
        self.by_declaration
            .get(&declaration)
            .map_or(0, IndexMap::len)
    }

    /// Call sites recorded against a key, in id order
    pub fn call_sites(&self, key: &InstantiationKey) -> &[CallSiteId] {
        self.call_sites.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn records(&self) -> &[InstantiationRecord] {
        &self.records
    }

    /// The record of a direct call site, if it has a concrete instantiation
    pub fn record_for(&self, call_site: CallSiteId) -> Option<&InstantiationRecord> {
        self.records.iter().find(|r| r.call_site == call_site)
    }

    pub fn unbounded_reason(&self, declaration: DeclarationId) -> Option<&UnboundedReason> {
        self.unbounded.get(&declaration)
    }

    pub fn is_unbounded(&self, declaration: DeclarationId) -> bool {
        self.unbounded.contains_key(&declaration)
    }

    /// Dependent uses inside the body of `enclosing`
    pub fn dependent_uses_in(&self, enclosing: DeclarationId) -> Vec<&DependentUse> {
        self.dependent_uses
            .iter()
            .filter(|u| u.enclosing == enclosing)
            .collect()
    }

    /// Dependent uses targeting `target`
    pub fn dependent_uses_of(&self, target: DeclarationId) -> Vec<&DependentUse> {
        self.dependent_uses
            .iter()
            .filter(|u| u.target == target)
            .collect()
    }

    pub fn dependent_uses(&self) -> &[DependentUse] {
        &self.dependent_uses
    }

    /// Total number of distinct keys across declarations
    pub fn key_count(&self) -> usize {
        self.by_declaration.values().map(IndexMap::len).sum()
    }
}

/// Build the canonical instantiation tuple for `type_args` applied to `declaration`
///
/// Omitted trailing arguments take their declared defaults, with earlier
/// parameters substituted into them.
pub fn fill_defaults(declaration: &GenericDeclaration, type_args: &[Type]) -> Vec<Type> {
    let mut filled: Vec<Type> = type_args.to_vec();
    for param in declaration.type_params.iter().skip(type_args.len()) {
        let Some(default) = &param.default else {
            break;
        };
        let substitution = Substitution::for_declaration(declaration, &filled);
        filled.push(substitution.apply(default));
    }
    filled
}

fn is_open(ty: &Type) -> bool {
    ty.mentions_params() || ty.mentions_this()
}

/// Walks the program's call sites once and records instantiations
#[derive(Debug)]
pub struct InstantiationCollector<'a> {
    program: &'a Program,
    export_policy: ExportPolicy,
}

impl<'a> InstantiationCollector<'a> {
    pub fn new(program: &'a Program, config: &SpecializerConfig) -> Self {
        Self {
            program,
            export_policy: config.export_policy,
        }
    }

    /// Collect instantiations for every declaration in the program
    #[instrument(skip_all, fields(call_sites = self.program.call_sites.len()))]
    pub fn collect(&self) -> InstantiationSet {
        let mut set = InstantiationSet::default();

        let mut sites: Vec<&CallSite> = self.program.call_sites.iter().collect();
        sites.sort_by_key(|site| site.id);

        for site in sites {
            let Some(declaration) = self.program.declaration(site.target) else {
                // Dangling targets are rejected by Program::validate
                continue;
            };
            self.collect_site(declaration, site, &mut set);
        }

        self.flag_exports(&mut set);

        set.by_declaration.sort_keys();
        for keys in set.by_declaration.values_mut() {
            keys.sort_keys();
        }
        set.call_sites.sort_keys();
        set.unbounded.sort_keys();

        info!(
            records = set.records.len(),
            keys = set.key_count(),
            dependent = set.dependent_uses.len(),
            unbounded = set.unbounded.len(),
            "collected instantiations"
        );
        set
    }

    fn collect_site(
        &self,
        declaration: &GenericDeclaration,
        site: &CallSite,
        set: &mut InstantiationSet,
    ) {
        if site.kind == CallKind::Reference {
            debug!(
                declaration = %declaration.display_name(),
                call_site = %site.id,
                "escaping reference"
            );
            set.unbounded
                .entry(declaration.id)
                .or_insert(UnboundedReason::EscapingReference { call_site: site.id });
            return;
        }

        let type_args = fill_defaults(declaration, &site.type_args);
        let receiver = if declaration.is_self_typed() {
            site.receiver.clone()
        } else {
            None
        };

        let open = type_args.iter().any(is_open) || receiver.as_ref().is_some_and(is_open);
        if open {
            if let Some(enclosing) = site.enclosing {
                trace!(
                    declaration = %declaration.display_name(),
                    call_site = %site.id,
                    %enclosing,
                    "dependent use"
                );
                set.dependent_uses.push(DependentUse {
                    call_site: site.id,
                    target: declaration.id,
                    enclosing,
                    type_args,
                    receiver,
                    arguments: site.arguments.clone(),
                });
            }
            return;
        }

        let tuple = InstantiationTuple {
            receiver: receiver.as_ref().map(canonicalize),
            type_args: type_args.iter().map(canonicalize).collect(),
        };
        let key = InstantiationKey::new(declaration.id, &tuple);
        trace!(
            declaration = %declaration.display_name(),
            call_site = %site.id,
            %key,
            "instantiation"
        );

        set.by_declaration
            .entry(declaration.id)
            .or_default()
            .entry(key.clone())
            .or_insert_with(|| tuple.clone());
        set.call_sites.entry(key.clone()).or_default().push(site.id);
        set.records.push(InstantiationRecord {
            declaration: declaration.id,
            key,
            tuple,
            call_site: site.id,
        });
    }

    fn flag_exports(&self, set: &mut InstantiationSet) {
        for declaration in self.program.sorted_declarations() {
            if !declaration.exported || set.unbounded.contains_key(&declaration.id) {
                continue;
            }
            let reason = match self.export_policy {
                ExportPolicy::AlwaysUnbounded => Some(UnboundedReason::ExportedSurface),
                ExportPolicy::UnboundedWhenUncalled => {
                    let called = set.by_declaration.contains_key(&declaration.id)
                        || set.dependent_uses.iter().any(|u| u.target == declaration.id);
                    (!called).then_some(UnboundedReason::ExportedWithoutCallSites)
                }
            };
            if let Some(reason) = reason {
                debug!(declaration = %declaration.display_name(), %reason, "unbounded export");
                set.unbounded.insert(declaration.id, reason);
            }
        }
    }
}
