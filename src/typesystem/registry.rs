//! Discovery, deduplication and naming of structures and unions.
//!
//! The same structure typically recurs across dozens of unrelated signatures of an
//! image. [`StructureRegistry`] collects every struct/union node of every decoded type and
//! reduces them to one [`StructureEntry`] per distinct shape, so each shape is declared
//! once and referenced by name everywhere else.
//!
//! # Phases
//!
//! The registry moves through four phases, each consuming the previous state:
//!
//! 1. **Registration** ([`StructureRegistry::register`]) - every struct/union node, direct
//!    or nested, is matched against the known entries. Nodes that merge without renaming
//!    any member join the matching entry, everything else opens a new one.
//! 2. **Deduplication** ([`StructureRegistry::dedup`]) - entries sharing a tag (or both
//!    anonymous) that are structurally mergeable collapse into the entry with the most
//!    references. Tag-only forward references join the tag's definition. Same-tag entries
//!    that do not merge are flagged as conflicting.
//! 3. **Merging** ([`StructureRegistry::merge`]) - collapsing nested structures can make
//!    enclosing structures mergeable. Entries are compared again, treating nested
//!    structures that resolve to the same entry as equal, until nothing changes.
//! 4. **Freezing** ([`StructureRegistry::freeze`]) - every surviving entry gets its final
//!    name and positional member names. The resulting [`FrozenRegistry`] is read-only.
//!
//! # Naming
//!
//! - A tagged structure keeps its tag. When several conflicting entries share a tag, the
//!   first one encountered keeps it and the following ones become `Tag_1`, `Tag_2`, ...
//! - An anonymous structure is named `CDStruct_` (or `CDUnion_`) followed by the first
//!   eight hex digits of the SHA-1 digest of its shape, with a numeric suffix on collision.
//!
//! # Examples
//!
//! ```rust
//! use classdump::encoding::parse_type;
//! use classdump::typesystem::{StructureLookup, StructureRegistry, Usage};
//!
//! let mut registry = StructureRegistry::new();
//! registry.register(&parse_type("{Point=ff}")?, Usage::Method)?;
//! registry.register(&parse_type("{Point=ff}")?, Usage::Ivar)?;
//!
//! let frozen = registry.dedup()?.merge()?.freeze()?;
//! assert_eq!(frozen.len(), 1);
//!
//! let entry = frozen.lookup(&parse_type("{Point=ff}")?)?;
//! assert_eq!(entry.reference_count, 2);
//! assert_eq!(entry.name, "Point");
//! # Ok::<(), classdump::Error>(())
//! ```

use std::{
    collections::{HashMap, HashSet},
    marker::PhantomData,
};

use sha1::{Digest, Sha1};
use tracing::debug;

use crate::{
    encoding::{encode, encode_shape, CompositeKind, Type},
    Result,
};

/// Where a registered type was used
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Usage {
    /// Type of an instance variable
    Ivar,
    /// Return or parameter type of a method
    Method,
    /// Type of a property
    Property,
}

/// Placeholder types referenced by at least one registered type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Placeholders {
    /// A function pointer of unknown shape (`^?`) was seen
    pub function_pointers: bool,
    /// A block without encoded signature (`@?`) was seen
    pub blocks: bool,
}

/// Phase marker: types are being registered
#[derive(Debug)]
pub struct Registration;

/// Phase marker: same-tag entries have been collapsed
#[derive(Debug)]
pub struct Deduplicated;

/// Phase marker: nested merges have reached a fixed point
#[derive(Debug)]
pub struct Merged;

/// Mutable registry state shared by the first three phases
#[derive(Debug, Clone)]
struct RegistryEntry {
    ty: Type,
    reference_count: usize,
    used_in_method: bool,
    used_directly: bool,
    conflict: bool,
}

impl RegistryEntry {
    fn kind_and_tag(&self) -> Option<(CompositeKind, Option<&str>)> {
        self.ty
            .composite()
            .map(|(kind, body)| (kind, body.name.as_deref()))
    }

    fn is_forward_reference(&self) -> bool {
        self.ty
            .composite()
            .is_some_and(|(_, body)| body.is_forward_reference())
    }

    fn absorb_counts(&mut self, other: &RegistryEntry) {
        self.reference_count += other.reference_count;
        self.used_in_method |= other.used_in_method;
        self.used_directly |= other.used_directly;
    }
}

/// The structure registry before it is frozen.
///
/// The type parameter tracks the phase; each phase function consumes the registry and
/// returns it in the next phase, so the phases can only run in order.
#[derive(Debug)]
pub struct StructureRegistry<S = Registration> {
    entries: Vec<RegistryEntry>,
    /// `forward[i] = Some(j)` once entry `i` has been merged into entry `j`
    forward: Vec<Option<usize>>,
    /// Exact encoding of every registered node to the entry it joined
    keys: HashMap<String, usize>,
    /// Shape of every registered node to the first entry it joined
    shapes: HashMap<String, usize>,
    placeholders: Placeholders,
    _phase: PhantomData<S>,
}

impl Default for StructureRegistry<Registration> {
    fn default() -> Self {
        Self::new()
    }
}

impl StructureRegistry<Registration> {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        StructureRegistry {
            entries: Vec::new(),
            forward: Vec::new(),
            keys: HashMap::new(),
            shapes: HashMap::new(),
            placeholders: Placeholders::default(),
            _phase: PhantomData,
        }
    }

    /// Register every structure and union inside `ty`.
    ///
    /// ## Arguments
    /// * 'ty'    - A decoded ivar, method or property type
    /// * 'usage' - Where the type was used
    ///
    /// # Errors
    /// Returns [`crate::Error::InternalInconsistency`] if joining an entry fails, which
    /// indicates a bug in the merge logic.
    pub fn register(&mut self, ty: &Type, usage: Usage) -> Result<()> {
        if ty.contains(&|node| matches!(node, Type::FunctionPointer)) {
            self.placeholders.function_pointers = true;
        }
        if ty.contains(&|node| matches!(node, Type::Block(None))) {
            self.placeholders.blocks = true;
        }

        let mut found = Vec::new();
        ty.for_each_composite(&mut |node, direct| found.push((node.clone(), direct)));

        for (node, direct) in found {
            self.register_composite(&node, direct, usage)?;
        }
        Ok(())
    }

    fn register_composite(&mut self, node: &Type, direct: bool, usage: Usage) -> Result<()> {
        let Some((_, body)) = node.composite() else {
            return Ok(());
        };
        if body.name.is_none() && body.is_forward_reference() {
            return Ok(());
        }

        let key = encode(node);
        let index = match self.keys.get(&key) {
            Some(&index) => self.resolve(index),
            None => {
                let index = match self.find_joinable(node)? {
                    Some(index) => {
                        self.entries[index].ty.merge_with(node)?;
                        index
                    }
                    None => {
                        self.entries.push(RegistryEntry {
                            ty: node.clone(),
                            reference_count: 0,
                            used_in_method: false,
                            used_directly: false,
                            conflict: false,
                        });
                        self.forward.push(None);
                        self.entries.len() - 1
                    }
                };
                self.keys.insert(key, index);
                index
            }
        };
        self.shapes.entry(encode_shape(node)).or_insert(index);

        let entry = &mut self.entries[index];
        entry.reference_count += 1;
        entry.used_in_method |= usage != Usage::Ivar;
        entry.used_directly |= direct;
        Ok(())
    }

    /// The first entry `node` merges into without changing any member name on either side
    fn find_joinable(&self, node: &Type) -> Result<Option<usize>> {
        for (index, entry) in self.entries.iter().enumerate() {
            if self.forward[index].is_some() || !entry.ty.can_merge_with(node) {
                continue;
            }

            let mut left = entry.ty.clone();
            left.merge_with(node)?;
            let mut right = node.clone();
            right.merge_with(&entry.ty)?;
            if left == right {
                return Ok(Some(index));
            }
        }
        Ok(None)
    }

    /// Run the deduplication phase
    ///
    /// # Errors
    /// Returns [`crate::Error::InternalInconsistency`] if merging two entries of one
    /// cluster fails after their mergeability was checked.
    pub fn dedup(mut self) -> Result<StructureRegistry<Deduplicated>> {
        let mut groups: Vec<((CompositeKind, Option<String>), Vec<usize>)> = Vec::new();
        for index in self.alive() {
            let Some((kind, tag)) = self.entries[index].kind_and_tag() else {
                continue;
            };
            let group_key = (kind, tag.map(ToString::to_string));
            match groups.iter_mut().find(|(key, _)| *key == group_key) {
                Some((_, members)) => members.push(index),
                None => groups.push((group_key, vec![index])),
            }
        }

        for ((_, tag), members) in groups {
            let (forwards, definitions): (Vec<usize>, Vec<usize>) = members
                .into_iter()
                .partition(|&index| self.entries[index].is_forward_reference());

            if let Some(&target) = definitions.first().or(forwards.first()) {
                for &index in forwards.iter().filter(|&&index| index != target) {
                    self.forward_into(index, target);
                }
            }

            let mut remaining = definitions;
            let mut clusters = 0usize;
            while let Some(&seed) = remaining.first() {
                let (cluster, rest): (Vec<usize>, Vec<usize>) =
                    remaining.iter().partition(|&&index| {
                        self.entries[seed].ty.can_merge_with(&self.entries[index].ty)
                    });
                remaining = rest;
                clusters += 1;

                // Highest reference count wins, ties go to the earliest entry
                let Some(&canonical) = cluster.iter().reduce(|best, candidate| {
                    if self.entries[*candidate].reference_count
                        > self.entries[*best].reference_count
                    {
                        candidate
                    } else {
                        best
                    }
                }) else {
                    continue;
                };

                for &index in cluster.iter().filter(|&&index| index != canonical) {
                    let other = self.entries[index].ty.clone();
                    if !self.entries[canonical].ty.can_merge_with(&other) {
                        // Left for a later cluster
                        remaining.push(index);
                        continue;
                    }
                    self.entries[canonical].ty.merge_with(&other)?;
                    self.forward_into(index, canonical);
                }
            }

            if let Some(tag) = tag.filter(|_| clusters > 1) {
                debug!("conflicting definitions for structure tag {}", tag);
            }
        }
        self.refresh_conflicts();

        debug!(
            "structure registry deduplicated to {} entries",
            self.alive().count()
        );
        Ok(self.into_phase())
    }
}

impl StructureRegistry<Deduplicated> {
    /// Run the merge phase until no two entries merge any more
    ///
    /// # Errors
    /// Returns [`crate::Error::InternalInconsistency`] if a merge fails after its
    /// precondition was checked.
    pub fn merge(mut self) -> Result<StructureRegistry<Merged>> {
        let mut passes = 0usize;
        loop {
            passes += 1;
            let Some((left, right)) = self.find_mergeable_pair() else {
                break;
            };

            let (target, source) = if self.entries[right].reference_count
                > self.entries[left].reference_count
            {
                (right, left)
            } else {
                (left, right)
            };

            let mut merged = self.entries[target].ty.clone();
            let other = self.entries[source].ty.clone();
            merged.merge_with_by(&other, &|a: &Type, b: &Type| self.same_entry(a, b))?;
            self.entries[target].ty = merged;
            self.forward_into(source, target);
        }
        self.refresh_conflicts();

        debug!(
            "structure registry merged to {} entries after {} passes",
            self.alive().count(),
            passes
        );
        Ok(self.into_phase())
    }

    fn find_mergeable_pair(&self) -> Option<(usize, usize)> {
        let alive: Vec<usize> = self.alive().collect();
        for (position, &left) in alive.iter().enumerate() {
            for &right in &alive[position + 1..] {
                let a = &self.entries[left].ty;
                let b = &self.entries[right].ty;
                if a.can_merge_with_by(b, &|x: &Type, y: &Type| self.same_entry(x, y)) {
                    return Some((left, right));
                }
            }
        }
        None
    }

    /// Returns true if both nested composites resolve to one registry entry
    fn same_entry(&self, a: &Type, b: &Type) -> bool {
        match (self.resolve_node(a), self.resolve_node(b)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

impl StructureRegistry<Merged> {
    /// Name every surviving entry and freeze the registry
    ///
    /// # Errors
    /// Returns [`crate::Error::InternalInconsistency`] if a registered key does not
    /// resolve to a surviving entry.
    pub fn freeze(self) -> Result<FrozenRegistry> {
        let alive: Vec<usize> = self.alive().collect();
        let mut ids: Vec<Option<usize>> = vec![None; self.entries.len()];
        for (id, &index) in alive.iter().enumerate() {
            ids[index] = Some(id);
        }

        let mut taken: HashSet<String> = HashSet::new();
        let mut tag_uses: HashMap<String, usize> = HashMap::new();
        let mut entries = Vec::with_capacity(alive.len());

        // Tags first, so generated suffixes never take a real tag
        for &index in &alive {
            if let Some((_, Some(tag))) = self.entries[index].kind_and_tag() {
                taken.insert(tag.to_string());
            }
        }

        for (id, &index) in alive.iter().enumerate() {
            let source = &self.entries[index];
            let Some((kind, body)) = source.ty.composite() else {
                return Err(inconsistency!("registry entry {} is not a structure", index));
            };

            let (name, is_typedef) = match &body.name {
                Some(tag) => {
                    let uses = tag_uses.entry(tag.clone()).or_insert(0);
                    *uses += 1;
                    if *uses == 1 {
                        (tag.clone(), false)
                    } else {
                        (unique_name(&mut taken, tag, 1), false)
                    }
                }
                None => {
                    let prefix = match kind {
                        CompositeKind::Struct => "CDStruct",
                        CompositeKind::Union => "CDUnion",
                    };
                    let base = format!("{}_{}", prefix, shape_digest(&source.ty));
                    if taken.insert(base.clone()) {
                        (base, true)
                    } else {
                        (unique_name(&mut taken, &base, 1), true)
                    }
                }
            };

            let mut ty = source.ty.clone();
            ty.generate_member_names();

            entries.push(StructureEntry {
                id,
                kind,
                depth: ty.structure_depth(),
                ty,
                name,
                is_typedef,
                reference_count: source.reference_count,
                used_in_method: source.used_in_method,
                used_directly: source.used_directly,
                conflict: source.conflict,
            });
        }

        let resolve_id = |key: &String, index: usize| -> Result<(String, usize)> {
            ids[self.resolve(index)]
                .map(|id| (key.clone(), id))
                .ok_or_else(|| inconsistency!("key {} resolves to a merged entry", key))
        };
        let keys = self
            .keys
            .iter()
            .map(|(key, &index)| resolve_id(key, index))
            .collect::<Result<HashMap<_, _>>>()?;
        let mut shapes = self
            .shapes
            .iter()
            .map(|(key, &index)| resolve_id(key, index))
            .collect::<Result<HashMap<_, _>>>()?;
        for entry in &entries {
            shapes.entry(encode_shape(&entry.ty)).or_insert(entry.id);
        }

        debug!("structure registry frozen with {} entries", entries.len());
        Ok(FrozenRegistry {
            entries,
            keys,
            shapes,
            placeholders: self.placeholders,
        })
    }
}

impl<S> StructureRegistry<S> {
    fn into_phase<T>(self) -> StructureRegistry<T> {
        StructureRegistry {
            entries: self.entries,
            forward: self.forward,
            keys: self.keys,
            shapes: self.shapes,
            placeholders: self.placeholders,
            _phase: PhantomData,
        }
    }

    /// Flag every surviving entry whose tag is shared with another surviving entry
    fn refresh_conflicts(&mut self) {
        let mut counts: HashMap<String, usize> = HashMap::new();
        for index in self.alive() {
            if let Some((_, Some(tag))) = self.entries[index].kind_and_tag() {
                *counts.entry(tag.to_string()).or_insert(0) += 1;
            }
        }
        for index in self.alive().collect::<Vec<_>>() {
            let conflict = match self.entries[index].kind_and_tag() {
                Some((_, Some(tag))) => counts.get(tag).is_some_and(|&count| count > 1),
                _ => false,
            };
            self.entries[index].conflict = conflict;
        }
    }

    fn alive(&self) -> impl Iterator<Item = usize> + '_ {
        self.forward
            .iter()
            .enumerate()
            .filter(|(_, target)| target.is_none())
            .map(|(index, _)| index)
    }

    fn resolve(&self, mut index: usize) -> usize {
        while let Some(Some(target)) = self.forward.get(index) {
            index = *target;
        }
        index
    }

    fn forward_into(&mut self, index: usize, target: usize) {
        let source = self.entries[index].clone();
        self.entries[target].absorb_counts(&source);
        self.forward[index] = Some(target);
    }

    /// The surviving entry a struct/union node belongs to
    fn resolve_node(&self, node: &Type) -> Option<usize> {
        if let Some(&index) = self.keys.get(&encode(node)) {
            return Some(self.resolve(index));
        }
        self.alive()
            .find(|&index| self.entries[index].ty.can_merge_with(node))
    }

    /// Number of entries that have not been merged into another entry
    #[must_use]
    pub fn len(&self) -> usize {
        self.alive().count()
    }

    /// Returns true if nothing has been registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Placeholder types seen so far
    #[must_use]
    pub fn placeholders(&self) -> Placeholders {
        self.placeholders
    }
}

/// First eight hex digits of the SHA-1 digest of a type's shape
fn shape_digest(ty: &Type) -> String {
    let digest = Sha1::digest(encode_shape(ty).as_bytes());
    digest
        .iter()
        .take(4)
        .map(|byte| format!("{:02x}", byte))
        .collect()
}

/// `base_N` for the smallest `N >= start` that is not taken yet; marks it taken
fn unique_name(taken: &mut HashSet<String>, base: &str, start: usize) -> String {
    let mut suffix = start;
    loop {
        let candidate = format!("{}_{}", base, suffix);
        if taken.insert(candidate.clone()) {
            return candidate;
        }
        suffix += 1;
    }
}

/// A named, deduplicated structure or union
#[derive(Debug, Clone, PartialEq)]
pub struct StructureEntry {
    /// Position in the frozen registry, in order of first encounter
    pub id: usize,
    /// Struct or union
    pub kind: CompositeKind,
    /// The canonical merged type, with every member named
    pub ty: Type,
    /// Tag or typedef name under which the structure is declared
    pub name: String,
    /// True for anonymous structures, which are declared through a typedef
    pub is_typedef: bool,
    /// Number of use sites
    pub reference_count: usize,
    /// Used by at least one method or property
    pub used_in_method: bool,
    /// Used at least once outside of another structure
    pub used_directly: bool,
    /// Another entry with a different shape shares the original tag
    pub conflict: bool,
    /// Structure depth of `ty`
    pub depth: usize,
}

impl StructureEntry {
    /// The type name used when referencing this structure, e.g. `struct CGPoint`
    #[must_use]
    pub fn reference_name(&self) -> String {
        if self.is_typedef {
            self.name.clone()
        } else {
            format!("{} {}", self.kind, self.name)
        }
    }

    /// Returns true if no member list was ever seen for this structure
    #[must_use]
    pub fn is_forward_declaration(&self) -> bool {
        self.ty
            .composite()
            .is_some_and(|(_, body)| body.is_forward_reference())
    }
}

/// Read access to named structures, used by the type formatter
pub trait StructureLookup {
    /// The entry a struct/union node belongs to
    ///
    /// # Errors
    /// Returns [`crate::Error::InternalInconsistency`] if the node was never registered.
    fn lookup(&self, ty: &Type) -> Result<&StructureEntry>;
}

/// The structure registry after naming; never changes again
#[derive(Debug, Clone, Default)]
pub struct FrozenRegistry {
    entries: Vec<StructureEntry>,
    keys: HashMap<String, usize>,
    shapes: HashMap<String, usize>,
    placeholders: Placeholders,
}

impl FrozenRegistry {
    /// All entries in order of first encounter
    #[must_use]
    pub fn entries(&self) -> &[StructureEntry] {
        &self.entries
    }

    /// The entry with the given id
    #[must_use]
    pub fn get(&self, id: usize) -> Option<&StructureEntry> {
        self.entries.get(id)
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the image declares no structures
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Placeholder types used anywhere in the image
    #[must_use]
    pub fn placeholders(&self) -> Placeholders {
        self.placeholders
    }

    /// Registration after freezing returns the existing entry and changes nothing
    ///
    /// # Errors
    /// Returns [`crate::Error::InternalInconsistency`] if `ty` is not a known structure.
    pub fn register(&self, ty: &Type) -> Result<&StructureEntry> {
        self.lookup(ty)
    }

    /// Ids of the entries the members of entry `id` refer to, directly or through pointers
    /// and arrays, in member order and without duplicates
    ///
    /// # Errors
    /// Returns [`crate::Error::InternalInconsistency`] if a nested structure is unknown.
    pub fn nested_entries(&self, id: usize) -> Result<Vec<usize>> {
        let Some(entry) = self.get(id) else {
            return Err(inconsistency!("unknown structure id {}", id));
        };
        let Some((_, body)) = entry.ty.composite() else {
            return Ok(Vec::new());
        };

        let mut nodes = Vec::new();
        for member in &body.members {
            member
                .ty
                .for_each_composite(&mut |node, direct| {
                    if direct {
                        nodes.push(node.clone());
                    }
                });
        }

        let mut nested = Vec::new();
        for node in nodes {
            if is_unregistered(&node) {
                continue;
            }
            let nested_id = self.lookup(&node)?.id;
            if nested_id != id && !nested.contains(&nested_id) {
                nested.push(nested_id);
            }
        }
        Ok(nested)
    }
}

/// Anonymous tag-only nodes (`{?}`) carry nothing and are never registered
pub(crate) fn is_unregistered(ty: &Type) -> bool {
    ty.composite()
        .is_some_and(|(_, body)| body.name.is_none() && body.is_forward_reference())
}

impl StructureLookup for FrozenRegistry {
    fn lookup(&self, ty: &Type) -> Result<&StructureEntry> {
        let found = self
            .keys
            .get(&encode(ty))
            .or_else(|| self.shapes.get(&encode_shape(ty)))
            .copied()
            .or_else(|| {
                self.entries
                    .iter()
                    .find(|entry| entry.ty.can_merge_with(ty))
                    .map(|entry| entry.id)
            });

        found
            .and_then(|id| self.entries.get(id))
            .ok_or_else(|| inconsistency!("structure {} was never registered", encode(ty)))
    }
}
