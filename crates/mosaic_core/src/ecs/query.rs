//! Queries: declarative component filters with a live membership set.
//!
//! A query never inspects the world on its own. The `World` calls
//! `candidate`, `add` and `remove` whenever an entity is created, destroyed or
//! changes composition, and the query keeps its member set in sync.

use crate::bitmask::{add_bit, has_any_of_bits, has_bit, Bitmask};
use crate::ecs::{ComponentId, Entity, EntityId};
use indexmap::IndexSet;

/// `all` / `any` / `none` masks describing which compositions match.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryFilter {
    all: Bitmask,
    any: Bitmask,
    none: Bitmask,
}

impl QueryFilter {
    /// Empty filter; matches every entity.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_masks(all: Bitmask, any: Bitmask, none: Bitmask) -> Self {
        Self { all, any, none }
    }

    /// Require every listed component.
    pub fn all<I>(mut self, components: I) -> Self
    where
        I: IntoIterator<Item = ComponentId>,
    {
        self.all = Self::fold(self.all, components);
        self
    }

    /// Require at least one of the listed components.
    pub fn any<I>(mut self, components: I) -> Self
    where
        I: IntoIterator<Item = ComponentId>,
    {
        self.any = Self::fold(self.any, components);
        self
    }

    /// Reject entities carrying any of the listed components.
    pub fn none<I>(mut self, components: I) -> Self
    where
        I: IntoIterator<Item = ComponentId>,
    {
        self.none = Self::fold(self.none, components);
        self
    }

    #[inline]
    pub fn all_mask(&self) -> &Bitmask {
        &self.all
    }

    #[inline]
    pub fn any_mask(&self) -> &Bitmask {
        &self.any
    }

    #[inline]
    pub fn none_mask(&self) -> &Bitmask {
        &self.none
    }

    /// `all` satisfied, `any` satisfied or empty, and nothing from `none`.
    pub fn matches_mask(&self, mask: &Bitmask) -> bool {
        has_bit(mask, &self.all)
            && (self.any.is_zero() || has_any_of_bits(mask, &self.any))
            && !has_any_of_bits(mask, &self.none)
    }

    /// Whether gaining `bit` could make an entity start matching.
    pub(crate) fn wants(&self, bit: &Bitmask) -> bool {
        has_any_of_bits(&self.all, bit) || has_any_of_bits(&self.any, bit)
    }

    /// Whether `bit` is excluded by this filter.
    pub(crate) fn excludes(&self, bit: &Bitmask) -> bool {
        has_any_of_bits(&self.none, bit)
    }

    /// Whether `bit` appears anywhere in the filter.
    pub(crate) fn mentions(&self, bit: &Bitmask) -> bool {
        self.wants(bit) || self.excludes(bit)
    }

    fn fold<I>(mask: Bitmask, components: I) -> Bitmask
    where
        I: IntoIterator<Item = ComponentId>,
    {
        components
            .into_iter()
            .fold(mask, |mask, id| add_bit(&mask, &id.mask()))
    }
}

/// A filter plus the entities currently satisfying it.
///
/// Membership uses an insertion-ordered hash set: O(1) insert, remove and
/// lookup. Removal swaps the last member into the freed slot, so systems
/// receive a snapshot rather than iterating the live set.
#[derive(Debug)]
pub struct Query {
    id: String,
    filter: QueryFilter,
    members: IndexSet<EntityId>,
}

impl Query {
    pub(crate) fn new(id: impl Into<String>, filter: QueryFilter) -> Self {
        Self {
            id: id.into(),
            filter,
            members: IndexSet::new(),
        }
    }

    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[inline]
    pub fn filter(&self) -> &QueryFilter {
        &self.filter
    }

    #[inline]
    pub fn all(&self) -> &Bitmask {
        self.filter.all_mask()
    }

    #[inline]
    pub fn any(&self) -> &Bitmask {
        self.filter.any_mask()
    }

    #[inline]
    pub fn none(&self) -> &Bitmask {
        self.filter.none_mask()
    }

    pub fn matches(&self, entity: &Entity) -> bool {
        self.filter.matches_mask(entity.mask())
    }

    pub fn contains(&self, entity: &str) -> bool {
        self.members.contains(entity)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Current members. Order is insertion order until a member is removed.
    pub fn iter(&self) -> impl Iterator<Item = &EntityId> {
        self.members.iter()
    }

    /// Owned copy of the current members, safe to hold while the world mutates.
    pub fn snapshot(&self) -> Vec<EntityId> {
        self.members.iter().cloned().collect()
    }

    /// Evaluate a new or re-checked entity. Returns `true` if it became a member.
    pub(crate) fn candidate(&mut self, entity: &Entity) -> bool {
        if self.members.contains(entity.id().as_str()) || !self.matches(entity) {
            return false;
        }
        self.members.insert(entity.id().clone())
    }

    /// Called after a component addition that touches this filter. A single
    /// new bit does not guarantee a multi-bit filter is satisfied, so the
    /// entity is re-verified before it is inserted.
    pub(crate) fn add(&mut self, entity: &Entity) -> bool {
        self.candidate(entity)
    }

    /// Unconditional, idempotent removal. Returns `true` if it was a member.
    pub(crate) fn remove(&mut self, entity: &str) -> bool {
        self.members.swap_remove(entity)
    }
}
