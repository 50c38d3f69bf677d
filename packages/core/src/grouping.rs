//! Materialisation of one-to-many join rows into parent entities.
//!
//! A `LEFT OUTER JOIN` of a parent table with a child table yields one row
//! per child, each repeating every parent column. [`RowGrouper`] collapses
//! those rows back into one [`Group`] per distinct parent, preserving the
//! order in which parents were first seen and the order of their children.
//!
//! # Identity
//!
//! Two rows belong to the same group iff their parents produce equal
//! [`GroupKey::group_key`] values. The key must cover every field of the
//! parent except the child list itself.
//!
//! # Children
//!
//! - Insertion order is preserved.
//! - A child identity already present in the group is ignored (first wins).
//! - A row with no child (`None`, the unmatched side of an outer join) still
//!   opens or locates its parent's group but adds nothing to it.
//!
//! The grouper does not sort. Callers that page through rows rely on the
//! source delivering each parent's rows contiguously.

use std::collections::HashSet;
use std::hash::Hash;

use indexmap::map::Entry;
use indexmap::IndexMap;
use thiserror::Error;

/// Structural identity of a parent entity for grouping purposes.
pub trait GroupKey {
    /// All non-child fields of the parent, in a hashable form.
    type Key: Eq + Hash;

    fn group_key(&self) -> Self::Key;
}

/// Rebuilds a parent with the child list collected for it.
pub trait Assemble<C>: Sized {
    fn assemble(self, children: Vec<C>) -> Self;
}

/// One flat result-set row: the parent columns plus at most one child.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinRow<P, C> {
    pub parent: P,
    pub child: Option<C>,
}

impl<P, C> JoinRow<P, C> {
    pub fn new(parent: P, child: Option<C>) -> Self {
        Self { parent, child }
    }
}

/// A parent with its ordered, deduplicated children.
#[derive(Debug, Clone, PartialEq)]
pub struct Group<P, C> {
    pub parent: P,
    pub children: Vec<C>,
}

impl<P: Assemble<C>, C> Group<P, C> {
    /// Fold the children back into the parent entity.
    pub fn assemble(self) -> P {
        self.parent.assemble(self.children)
    }
}

/// A lookup that must match at most one entity matched several.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("integrity violation: expected at most one {what}, found {found}")]
pub struct IntegrityViolation {
    /// Description of the singleton that was looked up.
    pub what: String,
    /// Number of distinct groups the rows produced.
    pub found: usize,
}

struct Accumulator<P, C> {
    parent: P,
    children: Vec<C>,
    seen: HashSet<C>,
}

/// Insertion-ordered accumulator of join rows.
pub struct RowGrouper<P: GroupKey, C> {
    groups: IndexMap<P::Key, Accumulator<P, C>>,
}

impl<P: GroupKey, C: Eq + Hash + Clone> RowGrouper<P, C> {
    pub fn new() -> Self {
        Self {
            groups: IndexMap::new(),
        }
    }

    /// Add a row. Returns `true` when the row opened a new group.
    pub fn push(&mut self, row: JoinRow<P, C>) -> bool {
        let JoinRow { parent, child } = row;
        let (opened, acc) = match self.groups.entry(parent.group_key()) {
            Entry::Occupied(e) => (false, e.into_mut()),
            Entry::Vacant(e) => (
                true,
                e.insert(Accumulator {
                    parent,
                    children: Vec::new(),
                    seen: HashSet::new(),
                }),
            ),
        };
        if let Some(child) = child {
            if acc.seen.insert(child.clone()) {
                acc.children.push(child);
            }
        }
        opened
    }

    /// Whether a group for `parent` already exists.
    pub fn contains(&self, parent: &P) -> bool {
        self.groups.contains_key(&parent.group_key())
    }

    /// Number of groups opened so far.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Emit the groups in first-seen order.
    pub fn finish(self) -> impl Iterator<Item = Group<P, C>> {
        self.groups.into_values().map(|acc| Group {
            parent: acc.parent,
            children: acc.children,
        })
    }

    /// Emit the only group, failing if the rows described more than one.
    pub fn finish_single(self, what: &str) -> Result<Option<Group<P, C>>, IntegrityViolation> {
        if self.groups.len() > 1 {
            tracing::warn!(what, found = self.groups.len(), "singleton lookup matched several groups");
            return Err(IntegrityViolation {
                what: what.to_string(),
                found: self.groups.len(),
            });
        }
        Ok(self.finish().next())
    }
}

impl<P: GroupKey, C: Eq + Hash + Clone> Default for RowGrouper<P, C> {
    fn default() -> Self {
        Self::new()
    }
}

/// Group every row of `rows`.
pub fn group_rows<P, C, I>(rows: I) -> Vec<Group<P, C>>
where
    P: GroupKey,
    C: Eq + Hash + Clone,
    I: IntoIterator<Item = JoinRow<P, C>>,
{
    let mut grouper = RowGrouper::new();
    for row in rows {
        grouper.push(row);
    }
    grouper.finish().collect()
}

/// Group rows that are expected to describe at most one parent.
pub fn single<P, C, I>(rows: I, what: &str) -> Result<Option<Group<P, C>>, IntegrityViolation>
where
    P: GroupKey,
    C: Eq + Hash + Clone,
    I: IntoIterator<Item = JoinRow<P, C>>,
{
    let mut grouper = RowGrouper::new();
    for row in rows {
        grouper.push(row);
    }
    grouper.finish_single(what)
}
