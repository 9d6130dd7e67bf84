//! Incremental presentation reconciliation.
//!
//! [`reconcile`] diffs the previously rendered id→index map against the new
//! buffered window and produces the structural operations the presentation
//! layer applies, in an order that is safe to apply one by one: every
//! `Remove` first (freeing pooled nodes), then `Move`, then `Add`.
//!
//! The function is pure. Calling it again with its own output as the
//! previous state yields no operations.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::item::ItemId;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DomOperation {
    Add { id: ItemId, index: usize },
    Remove { id: ItemId },
    Move { id: ItemId, from: usize, to: usize },
}

impl DomOperation {
    pub fn id(&self) -> &ItemId {
        match self {
            DomOperation::Add { id, .. }
            | DomOperation::Remove { id }
            | DomOperation::Move { id, .. } => id,
        }
    }
}

/// Buckets operations by kind and yields them in apply-safe order.
#[derive(Debug, Default)]
pub struct OperationBatch {
    removes: Vec<DomOperation>,
    moves: Vec<DomOperation>,
    adds: Vec<DomOperation>,
}

impl OperationBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, op: DomOperation) {
        match op {
            DomOperation::Remove { .. } => self.removes.push(op),
            DomOperation::Move { .. } => self.moves.push(op),
            DomOperation::Add { .. } => self.adds.push(op),
        }
    }

    pub fn len(&self) -> usize {
        self.removes.len() + self.moves.len() + self.adds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes, then moves by destination index, then adds.
    pub fn into_ordered(mut self) -> Vec<DomOperation> {
        self.moves.sort_by_key(|op| match op {
            DomOperation::Move { to, .. } => *to,
            _ => usize::MAX,
        });
        let mut out = self.removes;
        out.reserve(self.moves.len() + self.adds.len());
        out.extend(self.moves);
        out.extend(self.adds);
        out
    }
}

/// What the presentation layer currently shows: id → grid position.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RenderedSet {
    by_id: HashMap<ItemId, usize>,
}

impl RenderedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_window(window: &[ItemId], start: usize) -> Self {
        let mut by_id = HashMap::with_capacity(window.len());
        for (offset, id) in window.iter().enumerate() {
            by_id.entry(id.clone()).or_insert(start + offset);
        }
        Self { by_id }
    }

    pub fn index_of(&self, id: &ItemId) -> Option<usize> {
        self.by_id.get(id).copied()
    }

    pub fn contains(&self, id: &ItemId) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Entries ordered by index.
    pub fn sorted(&self) -> Vec<(ItemId, usize)> {
        let mut v: Vec<_> = self.by_id.iter().map(|(id, i)| (id.clone(), *i)).collect();
        v.sort_by_key(|(_, i)| *i);
        v
    }
}

#[derive(Debug, Default)]
pub struct Reconciliation {
    pub operations: Vec<DomOperation>,
    /// Every id in the new buffered window with its index, in index order.
    pub admission_request: Vec<(ItemId, usize)>,
    /// Ids rendered before but outside the new window, in old index order.
    pub eviction_candidates: Vec<ItemId>,
    /// The rendered set after applying `operations`.
    pub rendered: RenderedSet,
}

impl Reconciliation {
    pub fn has_operations(&self) -> bool {
        !self.operations.is_empty()
    }
}

/// Diffs `previous` against the window `window` which starts at grid
/// position `start`.
pub fn reconcile(previous: &RenderedSet, window: &[ItemId], start: usize) -> Reconciliation {
    let rendered = RenderedSet::from_window(window, start);
    if rendered.len() != window.len() {
        log::warn!(
            "reconcile: {} duplicate ids in window starting at {start}; keeping first occurrence",
            window.len() - rendered.len()
        );
    }

    let mut batch = OperationBatch::new();
    let mut eviction_candidates = Vec::new();

    for (id, old_index) in previous.sorted() {
        if !rendered.contains(&id) {
            eviction_candidates.push(id.clone());
            batch.push(DomOperation::Remove { id });
        } else if let Some(new_index) = rendered.index_of(&id)
            && new_index != old_index
        {
            batch.push(DomOperation::Move {
                id,
                from: old_index,
                to: new_index,
            });
        }
    }

    let mut admission_request = Vec::with_capacity(rendered.len());
    for (offset, id) in window.iter().enumerate() {
        let index = start + offset;
        if rendered.index_of(id) != Some(index) {
            continue;
        }
        if !previous.contains(id) {
            batch.push(DomOperation::Add {
                id: id.clone(),
                index,
            });
        }
        admission_request.push((id.clone(), index));
    }

    let operations = batch.into_ordered();

    Reconciliation {
        operations,
        admission_request,
        eviction_candidates,
        rendered,
    }
}
