//! Resource slot manager.
//!
//! Owns the hard cap on live media resources. The registry maps every
//! admitted id to its last access time and where it sits relative to the
//! current viewport. `len() <= capacity()` holds after every single
//! admission or eviction step, not just at the end of a call.
//!
//! Victims come from entries outside the visible range, least recently
//! accessed first. Equal access times (everything admitted in one tick)
//! fall back to distance from the visible center, farthest first. An
//! on-screen entry is never a victim; when only on-screen entries remain the
//! request is deferred and tried again on a later tick.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::ops::Range;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use web_time::Instant;

use crate::item::ItemId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SlotState {
    /// Inside the visible range. Never evicted.
    Visible,
    /// Inside the buffered range but off-screen.
    Buffered,
    /// No longer requested; first in line for eviction.
    Detached,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SlotEntry {
    pub state: SlotState,
    pub last_access: Instant,
    /// Last known grid position.
    pub index: Option<usize>,
}

/// One tick's admission input, straight from the reconciler.
#[derive(Clone, Debug)]
pub struct AdmissionRequest<'a> {
    pub requested: &'a [(ItemId, usize)],
    pub visible: Range<usize>,
    pub eviction_candidates: &'a [ItemId],
}

impl AdmissionRequest<'_> {
    fn center(&self) -> f64 {
        if self.visible.is_empty() {
            self.visible.start as f64
        } else {
            (self.visible.start + self.visible.end - 1) as f64 / 2.0
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AdmissionOutcome {
    pub admitted: Vec<ItemId>,
    /// Entries removed to make room, in eviction order.
    pub evicted: Vec<ItemId>,
    pub deferred: Vec<ItemId>,
}

impl AdmissionOutcome {
    pub fn is_noop(&self) -> bool {
        self.admitted.is_empty() && self.evicted.is_empty() && self.deferred.is_empty()
    }
}

pub struct SlotManager {
    capacity: usize,
    entries: HashMap<ItemId, SlotEntry>,
    deferred: Vec<ItemId>,
    evictions: u64,
}

impl SlotManager {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::with_capacity(capacity),
            deferred: Vec::new(),
            evictions: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    pub fn contains(&self, id: &ItemId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn get(&self, id: &ItemId) -> Option<&SlotEntry> {
        self.entries.get(id)
    }

    /// Ids deferred by the most recent [`request_admit`](Self::request_admit).
    pub fn deferred(&self) -> &[ItemId] {
        &self.deferred
    }

    /// Total evictions since creation.
    pub fn evictions(&self) -> u64 {
        self.evictions
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ItemId, &SlotEntry)> {
        self.entries.iter()
    }

    /// Registry in LRU order, oldest access first.
    pub fn lru_order(&self) -> Vec<ItemId> {
        let mut v: Vec<_> = self.entries.iter().collect();
        v.sort_by(|a, b| a.1.last_access.cmp(&b.1.last_access).then_with(|| a.0.cmp(b.0)));
        v.into_iter().map(|(id, _)| id.clone()).collect()
    }

    pub fn count_in(&self, state: SlotState) -> usize {
        self.entries.values().filter(|e| e.state == state).count()
    }

    /// Entries no longer requested by the current viewport.
    pub fn detached(&self) -> Vec<ItemId> {
        self.entries
            .iter()
            .filter(|(_, e)| e.state == SlotState::Detached)
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Admits as much of `req` as the cap allows.
    ///
    /// Already-admitted ids only get their viewport state refreshed; their
    /// access time is left alone. Pending ids are served visible first, then
    /// by distance from the visible center.
    ///
    /// Victims are narrower than "anything outside the visible range": a
    /// buffered requester may only displace detached entries, never another
    /// buffered one. Two off-screen items can therefore not evict each other
    /// back and forth while the viewport sits still; the loser is deferred.
    pub fn request_admit(&mut self, req: &AdmissionRequest<'_>, now: Instant) -> AdmissionOutcome {
        let center = req.center();
        let requested: HashMap<&ItemId, usize> = req.requested.iter().map(|(id, i)| (id, *i)).collect();
        let candidates: HashSet<&ItemId> = req.eviction_candidates.iter().collect();

        for (id, entry) in self.entries.iter_mut() {
            match requested.get(id) {
                Some(&index) => {
                    entry.index = Some(index);
                    entry.state = if req.visible.contains(&index) {
                        SlotState::Visible
                    } else {
                        SlotState::Buffered
                    };
                }
                None => {
                    if !candidates.contains(id) && entry.state != SlotState::Detached {
                        log::debug!("slots: {id} left the window without a reconcile; detaching");
                    }
                    entry.state = SlotState::Detached;
                }
            }
        }

        let mut pending: SmallVec<[(ItemId, usize, bool); 32]> = req
            .requested
            .iter()
            .filter(|(id, _)| !self.entries.contains_key(id))
            .map(|(id, index)| (id.clone(), *index, req.visible.contains(index)))
            .collect();
        pending.sort_by(|a, b| {
            b.2.cmp(&a.2)
                .then_with(|| distance(Some(a.1), center).total_cmp(&distance(Some(b.1), center)))
                .then_with(|| a.1.cmp(&b.1))
        });

        let mut outcome = AdmissionOutcome::default();
        for (id, index, visible) in pending {
            if self.entries.len() >= self.capacity {
                match self.pick_victim(center, visible) {
                    Some(victim) => {
                        self.entries.remove(&victim);
                        self.evictions += 1;
                        log::debug!("slots: evicting {victim} for {id}");
                        outcome.evicted.push(victim);
                    }
                    None => {
                        outcome.deferred.push(id);
                        continue;
                    }
                }
            }
            self.entries.insert(
                id.clone(),
                SlotEntry {
                    state: if visible {
                        SlotState::Visible
                    } else {
                        SlotState::Buffered
                    },
                    last_access: now,
                    index: Some(index),
                },
            );
            outcome.admitted.push(id);
            debug_assert!(self.entries.len() <= self.capacity);
        }

        if !outcome.deferred.is_empty() {
            log::debug!(
                "slots: {} admissions deferred ({} of {} slots in use)",
                outcome.deferred.len(),
                self.entries.len(),
                self.capacity
            );
        }
        self.deferred = outcome.deferred.clone();
        outcome
    }

    /// Least valuable entry a requester may displace. Buffered entries are only
    /// displaced by a visible requester; visible entries never are.
    fn pick_victim(&self, center: f64, for_visible: bool) -> Option<ItemId> {
        self.entries
            .iter()
            .filter(|(_, e)| match e.state {
                SlotState::Visible => false,
                SlotState::Buffered => for_visible,
                SlotState::Detached => true,
            })
            .min_by(|a, b| victim_order(a, b, center))
            .map(|(id, _)| id.clone())
    }

    /// Drops `id` from the registry. Returns whether it was admitted.
    pub fn release(&mut self, id: &ItemId) -> bool {
        let removed = self.entries.remove(id).is_some();
        self.deferred.retain(|d| d != id);
        removed
    }

    /// Refreshes the LRU timestamp of an admitted id.
    pub fn touch(&mut self, id: &ItemId, now: Instant) -> bool {
        match self.entries.get_mut(id) {
            Some(entry) => {
                entry.last_access = now;
                true
            }
            None => false,
        }
    }

    /// Changes the cap, evicting down to it. Off-screen entries go first; if
    /// the new cap is below the visible count, visible entries go too, since
    /// the cap outranks everything.
    pub fn set_capacity(&mut self, capacity: usize, center: f64) -> Vec<ItemId> {
        self.capacity = capacity;
        let mut evicted = Vec::new();
        while self.entries.len() > self.capacity {
            let victim = self.pick_victim(center, true).or_else(|| {
                log::warn!("slots: capacity {capacity} is below the visible count; evicting on-screen items");
                self.entries
                    .iter()
                    .min_by(|a, b| victim_order(a, b, center))
                    .map(|(id, _)| id.clone())
            });
            let Some(victim) = victim else { break };
            self.entries.remove(&victim);
            self.evictions += 1;
            evicted.push(victim);
        }
        evicted
    }

    /// Refreshes stored indices after the collection changed. Entries whose
    /// id is gone get no index and detach.
    pub fn reindex(&mut self, index_of: impl Fn(&ItemId) -> Option<usize>) {
        for (id, entry) in self.entries.iter_mut() {
            entry.index = index_of(id);
            if entry.index.is_none() {
                entry.state = SlotState::Detached;
            }
        }
        self.deferred.retain(|id| index_of(id).is_some());
    }

    /// Empties the registry, returning everything that was admitted.
    pub fn clear(&mut self) -> Vec<ItemId> {
        self.deferred.clear();
        self.entries.drain().map(|(id, _)| id).collect()
    }

    pub fn is_within_capacity(&self) -> bool {
        self.entries.len() <= self.capacity
    }
}

fn distance(index: Option<usize>, center: f64) -> f64 {
    index.map_or(f64::INFINITY, |i| (i as f64 - center).abs())
}

fn victim_order(a: &(&ItemId, &SlotEntry), b: &(&ItemId, &SlotEntry), center: f64) -> Ordering {
    let rank = |s: SlotState| match s {
        SlotState::Detached => 0,
        SlotState::Buffered => 1,
        SlotState::Visible => 2,
    };
    rank(a.1.state)
        .cmp(&rank(b.1.state))
        .then_with(|| a.1.last_access.cmp(&b.1.last_access))
        .then_with(|| distance(b.1.index, center).total_cmp(&distance(a.1.index, center)))
        .then_with(|| a.0.cmp(b.0))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn window(range: Range<usize>) -> Vec<(ItemId, usize)> {
        range.map(|i| (ItemId::new(format!("i{i}")), i)).collect()
    }

    fn id(i: usize) -> ItemId {
        ItemId::new(format!("i{i}"))
    }

    #[test]
    fn admits_directly_under_cap() {
        let mut slots = SlotManager::new(30);
        let requested = window(0..24);
        let out = slots.request_admit(
            &AdmissionRequest {
                requested: &requested,
                visible: 0..16,
                eviction_candidates: &[],
            },
            Instant::now(),
        );
        assert_eq!(out.admitted.len(), 24);
        assert!(out.evicted.is_empty());
        assert!(out.deferred.is_empty());
        assert_eq!(slots.count_in(SlotState::Visible), 16);
        assert_eq!(slots.count_in(SlotState::Buffered), 8);
    }

    #[test]
    fn closest_to_center_win_when_full() {
        let mut slots = SlotManager::new(5);
        let requested = window(0..8);
        let t0 = Instant::now();
        let req = AdmissionRequest {
            requested: &requested,
            visible: 0..8,
            eviction_candidates: &[],
        };
        let out = slots.request_admit(&req, t0);
        let mut admitted = out.admitted.clone();
        admitted.sort();
        assert_eq!(admitted, vec![id(1), id(2), id(3), id(4), id(5)]);
        let mut deferred = out.deferred.clone();
        deferred.sort();
        assert_eq!(deferred, vec![id(0), id(6), id(7)]);

        // Same viewport again: deferred ids are retried, nothing admitted is
        // touched or displaced.
        let later = t0 + Duration::from_secs(1);
        let again = slots.request_admit(&req, later);
        assert!(again.admitted.is_empty());
        assert_eq!(again.deferred.len(), 3);
        assert!(slots.iter().all(|(_, e)| e.last_access == t0));
    }

    #[test]
    fn never_evicts_visible_for_buffered() {
        let mut slots = SlotManager::new(4);
        let requested = window(0..8);
        let out = slots.request_admit(
            &AdmissionRequest {
                requested: &requested,
                visible: 0..4,
                eviction_candidates: &[],
            },
            Instant::now(),
        );
        assert_eq!(out.admitted.len(), 4);
        assert!(out.admitted.iter().all(|a| requested[..4].iter().any(|(r, _)| r == a)));
        assert_eq!(out.deferred.len(), 4);
    }

    #[test]
    fn buffered_requester_never_displaces_buffered_entry() {
        let mut slots = SlotManager::new(2);
        let t0 = Instant::now();
        let first = window(0..2);
        slots.request_admit(
            &AdmissionRequest {
                requested: &first,
                visible: 0..1,
                eviction_candidates: &[],
            },
            t0,
        );
        assert_eq!(slots.get(&first[1].0).map(|e| e.state), Some(SlotState::Buffered));

        let grown = window(0..3);
        let out = slots.request_admit(
            &AdmissionRequest {
                requested: &grown,
                visible: 0..1,
                eviction_candidates: &[],
            },
            t0 + Duration::from_secs(1),
        );
        assert!(out.evicted.is_empty());
        assert_eq!(out.deferred, vec![grown[2].0.clone()]);
        assert!(slots.contains(&first[1].0));
    }

    #[test]
    fn detached_evicted_farthest_first_on_ties() {
        let mut slots = SlotManager::new(8);
        let t0 = Instant::now();
        let first = window(0..8);
        slots.request_admit(
            &AdmissionRequest {
                requested: &first,
                visible: 0..8,
                eviction_candidates: &[],
            },
            t0,
        );

        // Scroll forward: 8..12 visible, old ids all leave the window.
        let second = window(8..12);
        let candidates: Vec<_> = first.iter().map(|(id, _)| id.clone()).collect();
        let out = slots.request_admit(
            &AdmissionRequest {
                requested: &second,
                visible: 8..12,
                eviction_candidates: &candidates,
            },
            t0 + Duration::from_millis(16),
        );
        assert_eq!(out.admitted.len(), 4);
        assert_eq!(out.evicted, vec![id(0), id(1), id(2), id(3)]);
        assert!(slots.is_within_capacity());
    }

    #[test]
    fn lru_beats_distance() {
        let mut slots = SlotManager::new(3);
        let t0 = Instant::now();
        let first = window(0..3);
        slots.request_admit(
            &AdmissionRequest {
                requested: &first,
                visible: 0..3,
                eviction_candidates: &[],
            },
            t0,
        );
        slots.touch(&id(0), t0 + Duration::from_secs(5));

        let next = window(10..11);
        let candidates: Vec<_> = first.iter().map(|(id, _)| id.clone()).collect();
        let out = slots.request_admit(
            &AdmissionRequest {
                requested: &next,
                visible: 10..11,
                eviction_candidates: &candidates,
            },
            t0 + Duration::from_secs(6),
        );
        // i1 and i2 share the oldest access time; i1 is farther from 10.
        assert_eq!(out.evicted, vec![id(1)]);
        assert!(slots.contains(&id(0)));
    }

    #[test]
    fn zero_capacity_defers_everything() {
        let mut slots = SlotManager::new(0);
        let requested = window(0..4);
        let out = slots.request_admit(
            &AdmissionRequest {
                requested: &requested,
                visible: 0..4,
                eviction_candidates: &[],
            },
            Instant::now(),
        );
        assert!(out.admitted.is_empty());
        assert_eq!(out.deferred.len(), 4);
        assert!(slots.is_empty());
    }

    #[test]
    fn shrinking_capacity_evicts_offscreen_first() {
        let mut slots = SlotManager::new(6);
        let requested = window(0..6);
        slots.request_admit(
            &AdmissionRequest {
                requested: &requested,
                visible: 0..2,
                eviction_candidates: &[],
            },
            Instant::now(),
        );
        let evicted = slots.set_capacity(2, 0.5);
        assert_eq!(evicted.len(), 4);
        assert!(slots.contains(&id(0)) && slots.contains(&id(1)));
        assert!(slots.is_within_capacity());
    }

    #[test]
    fn release_and_touch_unknown_ids() {
        let mut slots = SlotManager::new(2);
        assert!(!slots.release(&id(9)));
        assert!(!slots.touch(&id(9), Instant::now()));
    }

    #[test]
    fn reindex_detaches_vanished_ids() {
        let mut slots = SlotManager::new(4);
        let requested = window(0..3);
        slots.request_admit(
            &AdmissionRequest {
                requested: &requested,
                visible: 0..3,
                eviction_candidates: &[],
            },
            Instant::now(),
        );
        // i1 dropped from the collection, i2 moved to the front.
        slots.reindex(|i| match i.as_str() {
            "i0" => Some(1),
            "i2" => Some(0),
            _ => None,
        });
        assert_eq!(slots.get(&id(2)).unwrap().index, Some(0));
        assert_eq!(slots.get(&id(1)).unwrap().state, SlotState::Detached);
        assert_eq!(slots.detached(), vec![id(1)]);
    }
}
