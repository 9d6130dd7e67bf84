//! Thumbnail fallback cache.
//!
//! Maps item ids to still images that cover the gap while an item loads,
//! waits for a slot, or has been unloaded. Image references are cheap, so
//! the only pressure is a soft entry cap with oldest-first removal.
//!
//! Requests are ticketed. A reply whose ticket no longer matches the
//! pending request (cancelled, or the collection was replaced) is dropped.

use std::collections::{HashMap, VecDeque};

use serde::Serialize;
use vidgrid_core::{ImageRef, ItemId, ThumbnailReply};

#[derive(Clone, Debug, PartialEq)]
pub struct ThumbnailEntry {
    pub image: ImageRef,
    /// Seconds into the media the still was taken from.
    pub timestamp: f64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ThumbnailStats {
    pub entries: usize,
    pub pending: usize,
    pub hits: u64,
    pub misses: u64,
    pub removed: u64,
    pub failed: u64,
    pub stale_replies: u64,
}

pub struct ThumbnailCache {
    capacity: usize,
    entries: HashMap<ItemId, ThumbnailEntry>,
    /// Insertion order, oldest at the front.
    order: VecDeque<ItemId>,
    pending: HashMap<ItemId, (u64, f64)>,
    next_ticket: u64,
    stats: ThumbnailStats,
}

impl ThumbnailCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::new(),
            order: VecDeque::new(),
            pending: HashMap::new(),
            next_ticket: 1,
            stats: ThumbnailStats::default(),
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

    pub fn contains(&self, id: &ItemId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn is_pending(&self, id: &ItemId) -> bool {
        self.pending.contains_key(id)
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Looks up without touching statistics.
    pub fn peek(&self, id: &ItemId) -> Option<&ThumbnailEntry> {
        self.entries.get(id)
    }

    pub fn get(&mut self, id: &ItemId) -> Option<&ImageRef> {
        match self.entries.get(id) {
            Some(e) => {
                self.stats.hits += 1;
                Some(&e.image)
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    /// Stores `image`, replacing any previous entry. Returns the ids removed
    /// to get back under the cap.
    pub fn insert(&mut self, id: ItemId, image: ImageRef, timestamp: f64) -> Vec<ItemId> {
        if self.entries.insert(id.clone(), ThumbnailEntry { image, timestamp }).is_some() {
            self.order.retain(|o| o != &id);
        }
        self.order.push_back(id);
        self.trim()
    }

    fn trim(&mut self) -> Vec<ItemId> {
        let mut removed = Vec::new();
        while self.entries.len() > self.capacity {
            let Some(oldest) = self.order.pop_front() else { break };
            if self.entries.remove(&oldest).is_some() {
                self.stats.removed += 1;
                removed.push(oldest);
            }
        }
        removed
    }

    /// Drops the entry and any in-flight request for `id`.
    pub fn remove(&mut self, id: &ItemId) -> bool {
        self.pending.remove(id);
        if self.entries.remove(id).is_none() {
            return false;
        }
        self.order.retain(|o| o != id);
        true
    }

    pub fn set_capacity(&mut self, capacity: usize) -> Vec<ItemId> {
        self.capacity = capacity;
        self.trim()
    }

    /// Registers an outgoing request. `None` if the id is already cached or
    /// a request is in flight.
    pub fn begin_request(&mut self, id: &ItemId, timestamp: f64) -> Option<u64> {
        if self.entries.contains_key(id) || self.pending.contains_key(id) {
            return None;
        }
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        self.pending.insert(id.clone(), (ticket, timestamp));
        Some(ticket)
    }

    /// Applies a reply. Returns whether it was accepted.
    pub fn complete(&mut self, reply: ThumbnailReply) -> bool {
        let current = matches!(self.pending.get(&reply.id), Some(&(t, _)) if t == reply.ticket);
        if !current {
            self.stats.stale_replies += 1;
            log::debug!("thumbnails: dropping stale reply for {} (ticket {})", reply.id, reply.ticket);
            return false;
        }
        let Some((_, timestamp)) = self.pending.remove(&reply.id) else {
            return false;
        };
        match reply.image {
            Some(image) => {
                self.insert(reply.id, image, timestamp);
            }
            None => {
                self.stats.failed += 1;
                log::debug!("thumbnails: generation failed for {}", reply.id);
            }
        }
        true
    }

    /// Cancels pending requests for ids `keep` rejects.
    pub fn retain_pending(&mut self, mut keep: impl FnMut(&ItemId) -> bool) {
        self.pending.retain(|id, _| keep(id));
    }

    /// Forgets every in-flight request; their replies become stale.
    pub fn invalidate_pending(&mut self) {
        self.pending.clear();
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
        self.pending.clear();
    }

    pub fn stats(&self) -> ThumbnailStats {
        ThumbnailStats {
            entries: self.entries.len(),
            pending: self.pending.len(),
            ..self.stats
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn img(s: &str) -> ImageRef {
        ImageRef(s.to_string())
    }

    #[test]
    fn oldest_entries_go_first() {
        let mut cache = ThumbnailCache::new(2);
        cache.insert(ItemId::new("a"), img("a.jpg"), 0.0);
        cache.insert(ItemId::new("b"), img("b.jpg"), 0.0);
        let removed = cache.insert(ItemId::new("c"), img("c.jpg"), 0.0);
        assert_eq!(removed, vec![ItemId::new("a")]);
        assert!(!cache.contains(&ItemId::new("a")));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn reinsert_moves_to_back() {
        let mut cache = ThumbnailCache::new(2);
        cache.insert(ItemId::new("a"), img("a1"), 0.0);
        cache.insert(ItemId::new("b"), img("b"), 0.0);
        cache.insert(ItemId::new("a"), img("a2"), 0.0);
        cache.insert(ItemId::new("c"), img("c"), 0.0);
        assert!(cache.contains(&ItemId::new("a")));
        assert!(!cache.contains(&ItemId::new("b")));
        assert_eq!(cache.peek(&ItemId::new("a")).unwrap().image, img("a2"));
    }

    #[test]
    fn replies_are_ticket_checked() {
        let mut cache = ThumbnailCache::new(8);
        let id = ItemId::new("x");
        let ticket = cache.begin_request(&id, 1.5).unwrap();
        assert_eq!(cache.begin_request(&id, 1.5), None);

        let stale = ThumbnailReply {
            id: id.clone(),
            ticket: ticket + 100,
            image: Some(img("wrong")),
        };
        assert!(!cache.complete(stale));

        let ok = ThumbnailReply {
            id: id.clone(),
            ticket,
            image: Some(img("x.jpg")),
        };
        assert!(cache.complete(ok));
        assert_eq!(cache.peek(&id).unwrap().timestamp, 1.5);
        assert_eq!(cache.get(&id), Some(&img("x.jpg")));
        assert_eq!(cache.stats().stale_replies, 1);
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn invalidated_requests_are_dropped() {
        let mut cache = ThumbnailCache::new(8);
        let id = ItemId::new("x");
        let ticket = cache.begin_request(&id, 0.0).unwrap();
        cache.invalidate_pending();
        assert!(!cache.complete(ThumbnailReply {
            id: id.clone(),
            ticket,
            image: Some(img("late")),
        }));
        assert!(!cache.contains(&id));
    }

    #[test]
    fn failed_generation_frees_the_request() {
        let mut cache = ThumbnailCache::new(8);
        let id = ItemId::new("x");
        let ticket = cache.begin_request(&id, 0.0).unwrap();
        assert!(cache.complete(ThumbnailReply {
            id: id.clone(),
            ticket,
            image: None,
        }));
        assert!(!cache.is_pending(&id));
        assert_eq!(cache.stats().failed, 1);
        assert!(cache.begin_request(&id, 0.0).is_some());
    }

    #[test]
    fn removed_entry_leaves_the_order() {
        let mut cache = ThumbnailCache::new(2);
        cache.insert(ItemId::new("a"), img("a"), 0.0);
        cache.insert(ItemId::new("b"), img("b"), 0.0);
        assert!(cache.remove(&ItemId::new("a")));
        assert!(!cache.remove(&ItemId::new("a")));

        cache.insert(ItemId::new("c"), img("c"), 0.0);
        assert!(cache.contains(&ItemId::new("b")));
        assert!(cache.contains(&ItemId::new("c")));
        assert_eq!(cache.stats().removed, 0);
    }
}
