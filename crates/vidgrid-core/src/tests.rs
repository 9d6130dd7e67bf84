#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use crate::*;
    use web_time::{Duration, Instant};

    /// Viewport → reconcile → admit, the way the engine drives one tick.
    struct Pipeline {
        items: Vec<Item>,
        geometry: GridGeometry,
        rendered: RenderedSet,
        slots: SlotManager,
    }

    struct Tick {
        ranges: ViewportRanges,
        reconciliation: Reconciliation,
        outcome: AdmissionOutcome,
    }

    impl Pipeline {
        fn new(count: usize, cap: usize) -> Self {
            Self {
                items: numbered_items(count),
                geometry: GridGeometry::new(300.0, 4, 2).unwrap().with_total_count(count),
                rendered: RenderedSet::new(),
                slots: SlotManager::new(cap),
            }
        }

        fn tick(&mut self, scroll_top: f64, height: f64, now: Instant) -> Tick {
            let ranges = compute_ranges(Some(&ViewportState::new(scroll_top, height)), &self.geometry, 3);
            let window: Vec<ItemId> = self.items[ranges.buffered.clone()]
                .iter()
                .map(|i| i.id.clone())
                .collect();
            let reconciliation = reconcile(&self.rendered, &window, ranges.buffered.start);
            let outcome = self.slots.request_admit(
                &AdmissionRequest {
                    requested: &reconciliation.admission_request,
                    visible: ranges.visible.clone(),
                    eviction_candidates: &reconciliation.eviction_candidates,
                },
                now,
            );
            self.rendered = reconciliation.rendered.clone();
            Tick {
                ranges,
                reconciliation,
                outcome,
            }
        }

        fn visible_ids(&self, ranges: &ViewportRanges) -> Vec<ItemId> {
            self.items[ranges.visible.clone()].iter().map(|i| i.id.clone()).collect()
        }
    }

    #[test]
    fn test_top_of_grid_admits_buffered_range() {
        let mut p = Pipeline::new(10_000, 30);
        let t = p.tick(0.0, 900.0, Instant::now());

        assert_eq!(t.ranges.visible, 0..16);
        assert_eq!(t.ranges.buffered, 0..24);
        let expected: Vec<ItemId> = p.items[0..24].iter().map(|i| i.id.clone()).collect();
        let admitted: HashSet<_> = t.outcome.admitted.iter().cloned().collect();
        assert_eq!(admitted, expected.into_iter().collect());
        assert!(t.outcome.evicted.is_empty());
        assert!(t.outcome.deferred.is_empty());
    }

    #[test]
    fn test_jump_scroll_replaces_window_under_cap() {
        let mut p = Pipeline::new(10_000, 30);
        let t0 = Instant::now();
        p.tick(0.0, 900.0, t0);
        let t = p.tick(9000.0, 900.0, t0 + Duration::from_millis(16));

        let removes = t
            .reconciliation
            .operations
            .iter()
            .filter(|op| matches!(op, DomOperation::Remove { .. }))
            .count();
        let adds = t
            .reconciliation
            .operations
            .iter()
            .filter(|op| matches!(op, DomOperation::Add { .. }))
            .count();
        assert_eq!(removes, 24);
        assert_eq!(adds, 32);
        assert!(p.slots.len() <= 30);

        // Old items are evicted from the top down: farthest from row 30 first.
        let expected: Vec<ItemId> = p.items[0..24].iter().map(|i| i.id.clone()).collect();
        assert_eq!(t.outcome.evicted, expected);

        // Every visible item made it in; the two deferred are buffered.
        for id in p.visible_ids(&t.ranges) {
            assert!(p.slots.contains(&id), "{id} should be admitted");
        }
        assert_eq!(t.outcome.deferred.len(), 2);
    }

    #[test]
    fn test_same_viewport_twice_is_quiet() {
        let mut p = Pipeline::new(500, 30);
        let now = Instant::now();
        p.tick(1200.0, 900.0, now);
        let slots_before: Vec<_> = p.slots.lru_order();
        let again = p.tick(1200.0, 900.0, now + Duration::from_millis(16));
        assert!(again.reconciliation.operations.is_empty());
        assert!(again.outcome.admitted.is_empty());
        assert!(again.outcome.evicted.is_empty());
        assert_eq!(p.slots.lru_order(), slots_before);
    }

    #[test]
    fn test_empty_collection() {
        let mut p = Pipeline::new(0, 30);
        let t = p.tick(0.0, 900.0, Instant::now());
        assert!(t.ranges.visible.is_empty());
        assert!(t.reconciliation.operations.is_empty());
        assert!(t.outcome.is_noop());
    }

    #[test]
    fn test_zero_cap_defers_visible() {
        let mut p = Pipeline::new(100, 0);
        let t = p.tick(0.0, 900.0, Instant::now());
        assert!(p.slots.is_empty());
        assert_eq!(t.outcome.deferred.len(), t.ranges.buffered.len());
        let visible_deferred = t
            .outcome
            .deferred
            .iter()
            .filter(|id| p.visible_ids(&t.ranges).contains(id))
            .count();
        assert_eq!(visible_deferred, t.ranges.visible_count());
    }

    #[test]
    fn test_random_scrolling_keeps_invariants() {
        let mut p = Pipeline::new(2_000, 20);
        let mut now = Instant::now();
        // xorshift, fixed seed
        let mut seed: u64 = 0x9e37_79b9_7f4a_7c15;
        let max_scroll = p.geometry.content_height();

        for _ in 0..400 {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            let scroll = (seed % 10_000) as f64 / 10_000.0 * max_scroll;
            now += Duration::from_millis(16);

            let t = p.tick(scroll, 900.0, now);
            assert!(p.slots.is_within_capacity());

            // Visible items are admitted unless the cap itself is smaller
            // than the visible count.
            let visible = p.visible_ids(&t.ranges);
            let admitted_visible = visible.iter().filter(|id| p.slots.contains(id)).count();
            assert_eq!(admitted_visible, visible.len().min(p.slots.capacity()));

            // Nothing visible was evicted this tick.
            for id in &t.outcome.evicted {
                assert!(!visible.contains(id));
            }

            // Removes strictly precede adds.
            let first_add = t
                .reconciliation
                .operations
                .iter()
                .position(|op| matches!(op, DomOperation::Add { .. }));
            let last_remove = t
                .reconciliation
                .operations
                .iter()
                .rposition(|op| matches!(op, DomOperation::Remove { .. }));
            if let (Some(a), Some(r)) = (first_add, last_remove) {
                assert!(r < a);
            }
        }
    }
}
