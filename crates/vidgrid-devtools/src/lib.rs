use web_time::Instant;

use vidgrid_engine::{GridEngine, GridStats, ItemId, TickReport};

/// One-line text overlay: frame counter, smoothed fps and the engine stats.
pub struct Hud {
    pub enabled: bool,
    frame_count: u64,
    last_frame: Option<Instant>,
    fps_smooth: f32,
    pub metrics: Option<Metrics>,
}

impl Default for Hud {
    fn default() -> Self {
        Self::new()
    }
}

impl Hud {
    pub fn new() -> Self {
        Self {
            enabled: true,
            frame_count: 0,
            last_frame: None,
            fps_smooth: 0.0,
            metrics: None,
        }
    }

    pub fn toggle(&mut self) {
        self.enabled = !self.enabled;
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn fps(&self) -> f32 {
        self.fps_smooth
    }

    /// Records what the last tick did, for the next overlay.
    pub fn record_tick(&mut self, report: &TickReport, tick_ms: f32) {
        let m = self.metrics.get_or_insert_with(Metrics::default);
        m.tick_ms = tick_ms;
        m.operations = report.operations.len();
        m.admitted = report.admitted.len();
        m.evicted = report.evicted.len();
    }

    pub fn overlay(&mut self, stats: &GridStats) -> String {
        self.overlay_at(Instant::now(), stats)
    }

    /// Counts a frame at `now` and formats the overlay line.
    pub fn overlay_at(&mut self, now: Instant, stats: &GridStats) -> String {
        self.frame_count += 1;
        if let Some(prev) = self.last_frame.replace(now) {
            let dt = (now - prev).as_secs_f32();
            if dt > 0.0 {
                let fps = 1.0 / dt;
                // simple EMA
                let a = 0.2;
                self.fps_smooth = if self.fps_smooth == 0.0 {
                    fps
                } else {
                    (1.0 - a) * self.fps_smooth + a * fps
                };
            }
        }
        let mut lines = vec![
            format!("frame: {}", self.frame_count),
            format!("fps: {:.1}", self.fps_smooth),
            format!(
                "live: {}/{} visible (deferred {}+{})",
                stats.admitted, stats.visible, stats.deferred, stats.deferred_offscreen
            ),
            format!(
                "play {} pause {} load {} err {}",
                stats.playing, stats.paused, stats.loading, stats.errors
            ),
            format!("evicted: {}", stats.evictions),
        ];
        if let Some(m) = &self.metrics {
            lines.push(format!("tick: {:.2} ms", m.tick_ms));
            lines.push(format!("ops: {} (+{} -{})", m.operations, m.admitted, m.evicted));
        }
        lines.join("  |  ")
    }
}

#[derive(Clone, Debug, Default)]
pub struct Metrics {
    pub tick_ms: f32,
    pub operations: usize,
    pub admitted: usize,
    pub evicted: usize,
}

/// HUD plus a focused item whose state and decoration get their own line.
pub struct Inspector {
    pub hud: Hud,
    pub focused: Option<ItemId>,
}

impl Default for Inspector {
    fn default() -> Self {
        Self::new()
    }
}

impl Inspector {
    pub fn new() -> Self {
        Self {
            hud: Hud::new(),
            focused: None,
        }
    }

    pub fn focus(&mut self, id: Option<ItemId>) {
        self.focused = id;
    }

    pub fn frame(&mut self, engine: &GridEngine) -> Vec<String> {
        if !self.hud.enabled {
            return Vec::new();
        }
        let mut out = vec![self.hud.overlay(&engine.get_stats())];
        if let Some(id) = &self.focused {
            out.push(format!(
                "{id}: {:?} {:?} admitted={}",
                engine.state_of(id),
                engine.decoration(id),
                engine.is_admitted(id)
            ));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use vidgrid_core::numbered_items;
    use vidgrid_engine::EngineConfig;
    use vidgrid_media::testing::MockHost;

    use super::*;

    #[test]
    fn fps_is_smoothed() {
        let mut hud = Hud::new();
        let t0 = Instant::now();
        let stats = GridStats::default();
        hud.overlay_at(t0, &stats);
        hud.overlay_at(t0 + Duration::from_millis(20), &stats);
        assert!((hud.fps() - 50.0).abs() < 0.01);

        hud.overlay_at(t0 + Duration::from_millis(30), &stats);
        // 0.8 * 50 + 0.2 * 100
        assert!((hud.fps() - 60.0).abs() < 0.01);
        assert_eq!(hud.frame_count(), 3);
    }

    #[test]
    fn overlay_includes_stats_and_metrics() {
        let mut hud = Hud::new();
        let stats = GridStats {
            admitted: 30,
            visible: 16,
            deferred_offscreen: 2,
            ..GridStats::default()
        };
        let report = TickReport {
            admitted: vec![ItemId::new("a")],
            ..TickReport::default()
        };
        hud.record_tick(&report, 1.5);
        let line = hud.overlay_at(Instant::now(), &stats);
        assert!(line.contains("live: 30/16 visible (deferred 0+2)"));
        assert!(line.contains("tick: 1.50 ms"));
        assert!(line.contains("ops: 0 (+1 -0)"));
    }

    #[test]
    fn inspector_reports_focused_item() {
        let mut engine = GridEngine::new(EngineConfig::default(), MockHost::new()).unwrap();
        engine.set_items(numbered_items(40));
        engine.update_viewport(0.0, 900.0);
        engine.on_frame();

        let mut inspector = Inspector::new();
        inspector.focus(Some(ItemId::new("item-2")));
        let lines = inspector.frame(&engine);
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with("item-2: Loading"));
        assert!(lines[1].ends_with("admitted=true"));

        inspector.hud.toggle();
        assert!(inspector.frame(&engine).is_empty());
    }
}
