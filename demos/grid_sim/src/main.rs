use std::cell::{Cell, RefCell};
use std::rc::Rc;

use anyhow::Result;
use vidgrid_core::{Clock, ImageRef, Item, StaticSource, TestClock, numbered_items};
use vidgrid_devtools::Hud;
use vidgrid_engine::{
    DomOperation, EngineConfig, GridEngine, GridGeometry, ItemDecoration, ItemId, SortMode,
};
use vidgrid_media::{LoadError, LoadTicket, MediaEvent, MediaEventKind, MediaEvents, MediaHandle, MediaHost};
use web_time::Instant;

const ITEMS: usize = 10_000;
const FRAMES: u64 = 1_800;
const VIEWPORT_HEIGHT: f64 = 900.0;

/// Tiny xorshift so runs are reproducible without pulling in `rand`.
struct Rng(u64);

impl Rng {
    fn next(&mut self) -> u64 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        self.0
    }

    fn below(&mut self, n: u64) -> u64 {
        self.next() % n
    }
}

struct PendingLoad {
    ticket: LoadTicket,
    events: MediaEvents,
    frames_left: u64,
    duration: Option<f64>,
}

#[derive(Default)]
struct SimState {
    pending: Vec<PendingLoad>,
    live: usize,
    peak_live: usize,
    released: u64,
    failed: u64,
}

/// Pretends to be a browser: loads finish a few frames after they start,
/// and a small share of them fail.
#[derive(Clone, Default)]
struct SimHost {
    state: Rc<RefCell<SimState>>,
}

impl SimHost {
    fn step(&self, rng: &mut Rng) {
        let mut s = self.state.borrow_mut();
        let mut failed = 0;
        s.pending.retain_mut(|p| {
            if p.frames_left > 0 {
                p.frames_left -= 1;
                return true;
            }
            let kind = if rng.below(100) < 3 {
                failed += 1;
                MediaEventKind::Failed(LoadError::Failed("simulated decode error".into()))
            } else {
                MediaEventKind::Ready { duration: p.duration }
            };
            p.events.push(MediaEvent {
                ticket: p.ticket,
                kind,
            });
            false
        });
        s.failed += failed;
    }
}

impl MediaHost for SimHost {
    fn create_handle(&mut self, item: &Item, events: MediaEvents) -> Box<dyn MediaHandle> {
        {
            let mut s = self.state.borrow_mut();
            s.live += 1;
            s.peak_live = s.peak_live.max(s.live);
        }
        Box::new(SimHandle {
            state: self.state.clone(),
            events,
            duration: item.duration_hint,
            latency: 2 + (item.id.as_str().len() as u64 % 6),
        })
    }
}

struct SimHandle {
    state: Rc<RefCell<SimState>>,
    events: MediaEvents,
    duration: Option<f64>,
    latency: u64,
}

impl MediaHandle for SimHandle {
    fn set_source(&mut self, _source: &vidgrid_core::SourceRef, ticket: LoadTicket) {
        self.state.borrow_mut().pending.push(PendingLoad {
            ticket,
            events: self.events.clone(),
            frames_left: self.latency,
            duration: self.duration,
        });
    }

    fn play(&mut self) {}

    fn pause(&mut self) {}

    fn seek(&mut self, _seconds: f64) {}

    fn set_native_loop(&mut self, _looping: bool) {}

    // In-flight loads keep going and report back late, as a browser would.
    fn clear_source(&mut self) {}

    fn release(&mut self) {
        let mut s = self.state.borrow_mut();
        s.live -= 1;
        s.released += 1;
    }
}

fn build_items() -> Vec<Item> {
    numbered_items(ITEMS)
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            item.with_duration(if i % 5 == 0 { 95.0 } else { 12.0 })
                .with_folder(format!("day-{:02}", i / 1_000))
                .with_modified(1_700_000_000 + (i as u64 * 7_919) % 86_400)
        })
        .collect()
}

/// Smooth scrolling with a couple of jumps, like a user skimming a folder.
fn scroll_at(frame: u64, content_height: f64) -> f64 {
    let max = (content_height - VIEWPORT_HEIGHT).max(0.0);
    let y = match frame {
        0..600 => frame as f64 * 40.0,
        600..900 => max * 0.5,
        900..1200 => max * 0.5 - (frame - 900) as f64 * 25.0,
        _ => max,
    };
    y.clamp(0.0, max)
}

fn main() -> Result<()> {
    env_logger::init();

    let config = EngineConfig::from_env()?;
    let cap = config.max_active_resources;
    let host = SimHost::default();
    let clock = TestClock::new();
    let frames_requested = Rc::new(Cell::new(0u64));

    let source = StaticSource::new(build_items())
        .with_thumbnail("item-0", ImageRef("thumbs/item-0.jpg".into()));

    let requested = frames_requested.clone();
    let mut engine = GridEngine::new(config.clone(), host.clone())?
        .with_clock(clock.shared())
        .with_source(source)
        .with_frame_requester(move || requested.set(requested.get() + 1));
    engine.set_geometry(GridGeometry::new(300.0, 4, config.buffer_rows)?)?;

    let op_counts = Rc::new(RefCell::new([0usize; 3]));
    let counts = op_counts.clone();
    engine.on_structural_op(move |op| {
        let slot = match op {
            DomOperation::Add { .. } => 0,
            DomOperation::Remove { .. } => 1,
            DomOperation::Move { .. } => 2,
        };
        counts.borrow_mut()[slot] += 1;
    });
    engine.on_stats(move |s| {
        if s.deferred > 0 {
            log::debug!("grid_sim: {} visible items waiting for a slot", s.deferred);
        }
    });

    let n = engine.load_from_source()?;
    log::info!("grid_sim: loaded {n} items, cap {cap}");

    let content_height = engine.geometry().content_height();
    let mut rng = Rng(0x2545_f491_4f6c_dd1d);
    let mut hud = Hud::new();
    let mut ticks = 0u64;

    for frame in 0..FRAMES {
        // Several scroll events land between paints; only one tick runs.
        let y = scroll_at(frame, content_height);
        for k in 0..3 {
            engine.update_viewport(y - k as f64 * 4.0, VIEWPORT_HEIGHT);
        }

        host.step(&mut rng);
        let started = Instant::now();
        if let Some(report) = engine.on_frame() {
            ticks += 1;
            hud.record_tick(&report, started.elapsed().as_secs_f32() * 1000.0);
        }

        // Halfway through, the user switches to folder order.
        if frame == 1_200 {
            engine.set_sort_mode(SortMode::Folder);
        }

        // Every failed item gets one manual retry once it turns sticky.
        let retryable: Vec<ItemId> = engine
            .visible_range()
            .filter_map(|i| engine.item_at(i))
            .map(|item| item.id.clone())
            .filter(|id| engine.decoration(id).contains(ItemDecoration::RETRYABLE))
            .collect();
        for id in &retryable {
            engine.retry(id)?;
        }

        if frame % 120 == 0 {
            log::info!("{}", hud.overlay_at(clock.now(), &engine.get_stats()));
        }
        let stats = engine.get_stats();
        anyhow::ensure!(stats.admitted <= cap, "cap exceeded: {} > {cap}", stats.admitted);

        clock.advance_ms(16);
    }

    let stats = engine.get_stats();
    let [adds, removes, moves] = *op_counts.borrow();
    println!("{}", serde_json::to_string_pretty(&stats)?);
    println!(
        "frames {FRAMES}, ticks {ticks}, frame requests {}, ops +{adds} -{removes} ~{moves}",
        frames_requested.get()
    );

    drop(engine);
    let s = host.state.borrow();
    println!(
        "peak live handles {} (cap {cap}), released {}, simulated failures {}, still live {}",
        s.peak_live, s.released, s.failed, s.live
    );
    anyhow::ensure!(s.live == 0, "{} handles leaked", s.live);
    Ok(())
}
