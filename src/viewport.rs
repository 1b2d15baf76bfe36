//! Viewport controller.
//!
//! Owns the drawing surface, the current [`LayoutGeneration`], the track
//! registry and the caret. Every trigger (resize, scroll, model change,
//! caret move) only records work; [`Viewport::frame`] performs it at the
//! next frame boundary, so triggers arriving in between coalesce into one
//! redraw.
//!
//! Phases: `Idle -> Measuring -> LayingOut -> Scheduled -> Drawing -> Idle`.

use std::time::{Duration, Instant};

use ratatui::style::Color;
use tracing::{debug, error, warn};

use crate::caret::{caret_point, clean_pasted_text, CaretController, CaretState, RedrawScope, Selection};
use crate::coords::{Point, ScrollAxis};
use crate::error::{CanvasError, CanvasResult};
use crate::layout::{compute_layout, Dimensions, LayoutGeneration, LayoutInput, LayoutSettings};
use crate::model::{ModelChange, ModelError, SharedModel, SETTING_GUTTERS};
use crate::notify::{Notifier, Subscription, Topic};
use crate::persist::PersistenceBridge;
use crate::scheduler::{Debounce, FrameScheduler, PendingRedraw, RedrawTicket};
use crate::surface::Surface;
use crate::tracks::{BaseRange, DrawContext, TrackRegistry};

/// Band painted behind highlighted bases.
pub const HIGHLIGHT_COLOR: Color = Color::LightYellow;

/// The element hosting the canvas: reports its size and carries the
/// scrollbar.
pub trait HostElement {
    fn measure(&self) -> CanvasResult<Dimensions>;

    /// Total scrollable content size along `axis`.
    fn set_scroll_extent(&mut self, _axis: ScrollAxis, _extent: f64) {}

    fn set_scroll_position(&mut self, _offset: f64) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewportPhase {
    Idle,
    Measuring,
    LayingOut,
    Scheduled,
    Drawing,
}

/// Events the host may observe.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewportEvent {
    Resize(Dimensions),
    Scroll(f64),
    LayoutChanged { generation: u64 },
}

impl Topic for ViewportEvent {
    fn topic(&self) -> &str {
        match self {
            ViewportEvent::Resize(_) => "resize",
            ViewportEvent::Scroll(_) => "scroll",
            ViewportEvent::LayoutChanged { .. } => "layout",
        }
    }
}

/// What the last frame did.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum DrawKind {
    #[default]
    Skipped,
    Full,
    Incremental {
        delta: f64,
    },
    Partial,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DrawReport {
    pub kind: DrawKind,
    pub generation: Option<u64>,
    /// Rows repainted (row 0 is the whole strip in the peak-indexed regime).
    pub rows: Vec<usize>,
    pub failed_tracks: Vec<String>,
}

/// Screen position of the caret overlay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaretDisplay {
    pub slot: usize,
    pub x: f64,
    pub y: f64,
    pub height: f64,
}

#[derive(Debug, Clone)]
pub struct ViewportOptions {
    pub layout: LayoutSettings,
    /// Track the caret is drawn against.
    pub caret_track: String,
    pub persistence_interval: Duration,
    pub safety_redraw: Duration,
}

impl Default for ViewportOptions {
    fn default() -> Self {
        Self {
            layout: LayoutSettings::default(),
            caret_track: "dna".to_string(),
            persistence_interval: Duration::from_millis(250),
            safety_redraw: Duration::from_millis(10),
        }
    }
}

/// Work released after a frame is painted.
enum Continuation {
    Resolve(RedrawTicket),
    SafetyRedraw,
    /// Scroll the caret into view, then place it.
    ShowCaret(usize),
    /// Place the caret where it is; the scroll already happened.
    PlaceCaret(usize),
    Callback(Box<dyn FnOnce()>),
}

pub struct Viewport<S: Surface, H: HostElement> {
    model: SharedModel,
    host: H,
    surface: S,
    options: ViewportOptions,
    registry: TrackRegistry,
    generation: Option<LayoutGeneration>,
    next_generation: u64,
    phase: ViewportPhase,
    offset: f64,
    /// Offset the surface content was painted at; `None` after a layout change.
    drawn_offset: Option<f64>,
    caret: CaretController,
    caret_display: Option<CaretDisplay>,
    highlight: Option<(usize, usize)>,
    scheduler: FrameScheduler<Continuation>,
    safety: Debounce,
    persistence: PersistenceBridge,
    subscription: Option<Subscription<ModelChange>>,
    events: Notifier<ViewportEvent>,
    last_report: DrawReport,
}

impl<S: Surface, H: HostElement> Viewport<S, H> {
    /// Builds the viewport and runs the first layout. A failing first
    /// layout is logged; the next trigger retries.
    pub fn new(
        model: SharedModel,
        host: H,
        surface: S,
        registry: TrackRegistry,
        options: ViewportOptions,
    ) -> Self {
        let (subscription, len, offset) = {
            let mut m = model.borrow_mut();
            let subscription = m.subscribe(&["sequence", "features", "displaySettings.*"]);
            let offset = m
                .setting(crate::model::SETTING_SCROLL_OFFSET)
                .and_then(|v| v.as_f64())
                .unwrap_or(0.0);
            (subscription, m.len(), offset)
        };
        let mut viewport = Self {
            model,
            host,
            surface,
            safety: Debounce::new(options.safety_redraw),
            persistence: PersistenceBridge::new(options.persistence_interval),
            options,
            registry,
            generation: None,
            next_generation: 1,
            phase: ViewportPhase::Idle,
            offset,
            drawn_offset: None,
            caret: CaretController::new(len),
            caret_display: None,
            highlight: None,
            scheduler: FrameScheduler::new(),
            subscription: Some(subscription),
            events: Notifier::new(),
            last_report: DrawReport::default(),
        };
        let _ = viewport.refresh();
        viewport
    }

    pub fn phase(&self) -> ViewportPhase {
        self.phase
    }

    pub fn generation(&self) -> Option<&LayoutGeneration> {
        self.generation.as_ref()
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn model(&self) -> &SharedModel {
        &self.model
    }

    pub fn caret(&self) -> Option<usize> {
        self.caret.caret()
    }

    pub fn selection(&self) -> Option<Selection> {
        self.caret.selection()
    }

    pub fn caret_state(&self) -> CaretState {
        self.caret.state()
    }

    pub fn caret_display(&self) -> Option<CaretDisplay> {
        self.caret_display
    }

    pub fn caret_info(&self) -> String {
        self.caret.caret_info()
    }

    pub fn highlight(&self) -> Option<(usize, usize)> {
        self.highlight
    }

    pub fn last_report(&self) -> &DrawReport {
        &self.last_report
    }

    pub fn is_scheduled(&self) -> bool {
        self.scheduler.is_scheduled()
    }

    pub fn subscribe_events(&mut self, topics: &[&str]) -> Subscription<ViewportEvent> {
        self.events.subscribe(topics)
    }

    /// Runs `callback` once the next frame has been painted.
    pub fn after_next_redraw(&mut self, callback: impl FnOnce() + 'static) {
        self.scheduler
            .after_next_redraw(Continuation::Callback(Box::new(callback)));
    }

    // ---- layout pipeline ----

    /// Hides the caret overlay, re-measures, re-lays out and schedules a
    /// full redraw.
    pub fn refresh(&mut self) -> CanvasResult<()> {
        self.caret_display = None;
        self.relayout(None)
    }

    /// Same as [`refresh`](Self::refresh) but keeps the first visible base
    /// at the start of the visible extent.
    pub fn refresh_from_resize(&mut self) -> CanvasResult<()> {
        let anchor = self
            .generation
            .as_ref()
            .filter(|g| g.sequence_len() > 0)
            .map(|g| g.mapper.first_visible_base(self.offset));
        let result = self.relayout(anchor);
        if let Some(generation) = &self.generation {
            self.events.notify(ViewportEvent::Resize(generation.viewport));
        }
        if let Some(slot) = self.caret.caret() {
            self.scheduler
                .after_next_redraw(Continuation::ShowCaret(slot));
        }
        result
    }

    fn relayout(&mut self, anchor: Option<usize>) -> CanvasResult<()> {
        self.phase = ViewportPhase::Measuring;
        let dimensions = match self.host.measure() {
            Ok(dimensions) => dimensions,
            Err(err) => {
                warn!(error = %err, "measurement failed, keeping last layout");
                self.phase = self.resting_phase();
                return Err(err);
            }
        };

        self.phase = ViewportPhase::LayingOut;
        let id = self.next_generation;
        let result = {
            let model = self.model.borrow();
            compute_layout(
                LayoutInput {
                    generation: id,
                    settings: &self.options.layout,
                    viewport: dimensions,
                    model: &*model,
                    scroll_offset: self.offset,
                    anchor_base: anchor,
                },
                &mut self.registry,
            )
        };
        let generation = match result {
            Ok(generation) => generation,
            Err(err) => {
                warn!(generation = id, error = %err, "layout rejected, keeping last frame");
                self.phase = self.resting_phase();
                return Err(err);
            }
        };
        self.next_generation += 1;

        if (self.surface.width(), self.surface.height()) != (dimensions.width, dimensions.height) {
            self.surface.set_dimensions(dimensions.width, dimensions.height);
        }
        self.offset = generation.scroll_offset;
        self.host
            .set_scroll_extent(generation.axis(), generation.content_extent);
        self.host.set_scroll_position(self.offset);
        self.caret.set_sequence_len(generation.sequence_len());
        if let Some(err) = &generation.coordinate_error {
            let err = CanvasError::CoordinateLookup(err.clone());
            warn!(error = %err, "caret and selection hidden until the peak table is fixed");
        }
        self.events.notify(ViewportEvent::LayoutChanged { generation: id });
        self.generation = Some(generation);
        self.drawn_offset = None;
        self.scheduler.request_full();
        self.phase = ViewportPhase::Scheduled;
        Ok(())
    }

    fn resting_phase(&self) -> ViewportPhase {
        if self.scheduler.is_scheduled() {
            ViewportPhase::Scheduled
        } else {
            ViewportPhase::Idle
        }
    }

    fn request(&mut self, scope: RedrawScope) {
        match scope {
            RedrawScope::Nothing => return,
            RedrawScope::Partial { base } => self.scheduler.request_partial(base),
            RedrawScope::Full => self.scheduler.request_full(),
        }
        if self.phase == ViewportPhase::Idle {
            self.phase = ViewportPhase::Scheduled;
        }
    }

    /// Applies model notifications received since the last frame.
    fn drain_model_changes(&mut self) {
        let Some(subscription) = &self.subscription else {
            return;
        };
        let changes = subscription.drain();
        if changes.is_empty() {
            return;
        }
        let mut needs_layout = false;
        let mut needs_redraw = false;
        for change in &changes {
            let affected = self.registry.invalidate_topic(change.topic());
            match change {
                ModelChange::Sequence | ModelChange::Features => needs_layout = true,
                ModelChange::Setting(path) if affected || path == SETTING_GUTTERS => {
                    needs_layout = true
                }
                ModelChange::Setting(_) => needs_redraw = true,
            }
        }
        debug!(changes = changes.len(), needs_layout, "model changed");
        if needs_layout {
            let _ = self.refresh();
        } else if needs_redraw {
            self.request(RedrawScope::Full);
        }
    }

    // ---- frame boundary ----

    /// Runs everything queued since the previous frame: model changes, the
    /// safety redraw, persistence, then at most one draw and its waiters.
    pub fn frame(&mut self, now: Instant) -> DrawReport {
        self.drain_model_changes();
        if self.safety.fire(now) {
            self.scheduler.request_full();
        }
        {
            let mut model = self.model.borrow_mut();
            if let Err(err) = self.persistence.poll(&mut *model, now) {
                warn!(error = %err, "failed to persist display state");
            }
        }

        let Some(pending) = self.scheduler.begin_frame() else {
            return DrawReport::default();
        };
        self.phase = ViewportPhase::Drawing;
        let report = self.draw(pending);
        if report.kind != DrawKind::Skipped {
            for continuation in self.scheduler.finish_frame() {
                self.run(continuation, now);
            }
        }
        self.phase = self.resting_phase();
        self.last_report = report.clone();
        report
    }

    fn run(&mut self, continuation: Continuation, now: Instant) {
        match continuation {
            Continuation::Resolve(ticket) => ticket.resolve(),
            Continuation::SafetyRedraw => self.safety.trigger(now),
            Continuation::ShowCaret(slot) => self.display_caret(slot),
            Continuation::PlaceCaret(slot) => self.place_caret(slot),
            Continuation::Callback(callback) => callback(),
        }
    }

    fn draw(&mut self, pending: PendingRedraw) -> DrawReport {
        let Some(generation) = self.generation.as_ref() else {
            return DrawReport::default();
        };
        let model = self.model.borrow();
        let offset = self.offset;
        let selection = if generation.coordinate_error.is_some() {
            None
        } else {
            self.caret.selection()
        };
        let ctx = DrawContext {
            model: &*model,
            mapper: &generation.mapper,
            selection,
            scroll_offset: offset,
            row_height: generation.row_height,
        };
        let mut painter = Painter {
            surface: &mut self.surface,
            registry: &mut self.registry,
            generation,
            ctx,
            highlight: self.highlight,
            report: DrawReport {
                generation: Some(generation.id),
                ..DrawReport::default()
            },
        };

        let extent = generation.visible_extent();
        let delta = self.drawn_offset.map(|drawn| offset - drawn);
        match (pending.full, pending.scroll, delta) {
            (false, true, Some(delta)) if delta.abs() < extent => {
                painter.report.kind = DrawKind::Incremental { delta };
                painter.scroll_by(delta, extent);
                painter.repaint_bases(&pending.bases);
            }
            (false, false, Some(_)) => {
                painter.report.kind = DrawKind::Partial;
                painter.repaint_bases(&pending.bases);
            }
            _ => {
                painter.report.kind = DrawKind::Full;
                painter.full(extent);
            }
        }
        let report = painter.report;
        drop(model);
        self.drawn_offset = Some(offset);
        debug!(
            generation = ?report.generation,
            kind = ?report.kind,
            rows = report.rows.len(),
            "frame drawn"
        );
        report
    }

    // ---- scrolling ----

    /// Scrolls to `offset` (clamped). The offset is stored silently in the
    /// model and persisted; the ticket completes once the frame showing the
    /// new offset is painted. A short debounced redraw follows to absorb
    /// coalesced scroll requests.
    pub fn scroll_to(&mut self, offset: f64) -> RedrawTicket {
        let Some(generation) = self.generation.as_ref() else {
            return RedrawTicket::resolved();
        };
        let offset = generation.clamp_offset(offset);
        self.offset = offset;
        {
            let mut model = self.model.borrow_mut();
            self.persistence.stage_offset(&mut *model, offset);
        }
        self.host.set_scroll_position(offset);
        self.scheduler.request_scroll();
        if self.phase == ViewportPhase::Idle {
            self.phase = ViewportPhase::Scheduled;
        }
        let ticket = RedrawTicket::new();
        self.scheduler
            .after_next_redraw(Continuation::Resolve(ticket.clone()));
        self.scheduler.after_next_redraw(Continuation::SafetyRedraw);
        self.events.notify(ViewportEvent::Scroll(offset));
        ticket
    }

    /// Scrolls by the distance needed to bring `base` into view.
    pub fn scroll_base_to_visibility(&mut self, base: usize) -> RedrawTicket {
        let distance = match &self.generation {
            Some(generation) => generation.distance_to_visible(base, self.offset),
            None => 0.0,
        };
        if distance == 0.0 {
            RedrawTicket::resolved()
        } else {
            self.scroll_to(self.offset + distance)
        }
    }

    /// Scrolls so `base` starts the visible extent, bounded by the maximum
    /// offset. No-op when the base is already visible.
    pub fn scroll_to_base(&mut self, base: usize) -> RedrawTicket {
        let target = match &self.generation {
            Some(generation) if !generation.is_base_visible(base, self.offset) => generation
                .mapper
                .anchor_offset(base.min(generation.sequence_len()))
                .ok()
                .map(|offset| offset.min(generation.max_offset())),
            _ => None,
        };
        match target {
            Some(offset) => self.scroll_to(offset),
            None => RedrawTicket::resolved(),
        }
    }

    /// Scrolls by one visible extent (`pages` may be negative).
    pub fn scroll_pages(&mut self, pages: f64) -> RedrawTicket {
        let extent = self
            .generation
            .as_ref()
            .map_or(0.0, LayoutGeneration::visible_extent);
        self.scroll_to(self.offset + pages * extent)
    }

    /// Sets or clears the extra highlight band, then refreshes.
    pub fn highlight_base_range(&mut self, range: Option<(usize, usize)>) -> CanvasResult<()> {
        self.highlight = range.map(|(a, b)| (a.min(b), a.max(b)));
        self.refresh()
    }

    // ---- caret ----

    /// Scrolls the caret slot into view if needed, then positions the
    /// caret overlay once that frame is painted.
    pub fn display_caret(&mut self, slot: usize) {
        let visible_base = self
            .row_base(slot)
            .min(self.caret.sequence_len().saturating_sub(1));
        let distance = match &self.generation {
            Some(generation) => match generation.axis() {
                ScrollAxis::Vertical => {
                    let (top, height) = self.caret_band(generation);
                    generation.distance_to_span(visible_base, top, height, self.offset)
                }
                ScrollAxis::Horizontal => generation.distance_to_visible(visible_base, self.offset),
            },
            None => 0.0,
        };
        let ticket = if distance == 0.0 {
            RedrawTicket::resolved()
        } else {
            self.scroll_to(self.offset + distance)
        };
        if ticket.is_complete() {
            self.place_caret(slot);
        } else {
            self.caret_display = None;
            self.scheduler
                .after_next_redraw(Continuation::PlaceCaret(slot));
        }
    }

    /// Base whose row holds `slot` as the caret is drawn: the base before a
    /// trailing caret or an end-of-sequence caret that sits on a row boundary.
    fn row_base(&self, slot: usize) -> usize {
        let per_row = self
            .generation
            .as_ref()
            .map_or(1, |g| g.bases_per_row.max(1));
        let back = slot > 0
            && slot % per_row == 0
            && (self.caret.caret_trails() || slot == self.caret.sequence_len());
        if back {
            slot - 1
        } else {
            slot
        }
    }

    /// Base whose row holds the caret, if there is one.
    pub fn caret_row_base(&self) -> Option<usize> {
        self.caret.caret().map(|slot| self.row_base(slot))
    }

    /// Top and height of the caret track inside a row.
    fn caret_band(&self, generation: &LayoutGeneration) -> (f64, f64) {
        generation
            .placements
            .iter()
            .find(|p| p.name == self.options.caret_track)
            .map_or((0.0, generation.row_height), |p| (p.top, p.height))
    }

    fn place_caret(&mut self, slot: usize) {
        let Some(generation) = &self.generation else {
            return;
        };
        if let Some(err) = &generation.coordinate_error {
            debug!(error = %err, "caret skipped");
            self.caret_display = None;
            return;
        }
        let Some(point) = caret_point(&generation.mapper, slot, self.caret.caret_trails()) else {
            warn!(slot, "caret slot could not be mapped");
            self.caret_display = None;
            return;
        };
        let (top, height) = self.caret_band(generation);
        let (x, y) = match generation.axis() {
            ScrollAxis::Vertical => (point.x, point.y - self.offset + top),
            ScrollAxis::Horizontal => (point.x - self.offset, point.y + top),
        };
        self.caret_display = Some(CaretDisplay { slot, x, y, height });
    }

    fn after_caret_change(&mut self, scope: RedrawScope) {
        self.request(scope);
        match self.caret.caret() {
            Some(slot) => self.display_caret(slot),
            None => self.caret_display = None,
        }
    }

    pub fn move_caret(&mut self, slot: usize) {
        let scope = self.caret.move_caret(slot);
        self.after_caret_change(scope);
    }

    /// Caret at `slot`, drawn at the end of the row before it.
    pub fn move_caret_to_row_end(&mut self, slot: usize) {
        let scope = self.caret.move_caret_to_row_end(slot);
        self.after_caret_change(scope);
    }

    pub fn select(&mut self, bounds: Option<(usize, usize)>) {
        let scope = self.caret.select(bounds);
        self.after_caret_change(scope);
    }

    pub fn select_all(&mut self) {
        let scope = self.caret.select_all();
        self.after_caret_change(scope);
    }

    pub fn expand_selection_to_new_caret(&mut self, new_caret: usize) {
        let scope = self.caret.expand_selection_to_new_caret(new_caret);
        self.after_caret_change(scope);
    }

    pub fn extend_left(&mut self) {
        let scope = self.caret.extend_left();
        self.after_caret_change(scope);
    }

    pub fn extend_right(&mut self) {
        let scope = self.caret.extend_right();
        self.after_caret_change(scope);
    }

    pub fn extend_to(&mut self, slot: usize) {
        let scope = self.caret.extend_to(slot);
        self.after_caret_change(scope);
    }

    /// Clears caret and selection (focus lost or explicit deselect).
    pub fn blur(&mut self) {
        let scope = self.caret.clear();
        self.request(scope);
        self.caret_display = None;
    }

    // ---- pointer ----

    /// Caret slot under a screen position.
    pub fn slot_at(&self, x: f64, y: f64) -> Option<usize> {
        let generation = self.generation.as_ref()?;
        let (cx, cy) = match generation.axis() {
            ScrollAxis::Vertical => (x, y + self.offset),
            ScrollAxis::Horizontal => (x + self.offset, y),
        };
        Some(generation.mapper.caret_from_pixel(cx, cy))
    }

    /// Pointer down: places the caret, or extends the selection when
    /// `extend` (shift) is held.
    pub fn pointer_down(&mut self, x: f64, y: f64, extend: bool) {
        let Some(slot) = self.slot_at(x, y) else {
            return;
        };
        let scope = if extend {
            self.caret.extend_to(slot)
        } else {
            self.caret.begin_selection(slot)
        };
        self.after_caret_change(scope);
    }

    pub fn pointer_drag(&mut self, x: f64, y: f64) {
        let Some(slot) = self.slot_at(x, y) else {
            return;
        };
        let scope = self.caret.update_selection(slot);
        self.after_caret_change(scope);
    }

    pub fn pointer_up(&mut self) {
        self.caret.finish_selection();
    }

    // ---- editing ----

    /// Types or pastes bases: replaces the selection, or inserts at the
    /// caret. Only `A C G T` survive.
    pub fn insert_text(&mut self, text: &str) -> CanvasResult<()> {
        let bases = clean_pasted_text(text);
        if bases.is_empty() {
            return Ok(());
        }
        let at = match (self.caret.selection(), self.caret.caret()) {
            (Some(selection), _) => {
                self.edit(|m| m.delete_bases(selection.start, selection.len()))?;
                selection.start
            }
            (None, Some(caret)) => caret,
            (None, None) => return Ok(()),
        };
        self.edit(|m| m.insert_bases(at, &bases))?;
        self.replace_caret(at + bases.chars().count());
        Ok(())
    }

    /// Backspace: removes the selection, or the base before the caret.
    pub fn delete_backward(&mut self) -> CanvasResult<()> {
        self.delete(true)
    }

    /// Delete: removes the selection, or the base after the caret.
    pub fn delete_forward(&mut self) -> CanvasResult<()> {
        self.delete(false)
    }

    fn delete(&mut self, backward: bool) -> CanvasResult<()> {
        let len = self.caret.sequence_len();
        let (at, count) = match (self.caret.selection(), self.caret.caret()) {
            (Some(selection), _) => (selection.start, selection.len()),
            (None, Some(caret)) if backward && caret > 0 => (caret - 1, 1),
            (None, Some(caret)) if !backward && caret < len => (caret, 1),
            _ => return Ok(()),
        };
        self.edit(|m| m.delete_bases(at, count))?;
        self.replace_caret(at);
        Ok(())
    }

    fn edit(
        &mut self,
        operation: impl FnOnce(&mut dyn crate::model::SequenceModel) -> Result<(), ModelError>,
    ) -> CanvasResult<()> {
        let len = {
            let mut model = self.model.borrow_mut();
            operation(&mut *model)?;
            model.len()
        };
        self.caret.set_sequence_len(len);
        Ok(())
    }

    /// Moves the caret once the refresh triggered by an edit is painted.
    fn replace_caret(&mut self, slot: usize) {
        let scope = self.caret.move_caret(slot);
        self.request(scope);
        self.caret_display = None;
        self.scheduler
            .after_next_redraw(Continuation::ShowCaret(slot));
    }

    /// Flushes persistence and detaches from the model.
    fn teardown(&mut self) {
        let Some(subscription) = self.subscription.take() else {
            return;
        };
        let Ok(mut model) = self.model.try_borrow_mut() else {
            warn!("model busy during teardown, subscription left in place");
            return;
        };
        model.unsubscribe(subscription.id());
        if let Err(err) = self.persistence.flush(&mut *model, Instant::now()) {
            warn!(error = %err, "failed to persist display state on teardown");
        }
    }
}

impl<S: Surface, H: HostElement> Drop for Viewport<S, H> {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Paints rows of one generation onto the surface.
struct Painter<'a> {
    surface: &'a mut dyn Surface,
    registry: &'a mut TrackRegistry,
    generation: &'a LayoutGeneration,
    ctx: DrawContext<'a>,
    highlight: Option<(usize, usize)>,
    report: DrawReport,
}

impl Painter<'_> {
    fn offset(&self) -> f64 {
        self.ctx.scroll_offset
    }

    fn full(&mut self, extent: f64) {
        self.surface.clear();
        let offset = self.offset();
        self.paint_span(offset, offset + extent);
    }

    /// Shifts the painted pixels and fills the exposed strip.
    fn scroll_by(&mut self, delta: f64, extent: f64) {
        let offset = self.offset();
        match self.generation.axis() {
            ScrollAxis::Vertical => self.surface.shift(0.0, -delta),
            ScrollAxis::Horizontal => self.surface.shift(-delta, 0.0),
        }
        let (from, to) = if delta > 0.0 {
            (offset + extent - delta, offset + extent)
        } else {
            (offset, offset - delta)
        };
        if self.generation.axis() == ScrollAxis::Horizontal {
            let height = self.surface.height();
            self.surface.clear_rect(from - offset, 0.0, to - from, height);
        }
        self.paint_span(from, to);
    }

    /// Paints content along the scroll axis in `[from, to)`.
    fn paint_span(&mut self, from: f64, to: f64) {
        match self.generation.axis() {
            ScrollAxis::Vertical => {
                if let Some((first, last)) = self.generation.rows_in_span(from, to) {
                    for row in first..=last {
                        self.paint_row(row);
                    }
                }
            }
            ScrollAxis::Horizontal => {
                if self.generation.sequence_len() == 0 {
                    return;
                }
                let (start, end) = self.generation.mapper.bases_in_span(from, to);
                self.paint_strip(BaseRange::new(start, end));
            }
        }
    }

    /// Repaints the rows holding `bases`.
    fn repaint_bases(&mut self, bases: &std::collections::BTreeSet<usize>) {
        if bases.is_empty() {
            return;
        }
        let offset = self.offset();
        let extent = self.generation.visible_extent();
        match self.generation.axis() {
            ScrollAxis::Vertical => {
                let Some((first, last)) = self.generation.rows_in_span(offset, offset + extent) else {
                    return;
                };
                let mut rows: Vec<usize> = bases
                    .iter()
                    .map(|&base| self.generation.mapper.row_of(base))
                    .filter(|row| (first..=last).contains(row))
                    .collect();
                rows.dedup();
                for row in rows {
                    let y = self.generation.row_top(row) - offset;
                    let width = self.surface.width();
                    self.surface.clear_rect(0.0, y, width, self.generation.row_height);
                    self.paint_row(row);
                }
            }
            ScrollAxis::Horizontal => {
                let (width, height) = (self.surface.width(), self.surface.height());
                self.surface.clear_rect(0.0, 0.0, width, height);
                self.paint_span(offset, offset + extent);
            }
        }
    }

    fn paint_row(&mut self, row: usize) {
        let Some(range) = self.generation.row_range(row) else {
            return;
        };
        let y = self.generation.row_top(row) - self.offset();
        self.paint(row, range, y);
    }

    fn paint_strip(&mut self, range: BaseRange) {
        let y = self.generation.mapper.geometry().margin_top;
        self.paint(0, range, y);
    }

    fn paint(&mut self, row: usize, range: BaseRange, y: f64) {
        if let Some((from, to)) = self.highlight {
            let width = self.ctx.base_width();
            for base in range.iter().filter(|b| (from..=to).contains(b)) {
                let x = self.ctx.base_x(base);
                self.surface
                    .fill_rect(x, y, width, self.generation.row_height, HIGHLIGHT_COLOR);
            }
        }
        let origin = Point::new(self.generation.mapper.geometry().margin_left, y);
        let failures =
            self.registry.draw_row(
                &mut *self.surface,
                &self.ctx,
                &self.generation.placements,
                origin,
                range,
            );
        for (track, source) in failures {
            let err = CanvasError::Draw {
                track: track.clone(),
                source,
            };
            error!(track = %track, row, error = %err, "track failed to draw");
            if !self.report.failed_tracks.contains(&track) {
                self.report.failed_tracks.push(track);
            }
        }
        if !self.report.rows.contains(&row) {
            self.report.rows.push(row);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::layout::Margins;
    use crate::model::{Sequence, SequenceModel, SettingValue, SETTING_COMPLEMENTS, SETTING_SCROLL_OFFSET};
    use crate::surface::CellBuffer;
    use crate::test_utils::{FixedHost, RecordingTrack, TrackLog};
    use crate::tracks::VisibilityRule;

    type TestViewport = Viewport<CellBuffer, FixedHost>;

    fn options() -> ViewportOptions {
        ViewportOptions {
            layout: LayoutSettings {
                margins: Margins::uniform(0.0),
                base_width: 1.0,
                gutter_width: 0.0,
                ..LayoutSettings::terminal()
            },
            caret_track: "bases".to_string(),
            ..ViewportOptions::default()
        }
    }

    /// 10 bases per row, 2 lines per row, 6 lines tall: 3 rows visible.
    fn viewport(seq: Sequence) -> (TestViewport, Rc<RefCell<TrackLog>>, FixedHost) {
        let model: SharedModel = Rc::new(RefCell::new(seq));
        let host = FixedHost::new(10.0, 6.0);
        let mut registry = TrackRegistry::new();
        let (ruler, _) = RecordingTrack::new(1.0);
        let (bases, log) = RecordingTrack::new(1.0);
        registry.register("ruler", VisibilityRule::Always, Box::new(ruler)).unwrap();
        registry.register("bases", VisibilityRule::Always, Box::new(bases)).unwrap();
        let viewport = Viewport::new(model, host.clone(), CellBuffer::new(0, 0), registry, options());
        (viewport, log, host)
    }

    fn seq(len: usize) -> Sequence {
        Sequence::new("s", "ACGT".repeat(len / 4 + 1)[..len].to_string())
    }

    #[test]
    fn test_first_frame_is_full() {
        let (mut viewport, log, _) = viewport(seq(100));
        assert_eq!(viewport.phase(), ViewportPhase::Scheduled);
        let report = viewport.frame(Instant::now());
        assert_eq!(report.kind, DrawKind::Full);
        assert_eq!(report.rows, vec![0, 1, 2]);
        assert_eq!(log.borrow().draws.len(), 3);
        assert_eq!(viewport.phase(), ViewportPhase::Idle);
        // Nothing pending: no draw
        assert_eq!(viewport.frame(Instant::now()).kind, DrawKind::Skipped);
    }

    #[test]
    fn test_triggers_coalesce_into_one_draw() {
        let (mut viewport, log, _) = viewport(seq(100));
        viewport.frame(Instant::now());
        log.borrow_mut().draws.clear();

        viewport.refresh().unwrap();
        viewport.refresh().unwrap();
        viewport.select(Some((3, 5)));
        let report = viewport.frame(Instant::now());
        assert_eq!(report.kind, DrawKind::Full);
        assert_eq!(log.borrow().draws.len(), 3);
    }

    #[test]
    fn test_scroll_is_incremental_and_resolves_after_draw() {
        let (mut viewport, log, host) = viewport(seq(200));
        let start = Instant::now();
        viewport.frame(start);
        log.borrow_mut().draws.clear();
        let events = viewport.subscribe_events(&["scroll"]);

        let ticket = viewport.scroll_to(2.0);
        assert!(!ticket.is_complete());
        assert_eq!(events.drain(), vec![ViewportEvent::Scroll(2.0)]);
        assert_eq!(host.scroll_position(), 2.0);
        assert_eq!(
            viewport.model().borrow().setting(SETTING_SCROLL_OFFSET),
            Some(SettingValue::Number(2.0))
        );

        let report = viewport.frame(start);
        assert_eq!(report.kind, DrawKind::Incremental { delta: 2.0 });
        // Only the newly exposed row is painted
        assert_eq!(report.rows, vec![3]);
        assert!(ticket.is_complete());

        // Safety redraw after the debounce delay
        assert_eq!(viewport.frame(start + Duration::from_millis(1)).kind, DrawKind::Skipped);
        assert_eq!(
            viewport.frame(start + Duration::from_millis(20)).kind,
            DrawKind::Full
        );
    }

    #[test]
    fn test_scroll_is_clamped() {
        let (mut viewport, _, _) = viewport(seq(100));
        viewport.frame(Instant::now());
        // 10 rows of 2 lines, 6 visible
        viewport.scroll_to(1_000.0);
        assert_eq!(viewport.offset(), 14.0);
        viewport.scroll_to(-5.0);
        assert_eq!(viewport.offset(), 0.0);
    }

    #[test]
    fn test_large_jump_falls_back_to_full() {
        let (mut viewport, _, _) = viewport(seq(200));
        viewport.frame(Instant::now());
        viewport.scroll_to(20.0);
        assert_eq!(viewport.frame(Instant::now()).kind, DrawKind::Full);
    }

    #[test]
    fn test_resize_keeps_first_visible_base() {
        let (mut viewport, _, host) = viewport(seq(200));
        viewport.frame(Instant::now());
        viewport.scroll_to(8.0);
        viewport.frame(Instant::now());
        let first = viewport.generation().unwrap().mapper.first_visible_base(viewport.offset());
        assert_eq!(first, 40);

        // Taller, same width: bases per row unchanged
        host.resize(10.0, 9.0);
        let events = viewport.subscribe_events(&["resize"]);
        viewport.refresh_from_resize().unwrap();
        assert_eq!(events.drain(), vec![ViewportEvent::Resize(Dimensions::new(10.0, 9.0))]);
        let generation = viewport.generation().unwrap();
        assert_eq!(generation.mapper.first_visible_base(viewport.offset()), first);
        assert_eq!(viewport.frame(Instant::now()).kind, DrawKind::Full);
    }

    #[test]
    fn test_measurement_failure_keeps_last_layout() {
        let (mut viewport, _, host) = viewport(seq(100));
        viewport.frame(Instant::now());
        host.fail_measure(true);
        assert!(matches!(viewport.refresh(), Err(CanvasError::Measurement(_))));
        assert_eq!(viewport.generation().unwrap().id, 1);
        assert_eq!(viewport.phase(), ViewportPhase::Idle);

        host.fail_measure(false);
        viewport.refresh().unwrap();
        assert_eq!(viewport.generation().unwrap().id, 2);
    }

    #[test]
    fn test_selection_edge_step_repaints_one_row() {
        let (mut viewport, _, _) = viewport(seq(100));
        viewport.frame(Instant::now());
        viewport.select(Some((3, 7)));
        viewport.frame(Instant::now());

        viewport.expand_selection_to_new_caret(8);
        assert_eq!(viewport.selection(), Some(Selection::new(3, 8)));
        let report = viewport.frame(Instant::now());
        assert_eq!(report.kind, DrawKind::Partial);
        assert_eq!(report.rows, vec![0]);

        viewport.expand_selection_to_new_caret(15);
        assert_eq!(viewport.frame(Instant::now()).kind, DrawKind::Full);
    }

    #[test]
    fn test_caret_scrolls_into_view_before_display() {
        let (mut viewport, _, _) = viewport(seq(200));
        viewport.frame(Instant::now());
        viewport.move_caret(95);
        // Row 9 is below the fold: placed after the scroll frame
        assert_eq!(viewport.caret_display(), None);
        viewport.frame(Instant::now());
        let display = viewport.caret_display().unwrap();
        assert_eq!(display.slot, 95);
        assert_eq!(display.x, 5.0);
        // Row 9 top is 18, bottom of the view at offset 14; bases track is 1 line down
        assert_eq!(viewport.offset(), 14.0);
        assert_eq!(display.y, 5.0);
        assert_eq!(viewport.caret_info(), "96");
    }

    #[test]
    fn test_caret_settles_when_rows_are_taller_than_the_view() {
        let (mut viewport, _, host) = viewport(seq(200));
        host.resize(10.0, 1.0);
        viewport.refresh_from_resize().unwrap();
        let start = Instant::now();
        viewport.frame(start);

        viewport.move_caret(95);
        let mut offsets = Vec::new();
        for i in 0..12u64 {
            viewport.frame(start + Duration::from_millis(20 * i));
            offsets.push(viewport.offset());
        }
        // The bases line of row 9 is shown and the caret stays put
        assert!(offsets.iter().all(|&offset| offset == 19.0), "{offsets:?}");
        assert_eq!(
            viewport.caret_display(),
            Some(CaretDisplay { slot: 95, x: 5.0, y: 0.0, height: 1.0 })
        );
        assert_eq!(viewport.frame(start + Duration::from_secs(1)).kind, DrawKind::Skipped);

        // A whole row cannot fit: its top edge counts as visible
        viewport.scroll_base_to_visibility(95);
        viewport.frame(start + Duration::from_secs(2));
        assert_eq!(viewport.offset(), 18.0);
        assert!(viewport.scroll_base_to_visibility(95).is_complete());
    }

    /// 40 bases one unit apart along x.
    fn traced(len: usize) -> Sequence {
        seq(len).with_peaks((0..len).map(|i| i as f64).collect())
    }

    #[test]
    fn test_traced_scroll_shifts_along_x() {
        let (mut viewport, log, host) = viewport(traced(40));
        let start = Instant::now();
        assert_eq!(viewport.frame(start).kind, DrawKind::Full);
        assert_eq!(host.scroll_extent(), Some((ScrollAxis::Horizontal, 40.0)));
        log.borrow_mut().draws.clear();

        let ticket = viewport.scroll_to(4.0);
        let report = viewport.frame(start);
        assert_eq!(report.kind, DrawKind::Incremental { delta: 4.0 });
        assert_eq!(report.rows, vec![0]);
        assert!(ticket.is_complete());
        {
            let log = log.borrow();
            assert_eq!(log.draws.len(), 1);
            // Only the strip exposed on the right, around x 10..14
            let (y, range) = log.draws[0];
            assert_eq!(y, 0.0);
            assert!(range.start <= 10 && range.end >= 13 && range.end <= 15, "{range:?}");
        }

        log.borrow_mut().draws.clear();
        viewport.scroll_to(1.0);
        let report = viewport.frame(start);
        assert_eq!(report.kind, DrawKind::Incremental { delta: -3.0 });
        let (_, range) = log.borrow().draws[0];
        assert!(range.start <= 1 && range.end >= 3 && range.end <= 5, "{range:?}");
    }

    #[test]
    fn test_traced_caret_scrolls_along_x() {
        let (mut viewport, _, _) = viewport(traced(40));
        viewport.frame(Instant::now());
        viewport.move_caret(20);
        assert_eq!(viewport.caret_display(), None);
        viewport.frame(Instant::now());
        // Base 20 right edge at 21, view 10 wide
        assert_eq!(viewport.offset(), 11.0);
        // Half a base before the peak, on the bases line
        assert_eq!(
            viewport.caret_display(),
            Some(CaretDisplay { slot: 20, x: 8.5, y: 1.0, height: 1.0 })
        );
    }

    #[test]
    fn test_bad_peak_table_skips_caret_and_selection() {
        let (mut viewport, log, _) = viewport(seq(40).with_peaks(vec![3.0, 2.0, 1.0]));
        let generation = viewport.generation().unwrap();
        assert!(generation.coordinate_error.is_some());
        assert_eq!(generation.axis(), ScrollAxis::Vertical);
        viewport.frame(Instant::now());
        log.borrow_mut().selections.clear();

        viewport.select(Some((2, 4)));
        assert_eq!(viewport.selection(), Some(Selection::new(2, 4)));
        assert_eq!(viewport.caret_display(), None);
        assert_eq!(viewport.frame(Instant::now()).kind, DrawKind::Full);
        let log = log.borrow();
        assert!(!log.selections.is_empty());
        assert!(log.selections.iter().all(Option::is_none));
    }

    #[test]
    fn test_caret_at_row_wrap_after_selection() {
        let (mut viewport, _, _) = viewport(seq(100));
        viewport.frame(Instant::now());
        viewport.select(Some((4, 9)));
        let display = viewport.caret_display().unwrap();
        assert_eq!(display.slot, 10);
        assert_eq!((display.x, display.y), (10.0, 1.0));
    }

    #[test]
    fn test_setting_change_relayouts_dependent_tracks() {
        let model: SharedModel = Rc::new(RefCell::new(seq(40)));
        let mut registry = TrackRegistry::new();
        let (bases, _) = RecordingTrack::new(1.0);
        let (complements, complement_log) = RecordingTrack::new(1.0);
        registry.register("bases", VisibilityRule::Always, Box::new(bases)).unwrap();
        registry
            .register("complements", VisibilityRule::setting(SETTING_COMPLEMENTS), Box::new(complements))
            .unwrap();
        let mut viewport = Viewport::new(
            model.clone(),
            FixedHost::new(10.0, 6.0),
            CellBuffer::new(0, 0),
            registry,
            options(),
        );
        viewport.frame(Instant::now());
        assert_eq!(viewport.generation().unwrap().row_height, 1.0);
        assert!(complement_log.borrow().draws.is_empty());

        model
            .borrow_mut()
            .set_setting(SETTING_COMPLEMENTS, SettingValue::from(true), false);
        viewport.frame(Instant::now());
        assert_eq!(viewport.generation().unwrap().row_height, 2.0);
        assert_eq!(complement_log.borrow().draws.len(), 3);
    }

    #[test]
    fn test_failing_track_is_isolated() {
        let model: SharedModel = Rc::new(RefCell::new(seq(40)));
        let mut registry = TrackRegistry::new();
        let (broken, _) = RecordingTrack::failing(1.0);
        let (bases, log) = RecordingTrack::new(1.0);
        registry.register("broken", VisibilityRule::Always, Box::new(broken)).unwrap();
        registry.register("bases", VisibilityRule::Always, Box::new(bases)).unwrap();
        let mut viewport = Viewport::new(
            model,
            FixedHost::new(10.0, 6.0),
            CellBuffer::new(0, 0),
            registry,
            options(),
        );
        let report = viewport.frame(Instant::now());
        assert_eq!(report.failed_tracks, vec!["broken".to_string()]);
        assert_eq!(log.borrow().draws.len(), 3);
    }

    #[test]
    fn test_typing_replaces_selection_and_replaces_caret() {
        let (mut viewport, _, _) = viewport(Sequence::new("s", "AAAACCCC"));
        viewport.frame(Instant::now());
        viewport.select(Some((2, 5)));
        viewport.insert_text("g-t").unwrap();
        assert_eq!(viewport.model().borrow().subsequence(0..10), "AAGTCC");
        assert_eq!(viewport.caret(), Some(4));
        assert_eq!(viewport.selection(), None);

        viewport.frame(Instant::now());
        assert_eq!(viewport.generation().unwrap().sequence_len(), 6);
        assert_eq!(viewport.caret_display().map(|d| d.slot), Some(4));

        viewport.delete_backward().unwrap();
        assert_eq!(viewport.model().borrow().subsequence(0..10), "AAGCC");
        viewport.delete_forward().unwrap();
        assert_eq!(viewport.model().borrow().subsequence(0..10), "AAGC");
        assert_eq!(viewport.caret(), Some(3));
    }

    #[test]
    fn test_read_only_rejects_edits() {
        let (mut viewport, _, _) = viewport(Sequence::new("s", "ACGT").read_only(true));
        viewport.move_caret(1);
        assert!(matches!(
            viewport.insert_text("A"),
            Err(CanvasError::Model(ModelError::ReadOnly))
        ));
    }

    #[test]
    fn test_pointer_drag_selects() {
        let (mut viewport, _, _) = viewport(seq(100));
        viewport.frame(Instant::now());
        viewport.pointer_down(2.0, 1.0, false);
        assert_eq!(viewport.caret(), Some(2));
        viewport.pointer_drag(6.0, 1.0);
        assert_eq!(viewport.caret_state(), CaretState::Selecting { anchor: 2 });
        // Second row
        viewport.pointer_drag(3.0, 3.0);
        viewport.pointer_up();
        assert_eq!(viewport.selection(), Some(Selection::new(2, 12)));
        assert_eq!(viewport.caret_state(), CaretState::Selected);

        viewport.pointer_down(0.0, 0.0, true);
        assert_eq!(viewport.selection(), Some(Selection::new(0, 1)));
    }

    #[test]
    fn test_highlight_and_blur() {
        let (mut viewport, _, _) = viewport(seq(100));
        viewport.highlight_base_range(Some((5, 2))).unwrap();
        assert_eq!(viewport.highlight(), Some((2, 5)));
        viewport.frame(Instant::now());
        assert_eq!(viewport.surface().cell(3, 0).unwrap().paint.bg, HIGHLIGHT_COLOR);

        viewport.move_caret(3);
        viewport.blur();
        assert_eq!(viewport.caret(), None);
        assert_eq!(viewport.caret_display(), None);
    }

    #[test]
    fn test_waiter_runs_after_paint() {
        let (mut viewport, _, _) = viewport(seq(100));
        let fired = Rc::new(std::cell::Cell::new(false));
        let flag = fired.clone();
        viewport.after_next_redraw(move || flag.set(true));
        assert!(!fired.get());
        viewport.frame(Instant::now());
        assert!(fired.get());
    }

    #[test]
    fn test_drop_unsubscribes_and_flushes() {
        let model: SharedModel = Rc::new(RefCell::new(seq(100)));
        {
            let mut viewport = Viewport::new(
                model.clone(),
                FixedHost::new(10.0, 6.0),
                CellBuffer::new(0, 0),
                TrackRegistry::from_specs(&crate::tracks::TrackSpec::terminal_defaults()).unwrap(),
                options(),
            );
            viewport.frame(Instant::now());
            viewport.scroll_to(4.0);
        }
        let model = model.borrow();
        assert_eq!(model.setting(SETTING_SCROLL_OFFSET), Some(SettingValue::Number(4.0)));
    }
}
