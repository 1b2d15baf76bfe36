//! Shared fixtures for unit tests.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::caret::Selection;
use crate::coords::{CoordinateMapper, Geometry, PeakTable, Point, Regime, ScrollAxis};
use crate::error::{CanvasError, CanvasResult};
use crate::layout::Dimensions;
use crate::model::{Feature, RestrictionSite, SequenceModel};
use crate::surface::Surface;
use crate::tracks::{BaseRange, DrawContext, Track, TrackError, TrackKind, TrackResult};
use crate::viewport::HostElement;

/// Uniform mapper with no margins, one unit per base and rows 3 units tall.
pub fn uniform_mapper(
    len: usize,
    bases_per_row: usize,
    bases_per_block: usize,
    gutter: f64,
) -> CoordinateMapper {
    CoordinateMapper::new(
        1,
        Geometry {
            margin_left: 0.0,
            margin_top: 0.0,
            base_width: 1.0,
            gutter,
            bases_per_block,
            bases_per_row,
            row_height: 3.0,
        },
        Regime::Uniform,
        len,
    )
}

/// Peak-indexed mapper, two units per base, one base per anchor.
pub fn peak_mapper(anchors: &[f64]) -> CoordinateMapper {
    let table = PeakTable::from_slice(anchors).expect("valid peak table");
    CoordinateMapper::new(
        1,
        Geometry {
            margin_left: 0.0,
            margin_top: 0.0,
            base_width: 2.0,
            gutter: 0.0,
            bases_per_block: 10,
            bases_per_row: anchors.len(),
            row_height: 2.0,
        },
        Regime::Peaks(table),
        anchors.len(),
    )
}

pub fn draw_context<'a>(
    model: &'a dyn SequenceModel,
    mapper: &'a CoordinateMapper,
) -> DrawContext<'a> {
    DrawContext {
        model,
        mapper,
        selection: None,
        scroll_offset: 0.0,
        row_height: mapper.geometry().row_height,
    }
}

pub fn feature(name: &str, start: usize, end: usize) -> Feature {
    Feature {
        name: name.to_string(),
        kind: "misc_feature".to_string(),
        start,
        end,
    }
}

pub fn site(enzyme: &str, position: usize, cut: usize) -> RestrictionSite {
    RestrictionSite {
        enzyme: enzyme.to_string(),
        position,
        cut,
    }
}

/// What a [`RecordingTrack`] was asked to do.
#[derive(Debug, Default)]
pub struct TrackLog {
    /// `(origin y, range)` of every draw call.
    pub draws: Vec<(f64, BaseRange)>,
    /// Selection handed to each draw call.
    pub selections: Vec<Option<Selection>>,
    pub clears: usize,
}

/// Fixed-height track that records its calls instead of painting.
pub struct RecordingTrack {
    height: f64,
    floating: Option<f64>,
    fail: bool,
    log: Rc<RefCell<TrackLog>>,
}

impl RecordingTrack {
    pub fn new(height: f64) -> (Self, Rc<RefCell<TrackLog>>) {
        Self::build(height, None, false)
    }

    pub fn floating(origin: f64) -> (Self, Rc<RefCell<TrackLog>>) {
        Self::build(1.0, Some(origin), false)
    }

    pub fn failing(height: f64) -> (Self, Rc<RefCell<TrackLog>>) {
        Self::build(height, None, true)
    }

    fn build(height: f64, floating: Option<f64>, fail: bool) -> (Self, Rc<RefCell<TrackLog>>) {
        let log = Rc::new(RefCell::new(TrackLog::default()));
        let track = Self {
            height,
            floating,
            fail,
            log: log.clone(),
        };
        (track, log)
    }
}

impl Track for RecordingTrack {
    fn kind(&self) -> TrackKind {
        TrackKind::Blank
    }

    fn height(&self) -> f64 {
        self.height
    }

    fn floating(&self) -> bool {
        self.floating.is_some()
    }

    fn floating_origin(&self) -> f64 {
        self.floating.unwrap_or_default()
    }

    fn draw(
        &mut self,
        _surface: &mut dyn Surface,
        ctx: &DrawContext,
        origin: Point,
        range: BaseRange,
    ) -> TrackResult<()> {
        if self.fail {
            return Err(TrackError::Render("broken on purpose".to_string()));
        }
        let mut log = self.log.borrow_mut();
        log.draws.push((origin.y, range));
        log.selections.push(ctx.selection);
        Ok(())
    }

    fn clear_cache(&mut self) {
        self.log.borrow_mut().clears += 1;
    }
}

/// Host whose size and failure mode tests change from the outside.
#[derive(Debug, Clone)]
pub struct FixedHost {
    dimensions: Rc<Cell<Dimensions>>,
    failing: Rc<Cell<bool>>,
    extent: Rc<Cell<Option<(ScrollAxis, f64)>>>,
    position: Rc<Cell<f64>>,
}

impl FixedHost {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            dimensions: Rc::new(Cell::new(Dimensions::new(width, height))),
            failing: Rc::new(Cell::new(false)),
            extent: Rc::new(Cell::new(None)),
            position: Rc::new(Cell::new(0.0)),
        }
    }

    pub fn resize(&self, width: f64, height: f64) {
        self.dimensions.set(Dimensions::new(width, height));
    }

    pub fn fail_measure(&self, failing: bool) {
        self.failing.set(failing);
    }

    pub fn scroll_extent(&self) -> Option<(ScrollAxis, f64)> {
        self.extent.get()
    }

    pub fn scroll_position(&self) -> f64 {
        self.position.get()
    }
}

impl HostElement for FixedHost {
    fn measure(&self) -> CanvasResult<Dimensions> {
        if self.failing.get() {
            return Err(CanvasError::Measurement("host detached".to_string()));
        }
        Ok(self.dimensions.get())
    }

    fn set_scroll_extent(&mut self, axis: ScrollAxis, extent: f64) {
        self.extent.set(Some((axis, extent)));
    }

    fn set_scroll_position(&mut self, offset: f64) {
        self.position.set(offset);
    }
}
