//! Layout engine.
//!
//! [`compute_layout`] turns the settings, the measured viewport, the
//! sequence and the track stack into an immutable [`LayoutGeneration`].
//! Consumers hold on to one generation; a recompute replaces it wholesale.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::coords::{CoordinateError, CoordinateMapper, Geometry, Regime, ScrollAxis};
use crate::error::{CanvasError, CanvasResult};
use crate::model::{SequenceModel, SETTING_GUTTERS};
use crate::tracks::{BaseRange, LayoutContext, TrackPlacement, TrackRegistry};

/// Row widths tried, in order, when not even one block fits.
const FALLBACK_ROW_WIDTHS: [usize; 3] = [5, 2, 1];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Margins {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Margins {
    pub fn uniform(value: f64) -> Self {
        Self {
            top: value,
            right: value,
            bottom: value,
            left: value,
        }
    }
}

/// Configured geometry. The canvas size is only the initial guess; the
/// measured host size wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutSettings {
    pub canvas_width: f64,
    pub canvas_height: f64,
    pub margins: Margins,
    pub base_width: f64,
    pub base_height: f64,
    /// Space between blocks, used only while gutters are enabled.
    pub gutter_width: f64,
    pub bases_per_block: usize,
    /// Per-base width used for the extent of trace-backed sequences.
    pub trace_base_width: f64,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            canvas_width: 1138.0,
            canvas_height: 448.0,
            margins: Margins::uniform(20.0),
            base_width: 10.0,
            base_height: 15.0,
            gutter_width: 30.0,
            bases_per_block: 10,
            trace_base_width: 30.0,
        }
    }
}

impl LayoutSettings {
    /// Character-cell geometry for terminal hosts.
    pub fn terminal() -> Self {
        Self {
            canvas_width: 80.0,
            canvas_height: 24.0,
            margins: Margins {
                top: 0.0,
                right: 1.0,
                bottom: 0.0,
                left: 1.0,
            },
            base_width: 1.0,
            base_height: 1.0,
            gutter_width: 1.0,
            bases_per_block: 10,
            trace_base_width: 1.0,
        }
    }
}

/// Measured size of the host element.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Dimensions {
    pub width: f64,
    pub height: f64,
}

impl Dimensions {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Bases per row for a canvas width. Always at least 1.
pub fn bases_per_row(
    width: f64,
    gutter: f64,
    margin_left: f64,
    margin_right: f64,
    base_width: f64,
    bases_per_block: usize,
) -> usize {
    let usable = width + gutter - margin_left - margin_right;
    let block_width = bases_per_block as f64 * base_width + gutter;
    let blocks = (usable / block_width).floor();
    if blocks.is_finite() && blocks >= 1.0 {
        return bases_per_block * blocks as usize;
    }
    let raw = (usable / base_width).floor();
    FALLBACK_ROW_WIDTHS
        .into_iter()
        .find(|&n| raw >= n as f64)
        .unwrap_or(1)
}

/// Everything one layout pass reads.
pub struct LayoutInput<'a> {
    pub generation: u64,
    pub settings: &'a LayoutSettings,
    pub viewport: Dimensions,
    pub model: &'a dyn SequenceModel,
    /// Current scroll offset, clamped into the new extent.
    pub scroll_offset: f64,
    /// Base to bring to the start of the visible extent instead.
    pub anchor_base: Option<usize>,
}

/// One immutable layout snapshot.
#[derive(Debug)]
pub struct LayoutGeneration {
    pub id: u64,
    pub viewport: Dimensions,
    pub bases_per_row: usize,
    pub placements: Vec<TrackPlacement>,
    pub row_height: f64,
    pub total_rows: usize,
    pub visible_rows: usize,
    /// Content size along the scroll axis, margins included.
    pub content_extent: f64,
    pub scroll_offset: f64,
    pub mapper: CoordinateMapper,
    /// Set when the peak table was rejected and the uniform regime is used.
    pub coordinate_error: Option<CoordinateError>,
}

impl LayoutGeneration {
    pub fn axis(&self) -> ScrollAxis {
        self.mapper.axis()
    }

    /// Viewport size along the scroll axis.
    pub fn visible_extent(&self) -> f64 {
        match self.axis() {
            ScrollAxis::Vertical => self.viewport.height,
            ScrollAxis::Horizontal => self.viewport.width,
        }
    }

    pub fn max_offset(&self) -> f64 {
        (self.content_extent - self.visible_extent()).max(0.0)
    }

    pub fn clamp_offset(&self, offset: f64) -> f64 {
        if offset.is_finite() {
            offset.clamp(0.0, self.max_offset())
        } else {
            0.0
        }
    }

    pub fn sequence_len(&self) -> usize {
        self.mapper.sequence_len()
    }

    /// Bases of one row (the whole strip in the peak-indexed regime).
    pub fn row_range(&self, row: usize) -> Option<BaseRange> {
        let len = self.sequence_len();
        let start = row * self.bases_per_row;
        if start >= len {
            return None;
        }
        Some(BaseRange::new(start, (start + self.bases_per_row - 1).min(len - 1)))
    }

    /// Content y of a row's top.
    pub fn row_top(&self, row: usize) -> f64 {
        self.mapper.geometry().margin_top + row as f64 * self.row_height
    }

    /// Rows intersecting the content span `[from, to)` (uniform regime).
    pub fn rows_in_span(&self, from: f64, to: f64) -> Option<(usize, usize)> {
        if self.total_rows == 0 || self.row_height <= 0.0 || to <= from {
            return None;
        }
        let top = self.mapper.geometry().margin_top;
        let first = ((from - top) / self.row_height).floor().max(0.0) as usize;
        let last = (((to - top) / self.row_height).ceil() as isize - 1).max(0) as usize;
        let last = last.min(self.total_rows - 1);
        (first <= last).then_some((first, last))
    }

    /// Bases visible at `offset`.
    pub fn visible_range(&self, offset: f64) -> Option<BaseRange> {
        let len = self.sequence_len();
        if len == 0 {
            return None;
        }
        match self.axis() {
            ScrollAxis::Vertical => {
                let (first, last) = self.rows_in_span(offset, offset + self.visible_extent())?;
                let start = self.row_range(first)?.start;
                let end = self.row_range(last)?.end;
                Some(BaseRange::new(start, end))
            }
            ScrollAxis::Horizontal => {
                let (start, end) = self.mapper.bases_in_span(offset, offset + self.visible_extent());
                Some(BaseRange::new(start, end))
            }
        }
    }

    /// Whether `base` lies entirely inside the visible extent at `offset`.
    pub fn is_base_visible(&self, base: usize, offset: f64) -> bool {
        self.distance_to_visible(base, offset) == 0.0
    }

    /// Signed scroll distance that brings `base` fully into view.
    pub fn distance_to_visible(&self, base: usize, offset: f64) -> f64 {
        let size = match self.axis() {
            ScrollAxis::Vertical => self.row_height,
            ScrollAxis::Horizontal => self.mapper.geometry().base_width,
        };
        self.distance_to_span(base, 0.0, size, offset)
    }

    /// Signed scroll distance that brings the band `[lead, lead + size)`
    /// along the scroll axis, relative to `base`, into view.
    pub fn distance_to_span(&self, base: usize, lead: f64, size: f64, offset: f64) -> f64 {
        let Ok(position) = self.mapper.axis_position(base.min(self.sequence_len())) else {
            return 0.0;
        };
        let position = position + lead;
        let extent = self.visible_extent();
        if position < offset {
            position - offset
        } else if size > extent {
            // Taller than the view: the leading edge is all that can be shown
            (position - offset).min(self.max_offset() - offset).max(0.0)
        } else if position + size > offset + extent {
            (position + size - (offset + extent)).min(self.max_offset() - offset).max(0.0)
        } else {
            0.0
        }
    }
}

/// Runs one layout pass.
///
/// Track caches are cleared and computed heights refreshed. Fails with
/// [`CanvasError::LayoutInvalid`] when the geometry cannot produce a row.
pub fn compute_layout(
    input: LayoutInput<'_>,
    registry: &mut TrackRegistry,
) -> CanvasResult<LayoutGeneration> {
    let settings = input.settings;
    let model = input.model;
    let len = model.len();

    let (regime, coordinate_error) = match Regime::from_peaks(model.peaks()) {
        Ok(regime) => (regime, None),
        Err(err) => {
            warn!(error = %err, "peak table rejected, using uniform layout");
            (Regime::Uniform, Some(err))
        }
    };
    let axis = regime.axis();

    let base_width = match axis {
        ScrollAxis::Vertical => settings.base_width,
        ScrollAxis::Horizontal => settings.trace_base_width,
    };
    if !(base_width > 0.0) {
        return Err(CanvasError::LayoutInvalid(format!(
            "base width must be positive, got {base_width}"
        )));
    }
    if settings.bases_per_block == 0 {
        return Err(CanvasError::LayoutInvalid("block size must be at least 1".to_string()));
    }

    let gutter = if model.setting(SETTING_GUTTERS).is_some_and(|v| v.is_truthy()) {
        settings.gutter_width.max(0.0)
    } else {
        0.0
    };
    let margins = settings.margins;
    let per_row = match axis {
        ScrollAxis::Vertical => bases_per_row(
            input.viewport.width,
            gutter,
            margins.left,
            margins.right,
            base_width,
            settings.bases_per_block,
        ),
        ScrollAxis::Horizontal => len.max(1),
    };

    registry.clear_caches();
    let (placements, row_height) = registry.layout(&LayoutContext {
        model,
        bases_per_row: per_row,
    });
    if axis == ScrollAxis::Vertical && !(row_height > 0.0) {
        return Err(CanvasError::LayoutInvalid(
            "no visible track gives the rows a height".to_string(),
        ));
    }

    let (total_rows, visible_rows, content_extent) = match &regime {
        Regime::Uniform => {
            let total_rows = len.div_ceil(per_row);
            let visible_rows = (input.viewport.height / row_height).ceil().max(0.0) as usize;
            let extent = margins.top + margins.bottom + total_rows as f64 * row_height;
            (total_rows, visible_rows, extent)
        }
        Regime::Peaks(table) => {
            let strip = (len as f64 * base_width).max(table.last() + base_width);
            (usize::from(len > 0), 1, margins.left + margins.right + strip)
        }
    };

    let geometry = Geometry {
        margin_left: margins.left,
        margin_top: margins.top,
        base_width,
        gutter,
        bases_per_block: settings.bases_per_block,
        bases_per_row: per_row,
        row_height,
    };
    let mapper = CoordinateMapper::new(input.generation, geometry, regime, len);

    let mut generation = LayoutGeneration {
        id: input.generation,
        viewport: input.viewport,
        bases_per_row: per_row,
        placements,
        row_height,
        total_rows,
        visible_rows,
        content_extent,
        scroll_offset: 0.0,
        mapper,
        coordinate_error,
    };
    let requested = match input.anchor_base {
        Some(base) => generation
            .mapper
            .anchor_offset(base.min(len))
            .unwrap_or(input.scroll_offset),
        None => input.scroll_offset,
    };
    generation.scroll_offset = generation.clamp_offset(requested);

    debug!(
        generation = generation.id,
        bases_per_row = per_row,
        rows = total_rows,
        row_height,
        extent = content_extent,
        offset = generation.scroll_offset,
        "layout computed"
    );
    Ok(generation)
}
