//! Base index <-> pixel conversion.
//!
//! Two regimes are supported:
//! - uniform: bases are laid out in wrapped rows of fixed-width cells,
//!   grouped in blocks separated by a gutter; the canvas scrolls vertically
//! - peak-indexed: each base is anchored at an explicit, non-decreasing
//!   position (trace peak centres) on a single strip; the canvas scrolls
//!   horizontally
//!
//! All positions here are content coordinates: margins are part of the
//! content and the scroll offset is applied by the viewport.

use std::cell::RefCell;
use std::collections::HashMap;

use thiserror::Error;

/// Errors raised while resolving coordinates.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoordinateError {
    #[error("Peak table is empty")]
    EmptyPeakTable,

    #[error("Peak table has a non-finite anchor at index {index}")]
    NonFinitePeak { index: usize },

    #[error("Peak table decreases at index {index}")]
    DecreasingPeak { index: usize },

    #[error("Base {base} is beyond the end of the sequence (length {len})")]
    BaseOutOfRange { base: usize, len: usize },
}

/// Result type for coordinate lookups.
pub type CoordinateResult<T> = Result<T, CoordinateError>;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Validated per-base anchor positions.
#[derive(Debug, Clone, PartialEq)]
pub struct PeakTable {
    anchors: Vec<f64>,
}

impl PeakTable {
    /// Validates the table: it must be non-empty, finite and non-decreasing.
    pub fn new(anchors: Vec<f64>) -> CoordinateResult<Self> {
        if anchors.is_empty() {
            return Err(CoordinateError::EmptyPeakTable);
        }
        for (index, anchor) in anchors.iter().enumerate() {
            if !anchor.is_finite() {
                return Err(CoordinateError::NonFinitePeak { index });
            }
            if index > 0 && *anchor < anchors[index - 1] {
                return Err(CoordinateError::DecreasingPeak { index });
            }
        }
        Ok(Self { anchors })
    }

    pub fn from_slice(anchors: &[f64]) -> CoordinateResult<Self> {
        Self::new(anchors.to_vec())
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    pub fn anchor(&self, base: usize) -> Option<f64> {
        self.anchors.get(base).copied()
    }

    pub fn last(&self) -> f64 {
        self.anchors[self.anchors.len() - 1]
    }

    /// Base nearest to `position`.
    ///
    /// The insertion point brackets the position between two anchors; the
    /// lower base wins strictly left of their midpoint, the upper one
    /// otherwise. At or past the last anchor the last base wins.
    pub fn base_at(&self, position: f64) -> usize {
        let upper = self.anchors.partition_point(|&anchor| anchor < position);
        if upper == self.anchors.len() {
            return upper - 1;
        }
        let lower = upper.saturating_sub(1);
        let midpoint = (self.anchors[upper] - self.anchors[lower]) / 2.0 + self.anchors[lower];
        if position < midpoint {
            lower
        } else {
            upper
        }
    }
}

/// Axis along which the content scrolls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollAxis {
    Vertical,
    Horizontal,
}

/// Which coordinate system is active for the sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum Regime {
    Uniform,
    Peaks(PeakTable),
}

impl Regime {
    /// Picks the regime from the model's trace data. An empty table is invalid.
    pub fn from_peaks(peaks: Option<&[f64]>) -> CoordinateResult<Self> {
        match peaks {
            None => Ok(Regime::Uniform),
            Some(anchors) => Ok(Regime::Peaks(PeakTable::from_slice(anchors)?)),
        }
    }

    pub fn axis(&self) -> ScrollAxis {
        match self {
            Regime::Uniform => ScrollAxis::Vertical,
            Regime::Peaks(_) => ScrollAxis::Horizontal,
        }
    }
}

/// Resolved geometry of one layout generation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geometry {
    pub margin_left: f64,
    pub margin_top: f64,
    pub base_width: f64,
    pub gutter: f64,
    pub bases_per_block: usize,
    pub bases_per_row: usize,
    pub row_height: f64,
}

/// Memoized base -> pixel results, bound to one layout generation.
#[derive(Debug, Default)]
pub struct CoordinateCache {
    generation: u64,
    entries: HashMap<usize, Point>,
}

impl CoordinateCache {
    pub fn new(generation: u64) -> Self {
        Self {
            generation,
            entries: HashMap::new(),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Cached point, only if it was stored for the same generation.
    pub fn get(&self, generation: u64, base: usize) -> Option<Point> {
        if generation != self.generation {
            return None;
        }
        self.entries.get(&base).copied()
    }

    pub fn insert(&mut self, generation: u64, base: usize, point: Point) {
        if generation != self.generation {
            self.invalidate(generation);
        }
        self.entries.insert(base, point);
    }

    /// Drops every entry and rebinds the cache to `generation`.
    pub fn invalidate(&mut self, generation: u64) {
        self.entries.clear();
        self.generation = generation;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Bidirectional base/pixel mapping for one layout generation.
#[derive(Debug)]
pub struct CoordinateMapper {
    generation: u64,
    geometry: Geometry,
    regime: Regime,
    sequence_len: usize,
    cache: RefCell<CoordinateCache>,
}

impl CoordinateMapper {
    pub fn new(generation: u64, geometry: Geometry, regime: Regime, sequence_len: usize) -> Self {
        Self {
            generation,
            geometry,
            regime,
            sequence_len,
            cache: RefCell::new(CoordinateCache::new(generation)),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn regime(&self) -> &Regime {
        &self.regime
    }

    pub fn axis(&self) -> ScrollAxis {
        self.regime.axis()
    }

    pub fn sequence_len(&self) -> usize {
        self.sequence_len
    }

    /// Margin in front of the content along the scroll axis.
    pub fn leading_margin(&self) -> f64 {
        match self.axis() {
            ScrollAxis::Vertical => self.geometry.margin_top,
            ScrollAxis::Horizontal => self.geometry.margin_left,
        }
    }

    pub fn cached_points(&self) -> usize {
        self.cache.borrow().len()
    }

    /// Drops memoized points; they are recomputed on next access.
    pub fn clear_cache(&self) {
        self.cache.borrow_mut().invalidate(self.generation);
    }

    /// Row holding `base` (always 0 in the peak-indexed regime).
    pub fn row_of(&self, base: usize) -> usize {
        match self.regime {
            Regime::Uniform => base / self.geometry.bases_per_row.max(1),
            Regime::Peaks(_) => 0,
        }
    }

    /// Top-left pixel of `base`. `base` may equal the sequence length.
    pub fn pixel_from_base(&self, base: usize) -> CoordinateResult<Point> {
        if base > self.sequence_len {
            return Err(CoordinateError::BaseOutOfRange {
                base,
                len: self.sequence_len,
            });
        }
        if let Some(point) = self.cache.borrow().get(self.generation, base) {
            return Ok(point);
        }
        let point = self.compute_pixel(base);
        self.cache.borrow_mut().insert(self.generation, base, point);
        Ok(point)
    }

    fn compute_pixel(&self, base: usize) -> Point {
        let g = &self.geometry;
        match &self.regime {
            Regime::Uniform => {
                let per_row = g.bases_per_row.max(1);
                let per_block = g.bases_per_block.max(1);
                let row = base / per_row;
                let col = base % per_row;
                let x = g.margin_left + col as f64 * g.base_width + (col / per_block) as f64 * g.gutter;
                let y = g.margin_top + row as f64 * g.row_height;
                Point::new(x, y)
            }
            Regime::Peaks(table) => {
                let x = match table.anchor(base) {
                    Some(anchor) => anchor,
                    None => table.last() + (base + 1 - table.len()) as f64 * g.base_width,
                };
                Point::new(g.margin_left + x, g.margin_top)
            }
        }
    }

    /// Base under a content pixel, clamped to the last base.
    pub fn base_from_pixel(&self, x: f64, y: f64) -> usize {
        let last = self.sequence_len.saturating_sub(1);
        self.raw_base_from_pixel(x, y).min(last)
    }

    /// Caret slot for a content pixel: the boundary nearest to `x`, which
    /// may be the sequence length.
    pub fn caret_from_pixel(&self, x: f64, y: f64) -> usize {
        let base = self.base_from_pixel(x, y);
        if self.sequence_len == 0 {
            return 0;
        }
        let Ok(start) = self.pixel_from_base(base) else {
            return base;
        };
        let same_row = self.row_of(base + 1) == self.row_of(base);
        let width = match (&self.regime, same_row) {
            (Regime::Peaks(_), _) | (Regime::Uniform, true) => self
                .pixel_from_base(base + 1)
                .map(|next| next.x - start.x)
                .unwrap_or(self.geometry.base_width),
            (Regime::Uniform, false) => self.geometry.base_width,
        };
        if x >= start.x + width / 2.0 {
            (base + 1).min(self.sequence_len)
        } else {
            base
        }
    }

    fn raw_base_from_pixel(&self, x: f64, y: f64) -> usize {
        let g = &self.geometry;
        match &self.regime {
            Regime::Uniform => {
                let per_row = g.bases_per_row.max(1);
                let per_block = g.bases_per_block.max(1);
                let row = if g.row_height > 0.0 {
                    ((y - g.margin_top) / g.row_height).floor().max(0.0) as usize
                } else {
                    0
                };
                let local = (x - g.margin_left).max(0.0);
                let block_width = per_block as f64 * g.base_width + g.gutter;
                let block = (local / block_width).floor() as usize;
                let within = local - block as f64 * block_width;
                let in_block = ((within / g.base_width).floor() as usize).min(per_block - 1);
                let col = (block * per_block + in_block).min(per_row - 1);
                row * per_row + col
            }
            Regime::Peaks(table) => table.base_at(x - g.margin_left),
        }
    }

    /// Position of `base` along the scroll axis.
    pub fn axis_position(&self, base: usize) -> CoordinateResult<f64> {
        let point = self.pixel_from_base(base)?;
        Ok(match self.axis() {
            ScrollAxis::Vertical => point.y,
            ScrollAxis::Horizontal => point.x,
        })
    }

    /// Scroll offset that puts `base` at the start of the visible extent.
    pub fn anchor_offset(&self, base: usize) -> CoordinateResult<f64> {
        Ok(self.axis_position(base)? - self.leading_margin())
    }

    /// First base shown when the content is scrolled to `offset`.
    pub fn first_visible_base(&self, offset: f64) -> usize {
        let position = offset.max(0.0) + self.leading_margin();
        match self.axis() {
            ScrollAxis::Vertical => self.row_range_at(position).0,
            ScrollAxis::Horizontal => self.base_from_pixel(position, self.geometry.margin_top),
        }
    }

    /// Inclusive base range of the row under a content `y` (uniform regime).
    pub fn row_range_at(&self, y: f64) -> (usize, usize) {
        let per_row = self.geometry.bases_per_row.max(1);
        let row = if self.geometry.row_height > 0.0 {
            ((y - self.geometry.margin_top) / self.geometry.row_height)
                .floor()
                .max(0.0) as usize
        } else {
            0
        };
        let start = row * per_row;
        let end = (start + per_row - 1).min(self.sequence_len.saturating_sub(1));
        (start, end.max(start))
    }

    /// Inclusive base range covering the content span `[from, to)` along x
    /// (peak-indexed regime), padded by one base on each side.
    pub fn bases_in_span(&self, from: f64, to: f64) -> (usize, usize) {
        let last = self.sequence_len.saturating_sub(1);
        let first = self
            .base_from_pixel(from, self.geometry.margin_top)
            .saturating_sub(1);
        let end = (self.base_from_pixel(to, self.geometry.margin_top) + 1).min(last);
        (first.min(end), end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform(bases_per_row: usize, gutter: f64, len: usize) -> CoordinateMapper {
        CoordinateMapper::new(
            1,
            Geometry {
                margin_left: 20.0,
                margin_top: 20.0,
                base_width: 10.0,
                gutter,
                bases_per_block: 10,
                bases_per_row,
                row_height: 50.0,
            },
            Regime::Uniform,
            len,
        )
    }

    fn peaks(anchors: &[f64], len: usize) -> CoordinateMapper {
        CoordinateMapper::new(
            1,
            Geometry {
                margin_left: 0.0,
                margin_top: 0.0,
                base_width: 10.0,
                gutter: 0.0,
                bases_per_block: 10,
                bases_per_row: 10,
                row_height: 50.0,
            },
            Regime::Peaks(PeakTable::from_slice(anchors).unwrap()),
            len,
        )
    }

    #[test]
    fn test_peak_midpoint_rule() {
        let table = PeakTable::new(vec![0.0, 10.0, 25.0, 42.0]).unwrap();
        // Midpoint of (10, 25) is 17.5
        assert_eq!(table.base_at(17.0), 1);
        assert_eq!(table.base_at(17.5), 2);
        assert_eq!(table.base_at(0.0), 0);
        assert_eq!(table.base_at(-5.0), 0);
        assert_eq!(table.base_at(42.0), 3);
        assert_eq!(table.base_at(100.0), 3);
    }

    #[test]
    fn test_peak_table_validation() {
        assert_eq!(PeakTable::new(vec![]), Err(CoordinateError::EmptyPeakTable));
        assert_eq!(
            PeakTable::new(vec![0.0, 5.0, 3.0]),
            Err(CoordinateError::DecreasingPeak { index: 2 })
        );
        assert_eq!(
            PeakTable::new(vec![0.0, f64::NAN]),
            Err(CoordinateError::NonFinitePeak { index: 1 })
        );
        assert!(PeakTable::new(vec![1.0, 1.0, 2.0]).is_ok());
        assert!(Regime::from_peaks(Some(&[])).is_err());
        assert_eq!(Regime::from_peaks(None).unwrap(), Regime::Uniform);
    }

    #[test]
    fn test_uniform_pixel_from_base() {
        let mapper = uniform(20, 30.0, 100);
        assert_eq!(mapper.pixel_from_base(0).unwrap(), Point::new(20.0, 20.0));
        // Second block starts after one gutter
        assert_eq!(mapper.pixel_from_base(10).unwrap(), Point::new(150.0, 20.0));
        // Wraps onto the next row
        assert_eq!(mapper.pixel_from_base(21).unwrap(), Point::new(30.0, 70.0));
        assert!(mapper.pixel_from_base(100).is_ok());
        assert_eq!(
            mapper.pixel_from_base(101),
            Err(CoordinateError::BaseOutOfRange { base: 101, len: 100 })
        );
    }

    #[test]
    fn test_uniform_round_trip_within_one_base() {
        let mapper = uniform(20, 0.0, 200);
        let mut x = 20.0;
        while x < 220.0 {
            for y in [20.0, 95.0, 260.0] {
                let base = mapper.base_from_pixel(x, y);
                let point = mapper.pixel_from_base(base).unwrap();
                assert!((point.x - x).abs() <= 10.0, "x={x} base={base}");
            }
            x += 3.5;
        }
    }

    #[test]
    fn test_uniform_base_from_pixel_rows_and_gutters() {
        let mapper = uniform(20, 30.0, 100);
        assert_eq!(mapper.base_from_pixel(25.0, 25.0), 0);
        assert_eq!(mapper.base_from_pixel(155.0, 25.0), 10);
        // Inside the gutter resolves to the last base of the block
        assert_eq!(mapper.base_from_pixel(125.0, 25.0), 9);
        assert_eq!(mapper.base_from_pixel(25.0, 75.0), 20);
        // Past the end clamps to the last base
        assert_eq!(mapper.base_from_pixel(25.0, 10_000.0), 99);
    }

    #[test]
    fn test_caret_from_pixel_rounds_to_nearest_boundary() {
        let mapper = uniform(20, 0.0, 100);
        assert_eq!(mapper.caret_from_pixel(22.0, 25.0), 0);
        assert_eq!(mapper.caret_from_pixel(27.0, 25.0), 1);
        assert_eq!(mapper.caret_from_pixel(10_000.0, 10_000.0), 100);
    }

    #[test]
    fn test_peak_regime_pixels() {
        let mapper = peaks(&[5.0, 15.0, 30.0, 42.0], 4);
        assert_eq!(mapper.axis(), ScrollAxis::Horizontal);
        assert_eq!(mapper.pixel_from_base(2).unwrap().x, 30.0);
        // After the last base
        assert_eq!(mapper.pixel_from_base(4).unwrap().x, 52.0);
        assert_eq!(mapper.base_from_pixel(17.0, 0.0), 1);
        assert_eq!(mapper.base_from_pixel(24.0, 0.0), 2);
        assert_eq!(mapper.first_visible_base(29.0), 2);
    }

    #[test]
    fn test_cache_is_bound_to_generation() {
        let mut cache = CoordinateCache::new(1);
        cache.insert(1, 5, Point::new(1.0, 2.0));
        assert_eq!(cache.get(1, 5), Some(Point::new(1.0, 2.0)));
        assert_eq!(cache.get(2, 5), None);

        cache.insert(2, 6, Point::new(3.0, 4.0));
        assert_eq!(cache.generation(), 2);
        assert_eq!(cache.get(2, 5), None);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_mapper_memoizes_and_clears() {
        let mapper = uniform(20, 0.0, 100);
        mapper.pixel_from_base(3).unwrap();
        mapper.pixel_from_base(3).unwrap();
        mapper.pixel_from_base(4).unwrap();
        assert_eq!(mapper.cached_points(), 2);
        mapper.clear_cache();
        assert_eq!(mapper.cached_points(), 0);
    }

    #[test]
    fn test_anchor_offset_and_first_visible_base() {
        let mapper = uniform(20, 0.0, 1000);
        assert_eq!(mapper.anchor_offset(0).unwrap(), 0.0);
        assert_eq!(mapper.anchor_offset(45).unwrap(), 100.0);
        assert_eq!(mapper.first_visible_base(100.0), 40);
        assert_eq!(mapper.first_visible_base(120.0), 40);
        assert_eq!(mapper.row_range_at(20.0 + 50.0 * 49.0), (980, 999));
    }

    #[test]
    fn test_bases_in_span() {
        let mapper = peaks(&[0.0, 10.0, 20.0, 30.0, 40.0, 50.0], 6);
        assert_eq!(mapper.bases_in_span(12.0, 28.0), (0, 4));
        assert_eq!(mapper.bases_in_span(0.0, 100.0), (0, 5));
    }
}
