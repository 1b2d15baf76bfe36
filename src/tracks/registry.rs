//! Ordered track set with memoized visibility and stacked layout.

use std::collections::HashMap;

use tracing::trace;

use super::{
    build_track, BaseRange, DrawContext, LayoutContext, Track, TrackError, TrackResult, TrackSpec,
    VisibilityRule,
};
use crate::coords::Point;
use crate::model::SequenceModel;
use crate::surface::Surface;

struct TrackEntry {
    name: String,
    visibility: VisibilityRule,
    track: Box<dyn Track>,
}

/// Where a visible track sits inside a row, for one layout generation.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackPlacement {
    pub index: usize,
    pub name: String,
    /// Offset from the row top.
    pub top: f64,
    pub height: f64,
    pub floating: bool,
}

/// Tracks in registration order. Order is fixed once registered.
#[derive(Default)]
pub struct TrackRegistry {
    entries: Vec<TrackEntry>,
    visible: HashMap<usize, bool>,
    evaluations: usize,
}

impl TrackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_specs(specs: &[TrackSpec]) -> TrackResult<Self> {
        let mut registry = Self::new();
        for spec in specs {
            registry.register(&spec.name, spec.options.visible.clone(), build_track(spec))?;
        }
        Ok(registry)
    }

    pub fn register(
        &mut self,
        name: &str,
        visibility: VisibilityRule,
        track: Box<dyn Track>,
    ) -> TrackResult<()> {
        if self.index_of(name).is_some() {
            return Err(TrackError::Duplicate(name.to_string()));
        }
        self.entries.push(TrackEntry {
            name: name.to_string(),
            visibility,
            track,
        });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.name == name)
    }

    /// Memoized visibility of the track at `index`.
    pub fn is_visible(&mut self, index: usize, model: &dyn SequenceModel) -> bool {
        if let Some(visible) = self.visible.get(&index) {
            return *visible;
        }
        let Some(entry) = self.entries.get(index) else {
            return false;
        };
        let visible = entry.visibility.evaluate(model);
        self.evaluations += 1;
        self.visible.insert(index, visible);
        visible
    }

    /// How many times a visibility rule was actually evaluated.
    pub fn evaluations(&self) -> usize {
        self.evaluations
    }

    /// Forgets memoized visibility of every track depending on `topic`.
    /// Returns true if any track was affected.
    pub fn invalidate_topic(&mut self, topic: &str) -> bool {
        let mut affected = false;
        for (index, entry) in self.entries.iter().enumerate() {
            if entry.visibility.depends_on(topic) && self.visible.remove(&index).is_some() {
                trace!(track = %entry.name, topic, "visibility invalidated");
                affected = true;
            }
        }
        affected
    }

    pub fn invalidate_all(&mut self) {
        self.visible.clear();
    }

    /// Clears every track's internal caches.
    pub fn clear_caches(&mut self) {
        for entry in &mut self.entries {
            entry.track.clear_cache();
        }
    }

    /// Stacks visible, non-floating tracks top to bottom and returns their
    /// placements together with the resulting row height. Floating tracks
    /// are placed at their own origin and add no height.
    pub fn layout(&mut self, ctx: &LayoutContext) -> (Vec<TrackPlacement>, f64) {
        let mut placements = Vec::new();
        let mut running = 0.0;
        for index in 0..self.entries.len() {
            if !self.is_visible(index, ctx.model) {
                continue;
            }
            let entry = &mut self.entries[index];
            entry.track.clear_cache();
            entry.track.calculate_height(ctx);
            let floating = entry.track.floating();
            let height = entry.track.height();
            let top = if floating {
                entry.track.floating_origin()
            } else {
                let top = running;
                running += height;
                top
            };
            placements.push(TrackPlacement {
                index,
                name: entry.name.clone(),
                top,
                height,
                floating,
            });
        }
        (placements, running)
    }

    /// Draws one row of tracks. A failing track does not stop the others;
    /// failures are returned with the track name.
    pub fn draw_row(
        &mut self,
        surface: &mut dyn Surface,
        ctx: &DrawContext,
        placements: &[TrackPlacement],
        row_origin: Point,
        range: BaseRange,
    ) -> Vec<(String, TrackError)> {
        let mut failures = Vec::new();
        for placement in placements {
            let Some(entry) = self.entries.get_mut(placement.index) else {
                continue;
            };
            let origin = Point::new(row_origin.x, row_origin.y + placement.top);
            if let Err(err) = entry.track.draw(surface, ctx, origin, range) {
                failures.push((entry.name.clone(), err));
            }
        }
        failures
    }
}
