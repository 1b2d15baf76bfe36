//! Annotated spans, stacked in lanes so overlapping features never collide.

use ratatui::style::Color;

use super::{BaseRange, DrawContext, LayoutContext, Track, TrackKind, TrackResult};
use crate::coords::Point;
use crate::model::{Feature, SequenceModel};
use crate::surface::{Paint, Surface};

const PALETTE: [Color; 6] = [
    Color::LightBlue,
    Color::LightGreen,
    Color::LightMagenta,
    Color::LightYellow,
    Color::LightCyan,
    Color::LightRed,
];

/// Stable color for a feature type.
pub fn feature_color(kind: &str) -> Color {
    let hash = kind
        .bytes()
        .fold(0usize, |acc, b| acc.wrapping_mul(31).wrapping_add(b as usize));
    PALETTE[hash % PALETTE.len()]
}

/// Greedy lane assignment: each feature takes the first lane that is free
/// at its start. Returns the lane of every feature, in input order.
pub fn assign_lanes(features: &[Feature]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..features.len()).collect();
    order.sort_by_key(|&i| (features[i].start, features[i].end));
    let mut lane_ends: Vec<usize> = Vec::new();
    let mut lanes = vec![0; features.len()];
    for i in order {
        let feature = &features[i];
        let lane = match lane_ends.iter().position(|&end| end < feature.start) {
            Some(lane) => lane,
            None => {
                lane_ends.push(0);
                lane_ends.len() - 1
            }
        };
        lane_ends[lane] = feature.end;
        lanes[i] = lane;
    }
    lanes
}

pub struct FeaturesTrack {
    unit_height: f64,
    lanes: Option<Vec<(Feature, usize)>>,
}

impl FeaturesTrack {
    pub fn new(unit_height: f64) -> Self {
        Self {
            unit_height,
            lanes: None,
        }
    }

    fn stack(&mut self, model: &dyn SequenceModel) -> &[(Feature, usize)] {
        self.lanes.get_or_insert_with(|| {
            if model.is_empty() {
                return Vec::new();
            }
            let features = model.features_in(0..=model.len() - 1);
            let lanes = assign_lanes(&features);
            features.into_iter().zip(lanes).collect()
        })
    }

    fn lane_count(&self) -> usize {
        self.lanes
            .as_ref()
            .and_then(|stack| stack.iter().map(|(_, lane)| lane + 1).max())
            .unwrap_or(0)
    }
}

impl Track for FeaturesTrack {
    fn kind(&self) -> TrackKind {
        TrackKind::Features
    }

    fn height(&self) -> f64 {
        self.lane_count() as f64 * self.unit_height
    }

    fn calculate_height(&mut self, ctx: &LayoutContext) {
        self.lanes = None;
        self.stack(ctx.model);
    }

    fn draw(
        &mut self,
        surface: &mut dyn Surface,
        ctx: &DrawContext,
        origin: Point,
        range: BaseRange,
    ) -> TrackResult<()> {
        let unit = self.unit_height;
        let base_width = ctx.base_width();
        for (feature, lane) in self.stack(ctx.model) {
            if !range.overlaps(feature.start, feature.end) {
                continue;
            }
            let from = feature.start.max(range.start);
            let to = feature.end.min(range.end);
            let y = origin.y + *lane as f64 * unit;
            let color = feature_color(&feature.kind);
            // Spans crossing a gutter are painted base by base
            for base in from..=to {
                surface.fill_rect(ctx.base_x(base), y, base_width, unit, color);
            }
            let label_at = if feature.start >= range.start { feature.start } else { from };
            let room = ((to + 1 - label_at) as f64 * base_width).floor().max(0.0) as usize;
            let label: String = feature.name.chars().take(room).collect();
            surface.text(ctx.base_x(label_at), y, &label, Paint::fg(Color::Black));
        }
        Ok(())
    }

    fn clear_cache(&mut self) {
        self.lanes = None;
    }
}
