//! Restriction enzyme annotations.
//!
//! Labels are stacked above the bases (one lane per label that would
//! otherwise overlap on the same row); cut sites are a floating overlay that
//! tints the cut column across the whole row.

use ratatui::style::Color;

use super::{BaseRange, DrawContext, LayoutContext, Track, TrackKind, TrackResult};
use crate::coords::Point;
use crate::model::{RestrictionSite, SequenceModel};
use crate::surface::{Paint, Surface};

const LABEL_COLOR: Color = Color::Magenta;
const CUT_COLOR: Color = Color::Magenta;

/// Lane per site; labels never share a lane across a row break and a lane
/// is reused once the previous label (plus one base of spacing) has ended.
pub fn assign_label_lanes(sites: &[RestrictionSite], bases_per_row: usize) -> Vec<usize> {
    let per_row = bases_per_row.max(1);
    let mut order: Vec<usize> = (0..sites.len()).collect();
    order.sort_by_key(|&i| sites[i].position);
    let mut lanes = vec![0; sites.len()];
    let mut lane_ends: Vec<usize> = Vec::new();
    let mut current_row = None;
    for i in order {
        let site = &sites[i];
        let row = site.position / per_row;
        if current_row != Some(row) {
            lane_ends.clear();
            current_row = Some(row);
        }
        let end = site.position + site.enzyme.chars().count();
        let lane = match lane_ends.iter().position(|&e| e < site.position) {
            Some(lane) => lane,
            None => {
                lane_ends.push(0);
                lane_ends.len() - 1
            }
        };
        lane_ends[lane] = end;
        lanes[i] = lane;
    }
    lanes
}

pub struct RestrictionLabelsTrack {
    unit_height: f64,
    labels: Option<Vec<(RestrictionSite, usize)>>,
    bases_per_row: usize,
}

impl RestrictionLabelsTrack {
    pub fn new(unit_height: f64) -> Self {
        Self {
            unit_height,
            labels: None,
            bases_per_row: usize::MAX,
        }
    }

    fn stack(&mut self, model: &dyn SequenceModel) -> &[(RestrictionSite, usize)] {
        let bases_per_row = self.bases_per_row;
        self.labels.get_or_insert_with(|| {
            if model.is_empty() {
                return Vec::new();
            }
            let sites = model.restriction_sites_in(0..=model.len() - 1);
            let lanes = assign_label_lanes(&sites, bases_per_row);
            sites.into_iter().zip(lanes).collect()
        })
    }
}

impl Track for RestrictionLabelsTrack {
    fn kind(&self) -> TrackKind {
        TrackKind::RestrictionLabels
    }

    fn height(&self) -> f64 {
        let lanes = self
            .labels
            .as_ref()
            .and_then(|labels| labels.iter().map(|(_, lane)| lane + 1).max())
            .unwrap_or(0);
        lanes as f64 * self.unit_height
    }

    fn calculate_height(&mut self, ctx: &LayoutContext) {
        self.bases_per_row = ctx.bases_per_row;
        self.labels = None;
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
        for (site, lane) in self.stack(ctx.model) {
            if !range.contains(site.position) {
                continue;
            }
            let y = origin.y + *lane as f64 * unit;
            surface.text(ctx.base_x(site.position), y, &site.enzyme, Paint::fg(LABEL_COLOR));
        }
        Ok(())
    }

    fn clear_cache(&mut self) {
        self.labels = None;
    }
}

/// Floating cut-site markers.
pub struct RestrictionSitesTrack {
    origin: f64,
}

impl RestrictionSitesTrack {
    pub fn new(origin: f64) -> Self {
        Self { origin }
    }
}

impl Track for RestrictionSitesTrack {
    fn kind(&self) -> TrackKind {
        TrackKind::RestrictionSites
    }

    fn height(&self) -> f64 {
        0.0
    }

    fn floating(&self) -> bool {
        true
    }

    fn floating_origin(&self) -> f64 {
        self.origin
    }

    fn draw(
        &mut self,
        surface: &mut dyn Surface,
        ctx: &DrawContext,
        origin: Point,
        range: BaseRange,
    ) -> TrackResult<()> {
        if ctx.model.is_empty() {
            return Ok(());
        }
        let last = ctx.model.len() - 1;
        let height = (ctx.row_height - self.origin).max(0.0);
        for site in ctx.model.restriction_sites_in(0..=range.end.min(last)) {
            let cut = site.position + site.cut;
            if !range.contains(cut) {
                continue;
            }
            surface.fill_rect(ctx.base_x(cut), origin.y, 1.0, height, CUT_COLOR);
        }
        Ok(())
    }
}
