//! Empty separator band.

use super::{BaseRange, DrawContext, Track, TrackKind, TrackResult};
use crate::coords::Point;
use crate::surface::Surface;

pub struct BlankTrack {
    height: f64,
}

impl BlankTrack {
    pub fn new(height: f64) -> Self {
        Self { height }
    }
}

impl Track for BlankTrack {
    fn kind(&self) -> TrackKind {
        TrackKind::Blank
    }

    fn height(&self) -> f64 {
        self.height
    }

    fn draw(
        &mut self,
        _surface: &mut dyn Surface,
        _ctx: &DrawContext,
        _origin: Point,
        _range: BaseRange,
    ) -> TrackResult<()> {
        Ok(())
    }
}
