//! Sequencing trace.
//!
//! Each column shows the dominant channel at the matching trace sample as a
//! bar scaled to the strongest sample of the whole trace. In the
//! peak-indexed regime a peak position is also a sample index; in the
//! uniform regime samples are spread evenly over the bases.

use ratatui::style::Color;

use super::{BaseRange, DrawContext, Track, TrackError, TrackKind, TrackResult};
use crate::coords::{Point, Regime};
use crate::model::TraceData;
use crate::surface::{Paint, Surface};

const PEAK_MARK: char = '^';

fn channel_color(base: char) -> Color {
    match base {
        'A' => Color::Green,
        'C' => Color::Blue,
        'G' => Color::Gray,
        'T' => Color::Red,
        _ => Color::DarkGray,
    }
}

pub struct ChromatogramTrack {
    height: f64,
    max_intensity: Option<f64>,
}

impl ChromatogramTrack {
    pub fn new(height: f64) -> Self {
        Self {
            height,
            max_intensity: None,
        }
    }

    fn draw_bar(
        &self,
        surface: &mut dyn Surface,
        trace: &TraceData,
        max: f64,
        sample: usize,
        x: f64,
        bottom: f64,
    ) {
        let Some((base, intensity)) = trace.dominant_at(sample) else {
            return;
        };
        let bar = (intensity / max * self.height).round().clamp(0.0, self.height);
        if bar > 0.0 {
            surface.fill_rect(x, bottom - bar, 1.0, bar, channel_color(base));
        }
    }
}

impl Track for ChromatogramTrack {
    fn kind(&self) -> TrackKind {
        TrackKind::Chromatogram
    }

    fn height(&self) -> f64 {
        self.height
    }

    fn draw(
        &mut self,
        surface: &mut dyn Surface,
        ctx: &DrawContext,
        origin: Point,
        range: BaseRange,
    ) -> TrackResult<()> {
        let bottom = origin.y + self.height;
        let Some(trace) = ctx.model.trace() else {
            // Peaks without channels: mark each peak
            if ctx.model.peaks().is_none() {
                return Err(TrackError::MissingData("trace".to_string()));
            }
            for base in range.iter() {
                surface.glyph(ctx.base_x(base), bottom - 1.0, PEAK_MARK, Paint::fg(Color::DarkGray));
            }
            return Ok(());
        };
        let max = *self
            .max_intensity
            .get_or_insert_with(|| trace.max_intensity());
        if max <= 0.0 {
            return Ok(());
        }
        let geometry = ctx.mapper.geometry();
        let samples = trace.a.len().max(trace.c.len()).max(trace.g.len()).max(trace.t.len());
        let len = ctx.model.len().max(1);
        for base in range.iter() {
            let start = ctx.base_x(base);
            let next_on_row = base < ctx.mapper.sequence_len()
                && ctx.mapper.row_of(base + 1) == ctx.mapper.row_of(base);
            let end = if next_on_row {
                ctx.base_x(base + 1)
            } else {
                start + geometry.base_width
            };
            let columns = (end - start).round().max(1.0) as usize;
            for column in 0..columns {
                let sample = match ctx.mapper.regime() {
                    Regime::Peaks(_) => {
                        let anchor = ctx.mapper.pixel_from_base(base).map(|p| p.x).unwrap_or_default();
                        let content_x = anchor + column as f64 - geometry.margin_left;
                        content_x.max(0.0) as usize
                    }
                    Regime::Uniform => {
                        let position = base as f64 + column as f64 / columns as f64;
                        (position * samples as f64 / len as f64) as usize
                    }
                };
                self.draw_bar(surface, trace, max, sample, start + column as f64, bottom);
            }
        }
        Ok(())
    }

    fn clear_cache(&mut self) {
        self.max_intensity = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Sequence;
    use crate::surface::CellBuffer;
    use crate::test_utils::{draw_context, peak_mapper, uniform_mapper};

    fn trace() -> TraceData {
        TraceData {
            a: vec![4.0, 0.0, 0.0, 0.0],
            c: vec![0.0, 2.0, 0.0, 0.0],
            g: vec![0.0, 0.0, 0.0, 0.0],
            t: vec![0.0, 0.0, 0.0, 1.0],
        }
    }

    #[test]
    fn test_bars_scale_to_strongest_sample() {
        let seq = Sequence::new("s", "ACGT").with_trace(trace());
        let mapper = uniform_mapper(4, 4, 4, 0.0);
        let ctx = draw_context(&seq, &mapper);
        let mut surface = CellBuffer::new(4, 4);
        let mut track = ChromatogramTrack::new(4.0);
        track
            .draw(&mut surface, &ctx, Point::new(0.0, 0.0), BaseRange::new(0, 3))
            .unwrap();
        // Column 0 is full height, column 1 half, column 3 a quarter
        assert_eq!(surface.cell(0, 0).unwrap().paint.bg, channel_color('A'));
        assert_eq!(surface.cell(1, 1).unwrap().paint.bg, Color::Reset);
        assert_eq!(surface.cell(1, 2).unwrap().paint.bg, channel_color('C'));
        assert_eq!(surface.cell(3, 3).unwrap().paint.bg, channel_color('T'));
        assert_eq!(surface.cell(3, 2).unwrap().paint.bg, Color::Reset);
    }

    #[test]
    fn test_peaks_without_channels_are_marked() {
        let seq = Sequence::new("s", "ACG").with_peaks(vec![0.0, 2.0, 4.0]);
        let mapper = peak_mapper(&[0.0, 2.0, 4.0]);
        let ctx = draw_context(&seq, &mapper);
        let mut surface = CellBuffer::new(6, 2);
        let mut track = ChromatogramTrack::new(2.0);
        track
            .draw(&mut surface, &ctx, Point::new(0.0, 0.0), BaseRange::new(0, 2))
            .unwrap();
        assert_eq!(surface.row_text(1), "^ ^ ^ ");
    }

    #[test]
    fn test_missing_trace_is_an_error() {
        let seq = Sequence::new("s", "ACG");
        let mapper = uniform_mapper(3, 3, 3, 0.0);
        let ctx = draw_context(&seq, &mapper);
        let mut surface = CellBuffer::new(3, 2);
        let result = ChromatogramTrack::new(2.0).draw(
            &mut surface,
            &ctx,
            Point::new(0.0, 0.0),
            BaseRange::new(0, 2),
        );
        assert!(matches!(result, Err(TrackError::MissingData(_))));
    }
}
