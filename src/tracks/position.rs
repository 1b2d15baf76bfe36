//! Base numbering ruler.
//!
//! A 1-based label is printed above the first base of every block (every
//! block-size bases in the peak-indexed regime).

use ratatui::style::Color;

use super::{BaseRange, DrawContext, Track, TrackKind, TrackResult};
use crate::coords::Point;
use crate::surface::{Paint, Surface};

pub struct PositionTrack {
    height: f64,
}

impl PositionTrack {
    pub fn new(height: f64) -> Self {
        Self { height }
    }
}

impl Track for PositionTrack {
    fn kind(&self) -> TrackKind {
        TrackKind::Position
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
        let per_block = ctx.mapper.geometry().bases_per_block.max(1);
        let paint = Paint::fg(Color::DarkGray);
        for base in range.iter().filter(|b| b % per_block == 0) {
            surface.text(ctx.base_x(base), origin.y, &format_thousands(base + 1), paint);
        }
        Ok(())
    }
}

/// Formats a number with `,` as the thousands separator.
pub fn format_thousands(value: usize) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, digit) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(digit);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::CellBuffer;
    use crate::test_utils::{draw_context, uniform_mapper};
    use crate::model::Sequence;

    #[test]
    fn test_format_thousands() {
        assert_eq!(format_thousands(0), "0");
        assert_eq!(format_thousands(999), "999");
        assert_eq!(format_thousands(1000), "1,000");
        assert_eq!(format_thousands(1234567), "1,234,567");
    }

    #[test]
    fn test_labels_at_block_starts() {
        let seq = Sequence::new("s", "A".repeat(40));
        let mapper = uniform_mapper(40, 20, 5, 1.0);
        let ctx = draw_context(&seq, &mapper);
        let mut surface = CellBuffer::new(30, 1);
        let mut track = PositionTrack::new(1.0);
        track
            .draw(&mut surface, &ctx, Point::new(0.0, 0.0), BaseRange::new(0, 19))
            .unwrap();
        // Blocks of 5 bases separated by a one-cell gutter
        assert_eq!(surface.row_text(0).trim_end(), "1     6     11    16");
    }
}
