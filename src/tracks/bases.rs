//! Sequence text tracks: forward strand, complement strand and translation.

use std::collections::HashMap;

use ratatui::style::Color;

use super::{BaseRange, DrawContext, Track, TrackKind, TrackResult};
use crate::coords::Point;
use crate::genetic_code::{codon_slot, three_letter, GeneticCode};
use crate::model::{complement, SequenceModel, SETTING_AA, SETTING_AA_OFFSET};
use crate::surface::{Paint, Surface};

/// Background painted behind selected bases.
pub const SELECTION_COLOR: Color = Color::Cyan;

/// Color scheme for sequence symbols.
pub trait ColorScheme {
    fn get_color(&self, c: char) -> Color;
}

/// DNA nucleotide color scheme.
pub struct DnaColorScheme;

impl ColorScheme for DnaColorScheme {
    fn get_color(&self, c: char) -> Color {
        match c.to_ascii_uppercase() {
            'A' => Color::Red,
            'C' => Color::Green,
            'G' => Color::Yellow,
            'T' => Color::Blue,
            _ => Color::DarkGray,
        }
    }
}

/// Amino acids grouped by physicochemical property.
pub struct AminoAcidColorScheme;

impl ColorScheme for AminoAcidColorScheme {
    fn get_color(&self, c: char) -> Color {
        match c.to_ascii_uppercase() {
            // Hydrophobic
            'A' | 'V' | 'I' | 'L' | 'M' | 'F' | 'W' | 'P' => Color::Yellow,
            // Polar
            'S' | 'T' | 'N' | 'Q' | 'C' | 'G' | 'Y' => Color::Green,
            // Charged positive
            'K' | 'R' | 'H' => Color::Blue,
            // Charged negative
            'D' | 'E' => Color::Red,
            '-' | 'X' | '*' => Color::DarkGray,
            _ => Color::Gray,
        }
    }
}

enum Strand {
    Forward,
    Complement,
    Translation {
        code: GeneticCode,
        /// Amino acid per codon start, for the current layout.
        codons: HashMap<usize, char>,
    },
}

pub struct BasesTrack {
    strand: Strand,
    height: f64,
    show_selection: bool,
}

impl BasesTrack {
    pub fn forward(height: f64, show_selection: bool) -> Self {
        Self {
            strand: Strand::Forward,
            height,
            show_selection,
        }
    }

    pub fn complements(height: f64, show_selection: bool) -> Self {
        Self {
            strand: Strand::Complement,
            height,
            show_selection,
        }
    }

    pub fn translation(height: f64) -> Self {
        Self {
            strand: Strand::Translation {
                code: GeneticCode::standard(),
                codons: HashMap::new(),
            },
            height,
            show_selection: false,
        }
    }

    fn draw_strand(
        &self,
        surface: &mut dyn Surface,
        ctx: &DrawContext,
        y: f64,
        range: BaseRange,
        complemented: bool,
    ) {
        let scheme = DnaColorScheme;
        let width = ctx.base_width();
        for base in range.iter() {
            let Some(symbol) = ctx.model.base_at(base) else {
                break;
            };
            let symbol = if complemented { complement(symbol) } else { symbol };
            let x = ctx.base_x(base);
            if self.show_selection && ctx.is_selected(base) {
                surface.fill_rect(x, y, width, self.height, SELECTION_COLOR);
            }
            surface.glyph(x, y, symbol, Paint::fg(scheme.get_color(symbol)));
        }
    }
}

fn translate_at(
    code: &GeneticCode,
    codons: &mut HashMap<usize, char>,
    model: &dyn SequenceModel,
    codon_start: usize,
) -> Option<char> {
    if let Some(aa) = codons.get(&codon_start) {
        return Some(*aa);
    }
    if codon_start + 3 > model.len() {
        return None;
    }
    let aa = code.translate_codon(&model.subsequence(codon_start..codon_start + 3));
    codons.insert(codon_start, aa);
    Some(aa)
}

impl Track for BasesTrack {
    fn kind(&self) -> TrackKind {
        match self.strand {
            Strand::Forward => TrackKind::Bases,
            Strand::Complement => TrackKind::Complements,
            Strand::Translation { .. } => TrackKind::Translation,
        }
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
        if !matches!(self.strand, Strand::Translation { .. }) {
            let complemented = matches!(self.strand, Strand::Complement);
            self.draw_strand(surface, ctx, origin.y, range, complemented);
            return Ok(());
        }
        let Strand::Translation { code, codons } = &mut self.strand else {
            return Ok(());
        };
        let long = ctx
            .model
            .setting(SETTING_AA)
            .is_some_and(|v| v.as_str() == Some("long"));
        let frame_offset = ctx
            .model
            .setting(SETTING_AA_OFFSET)
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0)
            .max(0.0) as usize;
        let scheme = AminoAcidColorScheme;
        for base in range.iter() {
            let Some((codon_start, position)) = codon_slot(base, frame_offset) else {
                continue;
            };
            let Some(aa) = translate_at(code, codons, ctx.model, codon_start) else {
                continue;
            };
            let symbol = if long {
                three_letter(aa).chars().nth(position).unwrap_or(' ')
            } else if position == 1 {
                aa
            } else {
                continue;
            };
            surface.glyph(ctx.base_x(base), origin.y, symbol, Paint::fg(scheme.get_color(aa)));
        }
        Ok(())
    }

    fn clear_cache(&mut self) {
        if let Strand::Translation { codons, .. } = &mut self.strand {
            codons.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caret::Selection;
    use crate::model::{Sequence, SettingValue};
    use crate::surface::CellBuffer;
    use crate::test_utils::{draw_context, uniform_mapper};

    fn render(track: &mut BasesTrack, seq: &Sequence, selection: Option<Selection>) -> CellBuffer {
        let mapper = uniform_mapper(seq.len(), 12, 12, 0.0);
        let mut ctx = draw_context(seq, &mapper);
        ctx.selection = selection;
        let mut surface = CellBuffer::new(12, 1);
        let range = BaseRange::new(0, seq.len() - 1);
        track
            .draw(&mut surface, &ctx, Point::new(0.0, 0.0), range)
            .unwrap();
        surface
    }

    #[test]
    fn test_color_schemes() {
        assert_eq!(DnaColorScheme.get_color('a'), Color::Red);
        assert_eq!(DnaColorScheme.get_color('N'), Color::DarkGray);
        assert_eq!(AminoAcidColorScheme.get_color('K'), Color::Blue);
    }

    #[test]
    fn test_forward_and_complement() {
        let seq = Sequence::new("s", "ACGTTA");
        let surface = render(&mut BasesTrack::forward(1.0, true), &seq, None);
        assert_eq!(surface.row_text(0).trim_end(), "ACGTTA");
        let surface = render(&mut BasesTrack::complements(1.0, false), &seq, None);
        assert_eq!(surface.row_text(0).trim_end(), "TGCAAT");
    }

    #[test]
    fn test_selection_background() {
        let seq = Sequence::new("s", "ACGTTA");
        let surface = render(
            &mut BasesTrack::forward(1.0, true),
            &seq,
            Some(Selection::new(1, 2)),
        );
        assert_eq!(surface.cell(1, 0).unwrap().paint.bg, SELECTION_COLOR);
        assert_eq!(surface.cell(2, 0).unwrap().paint.bg, SELECTION_COLOR);
        assert_eq!(surface.cell(3, 0).unwrap().paint.bg, Color::Reset);
    }

    #[test]
    fn test_short_translation_centres_residue() {
        let mut seq = Sequence::new("s", "ATGGCCTAAGG");
        seq.set_setting(SETTING_AA, SettingValue::from("short"), true);
        let surface = render(&mut BasesTrack::translation(1.0), &seq, None);
        // Trailing partial codon is not translated
        assert_eq!(surface.row_text(0).trim_end(), " M  A  *");
    }

    #[test]
    fn test_long_translation_with_offset() {
        let mut seq = Sequence::new("s", "CATGGCC");
        seq.set_setting(SETTING_AA, SettingValue::from("long"), true);
        seq.set_setting(SETTING_AA_OFFSET, SettingValue::from(1.0), true);
        let mut track = BasesTrack::translation(1.0);
        let surface = render(&mut track, &seq, None);
        assert_eq!(surface.row_text(0).trim_end(), " MetAla");
        track.clear_cache();
        if let Strand::Translation { codons, .. } = &track.strand {
            assert!(codons.is_empty());
        }
    }
}
