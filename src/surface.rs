//! Drawing surface boundary.
//!
//! Tracks paint through [`Surface`]; the viewport owns the surface
//! exclusively. [`CellBuffer`] is a grid-of-cells implementation where one
//! cell is one pixel, which the terminal host blits straight to the screen.

use ratatui::style::Color;

/// Foreground/background pair used by every drawing call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paint {
    pub fg: Color,
    /// `Color::Reset` keeps whatever background is already painted.
    pub bg: Color,
    pub bold: bool,
}

impl Default for Paint {
    fn default() -> Self {
        Self {
            fg: Color::Reset,
            bg: Color::Reset,
            bold: false,
        }
    }
}

impl Paint {
    pub fn fg(color: Color) -> Self {
        Self {
            fg: color,
            ..Self::default()
        }
    }

    pub fn on(mut self, bg: Color) -> Self {
        self.bg = bg;
        self
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub symbol: char,
    pub paint: Paint,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            symbol: ' ',
            paint: Paint::default(),
        }
    }
}

/// Minimal set of drawing primitives the rendering core relies on.
pub trait Surface {
    fn width(&self) -> f64;

    fn height(&self) -> f64;

    /// Resizes the surface; previous content is discarded.
    fn set_dimensions(&mut self, width: f64, height: f64);

    fn clear(&mut self);

    fn clear_rect(&mut self, x: f64, y: f64, width: f64, height: f64);

    /// Moves painted content by `(dx, dy)`; uncovered area is cleared.
    fn shift(&mut self, dx: f64, dy: f64);

    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64, color: Color);

    fn text(&mut self, x: f64, y: f64, text: &str, paint: Paint);

    fn glyph(&mut self, x: f64, y: f64, symbol: char, paint: Paint) {
        let mut buf = [0u8; 4];
        self.text(x, y, symbol.encode_utf8(&mut buf), paint);
    }
}

/// A grid of cells; one cell per pixel.
#[derive(Debug, Clone, Default)]
pub struct CellBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl CellBuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![Cell::default(); width * height],
        }
    }

    pub fn columns(&self) -> usize {
        self.width
    }

    pub fn rows(&self) -> usize {
        self.height
    }

    pub fn cell(&self, x: usize, y: usize) -> Option<&Cell> {
        if x < self.width && y < self.height {
            self.cells.get(y * self.width + x)
        } else {
            None
        }
    }

    /// Symbols of one row, trailing blanks included.
    pub fn row_text(&self, y: usize) -> String {
        if y >= self.height {
            return String::new();
        }
        self.cells[y * self.width..(y + 1) * self.width]
            .iter()
            .map(|c| c.symbol)
            .collect()
    }

    /// Integer cell span covered by `[start, start + len)`, clipped to `limit`.
    fn span(start: f64, len: f64, limit: usize) -> (usize, usize) {
        let from = start.floor().max(0.0);
        let to = (start + len).ceil().min(limit as f64);
        if to <= from {
            return (0, 0);
        }
        (from as usize, to as usize)
    }

    fn cell_mut(&mut self, x: usize, y: usize) -> &mut Cell {
        &mut self.cells[y * self.width + x]
    }
}

impl Surface for CellBuffer {
    fn width(&self) -> f64 {
        self.width as f64
    }

    fn height(&self) -> f64 {
        self.height as f64
    }

    fn set_dimensions(&mut self, width: f64, height: f64) {
        let width = width.max(0.0).floor() as usize;
        let height = height.max(0.0).floor() as usize;
        if width != self.width || height != self.height {
            *self = CellBuffer::new(width, height);
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::default());
    }

    fn clear_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        let (x0, x1) = Self::span(x, width, self.width);
        let (y0, y1) = Self::span(y, height, self.height);
        for row in y0..y1 {
            for col in x0..x1 {
                *self.cell_mut(col, row) = Cell::default();
            }
        }
    }

    fn shift(&mut self, dx: f64, dy: f64) {
        let dx = dx.round() as isize;
        let dy = dy.round() as isize;
        if dx == 0 && dy == 0 {
            return;
        }
        let mut shifted = vec![Cell::default(); self.cells.len()];
        for row in 0..self.height as isize {
            let src_row = row - dy;
            if src_row < 0 || src_row >= self.height as isize {
                continue;
            }
            for col in 0..self.width as isize {
                let src_col = col - dx;
                if src_col < 0 || src_col >= self.width as isize {
                    continue;
                }
                shifted[row as usize * self.width + col as usize] =
                    self.cells[src_row as usize * self.width + src_col as usize];
            }
        }
        self.cells = shifted;
    }

    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64, color: Color) {
        let (x0, x1) = Self::span(x, width, self.width);
        let (y0, y1) = Self::span(y, height, self.height);
        for row in y0..y1 {
            for col in x0..x1 {
                self.cell_mut(col, row).paint.bg = color;
            }
        }
    }

    fn text(&mut self, x: f64, y: f64, text: &str, paint: Paint) {
        let row = y.floor();
        if row < 0.0 || row >= self.height as f64 {
            return;
        }
        let row = row as usize;
        let start = x.floor() as isize;
        for (i, symbol) in text.chars().enumerate() {
            let col = start + i as isize;
            if col < 0 {
                continue;
            }
            if col as usize >= self.width {
                break;
            }
            let cell = self.cell_mut(col as usize, row);
            let bg = if paint.bg == Color::Reset {
                cell.paint.bg
            } else {
                paint.bg
            };
            *cell = Cell {
                symbol,
                paint: Paint { bg, ..paint },
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_is_clipped() {
        let mut buf = CellBuffer::new(5, 2);
        buf.text(3.0, 0.0, "ACGT", Paint::default());
        buf.text(-2.0, 1.0, "ACGT", Paint::default());
        buf.text(0.0, 5.0, "ACGT", Paint::default());
        assert_eq!(buf.row_text(0), "   AC");
        assert_eq!(buf.row_text(1), "GT   ");
    }

    #[test]
    fn test_text_keeps_highlight_background() {
        let mut buf = CellBuffer::new(4, 1);
        buf.fill_rect(0.0, 0.0, 2.0, 1.0, Color::Yellow);
        buf.text(0.0, 0.0, "AC", Paint::fg(Color::Black));
        assert_eq!(buf.cell(0, 0).unwrap().paint.bg, Color::Yellow);
        buf.text(1.0, 0.0, "G", Paint::fg(Color::Black).on(Color::Blue));
        assert_eq!(buf.cell(1, 0).unwrap().paint.bg, Color::Blue);
    }

    #[test]
    fn test_shift_moves_content_and_clears_exposed() {
        let mut buf = CellBuffer::new(4, 3);
        for row in 0..3 {
            buf.text(0.0, row as f64, &format!("{row}{row}{row}{row}"), Paint::default());
        }
        buf.shift(0.0, -1.0);
        assert_eq!(buf.row_text(0), "1111");
        assert_eq!(buf.row_text(1), "2222");
        assert_eq!(buf.row_text(2), "    ");

        buf.shift(2.0, 0.0);
        assert_eq!(buf.row_text(0), "  11");
    }

    #[test]
    fn test_clear_rect_and_resize() {
        let mut buf = CellBuffer::new(4, 2);
        buf.text(0.0, 0.0, "ACGT", Paint::default());
        buf.clear_rect(1.0, 0.0, 2.0, 1.0);
        assert_eq!(buf.row_text(0), "A  T");

        buf.set_dimensions(6.0, 1.0);
        assert_eq!(buf.columns(), 6);
        assert_eq!(buf.row_text(0), "      ");
    }
}
