//! TUI rendering module.
//!
//! The canvas is painted by the viewport into a [`CellBuffer`]; this module
//! only copies it to the terminal and adds what lives outside the canvas:
//! - caret overlay
//! - scrollbar
//! - status bar with mode, caret info and messages
//! - help popup

pub mod glyphs;

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::controller::TerminalHost;
use crate::coords::ScrollAxis;
use crate::event::{HostState, InputMode};
use crate::surface::{CellBuffer, Paint};
use crate::viewport::{CaretDisplay, Viewport};
use glyphs::Glyphs;

/// Height of the status bar.
pub const STATUS_BAR_HEIGHT: u16 = 1;

const HELP_WIDTH: u16 = 60;

const HELP_TEXT: &[&str] = &[
    "Arrows or h/j/k/l move the caret by one base or one row. Shift+arrows extend the selection.",
    "Home/End jump to the start or end of the row, PageUp/PageDown scroll one screen, the mouse wheel scrolls three rows.",
    "Click places the caret, drag selects, shift+click extends. Ctrl+A selects everything, Esc deselects.",
    "Type a, c, g or t to insert bases; Backspace and Delete remove bases or the selection.",
    ":<number> goes to a base. :toggle separators|numbering|enzymes|complements|features|gutters shows or hides a row.",
    ":aa none|short|long sets the translation row, :frame 0|1|2 its reading frame. :hl <from> <to> highlights bases, :hl clears.",
    ":w saves, :q quits. Press any key to close this help.",
];

/// Renders the complete UI.
pub fn render(
    frame: &mut Frame,
    viewport: &Viewport<CellBuffer, TerminalHost>,
    state: &HostState,
    glyphs: &Glyphs,
    title: &str,
) {
    let area = frame.area();
    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(STATUS_BAR_HEIGHT)])
        .split(area);
    let canvas_area = main_layout[0];
    let status_area = main_layout[1];

    let mut lines = canvas_lines(viewport.surface(), viewport.caret_display(), glyphs);
    draw_scrollbar(&mut lines, viewport, glyphs, canvas_area);
    frame.render_widget(Paragraph::new(lines), canvas_area);

    render_status_bar(frame, viewport, state, glyphs, title, status_area);
    if state.show_help {
        render_help(frame, area);
    }
}

fn style_of(paint: Paint) -> Style {
    let style = Style::default().fg(paint.fg).bg(paint.bg);
    if paint.bold {
        style.add_modifier(Modifier::BOLD)
    } else {
        style
    }
}

/// Copies the surface into styled lines, with the caret overlaid.
pub fn canvas_lines(
    surface: &CellBuffer,
    caret: Option<CaretDisplay>,
    glyphs: &Glyphs,
) -> Vec<Line<'static>> {
    let caret_cells = caret.map(|c| {
        let x = c.x.floor().max(0.0) as usize;
        let top = c.y.floor().max(0.0) as usize;
        let bottom = (c.y + c.height).ceil().max(0.0) as usize;
        (x, top..bottom)
    });

    (0..surface.rows())
        .map(|y| {
            let spans: Vec<Span> = (0..surface.columns())
                .filter_map(|x| surface.cell(x, y))
                .enumerate()
                .map(|(x, cell)| {
                    let mut style = style_of(cell.paint);
                    let mut symbol = cell.symbol;
                    if let Some((caret_x, rows)) = &caret_cells {
                        if *caret_x == x && rows.contains(&y) {
                            if symbol == ' ' {
                                symbol = glyphs.caret;
                            } else {
                                style = style.add_modifier(Modifier::REVERSED);
                            }
                        }
                    }
                    Span::styled(symbol.to_string(), style)
                })
                .collect();
            Line::from(spans)
        })
        .collect()
}

/// Thumb `(start, length)` along a track of `track_len` cells.
pub fn scrollbar_thumb(
    extent: f64,
    visible: f64,
    position: f64,
    track_len: usize,
) -> Option<(usize, usize)> {
    if track_len == 0 || extent <= visible || extent <= 0.0 {
        return None;
    }
    let track = track_len as f64;
    let length = ((visible / extent) * track).round().clamp(1.0, track);
    let start = ((position / extent) * track).round().clamp(0.0, track - length);
    Some((start as usize, length as usize))
}

/// Overlays the scrollbar on the last column (vertical) or row (horizontal).
fn draw_scrollbar(
    lines: &mut [Line<'static>],
    viewport: &Viewport<CellBuffer, TerminalHost>,
    glyphs: &Glyphs,
    area: Rect,
) {
    let scroll = viewport.host().scroll();
    let Some(axis) = scroll.axis else {
        return;
    };
    let (track_len, visible) = match axis {
        ScrollAxis::Vertical => (lines.len(), f64::from(area.height)),
        ScrollAxis::Horizontal => (usize::from(area.width), f64::from(area.width)),
    };
    let Some((start, length)) = scrollbar_thumb(scroll.extent, visible, scroll.position, track_len)
    else {
        return;
    };
    let glyph = |i: usize| {
        let symbol = if (start..start + length).contains(&i) {
            glyphs.scroll_thumb
        } else {
            glyphs.scroll_track
        };
        Span::styled(symbol.to_string(), Style::default().fg(Color::DarkGray))
    };
    match axis {
        ScrollAxis::Vertical => {
            for (i, line) in lines.iter_mut().enumerate() {
                if let Some(last) = line.spans.last_mut() {
                    *last = glyph(i);
                }
            }
        }
        ScrollAxis::Horizontal => {
            if let Some(line) = lines.last_mut() {
                for (i, span) in line.spans.iter_mut().enumerate() {
                    *span = glyph(i);
                }
            }
        }
    }
}

/// Shortens `text` to `width` characters, marking the cut.
fn truncate(text: &str, width: usize, ellipsis: char) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut out: String = text.chars().take(width.saturating_sub(1)).collect();
    out.push(ellipsis);
    out
}

/// Renders the status bar at the bottom.
fn render_status_bar(
    frame: &mut Frame,
    viewport: &Viewport<CellBuffer, TerminalHost>,
    state: &HostState,
    glyphs: &Glyphs,
    title: &str,
    area: Rect,
) {
    let (mode_str, detail) = match &state.mode {
        InputMode::Normal => (
            "NORMAL",
            state.status_message.clone().unwrap_or_else(|| title.to_string()),
        ),
        InputMode::Command(cmd) => ("COMMAND", format!(":{cmd}")),
    };

    let model = viewport.model().borrow();
    let caret = viewport.caret_info();
    let mut position_info = format!("{} bp ", crate::tracks::position::format_thousands(model.len()));
    if !caret.is_empty() {
        position_info = format!("{caret} | {position_info}");
    }
    if model.is_read_only() {
        position_info = format!("RO | {position_info}");
    }

    let width = area.width as usize;
    let room = width.saturating_sub(position_info.chars().count() + mode_str.len() + 6);
    let left_content = format!(" {} | {} ", mode_str, truncate(&detail, room, glyphs.ellipsis));
    let left_len = left_content.chars().count();

    let status_line = Line::from(vec![
        Span::styled(left_content, Style::default().fg(Color::Black).bg(Color::Cyan)),
        Span::styled(
            " ".repeat(width.saturating_sub(left_len + position_info.chars().count())),
            Style::default().bg(Color::Cyan),
        ),
        Span::styled(
            position_info,
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
    ]);
    frame.render_widget(Paragraph::new(status_line), area);
}

/// Help text wrapped to `width` columns.
pub fn help_lines(width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, paragraph) in HELP_TEXT.iter().enumerate() {
        if i > 0 {
            lines.push(String::new());
        }
        lines.extend(textwrap::wrap(paragraph, width.max(10)).into_iter().map(|l| l.into_owned()));
    }
    lines
}

fn render_help(frame: &mut Frame, area: Rect) {
    let width = HELP_WIDTH.min(area.width);
    let lines = help_lines(width.saturating_sub(2) as usize);
    let height = (lines.len() as u16 + 2).min(area.height);
    let popup = Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    );
    let text: Vec<Line> = lines.into_iter().map(Line::from).collect();
    let block = Block::default().borders(Borders::ALL).title("Help");
    frame.render_widget(Clear, popup);
    frame.render_widget(Paragraph::new(text).block(block), popup);
}
