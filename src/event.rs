//! Input handling.
//!
//! Terminal events are mapped to [`CanvasAction`]s, which are then applied
//! to a [`Viewport`]:
//! - arrows or `h/j/k/l`: move the caret by one base or one row
//! - shift+arrows: extend the selection
//! - `Home`/`End`: start/end of the caret's row
//! - `PageUp`/`PageDown`: scroll by one screen
//! - `Ctrl+A`: select all, `Esc`: deselect
//! - `a c g t`: type bases, `Backspace`/`Delete`: remove bases
//! - mouse: click places the caret, drag selects, shift+click extends
//! - `:`: command mode
//!   - `:q` quit, `:h` help, `:w` save
//!   - `:<number>` go to base
//!   - `:toggle <row>` show/hide separators, numbering, enzymes,
//!     complements, features or gutters
//!   - `:aa none|short|long`, `:frame <0-2>` translation row
//!   - `:hl <from> <to>` highlight bases, `:hl` clears

use std::time::Duration;

use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};

use crate::coords::ScrollAxis;
use crate::model::{
    SettingValue, SETTING_AA, SETTING_AA_OFFSET, SETTING_COMPLEMENTS, SETTING_FEATURES,
    SETTING_GUTTERS, SETTING_NUMBERING, SETTING_RES_DISPLAY, SETTING_SEPARATORS,
};
use crate::surface::Surface;
use crate::viewport::{HostElement, Viewport};

/// Rows scrolled per mouse wheel notch.
const WHEEL_ROWS: f64 = 3.0;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum InputMode {
    #[default]
    Normal,
    Command(String),
}

/// Host-side state that is not part of the canvas.
#[derive(Debug, Default)]
pub struct HostState {
    pub mode: InputMode,
    pub show_help: bool,
    pub status_message: Option<String>,
    pub should_quit: bool,
}

impl HostState {
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CanvasAction {
    None,
    Quit,
    MoveLeft,
    MoveRight,
    MoveUp,
    MoveDown,
    ExtendLeft,
    ExtendRight,
    ExtendUp,
    ExtendDown,
    RowStart,
    RowEnd,
    PageUp,
    PageDown,
    SelectAll,
    Deselect,
    /// Typed or pasted text.
    Insert(String),
    DeleteBackward,
    DeleteForward,
    PointerDown { x: f64, y: f64, extend: bool },
    PointerDrag { x: f64, y: f64 },
    PointerUp,
    /// Wheel notches, positive scrolls forward.
    Wheel(f64),
    Resize(u16, u16),
    FocusLost,
    EnterCommandMode,
    CommandChar(char),
    CommandBackspace,
    ExecuteCommand,
    CancelCommand,
    DismissHelp,
}

/// Polls for a terminal event with a timeout.
pub fn poll_event(timeout: Duration) -> Option<Event> {
    if event::poll(timeout).ok()? {
        event::read().ok()
    } else {
        None
    }
}

/// Converts a terminal event to an action for the current mode.
pub fn handle_event(event: Event, mode: &InputMode, show_help: bool) -> CanvasAction {
    match event {
        Event::Key(key) => handle_key_event(key, mode, show_help),
        Event::Mouse(mouse) => handle_mouse_event(mouse),
        Event::Paste(text) => CanvasAction::Insert(text),
        Event::Resize(width, height) => CanvasAction::Resize(width, height),
        Event::FocusLost => CanvasAction::FocusLost,
        _ => CanvasAction::None,
    }
}

fn handle_key_event(key: KeyEvent, mode: &InputMode, show_help: bool) -> CanvasAction {
    if show_help {
        return CanvasAction::DismissHelp;
    }
    match mode {
        InputMode::Normal => handle_normal_mode(key),
        InputMode::Command(_) => handle_command_mode(key),
    }
}

fn handle_normal_mode(key: KeyEvent) -> CanvasAction {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let shift = key.modifiers.contains(KeyModifiers::SHIFT);
    if ctrl {
        return match key.code {
            KeyCode::Char('c') => CanvasAction::Quit,
            KeyCode::Char('a') => CanvasAction::SelectAll,
            _ => CanvasAction::None,
        };
    }

    match key.code {
        KeyCode::Left if shift => CanvasAction::ExtendLeft,
        KeyCode::Right if shift => CanvasAction::ExtendRight,
        KeyCode::Up if shift => CanvasAction::ExtendUp,
        KeyCode::Down if shift => CanvasAction::ExtendDown,
        KeyCode::Left | KeyCode::Char('h') => CanvasAction::MoveLeft,
        KeyCode::Right | KeyCode::Char('l') => CanvasAction::MoveRight,
        KeyCode::Up | KeyCode::Char('k') => CanvasAction::MoveUp,
        KeyCode::Down | KeyCode::Char('j') => CanvasAction::MoveDown,
        KeyCode::Home => CanvasAction::RowStart,
        KeyCode::End => CanvasAction::RowEnd,
        KeyCode::PageUp => CanvasAction::PageUp,
        KeyCode::PageDown => CanvasAction::PageDown,
        KeyCode::Esc => CanvasAction::Deselect,
        KeyCode::Backspace => CanvasAction::DeleteBackward,
        KeyCode::Delete => CanvasAction::DeleteForward,
        KeyCode::Char(':') => CanvasAction::EnterCommandMode,
        KeyCode::Char(c) if "acgtACGT".contains(c) => CanvasAction::Insert(c.to_string()),
        _ => CanvasAction::None,
    }
}

fn handle_command_mode(key: KeyEvent) -> CanvasAction {
    match key.code {
        KeyCode::Enter => CanvasAction::ExecuteCommand,
        KeyCode::Esc => CanvasAction::CancelCommand,
        KeyCode::Backspace => CanvasAction::CommandBackspace,
        KeyCode::Char(c) => CanvasAction::CommandChar(c),
        _ => CanvasAction::None,
    }
}

/// Mouse positions are cells relative to the canvas' top-left corner.
fn handle_mouse_event(mouse: MouseEvent) -> CanvasAction {
    let x = f64::from(mouse.column);
    let y = f64::from(mouse.row);
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => CanvasAction::PointerDown {
            x,
            y,
            extend: mouse.modifiers.contains(KeyModifiers::SHIFT),
        },
        MouseEventKind::Drag(MouseButton::Left) => CanvasAction::PointerDrag { x, y },
        MouseEventKind::Up(MouseButton::Left) => CanvasAction::PointerUp,
        MouseEventKind::ScrollDown => CanvasAction::Wheel(1.0),
        MouseEventKind::ScrollUp => CanvasAction::Wheel(-1.0),
        _ => CanvasAction::None,
    }
}

/// Applies an action to the viewport.
///
/// Returns `true` if the application should continue, `false` if it should quit.
pub fn apply_action<S: Surface, H: HostElement>(
    viewport: &mut Viewport<S, H>,
    state: &mut HostState,
    action: CanvasAction,
) -> bool {
    let row = row_width(viewport);
    let len = viewport
        .generation()
        .map_or(0, |generation| generation.sequence_len());
    match action {
        CanvasAction::None => {}
        CanvasAction::Quit => state.should_quit = true,
        CanvasAction::MoveLeft => step_caret(viewport, |c| c.saturating_sub(1)),
        CanvasAction::MoveRight => step_caret(viewport, |c| (c + 1).min(len)),
        CanvasAction::MoveUp => step_caret(viewport, |c| c.saturating_sub(row)),
        CanvasAction::MoveDown => step_caret(viewport, |c| (c + row).min(len)),
        CanvasAction::ExtendLeft => viewport.extend_left(),
        CanvasAction::ExtendRight => viewport.extend_right(),
        CanvasAction::ExtendUp => {
            if let Some(caret) = viewport.caret() {
                viewport.extend_to(caret.saturating_sub(row));
            }
        }
        CanvasAction::ExtendDown => {
            if let Some(caret) = viewport.caret() {
                viewport.extend_to((caret + row).min(len));
            }
        }
        CanvasAction::RowStart => match viewport.caret_row_base() {
            Some(base) => viewport.move_caret(base - base % row),
            None => step_caret(viewport, |c| c),
        },
        CanvasAction::RowEnd => match viewport.caret_row_base() {
            Some(base) => viewport.move_caret_to_row_end((base - base % row + row).min(len)),
            None => step_caret(viewport, |c| c),
        },
        CanvasAction::PageUp => {
            viewport.scroll_pages(-1.0);
        }
        CanvasAction::PageDown => {
            viewport.scroll_pages(1.0);
        }
        CanvasAction::SelectAll => viewport.select_all(),
        CanvasAction::Deselect => match viewport.caret() {
            Some(caret) if viewport.selection().is_some() => viewport.move_caret(caret),
            _ => viewport.blur(),
        },
        CanvasAction::Insert(text) => report(state, viewport.insert_text(&text)),
        CanvasAction::DeleteBackward => report(state, viewport.delete_backward()),
        CanvasAction::DeleteForward => report(state, viewport.delete_forward()),
        CanvasAction::PointerDown { x, y, extend } => viewport.pointer_down(x, y, extend),
        CanvasAction::PointerDrag { x, y } => viewport.pointer_drag(x, y),
        CanvasAction::PointerUp => viewport.pointer_up(),
        CanvasAction::Wheel(notches) => {
            let step = match viewport.generation() {
                Some(g) if g.axis() == ScrollAxis::Vertical => g.row_height,
                Some(g) => g.mapper.geometry().base_width,
                None => 0.0,
            };
            viewport.scroll_to(viewport.offset() + notches * WHEEL_ROWS * step);
        }
        CanvasAction::Resize(_, _) => report(state, viewport.refresh_from_resize()),
        CanvasAction::FocusLost => viewport.blur(),
        CanvasAction::EnterCommandMode => state.mode = InputMode::Command(String::new()),
        CanvasAction::CommandChar(c) => {
            if let InputMode::Command(buffer) = &mut state.mode {
                buffer.push(c);
            }
        }
        CanvasAction::CommandBackspace => {
            if let InputMode::Command(buffer) = &mut state.mode {
                if buffer.pop().is_none() {
                    state.mode = InputMode::Normal;
                }
            }
        }
        CanvasAction::ExecuteCommand => {
            if let InputMode::Command(command) = std::mem::take(&mut state.mode) {
                execute_command(viewport, state, command.trim());
            }
        }
        CanvasAction::CancelCommand => state.mode = InputMode::Normal,
        CanvasAction::DismissHelp => state.show_help = false,
    }
    !state.should_quit
}

fn row_width<S: Surface, H: HostElement>(viewport: &Viewport<S, H>) -> usize {
    viewport
        .generation()
        .map_or(1, |generation| generation.bases_per_row.max(1))
}

/// Moves the caret relative to its slot; without a caret, places it at the
/// first visible base.
fn step_caret<S: Surface, H: HostElement>(
    viewport: &mut Viewport<S, H>,
    step: impl FnOnce(usize) -> usize,
) {
    let target = match viewport.caret() {
        Some(caret) => step(caret),
        None => match viewport.generation() {
            Some(generation) => generation.mapper.first_visible_base(viewport.offset()),
            None => return,
        },
    };
    viewport.move_caret(target);
}

fn report<E: std::fmt::Display>(state: &mut HostState, result: Result<(), E>) {
    if let Err(err) = result {
        state.status_message = Some(err.to_string());
    }
}

fn execute_command<S: Surface, H: HostElement>(
    viewport: &mut Viewport<S, H>,
    state: &mut HostState,
    command: &str,
) {
    let mut parts = command.split_whitespace();
    let name = parts.next().unwrap_or_default();
    let args: Vec<&str> = parts.collect();
    state.status_message = None;

    match (name, args.as_slice()) {
        ("q" | "quit", _) => state.should_quit = true,
        ("h" | "help", _) => state.show_help = true,
        ("w" | "write", _) => {
            let result = viewport.model().borrow_mut().save();
            state.status_message = Some(match result {
                Ok(()) => "Saved".to_string(),
                Err(err) => err.to_string(),
            });
        }
        ("toggle", [row]) => match row_setting(row) {
            Some(path) => {
                let shown = viewport
                    .model()
                    .borrow()
                    .setting(path)
                    .is_some_and(|v| v.is_truthy());
                viewport
                    .model()
                    .borrow_mut()
                    .set_setting(path, SettingValue::from(!shown), false);
            }
            None => state.status_message = Some(format!("Unknown row: {row}")),
        },
        ("aa", [mode @ ("none" | "short" | "long")]) => {
            viewport
                .model()
                .borrow_mut()
                .set_setting(SETTING_AA, SettingValue::from(*mode), false);
        }
        ("frame", [frame]) => match frame.parse::<u8>() {
            Ok(frame) if frame < 3 => viewport.model().borrow_mut().set_setting(
                SETTING_AA_OFFSET,
                SettingValue::from(f64::from(frame)),
                false,
            ),
            _ => state.status_message = Some("Frame must be 0, 1 or 2".to_string()),
        },
        ("hl", []) => report(state, viewport.highlight_base_range(None)),
        ("hl", [from, to]) => match (from.parse::<usize>(), to.parse::<usize>()) {
            (Ok(from), Ok(to)) if from > 0 && to > 0 => {
                report(state, viewport.highlight_base_range(Some((from - 1, to - 1))))
            }
            _ => state.status_message = Some("Usage: :hl <from> <to>".to_string()),
        },
        (number, []) if !number.is_empty() && number.chars().all(|c| c.is_ascii_digit()) => {
            match number.parse::<usize>() {
                Ok(base) if base > 0 => {
                    let base = base - 1;
                    viewport.scroll_to_base(base);
                    viewport.move_caret(base);
                }
                _ => state.status_message = Some("Bases are numbered from 1".to_string()),
            }
        }
        ("", []) => {}
        _ => state.status_message = Some(format!("Unknown command: {command}")),
    }
}

fn row_setting(row: &str) -> Option<&'static str> {
    match row {
        "separators" => Some(SETTING_SEPARATORS),
        "numbering" => Some(SETTING_NUMBERING),
        "enzymes" => Some(SETTING_RES_DISPLAY),
        "complements" => Some(SETTING_COMPLEMENTS),
        "features" => Some(SETTING_FEATURES),
        "gutters" => Some(SETTING_GUTTERS),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Instant;

    use super::*;
    use crate::caret::Selection;
    use crate::layout::{LayoutSettings, Margins};
    use crate::model::{Sequence, SharedModel};
    use crate::surface::CellBuffer;
    use crate::test_utils::FixedHost;
    use crate::tracks::{TrackSpec, TrackRegistry};
    use crate::viewport::ViewportOptions;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn normal(code: KeyCode, modifiers: KeyModifiers) -> CanvasAction {
        handle_key_event(KeyEvent::new(code, modifiers), &InputMode::Normal, false)
    }

    /// 40 bases, 10 per row.
    fn viewport(seq: Sequence) -> Viewport<CellBuffer, FixedHost> {
        let model: SharedModel = Rc::new(RefCell::new(seq));
        let options = ViewportOptions {
            layout: LayoutSettings {
                margins: Margins::uniform(0.0),
                ..LayoutSettings::terminal()
            },
            ..ViewportOptions::default()
        };
        let registry = TrackRegistry::from_specs(&TrackSpec::terminal_defaults()).unwrap();
        let mut viewport = Viewport::new(
            model,
            FixedHost::new(10.0, 12.0),
            CellBuffer::new(0, 0),
            registry,
            options,
        );
        viewport.model().borrow_mut().set_setting(SETTING_GUTTERS, SettingValue::from(false), false);
        viewport.frame(Instant::now());
        viewport
    }

    fn apply(viewport: &mut Viewport<CellBuffer, FixedHost>, state: &mut HostState, actions: &[CanvasAction]) {
        for action in actions {
            apply_action(viewport, state, action.clone());
        }
    }

    #[test]
    fn test_navigation_keys() {
        assert_eq!(normal(KeyCode::Char('h'), KeyModifiers::NONE), CanvasAction::MoveLeft);
        assert_eq!(normal(KeyCode::Down, KeyModifiers::NONE), CanvasAction::MoveDown);
        assert_eq!(normal(KeyCode::Right, KeyModifiers::SHIFT), CanvasAction::ExtendRight);
        assert_eq!(normal(KeyCode::Up, KeyModifiers::SHIFT), CanvasAction::ExtendUp);
        assert_eq!(normal(KeyCode::Home, KeyModifiers::NONE), CanvasAction::RowStart);
        assert_eq!(normal(KeyCode::PageDown, KeyModifiers::NONE), CanvasAction::PageDown);
        assert_eq!(normal(KeyCode::Char('a'), KeyModifiers::CONTROL), CanvasAction::SelectAll);
        assert_eq!(normal(KeyCode::Char('c'), KeyModifiers::CONTROL), CanvasAction::Quit);
    }

    #[test]
    fn test_typing_keys() {
        assert_eq!(
            normal(KeyCode::Char('g'), KeyModifiers::NONE),
            CanvasAction::Insert("g".to_string())
        );
        assert_eq!(normal(KeyCode::Char('x'), KeyModifiers::NONE), CanvasAction::None);
        assert_eq!(normal(KeyCode::Backspace, KeyModifiers::NONE), CanvasAction::DeleteBackward);
        assert_eq!(
            handle_event(Event::Paste("acgt".to_string()), &InputMode::Normal, false),
            CanvasAction::Insert("acgt".to_string())
        );
    }

    #[test]
    fn test_command_mode_keys() {
        let mode = InputMode::Command(String::new());
        assert_eq!(handle_key_event(key(KeyCode::Char('q')), &mode, false), CanvasAction::CommandChar('q'));
        assert_eq!(handle_key_event(key(KeyCode::Enter), &mode, false), CanvasAction::ExecuteCommand);
        assert_eq!(handle_key_event(key(KeyCode::Esc), &mode, false), CanvasAction::CancelCommand);
        // Any key closes the help overlay
        assert_eq!(handle_key_event(key(KeyCode::Char('x')), &mode, true), CanvasAction::DismissHelp);
    }

    #[test]
    fn test_mouse_events() {
        let mouse = MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column: 4,
            row: 2,
            modifiers: KeyModifiers::SHIFT,
        };
        assert_eq!(
            handle_event(Event::Mouse(mouse), &InputMode::Normal, false),
            CanvasAction::PointerDown { x: 4.0, y: 2.0, extend: true }
        );
        let wheel = MouseEvent {
            kind: MouseEventKind::ScrollDown,
            column: 0,
            row: 0,
            modifiers: KeyModifiers::NONE,
        };
        assert_eq!(handle_mouse_event(wheel), CanvasAction::Wheel(1.0));
    }

    #[test]
    fn test_caret_moves() {
        let mut viewport = viewport(Sequence::new("s", "ACGT".repeat(10)));
        let mut state = HostState::new();
        apply(&mut viewport, &mut state, &[CanvasAction::MoveRight]);
        // First move places the caret at the first visible base
        assert_eq!(viewport.caret(), Some(0));
        apply(&mut viewport, &mut state, &[CanvasAction::MoveRight, CanvasAction::MoveDown]);
        assert_eq!(viewport.caret(), Some(11));
        apply(&mut viewport, &mut state, &[CanvasAction::RowEnd]);
        assert_eq!(viewport.caret(), Some(20));
        assert_eq!(viewport.caret_row_base(), Some(19));
        // Home/End stay on the row the caret is drawn on
        apply(&mut viewport, &mut state, &[CanvasAction::RowEnd]);
        assert_eq!(viewport.caret(), Some(20));
        apply(&mut viewport, &mut state, &[CanvasAction::RowStart]);
        assert_eq!(viewport.caret(), Some(10));
        apply(&mut viewport, &mut state, &[CanvasAction::RowEnd, CanvasAction::MoveLeft, CanvasAction::RowStart]);
        assert_eq!(viewport.caret(), Some(10));
        apply(&mut viewport, &mut state, &[CanvasAction::MoveUp, CanvasAction::MoveUp]);
        assert_eq!(viewport.caret(), Some(0));
    }

    #[test]
    fn test_row_end_caret_is_drawn_on_its_row() {
        let mut viewport = viewport(Sequence::new("s", "ACGT".repeat(10)));
        let mut state = HostState::new();
        viewport.move_caret(19);
        let before_last = viewport.caret_display().unwrap();

        viewport.move_caret(12);
        apply(&mut viewport, &mut state, &[CanvasAction::RowEnd]);
        let display = viewport.caret_display().unwrap();
        assert_eq!(display.slot, 20);
        assert_eq!(display.y, before_last.y);
        assert_eq!(display.x, before_last.x + 1.0);
    }

    #[test]
    fn test_selection_keys() {
        let mut viewport = viewport(Sequence::new("s", "ACGT".repeat(10)));
        let mut state = HostState::new();
        viewport.move_caret(3);
        apply(
            &mut viewport,
            &mut state,
            &[CanvasAction::ExtendRight, CanvasAction::ExtendRight],
        );
        assert_eq!(viewport.selection(), Some(Selection::new(3, 4)));
        apply(&mut viewport, &mut state, &[CanvasAction::ExtendDown]);
        assert_eq!(viewport.selection(), Some(Selection::new(3, 14)));
        apply(&mut viewport, &mut state, &[CanvasAction::Deselect]);
        assert_eq!(viewport.selection(), None);
        assert_eq!(viewport.caret(), Some(15));
        apply(&mut viewport, &mut state, &[CanvasAction::SelectAll]);
        assert_eq!(viewport.selection(), Some(Selection::new(0, 39)));
    }

    #[test]
    fn test_read_only_edit_reports() {
        let mut viewport = viewport(Sequence::new("s", "ACGT").read_only(true));
        let mut state = HostState::new();
        viewport.move_caret(2);
        apply(&mut viewport, &mut state, &[CanvasAction::Insert("a".to_string())]);
        assert_eq!(state.status_message.as_deref(), Some("Sequence model error: Sequence is read-only"));
        assert_eq!(viewport.model().borrow().len(), 4);
    }

    #[test]
    fn test_commands() {
        let mut viewport = viewport(Sequence::new("s", "ACGT".repeat(10)));
        let mut state = HostState::new();
        let type_command = |text: &str| {
            let mut actions = vec![CanvasAction::EnterCommandMode];
            actions.extend(text.chars().map(CanvasAction::CommandChar));
            actions.push(CanvasAction::ExecuteCommand);
            actions
        };

        apply(&mut viewport, &mut state, &type_command("25"));
        assert_eq!(viewport.caret(), Some(24));
        assert_eq!(state.mode, InputMode::Normal);

        apply(&mut viewport, &mut state, &type_command("toggle complements"));
        assert!(viewport
            .model()
            .borrow()
            .setting(SETTING_COMPLEMENTS)
            .is_some_and(|v| v.is_truthy()));

        apply(&mut viewport, &mut state, &type_command("hl 2 4"));
        assert_eq!(viewport.highlight(), Some((1, 3)));

        apply(&mut viewport, &mut state, &type_command("frame 7"));
        assert_eq!(state.status_message.as_deref(), Some("Frame must be 0, 1 or 2"));

        apply(&mut viewport, &mut state, &type_command("bogus"));
        assert_eq!(state.status_message.as_deref(), Some("Unknown command: bogus"));

        apply(&mut viewport, &mut state, &type_command("h"));
        assert!(state.show_help);
        apply(&mut viewport, &mut state, &[CanvasAction::DismissHelp]);
        assert!(!state.show_help);

        apply(
            &mut viewport,
            &mut state,
            &[CanvasAction::EnterCommandMode, CanvasAction::CommandChar('q')],
        );
        assert!(!apply_action(&mut viewport, &mut state, CanvasAction::ExecuteCommand));
        assert!(state.should_quit);
    }

    #[test]
    fn test_command_backspace_leaves_mode_when_empty() {
        let mut viewport = viewport(Sequence::new("s", "ACGT"));
        let mut state = HostState::new();
        apply(
            &mut viewport,
            &mut state,
            &[CanvasAction::EnterCommandMode, CanvasAction::CommandChar('1')],
        );
        apply(&mut viewport, &mut state, &[CanvasAction::CommandBackspace]);
        assert_eq!(state.mode, InputMode::Command(String::new()));
        apply(&mut viewport, &mut state, &[CanvasAction::CommandBackspace]);
        assert_eq!(state.mode, InputMode::Normal);
    }

    #[test]
    fn test_wheel_scrolls_rows() {
        let mut viewport = viewport(Sequence::new("s", "A".repeat(400)));
        let mut state = HostState::new();
        let row_height = viewport.generation().unwrap().row_height;
        apply(&mut viewport, &mut state, &[CanvasAction::Wheel(1.0)]);
        assert_eq!(viewport.offset(), 3.0 * row_height);
        apply(&mut viewport, &mut state, &[CanvasAction::PageUp]);
        assert_eq!(viewport.offset(), 0.0);
    }
}
