//! Application controller.
//!
//! Owns the terminal and runs the host loop: one viewport frame per tick,
//! blit, then input. The terminal itself is the [`HostElement`]: its size
//! minus the status bar is the canvas viewport.

use std::cell::Cell;
use std::fs;
use std::io::{self, Stdout};
use std::path::Path;
use std::rc::Rc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::{
    event::{
        DisableBracketedPaste, DisableFocusChange, DisableMouseCapture, EnableBracketedPaste,
        EnableFocusChange, EnableMouseCapture,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{debug, info};

use crate::config::ViewerConfig;
use crate::coords::ScrollAxis;
use crate::error::{CanvasError, CanvasResult};
use crate::event::{apply_action, handle_event, poll_event, CanvasAction, HostState};
use crate::layout::Dimensions;
use crate::fasta::read_fasta_sequence;
use crate::model::{Sequence, SequenceDocument, SharedModel};
use crate::surface::CellBuffer;
use crate::ui::glyphs::{self, Glyphs};
use crate::ui::{render, STATUS_BAR_HEIGHT};
use crate::viewport::{DrawKind, HostElement, Viewport};

/// Scrollbar state shared between the host element and the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScrollState {
    pub axis: Option<ScrollAxis>,
    pub extent: f64,
    pub position: f64,
}

/// The terminal window as a host element.
#[derive(Debug, Clone, Default)]
pub struct TerminalHost {
    scroll: Rc<Cell<ScrollState>>,
}

impl TerminalHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scroll(&self) -> ScrollState {
        self.scroll.get()
    }

    /// Canvas size for a terminal of `width` x `height` cells.
    pub fn canvas_size(width: u16, height: u16) -> Dimensions {
        Dimensions::new(
            f64::from(width),
            f64::from(height.saturating_sub(STATUS_BAR_HEIGHT)),
        )
    }
}

impl HostElement for TerminalHost {
    fn measure(&self) -> CanvasResult<Dimensions> {
        let (width, height) =
            crossterm::terminal::size().map_err(|err| CanvasError::Measurement(err.to_string()))?;
        Ok(Self::canvas_size(width, height))
    }

    fn set_scroll_extent(&mut self, axis: ScrollAxis, extent: f64) {
        let mut scroll = self.scroll.get();
        scroll.axis = Some(axis);
        scroll.extent = extent;
        self.scroll.set(scroll);
    }

    fn set_scroll_position(&mut self, offset: f64) {
        let mut scroll = self.scroll.get();
        scroll.position = offset;
        self.scroll.set(scroll);
    }
}

/// The main application controller.
pub struct App {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    viewport: Viewport<CellBuffer, TerminalHost>,
    state: HostState,
    glyphs: Glyphs,
    title: String,
    tick_rate: Duration,
}

impl App {
    /// Sets up the terminal and builds the viewport over `model`.
    pub fn new(model: SharedModel, title: String, config: &ViewerConfig, fancy: bool) -> Result<Self> {
        let registry = config.registry()?;

        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(
            stdout,
            EnterAlternateScreen,
            EnableMouseCapture,
            EnableBracketedPaste,
            EnableFocusChange
        )?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;

        let viewport = Viewport::new(
            model,
            TerminalHost::new(),
            CellBuffer::default(),
            registry,
            config.viewport_options(),
        );
        info!(tracks = config.tracks.len(), "viewer started");

        Ok(Self {
            terminal,
            viewport,
            state: HostState::new(),
            glyphs: glyphs::select(fancy),
            title,
            tick_rate: config.tick(),
        })
    }

    /// Runs the main application loop.
    pub fn run(&mut self) -> Result<()> {
        loop {
            let report = self.viewport.frame(Instant::now());
            if report.kind != DrawKind::Skipped {
                debug!(kind = ?report.kind, rows = report.rows.len(), "canvas updated");
            }

            self.terminal.draw(|frame| {
                render(frame, &self.viewport, &self.state, &self.glyphs, &self.title);
            })?;

            if let Some(event) = poll_event(self.tick_rate) {
                let action = handle_event(event, &self.state.mode, self.state.show_help);
                if action != CanvasAction::None {
                    self.state.status_message = None;
                }
                if !apply_action(&mut self.viewport, &mut self.state, action) {
                    break;
                }
            }
        }
        Ok(())
    }
}

impl Drop for App {
    fn drop(&mut self) {
        // Restore terminal
        let _ = disable_raw_mode();
        let _ = execute!(
            self.terminal.backend_mut(),
            DisableFocusChange,
            DisableBracketedPaste,
            DisableMouseCapture,
            LeaveAlternateScreen
        );
        let _ = self.terminal.show_cursor();
    }
}

/// Opens `file` as a sequence model.
///
/// `.json` files are sequence documents and are saved in place. Anything else
/// is read as FASTA; display settings then live in `state`, restored from it
/// when it exists and written back to it on save.
pub fn open_sequence(file: &Path, state: Option<&Path>, read_only: bool) -> Result<Sequence> {
    let is_document = file
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    let sequence = if is_document {
        Sequence::load_document(file)
            .with_context(|| format!("Failed to load document: {}", file.display()))?
    } else {
        let mut sequence = read_fasta_sequence(file)
            .with_context(|| format!("Failed to read FASTA file: {}", file.display()))?;
        if let Some(state) = state {
            if state.exists() {
                let content = fs::read_to_string(state)
                    .with_context(|| format!("Failed to read state file: {}", state.display()))?;
                let doc: SequenceDocument = serde_json::from_str(&content)
                    .with_context(|| format!("Invalid state file: {}", state.display()))?;
                sequence.restore_settings(doc.display_settings);
                debug!(path = %state.display(), "display settings restored");
            }
            sequence = sequence.with_save_path(state);
        }
        sequence
    };
    Ok(sequence.read_only(read_only))
}

/// Convenience function to run the viewer over a loaded sequence.
pub fn run_app(model: SharedModel, title: String, config: &ViewerConfig, fancy: bool) -> Result<()> {
    let mut app = App::new(model, title, config, fancy)?;
    app.run()
}
