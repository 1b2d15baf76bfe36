//! # seqcanvas - virtualized sequence canvas
//!
//! Displays a long DNA sequence as wrapped rows, each row a vertical stack of
//! tracks (numbering, bases, translation, features, restriction sites,
//! chromatogram). Only the rows inside the viewport are ever painted.
//!
//! ## Architecture
//!
//! - `model`: the sequence model boundary, display settings and change events
//! - `coords`: base index <-> pixel mapping, uniform or peak-anchored
//! - `tracks`: the track trait, built-in tracks and the ordered registry
//! - `layout`: row placements, row height and content extent for a viewport
//! - `scheduler`: coalesces redraw requests into at most one draw per frame
//! - `viewport`: scroll state, redraw kinds, caret and selection handling
//! - `caret`: caret slots and the selection rules
//! - `persist`: debounced writes of display settings back to the model
//! - `surface`: the drawing surface boundary and a cell-grid implementation
//! - `config`, `logging`: ambient setup for the terminal host
//! - `event`, `ui`, `controller`: the terminal host around the canvas

pub mod caret;
pub mod config;
pub mod controller;
pub mod coords;
pub mod error;
pub mod event;
pub mod fasta;
pub mod genetic_code;
pub mod layout;
pub mod logging;
pub mod model;
pub mod notify;
pub mod persist;
pub mod scheduler;
pub mod surface;
pub mod tracks;
pub mod ui;
pub mod viewport;

#[cfg(test)]
mod test_utils;
