//! Error kinds surfaced by the rendering core.
//!
//! None of these reach the end user as a blocking dialog: the viewport logs
//! them and keeps showing the last consistent frame.

use thiserror::Error;

use crate::coords::CoordinateError;
use crate::model::ModelError;
use crate::tracks::TrackError;

/// Errors raised while measuring, laying out or drawing the canvas.
#[derive(Error, Debug)]
pub enum CanvasError {
    /// The layout could not produce a usable geometry (fatal to that redraw cycle).
    #[error("Invalid layout: {0}")]
    LayoutInvalid(String),

    /// The peak table is empty or malformed.
    #[error("Coordinate lookup failed: {0}")]
    CoordinateLookup(#[from] CoordinateError),

    /// A single track failed while painting.
    #[error("Track `{track}` failed to draw: {source}")]
    Draw {
        track: String,
        #[source]
        source: TrackError,
    },

    /// The host element could not report its dimensions.
    #[error("Failed to measure host element: {0}")]
    Measurement(String),

    #[error("Sequence model error: {0}")]
    Model(#[from] ModelError),
}

/// Result type for canvas operations.
pub type CanvasResult<T> = Result<T, CanvasError>;
