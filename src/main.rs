//! seqcanvas - terminal sequence canvas
//!
//! Displays one DNA sequence as wrapped rows of stacked tracks, with a
//! caret, selection, in-place editing and persisted display settings.
//!
//! ## Usage
//!
//! ```bash
//! seqcanvas plasmid.fa                          # FASTA, settings not kept
//! seqcanvas plasmid.fa --state plasmid.json     # FASTA, settings kept
//! seqcanvas construct.json                      # sequence document
//! seqcanvas construct.json --config view.json   # custom track stack
//! ```
//!
//! Logs go to a file (`--log-file`, or a temp file); set `SEQCANVAS_LOG`
//! to change the filter.

#[cfg(not(windows))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use seqcanvas::config::ViewerConfig;
use seqcanvas::controller::{open_sequence, run_app};
use seqcanvas::logging;
use seqcanvas::model::SharedModel;

/// seqcanvas - a scrollable, editable sequence canvas for the terminal
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Sequence to display: a FASTA file, or a .json sequence document
    file: PathBuf,

    /// Viewer configuration (JSON). Defaults to the terminal preset
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Where display settings of a FASTA file are kept between sessions
    #[arg(short = 's', long = "state")]
    state: Option<PathBuf>,

    /// Log file (defaults to a new file in the temp directory)
    #[arg(long = "log-file")]
    log_file: Option<PathBuf>,

    /// Open the sequence without allowing edits
    #[arg(short = 'r', long = "read-only")]
    read_only: bool,

    /// Use Unicode glyphs for the caret and scrollbar
    #[arg(long = "fancy")]
    fancy: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => ViewerConfig::load(path)?,
        None => ViewerConfig::terminal(),
    };
    let log_path = logging::init(args.log_file.as_deref())?;
    info!(log = %log_path.display(), file = %args.file.display(), "starting");

    let sequence = open_sequence(&args.file, args.state.as_deref(), args.read_only)?;
    let title = format!("{} ({})", sequence.name(), args.file.display());
    let model: SharedModel = Rc::new(RefCell::new(sequence));

    run_app(model, title, &config, args.fancy)
}
