//! FASTA input for the viewer.
//!
//! The canvas displays one sequence; when a file holds several records the
//! first one is shown.
//!
//! ```text
//! >sequence_identifier optional description
//! ACGTACGTACGT...
//! ```

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use thiserror::Error;

use crate::model::Sequence;

/// Errors that can occur during FASTA parsing.
#[derive(Error, Debug)]
pub enum FastaError {
    #[error("Failed to open file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Empty FASTA file")]
    EmptyFile,

    #[error("Invalid FASTA format: {0}")]
    InvalidFormat(String),

    #[error("Sequence without header at line {0}")]
    SequenceWithoutHeader(usize),
}

/// Result type for FASTA operations.
pub type FastaResult<T> = Result<T, FastaError>;

/// One FASTA record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastaRecord {
    pub id: String,
    pub data: String,
}

/// Reads the first record of a FASTA file as a sequence model.
pub fn read_fasta_sequence<P: AsRef<Path>>(path: P) -> FastaResult<Sequence> {
    let file = File::open(path)?;
    let mut records = parse_fasta(BufReader::new(file))?;
    let first = records.swap_remove(0);
    Ok(Sequence::new(first.id, first.data))
}

/// Parses FASTA content from a reader. Never returns an empty list.
pub fn parse_fasta<R: BufRead>(reader: R) -> FastaResult<Vec<FastaRecord>> {
    let mut records = Vec::new();
    let mut current_id: Option<String> = None;
    let mut current_seq = String::new();

    for (index, line_result) in reader.lines().enumerate() {
        let line_number = index + 1;
        let line = line_result?;
        let line = line.trim();

        if line.is_empty() {
            continue;
        }

        if let Some(header) = line.strip_prefix('>') {
            if let Some(id) = current_id.take() {
                if !current_seq.is_empty() {
                    records.push(FastaRecord {
                        id,
                        data: std::mem::take(&mut current_seq),
                    });
                }
            }

            let id = header.split_whitespace().next().unwrap_or("").to_string();
            if id.is_empty() {
                return Err(FastaError::InvalidFormat(format!(
                    "Empty sequence identifier at line {}",
                    line_number
                )));
            }
            current_id = Some(id);
            current_seq.clear();
        } else {
            if current_id.is_none() {
                return Err(FastaError::SequenceWithoutHeader(line_number));
            }
            current_seq.extend(line.chars().filter(|c| !c.is_whitespace()));
        }
    }

    if let Some(id) = current_id {
        if !current_seq.is_empty() {
            records.push(FastaRecord {
                id,
                data: current_seq,
            });
        }
    }

    if records.is_empty() {
        return Err(FastaError::EmptyFile);
    }
    Ok(records)
}

/// Parses FASTA content from a string.
pub fn parse_fasta_str(content: &str) -> FastaResult<Vec<FastaRecord>> {
    parse_fasta(content.as_bytes())
}
