//! Codon translation for the amino-acid track.
//!
//! Tables use the NCBI 64-character layout (TTT, TTC, TTA, TTG, TCT, ...).

use std::collections::HashMap;

/// A genetic code table for translating codons to amino acids.
#[derive(Debug, Clone)]
pub struct GeneticCode {
    /// NCBI genetic code ID
    pub id: u8,
    pub name: &'static str,
    codon_table: HashMap<[u8; 3], char>,
}

impl GeneticCode {
    fn new(id: u8, name: &'static str, ncbieaa: &str) -> Self {
        let bases = [b'T', b'C', b'A', b'G'];
        let mut codon_table = HashMap::with_capacity(64);
        let mut amino_acids = ncbieaa.chars();
        for &b1 in &bases {
            for &b2 in &bases {
                for &b3 in &bases {
                    let aa = amino_acids.next().unwrap_or('X');
                    codon_table.insert([b1, b2, b3], aa);
                }
            }
        }
        Self {
            id,
            name,
            codon_table,
        }
    }

    /// The standard code (NCBI table 1).
    pub fn standard() -> Self {
        Self::new(
            1,
            "Standard",
            "FFLLSSSSYY**CC*WLLLLPPPPHHQQRRRRIIIMTTTTNNKKSSRRVVVVAAAADDEEGGGG",
        )
    }

    /// Looks up a code by NCBI id among the tables the viewer ships.
    pub fn by_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Self::standard()),
            2 => Some(Self::new(
                2,
                "Vertebrate Mitochondrial",
                "FFLLSSSSYY**CCWWLLLLPPPPHHQQRRRRIIMMTTTTNNKKSS**VVVVAAAADDEEGGGG",
            )),
            3 => Some(Self::new(
                3,
                "Yeast Mitochondrial",
                "FFLLSSSSYY**CCWWTTTTPPPPHHQQRRRRIIMMTTTTNNKKSSRRVVVVAAAADDEEGGGG",
            )),
            11 => Some(Self::new(
                11,
                "Bacterial, Archaeal and Plant Plastid",
                "FFLLSSSSYY**CC*WLLLLPPPPHHQQRRRRIIIMTTTTNNKKSSRRVVVVAAAADDEEGGGG",
            )),
            _ => None,
        }
    }

    /// Translates a codon. Ambiguous or short codons give `'X'`; U reads as T.
    pub fn translate_codon(&self, codon: &str) -> char {
        let mut key = [0u8; 3];
        let mut chars = codon.chars();
        for slot in key.iter_mut() {
            match chars.next().map(|c| c.to_ascii_uppercase()) {
                Some('U') => *slot = b'T',
                Some(c @ ('A' | 'C' | 'G' | 'T')) => *slot = c as u8,
                _ => return 'X',
            }
        }
        if chars.next().is_some() {
            return 'X';
        }
        self.codon_table.get(&key).copied().unwrap_or('X')
    }
}

impl Default for GeneticCode {
    fn default() -> Self {
        Self::standard()
    }
}

/// Three-letter abbreviation of a one-letter amino-acid code.
pub fn three_letter(aa: char) -> &'static str {
    match aa {
        'A' => "Ala",
        'R' => "Arg",
        'N' => "Asn",
        'D' => "Asp",
        'C' => "Cys",
        'Q' => "Gln",
        'E' => "Glu",
        'G' => "Gly",
        'H' => "His",
        'I' => "Ile",
        'L' => "Leu",
        'K' => "Lys",
        'M' => "Met",
        'F' => "Phe",
        'P' => "Pro",
        'S' => "Ser",
        'T' => "Thr",
        'W' => "Trp",
        'Y' => "Tyr",
        'V' => "Val",
        '*' => "Stp",
        _ => "Xaa",
    }
}

/// Where a base sits inside its codon for a given frame offset.
///
/// Returns `(codon_start, position_in_codon)`, or `None` when the base
/// precedes the first full codon of the frame.
pub fn codon_slot(base: usize, frame_offset: usize) -> Option<(usize, usize)> {
    let offset = frame_offset % 3;
    if base < offset {
        return None;
    }
    let position = (base - offset) % 3;
    Some((base - position, position))
}
