//! Sequence model collaborator.
//!
//! The rendering core only talks to the sequence through [`SequenceModel`]:
//! - length and raw base lookup
//! - feature and restriction-site lookups over a base range
//! - the trace peak table and trace channels, when the sequence has one
//! - a display-setting key/value store with change notifications
//! - editing and a save operation
//!
//! [`Sequence`] is the in-memory implementation used by the terminal host
//! and the tests. It loads from FASTA or from a JSON sequence document and
//! writes the document back on save.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::ops::{Range, RangeInclusive};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::notify::{Notifier, Subscription, SubscriptionId, Topic};

pub const SETTING_SEPARATORS: &str = "displaySettings.rows.separators";
pub const SETTING_NUMBERING: &str = "displaySettings.rows.numbering";
pub const SETTING_RES_DISPLAY: &str = "displaySettings.rows.res.display";
pub const SETTING_AA: &str = "displaySettings.rows.aa";
pub const SETTING_AA_OFFSET: &str = "displaySettings.rows.aaOffset";
pub const SETTING_COMPLEMENTS: &str = "displaySettings.rows.complements";
pub const SETTING_FEATURES: &str = "displaySettings.rows.features";
pub const SETTING_GUTTERS: &str = "displaySettings.rows.hasGutters";
pub const SETTING_SCROLL_OFFSET: &str = "displaySettings.yOffset";

/// Errors raised by the sequence model.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Failed to access sequence file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid sequence document: {0}")]
    Document(#[from] serde_json::Error),

    #[error("Sequence is read-only")]
    ReadOnly,

    #[error("Sequences backed by a trace cannot be edited")]
    TraceLocked,

    #[error("Position {position} is out of range (length {len})")]
    OutOfRange { position: usize, len: usize },
}

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// A single display-setting value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl SettingValue {
    /// Loose truthiness: `false`, `0`, `""` and `"none"` are false.
    pub fn is_truthy(&self) -> bool {
        match self {
            SettingValue::Bool(b) => *b,
            SettingValue::Number(n) => *n != 0.0 && !n.is_nan(),
            SettingValue::Text(s) => !s.is_empty() && s != "none",
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SettingValue::Number(n) => Some(*n),
            SettingValue::Text(s) => s.trim().parse().ok(),
            SettingValue::Bool(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SettingValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for SettingValue {
    fn from(value: bool) -> Self {
        SettingValue::Bool(value)
    }
}

impl From<f64> for SettingValue {
    fn from(value: f64) -> Self {
        SettingValue::Number(value)
    }
}

impl From<&str> for SettingValue {
    fn from(value: &str) -> Self {
        SettingValue::Text(value.to_string())
    }
}

/// Display settings keyed by dotted path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DisplaySettings {
    values: BTreeMap<String, SettingValue>,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        let mut settings = Self {
            values: BTreeMap::new(),
        };
        settings.set(SETTING_SEPARATORS, true.into());
        settings.set(SETTING_NUMBERING, true.into());
        settings.set(SETTING_RES_DISPLAY, false.into());
        settings.set(SETTING_AA, "none".into());
        settings.set(SETTING_AA_OFFSET, 0.0.into());
        settings.set(SETTING_COMPLEMENTS, false.into());
        settings.set(SETTING_FEATURES, true.into());
        settings.set(SETTING_GUTTERS, true.into());
        settings.set(SETTING_SCROLL_OFFSET, 0.0.into());
        settings
    }
}

impl DisplaySettings {
    pub fn get(&self, path: &str) -> Option<&SettingValue> {
        self.values.get(path)
    }

    /// Stores a value. Returns true if the stored value changed.
    pub fn set(&mut self, path: &str, value: SettingValue) -> bool {
        match self.values.get(path) {
            Some(existing) if *existing == value => false,
            _ => {
                self.values.insert(path.to_string(), value);
                true
            }
        }
    }

    pub fn flag(&self, path: &str) -> bool {
        self.get(path).is_some_and(SettingValue::is_truthy)
    }
}

/// A change the model reports to its listeners.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelChange {
    Sequence,
    Features,
    Setting(String),
}

impl Topic for ModelChange {
    fn topic(&self) -> &str {
        match self {
            ModelChange::Sequence => "sequence",
            ModelChange::Features => "features",
            ModelChange::Setting(path) => path,
        }
    }
}

/// An annotated span, 0-based and inclusive on both ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub start: usize,
    pub end: usize,
}

impl Feature {
    pub fn overlaps(&self, range: &RangeInclusive<usize>) -> bool {
        self.start <= *range.end() && self.end >= *range.start()
    }
}

/// A restriction enzyme recognition site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestrictionSite {
    pub enzyme: String,
    /// First base of the recognition sequence.
    pub position: usize,
    /// Cut position relative to `position`.
    #[serde(default)]
    pub cut: usize,
}

/// Raw trace intensities, one sample vector per channel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TraceData {
    pub a: Vec<f64>,
    pub c: Vec<f64>,
    pub g: Vec<f64>,
    pub t: Vec<f64>,
}

impl TraceData {
    /// Strongest channel at a sample index, as `(base, intensity)`.
    pub fn dominant_at(&self, sample: usize) -> Option<(char, f64)> {
        [('A', &self.a), ('C', &self.c), ('G', &self.g), ('T', &self.t)]
            .into_iter()
            .filter_map(|(base, channel)| channel.get(sample).map(|v| (base, *v)))
            .max_by(|x, y| x.1.total_cmp(&y.1))
    }

    pub fn max_intensity(&self) -> f64 {
        [&self.a, &self.c, &self.g, &self.t]
            .into_iter()
            .flat_map(|channel| channel.iter().copied())
            .fold(0.0, f64::max)
    }
}

/// Watson-Crick complement of an IUPAC base; other characters pass through.
pub fn complement(base: char) -> char {
    let complemented = match base.to_ascii_uppercase() {
        'A' => 'T',
        'T' | 'U' => 'A',
        'C' => 'G',
        'G' => 'C',
        'R' => 'Y',
        'Y' => 'R',
        'K' => 'M',
        'M' => 'K',
        'B' => 'V',
        'V' => 'B',
        'D' => 'H',
        'H' => 'D',
        other => other,
    };
    if base.is_ascii_lowercase() {
        complemented.to_ascii_lowercase()
    } else {
        complemented
    }
}

/// Everything the rendering core needs from the sequence.
pub trait SequenceModel {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn base_at(&self, index: usize) -> Option<char>;

    fn subsequence(&self, range: Range<usize>) -> String {
        range.filter_map(|i| self.base_at(i)).collect()
    }

    fn features_in(&self, range: RangeInclusive<usize>) -> Vec<Feature>;

    fn has_features(&self) -> bool;

    fn restriction_sites_in(&self, range: RangeInclusive<usize>) -> Vec<RestrictionSite>;

    /// Per-base anchor positions of the trace, when the sequence has one.
    fn peaks(&self) -> Option<&[f64]>;

    fn trace(&self) -> Option<&TraceData>;

    fn setting(&self, path: &str) -> Option<SettingValue>;

    /// Writes a setting. A silent write does not notify listeners.
    fn set_setting(&mut self, path: &str, value: SettingValue, silent: bool);

    fn is_read_only(&self) -> bool;

    fn insert_bases(&mut self, at: usize, bases: &str) -> ModelResult<()>;

    fn delete_bases(&mut self, at: usize, count: usize) -> ModelResult<()>;

    /// Persists the model. Callers are expected to rate-limit this.
    fn save(&mut self) -> ModelResult<()>;

    fn subscribe(&mut self, topics: &[&str]) -> Subscription<ModelChange>;

    fn unsubscribe(&mut self, id: SubscriptionId);
}

/// Model handle shared between the host and the viewport.
pub type SharedModel = Rc<RefCell<dyn SequenceModel>>;

/// Serialized form of a sequence and its display state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceDocument {
    pub name: String,
    pub bases: String,
    #[serde(default)]
    pub features: Vec<Feature>,
    #[serde(default)]
    pub restriction_sites: Vec<RestrictionSite>,
    #[serde(default)]
    pub peaks: Option<Vec<f64>>,
    #[serde(default)]
    pub trace: Option<TraceData>,
    #[serde(default)]
    pub display_settings: DisplaySettings,
    #[serde(default)]
    pub read_only: bool,
}

impl SequenceDocument {
    pub fn new(name: impl Into<String>, bases: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bases: bases.into(),
            features: Vec::new(),
            restriction_sites: Vec::new(),
            peaks: None,
            trace: None,
            display_settings: DisplaySettings::default(),
            read_only: false,
        }
    }
}

/// In-memory sequence model.
#[derive(Debug)]
pub struct Sequence {
    doc: SequenceDocument,
    bases: Vec<char>,
    save_path: Option<PathBuf>,
    saves: usize,
    notifier: Notifier<ModelChange>,
}

impl Sequence {
    pub fn new(name: impl Into<String>, bases: impl Into<String>) -> Self {
        Self::from_document(SequenceDocument::new(name, bases))
    }

    pub fn from_document(doc: SequenceDocument) -> Self {
        let bases = doc.bases.chars().collect();
        Self {
            doc,
            bases,
            save_path: None,
            saves: 0,
            notifier: Notifier::new(),
        }
    }

    /// Loads a JSON sequence document; saves go back to the same file.
    pub fn load_document<P: AsRef<Path>>(path: P) -> ModelResult<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let doc: SequenceDocument = serde_json::from_str(&content)?;
        Ok(Self::from_document(doc).with_save_path(path.as_ref()))
    }

    pub fn with_save_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.save_path = Some(path.into());
        self
    }

    pub fn with_features(mut self, features: Vec<Feature>) -> Self {
        self.doc.features = features;
        self
    }

    pub fn with_restriction_sites(mut self, sites: Vec<RestrictionSite>) -> Self {
        self.doc.restriction_sites = sites;
        self
    }

    pub fn with_peaks(mut self, peaks: Vec<f64>) -> Self {
        self.doc.peaks = Some(peaks);
        self
    }

    pub fn with_trace(mut self, trace: TraceData) -> Self {
        self.doc.trace = Some(trace);
        self
    }

    pub fn read_only(mut self, read_only: bool) -> Self {
        self.doc.read_only = read_only;
        self
    }

    pub fn name(&self) -> &str {
        &self.doc.name
    }

    /// Replaces stored display settings, e.g. from a state file.
    pub fn restore_settings(&mut self, settings: DisplaySettings) {
        self.doc.display_settings = settings;
    }

    pub fn display_settings(&self) -> &DisplaySettings {
        &self.doc.display_settings
    }

    /// Current document, with the edited bases folded back in.
    pub fn document(&self) -> SequenceDocument {
        let mut doc = self.doc.clone();
        doc.bases = self.bases.iter().collect();
        doc
    }

    pub fn save_count(&self) -> usize {
        self.saves
    }

    fn check_editable(&self) -> ModelResult<()> {
        if self.doc.read_only {
            return Err(ModelError::ReadOnly);
        }
        if self.doc.peaks.is_some() {
            return Err(ModelError::TraceLocked);
        }
        Ok(())
    }

    fn shift_annotations(&mut self, at: usize, delta: isize) {
        let shift = |pos: usize| -> usize {
            if pos < at {
                pos
            } else {
                pos.saturating_add_signed(delta).max(at)
            }
        };
        for feature in &mut self.doc.features {
            feature.start = shift(feature.start);
            feature.end = shift(feature.end);
        }
        for site in &mut self.doc.restriction_sites {
            site.position = shift(site.position);
        }
    }
}

impl SequenceModel for Sequence {
    fn len(&self) -> usize {
        self.bases.len()
    }

    fn base_at(&self, index: usize) -> Option<char> {
        self.bases.get(index).copied()
    }

    fn subsequence(&self, range: Range<usize>) -> String {
        let start = range.start.min(self.bases.len());
        let end = range.end.min(self.bases.len()).max(start);
        self.bases[start..end].iter().collect()
    }

    fn features_in(&self, range: RangeInclusive<usize>) -> Vec<Feature> {
        self.doc
            .features
            .iter()
            .filter(|f| f.overlaps(&range))
            .cloned()
            .collect()
    }

    fn has_features(&self) -> bool {
        !self.doc.features.is_empty()
    }

    fn restriction_sites_in(&self, range: RangeInclusive<usize>) -> Vec<RestrictionSite> {
        self.doc
            .restriction_sites
            .iter()
            .filter(|s| range.contains(&s.position))
            .cloned()
            .collect()
    }

    fn peaks(&self) -> Option<&[f64]> {
        self.doc.peaks.as_deref()
    }

    fn trace(&self) -> Option<&TraceData> {
        self.doc.trace.as_ref()
    }

    fn setting(&self, path: &str) -> Option<SettingValue> {
        self.doc.display_settings.get(path).cloned()
    }

    fn set_setting(&mut self, path: &str, value: SettingValue, silent: bool) {
        let changed = self.doc.display_settings.set(path, value);
        if changed && !silent {
            self.notifier.notify(ModelChange::Setting(path.to_string()));
        }
    }

    fn is_read_only(&self) -> bool {
        self.doc.read_only
    }

    fn insert_bases(&mut self, at: usize, bases: &str) -> ModelResult<()> {
        self.check_editable()?;
        if at > self.bases.len() {
            return Err(ModelError::OutOfRange {
                position: at,
                len: self.bases.len(),
            });
        }
        let inserted: Vec<char> = bases.chars().collect();
        if inserted.is_empty() {
            return Ok(());
        }
        let count = inserted.len();
        self.bases.splice(at..at, inserted);
        self.shift_annotations(at, count as isize);
        self.notifier.notify(ModelChange::Sequence);
        Ok(())
    }

    fn delete_bases(&mut self, at: usize, count: usize) -> ModelResult<()> {
        self.check_editable()?;
        let end = at.saturating_add(count);
        if end > self.bases.len() {
            return Err(ModelError::OutOfRange {
                position: end,
                len: self.bases.len(),
            });
        }
        if count == 0 {
            return Ok(());
        }
        self.bases.drain(at..end);
        self.shift_annotations(at, -(count as isize));
        self.doc.features.retain(|f| f.start <= f.end);
        self.notifier.notify(ModelChange::Sequence);
        Ok(())
    }

    fn save(&mut self) -> ModelResult<()> {
        self.saves += 1;
        if let Some(path) = &self.save_path {
            let json = serde_json::to_string_pretty(&self.document())?;
            fs::write(path, json)?;
            debug!(path = %path.display(), saves = self.saves, "sequence document saved");
        }
        Ok(())
    }

    fn subscribe(&mut self, topics: &[&str]) -> Subscription<ModelChange> {
        self.notifier.subscribe(topics)
    }

    fn unsubscribe(&mut self, id: SubscriptionId) {
        self.notifier.unsubscribe(id);
    }
}
