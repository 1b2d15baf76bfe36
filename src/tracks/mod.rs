//! Pluggable horizontal bands ("tracks").
//!
//! Each track paints one kind of annotation over a base range. Tracks are
//! registered once, in a fixed order, from a list of [`TrackSpec`]s (name,
//! renderer kind and options). Visibility is a declarative
//! [`VisibilityRule`] so the registry can memoize it per settings path.
//!
//! Built-in renderers:
//! - `blank`: separator
//! - `position`: base numbering at the start of each block
//! - `bases`, `complements`, `translation`: sequence text
//! - `features`: annotated spans stacked in lanes
//! - `restriction_labels`, `restriction_sites`: enzyme names and cut markers
//! - `chromatogram`: trace intensity bars

pub mod bases;
pub mod blank;
pub mod chromatogram;
pub mod features;
pub mod position;
pub mod registry;
pub mod restriction;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::caret::Selection;
use crate::coords::{CoordinateMapper, Point, ScrollAxis};
use crate::model::{ModelError, SequenceModel, SETTING_AA, SETTING_COMPLEMENTS, SETTING_FEATURES,
    SETTING_NUMBERING, SETTING_RES_DISPLAY, SETTING_SEPARATORS};
use crate::surface::Surface;

pub use registry::{TrackPlacement, TrackRegistry};

/// Errors raised by a track while laying out or painting.
#[derive(Error, Debug)]
pub enum TrackError {
    #[error("{0}")]
    Render(String),

    #[error("Missing data: {0}")]
    MissingData(String),

    #[error("Track `{0}` is already registered")]
    Duplicate(String),

    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Result type for track operations.
pub type TrackResult<T> = Result<T, TrackError>;

/// Inclusive range of base indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaseRange {
    pub start: usize,
    pub end: usize,
}

impl BaseRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, base: usize) -> bool {
        base >= self.start && base <= self.end
    }

    pub fn len(&self) -> usize {
        self.end + 1 - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> {
        self.start..=self.end
    }

    pub fn overlaps(&self, start: usize, end: usize) -> bool {
        start <= self.end && end >= self.start
    }
}

/// When a track is shown.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisibilityRule {
    #[default]
    Always,
    Never,
    /// Shown while the setting at this path is truthy.
    Setting(String),
    /// Shown while the sequence has at least one feature.
    HasFeatures,
    /// Shown while the sequence carries trace data.
    HasTrace,
    All(Vec<VisibilityRule>),
}

impl VisibilityRule {
    pub fn setting(path: &str) -> Self {
        VisibilityRule::Setting(path.to_string())
    }

    pub fn evaluate(&self, model: &dyn SequenceModel) -> bool {
        match self {
            VisibilityRule::Always => true,
            VisibilityRule::Never => false,
            VisibilityRule::Setting(path) => model.setting(path).is_some_and(|v| v.is_truthy()),
            VisibilityRule::HasFeatures => model.has_features(),
            VisibilityRule::HasTrace => model.trace().is_some() || model.peaks().is_some(),
            VisibilityRule::All(rules) => rules.iter().all(|rule| rule.evaluate(model)),
        }
    }

    /// Whether a change notification on `topic` can change this rule's value.
    pub fn depends_on(&self, topic: &str) -> bool {
        match self {
            VisibilityRule::Always | VisibilityRule::Never => false,
            VisibilityRule::Setting(path) => path == topic,
            VisibilityRule::HasFeatures => topic == "features" || topic.starts_with("features."),
            VisibilityRule::HasTrace => topic == "sequence",
            VisibilityRule::All(rules) => rules.iter().any(|rule| rule.depends_on(topic)),
        }
    }
}

/// Renderer used for a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackKind {
    Blank,
    Position,
    Bases,
    Complements,
    Translation,
    Features,
    RestrictionLabels,
    RestrictionSites,
    Chromatogram,
}

/// Renderer options. Unused fields are ignored by a given renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackOptions {
    /// Fixed height.
    pub height: f64,
    /// Height of one lane for tracks with a computed height.
    pub unit_height: f64,
    pub visible: VisibilityRule,
    pub floating: bool,
    /// Offset of a floating track from the top of its row.
    pub floating_origin: f64,
    /// Paint the selection behind this track's text.
    pub show_selection: bool,
}

impl Default for TrackOptions {
    fn default() -> Self {
        Self {
            height: 15.0,
            unit_height: 15.0,
            visible: VisibilityRule::Always,
            floating: false,
            floating_origin: 0.0,
            show_selection: false,
        }
    }
}

/// Initial configuration of one track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackSpec {
    pub name: String,
    pub kind: TrackKind,
    #[serde(default)]
    pub options: TrackOptions,
}

impl TrackSpec {
    pub fn new(name: &str, kind: TrackKind, options: TrackOptions) -> Self {
        Self {
            name: name.to_string(),
            kind,
            options,
        }
    }

    /// Default stack for pixel geometry (15px text lines).
    pub fn canvas_defaults() -> Vec<TrackSpec> {
        Self::default_stack(&StackMetrics {
            line: 15.0,
            top_separator: 5.0,
            bottom_separator: 10.0,
            chromatogram: 100.0,
            lane: 15.0,
            label: 10.0,
        })
    }

    /// Default stack for character cells (one line per text track).
    pub fn terminal_defaults() -> Vec<TrackSpec> {
        Self::default_stack(&StackMetrics {
            line: 1.0,
            top_separator: 1.0,
            bottom_separator: 1.0,
            chromatogram: 4.0,
            lane: 1.0,
            label: 1.0,
        })
    }

    fn default_stack(m: &StackMetrics) -> Vec<TrackSpec> {
        let fixed = |height: f64, visible: VisibilityRule| TrackOptions {
            height,
            visible,
            ..TrackOptions::default()
        };
        vec![
            TrackSpec::new(
                "topSeparator",
                TrackKind::Blank,
                fixed(m.top_separator, VisibilityRule::setting(SETTING_SEPARATORS)),
            ),
            TrackSpec::new(
                "restrictionEnzymesLabels",
                TrackKind::RestrictionLabels,
                TrackOptions {
                    unit_height: m.label,
                    visible: VisibilityRule::setting(SETTING_RES_DISPLAY),
                    ..TrackOptions::default()
                },
            ),
            TrackSpec::new(
                "position",
                TrackKind::Position,
                fixed(m.line, VisibilityRule::setting(SETTING_NUMBERING)),
            ),
            TrackSpec::new(
                "chromatogram",
                TrackKind::Chromatogram,
                fixed(m.chromatogram, VisibilityRule::HasTrace),
            ),
            TrackSpec::new(
                "aa",
                TrackKind::Translation,
                fixed(m.line, VisibilityRule::setting(SETTING_AA)),
            ),
            TrackSpec::new(
                "dna",
                TrackKind::Bases,
                TrackOptions {
                    height: m.line,
                    show_selection: true,
                    ..TrackOptions::default()
                },
            ),
            TrackSpec::new(
                "complements",
                TrackKind::Complements,
                fixed(m.line, VisibilityRule::setting(SETTING_COMPLEMENTS)),
            ),
            TrackSpec::new(
                "features",
                TrackKind::Features,
                TrackOptions {
                    unit_height: m.lane,
                    visible: VisibilityRule::All(vec![
                        VisibilityRule::HasFeatures,
                        VisibilityRule::setting(SETTING_FEATURES),
                    ]),
                    ..TrackOptions::default()
                },
            ),
            TrackSpec::new(
                "bottomSeparator",
                TrackKind::Blank,
                fixed(m.bottom_separator, VisibilityRule::setting(SETTING_SEPARATORS)),
            ),
            TrackSpec::new(
                "restrictionEnzymeSites",
                TrackKind::RestrictionSites,
                TrackOptions {
                    floating: true,
                    visible: VisibilityRule::setting(SETTING_RES_DISPLAY),
                    ..TrackOptions::default()
                },
            ),
        ]
    }
}

struct StackMetrics {
    line: f64,
    top_separator: f64,
    bottom_separator: f64,
    chromatogram: f64,
    lane: f64,
    label: f64,
}

/// Inputs available to computed-height hooks.
pub struct LayoutContext<'a> {
    pub model: &'a dyn SequenceModel,
    pub bases_per_row: usize,
}

/// Read-only state handed to a track for one draw call.
pub struct DrawContext<'a> {
    pub model: &'a dyn SequenceModel,
    pub mapper: &'a CoordinateMapper,
    pub selection: Option<Selection>,
    pub scroll_offset: f64,
    pub row_height: f64,
}

impl DrawContext<'_> {
    /// Screen x of a base.
    pub fn base_x(&self, base: usize) -> f64 {
        let x = self
            .mapper
            .pixel_from_base(base)
            .map(|p| p.x)
            .unwrap_or_default();
        match self.mapper.axis() {
            ScrollAxis::Vertical => x,
            ScrollAxis::Horizontal => x - self.scroll_offset,
        }
    }

    pub fn base_width(&self) -> f64 {
        self.mapper.geometry().base_width
    }

    pub fn is_selected(&self, base: usize) -> bool {
        self.selection.is_some_and(|s| s.contains(base))
    }
}

/// A horizontal band of the view.
pub trait Track {
    fn kind(&self) -> TrackKind;

    fn height(&self) -> f64;

    /// Recomputes a content-dependent height during layout.
    fn calculate_height(&mut self, _ctx: &LayoutContext) {}

    fn floating(&self) -> bool {
        false
    }

    /// Vertical offset of a floating track from the top of its row.
    fn floating_origin(&self) -> f64 {
        0.0
    }

    /// Paints `range` with the track's top-left corner at `origin` (screen).
    fn draw(
        &mut self,
        surface: &mut dyn Surface,
        ctx: &DrawContext,
        origin: Point,
        range: BaseRange,
    ) -> TrackResult<()>;

    /// Drops internal caches; called on every layout change.
    fn clear_cache(&mut self) {}
}

/// Instantiates the renderer named by a spec.
pub fn build_track(spec: &TrackSpec) -> Box<dyn Track> {
    let options = &spec.options;
    match spec.kind {
        TrackKind::Blank => Box::new(blank::BlankTrack::new(options.height)),
        TrackKind::Position => Box::new(position::PositionTrack::new(options.height)),
        TrackKind::Bases => Box::new(bases::BasesTrack::forward(options.height, options.show_selection)),
        TrackKind::Complements => {
            Box::new(bases::BasesTrack::complements(options.height, options.show_selection))
        }
        TrackKind::Translation => Box::new(bases::BasesTrack::translation(options.height)),
        TrackKind::Features => Box::new(features::FeaturesTrack::new(options.unit_height)),
        TrackKind::RestrictionLabels => {
            Box::new(restriction::RestrictionLabelsTrack::new(options.unit_height))
        }
        TrackKind::RestrictionSites => Box::new(restriction::RestrictionSitesTrack::new(
            options.floating_origin,
        )),
        TrackKind::Chromatogram => Box::new(chromatogram::ChromatogramTrack::new(options.height)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Feature, Sequence, SettingValue};

    #[test]
    fn test_visibility_rules() {
        let mut seq = Sequence::new("s", "ACGT");
        assert!(VisibilityRule::Always.evaluate(&seq));
        assert!(!VisibilityRule::Never.evaluate(&seq));
        assert!(VisibilityRule::setting(SETTING_NUMBERING).evaluate(&seq));
        assert!(!VisibilityRule::HasFeatures.evaluate(&seq));
        assert!(!VisibilityRule::HasTrace.evaluate(&seq));

        seq.set_setting(SETTING_AA, SettingValue::from("short"), true);
        assert!(VisibilityRule::setting(SETTING_AA).evaluate(&seq));

        let seq = seq.with_features(vec![Feature {
            name: "f".to_string(),
            kind: "gene".to_string(),
            start: 0,
            end: 1,
        }]);
        let rule = VisibilityRule::All(vec![
            VisibilityRule::HasFeatures,
            VisibilityRule::setting(SETTING_FEATURES),
        ]);
        assert!(rule.evaluate(&seq));
    }

    #[test]
    fn test_visibility_dependencies() {
        let rule = VisibilityRule::All(vec![
            VisibilityRule::HasFeatures,
            VisibilityRule::setting(SETTING_FEATURES),
        ]);
        assert!(rule.depends_on(SETTING_FEATURES));
        assert!(rule.depends_on("features"));
        assert!(!rule.depends_on(SETTING_NUMBERING));
        assert!(!VisibilityRule::Always.depends_on("sequence"));
    }

    #[test]
    fn test_default_stack_order() {
        let names: Vec<String> = TrackSpec::canvas_defaults()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names.first().map(String::as_str), Some("topSeparator"));
        assert_eq!(names.last().map(String::as_str), Some("restrictionEnzymeSites"));
        assert!(names.iter().any(|n| n == "dna"));
    }

    #[test]
    fn test_track_spec_from_json() {
        let json = r#"[
            {"name": "ruler", "kind": "position", "options": {"height": 2, "visible": {"setting": "displaySettings.rows.numbering"}}},
            {"name": "dna", "kind": "bases"}
        ]"#;
        let specs: Vec<TrackSpec> = serde_json::from_str(json).unwrap();
        assert_eq!(specs[0].kind, TrackKind::Position);
        assert_eq!(specs[0].options.height, 2.0);
        assert_eq!(specs[0].options.visible, VisibilityRule::setting(SETTING_NUMBERING));
        assert_eq!(specs[1].options, TrackOptions::default());
    }

    #[test]
    fn test_base_range() {
        let range = BaseRange::new(3, 7);
        assert_eq!(range.len(), 5);
        assert!(range.contains(7));
        assert!(!range.contains(8));
        assert!(range.overlaps(7, 12));
        assert!(!range.overlaps(8, 12));
        assert_eq!(range.iter().count(), 5);
    }
}
