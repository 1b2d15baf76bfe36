//! Caret and selection state machine.
//!
//! The caret is a slot between bases: `0` is before the first base and the
//! sequence length is after the last one. A selection is an inclusive base
//! range. The controller only decides state and how much of the view has
//! to be repainted; the viewport does the painting.
//!
//! ```text
//! NoCaret --move/select--> CaretOnly --shift/drag--> Selecting --release--> Selected
//!    ^                         ^                                                |
//!    +-------- clear ----------+---------------- move_caret --------------------+
//! ```

use crate::coords::{CoordinateMapper, Point, Regime};
use crate::tracks::position::format_thousands;

/// Bases accepted from typed or pasted input.
pub const ALLOWED_INPUT: [char; 4] = ['A', 'C', 'G', 'T'];

/// Inclusive selected base range; `start <= end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub start: usize,
    pub end: usize,
}

impl Selection {
    /// Builds a selection from bounds given in any order.
    pub fn new(a: usize, b: usize) -> Self {
        Self {
            start: a.min(b),
            end: a.max(b),
        }
    }

    pub fn contains(&self, base: usize) -> bool {
        base >= self.start && base <= self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    pub fn is_single(&self) -> bool {
        self.start == self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaretState {
    NoCaret,
    CaretOnly,
    /// Live selection being dragged from the `anchor` slot.
    Selecting { anchor: usize },
    Selected,
}

/// How much of the view a caret/selection change needs repainted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedrawScope {
    Nothing,
    /// Only the row holding this base.
    Partial { base: usize },
    Full,
}

/// Repaint needed to go from `old` to `new`: a partial redraw when exactly
/// one edge moved by exactly one base, a full redraw otherwise.
pub fn redraw_scope(old: Option<Selection>, new: Option<Selection>) -> RedrawScope {
    match (old, new) {
        (None, None) => RedrawScope::Nothing,
        (Some(old), Some(new)) if old == new => RedrawScope::Nothing,
        (Some(old), Some(new)) => {
            if old.start == new.start && old.end.abs_diff(new.end) == 1 {
                RedrawScope::Partial {
                    base: old.end.max(new.end),
                }
            } else if old.end == new.end && old.start.abs_diff(new.start) == 1 {
                RedrawScope::Partial {
                    base: old.start.min(new.start),
                }
            } else {
                RedrawScope::Full
            }
        }
        _ => RedrawScope::Full,
    }
}

#[derive(Debug)]
pub struct CaretController {
    caret: Option<usize>,
    selection: Option<Selection>,
    state: CaretState,
    sequence_len: usize,
    /// Caret placed at a row end: drawn after the previous row's last base.
    trailing: bool,
}

impl CaretController {
    pub fn new(sequence_len: usize) -> Self {
        Self {
            caret: None,
            selection: None,
            state: CaretState::NoCaret,
            sequence_len,
            trailing: false,
        }
    }

    pub fn caret(&self) -> Option<usize> {
        self.caret
    }

    pub fn selection(&self) -> Option<Selection> {
        self.selection
    }

    pub fn state(&self) -> CaretState {
        self.state
    }

    pub fn sequence_len(&self) -> usize {
        self.sequence_len
    }

    /// Whether the caret belongs with the base before its slot: right after
    /// a selection, or placed at a row end.
    pub fn caret_trails(&self) -> bool {
        match self.caret {
            Some(slot) => self.trailing || self.selection.is_some_and(|s| s.end + 1 == slot),
            None => false,
        }
    }

    /// Tracks a sequence length change; caret and selection are clamped.
    pub fn set_sequence_len(&mut self, len: usize) {
        self.sequence_len = len;
        if let Some(caret) = self.caret {
            self.caret = Some(caret.min(len));
        }
        if let Some(selection) = self.selection {
            if len == 0 || selection.start >= len {
                self.selection = None;
                if self.state == CaretState::Selected {
                    self.state = CaretState::CaretOnly;
                }
            } else {
                self.selection = Some(Selection::new(selection.start, selection.end.min(len - 1)));
            }
        }
    }

    /// Drops caret and selection (blur or explicit deselect).
    pub fn clear(&mut self) -> RedrawScope {
        let scope = redraw_scope(self.selection, None);
        self.caret = None;
        self.selection = None;
        self.state = CaretState::NoCaret;
        self.trailing = false;
        scope
    }

    /// Places the caret, dropping any selection.
    pub fn move_caret(&mut self, slot: usize) -> RedrawScope {
        let scope = redraw_scope(self.selection, None);
        self.selection = None;
        self.caret = Some(slot.min(self.sequence_len));
        self.state = CaretState::CaretOnly;
        self.trailing = false;
        scope
    }

    /// Places the caret at `slot` as the end of the row before it, so a
    /// slot that starts a row is drawn at the end of the previous one.
    pub fn move_caret_to_row_end(&mut self, slot: usize) -> RedrawScope {
        let scope = self.move_caret(slot);
        self.trailing = self.caret.is_some_and(|c| c > 0);
        scope
    }

    /// Selects `[min(a, b), max(a, b)]` and puts the caret after it.
    /// `None` clears the selection and the caret.
    pub fn select(&mut self, bounds: Option<(usize, usize)>) -> RedrawScope {
        self.trailing = false;
        let Some((a, b)) = bounds else {
            let scope = redraw_scope(self.selection, None);
            self.selection = None;
            self.caret = None;
            self.state = CaretState::NoCaret;
            return scope;
        };
        let last = self.sequence_len.saturating_sub(1);
        let selection = Selection::new(a.min(last), b.min(last));
        let scope = redraw_scope(self.selection, Some(selection));
        self.selection = Some(selection);
        self.caret = Some((selection.end + 1).min(self.sequence_len));
        self.state = CaretState::Selected;
        scope
    }

    pub fn select_all(&mut self) -> RedrawScope {
        if self.sequence_len == 0 {
            return RedrawScope::Nothing;
        }
        self.select(Some((0, self.sequence_len - 1)))
    }

    /// Grows or shrinks the selection relative to the previous caret.
    ///
    /// A single-base selection that the move steps back over is cleared.
    /// Otherwise the side `new_caret` lies on moves and the opposite edge is
    /// kept, except when the caret was already past that side, in which
    /// case the far edge is trimmed instead.
    pub fn expand_selection_to_new_caret(&mut self, new_caret: usize) -> RedrawScope {
        let new_caret = new_caret.min(self.sequence_len);
        let previous = self.caret.unwrap_or(new_caret);
        let Some(Selection { start, end }) = self.selection else {
            return self.select_between(previous, new_caret);
        };

        let neutralized = start == end
            && ((previous > start && new_caret == start)
                || (previous == start && new_caret == start + 1));
        if neutralized {
            let scope = redraw_scope(self.selection, None);
            self.selection = None;
            self.caret = Some(new_caret);
            self.state = CaretState::CaretOnly;
            self.trailing = false;
            return scope;
        }

        let (a, b) = if new_caret > start {
            if previous <= start {
                (new_caret, end)
            } else if new_caret > end {
                (start, new_caret)
            } else {
                (start, new_caret.saturating_sub(1))
            }
        } else if previous <= end && new_caret < end {
            (new_caret, end)
        } else {
            (new_caret, end.saturating_sub(1))
        };
        let scope = self.select(Some((a, b)));
        if let Some(selection) = self.selection {
            if selection.start == new_caret {
                self.caret = Some(new_caret);
            }
        }
        scope
    }

    /// Selection between the caret slot and `slot`; the caret ends at `slot`.
    fn select_between(&mut self, from: usize, slot: usize) -> RedrawScope {
        if from == slot {
            return self.move_caret(slot);
        }
        let (a, b) = if slot > from { (from, slot - 1) } else { (slot, from - 1) };
        let scope = self.select(Some((a, b)));
        self.caret = Some(slot);
        scope
    }

    fn caret_on_left(&self) -> bool {
        matches!((self.selection, self.caret), (Some(s), Some(c)) if c == s.start)
    }

    /// Slot the selection is anchored at (the edge opposite the caret).
    fn anchor_slot(&self) -> Option<usize> {
        let selection = self.selection?;
        Some(if self.caret_on_left() {
            selection.end + 1
        } else {
            selection.start
        })
    }

    /// Shift+Right: one base further right.
    pub fn extend_right(&mut self) -> RedrawScope {
        let Some(caret) = self.caret else {
            return RedrawScope::Nothing;
        };
        if self.selection.is_none() {
            if caret >= self.sequence_len {
                return RedrawScope::Nothing;
            }
            return self.select(Some((caret, caret)));
        }
        let target = if self.caret_on_left() { caret + 1 } else { caret };
        if target >= self.sequence_len && !self.caret_on_left() {
            return RedrawScope::Nothing;
        }
        self.expand_selection_to_new_caret(target)
    }

    /// Shift+Left: one base further left.
    pub fn extend_left(&mut self) -> RedrawScope {
        let Some(caret) = self.caret else {
            return RedrawScope::Nothing;
        };
        if caret == 0 {
            return RedrawScope::Nothing;
        }
        if self.selection.is_none() {
            let scope = self.select(Some((caret - 1, caret - 1)));
            self.caret = Some(caret - 1);
            return scope;
        }
        self.expand_selection_to_new_caret(caret - 1)
    }

    /// Moves the caret to `slot` keeping the selection anchored at its
    /// opposite edge (shift+click, shift+up/down).
    pub fn extend_to(&mut self, slot: usize) -> RedrawScope {
        let slot = slot.min(self.sequence_len);
        match self.anchor_slot().or(self.caret) {
            Some(anchor) => self.select_between(anchor, slot),
            None => self.move_caret(slot),
        }
    }

    /// Pointer down: caret at `slot`, ready to drag a selection.
    pub fn begin_selection(&mut self, slot: usize) -> RedrawScope {
        let scope = self.move_caret(slot);
        self.state = CaretState::Selecting {
            anchor: slot.min(self.sequence_len),
        };
        scope
    }

    /// Pointer drag: live selection from the anchor to `slot`.
    pub fn update_selection(&mut self, slot: usize) -> RedrawScope {
        let CaretState::Selecting { anchor } = self.state else {
            return RedrawScope::Nothing;
        };
        let scope = self.select_between(anchor, slot.min(self.sequence_len));
        self.state = CaretState::Selecting { anchor };
        scope
    }

    /// Pointer release: the live selection becomes final.
    pub fn finish_selection(&mut self) {
        if let CaretState::Selecting { .. } = self.state {
            self.state = if self.selection.is_some() {
                CaretState::Selected
            } else {
                CaretState::CaretOnly
            };
        }
    }

    /// Status label: caret slot, or selection bounds and size (1-based).
    pub fn caret_info(&self) -> String {
        match (self.selection, self.caret) {
            (Some(selection), _) if selection.is_single() => {
                format!("{} (1 bp)", format_thousands(selection.start + 1))
            }
            (Some(selection), _) => format!(
                "{} to {} ({} bp)",
                format_thousands(selection.start + 1),
                format_thousands(selection.end + 1),
                format_thousands(selection.len())
            ),
            (None, Some(caret)) => format_thousands(caret + 1),
            (None, None) => String::new(),
        }
    }
}

/// Uppercases pasted text and keeps only the accepted bases.
pub fn clean_pasted_text(text: &str) -> String {
    text.chars()
        .map(|c| c.to_ascii_uppercase())
        .filter(|c| ALLOWED_INPUT.contains(c))
        .collect()
}

/// Content-space position of the caret slot (top of its row).
///
/// A trailing caret (see [`CaretController::caret_trails`]) on a row
/// boundary, or a caret after the last base when it ends a row, is drawn
/// past the end of that row instead of at the start of the next one. In the peak-indexed regime the caret sits half a
/// base before the peak.
pub fn caret_point(
    mapper: &CoordinateMapper,
    slot: usize,
    trailing: bool,
) -> Option<Point> {
    let geometry = mapper.geometry();
    match mapper.regime() {
        Regime::Peaks(_) => {
            let point = mapper.pixel_from_base(slot).ok()?;
            Some(Point::new(point.x - geometry.base_width / 2.0, point.y))
        }
        Regime::Uniform => {
            let per_row = geometry.bases_per_row.max(1);
            let after_row_end = slot > 0
                && slot % per_row == 0
                && (trailing || slot == mapper.sequence_len());
            if after_row_end {
                let previous = mapper.pixel_from_base(slot - 1).ok()?;
                Some(Point::new(previous.x + geometry.base_width, previous.y))
            } else {
                mapper.pixel_from_base(slot).ok()
            }
        }
    }
}
