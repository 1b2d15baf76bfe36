//! Rate-limited write-back of display state to the sequence model.
//!
//! The first change after a quiet period is saved immediately; further
//! changes inside the interval are folded into one trailing save.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::model::{ModelResult, SequenceModel, SettingValue, SETTING_SCROLL_OFFSET};

#[derive(Debug)]
pub struct PersistenceBridge {
    interval: Duration,
    last_flush: Option<Instant>,
    dirty: bool,
    flushes: usize,
}

impl PersistenceBridge {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_flush: None,
            dirty: false,
            flushes: 0,
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn flushes(&self) -> usize {
        self.flushes
    }

    /// Stores the scroll offset without notifying listeners; the save
    /// happens on the next due [`poll`](Self::poll).
    pub fn stage_offset(&mut self, model: &mut dyn SequenceModel, offset: f64) {
        model.set_setting(SETTING_SCROLL_OFFSET, SettingValue::Number(offset), true);
        self.mark_dirty();
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Saves if something is pending and the interval has elapsed.
    pub fn poll(&mut self, model: &mut dyn SequenceModel, now: Instant) -> ModelResult<bool> {
        if !self.dirty {
            return Ok(false);
        }
        let due = self
            .last_flush
            .map_or(true, |last| now.duration_since(last) >= self.interval);
        if !due {
            return Ok(false);
        }
        self.save(model, now)?;
        Ok(true)
    }

    /// Saves pending state regardless of the interval.
    pub fn flush(&mut self, model: &mut dyn SequenceModel, now: Instant) -> ModelResult<()> {
        if self.dirty {
            self.save(model, now)?;
        }
        Ok(())
    }

    /// A failed save keeps the state pending; the attempt still counts
    /// towards the interval so retries are rate-limited too.
    fn save(&mut self, model: &mut dyn SequenceModel, now: Instant) -> ModelResult<()> {
        self.last_flush = Some(now);
        model.save()?;
        self.dirty = false;
        self.flushes += 1;
        debug!(flushes = self.flushes, "display state persisted");
        Ok(())
    }
}
