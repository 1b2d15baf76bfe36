//! Frame-boundary scheduling.
//!
//! Redraw requests made between two frames coalesce into one pending
//! redraw; the host calls the viewport once per frame and the pending work
//! runs then. Continuations waiting for "the next redraw" are released once
//! per drawn frame, after the pixels are painted.

use std::cell::Cell;
use std::collections::BTreeSet;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Work accumulated for the next frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingRedraw {
    /// Repaint everything.
    pub full: bool,
    /// The scroll offset moved; painted pixels can be shifted.
    pub scroll: bool,
    /// Bases whose rows need repainting; ignored when `full` is set.
    pub bases: BTreeSet<usize>,
}

impl PendingRedraw {
    fn merge_full(&mut self) {
        self.full = true;
        self.bases.clear();
    }

    fn merge_base(&mut self, base: usize) {
        if !self.full {
            self.bases.insert(base);
        }
    }
}

/// Completion handle for an operation that finishes with a redraw.
#[derive(Debug, Clone, Default)]
pub struct RedrawTicket(Rc<Cell<bool>>);

impl RedrawTicket {
    pub fn new() -> Self {
        Self::default()
    }

    /// A ticket for an operation that needed no redraw.
    pub fn resolved() -> Self {
        let ticket = Self::new();
        ticket.resolve();
        ticket
    }

    pub fn resolve(&self) {
        self.0.set(true);
    }

    pub fn is_complete(&self) -> bool {
        self.0.get()
    }
}

/// Single-slot redraw queue with a waiter list per frame.
#[derive(Debug)]
pub struct FrameScheduler<W> {
    pending: Option<PendingRedraw>,
    waiters: Vec<W>,
    requests: u64,
    frames: u64,
}

impl<W> Default for FrameScheduler<W> {
    fn default() -> Self {
        Self {
            pending: None,
            waiters: Vec::new(),
            requests: 0,
            frames: 0,
        }
    }
}

impl<W> FrameScheduler<W> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_full(&mut self) {
        self.requests += 1;
        self.pending.get_or_insert_with(PendingRedraw::default).merge_full();
    }

    pub fn request_scroll(&mut self) {
        self.requests += 1;
        self.pending.get_or_insert_with(PendingRedraw::default).scroll = true;
    }

    pub fn request_partial(&mut self, base: usize) {
        self.requests += 1;
        self.pending
            .get_or_insert_with(PendingRedraw::default)
            .merge_base(base);
    }

    pub fn is_scheduled(&self) -> bool {
        self.pending.is_some()
    }

    /// Registers a continuation for the end of the next drawn frame.
    pub fn after_next_redraw(&mut self, waiter: W) {
        self.waiters.push(waiter);
    }

    pub fn waiting(&self) -> usize {
        self.waiters.len()
    }

    /// Takes the pending redraw at a frame boundary.
    pub fn begin_frame(&mut self) -> Option<PendingRedraw> {
        self.pending.take()
    }

    /// Closes a drawn frame and hands back the waiters to release.
    /// Waiters registered while they run belong to the next frame.
    pub fn finish_frame(&mut self) -> Vec<W> {
        self.frames += 1;
        std::mem::take(&mut self.waiters)
    }

    /// Redraw requests received so far.
    pub fn requests(&self) -> u64 {
        self.requests
    }

    /// Frames actually drawn so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

/// Trailing-edge debounce: fires once, `delay` after the last trigger.
#[derive(Debug, Clone)]
pub struct Debounce {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debounce {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    pub fn trigger(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// True exactly once when the deadline has passed.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }
}
