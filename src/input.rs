//! Normalizes drag and wheel input into scroll-target updates, and snaps the
//! target to a tile boundary once a gesture settles.
//!
//! Time is injected as `Instant`s rather than read from a clock so the
//! wheel-settle window is testable; the host calls `poll` once per frame.

use std::time::{Duration, Instant};

use crate::scroll::ScrollState;

#[derive(Debug, Clone, Copy)]
struct DragGesture {
    start_x: f32,
    origin: f32,
}

#[derive(Debug)]
pub struct InputController {
    drag: Option<DragGesture>,
    wheel_deadline: Option<Instant>,
    drag_sensitivity: f32,
    wheel_step: f32,
    wheel_settle: Duration,
    tile_width: f32,
    item_count: usize,
}

impl InputController {
    pub fn new(drag_sensitivity: f32, wheel_step: f32, wheel_settle: Duration) -> Self {
        Self {
            drag: None,
            wheel_deadline: None,
            drag_sensitivity,
            wheel_step,
            wheel_settle,
            tile_width: 0.0,
            item_count: 0,
        }
    }

    /// Refresh the slot pitch after a resize or reconstruction. A zero width
    /// or empty list turns every input operation into a no-op.
    pub fn set_layout(&mut self, tile_width: f32, item_count: usize) {
        self.tile_width = tile_width;
        self.item_count = item_count;
    }

    fn enabled(&self) -> bool {
        self.tile_width > 0.0 && self.item_count > 0
    }

    pub fn begin_drag(&mut self, x: f32, scroll: &ScrollState) {
        if !self.enabled() {
            return;
        }
        self.drag = Some(DragGesture {
            start_x: x,
            origin: scroll.current(),
        });
    }

    pub fn drag_to(&mut self, x: f32, scroll: &mut ScrollState) {
        let Some(gesture) = self.drag else {
            return;
        };
        scroll.set_target(gesture.origin + (gesture.start_x - x) * self.drag_sensitivity);
    }

    pub fn end_drag(&mut self, scroll: &mut ScrollState) {
        if self.drag.take().is_some() {
            self.snap(scroll);
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// A wheel event nudges the target by one fixed step in the delta's
    /// direction and re-arms the settle deadline. Snapping is deferred until
    /// the deadline passes quietly, so trackpads that emit bursts of small
    /// deltas do not snap mid-scroll.
    pub fn wheel(&mut self, delta: f32, scroll: &mut ScrollState, now: Instant) {
        if !self.enabled() || delta == 0.0 {
            return;
        }
        let step = if delta > 0.0 {
            self.wheel_step
        } else {
            -self.wheel_step
        };
        scroll.nudge_target(step);
        self.wheel_deadline = Some(now + self.wheel_settle);
    }

    /// Called once per frame; runs the deferred snap once the wheel has been
    /// quiet past its deadline.
    pub fn poll(&mut self, scroll: &mut ScrollState, now: Instant) {
        if let Some(deadline) = self.wheel_deadline {
            if now >= deadline {
                self.wheel_deadline = None;
                self.snap(scroll);
            }
        }
    }

    /// Align the target to the nearest tile boundary. Rounding is half away
    /// from zero (`f32::round`). Idempotent: a snapped target re-snaps to
    /// itself.
    pub fn snap(&mut self, scroll: &mut ScrollState) {
        if !self.enabled() {
            return;
        }
        let target = scroll.target();
        let index = (target.abs() / self.tile_width).round();
        scroll.set_target(target.signum() * index * self.tile_width);
    }

    /// Drops any in-progress gesture and the settle deadline; part of
    /// carousel teardown so no deferred snap fires into a disposed engine.
    pub fn cancel(&mut self) {
        self.drag = None;
        self.wheel_deadline = None;
    }
}
