//! Button debounce and edge detection
//!
//! One [`Debouncer`] per physical input. Each scan feeds the raw level
//! in and gets back at most one [`Edge`]: short-click and long-press
//! are mutually exclusive outcomes of a single hold, decided only once
//! the hold is released or the threshold is crossed, so downstream
//! logic never sees both for one gesture.
//!
//! Buttons are wired with pull-ups, so "pressed" is the low level.
//! Time is passed in by the caller, which keeps the state machine
//! deterministic under test.

use std::time::{Duration, Instant};

/// One-shot result of a single scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    /// Nothing happened this scan.
    None,
    /// Short click: the button was released before the long-press
    /// threshold.
    Pressed,
    /// The button was released after a long press already fired.
    Released,
    /// The hold crossed the long-press threshold. Fires at most once
    /// per hold; the eventual release yields [`Edge::Released`], not a
    /// second click.
    LongPressed,
}

/// Debounce filter plus press/long-press tracking for one input.
pub struct Debouncer {
    debounce: Duration,
    long_press: Duration,
    /// Committed (debounced) level; true while pressed.
    stable_down: bool,
    last_raw_down: bool,
    last_change: Instant,
    pressed_at: Instant,
    long_fired: bool,
    suppress_release: bool,
}

impl Debouncer {
    pub fn new(debounce: Duration, long_press: Duration, now: Instant) -> Self {
        Self {
            debounce,
            long_press,
            stable_down: false,
            last_raw_down: false,
            last_change: now,
            pressed_at: now,
            long_fired: false,
            suppress_release: false,
        }
    }

    /// Feed one raw reading. `raw_down` is the electrical "pressed"
    /// level after pull-up inversion. Callers must poll every scan
    /// cycle; the returned edge is true for exactly this cycle.
    pub fn poll(&mut self, raw_down: bool, now: Instant) -> Edge {
        // Any flicker restarts the debounce window.
        if raw_down != self.last_raw_down {
            self.last_change = now;
        }

        let mut edge = Edge::None;

        if now.duration_since(self.last_change) > self.debounce && raw_down != self.stable_down {
            self.stable_down = raw_down;
            if raw_down {
                self.pressed_at = now;
                self.long_fired = false;
                self.suppress_release = false;
            } else {
                edge = if self.suppress_release {
                    Edge::Released
                } else {
                    Edge::Pressed
                };
            }
        }

        // Long-press check runs on every scan while held, not just on
        // level transitions.
        if self.stable_down
            && !self.long_fired
            && now.duration_since(self.pressed_at) > self.long_press
        {
            self.long_fired = true;
            self.suppress_release = true;
            edge = Edge::LongPressed;
        }

        self.last_raw_down = raw_down;
        edge
    }

    /// Debounced "currently held" predicate, useful for continuous
    /// scroll behaviors.
    pub fn is_down(&self) -> bool {
        self.stable_down
    }
}
