// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Input routing from host events to native-core entry points.
//
// Pointer moves are coalesced: only the latest position is delivered, once
// per animation frame. Every other pointer or key event is delivered at once,
// after flushing any pending move so the core sees events in order. Resize is
// debounced by a quiescence window and the final size always lands.

use std::time::{Duration, Instant};

use sheetbridge_core::types::{KeyEventKind, Modifiers, MouseEventKind, WheelDeltaMode};
use tracing::debug;

use crate::traits::{HostAssets, HostEvents};

pub const WHEEL_LINE_DELTA: f64 = 20.0;
pub const WHEEL_PAGE_DELTA: f64 = 400.0;

/// Keys whose browser default is suppressed when pressed with Ctrl/Cmd.
const SHORTCUT_KEYS: [&str; 11] = ["s", "o", "n", "w", "z", "y", "x", "c", "v", "a", "f"];

/// Pinch distance change is scaled by this factor into a wheel delta.
const PINCH_SCALE: f64 = 2.0;

/// An event ready for the native core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeEvent {
    Mouse {
        kind: MouseEventKind,
        x: i32,
        y: i32,
        modifiers: Modifiers,
    },
    Key {
        kind: KeyEventKind,
        key_code: u32,
        modifiers: Modifiers,
    },
    Resize {
        width: u32,
        height: u32,
    },
}

/// Scale a wheel delta to pixels and round.
pub fn normalize_wheel(delta: f64, mode: WheelDeltaMode) -> i32 {
    let scaled = match mode {
        WheelDeltaMode::Pixel => delta,
        WheelDeltaMode::Line => delta * WHEEL_LINE_DELTA,
        WheelDeltaMode::Page => delta * WHEEL_PAGE_DELTA,
    };
    scaled.round() as i32
}

/// Whether the host's default action for `key` should be prevented, so
/// application shortcuts (save, open, undo, ...) reach the core instead.
pub fn suppresses_default(key: &str, modifiers: Modifiers) -> bool {
    modifiers.command() && SHORTCUT_KEYS.contains(&key.to_lowercase().as_str())
}

#[derive(Debug, Default)]
struct TouchState {
    last: (i32, i32),
    pinching: bool,
    pinch_distance: f64,
}

#[derive(Debug)]
pub struct InputRouter {
    pending_move: Option<(i32, i32, Modifiers)>,
    frame_requested: bool,
    pending_resize: Option<(u32, u32)>,
    last_resize_at: Option<Instant>,
    timer_armed: bool,
    debounce: Duration,
    touch: TouchState,
}

impl InputRouter {
    pub fn new(debounce: Duration) -> Self {
        Self {
            pending_move: None,
            frame_requested: false,
            pending_resize: None,
            last_resize_at: None,
            timer_armed: false,
            debounce,
            touch: TouchState::default(),
        }
    }

    // -- pointer ------------------------------------------------------------

    /// Record a move; it is delivered by the next `on_frame`.
    pub fn pointer_move<A: HostAssets + ?Sized>(&mut self, assets: &mut A, x: i32, y: i32, modifiers: Modifiers) {
        self.pending_move = Some((x, y, modifiers));
        if !self.frame_requested {
            self.frame_requested = true;
            assets.request_animation_frame();
        }
    }

    /// The coalesced move for this frame, if any.
    pub fn on_frame(&mut self) -> Option<NativeEvent> {
        self.frame_requested = false;
        self.take_move()
    }

    pub fn pointer_button(&mut self, kind: MouseEventKind, x: i32, y: i32, modifiers: Modifiers) -> Vec<NativeEvent> {
        self.immediate(NativeEvent::Mouse { kind, x, y, modifiers })
    }

    /// Wheel events carry the normalised delta in `x` and zero in `y`.
    pub fn wheel(&mut self, delta: f64, mode: WheelDeltaMode, modifiers: Modifiers) -> Vec<NativeEvent> {
        self.immediate(NativeEvent::Mouse {
            kind: MouseEventKind::Wheel,
            x: normalize_wheel(delta, mode),
            y: 0,
            modifiers,
        })
    }

    pub fn key(&mut self, kind: KeyEventKind, key_code: u32, modifiers: Modifiers) -> Vec<NativeEvent> {
        self.immediate(NativeEvent::Key {
            kind,
            key_code,
            modifiers,
        })
    }

    // -- touch --------------------------------------------------------------

    /// One finger presses; two fingers start a pinch.
    pub fn touch_start(&mut self, touches: &[(i32, i32)]) -> Vec<NativeEvent> {
        match touches {
            [p] => {
                self.touch = TouchState {
                    last: *p,
                    ..TouchState::default()
                };
                self.pointer_button(MouseEventKind::Down, p.0, p.1, Modifiers::default())
            }
            [a, b, ..] => {
                self.touch.pinching = true;
                self.touch.pinch_distance = distance(*a, *b);
                Vec::new()
            }
            [] => Vec::new(),
        }
    }

    /// One finger drags like a pointer move; a pinch becomes wheel scrolling.
    pub fn touch_move<A: HostAssets + ?Sized>(&mut self, assets: &mut A, touches: &[(i32, i32)]) -> Vec<NativeEvent> {
        match touches {
            [p] if !self.touch.pinching => {
                self.touch.last = *p;
                self.pointer_move(assets, p.0, p.1, Modifiers::default());
                Vec::new()
            }
            [a, b, ..] => {
                let d = distance(*a, *b);
                let delta = (self.touch.pinch_distance - d) * PINCH_SCALE;
                self.touch.pinch_distance = d;
                self.wheel(delta, WheelDeltaMode::Pixel, Modifiers::default())
            }
            _ => Vec::new(),
        }
    }

    /// Lifting the last finger releases at the last single-touch position.
    pub fn touch_end(&mut self, remaining: usize) -> Vec<NativeEvent> {
        if remaining > 0 {
            return Vec::new();
        }
        self.touch.pinching = false;
        let (x, y) = self.touch.last;
        self.pointer_button(MouseEventKind::Up, x, y, Modifiers::default())
    }

    // -- resize -------------------------------------------------------------

    /// Record a resize; delivered once no further resize arrives for the
    /// debounce window.
    pub fn resize<E: HostEvents + ?Sized>(&mut self, events: &mut E, width: u32, height: u32, now: Instant) {
        self.pending_resize = Some((width, height));
        self.last_resize_at = Some(now);
        if !self.timer_armed {
            self.timer_armed = true;
            events.schedule_timer(self.debounce);
        }
    }

    /// Timer callback. Re-arms for the remaining window if resizes are still
    /// arriving.
    pub fn on_timer<E: HostEvents + ?Sized>(&mut self, events: &mut E, now: Instant) -> Option<NativeEvent> {
        self.timer_armed = false;
        let last = self.last_resize_at?;
        let quiet = now.saturating_duration_since(last);
        if quiet < self.debounce {
            self.timer_armed = true;
            events.schedule_timer(self.debounce - quiet);
            return None;
        }
        self.last_resize_at = None;
        let (width, height) = self.pending_resize.take()?;
        debug!(width, height, "resize settled");
        Some(NativeEvent::Resize { width, height })
    }

    pub fn has_pending_resize(&self) -> bool {
        self.pending_resize.is_some()
    }

    fn take_move(&mut self) -> Option<NativeEvent> {
        self.pending_move.take().map(|(x, y, modifiers)| NativeEvent::Mouse {
            kind: MouseEventKind::Move,
            x,
            y,
            modifiers,
        })
    }

    fn immediate(&mut self, event: NativeEvent) -> Vec<NativeEvent> {
        let mut out = Vec::with_capacity(2);
        out.extend(self.take_move());
        out.push(event);
        out
    }
}

fn distance(a: (i32, i32), b: (i32, i32)) -> f64 {
    let dx = f64::from(a.0) - f64::from(b.0);
    let dy = f64::from(a.1) - f64::from(b.1);
    dx.hypot(dy)
}
