// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Event types delivered to node handlers.

use canopy_scene::NodeId;
use kurbo::{Affine, Point};

/// Mouse button identifier. `1` is the primary button.
pub type Button = u8;

/// The primary (usually left) mouse button.
pub const PRIMARY_BUTTON: Button = 1;

bitflags::bitflags! {
    /// Keyboard modifier state carried on every event.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct Modifiers: u8 {
        /// Either shift key.
        const SHIFT = 1 << 0;
        /// Either control key.
        const CTRL  = 1 << 1;
        /// Either alt/option key.
        const ALT   = 1 << 2;
        /// The platform command/windows key.
        const META  = 1 << 3;
    }
}

bitflags::bitflags! {
    /// Which event kinds a handler wants to see.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct EventMask: u16 {
        /// [`EventKind::MouseDown`].
        const MOUSE_DOWN  = 1 << 0;
        /// [`EventKind::MouseUp`].
        const MOUSE_UP    = 1 << 1;
        /// [`EventKind::MouseMove`].
        const MOUSE_MOVE  = 1 << 2;
        /// [`EventKind::MouseDrag`].
        const MOUSE_DRAG  = 1 << 3;
        /// [`EventKind::MouseEnter`].
        const MOUSE_ENTER = 1 << 4;
        /// [`EventKind::MouseExit`].
        const MOUSE_EXIT  = 1 << 5;
        /// [`EventKind::Click`].
        const CLICK       = 1 << 6;
        /// [`EventKind::Wheel`].
        const WHEEL       = 1 << 7;
        /// [`EventKind::KeyDown`].
        const KEY_DOWN    = 1 << 8;
        /// [`EventKind::KeyUp`].
        const KEY_UP      = 1 << 9;
        /// [`EventKind::FocusLost`].
        const FOCUS_LOST   = 1 << 10;
        /// [`EventKind::FocusGained`].
        const FOCUS_GAINED = 1 << 11;
    }
}

/// What happened, with the kind-specific payload.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum EventKind {
    /// A button was pressed.
    MouseDown { button: Button },
    /// A button was released.
    MouseUp { button: Button },
    /// The pointer moved with no button captured.
    MouseMove,
    /// Motion while a press is captured; delivered to the press path even if
    /// the pointer has left it.
    MouseDrag { button: Button },
    /// The pointer entered a node it was not over before.
    MouseEnter,
    /// The pointer left a node it was over.
    MouseExit,
    /// Synthesized on release when the press stayed within the click
    /// thresholds. `count` is 1 for a single click, 2 for a double, and so
    /// on within the multi-click window.
    Click { button: Button, count: u8 },
    /// Scroll wheel motion, in host units.
    Wheel { dx: f64, dy: f64 },
    /// A key was pressed. `key` is a host keycode.
    KeyDown { key: u32 },
    /// A key was released.
    KeyUp { key: u32 },
    /// The node stopped being the keyboard focus.
    FocusLost,
    /// The node became the keyboard focus.
    FocusGained,
}

impl EventKind {
    /// The mask bit for this kind.
    pub fn mask(self) -> EventMask {
        match self {
            Self::MouseDown { .. } => EventMask::MOUSE_DOWN,
            Self::MouseUp { .. } => EventMask::MOUSE_UP,
            Self::MouseMove => EventMask::MOUSE_MOVE,
            Self::MouseDrag { .. } => EventMask::MOUSE_DRAG,
            Self::MouseEnter => EventMask::MOUSE_ENTER,
            Self::MouseExit => EventMask::MOUSE_EXIT,
            Self::Click { .. } => EventMask::CLICK,
            Self::Wheel { .. } => EventMask::WHEEL,
            Self::KeyDown { .. } => EventMask::KEY_DOWN,
            Self::KeyUp { .. } => EventMask::KEY_UP,
            Self::FocusLost => EventMask::FOCUS_LOST,
            Self::FocusGained => EventMask::FOCUS_GAINED,
        }
    }

    /// The button carried by pointer kinds, if any.
    pub fn button(self) -> Option<Button> {
        match self {
            Self::MouseDown { button }
            | Self::MouseUp { button }
            | Self::MouseDrag { button }
            | Self::Click { button, .. } => Some(button),
            _ => None,
        }
    }
}

/// One event as seen by a handler.
///
/// `position` is in camera viewport space; `to_local` maps it into the local
/// space of the node whose handler is currently running, so handlers read
/// coordinates in the space they laid their geometry out in.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct InputEvent {
    /// What happened.
    pub kind: EventKind,
    /// The camera the event arrived through. Key and focus events have no
    /// pick, so this holds the focus node instead.
    pub camera: NodeId,
    /// Pointer position in viewport space. Zero for key events.
    pub position: Point,
    /// Viewport space to current-node local space.
    pub to_local: Affine,
    /// Keyboard modifier state at event time.
    pub modifiers: Modifiers,
    /// Host clock, milliseconds.
    pub time: u64,
    /// Set once a marking handler has run; later handlers with
    /// `reject_handled` filters no longer see the event.
    pub handled: bool,
}

impl InputEvent {
    /// The pointer position in the current node's local space.
    pub fn local_position(&self) -> Point {
        self.to_local * self.position
    }
}

/// Declarative predicate deciding which events reach a handler.
///
/// The default filter accepts every kind, any modifiers and button, and
/// rejects events already marked handled.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct EventFilter {
    /// Kinds the handler wants.
    pub accept: EventMask,
    /// Exact modifier state required, or `None` for any.
    pub required_modifiers: Option<Modifiers>,
    /// Required button for pointer kinds, or `None` for any.
    pub button: Option<Button>,
    /// Required click count, or `None` for any.
    pub click_count: Option<u8>,
    /// Skip events another handler already marked handled.
    pub reject_handled: bool,
}

impl Default for EventFilter {
    fn default() -> Self {
        Self {
            accept: EventMask::all(),
            required_modifiers: None,
            button: None,
            click_count: None,
            reject_handled: true,
        }
    }
}

impl EventFilter {
    /// Accept only the kinds in `mask`.
    pub fn for_mask(accept: EventMask) -> Self {
        Self {
            accept,
            ..Self::default()
        }
    }

    /// Require this exact modifier state.
    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.required_modifiers = Some(modifiers);
        self
    }

    /// Require this button on pointer kinds.
    pub fn with_button(mut self, button: Button) -> Self {
        self.button = Some(button);
        self
    }

    /// Require this click count on [`EventKind::Click`].
    pub fn with_click_count(mut self, count: u8) -> Self {
        self.click_count = Some(count);
        self
    }

    /// Also accept events another handler already marked handled.
    pub fn accept_handled(mut self) -> Self {
        self.reject_handled = false;
        self
    }

    /// Whether this filter lets `event` through, given the handled state the
    /// event had when dispatch reached the current node.
    pub fn matches(&self, event: &InputEvent, handled_at_entry: bool) -> bool {
        if self.reject_handled && handled_at_entry {
            return false;
        }
        if !self.accept.contains(event.kind.mask()) {
            return false;
        }
        if let Some(required) = self.required_modifiers {
            if event.modifiers != required {
                return false;
            }
        }
        if let Some(button) = self.button {
            if event.kind.button() != Some(button) {
                return false;
            }
        }
        if let Some(count) = self.click_count {
            match event.kind {
                EventKind::Click { count: c, .. } if c == count => {}
                _ => return false,
            }
        }
        true
    }
}
