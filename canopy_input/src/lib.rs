// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Canopy Input: pointer and keyboard routing for the scene graph.
//!
//! The host translates windowing events into calls on [`InputManager`]
//! (`mouse_down`, `mouse_move`, `key_down`, ...), and the manager does the
//! rest: it picks through the scene, synthesizes the derived events (enter
//! and exit on hover changes, drags while a press is captured, clicks with
//! multi-click counting), and dispatches to per-node handlers from the
//! deepest picked node back to the camera.
//!
//! Handlers are registered with an [`EventFilter`] (kind mask, modifier and
//! button requirements, handled rejection) and may mark events handled to
//! stop the bubble. Coordinates arrive in viewport space with a per-node
//! transform attached, so [`InputEvent::local_position`] is always in the
//! handling node's own space.
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod events;
mod manager;

pub use events::{
    Button, EventFilter, EventKind, EventMask, InputEvent, Modifiers, PRIMARY_BUTTON,
};
pub use manager::{HandlerId, InputManager};
