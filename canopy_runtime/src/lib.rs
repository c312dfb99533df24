// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Canopy Runtime: glue between a host window and the Canopy crates.
//!
//! [`Root`] bundles the scene, the activity scheduler, and the input manager
//! behind a frame-loop API: forward window input, call
//! [`Root::process_frame`] once per frame with the host clock and a
//! [`Canvas`], and paint on demand at the quality [`QualityPolicy`] picks
//! from the current interaction and animation state. The built-in
//! [`TransformActivity`] and [`ViewActivity`] cover the common animated
//! moves, including the classic animate-to-center-bounds camera transition.
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod animate;
mod canvas;
mod root;

pub use animate::{view_for_centering, TransformActivity, ViewActivity};
pub use canvas::{Canvas, Cursor, CursorStack, Interaction, QualityPolicy};
pub use root::Root;
