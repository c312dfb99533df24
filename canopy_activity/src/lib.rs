// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Canopy Activity: time-based work scheduling for scene hosts.
//!
//! Activities are the unit of animation and deferred work: a boxed
//! [`Activity`] plus a [`Schedule`] saying when it starts, how long one loop
//! lasts, and how often it repeats. The [`ActivityScheduler`] drives them
//! from a host-supplied millisecond clock, one [`ActivityScheduler::tick`]
//! per frame, and reports via [`ActivityScheduler::is_animating`] whether
//! anything on screen is in motion.
//!
//! The crate is deliberately independent of the scene: the scheduler is
//! generic over the state its activities mutate, so it tests without a scene
//! and hosts can schedule work against whatever context they own.
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod activity;
mod easing;
mod scheduler;

pub use activity::{Activity, Lifetime, Loops, Phase, Schedule, Tick};
pub use easing::Easing;
pub use scheduler::{ActivityId, ActivityScheduler, Spawn};
