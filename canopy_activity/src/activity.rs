// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The activity trait and its scheduling parameters.

/// Total lifetime of one loop of an activity, in milliseconds.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Lifetime {
    /// One loop lasts this many milliseconds.
    Finite(u64),
    /// Runs until terminated.
    Forever,
}

/// How many times an activity's lifetime repeats.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Loops {
    /// Repeat the lifetime this many times.
    Count(u32),
    /// Repeat until terminated.
    Forever,
}

/// When and for how long an activity runs.
///
/// All times are in milliseconds on the host-supplied clock. The default is a
/// single zero-length loop with no delay, which runs to completion
/// synchronously inside `schedule`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Schedule {
    /// Delay from scheduling until the first step.
    pub delay: u64,
    /// Length of one loop.
    pub duration: Lifetime,
    /// How often the loop repeats.
    pub loops: Loops,
}

impl Default for Schedule {
    fn default() -> Self {
        Self {
            delay: 0,
            duration: Lifetime::Finite(0),
            loops: Loops::Count(1),
        }
    }
}

impl Schedule {
    /// One loop of `duration` milliseconds, starting now.
    pub fn new(duration: u64) -> Self {
        Self {
            duration: Lifetime::Finite(duration),
            ..Self::default()
        }
    }

    /// Runs until terminated.
    pub fn forever() -> Self {
        Self {
            duration: Lifetime::Forever,
            ..Self::default()
        }
    }

    /// Defer the start by `delay` milliseconds.
    pub fn with_delay(mut self, delay: u64) -> Self {
        self.delay = delay;
        self
    }

    /// Repeat the lifetime `count` times.
    pub fn with_loops(mut self, count: u32) -> Self {
        self.loops = Loops::Count(count);
        self
    }

    /// Repeat until terminated.
    pub fn looping_forever(mut self) -> Self {
        self.loops = Loops::Forever;
        self
    }
}

/// Progress handed to [`Activity::step`] on every tick.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Tick {
    /// Milliseconds elapsed within the current loop.
    pub elapsed: u64,
    /// Completed fraction of the current loop in `[0, 1]`; `None` while the
    /// lifetime is [`Lifetime::Forever`].
    pub fraction: Option<f64>,
    /// Zero-based index of the current loop.
    pub loop_index: u32,
}

/// A unit of time-based work driven by the scheduler.
///
/// `S` is the state the activity mutates, typically the scene. Callbacks run
/// in a fixed order: `started` once, `step` one or more times (the final step
/// of a finite activity always sees fraction `1.0`), then `finished` once.
pub trait Activity<S> {
    /// Called once when the activity leaves its pending phase.
    fn started(&mut self, _ctx: &mut S) {}

    /// Called every tick while running.
    fn step(&mut self, ctx: &mut S, tick: Tick);

    /// Called once after the final step, or on termination while running.
    fn finished(&mut self, _ctx: &mut S) {}

    /// Whether this activity changes what is on screen. Drives the
    /// lower-quality rendering hint while any animating activity runs.
    fn is_animating(&self) -> bool {
        true
    }
}

/// Lifecycle phase of a scheduled activity.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for its start time.
    Pending,
    /// Started and stepping.
    Running,
}
