// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Single-threaded activity scheduler.
//!
//! The host owns the clock: it passes the current time (in milliseconds, any
//! monotonic origin) to [`ActivityScheduler::schedule`] and
//! [`ActivityScheduler::tick`]. Ticking steps every running activity once,
//! starts pending ones whose time has come, and retires finished ones, so a
//! frame loop needs exactly one `tick` call.

use alloc::boxed::Box;
use alloc::vec::Vec;

use crate::activity::{Activity, Lifetime, Loops, Phase, Schedule, Tick};

/// Handle to a scheduled activity.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ActivityId(u64);

/// Outcome of [`ActivityScheduler::schedule`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Spawn {
    /// The activity had zero duration, no delay, and a single loop; it ran to
    /// completion synchronously and was never queued.
    Immediate,
    /// Queued; the id stays valid until the activity finishes.
    Deferred(ActivityId),
}

struct Entry<S> {
    id: ActivityId,
    activity: Box<dyn Activity<S>>,
    start_time: u64,
    duration: Lifetime,
    loops: Loops,
    phase: Phase,
}

/// Owns and drives all pending and running activities.
pub struct ActivityScheduler<S> {
    entries: Vec<Entry<S>>,
    next_id: u64,
}

impl<S> core::fmt::Debug for ActivityScheduler<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ActivityScheduler")
            .field("len", &self.entries.len())
            .finish_non_exhaustive()
    }
}

impl<S> Default for ActivityScheduler<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> ActivityScheduler<S> {
    /// An empty scheduler.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 0,
        }
    }

    /// Queue an activity. A default [`Schedule`] (zero duration, no delay,
    /// one loop) short-circuits: the full started/step/finished sequence runs
    /// before this returns and nothing is queued.
    pub fn schedule(
        &mut self,
        ctx: &mut S,
        mut activity: Box<dyn Activity<S>>,
        schedule: Schedule,
        now: u64,
    ) -> Spawn {
        let immediate = schedule.delay == 0
            && schedule.duration == Lifetime::Finite(0)
            && schedule.loops == Loops::Count(1);
        if immediate {
            activity.started(ctx);
            activity.step(
                ctx,
                Tick {
                    elapsed: 0,
                    fraction: Some(1.0),
                    loop_index: 0,
                },
            );
            activity.finished(ctx);
            return Spawn::Immediate;
        }
        let id = ActivityId(self.next_id);
        self.next_id += 1;
        self.entries.push(Entry {
            id,
            activity,
            start_time: now + schedule.delay,
            duration: schedule.duration,
            loops: schedule.loops,
            phase: Phase::Pending,
        });
        Spawn::Deferred(id)
    }

    /// Phase of a queued activity, or `None` once finished or terminated.
    pub fn phase(&self, id: ActivityId) -> Option<Phase> {
        self.entries.iter().find(|e| e.id == id).map(|e| e.phase)
    }

    /// Number of queued (pending or running) activities.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether any running activity reports itself as animating. Hosts use
    /// this to drop render quality while motion is on screen.
    pub fn is_animating(&self) -> bool {
        self.entries
            .iter()
            .any(|e| e.phase == Phase::Running && e.activity.is_animating())
    }

    /// Remove an activity. A running activity gets its `finished` callback; a
    /// pending one is dropped silently. Returns false for unknown (already
    /// finished) ids.
    pub fn terminate(&mut self, ctx: &mut S, id: ActivityId) -> bool {
        let Some(pos) = self.entries.iter().position(|e| e.id == id) else {
            return false;
        };
        let mut entry = self.entries.remove(pos);
        if entry.phase == Phase::Running {
            entry.activity.finished(ctx);
        }
        true
    }

    /// Advance every activity to `now`.
    ///
    /// Entries are stepped in scheduling order. `now` must not move backwards
    /// between calls; a stalled clock is fine (activities just step with the
    /// same elapsed time again).
    pub fn tick(&mut self, ctx: &mut S, now: u64) {
        // Swap the queue out so activity callbacks may schedule new
        // activities; those start on the next tick.
        let mut entries = core::mem::take(&mut self.entries);
        let mut finished = Vec::new();
        for entry in &mut entries {
            if entry.phase == Phase::Pending {
                if now < entry.start_time {
                    continue;
                }
                entry.phase = Phase::Running;
                entry.activity.started(ctx);
            }
            let elapsed_total = now.saturating_sub(entry.start_time);
            match entry.duration {
                Lifetime::Forever => {
                    entry.activity.step(
                        ctx,
                        Tick {
                            elapsed: elapsed_total,
                            fraction: None,
                            loop_index: 0,
                        },
                    );
                }
                Lifetime::Finite(duration) => {
                    let (done, tick) = loop_progress(elapsed_total, duration, entry.loops);
                    entry.activity.step(ctx, tick);
                    if done {
                        entry.activity.finished(ctx);
                        finished.push(entry.id);
                    }
                }
            }
        }
        entries.retain(|e| !finished.contains(&e.id));
        // Activities scheduled during callbacks landed in self.entries.
        entries.append(&mut self.entries);
        self.entries = entries;
    }
}

/// Where `elapsed_total` falls within a finite looping lifetime, and whether
/// the lifetime is over. The final step is clamped to fraction 1.0.
fn loop_progress(elapsed_total: u64, duration: u64, loops: Loops) -> (bool, Tick) {
    if duration == 0 {
        // Zero-length loops degenerate to a single completed step.
        return (
            true,
            Tick {
                elapsed: 0,
                fraction: Some(1.0),
                loop_index: 0,
            },
        );
    }
    let raw_index = elapsed_total / duration;
    let done = match loops {
        Loops::Forever => false,
        Loops::Count(n) => raw_index >= u64::from(n),
    };
    if done {
        let last = match loops {
            Loops::Count(n) => n.saturating_sub(1),
            Loops::Forever => 0,
        };
        return (
            true,
            Tick {
                elapsed: duration,
                fraction: Some(1.0),
                loop_index: last,
            },
        );
    }
    let elapsed = elapsed_total % duration;
    #[allow(
        clippy::cast_possible_truncation,
        reason = "loop indices beyond u32::MAX are not meaningful"
    )]
    let loop_index = raw_index.min(u64::from(u32::MAX)) as u32;
    #[allow(
        clippy::cast_precision_loss,
        reason = "millisecond spans fit f64 exactly in practice"
    )]
    let fraction = elapsed as f64 / duration as f64;
    (
        false,
        Tick {
            elapsed,
            fraction: Some(fraction),
            loop_index,
        },
    )
}
