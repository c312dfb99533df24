// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Host canvas integration: repaint delivery, cursors, and render quality.

use alloc::vec::Vec;
use canopy_scene::{NodeId, RenderQuality};
use kurbo::Rect;

/// What the runtime needs from the host window.
///
/// `repaint` receives the per-camera stale regions drained each frame;
/// `set_cursor` is called only when the effective cursor actually changes.
pub trait Canvas {
    /// A region of `camera`'s viewport, in viewport coordinates, is stale.
    fn repaint(&mut self, camera: NodeId, rect: Rect);
    /// The effective cursor changed.
    fn set_cursor(&mut self, cursor: Cursor);
    /// Paint the delivered regions now, before returning to the event loop.
    fn flush(&mut self);
}

/// Pointer cursor shapes a host is expected to support.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Cursor {
    /// The platform arrow.
    #[default]
    Default,
    /// A pointing hand.
    Pointer,
    /// A crosshair.
    Crosshair,
    /// A text I-beam.
    Text,
    /// A four-way move arrow.
    Move,
    /// An open hand.
    Grab,
    /// A closed hand.
    Grabbing,
    /// A horizontal resize arrow.
    ResizeHorizontal,
    /// A vertical resize arrow.
    ResizeVertical,
}

/// Stack of cursor overrides.
///
/// Interactions push on entry and pop on exit; nesting works out because the
/// innermost interaction's cursor is on top. Popping an empty stack is a
/// no-op, so unbalanced exits degrade gracefully instead of panicking.
#[derive(Clone, Debug, Default)]
pub struct CursorStack {
    stack: Vec<Cursor>,
}

impl CursorStack {
    /// An empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// The effective cursor: the innermost override, or the default.
    pub fn current(&self) -> Cursor {
        self.stack.last().copied().unwrap_or_default()
    }

    /// Install `cursor` as the innermost override.
    pub fn push(&mut self, cursor: Cursor) {
        self.stack.push(cursor);
    }

    /// Remove the innermost override. Returns it, or `None` if the stack was
    /// already empty.
    pub fn pop(&mut self) -> Option<Cursor> {
        self.stack.pop()
    }
}

/// Non-negative nesting counter for user interactions in progress.
///
/// Ends without a matching begin saturate at zero rather than underflowing,
/// mirroring [`CursorStack::pop`].
#[derive(Copy, Clone, Debug, Default)]
pub struct Interaction {
    depth: u32,
}

impl Interaction {
    /// A counter at rest.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter an interaction.
    pub fn begin(&mut self) {
        self.depth = self.depth.saturating_add(1);
    }

    /// Leave an interaction.
    pub fn end(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Whether any interaction is in progress.
    pub fn is_interacting(self) -> bool {
        self.depth > 0
    }
}

/// Chooses the render quality for a frame.
///
/// Every applicable vote (interacting, animating, idle) is collected and the
/// lowest wins, so any one consumer asking for cheap rendering gets it.
#[derive(Copy, Clone, Debug)]
pub struct QualityPolicy {
    /// Vote while the user is interacting.
    pub interacting: RenderQuality,
    /// Vote while activities are animating.
    pub animating: RenderQuality,
    /// Quality when nothing else votes.
    pub idle: RenderQuality,
}

impl Default for QualityPolicy {
    fn default() -> Self {
        Self {
            interacting: RenderQuality::Low,
            animating: RenderQuality::Low,
            idle: RenderQuality::High,
        }
    }
}

impl QualityPolicy {
    /// The quality for a frame under the given conditions.
    pub fn current(&self, interacting: bool, animating: bool) -> RenderQuality {
        let mut quality = self.idle;
        if interacting {
            quality = quality.min(self.interacting);
        }
        if animating {
            quality = quality.min(self.animating);
        }
        quality
    }
}
