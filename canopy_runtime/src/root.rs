// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The runtime root: one scene, its scheduler, and its input manager, driven
//! by a host frame loop.

use alloc::boxed::Box;
use canopy_activity::{Activity, ActivityScheduler, Schedule, Spawn};
use canopy_input::InputManager;
use canopy_scene::{NodeId, PaintContext, RenderQuality, Scene, Surface};
use kurbo::Rect;

use crate::animate::{view_for_centering, ViewActivity};
use crate::canvas::{Canvas, Cursor, CursorStack, Interaction, QualityPolicy};

/// Owns everything a running canvas application needs.
///
/// The host calls [`Root::process_frame`] once per frame with its clock and
/// canvas, forwards window input to the public [`Root::input`] field between
/// frames, and paints with [`Root::paint_camera`] when the canvas asks for a
/// redraw.
pub struct Root {
    /// The scene graph.
    pub scene: Scene,
    /// Time-based activities running against the scene.
    pub scheduler: ActivityScheduler<Scene>,
    /// Pointer and key routing over the scene.
    pub input: InputManager,
    /// How render quality reacts to interaction and animation.
    pub quality: QualityPolicy,
    cursors: CursorStack,
    interaction: Interaction,
    /// Monotonic frame clock; never moves backwards even if the host's does.
    global_time: u64,
    last_cursor: Cursor,
}

impl core::fmt::Debug for Root {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Root")
            .field("scene", &self.scene)
            .field("global_time", &self.global_time)
            .field("cursor", &self.cursors.current())
            .field("interacting", &self.interaction.is_interacting())
            .finish_non_exhaustive()
    }
}

impl Default for Root {
    fn default() -> Self {
        Self::new()
    }
}

impl Root {
    /// An empty root with an empty scene.
    pub fn new() -> Self {
        Self {
            scene: Scene::new(),
            scheduler: ActivityScheduler::new(),
            input: InputManager::new(),
            quality: QualityPolicy::default(),
            cursors: CursorStack::new(),
            interaction: Interaction::default(),
            global_time: 0,
            last_cursor: Cursor::default(),
        }
    }

    /// The frame clock after the last [`Root::process_frame`], milliseconds.
    pub fn global_time(&self) -> u64 {
        self.global_time
    }

    /// Advance one frame: clamp the clock monotonic, run due activities, and
    /// hand every pending repaint region and cursor change to the canvas.
    pub fn process_frame<C: Canvas>(&mut self, canvas: &mut C, now: u64) {
        self.global_time = self.global_time.max(now);
        self.scheduler.tick(&mut self.scene, self.global_time);
        for request in self.scene.take_repaints() {
            canvas.repaint(request.camera, request.rect);
        }
        let cursor = self.cursors.current();
        if cursor != self.last_cursor {
            self.last_cursor = cursor;
            canvas.set_cursor(cursor);
        }
    }

    /// Deliver pending repaints and force the canvas to paint them now,
    /// without waiting for the next frame.
    pub fn flush<C: Canvas>(&mut self, canvas: &mut C) {
        for request in self.scene.take_repaints() {
            canvas.repaint(request.camera, request.rect);
        }
        canvas.flush();
    }

    /// Schedule an activity against this root's scene and clock.
    pub fn schedule(&mut self, activity: Box<dyn Activity<Scene>>, schedule: Schedule) -> Spawn {
        self.scheduler
            .schedule(&mut self.scene, activity, schedule, self.global_time)
    }

    /// Animate `camera`'s view until `bounds` (viewed space) fills the
    /// viewport, centered. `duration` 0 jumps synchronously. Returns `None`
    /// when the target view cannot be computed.
    pub fn animate_view_to_bounds(
        &mut self,
        camera: NodeId,
        bounds: Rect,
        duration: u64,
    ) -> Option<Spawn> {
        let target = view_for_centering(&self.scene, camera, bounds)?;
        Some(self.schedule(
            Box::new(ViewActivity::new(camera, target)),
            Schedule::new(duration),
        ))
    }

    /// The quality the next paint should use, from the policy and the
    /// current interaction/animation state.
    pub fn current_quality(&self) -> RenderQuality {
        self.quality
            .current(self.interaction.is_interacting(), self.scheduler.is_animating())
    }

    /// Paint one camera at the current quality.
    pub fn paint_camera<S: Surface>(&mut self, camera: NodeId, surface: &mut S, dirty: Option<Rect>) {
        let mut ctx = PaintContext::new(surface).with_quality(self.current_quality());
        ctx.dirty = dirty;
        self.scene.paint_camera(camera, &mut ctx);
    }

    // --- interaction state ---

    /// Mark the start of a direct-manipulation gesture (drops render
    /// quality per the policy until the matching [`Root::end_interaction`]).
    pub fn begin_interaction(&mut self) {
        self.interaction.begin();
    }

    /// Mark the end of a direct-manipulation gesture.
    pub fn end_interaction(&mut self) {
        self.interaction.end();
    }

    /// Whether any gesture is in progress.
    pub fn is_interacting(&self) -> bool {
        self.interaction.is_interacting()
    }

    /// Push a cursor override; the canvas hears about it on the next frame.
    pub fn push_cursor(&mut self, cursor: Cursor) {
        self.cursors.push(cursor);
    }

    /// Remove the innermost cursor override.
    pub fn pop_cursor(&mut self) {
        self.cursors.pop();
    }

    /// The effective cursor.
    pub fn cursor(&self) -> Cursor {
        self.cursors.current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;
    use canopy_scene::Paint;
    use kurbo::Point;

    #[derive(Default)]
    struct FakeCanvas {
        repaints: Vec<(NodeId, Rect)>,
        cursors: Vec<Cursor>,
        flushes: usize,
    }

    impl Canvas for FakeCanvas {
        fn repaint(&mut self, camera: NodeId, rect: Rect) {
            self.repaints.push((camera, rect));
        }
        fn set_cursor(&mut self, cursor: Cursor) {
            self.cursors.push(cursor);
        }
        fn flush(&mut self) {
            self.flushes += 1;
        }
    }

    fn build_view(root: &mut Root) -> (NodeId, NodeId) {
        let top = root.scene.create_group();
        let layer = root.scene.create_layer();
        let camera = root.scene.create_camera();
        root.scene.add_child(top, layer);
        root.scene.add_child(top, camera);
        root.scene
            .set_local_bounds(camera, Rect::new(0.0, 0.0, 400.0, 300.0));
        root.scene.add_layer(camera, layer);
        let shape = root.scene.create_shape();
        root.scene.add_child(layer, shape);
        root.scene
            .set_local_bounds(shape, Rect::new(0.0, 0.0, 100.0, 100.0));
        (camera, shape)
    }

    #[test]
    fn frame_drains_repaints_to_the_canvas() {
        let mut root = Root::new();
        let (camera, shape) = build_view(&mut root);
        let mut canvas = FakeCanvas::default();
        root.process_frame(&mut canvas, 0);
        canvas.repaints.clear();

        root.scene.set_paint(shape, Some(Paint::rgb8(10, 20, 30)));
        root.process_frame(&mut canvas, 16);
        assert_eq!(canvas.repaints, &[(camera, Rect::new(0.0, 0.0, 100.0, 100.0))]);
        assert!(!root.scene.has_pending_repaints());
    }

    #[test]
    fn flush_paints_pending_damage_immediately() {
        let mut root = Root::new();
        let (camera, shape) = build_view(&mut root);
        let mut canvas = FakeCanvas::default();
        root.process_frame(&mut canvas, 0);
        canvas.repaints.clear();

        root.scene.set_paint(shape, Some(Paint::rgb8(200, 0, 0)));
        root.flush(&mut canvas);
        assert_eq!(canvas.repaints, &[(camera, Rect::new(0.0, 0.0, 100.0, 100.0))]);
        assert_eq!(canvas.flushes, 1);
        assert!(!root.scene.has_pending_repaints());
    }

    #[test]
    fn clock_never_runs_backwards() {
        let mut root = Root::new();
        let mut canvas = FakeCanvas::default();
        root.process_frame(&mut canvas, 100);
        root.process_frame(&mut canvas, 40);
        assert_eq!(root.global_time(), 100);
        root.process_frame(&mut canvas, 150);
        assert_eq!(root.global_time(), 150);
    }

    #[test]
    fn cursor_changes_reach_the_canvas_once() {
        let mut root = Root::new();
        let mut canvas = FakeCanvas::default();
        root.push_cursor(Cursor::Grab);
        root.process_frame(&mut canvas, 0);
        root.process_frame(&mut canvas, 16);
        assert_eq!(canvas.cursors, &[Cursor::Grab], "unchanged cursor is quiet");

        root.pop_cursor();
        root.pop_cursor(); // extra pop is a no-op
        root.process_frame(&mut canvas, 32);
        assert_eq!(canvas.cursors, &[Cursor::Grab, Cursor::Default]);
    }

    #[test]
    fn quality_follows_interaction_and_animation() {
        let mut root = Root::new();
        let (camera, _) = build_view(&mut root);
        assert_eq!(root.current_quality(), RenderQuality::High);

        root.begin_interaction();
        assert_eq!(root.current_quality(), RenderQuality::Low);
        root.end_interaction();
        assert_eq!(root.current_quality(), RenderQuality::High);

        let mut canvas = FakeCanvas::default();
        root.animate_view_to_bounds(camera, Rect::new(0.0, 0.0, 100.0, 100.0), 1000);
        root.process_frame(&mut canvas, 16);
        assert_eq!(root.current_quality(), RenderQuality::Low, "animating drops quality");
        root.process_frame(&mut canvas, 2000);
        assert_eq!(root.current_quality(), RenderQuality::High);
    }

    #[test]
    fn animate_view_to_bounds_ends_centered() {
        let mut root = Root::new();
        let (camera, _) = build_view(&mut root);
        let bounds = Rect::new(0.0, 0.0, 100.0, 100.0);
        root.animate_view_to_bounds(camera, bounds, 500);
        let mut canvas = FakeCanvas::default();
        root.process_frame(&mut canvas, 600);

        let view = root.scene.view_transform(camera).unwrap();
        let mapped = view * bounds.center();
        assert!((mapped.x - 200.0).abs() < 1e-9 && (mapped.y - 150.0).abs() < 1e-9);
    }

    #[test]
    fn input_and_scheduler_share_the_scene() {
        let mut root = Root::new();
        let (camera, shape) = build_view(&mut root);
        use canopy_input::{EventFilter, EventMask, Modifiers};
        // A handler that hides the node it clicks.
        root.input.add_handler(
            shape,
            EventFilter::for_mask(EventMask::MOUSE_DOWN),
            true,
            |scene, _, node| scene.set_visible(node, false),
        );
        root.input.mouse_down(
            &mut root.scene,
            camera,
            Point::new(50.0, 50.0),
            1,
            Modifiers::empty(),
            0,
        );
        assert!(
            !root
                .scene
                .flags(shape)
                .unwrap()
                .contains(canopy_scene::NodeFlags::VISIBLE)
        );
    }
}
