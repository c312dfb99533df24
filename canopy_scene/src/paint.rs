// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Paint traversal.
//!
//! The scene does not rasterize; it drives a [`Surface`] implementation
//! through the tree in paint order (children after their parent, later
//! siblings on top). The traversal culls against an optional dirty region in
//! viewport space and clears paint invalidation flags only on the subtrees it
//! actually visited, so culled regions stay marked for the next pass that
//! does cover them.

use kurbo::{Affine, BezPath, Rect};

use crate::tree::{DirtyFlags, KindData, Scene};
use crate::types::{NodeFlags, NodeId, Paint, Stroke};
use crate::util::{rect_is_empty, rects_overlap, transform_rect_bbox};

/// Rendering effort hint, chosen by the host per pass.
///
/// `Low` is meant for interaction and animation frames (no anti-aliasing,
/// cheap interpolation); `High` for still frames. The ordering is meaningful:
/// the lower quality wins when several consumers vote.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum RenderQuality {
    /// Speed over fidelity.
    Low,
    /// Full fidelity.
    #[default]
    High,
}

/// Receiver for paint commands, implemented by the host's renderer.
///
/// Transforms and clips nest: every `push_*` is matched by the corresponding
/// `pop_*` before the traversal returns.
pub trait Surface {
    /// Compose `tf` onto the current transform.
    fn push_transform(&mut self, tf: Affine);
    /// Undo the innermost [`Surface::push_transform`].
    fn pop_transform(&mut self);
    /// Intersect the clip with `rect` in the current space.
    fn push_clip(&mut self, rect: Rect);
    /// Undo the innermost [`Surface::push_clip`].
    fn pop_clip(&mut self);
    /// Fill an axis-aligned rectangle.
    fn fill_rect(&mut self, rect: Rect, paint: Paint);
    /// Fill a path.
    fn fill_path(&mut self, path: &BezPath, paint: Paint);
    /// Stroke a path outline.
    fn stroke_path(&mut self, path: &BezPath, stroke: Stroke);
}

/// Per-pass paint state handed through the traversal.
pub struct PaintContext<'a, S: Surface> {
    /// The renderer receiving paint commands.
    pub surface: &'a mut S,
    /// Effort hint for this pass.
    pub quality: RenderQuality,
    /// Stale region in camera viewport space; `None` paints everything.
    pub dirty: Option<Rect>,
}

impl<S: Surface> core::fmt::Debug for PaintContext<'_, S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PaintContext")
            .field("quality", &self.quality)
            .field("dirty", &self.dirty)
            .finish_non_exhaustive()
    }
}

impl<'a, S: Surface> PaintContext<'a, S> {
    /// A full-repaint context at default quality.
    pub fn new(surface: &'a mut S) -> Self {
        Self {
            surface,
            quality: RenderQuality::default(),
            dirty: None,
        }
    }

    /// Set the effort hint.
    pub fn with_quality(mut self, quality: RenderQuality) -> Self {
        self.quality = quality;
        self
    }

    /// Restrict the pass to a stale region (viewport space).
    pub fn with_dirty(mut self, dirty: Rect) -> Self {
        self.dirty = Some(dirty);
        self
    }
}

impl Scene {
    /// Paint everything a camera shows: its background, each viewed layer in
    /// composite order under the view transform, then the camera's own
    /// children as viewport-anchored overlays.
    ///
    /// No-op for stale or non-camera ids.
    pub fn paint_camera<S: Surface>(&mut self, camera: NodeId, ctx: &mut PaintContext<'_, S>) {
        let (layers, view_tf) = match self.node_opt(camera).map(|n| &n.kind) {
            Some(KindData::Camera(c)) => (c.layers.clone(), c.view_transform),
            _ => return,
        };
        let (viewport, paint, children) = {
            let n = self.node(camera);
            (n.local_bounds, n.paint, n.children.clone())
        };
        ctx.surface.push_clip(viewport);
        if let Some(paint) = paint {
            ctx.surface.fill_rect(viewport, paint);
        }
        ctx.surface.push_transform(view_tf);
        for &layer in &layers {
            self.paint_node(layer, view_tf, ctx);
        }
        ctx.surface.pop_transform();
        // Overlay children ignore the view transform and stay fixed in the
        // viewport while the camera pans.
        let mut overlays_flushed = true;
        for &child in &children {
            overlays_flushed &= self.paint_node(child, Affine::IDENTITY, ctx);
        }
        ctx.surface.pop_clip();
        if let Some(n) = self.node_opt_mut(camera) {
            n.dirty.remove(DirtyFlags::PAINT);
            if overlays_flushed {
                n.dirty.remove(DirtyFlags::CHILD_PAINT);
            }
        }
    }

    /// Paint one node and its subtree. `base` maps the node's parent space
    /// into viewport space (used only for dirty-region culling; the surface
    /// sees nested relative transforms).
    ///
    /// Returns whether the subtree's pending paint was fully flushed; a
    /// dirty-culled subtree keeps its flags, and every ancestor keeps
    /// `CHILD_PAINT` so [`Scene::needs_repaint`] still reports it.
    fn paint_node<S: Surface>(
        &mut self,
        node: NodeId,
        base: Affine,
        ctx: &mut PaintContext<'_, S>,
    ) -> bool {
        let Some(flags) = self.flags(node) else { return true };
        if !flags.contains(NodeFlags::VISIBLE) {
            return true;
        }
        self.validate_bounds(node);
        let (tf, full_bounds) = {
            let n = self.node(node);
            (n.transform, n.full_bounds)
        };
        let to_camera = base * tf;
        if let Some(dirty) = ctx.dirty {
            let extent = transform_rect_bbox(to_camera, full_bounds);
            if !rects_overlap(extent, dirty) {
                // Culled: leave the paint flags set for a later full pass.
                return false;
            }
        }

        ctx.surface.push_transform(tf);
        self.paint_self(node, ctx);
        let children = self.node(node).children.clone();
        let mut subtree_flushed = true;
        for &child in &children {
            subtree_flushed &= self.paint_node(child, to_camera, ctx);
        }
        ctx.surface.pop_transform();

        if let Some(n) = self.node_opt_mut(node) {
            n.dirty.remove(DirtyFlags::PAINT);
            if subtree_flushed {
                n.dirty.remove(DirtyFlags::CHILD_PAINT);
            }
        }
        subtree_flushed
    }

    fn paint_self<S: Surface>(&mut self, node: NodeId, ctx: &mut PaintContext<'_, S>) {
        let n = self.node(node);
        match &n.kind {
            KindData::Shape(s) => {
                if let Some(geometry) = &s.geometry {
                    if let Some(paint) = n.paint {
                        ctx.surface.fill_path(geometry, paint);
                    }
                    if let Some(stroke) = s.stroke {
                        ctx.surface.stroke_path(geometry, stroke);
                    }
                } else if let Some(paint) = n.paint {
                    if !rect_is_empty(n.local_bounds) {
                        ctx.surface.fill_rect(n.local_bounds, paint);
                    }
                }
            }
            _ => {
                // Groups and layers may carry a background fill.
                if let Some(paint) = n.paint {
                    if !rect_is_empty(n.local_bounds) {
                        ctx.surface.fill_rect(n.local_bounds, paint);
                    }
                }
            }
        }
    }

    /// Whether a node or anything below it is marked for repaint.
    pub fn needs_repaint(&self, id: NodeId) -> bool {
        self.node_opt(id)
            .map(|n| n.dirty.intersects(DirtyFlags::PAINT | DirtyFlags::CHILD_PAINT))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;
    use kurbo::{Point, Shape as _};

    #[derive(Debug, PartialEq)]
    enum Op {
        PushTransform(Affine),
        PopTransform,
        PushClip(Rect),
        PopClip,
        FillRect(Rect, Paint),
        FillPath(Paint),
        StrokePath(f64),
    }

    #[derive(Default)]
    struct Recorder {
        ops: Vec<Op>,
    }

    impl Surface for Recorder {
        fn push_transform(&mut self, tf: Affine) {
            self.ops.push(Op::PushTransform(tf));
        }
        fn pop_transform(&mut self) {
            self.ops.push(Op::PopTransform);
        }
        fn push_clip(&mut self, rect: Rect) {
            self.ops.push(Op::PushClip(rect));
        }
        fn pop_clip(&mut self) {
            self.ops.push(Op::PopClip);
        }
        fn fill_rect(&mut self, rect: Rect, paint: Paint) {
            self.ops.push(Op::FillRect(rect, paint));
        }
        fn fill_path(&mut self, _path: &BezPath, paint: Paint) {
            self.ops.push(Op::FillPath(paint));
        }
        fn stroke_path(&mut self, _path: &BezPath, stroke: Stroke) {
            self.ops.push(Op::StrokePath(stroke.width));
        }
    }

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Rect {
        Rect::new(x0, y0, x1, y1)
    }

    fn scene_with_two_shapes() -> (Scene, NodeId, NodeId, NodeId) {
        let mut scene = Scene::new();
        let root = scene.create_group();
        let layer = scene.create_layer();
        let camera = scene.create_camera();
        scene.add_child(root, layer);
        scene.add_child(root, camera);
        scene.set_local_bounds(camera, rect(0.0, 0.0, 400.0, 300.0));
        scene.add_layer(camera, layer);

        let below = scene.create_shape();
        let above = scene.create_shape();
        scene.add_child(layer, below);
        scene.add_child(layer, above);
        scene.set_local_bounds(below, rect(0.0, 0.0, 100.0, 100.0));
        scene.set_paint(below, Some(Paint::rgb8(255, 0, 0)));
        scene.set_local_bounds(above, rect(50.0, 50.0, 150.0, 150.0));
        scene.set_paint(above, Some(Paint::rgb8(0, 255, 0)));
        (scene, camera, below, above)
    }

    #[test]
    fn paints_children_in_order_on_top() {
        let (mut scene, camera, _, _) = scene_with_two_shapes();
        let mut rec = Recorder::default();
        scene.paint_camera(camera, &mut PaintContext::new(&mut rec));

        let fills: Vec<&Paint> = rec
            .ops
            .iter()
            .filter_map(|op| match op {
                Op::FillRect(_, p) => Some(p),
                _ => None,
            })
            .collect();
        assert_eq!(fills, &[&Paint::rgb8(255, 0, 0), &Paint::rgb8(0, 255, 0)]);
    }

    #[test]
    fn clips_to_viewport_and_balances_stack() {
        let (mut scene, camera, _, _) = scene_with_two_shapes();
        let mut rec = Recorder::default();
        scene.paint_camera(camera, &mut PaintContext::new(&mut rec));

        assert_eq!(rec.ops.first(), Some(&Op::PushClip(rect(0.0, 0.0, 400.0, 300.0))));
        assert_eq!(rec.ops.last(), Some(&Op::PopClip));
        let pushes = rec.ops.iter().filter(|o| matches!(o, Op::PushTransform(_))).count();
        let pops = rec.ops.iter().filter(|o| matches!(o, Op::PopTransform)).count();
        assert_eq!(pushes, pops);
    }

    #[test]
    fn view_transform_wraps_layers_only() {
        let (mut scene, camera, _, _) = scene_with_two_shapes();
        scene.scale_view(camera, 2.0);
        let overlay = scene.create_shape();
        scene.add_child(camera, overlay);
        scene.set_local_bounds(overlay, rect(0.0, 0.0, 10.0, 10.0));
        scene.set_paint(overlay, Some(Paint::rgb8(0, 0, 255)));

        let mut rec = Recorder::default();
        scene.paint_camera(camera, &mut PaintContext::new(&mut rec));

        // The first transform pushed is the view transform; the overlay fill
        // happens after it is popped again.
        assert_eq!(rec.ops[1], Op::PushTransform(Affine::scale(2.0)));
        let overlay_fill = rec
            .ops
            .iter()
            .position(|o| matches!(o, Op::FillRect(_, p) if *p == Paint::rgb8(0, 0, 255)))
            .unwrap();
        let view_pop = rec
            .ops
            .iter()
            .position(|o| matches!(o, Op::PopTransform))
            .unwrap();
        assert!(overlay_fill > view_pop, "overlays paint outside the view transform");
    }

    #[test]
    fn invisible_subtrees_are_skipped() {
        let (mut scene, camera, below, _) = scene_with_two_shapes();
        scene.set_visible(below, false);
        let mut rec = Recorder::default();
        scene.paint_camera(camera, &mut PaintContext::new(&mut rec));
        assert!(
            !rec.ops
                .iter()
                .any(|o| matches!(o, Op::FillRect(_, p) if *p == Paint::rgb8(255, 0, 0)))
        );
    }

    #[test]
    fn dirty_region_culls_but_keeps_flags() {
        let (mut scene, camera, below, above) = scene_with_two_shapes();
        assert!(scene.needs_repaint(below));

        // Dirty region covers only `above`.
        let mut rec = Recorder::default();
        let mut ctx = PaintContext::new(&mut rec).with_dirty(rect(120.0, 120.0, 150.0, 150.0));
        scene.paint_camera(camera, &mut ctx);

        assert!(
            !rec.ops
                .iter()
                .any(|o| matches!(o, Op::FillRect(_, p) if *p == Paint::rgb8(255, 0, 0))),
            "below is outside the dirty region"
        );
        assert!(scene.needs_repaint(below), "culled subtree stays marked");
        assert!(!scene.needs_repaint(above), "painted subtree is cleared");

        // A full pass clears the rest.
        let mut rec = Recorder::default();
        scene.paint_camera(camera, &mut PaintContext::new(&mut rec));
        assert!(!scene.needs_repaint(below));
    }

    #[test]
    fn culled_child_keeps_ancestors_marked() {
        let (mut scene, camera, below, above) = scene_with_two_shapes();
        let layer = scene.parent_of(below).unwrap();

        // Dirty region covers only `above`; `below` is culled under the
        // shared layer.
        let mut rec = Recorder::default();
        let mut ctx = PaintContext::new(&mut rec).with_dirty(rect(120.0, 120.0, 150.0, 150.0));
        scene.paint_camera(camera, &mut ctx);

        assert!(scene.needs_repaint(below));
        assert!(
            scene.needs_repaint(layer),
            "a culled descendant keeps the layer reporting pending paint"
        );

        let mut rec = Recorder::default();
        scene.paint_camera(camera, &mut PaintContext::new(&mut rec));
        assert!(!scene.needs_repaint(layer));
        assert!(!scene.needs_repaint(below));
    }

    #[test]
    fn shape_geometry_fills_and_strokes() {
        let mut scene = Scene::new();
        let root = scene.create_group();
        let layer = scene.create_layer();
        let camera = scene.create_camera();
        scene.add_child(root, layer);
        scene.add_child(root, camera);
        scene.set_local_bounds(camera, rect(0.0, 0.0, 100.0, 100.0));
        scene.add_layer(camera, layer);

        let shape = scene.create_shape();
        scene.add_child(layer, shape);
        scene.set_geometry(shape, Some(rect(10.0, 10.0, 20.0, 20.0).to_path(1e-3)));
        scene.set_paint(shape, Some(Paint::rgb8(1, 2, 3)));
        scene.set_stroke(
            shape,
            Some(Stroke {
                paint: Paint::rgb8(0, 0, 0),
                width: 2.0,
            }),
        );

        let mut rec = Recorder::default();
        scene.paint_camera(camera, &mut PaintContext::new(&mut rec));
        assert!(rec.ops.contains(&Op::FillPath(Paint::rgb8(1, 2, 3))));
        assert!(rec.ops.contains(&Op::StrokePath(2.0)));
    }

    #[test]
    fn quality_defaults_high_and_orders_low_first() {
        let mut rec = Recorder::default();
        let ctx = PaintContext::new(&mut rec);
        assert_eq!(ctx.quality, RenderQuality::High);
        assert!(RenderQuality::Low < RenderQuality::High);
    }

    #[test]
    fn paint_camera_ignores_non_cameras() {
        let (mut scene, _, below, _) = scene_with_two_shapes();
        let mut rec = Recorder::default();
        scene.paint_camera(below, &mut PaintContext::new(&mut rec));
        assert!(rec.ops.is_empty());
    }

    #[test]
    fn pick_and_paint_agree_on_visibility() {
        let (mut scene, camera, below, _) = scene_with_two_shapes();
        scene.set_visible(below, false);
        let path = scene.pick(camera, Point::new(25.0, 25.0), 0.0).unwrap();
        assert_eq!(path.picked(), camera);
    }
}
