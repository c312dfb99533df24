// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Camera/layer membership and repaint fan-out.
//!
//! Layers are the only nodes cameras can view, and the relationship is
//! many-to-many: one camera composites several layers in order, and one layer
//! may appear in several cameras at once. Both sides hold back-references so
//! a repaint anywhere below a layer can be fanned out to every viewport that
//! shows it, mapped through each camera's view transform.
//!
//! A camera's *view transform* maps the viewed space (the coordinate space the
//! layer lives in, i.e. its parent's space) into camera-local viewport space.
//! Panning and zooming therefore never touch the nodes being viewed; two
//! cameras can show the same layer at different magnifications.

use kurbo::{Affine, Point, Rect, Vec2};

use crate::event::{Property, PropertyValue};
use crate::tree::{KindData, Scene};
use crate::types::NodeId;
use crate::util::{rect_is_empty, transform_rect_bbox};

#[cfg(not(feature = "std"))]
#[allow(unused_imports, reason = "FloatFuncs supplies sqrt/abs on no_std builds.")]
use kurbo::common::FloatFuncs as _;

/// Error returned by [`Scene::set_viewport`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ViewportError {
    /// The viewport rectangle had non-positive width or height.
    InvalidSize {
        /// The rejected width.
        width: f64,
        /// The rejected height.
        height: f64,
    },
}

impl core::fmt::Display for ViewportError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidSize { width, height } => {
                write!(f, "viewport size {width}x{height} must be positive")
            }
        }
    }
}

impl core::error::Error for ViewportError {}

/// A pending repaint for one camera, produced by the fan-out walk.
///
/// `rect` is in camera-local viewport space. One originating change produces
/// at most one request per viewing camera.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RepaintRequest {
    /// The camera whose viewport needs redrawing.
    pub camera: NodeId,
    /// Stale region in camera-local space.
    pub rect: Rect,
}

impl Scene {
    // --- membership ---

    /// Make `camera` view `layer`, appending it to the camera's layer list
    /// (later layers composite on top). Returns false unless `camera` is a
    /// live camera node and `layer` a live layer node, or if the pair is
    /// already linked.
    pub fn add_layer(&mut self, camera: NodeId, layer: NodeId) -> bool {
        if !self.is_camera(camera) || !self.is_layer(layer) {
            return false;
        }
        if self.layers_of(camera).contains(&layer) {
            return false;
        }
        match &mut self.node_mut(camera).kind {
            KindData::Camera(c) => c.layers.push(layer),
            _ => unreachable!(),
        }
        match &mut self.node_mut(layer).kind {
            KindData::Layer(l) => l.cameras.push(camera),
            _ => unreachable!(),
        }
        self.repaint_viewport(camera);
        true
    }

    /// Stop `camera` viewing `layer`. Returns false if they were not linked.
    pub fn remove_layer(&mut self, camera: NodeId, layer: NodeId) -> bool {
        if !self.is_camera(camera) || !self.is_layer(layer) {
            return false;
        }
        if !self.layers_of(camera).contains(&layer) {
            return false;
        }
        match &mut self.node_mut(camera).kind {
            KindData::Camera(c) => c.layers.retain(|l| *l != layer),
            _ => unreachable!(),
        }
        match &mut self.node_mut(layer).kind {
            KindData::Layer(l) => l.cameras.retain(|c| *c != camera),
            _ => unreachable!(),
        }
        self.repaint_viewport(camera);
        true
    }

    /// Layers viewed by a camera, in composite order.
    pub fn layers_of(&self, camera: NodeId) -> &[NodeId] {
        match self.node_opt(camera).map(|n| &n.kind) {
            Some(KindData::Camera(c)) => &c.layers,
            _ => &[],
        }
    }

    /// Cameras currently viewing a layer.
    pub fn cameras_of(&self, layer: NodeId) -> &[NodeId] {
        match self.node_opt(layer).map(|n| &n.kind) {
            Some(KindData::Layer(l)) => &l.cameras,
            _ => &[],
        }
    }

    fn is_camera(&self, id: NodeId) -> bool {
        matches!(self.node_opt(id).map(|n| &n.kind), Some(KindData::Camera(_)))
    }

    fn is_layer(&self, id: NodeId) -> bool {
        matches!(self.node_opt(id).map(|n| &n.kind), Some(KindData::Layer(_)))
    }

    /// Unlink all camera/layer pairs involving `id`. Called on removal so
    /// neither side is left pointing at a stale node.
    pub(crate) fn dissolve_memberships(&mut self, id: NodeId) {
        enum Links {
            Layers(alloc::vec::Vec<NodeId>),
            Cameras(alloc::vec::Vec<NodeId>),
            None,
        }
        let links = match &self.node(id).kind {
            KindData::Camera(c) => Links::Layers(c.layers.clone()),
            KindData::Layer(l) => Links::Cameras(l.cameras.clone()),
            _ => Links::None,
        };
        match links {
            Links::Layers(layers) => {
                for layer in layers {
                    if let Some(n) = self.node_opt_mut(layer) {
                        if let KindData::Layer(l) = &mut n.kind {
                            l.cameras.retain(|c| *c != id);
                        }
                    }
                }
            }
            Links::Cameras(cameras) => {
                for camera in cameras {
                    if let Some(n) = self.node_opt_mut(camera) {
                        if let KindData::Camera(c) = &mut n.kind {
                            c.layers.retain(|l| *l != id);
                        }
                    }
                    self.repaint_viewport(camera);
                }
            }
            Links::None => {}
        }
    }

    /// Set a camera's viewport rectangle (its local bounds), rejecting
    /// degenerate sizes at the boundary instead of propagating them into
    /// pick and paint math. No-op `Ok` for stale or non-camera ids.
    pub fn set_viewport(&mut self, camera: NodeId, viewport: Rect) -> Result<(), ViewportError> {
        if viewport.width() <= 0.0 || viewport.height() <= 0.0 {
            return Err(ViewportError::InvalidSize {
                width: viewport.width(),
                height: viewport.height(),
            });
        }
        if self.is_camera(camera) {
            self.set_local_bounds(camera, viewport);
        }
        Ok(())
    }

    // --- view transform ---

    /// The camera's view transform (viewed space to viewport space).
    pub fn view_transform(&self, camera: NodeId) -> Option<Affine> {
        match self.node_opt(camera).map(|n| &n.kind) {
            Some(KindData::Camera(c)) => Some(c.view_transform),
            _ => None,
        }
    }

    /// Replace the view transform, repainting the whole viewport once.
    pub fn set_view_transform(&mut self, camera: NodeId, tf: Affine) {
        if !self.is_camera(camera) {
            return;
        }
        let old = match &mut self.node_mut(camera).kind {
            KindData::Camera(c) => {
                if c.view_transform == tf {
                    return;
                }
                core::mem::replace(&mut c.view_transform, tf)
            }
            _ => unreachable!(),
        };
        self.push_event(
            camera,
            Property::ViewTransform,
            PropertyValue::Transform(old),
            PropertyValue::Transform(tf),
        );
        self.propagate_paint(camera);
        self.repaint_viewport(camera);
    }

    /// Pan the view by `(dx, dy)` in viewed-space units.
    pub fn translate_view(&mut self, camera: NodeId, dx: f64, dy: f64) {
        if let Some(tf) = self.view_transform(camera) {
            self.set_view_transform(camera, tf.pre_translate(Vec2::new(dx, dy)));
        }
    }

    /// Zoom by `s` about a point in viewed space. Cumulative: two calls with
    /// `2.0` leave the view at 4x.
    pub fn scale_view_about(&mut self, camera: NodeId, s: f64, center: Point) {
        if let Some(tf) = self.view_transform(camera) {
            self.set_view_transform(camera, tf * Affine::scale_about(s, center));
        }
    }

    /// Zoom by `s` about the viewed-space origin. Cumulative.
    pub fn scale_view(&mut self, camera: NodeId, s: f64) {
        if let Some(tf) = self.view_transform(camera) {
            self.set_view_transform(camera, tf.pre_scale(s));
        }
    }

    /// Current uniform view magnification, derived from the determinant.
    pub fn view_scale(&self, camera: NodeId) -> Option<f64> {
        self.view_transform(camera)
            .map(|tf| tf.determinant().abs().sqrt())
    }

    /// Set the view magnification to an absolute value, preserving the pan.
    /// Absolute counterpart of the cumulative [`Scene::scale_view`].
    pub fn set_view_scale(&mut self, camera: NodeId, s: f64) {
        if let Some(cur) = self.view_scale(camera) {
            if cur != 0.0 {
                self.scale_view(camera, s / cur);
            }
        }
    }

    /// Map a point from camera-local viewport space into viewed space.
    pub fn view_to_viewed_point(&self, camera: NodeId, p: Point) -> Option<Point> {
        Some(self.view_transform(camera)?.inverse() * p)
    }

    /// The viewed-space region currently visible through the viewport.
    pub fn viewed_region(&self, camera: NodeId) -> Option<Rect> {
        let viewport = self.local_bounds(camera)?;
        let tf = self.view_transform(camera)?;
        Some(transform_rect_bbox(tf.inverse(), viewport))
    }

    // --- repaint queue ---

    /// Drain all pending repaint requests, in the order they were raised.
    pub fn take_repaints(&mut self) -> alloc::vec::Vec<RepaintRequest> {
        core::mem::take(&mut self.repaints)
    }

    /// Whether any repaint request is pending.
    pub fn has_pending_repaints(&self) -> bool {
        !self.repaints.is_empty()
    }

    /// Walk from `start` to the root carrying `rect` (in `start`'s local
    /// space). Every layer passed through enqueues the rect with each of its
    /// viewing cameras, mapped through that camera's view transform; a camera
    /// node on the path enqueues directly. A change below an unviewed subtree
    /// enqueues nothing.
    pub(crate) fn fan_out(&mut self, start: NodeId, rect: Rect) {
        if rect_is_empty(rect) {
            return;
        }
        let mut cur = Some(start);
        let mut r = rect;
        while let Some(id) = cur {
            let (tf, parent, cameras, is_camera) = {
                let n = self.node(id);
                let cameras = match &n.kind {
                    KindData::Layer(l) => l.cameras.clone(),
                    _ => alloc::vec::Vec::new(),
                };
                let is_camera = matches!(n.kind, KindData::Camera(_));
                (n.transform, n.parent, cameras, is_camera)
            };
            // Layers report in their parent's space (the space the view
            // transform is defined against), so map through the layer's own
            // transform first.
            let in_parent = transform_rect_bbox(tf, r);
            for camera in cameras {
                let Some(view_tf) = self.view_transform(camera) else {
                    continue;
                };
                self.repaints.push(RepaintRequest {
                    camera,
                    rect: transform_rect_bbox(view_tf, in_parent),
                });
            }
            if is_camera {
                self.repaints.push(RepaintRequest { camera: id, rect: r });
            }
            r = in_parent;
            cur = parent;
        }
    }

    /// Repaint a camera's entire viewport.
    pub(crate) fn repaint_viewport(&mut self, camera: NodeId) {
        let Some(viewport) = self.local_bounds(camera) else {
            return;
        };
        if rect_is_empty(viewport) {
            return;
        }
        self.repaints.push(RepaintRequest {
            camera,
            rect: viewport,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene_with_view() -> (Scene, NodeId, NodeId, NodeId, NodeId) {
        let mut scene = Scene::new();
        let root = scene.create_group();
        let layer = scene.create_layer();
        let camera = scene.create_camera();
        let shape = scene.create_shape();
        scene.add_child(root, layer);
        scene.add_child(root, camera);
        scene.add_child(layer, shape);
        scene.set_local_bounds(camera, Rect::new(0.0, 0.0, 400.0, 300.0));
        assert!(scene.add_layer(camera, layer));
        scene.take_repaints();
        (scene, root, layer, camera, shape)
    }

    #[test]
    fn set_viewport_rejects_degenerate_sizes() {
        let (mut scene, _, _, camera, _) = scene_with_view();
        let err = scene.set_viewport(camera, Rect::new(0.0, 0.0, 0.0, 100.0));
        assert_eq!(
            err,
            Err(ViewportError::InvalidSize {
                width: 0.0,
                height: 100.0
            })
        );
        assert!(scene.set_viewport(camera, Rect::new(0.0, 0.0, 800.0, 600.0)).is_ok());
        assert_eq!(
            scene.local_bounds(camera),
            Some(Rect::new(0.0, 0.0, 800.0, 600.0))
        );
    }

    #[test]
    fn membership_is_bidirectional() {
        let (scene, _, layer, camera, _) = scene_with_view();
        assert_eq!(scene.layers_of(camera), &[layer]);
        assert_eq!(scene.cameras_of(layer), &[camera]);
    }

    #[test]
    fn add_layer_rejects_wrong_kinds_and_duplicates() {
        let (mut scene, root, layer, camera, shape) = scene_with_view();
        assert!(!scene.add_layer(camera, shape));
        assert!(!scene.add_layer(root, layer));
        assert!(!scene.add_layer(camera, layer), "duplicate link must fail");
        assert_eq!(scene.layers_of(camera).len(), 1);
    }

    #[test]
    fn node_edit_fans_out_to_viewing_camera() {
        let (mut scene, _, _, camera, shape) = scene_with_view();
        scene.set_local_bounds(shape, Rect::new(10.0, 10.0, 20.0, 20.0));
        let reqs = scene.take_repaints();
        assert_eq!(reqs.len(), 1);
        assert_eq!(reqs[0].camera, camera);
        assert_eq!(reqs[0].rect, Rect::new(10.0, 10.0, 20.0, 20.0));
    }

    #[test]
    fn shared_layer_fans_out_to_every_camera() {
        let (mut scene, root, layer, cam_a, shape) = scene_with_view();
        let cam_b = scene.create_camera();
        scene.add_child(root, cam_b);
        scene.set_local_bounds(cam_b, Rect::new(0.0, 0.0, 100.0, 100.0));
        scene.add_layer(cam_b, layer);
        scene.scale_view(cam_b, 2.0);
        scene.take_repaints();

        scene.set_local_bounds(shape, Rect::new(0.0, 0.0, 10.0, 10.0));
        let reqs = scene.take_repaints();
        assert_eq!(reqs.len(), 2, "one request per viewing camera");
        let a = reqs.iter().find(|r| r.camera == cam_a).unwrap();
        let b = reqs.iter().find(|r| r.camera == cam_b).unwrap();
        assert_eq!(a.rect, Rect::new(0.0, 0.0, 10.0, 10.0));
        assert_eq!(b.rect, Rect::new(0.0, 0.0, 20.0, 20.0), "mapped through 2x view");
    }

    #[test]
    fn unviewed_subtree_enqueues_nothing() {
        let mut scene = Scene::new();
        let root = scene.create_group();
        let shape = scene.create_shape();
        scene.add_child(root, shape);
        scene.set_local_bounds(shape, Rect::new(0.0, 0.0, 5.0, 5.0));
        assert!(!scene.has_pending_repaints());
    }

    #[test]
    fn view_transform_maps_through_layer_transform() {
        let (mut scene, _, layer, camera, shape) = scene_with_view();
        scene.translate(layer, 100.0, 0.0);
        scene.take_repaints();
        scene.set_local_bounds(shape, Rect::new(0.0, 0.0, 10.0, 10.0));
        let reqs = scene.take_repaints();
        assert_eq!(reqs[0].camera, camera);
        assert_eq!(
            reqs[0].rect,
            Rect::new(100.0, 0.0, 110.0, 10.0),
            "layer offset applies before the view transform"
        );
    }

    #[test]
    fn view_scale_is_cumulative_and_settable() {
        let (mut scene, _, _, camera, _) = scene_with_view();
        scene.scale_view(camera, 2.0);
        scene.scale_view(camera, 2.0);
        assert!((scene.view_scale(camera).unwrap() - 4.0).abs() < 1e-12);
        scene.set_view_scale(camera, 3.0);
        assert!((scene.view_scale(camera).unwrap() - 3.0).abs() < 1e-12);
        // set_view_scale is absolute, not cumulative.
        scene.set_view_scale(camera, 3.0);
        assert!((scene.view_scale(camera).unwrap() - 3.0).abs() < 1e-12);
    }

    #[test]
    fn set_view_transform_repaints_whole_viewport_once() {
        let (mut scene, _, _, camera, _) = scene_with_view();
        scene.translate_view(camera, 50.0, 0.0);
        let reqs = scene.take_repaints();
        assert_eq!(reqs.len(), 1);
        assert_eq!(reqs[0].rect, Rect::new(0.0, 0.0, 400.0, 300.0));
    }

    #[test]
    fn viewed_region_inverts_the_view() {
        let (mut scene, _, _, camera, _) = scene_with_view();
        scene.scale_view(camera, 2.0);
        let region = scene.viewed_region(camera).unwrap();
        assert_eq!(region, Rect::new(0.0, 0.0, 200.0, 150.0));
    }

    #[test]
    fn removing_layer_node_unlinks_cameras() {
        let (mut scene, _, layer, camera, _) = scene_with_view();
        scene.remove(layer);
        assert!(scene.layers_of(camera).is_empty());
        let reqs = scene.take_repaints();
        assert!(
            reqs.iter().any(|r| r.camera == camera),
            "camera must repaint after losing a layer"
        );
    }

    #[test]
    fn removing_camera_unlinks_layers() {
        let (mut scene, _, layer, camera, _) = scene_with_view();
        scene.remove(camera);
        assert!(scene.cameras_of(layer).is_empty());
    }
}
