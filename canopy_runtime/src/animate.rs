// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Built-in interpolating activities for node and view transforms.

use canopy_activity::{Activity, Easing, Tick};
use canopy_scene::{NodeId, Scene};
use kurbo::{Affine, Point, Rect};

fn lerp_affine(a: Affine, b: Affine, t: f64) -> Affine {
    let a = a.as_coeffs();
    let b = b.as_coeffs();
    Affine::new(core::array::from_fn(|i| a[i] + (b[i] - a[i]) * t))
}

/// Animates a node's transform from wherever it is at start time to `target`.
///
/// The source is captured in `started`, not at scheduling time, so a delayed
/// animation departs from the node's then-current transform. The final step
/// snaps exactly to the target.
#[derive(Debug)]
pub struct TransformActivity {
    node: NodeId,
    target: Affine,
    easing: Easing,
    source: Option<Affine>,
}

impl TransformActivity {
    /// A linear animation of `node`'s transform toward `target`.
    pub fn new(node: NodeId, target: Affine) -> Self {
        Self {
            node,
            target,
            easing: Easing::default(),
            source: None,
        }
    }

    /// Replace the easing curve.
    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }
}

impl Activity<Scene> for TransformActivity {
    fn started(&mut self, scene: &mut Scene) {
        self.source = scene.transform(self.node);
    }

    fn step(&mut self, scene: &mut Scene, tick: Tick) {
        let Some(source) = self.source else { return };
        let t = self.easing.ease(tick.fraction.unwrap_or(1.0));
        scene.set_transform(self.node, lerp_affine(source, self.target, t));
    }

    fn finished(&mut self, scene: &mut Scene) {
        if self.source.is_some() {
            scene.set_transform(self.node, self.target);
        }
    }
}

/// Animates a camera's view transform, for pan/zoom transitions.
#[derive(Debug)]
pub struct ViewActivity {
    camera: NodeId,
    target: Affine,
    easing: Easing,
    source: Option<Affine>,
}

impl ViewActivity {
    /// An ease-in-out animation of `camera`'s view toward `target`.
    pub fn new(camera: NodeId, target: Affine) -> Self {
        Self {
            camera,
            target,
            easing: Easing::EaseInOut,
            source: None,
        }
    }

    /// Replace the easing curve.
    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }
}

impl Activity<Scene> for ViewActivity {
    fn started(&mut self, scene: &mut Scene) {
        self.source = scene.view_transform(self.camera);
    }

    fn step(&mut self, scene: &mut Scene, tick: Tick) {
        let Some(source) = self.source else { return };
        let t = self.easing.ease(tick.fraction.unwrap_or(1.0));
        scene.set_view_transform(self.camera, lerp_affine(source, self.target, t));
    }

    fn finished(&mut self, scene: &mut Scene) {
        if self.source.is_some() {
            scene.set_view_transform(self.camera, self.target);
        }
    }
}

/// The view transform that centers `bounds` (in viewed space) in the
/// camera's viewport, zoomed so the bounds fit with their aspect preserved.
///
/// `None` for stale or non-camera ids, or when either rectangle is
/// degenerate.
pub fn view_for_centering(scene: &Scene, camera: NodeId, bounds: Rect) -> Option<Affine> {
    scene.view_transform(camera)?;
    let viewport = scene.local_bounds(camera)?;
    if viewport.width() <= 0.0
        || viewport.height() <= 0.0
        || bounds.width() <= 0.0
        || bounds.height() <= 0.0
    {
        return None;
    }
    let scale = (viewport.width() / bounds.width()).min(viewport.height() / bounds.height());
    let viewport_center = viewport.center();
    let bounds_center = bounds.center();
    Some(
        Affine::translate(viewport_center - Point::ZERO)
            * Affine::scale(scale)
            * Affine::translate(Point::ZERO - bounds_center),
    )
}
