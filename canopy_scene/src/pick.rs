// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Depth-first picking.
//!
//! A pick starts at a camera with a point in viewport space, tests the
//! camera's own overlay children, then descends each viewed layer top-down:
//! children are tested in reverse paint order so the topmost coincident node
//! wins, and the walk prunes any subtree whose full bounds miss the point. The result is the whole camera-to-node path, with a
//! cached node-to-camera transform per entry, so input dispatch can bubble
//! from the deepest node back to the camera without re-walking the tree.

use kurbo::{Affine, Point, Shape as _};
use smallvec::SmallVec;

use crate::tree::{KindData, Scene};
use crate::types::{NodeFlags, NodeId};

#[cfg(not(feature = "std"))]
#[allow(unused_imports, reason = "FloatFuncs supplies sqrt/abs on no_std builds.")]
use kurbo::common::FloatFuncs as _;

/// One node on a pick path, with its composed transform into camera space.
#[derive(Copy, Clone, Debug)]
pub struct PickEntry {
    /// The node at this step of the path.
    pub node: NodeId,
    /// Maps this node's local space into camera viewport space.
    pub to_camera: Affine,
}

/// The path from a camera down to the picked node, camera first.
///
/// The picked node is the deepest pickable hit; when the point lands on empty
/// viewport the camera itself is the pick and the path holds only the camera
/// entry.
#[derive(Clone, Debug)]
pub struct PickPath {
    picked: NodeId,
    entries: SmallVec<[PickEntry; 8]>,
}

impl PickPath {
    /// The picked node.
    pub fn picked(&self) -> NodeId {
        self.picked
    }

    /// The camera the pick was made through.
    pub fn camera(&self) -> NodeId {
        self.entries[0].node
    }

    /// Entries from the camera down to the deepest hit node.
    pub fn entries(&self) -> &[PickEntry] {
        &self.entries
    }

    /// Nodes on the path, camera first.
    pub fn nodes(&self) -> impl DoubleEndedIterator<Item = NodeId> + '_ {
        self.entries.iter().map(|e| e.node)
    }

    /// Whether `node` lies on the path.
    pub fn contains(&self, node: NodeId) -> bool {
        self.entries.iter().any(|e| e.node == node)
    }

    /// Composed transform from `node`'s local space to camera space, if the
    /// node is on the path.
    pub fn to_camera(&self, node: NodeId) -> Option<Affine> {
        self.entries
            .iter()
            .find(|e| e.node == node)
            .map(|e| e.to_camera)
    }

    /// Map a viewport-space point into `node`'s local space using the cached
    /// transforms.
    pub fn to_local_point(&self, node: NodeId, p: Point) -> Option<Point> {
        Some(self.to_camera(node)?.inverse() * p)
    }
}

impl Scene {
    /// Pick at `pos` (camera viewport space): the camera's overlay children
    /// first (they paint topmost), then each viewed layer through the view
    /// transform.
    ///
    /// `halo` widens every bounds test by that many viewport pixels, so thin
    /// strokes remain clickable at low zoom. Returns `None` for stale or
    /// non-camera ids and for points outside the viewport; a point inside the
    /// viewport that hits nothing picks the camera itself.
    pub fn pick(&mut self, camera: NodeId, pos: Point, halo: f64) -> Option<PickPath> {
        let layers = match self.node_opt(camera).map(|n| &n.kind) {
            Some(KindData::Camera(c)) => c.layers.clone(),
            _ => return None,
        };
        let viewport = self.local_bounds(camera)?;
        if !viewport.inflate(halo, halo).contains(pos) {
            return None;
        }
        let view_tf = self.view_transform(camera)?;

        let mut entries = SmallVec::new();
        entries.push(PickEntry {
            node: camera,
            to_camera: Affine::IDENTITY,
        });
        // Overlay children paint on top of every layer and stay anchored in
        // viewport space, so they are tested first and without the view
        // transform.
        let children = self.node(camera).children.clone();
        for &child in children.iter().rev() {
            if let Some(picked) = self.pick_node(child, Affine::IDENTITY, pos, halo, &mut entries)
            {
                return Some(PickPath { picked, entries });
            }
        }
        // Topmost layer first.
        for &layer in layers.iter().rev() {
            if !self.is_alive(layer) {
                continue;
            }
            if let Some(picked) = self.pick_node(layer, view_tf, pos, halo, &mut entries) {
                return Some(PickPath { picked, entries });
            }
        }
        Some(PickPath {
            picked: camera,
            entries,
        })
    }

    /// Test `node` (whose parent space maps to camera space by `base`) and
    /// its subtree. On a hit the path entry stays pushed and the deepest
    /// pickable node is returned; on a miss the entry is popped again.
    fn pick_node(
        &mut self,
        node: NodeId,
        base: Affine,
        pos: Point,
        halo: f64,
        entries: &mut SmallVec<[PickEntry; 8]>,
    ) -> Option<NodeId> {
        let flags = self.flags(node)?;
        if !flags.contains(NodeFlags::VISIBLE) {
            return None;
        }
        self.validate_bounds(node);
        let (to_camera, full_bounds) = {
            let n = self.node(node);
            (base * n.transform, n.full_bounds)
        };
        let scale = to_camera.determinant().abs().sqrt();
        if scale == 0.0 {
            return None;
        }
        let local_halo = halo / scale;
        let p = to_camera.inverse() * pos;
        if !full_bounds.inflate(local_halo, local_halo).contains(p) {
            return None;
        }

        entries.push(PickEntry { node, to_camera });
        let children = self.node(node).children.clone();
        for &child in children.iter().rev() {
            if let Some(picked) = self.pick_node(child, to_camera, pos, halo, entries) {
                return Some(picked);
            }
        }

        if flags.contains(NodeFlags::PICKABLE) && self.hits_self(node, p, local_halo) {
            return Some(node);
        }
        entries.pop();
        None
    }

    /// Whether the point (in node-local space) lands on the node's own
    /// geometry, as opposed to somewhere inside its children's extent.
    fn hits_self(&self, node: NodeId, p: Point, local_halo: f64) -> bool {
        let n = self.node(node);
        if let KindData::Shape(s) = &n.kind {
            if let Some(geometry) = &s.geometry {
                // Exact test against the path interior; the halo falls back
                // to the (already stroke-inflated) local bounds.
                return geometry.contains(p)
                    || (local_halo > 0.0
                        && n.local_bounds.inflate(local_halo, local_halo).contains(p));
            }
        }
        n.local_bounds.inflate(local_halo, local_halo).contains(p)
    }
}
