// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Core scene implementation: node arena, structure edits, the lazy
//! bounds/paint invalidation engine, and coordinate conversion.

use alloc::string::String;
use alloc::vec::Vec;
use hashbrown::HashMap;
use kurbo::{Affine, BezPath, Point, Rect, Shape};

use crate::event::PropertyEvent;
use crate::types::{AttrValue, NodeFlags, NodeId, NodeKind, Paint, Stroke};
use crate::util::{rect_is_empty, transform_rect_bbox};
use crate::view::RepaintRequest;

#[cfg(not(feature = "std"))]
#[allow(unused_imports, reason = "FloatFuncs supplies sqrt/abs on no_std builds.")]
use kurbo::common::FloatFuncs as _;

bitflags::bitflags! {
    /// Per-node invalidation state.
    ///
    /// `BOUNDS` and `PAINT` mean "this node itself is stale";
    /// `CHILD_BOUNDS` and `CHILD_PAINT` mean "something in this subtree is
    /// stale". The child flags are set monotonically on the ancestor chain
    /// with an early-out once a node already carries the flag, and cleared
    /// only by the matching validate/paint pass.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub(crate) struct DirtyFlags: u8 {
        const BOUNDS       = 0b0000_0001;
        const CHILD_BOUNDS = 0b0000_0010;
        const PAINT        = 0b0000_0100;
        const CHILD_PAINT  = 0b0000_1000;
    }
}

/// Error returned by [`Scene::insert_child`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum InsertError {
    /// The requested index exceeds the parent's child count.
    IndexOutOfRange {
        /// The requested index.
        index: usize,
        /// The child count at the time of the call.
        len: usize,
    },
    /// Either id was stale, the parent and child were the same node, or the
    /// edit would have created a cycle.
    InvalidEdit,
}

impl core::fmt::Display for InsertError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::IndexOutOfRange { index, len } => {
                write!(f, "child index {index} out of range (len {len})")
            }
            Self::InvalidEdit => write!(f, "edit would detach from the arena or create a cycle"),
        }
    }
}

impl core::error::Error for InsertError {}

#[derive(Clone, Debug, Default)]
pub(crate) struct ShapeData {
    pub(crate) geometry: Option<BezPath>,
    pub(crate) stroke: Option<Stroke>,
}

#[derive(Clone, Debug, Default)]
pub(crate) struct LayerData {
    /// Cameras currently displaying this layer (back-references).
    pub(crate) cameras: Vec<NodeId>,
}

#[derive(Clone, Debug)]
pub(crate) struct CameraData {
    /// Maps the viewed space (the layer's parent space) into camera-local
    /// viewport space.
    pub(crate) view_transform: Affine,
    /// Layers composited by this camera, in paint order.
    pub(crate) layers: Vec<NodeId>,
}

impl Default for CameraData {
    fn default() -> Self {
        Self {
            view_transform: Affine::IDENTITY,
            layers: Vec::new(),
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) enum KindData {
    Group,
    Shape(ShapeData),
    Layer(LayerData),
    Camera(CameraData),
}

impl KindData {
    fn kind(&self) -> NodeKind {
        match self {
            Self::Group => NodeKind::Group,
            Self::Shape(_) => NodeKind::Shape,
            Self::Layer(_) => NodeKind::Layer,
            Self::Camera(_) => NodeKind::Camera,
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Node {
    generation: u32,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) local_bounds: Rect,
    pub(crate) transform: Affine,
    pub(crate) flags: NodeFlags,
    pub(crate) paint: Option<Paint>,
    pub(crate) kind: KindData,
    pub(crate) attrs: HashMap<String, AttrValue>,
    /// Cached union of `local_bounds` and all child contributions, in this
    /// node's local space. Valid only while `CHILD_BOUNDS` is clear.
    pub(crate) full_bounds: Rect,
    pub(crate) dirty: DirtyFlags,
}

impl Node {
    fn new(generation: u32, kind: KindData) -> Self {
        Self {
            generation,
            parent: None,
            children: Vec::new(),
            local_bounds: Rect::ZERO,
            transform: Affine::IDENTITY,
            flags: NodeFlags::default(),
            paint: None,
            kind,
            attrs: HashMap::new(),
            full_bounds: Rect::ZERO,
            dirty: DirtyFlags::CHILD_BOUNDS | DirtyFlags::PAINT,
        }
    }
}

/// Retained-mode scene graph: a generational arena of nodes with lazily
/// validated full-bounds and paint caches.
///
/// Nodes are created detached ([`Scene::create_group`] and friends) and become
/// part of a tree through [`Scene::add_child`]; ownership is tree membership.
/// Structure and geometry edits mark invalidation flags cheaply; the expensive
/// recomputation happens on the next read of [`Scene::full_bounds`] (or during
/// picking/painting, which validate as they walk).
///
/// ## Example
///
/// ```rust
/// use canopy_scene::Scene;
/// use kurbo::Rect;
///
/// let mut scene = Scene::new();
/// let root = scene.create_group();
/// let child = scene.create_shape();
/// scene.add_child(root, child);
/// scene.set_local_bounds(child, Rect::new(0.0, 0.0, 100.0, 100.0));
///
/// assert_eq!(
///     scene.full_bounds(root),
///     Some(Rect::new(0.0, 0.0, 100.0, 100.0)),
/// );
/// ```
pub struct Scene {
    /// slots
    nodes: Vec<Option<Node>>,
    /// last generation per slot (persists across frees)
    generations: Vec<u32>,
    free_list: Vec<usize>,
    pub(crate) repaints: Vec<RepaintRequest>,
    pub(crate) events: Vec<PropertyEvent>,
    pub(crate) record_events: bool,
    invalidation_steps: u64,
}

impl core::fmt::Debug for Scene {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let alive = self.nodes.iter().filter(|n| n.is_some()).count();
        f.debug_struct("Scene")
            .field("nodes_total", &self.nodes.len())
            .field("nodes_alive", &alive)
            .field("pending_repaints", &self.repaints.len())
            .field("invalidation_steps", &self.invalidation_steps)
            .finish_non_exhaustive()
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    /// Create an empty scene.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            generations: Vec::new(),
            free_list: Vec::new(),
            repaints: Vec::new(),
            events: Vec::new(),
            record_events: false,
            invalidation_steps: 0,
        }
    }

    #[allow(
        clippy::cast_possible_truncation,
        reason = "node indices are 32-bit by design"
    )]
    fn create(&mut self, kind: KindData) -> NodeId {
        if let Some(idx) = self.free_list.pop() {
            let generation = self.generations[idx].saturating_add(1);
            self.generations[idx] = generation;
            self.nodes[idx] = Some(Node::new(generation, kind));
            NodeId::new(idx as u32, generation)
        } else {
            let generation = 1_u32;
            self.nodes.push(Some(Node::new(generation, kind)));
            self.generations.push(generation);
            NodeId::new((self.nodes.len() - 1) as u32, generation)
        }
    }

    /// Create a detached container node.
    pub fn create_group(&mut self) -> NodeId {
        self.create(KindData::Group)
    }

    /// Create a detached shape node.
    pub fn create_shape(&mut self) -> NodeId {
        self.create(KindData::Shape(ShapeData::default()))
    }

    /// Create a detached layer node. Attach it to the tree with
    /// [`Scene::add_child`] and to a viewport with [`Scene::add_layer`].
    pub fn create_layer(&mut self) -> NodeId {
        self.create(KindData::Layer(LayerData::default()))
    }

    /// Create a detached camera node with an identity view transform.
    pub fn create_camera(&mut self) -> NodeId {
        self.create(KindData::Camera(CameraData::default()))
    }

    /// Returns true if `id` refers to a live node.
    pub fn is_alive(&self, id: NodeId) -> bool {
        self.nodes
            .get(id.idx())
            .and_then(|n| n.as_ref())
            .map(|n| n.generation == id.1)
            .unwrap_or(false)
    }

    /// Kind of a live node.
    pub fn kind(&self, id: NodeId) -> Option<NodeKind> {
        self.node_opt(id).map(|n| n.kind.kind())
    }

    // --- structure ---

    /// Attach `child` as the last (topmost) child of `parent`.
    ///
    /// If `child` is currently attached elsewhere it is detached first.
    /// Returns false for stale ids, self-parenting, or an edit that would
    /// create a cycle.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        let Ok(()) = self.insert_child_inner(parent, None, child) else {
            return false;
        };
        true
    }

    /// Attach `child` at `index` in `parent`'s child list.
    ///
    /// `index == len` appends. Larger indices fail with
    /// [`InsertError::IndexOutOfRange`] rather than panicking.
    pub fn insert_child(
        &mut self,
        parent: NodeId,
        index: usize,
        child: NodeId,
    ) -> Result<(), InsertError> {
        self.insert_child_inner(parent, Some(index), child)
    }

    fn insert_child_inner(
        &mut self,
        parent: NodeId,
        index: Option<usize>,
        child: NodeId,
    ) -> Result<(), InsertError> {
        if !self.is_alive(parent) || !self.is_alive(child) || parent == child {
            return Err(InsertError::InvalidEdit);
        }
        if self.is_ancestor(child, parent) {
            // Would create a cycle.
            return Err(InsertError::InvalidEdit);
        }
        if let Some(i) = index {
            let len = self.node(parent).children.len();
            if i > len {
                return Err(InsertError::IndexOutOfRange { index: i, len });
            }
        }
        if self.node(child).parent.is_some() {
            self.detach(child);
        }
        match index {
            Some(i) => self.node_mut(parent).children.insert(i, child),
            None => self.node_mut(parent).children.push(child),
        }
        self.node_mut(child).parent = Some(parent);
        self.push_child_events(parent, child, true);
        self.invalidate_full_bounds(parent);
        self.invalidate_paint(child);
        Ok(())
    }

    /// Detach `child` from its parent, leaving it (and its subtree) alive in
    /// the arena for later reattachment. Returns false if it had no parent.
    pub fn detach(&mut self, child: NodeId) -> bool {
        if !self.is_alive(child) {
            return false;
        }
        let Some(parent) = self.node(child).parent else {
            return false;
        };
        // The vacated region must repaint; capture it before unlinking.
        self.validate_bounds(child);
        let n = self.node(child);
        let region = transform_rect_bbox(n.transform, n.full_bounds);
        self.node_mut(parent).children.retain(|c| *c != child);
        self.node_mut(child).parent = None;
        self.push_child_events(parent, child, false);
        self.invalidate_full_bounds(parent);
        self.propagate_up(Some(parent), DirtyFlags::CHILD_PAINT);
        self.fan_out(parent, region);
        true
    }

    /// Remove a node and its subtree from the arena.
    ///
    /// Camera/layer memberships touching the subtree are dissolved so the
    /// bidirectional invariant holds afterwards. Ids into the subtree become
    /// stale.
    pub fn remove(&mut self, id: NodeId) {
        if !self.is_alive(id) {
            return;
        }
        self.detach(id);
        self.remove_subtree(id);
    }

    fn remove_subtree(&mut self, id: NodeId) {
        let children = self.node(id).children.clone();
        for child in children {
            self.remove_subtree(child);
        }
        self.dissolve_memberships(id);
        self.nodes[id.idx()] = None;
        self.free_list.push(id.idx());
    }

    /// Returns the parent of a node if live, or `None` for roots or stale ids.
    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.node_opt(id).and_then(|n| n.parent)
    }

    /// Children of a node in paint order (last is topmost), or an empty slice
    /// for stale ids.
    pub fn children_of(&self, id: NodeId) -> &[NodeId] {
        match self.node_opt(id) {
            Some(n) => &n.children,
            None => &[],
        }
    }

    /// Child at `index`, or `None` when out of range (never panics).
    pub fn child_at(&self, id: NodeId, index: usize) -> Option<NodeId> {
        self.node_opt(id)?.children.get(index).copied()
    }

    /// Whether `ancestor` is a strict ancestor of `id`.
    pub fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut cur = self.parent_of(id);
        while let Some(n) = cur {
            if n == ancestor {
                return true;
            }
            cur = self.parent_of(n);
        }
        false
    }

    // --- geometry and appearance ---

    /// Local (untransformed) bounds of a node.
    pub fn local_bounds(&self, id: NodeId) -> Option<Rect> {
        self.node_opt(id).map(|n| n.local_bounds)
    }

    /// Set a node's local bounds, invalidating ancestor full-bounds caches
    /// and scheduling a repaint of the old and new regions.
    pub fn set_local_bounds(&mut self, id: NodeId, bounds: Rect) {
        if !self.is_alive(id) || self.node(id).local_bounds == bounds {
            return;
        }
        self.validate_bounds(id);
        let (old, old_fb) = {
            let n = self.node(id);
            (n.local_bounds, n.full_bounds)
        };
        self.node_mut(id).local_bounds = bounds;
        self.push_bounds_event(id, old, bounds);
        self.invalidate_full_bounds(id);
        self.propagate_paint(id);
        let new_fb = self.validated_full_bounds(id);
        self.fan_out(id, union_nonempty(old_fb, new_fb));
    }

    /// Transform mapping this node's local space into its parent's space.
    pub fn transform(&self, id: NodeId) -> Option<Affine> {
        self.node_opt(id).map(|n| n.transform)
    }

    /// Replace a node's transform.
    ///
    /// The node's own full bounds are unaffected (they live in local space);
    /// its contribution to the parent changes, so invalidation starts at the
    /// parent chain.
    pub fn set_transform(&mut self, id: NodeId, tf: Affine) {
        if !self.is_alive(id) || self.node(id).transform == tf {
            return;
        }
        self.validate_bounds(id);
        let (old, fb, parent) = {
            let n = self.node(id);
            (n.transform, n.full_bounds, n.parent)
        };
        self.node_mut(id).transform = tf;
        self.push_transform_event(id, old, tf);
        self.propagate_up(parent, DirtyFlags::CHILD_BOUNDS);
        self.propagate_paint(id);
        if !rect_is_empty(fb) {
            // Union the old and new screen regions in parent space, then map
            // back into local space so the fan-out walk starts at this node.
            let moved = transform_rect_bbox(old, fb).union(transform_rect_bbox(tf, fb));
            self.fan_out(id, transform_rect_bbox(tf.inverse(), moved));
        }
    }

    /// Translate the node in its local coordinate system.
    pub fn translate(&mut self, id: NodeId, dx: f64, dy: f64) {
        if let Some(tf) = self.transform(id) {
            self.set_transform(id, tf.pre_translate(kurbo::Vec2::new(dx, dy)));
        }
    }

    /// Scale the node uniformly about its local origin. Cumulative.
    pub fn scale(&mut self, id: NodeId, s: f64) {
        if let Some(tf) = self.transform(id) {
            self.set_transform(id, tf.pre_scale(s));
        }
    }

    /// Scale the node uniformly about a point in its local space.
    pub fn scale_about(&mut self, id: NodeId, s: f64, center: Point) {
        if let Some(tf) = self.transform(id) {
            self.set_transform(id, tf * Affine::scale_about(s, center));
        }
    }

    /// Rotate the node about its local origin by `radians`. Cumulative.
    pub fn rotate(&mut self, id: NodeId, radians: f64) {
        if let Some(tf) = self.transform(id) {
            self.set_transform(id, tf.pre_rotate(radians));
        }
    }

    /// Node flags.
    pub fn flags(&self, id: NodeId) -> Option<NodeFlags> {
        self.node_opt(id).map(|n| n.flags)
    }

    /// Toggle visibility. Hiding or showing a node repaints its region.
    pub fn set_visible(&mut self, id: NodeId, visible: bool) {
        let Some(n) = self.node_opt(id) else { return };
        if n.flags.contains(NodeFlags::VISIBLE) == visible {
            return;
        }
        self.node_mut(id).flags.set(NodeFlags::VISIBLE, visible);
        self.push_flag_event(id, crate::event::Property::Visible, !visible, visible);
        self.invalidate_paint(id);
    }

    /// Toggle pickability. Picking still traverses the subtree; only this
    /// node stops being reportable as the picked node.
    pub fn set_pickable(&mut self, id: NodeId, pickable: bool) {
        let Some(n) = self.node_opt(id) else { return };
        if n.flags.contains(NodeFlags::PICKABLE) == pickable {
            return;
        }
        self.node_mut(id).flags.set(NodeFlags::PICKABLE, pickable);
        self.push_flag_event(id, crate::event::Property::Pickable, !pickable, pickable);
    }

    /// Fill paint of a node.
    pub fn paint(&self, id: NodeId) -> Option<Paint> {
        self.node_opt(id).and_then(|n| n.paint)
    }

    /// Set the fill paint. A pure appearance change: repaints without any
    /// bounds invalidation.
    pub fn set_paint(&mut self, id: NodeId, paint: Option<Paint>) {
        let Some(n) = self.node_opt(id) else { return };
        if n.paint == paint {
            return;
        }
        let old = n.paint;
        self.node_mut(id).paint = paint;
        self.push_paint_event(id, old, paint);
        self.invalidate_paint(id);
    }

    /// Exact geometry of a shape node.
    pub fn geometry(&self, id: NodeId) -> Option<&BezPath> {
        match &self.node_opt(id)?.kind {
            KindData::Shape(s) => s.geometry.as_ref(),
            _ => None,
        }
    }

    /// Set a shape node's exact geometry. The node's local bounds are
    /// re-derived from the geometry on the next bounds validation.
    /// Returns false for non-shape nodes.
    pub fn set_geometry(&mut self, id: NodeId, geometry: Option<BezPath>) -> bool {
        if !self.is_alive(id) {
            return false;
        }
        match &mut self.node_mut(id).kind {
            KindData::Shape(s) => s.geometry = geometry,
            _ => return false,
        }
        self.invalidate_node_bounds(id);
        true
    }

    /// Stroke of a shape node.
    pub fn stroke(&self, id: NodeId) -> Option<Stroke> {
        match &self.node_opt(id)?.kind {
            KindData::Shape(s) => s.stroke,
            _ => None,
        }
    }

    /// Set a shape node's stroke. Stroke width inflates the derived local
    /// bounds, so this is a bounds-affecting edit when geometry is present.
    pub fn set_stroke(&mut self, id: NodeId, stroke: Option<Stroke>) -> bool {
        if !self.is_alive(id) {
            return false;
        }
        match &mut self.node_mut(id).kind {
            KindData::Shape(s) => s.stroke = stroke,
            _ => return false,
        }
        self.invalidate_node_bounds(id);
        true
    }

    /// Read an attribute.
    pub fn attr(&self, id: NodeId, key: &str) -> Option<&AttrValue> {
        self.node_opt(id)?.attrs.get(key)
    }

    /// Set or replace an attribute. Attributes are opaque to the core.
    pub fn set_attr(&mut self, id: NodeId, key: impl Into<String>, value: AttrValue) {
        if self.is_alive(id) {
            self.node_mut(id).attrs.insert(key.into(), value);
        }
    }

    /// Remove an attribute, returning its previous value.
    pub fn remove_attr(&mut self, id: NodeId, key: &str) -> Option<AttrValue> {
        if !self.is_alive(id) {
            return None;
        }
        self.node_mut(id).attrs.remove(key)
    }

    // --- invalidation engine ---

    /// Mark this node's own geometry stale (shape geometry or stroke edits)
    /// and schedule repaint of the old and new regions.
    fn invalidate_node_bounds(&mut self, id: NodeId) {
        self.validate_bounds(id);
        let old_fb = self.node(id).full_bounds;
        self.node_mut(id).dirty |= DirtyFlags::BOUNDS;
        self.invalidate_full_bounds(id);
        self.propagate_paint(id);
        let new_fb = self.validated_full_bounds(id);
        self.fan_out(id, union_nonempty(old_fb, new_fb));
    }

    /// Mark this node's full-bounds cache stale and walk the ancestor chain
    /// with the idempotent early-out.
    fn invalidate_full_bounds(&mut self, id: NodeId) {
        let parent = {
            let n = self.node_mut(id);
            n.dirty |= DirtyFlags::CHILD_BOUNDS;
            n.parent
        };
        self.propagate_up(parent, DirtyFlags::CHILD_BOUNDS);
    }

    /// Walk upward setting `flag`, stopping as soon as a node already carries
    /// it. Repeated edits to the same subtree therefore cost O(1) after the
    /// first walk.
    pub(crate) fn propagate_up(&mut self, start: Option<NodeId>, flag: DirtyFlags) {
        let mut cur = start;
        while let Some(id) = cur {
            let Some(n) = self.node_opt_mut(id) else {
                break;
            };
            if n.dirty.contains(flag) {
                break;
            }
            n.dirty |= flag;
            let parent = n.parent;
            self.invalidation_steps += 1;
            cur = parent;
        }
    }

    pub(crate) fn propagate_paint(&mut self, id: NodeId) {
        let parent = {
            let n = self.node_mut(id);
            n.dirty |= DirtyFlags::PAINT;
            n.parent
        };
        self.propagate_up(parent, DirtyFlags::CHILD_PAINT);
    }

    /// Mark a node as needing repaint and fan the request out to every camera
    /// viewing it (see the module docs on `view`).
    pub fn invalidate_paint(&mut self, id: NodeId) {
        if !self.is_alive(id) {
            return;
        }
        self.propagate_paint(id);
        self.repaint(id);
    }

    /// Schedule a repaint of this node's current full bounds with every
    /// viewing camera, without touching invalidation flags.
    pub fn repaint(&mut self, id: NodeId) {
        if !self.is_alive(id) {
            return;
        }
        let fb = self.validated_full_bounds(id);
        self.fan_out(id, fb);
    }

    /// Total ancestor-walk marks performed so far. Exposed so idempotent
    /// propagation is testable by counting rather than only by final state.
    pub fn invalidation_steps(&self) -> u64 {
        self.invalidation_steps
    }

    // --- validation ---

    /// Full bounds of a node in its own local space: the union of its local
    /// bounds and every child's full bounds mapped through that child's
    /// transform. Validates lazily on read.
    pub fn full_bounds(&mut self, id: NodeId) -> Option<Rect> {
        if !self.is_alive(id) {
            return None;
        }
        Some(self.validated_full_bounds(id))
    }

    /// Full bounds mapped into root/global space.
    pub fn global_full_bounds(&mut self, id: NodeId) -> Option<Rect> {
        let fb = self.full_bounds(id)?;
        let tf = self.local_to_global(id)?;
        Some(transform_rect_bbox(tf, fb))
    }

    fn validated_full_bounds(&mut self, id: NodeId) -> Rect {
        self.validate_bounds(id);
        self.node(id).full_bounds
    }

    pub(crate) fn validate_bounds(&mut self, id: NodeId) {
        let Some(n) = self.node_opt(id) else { return };
        let dirty = n.dirty;
        if !dirty.intersects(DirtyFlags::BOUNDS | DirtyFlags::CHILD_BOUNDS) {
            return;
        }
        if dirty.contains(DirtyFlags::BOUNDS) {
            // Node-specific geometry first: shape nodes re-derive local
            // bounds from their exact geometry, inflated by half the stroke.
            let derived = match &self.node(id).kind {
                KindData::Shape(s) => s.geometry.as_ref().map(|g| {
                    let mut b = g.bounding_box();
                    if let Some(stroke) = s.stroke {
                        b = b.inflate(stroke.width / 2.0, stroke.width / 2.0);
                    }
                    b
                }),
                _ => None,
            };
            let n = self.node_mut(id);
            if let Some(b) = derived {
                n.local_bounds = b;
            }
            n.dirty.remove(DirtyFlags::BOUNDS);
        }
        if dirty.contains(DirtyFlags::CHILD_BOUNDS) {
            // Snapshot the child list: validation hooks must not observe a
            // half-iterated traversal if a callee mutates structure.
            let children = self.node(id).children.clone();
            for &child in &children {
                self.validate_bounds(child);
            }
            let local = self.node(id).local_bounds;
            let mut acc = (!rect_is_empty(local)).then_some(local);
            for &child in &children {
                let (tf, fb) = {
                    let c = self.node(child);
                    (c.transform, c.full_bounds)
                };
                if !rect_is_empty(fb) {
                    let r = transform_rect_bbox(tf, fb);
                    acc = Some(match acc {
                        Some(a) => a.union(r),
                        None => r,
                    });
                }
            }
            let n = self.node_mut(id);
            n.full_bounds = acc.unwrap_or(local);
            n.dirty.remove(DirtyFlags::CHILD_BOUNDS);
        }
    }

    // --- coordinate conversion ---

    /// Composition of transforms from this node's local space up to root
    /// space.
    pub fn local_to_global(&self, id: NodeId) -> Option<Affine> {
        if !self.is_alive(id) {
            return None;
        }
        let mut chain = self.chain_to_root(id);
        let mut out = Affine::IDENTITY;
        while let Some(n) = chain.pop() {
            out *= self.node(n).transform;
        }
        Some(out)
    }

    /// Map a point from this node's local space into root space.
    pub fn local_to_global_point(&self, id: NodeId, p: Point) -> Option<Point> {
        Some(self.local_to_global(id)? * p)
    }

    /// Map a point from root space into this node's local space.
    ///
    /// Each link in the ancestor chain is inverted individually rather than
    /// inverting one composed matrix, which keeps numeric error lower on
    /// non-uniform scales.
    pub fn global_to_local_point(&self, id: NodeId, p: Point) -> Option<Point> {
        if !self.is_alive(id) {
            return None;
        }
        let mut out = p;
        let mut chain = self.chain_to_root(id);
        while let Some(n) = chain.pop() {
            out = self.node(n).transform.inverse() * out;
        }
        Some(out)
    }

    /// Map a rectangle from root space into this node's local space,
    /// taking the conservative bounding box at each link.
    pub fn global_to_local_rect(&self, id: NodeId, r: Rect) -> Option<Rect> {
        if !self.is_alive(id) {
            return None;
        }
        let mut out = r;
        let mut chain = self.chain_to_root(id);
        while let Some(n) = chain.pop() {
            out = transform_rect_bbox(self.node(n).transform.inverse(), out);
        }
        Some(out)
    }

    /// Cumulative uniform scale from this node's local space to root space:
    /// the product of each link's scale factor.
    ///
    /// Meaningful only while every ancestor transform is a uniform scale
    /// (plus rotation/translation); the result under shear or anisotropic
    /// scale is undefined by design.
    pub fn global_scale(&self, id: NodeId) -> Option<f64> {
        if !self.is_alive(id) {
            return None;
        }
        let mut s = 1.0;
        let mut cur = Some(id);
        while let Some(n) = cur {
            let node = self.node(n);
            s *= node.transform.determinant().abs().sqrt();
            cur = node.parent;
        }
        Some(s)
    }

    /// Ancestors from `id` (inclusive) to the root, nearest first.
    fn chain_to_root(&self, id: NodeId) -> Vec<NodeId> {
        let mut chain = Vec::new();
        let mut cur = Some(id);
        while let Some(n) = cur {
            chain.push(n);
            cur = self.node(n).parent;
        }
        chain
    }

    // --- internals ---

    /// Access a node; panics if `id` is stale.
    pub(crate) fn node(&self, id: NodeId) -> &Node {
        self.nodes[id.idx()].as_ref().expect("dangling NodeId")
    }

    /// Access a node mutably; panics if `id` is stale.
    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        self.nodes[id.idx()].as_mut().expect("dangling NodeId")
    }

    pub(crate) fn node_opt(&self, id: NodeId) -> Option<&Node> {
        let n = self.nodes.get(id.idx())?.as_ref()?;
        (n.generation == id.1).then_some(n)
    }

    pub(crate) fn node_opt_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        let n = self.nodes.get_mut(id.idx())?.as_mut()?;
        (n.generation == id.1).then_some(n)
    }
}

pub(crate) fn union_nonempty(a: Rect, b: Rect) -> Rect {
    match (rect_is_empty(a), rect_is_empty(b)) {
        (true, _) => b,
        (_, true) => a,
        _ => a.union(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NodeKind;
    use kurbo::Vec2;

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Rect {
        Rect::new(x0, y0, x1, y1)
    }

    #[test]
    fn create_detached_and_attach() {
        let mut scene = Scene::new();
        let root = scene.create_group();
        let child = scene.create_shape();
        assert_eq!(scene.parent_of(child), None);
        assert!(scene.add_child(root, child));
        assert_eq!(scene.parent_of(child), Some(root));
        assert_eq!(scene.children_of(root), &[child]);
        assert_eq!(scene.kind(child), Some(NodeKind::Shape));
    }

    #[test]
    fn full_bounds_is_union_of_local_and_transformed_children() {
        let mut scene = Scene::new();
        let parent = scene.create_group();
        let child = scene.create_shape();
        scene.add_child(parent, child);
        scene.set_local_bounds(parent, rect(0.0, 0.0, 100.0, 100.0));
        scene.set_local_bounds(child, rect(0.0, 0.0, 100.0, 100.0));
        scene.scale(child, 2.0);

        assert_eq!(scene.full_bounds(child), Some(rect(0.0, 0.0, 100.0, 100.0)));
        assert_eq!(
            scene.full_bounds(parent),
            Some(rect(0.0, 0.0, 200.0, 200.0)),
            "scaled child contribution must be mapped into parent space"
        );
    }

    #[test]
    fn full_bounds_with_offset_child() {
        let mut scene = Scene::new();
        let parent = scene.create_group();
        let child = scene.create_shape();
        scene.add_child(parent, child);
        scene.set_local_bounds(parent, rect(0.0, 0.0, 10.0, 10.0));
        scene.set_local_bounds(child, rect(0.0, 0.0, 10.0, 10.0));
        scene.translate(child, 20.0, 0.0);
        assert_eq!(scene.full_bounds(parent), Some(rect(0.0, 0.0, 30.0, 10.0)));
    }

    #[test]
    fn empty_local_bounds_do_not_pollute_union() {
        let mut scene = Scene::new();
        let parent = scene.create_group();
        let child = scene.create_shape();
        scene.add_child(parent, child);
        scene.set_local_bounds(child, rect(50.0, 50.0, 60.0, 60.0));
        // Parent has zero-extent local bounds at the origin; the union must
        // not include the origin.
        assert_eq!(scene.full_bounds(parent), Some(rect(50.0, 50.0, 60.0, 60.0)));
    }

    #[test]
    fn invalidation_is_idempotent_on_repeated_edits() {
        let mut scene = Scene::new();
        // Chain of depth 8.
        let root = scene.create_group();
        let mut cur = root;
        for _ in 0..7 {
            let next = scene.create_group();
            scene.add_child(cur, next);
            cur = next;
        }
        let leaf = cur;
        scene.full_bounds(root);

        scene.set_local_bounds(leaf, rect(0.0, 0.0, 1.0, 1.0));
        let first_walk = scene.invalidation_steps();
        assert!(first_walk > 0, "first edit must walk the ancestor chain");

        scene.set_local_bounds(leaf, rect(0.0, 0.0, 2.0, 2.0));
        scene.set_local_bounds(leaf, rect(0.0, 0.0, 3.0, 3.0));
        assert_eq!(
            scene.invalidation_steps(),
            first_walk,
            "repeated edits before a query must not re-walk marked ancestors"
        );

        // Validation clears the flags, so the next edit walks again.
        scene.full_bounds(root);
        scene.set_local_bounds(leaf, rect(0.0, 0.0, 4.0, 4.0));
        assert!(scene.invalidation_steps() > first_walk);
    }

    #[test]
    fn transform_composition_matches_single_scale() {
        let mut scene = Scene::new();
        let n = scene.create_group();
        scene.scale(n, 2.0);
        scene.scale(n, 2.0);
        assert_eq!(scene.global_scale(n), Some(4.0));
    }

    #[test]
    fn descendant_global_scale_is_product_of_chain() {
        let mut scene = Scene::new();
        let parent = scene.create_group();
        let child = scene.create_group();
        scene.add_child(parent, child);
        scene.scale(parent, 2.0);
        scene.scale(child, 0.5);
        let s = scene.global_scale(child).unwrap();
        assert!((s - 1.0).abs() < 1e-12);
    }

    #[test]
    fn global_and_local_point_conversion_roundtrip() {
        let mut scene = Scene::new();
        let parent = scene.create_group();
        let child = scene.create_group();
        scene.add_child(parent, child);
        scene.set_transform(parent, Affine::translate(Vec2::new(10.0, 20.0)));
        scene.set_transform(child, Affine::scale(2.0));

        let g = scene.local_to_global_point(child, Point::new(5.0, 5.0)).unwrap();
        assert_eq!(g, Point::new(20.0, 30.0));
        let back = scene.global_to_local_point(child, g).unwrap();
        assert!((back.x - 5.0).abs() < 1e-12 && (back.y - 5.0).abs() < 1e-12);
    }

    #[test]
    fn detach_invalidates_former_ancestors() {
        let mut scene = Scene::new();
        let root = scene.create_group();
        let child = scene.create_shape();
        scene.add_child(root, child);
        scene.set_local_bounds(child, rect(0.0, 0.0, 50.0, 50.0));
        assert_eq!(scene.full_bounds(root), Some(rect(0.0, 0.0, 50.0, 50.0)));

        scene.detach(child);
        assert_eq!(scene.parent_of(child), None);
        assert!(scene.is_alive(child), "detached nodes stay alive");
        assert_eq!(scene.full_bounds(root), Some(Rect::ZERO));
    }

    #[test]
    fn remove_makes_subtree_stale() {
        let mut scene = Scene::new();
        let root = scene.create_group();
        let a = scene.create_group();
        let b = scene.create_shape();
        scene.add_child(root, a);
        scene.add_child(a, b);
        scene.remove(a);
        assert!(!scene.is_alive(a));
        assert!(!scene.is_alive(b));
        assert!(scene.children_of(root).is_empty());
        // Slot reuse bumps the generation.
        let c = scene.create_group();
        if c.0 == a.0 {
            assert!(c.1 > a.1, "generation must increase on reuse");
        }
    }

    #[test]
    fn cycle_creating_edits_are_rejected() {
        let mut scene = Scene::new();
        let a = scene.create_group();
        let b = scene.create_group();
        let c = scene.create_group();
        scene.add_child(a, b);
        scene.add_child(b, c);
        assert!(!scene.add_child(c, a), "attaching an ancestor must fail");
        assert!(!scene.add_child(a, a));
        assert_eq!(scene.parent_of(a), None);
    }

    #[test]
    fn insert_child_index_errors() {
        let mut scene = Scene::new();
        let root = scene.create_group();
        let a = scene.create_shape();
        let b = scene.create_shape();
        scene.add_child(root, a);
        assert_eq!(
            scene.insert_child(root, 5, b),
            Err(InsertError::IndexOutOfRange { index: 5, len: 1 })
        );
        scene.insert_child(root, 0, b).unwrap();
        assert_eq!(scene.children_of(root), &[b, a]);
        assert_eq!(scene.child_at(root, 2), None);
    }

    #[test]
    fn reattach_moves_between_parents() {
        let mut scene = Scene::new();
        let p1 = scene.create_group();
        let p2 = scene.create_group();
        let child = scene.create_shape();
        scene.add_child(p1, child);
        scene.add_child(p2, child);
        assert!(scene.children_of(p1).is_empty());
        assert_eq!(scene.children_of(p2), &[child]);
        assert_eq!(scene.parent_of(child), Some(p2));
    }

    #[test]
    fn geometry_drives_local_bounds() {
        let mut scene = Scene::new();
        let shape = scene.create_shape();
        let circle = kurbo::Circle::new((10.0, 10.0), 5.0).to_path(1e-3);
        scene.set_geometry(shape, Some(circle));
        let b = scene.full_bounds(shape).unwrap();
        assert!((b.x0 - 5.0).abs() < 1e-2 && (b.x1 - 15.0).abs() < 1e-2);

        scene.set_stroke(
            shape,
            Some(Stroke {
                paint: Paint::rgb8(0, 0, 0),
                width: 2.0,
            }),
        );
        let b = scene.full_bounds(shape).unwrap();
        assert!((b.x0 - 4.0).abs() < 1e-2, "stroke must inflate bounds");
    }

    #[test]
    fn geometry_accessors_reject_non_shapes() {
        let mut scene = Scene::new();
        let group = scene.create_group();
        assert!(!scene.set_geometry(group, Some(BezPath::new())));
        assert!(scene.geometry(group).is_none());
    }

    #[test]
    fn stale_ids_answer_none() {
        let mut scene = Scene::new();
        let n = scene.create_shape();
        scene.remove(n);
        assert_eq!(scene.local_bounds(n), None);
        assert_eq!(scene.transform(n), None);
        assert_eq!(scene.full_bounds(n), None);
        assert_eq!(scene.global_scale(n), None);
        assert!(scene.children_of(n).is_empty());
        // Mutators on stale ids are no-ops, not panics.
        scene.set_local_bounds(n, rect(0.0, 0.0, 1.0, 1.0));
        scene.translate(n, 1.0, 1.0);
    }

    #[test]
    fn attrs_round_trip() {
        let mut scene = Scene::new();
        let n = scene.create_group();
        scene.set_attr(n, "selected", AttrValue::Bool(true));
        assert_eq!(scene.attr(n, "selected"), Some(&AttrValue::Bool(true)));
        assert_eq!(scene.remove_attr(n, "selected"), Some(AttrValue::Bool(true)));
        assert_eq!(scene.attr(n, "selected"), None);
    }
}
