// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Canopy Scene: a Kurbo-native retained-mode 2D scene graph.
//!
//! Canopy Scene is the structural core for zoomable canvas UIs, node editors,
//! and visualization tools in the Piccolo tradition.
//!
//! - Represents a hierarchy of nodes with local bounds, affine transforms,
//!   visibility/pickability flags, fills, and optional exact geometry.
//! - Keeps subtree extents in a lazily validated full-bounds cache: edits
//!   mark compact invalidation flags and the expensive recomputation runs on
//!   the next query, pick, or paint.
//! - Separates what is in the scene from how it is viewed: cameras composite
//!   layers through a view transform, so panning and zooming never mutate the
//!   viewed nodes, and one layer can appear in several viewports at once.
//!
//! ## API overview
//!
//! - [`Scene`]: the node arena and every operation over it.
//! - [`NodeId`]: generational handle; accessors answer `None` once stale.
//! - [`NodeKind`] / [`NodeFlags`]: node classification and behavior bits.
//! - [`RepaintRequest`]: per-camera stale regions, drained with
//!   [`Scene::take_repaints`] after a batch of edits.
//! - [`PickPath`]: result of [`Scene::pick`], the camera-to-node path with
//!   cached transforms for input routing.
//! - [`Surface`] / [`PaintContext`]: the paint traversal drives a host
//!   renderer through [`Scene::paint_camera`].
//! - [`Observers`] / [`PropertyEvent`]: opt-in property change notification.
//!
//! Key operations:
//! - [`Scene::create_group`] / [`Scene::create_shape`] / [`Scene::create_layer`] /
//!   [`Scene::create_camera`] → detached [`NodeId`]s; [`Scene::add_child`] and
//!   [`Scene::insert_child`] build the tree, [`Scene::detach`] and
//!   [`Scene::remove`] take it apart.
//! - [`Scene::set_local_bounds`] / [`Scene::set_transform`] /
//!   [`Scene::translate`] / [`Scene::scale`] / [`Scene::rotate`] edit
//!   geometry; [`Scene::set_paint`] / [`Scene::set_visible`] /
//!   [`Scene::set_pickable`] edit appearance and behavior.
//! - [`Scene::full_bounds`] / [`Scene::global_full_bounds`] query the cache;
//!   [`Scene::local_to_global_point`] / [`Scene::global_to_local_point`] /
//!   [`Scene::global_scale`] convert coordinates along the ancestor chain.
//! - [`Scene::add_layer`] / [`Scene::remove_layer`] wire viewports;
//!   [`Scene::scale_view`] / [`Scene::translate_view`] /
//!   [`Scene::set_view_transform`] move them.
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod event;
mod paint;
mod pick;
mod tree;
mod types;
mod util;
mod view;

pub use event::{ObserverId, Observers, Property, PropertyEvent, PropertyMask, PropertyValue};
pub use paint::{PaintContext, RenderQuality, Surface};
pub use pick::{PickEntry, PickPath};
pub use tree::{InsertError, Scene};
pub use types::{AttrValue, NodeFlags, NodeId, NodeKind, Paint, Stroke};
pub use view::{RepaintRequest, ViewportError};
