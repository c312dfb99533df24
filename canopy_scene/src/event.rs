// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Property change notification.
//!
//! Recording is opt-in ([`Scene::set_record_events`]): with it off, mutators
//! pay nothing. With it on, every observable edit appends a [`PropertyEvent`]
//! carrying the old and new values, drained by [`Scene::take_events`].
//! [`Observers`] routes drained events to mask-filtered callbacks; dispatch
//! happens after the drain, so callbacks are free to mutate the scene
//! (including raising further events) without re-entering a traversal.

use alloc::boxed::Box;
use alloc::vec::Vec;
use kurbo::{Affine, Rect};

use crate::tree::Scene;
use crate::types::{NodeId, Paint};

bitflags::bitflags! {
    /// Filter for which property changes an observer wants.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct PropertyMask: u16 {
        /// Local bounds changes.
        const BOUNDS         = 1 << 0;
        /// Node transform changes.
        const TRANSFORM      = 1 << 1;
        /// Visibility toggles.
        const VISIBLE        = 1 << 2;
        /// Pickability toggles.
        const PICKABLE       = 1 << 3;
        /// Fill paint changes.
        const PAINT          = 1 << 4;
        /// Attach/detach, seen from the child.
        const PARENT         = 1 << 5;
        /// Attach/detach, seen from the parent.
        const CHILDREN       = 1 << 6;
        /// Camera view transform changes.
        const VIEW_TRANSFORM = 1 << 7;
    }
}

/// The property an event refers to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Property {
    /// Local bounds.
    Bounds,
    /// Node transform.
    Transform,
    /// Visibility flag.
    Visible,
    /// Pickability flag.
    Pickable,
    /// Fill paint.
    Paint,
    /// Parent link.
    Parent,
    /// Child list.
    Children,
    /// Camera view transform.
    ViewTransform,
}

impl Property {
    /// The mask bit corresponding to this property.
    pub fn mask(self) -> PropertyMask {
        match self {
            Self::Bounds => PropertyMask::BOUNDS,
            Self::Transform => PropertyMask::TRANSFORM,
            Self::Visible => PropertyMask::VISIBLE,
            Self::Pickable => PropertyMask::PICKABLE,
            Self::Paint => PropertyMask::PAINT,
            Self::Parent => PropertyMask::PARENT,
            Self::Children => PropertyMask::CHILDREN,
            Self::ViewTransform => PropertyMask::VIEW_TRANSFORM,
        }
    }
}

/// Old or new value carried by a [`PropertyEvent`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum PropertyValue {
    /// A flag value.
    Bool(bool),
    /// A bounds value.
    Rect(Rect),
    /// A transform value.
    Transform(Affine),
    /// A fill value.
    Paint(Option<Paint>),
    /// A node link value.
    Node(Option<NodeId>),
}

/// One observable property change.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PropertyEvent {
    /// The node whose property changed. For [`Property::Children`] this is
    /// the parent; the affected child is in the values.
    pub node: NodeId,
    /// Which property changed.
    pub property: Property,
    /// Value before the edit.
    pub old: PropertyValue,
    /// Value after the edit.
    pub new: PropertyValue,
}

/// An observer registration, used to remove it later.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ObserverId(u64);

type Callback = Box<dyn FnMut(&mut Scene, &PropertyEvent)>;

/// Routes drained property events to registered callbacks.
///
/// Held outside the [`Scene`] so callbacks receive `&mut Scene` and can edit
/// freely during dispatch. Typical use: enable recording, mutate, then call
/// [`Observers::dispatch`] once per frame.
#[derive(Default)]
pub struct Observers {
    entries: Vec<(ObserverId, PropertyMask, Callback)>,
    next_id: u64,
}

impl core::fmt::Debug for Observers {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Observers")
            .field("len", &self.entries.len())
            .finish_non_exhaustive()
    }
}

impl Observers {
    /// An empty observer set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback for the properties in `mask`.
    pub fn add(
        &mut self,
        mask: PropertyMask,
        callback: impl FnMut(&mut Scene, &PropertyEvent) + 'static,
    ) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, mask, Box::new(callback)));
        id
    }

    /// Remove a previously registered callback. Returns false if unknown.
    pub fn remove(&mut self, id: ObserverId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(e, _, _)| *e != id);
        self.entries.len() != before
    }

    /// Drain the scene's recorded events and deliver each to every observer
    /// whose mask matches. Events raised by callbacks during dispatch are
    /// left queued for the next dispatch rather than delivered recursively.
    pub fn dispatch(&mut self, scene: &mut Scene) {
        let events = scene.take_events();
        for event in &events {
            let bit = event.property.mask();
            for (_, mask, callback) in &mut self.entries {
                if mask.contains(bit) {
                    callback(scene, event);
                }
            }
        }
    }
}

impl Scene {
    /// Enable or disable property event recording. Disabling clears the
    /// queue.
    pub fn set_record_events(&mut self, record: bool) {
        self.record_events = record;
        if !record {
            self.events.clear();
        }
    }

    /// Drain recorded property events in the order they occurred.
    pub fn take_events(&mut self) -> Vec<PropertyEvent> {
        core::mem::take(&mut self.events)
    }

    pub(crate) fn push_event(
        &mut self,
        node: NodeId,
        property: Property,
        old: PropertyValue,
        new: PropertyValue,
    ) {
        if self.record_events {
            self.events.push(PropertyEvent {
                node,
                property,
                old,
                new,
            });
        }
    }

    pub(crate) fn push_bounds_event(&mut self, node: NodeId, old: Rect, new: Rect) {
        self.push_event(
            node,
            Property::Bounds,
            PropertyValue::Rect(old),
            PropertyValue::Rect(new),
        );
    }

    pub(crate) fn push_transform_event(&mut self, node: NodeId, old: Affine, new: Affine) {
        self.push_event(
            node,
            Property::Transform,
            PropertyValue::Transform(old),
            PropertyValue::Transform(new),
        );
    }

    pub(crate) fn push_flag_event(&mut self, node: NodeId, property: Property, old: bool, new: bool) {
        self.push_event(
            node,
            property,
            PropertyValue::Bool(old),
            PropertyValue::Bool(new),
        );
    }

    pub(crate) fn push_paint_event(&mut self, node: NodeId, old: Option<Paint>, new: Option<Paint>) {
        self.push_event(
            node,
            Property::Paint,
            PropertyValue::Paint(old),
            PropertyValue::Paint(new),
        );
    }

    /// Emit the paired events for an attach or detach: `Children` on the
    /// parent and `Parent` on the child.
    pub(crate) fn push_child_events(&mut self, parent: NodeId, child: NodeId, added: bool) {
        let (old, new) = if added {
            (PropertyValue::Node(None), PropertyValue::Node(Some(child)))
        } else {
            (PropertyValue::Node(Some(child)), PropertyValue::Node(None))
        };
        self.push_event(parent, Property::Children, old, new);
        let (old, new) = if added {
            (PropertyValue::Node(None), PropertyValue::Node(Some(parent)))
        } else {
            (PropertyValue::Node(Some(parent)), PropertyValue::Node(None))
        };
        self.push_event(child, Property::Parent, old, new);
    }
}
