// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public types for the scene graph: node identifiers, flags, paints, and
//! attribute values.

use alloc::string::String;

/// Identifier for a node in the scene (generational).
///
/// A `NodeId` stays valid until the node is removed from the arena. Accessors
/// on [`crate::Scene`] return `None` (or an empty slice) for stale ids; they
/// never panic.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct NodeId(pub(crate) u32, pub(crate) u32);

impl NodeId {
    pub(crate) const fn new(idx: u32, generation: u32) -> Self {
        Self(idx, generation)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }
}

bitflags::bitflags! {
    /// Node flags controlling visibility and picking.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct NodeFlags: u8 {
        /// Node is visible (painted, and traversed during picking).
        const VISIBLE  = 0b0000_0001;
        /// Node may be reported as the picked node by a hit test.
        ///
        /// Children of an unpickable node are still traversed; only the node
        /// itself is excluded from the result.
        const PICKABLE = 0b0000_0010;
    }
}

impl Default for NodeFlags {
    fn default() -> Self {
        Self::VISIBLE | Self::PICKABLE
    }
}

/// Kind of a node, as a flat discriminant.
///
/// Canopy models the classic deep shape-node hierarchy as a single node type
/// with a kind tag plus per-kind data held inside the arena. Use
/// [`crate::Scene::kind`] to query it.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum NodeKind {
    /// Plain container with no intrinsic appearance.
    Group,
    /// Leaf with an optional exact geometry, fill, and stroke.
    Shape,
    /// Subtree root composited by one or more cameras.
    Layer,
    /// Viewport node with a view transform and an ordered layer list.
    Camera,
}

/// Solid fill color, packed ARGB with 8 bits per channel.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Paint(
    /// The packed `0xAARRGGBB` value.
    pub u32,
);

impl Paint {
    /// Opaque color from 8-bit RGB components.
    pub const fn rgb8(r: u8, g: u8, b: u8) -> Self {
        Self::rgba8(r, g, b, 0xff)
    }

    /// Color from 8-bit RGBA components.
    pub const fn rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self(((a as u32) << 24) | ((r as u32) << 16) | ((g as u32) << 8) | (b as u32))
    }

    /// Alpha channel, 0–255.
    pub const fn alpha(self) -> u8 {
        (self.0 >> 24) as u8
    }
}

/// Stroke applied to a shape node's geometry.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Stroke {
    /// Stroke color.
    pub paint: Paint,
    /// Stroke width in local units.
    pub width: f64,
}

/// Value stored in a node's attribute map.
///
/// Attributes are host-defined annotations (selection marks, tool state,
/// model back-references encoded as ints) that the core carries but never
/// interprets.
#[derive(Clone, Debug, PartialEq)]
pub enum AttrValue {
    /// Boolean flag.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Floating-point value.
    Num(f64),
    /// Text value.
    Text(String),
}
