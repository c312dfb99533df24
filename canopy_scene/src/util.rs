// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use kurbo::{Affine, Point, Rect};

/// Map an axis-aligned `Rect` through an `Affine` and return the axis-aligned
/// bounding box of the result. Conservative (not tight) under rotation.
pub(crate) fn transform_rect_bbox(affine: Affine, rect: Rect) -> Rect {
    let corners = [
        affine * Point::new(rect.x0, rect.y0),
        affine * Point::new(rect.x1, rect.y0),
        affine * Point::new(rect.x1, rect.y1),
        affine * Point::new(rect.x0, rect.y1),
    ];
    let mut out = Rect::new(corners[0].x, corners[0].y, corners[0].x, corners[0].y);
    for p in &corners[1..] {
        out.x0 = out.x0.min(p.x);
        out.y0 = out.y0.min(p.y);
        out.x1 = out.x1.max(p.x);
        out.y1 = out.y1.max(p.y);
    }
    out
}

/// Inclusive-edge overlap test. Degenerate (point) rects on an edge count as
/// overlapping, matching the picking semantics for zero-halo point picks.
pub(crate) fn rects_overlap(a: Rect, b: Rect) -> bool {
    a.x0 <= b.x1 && b.x0 <= a.x1 && a.y0 <= b.y1 && b.y0 <= a.y1
}

/// A rect with no extent contributes nothing to bounds unions or repaints.
pub(crate) fn rect_is_empty(r: Rect) -> bool {
    r.x1 <= r.x0 || r.y1 <= r.y0
}
