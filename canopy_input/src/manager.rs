// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Input routing over pick paths.
//!
//! The host feeds raw pointer and key events into [`InputManager`]; the
//! manager picks through the scene, keeps the three focus states (keyboard
//! focus, the captured press path, the hovered path), and dispatches typed
//! [`InputEvent`]s to per-node handlers from the deepest node back to the
//! camera.
//!
//! Capture semantics: the path picked on mouse-down receives every drag and
//! the release, even after the pointer leaves it. Hover semantics: on every
//! move the old and new paths are diffed, exits fire from the innermost node
//! outward, then enters from the outermost newly-hovered node inward.

use alloc::boxed::Box;
use alloc::vec::Vec;
use canopy_scene::{NodeId, PickPath, Scene};
use hashbrown::HashMap;
use kurbo::{Affine, Point};

use crate::events::{Button, EventFilter, EventKind, InputEvent, Modifiers};

/// Handle to a registered handler, used to remove it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct HandlerId(u64);

type Callback = Box<dyn FnMut(&mut Scene, &mut InputEvent, NodeId)>;

struct Handler {
    id: HandlerId,
    filter: EventFilter,
    /// Whether running this handler marks the event handled for nodes later
    /// on the dispatch path.
    marks_handled: bool,
    callback: Callback,
}

/// Tracks one active press and synthesizes clicks with counting.
///
/// A release within the spatial and temporal thresholds of its press yields a
/// click; successive clicks on the same node inside the multi-click window
/// increment the count (double click, triple click).
struct ClickTracker {
    press: Option<Press>,
    /// Pointer travel beyond this many viewport pixels cancels the click.
    move_threshold: f64,
    /// Press-to-release time beyond this cancels the click (milliseconds).
    time_threshold: u64,
    /// Window for chaining multi-clicks (milliseconds).
    multi_click_window: u64,
    last_click: Option<(NodeId, u64, u8)>,
}

struct Press {
    target: NodeId,
    button: Button,
    down_position: Point,
    down_time: u64,
    moved_too_far: bool,
}

impl ClickTracker {
    fn new() -> Self {
        Self {
            press: None,
            move_threshold: 5.0,
            time_threshold: 500,
            multi_click_window: 500,
            last_click: None,
        }
    }

    fn on_down(&mut self, target: NodeId, button: Button, position: Point, time: u64) {
        self.press = Some(Press {
            target,
            button,
            down_position: position,
            down_time: time,
            moved_too_far: false,
        });
    }

    fn on_move(&mut self, position: Point) {
        if let Some(press) = &mut self.press {
            if !press.moved_too_far
                && press.down_position.distance(position) > self.move_threshold
            {
                press.moved_too_far = true;
            }
        }
    }

    /// Returns the click target and count when the release completes a
    /// click.
    fn on_up(&mut self, target: NodeId, button: Button, time: u64) -> Option<(NodeId, u8)> {
        let press = self.press.take()?;
        if press.button != button
            || press.target != target
            || press.moved_too_far
            || time.saturating_sub(press.down_time) > self.time_threshold
        {
            return None;
        }
        let count = match self.last_click {
            Some((node, at, count))
                if node == target && time.saturating_sub(at) <= self.multi_click_window =>
            {
                count.saturating_add(1)
            }
            _ => 1,
        };
        self.last_click = Some((target, time, count));
        Some((target, count))
    }
}

/// Routes host input through the scene to node handlers.
pub struct InputManager {
    handlers: HashMap<NodeId, Vec<Handler>>,
    next_handler: u64,
    keyboard_focus: Option<NodeId>,
    /// Path captured on mouse-down; receives drags and the release.
    mouse_focus: Option<PickPath>,
    /// Path under the pointer after the last move.
    mouse_over: Option<PickPath>,
    /// Pick halo in viewport pixels.
    halo: f64,
    clicks: ClickTracker,
}

impl core::fmt::Debug for InputManager {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InputManager")
            .field("keyboard_focus", &self.keyboard_focus)
            .field("dragging", &self.mouse_focus.is_some())
            .field("halo", &self.halo)
            .finish_non_exhaustive()
    }
}

impl Default for InputManager {
    fn default() -> Self {
        Self::new()
    }
}

impl InputManager {
    /// A manager with no handlers and no focus.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            next_handler: 0,
            keyboard_focus: None,
            mouse_focus: None,
            mouse_over: None,
            halo: 2.0,
            clicks: ClickTracker::new(),
        }
    }

    /// Pick halo in viewport pixels (default 2).
    pub fn set_halo(&mut self, halo: f64) {
        self.halo = halo;
    }

    // --- handlers ---

    /// Register a handler on a node. `marks_handled` makes the event opaque
    /// to later (shallower) nodes on the dispatch path once this handler has
    /// run; handlers on the same node still see it.
    pub fn add_handler(
        &mut self,
        node: NodeId,
        filter: EventFilter,
        marks_handled: bool,
        callback: impl FnMut(&mut Scene, &mut InputEvent, NodeId) + 'static,
    ) -> HandlerId {
        let id = HandlerId(self.next_handler);
        self.next_handler += 1;
        self.handlers.entry(node).or_default().push(Handler {
            id,
            filter,
            marks_handled,
            callback: Box::new(callback),
        });
        id
    }

    /// Remove a handler. Returns false for unknown ids.
    pub fn remove_handler(&mut self, id: HandlerId) -> bool {
        for handlers in self.handlers.values_mut() {
            let before = handlers.len();
            handlers.retain(|h| h.id != id);
            if handlers.len() != before {
                return true;
            }
        }
        false
    }

    /// Drop every handler registered on `node` (e.g. before removal).
    pub fn clear_handlers(&mut self, node: NodeId) {
        self.handlers.remove(&node);
    }

    // --- focus state ---

    /// The node key events are directed at.
    pub fn keyboard_focus(&self) -> Option<NodeId> {
        self.keyboard_focus
    }

    /// Direct keyboard events at `node` (its ancestors see unhandled keys).
    ///
    /// A change synthesizes `FocusLost` on the old target before
    /// `FocusGained` on the new one.
    pub fn set_keyboard_focus(
        &mut self,
        scene: &mut Scene,
        node: Option<NodeId>,
        modifiers: Modifiers,
        time: u64,
    ) {
        if self.keyboard_focus == node {
            return;
        }
        let old = self.keyboard_focus.take();
        if let Some(old) = old {
            let mut event = focus_event(EventKind::FocusLost, old, modifiers, time);
            self.deliver_to_node(scene, old, &mut event);
        }
        self.keyboard_focus = node;
        if let Some(node) = node {
            let mut event = focus_event(EventKind::FocusGained, node, modifiers, time);
            self.deliver_to_node(scene, node, &mut event);
        }
    }

    /// The path captured by the current press, if a drag is in progress.
    pub fn mouse_focus(&self) -> Option<&PickPath> {
        self.mouse_focus.as_ref()
    }

    /// The path currently under the pointer.
    pub fn mouse_over(&self) -> Option<&PickPath> {
        self.mouse_over.as_ref()
    }

    /// Whether a press is currently captured.
    pub fn is_dragging(&self) -> bool {
        self.mouse_focus.is_some()
    }

    // --- host entry points ---

    /// A button press at `position` in `camera`'s viewport.
    pub fn mouse_down(
        &mut self,
        scene: &mut Scene,
        camera: NodeId,
        position: Point,
        button: Button,
        modifiers: Modifiers,
        time: u64,
    ) {
        let Some(path) = scene.pick(camera, position, self.halo) else {
            return;
        };
        self.clicks.on_down(path.picked(), button, position, time);
        let mut event = InputEvent {
            kind: EventKind::MouseDown { button },
            camera,
            position,
            to_local: Affine::IDENTITY,
            modifiers,
            time,
            handled: false,
        };
        self.dispatch(scene, &path, &mut event);
        self.mouse_focus = Some(path);
    }

    /// A button release. Goes to the captured path, then synthesizes a
    /// click if the press stayed within the thresholds.
    pub fn mouse_up(
        &mut self,
        scene: &mut Scene,
        camera: NodeId,
        position: Point,
        button: Button,
        modifiers: Modifiers,
        time: u64,
    ) {
        // The captured path gets the release even if the pointer left it.
        let path = match self.mouse_focus.take() {
            Some(path) => path,
            None => match scene.pick(camera, position, self.halo) {
                Some(path) => path,
                None => return,
            },
        };
        let mut event = InputEvent {
            kind: EventKind::MouseUp { button },
            camera,
            position,
            to_local: Affine::IDENTITY,
            modifiers,
            time,
            handled: false,
        };
        self.dispatch(scene, &path, &mut event);

        if let Some((_, count)) = self.clicks.on_up(path.picked(), button, time) {
            let mut click = InputEvent {
                kind: EventKind::Click { button, count },
                camera,
                position,
                to_local: Affine::IDENTITY,
                modifiers,
                time,
                handled: false,
            };
            self.dispatch(scene, &path, &mut click);
        }
    }

    /// Pointer motion. Drags along the captured path while a press is held,
    /// otherwise updates hover state and delivers a move.
    pub fn mouse_move(
        &mut self,
        scene: &mut Scene,
        camera: NodeId,
        position: Point,
        modifiers: Modifiers,
        time: u64,
    ) {
        self.clicks.on_move(position);
        if let Some(captured) = self.mouse_focus.take() {
            let button = self
                .clicks
                .press
                .as_ref()
                .map(|p| p.button)
                .unwrap_or(crate::events::PRIMARY_BUTTON);
            let mut event = InputEvent {
                kind: EventKind::MouseDrag { button },
                camera,
                position,
                to_local: Affine::IDENTITY,
                modifiers,
                time,
                handled: false,
            };
            self.dispatch(scene, &captured, &mut event);
            self.mouse_focus = Some(captured);
            return;
        }

        let path = scene.pick(camera, position, self.halo);
        self.update_hover(scene, camera, path.as_ref(), position, modifiers, time);
        if let Some(path) = &path {
            let mut event = InputEvent {
                kind: EventKind::MouseMove,
                camera,
                position,
                to_local: Affine::IDENTITY,
                modifiers,
                time,
                handled: false,
            };
            self.dispatch(scene, path, &mut event);
        }
        self.mouse_over = path;
    }

    /// Scroll wheel motion over `position`.
    pub fn wheel(
        &mut self,
        scene: &mut Scene,
        camera: NodeId,
        position: Point,
        dx: f64,
        dy: f64,
        modifiers: Modifiers,
        time: u64,
    ) {
        let Some(path) = scene.pick(camera, position, self.halo) else {
            return;
        };
        let mut event = InputEvent {
            kind: EventKind::Wheel { dx, dy },
            camera,
            position,
            to_local: Affine::IDENTITY,
            modifiers,
            time,
            handled: false,
        };
        self.dispatch(scene, &path, &mut event);
    }

    /// A key press, delivered to the keyboard focus and its ancestors.
    pub fn key_down(&mut self, scene: &mut Scene, key: u32, modifiers: Modifiers, time: u64) {
        self.dispatch_key(scene, EventKind::KeyDown { key }, modifiers, time);
    }

    /// A key release, routed like [`InputManager::key_down`].
    pub fn key_up(&mut self, scene: &mut Scene, key: u32, modifiers: Modifiers, time: u64) {
        self.dispatch_key(scene, EventKind::KeyUp { key }, modifiers, time);
    }

    // --- dispatch ---

    /// Deliver `event` along `path` from the deepest node to the camera.
    ///
    /// The handled flag each node's filters observe is the one in effect when
    /// dispatch reached that node, so several handlers on one node all see
    /// the event even if an earlier sibling marks it.
    fn dispatch(&mut self, scene: &mut Scene, path: &PickPath, event: &mut InputEvent) {
        for entry in path.entries().iter().rev() {
            let handled_at_entry = event.handled;
            let mut marked = false;
            let Some(handlers) = self.handlers.get_mut(&entry.node) else {
                continue;
            };
            event.to_local = entry.to_camera.inverse();
            for handler in handlers.iter_mut() {
                if !handler.filter.matches(event, handled_at_entry) {
                    continue;
                }
                (handler.callback)(scene, event, entry.node);
                if handler.marks_handled {
                    marked = true;
                }
            }
            if marked {
                event.handled = true;
            }
        }
    }

    /// Key events bubble from the focus node up its ancestor chain.
    fn dispatch_key(&mut self, scene: &mut Scene, kind: EventKind, modifiers: Modifiers, time: u64) {
        let Some(focus) = self.keyboard_focus else {
            return;
        };
        if !scene.is_alive(focus) {
            self.keyboard_focus = None;
            return;
        }
        let mut chain = Vec::new();
        let mut cur = Some(focus);
        while let Some(node) = cur {
            chain.push(node);
            cur = scene.parent_of(node);
        }
        let mut event = InputEvent {
            kind,
            camera: focus,
            position: Point::ZERO,
            to_local: Affine::IDENTITY,
            modifiers,
            time,
            handled: false,
        };
        for node in chain {
            let handled_at_entry = event.handled;
            let mut marked = false;
            let Some(handlers) = self.handlers.get_mut(&node) else {
                continue;
            };
            for handler in handlers.iter_mut() {
                if !handler.filter.matches(&event, handled_at_entry) {
                    continue;
                }
                (handler.callback)(scene, &mut event, node);
                if handler.marks_handled {
                    marked = true;
                }
            }
            if marked {
                event.handled = true;
            }
        }
    }

    /// Diff the previous and current hover paths. Nodes left fire `MouseExit`
    /// innermost-first (with their old transforms); nodes entered fire
    /// `MouseEnter` outermost-first.
    fn update_hover(
        &mut self,
        scene: &mut Scene,
        camera: NodeId,
        new_path: Option<&PickPath>,
        position: Point,
        modifiers: Modifiers,
        time: u64,
    ) {
        let old = self.mouse_over.take();
        let old_nodes: Vec<NodeId> = old.iter().flat_map(|p| p.nodes()).collect();
        let new_nodes: Vec<NodeId> = new_path.iter().flat_map(|p| p.nodes()).collect();

        if let Some(old) = &old {
            for entry in old.entries().iter().rev() {
                if new_nodes.contains(&entry.node) {
                    continue;
                }
                let mut event = InputEvent {
                    kind: EventKind::MouseExit,
                    camera,
                    position,
                    to_local: entry.to_camera.inverse(),
                    modifiers,
                    time,
                    handled: false,
                };
                self.deliver_to_node(scene, entry.node, &mut event);
            }
        }
        if let Some(new_path) = new_path {
            for entry in new_path.entries() {
                if old_nodes.contains(&entry.node) {
                    continue;
                }
                let mut event = InputEvent {
                    kind: EventKind::MouseEnter,
                    camera,
                    position,
                    to_local: entry.to_camera.inverse(),
                    modifiers,
                    time,
                    handled: false,
                };
                self.deliver_to_node(scene, entry.node, &mut event);
            }
        }
    }

    /// Run one node's matching handlers without path bubbling (enter/exit
    /// events target exactly one node).
    fn deliver_to_node(&mut self, scene: &mut Scene, node: NodeId, event: &mut InputEvent) {
        let Some(handlers) = self.handlers.get_mut(&node) else {
            return;
        };
        for handler in handlers.iter_mut() {
            if handler.filter.matches(event, event.handled) {
                (handler.callback)(scene, event, node);
            }
        }
    }
}

fn focus_event(kind: EventKind, node: NodeId, modifiers: Modifiers, time: u64) -> InputEvent {
    InputEvent {
        kind,
        camera: node,
        position: Point::ZERO,
        to_local: Affine::IDENTITY,
        modifiers,
        time,
        handled: false,
    }
}
