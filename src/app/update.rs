use crate::app::Model;
use crate::document::NodeId;
use crate::layout::Point;

use super::model::{CLICK_SLOP, PointerState};
use super::view_state::ZOOM_STEP;

/// All possible events and actions in the application.
///
/// Pointer coordinates are screen px relative to the canvas origin.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    // Pointer
    /// Primary button pressed
    PointerDown { x: f32, y: f32 },
    /// Pointer moved (with or without a button held)
    PointerMove { x: f32, y: f32 },
    /// Primary button released
    PointerUp { x: f32, y: f32 },
    /// Scroll wheel; negative `delta_y` zooms in
    Wheel { delta_y: f32, x: f32, y: f32 },
    /// Pinch gesture; `factor` is the distance ratio since the last event
    Pinch { factor: f32, x: f32, y: f32 },
    /// Expand/collapse control of a node was clicked
    ClickAffordance(NodeId),

    // Tree
    /// Flip a node between collapsed and expanded
    Toggle(NodeId),
    /// Collapse every top-level branch
    CollapseToMainBranches,
    /// Clear every collapsed flag
    ExpandAll,

    // View
    /// Pan by a screen-space delta
    Pan(f32, f32),
    /// Zoom in one step around the viewport centre
    ZoomIn,
    /// Zoom out one step around the viewport centre
    ZoomOut,
    /// Animate the view to fit the visible tree
    FitView,

    // Document
    /// Replace the document with new markdown
    Load(String),
    /// Source file changed on disk
    FileChanged,
    /// Reload the source file now
    ForceReload,
    /// Toggle file watching
    ToggleWatch,

    // Application
    /// Toggle help overlay
    ToggleHelp,
    /// Viewport resized (screen px)
    Resize(f32, f32),
    /// Advance the animation clock
    Tick(u64),
    /// Quit the application
    Quit,
}

impl Message {
    /// True for direct manipulation of the view by the user.
    const fn is_view_interaction(&self) -> bool {
        matches!(
            self,
            Self::Wheel { .. }
                | Self::Pinch { .. }
                | Self::Pan(..)
                | Self::ZoomIn
                | Self::ZoomOut
        )
    }
}

/// Update the model based on a message.
///
/// Pure apart from logging: file and watcher effects are handled by the
/// event loop after this returns.
pub fn update(mut model: Model, msg: Message) -> Model {
    if msg.is_view_interaction() {
        model.mark_interaction();
    }

    match msg {
        Message::PointerDown { x, y } => {
            let at = Point::new(x, y);
            model.pointer = PointerState::Pressed {
                target: model.node_at(at),
                origin: at,
                last: at,
                dragging: false,
            };
        }
        Message::PointerMove { x, y } => {
            if let PointerState::Pressed {
                target,
                origin,
                last,
                dragging,
            } = model.pointer
            {
                let at = Point::new(x, y);
                let dragging = dragging || (at.x - origin.x).hypot(at.y - origin.y) > CLICK_SLOP;
                // Only a background drag moves the view.
                if target.is_none() && at != last {
                    model.mark_interaction();
                    model.view.pan_by(at.x - last.x, at.y - last.y);
                }
                model.pointer = PointerState::Pressed {
                    target,
                    origin,
                    last: at,
                    dragging,
                };
            }
        }
        Message::PointerUp { x, y } => {
            if let PointerState::Pressed {
                target: Some(id),
                dragging: false,
                ..
            } = model.pointer
                && model.node_at(Point::new(x, y)) == Some(id)
            {
                model.toggle(id);
            }
            model.pointer = PointerState::Idle;
        }
        Message::Wheel { delta_y, x, y } => {
            model.view.wheel(delta_y, Point::new(x, y));
        }
        Message::Pinch { factor, x, y } => {
            model.view.pinch(factor, Point::new(x, y));
        }
        Message::ClickAffordance(id) | Message::Toggle(id) => model.toggle(id),
        Message::CollapseToMainBranches => model.collapse_to_main_branches(),
        Message::ExpandAll => model.expand_all(),
        Message::Pan(dx, dy) => model.view.pan_by(dx, dy),
        Message::ZoomIn => {
            let center = model.viewport_center();
            model.view.zoom_to(model.view.scale + ZOOM_STEP, center);
        }
        Message::ZoomOut => {
            let center = model.viewport_center();
            model.view.zoom_to(model.view.scale - ZOOM_STEP, center);
        }
        Message::FitView => model.fit_current_tree(),
        Message::Load(markdown) => model.load_markdown(&markdown),
        Message::ToggleWatch => model.watch_enabled = !model.watch_enabled,
        Message::ToggleHelp => model.help_visible = !model.help_visible,
        Message::Resize(width, height) => {
            model.viewport = (width.max(1.0), height.max(1.0));
            if !model.user_has_interacted {
                model.fit_full_map();
            }
        }
        Message::Tick(now_ms) => model.tick(now_ms),
        Message::Quit => model.should_quit = true,
        // Disk access happens in the event loop's side effects.
        Message::FileChanged | Message::ForceReload => {}
    }

    model
}
