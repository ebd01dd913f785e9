// Only allow lints that are either transitive-dependency noise or
// genuinely opinionated style choices that don't indicate real issues.
#![allow(
    // Transitive dependency version mismatches we can't control
    clippy::multiple_crate_versions,
    // module_name_repetitions is pure style preference (e.g. layout::LayoutConfig)
    clippy::module_name_repetitions
)]

//! # Mindmark
//!
//! Turns a markdown outline into an interactive mind map.
//!
//! Mindmark parses headings and lists into a tree, lays it out
//! left-to-right, and lets you:
//! - Collapse and expand branches with animated transitions
//! - Pan and zoom with the mouse or keyboard
//! - Watch the source file for live reload
//!
//! ## Architecture
//!
//! Mindmark uses The Elm Architecture (TEA) pattern:
//! - **Model**: Tree, layout, view and animation state
//! - **Message**: Events and actions
//! - **Update**: State transitions
//! - **View**: Diffed into a retained scene, then painted
//!
//! ## Modules
//!
//! - [`document`]: Markdown to mind-map tree
//! - [`layout`]: Node sizing and tree layout
//! - [`render`]: Snapshots, diffing and the retained scene
//! - [`app`]: Interaction controller and event loop
//! - [`ui`]: Terminal UI components
//! - [`watcher`]: File watching
//! - [`config`]: Persisted default flags

pub mod app;
pub mod config;
pub mod document;
pub mod layout;
pub mod perf;
pub mod render;
pub mod ui;
pub mod watcher;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::app::{App, Message, Model, ViewState};
    pub use crate::document::{MindMap, NodeId, ParseOutcome, SourceDocument, parse};
    pub use crate::layout::{Layout, LayoutConfig, MonospaceMeasure, Point, Rect};
    pub use crate::render::{RetainedScene, Snapshot, Surface};
}
