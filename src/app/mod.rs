//! Interaction controller and terminal host.
//!
//! This module implements The Elm Architecture (TEA):
//! - [`Model`]: The complete controller state
//! - [`Message`]: All possible events and actions
//! - [`update`]: State transitions
//! - [`App::run`]: Main event loop with rendering

pub mod animation;
mod effects;
mod event_loop;
mod input;
mod model;
mod update;
mod view_state;

pub use animation::{AnimationRegistry, AnimationTask, EasingFn};
pub use model::{CLICK_SLOP, Model, PointerState, ToastLevel, ToggleState};
pub use update::{Message, update};
pub use view_state::{
    FIT_FRACTION, INITIAL_FIT_FRACTION, MAX_SCALE, MIN_SCALE, ViewState, ViewTransition,
    ZOOM_STEP,
};

use std::path::PathBuf;

use crate::document::SourceDocument;

/// Main application struct that owns the terminal and runs the event loop.
pub struct App {
    file_path: PathBuf,
    source: SourceDocument,
    watch_enabled: bool,
    collapse_branches: bool,
    animations_enabled: bool,
    dark_theme: bool,
    config_global_path: Option<PathBuf>,
    config_local_path: Option<PathBuf>,
}

impl App {
    /// Create a new application for a loaded source file.
    pub fn new(file_path: PathBuf, source: SourceDocument) -> Self {
        Self {
            file_path,
            source,
            watch_enabled: false,
            collapse_branches: false,
            animations_enabled: true,
            dark_theme: true,
            config_global_path: None,
            config_local_path: None,
        }
    }

    /// Enable or disable file watching.
    #[must_use]
    pub const fn with_watch(mut self, enabled: bool) -> Self {
        self.watch_enabled = enabled;
        self
    }

    /// Start with only the top-level branches expanded.
    #[must_use]
    pub const fn with_collapsed_branches(mut self, enabled: bool) -> Self {
        self.collapse_branches = enabled;
        self
    }

    /// Enable or disable collapse/expand and fit animations.
    #[must_use]
    pub const fn with_animations(mut self, enabled: bool) -> Self {
        self.animations_enabled = enabled;
        self
    }

    #[must_use]
    pub const fn with_dark_theme(mut self, dark: bool) -> Self {
        self.dark_theme = dark;
        self
    }

    /// Set config paths to show in help.
    #[must_use]
    pub fn with_config_paths(
        mut self,
        global_path: Option<PathBuf>,
        local_path: Option<PathBuf>,
    ) -> Self {
        self.config_global_path = global_path;
        self.config_local_path = local_path;
        self
    }

    /// Build the initial model for a viewport of `viewport` screen px.
    pub fn build_model(&self, viewport: (f32, f32)) -> Model {
        let mut model = Model::from_source(&self.source, viewport)
            .with_file_path(self.file_path.clone())
            .with_animations(self.animations_enabled);
        if self.collapse_branches {
            model = model.with_main_branches_collapsed();
        }
        model.watch_enabled = self.watch_enabled;
        model.dark_theme = self.dark_theme;
        model
            .config_global_path
            .clone_from(&self.config_global_path);
        model.config_local_path.clone_from(&self.config_local_path);
        model
    }
}
