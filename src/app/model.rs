use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::Result;

use crate::document::{MindMap, NodeId, ParseWarning, SourceDocument, parse_with_title};
use crate::layout::{self, Layout, LayoutConfig, MonospaceMeasure, Point, Rect};
use crate::render::{
    Frames, NodeFrame, RenderError, RenderStats, Renderer, RetainedScene, Snapshot,
    frames_from_layout,
};

use super::animation::{ANIMATION_DURATION_MS, AnimationRegistry, AnimationTask};
use super::view_state::{
    FIT_DURATION_MS, FIT_FRACTION, INITIAL_FIT_FRACTION, ViewState, ViewTransition,
};

/// Pointer travel (screen px) beyond which a press becomes a drag.
pub const CLICK_SLOP: f32 = 3.0;
const TOAST_DURATION_MS: u64 = 4000;
const DEFAULT_VIEWPORT: (f32, f32) = (800.0, 600.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
struct Toast {
    level: ToastLevel,
    message: String,
    /// Expiry on the model clock; `None` until the first tick stamps it
    expires_at_ms: Option<u64>,
}

/// Collapse state of a node with children, including in-flight transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleState {
    Expanded,
    Collapsing,
    Collapsed,
    Expanding,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingToggle {
    collapsing: bool,
    ends_at_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum PointerState {
    #[default]
    Idle,
    Pressed {
        /// Node under the pointer at press time
        target: Option<NodeId>,
        origin: Point,
        last: Point,
        dragging: bool,
    },
}

/// The complete controller state.
///
/// All state lives here; the event loop only feeds it messages.
pub struct Model {
    pub tree: MindMap,
    pub warnings: Vec<ParseWarning>,
    pub layout: Layout,
    pub layout_config: LayoutConfig,
    pub measure: MonospaceMeasure,
    pub view: ViewState,
    pub(super) view_transition: Option<ViewTransition>,
    pub(super) animations: AnimationRegistry,
    transitions: BTreeMap<NodeId, PendingToggle>,
    pub(super) pointer: PointerState,
    /// Clock of the last tick, in ms since the session started
    pub now_ms: u64,
    /// Viewport size in screen px
    pub viewport: (f32, f32),
    pub user_has_interacted: bool,
    pub animations_enabled: bool,
    /// Root label fallback used on every re-parse
    pub title: Option<String>,
    pub file_path: Option<PathBuf>,
    pub watch_enabled: bool,
    pub help_visible: bool,
    pub should_quit: bool,
    pub dark_theme: bool,
    /// Global config path shown in help
    pub config_global_path: Option<PathBuf>,
    /// Local override path shown in help
    pub config_local_path: Option<PathBuf>,
    toast: Option<Toast>,
    renderer: Renderer,
    scene: RetainedScene,
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("nodes", &self.tree.len())
            .field("visible", &self.layout.len())
            .field("view", &self.view)
            .field("now_ms", &self.now_ms)
            .field("animations", &self.animations.len())
            .finish_non_exhaustive()
    }
}

impl Model {
    /// Parse `markdown` and fit the whole map into the viewport.
    pub fn new(markdown: &str, title: Option<&str>, viewport: (f32, f32)) -> Self {
        let outcome = parse_with_title(markdown, title);
        let mut model = Self {
            tree: outcome.tree,
            warnings: outcome.warnings,
            viewport,
            title: title.map(ToOwned::to_owned),
            ..Self::default()
        };
        model.relayout();
        model.fit_full_map();
        model
    }

    pub fn from_source(source: &SourceDocument, viewport: (f32, f32)) -> Self {
        Self::new(&source.markdown, source.title.as_deref(), viewport)
    }

    #[must_use]
    pub fn with_file_path(mut self, path: PathBuf) -> Self {
        self.file_path = Some(path);
        self
    }

    #[must_use]
    pub const fn with_animations(mut self, enabled: bool) -> Self {
        self.animations_enabled = enabled;
        self
    }

    /// Start with only the main branches open, without animating.
    #[must_use]
    pub fn with_main_branches_collapsed(mut self) -> Self {
        let animations = self.animations_enabled;
        self.animations_enabled = false;
        self.collapse_to_main_branches();
        self.animations_enabled = animations;
        self
    }

    pub(super) fn relayout(&mut self) {
        self.layout = layout::compute(&self.tree, &self.layout_config, &self.measure);
        crate::perf::log_event(
            "layout",
            format!("visible={} total={}", self.layout.len(), self.tree.len()),
        );
    }

    /// Displayed frames at `now_ms`: layout merged with animation samples.
    pub fn frames_at(&self, now_ms: u64) -> Frames {
        let mut frames = frames_from_layout(&self.layout);
        self.animations.overlay(&mut frames, now_ms);
        frames
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::build(
            &self.tree,
            &self.frames_at(self.now_ms),
            &self.layout_config,
        )
    }

    /// Push the current frame to the retained scene.
    ///
    /// # Errors
    /// Fails if the scene has been detached.
    pub fn render_scene(&mut self) -> Result<RenderStats, RenderError> {
        let snapshot = self.snapshot();
        self.renderer.render(snapshot, self.view, &mut self.scene)
    }

    pub const fn scene(&self) -> &RetainedScene {
        &self.scene
    }

    pub const fn scene_mut(&mut self) -> &mut RetainedScene {
        &mut self.scene
    }

    pub fn is_animating(&self) -> bool {
        !self.animations.is_idle() || self.view_transition.is_some() || !self.transitions.is_empty()
    }

    /// Collapse state of a node; `None` for leaves and unknown ids.
    pub fn toggle_state(&self, id: NodeId) -> Option<ToggleState> {
        let node = self.tree.get(id)?;
        if node.is_leaf() {
            return None;
        }
        Some(match self.transitions.get(&id) {
            Some(pending) if pending.collapsing => ToggleState::Collapsing,
            Some(_) => ToggleState::Expanding,
            None if node.is_collapsed() => ToggleState::Collapsed,
            None => ToggleState::Expanded,
        })
    }

    /// Topmost displayed node under a screen point.
    pub fn node_at(&self, screen: Point) -> Option<NodeId> {
        let world = self.view.screen_to_world(screen);
        self.snapshot().hit_test(world.x, world.y)
    }

    /// Flip one node's collapsed flag, animating the change.
    pub(super) fn toggle(&mut self, id: NodeId) {
        let Some(node) = self.tree.get(id) else {
            tracing::debug!(%id, "toggle ignored: unknown node");
            return;
        };
        if node.is_leaf() {
            tracing::debug!(%id, "toggle ignored: leaf");
            return;
        }
        let collapse = !node.is_collapsed();
        if !self.tree.is_visible(id) {
            // Nothing on screen changes.
            self.tree.set_collapsed(id, collapse);
            return;
        }
        self.apply_collapse(&[(id, collapse)]);
    }

    /// Collapse every root child that has children, then fit.
    pub(super) fn collapse_to_main_branches(&mut self) {
        let root = self.tree.root();
        let mut changes = vec![(root, false)];
        changes.extend(
            self.tree
                .root_node()
                .children()
                .iter()
                .filter(|id| self.tree.get(**id).is_some_and(|n| !n.is_leaf()))
                .map(|id| (*id, true)),
        );
        self.apply_collapse(&changes);
        self.fit_current_tree();
    }

    pub(super) fn expand_all(&mut self) {
        let changes: Vec<_> = self
            .tree
            .nodes()
            .filter(|n| n.is_collapsed())
            .map(|n| (n.id(), false))
            .collect();
        self.apply_collapse(&changes);
    }

    /// Apply collapse flags and start the matching animations.
    ///
    /// Nodes that stay visible move from their current displayed frame to
    /// the new layout. Newly shown nodes grow out of the toggled ancestor;
    /// newly hidden ones slide into it and fade out.
    fn apply_collapse(&mut self, changes: &[(NodeId, bool)]) {
        let now = self.now_ms;
        let before = self.frames_at(now);
        let changed: Vec<(NodeId, bool)> = changes
            .iter()
            .copied()
            .filter(|(id, collapsed)| self.tree.set_collapsed(*id, *collapsed))
            .collect();
        if changed.is_empty() {
            return;
        }
        self.relayout();
        if !self.animations_enabled {
            self.animations.clear();
            self.transitions.clear();
            return;
        }

        let after = frames_from_layout(&self.layout);
        for (id, target) in &after {
            let from = before.get(id).copied().unwrap_or_else(|| {
                self.changed_ancestor(*id, &changed)
                    .and_then(|anchor| before.get(&anchor))
                    .map_or(NodeFrame::transparent(target.rect), |f| {
                        NodeFrame::transparent(f.rect)
                    })
            });
            if from == *target {
                self.animations.cancel(*id);
            } else {
                self.animations
                    .start(AnimationTask::new(*id, now, from, *target));
            }
        }
        for (id, frame) in &before {
            if after.contains_key(id) {
                continue;
            }
            let Some(anchor) = self.changed_ancestor(*id, &changed) else {
                continue;
            };
            let Some(anchor_frame) = after.get(&anchor) else {
                continue;
            };
            self.animations.start(AnimationTask::new(
                *id,
                now,
                *frame,
                NodeFrame::transparent(anchor_frame.rect),
            ));
        }

        for (id, collapsing) in changed {
            self.transitions.insert(
                id,
                PendingToggle {
                    collapsing,
                    ends_at_ms: now + ANIMATION_DURATION_MS,
                },
            );
        }
        crate::perf::log_event(
            "toggle",
            format!("animations={} now={now}", self.animations.len()),
        );
    }

    /// Nearest ancestor of `id` whose flag changed in this batch.
    fn changed_ancestor(&self, id: NodeId, changed: &[(NodeId, bool)]) -> Option<NodeId> {
        let mut current = self.tree.get(id)?.parent();
        while let Some(parent) = current {
            if changed.iter().any(|(c, _)| *c == parent) {
                return Some(parent);
            }
            current = self.tree.get(parent)?.parent();
        }
        None
    }

    /// Advance the clock and settle whatever finished.
    pub(super) fn tick(&mut self, now_ms: u64) {
        self.now_ms = self.now_ms.max(now_ms);
        let now = self.now_ms;
        let retired = self.animations.retire_finished(now);
        if retired > 0 {
            crate::perf::log_event("animation.retire", format!("count={retired} now={now}"));
        }
        self.transitions.retain(|_, pending| pending.ends_at_ms > now);
        if let Some(transition) = self.view_transition {
            self.view = transition.sample(now);
            if transition.is_finished(now) {
                self.view_transition = None;
            }
        }
        self.expire_toast(now);
    }

    /// Replace the tree with a fresh parse of `markdown`.
    pub(super) fn load_markdown(&mut self, markdown: &str) {
        let outcome = parse_with_title(markdown, self.title.as_deref());
        self.tree = outcome.tree;
        self.warnings = outcome.warnings;
        self.animations.clear();
        self.transitions.clear();
        self.view_transition = None;
        self.pointer = PointerState::Idle;
        self.relayout();
        if !self.user_has_interacted {
            self.fit_full_map();
        }
        tracing::debug!(nodes = self.tree.len(), "document reloaded");
    }

    pub(super) fn reload_from_disk(&mut self) -> Result<()> {
        let Some(path) = self.file_path.clone() else {
            return Ok(());
        };
        let source = crate::document::load_source(&path)?;
        if source.title.is_some() {
            self.title = source.title;
        }
        self.load_markdown(&source.markdown);
        Ok(())
    }

    /// Immediately fit the fully expanded map.
    pub(super) fn fit_full_map(&mut self) {
        let expanded = layout::compute_expanded(&self.tree, &self.layout_config, &self.measure);
        if let Some(view) = expanded
            .bounds()
            .and_then(|b| ViewState::fitted(b, self.viewport, INITIAL_FIT_FRACTION))
        {
            self.view = view;
        }
    }

    /// Fit the visible tree, animated unless animations are off.
    pub(super) fn fit_current_tree(&mut self) {
        let Some(target) = self.current_fit() else {
            return;
        };
        if self.animations_enabled {
            self.view_transition = Some(ViewTransition {
                from: self.view,
                to: target,
                start_ms: self.now_ms,
                duration_ms: FIT_DURATION_MS,
            });
        } else {
            self.view = target;
        }
    }

    fn current_fit(&self) -> Option<ViewState> {
        self.layout
            .bounds()
            .and_then(|b| ViewState::fitted(b, self.viewport, FIT_FRACTION))
    }

    /// Stop any view animation and remember that the user took over.
    pub(super) fn mark_interaction(&mut self) {
        self.view_transition = None;
        self.user_has_interacted = true;
    }

    pub(super) fn viewport_center(&self) -> Point {
        Point::new(self.viewport.0 / 2.0, self.viewport.1 / 2.0)
    }

    /// Number of visible nodes.
    pub fn visible_count(&self) -> usize {
        self.layout.len()
    }

    /// Bounds of the visible tree in world coordinates.
    pub fn bounds(&self) -> Option<Rect> {
        self.layout.bounds()
    }

    pub(super) fn show_toast(&mut self, level: ToastLevel, message: impl Into<String>) {
        self.toast = Some(Toast {
            level,
            message: message.into(),
            expires_at_ms: None,
        });
    }

    fn expire_toast(&mut self, now_ms: u64) {
        let Some(toast) = self.toast.as_mut() else {
            return;
        };
        match toast.expires_at_ms {
            None => toast.expires_at_ms = Some(now_ms + TOAST_DURATION_MS),
            Some(at) if at <= now_ms => self.toast = None,
            Some(_) => {}
        }
    }

    pub fn active_toast(&self) -> Option<(&str, ToastLevel)> {
        self.toast
            .as_ref()
            .map(|toast| (toast.message.as_str(), toast.level))
    }
}

impl Default for Model {
    fn default() -> Self {
        Self {
            tree: parse_with_title("", None).tree,
            warnings: Vec::new(),
            layout: Layout::default(),
            layout_config: LayoutConfig::default(),
            measure: MonospaceMeasure::default(),
            view: ViewState::default(),
            view_transition: None,
            animations: AnimationRegistry::default(),
            transitions: BTreeMap::new(),
            pointer: PointerState::Idle,
            now_ms: 0,
            viewport: DEFAULT_VIEWPORT,
            user_has_interacted: false,
            animations_enabled: true,
            title: None,
            file_path: None,
            watch_enabled: false,
            help_visible: false,
            should_quit: false,
            dark_theme: true,
            config_global_path: None,
            config_local_path: None,
            toast: None,
            renderer: Renderer::new(),
            scene: RetainedScene::new(),
        }
    }
}
