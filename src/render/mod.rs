//! Render pipeline.
//!
//! A [`Snapshot`] is the complete drawable state of one frame. The
//! [`Renderer`] diffs it against the previous one and pushes only the
//! differences to a [`Surface`], the host's retained drawing target.

mod connector;
mod scene;

use std::collections::BTreeMap;
use std::fmt;

pub use connector::CubicBezier;
pub use scene::RetainedScene;

use crate::app::ViewState;
use crate::document::{MindMap, NodeId};
use crate::layout::{Layout, LayoutConfig, Rect, label_lines};

/// An RGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

/// Per-branch colours, cycled by root-child index.
pub const BRANCH_PALETTE: [Rgb; 8] = [
    Rgb(0x4e, 0x79, 0xa7),
    Rgb(0xf2, 0x8e, 0x2b),
    Rgb(0xe1, 0x57, 0x59),
    Rgb(0x76, 0xb7, 0xb2),
    Rgb(0x59, 0xa1, 0x4f),
    Rgb(0xed, 0xc9, 0x48),
    Rgb(0xb0, 0x7a, 0xa1),
    Rgb(0x9c, 0x75, 0x5f),
];

/// Colour for a branch; the root (no branch) uses a neutral grey.
pub const fn branch_color(branch: Option<usize>) -> Rgb {
    match branch {
        Some(index) => BRANCH_PALETTE[index % BRANCH_PALETTE.len()],
        None => Rgb(0x80, 0x80, 0x80),
    }
}

/// Position and opacity of a node at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeFrame {
    pub rect: Rect,
    pub opacity: f32,
}

impl NodeFrame {
    pub const fn opaque(rect: Rect) -> Self {
        Self { rect, opacity: 1.0 }
    }

    pub const fn transparent(rect: Rect) -> Self {
        Self { rect, opacity: 0.0 }
    }

    /// Linear interpolation; `t` is clamped to `[0, 1]`.
    pub fn lerp(&self, to: &Self, t: f32) -> Self {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: f32, b: f32| a + (b - a) * t;
        Self {
            rect: Rect::new(
                mix(self.rect.x, to.rect.x),
                mix(self.rect.y, to.rect.y),
                mix(self.rect.width, to.rect.width),
                mix(self.rect.height, to.rect.height),
            ),
            opacity: mix(self.opacity, to.opacity),
        }
    }
}

/// Displayed node frames keyed by id.
pub type Frames = BTreeMap<NodeId, NodeFrame>;

/// Fully opaque frames for every node in a layout.
pub fn frames_from_layout(layout: &Layout) -> Frames {
    layout
        .iter()
        .map(|(id, rect)| (id, NodeFrame::opaque(rect)))
        .collect()
}

/// What a node offers to click.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Affordance {
    /// No children
    Leaf,
    /// Children visible; clicking collapses
    Expanded,
    /// Children hidden; clicking expands
    Collapsed { hidden: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeVisual {
    pub id: NodeId,
    pub rect: Rect,
    pub opacity: f32,
    pub lines: Vec<String>,
    pub strong: bool,
    pub depth: usize,
    pub branch: Option<usize>,
    pub affordance: Affordance,
}

/// Identity of a parent-child edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectorId {
    pub parent: NodeId,
    pub child: NodeId,
}

impl fmt::Display for ConnectorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.parent, self.child)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConnectorVisual {
    pub id: ConnectorId,
    pub curve: CubicBezier,
    pub opacity: f32,
    pub branch: Option<usize>,
}

/// Drawable state for one frame.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Snapshot {
    nodes: BTreeMap<NodeId, NodeVisual>,
    connectors: BTreeMap<ConnectorId, ConnectorVisual>,
}

impl Snapshot {
    /// Build visuals for every framed node and every edge whose ends are
    /// both framed.
    pub fn build(tree: &MindMap, frames: &Frames, config: &LayoutConfig) -> Self {
        let mut nodes = BTreeMap::new();
        let mut connectors = BTreeMap::new();
        for (&id, frame) in frames {
            let Some(node) = tree.get(id) else { continue };
            let affordance = if node.is_leaf() {
                Affordance::Leaf
            } else if node.is_collapsed() {
                Affordance::Collapsed {
                    hidden: tree.descendant_count(id),
                }
            } else {
                Affordance::Expanded
            };
            let branch = tree.branch_index(id);
            nodes.insert(
                id,
                NodeVisual {
                    id,
                    rect: frame.rect,
                    opacity: frame.opacity,
                    lines: label_lines(node, config),
                    strong: node.is_strong(),
                    depth: node.depth(),
                    branch,
                    affordance,
                },
            );

            if let Some(parent) = node.parent()
                && let Some(parent_frame) = frames.get(&parent)
            {
                let connector = ConnectorId { parent, child: id };
                connectors.insert(
                    connector,
                    ConnectorVisual {
                        id: connector,
                        curve: CubicBezier::between(&parent_frame.rect, &frame.rect),
                        opacity: frame.opacity.min(parent_frame.opacity),
                        branch,
                    },
                );
            }
        }
        Self { nodes, connectors }
    }

    pub fn node(&self, id: NodeId) -> Option<&NodeVisual> {
        self.nodes.get(&id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &NodeVisual> {
        self.nodes.values()
    }

    pub fn connectors(&self) -> impl Iterator<Item = &ConnectorVisual> {
        self.connectors.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn connector_count(&self) -> usize {
        self.connectors.len()
    }

    /// Topmost node containing the world point.
    pub fn hit_test(&self, x: f32, y: f32) -> Option<NodeId> {
        let point = crate::layout::Point::new(x, y);
        self.nodes
            .values()
            .rev()
            .find(|node| node.opacity > 0.5 && node.rect.contains(point))
            .map(|node| node.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    /// The host surface is gone (e.g. the terminal was torn down)
    #[error("render surface is detached")]
    SurfaceDetached,
}

/// A retained drawing target.
///
/// Elements are addressed by id; upserting an existing id replaces it.
pub trait Surface {
    fn upsert_node(&mut self, node: &NodeVisual) -> Result<(), RenderError>;
    fn remove_node(&mut self, id: NodeId) -> Result<(), RenderError>;
    fn upsert_connector(&mut self, connector: &ConnectorVisual) -> Result<(), RenderError>;
    fn remove_connector(&mut self, id: ConnectorId) -> Result<(), RenderError>;
    fn set_view(&mut self, view: ViewState) -> Result<(), RenderError>;
    /// Drop every node and connector.
    fn clear(&mut self) -> Result<(), RenderError>;
}

/// Element counts for one render pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
    pub unchanged: usize,
    pub view_changed: bool,
}

impl RenderStats {
    /// True when nothing was pushed to the surface.
    pub const fn is_noop(&self) -> bool {
        self.added == 0 && self.updated == 0 && self.removed == 0 && !self.view_changed
    }
}

/// Diffing renderer; remembers what the surface currently shows.
#[derive(Debug, Default)]
pub struct Renderer {
    previous: Option<Snapshot>,
    previous_view: Option<ViewState>,
    /// A push failed part-way; the surface content is unknown
    dirty: bool,
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push the differences between the last rendered frame and `snapshot`.
    ///
    /// # Errors
    /// Returns the surface's error. The remembered frame is dropped, so the
    /// next successful call clears the surface and pushes everything again.
    pub fn render(
        &mut self,
        snapshot: Snapshot,
        view: ViewState,
        surface: &mut dyn Surface,
    ) -> Result<RenderStats, RenderError> {
        let _scope = crate::perf::scope("render.diff");
        match self.push(&snapshot, view, surface) {
            Ok(stats) => {
                if !stats.is_noop() {
                    crate::perf::log_event(
                        "render.push",
                        format!(
                            "added={} updated={} removed={} unchanged={} view={}",
                            stats.added,
                            stats.updated,
                            stats.removed,
                            stats.unchanged,
                            stats.view_changed
                        ),
                    );
                }
                self.previous = Some(snapshot);
                self.previous_view = Some(view);
                self.dirty = false;
                Ok(stats)
            }
            Err(err) => {
                tracing::warn!(%err, "render failed; next frame repaints fully");
                self.previous = None;
                self.previous_view = None;
                self.dirty = true;
                Err(err)
            }
        }
    }

    fn push(
        &self,
        next: &Snapshot,
        view: ViewState,
        surface: &mut dyn Surface,
    ) -> Result<RenderStats, RenderError> {
        if self.dirty {
            surface.clear()?;
        }
        let empty = Snapshot::default();
        let prev = self.previous.as_ref().unwrap_or(&empty);
        let mut stats = RenderStats::default();

        for id in prev.connectors.keys() {
            if !next.connectors.contains_key(id) {
                surface.remove_connector(*id)?;
                stats.removed += 1;
            }
        }
        for id in prev.nodes.keys() {
            if !next.nodes.contains_key(id) {
                surface.remove_node(*id)?;
                stats.removed += 1;
            }
        }

        for (id, visual) in &next.nodes {
            match prev.nodes.get(id) {
                Some(old) if old == visual => stats.unchanged += 1,
                Some(_) => {
                    surface.upsert_node(visual)?;
                    stats.updated += 1;
                }
                None => {
                    surface.upsert_node(visual)?;
                    stats.added += 1;
                }
            }
        }
        for (id, visual) in &next.connectors {
            match prev.connectors.get(id) {
                Some(old) if old == visual => stats.unchanged += 1,
                Some(_) => {
                    surface.upsert_connector(visual)?;
                    stats.updated += 1;
                }
                None => {
                    surface.upsert_connector(visual)?;
                    stats.added += 1;
                }
            }
        }

        if self.previous_view != Some(view) {
            surface.set_view(view)?;
            stats.view_changed = true;
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::parse;
    use crate::layout::{MonospaceMeasure, compute};

    fn snapshot_of(tree: &MindMap) -> Snapshot {
        let config = LayoutConfig::default();
        let layout = compute(tree, &config, &MonospaceMeasure::default());
        Snapshot::build(tree, &frames_from_layout(&layout), &config)
    }

    /// Records every call it receives.
    #[derive(Default)]
    struct CountingSurface {
        calls: Vec<String>,
    }

    impl Surface for CountingSurface {
        fn upsert_node(&mut self, node: &NodeVisual) -> Result<(), RenderError> {
            self.calls.push(format!("upsert {}", node.id));
            Ok(())
        }
        fn remove_node(&mut self, id: NodeId) -> Result<(), RenderError> {
            self.calls.push(format!("remove {id}"));
            Ok(())
        }
        fn upsert_connector(&mut self, c: &ConnectorVisual) -> Result<(), RenderError> {
            self.calls.push(format!("upsert {}", c.id));
            Ok(())
        }
        fn remove_connector(&mut self, id: ConnectorId) -> Result<(), RenderError> {
            self.calls.push(format!("remove {id}"));
            Ok(())
        }
        fn set_view(&mut self, _view: ViewState) -> Result<(), RenderError> {
            self.calls.push("view".to_string());
            Ok(())
        }
        fn clear(&mut self) -> Result<(), RenderError> {
            self.calls.push("clear".to_string());
            Ok(())
        }
    }

    #[test]
    fn test_snapshot_has_connector_per_visible_edge() {
        let tree = parse("# A\n- B\n  - B1\n- C").tree;
        let snapshot = snapshot_of(&tree);
        assert_eq!(snapshot.node_count(), 4);
        assert_eq!(snapshot.connector_count(), 3);
    }

    #[test]
    fn test_affordances_reflect_children_and_collapse() {
        let mut tree = parse("# A\n- B\n  - B1\n  - B2\n- C").tree;
        let b = tree.find_by_text("B").unwrap();
        tree.set_collapsed(b, true);
        let snapshot = snapshot_of(&tree);
        assert_eq!(
            snapshot.node(b).unwrap().affordance,
            Affordance::Collapsed { hidden: 2 }
        );
        let c = tree.find_by_text("C").unwrap();
        assert_eq!(snapshot.node(c).unwrap().affordance, Affordance::Leaf);
        assert_eq!(
            snapshot.node(tree.root()).unwrap().affordance,
            Affordance::Expanded
        );
    }

    #[test]
    fn test_branch_index_assigned_per_root_child() {
        let tree = parse("# A\n- B\n  - B1\n- C").tree;
        let snapshot = snapshot_of(&tree);
        let b1 = tree.find_by_text("B1").unwrap();
        let c = tree.find_by_text("C").unwrap();
        assert_eq!(snapshot.node(b1).unwrap().branch, Some(0));
        assert_eq!(snapshot.node(c).unwrap().branch, Some(1));
        assert_eq!(snapshot.node(tree.root()).unwrap().branch, None);
    }

    #[test]
    fn test_unchanged_snapshot_pushes_nothing() {
        let tree = parse("# A\n- B\n- C").tree;
        let mut renderer = Renderer::new();
        let mut surface = CountingSurface::default();
        let view = ViewState::default();

        let first = renderer
            .render(snapshot_of(&tree), view, &mut surface)
            .unwrap();
        assert_eq!(first.added, 5);
        assert!(first.view_changed);
        surface.calls.clear();

        let second = renderer
            .render(snapshot_of(&tree), view, &mut surface)
            .unwrap();
        assert!(second.is_noop());
        assert_eq!(second.unchanged, 5);
        assert!(surface.calls.is_empty());
    }

    #[test]
    fn test_collapse_removes_hidden_elements() {
        let mut tree = parse("# A\n- B\n  - B1\n- C").tree;
        let mut renderer = Renderer::new();
        let mut surface = CountingSurface::default();
        let view = ViewState::default();
        renderer
            .render(snapshot_of(&tree), view, &mut surface)
            .unwrap();
        surface.calls.clear();

        let b = tree.find_by_text("B").unwrap();
        tree.set_collapsed(b, true);
        let stats = renderer
            .render(snapshot_of(&tree), view, &mut surface)
            .unwrap();
        // B1 and its connector go away
        assert_eq!(stats.removed, 2);
        assert!(surface.calls.contains(&"remove node-2".to_string()));
        assert!(surface.calls.contains(&"remove node-1->node-2".to_string()));
    }

    #[test]
    fn test_view_change_alone_only_sets_view() {
        let tree = parse("# A\n- B").tree;
        let mut renderer = Renderer::new();
        let mut surface = CountingSurface::default();
        renderer
            .render(snapshot_of(&tree), ViewState::default(), &mut surface)
            .unwrap();
        surface.calls.clear();

        let mut moved = ViewState::default();
        moved.pan_by(10.0, 0.0);
        renderer
            .render(snapshot_of(&tree), moved, &mut surface)
            .unwrap();
        assert_eq!(surface.calls, vec!["view".to_string()]);
    }

    #[test]
    fn test_detached_surface_errors_and_forces_full_repaint() {
        let tree = parse("# A\n- B").tree;
        let mut renderer = Renderer::new();
        let mut scene = RetainedScene::new();
        let view = ViewState::default();
        renderer
            .render(snapshot_of(&tree), view, &mut scene)
            .unwrap();

        scene.detach();
        let mut moved = view;
        moved.pan_by(5.0, 5.0);
        let err = renderer
            .render(snapshot_of(&tree), moved, &mut scene)
            .unwrap_err();
        assert_eq!(err, RenderError::SurfaceDetached);

        scene.attach();
        let stats = renderer
            .render(snapshot_of(&tree), view, &mut scene)
            .unwrap();
        assert_eq!(stats.added, 3);
    }

    #[test]
    fn test_repaint_after_failure_drops_elements_hidden_meanwhile() {
        let mut tree = parse("# A\n- B\n  - B1\n- C").tree;
        let mut renderer = Renderer::new();
        let mut scene = RetainedScene::new();
        let view = ViewState::default();
        renderer
            .render(snapshot_of(&tree), view, &mut scene)
            .unwrap();
        let b1 = tree.find_by_text("B1").unwrap();
        assert!(scene.node(b1).is_some());

        scene.detach();
        let b = tree.find_by_text("B").unwrap();
        tree.set_collapsed(b, true);
        renderer
            .render(snapshot_of(&tree), view, &mut scene)
            .unwrap_err();

        scene.attach();
        renderer
            .render(snapshot_of(&tree), view, &mut scene)
            .unwrap();
        assert!(scene.node(b1).is_none());
        assert_eq!(scene.nodes().count(), 3);
        assert_eq!(scene.connectors().count(), 2);
    }

    #[test]
    fn test_first_render_does_not_clear() {
        let tree = parse("# A").tree;
        let mut renderer = Renderer::new();
        let mut surface = CountingSurface::default();
        renderer
            .render(snapshot_of(&tree), ViewState::default(), &mut surface)
            .unwrap();
        assert!(!surface.calls.contains(&"clear".to_string()));
    }

    #[test]
    fn test_frame_lerp_clamps() {
        let a = NodeFrame::transparent(Rect::new(0.0, 0.0, 10.0, 10.0));
        let b = NodeFrame::opaque(Rect::new(10.0, 20.0, 10.0, 10.0));
        let mid = a.lerp(&b, 0.5);
        assert!((mid.rect.x - 5.0).abs() < 1e-5);
        assert!((mid.opacity - 0.5).abs() < 1e-5);
        assert_eq!(a.lerp(&b, 2.0), b);
    }

    #[test]
    fn test_hit_test_finds_node() {
        let tree = parse("# A\n- B").tree;
        let snapshot = snapshot_of(&tree);
        assert_eq!(snapshot.hit_test(0.0, 0.0), Some(tree.root()));
        assert_eq!(snapshot.hit_test(-10_000.0, 0.0), None);
    }
}
