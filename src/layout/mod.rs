//! Tree layout.
//!
//! Horizontal layout with the root on the left and descendants in columns to
//! its right. Each column starts after the widest visible node of the
//! previous one; sibling subtrees stack vertically and a parent is centred on
//! the span of its children. The result is translated so the root's centre
//! is the world origin, which keeps the root fixed across collapse/expand.

mod measure;

pub use measure::{MonospaceMeasure, TextMeasure, wrap_label};

use crate::document::{MindMap, Node, NodeId};

/// A point in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned rectangle; `y` grows downward.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Connector anchor on the left edge.
    pub fn left_mid(&self) -> Point {
        Point::new(self.x, self.y + self.height / 2.0)
    }

    /// Connector anchor on the right edge.
    pub fn right_mid(&self) -> Point {
        Point::new(self.right(), self.y + self.height / 2.0)
    }

    /// Strict overlap; rectangles sharing only an edge do not intersect.
    pub fn intersects(&self, other: &Self) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x && point.x <= self.right() && point.y >= self.y && point.y <= self.bottom()
    }

    pub fn union(&self, other: &Self) -> Self {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Self::new(
            x,
            y,
            self.right().max(other.right()) - x,
            self.bottom().max(other.bottom()) - y,
        )
    }

    pub fn translate(&self, dx: f32, dy: f32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.width, self.height)
    }
}

/// Spacing and sizing parameters, in world units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutConfig {
    /// Gap between the widest node of a column and the next column
    pub level_spacing: f32,
    /// Gap between adjacent sibling subtrees
    pub sibling_spacing: f32,
    pub padding_x: f32,
    pub padding_y: f32,
    pub min_width: f32,
    pub min_height: f32,
    /// Labels wrap at this many display columns
    pub max_label_chars: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            level_spacing: 80.0,
            sibling_spacing: 10.0,
            padding_x: 12.0,
            padding_y: 9.0,
            min_width: 40.0,
            min_height: 36.0,
            max_label_chars: 40,
        }
    }
}

/// Geometry for every visible node, indexed by [`NodeId`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Layout {
    rects: Vec<Option<Rect>>,
}

impl Layout {
    /// Rectangle of a visible node; `None` for hidden or unknown ids.
    pub fn get(&self, id: NodeId) -> Option<Rect> {
        self.rects.get(id.index()).copied().flatten()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Visible nodes with their rectangles, in id order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, Rect)> + '_ {
        self.rects
            .iter()
            .enumerate()
            .filter_map(|(idx, rect)| rect.map(|r| (NodeId(idx), r)))
    }

    /// Number of nodes with geometry.
    pub fn len(&self) -> usize {
        self.rects.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Union of all visible rectangles.
    pub fn bounds(&self) -> Option<Rect> {
        self.iter().map(|(_, r)| r).reduce(|acc, r| acc.union(&r))
    }
}

/// Wrapped label lines for a node.
pub fn label_lines(node: &Node, config: &LayoutConfig) -> Vec<String> {
    wrap_label(&node.text(), config.max_label_chars)
}

/// Size of a node box: label extent plus padding, floored at the minimum.
pub fn node_size(node: &Node, config: &LayoutConfig, measure: &dyn TextMeasure) -> (f32, f32) {
    let lines = label_lines(node, config);
    let text_width = lines
        .iter()
        .map(|line| measure.line_width(line))
        .fold(0.0_f32, f32::max);
    let text_height = lines.len() as f32 * measure.line_height();
    (
        (text_width + 2.0 * config.padding_x).max(config.min_width),
        (text_height + 2.0 * config.padding_y).max(config.min_height),
    )
}

/// Lay out the visible tree, honouring collapse flags.
pub fn compute(tree: &MindMap, config: &LayoutConfig, measure: &dyn TextMeasure) -> Layout {
    let _scope = crate::perf::scope("layout.compute");
    compute_with(tree, config, measure, true)
}

/// Lay out the tree as if nothing were collapsed.
pub fn compute_expanded(
    tree: &MindMap,
    config: &LayoutConfig,
    measure: &dyn TextMeasure,
) -> Layout {
    let _scope = crate::perf::scope("layout.compute_expanded");
    compute_with(tree, config, measure, false)
}

fn open_children(node: &Node, respect_collapse: bool) -> &[NodeId] {
    if respect_collapse && node.is_collapsed() {
        &[]
    } else {
        node.children()
    }
}

#[derive(Debug, Default, Clone)]
struct Subtree {
    height: f32,
    /// Top of the node box relative to the subtree top
    node_offset: f32,
    /// Top of each child subtree relative to this subtree's top
    child_offsets: Vec<f32>,
}

fn compute_with(
    tree: &MindMap,
    config: &LayoutConfig,
    measure: &dyn TextMeasure,
    respect_collapse: bool,
) -> Layout {
    let order: Vec<NodeId> = if respect_collapse {
        tree.visible()
    } else {
        std::iter::once(tree.root())
            .chain(tree.descendants(tree.root()))
            .collect()
    };
    let count = tree.len();
    let mut sizes = vec![(0.0_f32, 0.0_f32); count];
    let mut column_widths: Vec<f32> = Vec::new();
    for &id in &order {
        let Some(node) = tree.get(id) else { continue };
        let size = node_size(node, config, measure);
        sizes[id.index()] = size;
        let depth = node.depth();
        if column_widths.len() <= depth {
            column_widths.resize(depth + 1, 0.0);
        }
        column_widths[depth] = column_widths[depth].max(size.0);
    }

    let mut column_x = Vec::with_capacity(column_widths.len());
    let mut x = 0.0;
    for width in &column_widths {
        column_x.push(x);
        x += width + config.level_spacing;
    }

    // Reverse pre-order visits children before their parent.
    let mut subtrees = vec![Subtree::default(); count];
    for &id in order.iter().rev() {
        let Some(node) = tree.get(id) else { continue };
        let height = sizes[id.index()].1;
        let children = open_children(node, respect_collapse);
        let (Some(first), Some(last)) = (children.first(), children.last()) else {
            subtrees[id.index()] = Subtree {
                height,
                node_offset: 0.0,
                child_offsets: Vec::new(),
            };
            continue;
        };

        let mut offsets = Vec::with_capacity(children.len());
        let mut cursor = 0.0;
        for child in children {
            offsets.push(cursor);
            cursor += subtrees[child.index()].height + config.sibling_spacing;
        }
        let block_height = cursor - config.sibling_spacing;

        let first_top = offsets[0] + subtrees[first.index()].node_offset;
        let last_idx = offsets.len() - 1;
        let last_bottom =
            offsets[last_idx] + subtrees[last.index()].node_offset + sizes[last.index()].1;
        let node_top = (first_top + last_bottom) / 2.0 - height / 2.0;

        let min = node_top.min(0.0);
        let max = (node_top + height).max(block_height);
        let shift = -min;
        subtrees[id.index()] = Subtree {
            height: max - min,
            node_offset: node_top + shift,
            child_offsets: offsets.into_iter().map(|o| o + shift).collect(),
        };
    }

    let mut rects: Vec<Option<Rect>> = vec![None; count];
    let mut tops = vec![0.0_f32; count];
    for &id in &order {
        let Some(node) = tree.get(id) else { continue };
        let idx = id.index();
        let subtree = &subtrees[idx];
        let (width, height) = sizes[idx];
        rects[idx] = Some(Rect::new(
            column_x[node.depth()],
            tops[idx] + subtree.node_offset,
            width,
            height,
        ));
        for (child, offset) in open_children(node, respect_collapse).iter().zip(&subtree.child_offsets) {
            tops[child.index()] = tops[idx] + offset;
        }
    }

    if let Some(root) = rects[tree.root().index()] {
        let center = root.center();
        for rect in rects.iter_mut().flatten() {
            *rect = rect.translate(-center.x, -center.y);
        }
    }

    tracing::trace!(visible = order.len(), "layout computed");
    Layout { rects }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::parse;

    fn layout_of(md: &str) -> (MindMap, Layout) {
        let tree = parse(md).tree;
        let layout = compute(&tree, &LayoutConfig::default(), &MonospaceMeasure::default());
        (tree, layout)
    }

    fn id(tree: &MindMap, text: &str) -> NodeId {
        tree.find_by_text(text).unwrap()
    }

    #[test]
    fn test_single_node_centered_at_origin() {
        let (tree, layout) = layout_of("# Alone");
        let rect = layout.get(tree.root()).unwrap();
        let center = rect.center();
        assert!(center.x.abs() < 1e-4 && center.y.abs() < 1e-4);
        assert_eq!(layout.len(), 1);
    }

    #[test]
    fn test_children_stack_right_of_root() {
        let (tree, layout) = layout_of("# A\n- B\n- C");
        let a = layout.get(tree.root()).unwrap();
        let b = layout.get(id(&tree, "B")).unwrap();
        let c = layout.get(id(&tree, "C")).unwrap();
        assert!(b.x > a.right());
        assert!((b.x - c.x).abs() < f32::EPSILON);
        assert!(b.bottom() <= c.y);
        assert!(!b.intersects(&c));
        // root centred on its children
        let span_mid = f32::midpoint(b.y, c.bottom());
        assert!((a.center().y - span_mid).abs() < 1e-3);
    }

    #[test]
    fn test_collapsed_subtree_has_no_geometry() {
        let mut tree = parse("# A\n- B\n  - B1\n- C").tree;
        let b = id(&tree, "B");
        tree.set_collapsed(b, true);
        let layout = compute(&tree, &LayoutConfig::default(), &MonospaceMeasure::default());
        assert!(layout.contains(b));
        assert!(!layout.contains(id(&tree, "B1")));
        assert_eq!(layout.len(), 3);
    }

    #[test]
    fn test_collapse_then_expand_restores_geometry() {
        let md = "# A\n## B\n- b1\n- b2\n  - b21\n## C\n- c1\n";
        let (mut tree, before) = layout_of(md);
        let config = LayoutConfig::default();
        let measure = MonospaceMeasure::default();
        let b = id(&tree, "B");
        tree.set_collapsed(b, true);
        let collapsed = compute(&tree, &config, &measure);
        assert_ne!(collapsed, before);
        tree.set_collapsed(b, false);
        assert_eq!(compute(&tree, &config, &measure), before);
    }

    #[test]
    fn test_collapsing_root_leaves_single_node() {
        let (mut tree, before) = layout_of("# A\n- B\n- C");
        tree.set_collapsed(tree.root(), true);
        let layout = compute(&tree, &LayoutConfig::default(), &MonospaceMeasure::default());
        assert_eq!(layout.len(), 1);
        assert_eq!(layout.get(tree.root()), before.get(tree.root()));
    }

    #[test]
    fn test_compute_expanded_ignores_collapse_flags() {
        let (mut tree, before) = layout_of("# A\n- B\n  - B1\n- C");
        tree.set_collapsed(id(&tree, "B"), true);
        let expanded =
            compute_expanded(&tree, &LayoutConfig::default(), &MonospaceMeasure::default());
        assert_eq!(expanded, before);
    }

    #[test]
    fn test_empty_label_floors_to_min_size() {
        let (tree, layout) = layout_of("# A\n-\n");
        let config = LayoutConfig::default();
        let child = tree.root_node().children()[0];
        let rect = layout.get(child).unwrap();
        assert!((rect.width - config.min_width).abs() < f32::EPSILON);
        assert!((rect.height - config.min_height).abs() < f32::EPSILON);
    }

    #[test]
    fn test_columns_start_after_widest_node() {
        let (tree, layout) = layout_of("# A\n- short\n- a much longer label here\n  - leaf");
        let config = LayoutConfig::default();
        let long = layout.get(id(&tree, "a much longer label here")).unwrap();
        let short = layout.get(id(&tree, "short")).unwrap();
        let leaf = layout.get(id(&tree, "leaf")).unwrap();
        assert!(long.width > short.width);
        assert!((leaf.x - (long.right() + config.level_spacing)).abs() < 1e-3);
    }

    #[test]
    fn test_long_labels_wrap() {
        let text = "word ".repeat(30);
        let (tree, layout) = layout_of(&format!("# A\n- {text}"));
        let child = tree.root_node().children()[0];
        let rect = layout.get(child).unwrap();
        let measure = MonospaceMeasure::default();
        assert!(rect.height > measure.line_height * 2.0);
    }

    #[test]
    fn test_bounds_covers_every_rect() {
        let (_, layout) = layout_of("# A\n- B\n  - B1\n- C\n  - C1\n  - C2");
        let bounds = layout.bounds().unwrap();
        for (_, rect) in layout.iter() {
            assert!(rect.x >= bounds.x - 1e-3 && rect.y >= bounds.y - 1e-3);
            assert!(rect.right() <= bounds.right() + 1e-3);
            assert!(rect.bottom() <= bounds.bottom() + 1e-3);
        }
    }

    #[test]
    fn test_rect_intersects_is_strict() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(10.0, 0.0, 10.0, 10.0);
        let c = Rect::new(5.0, 5.0, 10.0, 10.0);
        assert!(!a.intersects(&b));
        assert!(a.intersects(&c));
        assert!(a.contains(Point::new(10.0, 10.0)));
    }
}
