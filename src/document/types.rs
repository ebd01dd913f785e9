//! Core tree types.

use std::fmt;

/// Stable identifier of a node within one parsed tree.
///
/// Ids are arena indices assigned in document order; the root is always
/// `node-0`. They are only meaningful for the tree that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// The root of every tree.
    pub const ROOT: Self = Self(0);

    /// Arena index of this node.
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node-{}", self.0)
    }
}

/// Where a node came from in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// The single root (first level-1 heading, or a title fallback)
    Root,
    /// A markdown heading of the given level
    Heading { level: u8 },
    /// A list item
    ListItem,
    /// An unstructured block kept verbatim
    Literal,
}

/// Inline styling flags for a text span.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InlineStyle {
    pub emphasis: bool,
    pub strong: bool,
    pub code: bool,
    pub strikethrough: bool,
    pub link: bool,
}

/// A styled inline span of label text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineSpan {
    text: String,
    style: InlineStyle,
}

impl InlineSpan {
    pub const fn new(text: String, style: InlineStyle) -> Self {
        Self { text, style }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub const fn style(&self) -> InlineStyle {
        self.style
    }
}

/// One element of the mind-map tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    id: NodeId,
    kind: NodeKind,
    /// Markdown fragment the label was built from
    content: String,
    /// Inline-styled label
    spans: Vec<InlineSpan>,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
    depth: usize,
    collapsed: bool,
}

impl Node {
    pub const fn id(&self) -> NodeId {
        self.id
    }

    pub const fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Raw markdown content of the label.
    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn spans(&self) -> &[InlineSpan] {
        &self.spans
    }

    /// Label text with inline markup removed.
    pub fn text(&self) -> String {
        self.spans.iter().map(InlineSpan::text).collect()
    }

    /// Whether every non-blank span is strong (e.g. level-3 headings).
    pub fn is_strong(&self) -> bool {
        let mut visible = self
            .spans
            .iter()
            .filter(|span| !span.text().trim().is_empty())
            .peekable();
        visible.peek().is_some() && visible.all(|span| span.style().strong)
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub const fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub const fn depth(&self) -> usize {
        self.depth
    }

    pub const fn is_collapsed(&self) -> bool {
        self.collapsed
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Arena-backed mind-map tree.
///
/// Nodes own their children through index lists; the parent link is a
/// plain index used for lookups. Node geometry is not stored here, it lives
/// in [`crate::layout::Layout`].
#[derive(Debug, Clone, PartialEq)]
pub struct MindMap {
    nodes: Vec<Node>,
}

impl MindMap {
    /// Create a tree containing only a root with the given label.
    pub(crate) fn with_root(content: String, spans: Vec<InlineSpan>) -> Self {
        Self {
            nodes: vec![Node {
                id: NodeId::ROOT,
                kind: NodeKind::Root,
                content,
                spans,
                children: Vec::new(),
                parent: None,
                depth: 0,
                collapsed: false,
            }],
        }
    }

    /// Append a child under `parent` and return its id.
    ///
    /// # Panics
    ///
    /// Panics if `parent` does not belong to this tree; the parser only
    /// passes ids it obtained from this arena.
    pub(crate) fn push_child(
        &mut self,
        parent: NodeId,
        kind: NodeKind,
        content: String,
        spans: Vec<InlineSpan>,
        collapsed: bool,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        let depth = self.nodes[parent.0].depth + 1;
        self.nodes.push(Node {
            id,
            kind,
            content,
            spans,
            children: Vec::new(),
            parent: Some(parent),
            depth,
            collapsed,
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    pub(crate) fn set_root_label(&mut self, content: String, spans: Vec<InlineSpan>) {
        let root = &mut self.nodes[0];
        root.content = content;
        root.spans = spans;
    }

    pub const fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    pub fn root_node(&self) -> &Node {
        &self.nodes[0]
    }

    /// Look up a node; `None` for ids from another tree.
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.0 < self.nodes.len()
    }

    /// Total number of nodes, including hidden ones.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// A tree always has its root, so this is never true.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes in document order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// Find the first node whose plain label equals `text`.
    pub fn find_by_text(&self, text: &str) -> Option<NodeId> {
        self.nodes.iter().find(|n| n.text() == text).map(Node::id)
    }

    /// A node is visible when none of its ancestors is collapsed.
    pub fn is_visible(&self, id: NodeId) -> bool {
        let Some(mut node) = self.get(id) else {
            return false;
        };
        while let Some(parent) = node.parent {
            node = &self.nodes[parent.0];
            if node.collapsed {
                return false;
            }
        }
        true
    }

    /// Visible nodes in pre-order (document order).
    pub fn visible(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![NodeId::ROOT];
        while let Some(id) = stack.pop() {
            out.push(id);
            let node = &self.nodes[id.0];
            if !node.collapsed {
                stack.extend(node.children.iter().rev().copied());
            }
        }
        out
    }

    /// All descendants of `id` in pre-order, regardless of collapse state.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let Some(node) = self.get(id) else {
            return out;
        };
        let mut stack: Vec<NodeId> = node.children.iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.nodes[next.0].children.iter().rev().copied());
        }
        out
    }

    pub fn descendant_count(&self, id: NodeId) -> usize {
        self.descendants(id).len()
    }

    /// Index of the root child whose branch contains `id` (root itself: `None`).
    pub fn branch_index(&self, id: NodeId) -> Option<usize> {
        let mut current = self.get(id)?;
        let mut parent = current.parent?;
        while parent != NodeId::ROOT {
            current = &self.nodes[parent.0];
            parent = current.parent?;
        }
        self.nodes[0]
            .children
            .iter()
            .position(|child| *child == current.id)
    }

    /// Set the collapsed flag; returns whether it changed.
    ///
    /// Only the interaction controller calls this; layout and rendering
    /// read the flags.
    pub fn set_collapsed(&mut self, id: NodeId, collapsed: bool) -> bool {
        match self.nodes.get_mut(id.0) {
            Some(node) if node.collapsed != collapsed => {
                node.collapsed = collapsed;
                true
            }
            _ => false,
        }
    }
}

/// What went wrong while recovering from non-hierarchical input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WarningKind {
    /// A heading jumped more than one level below its parent
    SkippedHeadingLevel { from: u8, to: u8 },
    /// A second level-1 heading; attached under the root
    ExtraTopLevelHeading,
    /// A block that is neither heading nor list item, kept as a literal leaf
    UnstructuredBlock { block: &'static str },
    /// A heading or item without text
    EmptyNode,
}

/// A non-fatal parse warning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseWarning {
    /// 1-based source line
    pub line: usize,
    pub kind: WarningKind,
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            WarningKind::SkippedHeadingLevel { from, to } => write!(
                f,
                "line {}: heading level jumps from {from} to {to}",
                self.line
            ),
            WarningKind::ExtraTopLevelHeading => write!(
                f,
                "line {}: extra top-level heading attached under the root",
                self.line
            ),
            WarningKind::UnstructuredBlock { block } => {
                write!(f, "line {}: {block} kept as literal content", self.line)
            }
            WarningKind::EmptyNode => write!(f, "line {}: empty node", self.line),
        }
    }
}

/// A parsed tree together with its recovery warnings.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseOutcome {
    pub tree: MindMap,
    pub warnings: Vec<ParseWarning>,
}
