//! Markdown parsing with comrak.
//!
//! Headings and list nesting form the hierarchy. Everything else is either
//! inline label content or, at block level, recovered as a literal leaf.

use comrak::nodes::{AstNode, NodeValue};
use comrak::{Arena, Options, parse_document};

use super::types::{
    InlineSpan, InlineStyle, MindMap, NodeId, NodeKind, ParseOutcome, ParseWarning, WarningKind,
};

const DEFAULT_ROOT_TITLE: &str = "Mind Map";
const FOLD_MARKER: &str = "markmap: fold";
const FOLD_COMMENT: &str = "<!-- markmap: fold -->";

/// Parse markdown into a mind-map tree.
///
/// Never fails: unstructured input is kept as literal leaves and reported
/// through [`ParseOutcome::warnings`].
///
/// # Example
///
/// ```
/// let outcome = mindmark::document::parse("# A\n- B\n- C");
/// let tree = &outcome.tree;
/// assert_eq!(tree.root_node().text(), "A");
/// assert_eq!(tree.root_node().children().len(), 2);
/// ```
pub fn parse(source: &str) -> ParseOutcome {
    parse_with_title(source, None)
}

/// Parse markdown, using `fallback_title` for the root when the document
/// has neither a level-1 heading nor a front-matter title.
pub fn parse_with_title(source: &str, fallback_title: Option<&str>) -> ParseOutcome {
    let _scope = crate::perf::scope("document.parse");
    let arena = Arena::new();
    let mut options = Options::default();
    options.extension.strikethrough = true;
    options.extension.table = true;
    options.extension.autolink = true;
    options.extension.front_matter_delimiter = Some("---".to_string());

    let root = parse_document(&arena, source, &options);
    let mut builder = TreeBuilder::new(source, root, fallback_title);
    for child in root.children() {
        builder.visit_block(child);
    }
    let outcome = builder.finish();
    tracing::debug!(
        nodes = outcome.tree.len(),
        warnings = outcome.warnings.len(),
        "parsed mind map"
    );
    outcome
}

enum Block {
    Skip,
    Heading(u8),
    List,
    Literal(&'static str),
}

#[derive(Debug, Default)]
struct Label {
    spans: Vec<InlineSpan>,
    folded: bool,
}

impl Label {
    fn is_blank(&self) -> bool {
        self.spans.iter().all(|span| span.text().trim().is_empty())
    }

    fn into_strong(mut self) -> Self {
        self.spans = self
            .spans
            .into_iter()
            .map(|span| {
                let mut style = span.style();
                style.strong = true;
                InlineSpan::new(span.text().to_string(), style)
            })
            .collect();
        self
    }
}

struct TreeBuilder<'a, 's> {
    lines: Vec<&'s str>,
    tree: MindMap,
    warnings: Vec<ParseWarning>,
    /// Open ancestors as (hierarchy level, id); the root sits at level 0.
    stack: Vec<(usize, NodeId)>,
    last_heading_level: usize,
    root_heading: Option<&'a AstNode<'a>>,
}

impl<'a, 's> TreeBuilder<'a, 's> {
    fn new(source: &'s str, document: &'a AstNode<'a>, fallback_title: Option<&str>) -> Self {
        let mut front_matter_title = None;
        let mut root_heading = None;
        for child in document.children() {
            match &child.data.borrow().value {
                NodeValue::FrontMatter(raw) if front_matter_title.is_none() => {
                    front_matter_title = front_matter_value(raw, "title");
                }
                NodeValue::Heading(heading) if heading.level == 1 && root_heading.is_none() => {
                    root_heading = Some(child);
                }
                _ => {}
            }
        }

        let mut builder = Self {
            lines: source.lines().collect(),
            tree: MindMap::with_root(String::new(), Vec::new()),
            warnings: Vec::new(),
            stack: vec![(0, NodeId::ROOT)],
            last_heading_level: 0,
            root_heading,
        };

        if let Some(heading) = root_heading {
            let content = builder.heading_content(heading);
            let label = collect_label(heading);
            builder.tree.set_root_label(content, label.spans);
        } else {
            let title = front_matter_title
                .as_deref()
                .or(fallback_title.filter(|t| !t.trim().is_empty()))
                .unwrap_or(DEFAULT_ROOT_TITLE)
                .trim()
                .to_string();
            let spans = vec![InlineSpan::new(title.clone(), InlineStyle::default())];
            builder.tree.set_root_label(title, spans);
        }
        builder
    }

    fn finish(self) -> ParseOutcome {
        ParseOutcome {
            tree: self.tree,
            warnings: self.warnings,
        }
    }

    fn warn(&mut self, line: usize, kind: WarningKind) {
        tracing::trace!(line, ?kind, "parse recovery");
        self.warnings.push(ParseWarning { line, kind });
    }

    fn visit_block(&mut self, node: &'a AstNode<'a>) {
        let block = match &node.data.borrow().value {
            NodeValue::FrontMatter(_) | NodeValue::ThematicBreak => Block::Skip,
            NodeValue::Heading(_) if self.root_heading.is_some_and(|r| std::ptr::eq(r, node)) => {
                Block::Skip
            }
            NodeValue::Heading(heading) => Block::Heading(heading.level),
            NodeValue::List(_) => Block::List,
            NodeValue::HtmlBlock(html) if is_comment_only(&html.literal) => Block::Skip,
            other => Block::Literal(block_name(other)),
        };
        match block {
            Block::Skip => {}
            Block::Heading(level) => self.add_heading(node, level),
            Block::List => self.add_list(node, self.last_heading_level + 1),
            Block::Literal(name) => {
                let parent = self.current_parent();
                self.add_literal(node, parent, name);
            }
        }
    }

    fn current_parent(&self) -> NodeId {
        self.stack.last().map_or(NodeId::ROOT, |(_, id)| *id)
    }

    /// Close every open ancestor at or below `level` and return the parent.
    fn open_parent(&mut self, level: usize) -> (usize, NodeId) {
        while self.stack.len() > 1 && self.stack.last().is_some_and(|(l, _)| *l >= level) {
            self.stack.pop();
        }
        self.stack.last().copied().unwrap_or((0, NodeId::ROOT))
    }

    fn add_heading(&mut self, node: &'a AstNode<'a>, level: u8) {
        let line = start_line(node);
        let level_idx = usize::from(level);
        if level == 1 {
            self.warn(line, WarningKind::ExtraTopLevelHeading);
        }
        let (parent_level, parent) = self.open_parent(level_idx);
        // The root stands in for a level-1 heading.
        let effective_parent_level = if parent == NodeId::ROOT { 1 } else { parent_level };
        if level_idx > effective_parent_level + 1 {
            self.warn(
                line,
                WarningKind::SkippedHeadingLevel {
                    from: u8::try_from(effective_parent_level).unwrap_or(u8::MAX),
                    to: level,
                },
            );
        }

        let mut label = collect_label(node);
        if matches!(level, 3 | 4) {
            label = label.into_strong();
        }
        if label.is_blank() {
            self.warn(line, WarningKind::EmptyNode);
        }
        let content = self.heading_content(node);
        let id = self.tree.push_child(
            parent,
            NodeKind::Heading { level },
            content,
            label.spans,
            label.folded,
        );
        self.stack.push((level_idx, id));
        self.last_heading_level = level_idx;
    }

    fn add_list(&mut self, list: &'a AstNode<'a>, level: usize) {
        for item in list.children() {
            let is_item = matches!(item.data.borrow().value, NodeValue::Item(_));
            if is_item {
                self.add_item(item, level);
            }
        }
    }

    fn add_item(&mut self, item: &'a AstNode<'a>, level: usize) {
        let line = start_line(item);
        let (_, parent) = self.open_parent(level);

        let mut label_block = None;
        let mut rest = Vec::new();
        for child in item.children() {
            let is_label = matches!(
                child.data.borrow().value,
                NodeValue::Paragraph | NodeValue::Heading(_)
            );
            if is_label && label_block.is_none() {
                label_block = Some(child);
            } else {
                rest.push(child);
            }
        }

        let (content, label) = match label_block {
            Some(block) => {
                let is_heading = matches!(block.data.borrow().value, NodeValue::Heading(_));
                let label = collect_label(block);
                if is_heading {
                    (self.heading_content(block), label.into_strong())
                } else {
                    (strip_fold_comment(&self.source_span(block)), label)
                }
            }
            None => (String::new(), Label::default()),
        };
        if label.is_blank() {
            self.warn(line, WarningKind::EmptyNode);
        }

        let id = self.tree.push_child(
            parent,
            NodeKind::ListItem,
            content,
            label.spans,
            label.folded,
        );
        self.stack.push((level, id));

        for child in rest {
            let is_list = matches!(child.data.borrow().value, NodeValue::List(_));
            if is_list {
                self.add_list(child, level + 1);
            } else {
                let block = block_name(&child.data.borrow().value);
                self.add_literal(child, id, block);
            }
        }
    }

    fn add_literal(&mut self, node: &'a AstNode<'a>, parent: NodeId, block: &'static str) {
        let text = self.source_span(node).trim().to_string();
        if text.is_empty() {
            return;
        }
        self.warn(start_line(node), WarningKind::UnstructuredBlock { block });
        let spans = vec![InlineSpan::new(text.clone(), InlineStyle::default())];
        self.tree
            .push_child(parent, NodeKind::Literal, text, spans, false);
    }

    /// Raw source text covered by a block node.
    fn source_span(&self, node: &'a AstNode<'a>) -> String {
        let pos = node.data.borrow().sourcepos;
        let start = pos.start.line.max(1);
        let end = pos.end.line.max(start);
        let mut out = Vec::new();
        for line_no in start..=end {
            let Some(line) = self.lines.get(line_no - 1) else {
                break;
            };
            let mut text: &str = line;
            if line_no == end && pos.end.column > 0 {
                text = text.get(..pos.end.column).unwrap_or(text);
            }
            if line_no == start && pos.start.column > 1 {
                text = text.get(pos.start.column - 1..).unwrap_or(text);
            }
            out.push(text);
        }
        out.join("\n")
    }

    /// Heading label source without the `#` markers or setext underline.
    fn heading_content(&self, node: &'a AstNode<'a>) -> String {
        let setext = matches!(
            &node.data.borrow().value,
            NodeValue::Heading(heading) if heading.setext
        );
        let span = self.source_span(node);
        let text = if setext {
            let mut lines: Vec<&str> = span.lines().collect();
            lines.pop();
            lines.join(" ")
        } else {
            span.trim()
                .trim_start_matches('#')
                .trim()
                .trim_end_matches('#')
                .to_string()
        };
        strip_fold_comment(text.trim())
    }
}

/// 1-based line; synthesized nodes report line 0, which maps to 1.
fn start_line<'a>(node: &'a AstNode<'a>) -> usize {
    node.data.borrow().sourcepos.start.line.max(1)
}

const fn block_name(value: &NodeValue) -> &'static str {
    match value {
        NodeValue::Paragraph => "paragraph",
        NodeValue::CodeBlock(_) => "code block",
        NodeValue::BlockQuote => "block quote",
        NodeValue::Table(_) => "table",
        NodeValue::HtmlBlock(_) => "HTML block",
        NodeValue::Heading(_) => "heading",
        _ => "block",
    }
}

fn is_comment_only(html: &str) -> bool {
    let trimmed = html.trim();
    trimmed.starts_with("<!--") && trimmed.ends_with("-->")
}

fn strip_fold_comment(text: &str) -> String {
    text.replace(FOLD_COMMENT, "").trim().to_string()
}

fn front_matter_value(raw: &str, key: &str) -> Option<String> {
    raw.lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(k, _)| k.trim() == key)
        .map(|(_, v)| v.trim().trim_matches(|c| c == '"' || c == '\'').to_string())
        .filter(|v| !v.is_empty())
}

fn collect_label<'a>(node: &'a AstNode<'a>) -> Label {
    let mut label = Label::default();
    for child in node.children() {
        collect_inline_spans(child, InlineStyle::default(), &mut label);
    }
    normalize_spans(&mut label.spans);
    label
}

fn collect_inline_spans<'a>(node: &'a AstNode<'a>, style: InlineStyle, label: &mut Label) {
    match &node.data.borrow().value {
        NodeValue::Text(t) => {
            label.spans.push(InlineSpan::new(t.clone(), style));
        }
        NodeValue::Code(code) => {
            let code_style = InlineStyle {
                code: true,
                ..style
            };
            label
                .spans
                .push(InlineSpan::new(code.literal.clone(), code_style));
        }
        NodeValue::HtmlInline(html) => {
            if html.contains(FOLD_MARKER) {
                label.folded = true;
            }
        }
        NodeValue::Emph => {
            let next = InlineStyle {
                emphasis: true,
                ..style
            };
            for child in node.children() {
                collect_inline_spans(child, next, label);
            }
        }
        NodeValue::Strong => {
            let next = InlineStyle {
                strong: true,
                ..style
            };
            for child in node.children() {
                collect_inline_spans(child, next, label);
            }
        }
        NodeValue::Strikethrough => {
            let next = InlineStyle {
                strikethrough: true,
                ..style
            };
            for child in node.children() {
                collect_inline_spans(child, next, label);
            }
        }
        NodeValue::Link(_) => {
            let next = InlineStyle { link: true, ..style };
            for child in node.children() {
                collect_inline_spans(child, next, label);
            }
        }
        NodeValue::SoftBreak | NodeValue::LineBreak => {
            label.spans.push(InlineSpan::new(" ".to_string(), style));
        }
        _ => {
            for child in node.children() {
                collect_inline_spans(child, style, label);
            }
        }
    }
}

/// Trim the outer whitespace of a label and drop empty spans.
fn normalize_spans(spans: &mut Vec<InlineSpan>) {
    if let Some(first) = spans.first_mut() {
        *first = InlineSpan::new(first.text().trim_start().to_string(), first.style());
    }
    if let Some(last) = spans.last_mut() {
        *last = InlineSpan::new(last.text().trim_end().to_string(), last.style());
    }
    spans.retain(|span| !span.text().is_empty());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(tree: &MindMap, ids: &[NodeId]) -> Vec<String> {
        ids.iter().map(|id| tree.get(*id).unwrap().text()).collect()
    }

    #[test]
    fn test_parse_empty_document() {
        let outcome = parse("");
        assert_eq!(outcome.tree.len(), 1);
        assert!(outcome.tree.root_node().children().is_empty());
        assert_eq!(outcome.tree.root_node().text(), DEFAULT_ROOT_TITLE);
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn test_parse_heading_with_list() {
        let outcome = parse("# A\n- B\n- C");
        let tree = &outcome.tree;
        let root = tree.root_node();
        assert_eq!(root.text(), "A");
        assert_eq!(texts(tree, root.children()), vec!["B", "C"]);
        for child in root.children() {
            assert_eq!(tree.get(*child).unwrap().depth(), 1);
        }
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn test_parse_heading_hierarchy() {
        let md = "# Root\n\n## One\n\n### One.a\n\n## Two\n";
        let tree = parse(md).tree;
        let root = tree.root_node();
        assert_eq!(texts(&tree, root.children()), vec!["One", "Two"]);
        let one = tree.find_by_text("One").unwrap();
        assert_eq!(texts(&tree, tree.get(one).unwrap().children()), vec!["One.a"]);
    }

    #[test]
    fn test_list_under_heading_nests_below_it() {
        let md = "# Root\n## Section\n- item\n  - sub\n- other\n## Next\n";
        let tree = parse(md).tree;
        let section = tree.find_by_text("Section").unwrap();
        assert_eq!(
            texts(&tree, tree.get(section).unwrap().children()),
            vec!["item", "other"]
        );
        let item = tree.find_by_text("item").unwrap();
        assert_eq!(texts(&tree, tree.get(item).unwrap().children()), vec!["sub"]);
        let next = tree.find_by_text("Next").unwrap();
        assert_eq!(tree.get(next).unwrap().parent(), Some(NodeId::ROOT));
    }

    #[test]
    fn test_root_falls_back_to_front_matter_title() {
        let md = "---\ntitle: Biology\n---\n\n- Cells\n- Genetics\n";
        let tree = parse(md).tree;
        assert_eq!(tree.root_node().text(), "Biology");
        assert_eq!(tree.root_node().children().len(), 2);
    }

    #[test]
    fn test_root_falls_back_to_supplied_title() {
        let tree = parse_with_title("- one", Some("Stored title")).tree;
        assert_eq!(tree.root_node().text(), "Stored title");
    }

    #[test]
    fn test_fold_comment_marks_collapsed() {
        let md = "# Root\n## Folded <!-- markmap: fold -->\n- hidden\n";
        let tree = parse(md).tree;
        let folded = tree.find_by_text("Folded").unwrap();
        let node = tree.get(folded).unwrap();
        assert!(node.is_collapsed());
        assert_eq!(node.content(), "Folded");
        assert!(!tree.is_visible(tree.find_by_text("hidden").unwrap()));
    }

    #[test]
    fn test_level_three_headings_are_strong() {
        let tree = parse("# R\n## S\n### Bold me\n").tree;
        let id = tree.find_by_text("Bold me").unwrap();
        assert!(tree.get(id).unwrap().is_strong());
    }

    #[test]
    fn test_pseudo_heading_in_list_item_is_strong() {
        let tree = parse("# R\n- ### Key idea\n").tree;
        let id = tree.find_by_text("Key idea").unwrap();
        let node = tree.get(id).unwrap();
        assert!(node.is_strong());
        assert_eq!(node.kind(), NodeKind::ListItem);
    }

    #[test]
    fn test_inline_markup_is_label_content() {
        let tree = parse("# R\n- a **bold** and `code` [link](http://x)\n").tree;
        let id = tree.root_node().children()[0];
        let node = tree.get(id).unwrap();
        assert_eq!(node.text(), "a bold and code link");
        assert!(node.content().contains("**bold**"));
        assert!(node.spans().iter().any(|s| s.style().strong));
        assert!(node.spans().iter().any(|s| s.style().code));
        assert!(node.spans().iter().any(|s| s.style().link));
    }

    #[test]
    fn test_paragraph_becomes_literal_leaf_with_warning() {
        let outcome = parse("# R\n## S\n\nsome loose text\n");
        let tree = &outcome.tree;
        let section = tree.find_by_text("S").unwrap();
        let children = tree.get(section).unwrap().children();
        assert_eq!(children.len(), 1);
        let literal = tree.get(children[0]).unwrap();
        assert_eq!(literal.kind(), NodeKind::Literal);
        assert_eq!(literal.content(), "some loose text");
        assert_eq!(
            outcome.warnings,
            vec![ParseWarning {
                line: 4,
                kind: WarningKind::UnstructuredBlock { block: "paragraph" }
            }]
        );
    }

    #[test]
    fn test_code_block_literal_keeps_source() {
        let outcome = parse("# R\n```\nlet x = 1;\n```\n");
        let child = outcome.tree.root_node().children()[0];
        let node = outcome.tree.get(child).unwrap();
        assert_eq!(node.kind(), NodeKind::Literal);
        assert!(node.content().contains("let x = 1;"));
    }

    #[test]
    fn test_skipped_heading_level_warns_and_attaches() {
        let outcome = parse("# R\n#### Deep\n");
        let deep = outcome.tree.find_by_text("Deep").unwrap();
        assert_eq!(outcome.tree.get(deep).unwrap().parent(), Some(NodeId::ROOT));
        assert!(outcome.warnings.iter().any(|w| matches!(
            w.kind,
            WarningKind::SkippedHeadingLevel { from: 1, to: 4 }
        )));
    }

    #[test]
    fn test_extra_top_level_heading_goes_under_root() {
        let outcome = parse("# First\n# Second\n## Child\n");
        let tree = &outcome.tree;
        assert_eq!(tree.root_node().text(), "First");
        let second = tree.find_by_text("Second").unwrap();
        assert_eq!(tree.get(second).unwrap().parent(), Some(NodeId::ROOT));
        let child = tree.find_by_text("Child").unwrap();
        assert_eq!(tree.get(child).unwrap().parent(), Some(second));
        assert!(
            outcome
                .warnings
                .iter()
                .any(|w| w.kind == WarningKind::ExtraTopLevelHeading)
        );
    }

    #[test]
    fn test_empty_list_item_warns() {
        let outcome = parse("# R\n-\n- b\n");
        assert_eq!(outcome.tree.root_node().children().len(), 2);
        assert!(
            outcome
                .warnings
                .iter()
                .any(|w| w.kind == WarningKind::EmptyNode)
        );
    }

    #[test]
    fn test_thematic_break_and_comments_are_dropped() {
        let outcome = parse("# R\n\n---\n\n<!-- note -->\n\n- a\n");
        assert_eq!(outcome.tree.len(), 2);
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn test_parse_is_deterministic() {
        let md = "# R\n## A\n- x\n  - y\ntext\n## B\n- z\n";
        assert_eq!(parse(md), parse(md));
    }

    #[test]
    fn test_ids_follow_document_order() {
        let tree = parse("# R\n- a\n  - b\n- c\n").tree;
        let ids: Vec<String> = tree.nodes().map(|n| n.id().to_string()).collect();
        assert_eq!(ids, vec!["node-0", "node-1", "node-2", "node-3"]);
        assert_eq!(texts(&tree, &tree.descendants(NodeId::ROOT)), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_front_matter_value_strips_quotes() {
        assert_eq!(
            front_matter_value("---\ntitle: \"Quoted\"\n---\n", "title"),
            Some("Quoted".to_string())
        );
        assert_eq!(front_matter_value("---\nauthor: x\n---\n", "title"), None);
    }

    mod arbitrary_input {
        use super::*;
        use proptest::prelude::*;

        /// Markdown-ish fragments, including ones that tend to trip parsers.
        fn fragment() -> impl Strategy<Value = String> {
            prop_oneof![
                Just("# ".to_string()),
                Just("### ".to_string()),
                Just("####### ".to_string()),
                Just("- ".to_string()),
                Just("  - ".to_string()),
                Just("1. ".to_string()),
                Just("> ".to_string()),
                Just("> - ".to_string()),
                Just("> ## ".to_string()),
                Just("---\ntitle: ".to_string()),
                Just("```".to_string()),
                Just("| a | b |\n|---|---|\n".to_string()),
                Just(FOLD_COMMENT.to_string()),
                Just("\r\n".to_string()),
                Just("\n".to_string()),
                Just("\t".to_string()),
                Just("**".to_string()),
                "\\PC{0,12}",
            ]
        }

        fn source() -> impl Strategy<Value = String> {
            prop_oneof![
                proptest::collection::vec(fragment(), 0..40).prop_map(|parts| parts.concat()),
                any::<String>(),
            ]
        }

        proptest! {
            #[test]
            fn any_input_yields_a_single_rooted_tree(md in source()) {
                let outcome = parse(&md);
                let tree = &outcome.tree;

                let roots = tree.nodes().filter(|n| n.parent().is_none()).count();
                prop_assert_eq!(roots, 1);
                prop_assert_eq!(tree.root_node().depth(), 0);
                for node in tree.nodes() {
                    if let Some(parent) = node.parent() {
                        let parent = tree.get(parent).unwrap();
                        prop_assert_eq!(node.depth(), parent.depth() + 1);
                        prop_assert!(parent.children().contains(&node.id()));
                    }
                }
                for warning in &outcome.warnings {
                    prop_assert!(warning.line >= 1);
                }
            }

            #[test]
            fn parse_is_deterministic_for_any_input(md in source()) {
                prop_assert_eq!(parse(&md), parse(&md));
            }
        }
    }
}
