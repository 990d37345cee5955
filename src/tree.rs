//! The block-level syntax tree. Nodes live in a flat arena owned by `Tree`;
//! a node holds its children as indices into the arena and refers back to
//! its parent by index, so the per-line tree surgery (open/close, replace,
//! re-parent) never needs reference cycles.

use std::fmt;

/// Column alignment of a table column, read off the delimiter row.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TableAlign {
    None,
    Left,
    Center,
    Right,
}

/// How a list is marked.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ListKind {
    Bullet,
    Ordered,
    Task,
}

/// Marker data shared by a `List` and its `ListItem`s.
#[derive(Clone, Debug, PartialEq)]
pub struct ListData {
    pub kind: ListKind,
    /// Set at finalization from the blank-line bookkeeping.
    pub tight: bool,
    /// Marker byte for bullet and task lists.
    pub bullet_char: u8,
    /// First ordinal for ordered lists.
    pub start: u32,
    /// `.` or `)` for ordered lists.
    pub delimiter: u8,
    /// Content-start column relative to the marker.
    pub padding: usize,
    /// Column of the marker itself.
    pub marker_offset: usize,
    /// The raw marker bytes, e.g. `-` or `12.`.
    pub marker: Vec<u8>,
}

/// Fence bookkeeping for fenced code blocks.
#[derive(Clone, Debug, PartialEq)]
pub struct FenceData {
    pub fence_char: u8,
    pub fence_len: usize,
    /// Indentation of the opening fence; continuation lines may eat up to
    /// this many leading spaces.
    pub fence_offset: usize,
    /// Info string from the opening fence line, stored raw.
    pub info: Vec<u8>,
}

/// The block (and user-card inline) node kinds. Kind-specific attributes
/// ride on the variant.
#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    Document,
    Paragraph,
    Heading { level: usize, setext: bool },
    HeadingMarker,
    /// `fence` is `Some` for fenced blocks, `None` for indented ones.
    CodeBlock { fence: Option<FenceData> },
    HtmlBlock { html_type: u8 },
    Blockquote,
    BlockquoteMarker,
    List(ListData),
    ListItem { data: ListData, num: u32 },
    ThematicBreak,
    Table { aligns: Vec<TableAlign> },
    TableRow,
    TableCell,
    FootnotesDef,
    MathBlock { dollar_len: usize, offset: usize },
    /// The tag lets a renderer tell card references apart from links.
    UserCard { link_type: u8 },
    Text,
    LinkText,
    At,
    OpenParen,
    CloseParen,
    LinkDest,
}

impl NodeKind {
    /// Whether raw line remainders are appended to this node's tokens.
    pub fn accepts_lines(&self) -> bool {
        match self {
            NodeKind::Paragraph
            | NodeKind::CodeBlock { .. }
            | NodeKind::HtmlBlock { .. }
            | NodeKind::MathBlock { .. } => true,
            _ => false,
        }
    }

    /// Whether this node may hold other blocks.
    pub fn is_container(&self) -> bool {
        match self {
            NodeKind::Document
            | NodeKind::Blockquote
            | NodeKind::List(_)
            | NodeKind::ListItem { .. }
            | NodeKind::FootnotesDef
            | NodeKind::Table { .. }
            | NodeKind::TableRow => true,
            _ => false,
        }
    }

    /// Whether a block of kind `child` may be appended under this kind.
    /// Lists hold only items; items never nest directly in one another.
    pub fn can_contain(&self, child: &NodeKind) -> bool {
        let child_is_item = match child {
            NodeKind::ListItem { .. } => true,
            _ => false,
        };
        match self {
            NodeKind::Document
            | NodeKind::Blockquote
            | NodeKind::ListItem { .. }
            | NodeKind::FootnotesDef => !child_is_item,
            NodeKind::List(_) => child_is_item,
            _ => false,
        }
    }

    pub fn is_fenced_code(&self) -> bool {
        match self {
            NodeKind::CodeBlock { fence: Some(_) } => true,
            _ => false,
        }
    }

    /// Short name of the kind, for logging and diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Document => "document",
            NodeKind::Paragraph => "paragraph",
            NodeKind::Heading { .. } => "heading",
            NodeKind::HeadingMarker => "heading-marker",
            NodeKind::CodeBlock { fence: Some(_) } => "code-block-fenced",
            NodeKind::CodeBlock { fence: None } => "code-block-indented",
            NodeKind::HtmlBlock { .. } => "html-block",
            NodeKind::Blockquote => "blockquote",
            NodeKind::BlockquoteMarker => "blockquote-marker",
            NodeKind::List(_) => "list",
            NodeKind::ListItem { .. } => "list-item",
            NodeKind::ThematicBreak => "thematic-break",
            NodeKind::Table { .. } => "table",
            NodeKind::TableRow => "table-row",
            NodeKind::TableCell => "table-cell",
            NodeKind::FootnotesDef => "footnotes-def",
            NodeKind::MathBlock { .. } => "math-block",
            NodeKind::UserCard { .. } => "user-card",
            NodeKind::Text => "text",
            NodeKind::LinkText => "link-text",
            NodeKind::At => "at",
            NodeKind::OpenParen => "open-paren",
            NodeKind::CloseParen => "close-paren",
            NodeKind::LinkDest => "link-dest",
        }
    }
}

/// One vertex of the tree.
#[derive(Clone, Debug)]
pub struct Node {
    pub kind: NodeKind,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    pub closed: bool,
    pub last_line_blank: bool,
    /// Raw source content absorbed into this node.
    pub tokens: Vec<u8>,
}

impl Node {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: vec![],
            closed: false,
            last_line_blank: false,
            tokens: vec![],
        }
    }
}

/// The arena. Index 0 is always the Document root.
#[derive(Debug)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new(NodeKind::Document)],
        }
    }

    pub fn root(&self) -> usize {
        0
    }

    pub fn node(&self, id: usize) -> &Node {
        &self.nodes[id]
    }

    pub fn node_mut(&mut self, id: usize) -> &mut Node {
        &mut self.nodes[id]
    }

    /// Creates a detached node of `kind`.
    pub fn new_node(&mut self, kind: NodeKind) -> usize {
        self.nodes.push(Node::new(kind));
        self.nodes.len() - 1
    }

    /// Creates a node of `kind` and appends it under `parent`.
    pub fn add(&mut self, parent: usize, kind: NodeKind) -> usize {
        let id = self.new_node(kind);
        self.append_child(parent, id);
        id
    }

    pub fn append_child(&mut self, parent: usize, child: usize) {
        self.nodes[child].parent = Some(parent);
        self.nodes[parent].children.push(child);
    }

    pub fn parent(&self, id: usize) -> Option<usize> {
        self.nodes[id].parent
    }

    pub fn children(&self, id: usize) -> &[usize] {
        &self.nodes[id].children
    }

    pub fn last_child(&self, id: usize) -> Option<usize> {
        self.nodes[id].children.last().copied()
    }

    /// Previous sibling of `id`, if any.
    pub fn previous(&self, id: usize) -> Option<usize> {
        let parent = self.nodes[id].parent?;
        let siblings = &self.nodes[parent].children;
        let pos = siblings.iter().position(|&c| c == id)?;
        if pos > 0 {
            Some(siblings[pos - 1])
        } else {
            None
        }
    }

    /// Detaches `id` from its parent. The node stays in the arena but is
    /// no longer reachable from the root.
    pub fn unlink(&mut self, id: usize) {
        if let Some(parent) = self.nodes[id].parent {
            self.nodes[parent].children.retain(|&c| c != id);
            self.nodes[id].parent = None;
        }
    }

    /// Inserts the detached node `id` immediately after `sibling`.
    pub fn insert_after(&mut self, sibling: usize, id: usize) {
        if let Some(parent) = self.nodes[sibling].parent {
            let pos = self.nodes[parent]
                .children
                .iter()
                .position(|&c| c == sibling)
                .map(|p| p + 1)
                .unwrap_or_else(|| self.nodes[parent].children.len());
            self.nodes[parent].children.insert(pos, id);
            self.nodes[id].parent = Some(parent);
        }
    }

    /// True if no node reachable from the root is still open.
    pub fn all_closed(&self) -> bool {
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            if !self.nodes[id].closed {
                return false;
            }
            stack.extend(self.nodes[id].children.iter().copied());
        }
        true
    }

    fn fmt_node(&self, f: &mut fmt::Formatter, id: usize, depth: usize) -> fmt::Result {
        let node = &self.nodes[id];
        for _ in 0..depth {
            write!(f, "  ")?;
        }
        write!(f, "{}", label(&node.kind))?;
        if !node.tokens.is_empty() {
            write!(f, " \"{}\"", escape_tokens(&node.tokens))?;
        }
        writeln!(f)?;
        for &child in &node.children {
            self.fmt_node(f, child, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.fmt_node(f, self.root(), 0)
    }
}

fn label(kind: &NodeKind) -> String {
    match kind {
        NodeKind::Document => "document".to_string(),
        NodeKind::Paragraph => "paragraph".to_string(),
        NodeKind::Heading { level, setext } => {
            if *setext {
                format!("heading level={} setext", level)
            } else {
                format!("heading level={}", level)
            }
        }
        NodeKind::HeadingMarker => "heading-marker".to_string(),
        NodeKind::CodeBlock { fence: Some(fence) } => {
            if fence.info.is_empty() {
                "code-block fenced".to_string()
            } else {
                format!("code-block fenced info=\"{}\"", escape_tokens(&fence.info))
            }
        }
        NodeKind::CodeBlock { fence: None } => "code-block indented".to_string(),
        NodeKind::HtmlBlock { html_type } => format!("html-block type={}", html_type),
        NodeKind::Blockquote => "blockquote".to_string(),
        NodeKind::BlockquoteMarker => "blockquote-marker".to_string(),
        NodeKind::List(data) => {
            let kind = match data.kind {
                ListKind::Bullet => "bullet",
                ListKind::Ordered => "ordered",
                ListKind::Task => "task",
            };
            format!("list {} tight={}", kind, data.tight)
        }
        NodeKind::ListItem { .. } => "list-item".to_string(),
        NodeKind::ThematicBreak => "thematic-break".to_string(),
        NodeKind::Table { aligns } => format!("table cols={}", aligns.len()),
        NodeKind::TableRow => "table-row".to_string(),
        NodeKind::TableCell => "table-cell".to_string(),
        NodeKind::FootnotesDef => "footnotes-def".to_string(),
        NodeKind::MathBlock { .. } => "math-block".to_string(),
        NodeKind::UserCard { .. } => "user-card".to_string(),
        NodeKind::Text => "text".to_string(),
        NodeKind::LinkText => "link-text".to_string(),
        NodeKind::At => "at".to_string(),
        NodeKind::OpenParen => "open-paren".to_string(),
        NodeKind::CloseParen => "close-paren".to_string(),
        NodeKind::LinkDest => "link-dest".to_string(),
    }
}

fn escape_tokens(tokens: &[u8]) -> String {
    let mut out = String::new();
    for chunk in String::from_utf8_lossy(tokens).chars() {
        match chunk {
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            c => out.push(c),
        }
    }
    out
}
