//! The block parser. A `Parser` owns the tree under construction plus the
//! per-line cursor state (offset, column, blank/indent flags) and drives a
//! two-phase algorithm for every input line: first each open container on
//! the path down to the tip gets a chance to continue, then the block-start
//! recognizers may open new blocks, and finally whatever remains of the
//! line is absorbed into the tip.
//!
//! Keeping the nodes in a flat list and tracking the open path by index
//! makes it easy to find the current tip and to close intermediate blocks
//! without passing mutable references around.

use crate::link_ref::{self, LinkRefDef};
use crate::starts::{self, BlockStart};
use crate::table;
use crate::tree::{NodeKind, Tree};
use std::collections::HashMap;

/// Indent threshold for code blocks, in columns.
pub(crate) const CODE_INDENT: usize = 4;

/// Parser configuration. The default is strict mode: every extension off.
#[derive(Clone, Debug, Default)]
pub struct Options {
    /// Enables `[^label]:` footnote definitions.
    pub footnotes: bool,
    /// Enables the GFM table transformation of paragraphs.
    pub gfm_table: bool,
    /// WYSIWYG editor mode: normalizes CJK list markers and refuses empty
    /// blockquote markers.
    pub vditor_wysiwyg: bool,
    pub vditor_ir: bool,
    pub vditor_sv: bool,
    pub protyle_wysiwyg: bool,
}

impl Options {
    /// True if any of the editor integration modes is active.
    pub fn editor_mode(&self) -> bool {
        self.vditor_wysiwyg || self.vditor_ir || self.vditor_sv || self.protyle_wysiwyg
    }
}

/// Everything a finished parse produces: the block tree, the link
/// reference definitions keyed by normalized label, and the footnote
/// definition nodes in insertion order.
#[derive(Debug)]
pub struct Parsed {
    pub tree: Tree,
    pub link_ref_defs: HashMap<String, LinkRefDef>,
    pub footnote_defs: Vec<usize>,
}

/// Result of a container's continuation test against the current line.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum Continue {
    Match,
    NoMatch,
    /// The container closed itself and consumed the line (closing fence).
    Terminate,
}

pub struct Parser {
    pub(crate) tree: Tree,
    pub(crate) options: Options,
    pub(crate) line: Vec<u8>,
    pub(crate) line_len: usize,
    pub(crate) offset: usize,
    pub(crate) column: usize,
    pub(crate) next_nonspace: usize,
    pub(crate) next_nonspace_column: usize,
    pub(crate) indent: usize,
    pub(crate) indented: bool,
    pub(crate) blank: bool,
    pub(crate) partially_consumed_tab: bool,
    pub(crate) all_closed: bool,
    pub(crate) tip: usize,
    pub(crate) old_tip: usize,
    pub(crate) last_matched_container: usize,
    pub(crate) line_num: usize,
    pub(crate) link_ref_defs: HashMap<String, LinkRefDef>,
    pub(crate) footnote_defs: Vec<usize>,
}

impl Parser {
    pub fn new(options: Options) -> Self {
        let tree = Tree::new();
        let root = tree.root();
        Self {
            tree,
            options,
            line: vec![],
            line_len: 0,
            offset: 0,
            column: 0,
            next_nonspace: 0,
            next_nonspace_column: 0,
            indent: 0,
            indented: false,
            blank: false,
            partially_consumed_tab: false,
            all_closed: true,
            tip: root,
            old_tip: root,
            last_matched_container: root,
            line_num: 0,
            link_ref_defs: HashMap::new(),
            footnote_defs: vec![],
        }
    }

    /// Feeds one input line, without its terminating newline.
    pub fn parse_line(&mut self, line: &[u8]) {
        if self.options.vditor_wysiwyg {
            if let Some(rewritten) = normalize_cjk_list_marker(line) {
                self.incorporate_line(&rewritten);
                return;
            }
        }
        self.incorporate_line(line);
    }

    /// Signals end of input, finalizes every open block and hands back
    /// the parse outputs.
    pub fn finish(mut self) -> Parsed {
        loop {
            let tip = self.tip;
            self.finalize(tip);
            if tip == self.tree.root() {
                break;
            }
        }
        log::debug!("parse finished after {} lines", self.line_num);
        Parsed {
            tree: self.tree,
            link_ref_defs: self.link_ref_defs,
            footnote_defs: self.footnote_defs,
        }
    }

    fn incorporate_line(&mut self, line: &[u8]) {
        self.old_tip = self.tip;
        self.offset = 0;
        self.column = 0;
        self.blank = false;
        self.partially_consumed_tab = false;
        self.line_num += 1;
        self.line.clear();
        self.line.extend_from_slice(line);
        self.line_len = self.line.len();
        log::trace!("line {}: {:?}", self.line_num, String::from_utf8_lossy(line));

        // Phase 1: let every open container on the path to the tip try to
        // continue against this line.
        let mut all_matched = true;
        let mut container = self.tree.root();
        loop {
            let last_child = match self.tree.last_child(container) {
                Some(c) if !self.tree.node(c).closed => c,
                _ => break,
            };
            container = last_child;
            self.find_next_nonspace();
            match self.block_continue(container) {
                Continue::Match => {}
                Continue::NoMatch => all_matched = false,
                Continue::Terminate => return,
            }
            if !all_matched {
                container = self.tree.parent(container).unwrap_or_else(|| self.tree.root());
                break;
            }
        }

        self.all_closed = container == self.old_tip;
        self.last_matched_container = container;

        // Phase 2: try to open new blocks, unless the matched container is
        // a line-accepting leaf other than a paragraph.
        let mut matched_leaf = {
            let kind = &self.tree.node(container).kind;
            match kind {
                NodeKind::Paragraph => false,
                k => k.accepts_lines(),
            }
        };
        while !matched_leaf {
            self.find_next_nonspace();

            // Nothing can start unless the first non-space byte is one of
            // the potential marker bytes or the line is code-indented.
            if !self.indented && !is_potential_marker(self.line.get(self.next_nonspace).copied()) {
                self.advance_next_nonspace();
                break;
            }

            let mut fired = BlockStart::None;
            for start in starts::BLOCK_STARTS.iter() {
                let res = start(self, container);
                if res != BlockStart::None {
                    fired = res;
                    break;
                }
            }
            match fired {
                BlockStart::Container => container = self.tip,
                BlockStart::Leaf => {
                    container = self.tip;
                    matched_leaf = true;
                }
                BlockStart::None => {
                    self.advance_next_nonspace();
                    break;
                }
            }
        }

        // Phase 3: absorb the rest of the line.
        let tip_is_paragraph = match self.tree.node(self.tip).kind {
            NodeKind::Paragraph => true,
            _ => false,
        };
        if !self.all_closed && !self.blank && tip_is_paragraph {
            // Lazy continuation of the tip paragraph.
            self.add_line();
        } else {
            self.close_unmatched_blocks();

            if self.blank {
                if let Some(last) = self.tree.last_child(container) {
                    self.tree.node_mut(last).last_line_blank = true;
                }
            }

            let container_kind = self.tree.node(container).kind.clone();
            let container_empty = self.tree.children(container).is_empty();
            // Blank-line bookkeeping feeding the tight/loose decision.
            // Blockquote lines always carry at least a marker, fences and
            // math keep their interior out of the decision, and a blank on
            // a still-empty list item does not count either.
            let last_line_blank = self.blank
                && !(match &container_kind {
                    NodeKind::FootnotesDef | NodeKind::Blockquote | NodeKind::MathBlock { .. } => {
                        true
                    }
                    NodeKind::CodeBlock { fence: Some(_) } => true,
                    NodeKind::ListItem { .. } => container_empty,
                    _ => false,
                });
            let mut cursor = Some(container);
            while let Some(id) = cursor {
                self.tree.node_mut(id).last_line_blank = last_line_blank;
                cursor = self.tree.parent(id);
            }

            if container_kind.accepts_lines() {
                self.add_line();
                if let NodeKind::HtmlBlock { html_type } = &container_kind {
                    let html_type = *html_type;
                    if html_type >= 1 && html_type <= 5 {
                        let close = {
                            let rest = &self.line[self.offset.min(self.line_len)..];
                            starts::html_block_end_matches(rest, html_type)
                        };
                        if close {
                            self.finalize(container);
                        }
                    }
                }
            } else if self.offset < self.line_len && !self.blank {
                self.add_child(NodeKind::Paragraph);
                self.advance_next_nonspace();
                self.add_line();
            }
        }
    }

    // ---- cursor movement ------------------------------------------------

    pub(crate) fn peek(&self, i: usize) -> Option<u8> {
        self.line.get(i).copied()
    }

    pub(crate) fn find_next_nonspace(&mut self) {
        let mut i = self.offset;
        let mut cols = self.column;
        loop {
            match self.line.get(i) {
                Some(b' ') => {
                    i += 1;
                    cols += 1;
                }
                Some(b'\t') => {
                    i += 1;
                    cols += 4 - (cols % 4);
                }
                _ => break,
            }
        }
        self.blank = i >= self.line_len;
        self.next_nonspace = i;
        self.next_nonspace_column = cols;
        self.indent = cols - self.column;
        self.indented = self.indent >= CODE_INDENT;
    }

    /// Advances over `count` bytes, or `count` columns when `columns` is
    /// set, expanding tabs at 4-column stops. A tab only partially eaten
    /// by a column advance leaves `partially_consumed_tab` set.
    pub(crate) fn advance_offset(&mut self, count: usize, columns: bool) {
        let mut count = count;
        while count > 0 {
            let c = match self.line.get(self.offset) {
                Some(&c) => c,
                None => break,
            };
            if c == b'\t' {
                let chars_to_tab = 4 - (self.column % 4);
                if columns {
                    self.partially_consumed_tab = chars_to_tab > count;
                    let advance = if chars_to_tab > count { count } else { chars_to_tab };
                    self.column += advance;
                    if !self.partially_consumed_tab {
                        self.offset += 1;
                    }
                    count -= advance;
                } else {
                    self.partially_consumed_tab = false;
                    self.column += chars_to_tab;
                    self.offset += 1;
                    count -= 1;
                }
            } else {
                self.partially_consumed_tab = false;
                self.offset += 1;
                self.column += 1;
                count -= 1;
            }
        }
    }

    pub(crate) fn advance_next_nonspace(&mut self) {
        self.offset = self.next_nonspace;
        self.column = self.next_nonspace_column;
        self.partially_consumed_tab = false;
    }

    /// Length of the run of `ch` starting at `start`.
    pub(crate) fn run_length(&self, start: usize, ch: u8) -> usize {
        self.line[start.min(self.line_len)..]
            .iter()
            .take_while(|&&b| b == ch)
            .count()
    }

    /// True if everything from `start` to the end of the line is spaces
    /// or tabs.
    pub(crate) fn rest_is_blank(&self, start: usize) -> bool {
        self.line[start.min(self.line_len)..]
            .iter()
            .all(|&b| is_space_or_tab(b))
    }

    // ---- tree building --------------------------------------------------

    /// Appends the line remainder to the tip's tokens, reconstructing the
    /// newline and filling out a partially consumed tab with spaces.
    pub(crate) fn add_line(&mut self) {
        if self.partially_consumed_tab {
            self.offset += 1; // skip over the tab
            let chars_to_tab = 4 - (self.column % 4);
            for _ in 0..chars_to_tab {
                self.tree.node_mut(self.tip).tokens.push(b' ');
            }
        }
        let from = self.offset.min(self.line_len);
        self.tree
            .node_mut(self.tip)
            .tokens
            .extend_from_slice(&self.line[from..]);
        self.tree.node_mut(self.tip).tokens.push(b'\n');
    }

    /// Opens a new block under the tip, finalizing tips that cannot hold
    /// it, and makes the new block the tip.
    pub(crate) fn add_child(&mut self, kind: NodeKind) -> usize {
        while !self.tree.node(self.tip).kind.can_contain(&kind) {
            let tip = self.tip;
            self.finalize(tip);
            if tip == self.tree.root() {
                break;
            }
        }
        log::debug!("line {}: open {}", self.line_num, kind.name());
        let id = self.tree.add(self.tip, kind);
        self.tip = id;
        id
    }

    /// Appends an already-closed marker node (blockquote `>`, ATX `#`
    /// run) under `parent` without touching the tip.
    pub(crate) fn add_marker(&mut self, parent: usize, kind: NodeKind, tokens: &[u8]) {
        let id = self.tree.add(parent, kind);
        self.tree.node_mut(id).tokens = tokens.to_vec();
        self.tree.node_mut(id).closed = true;
    }

    /// Finalizes every open block below the last matched container.
    pub(crate) fn close_unmatched_blocks(&mut self) {
        if !self.all_closed {
            while self.old_tip != self.last_matched_container {
                let parent = self.tree.parent(self.old_tip);
                self.finalize(self.old_tip);
                match parent {
                    Some(p) => self.old_tip = p,
                    None => break,
                }
            }
            self.all_closed = true;
        }
    }

    /// Closes `id`, runs its kind-specific finalization and moves the tip
    /// to its parent.
    pub(crate) fn finalize(&mut self, id: usize) {
        let parent = self.tree.parent(id);
        self.tree.node_mut(id).closed = true;
        let kind = self.tree.node(id).kind.clone();
        match kind {
            NodeKind::Paragraph => self.finalize_paragraph(id),
            NodeKind::CodeBlock { fence } => self.finalize_code_block(id, fence.is_some()),
            NodeKind::MathBlock { .. } => self.finalize_math_block(id),
            NodeKind::List(_) => self.finalize_list(id),
            _ => {}
        }
        self.tip = parent.unwrap_or(id);
    }

    fn finalize_paragraph(&mut self, id: usize) {
        let mut tokens = std::mem::replace(&mut self.tree.node_mut(id).tokens, vec![]);
        while tokens.first() == Some(&b'[') {
            match link_ref::parse_link_ref_def(&mut self.link_ref_defs, &tokens) {
                Some(rest) => tokens = rest,
                None => break,
            }
        }
        if tokens.last() == Some(&b'\n') {
            tokens.pop();
        }
        if self.options.gfm_table {
            if let Some(scan) = table::scan(&tokens) {
                table::apply(&mut self.tree, id, scan);
                return;
            }
        }
        if is_blank(&tokens) {
            self.tree.unlink(id);
        } else {
            self.tree.node_mut(id).tokens = tokens;
        }
    }

    fn finalize_code_block(&mut self, id: usize, fenced: bool) {
        let node = self.tree.node_mut(id);
        if fenced {
            // The first absorbed line is the info-string line, not body.
            match node.tokens.iter().position(|&b| b == b'\n') {
                Some(pos) => {
                    node.tokens.drain(..=pos);
                }
                None => node.tokens.clear(),
            }
        } else {
            trim_trailing_blank_lines(&mut node.tokens);
        }
    }

    fn finalize_math_block(&mut self, id: usize) {
        // A bare `$$` opener leaves an empty first line behind.
        let node = self.tree.node_mut(id);
        if node.tokens.first() == Some(&b'\n') {
            node.tokens.remove(0);
        }
    }

    fn finalize_list(&mut self, id: usize) {
        let items = self.tree.children(id).to_vec();
        let mut tight = true;
        'outer: for (i, &item) in items.iter().enumerate() {
            let has_next_item = i + 1 < items.len();
            if ends_with_blank_line(&self.tree, item) && has_next_item {
                tight = false;
                break;
            }
            let subs = self.tree.children(item).to_vec();
            for (j, &sub) in subs.iter().enumerate() {
                let has_next = j + 1 < subs.len();
                if ends_with_blank_line(&self.tree, sub) && (has_next_item || has_next) {
                    tight = false;
                    break 'outer;
                }
            }
        }
        if let NodeKind::List(data) = &mut self.tree.node_mut(id).kind {
            data.tight = tight;
        }
        for &item in &items {
            if let NodeKind::ListItem { data, .. } = &mut self.tree.node_mut(item).kind {
                data.tight = tight;
            }
        }
    }

    // ---- continuation tests ---------------------------------------------

    fn block_continue(&mut self, id: usize) -> Continue {
        let kind = self.tree.node(id).kind.clone();
        match kind {
            NodeKind::Document | NodeKind::List(_) | NodeKind::Table { .. } => Continue::Match,
            NodeKind::Blockquote => self.blockquote_continue(),
            NodeKind::ListItem { data, .. } => {
                let empty = self.tree.children(id).is_empty();
                self.list_item_continue(empty, data.marker_offset + data.padding)
            }
            NodeKind::Paragraph => {
                if self.blank {
                    Continue::NoMatch
                } else {
                    Continue::Match
                }
            }
            NodeKind::CodeBlock { fence: Some(fence) } => {
                self.fence_continue(id, fence.fence_char, fence.fence_len, fence.fence_offset)
            }
            NodeKind::CodeBlock { fence: None } => self.indented_code_continue(),
            NodeKind::MathBlock { dollar_len, offset } => {
                self.fence_continue(id, b'$', dollar_len, offset)
            }
            NodeKind::HtmlBlock { html_type } => {
                if self.blank && (html_type == 6 || html_type == 7) {
                    Continue::NoMatch
                } else {
                    Continue::Match
                }
            }
            NodeKind::FootnotesDef => self.footnotes_def_continue(),
            _ => Continue::NoMatch,
        }
    }

    fn blockquote_continue(&mut self) -> Continue {
        if !self.indented && self.peek(self.next_nonspace) == Some(b'>') {
            self.advance_next_nonspace();
            self.advance_offset(1, false);
            match self.peek(self.offset) {
                Some(b' ') | Some(b'\t') => self.advance_offset(1, true),
                _ => {}
            }
            Continue::Match
        } else {
            Continue::NoMatch
        }
    }

    fn list_item_continue(&mut self, item_empty: bool, content_indent: usize) -> Continue {
        if self.blank {
            if item_empty {
                // A blank right after the marker ends the empty item.
                return Continue::NoMatch;
            }
            self.advance_next_nonspace();
            Continue::Match
        } else if self.indent >= content_indent {
            self.advance_offset(content_indent, true);
            Continue::Match
        } else {
            Continue::NoMatch
        }
    }

    /// Shared continuation for fenced code and math blocks: a matching,
    /// non-indented closing fence terminates the line; otherwise up to
    /// `fence_offset` leading spaces are eaten.
    fn fence_continue(
        &mut self,
        id: usize,
        fence_char: u8,
        fence_len: usize,
        fence_offset: usize,
    ) -> Continue {
        if !self.indented && self.peek(self.next_nonspace) == Some(fence_char) {
            let run = self.run_length(self.next_nonspace, fence_char);
            if run >= fence_len && self.rest_is_blank(self.next_nonspace + run) {
                self.finalize(id);
                return Continue::Terminate;
            }
        }
        let mut i = fence_offset;
        while i > 0 {
            match self.peek(self.offset) {
                Some(b' ') | Some(b'\t') => self.advance_offset(1, true),
                _ => break,
            }
            i -= 1;
        }
        Continue::Match
    }

    fn indented_code_continue(&mut self) -> Continue {
        if self.indent >= CODE_INDENT {
            self.advance_offset(CODE_INDENT, true);
            Continue::Match
        } else if self.blank {
            self.advance_next_nonspace();
            Continue::Match
        } else {
            Continue::NoMatch
        }
    }

    fn footnotes_def_continue(&mut self) -> Continue {
        if self.blank {
            self.advance_next_nonspace();
            Continue::Match
        } else if self.indent >= CODE_INDENT {
            self.advance_offset(CODE_INDENT, true);
            Continue::Match
        } else {
            Continue::NoMatch
        }
    }

    // ---- footnotes -------------------------------------------------------

    /// Finds a registered footnote definition by lower-cased label.
    pub(crate) fn find_footnotes_def(&self, label_lower: &[u8]) -> Option<usize> {
        self.footnote_defs
            .iter()
            .copied()
            .find(|&id| self.tree.node(id).tokens.to_ascii_lowercase() == label_lower)
    }
}

/// WYSIWYG list-marker normalization: a leading digit followed by CJK
/// `、` or `）` becomes `digit. `.
fn normalize_cjk_list_marker(line: &[u8]) -> Option<Vec<u8>> {
    let s = std::str::from_utf8(line).ok()?;
    if s.chars().count() <= 4 {
        return None;
    }
    let mut chars = s.chars();
    let first = chars.next()?;
    let second = chars.next()?;
    if !first.is_ascii_digit() || (second != '、' && second != '）') {
        return None;
    }
    let rest: String = chars.collect();
    Some(format!("{}. {}", first, rest).into_bytes())
}

fn is_potential_marker(b: Option<u8>) -> bool {
    match b {
        Some(c) => match c {
            b'#' | b'`' | b'~' | b'*' | b'+' | b'_' | b'=' | b'<' | b'>' | b'-' | b'$' | b'[' => {
                true
            }
            c => c.is_ascii_digit(),
        },
        None => false,
    }
}

pub(crate) fn is_space_or_tab(c: u8) -> bool {
    c == b' ' || c == b'\t'
}

pub(crate) fn is_blank(tokens: &[u8]) -> bool {
    tokens
        .iter()
        .all(|&b| b == b' ' || b == b'\t' || b == b'\n')
}

fn trim_trailing_blank_lines(tokens: &mut Vec<u8>) {
    let lines: Vec<Vec<u8>> = tokens.split(|&b| b == b'\n').map(|l| l.to_vec()).collect();
    let mut n = lines.len();
    if n > 0 && lines[n - 1].is_empty() {
        n -= 1; // artifact of the trailing newline
    }
    while n > 0 && lines[n - 1].iter().all(|&b| is_space_or_tab(b)) {
        n -= 1;
    }
    let mut out = Vec::new();
    for line in &lines[..n] {
        out.extend_from_slice(line);
        out.push(b'\n');
    }
    *tokens = out;
}

/// Walks down through the last children of lists and items looking for a
/// trailing blank line; feeds the tight/loose decision.
fn ends_with_blank_line(tree: &Tree, mut id: usize) -> bool {
    loop {
        if tree.node(id).last_line_blank {
            return true;
        }
        match &tree.node(id).kind {
            NodeKind::List(_) | NodeKind::ListItem { .. } => match tree.last_child(id) {
                Some(c) => id = c,
                None => return false,
            },
            _ => return false,
        }
    }
}
