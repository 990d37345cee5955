//! The block-start recognizers, tried in a fixed priority order on every
//! line that might open a new block. A recognizer either declines, opens a
//! container (iteration continues so nested blocks can open on the same
//! line) or opens a leaf (iteration stops).
//!
//! The ordering is load-bearing: it encodes the grammar's disambiguation
//! rules, e.g. a `-` underline converts a paragraph into a setext heading
//! before the thematic-break and list recognizers get a look at it.

use crate::parser::{is_space_or_tab, Parser, CODE_INDENT};
use crate::tree::{FenceData, ListData, ListKind, NodeKind};
use regex::bytes::Regex;

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum BlockStart {
    None,
    Container,
    Leaf,
}

pub(crate) type BlockStartFn = fn(&mut Parser, usize) -> BlockStart;

pub(crate) const BLOCK_STARTS: [BlockStartFn; 10] = [
    footnotes_def_start,
    blockquote_start,
    atx_heading_start,
    fenced_code_start,
    setext_heading_start,
    html_block_start,
    thematic_break_start,
    list_item_start,
    math_block_start,
    indented_code_start,
];

// ---- 1. footnote definitions --------------------------------------------

fn footnotes_def_start(p: &mut Parser, _container: usize) -> BlockStart {
    if !p.options.footnotes || p.indented {
        return BlockStart::None;
    }
    if p.peek(p.next_nonspace) != Some(b'[') || p.peek(p.next_nonspace + 1) != Some(b'^') {
        return BlockStart::None;
    }
    let mut label = vec![b'^'];
    let mut i = p.next_nonspace + 2;
    loop {
        match p.peek(i) {
            None | Some(b' ') | Some(b'\t') => return BlockStart::None,
            Some(b']') => break,
            Some(c) => {
                label.push(c);
                i += 1;
            }
        }
    }
    if p.peek(i + 1) != Some(b':') {
        return BlockStart::None;
    }

    p.close_unmatched_blocks();
    p.advance_next_nonspace();
    p.advance_offset(label.len() + 3, true); // `[`, label, `]:`
    let def = p.add_child(NodeKind::FootnotesDef);
    p.tree.node_mut(def).tokens = label.clone();
    let lower = label.to_ascii_lowercase();
    if p.find_footnotes_def(&lower).is_none() {
        p.footnote_defs.push(def);
    }
    BlockStart::Container
}

// ---- 2. blockquotes ------------------------------------------------------

lazy_static! {
    static ref BLOCKQUOTE_RE: Regex = Regex::new(r"^>[ \t]?").unwrap();
}

fn blockquote_start(p: &mut Parser, _container: usize) -> BlockStart {
    if p.indented {
        return BlockStart::None;
    }
    let markers: Vec<u8> = {
        let tail = &p.line[p.next_nonspace..];
        match BLOCKQUOTE_RE.find(tail) {
            Some(m) => tail[..m.end()].to_vec(),
            None => return BlockStart::None,
        }
    };
    if p.options.vditor_wysiwyg {
        // WYSIWYG mode refuses a `>` with nothing after it
        let empty = p.rest_is_blank(p.next_nonspace + 1);
        if empty {
            return BlockStart::None;
        }
    }
    p.advance_next_nonspace();
    p.advance_offset(1, false);
    if markers.len() == 2 {
        p.advance_offset(1, true);
    }
    p.close_unmatched_blocks();
    let bq = p.add_child(NodeKind::Blockquote);
    p.add_marker(bq, NodeKind::BlockquoteMarker, &markers);
    BlockStart::Container
}

// ---- 3. ATX headings -----------------------------------------------------

fn atx_heading_start(p: &mut Parser, _container: usize) -> BlockStart {
    if p.indented {
        return BlockStart::None;
    }
    let parsed = parse_atx_heading(&p.line[p.next_nonspace..]);
    let (level, markers, content) = match parsed {
        Some(t) => t,
        None => return BlockStart::None,
    };
    p.advance_next_nonspace();
    p.close_unmatched_blocks();
    let heading = p.add_child(NodeKind::Heading {
        level,
        setext: false,
    });
    p.tree.node_mut(heading).tokens = content;
    p.add_marker(heading, NodeKind::HeadingMarker, &markers);
    let rest = p.line_len - p.offset.min(p.line_len);
    p.advance_offset(rest, false);
    BlockStart::Leaf
}

lazy_static! {
    static ref ATX_RE: Regex = Regex::new(r"^(#{1,6})([ \t]+(.*?))?([ \t]+#*)?[ \t]*$").unwrap();
}

/// Parses `tail` as an ATX heading line: 1–6 `#` followed by whitespace or
/// end of line, with an optional closing `#` run. Returns the level, the
/// opening marker run and the heading text.
fn parse_atx_heading(tail: &[u8]) -> Option<(usize, Vec<u8>, Vec<u8>)> {
    let cap = ATX_RE.captures(tail)?;
    let markers = cap.get(1)?.as_bytes().to_vec();
    let level = markers.len();
    let content = match cap.get(3) {
        Some(m) => {
            // for `### ###` the second run lands in the capture; trimming
            // leading crosshatches turns it back into a blank heading
            let mut text = m.as_bytes();
            while text.first() == Some(&b'#') {
                text = &text[1..];
            }
            trim_bytes(text).to_vec()
        }
        None => vec![],
    };
    Some((level, markers, content))
}

// ---- 4. fenced code blocks -----------------------------------------------

fn fenced_code_start(p: &mut Parser, _container: usize) -> BlockStart {
    if p.indented {
        return BlockStart::None;
    }
    let fence = match parse_code_fence(&p.line[p.next_nonspace..], p.indent) {
        Some(f) => f,
        None => return BlockStart::None,
    };
    let fence_len = fence.fence_len;
    p.close_unmatched_blocks();
    p.add_child(NodeKind::CodeBlock { fence: Some(fence) });
    p.advance_next_nonspace();
    p.advance_offset(fence_len, false);
    BlockStart::Leaf
}

lazy_static! {
    static ref FENCE_OPEN_RE: Regex = Regex::new(r"^(`{3,}|~{3,})(.*)$").unwrap();
}

fn parse_code_fence(tail: &[u8], indent: usize) -> Option<FenceData> {
    let cap = FENCE_OPEN_RE.captures(tail)?;
    let fence = cap.get(1)?.as_bytes();
    let rest = cap.get(2).map(|m| m.as_bytes()).unwrap_or(b"");
    let c = fence[0];
    // a backtick fence cannot carry backticks on its opening line
    if c == b'`' && rest.contains(&b'`') {
        return None;
    }
    Some(FenceData {
        fence_char: c,
        fence_len: fence.len(),
        fence_offset: indent,
        info: trim_bytes(rest).to_vec(),
    })
}

// ---- 5. setext headings (and the table tie-break) ------------------------

fn setext_heading_start(p: &mut Parser, container: usize) -> BlockStart {
    if p.indented {
        return BlockStart::None;
    }
    let container_is_paragraph = match p.tree.node(container).kind {
        NodeKind::Paragraph => true,
        _ => false,
    };
    if !container_is_paragraph {
        return BlockStart::None;
    }
    let level = match parse_setext_underline(&p.line[p.next_nonspace..]) {
        Some(l) => l,
        None => return BlockStart::None,
    };

    if p.options.gfm_table {
        // The paragraph plus an underline can form a one-column table
        // (e.g. `0` over `-:`); the table wins the tie, and the recognizer
        // declines so the underline is still available to later
        // recognizers.
        let scan = crate::table::scan(&p.tree.node(container).tokens);
        if let Some(scan) = scan {
            crate::table::apply(&mut p.tree, container, scan);
            return BlockStart::None;
        }
    }

    p.close_unmatched_blocks();
    let mut tokens = std::mem::replace(&mut p.tree.node_mut(container).tokens, vec![]);
    while tokens.first() == Some(&b'[') {
        match crate::link_ref::parse_link_ref_def(&mut p.link_ref_defs, &tokens) {
            Some(rest) => tokens = rest,
            None => break,
        }
    }
    let value = trim_all(&tokens);
    if value.is_empty() {
        p.tree.node_mut(container).tokens = tokens;
        return BlockStart::None;
    }
    let heading = p.tree.new_node(NodeKind::Heading {
        level,
        setext: true,
    });
    p.tree.node_mut(heading).tokens = value;
    p.tree.insert_after(container, heading);
    p.tree.unlink(container);
    p.tree.node_mut(container).closed = true;
    p.tip = heading;
    let rest = p.line_len - p.offset.min(p.line_len);
    p.advance_offset(rest, false);
    BlockStart::Leaf
}

lazy_static! {
    static ref SETEXT_RE: Regex = Regex::new(r"^(=+|-+)[ \t]*$").unwrap();
}

fn parse_setext_underline(tail: &[u8]) -> Option<usize> {
    let cap = SETEXT_RE.captures(tail)?;
    if cap.get(1)?.as_bytes().first() == Some(&b'=') {
        Some(1)
    } else {
        Some(2)
    }
}

// ---- 6. HTML blocks ------------------------------------------------------

lazy_static! {
    static ref HTML_OPEN_1: Regex = Regex::new(r"(?i)^<(script|pre|style)([ \t>]|$)").unwrap();
    static ref HTML_OPEN_4: Regex = Regex::new(r"^<![A-Z]").unwrap();
    static ref HTML_OPEN_6: Regex = Regex::new(
        r"(?i)^</?(address|article|aside|base|basefont|blockquote|body|caption|center|col|colgroup|dd|details|dialog|dir|div|dl|dt|fieldset|figcaption|figure|footer|form|frame|frameset|h[1-6]|head|header|hr|html|iframe|legend|li|link|main|menu|menuitem|nav|noframes|ol|optgroup|option|p|param|section|source|summary|table|tbody|td|tfoot|th|thead|title|tr|track|ul)([ \t]|/?>|$)"
    )
    .unwrap();
    static ref HTML_OPEN_7_OPEN: Regex =
        Regex::new(r"^<[A-Za-z][A-Za-z0-9-]*([ \t][^<>]*)?/?>[ \t]*$").unwrap();
    static ref HTML_OPEN_7_CLOSE: Regex =
        Regex::new(r"^</[A-Za-z][A-Za-z0-9-]*[ \t]*>[ \t]*$").unwrap();
    static ref HTML_CLOSE_1: Regex = Regex::new(r"(?i)</(script|pre|style)>").unwrap();
}

fn html_block_start(p: &mut Parser, container: usize) -> BlockStart {
    if p.indented || p.peek(p.next_nonspace) != Some(b'<') {
        return BlockStart::None;
    }
    let html_type = match scan_html_block_type(&p.line[p.next_nonspace..]) {
        Some(t) => t,
        None => return BlockStart::None,
    };
    if html_type == 7 {
        // a bare tag line cannot interrupt a paragraph
        let in_paragraph = match p.tree.node(container).kind {
            NodeKind::Paragraph => true,
            _ => false,
        };
        if in_paragraph {
            return BlockStart::None;
        }
    }
    p.close_unmatched_blocks();
    p.add_child(NodeKind::HtmlBlock { html_type });
    BlockStart::Leaf
}

fn scan_html_block_type(tail: &[u8]) -> Option<u8> {
    if HTML_OPEN_1.is_match(tail) {
        return Some(1);
    }
    if tail.starts_with(b"<!--") {
        return Some(2);
    }
    if tail.starts_with(b"<?") {
        return Some(3);
    }
    if tail.starts_with(b"<![CDATA[") {
        return Some(5);
    }
    if HTML_OPEN_4.is_match(tail) {
        return Some(4);
    }
    if HTML_OPEN_6.is_match(tail) {
        return Some(6);
    }
    if HTML_OPEN_7_OPEN.is_match(tail) || HTML_OPEN_7_CLOSE.is_match(tail) {
        return Some(7);
    }
    None
}

/// Type-specific close test for HTML block types 1–5, applied to the line
/// remainder just absorbed. Types 6 and 7 close on blank lines instead.
pub(crate) fn html_block_end_matches(rest: &[u8], html_type: u8) -> bool {
    match html_type {
        1 => HTML_CLOSE_1.is_match(rest),
        2 => contains_seq(rest, b"-->"),
        3 => contains_seq(rest, b"?>"),
        4 => rest.contains(&b'>'),
        5 => contains_seq(rest, b"]]>"),
        _ => false,
    }
}

fn contains_seq(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.len() >= needle.len() && haystack.windows(needle.len()).any(|w| w == needle)
}

// ---- 7. thematic breaks --------------------------------------------------

lazy_static! {
    static ref THEMATIC_RE: Regex =
        Regex::new(r"^((\*[ \t]*){3,}|(-[ \t]*){3,}|(_[ \t]*){3,})$").unwrap();
}

fn thematic_break_start(p: &mut Parser, _container: usize) -> BlockStart {
    if p.indented || !THEMATIC_RE.is_match(&p.line[p.next_nonspace..]) {
        return BlockStart::None;
    }
    let tokens = trim_bytes(&p.line[p.next_nonspace..]).to_vec();
    p.close_unmatched_blocks();
    let id = p.add_child(NodeKind::ThematicBreak);
    p.tree.node_mut(id).tokens = tokens;
    let rest = p.line_len - p.offset.min(p.line_len);
    p.advance_offset(rest, false);
    BlockStart::Leaf
}

// ---- 8. lists and list items ---------------------------------------------

fn list_item_start(p: &mut Parser, container: usize) -> BlockStart {
    let container_is_list = match p.tree.node(container).kind {
        NodeKind::List(_) => true,
        _ => false,
    };
    if p.indented && !container_is_list {
        return BlockStart::None;
    }
    let data = match parse_list_marker(p, container) {
        Some(d) => d,
        None => return BlockStart::None,
    };
    p.close_unmatched_blocks();

    let matches_container_list = match &p.tree.node(container).kind {
        NodeKind::List(existing) => lists_match(existing, &data),
        _ => false,
    };
    let tip_is_list = match p.tree.node(p.tip).kind {
        NodeKind::List(_) => true,
        _ => false,
    };
    if !tip_is_list || !matches_container_list {
        p.add_child(NodeKind::List(data.clone()));
    }

    let item = p.add_child(NodeKind::ListItem {
        data: data.clone(),
        num: 0,
    });
    p.tree.node_mut(item).tokens = data.marker.clone();
    // ordered items (including ordered task items) number themselves from
    // the previous sibling
    if data.kind == ListKind::Ordered || (data.kind == ListKind::Task && data.bullet_char == 0) {
        let num = match p.tree.previous(item) {
            Some(prev) => match p.tree.node(prev).kind {
                NodeKind::ListItem { num, .. } => num + 1,
                _ => data.start,
            },
            None => data.start,
        };
        if let NodeKind::ListItem { num: n, .. } = &mut p.tree.node_mut(item).kind {
            *n = num;
        }
    }
    BlockStart::Container
}

/// Two markers continue the same list if they agree on ordered-ness,
/// bullet char and delimiter; the task flag on its own does not split a
/// list.
fn lists_match(a: &ListData, b: &ListData) -> bool {
    fn ordered(d: &ListData) -> bool {
        match d.kind {
            ListKind::Ordered => true,
            ListKind::Task => d.bullet_char == 0,
            ListKind::Bullet => false,
        }
    }
    ordered(a) == ordered(b) && a.delimiter == b.delimiter && a.bullet_char == b.bullet_char
}

lazy_static! {
    static ref LIST_MARKER_RE: Regex = Regex::new(r"^([*+-]|[0-9]{1,9}[.)])([ \t]|$)").unwrap();
    static ref TASK_RE: Regex = Regex::new(r"^\[[ xX]\]([ \t]|$)").unwrap();
}

/// Scans a list marker at the non-space position. On success the cursor
/// has been advanced past the marker and its padding; on failure the
/// parser state is untouched.
fn parse_list_marker(p: &mut Parser, container: usize) -> Option<ListData> {
    let pos = p.next_nonspace;
    let marker_offset = p.indent;
    let marker: Vec<u8> = {
        let cap = LIST_MARKER_RE.captures(&p.line[pos..])?;
        cap.get(1)?.as_bytes().to_vec()
    };
    let kind;
    let mut bullet_char = 0u8;
    let mut start = 1u32;
    let mut delimiter = 0u8;
    if marker[0].is_ascii_digit() {
        kind = ListKind::Ordered;
        let digits = std::str::from_utf8(&marker[..marker.len() - 1]).ok()?;
        start = digits.parse::<u32>().ok()?;
        delimiter = marker[marker.len() - 1];
    } else {
        kind = ListKind::Bullet;
        bullet_char = marker[0];
    }

    // interrupting a paragraph needs non-blank content, and an ordered
    // marker has to start at 1
    let container_is_paragraph = match p.tree.node(container).kind {
        NodeKind::Paragraph => true,
        _ => false,
    };
    if container_is_paragraph {
        if kind == ListKind::Ordered && start != 1 {
            return None;
        }
        if p.rest_is_blank(pos + marker.len()) {
            return None;
        }
    }

    // commit: walk past the marker and measure the padding
    p.advance_next_nonspace();
    p.advance_offset(marker.len(), false);
    let spaces_start_col = p.column;
    let spaces_start_off = p.offset;
    loop {
        p.advance_offset(1, true);
        let more = match p.peek(p.offset) {
            Some(c2) => is_space_or_tab(c2) && p.column - spaces_start_col < 5,
            None => false,
        };
        if !more {
            break;
        }
    }
    let blank_item = p.peek(p.offset).is_none();
    let spaces_after_marker = p.column - spaces_start_col;
    let padding;
    if spaces_after_marker >= 5 || spaces_after_marker < 1 || blank_item {
        // the run after the marker reads as code or is missing; content
        // starts one column after the marker
        padding = marker.len() + 1;
        p.column = spaces_start_col;
        p.offset = spaces_start_off;
        p.partially_consumed_tab = false;
        match p.peek(p.offset) {
            Some(c2) if is_space_or_tab(c2) => p.advance_offset(1, true),
            _ => {}
        }
    } else {
        padding = marker.len() + spaces_after_marker;
    }

    let mut data = ListData {
        kind,
        tight: false,
        bullet_char,
        start,
        delimiter,
        padding,
        marker_offset,
        marker,
    };
    if has_task_marker(p) {
        data.kind = ListKind::Task;
    }
    Some(data)
}

/// `[ ]`, `[x]` or `[X]` followed by whitespace (or end of line) at the
/// content start promotes the item to a task item.
fn has_task_marker(p: &Parser) -> bool {
    TASK_RE.is_match(&p.line[p.offset.min(p.line_len)..])
}

// ---- 9. math blocks ------------------------------------------------------

lazy_static! {
    static ref MATH_OPEN_RE: Regex = Regex::new(r"^\$\$+").unwrap();
}

fn math_block_start(p: &mut Parser, _container: usize) -> BlockStart {
    if p.indented {
        return BlockStart::None;
    }
    let run = match MATH_OPEN_RE.find(&p.line[p.next_nonspace..]) {
        Some(m) => m.end(),
        None => return BlockStart::None,
    };
    let indent = p.indent;
    p.close_unmatched_blocks();
    p.add_child(NodeKind::MathBlock {
        dollar_len: run,
        offset: indent,
    });
    p.advance_next_nonspace();
    p.advance_offset(run, false);
    BlockStart::Leaf
}

// ---- 10. indented code blocks --------------------------------------------

fn indented_code_start(p: &mut Parser, _container: usize) -> BlockStart {
    if !p.indented || p.blank {
        return BlockStart::None;
    }
    let tip_is_paragraph = match p.tree.node(p.tip).kind {
        NodeKind::Paragraph => true,
        _ => false,
    };
    if tip_is_paragraph {
        return BlockStart::None;
    }
    p.advance_offset(CODE_INDENT, true);
    p.close_unmatched_blocks();
    p.add_child(NodeKind::CodeBlock { fence: None });
    BlockStart::Leaf
}

// ---- helpers -------------------------------------------------------------

/// Trims spaces and tabs from both ends.
pub(crate) fn trim_bytes(b: &[u8]) -> &[u8] {
    let start = b.iter().position(|&c| !is_space_or_tab(c)).unwrap_or(b.len());
    let end = b
        .iter()
        .rposition(|&c| !is_space_or_tab(c))
        .map(|p| p + 1)
        .unwrap_or(start);
    &b[start..end]
}

/// Trims spaces, tabs and newlines from both ends.
fn trim_all(b: &[u8]) -> Vec<u8> {
    let ws = |c: u8| c == b' ' || c == b'\t' || c == b'\n';
    let start = b.iter().position(|&c| !ws(c)).unwrap_or(b.len());
    let end = b
        .iter()
        .rposition(|&c| !ws(c))
        .map(|p| p + 1)
        .unwrap_or(start);
    b[start..end].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atx_heading_shapes() {
        assert_eq!(
            parse_atx_heading(b"# hello"),
            Some((1, b"#".to_vec(), b"hello".to_vec()))
        );
        assert_eq!(
            parse_atx_heading(b"### hello ###"),
            Some((3, b"###".to_vec(), b"hello".to_vec()))
        );
        assert_eq!(parse_atx_heading(b"## ##"), Some((2, b"##".to_vec(), vec![])));
        assert_eq!(parse_atx_heading(b"#"), Some((1, b"#".to_vec(), vec![])));
        assert_eq!(
            parse_atx_heading(b"# hello#"),
            Some((1, b"#".to_vec(), b"hello#".to_vec()))
        );
        assert_eq!(parse_atx_heading(b"#hello"), None);
        assert_eq!(parse_atx_heading(b"####### seven"), None);
    }

    #[test]
    fn setext_underlines() {
        assert_eq!(parse_setext_underline(b"==="), Some(1));
        assert_eq!(parse_setext_underline(b"-"), Some(2));
        assert_eq!(parse_setext_underline(b"--  "), Some(2));
        assert_eq!(parse_setext_underline(b"-:"), None);
        assert_eq!(parse_setext_underline(b"= ="), None);
    }

    #[test]
    fn code_fences() {
        let f = parse_code_fence(b"```go", 0).unwrap();
        assert_eq!(f.fence_char, b'`');
        assert_eq!(f.fence_len, 3);
        assert_eq!(f.info, b"go".to_vec());
        assert!(parse_code_fence(b"``", 0).is_none());
        assert!(parse_code_fence(b"``` a`b", 0).is_none());
        assert!(parse_code_fence(b"~~~ a`b", 1).is_some());
    }

    #[test]
    fn html_block_types() {
        assert_eq!(scan_html_block_type(b"<script src=\"x\">"), Some(1));
        assert_eq!(scan_html_block_type(b"<!-- note"), Some(2));
        assert_eq!(scan_html_block_type(b"<?php"), Some(3));
        assert_eq!(scan_html_block_type(b"<!DOCTYPE html>"), Some(4));
        assert_eq!(scan_html_block_type(b"<![CDATA[x"), Some(5));
        assert_eq!(scan_html_block_type(b"<div class=\"a\">content"), Some(6));
        assert_eq!(scan_html_block_type(b"</div>"), Some(6));
        assert_eq!(scan_html_block_type(b"<custom-tag attr=1>"), Some(7));
        assert_eq!(scan_html_block_type(b"<custom-tag> tail"), None);
        assert!(html_block_end_matches(b"x</script> y", 1));
        assert!(html_block_end_matches(b"--> done", 2));
        assert!(!html_block_end_matches(b"still open", 2));
    }

    #[test]
    fn thematic_break_shapes() {
        assert!(THEMATIC_RE.is_match(b"***"));
        assert!(THEMATIC_RE.is_match(b"- - -"));
        assert!(THEMATIC_RE.is_match(b"___  "));
        assert!(!THEMATIC_RE.is_match(b"**"));
        assert!(!THEMATIC_RE.is_match(b"--*"));
    }
}
