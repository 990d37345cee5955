//! The `@name@(id)` user-card construct. It resolves like a link: the
//! first `@` becomes a bracket-stack opener, a later `@` followed by a
//! parenthesised destination closes it, and everything in between is
//! re-parented into a card node. The full inline grammar (emphasis
//! pairing, real links) belongs to the inline parser; this module keeps
//! just enough bracket and delimiter state to resolve cards over a run of
//! inline text.

use crate::parser::Options;
use crate::tree::{NodeKind, Tree};

/// Tag carried by card nodes so a renderer can tell them from links.
pub const USER_CARD_LINK_TYPE: u8 = 8;

struct Bracket {
    /// The text node holding the opener's bytes.
    node: usize,
    active: bool,
    image: bool,
    /// Length of the delimiter stack when the opener was pushed.
    previous_delimiter: usize,
}

struct InlineContext<'a> {
    tokens: &'a [u8],
    pos: usize,
    brackets: Vec<Bracket>,
    /// Positions of unpaired emphasis markers; pairing is the inline
    /// parser's job, cards only release entries above their opener.
    delimiters: Vec<usize>,
    editor_mode: bool,
}

/// Scans `tokens` as the inline text of `parent`, appending text nodes
/// and resolving user-card constructs in place.
pub fn parse_inline(tree: &mut Tree, parent: usize, tokens: &[u8], options: &Options) {
    let mut ctx = InlineContext {
        tokens,
        pos: 0,
        brackets: vec![],
        delimiters: vec![],
        editor_mode: options.editor_mode(),
    };
    let mut start = 0;
    while ctx.pos < tokens.len() {
        let b = tokens[ctx.pos];
        if b == b'@' {
            flush_text(tree, parent, tokens, start, ctx.pos);
            parse_user_card(tree, parent, &mut ctx);
            start = ctx.pos;
        } else {
            if b == b'*' || b == b'_' {
                ctx.delimiters.push(ctx.pos);
            }
            ctx.pos += 1;
        }
    }
    flush_text(tree, parent, tokens, start, ctx.pos);
}

fn flush_text(tree: &mut Tree, parent: usize, tokens: &[u8], start: usize, end: usize) {
    if start < end {
        add_text(tree, parent, &tokens[start..end]);
    }
}

fn add_text(tree: &mut Tree, parent: usize, tokens: &[u8]) -> usize {
    let id = tree.add(parent, NodeKind::Text);
    tree.node_mut(id).tokens = tokens.to_vec();
    tree.node_mut(id).closed = true;
    id
}

/// Handles one `@` at the current position: opener, plain text, or the
/// closing half of a card.
fn parse_user_card(tree: &mut Tree, parent: usize, ctx: &mut InlineContext) {
    let start_pos = ctx.pos;
    ctx.pos += 1;

    let (opener_node, opener_active, opener_prev_delim) = match ctx.brackets.last() {
        None => {
            // no pending opener, this `@` becomes one
            let node = add_text(tree, parent, &ctx.tokens[start_pos..ctx.pos]);
            ctx.brackets.push(Bracket {
                node,
                active: true,
                image: false,
                previous_delimiter: ctx.delimiters.len(),
            });
            return;
        }
        Some(b) => (b.node, b.active, b.previous_delimiter),
    };
    if !opener_active {
        ctx.brackets.pop();
        add_text(tree, parent, &ctx.tokens[start_pos..ctx.pos]);
        return;
    }

    // editor modes insist on a non-empty name between the markers
    let empty_name = ctx.editor_mode && tree.last_child(parent) == Some(opener_node);
    let dest = if empty_name {
        None
    } else {
        scan_card_dest(ctx.tokens, ctx.pos)
    };
    let (dest_range, consumed) = match dest {
        Some(d) => d,
        None => {
            // the trailing `@` stays plain text and the opener is spent
            ctx.brackets.pop();
            add_text(tree, parent, &ctx.tokens[start_pos..ctx.pos]);
            return;
        }
    };

    let card = tree.new_node(NodeKind::UserCard {
        link_type: USER_CARD_LINK_TYPE,
    });
    tree.node_mut(card).closed = true;

    let open_at = tree.node(opener_node).tokens.clone();
    let at1 = tree.new_node(NodeKind::At);
    tree.node_mut(at1).tokens = open_at;
    tree.node_mut(at1).closed = true;
    tree.append_child(card, at1);

    // everything between the two `@` markers becomes the card's text
    let moved: Vec<usize> = {
        let children = tree.children(parent);
        match children.iter().position(|&c| c == opener_node) {
            Some(p) => children[p + 1..].to_vec(),
            None => vec![],
        }
    };
    for id in moved {
        tree.unlink(id);
        let is_text = match tree.node(id).kind {
            NodeKind::Text => true,
            _ => false,
        };
        if is_text {
            tree.node_mut(id).kind = NodeKind::LinkText;
        }
        tree.append_child(card, id);
    }

    let at2 = tree.new_node(NodeKind::At);
    tree.node_mut(at2).tokens = ctx.tokens[start_pos..start_pos + 1].to_vec();
    tree.node_mut(at2).closed = true;
    tree.append_child(card, at2);

    let open_paren = tree.new_node(NodeKind::OpenParen);
    tree.node_mut(open_paren).tokens = b"(".to_vec();
    tree.node_mut(open_paren).closed = true;
    tree.append_child(card, open_paren);

    let link_dest = tree.new_node(NodeKind::LinkDest);
    tree.node_mut(link_dest).tokens = ctx.tokens[dest_range.0..dest_range.1].to_vec();
    tree.node_mut(link_dest).closed = true;
    tree.append_child(card, link_dest);

    let close_paren = tree.new_node(NodeKind::CloseParen);
    tree.node_mut(close_paren).tokens = b")".to_vec();
    tree.node_mut(close_paren).closed = true;
    tree.append_child(card, close_paren);

    // delimiters inside the card have been handled, release them before
    // swapping the nodes in
    ctx.delimiters.truncate(opener_prev_delim);
    ctx.brackets.pop();
    tree.unlink(opener_node);
    tree.append_child(parent, card);

    // no cards inside cards: earlier link openers go inactive
    for b in ctx.brackets.iter_mut() {
        if !b.image {
            b.active = false;
        }
    }

    ctx.pos += consumed;
}

/// `(dest)` right after the closing `@`; surrounding spaces are allowed,
/// the destination itself must be a non-empty whitespace-free run with
/// balanced parentheses. Returns the destination byte range and the total
/// bytes consumed.
fn scan_card_dest(tokens: &[u8], start: usize) -> Option<((usize, usize), usize)> {
    if *tokens.get(start)? != b'(' {
        return None;
    }
    let mut i = start + 1;
    while let Some(&c) = tokens.get(i) {
        if c == b' ' || c == b'\t' {
            i += 1;
        } else {
            break;
        }
    }
    let dest_start = i;
    let mut depth = 0u32;
    while let Some(&c) = tokens.get(i) {
        if c == b' ' || c == b'\t' {
            break;
        }
        if c == b'(' {
            depth += 1;
        }
        if c == b')' {
            if depth == 0 {
                break;
            }
            depth -= 1;
        }
        i += 1;
    }
    let dest_end = i;
    if dest_end == dest_start || depth != 0 {
        return None;
    }
    while let Some(&c) = tokens.get(i) {
        if c == b' ' || c == b'\t' {
            i += 1;
        } else {
            break;
        }
    }
    if tokens.get(i) != Some(&b')') {
        return None;
    }
    Some(((dest_start, dest_end), i + 1 - start))
}
