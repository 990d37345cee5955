//! Link reference definitions: `[label]: destination "title"`. They are
//! drained from the head of a paragraph's tokens at finalization and
//! recorded under the normalized label; the first definition for a label
//! wins. Destination and title bytes are stored raw, unescaping is left
//! to the inline layer.

use crate::parser::is_space_or_tab;
use std::collections::HashMap;

#[derive(Clone, Debug, PartialEq)]
pub struct LinkRefDef {
    pub destination: Vec<u8>,
    pub title: Vec<u8>,
}

/// Tries to parse one definition from the head of `tokens`. On success it
/// is recorded in `defs` and the remaining tokens are returned; on failure
/// the tokens stay paragraph content.
pub(crate) fn parse_link_ref_def(
    defs: &mut HashMap<String, LinkRefDef>,
    tokens: &[u8],
) -> Option<Vec<u8>> {
    let mut pos = 0;
    let label = parse_link_label(tokens, &mut pos)?;
    if tokens.get(pos) != Some(&b':') {
        return None;
    }
    pos += 1;
    skip_spnl(tokens, &mut pos);
    let destination = parse_link_destination(tokens, &mut pos)?;

    // optional title, possibly on the next line; it must be separated
    // from the destination by whitespace
    let before_title = pos;
    let mut title: Vec<u8> = vec![];
    let mut title_end = before_title;
    {
        let mut tpos = before_title;
        skip_spnl(tokens, &mut tpos);
        if tpos > before_title {
            if let Some(t) = parse_link_title(tokens, &mut tpos) {
                title = t;
                title_end = tpos;
            }
        }
    }

    let mut end = title_end;
    if !at_line_end(tokens, &mut end) {
        if title_end == before_title {
            return None;
        }
        // the title broke the line end; retry without it
        title = vec![];
        end = before_title;
        if !at_line_end(tokens, &mut end) {
            return None;
        }
    }

    let normalized = normalize_label(&label);
    if normalized.is_empty() {
        return None;
    }
    defs.entry(normalized).or_insert_with(|| LinkRefDef {
        destination,
        title,
    });
    Some(tokens[end..].to_vec())
}

/// `[...]` with no unescaped brackets inside, at most 999 content bytes.
fn parse_link_label(tokens: &[u8], pos: &mut usize) -> Option<Vec<u8>> {
    if tokens.first() != Some(&b'[') {
        return None;
    }
    let mut i = 1;
    let mut label = vec![];
    loop {
        match tokens.get(i) {
            None => return None,
            Some(&b'\\') => {
                label.push(b'\\');
                if let Some(&next) = tokens.get(i + 1) {
                    label.push(next);
                    i += 2;
                } else {
                    i += 1;
                }
            }
            Some(&b'[') => return None,
            Some(&b']') => break,
            Some(&c) => {
                label.push(c);
                i += 1;
            }
        }
        if label.len() > 999 {
            return None;
        }
    }
    *pos = i + 1;
    Some(label)
}

/// `<...>` (no raw `<`, `>` or newline inside) or a bare run with balanced
/// parentheses and no whitespace or control bytes.
fn parse_link_destination(tokens: &[u8], pos: &mut usize) -> Option<Vec<u8>> {
    if tokens.get(*pos) == Some(&b'<') {
        let mut i = *pos + 1;
        let mut dest = vec![];
        loop {
            match tokens.get(i) {
                None | Some(&b'\n') | Some(&b'<') => return None,
                Some(&b'>') => {
                    *pos = i + 1;
                    return Some(dest);
                }
                Some(&b'\\') => match tokens.get(i + 1) {
                    Some(&next) => {
                        dest.push(b'\\');
                        dest.push(next);
                        i += 2;
                    }
                    None => return None,
                },
                Some(&c) => {
                    dest.push(c);
                    i += 1;
                }
            }
        }
    }
    let mut i = *pos;
    let mut depth = 0u32;
    let mut dest = vec![];
    while let Some(&c) = tokens.get(i) {
        if c == b' ' || c == b'\t' || c == b'\n' || c < 0x20 {
            break;
        }
        if c == b'\\' {
            if let Some(&next) = tokens.get(i + 1) {
                dest.push(b'\\');
                dest.push(next);
                i += 2;
                continue;
            }
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
        dest.push(c);
        i += 1;
    }
    if dest.is_empty() || depth != 0 {
        return None;
    }
    *pos = i;
    Some(dest)
}

/// A quoted title: `"..."`, `'...'` or `(...)`.
fn parse_link_title(tokens: &[u8], pos: &mut usize) -> Option<Vec<u8>> {
    let open = *tokens.get(*pos)?;
    let close = match open {
        b'"' => b'"',
        b'\'' => b'\'',
        b'(' => b')',
        _ => return None,
    };
    let mut i = *pos + 1;
    let mut title = vec![];
    loop {
        match tokens.get(i) {
            None => return None,
            Some(&b'\\') => {
                title.push(b'\\');
                if let Some(&next) = tokens.get(i + 1) {
                    title.push(next);
                    i += 2;
                } else {
                    i += 1;
                }
            }
            Some(&c) if c == close => {
                *pos = i + 1;
                return Some(title);
            }
            Some(&b'(') if open == b'(' => return None,
            Some(&c) => {
                title.push(c);
                i += 1;
            }
        }
    }
}

/// Skips trailing spaces; succeeds at end of input or on a newline, which
/// it consumes.
fn at_line_end(tokens: &[u8], pos: &mut usize) -> bool {
    let mut i = *pos;
    while let Some(&c) = tokens.get(i) {
        if is_space_or_tab(c) {
            i += 1;
        } else {
            break;
        }
    }
    match tokens.get(i) {
        None => {
            *pos = i;
            true
        }
        Some(&b'\n') => {
            *pos = i + 1;
            true
        }
        _ => false,
    }
}

/// Spaces and tabs with at most one embedded newline.
fn skip_spnl(tokens: &[u8], pos: &mut usize) {
    let mut seen_newline = false;
    while let Some(&c) = tokens.get(*pos) {
        if is_space_or_tab(c) {
            *pos += 1;
        } else if c == b'\n' && !seen_newline {
            seen_newline = true;
            *pos += 1;
        } else {
            break;
        }
    }
}

/// Case-folds, collapses interior whitespace to single spaces and trims.
pub(crate) fn normalize_label(label: &[u8]) -> String {
    let s = String::from_utf8_lossy(label);
    let mut out = String::new();
    let mut in_ws = false;
    for ch in s.trim().chars() {
        if ch.is_whitespace() {
            if !in_ws {
                out.push(' ');
                in_ws = true;
            }
        } else {
            in_ws = false;
            for lc in ch.to_lowercase() {
                out.push(lc);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(tokens: &[u8]) -> (HashMap<String, LinkRefDef>, Option<Vec<u8>>) {
        let mut defs = HashMap::new();
        let rest = parse_link_ref_def(&mut defs, tokens);
        (defs, rest)
    }

    #[test]
    fn simple_definition() {
        let (defs, rest) = parse(b"[a]: /url \"t\"\n");
        assert_eq!(rest, Some(vec![]));
        let def = &defs["a"];
        assert_eq!(def.destination, b"/url".to_vec());
        assert_eq!(def.title, b"t".to_vec());
    }

    #[test]
    fn angle_destination_and_paren_title() {
        let (defs, rest) = parse(b"[x]: </some url> (title here)\nrest");
        assert_eq!(rest, Some(b"rest".to_vec()));
        assert_eq!(defs["x"].destination, b"/some url".to_vec());
        assert_eq!(defs["x"].title, b"title here".to_vec());
    }

    #[test]
    fn title_on_next_line() {
        let (defs, rest) = parse(b"[a]: /url\n'title'\n");
        assert_eq!(rest, Some(vec![]));
        assert_eq!(defs["a"].title, b"title".to_vec());
    }

    #[test]
    fn bad_title_falls_back_to_destination_only() {
        // the quoted run never closes, so the definition ends at the
        // destination line and the next line stays content
        let (defs, rest) = parse(b"[a]: /url\n\"broken\n");
        assert_eq!(rest, Some(b"\"broken\n".to_vec()));
        assert_eq!(defs["a"].title, vec![]);
    }

    #[test]
    fn trailing_garbage_is_not_a_definition() {
        let (defs, rest) = parse(b"[a]: /url extra\n");
        assert!(rest.is_none());
        assert!(defs.is_empty());
    }

    #[test]
    fn label_normalization() {
        assert_eq!(normalize_label(b"  Foo \t Bar "), "foo bar");
        let (defs, _) = parse("[\u{41}B]: /u\n".as_bytes());
        assert!(defs.contains_key("ab"));
    }

    #[test]
    fn first_definition_wins() {
        let mut defs = HashMap::new();
        let rest = parse_link_ref_def(&mut defs, b"[a]: /one\n").unwrap();
        assert!(rest.is_empty());
        parse_link_ref_def(&mut defs, b"[A]: /two\n").unwrap();
        assert_eq!(defs["a"].destination, b"/one".to_vec());
    }

    #[test]
    fn balanced_parens_in_bare_destination() {
        let (defs, _) = parse(b"[a]: /u(v)w\n");
        assert_eq!(defs["a"].destination, b"/u(v)w".to_vec());
        let (defs, rest) = parse(b"[b]: /u(v\n");
        assert!(rest.is_none());
        assert!(defs.is_empty());
    }
}
