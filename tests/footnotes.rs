use pretty_assertions::assert_eq;
use quill::Options;

fn footnotes() -> Options {
    Options {
        footnotes: true,
        ..Options::default()
    }
}

fn dump(input: &str) -> String {
    quill::parse(input, &footnotes()).tree.to_string()
}

#[test]
fn footnote_definition() {
    let expected = "\
document
  footnotes-def \"^1\"
    paragraph \"note\"
";
    assert_eq!(dump("[^1]: note\n"), expected);
}

#[test]
fn footnote_continuation_needs_four_columns() {
    let expected = "\
document
  footnotes-def \"^1\"
    paragraph \"note\\nmore\"
  paragraph \"rest\"
";
    assert_eq!(dump("[^1]: note\n    more\n\nrest\n"), expected);
}

#[test]
fn footnote_defs_are_recorded_in_order() {
    let parsed = quill::parse("[^b]: two\n\n[^a]: one\n", &footnotes());
    let labels: Vec<Vec<u8>> = parsed
        .footnote_defs
        .iter()
        .map(|&id| parsed.tree.node(id).tokens.clone())
        .collect();
    assert_eq!(labels, vec![b"^b".to_vec(), b"^a".to_vec()]);
}

#[test]
fn duplicate_labels_keep_the_first_definition() {
    let parsed = quill::parse("[^a]: one\n\n[^A]: two\n", &footnotes());
    assert_eq!(parsed.footnote_defs.len(), 1);
    let first = parsed.footnote_defs[0];
    assert_eq!(parsed.tree.node(first).tokens, b"^a".to_vec());
    // the duplicate still produces a node in the tree
    let root = parsed.tree.root();
    assert_eq!(parsed.tree.children(root).len(), 2);
}

#[test]
fn label_may_not_contain_whitespace() {
    // not a footnote label, and the trailing run keeps it from reading
    // as a link reference definition either
    let expected = "\
document
  paragraph \"[^a b]: x y\"
";
    assert_eq!(dump("[^a b]: x y\n"), expected);
}

#[test]
fn disabled_footnotes_fall_through_to_link_ref_defs() {
    // `[^1]: x` is a well-formed link reference definition once the
    // footnote recognizer is off
    let parsed = quill::parse("[^1]: x\n", &Options::default());
    assert_eq!(parsed.tree.to_string(), "document\n");
    assert_eq!(parsed.link_ref_defs["^1"].destination, b"x".to_vec());
}

#[test]
fn blockquote_inside_footnote() {
    let expected = "\
document
  footnotes-def \"^q\"
    blockquote
      blockquote-marker \"> \"
      paragraph \"quoted\"
";
    assert_eq!(dump("[^q]: > quoted\n"), expected);
}
