use pretty_assertions::assert_eq;
use quill::tree::{NodeKind, TableAlign};
use quill::Options;

fn gfm() -> Options {
    Options {
        gfm_table: true,
        ..Options::default()
    }
}

fn dump(input: &str) -> String {
    quill::parse(input, &gfm()).tree.to_string()
}

#[test]
fn pipe_table() {
    let expected = "\
document
  table cols=2
    table-row
      table-cell \"a\"
      table-cell \"b\"
    table-row
      table-cell \"1\"
      table-cell \"2\"
";
    assert_eq!(dump("| a | b |\n| - | :-: |\n| 1 | 2 |\n"), expected);
}

#[test]
fn table_alignments() {
    let parsed = quill::parse("| a | b | c | d |\n| - | :- | :-: | -: |\nx|y|z|w\n", &gfm());
    let root = parsed.tree.root();
    let table = parsed.tree.children(root)[0];
    match &parsed.tree.node(table).kind {
        NodeKind::Table { aligns } => assert_eq!(
            aligns,
            &vec![
                TableAlign::None,
                TableAlign::Left,
                TableAlign::Center,
                TableAlign::Right
            ]
        ),
        k => panic!("expected table, got {:?}", k),
    }
}

#[test]
fn table_without_extension_stays_a_paragraph() {
    let expected = "\
document
  paragraph \"| a |\\n| - |\\n| 1 |\"
";
    assert_eq!(
        quill::parse("| a |\n| - |\n| 1 |\n", &Options::default())
            .tree
            .to_string(),
        expected
    );
}

#[test]
fn column_count_mismatch_is_not_a_table() {
    let expected = "\
document
  paragraph \"| a | b |\\n| - |\"
";
    assert_eq!(dump("| a | b |\n| - |\n"), expected);
}

#[test]
fn escaped_pipes_stay_in_the_cell() {
    let parsed = quill::parse("| a \\| b |\n| - |\n", &gfm());
    let root = parsed.tree.root();
    let table = parsed.tree.children(root)[0];
    let header = parsed.tree.children(table)[0];
    let cell = parsed.tree.children(header)[0];
    assert_eq!(parsed.tree.node(cell).tokens, b"a \\| b".to_vec());
}

#[test]
fn short_rows_are_padded_and_long_rows_truncated() {
    let expected = "\
document
  table cols=2
    table-row
      table-cell \"a\"
      table-cell \"b\"
    table-row
      table-cell \"only\"
      table-cell
    table-row
      table-cell \"1\"
      table-cell \"2\"
";
    assert_eq!(dump("| a | b |\n| - | - |\n| only |\n| 1 | 2 | 3 |\n"), expected);
}

#[test]
fn setext_underline_prefers_table() {
    // `-:` reads as a one-column delimiter row once the underline forces
    // the decision, so the paragraph becomes a table, not a heading
    let expected = "\
document
  table cols=1
    table-row
      table-cell \"0\"
  list bullet tight=true
    list-item \"-\"
";
    assert_eq!(dump("0\n-:\n-\n"), expected);
}

#[test]
fn list_item_swallowed_after_table_transform() {
    // the underline that triggered the transformation is then read as an
    // empty list item; kept as-is, with this test pinning the behavior
    let parsed = quill::parse("0\n-:\n-\n", &gfm());
    let root = parsed.tree.root();
    let kinds: Vec<&str> = parsed
        .tree
        .children(root)
        .iter()
        .map(|&c| parsed.tree.node(c).kind.name())
        .collect();
    assert_eq!(kinds, vec!["table", "list"]);
}

#[test]
fn plain_setext_with_tables_on_is_still_a_heading() {
    let expected = "\
document
  heading level=2 setext \"h\"
";
    assert_eq!(dump("h\n-\n"), expected);
}

#[test]
fn blank_line_ends_the_table_rows() {
    let expected = "\
document
  table cols=1
    table-row
      table-cell \"a\"
    table-row
      table-cell \"1\"
  paragraph \"after\"
";
    assert_eq!(dump("| a |\n| - |\n| 1 |\n\nafter\n"), expected);
}
