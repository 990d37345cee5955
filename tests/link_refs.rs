use pretty_assertions::assert_eq;
use quill::Options;

fn parse(input: &str) -> quill::Parsed {
    quill::parse(input, &Options::default())
}

#[test]
fn definition_paragraph_disappears() {
    let parsed = parse("[a]: /url \"t\"\n\nsee [a]\n");
    let expected = "\
document
  paragraph \"see [a]\"
";
    assert_eq!(parsed.tree.to_string(), expected);
    let def = &parsed.link_ref_defs["a"];
    assert_eq!(def.destination, b"/url".to_vec());
    assert_eq!(def.title, b"t".to_vec());
}

#[test]
fn definition_followed_by_body_in_the_same_paragraph() {
    let parsed = parse("[a]: /url\nsee [a]\n");
    let expected = "\
document
  paragraph \"see [a]\"
";
    assert_eq!(parsed.tree.to_string(), expected);
    assert_eq!(parsed.link_ref_defs["a"].destination, b"/url".to_vec());
}

#[test]
fn several_definitions_drain_in_sequence() {
    let parsed = parse("[a]: /1\n[b]: /2\nbody\n");
    let expected = "\
document
  paragraph \"body\"
";
    assert_eq!(parsed.tree.to_string(), expected);
    assert_eq!(parsed.link_ref_defs.len(), 2);
    assert_eq!(parsed.link_ref_defs["b"].destination, b"/2".to_vec());
}

#[test]
fn labels_match_case_insensitively_and_first_wins() {
    let parsed = parse("[Foo]: /one\n\n[foo]: /two\n");
    assert_eq!(parsed.link_ref_defs.len(), 1);
    assert_eq!(parsed.link_ref_defs["foo"].destination, b"/one".to_vec());
}

#[test]
fn malformed_definition_stays_paragraph_text() {
    let parsed = parse("[a]: /url extra junk\n");
    let expected = "\
document
  paragraph \"[a]: /url extra junk\"
";
    assert_eq!(parsed.tree.to_string(), expected);
    assert!(parsed.link_ref_defs.is_empty());
}

#[test]
fn definition_with_title_on_next_line() {
    let parsed = parse("[a]: /url\n\"title\"\n");
    assert_eq!(parsed.tree.to_string(), "document\n");
    assert_eq!(parsed.link_ref_defs["a"].title, b"title".to_vec());
}

#[test]
fn setext_conversion_drains_definitions_first() {
    let parsed = parse("[a]: /u\nh\n==\n");
    let expected = "\
document
  heading level=1 setext \"h\"
";
    assert_eq!(parsed.tree.to_string(), expected);
    assert_eq!(parsed.link_ref_defs["a"].destination, b"/u".to_vec());
}

#[test]
fn angle_destination_may_hold_spaces() {
    let parsed = parse("[a]: </my url>\n");
    assert_eq!(parsed.link_ref_defs["a"].destination, b"/my url".to_vec());
}
