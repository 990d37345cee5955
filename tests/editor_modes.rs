use pretty_assertions::assert_eq;
use quill::Options;

fn wysiwyg() -> Options {
    Options {
        vditor_wysiwyg: true,
        ..Options::default()
    }
}

#[test]
fn cjk_list_marker_is_normalized() {
    let parsed = quill::parse("1、こんにちは\n", &wysiwyg());
    let expected = "\
document
  list ordered tight=true
    list-item \"1.\"
      paragraph \"こんにちは\"
";
    assert_eq!(parsed.tree.to_string(), expected);
}

#[test]
fn cjk_paren_marker_is_normalized() {
    let parsed = quill::parse("2）二つ目の項目\n", &wysiwyg());
    let expected = "\
document
  list ordered tight=true
    list-item \"2.\"
      paragraph \"二つ目の項目\"
";
    assert_eq!(parsed.tree.to_string(), expected);
}

#[test]
fn short_lines_are_left_alone() {
    let parsed = quill::parse("1、ab\n", &wysiwyg());
    let expected = "\
document
  paragraph \"1、ab\"
";
    assert_eq!(parsed.tree.to_string(), expected);
}

#[test]
fn strict_mode_keeps_cjk_markers() {
    let parsed = quill::parse("1、こんにちは\n", &Options::default());
    let expected = "\
document
  paragraph \"1、こんにちは\"
";
    assert_eq!(parsed.tree.to_string(), expected);
}

#[test]
fn wysiwyg_refuses_empty_blockquote_markers() {
    let parsed = quill::parse(">\n", &wysiwyg());
    let expected = "\
document
  paragraph \">\"
";
    assert_eq!(parsed.tree.to_string(), expected);
}

#[test]
fn wysiwyg_accepts_blockquotes_with_content() {
    let parsed = quill::parse("> a\n", &wysiwyg());
    let expected = "\
document
  blockquote
    blockquote-marker \"> \"
    paragraph \"a\"
";
    assert_eq!(parsed.tree.to_string(), expected);
}
