#![deny(clippy::all, clippy::pedantic)]

//! Quill parses the block structure of a markdown document: paragraphs,
//! headings, lists, blockquotes, code blocks, HTML blocks, thematic
//! breaks, tables, footnote definitions and math blocks. Lines are
//! incorporated one at a time into a tree of open blocks; inline content
//! is left as raw token bytes for an inline parser to consume, except for
//! the `@name@(id)` user-card construct which [`user_card`] resolves.
//!
//! ```
//! let parsed = quill::parse("# hello\n", &quill::Options::default());
//! println!("{}", parsed.tree);
//! ```

mod link_ref;
mod parser;
mod starts;
mod table;
pub mod tree;
pub mod user_card;

#[macro_use]
extern crate lazy_static;

pub use crate::link_ref::LinkRefDef;
pub use crate::parser::{Options, Parsed, Parser};

/// Parses a complete document, splitting it into lines.
#[must_use]
pub fn parse(buf: &str, options: &Options) -> Parsed {
    let mut p = Parser::new(options.clone());
    for line in buf.lines() {
        p.parse_line(line.as_bytes());
    }
    p.finish()
}

/// Parses from an explicit line source; lines carry no terminating
/// newline.
pub fn parse_lines<'a, I>(lines: I, options: &Options) -> Parsed
where
    I: IntoIterator<Item = &'a [u8]>,
{
    let mut p = Parser::new(options.clone());
    for line in lines {
        p.parse_line(line);
    }
    p.finish()
}
