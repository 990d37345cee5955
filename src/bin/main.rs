//! Simple program to run the quill library. By default the original text
//! and the parsed block tree are both written to the console; flags allow
//! turning bits off and enabling the extensions.

#![deny(clippy::all, clippy::pedantic)]

use anyhow::Context;
use clap::{App, Arg};
use std::fs;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let matches = App::new("quill")
        .version("0.1")
        .about("markdown block parsing")
        .arg(
            Arg::with_name("o")
                .short("o")
                .long("skip-original")
                .takes_value(false)
                .help("Skip printing original text"),
        )
        .arg(
            Arg::with_name("a")
                .short("a")
                .long("skip-tree")
                .takes_value(false)
                .help("Skip printing the block tree"),
        )
        .arg(
            Arg::with_name("footnotes")
                .long("footnotes")
                .takes_value(false)
                .help("Enable footnote definitions"),
        )
        .arg(
            Arg::with_name("gfm-table")
                .long("gfm-table")
                .takes_value(false)
                .help("Enable GFM tables"),
        )
        .arg(
            Arg::with_name("INPUT")
                .help("Input file to use")
                .required(true)
                .index(1),
        )
        .get_matches();

    let filename = matches.value_of("INPUT").unwrap_or_default();
    let contents =
        fs::read_to_string(filename).with_context(|| format!("reading {}", filename))?;

    let options = quill::Options {
        footnotes: matches.is_present("footnotes"),
        gfm_table: matches.is_present("gfm-table"),
        ..quill::Options::default()
    };

    if !matches.is_present("o") {
        println!("{}\n", contents);
    }
    if !matches.is_present("a") {
        let parsed = quill::parse(&contents, &options);
        println!("{}", parsed.tree);
    }
    Ok(())
}
