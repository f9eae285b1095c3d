//! `tree-diff`: print the patch that turns one JSON document into another.
//!
//! Usage:
//!   tree-diff '<old-json>' [<pointer>=<key> ...]
//!
//! The new document is read from stdin. Each `<pointer>=<key>` argument
//! declares an identity key for the arrays at that path (`*` matches any
//! segment), so reordered elements come out as `move` operations.
//!
//! Set `RUST_LOG=debug` to see how each container was diffed.

use std::io::{self, Read, Write};
use tree_duplex::cli::{diff_json, init_tracing};

fn main() {
    init_tracing();
    let args: Vec<String> = std::env::args().collect();
    let old = match args.get(1) {
        Some(doc) => doc.clone(),
        None => {
            eprintln!("First argument must be the previous JSON document.");
            std::process::exit(1);
        }
    };

    let mut buf = String::new();
    if let Err(e) = io::stdin().read_to_string(&mut buf) {
        eprintln!("{e}");
        std::process::exit(1);
    }

    match diff_json(&old, buf.trim(), &args[2..]) {
        Ok(patch) => {
            let mut stdout = io::stdout();
            if let Err(e) = writeln!(stdout, "{patch}") {
                eprintln!("{e}");
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}
