//! `tree-patch`: apply a patch to a JSON document.
//!
//! Usage:
//!   tree-patch '<patch-array-json>'
//!
//! The document is read from stdin. Operations that do not resolve against
//! the document are skipped; `RUST_LOG=trace` lists them.

use std::io::{self, Read, Write};
use tree_duplex::cli::{apply_json_patch, init_tracing};

fn main() {
    init_tracing();
    let args: Vec<String> = std::env::args().collect();
    let patch = match args.get(1) {
        Some(p) => p.clone(),
        None => {
            eprintln!("First argument must be a patch array.");
            std::process::exit(1);
        }
    };

    let mut buf = String::new();
    if let Err(e) = io::stdin().read_to_string(&mut buf) {
        eprintln!("{e}");
        std::process::exit(1);
    }

    match apply_json_patch(buf.trim(), &patch) {
        Ok(result) => {
            let mut stdout = io::stdout();
            if let Err(e) = writeln!(stdout, "{result}") {
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
