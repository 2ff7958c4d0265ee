use std::process;

use clap::Args;

use ada::config::Overrides;
use ada::hash::ContentHash;
use ada::oracle::ParserOracle;

use super::{read_source, report_failures, require_dfns, resolve_settings, InputArgs};

#[derive(Args)]
pub struct HashArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Show full 256-bit hashes instead of short form
    #[arg(long)]
    pub full: bool,
}

pub fn cmd_hash(args: HashArgs) {
    let HashArgs { input, full } = args;
    let InputArgs { input, parser } = input;
    let settings = resolve_settings(
        &input,
        Overrides {
            parser,
            ..Overrides::default()
        },
    );
    let source = read_source(&input);
    let oracle = ParserOracle::new(&settings.parser);

    let outcomes = ada::differentiate_file(&source, &oracle, true);
    require_dfns(&outcomes, &input);

    let file_hash = ContentHash::of(&ada::join_outputs(&outcomes));
    if full {
        eprintln!("File: {} {}", file_hash.to_hex(), input.display());
    } else {
        eprintln!("File: {} {}", file_hash, input.display());
    }
    for outcome in &outcomes {
        let Ok(text) = &outcome.result else {
            continue;
        };
        let hash = ContentHash::of(text);
        if full {
            println!("  {} {}", hash.to_hex(), outcome.name);
        } else {
            println!("  {} {}", hash, outcome.name);
        }
    }

    if report_failures(&outcomes, &input, &source) > 0 {
        process::exit(1);
    }
}
