use std::path::PathBuf;
use std::process;

use clap::Args;

use ada::config::Overrides;
use ada::oracle::ParserOracle;

use super::{read_source, report_failures, require_dfns, resolve_settings, InputArgs};

#[derive(Args)]
pub struct DiffArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Output file (default: <prefix><input> next to the input)
    #[arg(short, long, conflicts_with = "stdout")]
    pub output: Option<PathBuf>,
    /// Print derivatives to stdout instead of writing a file
    #[arg(long)]
    pub stdout: bool,
    /// Prefix of the output file name (default: from ada.toml, else `d`)
    #[arg(long)]
    pub prefix: Option<String>,
    /// Stop at the first dfn that fails
    #[arg(long)]
    pub fail_fast: bool,
}

pub fn cmd_diff(args: DiffArgs) {
    let DiffArgs {
        input: InputArgs { input, parser },
        output,
        stdout,
        prefix,
        fail_fast,
    } = args;
    let settings = resolve_settings(
        &input,
        Overrides {
            parser,
            prefix,
            keep_going: fail_fast.then_some(false),
        },
    );
    let source = read_source(&input);
    let oracle = ParserOracle::new(&settings.parser);

    let outcomes = ada::differentiate_file(&source, &oracle, settings.keep_going);
    require_dfns(&outcomes, &input);
    let failed = report_failures(&outcomes, &input, &source);
    let text = ada::join_outputs(&outcomes);

    if stdout {
        println!("{}", text);
    } else {
        let out_path = output.unwrap_or_else(|| ada::output_path(&input, &settings.prefix));
        if let Err(e) = std::fs::write(&out_path, &text) {
            eprintln!("error: cannot write '{}': {}", out_path.display(), e);
            process::exit(1);
        }
        eprintln!(
            "Wrote {} derivative(s) to {}",
            outcomes.len() - failed,
            out_path.display()
        );
    }

    if failed > 0 {
        eprintln!("error: {} of {} dfn(s) failed", failed, outcomes.len());
        process::exit(1);
    }
}
