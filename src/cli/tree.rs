use std::process;

use clap::Args;

use ada::config::Overrides;
use ada::oracle::ParserOracle;

use super::{read_source, report_failures, require_dfns, resolve_settings, InputArgs};

#[derive(Args)]
pub struct TreeArgs {
    #[command(flatten)]
    pub input: InputArgs,
}

/// Lower every dfn and render it back, to inspect what the differentiator
/// will see.
pub fn cmd_tree(args: TreeArgs) {
    let InputArgs { input, parser } = args.input;
    let settings = resolve_settings(
        &input,
        Overrides {
            parser,
            ..Overrides::default()
        },
    );
    let source = read_source(&input);
    let oracle = ParserOracle::new(&settings.parser);

    let outcomes = ada::process_file(&source, true, |dfn| ada::forward_source(dfn, &oracle));
    require_dfns(&outcomes, &input);
    println!("{}", ada::join_outputs(&outcomes));
    if report_failures(&outcomes, &input, &source) > 0 {
        process::exit(1);
    }
}
