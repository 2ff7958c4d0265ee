use clap::{Parser, Subcommand};

mod cli;

use cli::diff::{cmd_diff, DiffArgs};
use cli::hash::{cmd_hash, HashArgs};
use cli::tree::{cmd_tree, TreeArgs};

#[derive(Parser)]
#[command(
    name = "ada",
    version,
    about = "Reverse-mode automatic differentiation of APL dfns"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Differentiate every dfn in a file, writing d<file> next to it
    Diff(DiffArgs),
    /// Print each dfn as lowered, without differentiating
    Tree(TreeArgs),
    /// Show content hashes of derivatives (BLAKE3)
    Hash(HashArgs),
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Diff(args) => cmd_diff(args),
        Command::Tree(args) => cmd_tree(args),
        Command::Hash(args) => cmd_hash(args),
    }
}
