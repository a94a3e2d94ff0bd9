use std::process;

use clap::Parser;
use colored::Colorize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use git_precommit::app;
use git_precommit::cli::Args;
use git_precommit::Error;

fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    match app::run(args) {
        Ok(code) => process::exit(code),
        Err(Error::Cancelled) => process::exit(1),
        Err(err) => {
            println!("{} {}", "x".red(), err.to_string().red());
            process::exit(1);
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    let env_filter = EnvFilter::builder()
        .with_default_directive(default.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}
