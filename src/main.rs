use clap::Parser;
use forg::cli::{Args, print_completions, run_cli};
use forg::output::OutputFormatter;
use std::io;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args = Args::parse();

    if let Some(shell) = args.completions {
        print_completions(shell, &mut io::stdout());
        return ExitCode::SUCCESS;
    }

    let default_filter = if args.verbose { "warn,forg=debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    match run_cli(&args) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            OutputFormatter::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}
