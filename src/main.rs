use clap::Parser;
use std::process::ExitCode;

use promptlens::LensError;
use promptlens::classify::Classifier;
use promptlens::cli::{Cli, Command};
use promptlens::config::load_config;
use promptlens::report;

fn run() -> Result<(), LensError> {
    let cli = Cli::parse();
    let config = load_config()?;

    match cli.command {
        Command::Analyze(args) => report::handle_analyze(&args, &config),
        Command::Classify(args) => {
            let classifier = Classifier::from_config(&config.classify)?;
            let explained = classifier.explain(&args.text);
            println!("{}", serde_json::to_string_pretty(&explained)?);
            Ok(())
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("promptlens: {e}");
            ExitCode::from(1)
        }
    }
}
