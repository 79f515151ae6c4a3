mod commands;
mod config;
mod logging;
mod render;
mod runner;

use std::path::Path;

use exam_core::model::TestDocument;
use exam_core::normalize;

use crate::config::Config;

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  exam-runner [run]   <test.json> [--duration <secs>] [--tick-ms <ms>]");
    eprintln!("                      [--audio-base <url>] [--auto-play] [-v]");
    eprintln!("  exam-runner inspect <test.json>");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  EXAM_DOCUMENT, EXAM_DURATION_SECS, EXAM_TICK_MS, EXAM_AUTO_PLAY,");
    eprintln!("  EXAM_AUDIO_BASE, EXAM_SUBMIT_URL, EXAM_SUBMIT_TOKEN, EXAM_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Run,
    Inspect,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "run" => Some(Self::Run),
            "inspect" => Some(Self::Inspect),
            _ => None,
        }
    }
}

fn load_document(path: &Path) -> anyhow::Result<TestDocument> {
    let raw = std::fs::read_to_string(path)
        .map_err(|err| anyhow::anyhow!("cannot read {}: {err}", path.display()))?;
    Ok(TestDocument::from_json(&raw)?)
}

async fn run() -> anyhow::Result<()> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    // Without a subcommand the first argument is the document to run.
    let cmd = match argv.first().map(String::as_str) {
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) => Command::from_arg(first).unwrap_or(Command::Run),
        None => Command::Run,
    };
    if argv.first().and_then(|a| Command::from_arg(a)).is_some() {
        argv.remove(0);
    }

    // Logging comes up before the environment is read so rejected values
    // are reported.
    logging::init(argv.iter().any(|a| a == "-v" || a == "--verbose"));
    let config = Config::from_env()
        .apply_args(&mut argv.into_iter())
        .map_err(|e| {
            eprintln!("{e}");
            print_usage();
            e
        })?;

    let path = config.document_path()?.to_path_buf();
    let doc = load_document(&path)?;

    match cmd {
        Command::Inspect => {
            print!("{}", render::outline(&normalize(&doc)));
            Ok(())
        }
        Command::Run => runner::run(&config, &path, &doc).await,
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err:#}");
        std::process::exit(2);
    }
}
