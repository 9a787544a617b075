use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;
use tickmerge::config::{MalformedPolicy, MergeConfig};
use tickmerge::{MergeError, Merger, init_tracing};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "tickmerge")]
#[command(about = "Merge per-symbol sorted tick files into one time-ordered file", long_about = None)]
struct Cli {
    /// Directory holding one sorted tick file per symbol
    #[arg(short, long)]
    input: Option<PathBuf>,
    /// Merged output file
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// JSON config file; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,
    /// Bootstrap worker threads
    #[arg(long)]
    workers: Option<usize>,
    /// Records read from a source per load
    #[arg(long)]
    chunk_size: Option<usize>,
    /// Maximum number of source files open at once
    #[arg(long)]
    handle_budget: Option<usize>,
    /// What to do with lines that fail to parse
    #[arg(long, value_enum)]
    malformed: Option<MalformedPolicy>,
    /// Print the run report as JSON
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn into_config(self) -> Result<(MergeConfig, bool), MergeError> {
        let mut config = match &self.config {
            Some(path) => MergeConfig::from_file(path)?,
            None => MergeConfig::default(),
        };
        if let Some(input) = self.input {
            config.input_dir = input;
        }
        if let Some(output) = self.output {
            config.output_path = output;
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(chunk_size) = self.chunk_size {
            config.chunk_size = chunk_size;
        }
        if let Some(handle_budget) = self.handle_budget {
            config.handle_budget = handle_budget;
        }
        if let Some(malformed) = self.malformed {
            config.malformed = malformed;
        }
        Ok((config, self.json))
    }
}

fn run(cli: Cli) -> Result<(), MergeError> {
    let (config, json) = cli.into_config()?;
    let started = Instant::now();

    let report = Merger::new(config)?.run()?;

    info!(seconds = started.elapsed().as_secs_f64(), "time taken");
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report);
    }
    Ok(())
}

fn main() -> ExitCode {
    init_tracing("tickmerge");
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "merge failed");
            ExitCode::FAILURE
        }
    }
}
