use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use csim::{CacheGeometry, LruCache, Step, TraceReader, TraceRunner};

/// Replays a valgrind memory trace against a set-associative LRU cache.
#[derive(Debug, Parser)]
#[command(name = "csim")]
struct Cli {
    /// Number of set index bits (the cache has 2^s sets)
    #[arg(short = 's', value_name = "s")]
    set_index_bits: u32,
    /// Associativity (lines per set)
    #[arg(short = 'E', value_name = "E")]
    associativity: usize,
    /// Number of block bits (the block size is 2^b)
    #[arg(short = 'b', value_name = "b")]
    block_offset_bits: u32,
    /// Trace file to replay
    #[arg(short = 't', value_name = "tracefile")]
    trace_file: PathBuf,
    /// Print the outcome of every access
    #[arg(short = 'v')]
    verbose: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => return report_usage(&e),
    };
    tracing::debug!(?cli, "parsed arguments");

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Prints help or a usage error. Help goes to stdout and is not an error.
fn report_usage(e: &clap::Error) -> ExitCode {
    if let Err(io_error) = e.print() {
        tracing::warn!(%io_error, "unable to print usage");
    }

    if e.use_stderr() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let geometry =
        CacheGeometry::new(cli.set_index_bits, cli.associativity, cli.block_offset_bits)
            .context("unable to build cache")?;
    tracing::info!(%geometry, "cache geometry");

    let trace = TraceReader::open(&cli.trace_file).context("unable to open trace")?;

    let runner = TraceRunner::new(LruCache::new(geometry));
    let counters = runner
        .run_with(trace, |event, step| {
            if cli.verbose && *step != Step::Skipped {
                println!("{event} {step}");
            }
        })
        .with_context(|| format!("simulation of {} failed", cli.trace_file.display()))?;

    println!("{counters}");
    Ok(())
}
