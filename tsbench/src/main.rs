//! Entrypoint of the tsbench binary

use std::num::NonZeroUsize;

use dotenvy::dotenv;
use trogging::cli::{LoggingConfig, LoggingConfigBuilderExt};

mod commands {
    pub(crate) mod common;
    pub(crate) mod generate_queries;
    pub(crate) mod query_types;
    pub(crate) mod run_queries;
}

enum ReturnCode {
    Failure = 1,
}

#[derive(Debug, clap::Parser)]
#[clap(
    name = "tsbench",
    version,
    about = "Time series database query benchmarking suite",
    long_about = r#"Time series database query benchmarking suite

Examples:
    # Generate 1000 TimescaleDB queries for a simulated fleet of 100 hosts
    tsbench generate-queries --format timescaledb --query-type single-groupby-1-1-1 --scale 100 --file queries.bin

    # Replay them with 4 workers through the no-op processor, warming every query
    tsbench run-queries --file queries.bin --workers 4 --prewarm-queries

    # List the query types and the formats that support them
    tsbench query-types

    # Run with debug logging specified with LOG_FILTER
    LOG_FILTER=debug tsbench run-queries --file queries.bin
"#
)]
struct Config {
    #[clap(flatten)]
    logging_config: LoggingConfig,

    /// Number of runtime threads used by `run-queries`, defaults to the number of cores
    #[clap(
        long = "num-threads",
        env = "TSBENCH_NUM_THREADS",
        global = true,
        action
    )]
    num_threads: Option<NonZeroUsize>,

    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, clap::Parser)]
enum Command {
    /// Generate a query stream for one query type and database format
    GenerateQueries(commands::generate_queries::Config),

    /// Replay a query stream and report latency statistics
    RunQueries(commands::run_queries::Config),

    /// List the supported query types
    QueryTypes(commands::query_types::Config),
}

fn main() -> Result<(), std::io::Error> {
    // load all environment variables from .env before doing anything
    load_dotenv();

    let config: Config = clap::Parser::parse();

    if let Err(e) = init_logs(&config.logging_config) {
        eprintln!("Initializing logs failed: {e}");
        std::process::exit(ReturnCode::Failure as _);
    }

    match config.command {
        None => println!("command required, -h/--help for help"),
        Some(Command::GenerateQueries(command_config)) => {
            if let Err(e) = commands::generate_queries::command(command_config) {
                eprintln!("Generate queries command failed: {e}");
                std::process::exit(ReturnCode::Failure as _)
            }
        }
        Some(Command::QueryTypes(command_config)) => {
            if let Err(e) = commands::query_types::command(command_config) {
                eprintln!("Query types command failed: {e}");
                std::process::exit(ReturnCode::Failure as _)
            }
        }
        Some(Command::RunQueries(command_config)) => {
            let mut builder = tokio::runtime::Builder::new_multi_thread();
            if let Some(num_threads) = config.num_threads {
                builder.worker_threads(num_threads.get());
            }
            let tokio_runtime = builder.enable_all().build()?;

            tokio_runtime.block_on(async move {
                if let Err(e) = commands::run_queries::command(command_config).await {
                    eprintln!("Run queries command failed: {e}");
                    std::process::exit(ReturnCode::Failure as _)
                }
            });
        }
    }

    Ok(())
}

/// Source the .env file before initialising the Config struct - this sets
/// any envs in the file, which the Config struct then uses.
///
/// Precedence is given to existing env variables.
fn load_dotenv() {
    match dotenv() {
        Ok(_) => {}
        Err(dotenvy::Error::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {
            // a missing env file is not an error, defaults apply
        }
        Err(e) => {
            eprintln!("FATAL Error loading config from: {e}");
            eprintln!("Aborting");
            std::process::exit(ReturnCode::Failure as _);
        }
    };
}

fn init_logs(config: &LoggingConfig) -> Result<(), trogging::Error> {
    trogging::Builder::new()
        .with_default_log_filter("info")
        .with_logging_config(config)
        .install_global()
}
