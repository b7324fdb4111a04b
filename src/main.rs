use clap::Parser;
use env_logger::Env;
use sales_loader::config::DbParams;
use sales_loader::error::EtlError;
use sales_loader::load::{DEFAULT_QUEUE_CAPACITY, DEFAULT_WORKERS, PipelineOptions, RunSummary};
use sales_loader::{db, load};
use std::fs::File;
use std::path::PathBuf;

/// Load a sales-record CSV export into the relational sales tables.
#[derive(Debug, Parser)]
#[command(name = "sales-loader", version)]
struct Args {
    /// Path to the delimited sales export
    #[arg(long, default_value = "sales_data.csv")]
    input: PathBuf,

    /// Path to the database settings file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Number of concurrent loader workers
    #[arg(long, default_value_t = DEFAULT_WORKERS)]
    workers: usize,

    /// Capacity of the decoder-to-loader queue
    #[arg(long, default_value_t = DEFAULT_QUEUE_CAPACITY)]
    queue_capacity: usize,
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    match run(args).await {
        Ok(summary) => println!("{summary}"),
        Err(error) => {
            log::error!("{}", error);
            std::process::exit(1);
        }
    }
}

async fn run(args: Args) -> Result<RunSummary, EtlError> {
    let params = DbParams::from_file(&args.config)?;

    let file = File::open(&args.input)?;
    log::info!("loading {}", args.input.display());

    // One connection per worker plus one for setup work.
    let pool = params.connect(args.workers as u32 + 1).await?;

    db::run_migrations(&pool).await?;

    let options = PipelineOptions {
        workers: args.workers,
        queue_capacity: args.queue_capacity,
    };

    load::run(file, pool, options).await
}
