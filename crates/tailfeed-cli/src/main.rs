mod commands;
mod logging;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "tailfeed",
    version,
    about = "Checkpointed ingestion of GitHub Discussion comment streams"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest new comments from a discussion, printing them as JSON lines
    Run {
        /// Repository in owner/name form
        repo: String,
        /// Discussion number to ingest
        discussion: u64,
        /// Checkpoint variable prefix
        #[arg(long, default_value = "discussion")]
        prefix: String,
        /// Per-event attempts, including the first one
        #[arg(long, default_value_t = 3)]
        retry_count: u32,
        /// Delay before the second attempt, in milliseconds
        #[arg(long, default_value_t = 0)]
        retry_delay_ms: u64,
        /// Multiplier applied to the delay after each wait
        #[arg(long, default_value_t = 1.0)]
        retry_backoff_factor: f64,
        /// Skip past permanently-failed events instead of aborting
        #[arg(long)]
        continue_on_error: bool,
        /// Stop after this many pages (for execution-time-limited hosts)
        #[arg(long)]
        max_pages: Option<u64>,
        /// Divert exhausted events to this discussion
        #[arg(long)]
        dead_letter_discussion: Option<u64>,
    },
    /// Generate synthetic comment traffic against a discussion
    Simulate {
        /// Repository in owner/name form
        repo: String,
        /// Discussion number to target
        discussion: u64,
        /// Steady-state comments per second
        #[arg(long, default_value_t = 1.0)]
        rate: f64,
        /// Steady-phase duration in seconds
        #[arg(long, default_value_t = 10)]
        duration: u64,
        /// Additional comments fired concurrently after the steady phase
        #[arg(long, default_value_t = 0)]
        burst: u32,
    },
    /// Pick the backing discussion for a partition key
    Shard {
        /// Partition key
        key: String,
        /// Candidate discussion numbers
        #[arg(required = true)]
        discussions: Vec<u64>,
    },
    /// Print the checkpoint variable and concurrency group for a discussion
    Vars {
        /// Discussion number
        discussion: u64,
        /// Checkpoint variable prefix
        #[arg(long, default_value = "discussion")]
        prefix: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    logging::init(&cli.log_level);

    match cli.command {
        Commands::Run {
            repo,
            discussion,
            prefix,
            retry_count,
            retry_delay_ms,
            retry_backoff_factor,
            continue_on_error,
            max_pages,
            dead_letter_discussion,
        } => {
            commands::run::execute(commands::run::RunParams {
                repo,
                discussion,
                prefix,
                retry_count,
                retry_delay_ms,
                retry_backoff_factor,
                continue_on_error,
                max_pages,
                dead_letter_discussion,
            })
            .await
        }
        Commands::Simulate {
            repo,
            discussion,
            rate,
            duration,
            burst,
        } => commands::simulate::execute(&repo, discussion, rate, duration, burst).await,
        Commands::Shard { key, discussions } => commands::shard::execute(&key, &discussions),
        Commands::Vars { discussion, prefix } => commands::vars::execute(discussion, &prefix),
    }
}
