//! Scrolldump - scroll-driven search index export
//!
//! Runs either as an AWS Lambda function (one page per invocation, the
//! function re-invokes itself with the next cursor) or as a local command
//! that drives the same state machine to completion.
//!
//! # Usage
//!
//! ```bash
//! # Local export into a directory
//! scrolldump run --endpoint http://localhost:9200 --collection logs \
//!     --bucket dumps --output-dir ./out
//!
//! # Inside Lambda
//! scrolldump lambda
//! ```

use std::io::Read;
use std::sync::Arc;

use clap::CommandFactory;

use scrolldump::cli::{CliArgs, CliInterface, Commands, RunArgs};
use scrolldump::error::{DumpError, Result, StepResponse};
use scrolldump::export::{
    ElasticsearchClient, ExportJob, FilePageWriter, InlineScheduler, LogPageWriter, PageWriter,
    S3PageWriter,
};
use scrolldump::runtime;

/// Application entry point
#[tokio::main]
async fn main() {
    // Initialize the application and handle any errors
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Main application logic
///
/// 1. Parse command-line arguments and load configuration
/// 2. Initialize logging
/// 3. Dispatch the subcommand
async fn run() -> Result<()> {
    let cli = CliInterface::new()?;

    let lambda = match cli.args().command {
        Some(Commands::Lambda) => true,
        None => runtime::is_lambda_environment(),
        Some(_) => false,
    };
    initialize_logging(&cli, lambda);

    match &cli.args().command {
        Some(Commands::Run(args)) => run_local(&cli, args).await,
        Some(Commands::Step { payload }) => run_step(&cli, payload).await,
        Some(Commands::Config { show }) => show_config(&cli, *show),
        Some(Commands::Lambda) => runtime::serve(cli.config().clone()).await,
        None if lambda => runtime::serve(cli.config().clone()).await,
        None => {
            CliArgs::command().print_help()?;
            Ok(())
        }
    }
}

/// Run a whole export in this process
async fn run_local(cli: &CliInterface, args: &RunArgs) -> Result<()> {
    let config = cli.config();
    let state = args.job_state(config)?;

    let writer: Arc<dyn PageWriter> = match &args.output_dir {
        Some(dir) => Arc::new(FilePageWriter::new(dir)?),
        None if args.dry_run || config.debug => Arc::new(LogPageWriter),
        None => Arc::new(S3PageWriter::from_env().await),
    };

    let queue = Arc::new(InlineScheduler::new());
    let job = ExportJob::new(
        Arc::new(ElasticsearchClient::new(config.search_timeout())?),
        writer,
        queue.clone(),
        config.export.clone(),
    );

    let response = job.handle_inline(state.to_value()?, &queue).await;
    println!("{}", response.to_value());

    into_exit(response)
}

/// Run one step and print the continuation instead of dispatching it
async fn run_step(cli: &CliInterface, source: &str) -> Result<()> {
    let config = cli.config();
    let payload: serde_json::Value = serde_json::from_str(&read_payload(source)?)?;

    let writer: Arc<dyn PageWriter> = if config.debug {
        Arc::new(LogPageWriter)
    } else {
        Arc::new(S3PageWriter::from_env().await)
    };

    let queue = Arc::new(InlineScheduler::new());
    let job = ExportJob::new(
        Arc::new(ElasticsearchClient::new(config.search_timeout())?),
        writer,
        queue.clone(),
        config.export.clone(),
    );

    let response = job.handle(payload).await;
    let continuation = match queue.take() {
        Some(next) => next.to_value()?,
        None => serde_json::Value::Null,
    };

    println!(
        "{}",
        serde_json::json!({
            "response": response.to_value(),
            "continuation": continuation,
        })
    );

    into_exit(response)
}

/// Print the effective configuration
fn show_config(cli: &CliInterface, show: bool) -> Result<()> {
    if show {
        print!("{}", cli.config().to_toml()?);
    } else {
        println!("Configuration is valid");
    }
    Ok(())
}

fn read_payload(source: &str) -> Result<String> {
    if source == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        Ok(buf)
    } else {
        Ok(std::fs::read_to_string(source)?)
    }
}

/// Map an error response to a failing exit status
fn into_exit(response: StepResponse) -> Result<()> {
    match response.error_message() {
        Some(message) => Err(DumpError::Generic(message.to_string())),
        None => Ok(()),
    }
}

/// Initialize logging system based on verbosity level
///
/// Under Lambda, ANSI colors and timestamps are disabled; the platform adds
/// its own timestamps.
fn initialize_logging(cli: &CliInterface, lambda: bool) {
    let level = cli.log_level();

    // Build subscriber with level filter
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr);

    if lambda {
        subscriber.with_ansi(false).without_time().init();
    } else if cli.config().logging.timestamps {
        subscriber.init();
    } else {
        subscriber.without_time().init();
    }
}
