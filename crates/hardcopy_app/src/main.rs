mod config;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use engine_logging::{engine_error, engine_info, LogDestination};
use hardcopy_engine::{BookLayout, Driver, RunOptions};
use log::LevelFilter;

use crate::config::{load_config, DEFAULT_CONFIG_FILENAME};

/// Save web articles as Markdown with local copies of their images.
#[derive(Parser, Debug)]
#[command(name = "hardcopy", version, about)]
struct Cli {
    /// Article URLs, processed in order
    #[arg(required = true)]
    urls: Vec<String>,

    /// Name appended to the weekly book label
    #[arg(short = 'p', long, default_value = "Articles")]
    postfix_override: String,

    /// Render the main document from the full page instead of the readable extract
    #[arg(short = 'r', long)]
    use_raw_html: bool,

    /// Allow long articles in a book with other articles
    #[arg(short = 'l', long)]
    ignore_long_articles: bool,

    /// Directory holding the weekly books (overrides the config file)
    #[arg(short = 'o', long)]
    output_root: Option<PathBuf>,

    /// RON config file
    #[arg(short = 'c', long, default_value = DEFAULT_CONFIG_FILENAME)]
    config: PathBuf,

    /// Log at debug level
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Also write the log to this file
    #[arg(long, value_name = "PATH", num_args = 0..=1, default_missing_value = engine_logging::DEFAULT_LOG_FILE)]
    log_file: Option<PathBuf>,
}

impl Cli {
    fn log_destination(&self) -> LogDestination {
        match &self.log_file {
            Some(path) => LogDestination::Both(path.clone()),
            None => LogDestination::Terminal,
        }
    }

    fn run_options(&self) -> RunOptions {
        RunOptions {
            use_raw_html: self.use_raw_html,
            ignore_long_articles: self.ignore_long_articles,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    engine_logging::initialize(cli.log_destination(), level);

    if let Err(err) = run(cli) {
        engine_error!("hardcopy failed: {:#}", err);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli.config);
    let output_root = cli
        .output_root
        .clone()
        .or_else(|| config.output_root.clone())
        .unwrap_or_else(|| PathBuf::from("."));
    let layout = BookLayout::current(&output_root);
    engine_info!(
        "Book {} in {:?}",
        layout.book_name(&cli.postfix_override),
        layout.root()
    );

    let driver = Driver::new(config.engine_settings()).context("failed to set up the HTTP client")?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start the async runtime")?;

    let outcomes = runtime
        .block_on(driver.run(&layout, &cli.urls, cli.run_options()))
        .with_context(|| format!("failed to write book {}", layout.label()))?;

    for outcome in &outcomes {
        engine_info!("{} -> {:?}", outcome.url, outcome.markdown_path);
        if !outcome.table_ids.is_empty() {
            engine_info!(
                "{} table screenshot(s) expected: {}",
                outcome.table_ids.len(),
                outcome.table_ids.join(", ")
            );
        }
    }
    Ok(())
}
