// vidgrab - interactive video downloader built on yt-dlp

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

use vidgrab::config::AppConfig;
use vidgrab::downloader::extractors::{MediaExtractor, ProbeEngine, YtDlpCli};
use vidgrab::downloader::orchestrator::DownloadOrchestrator;
use vidgrab::downloader::tools::ToolManager;
use vidgrab::downloader::update_check::{FileStampStore, SystemClock, UpdateChecker};
use vidgrab::shell::Shell;

#[derive(Parser)]
#[command(
    name = "vidgrab",
    version,
    about = "Download videos from YouTube, Vimeo, HLS/DASH streams and direct links"
)]
struct Args {
    /// Video URL; skips the first prompt
    url: Option<String>,

    /// Config file [default: <config dir>/vidgrab/config.toml]
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace); RUST_LOG overrides it
    #[arg(long, default_value = "warn")]
    verbosity: String,

    /// Do not compare yt-dlp against the latest release
    #[arg(long)]
    skip_update_check: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(&args.verbosity);

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to start runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(run(args));
    // A pending stdin read must not keep the process alive
    runtime.shutdown_background();

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("\nUnexpected error: {:#}", e);
            eprintln!("Try again or check your internet connection.");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbosity: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("vidgrab={}", verbosity)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(args: Args) -> Result<u8> {
    let config = AppConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    let program = ToolManager::new().locate(config.tools.ytdlp_path.as_deref());
    tracing::debug!("Using yt-dlp at {}", program);

    if config.tools.update_check && !args.skip_update_check {
        if let Some(store) = FileStampStore::default_location() {
            UpdateChecker::new(SystemClock, store, program.clone())
                .with_proxy(config.network.proxy.clone())
                .run()
                .await;
        }
    }

    let extractor: Arc<dyn MediaExtractor> =
        Arc::new(YtDlpCli::new(program).with_probe_timeout(config.network.probe_timeout));
    let probe = ProbeEngine::new(Arc::clone(&extractor), config.probe_chain());
    let orchestrator = DownloadOrchestrator::new(extractor, config.fetch_settings());

    let mut shell = Shell::new(
        BufReader::new(tokio::io::stdin()),
        std::io::stdout(),
        probe,
        orchestrator,
    )
    .with_default_output_dir(config.download.output_dir.clone())
    .with_default_format(config.download.default_format.clone())
    .with_console_progress(true);

    // Dropping the shell future kills a running yt-dlp child
    tokio::select! {
        outcome = shell.run(args.url) => {
            let outcome = outcome?;
            tracing::debug!("Session finished: {:?}", outcome);
            Ok(u8::try_from(outcome.exit_code()).unwrap_or(1))
        }
        _ = tokio::signal::ctrl_c() => {
            println!("\n\nDownload interrupted by user.");
            println!("Goodbye!");
            Ok(0)
        }
    }
}
