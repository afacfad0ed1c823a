//! Command-line client for the proposal intake service.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use proposal_intake::client::presenter::{self, DocumentExport};
use proposal_intake::client::{
    AnalysisSession, HttpTransport, LifecycleState, NoticeLevel, Notifier, SystemBrowser,
    TerminalEvent, Timing, TracingNotifier, UploadCandidate,
};
use proposal_intake::logging;

#[derive(Parser)]
#[command(name = "proposal-cli")]
#[command(about = "Analyze PDF proposals with the proposal intake service")]
#[command(version)]
struct Cli {
    /// Base URL of the analysis service
    #[arg(long, global = true, env = "PROPOSAL_SERVER_URL", default_value = "http://localhost:5000")]
    server: String,

    /// Save the result as JSON into this directory
    #[arg(long, global = true, value_name = "DIR")]
    json_out: Option<PathBuf>,

    /// Open the printable HTML report when done
    #[arg(long, global = true)]
    html: bool,

    /// Where reports go when no viewer can be opened (default: Downloads)
    #[arg(long, global = true, env = "PROPOSAL_DOWNLOAD_DIR")]
    download_dir: Option<PathBuf>,

    /// Demo and fallback pacing in milliseconds
    #[arg(long, global = true, default_value = "2000")]
    pacing_ms: u64,

    /// Request timeout in seconds
    #[arg(long, global = true, env = "PROPOSAL_TIMEOUT_SECONDS", default_value = "150")]
    timeout_seconds: u64,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a PDF proposal and print its analysis
    Analyze {
        /// Path to the PDF
        path: PathBuf,
    },

    /// Show the sample analysis without contacting the service
    Demo,
}

/// Prints notices to stderr, keeping stdout for results.
struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, level: NoticeLevel, message: &str) {
        eprintln!("[{}] {}", level, message);
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    logging::init_cli_logging(cli.verbose);
    run(&cli).await
}

/// Exit status when the chosen file was rejected before upload.
const EXIT_REJECTED: u8 = 2;

async fn run(cli: &Cli) -> Result<ExitCode> {
    let pacing = Duration::from_millis(cli.pacing_ms);
    let transport = HttpTransport::new(&cli.server, Duration::from_secs(cli.timeout_seconds))?;
    tracing::debug!(endpoint = %transport.endpoint(), "Using analysis endpoint");

    // Verbose runs fold notices into the log stream
    let notifier: Arc<dyn Notifier> = if cli.verbose {
        Arc::new(TracingNotifier)
    } else {
        Arc::new(ConsoleNotifier)
    };
    let session = AnalysisSession::new(
        Arc::new(transport),
        notifier,
        Timing {
            demo_delay: pacing,
            fallback_delay: pacing,
            min_visible_loading: None,
        },
    );
    spawn_progress(&session);

    let event = match &cli.command {
        Commands::Analyze { path } => {
            let bytes = std::fs::read(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("proposal.pdf")
                .to_string();

            match session.upload(UploadCandidate::from_name(name, bytes)).await {
                Ok(event) => event,
                // Already reported through the notifier
                Err(_) => return Ok(ExitCode::from(EXIT_REJECTED)),
            }
        }
        Commands::Demo => session.run_demo().await,
    };

    match event {
        TerminalEvent::Succeeded(_) | TerminalEvent::FailedOverToDemo(_) => {
            println!("{}", presenter::render_state(&session.state()));
            if let Some(result) = session.state().result() {
                export(cli, result)?;
            }
            Ok(ExitCode::SUCCESS)
        }
        TerminalEvent::Errored(message) => bail!("{}", message),
        TerminalEvent::Cancelled => bail!("Analysis was cancelled"),
    }
}

/// Echo in-progress states to stderr.
fn spawn_progress(session: &AnalysisSession) {
    let mut states = session.subscribe();
    tokio::spawn(async move {
        while states.changed().await.is_ok() {
            let state = states.borrow_and_update().clone();
            if matches!(state, LifecycleState::Analyzing { .. }) {
                eprintln!("{}", presenter::render_state(&state));
            }
        }
    });
}

fn export(cli: &Cli, result: &proposal_intake::domain::AnalysisResult) -> Result<()> {
    if let Some(dir) = &cli.json_out {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        let path = presenter::save_json(result, dir)?;
        eprintln!("Saved JSON to {}", path.display());
    }

    if cli.html {
        let download_dir = download_dir(cli.download_dir.as_deref())?;
        match presenter::export_document(result, &SystemBrowser, &download_dir)? {
            DocumentExport::Opened => eprintln!("Opened report in your browser"),
            DocumentExport::Downloaded(path) => {
                eprintln!("Could not open a browser; saved report to {}", path.display())
            }
        }
    }
    Ok(())
}

fn download_dir(explicit: Option<&Path>) -> Result<PathBuf> {
    let dir = match explicit {
        Some(dir) => dir.to_path_buf(),
        None => dirs::download_dir()
            .or_else(dirs::home_dir)
            .context("Could not determine a download directory; pass --download-dir")?,
    };
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["proposal-cli", "--pacing-ms", "0"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[tokio::test]
    async fn test_rejected_file_returns_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"not a proposal").unwrap();

        let code = run(&cli(&["analyze", path.to_str().unwrap()])).await.unwrap();

        assert_eq!(code, ExitCode::from(EXIT_REJECTED));
    }

    #[tokio::test]
    async fn test_demo_saves_json() {
        let dir = tempfile::tempdir().unwrap();

        let code = run(&cli(&["--json-out", dir.path().to_str().unwrap(), "demo"]))
            .await
            .unwrap();

        assert_eq!(code, ExitCode::SUCCESS);
        assert!(dir
            .path()
            .join("proposal-analysis-sample-proposal.json")
            .exists());
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let result = run(&cli(&["analyze", "/nonexistent/bid.pdf"])).await;
        assert!(result.is_err());
    }
}
