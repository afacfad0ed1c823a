//! Rendering and export of analysis results.
//!
//! Everything here is derived from in-memory state; nothing talks to the
//! analysis service.

use anyhow::{Context, Result};
use askama::Template;
use std::fmt::Write as _;
use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;
use tracing::{debug, info};

use super::session::LifecycleState;
use crate::domain::AnalysisResult;

#[derive(Template)]
#[template(path = "analysis_report.html")]
struct AnalysisReportTemplate<'a> {
    result: &'a AnalysisResult,
    file_name: &'a str,
    file_size: u64,
    processed_at: String,
}

/// Serialize a result exactly as the service sent it.
pub fn export_json(result: &AnalysisResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("Failed to serialize analysis")
}

/// Write the JSON export into `dir` and return the file path.
pub fn save_json(result: &AnalysisResult, dir: &Path) -> Result<PathBuf> {
    let path = dir.join(export_file_name(result, "json"));
    fs::write(&path, export_json(result)?)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!(path = %path.display(), "Saved analysis JSON");
    Ok(path)
}

/// Printable HTML report. All fields are HTML-escaped.
pub fn render_document(result: &AnalysisResult) -> Result<String> {
    AnalysisReportTemplate {
        result,
        file_name: &result.metadata.file_name,
        file_size: result.metadata.file_size,
        processed_at: result
            .metadata
            .processed_at
            .format("%Y-%m-%d %H:%M UTC")
            .to_string(),
    }
    .render()
    .context("Failed to render analysis report")
}

#[derive(Debug, Error)]
pub enum ViewerError {
    /// No viewing context could be opened (popup blocked, no opener).
    #[error("viewer unavailable: {0}")]
    Blocked(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Opens a rendered report for the user to read or print.
pub trait DocumentViewer {
    fn open(&self, title: &str, html: &str) -> Result<(), ViewerError>;
}

/// Where a document export ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentExport {
    Opened,
    Downloaded(PathBuf),
}

/// Render the report and show it; save it to `download_dir` when the viewer
/// is blocked.
pub fn export_document(
    result: &AnalysisResult,
    viewer: &dyn DocumentViewer,
    download_dir: &Path,
) -> Result<DocumentExport> {
    let html = render_document(result)?;

    match viewer.open(&result.metadata.file_name, &html) {
        Ok(()) => Ok(DocumentExport::Opened),
        Err(ViewerError::Blocked(reason)) => {
            debug!(%reason, "Viewer blocked, downloading report instead");
            let path = download_dir.join(export_file_name(result, "html"));
            fs::write(&path, html)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            Ok(DocumentExport::Downloaded(path))
        }
        Err(ViewerError::Other(e)) => Err(e),
    }
}

fn export_file_name(result: &AnalysisResult, extension: &str) -> String {
    let stem = Path::new(&result.metadata.file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("proposal");
    let stem: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
        .collect();
    format!("proposal-analysis-{}.{}", stem, extension)
}

/// Writes the report to a kept temp file and hands it to the platform opener.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemBrowser;

impl DocumentViewer for SystemBrowser {
    fn open(&self, _title: &str, html: &str) -> Result<(), ViewerError> {
        let mut file = tempfile::Builder::new()
            .prefix("proposal-analysis-")
            .suffix(".html")
            .tempfile()
            .context("Failed to create report file")?;
        file.write_all(html.as_bytes())
            .context("Failed to write report file")?;
        let (_, path) = file.keep().context("Failed to keep report file")?;

        let status = opener(&path)
            .status()
            .map_err(|e| ViewerError::Blocked(e.to_string()))?;
        if !status.success() {
            return Err(ViewerError::Blocked(format!("opener exited with {}", status)));
        }
        Ok(())
    }
}

#[cfg(target_os = "macos")]
fn opener(path: &Path) -> Command {
    let mut command = Command::new("open");
    command.arg(path);
    command
}

#[cfg(target_os = "windows")]
fn opener(path: &Path) -> Command {
    let mut command = Command::new("cmd");
    command.args(["/C", "start", ""]).arg(path);
    command
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn opener(path: &Path) -> Command {
    let mut command = Command::new("xdg-open");
    command.arg(path);
    command
}

/// Plain-text view of the session state for a terminal.
pub fn render_state(state: &LifecycleState) -> String {
    match state {
        LifecycleState::Idle => "Ready. Select a PDF proposal to analyze.".to_string(),
        LifecycleState::Uploading(file) => {
            format!("Selected {} ({} bytes)", file.name, file.size())
        }
        LifecycleState::Analyzing { file: Some(file) } => format!("Analyzing {}...", file.name),
        LifecycleState::Analyzing { file: None } => "Preparing demo analysis...".to_string(),
        LifecycleState::Succeeded(result) => render_result(result, None),
        LifecycleState::FailedOverToDemo(result) => render_result(
            result,
            Some("Offline sample: the analysis service could not be reached."),
        ),
        LifecycleState::Errored(message) => format!("Analysis failed: {}", message),
    }
}

fn render_result(result: &AnalysisResult, banner: Option<&str>) -> String {
    let mut out = String::new();
    if let Some(banner) = banner {
        let _ = writeln!(out, "[{}]\n", banner);
    }
    let meta = &result.metadata;
    let _ = writeln!(
        out,
        "{} ({} bytes, {} characters, {})\n",
        meta.file_name,
        meta.file_size,
        meta.text_length,
        meta.processed_at.format("%Y-%m-%d %H:%M UTC")
    );

    let _ = writeln!(out, "EXECUTIVE SUMMARY\n{}\n", result.executive_summary);

    let _ = writeln!(out, "KEY REQUIREMENTS");
    for requirement in &result.key_requirements {
        let _ = writeln!(out, "  - {}", requirement);
    }

    let pricing = &result.pricing_overview;
    let _ = writeln!(out, "\nPRICING\n  Total: {}", pricing.total_amount);
    for line in &pricing.breakdown {
        let _ = writeln!(out, "  - {}", line);
    }
    let _ = writeln!(out, "  Payment terms: {}", pricing.payment_terms);

    let _ = writeln!(out, "\nNEXT STEPS");
    for (i, step) in result.recommended_next_steps.iter().enumerate() {
        let _ = writeln!(out, "  {}. {}", i + 1, step);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    use crate::domain::demo;

    struct BlockedViewer;

    impl DocumentViewer for BlockedViewer {
        fn open(&self, _title: &str, _html: &str) -> Result<(), ViewerError> {
            Err(ViewerError::Blocked("popup blocked".to_string()))
        }
    }

    #[derive(Default)]
    struct CapturingViewer {
        opened: Mutex<Vec<String>>,
    }

    impl DocumentViewer for CapturingViewer {
        fn open(&self, _title: &str, html: &str) -> Result<(), ViewerError> {
            self.opened.lock().push(html.to_string());
            Ok(())
        }
    }

    #[test]
    fn test_json_export_reproduces_result() {
        let result = demo::demo_result();
        let json = export_json(&result).unwrap();
        let parsed: AnalysisResult = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, result);
        assert!(json.contains("\"executiveSummary\""));
    }

    #[test]
    fn test_save_json_names_file_after_upload() {
        let dir = tempfile::tempdir().unwrap();
        let result = demo::fallback_result("Q3 Bid (final).pdf", 2048);

        let path = save_json(&result, dir.path()).unwrap();

        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "proposal-analysis-Q3-Bid--final-.json"
        );
        let saved: AnalysisResult =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved, result);
    }

    #[test]
    fn test_document_escapes_model_text() {
        let mut result = demo::demo_result();
        result.executive_summary = "<script>alert(1)</script> & more".to_string();

        let html = render_document(&result).unwrap();

        assert!(!html.contains("<script>alert(1)</script>"));
        assert!(html.contains("&lt;script&gt;"));
        for requirement in &result.key_requirements {
            assert!(html.contains(requirement.as_str()));
        }
    }

    #[test]
    fn test_export_document_opens_viewer() {
        let dir = tempfile::tempdir().unwrap();
        let viewer = CapturingViewer::default();

        let outcome = export_document(&demo::demo_result(), &viewer, dir.path()).unwrap();

        assert_eq!(outcome, DocumentExport::Opened);
        assert_eq!(viewer.opened.lock().len(), 1);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_blocked_viewer_downloads_report() {
        let dir = tempfile::tempdir().unwrap();
        let result = demo::demo_result();

        let outcome = export_document(&result, &BlockedViewer, dir.path()).unwrap();

        let DocumentExport::Downloaded(path) = outcome else {
            panic!("expected a download");
        };
        assert_eq!(path, dir.path().join("proposal-analysis-sample-proposal.html"));
        assert_eq!(fs::read_to_string(&path).unwrap(), render_document(&result).unwrap());
    }

    #[test]
    fn test_render_state_labels_offline_sample() {
        let result = demo::fallback_result("bid.pdf", 10);

        let text = render_state(&LifecycleState::FailedOverToDemo(result.clone()));
        assert!(text.starts_with("[Offline sample"));
        assert!(text.contains(&result.pricing_overview.total_amount));

        let text = render_state(&LifecycleState::Succeeded(result));
        assert!(text.starts_with("bid.pdf"));

        assert_eq!(
            render_state(&LifecycleState::Errored("File too large".to_string())),
            "Analysis failed: File too large"
        );
    }
}
