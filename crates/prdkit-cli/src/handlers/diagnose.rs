//! Diagnose command handler.
//!
//! Checks that the web server answers on its port and that Ollama is
//! reachable with the expected model pulled.

use std::fmt;
use std::time::Duration;

use anyhow::Result;
use prdkit_core::{BackendError, ModelCatalogPort, ModelPreference, ModelSource};
use prdkit_proxy::OllamaClient;
use tracing::debug;

/// Time allowed for each check.
pub const CHECK_TIMEOUT: Duration = Duration::from_secs(2);

/// Result of probing the web server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppStatus {
    /// Something answered with this HTTP status.
    Responding { status: u16 },
    /// Nothing answered in time.
    Timeout,
    /// The connection was refused or failed.
    Unreachable,
}

/// Result of probing Ollama's model listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendStatus {
    /// Ollama answered with a model listing.
    Reachable { model_present: bool },
    /// Ollama answered, but not with a model listing.
    InvalidListing,
    /// Ollama could not be reached.
    Unreachable,
}

/// Both checks together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub app_url: String,
    pub app: AppStatus,
    pub tags_url: String,
    pub model: String,
    pub backend: BackendStatus,
}

impl fmt::Display for AppStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Responding { status } => write!(f, "responding (HTTP {status})"),
            Self::Timeout => f.write_str("timeout"),
            Self::Unreachable => f.write_str("connection refused"),
        }
    }
}

impl fmt::Display for BackendStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reachable {
                model_present: true,
            } => f.write_str("reachable, model present"),
            Self::Reachable {
                model_present: false,
            } => f.write_str("reachable, model NOT pulled"),
            Self::InvalidListing => f.write_str("reachable, invalid JSON response"),
            Self::Unreachable => f.write_str("unreachable"),
        }
    }
}

/// Probe the web server root.
pub async fn check_app(url: &str) -> Result<AppStatus> {
    let client = reqwest::Client::builder().timeout(CHECK_TIMEOUT).build()?;
    let status = match client.get(url).send().await {
        Ok(response) => AppStatus::Responding {
            status: response.status().as_u16(),
        },
        Err(e) if e.is_timeout() => AppStatus::Timeout,
        Err(e) => {
            debug!("App check failed: {e}");
            AppStatus::Unreachable
        }
    };
    Ok(status)
}

/// Probe Ollama's model listing for `model`.
pub async fn check_backend(client: &OllamaClient, model: &str) -> BackendStatus {
    match client.list_model_names().await {
        Ok(names) => {
            let preference = ModelPreference {
                preferred: model.to_string(),
                ..ModelPreference::default()
            };
            BackendStatus::Reachable {
                model_present: preference.select(&names).source == ModelSource::Preferred,
            }
        }
        Err(BackendError::InvalidResponse(e)) => {
            debug!("Model listing was not understood: {e}");
            BackendStatus::InvalidListing
        }
        Err(e) => {
            debug!("Backend check failed: {e}");
            BackendStatus::Unreachable
        }
    }
}

/// Run both checks.
pub async fn run(app_url: &str, ollama_url: &str, model: &str) -> Result<Report> {
    let client = OllamaClient::new(ollama_url)?.with_probe_timeout(CHECK_TIMEOUT);
    let app = check_app(app_url).await?;
    let backend = check_backend(&client, model).await;

    Ok(Report {
        app_url: app_url.to_string(),
        app,
        tags_url: client.tags_url().to_string(),
        model: model.to_string(),
        backend,
    })
}

/// Execute the diagnose command.
pub async fn execute(port: u16, ollama_url: &str, model: &str) -> Result<()> {
    let app_url = format!("http://localhost:{port}/");
    let report = run(&app_url, ollama_url, model).await?;

    println!("--- DIAGNOSTIC START ---");
    println!("Web server ({}): {}", report.app_url, report.app);
    println!("Ollama ({}): {}", report.tags_url, report.backend);
    if let BackendStatus::Reachable {
        model_present: false,
    } = report.backend
    {
        println!("  Pull it with: ollama pull {}", report.model);
    }
    println!("--- DIAGNOSTIC END ---");
    Ok(())
}
