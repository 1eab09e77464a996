//! Command-line arguments for the `board` binary.

use std::path::PathBuf;

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use clap::Parser;
use deliberation::{DebateConfig, DebateEvent, DebateRequest};

use crate::config::load_company;

/// Run one board debate and stream its events as server-sent events on stdout.
#[derive(Debug, Clone, Parser)]
#[command(name = "board", version, about)]
pub struct Cli {
    /// Question put to the board.
    #[arg(long)]
    pub topic: String,

    /// Company profile (TOML).
    #[arg(long)]
    pub company: Option<PathBuf>,

    /// Board file with `[[providers]]` and `[[roster]]` (TOML).
    #[arg(long)]
    pub roster: Option<PathBuf>,

    /// Debate tuning: scheduler, voting, pacing, enrichment (TOML).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Image attached to the question.
    #[arg(long)]
    pub image: Option<PathBuf>,

    /// Answer language; defaults to the language of the topic.
    #[arg(long)]
    pub language: Option<String>,

    /// Seed for speaker routing.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Append every persisted message to this JSON lines file.
    #[arg(long)]
    pub transcript: Option<PathBuf>,

    /// Write the finished session record (JSON) here.
    #[arg(long)]
    pub record: Option<PathBuf>,

    /// Past-decision memory file (JSON), created on first save.
    #[arg(long)]
    pub memory: Option<PathBuf>,

    /// Skip website, search and image enrichment.
    #[arg(long)]
    pub no_enrichment: bool,

    /// Check that every provider endpoint answers before starting.
    #[arg(long)]
    pub check_endpoints: bool,
}

impl Cli {
    /// Debate configuration with command-line overrides applied.
    pub fn debate_config(&self) -> Result<DebateConfig> {
        let mut config = match &self.config {
            Some(path) => DebateConfig::load(path)
                .with_context(|| format!("Failed to load debate config {}", path.display()))?,
            None => DebateConfig::default(),
        };
        if let Some(seed) = self.seed {
            config.scheduler.seed = Some(seed);
        }
        if let Some(language) = &self.language {
            config.language = Some(language.clone());
        }
        if self.no_enrichment {
            config.enrichment.website = false;
            config.enrichment.web_search = false;
            config.enrichment.image = false;
        }
        Ok(config)
    }

    pub async fn request(&self) -> Result<DebateRequest> {
        let mut request = DebateRequest::new(self.topic.trim());
        if let Some(path) = &self.company {
            request = request.with_company(load_company(path)?);
        }
        if let Some(path) = &self.image {
            let bytes = tokio::fs::read(path)
                .await
                .with_context(|| format!("Failed to read image {}", path.display()))?;
            request = request.with_image(STANDARD.encode(bytes));
        }
        Ok(request)
    }
}

/// One server-sent event frame: `data: {json}` and a blank line.
pub fn sse_frame(event: &DebateEvent) -> serde_json::Result<String> {
    Ok(format!("data: {}\n\n", serde_json::to_string(event)?))
}
