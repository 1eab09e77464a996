use std::sync::Arc;

use anyhow::{Context, Result};
use board_agents::cli::{sse_frame, Cli};
use board_agents::providers::check_endpoint;
use board_agents::{BoardConfig, HttpEnricher, ProviderRegistry};
use clap::Parser;
use deliberation::{
    Collaborators, DebateOrchestrator, EventSink, InMemoryStore, JsonlPersister, MemoryStore,
};
use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries the event stream; logs go to stderr.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let board = BoardConfig::resolve(cli.roster.as_deref())?;
    let debate = cli.debate_config()?;

    if cli.check_endpoints {
        for provider in &board.providers {
            if check_endpoint(&provider.base_url).await {
                info!(provider = %provider.id, url = %provider.base_url, "Endpoint reachable");
            } else {
                warn!(provider = %provider.id, url = %provider.base_url, "Endpoint unreachable");
            }
        }
    }

    let registry = ProviderRegistry::from_config(&board)?;
    let roster = registry
        .roster(&board.roster)
        .context("Failed to assemble the board roster")?;

    let memory: Arc<dyn MemoryStore> = match &cli.memory {
        Some(path) => Arc::new(
            InMemoryStore::open(path)
                .await
                .with_context(|| format!("Failed to open memory file {}", path.display()))?,
        ),
        None => Arc::new(InMemoryStore::new()),
    };
    let mut collaborators = Collaborators::default()
        .with_memory(memory)
        .with_enricher(Arc::new(HttpEnricher::from_config(&board)?));
    if let Some(path) = &cli.transcript {
        collaborators = collaborators.with_persister(Arc::new(JsonlPersister::new(path)));
    }

    let request = cli.request().await?;
    info!(
        topic = %request.topic,
        debaters = roster.len(),
        moderator = %roster.moderator().name(),
        "Board convening"
    );

    let orchestrator = DebateOrchestrator::new(roster, collaborators, debate);
    let (sink, mut events) = EventSink::channel(orchestrator.config().event_buffer);
    let task = tokio::spawn(async move { orchestrator.run(request, &sink).await });

    let mut stdout = tokio::io::stdout();
    while let Some(event) = events.next().await {
        let frame = sse_frame(&event).context("Failed to serialize event")?;
        stdout.write_all(frame.as_bytes()).await?;
        stdout.flush().await?;
    }

    let outcome = task.await.context("Debate task panicked")??;
    if let Some(path) = &cli.record {
        outcome
            .to_record()
            .write_to(path)
            .await
            .with_context(|| format!("Failed to write session record {}", path.display()))?;
        info!(path = %path.display(), "Session record written");
    }
    info!("{}", outcome.summary_line());

    Ok(())
}
