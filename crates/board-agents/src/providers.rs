//! Rig-backed model providers.
//!
//! Every configured provider becomes a [`RigBackend`] implementing the
//! engine's `Generate` capability. Clients are shared between providers that
//! point at the same endpoint with the same key; model selection happens via
//! the model name in each request.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use deliberation::{ChatMessage, ChatRole, Generate, GenerateError, Roster, RosterEntry, RosterError};
use rig::client::CompletionClient;
use rig::completion::{Chat, Message};
use rig::providers::openai;
use tracing::{debug, info, warn};

use crate::config::{BoardConfig, ProviderConfig};

/// Build an OpenAI-compatible completions client.
pub fn build_client(base_url: &str, api_key: &str) -> Result<openai::CompletionsClient> {
    openai::CompletionsClient::builder()
        .api_key(api_key)
        .base_url(base_url)
        .build()
        .with_context(|| format!("Failed to build completions client for {}", base_url))
}

/// One provider: a shared client plus the model and sampling settings.
#[derive(Clone)]
pub struct RigBackend {
    id: String,
    client: openai::CompletionsClient,
    model: String,
    temperature: f64,
    max_retries: u32,
}

impl RigBackend {
    pub fn new(provider: &ProviderConfig, client: openai::CompletionsClient) -> Self {
        Self {
            id: provider.id.clone(),
            client,
            model: provider.model.clone(),
            temperature: provider.temperature,
            max_retries: provider.max_retries,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl Generate for RigBackend {
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String, GenerateError> {
        let turn = Conversation::from_messages(messages);
        let mut builder = self.client.agent(&self.model).temperature(self.temperature);
        if !turn.preamble.is_empty() {
            builder = builder.preamble(&turn.preamble);
        }
        let agent = builder.build();
        let history: Vec<Message> = turn.history.iter().map(to_rig_message).collect();

        let mut attempt = 0;
        loop {
            match agent.chat(turn.prompt.as_str(), history.clone()).await {
                Ok(text) => {
                    debug!(provider = %self.id, model = %self.model, chars = text.len(), "completion received");
                    return Ok(text);
                }
                Err(e) => {
                    let err_str = format!("{e}");
                    let err_lower = err_str.to_ascii_lowercase();
                    if !is_transient_error(&err_str, &err_lower) || attempt >= self.max_retries {
                        return Err(classify_error(&self.id, &err_str));
                    }

                    let backoff = Duration::from_secs(2u64.pow(attempt + 1));
                    warn!(
                        provider = %self.id,
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        backoff_secs = backoff.as_secs(),
                        error = %err_str,
                        "Transient error, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
            }
        }
    }
}

/// Engine messages reshaped for a rig chat call.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Conversation {
    /// System messages, joined.
    preamble: String,
    /// Everything between the system messages and the final message.
    history: Vec<ChatMessage>,
    /// The final non-system message.
    prompt: String,
}

impl Conversation {
    fn from_messages(messages: &[ChatMessage]) -> Self {
        let preamble = messages
            .iter()
            .filter(|m| m.role == ChatRole::System)
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let mut history: Vec<ChatMessage> = messages
            .iter()
            .filter(|m| m.role != ChatRole::System)
            .cloned()
            .collect();

        match history.pop() {
            Some(last) => Self {
                preamble,
                history,
                prompt: last.content,
            },
            // A system-only request is sent as the prompt itself.
            None => Self {
                preamble: String::new(),
                history,
                prompt: preamble,
            },
        }
    }
}

fn to_rig_message(message: &ChatMessage) -> Message {
    match message.role {
        ChatRole::Assistant => Message::assistant(message.content.clone()),
        ChatRole::System | ChatRole::User => Message::user(message.content.clone()),
    }
}

/// Whether an API error is transient (connection failures, rate limits,
/// proxy hiccups) rather than permanent (auth errors, unknown models).
fn is_transient_error(err_str: &str, err_lower: &str) -> bool {
    err_str.contains("502")
        || err_str.contains("503")
        || err_str.contains("429")
        || err_lower.contains("connection")
        || err_lower.contains("timed out")
        || err_lower.contains("timeout")
        || err_lower.contains("error sending request")
        || err_lower.contains("broken pipe")
        || err_lower.contains("reset by peer")
}

fn classify_error(provider: &str, err_str: &str) -> GenerateError {
    let lower = err_str.to_ascii_lowercase();
    if err_str.contains("429") || lower.contains("rate limit") || lower.contains("quota") {
        GenerateError::RateLimited(format!("{}: {}", provider, err_str))
    } else {
        GenerateError::Provider(format!("{}: {}", provider, err_str))
    }
}

/// Configured providers, by id.
pub struct ProviderRegistry {
    backends: HashMap<String, Arc<RigBackend>>,
}

impl ProviderRegistry {
    pub fn from_config(config: &BoardConfig) -> Result<Self> {
        let mut clients: HashMap<(String, String), openai::CompletionsClient> = HashMap::new();
        let mut backends = HashMap::new();

        for provider in &config.providers {
            let api_key = provider.api_key();
            let key = (provider.base_url.clone(), api_key.clone());
            let client = match clients.get(&key) {
                Some(client) => client.clone(),
                None => {
                    let client = build_client(&provider.base_url, &api_key)
                        .with_context(|| format!("Failed to build provider {}", provider.id))?;
                    clients.insert(key, client.clone());
                    client
                }
            };
            backends.insert(provider.id.clone(), Arc::new(RigBackend::new(provider, client)));
        }

        info!(
            providers = backends.len(),
            clients = clients.len(),
            "Model providers ready"
        );
        Ok(Self { backends })
    }

    pub fn resolve(&self, id: &str) -> Option<Arc<dyn Generate>> {
        self.backends
            .get(id)
            .map(|backend| backend.clone() as Arc<dyn Generate>)
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    /// Resolve every roster entry against the registry.
    pub fn roster(&self, entries: &[RosterEntry]) -> Result<Roster, RosterError> {
        Roster::from_entries(entries, |id| self.resolve(id))
    }
}

/// Check if an endpoint is reachable.
pub async fn check_endpoint(url: &str) -> bool {
    let models_url = format!("{}/models", url.trim_end_matches('/'));
    match reqwest::Client::new()
        .get(&models_url)
        .timeout(Duration::from_secs(5))
        .send()
        .await
    {
        Ok(resp) => resp.status().is_success(),
        Err(_) => false,
    }
}
