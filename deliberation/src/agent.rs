//! Debate participants.
//!
//! An [`Agent`] is a name, a persona and a handle to anything implementing
//! [`Generate`]. The engine never knows which provider sits behind the
//! handle; rosters are assembled from declarative [`RosterEntry`] records.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reserved prefix a backend may use to report failure in-band.
///
/// Text beginning with this marker is classified as a failed generation
/// even when the backend returned it as a successful response.
pub const ERROR_MARKER: &str = "Error";

/// Role of a chat message sent to a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

impl fmt::Display for ChatRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// A single role-tagged message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Failure of a single generation call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerateError {
    /// Transport or provider-side failure.
    #[error("provider request failed: {0}")]
    Provider(String),

    /// Provider rejected the call for quota reasons.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Backend answered with an error-marked string.
    #[error("{0}")]
    Marked(String),

    /// Backend answered with nothing usable.
    #[error("empty response")]
    Empty,
}

impl GenerateError {
    /// Whether an immediate retry could plausibly succeed.
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::Provider(_) | Self::RateLimited(_))
    }
}

/// Text generation capability: ordered messages in, text out.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Generate: Send + Sync {
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String, GenerateError>;
}

/// Whether an agent argues and votes, or moderates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    #[default]
    Debater,
    Moderator,
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Debater => write!(f, "debater"),
            Self::Moderator => write!(f, "moderator"),
        }
    }
}

/// A persona-bound participant. Immutable for the lifetime of a session.
#[derive(Clone)]
pub struct Agent {
    name: String,
    persona: String,
    kind: AgentKind,
    backend: Arc<dyn Generate>,
}

impl Agent {
    pub fn new(
        name: impl Into<String>,
        persona: impl Into<String>,
        kind: AgentKind,
        backend: Arc<dyn Generate>,
    ) -> Self {
        Self {
            name: name.into(),
            persona: persona.into(),
            kind,
            backend,
        }
    }

    pub fn debater(
        name: impl Into<String>,
        persona: impl Into<String>,
        backend: Arc<dyn Generate>,
    ) -> Self {
        Self::new(name, persona, AgentKind::Debater, backend)
    }

    pub fn moderator(
        name: impl Into<String>,
        persona: impl Into<String>,
        backend: Arc<dyn Generate>,
    ) -> Self {
        Self::new(name, persona, AgentKind::Moderator, backend)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn persona(&self) -> &str {
        &self.persona
    }

    pub fn kind(&self) -> AgentKind {
        self.kind
    }

    /// Short persona label: the text before the first `:`.
    pub fn persona_label(&self) -> &str {
        self.persona
            .split(':')
            .next()
            .map(str::trim)
            .unwrap_or_default()
    }

    /// Generate a reply, classifying marker-prefixed and blank text as failures.
    pub async fn generate(&self, messages: &[ChatMessage]) -> Result<String, GenerateError> {
        match self.backend.generate(messages).await {
            Ok(text) if text.trim_start().starts_with(ERROR_MARKER) => {
                Err(GenerateError::Marked(text))
            }
            Ok(text) if text.trim().is_empty() => Err(GenerateError::Empty),
            other => other,
        }
    }

    /// Single user-message convenience wrapper.
    pub async fn prompt(&self, prompt: &str) -> Result<String, GenerateError> {
        self.generate(&[ChatMessage::user(prompt)]).await
    }
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("persona", &self.persona_label())
            .finish()
    }
}

/// Declarative roster record: who, backed by which provider, with what persona.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub name: String,
    /// Identifier the host resolves to a `Generate` implementation.
    pub provider: String,
    pub persona: String,
    #[serde(default)]
    pub role: AgentKind,
}

/// Roster validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RosterError {
    #[error("roster has no debaters")]
    NoDebaters,

    #[error("roster needs exactly one moderator, found {0}")]
    ModeratorCount(usize),

    #[error("duplicate agent name: {0}")]
    DuplicateName(String),

    #[error("agent name must not be blank")]
    BlankName,

    #[error("agent {name} listed as {found}, expected {expected}")]
    WrongKind {
        name: String,
        expected: AgentKind,
        found: AgentKind,
    },

    #[error("unknown provider {provider} for agent {name}")]
    UnknownProvider { name: String, provider: String },
}

/// The debaters and the moderator for one session.
#[derive(Debug, Clone)]
pub struct Roster {
    debaters: Vec<Agent>,
    moderator: Agent,
}

impl Roster {
    pub fn new(debaters: Vec<Agent>, moderator: Agent) -> Result<Self, RosterError> {
        if debaters.is_empty() {
            return Err(RosterError::NoDebaters);
        }
        if moderator.kind() != AgentKind::Moderator {
            return Err(RosterError::WrongKind {
                name: moderator.name().to_string(),
                expected: AgentKind::Moderator,
                found: moderator.kind(),
            });
        }

        let mut seen = HashSet::new();
        for agent in debaters.iter().chain(std::iter::once(&moderator)) {
            if agent.name().trim().is_empty() {
                return Err(RosterError::BlankName);
            }
            if !seen.insert(agent.name()) {
                return Err(RosterError::DuplicateName(agent.name().to_string()));
            }
        }
        if let Some(agent) = debaters.iter().find(|a| a.kind() != AgentKind::Debater) {
            return Err(RosterError::WrongKind {
                name: agent.name().to_string(),
                expected: AgentKind::Debater,
                found: agent.kind(),
            });
        }

        Ok(Self {
            debaters,
            moderator,
        })
    }

    /// Build a roster from declarative records, resolving each provider id.
    pub fn from_entries<F>(entries: &[RosterEntry], mut resolve: F) -> Result<Self, RosterError>
    where
        F: FnMut(&str) -> Option<Arc<dyn Generate>>,
    {
        let mut debaters = Vec::new();
        let mut moderators = Vec::new();

        for entry in entries {
            let backend = resolve(&entry.provider).ok_or_else(|| RosterError::UnknownProvider {
                name: entry.name.clone(),
                provider: entry.provider.clone(),
            })?;
            let agent = Agent::new(&entry.name, &entry.persona, entry.role, backend);
            match entry.role {
                AgentKind::Debater => debaters.push(agent),
                AgentKind::Moderator => moderators.push(agent),
            }
        }

        if moderators.len() != 1 {
            return Err(RosterError::ModeratorCount(moderators.len()));
        }
        let moderator = moderators.remove(0);
        Self::new(debaters, moderator)
    }

    pub fn debaters(&self) -> &[Agent] {
        &self.debaters
    }

    pub fn debater(&self, idx: usize) -> Option<&Agent> {
        self.debaters.get(idx)
    }

    pub fn moderator(&self) -> &Agent {
        &self.moderator
    }

    pub fn debater_names(&self) -> Vec<String> {
        self.debaters.iter().map(|a| a.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.debaters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.debaters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend_returning(text: &'static str) -> Arc<dyn Generate> {
        let mut mock = MockGenerate::new();
        mock.expect_generate()
            .returning(move |_| Ok(text.to_string()));
        Arc::new(mock)
    }

    fn entry(name: &str, role: AgentKind) -> RosterEntry {
        RosterEntry {
            name: name.to_string(),
            provider: "local".to_string(),
            persona: format!("{}: persona", name),
            role,
        }
    }

    #[tokio::test]
    async fn test_marker_prefixed_text_is_failure() {
        let agent = Agent::debater("Nova", "Visionary: big ideas", backend_returning("Error (Nova): 500"));
        let err = agent.prompt("hello").await.unwrap_err();
        assert!(matches!(err, GenerateError::Marked(_)));
        assert!(!err.is_retriable());
    }

    #[tokio::test]
    async fn test_blank_text_is_failure() {
        let agent = Agent::debater("Nova", "Visionary", backend_returning("   \n"));
        assert_eq!(agent.prompt("hello").await.unwrap_err(), GenerateError::Empty);
    }

    #[tokio::test]
    async fn test_plain_text_passes_through() {
        let agent = Agent::debater("Atlas", "Strategist", backend_returning("We should expand."));
        assert_eq!(agent.prompt("hi").await.unwrap(), "We should expand.");
    }

    #[test]
    fn test_persona_label() {
        let agent = Agent::debater("Sterling", "CFO (The Finance Guy): numbers first", backend_returning("x"));
        assert_eq!(agent.persona_label(), "CFO (The Finance Guy)");

        let bare = Agent::debater("Maya", "User Advocate", backend_returning("x"));
        assert_eq!(bare.persona_label(), "User Advocate");
    }

    #[test]
    fn test_roster_rejects_duplicates() {
        let b = backend_returning("x");
        let err = Roster::new(
            vec![
                Agent::debater("Atlas", "a", b.clone()),
                Agent::debater("Atlas", "b", b.clone()),
            ],
            Agent::moderator("Orion", "chair", b),
        )
        .unwrap_err();
        assert_eq!(err, RosterError::DuplicateName("Atlas".to_string()));
    }

    #[test]
    fn test_roster_rejects_moderator_name_clash() {
        let b = backend_returning("x");
        let err = Roster::new(
            vec![Agent::debater("Orion", "a", b.clone())],
            Agent::moderator("Orion", "chair", b),
        )
        .unwrap_err();
        assert!(matches!(err, RosterError::DuplicateName(_)));
    }

    #[test]
    fn test_roster_requires_debaters() {
        let b = backend_returning("x");
        let err = Roster::new(vec![], Agent::moderator("Orion", "chair", b)).unwrap_err();
        assert_eq!(err, RosterError::NoDebaters);
    }

    #[test]
    fn test_from_entries_resolves_providers() {
        let entries = vec![
            entry("Atlas", AgentKind::Debater),
            entry("Nova", AgentKind::Debater),
            entry("Orion", AgentKind::Moderator),
        ];
        let roster = Roster::from_entries(&entries, |_| Some(backend_returning("x"))).unwrap();
        assert_eq!(roster.debater_names(), vec!["Atlas", "Nova"]);
        assert_eq!(roster.moderator().name(), "Orion");
    }

    #[test]
    fn test_from_entries_unknown_provider() {
        let entries = vec![entry("Atlas", AgentKind::Debater)];
        let err = Roster::from_entries(&entries, |_| None).unwrap_err();
        assert!(matches!(err, RosterError::UnknownProvider { .. }));
    }

    #[test]
    fn test_from_entries_requires_one_moderator() {
        let entries = vec![entry("Atlas", AgentKind::Debater)];
        let err = Roster::from_entries(&entries, |_| Some(backend_returning("x"))).unwrap_err();
        assert_eq!(err, RosterError::ModeratorCount(0));
    }

    #[test]
    fn test_roster_entry_toml_defaults_to_debater() {
        let parsed: RosterEntry =
            toml::from_str("name = \"Atlas\"\nprovider = \"openai\"\npersona = \"Strategist\"")
                .unwrap();
        assert_eq!(parsed.role, AgentKind::Debater);
    }
}
