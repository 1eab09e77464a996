//! Board configuration: model providers, the roster and enrichment endpoints.
//!
//! A board file is TOML with `[[providers]]` and `[[roster]]` tables. Without
//! one, [`BoardConfig::default`] builds the five-debater board plus the
//! chairman from the usual hosted APIs. Either way, `BOARD_*` environment
//! variables override endpoint URLs and model names.

use std::path::Path;

use anyhow::{bail, Context, Result};
use deliberation::{AgentKind, CompanyProfile, RosterEntry};
use serde::{Deserialize, Serialize};
use tracing::warn;

const OPENAI_URL: &str = "https://api.openai.com/v1";
const ANTHROPIC_URL: &str = "https://api.anthropic.com/v1";
const GROQ_URL: &str = "https://api.groq.com/openai/v1";

/// Placeholder key for local endpoints that ignore authentication.
pub const NO_API_KEY: &str = "not-needed";

/// One OpenAI-compatible chat endpoint plus the model served from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Identifier referenced by roster entries.
    pub id: String,
    pub base_url: String,
    pub model: String,
    /// Environment variable holding the API key.
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Retries for transient failures (connection errors, 429/502/503).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_temperature() -> f64 {
    0.8
}

fn default_max_retries() -> u32 {
    1
}

impl ProviderConfig {
    fn hosted(id: &str, base_url: &str, model: &str, key_env: &str) -> Self {
        Self {
            id: id.to_string(),
            base_url: base_url.to_string(),
            model: model.to_string(),
            api_key_env: Some(key_env.to_string()),
            temperature: default_temperature(),
            max_retries: default_max_retries(),
        }
    }

    /// Resolve the API key, falling back to [`NO_API_KEY`].
    pub fn api_key(&self) -> String {
        self.api_key_with(|key| std::env::var(key).ok())
    }

    fn api_key_with(&self, lookup: impl Fn(&str) -> Option<String>) -> String {
        let Some(var) = &self.api_key_env else {
            return NO_API_KEY.to_string();
        };
        match lookup(var).map(|k| k.trim().to_string()) {
            Some(key) if !key.is_empty() => key,
            _ => {
                warn!(provider = %self.id, var = %var, "API key variable not set");
                NO_API_KEY.to_string()
            }
        }
    }

    /// `BOARD_PROVIDER_<ID>_<FIELD>` with the id upper-cased and `-`/`.` as `_`.
    fn env_key(&self, field: &str) -> String {
        let id: String = self
            .id
            .chars()
            .map(|c| match c {
                '-' | '.' | ' ' => '_',
                c => c.to_ascii_uppercase(),
            })
            .collect();
        format!("BOARD_PROVIDER_{}_{}", id, field)
    }
}

/// Vision endpoint used to describe attached images.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisionConfig {
    pub base_url: String,
    pub model: String,
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default = "default_vision_tokens")]
    pub max_tokens: u32,
}

fn default_vision_tokens() -> u32 {
    300
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            base_url: std::env::var("BOARD_VISION_URL").unwrap_or_else(|_| OPENAI_URL.into()),
            model: std::env::var("BOARD_VISION_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into()),
            api_key_env: Some("OPENAI_API_KEY".to_string()),
            max_tokens: default_vision_tokens(),
        }
    }
}

impl VisionConfig {
    pub fn api_key(&self) -> Option<String> {
        self.api_key_env
            .as_deref()
            .and_then(|var| std::env::var(var).ok())
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
    }
}

/// Top-level board configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardConfig {
    pub providers: Vec<ProviderConfig>,
    pub roster: Vec<RosterEntry>,
    #[serde(default)]
    pub vision: VisionConfig,
    /// Instant-answer search endpoint.
    #[serde(default = "default_search_url")]
    pub search_url: String,
    /// Timeout for enrichment HTTP requests, in seconds.
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,
}

fn default_search_url() -> String {
    std::env::var("BOARD_SEARCH_URL").unwrap_or_else(|_| "https://api.duckduckgo.com/".into())
}

fn default_http_timeout() -> u64 {
    10
}

impl Default for BoardConfig {
    fn default() -> Self {
        let openai = std::env::var("BOARD_OPENAI_URL").unwrap_or_else(|_| OPENAI_URL.into());
        let anthropic =
            std::env::var("BOARD_ANTHROPIC_URL").unwrap_or_else(|_| ANTHROPIC_URL.into());
        let groq = std::env::var("BOARD_GROQ_URL").unwrap_or_else(|_| GROQ_URL.into());

        let mut nano = ProviderConfig::hosted("openai-nano", &openai, "gpt-5-nano", "OPENAI_API_KEY");
        let mut chair = ProviderConfig::hosted("openai-chair", &openai, "gpt-5-mini", "OPENAI_API_KEY");
        // gpt-5 models only accept the default temperature.
        nano.temperature = 1.0;
        chair.temperature = 1.0;

        Self {
            providers: vec![
                ProviderConfig::hosted("openai-mini", &openai, "gpt-4o-mini", "OPENAI_API_KEY"),
                ProviderConfig::hosted(
                    "anthropic-haiku",
                    &anthropic,
                    "claude-3-5-haiku-20241022",
                    "ANTHROPIC_API_KEY",
                ),
                ProviderConfig::hosted("groq-llama", &groq, "llama-3.3-70b-versatile", "GROQ_API_KEY"),
                nano,
                ProviderConfig::hosted(
                    "anthropic-haiku-3",
                    &anthropic,
                    "claude-3-haiku-20240307",
                    "ANTHROPIC_API_KEY",
                ),
                chair,
            ],
            roster: default_roster(),
            vision: VisionConfig::default(),
            search_url: default_search_url(),
            http_timeout_secs: default_http_timeout(),
        }
    }
}

fn entry(name: &str, provider: &str, role: AgentKind, persona: &str) -> RosterEntry {
    RosterEntry {
        name: name.to_string(),
        provider: provider.to_string(),
        persona: persona.to_string(),
        role,
    }
}

/// The standing board: five debaters and the chairman.
pub fn default_roster() -> Vec<RosterEntry> {
    use AgentKind::{Debater, Moderator};

    vec![
        entry(
            "Atlas",
            "openai-mini",
            Debater,
            "Strategist (The Strategist): See the big picture. What are competitors doing? \
             Where is the market heading? PRIORITIES: competitive advantage, market share, \
             long-term strategy. LOW PRIORITY: short-term cost details, mention them only in \
             strategic context. STYLE: calm, analytical, always asking how rivals will respond.",
        ),
        entry(
            "Nova",
            "anthropic-haiku",
            Debater,
            "Visionary (The Visionary): Think big! Innovation, disruption and the wow factor \
             are your territory. PRIORITIES: future trends, innovation, brand prestige. \
             LOW PRIORITY: budget and cost, note them briefly if relevant. STYLE: energetic, \
             bold, inspiring. Challenge the room with 'why not?'.",
        ),
        entry(
            "Marcus",
            "groq-llama",
            Debater,
            "Skeptic (The Skeptic): Think critically. Demand evidence for every claim; \
             Murphy's law is your guide. PRIORITIES: risks, uncertainty, 'how do you know?', \
             'what if it fails?'. LOW PRIORITY: counter over-optimistic forecasts, but stay \
             constructive. STYLE: probing yet constructive.",
        ),
        entry(
            "Sterling",
            "openai-nano",
            Debater,
            "CFO (The Finance Guy): Numbers and financial metrics are your expertise. \
             PRIORITIES: ROI, cash flow, cost, payback period, balance-sheet impact. \
             LOW PRIORITY: vision and brand value, analyse only their financial effect. \
             STYLE: analytical, figure-driven, always asking what the return will be.",
        ),
        entry(
            "Maya",
            "anthropic-haiku-3",
            Debater,
            "User Advocate (The User Advocate): Customer experience comes first. \
             PRIORITIES: UX, customer satisfaction, 'how will the customer feel?'. \
             LOW PRIORITY: technical and financial detail, only as it affects customers. \
             STYLE: empathetic, user-focused, looking through the customer's eyes.",
        ),
        entry(
            "Orion",
            "openai-chair",
            Moderator,
            "Chairman (The Chairman): You lead the discussion and bring it to a decision. \
             TASK: offer new perspectives when the debate stalls and steer it back when it \
             drifts. STYLE: professional, decisive, solution-oriented.",
        ),
    ]
}

impl BoardConfig {
    /// Parse a board file. Missing `roster` or `providers` is an error.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw).context("Failed to parse board config")?;
        config.validate()?;
        Ok(config)
    }

    /// Load a board file and apply environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read board config {}", path.display()))?;
        let mut config = Self::from_toml_str(&raw)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Built-in board, or the file at `path` when given.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let mut config = Self::default();
                config.apply_env_overrides();
                Ok(config)
            }
        }
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Replace provider URLs and models from `BOARD_PROVIDER_<ID>_URL` /
    /// `BOARD_PROVIDER_<ID>_MODEL`.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        for provider in &mut self.providers {
            if let Some(url) = lookup(&provider.env_key("URL")) {
                provider.base_url = url;
            }
            if let Some(model) = lookup(&provider.env_key("MODEL")) {
                provider.model = model;
            }
        }
    }

    pub fn provider(&self, id: &str) -> Option<&ProviderConfig> {
        self.providers.iter().find(|p| p.id == id)
    }

    /// Cross-reference checks; roster shape itself is validated by the engine.
    pub fn validate(&self) -> Result<()> {
        if self.providers.is_empty() {
            bail!("board config defines no providers");
        }
        for (i, provider) in self.providers.iter().enumerate() {
            if self.providers[..i].iter().any(|p| p.id == provider.id) {
                bail!("duplicate provider id: {}", provider.id);
            }
            if provider.base_url.trim().is_empty() || provider.model.trim().is_empty() {
                bail!("provider {} needs a base_url and a model", provider.id);
            }
        }
        if let Some(entry) = self.roster.iter().find(|e| self.provider(&e.provider).is_none()) {
            bail!("agent {} uses unknown provider {}", entry.name, entry.provider);
        }
        Ok(())
    }
}

/// Load a company profile from a TOML file.
pub fn load_company(path: &Path) -> Result<CompanyProfile> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read company profile {}", path.display()))?;
    toml::from_str(&raw).context("Failed to parse company profile")
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOARD: &str = r#"
[[providers]]
id = "local"
base_url = "http://localhost:8080/v1"
model = "qwen3-14b"

[[providers]]
id = "cloud.chair"
base_url = "https://api.openai.com/v1"
model = "gpt-5-mini"
api_key_env = "OPENAI_API_KEY"
temperature = 1.0

[[roster]]
name = "Atlas"
provider = "local"
persona = "Strategist: big picture"

[[roster]]
name = "Orion"
provider = "cloud.chair"
persona = "Chairman: drive to a decision"
role = "moderator"
"#;

    #[test]
    fn test_default_board_is_consistent() {
        let config = BoardConfig::default();
        config.validate().unwrap();
        assert_eq!(config.roster.len(), 6);
        let moderators: Vec<_> = config
            .roster
            .iter()
            .filter(|e| e.role == AgentKind::Moderator)
            .collect();
        assert_eq!(moderators.len(), 1);
        assert_eq!(moderators[0].name, "Orion");
    }

    #[test]
    fn test_parse_board_file() {
        let config = BoardConfig::from_toml_str(BOARD).unwrap();
        assert_eq!(config.providers.len(), 2);
        assert_eq!(config.providers[0].temperature, 0.8);
        assert_eq!(config.providers[0].api_key_env, None);
        assert_eq!(config.providers[0].max_retries, 1);
        assert_eq!(config.roster[0].role, AgentKind::Debater);
        assert_eq!(config.roster[1].role, AgentKind::Moderator);
        assert_eq!(config.http_timeout_secs, 10);
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let raw = BOARD.replace("provider = \"local\"", "provider = \"missing\"");
        let err = BoardConfig::from_toml_str(&raw).unwrap_err();
        assert!(err.to_string().contains("unknown provider missing"));
    }

    #[test]
    fn test_duplicate_provider_rejected() {
        let raw = BOARD.replace("id = \"cloud.chair\"", "id = \"local\"");
        assert!(BoardConfig::from_toml_str(&raw).is_err());
    }

    #[test]
    fn test_env_overrides_by_provider_id() {
        let mut config = BoardConfig::from_toml_str(BOARD).unwrap();
        config.apply_overrides(|key| match key {
            "BOARD_PROVIDER_CLOUD_CHAIR_URL" => Some("http://proxy:8317/v1".to_string()),
            "BOARD_PROVIDER_LOCAL_MODEL" => Some("qwen3-32b".to_string()),
            _ => None,
        });
        assert_eq!(config.providers[1].base_url, "http://proxy:8317/v1");
        assert_eq!(config.providers[0].model, "qwen3-32b");
        assert_eq!(config.providers[0].base_url, "http://localhost:8080/v1");
    }

    #[test]
    fn test_api_key_fallback() {
        let config = BoardConfig::from_toml_str(BOARD).unwrap();
        assert_eq!(config.providers[0].api_key_with(|_| None), NO_API_KEY);
        assert_eq!(config.providers[1].api_key_with(|_| Some("  ".into())), NO_API_KEY);
        assert_eq!(
            config.providers[1].api_key_with(|_| Some("sk-test".into())),
            "sk-test"
        );
    }

    #[test]
    fn test_load_company_profile() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("company.toml");
        std::fs::write(
            &path,
            "name = \"Acme Logistics\"\nindustry = \"Warehousing\"\nwebsite_url = \"acme.example\"\n",
        )
        .unwrap();
        let company = load_company(&path).unwrap();
        assert_eq!(company.name, "Acme Logistics");
        assert_eq!(company.website_url.as_deref(), Some("acme.example"));
    }
}
