//! Board assembly tests: config file → provider registry → validated roster.
//!
//! No model is called; clients are built against unreachable endpoints.

use std::io::Write;

use board_agents::{default_roster, BoardConfig, ProviderRegistry};
use deliberation::{AgentKind, RosterError};

// ── Default board ──────────────────────────────────────────────────

#[test]
fn test_default_board_assembles() {
    let config = BoardConfig::default();
    let registry = ProviderRegistry::from_config(&config).unwrap();
    let roster = registry.roster(&config.roster).unwrap();

    assert_eq!(
        roster.debater_names(),
        vec!["Atlas", "Nova", "Marcus", "Sterling", "Maya"]
    );
    assert_eq!(roster.moderator().name(), "Orion");
    assert_eq!(roster.debater(3).unwrap().persona_label(), "CFO (The Finance Guy)");
}

#[test]
fn test_default_roster_personas_are_labelled() {
    for entry in default_roster() {
        assert!(entry.persona.contains(':'), "{} has no persona label", entry.name);
    }
}

// ── Board files ────────────────────────────────────────────────────

fn write_board(raw: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(raw.as_bytes()).unwrap();
    file
}

const LOCAL_BOARD: &str = r#"
[[providers]]
id = "local"
base_url = "http://127.0.0.1:9/v1"
model = "qwen3-14b"
max_retries = 0

[[roster]]
name = "Atlas"
provider = "local"
persona = "Strategist: big picture"

[[roster]]
name = "Sterling"
provider = "local"
persona = "CFO: numbers first"

[[roster]]
name = "Orion"
provider = "local"
persona = "Chairman: drive to a decision"
role = "moderator"
"#;

#[test]
fn test_board_file_loads() {
    let file = write_board(LOCAL_BOARD);
    let config = BoardConfig::resolve(Some(file.path())).unwrap();
    assert_eq!(config.providers.len(), 1);
    assert_eq!(config.providers[0].max_retries, 0);

    let registry = ProviderRegistry::from_config(&config).unwrap();
    let roster = registry.roster(&config.roster).unwrap();
    assert_eq!(roster.len(), 2);
}

#[test]
fn test_board_without_moderator_is_rejected() {
    let raw = LOCAL_BOARD.replace("role = \"moderator\"", "role = \"debater\"");
    let config = BoardConfig::from_toml_str(&raw).unwrap();
    let registry = ProviderRegistry::from_config(&config).unwrap();
    assert_eq!(
        registry.roster(&config.roster).unwrap_err(),
        RosterError::ModeratorCount(0)
    );
}

#[test]
fn test_board_with_two_moderators_is_rejected() {
    let raw = LOCAL_BOARD.replace(
        "persona = \"CFO: numbers first\"",
        "persona = \"CFO: numbers first\"\nrole = \"moderator\"",
    );
    let config = BoardConfig::from_toml_str(&raw).unwrap();
    assert_eq!(
        config.roster.iter().filter(|e| e.role == AgentKind::Moderator).count(),
        2
    );
    let registry = ProviderRegistry::from_config(&config).unwrap();
    assert_eq!(
        registry.roster(&config.roster).unwrap_err(),
        RosterError::ModeratorCount(2)
    );
}

#[test]
fn test_missing_board_file_is_an_error() {
    let err = BoardConfig::resolve(Some(std::path::Path::new("/nonexistent/board.toml"))).unwrap_err();
    assert!(err.to_string().contains("Failed to read board config"));
}

// ── Provider failures ──────────────────────────────────────────────

#[tokio::test]
async fn test_unreachable_provider_is_a_generate_error() {
    let file = write_board(LOCAL_BOARD);
    let config = BoardConfig::resolve(Some(file.path())).unwrap();
    let registry = ProviderRegistry::from_config(&config).unwrap();
    let roster = registry.roster(&config.roster).unwrap();

    let err = roster.debater(0).unwrap().prompt("Open a second warehouse?").await.unwrap_err();
    assert!(err.to_string().contains("local"), "{err}");
}
