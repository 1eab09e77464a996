//! Per-turn prompt assembly.
//!
//! The assembler is built once per session, after enrichment, and turns a
//! [`TurnContext`] into the `[system, user]` message pair a debater sees.

use std::fmt::Write as _;

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::agent::{Agent, ChatMessage};

/// Business profile of the company the board advises.
///
/// Missing fields render as "Unknown" rather than failing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanyProfile {
    pub name: String,
    pub industry: String,
    pub employee_count: String,
    pub annual_revenue: String,
    pub monthly_budget: String,
    pub target_market: String,
    pub challenges: String,
    pub description: String,
    pub website_url: Option<String>,
}

fn or_unknown(value: &str) -> &str {
    if value.trim().is_empty() {
        "Unknown"
    } else {
        value
    }
}

impl CompanyProfile {
    pub fn named(name: impl Into<String>, industry: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            industry: industry.into(),
            ..Self::default()
        }
    }

    /// `"Name (Industry)"`, used in short prompts.
    pub fn headline(&self) -> String {
        format!("{} ({})", or_unknown(&self.name), or_unknown(&self.industry))
    }

    /// Shared company block placed in every debater prompt.
    pub fn context_block(&self) -> String {
        let mut block = String::from("CONTEXT - COMPANY PROFILE:\n");
        let rows = [
            ("Company", &self.name),
            ("Industry", &self.industry),
            ("Employees", &self.employee_count),
            ("Annual revenue", &self.annual_revenue),
            ("Monthly budget", &self.monthly_budget),
            ("Target market", &self.target_market),
            ("Current challenges", &self.challenges),
            ("Description", &self.description),
        ];
        for (label, value) in rows {
            let _ = writeln!(block, "{}: {}", label, or_unknown(value));
        }
        block.push_str(
            "\nYou are a member of this company's board, debating the topic with the other members.\n\
             Never ask the user questions; when information is missing, state your assumptions.\n\
             Do not repeat figures another speaker invented as if they were facts.\n",
        );
        block
    }

    pub fn website(&self) -> Option<&str> {
        self.website_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }
}

/// Text gathered before the debate starts. Every block may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrichment {
    pub image: String,
    pub website: String,
    pub search: String,
    pub memory: String,
}

/// What the assembler needs to know about the turn being built.
#[derive(Debug, Clone, Copy)]
pub struct TurnContext<'a> {
    pub agent: &'a Agent,
    pub topic: &'a str,
    /// Speaker tag of the last transcript entry.
    pub previous_speaker: &'a str,
    pub previous_message: &'a str,
    /// Compacted argument summaries, oldest first, already bounded.
    pub arguments: &'a [String],
}

/// Builds debater prompts for one session.
#[derive(Debug, Clone)]
pub struct ContextAssembler {
    company: CompanyProfile,
    enrichment: Enrichment,
    language: Option<String>,
    today: NaiveDate,
}

impl ContextAssembler {
    pub fn new(company: CompanyProfile, enrichment: Enrichment, language: Option<String>) -> Self {
        Self {
            company,
            enrichment,
            language,
            today: Local::now().date_naive(),
        }
    }

    /// Pin the date shown in prompts.
    pub fn with_date(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn company(&self) -> &CompanyProfile {
        &self.company
    }

    pub fn enrichment(&self) -> &Enrichment {
        &self.enrichment
    }

    pub fn date_string(&self) -> String {
        self.today.format("%Y-%m-%d").to_string()
    }

    pub fn company_block(&self) -> String {
        self.company.context_block()
    }

    pub fn language_rule(&self) -> String {
        match self.language.as_deref().map(str::trim) {
            Some(lang) if !lang.is_empty() => format!(
                "LANGUAGE RULE: respond in {lang} only. Do not mix languages."
            ),
            _ => "LANGUAGE RULE: respond in the language the topic is written in.".to_string(),
        }
    }

    pub fn system_prompt(&self, turn: &TurnContext<'_>) -> String {
        let mut prompt = String::new();
        let _ = writeln!(prompt, "{}\n", self.language_rule());
        let _ = writeln!(prompt, "{}", self.company_block());
        let _ = writeln!(prompt, "TODAY'S DATE: {}\n", self.date_string());

        let _ = writeln!(prompt, "IMAGE CONTEXT: {}", self.enrichment.image);
        let _ = writeln!(prompt, "WEBSITE CONTENT: {}", self.enrichment.website);
        if !self.enrichment.search.is_empty() {
            let _ = writeln!(prompt, "MARKET RESEARCH:\n{}", self.enrichment.search);
        }
        if !self.enrichment.memory.is_empty() {
            let _ = writeln!(prompt, "{}", self.enrichment.memory);
        }

        prompt.push_str("\nPREVIOUS ARGUMENTS (DO NOT REPEAT):\n");
        for argument in turn.arguments {
            let _ = writeln!(prompt, "- {}", argument);
        }

        let _ = writeln!(prompt, "\nYOU ARE: {}", turn.agent.name());
        let _ = writeln!(prompt, "YOUR ROLE: {}", turn.agent.persona());
        let _ = writeln!(prompt, "TOPIC: {}\n", turn.topic);

        let _ = writeln!(prompt, "RULES:");
        let _ = writeln!(
            prompt,
            "1. Respond to the last speaker ({}): {}",
            turn.previous_speaker, turn.previous_message
        );
        prompt.push_str(
            "2. Prefer concrete data with sources [Source: X] when the context above provides it.\n\
             3. Do not invent specific figures that are not in the context; discuss ranges or trends instead.\n\
             4. Do not repeat previous arguments.\n\
             5. Stay in character.\n\
             6. Keep it to 3-5 impactful sentences.\n",
        );
        let _ = writeln!(prompt, "7. Current year: {}.", self.today.format("%Y"));
        prompt.push_str(
            "\nOUTPUT FORMAT:\nShare your argument naturally. Optionally include [CONFIDENCE:X%] to express certainty.\n",
        );
        prompt
    }

    pub fn user_message(&self, turn: &TurnContext<'_>) -> String {
        format!("{} said: {}", turn.previous_speaker, turn.previous_message)
    }

    pub fn turn_messages(&self, turn: &TurnContext<'_>) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(self.system_prompt(turn)),
            ChatMessage::user(self.user_message(turn)),
        ]
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::agent::{ChatRole, MockGenerate};

    fn agent() -> Agent {
        Agent::debater("Sterling", "CFO: numbers first", Arc::new(MockGenerate::new()))
    }

    fn assembler(language: Option<&str>) -> ContextAssembler {
        let company = CompanyProfile {
            name: "Acme Logistics".to_string(),
            industry: "Warehousing".to_string(),
            ..CompanyProfile::default()
        };
        let enrichment = Enrichment {
            website: "• Company: Acme".to_string(),
            memory: "PAST BOARD DECISIONS (Similar Topics):\n- Topic: lease -> Decision: REJECT (cost)"
                .to_string(),
            ..Enrichment::default()
        };
        ContextAssembler::new(company, enrichment, language.map(str::to_string))
            .with_date(NaiveDate::from_ymd_opt(2025, 3, 14).unwrap())
    }

    #[test]
    fn test_company_block_fills_unknowns() {
        let block = CompanyProfile::named("Acme", "").context_block();
        assert!(block.contains("Company: Acme"));
        assert!(block.contains("Industry: Unknown"));
        assert!(block.contains("Monthly budget: Unknown"));
    }

    #[test]
    fn test_system_prompt_sections() {
        let agent = agent();
        let arguments = vec!["Atlas: demand is rising".to_string()];
        let turn = TurnContext {
            agent: &agent,
            topic: "Should we open a second warehouse?",
            previous_speaker: "Atlas",
            previous_message: "Demand is rising fast.",
            arguments: &arguments,
        };
        let prompt = assembler(None).system_prompt(&turn);

        assert!(prompt.contains("the language the topic is written in"));
        assert!(prompt.contains("Company: Acme Logistics"));
        assert!(prompt.contains("TODAY'S DATE: 2025-03-14"));
        assert!(prompt.contains("WEBSITE CONTENT: • Company: Acme"));
        assert!(prompt.contains("PAST BOARD DECISIONS"));
        assert!(prompt.contains("PREVIOUS ARGUMENTS (DO NOT REPEAT):\n- Atlas: demand is rising"));
        assert!(prompt.contains("YOU ARE: Sterling"));
        assert!(prompt.contains("YOUR ROLE: CFO: numbers first"));
        assert!(prompt.contains("Respond to the last speaker (Atlas): Demand is rising fast."));
        assert!(prompt.contains("[CONFIDENCE:X%]"));
        assert!(prompt.contains("Current year: 2025"));
    }

    #[test]
    fn test_explicit_language() {
        assert!(assembler(Some("English"))
            .language_rule()
            .contains("respond in English only"));
        assert!(assembler(Some("  "))
            .language_rule()
            .contains("language the topic is written in"));
    }

    #[test]
    fn test_turn_messages_shape() {
        let agent = agent();
        let turn = TurnContext {
            agent: &agent,
            topic: "t",
            previous_speaker: "User",
            previous_message: "Should we expand?",
            arguments: &[],
        };
        let messages = assembler(None).turn_messages(&turn);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, ChatRole::System);
        assert_eq!(messages[1].role, ChatRole::User);
        assert_eq!(messages[1].content, "User said: Should we expand?");
    }

    #[test]
    fn test_website_ignores_blank() {
        let mut company = CompanyProfile::default();
        assert_eq!(company.website(), None);
        company.website_url = Some("  ".to_string());
        assert_eq!(company.website(), None);
        company.website_url = Some("https://acme.example".to_string());
        assert_eq!(company.website(), Some("https://acme.example"));
    }
}
