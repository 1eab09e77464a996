//! Final decision report.

use std::fmt::Write as _;

use tracing::{info, warn};

use crate::agent::{Agent, GenerateError};
use crate::debate::state::DebateSession;

/// Byline stamped under the report date.
pub const REPORTER: &str = "Board Debate Engine";

/// Builds and requests the end-of-session decision document.
#[derive(Debug, Clone, Default)]
pub struct ReportSynthesizer;

impl ReportSynthesizer {
    pub fn new() -> Self {
        Self
    }

    /// Prompt over every non-system transcript entry.
    pub fn prompt(&self, session: &DebateSession, date: &str) -> String {
        let mut history = String::new();
        for entry in session.public_transcript() {
            let _ = writeln!(history, "{}", entry.render());
        }

        format!(
            "TASK: Write the \"Final Decision Minutes\" of this board meeting.\n\n\
             TOPIC: {topic}\n\n\
             DEBATE HISTORY:\n{history}\n\
             INSTRUCTIONS:\n\
             - Use professional, formal and clear language.\n\
             - Apply Markdown formatting (headings, lists, bold text).\n\
             - Leave a blank line before and after every heading.\n\n\
             OUTPUT FORMAT (USE EXACTLY THIS TEMPLATE):\n\n\
             # 📋 [Topic Title] - Decision Report\n\n\
             ## 1. Executive Summary\n\
             (2-3 sentences: what was discussed, which obstacles came up, what the outcome was.)\n\n\
             ## 2. Key Findings\n\
             ### ✅ Opportunities & Strengths\n\
             - (Item 1)\n\
             - (Item 2)\n\n\
             ### ⚠️ Risks & Threats\n\
             - (Item 1)\n\
             - (Item 2)\n\n\
             ## 3. Final Decision\n\
             **(Decision: APPROVE / REJECT / POSTPONE / REVISE)**\n\
             (Rationale for the decision.)\n\n\
             ## 4. Action Plan\n\
             1. **[Immediately]:** (First step)\n\
             2. **[Mid-term]:** (Next step)\n\
             3. **[Critical Warning]:** (Anything that needs attention)\n\n\
             ---\n\
             *Report date: {date} | Reporter: {reporter}*",
            topic = session.topic,
            reporter = REPORTER,
        )
    }

    /// One moderator call. The caller turns a failure into [`failure_message`].
    ///
    /// [`failure_message`]: Self::failure_message
    pub async fn synthesize(
        &self,
        moderator: &Agent,
        session: &DebateSession,
        date: &str,
    ) -> Result<String, GenerateError> {
        let prompt = self.prompt(session, date);
        match moderator.prompt(&prompt).await {
            Ok(report) => {
                info!(chars = report.chars().count(), session = %session.id, "report generated");
                Ok(report)
            }
            Err(e) => {
                warn!(error = %e, session = %session.id, "report generation failed");
                Err(e)
            }
        }
    }

    pub fn failure_message(error: &GenerateError) -> String {
        format!("Report could not be generated: {}", error)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::agent::MockGenerate;
    use crate::debate::state::TranscriptEntry;

    fn session() -> DebateSession {
        let mut session = DebateSession::new("Second warehouse?");
        session.push(TranscriptEntry::user("Second warehouse?"));
        session.record_turn("Atlas", "Demand supports it.");
        session.record_pass("Nova");
        session.push(TranscriptEntry::moderator("Orion", "Focus on cash."));
        session
    }

    #[test]
    fn test_prompt_excludes_system_entries() {
        let prompt = ReportSynthesizer::new().prompt(&session(), "2026-10-19");
        assert!(prompt.contains("User: Second warehouse?"));
        assert!(prompt.contains("Atlas: Demand supports it."));
        assert!(prompt.contains("Orion: Focus on cash."));
        assert!(!prompt.contains("technical issue"));
    }

    #[test]
    fn test_prompt_has_fixed_sections() {
        let prompt = ReportSynthesizer::new().prompt(&session(), "2026-10-19");
        for section in [
            "## 1. Executive Summary",
            "### ✅ Opportunities & Strengths",
            "### ⚠️ Risks & Threats",
            "## 3. Final Decision",
            "## 4. Action Plan",
            "*Report date: 2026-10-19",
        ] {
            assert!(prompt.contains(section), "missing {section}");
        }
    }

    #[tokio::test]
    async fn test_synthesize_passes_report_through() {
        let mut mock = MockGenerate::new();
        mock.expect_generate()
            .times(1)
            .returning(|_| Ok("# 📋 Warehouse - Decision Report".to_string()));
        let moderator = Agent::moderator("Orion", "Chairman", Arc::new(mock));

        let report = ReportSynthesizer::new()
            .synthesize(&moderator, &session(), "2026-10-19")
            .await
            .unwrap();
        assert!(report.starts_with("# 📋"));
    }

    #[tokio::test]
    async fn test_synthesize_failure_message() {
        let mut mock = MockGenerate::new();
        mock.expect_generate()
            .returning(|_| Err(GenerateError::Provider("timeout".to_string())));
        let moderator = Agent::moderator("Orion", "Chairman", Arc::new(mock));

        let err = ReportSynthesizer::new()
            .synthesize(&moderator, &session(), "2026-10-19")
            .await
            .unwrap_err();
        assert_eq!(
            ReportSynthesizer::failure_message(&err),
            "Report could not be generated: provider request failed: timeout"
        );
    }
}
