//! Parsing raw debater output into a [`Turn`].

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Confidence assumed when a turn carries no tag.
pub const DEFAULT_CONFIDENCE: u8 = 50;

/// Reasoning blocks some models emit before their answer.
static THINK_BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<think>.*?</think>").expect("THINK_BLOCK_RE regex should compile")
});

/// `[CONFIDENCE:80%]`, also in its Turkish spelling.
static CONFIDENCE_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\[(?:GÜVEN|CONFIDENCE):?\s*(\d+)\s*%\]\s*")
        .expect("CONFIDENCE_TAG_RE regex should compile")
});

static CLARIFICATION_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)\[CLARIFICATION:.*?\]\s*").expect("CLARIFICATION_TAG_RE regex should compile")
});

/// One successful debater turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub speaker: String,
    pub raw: String,
    /// 0-100.
    pub confidence: u8,
    pub text: String,
}

impl Turn {
    pub fn parse(speaker: &str, raw: &str) -> Self {
        let text = THINK_BLOCK_RE.replace_all(raw, "");

        let confidence = CONFIDENCE_TAG_RE
            .captures(&text)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<u64>().ok())
            .map_or(DEFAULT_CONFIDENCE, |value| value.min(100) as u8);
        let text = CONFIDENCE_TAG_RE.replace_all(&text, "");
        let text = CLARIFICATION_TAG_RE.replace_all(&text, "");

        Self {
            speaker: speaker.to_string(),
            raw: raw.to_string(),
            confidence,
            text: text.trim().to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_defaults() {
        let turn = Turn::parse("Atlas", "  Demand is rising.  ");
        assert_eq!(turn.text, "Demand is rising.");
        assert_eq!(turn.confidence, DEFAULT_CONFIDENCE);
        assert_eq!(turn.raw, "  Demand is rising.  ");
    }

    #[test]
    fn test_confidence_tag() {
        let turn = Turn::parse("Sterling", "ROI is weak. [CONFIDENCE: 85%]");
        assert_eq!(turn.confidence, 85);
        assert_eq!(turn.text, "ROI is weak.");
    }

    #[test]
    fn test_localized_tag_case_insensitive() {
        let turn = Turn::parse("Nova", "[güven:70%] Büyük düşün!");
        assert_eq!(turn.confidence, 70);
        assert_eq!(turn.text, "Büyük düşün!");
    }

    #[test]
    fn test_confidence_clamped() {
        assert_eq!(Turn::parse("x", "[CONFIDENCE:250%] sure").confidence, 100);
    }

    #[test]
    fn test_think_and_clarification_removed() {
        let raw = "<think>\nlet me plan\n</think>We should lease first. [CLARIFICATION: what budget?]";
        let turn = Turn::parse("Marcus", raw);
        assert_eq!(turn.text, "We should lease first.");
        assert!(!turn.is_empty());
    }

    #[test]
    fn test_only_tags_is_empty() {
        assert!(Turn::parse("x", "<think>hmm</think> [CONFIDENCE:10%]").is_empty());
    }
}
