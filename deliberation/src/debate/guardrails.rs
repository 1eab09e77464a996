//! Stop conditions for the debating phase.

use serde::{Deserialize, Serialize};

use crate::config::SchedulerConfig;

/// Why the debating phase ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The iteration bound was reached.
    MaxTurns,
    /// Every debater is at the speak cap.
    SpeakCapsExhausted,
    /// Everyone has spoken and the minimum debate length has passed.
    AllDebatersHeard,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MaxTurns => write!(f, "max_turns"),
            Self::SpeakCapsExhausted => write!(f, "speak_caps_exhausted"),
            Self::AllDebatersHeard => write!(f, "all_debaters_heard"),
        }
    }
}

/// Evaluates stop conditions against scheduling counters.
#[derive(Debug, Clone)]
pub struct Guardrails {
    max_turns: u32,
    min_turns_before_early_exit: u32,
    max_speaks_per_agent: u32,
}

impl Guardrails {
    pub fn new(config: &SchedulerConfig) -> Self {
        Self {
            max_turns: config.max_turns,
            min_turns_before_early_exit: config.min_turns_before_early_exit,
            max_speaks_per_agent: config.max_speaks_per_agent,
        }
    }

    /// Whether the debate must stop before the next iteration.
    ///
    /// `elapsed` counts iterations already consumed, errored ones included.
    pub fn evaluate(&self, elapsed: u32, speak_counts: &[u32]) -> Option<StopReason> {
        if elapsed >= self.max_turns {
            return Some(StopReason::MaxTurns);
        }
        if speak_counts
            .iter()
            .all(|&count| count >= self.max_speaks_per_agent)
        {
            return Some(StopReason::SpeakCapsExhausted);
        }
        if elapsed >= self.min_turns_before_early_exit && speak_counts.iter().all(|&c| c >= 1) {
            return Some(StopReason::AllDebatersHeard);
        }
        None
    }

    pub fn max_turns(&self) -> u32 {
        self.max_turns
    }

    pub fn max_speaks_per_agent(&self) -> u32 {
        self.max_speaks_per_agent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guardrails() -> Guardrails {
        Guardrails::new(&SchedulerConfig::default())
    }

    #[test]
    fn test_continue_mid_debate() {
        assert_eq!(guardrails().evaluate(3, &[1, 1, 0, 1, 0]), None);
    }

    #[test]
    fn test_max_turns_wins() {
        // Caps also exhausted, but the bound is checked first.
        assert_eq!(
            guardrails().evaluate(10, &[2, 2, 2, 2, 2]),
            Some(StopReason::MaxTurns)
        );
    }

    #[test]
    fn test_caps_exhausted() {
        assert_eq!(
            guardrails().evaluate(4, &[2, 2]),
            Some(StopReason::SpeakCapsExhausted)
        );
    }

    #[test]
    fn test_early_exit_needs_everyone_and_minimum() {
        let g = guardrails();
        assert_eq!(g.evaluate(4, &[1, 1, 1, 1, 1]), None);
        assert_eq!(g.evaluate(5, &[1, 1, 1, 1, 0]), None);
        assert_eq!(
            g.evaluate(5, &[1, 1, 1, 1, 1]),
            Some(StopReason::AllDebatersHeard)
        );
        assert_eq!(
            g.evaluate(6, &[1, 2, 1, 1, 1]),
            Some(StopReason::AllDebatersHeard)
        );
    }

    #[test]
    fn test_stop_reason_display() {
        assert_eq!(StopReason::MaxTurns.to_string(), "max_turns");
        assert_eq!(
            StopReason::SpeakCapsExhausted.to_string(),
            "speak_caps_exhausted"
        );
        assert_eq!(StopReason::AllDebatersHeard.to_string(), "all_debaters_heard");
    }
}
