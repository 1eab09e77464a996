//! Turn scheduling.
//!
//! The scheduler owns every counter that decides who speaks next: per-debater
//! speak counts, consumed iterations, successful turns and the routing RNG.
//! It never talks to an agent.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use super::guardrails::{Guardrails, StopReason};
use crate::config::SchedulerConfig;

/// How the next speaker was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routing {
    /// Named in the previous turn.
    Mentioned(usize),
    /// Drawn at random among debaters under cap.
    Random(usize),
    /// Plain round-robin step.
    Advance(usize),
}

impl Routing {
    pub fn index(self) -> usize {
        match self {
            Self::Mentioned(i) | Self::Random(i) | Self::Advance(i) => i,
        }
    }
}

pub struct TurnScheduler {
    names: Vec<String>,
    counts: Vec<u32>,
    current: usize,
    elapsed: u32,
    successful: u32,
    cap: u32,
    interjection_every: u32,
    guardrails: Guardrails,
    rng: StdRng,
}

impl TurnScheduler {
    /// `names` is the debater roster in order; it must not be empty.
    pub fn new(names: Vec<String>, config: &SchedulerConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            counts: vec![0; names.len()],
            names,
            current: 0,
            elapsed: 0,
            successful: 0,
            cap: config.max_speaks_per_agent,
            interjection_every: config.interjection_every.max(1),
            guardrails: Guardrails::new(config),
            rng,
        }
    }

    /// Pick the debater for the next iteration and consume one unit of the
    /// turn bound, or report why the debate is over.
    pub fn next_speaker(&mut self) -> Result<usize, StopReason> {
        if self.names.is_empty() {
            return Err(StopReason::SpeakCapsExhausted);
        }
        if let Some(reason) = self.guardrails.evaluate(self.elapsed, &self.counts) {
            debug!(%reason, elapsed = self.elapsed, "debate stopping");
            return Err(reason);
        }

        if self.counts[self.current] >= self.cap {
            let n = self.names.len();
            let start = self.current;
            self.current = (1..=n)
                .map(|step| (start + step) % n)
                .find(|&idx| self.counts[idx] < self.cap)
                .ok_or(StopReason::SpeakCapsExhausted)?;
        }

        self.elapsed += 1;
        Ok(self.current)
    }

    /// Count a successful turn for the current speaker.
    pub fn record_success(&mut self) {
        self.counts[self.current] += 1;
        self.successful += 1;
    }

    /// Skip past a failed speaker. The iteration stays consumed.
    pub fn record_failure(&mut self) -> Routing {
        self.current = (self.current + 1) % self.names.len();
        Routing::Advance(self.current)
    }

    /// Whether the moderator should interject after the turn just recorded.
    pub fn should_interject(&self) -> bool {
        self.successful > 0
            && self.successful % self.interjection_every == 0
            && self.elapsed < self.guardrails.max_turns()
    }

    /// Choose the next speaker after a successful turn.
    pub fn route_after(&mut self, cleaned: &str) -> Routing {
        let current = self.current;
        let mentioned = (0..self.names.len()).find(|&idx| {
            idx != current && self.counts[idx] < self.cap && cleaned.contains(self.names[idx].as_str())
        });

        let routing = match mentioned {
            Some(idx) => Routing::Mentioned(idx),
            None => {
                let under_cap: Vec<usize> = (0..self.names.len())
                    .filter(|&idx| self.counts[idx] < self.cap)
                    .collect();
                let others: Vec<usize> = under_cap
                    .iter()
                    .copied()
                    .filter(|&idx| idx != current)
                    .collect();
                let pool = if others.is_empty() { under_cap } else { others };
                if pool.is_empty() {
                    Routing::Advance((current + 1) % self.names.len())
                } else {
                    Routing::Random(pool[self.rng.random_range(0..pool.len())])
                }
            }
        };

        let (from, to) = (&self.names[current], &self.names[routing.index()]);
        debug!(%from, %to, ?routing, "next speaker");
        self.current = routing.index();
        routing
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn elapsed(&self) -> u32 {
        self.elapsed
    }

    pub fn successful_turns(&self) -> u32 {
        self.successful
    }

    pub fn speak_counts(&self) -> &[u32] {
        &self.counts
    }

    pub fn name(&self, idx: usize) -> Option<&str> {
        self.names.get(idx).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn seeded(list: &[&str], seed: u64) -> TurnScheduler {
        TurnScheduler::new(
            names(list),
            &SchedulerConfig {
                seed: Some(seed),
                ..SchedulerConfig::default()
            },
        )
    }

    #[test]
    fn test_starts_at_first_debater() {
        let mut s = seeded(&["Atlas", "Nova", "Marcus"], 1);
        assert_eq!(s.next_speaker(), Ok(0));
        assert_eq!(s.elapsed(), 1);
    }

    #[test]
    fn test_mention_routes_deterministically() {
        for seed in 0..20 {
            let mut s = seeded(&["Atlas", "Nova", "Marcus", "Sterling"], seed);
            s.next_speaker().unwrap();
            s.record_success();
            let routing = s.route_after("I disagree with Marcus and Sterling on costs.");
            assert_eq!(routing, Routing::Mentioned(2));
        }
    }

    #[test]
    fn test_self_mention_ignored() {
        let mut s = seeded(&["Atlas", "Nova"], 3);
        s.next_speaker().unwrap();
        s.record_success();
        // Only "Atlas" is mentioned, which is the speaker itself.
        assert_eq!(s.route_after("As Atlas, I insist."), Routing::Random(1));
    }

    #[test]
    fn test_mention_of_capped_debater_falls_back_to_random() {
        let mut s = seeded(&["Atlas", "Nova", "Marcus"], 5);
        s.next_speaker().unwrap();
        s.record_success();
        s.counts[1] = 2;
        assert_eq!(s.route_after("Nova is right"), Routing::Random(2));
    }

    #[test]
    fn test_failure_advances_round_robin() {
        let mut s = seeded(&["Atlas", "Nova", "Marcus"], 9);
        s.next_speaker().unwrap();
        assert_eq!(s.record_failure(), Routing::Advance(1));
        assert_eq!(s.next_speaker(), Ok(1));
        assert_eq!(s.elapsed(), 2);
        assert_eq!(s.speak_counts(), &[0, 0, 0]);
    }

    #[test]
    fn test_capped_speaker_is_skipped() {
        let mut s = seeded(&["Atlas", "Nova"], 2);
        s.counts[0] = 2;
        assert_eq!(s.next_speaker(), Ok(1));
    }

    #[test]
    fn test_single_debater_exhausts_caps() {
        let mut s = seeded(&["Solo"], 0);
        assert_eq!(s.next_speaker(), Ok(0));
        s.record_success();
        assert_eq!(s.route_after("again"), Routing::Random(0));

        assert_eq!(s.next_speaker(), Ok(0));
        s.record_success();
        assert_eq!(s.route_after("again"), Routing::Advance(0));
        assert_eq!(s.next_speaker(), Err(StopReason::SpeakCapsExhausted));
    }

    #[test]
    fn test_interjection_every_third_success() {
        let mut s = seeded(&["Atlas", "Nova", "Marcus", "Sterling", "Maya"], 11);
        let mut interjections = Vec::new();
        while s.next_speaker().is_ok() {
            s.record_success();
            if s.should_interject() {
                interjections.push(s.successful_turns());
            }
            s.route_after("");
        }
        assert!(!interjections.is_empty());
        assert!(interjections.iter().all(|n| n % 3 == 0));
    }

    #[test]
    fn test_no_interjection_on_final_turn() {
        let config = SchedulerConfig {
            max_turns: 3,
            seed: Some(4),
            ..SchedulerConfig::default()
        };
        let mut s = TurnScheduler::new(names(&["Atlas", "Nova", "Marcus"]), &config);
        for _ in 0..3 {
            s.next_speaker().unwrap();
            s.record_success();
            s.route_after("");
        }
        // Third success is a multiple of 3 but it used the last iteration.
        assert_eq!(s.successful_turns(), 3);
        assert!(!s.should_interject());
        assert_eq!(s.next_speaker(), Err(StopReason::MaxTurns));
    }

    #[test]
    fn test_same_seed_same_order() {
        let run = |seed| {
            let mut s = seeded(&["Atlas", "Nova", "Marcus", "Sterling", "Maya"], seed);
            let mut order = Vec::new();
            while let Ok(idx) = s.next_speaker() {
                order.push(idx);
                s.record_success();
                s.route_after("no mentions here");
            }
            order
        };
        assert_eq!(run(42), run(42));
    }
}
