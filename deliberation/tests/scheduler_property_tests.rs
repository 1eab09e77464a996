//! Scheduler property tests: seeded-loop validation of the turn-taking
//! invariants across roster sizes, caps and failure patterns.
//!
//! Tests verify:
//! - No debater ever exceeds the speak cap
//! - The debating phase ends within the turn bound for every seed
//! - Explicit mentions route deterministically, whatever the seed
//! - Interjections fall only on multiples of the interval and never on the
//!   final allowed iteration

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use deliberation::{Routing, SchedulerConfig, StopReason, TurnScheduler};

const NAMES: [&str; 6] = ["Atlas", "Nova", "Marcus", "Sterling", "Maya", "Iris"];

fn roster(size: usize) -> Vec<String> {
    NAMES[..size].iter().map(|n| n.to_string()).collect()
}

fn config(seed: u64, cap: u32, max_turns: u32) -> SchedulerConfig {
    SchedulerConfig {
        max_speaks_per_agent: cap,
        max_turns,
        seed: Some(seed),
        ..SchedulerConfig::default()
    }
}

/// What one simulated debate observed.
struct Run {
    iterations: u32,
    stop: StopReason,
    interjections: Vec<(u32, u32)>,
}

/// Drive a scheduler to completion. `fail_rate` is the chance (percent) that
/// a turn errors; text occasionally mentions another debater.
fn simulate(size: usize, cfg: &SchedulerConfig, seed: u64, fail_rate: u32) -> Run {
    let names = roster(size);
    let mut scheduler = TurnScheduler::new(names.clone(), cfg);
    let mut dice = StdRng::seed_from_u64(seed ^ 0x5eed);
    let mut iterations = 0;
    let mut interjections = Vec::new();

    loop {
        let idx = match scheduler.next_speaker() {
            Ok(idx) => idx,
            Err(stop) => {
                return Run {
                    iterations,
                    stop,
                    interjections,
                }
            }
        };
        iterations += 1;
        assert!(
            scheduler.speak_counts()[idx] < cfg.max_speaks_per_agent,
            "seed {seed}: picked {} at cap",
            names[idx]
        );
        assert!(iterations <= cfg.max_turns, "seed {seed}: ran past the bound");

        if dice.random_range(0..100) < fail_rate {
            scheduler.record_failure();
            continue;
        }

        scheduler.record_success();
        assert!(scheduler.speak_counts()[idx] <= cfg.max_speaks_per_agent);
        if scheduler.should_interject() {
            interjections.push((scheduler.successful_turns(), scheduler.elapsed()));
        }

        let text = if dice.random_bool(0.3) {
            format!("I disagree with {}.", names[dice.random_range(0..size)])
        } else {
            "Numbers first.".to_string()
        };
        scheduler.route_after(&text);
    }
}

// ── Property: speak cap never exceeded ─────────────────────────────

#[test]
fn prop_speak_cap_never_exceeded() {
    for size in 1..=NAMES.len() {
        for cap in 1..=3 {
            for seed in 0..100 {
                let cfg = config(seed, cap, 12);
                let names = roster(size);
                let mut scheduler = TurnScheduler::new(names, &cfg);
                while let Ok(_idx) = scheduler.next_speaker() {
                    scheduler.record_success();
                    assert!(scheduler.speak_counts().iter().all(|&c| c <= cap));
                    scheduler.route_after("Agreed.");
                }
            }
        }
    }
}

// ── Property: debating ends within the bound ───────────────────────

#[test]
fn prop_debate_ends_within_bound() {
    for size in 1..=NAMES.len() {
        for fail_rate in [0, 25, 60, 100] {
            for seed in 0..100 {
                let cfg = config(seed, 2, 10);
                let run = simulate(size, &cfg, seed, fail_rate);
                assert!(run.iterations <= 10, "size {size} seed {seed}");
                if fail_rate == 100 {
                    assert_eq!(run.stop, StopReason::MaxTurns);
                    assert!(run.interjections.is_empty());
                }
            }
        }
    }
}

#[test]
fn prop_full_success_stops_on_a_guardrail() {
    for seed in 0..200 {
        let cfg = config(seed, 2, 10);
        let run = simulate(5, &cfg, seed, 0);
        // Five debaters, ten iterations and an early exit from five onward.
        assert!(run.iterations >= 5 || run.stop == StopReason::SpeakCapsExhausted);
        if run.stop == StopReason::AllDebatersHeard {
            assert!(run.iterations >= cfg.min_turns_before_early_exit);
        }
    }
}

// ── Property: interjection cadence ─────────────────────────────────

#[test]
fn prop_interjections_on_interval_and_never_last() {
    for size in 2..=NAMES.len() {
        for seed in 0..100 {
            let cfg = config(seed, 3, 10);
            let run = simulate(size, &cfg, seed, 20);
            for (successful, elapsed) in run.interjections {
                assert_eq!(successful % cfg.interjection_every, 0);
                assert!(elapsed < cfg.max_turns, "seed {seed}: interjected on the final turn");
            }
        }
    }
}

// ── Property: mention routing is deterministic ─────────────────────

#[test]
fn prop_mention_routing_ignores_seed() {
    for seed in 0..50 {
        let mut scheduler = TurnScheduler::new(roster(5), &config(seed, 2, 10));
        assert_eq!(scheduler.next_speaker(), Ok(0));
        scheduler.record_success();
        assert_eq!(
            scheduler.route_after("Marcus and Maya both missed the lease cost."),
            Routing::Mentioned(2)
        );
        assert_eq!(scheduler.next_speaker(), Ok(2));
    }
}

#[test]
fn prop_same_seed_same_schedule() {
    for seed in 0..50 {
        let picks = |seed| {
            let mut scheduler = TurnScheduler::new(roster(5), &config(seed, 2, 10));
            let mut order = Vec::new();
            while let Ok(idx) = scheduler.next_speaker() {
                order.push(idx);
                scheduler.record_success();
                scheduler.route_after("Go.");
            }
            order
        };
        assert_eq!(picks(seed), picks(seed));
    }
}
