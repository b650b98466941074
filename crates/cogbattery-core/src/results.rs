//! Per-task outcomes and the aggregated session result.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Placeholder submitted when no reaction was recorded.
pub const NO_DATA: &str = "no data";

/// One scored recall prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecallAnswer {
    /// Position of the pair in its wordset.
    pub pair_index: usize,
    pub prompt: String,
    pub expected: String,
    /// What the participant typed, `None` if the window expired.
    pub given: Option<String>,
    pub correct: bool,
}

/// Outcome of one study + recall round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundResult {
    /// 1-based round number.
    pub round: u32,
    /// Number of correct answers, 0..=12.
    pub correct: u32,
    #[serde(default)]
    pub answers: Vec<RecallAnswer>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryOutcome {
    pub rounds: Vec<RoundResult>,
}

impl MemoryOutcome {
    /// Correct count of 1-based `round`, 0 if that round did not run.
    pub fn round_score(&self, round: u32) -> u32 {
        self.rounds
            .iter()
            .find(|r| r.round == round)
            .map(|r| r.correct)
            .unwrap_or(0)
    }

    pub fn total_correct(&self) -> u32 {
        self.rounds.iter().map(|r| r.correct).sum()
    }
}

/// Counts for one Stroop phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StroopPhaseResult {
    pub correct: u32,
    pub responses: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StroopOutcome {
    pub congruent: StroopPhaseResult,
    pub incongruent: StroopPhaseResult,
}

impl StroopOutcome {
    /// Congruent minus incongruent correct count; larger means more interference.
    pub fn interference(&self) -> i64 {
        i64::from(self.congruent.correct) - i64::from(self.incongruent.correct)
    }
}

/// One digit-span trial as presented and answered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigitSpanTrial {
    pub length: usize,
    pub presented: Vec<u8>,
    pub response: String,
    pub correct: bool,
    pub timed_out: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigitSpanOutcome {
    /// Longest length with at least one passed trial, 0 if none.
    pub best_length: usize,
    #[serde(default)]
    pub trials: Vec<DigitSpanTrial>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionOutcome {
    /// Latencies of the trials that got a response.
    pub latencies_ms: Vec<u64>,
    /// Trials whose stimulus expired without a response.
    pub misses: u32,
    /// Responses given before the stimulus appeared.
    #[serde(default)]
    pub anticipations: u32,
}

impl ReactionOutcome {
    /// Mean latency over responded trials, `None` when nothing was recorded.
    pub fn mean_ms(&self) -> Option<f64> {
        if self.latencies_ms.is_empty() {
            return None;
        }
        let sum: u64 = self.latencies_ms.iter().sum();
        Some(sum as f64 / self.latencies_ms.len() as f64)
    }
}

/// The aggregated result of a completed session. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalResults {
    pub session_id: Uuid,
    pub participant_id: String,
    pub week: u32,
    pub wordset_index: usize,
    pub memory: MemoryOutcome,
    pub stroop: StroopOutcome,
    pub digit_span: DigitSpanOutcome,
    pub reaction: ReactionOutcome,
    pub reaction_mean_ms: Option<f64>,
    pub completed_at: DateTime<Utc>,
}

impl FinalResults {
    /// Flatten into the fields posted to the result form.
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        let reaction = match self.reaction_mean_ms {
            Some(mean) => format!("{mean:.0}"),
            None => NO_DATA.to_string(),
        };
        vec![
            ("participantId", self.participant_id.clone()),
            ("weekNumber", self.week.to_string()),
            ("memory.round1", self.memory.round_score(1).to_string()),
            ("memory.round2", self.memory.round_score(2).to_string()),
            ("memory.round3", self.memory.round_score(3).to_string()),
            ("stroop.congruent", self.stroop.congruent.correct.to_string()),
            (
                "stroop.incongruent",
                self.stroop.incongruent.correct.to_string(),
            ),
            ("digitSpanBestLength", self.digit_span.best_length.to_string()),
            ("reactionTimeMeanMs", reaction),
        ]
    }

    /// Save the results as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize results")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write results to {}", path.display()))?;
        Ok(())
    }

    /// Load results from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read results from {}", path.display()))?;
        let results: FinalResults =
            serde_json::from_str(&content).context("failed to parse results JSON")?;
        Ok(results)
    }
}

#[cfg(test)]
pub(crate) fn sample_results() -> FinalResults {
    FinalResults {
        session_id: Uuid::nil(),
        participant_id: "1001".into(),
        week: 2,
        wordset_index: 1,
        memory: MemoryOutcome {
            rounds: vec![
                RoundResult {
                    round: 1,
                    correct: 4,
                    answers: vec![],
                },
                RoundResult {
                    round: 2,
                    correct: 9,
                    answers: vec![],
                },
                RoundResult {
                    round: 3,
                    correct: 12,
                    answers: vec![],
                },
            ],
        },
        stroop: StroopOutcome {
            congruent: StroopPhaseResult {
                correct: 40,
                responses: 42,
            },
            incongruent: StroopPhaseResult {
                correct: 31,
                responses: 35,
            },
        },
        digit_span: DigitSpanOutcome {
            best_length: 6,
            trials: vec![],
        },
        reaction: ReactionOutcome {
            latencies_ms: vec![300, 350],
            misses: 18,
            anticipations: 0,
        },
        reaction_mean_ms: Some(325.0),
        completed_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reaction_mean_ignores_misses() {
        let outcome = ReactionOutcome {
            latencies_ms: vec![200, 300, 400],
            misses: 17,
            anticipations: 2,
        };
        assert_eq!(outcome.mean_ms(), Some(300.0));
    }

    #[test]
    fn reaction_mean_without_responses_is_no_data() {
        let outcome = ReactionOutcome {
            latencies_ms: vec![],
            misses: 20,
            anticipations: 0,
        };
        assert_eq!(outcome.mean_ms(), None);
    }

    #[test]
    fn form_fields_use_submission_names() {
        let results = sample_results();
        let fields = results.form_fields();
        let get = |name: &str| {
            fields
                .iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v.clone())
                .unwrap()
        };
        assert_eq!(get("participantId"), "1001");
        assert_eq!(get("weekNumber"), "2");
        assert_eq!(get("memory.round1"), "4");
        assert_eq!(get("memory.round3"), "12");
        assert_eq!(get("stroop.congruent"), "40");
        assert_eq!(get("stroop.incongruent"), "31");
        assert_eq!(get("digitSpanBestLength"), "6");
        assert_eq!(get("reactionTimeMeanMs"), "325");
        assert_eq!(fields.len(), 9);
    }

    #[test]
    fn form_fields_report_missing_reaction_as_no_data() {
        let mut results = sample_results();
        results.reaction_mean_ms = None;
        let fields = results.form_fields();
        assert!(fields.contains(&("reactionTimeMeanMs", NO_DATA.to_string())));
    }

    #[test]
    fn stroop_interference_can_be_negative() {
        let mut outcome = sample_results().stroop;
        assert_eq!(outcome.interference(), 9);
        outcome.incongruent.correct = 50;
        assert_eq!(outcome.interference(), -10);
    }

    #[test]
    fn save_and_load_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("results.json");
        let results = sample_results();
        results.save_json(&path).unwrap();

        let loaded = FinalResults::load_json(&path).unwrap();
        assert_eq!(loaded.participant_id, "1001");
        assert_eq!(loaded.memory.total_correct(), 25);
        assert_eq!(loaded.reaction_mean_ms, Some(325.0));
    }
}
