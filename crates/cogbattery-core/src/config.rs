//! Battery timing and policy configuration.
//!
//! Every field has a default matching the standard battery, so an empty
//! `[battery]` table (or none at all) yields the canonical protocol.

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Top-level battery configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatteryConfig {
    #[serde(default)]
    pub setup: SetupConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub stroop: StroopConfig,
    #[serde(default)]
    pub digit_span: DigitSpanConfig,
    #[serde(default)]
    pub reaction: ReactionConfig,
}

/// Setup validation rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetupConfig {
    /// Highest accepted week number. `None` accepts any week of 1 or higher;
    /// in TOML this is written as `max_week = 0`.
    #[serde(
        default = "default_max_week",
        deserialize_with = "deserialize_max_week",
        serialize_with = "serialize_max_week"
    )]
    pub max_week: Option<u32>,
}

fn default_max_week() -> Option<u32> {
    Some(3)
}

fn deserialize_max_week<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u32>, D::Error> {
    let max = u32::deserialize(d)?;
    Ok((max > 0).then_some(max))
}

fn serialize_max_week<S: Serializer>(max: &Option<u32>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u32(max.unwrap_or(0))
}

impl Default for SetupConfig {
    fn default() -> Self {
        Self {
            max_week: default_max_week(),
        }
    }
}

/// How the recall prompt side is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CuePolicy {
    /// Either word of the pair may be the prompt, drawn per item per round.
    Bidirectional,
    /// The left word is always the prompt.
    LeftOnly,
}

/// Paired-associate memory task settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default = "default_rounds")]
    pub rounds: u32,
    #[serde(default = "default_study_ms")]
    pub study_dwell_ms: u64,
    #[serde(default = "default_recall_ms")]
    pub recall_window_ms: u64,
    #[serde(default = "default_cue_policy")]
    pub cue_policy: CuePolicy,
}

fn default_rounds() -> u32 {
    3
}
fn default_study_ms() -> u64 {
    3000
}
fn default_recall_ms() -> u64 {
    8000
}
fn default_cue_policy() -> CuePolicy {
    CuePolicy::Bidirectional
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            rounds: default_rounds(),
            study_dwell_ms: default_study_ms(),
            recall_window_ms: default_recall_ms(),
            cue_policy: default_cue_policy(),
        }
    }
}

impl MemoryConfig {
    pub fn study_dwell(&self) -> Duration {
        Duration::from_millis(self.study_dwell_ms)
    }

    pub fn recall_window(&self) -> Duration {
        Duration::from_millis(self.recall_window_ms)
    }
}

/// Stroop color-naming task settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StroopConfig {
    /// Length of each phase in seconds.
    #[serde(default = "default_phase_secs")]
    pub phase_secs: u32,
}

fn default_phase_secs() -> u32 {
    45
}

impl Default for StroopConfig {
    fn default() -> Self {
        Self {
            phase_secs: default_phase_secs(),
        }
    }
}

/// Sorted digit-span ladder settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigitSpanConfig {
    #[serde(default = "default_start_len")]
    pub start_length: usize,
    #[serde(default = "default_max_len")]
    pub max_length: usize,
    #[serde(default = "default_trials_per_len")]
    pub trials_per_length: u32,
    #[serde(default = "default_digit_ms")]
    pub digit_display_ms: u64,
    #[serde(default = "default_gap_ms")]
    pub digit_gap_ms: u64,
    #[serde(default = "default_input_ms")]
    pub input_timeout_ms: u64,
}

fn default_start_len() -> usize {
    3
}
fn default_max_len() -> usize {
    9
}
fn default_trials_per_len() -> u32 {
    2
}
fn default_digit_ms() -> u64 {
    1000
}
fn default_gap_ms() -> u64 {
    300
}
fn default_input_ms() -> u64 {
    5000
}

impl Default for DigitSpanConfig {
    fn default() -> Self {
        Self {
            start_length: default_start_len(),
            max_length: default_max_len(),
            trials_per_length: default_trials_per_len(),
            digit_display_ms: default_digit_ms(),
            digit_gap_ms: default_gap_ms(),
            input_timeout_ms: default_input_ms(),
        }
    }
}

/// Simple reaction-time task settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactionConfig {
    #[serde(default = "default_rt_trials")]
    pub trials: u32,
    /// Inclusive lower bound of the random pre-stimulus and hide delays.
    #[serde(default = "default_delay_min")]
    pub delay_min_ms: u64,
    /// Inclusive upper bound of the random pre-stimulus and hide delays.
    #[serde(default = "default_delay_max")]
    pub delay_max_ms: u64,
}

fn default_rt_trials() -> u32 {
    20
}
fn default_delay_min() -> u64 {
    3000
}
fn default_delay_max() -> u64 {
    3500
}

impl Default for ReactionConfig {
    fn default() -> Self {
        Self {
            trials: default_rt_trials(),
            delay_min_ms: default_delay_min(),
            delay_max_ms: default_delay_max(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_standard_protocol() {
        let config = BatteryConfig::default();
        assert_eq!(config.setup.max_week, Some(3));
        assert_eq!(config.memory.rounds, 3);
        assert_eq!(config.memory.study_dwell(), Duration::from_secs(3));
        assert_eq!(config.memory.recall_window(), Duration::from_secs(8));
        assert_eq!(config.memory.cue_policy, CuePolicy::Bidirectional);
        assert_eq!(config.stroop.phase_secs, 45);
        assert_eq!(config.digit_span.start_length, 3);
        assert_eq!(config.digit_span.max_length, 9);
        assert_eq!(config.digit_span.trials_per_length, 2);
        assert_eq!(config.reaction.trials, 20);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let toml_str = r#"
[memory]
cue_policy = "left_only"

[digit_span]
digit_gap_ms = 600
"#;
        let config: BatteryConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.memory.cue_policy, CuePolicy::LeftOnly);
        assert_eq!(config.memory.study_dwell_ms, 3000);
        assert_eq!(config.digit_span.digit_gap_ms, 600);
        assert_eq!(config.digit_span.input_timeout_ms, 5000);
        assert_eq!(config.reaction.delay_max_ms, 3500);
        assert_eq!(config.setup.max_week, Some(3));
    }

    #[test]
    fn zero_max_week_means_unbounded() {
        let config: BatteryConfig = toml::from_str("[setup]\nmax_week = 0\n").unwrap();
        assert_eq!(config.setup.max_week, None);

        let written = toml::to_string(&config).unwrap();
        let reread: BatteryConfig = toml::from_str(&written).unwrap();
        assert_eq!(reread.setup.max_week, None);
    }
}
