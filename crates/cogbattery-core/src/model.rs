//! Core data model types for cogbattery.
//!
//! The word lists and color set are fixed battery content; only timing is
//! configurable (see [`crate::config`]).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of pairs in every wordset.
pub const PAIRS_PER_WORDSET: usize = 12;

/// A cue-target word pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pair {
    pub cue: String,
    pub target: String,
}

impl Pair {
    pub fn new(cue: &str, target: &str) -> Self {
        Self {
            cue: cue.to_string(),
            target: target.to_string(),
        }
    }

    /// Returns the `(prompt, expected)` words for the given side.
    pub fn prompt(&self, side: CueSide) -> (&str, &str) {
        match side {
            CueSide::Left => (&self.cue, &self.target),
            CueSide::Right => (&self.target, &self.cue),
        }
    }
}

/// Which word of a pair is shown as the recall prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CueSide {
    Left,
    Right,
}

type RawWordset = [(&'static str, &'static str); PAIRS_PER_WORDSET];

/// The three fixed wordsets of one-syllable, unrelated pairs.
pub const WORDSETS: [RawWordset; 3] = [
    [
        ("cat", "ring"),
        ("sun", "jam"),
        ("bed", "rope"),
        ("fish", "bell"),
        ("tree", "mask"),
        ("star", "shoe"),
        ("book", "coal"),
        ("rain", "gold"),
        ("glass", "farm"),
        ("road", "leaf"),
        ("bread", "wave"),
        ("clock", "sand"),
    ],
    [
        ("ship", "barn"),
        ("salt", "glove"),
        ("stone", "card"),
        ("wind", "seat"),
        ("lamp", "knot"),
        ("foot", "surf"),
        ("milk", "twig"),
        ("ring", "cup"),
        ("seed", "mine"),
        ("bell", "sky"),
        ("leaf", "hook"),
        ("mask", "page"),
    ],
    [
        ("coal", "bed"),
        ("gate", "fish"),
        ("wave", "bread"),
        ("sand", "star"),
        ("chair", "rain"),
        ("hand", "glass"),
        ("card", "sun"),
        ("wheel", "book"),
        ("barn", "cat"),
        ("rope", "tree"),
        ("bird", "road"),
        ("jam", "ship"),
    ],
];

/// Materialize the pairs of wordset `index` (0..3).
///
/// # Panics
///
/// Panics if `index` is not a valid wordset index; callers obtain it from
/// [`crate::assignment::select_wordset`].
pub fn wordset(index: usize) -> Vec<Pair> {
    WORDSETS[index]
        .iter()
        .map(|(cue, target)| Pair::new(cue, target))
        .collect()
}

/// The ink/answer colors of the Stroop task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Red,
    Green,
    Blue,
    Yellow,
}

impl Color {
    pub const ALL: [Color; 4] = [Color::Red, Color::Green, Color::Blue, Color::Yellow];
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::Red => write!(f, "red"),
            Color::Green => write!(f, "green"),
            Color::Blue => write!(f, "blue"),
            Color::Yellow => write!(f, "yellow"),
        }
    }
}

impl FromStr for Color {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "red" | "r" => Ok(Color::Red),
            "green" | "g" => Ok(Color::Green),
            "blue" | "b" => Ok(Color::Blue),
            "yellow" | "y" => Ok(Color::Yellow),
            other => Err(format!("unknown color: {other}")),
        }
    }
}

/// The four tasks of the battery, in hub order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Memory,
    Stroop,
    DigitSpan,
    Reaction,
}

impl TaskKind {
    pub const ALL: [TaskKind; 4] = [
        TaskKind::Memory,
        TaskKind::Stroop,
        TaskKind::DigitSpan,
        TaskKind::Reaction,
    ];
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskKind::Memory => write!(f, "memory"),
            TaskKind::Stroop => write!(f, "stroop"),
            TaskKind::DigitSpan => write!(f, "digit-span"),
            TaskKind::Reaction => write!(f, "reaction-time"),
        }
    }
}

impl FromStr for TaskKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "memory" | "1" => Ok(TaskKind::Memory),
            "stroop" | "2" => Ok(TaskKind::Stroop),
            "digit-span" | "digits" | "digit_span" | "3" => Ok(TaskKind::DigitSpan),
            "reaction-time" | "reaction" | "rt" | "4" => Ok(TaskKind::Reaction),
            other => Err(format!("unknown task: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_wordset_has_twelve_distinct_cues() {
        for index in 0..WORDSETS.len() {
            let pairs = wordset(index);
            assert_eq!(pairs.len(), PAIRS_PER_WORDSET);
            let mut cues: Vec<_> = pairs.iter().map(|p| p.cue.as_str()).collect();
            cues.sort_unstable();
            cues.dedup();
            assert_eq!(cues.len(), PAIRS_PER_WORDSET, "wordset {index}");
        }
    }

    #[test]
    fn prompt_swaps_with_side() {
        let pair = Pair::new("cat", "ring");
        assert_eq!(pair.prompt(CueSide::Left), ("cat", "ring"));
        assert_eq!(pair.prompt(CueSide::Right), ("ring", "cat"));
    }

    #[test]
    fn color_display_and_parse() {
        assert_eq!(Color::Yellow.to_string(), "yellow");
        assert_eq!("R".parse::<Color>().unwrap(), Color::Red);
        assert_eq!(" blue ".parse::<Color>().unwrap(), Color::Blue);
        assert!("purple".parse::<Color>().is_err());
    }

    #[test]
    fn task_kind_parse_accepts_hub_numbers() {
        assert_eq!("3".parse::<TaskKind>().unwrap(), TaskKind::DigitSpan);
        assert_eq!("rt".parse::<TaskKind>().unwrap(), TaskKind::Reaction);
        assert_eq!(TaskKind::DigitSpan.to_string(), "digit-span");
        assert!("chess".parse::<TaskKind>().is_err());
    }
}
