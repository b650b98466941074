//! Paired-associate memory task.
//!
//! Each round shows every pair for a fixed dwell time, then prompts with one
//! word of each pair in a fresh random order and scores the typed partner.

use rand::Rng;

use crate::assignment::shuffled_indices;
use crate::config::{CuePolicy, MemoryConfig};
use crate::model::{CueSide, Pair, TaskKind};
use crate::observer::Frame;
use crate::results::{MemoryOutcome, RecallAnswer, RoundResult};
use crate::timer::{Schedule, TimerKind};

use super::{BatteryTask, Input, TaskContext, TaskOutcome};

/// Case-insensitive, whitespace-trimmed exact match.
pub fn is_correct(given: &str, expected: &str) -> bool {
    given.trim().to_lowercase() == expected.trim().to_lowercase()
}

#[derive(Debug, Clone)]
struct RecallItem {
    pair_index: usize,
    prompt: String,
    expected: String,
}

#[derive(Debug)]
enum MemoryState {
    Idle,
    Study {
        round: u32,
        order: Vec<usize>,
        index: usize,
    },
    Recall {
        round: u32,
        items: Vec<RecallItem>,
        index: usize,
        answers: Vec<RecallAnswer>,
    },
    Done,
}

pub struct MemoryTask {
    config: MemoryConfig,
    pairs: Vec<Pair>,
    state: MemoryState,
    rounds: Vec<RoundResult>,
}

impl MemoryTask {
    pub fn new(config: MemoryConfig, pairs: Vec<Pair>) -> Self {
        Self {
            config,
            pairs,
            state: MemoryState::Idle,
            rounds: Vec::new(),
        }
    }

    /// Current round, 0 before the task starts.
    pub fn round(&self) -> u32 {
        match &self.state {
            MemoryState::Study { round, .. } | MemoryState::Recall { round, .. } => *round,
            MemoryState::Idle => 0,
            MemoryState::Done => self.config.rounds,
        }
    }

    pub fn is_studying(&self) -> bool {
        matches!(self.state, MemoryState::Study { .. })
    }

    pub fn is_recalling(&self) -> bool {
        matches!(self.state, MemoryState::Recall { .. })
    }

    fn begin_study(&mut self, round: u32, ctx: &mut TaskContext<'_>) {
        let order = shuffled_indices(self.pairs.len(), ctx.rng);
        tracing::debug!(round, "memory study started");
        if order.is_empty() {
            self.begin_recall(round, ctx);
            return;
        }
        self.state = MemoryState::Study {
            round,
            order,
            index: 0,
        };
        self.show_study_pair(ctx);
        ctx.timers.start(
            TimerKind::Ticker,
            Schedule::Every(self.config.study_dwell()),
        );
    }

    fn show_study_pair(&self, ctx: &TaskContext<'_>) {
        if let MemoryState::Study {
            round,
            order,
            index,
        } = &self.state
        {
            let pair = &self.pairs[order[*index]];
            ctx.emit(Frame::StudyPair {
                round: *round,
                index: *index,
                total: order.len(),
                cue: pair.cue.clone(),
                target: pair.target.clone(),
                progress: *index as f64 / order.len() as f64,
            });
        }
    }

    fn advance_study(&mut self, ctx: &mut TaskContext<'_>) {
        let MemoryState::Study {
            round,
            order,
            index,
        } = &mut self.state
        else {
            return;
        };
        *index += 1;
        if *index < order.len() {
            self.show_study_pair(ctx);
            return;
        }
        let round = *round;
        ctx.timers.cancel(TimerKind::Ticker);
        self.begin_recall(round, ctx);
    }

    fn begin_recall(&mut self, round: u32, ctx: &mut TaskContext<'_>) {
        let order = shuffled_indices(self.pairs.len(), ctx.rng);
        let items: Vec<RecallItem> = order
            .into_iter()
            .map(|pair_index| {
                let side = match self.config.cue_policy {
                    CuePolicy::LeftOnly => CueSide::Left,
                    CuePolicy::Bidirectional if ctx.rng.gen_bool(0.5) => CueSide::Left,
                    CuePolicy::Bidirectional => CueSide::Right,
                };
                let (prompt, expected) = self.pairs[pair_index].prompt(side);
                RecallItem {
                    pair_index,
                    prompt: prompt.to_string(),
                    expected: expected.to_string(),
                }
            })
            .collect();

        if items.is_empty() {
            self.finish_round(round, Vec::new(), ctx);
            return;
        }
        self.state = MemoryState::Recall {
            round,
            items,
            index: 0,
            answers: Vec::new(),
        };
        self.present_cue(ctx);
    }

    fn present_cue(&self, ctx: &mut TaskContext<'_>) {
        if let MemoryState::Recall {
            round,
            items,
            index,
            ..
        } = &self.state
        {
            ctx.emit(Frame::RecallCue {
                round: *round,
                item: *index,
                total: items.len(),
                prompt: items[*index].prompt.clone(),
            });
            ctx.timers.start(
                TimerKind::Deadline,
                Schedule::Once(self.config.recall_window()),
            );
        }
    }

    /// Score the current cue. `None` means the answer window expired.
    fn answer(&mut self, given: Option<String>, ctx: &mut TaskContext<'_>) {
        let MemoryState::Recall {
            round,
            items,
            index,
            answers,
        } = &mut self.state
        else {
            return;
        };

        let item = &items[*index];
        let timed_out = given.is_none();
        let correct = given
            .as_deref()
            .is_some_and(|g| is_correct(g, &item.expected));
        answers.push(RecallAnswer {
            pair_index: item.pair_index,
            prompt: item.prompt.clone(),
            expected: item.expected.clone(),
            given,
            correct,
        });
        ctx.emit(Frame::RecallScored {
            round: *round,
            item: *index,
            correct,
            timed_out,
        });

        *index += 1;
        if *index < items.len() {
            self.present_cue(ctx);
            return;
        }

        let round = *round;
        let answers = std::mem::take(answers);
        ctx.timers.cancel(TimerKind::Deadline);
        self.finish_round(round, answers, ctx);
    }

    fn finish_round(&mut self, round: u32, answers: Vec<RecallAnswer>, ctx: &mut TaskContext<'_>) {
        let correct = answers.iter().filter(|a| a.correct).count() as u32;
        ctx.emit(Frame::RoundComplete {
            round,
            correct,
            total: answers.len(),
        });
        tracing::debug!(round, correct, "memory round complete");
        self.rounds.push(RoundResult {
            round,
            correct,
            answers,
        });

        if round < self.config.rounds {
            self.begin_study(round + 1, ctx);
        } else {
            self.state = MemoryState::Done;
            ctx.emit(Frame::TaskComplete {
                task: TaskKind::Memory,
            });
        }
    }
}

impl BatteryTask for MemoryTask {
    fn kind(&self) -> TaskKind {
        TaskKind::Memory
    }

    fn start(&mut self, ctx: &mut TaskContext<'_>) {
        self.rounds.clear();
        if self.config.rounds == 0 {
            self.state = MemoryState::Done;
            return;
        }
        self.begin_study(1, ctx);
    }

    fn on_timer(&mut self, kind: TimerKind, ctx: &mut TaskContext<'_>) {
        match (kind, &self.state) {
            (TimerKind::Ticker, MemoryState::Study { .. }) => self.advance_study(ctx),
            (TimerKind::Deadline, MemoryState::Recall { .. }) => self.answer(None, ctx),
            _ => {}
        }
    }

    fn on_input(&mut self, input: Input, ctx: &mut TaskContext<'_>) {
        match (input, &self.state) {
            (Input::Text(text), MemoryState::Recall { .. }) => self.answer(Some(text), ctx),
            (Input::SkipStudy, MemoryState::Study { .. }) => {
                self.advance_study(ctx);
                if self.is_studying() {
                    // the next pair gets its full dwell time
                    ctx.timers.start(
                        TimerKind::Ticker,
                        Schedule::Every(self.config.study_dwell()),
                    );
                }
            }
            _ => {}
        }
    }

    fn outcome(&self) -> Option<TaskOutcome> {
        match self.state {
            MemoryState::Done => Some(TaskOutcome::Memory(MemoryOutcome {
                rounds: self.rounds.clone(),
            })),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::wordset;
    use crate::tasks::testing::Harness;
    use crate::timer::TimerService;

    fn task(policy: CuePolicy) -> MemoryTask {
        MemoryTask::new(
            MemoryConfig {
                cue_policy: policy,
                ..Default::default()
            },
            wordset(0),
        )
    }

    fn study_through(h: &mut Harness, task: &mut MemoryTask) {
        while task.is_studying() {
            assert!(h.fire(task, TimerKind::Ticker));
        }
    }

    fn current_cue(h: &Harness) -> String {
        h.frames()
            .iter()
            .rev()
            .find_map(|f| match f {
                Frame::RecallCue { prompt, .. } => Some(prompt.clone()),
                _ => None,
            })
            .unwrap()
    }

    fn partner(prompt: &str) -> String {
        let pair = wordset(0)
            .into_iter()
            .find(|p| p.cue == prompt || p.target == prompt)
            .unwrap();
        if pair.cue == prompt {
            pair.target
        } else {
            pair.cue
        }
    }

    #[test]
    fn answer_matching_ignores_case_and_padding() {
        assert!(is_correct("  Ring ", "ring"));
        assert!(is_correct("CAT", "cat"));
        assert!(!is_correct("rings", "ring"));
        assert!(!is_correct("", "ring"));
    }

    #[test]
    fn study_shows_each_pair_then_switches_to_recall() {
        let mut h = Harness::new(1);
        let mut task = task(CuePolicy::Bidirectional);
        h.start(&mut task);

        assert_eq!(task.round(), 1);
        assert!(matches!(
            h.timers.scheduled(TimerKind::Ticker),
            Some(Schedule::Every(d)) if d.as_millis() == 3000
        ));

        study_through(&mut h, &mut task);

        let study_frames: Vec<_> = h
            .frames()
            .into_iter()
            .filter_map(|f| match f {
                Frame::StudyPair {
                    index, progress, ..
                } => Some((index, progress)),
                _ => None,
            })
            .collect();
        assert_eq!(study_frames.len(), 12);
        assert_eq!(study_frames[0], (0, 0.0));
        assert_eq!(study_frames[6], (6, 0.5));

        assert!(task.is_recalling());
        assert!(!h.timers.is_armed(TimerKind::Ticker));
        assert!(matches!(
            h.timers.scheduled(TimerKind::Deadline),
            Some(Schedule::Once(d)) if d.as_millis() == 8000
        ));
    }

    #[test]
    fn skip_study_advances_and_rearms_dwell() {
        let mut h = Harness::new(2);
        let mut task = task(CuePolicy::Bidirectional);
        h.start(&mut task);
        let before = h.timers.fire(TimerKind::Ticker).unwrap();

        h.input(&mut task, Input::SkipStudy);
        let after = h.timers.fire(TimerKind::Ticker).unwrap();
        assert_ne!(before.id, after.id);
        assert!(matches!(
            h.last_frame(),
            Some(Frame::StudyPair { index: 1, .. })
        ));

        for _ in 0..11 {
            h.input(&mut task, Input::SkipStudy);
        }
        assert!(task.is_recalling());
        assert!(!h.timers.is_armed(TimerKind::Ticker));
    }

    #[test]
    fn perfect_recall_scores_twelve_every_round() {
        let mut h = Harness::new(3);
        let mut task = task(CuePolicy::Bidirectional);
        h.start(&mut task);

        for round in 1..=3 {
            assert_eq!(task.round(), round);
            study_through(&mut h, &mut task);
            for _ in 0..12 {
                let answer = partner(&current_cue(&h)).to_uppercase();
                h.input(&mut task, Input::Text(format!(" {answer} ")));
            }
        }

        let Some(TaskOutcome::Memory(outcome)) = task.outcome() else {
            panic!("memory task should be done");
        };
        assert_eq!(outcome.rounds.len(), 3);
        for (i, round) in outcome.rounds.iter().enumerate() {
            assert_eq!(round.round, i as u32 + 1);
            assert_eq!(round.correct, 12);
            assert_eq!(round.answers.len(), 12);
        }
        assert!(!h.timers.is_armed(TimerKind::Deadline));
        assert!(!h.timers.is_armed(TimerKind::Ticker));
        assert!(matches!(
            h.last_frame(),
            Some(Frame::TaskComplete {
                task: TaskKind::Memory
            })
        ));
    }

    #[test]
    fn expired_windows_count_as_incorrect() {
        let mut h = Harness::new(4);
        let mut task = task(CuePolicy::Bidirectional);
        h.start(&mut task);

        for _ in 1..=3 {
            study_through(&mut h, &mut task);
            // first cue answered, the rest time out
            let answer = partner(&current_cue(&h));
            h.input(&mut task, Input::Text(answer));
            while task.is_recalling() {
                assert!(h.fire(&mut task, TimerKind::Deadline));
            }
        }

        let Some(TaskOutcome::Memory(outcome)) = task.outcome() else {
            panic!("memory task should be done");
        };
        for round in &outcome.rounds {
            assert_eq!(round.correct, 1);
            assert_eq!(round.answers.iter().filter(|a| a.given.is_none()).count(), 11);
        }
    }

    #[test]
    fn left_only_policy_always_prompts_with_cue_word() {
        let mut h = Harness::new(5);
        let mut task = task(CuePolicy::LeftOnly);
        h.start(&mut task);
        study_through(&mut h, &mut task);

        let cues: Vec<String> = wordset(0).into_iter().map(|p| p.cue).collect();
        for _ in 0..12 {
            let prompt = current_cue(&h);
            assert!(cues.contains(&prompt), "{prompt} is not a left word");
            h.input(&mut task, Input::Text(String::new()));
        }
    }

    #[test]
    fn bidirectional_policy_uses_both_sides() {
        let mut h = Harness::new(6);
        let mut task = task(CuePolicy::Bidirectional);
        h.start(&mut task);

        let targets: Vec<String> = wordset(0).into_iter().map(|p| p.target).collect();
        let mut saw_target_prompt = false;
        for _ in 1..=3 {
            study_through(&mut h, &mut task);
            for _ in 0..12 {
                saw_target_prompt |= targets.contains(&current_cue(&h));
                h.input(&mut task, Input::Text("x".into()));
            }
        }
        assert!(saw_target_prompt);
    }

    #[test]
    fn typing_during_study_is_ignored() {
        let mut h = Harness::new(7);
        let mut task = task(CuePolicy::Bidirectional);
        h.start(&mut task);
        h.input(&mut task, Input::Text("ring".into()));
        assert!(task.is_studying());
        assert!(task.outcome().is_none());
    }

    #[test]
    fn recall_answers_point_at_wordset_positions() {
        let mut h = Harness::new(9);
        let mut task = task(CuePolicy::Bidirectional);
        h.start(&mut task);
        study_through(&mut h, &mut task);
        for _ in 0..12 {
            h.input(&mut task, Input::Text(String::new()));
        }

        let pairs = wordset(0);
        let round = &task.rounds[0];
        assert_eq!(round.answers.len(), 12);
        for answer in &round.answers {
            let pair = &pairs[answer.pair_index];
            assert!(
                (answer.prompt == pair.cue && answer.expected == pair.target)
                    || (answer.prompt == pair.target && answer.expected == pair.cue),
                "{} does not belong to pair {}",
                answer.prompt,
                answer.pair_index
            );
        }
    }
}

