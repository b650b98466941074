//! The `cogbattery run` command.

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::{mpsc, watch};

use cogbattery_adapters::config::load_config_from;
use cogbattery_adapters::{FormSubmitter, JsonFileLockStore};
use cogbattery_core::error::SessionError;
use cogbattery_core::model::{Color, TaskKind};
use cogbattery_core::observer::{Frame, SessionObserver};
use cogbattery_core::results::FinalResults;
use cogbattery_core::runner::{BatteryRunner, SessionCommand};
use cogbattery_core::sink::{NoopSink, ResultSink};
use cogbattery_core::tasks::Input;
use cogbattery_core::Phase;

use super::show::print_summary;

/// Upper bound on waiting for the result post before exiting.
const FLUSH_TIMEOUT: Duration = Duration::from_secs(35);

/// What the participant is currently being asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Prompt {
    phase: Phase,
    /// A memory recall cue is waiting for an answer.
    recall_open: bool,
}

impl Prompt {
    fn new(phase: Phase) -> Self {
        Self {
            phase,
            recall_open: false,
        }
    }
}

/// Terminal renderer. Publishes the current prompt so the input thread can
/// interpret what the participant types.
struct ConsoleObserver {
    prompt: watch::Sender<Prompt>,
}

impl SessionObserver for ConsoleObserver {
    fn on_phase(&self, phase: Phase) {
        self.prompt.send_replace(Prompt::new(phase));
        match phase {
            Phase::Setup => println!("\nEnter participant ID and week number (e.g. `1001 2`):"),
            Phase::ConfirmRestart => {
                println!("An unfinished attempt exists for this week. Start over? [y/n]")
            }
            Phase::Hub => {}
            Phase::Task(kind) => {
                println!("\n== {kind} ==");
                println!("{}", instructions(kind));
            }
            Phase::Summary => println!("\nAll tasks complete. Thank you!"),
        }
    }

    fn on_frame(&self, frame: &Frame) {
        let recall_open = matches!(frame, Frame::RecallCue { .. });
        self.prompt.send_if_modified(|prompt| {
            let changed = prompt.recall_open != recall_open;
            prompt.recall_open = recall_open;
            changed
        });

        match frame {
            Frame::Hub { remaining } => {
                println!("\nTasks remaining:");
                for kind in remaining {
                    println!("  {} {kind}", hub_number(*kind));
                }
                println!("Choose a task by number or name.");
            }
            Frame::StudyPair {
                round,
                index,
                total,
                cue,
                target,
                ..
            } => println!("[round {round} study {}/{total}]  {cue}  {target}", index + 1),
            Frame::RecallCue {
                round,
                item,
                total,
                prompt,
            } => println!("[round {round} recall {}/{total}]  {prompt} ?", item + 1),
            Frame::RecallScored {
                correct, timed_out, ..
            } => {
                if *timed_out {
                    println!("  time is up");
                } else if !*correct {
                    println!("  incorrect");
                }
            }
            Frame::RoundComplete {
                round,
                correct,
                total,
            } => println!("Round {round}: {correct}/{total} correct"),
            Frame::StroopTrial { word, ink, .. } => {
                println!("  {} (ink: {ink})", word.to_string().to_uppercase())
            }
            Frame::StroopTick {
                phase,
                seconds_left,
            } => {
                if *seconds_left % 15 == 0 || *seconds_left <= 5 {
                    println!("  [{phase}] {seconds_left}s left");
                }
            }
            Frame::StroopPhaseComplete { phase, correct } => {
                println!("Stroop {phase} phase: {correct} correct")
            }
            Frame::DigitShown { digit, .. } => println!("  {digit}"),
            Frame::DigitHidden => println!(),
            Frame::DigitInputOpen { length, trial } => {
                println!("Type the {length} digits in ascending order (trial {trial}):")
            }
            Frame::DigitScored {
                correct,
                timed_out,
                expected,
                ..
            } => {
                let expected: String = expected.iter().map(|d| d.to_string()).collect();
                match (*correct, *timed_out) {
                    (true, _) => println!("  correct"),
                    (false, true) => println!("  time is up (answer was {expected})"),
                    (false, false) => println!("  incorrect (answer was {expected})"),
                }
            }
            Frame::ReactionWaiting { trial, total } => println!("[{trial}/{total}] wait..."),
            Frame::ReactionStimulus { .. } => println!("  >>> NOW! <<<"),
            Frame::ReactionRecorded { latency_ms, .. } => println!("  {latency_ms}ms"),
            Frame::ReactionMissed { .. } => println!("  missed"),
            Frame::TaskComplete { task } => println!("The {task} task is complete."),
        }
    }

    fn on_rejected(&self, error: &SessionError) {
        eprintln!("  ! {error}");
        if error.is_retryable() {
            eprintln!("  Enter the participant ID and week again.");
        }
    }

    fn on_summary(&self, _results: &FinalResults) {}
}

fn instructions(kind: TaskKind) -> &'static str {
    match kind {
        TaskKind::Memory => {
            "Memorise each word pair. Press Enter to skip ahead while studying, \
             then type the partner of each word shown (Enter alone gives a blank answer)."
        }
        TaskKind::Stroop => {
            "Name the INK color, not the word: red, green, blue, yellow (or r/g/b/y)."
        }
        TaskKind::DigitSpan => "Watch the digits, then type them back sorted from low to high.",
        TaskKind::Reaction => "Press Enter as soon as you see NOW.",
    }
}

fn hub_number(kind: TaskKind) -> usize {
    TaskKind::ALL
        .iter()
        .position(|k| *k == kind)
        .map_or(0, |i| i + 1)
}

/// Interpret one typed line in the context of `prompt`.
///
/// `:hub` abandons the running task and `:restart` goes back to setup from
/// anywhere. Returns `None` when the line means nothing in this phase.
fn parse_command(line: &str, prompt: Prompt) -> Option<SessionCommand> {
    let trimmed = line.trim();
    match trimmed {
        ":restart" => return Some(SessionCommand::Restart),
        ":hub" => return Some(SessionCommand::ReturnToHub),
        _ => {}
    }

    match prompt.phase {
        Phase::Setup => {
            let mut parts = trimmed.split_whitespace();
            let participant_id = parts.next()?.to_string();
            let week = parts.next()?.to_string();
            Some(SessionCommand::Setup {
                participant_id,
                week,
            })
        }
        Phase::ConfirmRestart => match trimmed.to_lowercase().as_str() {
            "y" | "yes" => Some(SessionCommand::ConfirmRestart(true)),
            "n" | "no" => Some(SessionCommand::ConfirmRestart(false)),
            _ => None,
        },
        Phase::Hub => trimmed.parse::<TaskKind>().ok().map(SessionCommand::ChooseTask),
        Phase::Task(TaskKind::Memory) if trimmed.is_empty() && !prompt.recall_open => {
            Some(SessionCommand::Input(Input::SkipStudy))
        }
        Phase::Task(TaskKind::Memory | TaskKind::DigitSpan) => {
            Some(SessionCommand::Input(Input::Text(trimmed.to_string())))
        }
        Phase::Task(TaskKind::Stroop) => trimmed
            .parse::<Color>()
            .ok()
            .map(|c| SessionCommand::Input(Input::Color(c))),
        Phase::Task(TaskKind::Reaction) => Some(SessionCommand::Input(Input::Respond)),
        Phase::Summary => None,
    }
}

/// Read stdin on a dedicated thread and forward parsed commands.
fn spawn_input_thread(tx: mpsc::Sender<SessionCommand>, prompt: watch::Receiver<Prompt>) {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else {
                break;
            };
            let current = *prompt.borrow();
            match parse_command(&line, current) {
                Some(command) => {
                    if tx.blocking_send(command).is_err() {
                        break;
                    }
                }
                None => eprintln!("  ? '{}' is not a valid answer here", line.trim()),
            }
        }
        tracing::debug!("input closed");
    });
}

pub async fn execute(
    participant: Option<String>,
    week: Option<String>,
    config_path: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let output_dir = output.unwrap_or_else(|| config.output_dir.clone());

    let submitter = match &config.endpoint {
        Some(endpoint) => Some(FormSubmitter::new(endpoint)?),
        None => {
            tracing::warn!("no endpoint configured, results will only be saved locally");
            None
        }
    };
    let sink: Arc<dyn ResultSink> = match &submitter {
        Some(submitter) => Arc::new(submitter.clone()),
        None => Arc::new(NoopSink),
    };
    let locks = Arc::new(JsonFileLockStore::new(&config.lock_path));

    let (prompt_tx, prompt_rx) = watch::channel(Prompt::new(Phase::Setup));
    let observer = Arc::new(ConsoleObserver { prompt: prompt_tx });
    let mut runner = BatteryRunner::new(config.battery.clone(), locks, sink, observer);

    let (tx, rx) = mpsc::channel(32);
    match (participant, week) {
        (Some(participant_id), Some(week)) => {
            tx.send(SessionCommand::Setup {
                participant_id,
                week,
            })
            .await?;
        }
        (None, None) => {
            println!("Enter participant ID and week number (e.g. `1001 2`):");
        }
        _ => anyhow::bail!("--participant and --week must be given together"),
    }
    spawn_input_thread(tx, prompt_rx);

    let Some(results) = runner.run(rx).await else {
        eprintln!("Session ended before completion.");
        return Ok(());
    };

    println!();
    print_summary(&results);

    let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H%M%S");
    let path = output_dir.join(format!(
        "results-{}-week{}-{timestamp}.json",
        results.participant_id, results.week
    ));
    results.save_json(&path)?;
    eprintln!("Results saved to: {}", path.display());

    if let Some(submitter) = &submitter {
        if tokio::time::timeout(FLUSH_TIMEOUT, submitter.flush())
            .await
            .is_err()
        {
            eprintln!("Result submission still pending at exit.");
        }
    }

    Ok(())
}
