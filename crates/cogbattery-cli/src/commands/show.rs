//! The `cogbattery show` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use cogbattery_core::results::{FinalResults, NO_DATA};

pub fn execute(results_path: PathBuf) -> Result<()> {
    let results = FinalResults::load_json(&results_path)?;
    print_summary(&results);
    Ok(())
}

/// Print the per-task scores of a session as a table.
pub fn print_summary(results: &FinalResults) {
    let mut table = Table::new();
    table.set_header(vec!["Measure", "Score"]);

    for round in 1..=3 {
        table.add_row(vec![
            Cell::new(format!("Memory round {round}")),
            Cell::new(format!("{}/12", results.memory.round_score(round))),
        ]);
    }
    table.add_row(vec![
        Cell::new("Stroop congruent"),
        Cell::new(results.stroop.congruent.correct),
    ]);
    table.add_row(vec![
        Cell::new("Stroop incongruent"),
        Cell::new(results.stroop.incongruent.correct),
    ]);
    table.add_row(vec![
        Cell::new("Stroop interference"),
        Cell::new(results.stroop.interference()),
    ]);
    table.add_row(vec![
        Cell::new("Digit span best length"),
        Cell::new(results.digit_span.best_length),
    ]);
    table.add_row(vec![
        Cell::new("Reaction mean"),
        Cell::new(match results.reaction_mean_ms {
            Some(mean) => format!("{mean:.0}ms"),
            None => NO_DATA.to_string(),
        }),
    ]);
    table.add_row(vec![
        Cell::new("Reaction misses"),
        Cell::new(results.reaction.misses),
    ]);

    println!(
        "Participant {} / week {} (wordset {})",
        results.participant_id,
        results.week,
        results.wordset_index + 1
    );
    println!("{table}");
}
