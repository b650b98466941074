//! The `cogbattery status` command.

use std::path::PathBuf;

use anyhow::Result;

use cogbattery_adapters::config::load_config_from;
use cogbattery_adapters::JsonFileLockStore;
use cogbattery_core::lock::read_lock;
use cogbattery_core::session::{validate_participant_id, validate_week};

pub fn execute(participant: String, week: String, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let participant_id = validate_participant_id(&participant)?;
    let week = validate_week(&week, config.battery.setup.max_week)?;

    let store = JsonFileLockStore::new(&config.lock_path);
    let state = read_lock(&store, &participant_id, week)?;
    let label = match state {
        Some(state) => state.as_str(),
        None => "not started",
    };
    println!("Participant {participant_id}, week {week}: {label}");
    Ok(())
}
