//! The `cogbattery init` command.

use anyhow::Result;

use cogbattery_adapters::config::SAMPLE_CONFIG;

pub fn execute() -> Result<()> {
    if std::path::Path::new("cogbattery.toml").exists() {
        println!("cogbattery.toml already exists, skipping.");
    } else {
        std::fs::write("cogbattery.toml", SAMPLE_CONFIG)?;
        println!("Created cogbattery.toml");
    }

    println!("\nNext steps:");
    println!("  1. Set COGBATTERY_FORM_URL or edit the endpoint in cogbattery.toml");
    println!("  2. Run: cogbattery run --participant 1001 --week 1");

    Ok(())
}
