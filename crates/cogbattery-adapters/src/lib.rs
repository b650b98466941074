//! cogbattery-adapters — Outer surfaces of the battery.
//!
//! Posts finished results to a form endpoint, persists the completion lock
//! to a JSON file, and loads the application config from TOML.

pub mod config;
pub mod error;
pub mod file_lock;
pub mod form;

pub use config::{load_config_from, AppConfig};
pub use error::SubmitError;
pub use file_lock::JsonFileLockStore;
pub use form::FormSubmitter;
