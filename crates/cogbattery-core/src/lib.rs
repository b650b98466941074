//! cogbattery-core — Session engine, timers, and scoring.
//!
//! This crate holds the pure state machine behind the battery: the four
//! timed tasks, the session controller that sequences them, and the async
//! runner that feeds timer expirations and user input into the controller.
//! Rendering, result submission, and lock persistence are reached through
//! the traits in [`observer`], [`sink`], and [`lock`].

pub mod assignment;
pub mod config;
pub mod error;
pub mod lock;
pub mod model;
pub mod observer;
pub mod results;
pub mod runner;
pub mod session;
pub mod sink;
pub mod tasks;
pub mod timer;

pub use error::SessionError;
pub use session::{Phase, SessionController};
