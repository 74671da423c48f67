pub mod actions;
pub mod actor;
pub mod chain;
pub mod config;
pub mod confirm;
pub mod error;
pub mod identity;
pub mod io;
pub mod orchestrator;
pub mod paths;
pub mod roster;

pub use error::{Result, SimError};
