//! ClawCtl - Gateway control CLI with first-class plugin subcommands

pub mod cli;
pub mod config;
pub mod error;
pub mod plugins;

pub use config::Config;
pub use error::{ClawError, Result};
