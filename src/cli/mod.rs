//! Command-line surface
//!
//! The static commands are a derive-based clap parser in `main`; the
//! `plugin` subtree is only known at startup, so it is built here from the
//! discovered descriptor tree and attached to the parsed command.

pub mod plugin;

pub use plugin::{bind_plugin, dispatch, plugin_command};
