//! Plugin system for ClawCtl
//!
//! This module exposes user-installed plugins as first-class subcommands.
//! Each plugin is a directory containing a `plugin.json` descriptor and the
//! executable it names; nested directories become nested subcommands. At
//! invocation time the plugin runs as a child process whose environment is
//! composed from layered providers, so plugins see the caller's path, the
//! inherited environment, their own descriptor, the global flags, and the
//! gateway connection settings without parsing anything themselves.
//!
//! # Architecture
//!
//! - **types**: the descriptor model (`PluginDescriptor`) and its validity rule
//! - **loader**: directory scanning, manifest parsing, descriptor validation
//! - **env**: naming transforms, `EnvProvider` variants, fail-fast composition
//! - **runner**: child process execution (`RunContext`, `ExecPluginRunner`)
//!
//! # Plugin Directory Structure
//!
//! ```text
//! ~/.clawctl/plugins/
//! ├── status/
//! │   ├── plugin.json
//! │   └── status.sh
//! └── db/
//!     ├── plugin.json
//!     ├── db.sh
//!     └── dump/
//!         └── plugin.json
//! ```
//!
//! # Example plugin.json
//!
//! ```json
//! {
//!   "name": "status",
//!   "short_desc": "Show gateway status",
//!   "long_desc": "Prints a one-line health summary for the configured gateway.",
//!   "example": "  clawctl plugin status",
//!   "command": "./status.sh --brief"
//! }
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use clawctl::plugins::{discover_plugins, search_dirs};
//!
//! let plugins = discover_plugins(&search_dirs()).unwrap();
//! for plugin in &plugins {
//!     println!("{}: {}", plugin.name, plugin.short_desc);
//! }
//! ```

pub mod env;
pub mod loader;
pub mod runner;
pub mod types;

pub use env::{
    field_to_env, field_to_env_name, flag_to_env, flag_to_env_name, CallerEnvProvider,
    DescriptorEnvProvider, EmptyEnvProvider, EnvEntry, EnvProvider, FlagsEnvProvider,
    GatewayEnvProvider, MultiEnvProvider, OsEnvProvider,
};
pub use loader::{discover_plugins, load_plugin, search_dirs, validate_descriptor};
pub use runner::{ExecPluginRunner, PluginRunner, RunContext};
pub use types::PluginDescriptor;
