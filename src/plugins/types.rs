//! Plugin descriptor types for ClawCtl
//!
//! This module defines the data model for a discovered plugin: the descriptor
//! parsed from a `plugin.json` manifest, its child tree, and the validity
//! rule that gates command binding.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A discovered plugin, parsed from a plugin directory's `plugin.json` file.
///
/// Each plugin directory must contain a `plugin.json` file that conforms
/// to this structure. The descriptor declares the plugin's identity, its
/// help text, and the command line used to invoke it.
///
/// # Example
///
/// ```json
/// {
///   "name": "status",
///   "short_desc": "Show gateway status",
///   "long_desc": "Prints a one-line health summary for the configured gateway.",
///   "example": "  clawctl plugin status",
///   "command": "./status.sh --brief"
/// }
/// ```
///
/// Child plugins live in nested subdirectories with their own `plugin.json`
/// and surface as subcommands of their parent. Descriptors are immutable
/// once loaded; the tree is owned strictly top-down.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PluginDescriptor {
    /// Plugin name, used verbatim as the subcommand token. Must be unique
    /// among siblings.
    pub name: String,

    /// One-line summary shown in command listings.
    #[serde(default)]
    pub short_desc: String,

    /// Detailed help text shown in the command's long help.
    #[serde(default)]
    pub long_desc: String,

    /// Usage example appended to the command's help output.
    #[serde(default)]
    pub example: String,

    /// Invocation template: the executable and its fixed leading arguments,
    /// whitespace-separated. May reference ambient environment variables
    /// with `$VAR` syntax, resolved at execution time.
    #[serde(default)]
    pub command: String,

    /// Child plugins, bound recursively as subcommands of this one.
    #[serde(default)]
    pub children: Vec<PluginDescriptor>,

    /// Directory the plugin was loaded from; becomes the child process's
    /// working directory. Set by the loader, never serialized.
    #[serde(skip)]
    pub dir: PathBuf,
}

impl PluginDescriptor {
    /// Create a descriptor from a name and invocation template, with no help
    /// text, no children, and no source directory.
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            ..Self::default()
        }
    }

    /// A descriptor is valid iff its name is non-empty. Invalid descriptors
    /// stay in the tree but are never bound to a command.
    pub fn is_valid(&self) -> bool {
        !self.name.is_empty()
    }

    /// Look up a direct child by name.
    pub fn find_child(&self, name: &str) -> Option<&PluginDescriptor> {
        self.children.iter().find(|c| c.name == name)
    }
}
