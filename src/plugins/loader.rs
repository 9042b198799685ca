//! Plugin discovery and loading for ClawCtl
//!
//! This module turns plugin directories into descriptor trees. Each
//! subdirectory of a search directory that contains a `plugin.json` manifest
//! yields one descriptor; nested subdirectories with their own manifest
//! become child descriptors, recursively. Every plugin, parent or child,
//! names an invocation command.
//!
//! Discovery is forgiving: a malformed manifest is logged and skipped so one
//! broken plugin never takes the CLI down. Directories are visited in
//! lexical order so duplicate handling stays deterministic; the first plugin
//! with a given name wins and later ones are dropped with a warning.

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{ClawError, Result};

use super::types::PluginDescriptor;

/// Environment variable overriding the plugin search path. Colon-separated
/// on Unix, like `PATH`.
pub const PLUGINS_PATH_ENV_VAR: &str = "CLAWCTL_PLUGINS_PATH";

/// Directories scanned for plugins: the [`PLUGINS_PATH_ENV_VAR`] override
/// when set and non-empty, otherwise `~/.clawctl/plugins`.
pub fn search_dirs() -> Vec<PathBuf> {
    if let Ok(path) = std::env::var(PLUGINS_PATH_ENV_VAR) {
        if !path.trim().is_empty() {
            return std::env::split_paths(&path).collect();
        }
    }
    vec![Config::dir().join("plugins")]
}

/// Discover plugin descriptor trees across multiple directories.
///
/// Scans each provided directory for subdirectories containing a
/// `plugin.json` file. Plugins that fail to load are logged as warnings and
/// skipped; duplicate names keep the first occurrence.
///
/// # Example
///
/// ```no_run
/// use clawctl::plugins::loader::{discover_plugins, search_dirs};
///
/// let plugins = discover_plugins(&search_dirs()).unwrap();
/// for plugin in &plugins {
///     println!("{}: {}", plugin.name, plugin.short_desc);
/// }
/// ```
pub fn discover_plugins(dirs: &[PathBuf]) -> Result<Vec<PluginDescriptor>> {
    let mut plugins: Vec<PluginDescriptor> = Vec::new();

    for dir in dirs {
        if !dir.exists() {
            info!(dir = %dir.display(), "Plugin directory does not exist, skipping");
            continue;
        }

        if !dir.is_dir() {
            warn!(path = %dir.display(), "Plugin path is not a directory, skipping");
            continue;
        }

        for entry_path in sorted_subdirs(dir)? {
            if !entry_path.join("plugin.json").exists() {
                continue;
            }

            match load_plugin(&entry_path) {
                Ok(plugin) => {
                    if plugins.iter().any(|p| p.name == plugin.name) {
                        warn!(
                            plugin = %plugin.name,
                            dir = %entry_path.display(),
                            "Duplicate plugin name, keeping the first one"
                        );
                        continue;
                    }
                    info!(
                        plugin = %plugin.name,
                        children = plugin.children.len(),
                        "Discovered plugin"
                    );
                    plugins.push(plugin);
                }
                Err(e) => {
                    warn!(
                        dir = %entry_path.display(),
                        error = %e,
                        "Failed to load plugin, skipping"
                    );
                }
            }
        }
    }

    Ok(plugins)
}

/// Load a single plugin descriptor from its directory.
///
/// Reads and parses `plugin.json`, validates it, records the directory as
/// the plugin's working directory, and loads child plugins from nested
/// subdirectories. Children declared inline in the manifest run from the
/// parent's directory.
///
/// # Errors
/// - `ClawError::Plugin` if `plugin.json` is missing or unreadable
/// - `ClawError::Json` if the JSON is malformed
/// - `ClawError::Plugin` if validation fails (see `validate_descriptor`)
pub fn load_plugin(dir: &Path) -> Result<PluginDescriptor> {
    let manifest_path = dir.join("plugin.json");

    if !manifest_path.exists() {
        return Err(ClawError::Plugin(format!(
            "no plugin.json found in {}",
            dir.display()
        )));
    }

    let content = fs::read_to_string(&manifest_path).map_err(|e| {
        ClawError::Plugin(format!(
            "failed to read {}: {}",
            manifest_path.display(),
            e
        ))
    })?;

    let mut plugin: PluginDescriptor = serde_json::from_str(&content)?;
    plugin.dir = dir.to_path_buf();
    backfill_dirs(&mut plugin.children, dir);
    validate_descriptor(&plugin)?;

    for child_path in sorted_subdirs(dir)? {
        if !child_path.join("plugin.json").exists() {
            continue;
        }

        match load_plugin(&child_path) {
            Ok(child) => {
                if plugin.children.iter().any(|c| c.name == child.name) {
                    warn!(
                        plugin = %child.name,
                        dir = %child_path.display(),
                        "Duplicate child plugin name, keeping the first one"
                    );
                    continue;
                }
                plugin.children.push(child);
            }
            Err(e) => {
                warn!(
                    dir = %child_path.display(),
                    error = %e,
                    "Failed to load child plugin, skipping"
                );
            }
        }
    }

    Ok(plugin)
}

/// Validate a descriptor for use as a command.
///
/// Checks, recursively over inline children:
/// - name is 1-64 characters, lowercase alphanumeric and hyphens, starting
///   alphanumeric (it becomes the subcommand token)
/// - short description is non-empty
/// - invocation command is non-empty
pub fn validate_descriptor(plugin: &PluginDescriptor) -> Result<()> {
    let name_re = Regex::new(r"^[a-z0-9][a-z0-9\-]{0,63}$").unwrap();
    if !name_re.is_match(&plugin.name) {
        return Err(ClawError::Plugin(format!(
            "invalid plugin name '{}': must be 1-64 lowercase alphanumeric characters and hyphens, starting with an alphanumeric",
            plugin.name
        )));
    }

    if plugin.short_desc.trim().is_empty() {
        return Err(ClawError::Plugin(format!(
            "plugin '{}' has no short description",
            plugin.name
        )));
    }

    if plugin.command.trim().is_empty() {
        return Err(ClawError::Plugin(format!(
            "plugin '{}' has no invocation command",
            plugin.name
        )));
    }

    for child in &plugin.children {
        validate_descriptor(child)?;
    }

    Ok(())
}

/// Subdirectories of `dir` in lexical order. Symlinks are not followed; a
/// link back into an ancestor would otherwise loop the child scan.
fn sorted_subdirs(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| {
        ClawError::Plugin(format!(
            "failed to read plugin directory {}: {}",
            dir.display(),
            e
        ))
    })?;

    let mut subdirs = Vec::new();
    for entry in entries {
        let entry =
            entry.map_err(|e| ClawError::Plugin(format!("failed to read directory entry: {}", e)))?;
        let file_type = entry.file_type().map_err(|e| {
            ClawError::Plugin(format!("failed to stat {}: {}", entry.path().display(), e))
        })?;
        if file_type.is_dir() {
            subdirs.push(entry.path());
        }
    }
    subdirs.sort();
    Ok(subdirs)
}

/// Inline children carry no directory of their own; they run from the
/// nearest ancestor that has one.
fn backfill_dirs(children: &mut [PluginDescriptor], dir: &Path) {
    for child in children {
        if child.dir.as_os_str().is_empty() {
            child.dir = dir.to_path_buf();
        }
        backfill_dirs(&mut child.children, dir);
    }
}
