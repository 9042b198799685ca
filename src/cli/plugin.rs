//! Plugin command binding and dispatch
//!
//! Builds one clap command per valid plugin descriptor, recursively over the
//! descriptor tree, and dispatches a parsed invocation to the runner. The
//! descriptor tree itself is never mutated; the command tree is a parallel
//! structure derived from it.

use clap::{Arg, ArgMatches, Command};
use tracing::debug;

use crate::config::GatewayConfig;
use crate::error::{ClawError, Result};
use crate::plugins::env::{
    CallerEnvProvider, DescriptorEnvProvider, EnvProvider, FlagsEnvProvider, GatewayEnvProvider,
    MultiEnvProvider, OsEnvProvider,
};
use crate::plugins::runner::{PluginRunner, RunContext};
use crate::plugins::types::PluginDescriptor;

/// Build the `plugin` parent command with one subcommand per valid plugin.
pub fn plugin_command(plugins: &[PluginDescriptor]) -> Command {
    let mut cmd = Command::new("plugin")
        .about("Run a command-line plugin")
        .long_about(
            "Runs a user-installed plugin as a subcommand. Plugins are \
             discovered from the plugin search path and run as child \
             processes with the gateway settings exposed through the \
             environment.",
        );
    for plugin in plugins {
        if let Some(sub) = bind_plugin(plugin) {
            cmd = cmd.subcommand(sub);
        }
    }
    cmd
}

/// Bind one descriptor, and its children recursively, to a clap command.
///
/// Invalid descriptors produce no command and no user-facing output; they
/// stay in the tree but cannot be invoked.
pub fn bind_plugin(plugin: &PluginDescriptor) -> Option<Command> {
    if !plugin.is_valid() {
        debug!(dir = %plugin.dir.display(), "Skipping invalid plugin descriptor");
        return None;
    }

    let mut cmd = Command::new(plugin.name.clone())
        .about(plugin.short_desc.clone())
        .arg(
            Arg::new("args")
                .value_name("ARGS")
                .num_args(0..)
                .trailing_var_arg(true)
                .allow_hyphen_values(true)
                .help("Arguments passed through to the plugin"),
        );
    if !plugin.long_desc.is_empty() {
        cmd = cmd.long_about(plugin.long_desc.clone());
    }
    if !plugin.example.is_empty() {
        cmd = cmd.after_help(plugin.example.clone());
    }
    for child in &plugin.children {
        if let Some(sub) = bind_plugin(child) {
            cmd = cmd.subcommand(sub);
        }
    }
    Some(cmd)
}

/// Execute the plugin selected by the `plugin` subcommand's matches.
///
/// The provider stack is assembled fresh per invocation, in fixed precedence
/// order: caller identity, OS environment, descriptor fields, global flags,
/// gateway settings. Later providers shadow earlier ones key by key, so the
/// order is the whole precedence story.
pub async fn dispatch(
    matches: &ArgMatches,
    plugins: &[PluginDescriptor],
    global_flags: Vec<(String, String)>,
    gateway: GatewayConfig,
    runner: &dyn PluginRunner,
) -> Result<()> {
    let (name, sub) = matches
        .subcommand()
        .ok_or_else(|| ClawError::NotFound("no plugin selected".to_string()))?;

    let plugin = plugins
        .iter()
        .filter(|p| p.is_valid())
        .find(|p| p.name == name)
        .ok_or_else(|| ClawError::NotFound(format!("plugin \"{}\"", name)))?;
    let (plugin, leaf) = select(plugin, sub);

    let args: Vec<String> = leaf
        .get_many::<String>("args")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();

    let providers: Vec<Box<dyn EnvProvider>> = vec![
        Box::new(CallerEnvProvider),
        Box::new(OsEnvProvider),
        Box::new(DescriptorEnvProvider::new(plugin.clone())),
        Box::new(FlagsEnvProvider::new(global_flags)),
        Box::new(GatewayEnvProvider::new(gateway)),
    ];

    let mut ctx = RunContext::inherited(args, Box::new(MultiEnvProvider::new(providers)));
    if !plugin.dir.as_os_str().is_empty() {
        ctx.working_dir = Some(plugin.dir.clone());
    }

    runner.run(plugin, ctx).await
}

/// Walk subcommand matches down the descriptor tree to the descriptor the
/// user actually selected.
fn select<'a>(
    plugin: &'a PluginDescriptor,
    matches: &'a ArgMatches,
) -> (&'a PluginDescriptor, &'a ArgMatches) {
    if let Some((name, sub)) = matches.subcommand() {
        if let Some(child) = plugin.find_child(name) {
            if child.is_valid() {
                return select(child, sub);
            }
        }
    }
    (plugin, matches)
}
