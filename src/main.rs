use std::path::PathBuf;

use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use clawctl::cli::{dispatch, plugin_command};
use clawctl::config::Config;
use clawctl::plugins::{discover_plugins, search_dirs, ExecPluginRunner};

#[derive(Parser)]
#[command(name = "clawctl")]
#[command(about = "Gateway control CLI with plugin subcommands", long_about = None)]
struct Cli {
    /// Path to the config file
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Gateway base URL, overriding the configured host
    #[arg(long, global = true, value_name = "URL")]
    gateway: Option<String>,

    /// Enable debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version information
    Version,
}

/// Whether `--verbose` was given ahead of the subcommand.
///
/// The log filter has to be decided before plugin discovery runs, which is
/// before clap sees the flags. Only tokens ahead of the subcommand count: a
/// plugin's trailing args may legitimately contain `-v` without meaning ours.
fn verbose_requested(args: &[String]) -> bool {
    let mut args = args.iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--verbose" | "-v" => return true,
            // Value-taking global flags; skip the value and keep scanning.
            "--config" | "--gateway" => {
                args.next();
            }
            other => {
                // The subcommand token; everything after it belongs to it.
                if !other.starts_with('-') {
                    return false;
                }
            }
        }
    }
    false
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let argv: Vec<String> = std::env::args().skip(1).collect();
    let filter = if verbose_requested(&argv) {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // A broken plugin tree must not take the whole CLI down.
    let plugins = match discover_plugins(&search_dirs()) {
        Ok(plugins) => plugins,
        Err(e) => {
            warn!("Plugin discovery failed: {}", e);
            Vec::new()
        }
    };

    let mut root = Cli::command().subcommand(plugin_command(&plugins));
    let matches = root.clone().get_matches();

    match matches.subcommand() {
        Some(("plugin", sub)) => {
            if sub.subcommand().is_none() {
                if let Some(cmd) = root.find_subcommand_mut("plugin") {
                    cmd.print_help()?;
                }
                return Ok(());
            }

            let config_path = matches.get_one::<PathBuf>("config").cloned();
            let gateway_url = matches.get_one::<String>("gateway").cloned();
            let verbose = matches.get_flag("verbose");

            // Every global flag is exposed to the plugin, defaults included.
            let global_flags = vec![
                (
                    "config".to_string(),
                    config_path
                        .as_deref()
                        .map(|p| p.display().to_string())
                        .unwrap_or_default(),
                ),
                (
                    "gateway".to_string(),
                    gateway_url.clone().unwrap_or_default(),
                ),
                ("verbose".to_string(), verbose.to_string()),
            ];

            let config = match &config_path {
                Some(path) => Config::load_from(path)?,
                None => Config::load()?,
            };
            let mut gateway = config.gateway;
            if let Some(url) = gateway_url {
                gateway.host = url;
            }

            dispatch(sub, &plugins, global_flags, gateway, &ExecPluginRunner).await?;
        }
        _ => {
            let cli = Cli::from_arg_matches(&matches)?;
            match cli.command {
                Some(Commands::Version) | None => {
                    println!("clawctl {}", env!("CARGO_PKG_VERSION"));
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_verbose_requested_before_subcommand() {
        assert!(verbose_requested(&argv(&["--verbose", "plugin", "status"])));
        assert!(verbose_requested(&argv(&["-v", "version"])));
        assert!(verbose_requested(&argv(&[
            "--gateway",
            "https://gw",
            "-v",
            "plugin",
            "x"
        ])));
    }

    #[test]
    fn test_verbose_requested_ignores_tokens_after_subcommand() {
        assert!(!verbose_requested(&argv(&["plugin", "x", "-v"])));
        assert!(!verbose_requested(&argv(&["plugin", "status", "--verbose"])));
        assert!(!verbose_requested(&argv(&["version"])));
        assert!(!verbose_requested(&argv(&[])));
    }

    #[test]
    fn test_verbose_requested_skips_flag_values() {
        // A flag value that happens to spell a subcommand must not stop the
        // scan early.
        assert!(verbose_requested(&argv(&[
            "--config", "plugin", "-v", "plugin", "x"
        ])));
        assert!(!verbose_requested(&argv(&[
            "--config",
            "cfg.json",
            "plugin",
            "x",
            "-v"
        ])));
    }
}
