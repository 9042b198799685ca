//! Plugin process execution
//!
//! Runs a plugin's invocation template as a child process. Ambient `$VAR`
//! references in the template are expanded first, the result is tokenized on
//! whitespace into the executable and its fixed leading arguments, and the
//! user's arguments are appended verbatim. The child gets the composed
//! environment, the context's streams, and the plugin's source directory as
//! its working directory, and is awaited to completion. There is no timeout
//! and no retry: a long-lived or interactive plugin simply holds the
//! invocation until it exits.
//!
//! Two environments are in play and never mixed: the ambient process
//! environment (template expansion only) and the composed environment from
//! the context's provider (the child's entire environment).

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{ClawError, Result};
use crate::plugins::env::EnvProvider;
use crate::plugins::types::PluginDescriptor;

/// Everything one plugin invocation needs: streams, positional arguments,
/// the environment source, and a working directory. Built fresh per
/// invocation and consumed by the runner.
pub struct RunContext {
    pub stdin: Stdio,
    pub stdout: Stdio,
    pub stderr: Stdio,

    /// Positional arguments appended verbatim after the template's fixed
    /// arguments. No shell re-interpretation happens here.
    pub args: Vec<String>,

    /// Source of the child's entire environment.
    pub env: Box<dyn EnvProvider>,

    /// Child working directory; `None` inherits the parent's.
    pub working_dir: Option<PathBuf>,
}

impl RunContext {
    /// Context with pass-through streams, the given arguments and
    /// environment source, and no working directory override.
    pub fn inherited(args: Vec<String>, env: Box<dyn EnvProvider>) -> Self {
        Self {
            stdin: Stdio::inherit(),
            stdout: Stdio::inherit(),
            stderr: Stdio::inherit(),
            args,
            env,
            working_dir: None,
        }
    }
}

/// Executes plugins. The trait seam keeps command dispatch testable without
/// spawning real processes.
#[async_trait]
pub trait PluginRunner: Send + Sync {
    async fn run(&self, plugin: &PluginDescriptor, ctx: RunContext) -> Result<()>;
}

/// The real runner: execs the plugin's command line and waits for it.
///
/// # Example
///
/// ```
/// use clawctl::plugins::{
///     EmptyEnvProvider, ExecPluginRunner, PluginDescriptor, PluginRunner, RunContext,
/// };
///
/// # tokio_test::block_on(async {
/// let plugin = PluginDescriptor::new("noop", "true");
/// let ctx = RunContext::inherited(vec![], Box::new(EmptyEnvProvider));
/// ExecPluginRunner.run(&plugin, ctx).await.unwrap();
/// # })
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecPluginRunner;

#[async_trait]
impl PluginRunner for ExecPluginRunner {
    async fn run(&self, plugin: &PluginDescriptor, ctx: RunContext) -> Result<()> {
        // Expansion uses the ambient environment only; the composed child
        // environment plays no part in it.
        let expanded = expand_ambient(&plugin.command);
        let mut tokens = expanded.split_whitespace();
        let base = tokens.next().ok_or_else(|| {
            ClawError::Plugin(format!(
                "plugin \"{}\" has no invocation command",
                plugin.name
            ))
        })?;

        let mut command = Command::new(base);
        command.args(tokens);
        command.args(&ctx.args);
        command.stdin(ctx.stdin);
        command.stdout(ctx.stdout);
        command.stderr(ctx.stderr);

        // Fail fast: on provider failure the child is never started.
        let env = ctx.env.produce_env()?;
        debug!(entries = env.len(), "Composed plugin environment");
        command.env_clear();
        for entry in &env {
            // Later entries shadow earlier ones with the same key.
            command.env(&entry.key, &entry.value);
        }

        if let Some(dir) = &ctx.working_dir {
            command.current_dir(dir);
        }

        info!(plugin = %plugin.name, command = %expanded, "Running plugin");
        let status = command.status().await?;
        if !status.success() {
            return Err(ClawError::Plugin(format!(
                "plugin \"{}\" failed: {}",
                plugin.name, status
            )));
        }
        Ok(())
    }
}

/// Expand `$VAR` and `${VAR}` references against the current process's
/// environment. Unknown variables expand to the empty string; a `$` not
/// followed by a variable name, and unterminated `${`, are kept as-is.
pub fn expand_ambient(template: &str) -> String {
    expand(template, |name| std::env::var(name).ok())
}

fn expand(template: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some('{') => {
                chars.next();
                let mut name = String::new();
                let mut closed = false;
                while let Some(n) = chars.next() {
                    if n == '}' {
                        closed = true;
                        break;
                    }
                    name.push(n);
                }
                if closed && !name.is_empty() {
                    out.push_str(&lookup(&name).unwrap_or_default());
                } else {
                    out.push_str("${");
                    out.push_str(&name);
                    if closed {
                        out.push('}');
                    }
                }
            }
            Some(&n) if n == '_' || n.is_ascii_alphabetic() => {
                let mut name = String::new();
                while let Some(&n) = chars.peek() {
                    if n == '_' || n.is_ascii_alphanumeric() {
                        name.push(n);
                        chars.next();
                    } else {
                        break;
                    }
                }
                out.push_str(&lookup(&name).unwrap_or_default());
            }
            _ => out.push('$'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::env::{DescriptorEnvProvider, EmptyEnvProvider, EnvEntry, MultiEnvProvider};
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;

    // ---- template expansion ----

    fn fake_lookup(name: &str) -> Option<String> {
        match name {
            "HOME" => Some("/home/claw".to_string()),
            "BIN" => Some("/usr/local/bin/tool".to_string()),
            _ => None,
        }
    }

    #[test]
    fn test_expand_plain_reference() {
        assert_eq!(expand("$BIN --flag", fake_lookup), "/usr/local/bin/tool --flag");
    }

    #[test]
    fn test_expand_braced_reference() {
        assert_eq!(expand("${HOME}/bin/x", fake_lookup), "/home/claw/bin/x");
    }

    #[test]
    fn test_expand_unknown_variable_is_empty() {
        assert_eq!(expand("run $MISSING now", fake_lookup), "run  now");
    }

    #[test]
    fn test_expand_name_stops_at_non_name_chars() {
        assert_eq!(expand("$HOME-suffix", fake_lookup), "/home/claw-suffix");
        assert_eq!(expand("$HOME/sub", fake_lookup), "/home/claw/sub");
    }

    #[test]
    fn test_expand_preserves_bare_dollar() {
        assert_eq!(expand("cost: 5$", fake_lookup), "cost: 5$");
        assert_eq!(expand("a $ b", fake_lookup), "a $ b");
        assert_eq!(expand("$$", fake_lookup), "$$");
    }

    #[test]
    fn test_expand_preserves_unterminated_braces() {
        assert_eq!(expand("x ${HOME", fake_lookup), "x ${HOME");
        assert_eq!(expand("x ${}", fake_lookup), "x ${}");
    }

    #[test]
    fn test_expand_ambient_reads_process_env() {
        std::env::set_var("CLAWCTL_TEST_EXPAND_PROBE", "resolved");
        assert_eq!(
            expand_ambient("got $CLAWCTL_TEST_EXPAND_PROBE"),
            "got resolved"
        );
        std::env::remove_var("CLAWCTL_TEST_EXPAND_PROBE");
    }

    // ---- process execution ----

    struct FixedEnvProvider {
        entries: Vec<EnvEntry>,
    }

    impl EnvProvider for FixedEnvProvider {
        fn produce_env(&self) -> crate::error::Result<Vec<EnvEntry>> {
            Ok(self.entries.clone())
        }
    }

    struct FailingEnvProvider;

    impl EnvProvider for FailingEnvProvider {
        fn produce_env(&self) -> crate::error::Result<Vec<EnvEntry>> {
            Err(ClawError::Env("no env for you".to_string()))
        }
    }

    fn write_script(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
        path
    }

    fn quiet_ctx(args: Vec<String>, env: Box<dyn EnvProvider>) -> RunContext {
        RunContext {
            stdin: Stdio::null(),
            stdout: Stdio::null(),
            stderr: Stdio::null(),
            args,
            env,
            working_dir: None,
        }
    }

    #[tokio::test]
    async fn test_run_true_succeeds() {
        let plugin = PluginDescriptor::new("ok", "true");
        let ctx = quiet_ctx(vec![], Box::new(EmptyEnvProvider));
        assert!(ExecPluginRunner.run(&plugin, ctx).await.is_ok());
    }

    #[tokio::test]
    async fn test_run_false_propagates_exit_failure() {
        let plugin = PluginDescriptor::new("fail", "false");
        let ctx = quiet_ctx(vec![], Box::new(EmptyEnvProvider));

        let err = ExecPluginRunner.run(&plugin, ctx).await.unwrap_err();
        assert!(err.to_string().contains("plugin \"fail\" failed"));
    }

    #[tokio::test]
    async fn test_run_missing_executable_fails() {
        let plugin = PluginDescriptor::new("ghost", "/nonexistent/clawctl-test-binary");
        let ctx = quiet_ctx(vec![], Box::new(EmptyEnvProvider));

        let err = ExecPluginRunner.run(&plugin, ctx).await.unwrap_err();
        assert!(matches!(err, ClawError::Io(_)));
    }

    #[tokio::test]
    async fn test_run_empty_template_is_error() {
        let plugin = PluginDescriptor::new("blank", "   ");
        let ctx = quiet_ctx(vec![], Box::new(EmptyEnvProvider));

        let err = ExecPluginRunner.run(&plugin, ctx).await.unwrap_err();
        assert!(err.to_string().contains("has no invocation command"));
    }

    #[tokio::test]
    async fn test_run_composed_env_reaches_child() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(
            dir.path(),
            "dump-env.sh",
            "#!/bin/sh\nprintf '%s' \"$CLAWCTL_PLUGINS_DESCRIPTOR_NAME\" > \"$1\"\n",
        );
        let out = dir.path().join("seen.txt");

        let plugin = PluginDescriptor::new("envtest", script.to_string_lossy());
        let env = MultiEnvProvider::new(vec![Box::new(DescriptorEnvProvider::new(plugin.clone()))]);
        let ctx = quiet_ctx(vec![out.to_string_lossy().to_string()], Box::new(env));

        ExecPluginRunner.run(&plugin, ctx).await.unwrap();
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "envtest");
    }

    #[tokio::test]
    async fn test_run_later_entries_shadow_earlier_ones() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(
            dir.path(),
            "dump-probe.sh",
            "#!/bin/sh\nprintf '%s' \"$PROBE\" > \"$1\"\n",
        );
        let out = dir.path().join("probe.txt");

        let env = MultiEnvProvider::new(vec![
            Box::new(FixedEnvProvider {
                entries: vec![EnvEntry::new("PROBE", "first")],
            }),
            Box::new(FixedEnvProvider {
                entries: vec![EnvEntry::new("PROBE", "second")],
            }),
        ]);
        let plugin = PluginDescriptor::new("shadow", script.to_string_lossy());
        let ctx = quiet_ctx(vec![out.to_string_lossy().to_string()], Box::new(env));

        ExecPluginRunner.run(&plugin, ctx).await.unwrap();
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "second");
    }

    #[tokio::test]
    async fn test_run_appends_args_after_fixed_args_in_working_dir() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(
            dir.path(),
            "dump-args.sh",
            "#!/bin/sh\nprintf '%s\\n' \"$@\" > args.txt\n",
        );

        let plugin = PluginDescriptor::new(
            "args",
            format!("{} fixed1 fixed2", script.to_string_lossy()),
        );
        let mut ctx = quiet_ctx(
            vec!["userarg".to_string(), "--flag".to_string()],
            Box::new(EmptyEnvProvider),
        );
        ctx.working_dir = Some(dir.path().to_path_buf());

        ExecPluginRunner.run(&plugin, ctx).await.unwrap();

        let written = std::fs::read_to_string(dir.path().join("args.txt")).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines, vec!["fixed1", "fixed2", "userarg", "--flag"]);
    }

    #[tokio::test]
    async fn test_run_provider_failure_means_child_never_starts() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("ran.txt");
        let script = write_script(
            dir.path(),
            "mark.sh",
            &format!("#!/bin/sh\ntouch \"{}\"\n", marker.display()),
        );

        let plugin = PluginDescriptor::new("doomed", script.to_string_lossy());
        let ctx = quiet_ctx(vec![], Box::new(FailingEnvProvider));

        let err = ExecPluginRunner.run(&plugin, ctx).await.unwrap_err();
        assert!(err.to_string().contains("no env for you"));
        assert!(!marker.exists());
    }

    #[tokio::test]
    async fn test_run_template_expands_ambient_variables() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(
            dir.path(),
            "dump-first.sh",
            "#!/bin/sh\nprintf '%s' \"$1\" > first.txt\n",
        );

        std::env::set_var("CLAWCTL_TEST_RUNNER_BIN", script.to_string_lossy().to_string());
        let plugin = PluginDescriptor::new("expand", "$CLAWCTL_TEST_RUNNER_BIN hello");
        let mut ctx = quiet_ctx(vec![], Box::new(EmptyEnvProvider));
        ctx.working_dir = Some(dir.path().to_path_buf());

        let result = ExecPluginRunner.run(&plugin, ctx).await;
        std::env::remove_var("CLAWCTL_TEST_RUNNER_BIN");
        result.unwrap();

        assert_eq!(
            std::fs::read_to_string(dir.path().join("first.txt")).unwrap(),
            "hello"
        );
    }
}
