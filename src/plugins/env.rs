//! Environment composition for plugin execution
//!
//! Plugins receive the parent CLI's state through environment variables.
//! Each source of entries is an [`EnvProvider`]; the command layer stacks
//! providers in precedence order and the runner resolves the stack into the
//! child's environment. Later entries shadow earlier ones with the same key
//! when applied, so precedence is purely a matter of provider order.
//!
//! # Variable contract
//!
//! The names below are a stable interface for plugin authors:
//!
//! - `CLAWCTL_PLUGINS_CALLER`: absolute path of the running clawctl binary
//! - `CLAWCTL_PLUGINS_DESCRIPTOR_*`: fields of the invoked plugin's descriptor
//! - `CLAWCTL_PLUGINS_GLOBAL_FLAG_*`: every registered global flag
//! - `CLAWCTL_PLUGINS_GATEWAY_CONFIG_*`: gateway connection settings

use std::fmt;

use crate::config::GatewayConfig;
use crate::error::{ClawError, Result};
use crate::plugins::types::PluginDescriptor;

/// Variable naming the absolute path of the running clawctl binary.
pub const CALLER_ENV_VAR: &str = "CLAWCTL_PLUGINS_CALLER";

/// Prefix for the invoked plugin's descriptor fields.
pub const DESCRIPTOR_ENV_PREFIX: &str = "CLAWCTL_PLUGINS_DESCRIPTOR_";

/// Prefix for the invoking command's global flags.
pub const GLOBAL_FLAG_ENV_PREFIX: &str = "CLAWCTL_PLUGINS_GLOBAL_FLAG_";

/// Prefix for gateway connection settings.
pub const GATEWAY_CONFIG_ENV_PREFIX: &str = "CLAWCTL_PLUGINS_GATEWAY_CONFIG_";

// ---------------------------------------------------------------------------
// Entries and naming transforms
// ---------------------------------------------------------------------------

/// A single `KEY=VALUE` environment entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvEntry {
    pub key: String,
    pub value: String,
}

impl EnvEntry {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for EnvEntry {
    /// Renders the literal `KEY=VALUE` form.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

/// Map a flag name onto an environment variable name: leading dashes are
/// stripped, the rest is uppercased with dashes turned into underscores, and
/// the prefix is prepended. Total; never fails.
pub fn flag_to_env_name(flag_name: &str, prefix: &str) -> String {
    let name = flag_name.trim_start_matches('-');
    format!("{}{}", prefix, name.to_uppercase().replace('-', "_"))
}

/// Build the `KEY=VALUE` entry for a flag and its rendered value.
pub fn flag_to_env(flag_name: &str, value: &str, prefix: &str) -> EnvEntry {
    EnvEntry::new(flag_to_env_name(flag_name, prefix), value)
}

/// Map a `.`-delimited field path onto an environment variable name. Each
/// segment is split into words on case transitions (acronym runs stay
/// whole), joined with underscores and uppercased; segments are joined with
/// underscores; the prefix is prepended.
///
/// `"APIPath"` becomes `API_PATH`, `"Impersonate.Groups"` becomes
/// `IMPERSONATE_GROUPS`.
pub fn field_to_env_name(field_path: &str, prefix: &str) -> String {
    let path = field_path
        .split('.')
        .map(|segment| split_words(segment).join("_").to_uppercase())
        .collect::<Vec<_>>()
        .join("_");
    format!("{}{}", prefix, path)
}

/// Build the `KEY=VALUE` entry for a field path and its rendered value.
pub fn field_to_env(field_path: &str, value: &str, prefix: &str) -> EnvEntry {
    EnvEntry::new(field_to_env_name(field_path, prefix), value)
}

/// Split a mixed-case identifier into word runs. A new run starts on every
/// transition between lowercase, uppercase, and digit characters; an
/// uppercase run followed by a lowercase run keeps its final letter with the
/// lowercase word, so acronyms are never split letter by letter.
fn split_words(segment: &str) -> Vec<String> {
    #[derive(Clone, Copy, PartialEq)]
    enum Run {
        Lower,
        Upper,
        Digit,
        Other,
    }

    fn run_of(c: char) -> Run {
        if c.is_lowercase() {
            Run::Lower
        } else if c.is_uppercase() {
            Run::Upper
        } else if c.is_ascii_digit() {
            Run::Digit
        } else {
            Run::Other
        }
    }

    let mut runs: Vec<(Run, String)> = Vec::new();
    for c in segment.chars() {
        match runs.last_mut() {
            Some((run, word)) if *run == run_of(c) => word.push(c),
            _ => runs.push((run_of(c), c.to_string())),
        }
    }

    // "APIPath" scans as ["APIP", "ath"]; the trailing uppercase letter
    // belongs to the following word.
    for i in 1..runs.len() {
        if runs[i - 1].0 == Run::Upper && runs[i].0 == Run::Lower {
            if let Some(moved) = runs[i - 1].1.pop() {
                runs[i].1.insert(0, moved);
            }
        }
    }

    runs.into_iter()
        .map(|(_, word)| word)
        .filter(|word| !word.is_empty())
        .collect()
}

// ---------------------------------------------------------------------------
// Providers
// ---------------------------------------------------------------------------

/// A source of environment entries for a plugin invocation.
///
/// Implementations either return their full ordered entry list or fail;
/// there is no partial output.
pub trait EnvProvider: Send + Sync {
    fn produce_env(&self) -> Result<Vec<EnvEntry>>;
}

/// The current process's full inherited environment, in unmodified order.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsEnvProvider;

impl EnvProvider for OsEnvProvider {
    fn produce_env(&self) -> Result<Vec<EnvEntry>> {
        Ok(std::env::vars()
            .map(|(key, value)| EnvEntry::new(key, value))
            .collect())
    }
}

/// A single entry exposing the absolute path of the running clawctl binary
/// under [`CALLER_ENV_VAR`]. Fails when that path cannot be resolved.
#[derive(Debug, Clone, Copy, Default)]
pub struct CallerEnvProvider;

impl EnvProvider for CallerEnvProvider {
    fn produce_env(&self) -> Result<Vec<EnvEntry>> {
        let exe = std::env::current_exe()
            .map_err(|e| ClawError::Env(format!("cannot resolve caller binary path: {}", e)))?;
        Ok(vec![EnvEntry::new(
            CALLER_ENV_VAR,
            exe.to_string_lossy().to_string(),
        )])
    }
}

/// One entry per descriptor field of the invoked plugin, under
/// [`DESCRIPTOR_ENV_PREFIX`]. Fails when no descriptor was bound.
#[derive(Debug, Clone, Default)]
pub struct DescriptorEnvProvider {
    plugin: Option<PluginDescriptor>,
}

impl DescriptorEnvProvider {
    pub fn new(plugin: PluginDescriptor) -> Self {
        Self {
            plugin: Some(plugin),
        }
    }

    /// A provider with no descriptor bound; producing entries from it is an
    /// error.
    pub fn unbound() -> Self {
        Self { plugin: None }
    }
}

impl EnvProvider for DescriptorEnvProvider {
    fn produce_env(&self) -> Result<Vec<EnvEntry>> {
        let plugin = self.plugin.as_ref().ok_or_else(|| {
            ClawError::Env("no plugin descriptor bound to extract env from".to_string())
        })?;
        Ok(vec![
            field_to_env("Name", &plugin.name, DESCRIPTOR_ENV_PREFIX),
            field_to_env("ShortDesc", &plugin.short_desc, DESCRIPTOR_ENV_PREFIX),
            field_to_env("LongDesc", &plugin.long_desc, DESCRIPTOR_ENV_PREFIX),
            field_to_env("Example", &plugin.example, DESCRIPTOR_ENV_PREFIX),
            field_to_env("Command", &plugin.command, DESCRIPTOR_ENV_PREFIX),
        ])
    }
}

/// One entry per registered global flag, under [`GLOBAL_FLAG_ENV_PREFIX`].
///
/// Every flag is visited with its rendered value, explicitly set or not, so
/// plugins see defaults too. Never fails.
#[derive(Debug, Clone, Default)]
pub struct FlagsEnvProvider {
    flags: Vec<(String, String)>,
}

impl FlagsEnvProvider {
    pub fn new(flags: Vec<(String, String)>) -> Self {
        Self { flags }
    }
}

impl EnvProvider for FlagsEnvProvider {
    fn produce_env(&self) -> Result<Vec<EnvEntry>> {
        Ok(self
            .flags
            .iter()
            .map(|(name, value)| flag_to_env(name, value, GLOBAL_FLAG_ENV_PREFIX))
            .collect())
    }
}

/// One entry per gateway connection field, under
/// [`GATEWAY_CONFIG_ENV_PREFIX`]. All fields are emitted unconditionally,
/// empty values included, so plugins can rely on every key being present.
/// Never fails.
#[derive(Debug, Clone, Default)]
pub struct GatewayEnvProvider {
    config: GatewayConfig,
}

impl GatewayEnvProvider {
    pub fn new(config: GatewayConfig) -> Self {
        Self { config }
    }
}

impl EnvProvider for GatewayEnvProvider {
    fn produce_env(&self) -> Result<Vec<EnvEntry>> {
        let cfg = &self.config;
        let prefix = GATEWAY_CONFIG_ENV_PREFIX;
        Ok(vec![
            field_to_env("Host", &cfg.host, prefix),
            field_to_env("APIPath", &cfg.api_path, prefix),
            field_to_env("Username", &cfg.username, prefix),
            field_to_env("Password", &cfg.password, prefix),
            field_to_env("BearerToken", &cfg.bearer_token, prefix),
            field_to_env("Impersonate.UserName", &cfg.impersonate.user_name, prefix),
            field_to_env(
                "Impersonate.Groups",
                &cfg.impersonate.groups.join(","),
                prefix,
            ),
            field_to_env("Insecure", &cfg.insecure.to_string(), prefix),
            field_to_env("ServerName", &cfg.server_name, prefix),
            field_to_env("CertFile", &cfg.cert_file, prefix),
            field_to_env("KeyFile", &cfg.key_file, prefix),
            field_to_env("CAFile", &cfg.ca_file, prefix),
            field_to_env("CertData", &cfg.cert_data, prefix),
            field_to_env("KeyData", &cfg.key_data, prefix),
            field_to_env("CAData", &cfg.ca_data, prefix),
            field_to_env("UserAgent", &cfg.user_agent, prefix),
            field_to_env("Timeout", &cfg.timeout_string(), prefix),
            field_to_env("TimeoutMS", &cfg.timeout_ms().to_string(), prefix),
        ])
    }
}

/// Yields no entries. Used where an invocation should start from a bare
/// environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyEnvProvider;

impl EnvProvider for EmptyEnvProvider {
    fn produce_env(&self) -> Result<Vec<EnvEntry>> {
        Ok(Vec::new())
    }
}

/// An ordered list of providers whose outputs are concatenated in list
/// order. The first failing provider aborts the whole composition and its
/// error is returned; partial output is discarded, so the runner never sees
/// an incomplete environment.
#[derive(Default)]
pub struct MultiEnvProvider {
    providers: Vec<Box<dyn EnvProvider>>,
}

impl MultiEnvProvider {
    pub fn new(providers: Vec<Box<dyn EnvProvider>>) -> Self {
        Self { providers }
    }
}

impl EnvProvider for MultiEnvProvider {
    fn produce_env(&self) -> Result<Vec<EnvEntry>> {
        let mut env = Vec::new();
        for provider in &self.providers {
            env.extend(provider.produce_env()?);
        }
        Ok(env)
    }
}
