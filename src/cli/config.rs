//! The `config` subcommand and the tool's configuration file.

use std::{
    collections::{HashMap, HashSet},
    fmt::Display,
    fs,
    io::Write,
    path::Path,
};

use anyhow::Context;
use clap::{Args, Subcommand, ValueEnum};
use dialoguer::Editor;
use serde::{Deserialize, Serialize};

use crate::{git::GitRemoteData, repo::GitRepo};

const APP_NAME: &str = std::env!("CARGO_PKG_NAME");
const CONFIG_NAME: &str = "config";

// =============================================================================
// CLI Arguments
// =============================================================================

/// Command-line arguments for the `config` subcommand.
#[derive(Args)]
pub struct ConfigCommandArgs {
    #[command(subcommand)]
    pub subcommand: ConfigCommand,
}

/// Available subcommands for config subcommand.
#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Get configuration value(s).
    Get(ConfigGetArgs),

    /// Set a configuration value.
    Set(ConfigSetArgs),

    /// Unset a configuration value.
    #[command(alias = "delete")]
    Unset(ConfigUnsetArgs),

    /// Edit the configuration file.
    Edit,
}

const PATH_DEFINITION: &str = "A path follows the format [<COMMAND_PATH>/]<FLAG>, e.g. editor, issue/editor or issue/new/max-title-length.
The value with the more specific path wins within a scope. Remote scope beats host scope which beats global scope.
Access tokens are not stored here but in git config under git-hulahoop.<host>.token.";

/// Arguments for `config get`.
#[derive(Args)]
pub struct ConfigGetArgs {
    #[arg(help = format!("The configuration path to get. If not provided, get all settings.\n\n{PATH_DEFINITION}"))]
    pub path: Option<String>,

    /// The scope to query.
    /// If not specified, shows the effective value after applying precedence.
    /// Host and remote scopes refer to the remote selected with --remote.
    #[arg(long)]
    pub scope: Option<ConfigScope>,
}

/// Arguments for `config set`.
#[derive(Args)]
pub struct ConfigSetArgs {
    #[arg(help = format!("The configuration path to set.\n\n{PATH_DEFINITION}"))]
    pub path: String,

    /// The value to set.
    pub value: String,

    /// The scope to set.
    #[arg(long, default_value = "global")]
    pub scope: ConfigScope,
}

/// Arguments for `config unset`.
#[derive(Args)]
pub struct ConfigUnsetArgs {
    #[arg(help = format!("The configuration path to unset.\n\n{PATH_DEFINITION}"))]
    pub path: String,

    /// The scope to unset from.
    #[arg(long, default_value = "global")]
    pub scope: ConfigScope,
}

// =============================================================================
// Domain
// =============================================================================

/// Configuration structure stored in TOML format.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Global settings
    #[serde(flatten)]
    pub global: HashMap<String, String>,

    /// Host-specific settings: key is the host as found in the remote URL
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub host: HashMap<String, HashMap<String, String>>,

    /// Remote-specific settings: key is "<host>/<project path>"
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub remote: HashMap<String, HashMap<String, String>>,
}

impl Config {
    /// Load configuration from disk. A missing file yields the defaults and
    /// is not created.
    pub fn load_from_disk() -> anyhow::Result<Config> {
        let path = confy::get_configuration_file_path(APP_NAME, CONFIG_NAME)
            .context("Failed to get config path")?;

        Config::load_from_path(&path)
    }

    fn load_from_path(path: &Path) -> anyhow::Result<Config> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No configuration file");

            return Ok(Config::default());
        }

        confy::load_path(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))
    }

    /// Get a boolean config value.
    pub fn get_bool(&self, path: &str, remote: Option<&GitRemoteData>) -> Option<bool> {
        self.get_value_effective(path, remote).and_then(|(value_str, scope)| {
            value_str.parse::<bool>().ok().or_else(|| {
                tracing::warn!(
                    "Invalid boolean value for '{path}' in {scope}: '{value_str}' (expected 'true' or 'false')"
                );

                None
            })
        })
    }

    /// Get an enum config value using clap's ValueEnum.
    pub fn get_enum<T: ValueEnum>(&self, path: &str, remote: Option<&GitRemoteData>) -> Option<T> {
        self.get_value_effective(path, remote)
            .and_then(|(value_str, scope)| {
                T::from_str(&value_str, true).ok().or_else(|| {
                    let valid_values = T::value_variants()
                        .iter()
                        .filter_map(|v| v.to_possible_value().map(|v| v.get_name().to_string()))
                        .collect::<Vec<_>>()
                        .join(", ");

                    tracing::warn!(
                        "Invalid value for '{path}' in {scope}: '{value_str}' (expected one of: {valid_values})"
                    );

                    None
                })
            })
    }

    /// Get a string config value.
    pub fn get_string(&self, path: &str, remote: Option<&GitRemoteData>) -> Option<String> {
        self.get_value_effective(path, remote).map(|(v, _)| v)
    }

    /// Get a u32 config value.
    pub fn get_u32(&self, path: &str, remote: Option<&GitRemoteData>) -> Option<u32> {
        self.get_value_effective(path, remote).and_then(|(value_str, scope)| {
            value_str.parse::<u32>().ok().or_else(|| {
                tracing::warn!(
                    "Invalid number value for '{path}' in {scope}: '{value_str}' (expected a positive integer)"
                );

                None
            })
        })
    }

    /// Get effective value with precedence: remote > host > global.
    fn get_value_effective(
        &self,
        path: &str,
        remote: Option<&GitRemoteData>,
    ) -> Option<(String, ConfigScope)> {
        if let Some(remote) = remote {
            if let Some(value) = self.get_value_from_scope(path, ConfigSource::Remote(remote)) {
                return Some((value, ConfigScope::Remote));
            }

            if let Some(value) = self.get_value_from_scope(path, ConfigSource::Host(remote)) {
                return Some((value, ConfigScope::Host));
            }
        }

        self.get_value_from_scope(path, ConfigSource::Global)
            .map(|value| (value, ConfigScope::Global))
    }

    /// Get value from a specific scope without precedence.
    fn get_value_from_scope(&self, path: &str, source: ConfigSource) -> Option<String> {
        let table = self.table(source)?;

        get_path_variants(path)
            .into_iter()
            .find_map(|variant| table.get(&variant).cloned())
    }

    fn table(&self, source: ConfigSource) -> Option<&HashMap<String, String>> {
        match source {
            ConfigSource::Global => Some(&self.global),
            ConfigSource::Host(remote) => self.host.get(&format_host_key(remote)),
            ConfigSource::Remote(remote) => self.remote.get(&format_remote_key(remote)),
        }
    }

    /// Save configuration to disk.
    fn save_to_disk(&self) -> anyhow::Result<()> {
        confy::store(APP_NAME, CONFIG_NAME, self).context("Failed to save configuration")
    }

    /// Set a value in the configuration.
    fn set_value(&mut self, path: &str, value: &str, source: ConfigSource) {
        let table = match source {
            ConfigSource::Global => &mut self.global,
            ConfigSource::Host(remote) => self.host.entry(format_host_key(remote)).or_default(),
            ConfigSource::Remote(remote) => {
                self.remote.entry(format_remote_key(remote)).or_default()
            }
        };

        table.insert(path.to_string(), value.to_string());
    }

    /// Unset a value in the configuration.
    /// Returns true if a value was actually removed, false otherwise.
    fn unset_value(&mut self, path: &str, source: ConfigSource) -> bool {
        let (scoped, key) = match source {
            ConfigSource::Global => return self.global.remove(path).is_some(),
            ConfigSource::Host(remote) => (&mut self.host, format_host_key(remote)),
            ConfigSource::Remote(remote) => (&mut self.remote, format_remote_key(remote)),
        };
        let Some(table) = scoped.get_mut(&key) else {
            return false;
        };
        let removed = table.remove(path).is_some();

        if table.is_empty() {
            scoped.remove(&key);
        }

        removed
    }
}

/// Configuration scope.
#[derive(Clone, Copy, Debug, PartialEq, ValueEnum)]
pub enum ConfigScope {
    Global,
    Host,
    Remote,
}

impl Display for ConfigScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let scope_name = match self {
            ConfigScope::Global => "global",
            ConfigScope::Host => "host",
            ConfigScope::Remote => "remote",
        };

        write!(f, "{scope_name} scope")
    }
}

/// Config source that combines the scope and the git remote.
#[derive(Clone, Copy, Debug)]
enum ConfigSource<'a> {
    Global,
    Host(&'a GitRemoteData),
    Remote(&'a GitRemoteData),
}

impl<'a> ConfigSource<'a> {
    fn new(scope: ConfigScope, remote: Option<&'a GitRemoteData>) -> anyhow::Result<Self> {
        match scope {
            ConfigScope::Global => Ok(ConfigSource::Global),
            ConfigScope::Host => {
                let remote = remote.context("Remote data required for host scope")?;

                Ok(ConfigSource::Host(remote))
            }
            ConfigScope::Remote => {
                let remote = remote.context("Remote data required for remote scope")?;

                Ok(ConfigSource::Remote(remote))
            }
        }
    }
}

/// Merges config values into args fields that weren't given on the command
/// line.
///
/// It expects the following arguments (tt):
///   `config`, `args`, optional git `remote`,  base `config path`, `arg fields`
///   in square brackets
///
/// Field names are converted from `snake_case` to `kebab-case` for the config
/// path.
///
/// # Example
///
/// ```rust,ignore
/// merge_config_into_args!(
///     &config,
///     args,
///     Some(&remote),
///     "issue/new",
///     [max_title_length, title_only]
/// );
/// ```
macro_rules! merge_config_into_args {
    ($config:expr, $args:expr, $remote:expr, $command_path:literal, [$($field:ident),* $(,)?]$(,)?) => {
        $(
            {
                let field_name = stringify!($field).replace('_', "-");
                let config_path = if $command_path.is_empty() {
                    field_name
                } else {
                    format!("{}/{}", $command_path, field_name)
                };

                $crate::cli::config::macro_internals::MergeConfigIntoArg::__merge_with_config(
                    &mut $args.$field,
                    $config,
                    &config_path,
                    $remote,
                );
            }
        )*
    };
}

pub(crate) use merge_config_into_args;

/// Internal module for macro implementation details.
pub(crate) mod macro_internals {
    use super::{Config, GitRemoteData};
    use crate::cli::forge::RemoteType;

    pub trait MergeConfigIntoArg {
        /// Helper function for merging config values into args fields. It isn't
        /// meant to be called manually. Instead use the merge_config_into_args
        /// macro, which calls this function.
        fn __merge_with_config(
            &mut self,
            config: &Config,
            path: &str,
            remote: Option<&GitRemoteData>,
        );
    }

    impl MergeConfigIntoArg for Option<String> {
        fn __merge_with_config(
            &mut self,
            config: &Config,
            path: &str,
            remote: Option<&GitRemoteData>,
        ) {
            if self.is_none() {
                *self = config.get_string(path, remote);
            }
        }
    }

    impl MergeConfigIntoArg for Option<u32> {
        fn __merge_with_config(
            &mut self,
            config: &Config,
            path: &str,
            remote: Option<&GitRemoteData>,
        ) {
            if self.is_none() {
                *self = config.get_u32(path, remote);
            }
        }
    }

    impl MergeConfigIntoArg for bool {
        fn __merge_with_config(
            &mut self,
            config: &Config,
            path: &str,
            remote: Option<&GitRemoteData>,
        ) {
            if !*self {
                *self = config.get_bool(path, remote).unwrap_or_default();
            }
        }
    }

    impl MergeConfigIntoArg for Option<RemoteType> {
        fn __merge_with_config(
            &mut self,
            config: &Config,
            path: &str,
            remote: Option<&GitRemoteData>,
        ) {
            if self.is_none() {
                *self = config.get_enum(path, remote);
            }
        }
    }
}

// =============================================================================
// Command Logic
// =============================================================================

/// Execute the `config get` subcommand.
pub fn config_get(
    args: ConfigGetArgs,
    repo_path: &Path,
    remote_name: &str,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let config = Config::load_from_disk()?;

    match args.scope {
        Some(scope) => {
            let remote = get_remote_for_scope(scope, repo_path, remote_name)?;
            let source = ConfigSource::new(scope, remote.as_ref())?;

            match args.path {
                Some(path) => match config.get_value_from_scope(&path, source) {
                    Some(value) => writeln!(out, "{value}")?,
                    None => eprintln!("No value found for '{path}' in {scope}"),
                },
                None => print_entire_config_for_scope(&config, source, out)?,
            }
        }
        None => {
            // Without a scope, apply precedence. Outside of a repository only
            // the global scope is available.
            let remote = GitRepo::open(repo_path, remote_name)
                .map(|repo| repo.remote)
                .ok();

            match args.path {
                Some(path) => match config.get_value_effective(&path, remote.as_ref()) {
                    Some((value, _)) => writeln!(out, "{value}")?,
                    None => eprintln!("No value found for '{path}'"),
                },
                None => print_entire_effective_config(&config, remote.as_ref(), out)?,
            }
        }
    }

    Ok(())
}

/// Execute the `config set` subcommand.
pub fn config_set(args: ConfigSetArgs, repo_path: &Path, remote_name: &str) -> anyhow::Result<()> {
    let mut config = Config::load_from_disk()?;
    let remote = get_remote_for_scope(args.scope, repo_path, remote_name)?;
    let source = ConfigSource::new(args.scope, remote.as_ref())?;

    config.set_value(&args.path, &args.value, source);
    config.save_to_disk()?;

    Ok(())
}

/// Execute the `config unset` subcommand.
pub fn config_unset(
    args: ConfigUnsetArgs,
    repo_path: &Path,
    remote_name: &str,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let mut config = Config::load_from_disk()?;
    let remote = get_remote_for_scope(args.scope, repo_path, remote_name)?;
    let source = ConfigSource::new(args.scope, remote.as_ref())?;

    if config.unset_value(&args.path, source) {
        config.save_to_disk()?;
        writeln!(out, "Unset '{}' from {}", args.path, args.scope)?;
    } else {
        eprintln!("No value found for '{}' in {}", args.path, args.scope);
    }

    Ok(())
}

/// Execute the `config edit` subcommand.
pub fn config_edit(out: &mut dyn Write) -> anyhow::Result<()> {
    let config = Config::load_from_disk()?;
    let mut editor = Editor::new();

    if let Some(cmd) = config.get_string("editor", None) {
        editor.executable(cmd);
    };

    let config_path = match confy::get_configuration_file_path(APP_NAME, CONFIG_NAME) {
        Ok(path) => path,
        Err(e) => anyhow::bail!("Failed to get config path: {}", e),
    };
    let edited_content = editor
        .edit(&fs::read_to_string(&config_path).unwrap_or_default())
        .context("Failed to open editor")?;

    if let Some(content) = edited_content {
        fs::write(&config_path, content.as_bytes())
            .context("Failed to write configuration file")?;

        Config::load_from_disk()
            .context("The config file may be corrupted. Please check the TOML file.")?;

        writeln!(out, "Configuration saved successfully.")?;
    }

    Ok(())
}

// =============================================================================
// Private Helpers
// =============================================================================

/// Format a remote identifier for use as a config key.
fn format_remote_key(remote: &GitRemoteData) -> String {
    format!("{}/{}", remote.host, remote.path)
}

/// Format a host identifier for use as a config key.
fn format_host_key(remote: &GitRemoteData) -> String {
    remote.host.clone()
}

/// Get the applicable path variants for a given (full) path by walking up the
/// command path hierarchy.
///
/// # Examples
///
/// - `issue/new/editor` → `["issue/new/editor", "issue/editor", "editor"]`
/// - `issue/editor` → `["issue/editor", "editor"]`
/// - `editor` → `["editor"]`
fn get_path_variants(path: &str) -> Vec<String> {
    let parts: Vec<&str> = path.split('/').collect();
    let flag_index = parts.len() - 1;
    let flag = parts[flag_index];
    let command_path_parts = &parts[..flag_index];

    if command_path_parts.is_empty() {
        return vec![flag.to_string()];
    }

    let mut variants = vec![path.to_string()];

    for i in (1..command_path_parts.len()).rev() {
        let truncated_path = command_path_parts[..i].join("/");

        variants.push(format!("{}/{}", truncated_path, flag));
    }

    variants.push(flag.to_string());

    variants
}

/// Gets the git remote for a given scope.
fn get_remote_for_scope(
    scope: ConfigScope,
    repo_path: &Path,
    remote_name: &str,
) -> anyhow::Result<Option<GitRemoteData>> {
    let remote = match scope {
        ConfigScope::Global => None,
        ConfigScope::Host | ConfigScope::Remote => {
            let repo = GitRepo::open(repo_path, remote_name).with_context(|| {
                format!("Failed to resolve remote '{remote_name}' for the {scope}")
            })?;

            Some(repo.remote)
        }
    };

    Ok(remote)
}

/// List values from a specific scope.
fn print_entire_config_for_scope(
    config: &Config,
    source: ConfigSource,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    if let Some(table) = config.table(source) {
        let mut sorted_entries: Vec<_> = table.iter().collect();
        sorted_entries.sort_by_key(|(k, _)| *k);

        for (key, value) in sorted_entries {
            writeln!(out, "{key} = {value}")?;
        }
    }

    Ok(())
}

/// Print effective configuration with precedence applied.
fn print_entire_effective_config(
    config: &Config,
    remote: Option<&GitRemoteData>,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let mut all_paths: HashSet<&String> = config.global.keys().collect();

    if let Some(remote) = remote {
        for source in [ConfigSource::Host(remote), ConfigSource::Remote(remote)] {
            if let Some(table) = config.table(source) {
                all_paths.extend(table.keys());
            }
        }
    }

    let mut sorted_paths: Vec<_> = all_paths.into_iter().collect();
    sorted_paths.sort();

    for path in sorted_paths {
        if let Some((value, scope)) = config.get_value_effective(path, remote) {
            writeln!(out, "{path} = {value} ({scope})")?;
        }
    }

    Ok(())
}
