pub mod forge {
    pub mod credentials;
    mod forge_client;
    mod gitlab;
    mod http_client;

    pub use forge_client::{
        ApiType, ForgeClient, ForgeConnection, RemoteType, create_forge_client, default_api_url,
    };
}

pub mod config;
pub mod issue;

mod completions;

pub use completions::{CompletionsCommandArgs, generate_completions};

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::cli::{config::ConfigCommandArgs, forge::RemoteType, issue::IssueCommandArgs};

#[derive(Parser)]
#[command(name = "git-hulahoop", version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub subcommand: HulahoopCommand,
}

/// Options shared by all subcommands.
#[derive(Args)]
pub struct GlobalArgs {
    /// Path inside the git repository to work on
    #[arg(long, global = true, default_value = ".", value_name = "PATH")]
    pub repo: PathBuf,

    /// Git remote to use
    #[arg(long, global = true, default_value = "origin", value_name = "NAME")]
    pub remote: String,

    /// The forge type of the remote [default: auto]
    #[arg(long, global = true, value_name = "TYPE")]
    pub remote_type: Option<RemoteType>,

    /// Explicitly provide the base API URL (e.g. https://gitlab.com/api/v4)
    /// instead of deriving it from the remote's host
    #[arg(long, global = true, value_name = "URL")]
    pub api_url: Option<String>,

    /// Render issues with mdv
    #[arg(long, global = true, overrides_with = "no_mdv")]
    pub mdv: bool,

    /// Print issues as plain text even if mdv is installed
    #[arg(long, global = true, overrides_with = "mdv")]
    pub no_mdv: bool,

    /// Print debug output (repeat for more)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

impl GlobalArgs {
    /// The explicit renderer choice; `None` means auto-detect.
    pub fn mdv_choice(&self) -> Option<bool> {
        match (self.mdv, self.no_mdv) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}

#[derive(Subcommand)]
pub enum HulahoopCommand {
    /// Work with the issues of the remote's project.
    #[command(alias = "i")]
    Issue(IssueCommandArgs),

    /// Get or set configuration values.
    Config(ConfigCommandArgs),

    /// Generate shell completions.
    Completions(CompletionsCommandArgs),
}
