//! The `completions` subcommand.

use std::io::Write;

use clap::{Args, CommandFactory};
use clap_complete::{Shell, generate};

use crate::cli::Cli;

// =============================================================================
// CLI Arguments
// =============================================================================

#[derive(Debug, Args)]
pub struct CompletionsCommandArgs {
    /// The shell to generate completions for
    shell: Shell,
}

// =============================================================================
// Command Logic
// =============================================================================

pub fn generate_completions(args: CompletionsCommandArgs, out: &mut dyn Write) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();

    generate(args.shell, &mut cmd, bin_name, out);

    Ok(())
}
