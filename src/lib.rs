mod cli;
pub mod error;
mod git;
mod io;
mod logging;
mod repo;

use std::io::Write;

use clap::Parser;

use crate::{
    cli::{
        Cli, GlobalArgs, HulahoopCommand,
        config::{self, Config, ConfigCommand, merge_config_into_args},
        issue::{self, IssueCommand},
    },
    io::{Renderer, TextEditor},
    repo::{GitRepo, RepoContext},
};

pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut stdout = std::io::stdout().lock();

    logging::init_logging(cli.global.verbose);

    match cli.subcommand {
        HulahoopCommand::Completions(args) => cli::generate_completions(args, &mut stdout),
        HulahoopCommand::Config(args) => {
            let (repo, remote) = (&cli.global.repo, &cli.global.remote);

            match args.subcommand {
                ConfigCommand::Get(args) => config::config_get(args, repo, remote, &mut stdout),
                ConfigCommand::Set(args) => config::config_set(args, repo, remote),
                ConfigCommand::Unset(args) => {
                    config::config_unset(args, repo, remote, &mut stdout)
                }
                ConfigCommand::Edit => config::config_edit(&mut stdout),
            }
        }
        HulahoopCommand::Issue(args) => run_issue_command(cli.global, args.subcommand, &mut stdout),
    }
}

/// Resolves the repository, connects to its forge and runs one issue command.
fn run_issue_command(
    mut global: GlobalArgs,
    command: IssueCommand,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let config = Config::load_from_disk()?;
    let repo = GitRepo::open(&global.repo, &global.remote)?;

    merge_config_into_args!(&config, global, Some(&repo.remote), "", [remote_type, api_url]);

    let use_mdv = global
        .mdv_choice()
        .or_else(|| config.get_bool("mdv", Some(&repo.remote)));
    let renderer = Renderer::resolve(use_mdv);
    let context = RepoContext::connect(
        repo,
        global.remote_type.unwrap_or_default(),
        global.api_url.take(),
    )?;
    let remote = Some(&context.repo.remote);
    let client = context.client();

    match command {
        IssueCommand::List(args) => issue::list_issues(client, args, out),
        IssueCommand::New(mut args) => {
            merge_config_into_args!(
                &config,
                args,
                remote,
                "issue/new",
                [max_title_length, title_only]
            );

            let editor = TextEditor::new(config.get_string("issue/new/editor", remote));

            issue::new_issue(client, &editor, args, out)
        }
        IssueCommand::Show(args) => issue::show_issue(client, &renderer, args, out),
        IssueCommand::Comment(args) => {
            let editor = TextEditor::new(config.get_string("issue/comment/editor", remote));

            issue::comment_on_issue(client, &editor, args, out)
        }
    }
}
