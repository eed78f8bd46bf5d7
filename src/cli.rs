//! # Command-Line Interface Module / 命令行接口模块
//!
//! Builds the `testr` command line with clap's builder API, so help texts can
//! be translated before parsing, and dispatches to the subcommands.
//!
//! 使用 clap 的构建器 API 构建 `testr` 命令行，以便在解析前翻译帮助文本，
//! 并分派到各个子命令。

pub mod commands;

use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::{env, path::PathBuf, time::Duration};

use crate::core::config::{DEFAULT_PACKAGES_REPO, RunOptions};
use crate::infra::{logging, t};

/// Pre-parses the command line arguments to find the language setting.
/// This allows i18n to be initialized before the full CLI is built.
/// It looks for a `--lang <VALUE>` or `--lang=<VALUE>` argument.
fn pre_parse_language(args: &[String]) -> Option<String> {
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--lang" {
            return iter.next().cloned();
        }
        if let Some(lang) = arg.strip_prefix("--lang=") {
            return Some(lang.to_string());
        }
    }
    None
}

/// Builds the command tree. Help texts use the current locale.
pub fn build_cli() -> Command {
    Command::new("testr")
        .version(env!("CARGO_PKG_VERSION"))
        .about(t!("cli.about").to_string())
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("lang")
                .long("lang")
                .help(t!("cli.lang").to_string())
                .value_name("LANGUAGE")
                .global(true)
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help(t!("cli.verbose").to_string())
                .global(true)
                .action(ArgAction::SetTrue),
        )
        .subcommand(build_run_command())
        .subcommand(
            Command::new("regress")
                .about(t!("cli.regress.about").to_string())
                .arg(
                    Arg::new("spec")
                        .long("spec")
                        .help(t!("cli.regress.spec").to_string())
                        .value_name("FILE")
                        .value_parser(clap::value_parser!(PathBuf))
                        .action(ArgAction::Set),
                )
                .arg(out_dir_arg())
                .arg(
                    Arg::new("regress-dir")
                        .long("regress-dir")
                        .help(t!("cli.regress.regress_dir").to_string())
                        .value_name("DIR")
                        .value_parser(clap::value_parser!(PathBuf))
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("files")
                        .help(t!("cli.regress.files").to_string())
                        .value_name("FILES")
                        .num_args(0..)
                        .action(ArgAction::Append),
                ),
        )
        .subcommand(
            Command::new("check-files")
                .about(t!("cli.check_files.about").to_string())
                .arg(
                    Arg::new("glob")
                        .help(t!("cli.check_files.glob").to_string())
                        .value_name("GLOB")
                        .required(true),
                )
                .arg(
                    Arg::new("check")
                        .long("check")
                        .help(t!("cli.check_files.check").to_string())
                        .value_name("REGEX")
                        .required(true)
                        .action(ArgAction::Append),
                )
                .arg(
                    Arg::new("allow")
                        .long("allow")
                        .help(t!("cli.check_files.allow").to_string())
                        .value_name("REGEX")
                        .action(ArgAction::Append),
                )
                .arg(out_dir_arg()),
        )
}

fn out_dir_arg() -> Arg {
    Arg::new("out-dir")
        .long("out-dir")
        .help(t!("cli.out_dir").to_string())
        .value_name("DIR")
        .value_parser(clap::value_parser!(PathBuf))
        .action(ArgAction::Set)
}

fn build_run_command() -> Command {
    Command::new("run")
        .about(t!("cli.run.about").to_string())
        .arg(
            Arg::new("root")
                .long("root")
                .help(t!("cli.run.root").to_string())
                .value_name("DIR")
                .default_value(".")
                .value_parser(clap::value_parser!(PathBuf))
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("outputs-dir")
                .long("outputs-dir")
                .help(t!("cli.run.outputs_dir").to_string())
                .value_name("DIR")
                .default_value("outputs")
                .value_parser(clap::value_parser!(PathBuf))
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("include")
                .long("include")
                .help(t!("cli.run.include").to_string())
                .value_name("PATTERN")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("exclude")
                .long("exclude")
                .help(t!("cli.run.exclude").to_string())
                .value_name("PATTERN")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("collect-only")
                .long("collect-only")
                .help(t!("cli.run.collect_only").to_string())
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("test-spec")
                .long("test-spec")
                .help(t!("cli.run.test_spec").to_string())
                .value_name("FILE")
                .value_parser(clap::value_parser!(PathBuf))
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("packages-repo")
                .long("packages-repo")
                .help(t!("cli.run.packages_repo").to_string())
                .value_name("URL")
                .default_value(DEFAULT_PACKAGES_REPO)
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("overwrite")
                .long("overwrite")
                .help(t!("cli.run.overwrite").to_string())
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("python")
                .long("python")
                .help(t!("cli.run.python").to_string())
                .value_name("PROGRAM")
                .default_value("python3")
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .help(t!("cli.run.timeout").to_string())
                .value_name("SECS")
                .value_parser(clap::value_parser!(u64).range(1..))
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("include-stdout")
                .long("include-stdout")
                .help(t!("cli.run.include_stdout").to_string())
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("html")
                .long("html")
                .help(t!("cli.run.html").to_string())
                .value_name("HTML")
                .value_parser(clap::value_parser!(PathBuf))
                .action(ArgAction::Set),
        )
}

fn strings(matches: &ArgMatches, id: &str) -> Vec<String> {
    matches
        .get_many::<String>(id)
        .map(|values| values.cloned().collect())
        .unwrap_or_default()
}

fn run_options(matches: &ArgMatches, argv: Vec<String>) -> RunOptions {
    let defaults = RunOptions::default();
    RunOptions {
        root: matches.get_one::<PathBuf>("root").cloned().unwrap_or(defaults.root),
        outputs_dir: matches
            .get_one::<PathBuf>("outputs-dir")
            .cloned()
            .unwrap_or(defaults.outputs_dir),
        includes: strings(matches, "include"),
        excludes: strings(matches, "exclude"),
        collect_only: matches.get_flag("collect-only"),
        test_spec: matches.get_one::<PathBuf>("test-spec").cloned(),
        packages_repo: matches
            .get_one::<String>("packages-repo")
            .cloned()
            .unwrap_or(defaults.packages_repo),
        overwrite: matches.get_flag("overwrite"),
        python: matches
            .get_one::<String>("python")
            .cloned()
            .unwrap_or(defaults.python),
        timeout: matches.get_one::<u64>("timeout").copied().map(Duration::from_secs),
        include_stdout: matches.get_flag("include-stdout"),
        html: matches.get_one::<PathBuf>("html").cloned(),
        argv,
    }
}

/// Parses the process arguments and runs the selected subcommand.
pub async fn run() -> Result<()> {
    let argv: Vec<String> = env::args().collect();

    // Pre-parse language and initialize i18n first.
    match pre_parse_language(&argv) {
        Some(language) => rust_i18n::set_locale(&language),
        None => crate::init(),
    }

    let matches = build_cli().get_matches_from(&argv);
    logging::init_tracing(matches.get_flag("verbose"));

    match matches.subcommand() {
        Some(("run", run_matches)) => {
            commands::run::execute(run_options(run_matches, argv)).await?;
        }
        Some(("regress", m)) => {
            commands::regress::execute(
                m.get_one::<PathBuf>("spec").cloned(),
                m.get_one::<PathBuf>("out-dir").cloned(),
                m.get_one::<PathBuf>("regress-dir").cloned(),
                strings(m, "files"),
            )?;
        }
        Some(("check-files", m)) => {
            commands::check_files::execute(
                m.get_one::<String>("glob").cloned().unwrap_or_default(),
                strings(m, "check"),
                strings(m, "allow"),
                m.get_one::<PathBuf>("out-dir").cloned(),
            )?;
        }
        _ => {
            // subcommand_required makes clap print help and exit first.
        }
    }
    Ok(())
}
