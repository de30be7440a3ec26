use std::path::PathBuf;

use crate::{
    agent::{CommandTable, TargetResolver},
    config::{DcrpsConfig, Overrides, Settings},
    error::DcrpsError,
    inspect::{self, SystemProcessInfo},
    invocation::{Invocation, parse_invocation},
    listing::render_list,
    prelude::*,
    process::{self, NameMatch, Pid, ProcessRecord, ProcessSource, SystemProcessSource},
    tree::render_tree,
};
use clap::{
    Parser,
    builder::{Styles, styling},
};

fn create_styles() -> Styles {
    styling::Styles::styled()
        .header(styling::AnsiColor::Green.on_default() | styling::Effects::BOLD)
        .usage(styling::AnsiColor::Green.on_default() | styling::Effects::BOLD)
        .literal(styling::AnsiColor::Blue.on_default() | styling::Effects::BOLD)
        .placeholder(styling::AnsiColor::Cyan.on_default())
}

#[derive(Parser, Debug)]
#[command(
    version,
    about = "List and diagnose Decred Go processes",
    styles = create_styles(),
    disable_help_subcommand = true
)]
pub struct Cli {
    /// Prefix of the executable names to track
    #[arg(long, env = "DCRPS_PREFIX")]
    pub prefix: Option<String>,

    /// Directory where the agents write their port files
    #[arg(long, env = "GOPS_CONFIG_DIR")]
    pub agent_dir: Option<PathBuf>,

    /// The configuration name to use
    /// If provided, the configuration will be loaded from ~/.config/dcrps/{config-name}.yaml
    /// Otherwise, loads from ~/.config/dcrps/config.yaml
    #[arg(long, env = "DCRPS_CONFIG_NAME")]
    pub config_name: Option<String>,

    /// `help`, `tree`, a PID, an exec name or `<cmd> <exec|pid|addr> [params...]`.
    /// Options must come first, everything after the command is passed along untouched.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

pub fn usage_text(commands: &CommandTable) -> String {
    let command_lines = commands
        .iter()
        .map(|c| format!("    {:<12}{}", c.name(), c.description()))
        .join("\n");

    format!(
        r#"dcrps is a tool to list and diagnose Decred Go processes.

dcrps <"help"|"tree">
dcrps <cmd> <exec|pid|addr> ...
dcrps <exec|pid> # displays process info

Commands with no argument:
    help        Displays this message.
    tree        Displays process tree.

Commands with <exec|pid|addr> argument:
{command_lines}

All commands with a <exec|pid|addr> argument require the agent running on the Go
process. The symbol "*" next to the process name indicates the process runs the
agent."#
    )
}

fn family(source: &dyn ProcessSource, prefix: &str) -> Vec<ProcessRecord> {
    let family = process::filter_family(source.processes(), prefix);
    debug!("{} processes match prefix {prefix:?}", family.len());
    family
}

fn show_process_info(pid: Pid) -> Result<()> {
    let info = SystemProcessInfo::new(pid)?;
    inspect::print_process_info(&mut std::io::stdout().lock(), &info)
}

async fn run_command(
    commands: &CommandTable,
    settings: &Settings,
    source: &dyn ProcessSource,
    (name, target, params): (&str, &str, &[String]),
) -> Result<()> {
    let command = commands
        .get(name)
        .ok_or_else(|| DcrpsError::usage("unknown subcommand"))?;

    let resolver = TargetResolver {
        agent_dir: &settings.agent_dir,
        agent_host: &settings.agent_host,
        prefix: &settings.prefix,
        source,
    };
    let addr = resolver
        .resolve(target)
        .map_err(|source| DcrpsError::Resolution {
            target: target.to_string(),
            source,
        })?;

    command
        .execute(addr, params)
        .await
        .map_err(DcrpsError::Dispatch)?;
    Ok(())
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let settings = DcrpsConfig::load(cli.config_name.as_deref())?.resolve(&Overrides {
        prefix: cli.prefix.clone(),
        agent_dir: cli.agent_dir.clone(),
    })?;
    debug!("Running with {settings:?}");

    let commands = CommandTable::default();
    let source = SystemProcessSource::new(&settings.agent_dir, &settings.prefix);

    match parse_invocation(&cli.args, &commands)? {
        Invocation::List => print!("{}", render_list(&family(&source, &settings.prefix))),
        Invocation::Tree => print!("{}", render_tree(&family(&source, &settings.prefix))),
        Invocation::Help => return Err(DcrpsError::usage("").into()),
        Invocation::Info(pid) => show_process_info(pid)?,
        Invocation::Named(name) => {
            let family = family(&source, &settings.prefix);
            match process::index_by_name(&family).get(name) {
                Some(NameMatch::Unique(pid)) => show_process_info(*pid)?,
                Some(NameMatch::Ambiguous) => {
                    bail!("Several processes are named {name}, use a PID instead")
                }
                None => return Err(DcrpsError::usage("unknown subcommand").into()),
            }
        }
        Invocation::Command {
            name,
            target,
            params,
        } => run_command(&commands, &settings, &source, (name, target, params)).await?,
    }
    Ok(())
}

/// Print `err` the way its kind asks for and return the exit code
pub fn report_error(err: &Error) -> i32 {
    match err.downcast_ref::<DcrpsError>() {
        Some(DcrpsError::Usage(message)) => {
            if !message.is_empty() {
                eprintln!("dcrps: {message}");
            }
            eprintln!("{}", usage_text(&CommandTable::default()));
            1
        }
        Some(e) => {
            eprintln!("{e}");
            e.exit_code()
        }
        None => {
            eprintln!("Error: {err:#}");
            1
        }
    }
}
