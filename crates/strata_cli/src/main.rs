//! Strata CLI, the command-line interface for hardware hierarchy elaboration.
//!
//! Provides `strata check` to elaborate a design, `strata info` for the
//! module-info report, `strata fileinfo` for resolved file lists and
//! `strata ls` to list the declarations found on the library path.

#![warn(missing_docs)]

mod check;
mod fileinfo;
mod info;
mod ls;
mod pipeline;

use std::io::IsTerminal;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

/// Strata: elaborates parameterized module hierarchies.
#[derive(Parser, Debug)]
#[command(name = "strata", version, about = "Strata hierarchy elaborator")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Control colored output.
    #[arg(long, global = true, value_enum, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    /// Path to a custom `strata.toml` configuration file.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Elaborate a design and report errors.
    Check(TopArgs),
    /// Print the module-info report of every module of a design.
    Info(TopArgs),
    /// Print the resolved file lists of a design.
    Fileinfo(FileInfoArgs),
    /// List the libraries and modules on the library path.
    Ls(LsArgs),
}

/// Arguments selecting the design.
#[derive(Parser, Debug)]
pub struct TopArgs {
    /// Top reference `[tb_lib.tb#]lib.top[-sub]`; defaults to `project.top`.
    pub top: Option<String>,

    /// Elaborate sibling subtrees in parallel.
    #[arg(long)]
    pub parallel: bool,
}

/// Arguments for the `strata fileinfo` subcommand.
#[derive(Parser, Debug)]
pub struct FileInfoArgs {
    /// The design.
    #[command(flatten)]
    pub top: TopArgs,

    /// File-list name (default from `[filelist] name`).
    #[arg(short, long)]
    pub name: Option<String>,

    /// Implementation target matched against rule targets.
    #[arg(short, long)]
    pub target: Option<String>,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,

    /// Expand `$VAR` references in file-list paths from the environment.
    #[arg(long)]
    pub envvars: bool,
}

/// Arguments for the `strata ls` subcommand.
#[derive(Parser, Debug)]
pub struct LsArgs {
    /// Glob on `lib.module` names, e.g. `uart_lib.*`.
    pub pattern: Option<String>,
}

/// Controls whether colored output is produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ColorChoice {
    /// Detect from terminal capabilities.
    Auto,
    /// Always produce colored output.
    Always,
    /// Never produce colored output.
    Never,
}

/// Report output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable text.
    Text,
    /// Machine-readable JSON.
    Json,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print verbose/debug information.
    pub verbose: bool,
    /// Whether to use colored output.
    pub color: bool,
    /// Optional path to a custom config file.
    pub config: Option<String>,
}

impl GlobalArgs {
    fn log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else if self.verbose {
            "debug"
        } else {
            "warn"
        }
    }
}

fn init_logging(global: &GlobalArgs) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(global.log_level()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();

    let color = match cli.color {
        ColorChoice::Auto => std::io::stderr().is_terminal(),
        ColorChoice::Always => true,
        ColorChoice::Never => false,
    };

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        color,
        config: cli.config,
    };
    init_logging(&global);

    let result = match cli.command {
        Command::Check(ref args) => check::run(args, &global),
        Command::Info(ref args) => info::run(args, &global),
        Command::Fileinfo(ref args) => fileinfo::run(args, &global),
        Command::Ls(ref args) => ls::run(args, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_check_default() {
        let cli = Cli::parse_from(["strata", "check"]);
        match cli.command {
            Command::Check(ref args) => {
                assert!(args.top.is_none());
                assert!(!args.parallel);
            }
            _ => panic!("expected Check command"),
        }
    }

    #[test]
    fn parse_check_with_top() {
        let cli = Cli::parse_from(["strata", "check", "tb_lib.tb#uart_lib.uart", "--parallel"]);
        match cli.command {
            Command::Check(ref args) => {
                assert_eq!(args.top.as_deref(), Some("tb_lib.tb#uart_lib.uart"));
                assert!(args.parallel);
            }
            _ => panic!("expected Check command"),
        }
    }

    #[test]
    fn parse_fileinfo_with_args() {
        let cli = Cli::parse_from([
            "strata",
            "fileinfo",
            "uart_lib.uart",
            "--name",
            "sim",
            "--target",
            "asic",
            "--format",
            "json",
        ]);
        match cli.command {
            Command::Fileinfo(ref args) => {
                assert_eq!(args.top.top.as_deref(), Some("uart_lib.uart"));
                assert_eq!(args.name.as_deref(), Some("sim"));
                assert_eq!(args.target.as_deref(), Some("asic"));
                assert_eq!(args.format, ReportFormat::Json);
                assert!(!args.envvars);
            }
            _ => panic!("expected Fileinfo command"),
        }
    }

    #[test]
    fn parse_ls_pattern() {
        let cli = Cli::parse_from(["strata", "ls", "uart_lib.*"]);
        match cli.command {
            Command::Ls(ref args) => assert_eq!(args.pattern.as_deref(), Some("uart_lib.*")),
            _ => panic!("expected Ls command"),
        }
    }

    #[test]
    fn parse_global_flags() {
        let cli = Cli::parse_from(["strata", "--quiet", "--color", "never", "ls"]);
        assert!(cli.quiet);
        assert!(!cli.verbose);
        assert_eq!(cli.color, ColorChoice::Never);
    }

    #[test]
    fn quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["strata", "-q", "-v", "ls"]).is_err());
    }

    #[test]
    fn parse_config_path() {
        let cli = Cli::parse_from(["strata", "--config", "/prj/strata.toml", "check"]);
        assert_eq!(cli.config.as_deref(), Some("/prj/strata.toml"));
    }

    #[test]
    fn log_levels() {
        let mut global = GlobalArgs {
            quiet: false,
            verbose: false,
            color: false,
            config: None,
        };
        assert_eq!(global.log_level(), "warn");
        global.verbose = true;
        assert_eq!(global.log_level(), "debug");
        global.verbose = false;
        global.quiet = true;
        assert_eq!(global.log_level(), "error");
    }
}
