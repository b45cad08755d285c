//! conprobe - console host and encoding probe for Windows
//!
//! conprobe checks the encoding assumptions a UTF-8 program makes on Windows
//! and identifies the program hosting its console window.
//!
//! # Commands
//!
//! ```text
//! conprobe                   # Encoding report (default)
//! conprobe host              # Console host id and kind
//! conprobe version <PATH>    # Product and file version of an executable
//! ```
//!
//! While a command runs the console is switched to UTF-8 output with ANSI
//! escapes, and restored on exit.

mod config;
mod core;
mod error;
mod platform;
mod report;

use std::env;
use std::path::PathBuf;

use anyhow::{bail, Context};
use crossterm::tty::IsTty;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::config::{app_dir, Config};
use crate::core::{check_path_encoding, AppContext};
use crate::platform::{ConsoleApi, NativeConsole};
use crate::report::Section;

/// Version string from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variable that overrides the configured log filter
const LOG_ENV: &str = "CONPROBE_LOG";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Report,
    Host,
    Version(PathBuf),
}

/// Command-line options
#[derive(Debug, Clone, PartialEq, Eq)]
struct Options {
    command: Command,
    /// Skip the UTF-8 console session
    no_guard: bool,
    /// Fail unless the process ANSI codepage is UTF-8
    require_utf8: bool,
    /// Plain report headings
    no_color: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            command: Command::Report,
            no_guard: false,
            require_utf8: false,
            no_color: false,
        }
    }
}

/// What the argument parser asks `main` to do
#[derive(Debug, PartialEq, Eq)]
enum Parsed {
    Run(Options),
    Help,
    Version,
}

fn print_version() {
    println!("conprobe {}", VERSION);
}

fn print_help() {
    println!("conprobe {} - console host and encoding probe", VERSION);
    println!();
    println!("Usage: conprobe [OPTIONS] [COMMAND]");
    println!();
    println!("Commands:");
    println!("  report                Encodings, codepages and console host (default)");
    println!("  host                  Console host id and kind");
    println!("  version <PATH>        Product and file version of an executable");
    println!();
    println!("Options:");
    println!("  --no-guard            Leave the console codepage and mode alone");
    println!("  --require-utf8        Fail unless the process ANSI codepage is UTF-8");
    println!("  --no-color            Plain report headings");
    println!("  -v, --version         Show version");
    println!("  -h, --help            Show this help");
    println!();
    println!("Configuration: ~/.conprobe/config.toml");
    println!("Log file:      ~/.conprobe/conprobe.log ({} overrides the level)", LOG_ENV);
}

fn parse_args(args: &[String]) -> Result<Parsed, String> {
    let mut options = Options::default();
    let mut command: Option<Command> = None;
    let mut i = 0;

    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => return Ok(Parsed::Help),
            "-v" | "--version" => return Ok(Parsed::Version),
            "--no-guard" => options.no_guard = true,
            "--require-utf8" => options.require_utf8 = true,
            "--no-color" => options.no_color = true,
            arg if arg.starts_with('-') => {
                return Err(format!("Unknown argument: {}. Use -h for help.", arg));
            }
            name if command.is_some() => {
                return Err(format!("Unexpected argument: {}", name));
            }
            "report" => command = Some(Command::Report),
            "host" => command = Some(Command::Host),
            "version" => {
                i += 1;
                if i >= args.len() {
                    return Err("Missing path argument".to_string());
                }
                command = Some(Command::Version(PathBuf::from(&args[i])));
            }
            name => return Err(format!("Unknown command: {}. Use -h for help.", name)),
        }
        i += 1;
    }

    if let Some(command) = command {
        options.command = command;
    }
    Ok(Parsed::Run(options))
}

/// Log to `~/.conprobe/conprobe.log`. Failing to open it only disables logging.
fn init_logging(config: &Config) {
    let log_path = app_dir()
        .map(|dir| dir.join("conprobe.log"))
        .unwrap_or_else(|| PathBuf::from("conprobe.log"));

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .ok();

    if let Some(file) = log_file {
        let filter = EnvFilter::try_from_env(LOG_ENV)
            .or_else(|_| EnvFilter::try_new(&config.log_level))
            .unwrap_or_else(|_| EnvFilter::new("info"));
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }
}

fn main() {
    let args: Vec<String> = env::args().skip(1).collect();
    let options = match parse_args(&args) {
        Ok(Parsed::Run(options)) => options,
        Ok(Parsed::Help) => {
            print_help();
            return;
        }
        Ok(Parsed::Version) => {
            print_version();
            return;
        }
        Err(e) => {
            eprintln!("!{}", e);
            std::process::exit(1);
        }
    };

    let config = Config::load();
    init_logging(&config);
    info!("conprobe {} starting: {:?}", VERSION, options.command);

    if let Err(e) = run(&options, &config) {
        error!("{:#}", e);
        eprintln!("!{:#}", e);
        std::process::exit(1);
    }
}

/// Runs one command. Every guard is dropped before this returns.
fn run(options: &Options, config: &Config) -> anyhow::Result<()> {
    let ctx = AppContext::new(NativeConsole::new());
    ctx.assert_utf8_literals()?;

    if options.require_utf8 || config.require_utf8_os_api {
        ctx.encoding_assumption().verify()?;
        check_path_encoding(ctx.api())?.require_consistent()?;
    }

    let color = config.color && !options.no_color && std::io::stdout().is_tty();
    let sections = match &options.command {
        Command::Report => report_sections(&ctx)?,
        Command::Host => {
            let host = ctx.require_console().context("Console host detection failed")?;
            if !ctx.console_has_utf8_input()? {
                warn!("{} does not deliver UTF-8 keyboard input", host.kind);
            }
            vec![report::host_section(host)]
        }
        Command::Version(path) => {
            if !path.exists() {
                bail!("No such file: {}", path.display());
            }
            vec![report::version_section(ctx.api(), path)]
        }
    };

    let session = if config.force_utf8_console && !options.no_guard {
        Some(ctx.utf8_session().context("Failed to switch the console to UTF-8")?)
    } else {
        None
    };
    if session.as_ref().is_some_and(|s| s.is_active()) {
        info!("Writing output in a UTF-8 console session");
    }

    print!("{}", report::render(&sections, color));
    Ok(())
}

fn report_sections<A: ConsoleApi>(ctx: &AppContext<A>) -> anyhow::Result<Vec<Section>> {
    let mut sections = vec![report::encoding_section(ctx)?];
    match ctx.console_host() {
        Ok(host) => sections.push(report::host_section(host)),
        Err(e) => {
            warn!("Console host detection failed: {}", e);
            sections.push(report::host_unavailable_section(&e));
        }
    }
    sections.push(report::streams_section(ctx.api()));
    Ok(sections)
}
