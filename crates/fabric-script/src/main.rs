//! CLI entry point for the fabric script runner.

use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use fabric_core as _;
use fabric_script::{format_event, logger, parse_script, run_script, RunOptions, Script};
use log::LevelFilter;
#[cfg(test)]
use tempfile as _;

const USAGE_TEXT: &str = "\
Usage: cfgfab <command> [options]

Commands:
  run   <script> [--verbose] [--trace]  Run a transaction script
  check <script>                        Parse and validate a script only

Options:
  -v, --verbose        Log fabric activity to stderr
  -t, --trace          Print every fabric event (run only)
  -h, --help           Show this help message

Examples:
  cfgfab run smoke.cfg
  cfgfab run smoke.cfg --trace
  cfgfab check smoke.cfg
";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Run(RunArgs),
    Check(CheckArgs),
}

#[derive(Debug, PartialEq, Eq)]
struct RunArgs {
    input: PathBuf,
    verbose: bool,
    trace: bool,
}

#[derive(Debug, PartialEq, Eq)]
struct CheckArgs {
    input: PathBuf,
}

#[derive(Debug)]
enum ParseResult {
    Command(Command),
    Help,
}

fn parse_args(mut args: impl Iterator<Item = OsString>) -> Result<ParseResult, String> {
    let first = args.next().ok_or_else(|| "missing command".to_string())?;

    if first == "--help" || first == "-h" {
        return Ok(ParseResult::Help);
    }

    let command_str = first.to_string_lossy().to_string();

    let command = match command_str.as_str() {
        "run" => {
            let (input, flags) = split_script_args(args, &[Flag::Verbose, Flag::Trace])?;
            Command::Run(RunArgs {
                input,
                verbose: flags.contains(&Flag::Verbose),
                trace: flags.contains(&Flag::Trace),
            })
        }
        "check" => {
            let (input, _) = split_script_args(args, &[])?;
            Command::Check(CheckArgs { input })
        }
        other => return Err(format!("unknown command: {other}")),
    };
    Ok(ParseResult::Command(command))
}

/// Switches a subcommand may accept besides its script path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flag {
    Verbose,
    Trace,
}

impl Flag {
    fn parse(arg: &str) -> Option<Self> {
        match arg {
            "-v" | "--verbose" => Some(Self::Verbose),
            "-t" | "--trace" => Some(Self::Trace),
            _ => None,
        }
    }
}

/// Splits subcommand arguments into exactly one script path and the flags
/// out of `accepted` that were given.
fn split_script_args(
    args: impl Iterator<Item = OsString>,
    accepted: &[Flag],
) -> Result<(PathBuf, Vec<Flag>), String> {
    let mut input: Option<PathBuf> = None;
    let mut flags = Vec::new();

    for arg in args {
        let text = arg.to_string_lossy();
        if text == "-h" || text == "--help" {
            return Err(USAGE_TEXT.to_string());
        }
        if let Some(flag) = Flag::parse(&text).filter(|flag| accepted.contains(flag)) {
            flags.push(flag);
        } else if text.starts_with('-') {
            return Err(format!("unknown option: {text}"));
        } else if input.replace(PathBuf::from(&arg)).is_some() {
            return Err("multiple script paths provided".to_string());
        }
    }

    let input = input.ok_or_else(|| "missing script path".to_string())?;
    Ok((input, flags))
}

fn load_script(input: &Path) -> Result<Script, i32> {
    let source = fs::read_to_string(input).map_err(|e| {
        eprintln!("error: failed to read {}: {e}", input.display());
        1
    })?;
    parse_script(&source).map_err(|e| {
        eprintln!("{}: error: {e}", input.display());
        1
    })
}

fn run_command(args: &RunArgs) -> Result<(), i32> {
    let level = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    if let Err(e) = logger::init(level) {
        eprintln!("warning: logging unavailable: {e}");
    }

    let script = load_script(&args.input)?;
    let report = run_script(&script, RunOptions { trace: args.trace }).map_err(|e| {
        eprintln!("error: cannot build fabric: {e}");
        1
    })?;

    for event in &report.trace {
        println!("{}", format_event(event));
    }
    for result in &report.results {
        println!("{result}");
    }
    for packet in &report.unexpected {
        println!("UNEXPECTED: {}", fabric_script::format_packet(packet));
    }

    println!();
    println!("Run Summary: {}", report.summary());

    if report.all_passed() {
        Ok(())
    } else {
        Err(1)
    }
}

fn run_check(args: &CheckArgs) -> Result<(), i32> {
    let script = load_script(&args.input)?;
    println!(
        "{}: {} terminals, {} transactions, {} register checks",
        args.input.display(),
        script.config.num_terminals(),
        script.transactions.len(),
        script.registers.len()
    );
    Ok(())
}

fn main() {
    let exit_code = match parse_args(env::args_os().skip(1)) {
        Ok(ParseResult::Help) => {
            println!("{USAGE_TEXT}");
            0
        }
        Ok(ParseResult::Command(Command::Run(args))) => match run_command(&args) {
            Ok(()) => 0,
            Err(code) => code,
        },
        Ok(ParseResult::Command(Command::Check(args))) => match run_check(&args) {
            Ok(()) => 0,
            Err(code) => code,
        },
        Err(error) => {
            if error.starts_with("Usage:") {
                println!("{error}");
            } else {
                eprintln!("error: {error}");
                eprintln!("{USAGE_TEXT}");
            }
            1
        }
    };

    std::process::exit(exit_code);
}
