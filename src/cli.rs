//! CLI handling

use std::ffi::OsString;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};
use tracing_subscriber::EnvFilter;

use crate::config::TrashConfig;
use crate::error::{Result, TrashError};
use crate::store::{TrashEntry, TrashStore};
use crate::trash::{MoveOptions, empty, list, restore, trash_paths};

const SUBCOMMANDS: [&str; 6] = ["move", "list", "show", "restore", "empty", "help"];
const TOP_LEVEL_FLAGS: [&str; 4] = ["-h", "--help", "-V", "--version"];
const LOG_ENV: &str = "TRS_LOG";
const UNKNOWN: &str = "unknown";

/// Run the application
pub fn run() -> Result<()> {
    let args = with_default_subcommand(std::env::args_os().collect());
    let matches = create_cli().get_matches_from(args);
    init_logging(matches.get_count("verbose"));

    let config = TrashConfig::from_env()?;
    let store = TrashStore::open(&config)?;

    match matches.subcommand() {
        Some(("move", sub_m)) => run_move(&store, sub_m),
        Some(("list", _)) => run_list(&store),
        Some(("restore", sub_m)) => run_restore(&store, sub_m),
        Some(("empty", sub_m)) => run_empty(&store, sub_m),
        _ => {
            create_cli().print_help()?;
            println!();
            Ok(())
        }
    }
}

/// Create the CLI
fn create_cli() -> Command {
    Command::new("trs")
        .version(clap::crate_version!())
        .about("Move files to the trash instead of deleting them")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count)
                .global(true)
                .help("Log more detail to stderr (repeat for more)"),
        )
        .subcommand(
            Command::new("move")
                .about("Move files or directories to the trash (the default command)")
                .arg(
                    Arg::new("paths")
                        .required(true)
                        .action(ArgAction::Append)
                        .num_args(1..)
                        .value_parser(value_parser!(PathBuf))
                        .help("Path(s) to the file(s) or directory(ies) to move to trash"),
                )
                .arg(
                    Arg::new("force")
                        .short('f')
                        .long("force")
                        .action(ArgAction::SetTrue)
                        .help("Ignore nonexistent paths"),
                )
                .arg(
                    Arg::new("recursive")
                        .short('r')
                        .short_alias('R')
                        .long("recursive")
                        .action(ArgAction::SetTrue)
                        .help("Allow trashing directories"),
                ),
        )
        .subcommand(
            Command::new("list")
                .visible_alias("show")
                .about("Display all items currently in the trash with their original paths"),
        )
        .subcommand(
            Command::new("restore")
                .about("Restore items from the trash to their original locations")
                .arg(
                    Arg::new("names")
                        .required(true)
                        .action(ArgAction::Append)
                        .num_args(1..)
                        .value_parser(value_parser!(OsString))
                        .help("Trashed name(s) as shown by `list`"),
                ),
        )
        .subcommand(
            Command::new("empty")
                .about("Permanently delete all items in the trash")
                .arg(
                    Arg::new("force")
                        .short('f')
                        .long("force")
                        .action(ArgAction::SetTrue)
                        .help("Do not ask for confirmation"),
                ),
        )
}

/// Insert `move` when the first argument is not a subcommand, or when it
/// names an existing path that happens to look like one.
fn with_default_subcommand(mut args: Vec<OsString>) -> Vec<OsString> {
    let Some(first) = args
        .iter()
        .skip(1)
        .position(|arg| !is_verbose_flag(arg))
        .map(|i| i + 1)
    else {
        return args;
    };

    let arg = args[first].to_str();
    let is_subcommand = arg.is_some_and(|a| SUBCOMMANDS.contains(&a));
    let is_top_level_flag = arg.is_some_and(|a| TOP_LEVEL_FLAGS.contains(&a));
    let names_a_path = fs::symlink_metadata(&args[first]).is_ok();

    if (!is_subcommand && !is_top_level_flag) || (is_subcommand && names_a_path) {
        args.insert(first, OsString::from("move"));
    }
    args
}

fn is_verbose_flag(arg: &OsString) -> bool {
    match arg.to_str() {
        Some("--verbose") => true,
        Some(a) => a.len() > 1 && a.starts_with('-') && a[1..].chars().all(|c| c == 'v'),
        None => false,
    }
}

fn init_logging(verbosity: u8) {
    let default = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
}

fn report(error: &TrashError) {
    eprintln!("trs: {error}");
}

fn run_move(store: &TrashStore, matches: &ArgMatches) -> Result<()> {
    let options = MoveOptions {
        force: matches.get_flag("force"),
        recursive: matches.get_flag("recursive"),
    };
    let paths = matches
        .get_many::<PathBuf>("paths")
        .into_iter()
        .flatten()
        .cloned()
        .collect::<Vec<_>>();

    for result in trash_paths(store, &paths, options) {
        match result {
            Ok(Some(trashed)) => println!(
                "Moved {} to trash as {}",
                trashed.original_path.display(),
                Path::new(&trashed.name).display()
            ),
            Ok(None) => {}
            Err(e) => report(&e),
        }
    }
    Ok(())
}

fn run_list(store: &TrashStore) -> Result<()> {
    let stdout = io::stdout();
    print_listing(&mut stdout.lock(), list(store)?)?;
    Ok(())
}

fn print_listing(out: &mut impl Write, entries: impl Iterator<Item = TrashEntry>) -> io::Result<()> {
    let mut entries = entries.peekable();
    if entries.peek().is_none() {
        return writeln!(out, "Trash is empty.");
    }

    writeln!(out, "{:<5} {:<30} {:<50} {}", "No.", "Name", "Original Location", "Deleted")?;
    for (i, entry) in entries.enumerate() {
        let original = entry
            .original_path
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| UNKNOWN.to_string());
        let deleted = entry
            .deletion_date
            .map(|date| date.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| UNKNOWN.to_string());
        let name = entry.name.to_string_lossy();
        writeln!(out, "{:<5} {:<30} {:<50} {}", i + 1, name, original, deleted)?;
    }
    Ok(())
}

fn run_restore(store: &TrashStore, matches: &ArgMatches) -> Result<()> {
    let names = matches
        .get_many::<OsString>("names")
        .into_iter()
        .flatten()
        .collect::<Vec<_>>();

    for (name, result) in restore(store, &names)? {
        match result {
            Ok(destination) => println!(
                "Restored {} to {}",
                Path::new(&name).display(),
                destination.display()
            ),
            Err(e) => report(&e),
        }
    }
    Ok(())
}

fn run_empty(store: &TrashStore, matches: &ArgMatches) -> Result<()> {
    let (files, infos) = store.contents()?;
    if files.is_empty() && infos.is_empty() {
        println!("Trash is already empty.");
        return Ok(());
    }

    if !matches.get_flag("force") {
        let prompt = format!(
            "Permanently delete {} item(s) from the trash? [y/N] ",
            files.len()
        );
        let stdin = io::stdin();
        if !confirm(&mut stdin.lock(), &mut io::stdout(), &prompt)? {
            println!("Aborted.");
            return Ok(());
        }
    }

    let outcome = empty(store)?;
    if outcome.failures.is_empty() {
        println!("Trash emptied successfully");
    } else {
        eprintln!(
            "trs: {} trash entries could not be removed",
            outcome.failures.len()
        );
    }
    Ok(())
}

/// Ask a yes/no question; only `y` counts as yes.
fn confirm(input: &mut impl BufRead, output: &mut impl Write, prompt: &str) -> io::Result<bool> {
    write!(output, "{prompt}")?;
    output.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(matches!(line.trim(), "y" | "Y"))
}
