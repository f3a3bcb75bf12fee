use crate::{
    cli::commands,
    models::{
        configmodels::ArchiveConfig,
        errormodels::Result,
        headermodels::EntryMeta,
    },
    ops::{
        append::append, create::create, extract::extract, list::entries, update::update,
    },
    utils::ioutils::expand_paths,
};
use clap::ArgMatches;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::Level;

fn init_logging(level: &str) {
    let level = level.parse::<Level>().unwrap_or(Level::WARN);
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn archive_path(sm: &ArgMatches) -> &Path {
    // clap enforces -f on every subcommand
    sm.get_one::<PathBuf>("file")
        .map(PathBuf::as_path)
        .unwrap_or_else(|| Path::new(""))
}

fn file_args(sm: &ArgMatches) -> Result<Vec<PathBuf>> {
    let paths = sm
        .get_many::<PathBuf>("FILE")
        .into_iter()
        .flatten()
        .cloned()
        .collect::<Vec<_>>();
    expand_paths(&paths)
}

fn print_entry(meta: &EntryMeta, verbose: bool) {
    match verbose {
        true => println!(
            "{:04o} {:>12} {:>12} {}",
            meta.mode, meta.size, meta.mtime, meta.name
        ),
        false => println!("{}", meta.name),
    }
}

/// The error followed by each of its sources, `: `-separated.
fn error_chain(err: &dyn Error) -> String {
    let mut msg = err.to_string();
    let mut source = err.source();
    while let Some(s) = source {
        msg.push_str(": ");
        msg.push_str(&s.to_string());
        source = s.source();
    }
    msg
}

fn run(matches: &ArgMatches, config: ArchiveConfig) -> Result<()> {
    match matches.subcommand() {
        Some(("create", sm)) => create(archive_path(sm), &file_args(sm)?),

        Some(("append", sm)) => append(archive_path(sm), &file_args(sm)?, config),

        Some(("list", sm)) => {
            let verbose = sm.get_flag("verbose");
            for meta in entries(archive_path(sm), config)? {
                print_entry(&meta?, verbose);
            }
            Ok(())
        }

        Some(("update", sm)) => update(archive_path(sm), &file_args(sm)?, config).map(|_| ()),

        Some(("extract", sm)) => {
            let dest = sm
                .get_one::<PathBuf>("directory")
                .cloned()
                .unwrap_or_else(|| PathBuf::from("."));
            extract(archive_path(sm), &dest, config).map(|_| ())
        }

        _ => unreachable!(),
    }
}

pub fn exec_cli() -> ExitCode {
    let matches = commands::get_commands().get_matches();

    let level = matches
        .get_one::<String>("log-level")
        .map(String::as_str)
        .unwrap_or("warn");
    init_logging(level);

    let config = ArchiveConfig::new().with_verify_checksums(!matches.get_flag("no-verify"));

    match run(&matches, config) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", error_chain(&e));
            ExitCode::FAILURE
        }
    }
}
