use clap::{arg, value_parser, Arg, ArgAction, Command};
use std::path::PathBuf;

fn archive_arg() -> Arg {
    arg!(-f --file <ARCHIVE> "Archive to operate on").value_parser(value_parser!(PathBuf))
}

fn paths_arg() -> Arg {
    arg!(<FILE>... "Files to archive; directories are expanded to the files below them")
        .value_parser(value_parser!(PathBuf))
}

pub fn get_commands() -> Command {
    Command::new("minitar")
        .version(env!("CARGO_PKG_VERSION"))
        .about("minimal ustar archiver")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .global(true)
                .value_parser(["error", "warn", "info", "debug", "trace"])
                .default_value("warn")
                .help("Diagnostics written to stderr"),
        )
        .arg(
            Arg::new("no-verify")
                .long("no-verify")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Do not check header checksums while reading an archive"),
        )
        // create command
        .subcommand(
            Command::new("create")
                .visible_alias("c")
                .about("write a new archive, replacing any existing one")
                .arg(archive_arg())
                .arg(paths_arg()),
        )
        // append command
        .subcommand(
            Command::new("append")
                .visible_alias("a")
                .about("add files to the end of an existing archive")
                .arg(archive_arg())
                .arg(paths_arg()),
        )
        // list command
        .subcommand(
            Command::new("list")
                .visible_alias("t")
                .about("print the names of the archived files")
                .arg(archive_arg())
                .arg(
                    Arg::new("verbose")
                        .short('v')
                        .long("verbose")
                        .help("Also print mode, size and mtime")
                        .action(ArgAction::SetTrue),
                ),
        )
        // update command
        .subcommand(
            Command::new("update")
                .visible_alias("u")
                .about("append files modified since they were archived")
                .arg(archive_arg())
                .arg(paths_arg()),
        )
        // extract command
        .subcommand(
            Command::new("extract")
                .visible_alias("x")
                .about("write the archived files out")
                .arg(archive_arg())
                .arg(
                    arg!(-C --directory <DIR> "Directory to extract into")
                        .value_parser(value_parser!(PathBuf))
                        .required(false)
                        .default_value("."),
                ),
        )
}
