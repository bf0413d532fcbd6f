//! Command-line configuration.
//!
//! This is the daemon's *own* CLI surface — where to find
//! `/etc/logs.conf`, how verbose to be, whether to daemonize — not the
//! hand-rolled grammar of the config file itself, which lives entirely
//! in [`crate::parser`].

use clap::{crate_authors, crate_version, App, Arg, ArgMatches};
use log::LevelFilter;
use std::path::PathBuf;

/// Parsed command-line configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// Path to the `logs.conf`-style configuration file.
    pub config_path: PathBuf,

    /// Diagnostic log verbosity, derived from repeated `-v`.
    pub verbose: LevelFilter,

    /// Where the daemon's own diagnostic log goes; `None` means stderr.
    pub log_file: Option<PathBuf>,

    /// Run attached to the terminal instead of daemonizing.
    pub foreground: bool,
}

impl Config {
    /// Builds the `clap::App` describing this daemon's arguments.
    pub fn create_app<'a, 'b>() -> App<'a, 'b> {
        App::new("logsrv")
            .version(crate_version!())
            .author(crate_authors!())
            .about("a named-channel logging service")
            .arg(
                Arg::with_name("config")
                    .short("c")
                    .long("config")
                    .value_name("FILE")
                    .help("path to the logger configuration file")
                    .takes_value(true),
            )
            .arg(
                Arg::with_name("verbose")
                    .short("v")
                    .long("verbose")
                    .multiple(true)
                    .help("increases the diagnostic log's verbosity (repeatable)"),
            )
            .arg(
                Arg::with_name("log-file")
                    .long("log-file")
                    .value_name("FILE")
                    .help("writes the diagnostic log to FILE instead of stderr")
                    .takes_value(true),
            )
            .arg(
                Arg::with_name("foreground")
                    .short("f")
                    .long("foreground")
                    .help("stays attached to the terminal instead of daemonizing"),
            )
    }

    /// Builds a [`Config`] from parsed arguments.
    pub fn from_arg_matches(matches: &ArgMatches) -> Self {
        let config_path = matches
            .value_of("config")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("/etc/logs.conf"));
        let verbose = crate::diag::level_from_verbosity(matches.occurrences_of("verbose"));
        let log_file = matches.value_of("log-file").map(PathBuf::from);
        let foreground = matches.is_present("foreground");

        Config { config_path, verbose, log_file, foreground }
    }
}
