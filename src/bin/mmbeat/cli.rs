use std::path::PathBuf;

use clap::builder::PossibleValuesParser;
use clap::{crate_name, crate_version};
use clap::{Arg, ArgAction, ArgMatches, Command};

pub fn args() -> ArgMatches {
    build().get_matches()
}

pub fn build() -> Command {
    let run = Command::new("run")
        .about("poll and publish events")
        .disable_help_flag(true)
        .disable_version_flag(true)
        .arg(arg_config())
        .arg(arg_output())
        .arg(
            Arg::new("once")
                .long("once")
                .action(ArgAction::SetTrue)
                .help("run a single poll cycle")
                .long_help("Run a single poll cycle and exit."),
        )
        .args(logging_args())
        .after_long_help(
"Polls `mmrepquota`, `mmdf` and `mmlsfileset` of the configured devices every \
 period and writes one JSON event per line. Log messages go to stderr.",
        );

    let decode = Command::new("decode")
        .about("decode captured -Y output")
        .disable_help_flag(true)
        .disable_version_flag(true)
        .arg(
            Arg::new("command")
                .required(true)
                .action(ArgAction::Set)
                .help("producing command")
                .long_help("The command that produced the output.")
                .value_name("command")
                .value_parser(PossibleValuesParser::new(
                    ["quota", "devices", "df", "fileset"]
                )),
        )
        .arg(
            Arg::new("device")
                .short('d')
                .long("device")
                .action(ArgAction::Set)
                .help("tag events with device")
                .long_help("Tag all events with this device name.")
                .value_name("device"),
        )
        .arg(arg_output())
        .args(logging_args())
        .after_long_help(
"Reads from stdin, e.g. `mmdf gpfs1 -Y | mmbeat decode df --device gpfs1`. \
 Rows that fail to decode are logged and make the exit status non-zero after \
 all other events have been written.",
        );

    Command::new(crate_name!())
        .version(crate_version!())
        .disable_help_flag(true)
        .disable_version_flag(true)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .infer_subcommands(true)
        .subcommand(run)
        .subcommand(decode)
        .subcommand(build_list())
}

fn build_list() -> Command {
    let list_devices = Command::new("devices")
        .about("list device names")
        .alias("fs")
        .disable_help_flag(true)
        .disable_version_flag(true)
        .arg(arg_config())
        .args(logging_args());

    Command::new("list")
        .about("list commands")
        .alias("ls")
        .disable_help_flag(true)
        .disable_version_flag(true)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(list_devices)
}

// ----------------------------------------------------------------------------
// arguments
// ----------------------------------------------------------------------------

fn arg_config() -> Arg {
    Arg::new("config")
        .short('c')
        .long("config")
        .value_parser(clap::value_parser!(PathBuf))
        .help("configuration file")
        .long_help("TOML configuration file. Defaults are used without it.")
        .value_name("file")
}

fn arg_output() -> Arg {
    Arg::new("output")
        .short('o')
        .long("output")
        .value_parser(clap::value_parser!(PathBuf))
        .help("output file")
        .long_help("Output file. Defaults to stdout.")
        .value_name("file")
}

fn logging_args() -> Vec<Arg> {
    vec![
        Arg::new("verbose")
            .short('v')
            .long("verbose")
            .action(ArgAction::Count)
            .help("more log messages")
            .long_help(
"Increase log verbosity, once for debug and twice for trace messages. The \
 `RUST_LOG` environment variable takes precedence.",
            ),

        Arg::new("quiet")
            .short('q')
            .long("quiet")
            .action(ArgAction::SetTrue)
            .conflicts_with("verbose")
            .help("errors only")
            .long_help("Log errors only."),
    ]
}

// ----------------------------------------------------------------------------
// tests
// ----------------------------------------------------------------------------
