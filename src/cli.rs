//! Command-line interface definitions for the demo binary.

use std::ffi::OsString;
use std::path::PathBuf;

use clap::Parser;


/// Command-line arguments.
///
/// Everything after `--` is handed to the configuration reader as flags,
/// e.g. `confreader -s demos -- --verbose --nested fromArgs`.
#[derive(Parser)]
#[command(
    name = "confreader",
    author,
    about = "Loads the demo configuration from a file, the environment and flags.",
    version
)]
pub struct CLIArgs {
    #[arg(
        short = 'n',
        long = "config-name",
        default_value = "myconf",
        help = "Configuration file name without extension. \
                Also the default environment variable prefix (upper-cased)."
    )]
    pub config_name: String,

    /// Directories searched for the configuration file, in the order given.
    /// If unspecified, this defaults to the home directory and then the current directory.
    #[arg(
        short = 's',
        long = "search-directory",
        help = "Directory to search for the configuration file. Can be repeated."
    )]
    pub search_directories: Vec<PathBuf>,

    #[arg(
        short = 'c',
        long = "configuration-file-path",
        help = "Use exactly this configuration file instead of searching for one."
    )]
    pub configuration_file_path: Option<PathBuf>,

    #[arg(
        long = "env-prefix",
        help = "Environment variable prefix. Defaults to the upper-cased configuration name."
    )]
    pub environment_prefix: Option<String>,

    #[arg(
        long = "no-env-prefix",
        conflicts_with = "environment_prefix",
        help = "Derive environment variable names without any prefix."
    )]
    pub no_environment_prefix: bool,

    #[arg(
        long = "show-fields",
        help = "Print every configuration field with its flag and environment variable, then exit."
    )]
    pub show_fields: bool,

    #[arg(
        short = 'w',
        long = "watch",
        help = "Keep running and print the configuration again whenever its file changes."
    )]
    pub watch: bool,

    #[arg(
        long = "console-log-level",
        default_value = "info",
        help = "Console log level filter (tracing EnvFilter syntax)."
    )]
    pub console_output_level_filter: String,

    #[arg(
        long = "log-file-directory",
        help = "If specified, logs are additionally written to confreader.log in this directory."
    )]
    pub log_file_output_directory: Option<PathBuf>,

    #[arg(
        last = true,
        help = "Configuration flags, passed after --."
    )]
    pub configuration_arguments: Vec<OsString>,
}

impl CLIArgs {
    /// Arguments for the configuration reader, starting with the program name.
    pub fn configuration_argv(&self) -> Vec<OsString> {
        let program_name = std::env::args_os()
            .next()
            .unwrap_or_else(|| OsString::from("confreader"));

        std::iter::once(program_name)
            .chain(self.configuration_arguments.iter().cloned())
            .collect()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arguments_after_separator_are_configuration_flags() {
        let arguments = CLIArgs::parse_from([
            "confreader",
            "-s",
            "demos",
            "--",
            "--verbose",
            "--nested",
            "fromArgs",
        ]);

        assert_eq!(arguments.search_directories, vec![PathBuf::from("demos")]);
        assert_eq!(
            arguments.configuration_arguments,
            vec![
                OsString::from("--verbose"),
                OsString::from("--nested"),
                OsString::from("fromArgs")
            ]
        );
        assert_eq!(arguments.configuration_argv().len(), 4);
    }
}
