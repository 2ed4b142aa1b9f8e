use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use confreader::{
    presets::PostgresqlDb,
    environment_variable_name,
    ConfReader,
    Configurable,
    Field,
    FlagRegistry,
    ProcessEnvironment,
    Schema,
};
use miette::{miette, Context, IntoDiagnostic, Result};
use serde::Deserialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::{cli::CLIArgs, logging::initialize_tracing};

mod cli;
mod logging;


/***
 * Demo configuration structure
 */

#[derive(Deserialize, Debug)]
struct GlobalConfig {
    verbose: bool,
}

impl Configurable for GlobalConfig {
    fn schema() -> Schema {
        Schema::builder("GlobalConfig")
            .field(Field::of::<bool>("verbose"))
            .build()
    }
}


#[derive(Deserialize, Debug)]
struct FooConfig {
    name: String,
    value_from_file: i32,
    duration_from_env_var: Duration,
    nested_flag: String,
    token: Vec<u8>,
}

impl Configurable for FooConfig {
    fn schema() -> Schema {
        Schema::builder("FooConfig")
            .field(Field::of::<String>("name").validate("required"))
            .field(Field::of::<i32>("value_from_file"))
            .field(Field::of::<Duration>("duration_from_env_var").default("1m"))
            .field(Field::of::<String>("nested_flag").flag("nested"))
            .field(Field::of::<Vec<u8>>("token"))
            .build()
    }
}


#[derive(Deserialize, Debug)]
struct DemoConfig {
    /// Squashed, so its field is `--verbose` instead of `--global.verbose`.
    global: GlobalConfig,
    debug: bool,
    foo: FooConfig,
    database: PostgresqlDb,
    default_val: String,
    slice: Vec<String>,
}

impl Configurable for DemoConfig {
    fn schema() -> Schema {
        Schema::builder("DemoConfig")
            .field(Field::nested::<GlobalConfig>("global").squash())
            .field(Field::of::<bool>("debug"))
            .field(Field::nested::<FooConfig>("foo"))
            .field(Field::nested::<PostgresqlDb>("database"))
            .field(Field::of::<String>("default_val").default("default value"))
            .field(Field::of::<Vec<String>>("slice").default("[\"default\"]"))
            .build()
    }
}

/***
 * END OF demo configuration structure
 */


fn build_reader(cli_args: &CLIArgs) -> ConfReader {
    let mut reader = ConfReader::new(cli_args.config_name.clone());

    if let Some(configuration_file_path) = &cli_args.configuration_file_path {
        reader = reader.with_config_file(configuration_file_path);
    }

    if !cli_args.search_directories.is_empty() {
        reader = reader.with_search_dirs(cli_args.search_directories.iter().cloned());
    }

    if cli_args.no_environment_prefix {
        reader = reader.without_prefix();
    } else if let Some(environment_prefix) = &cli_args.environment_prefix {
        reader = reader.with_prefix(environment_prefix.clone());
    }

    reader
}

fn print_fields(reader: &ConfReader) -> Result<()> {
    let descriptors = reader
        .descriptors::<DemoConfig>()
        .wrap_err("Failed to describe the demo configuration.")?;

    println!("{:<32} {:<28} {:<12} ENVIRONMENT VARIABLE", "PATH", "FLAG", "TYPE");

    for descriptor in &descriptors {
        let variable = descriptor.env_var.clone().unwrap_or_else(|| {
            environment_variable_name(reader.environment_prefix(), &descriptor.path)
        });

        println!(
            "{:<32} --{:<26} {:<12} {}",
            descriptor.path,
            descriptor.name,
            descriptor.kind.type_name(),
            variable
        );
    }

    Ok(())
}


fn print_summary(configuration: &DemoConfig) {
    println!("verbose:               {}", configuration.global.verbose);
    println!("debug:                 {}", configuration.debug);
    println!("foo.name:              {}", configuration.foo.name);
    println!("foo.value_from_file:   {}", configuration.foo.value_from_file);
    println!(
        "foo.duration_from_env_var: {}",
        humantime::format_duration(configuration.foo.duration_from_env_var)
    );
    println!("foo.nested_flag:       {}", configuration.foo.nested_flag);
    println!("foo.token:             {} bytes", configuration.foo.token.len());
    println!("default_val:           {}", configuration.default_val);
    println!("slice:                 [{}]", configuration.slice.join(", "));
    println!("database:              {}", configuration.database.connection_string());
}


fn main() -> Result<()> {
    let cli_args = CLIArgs::parse();

    let console_level_filter = EnvFilter::try_new(&cli_args.console_output_level_filter)
        .into_diagnostic()
        .wrap_err_with(|| miette!("Failed to parse the console log level filter."))?;

    let log_file_output = match cli_args.log_file_output_directory.as_deref() {
        Some(directory) => Some((
            directory,
            EnvFilter::try_new("debug")
                .into_diagnostic()
                .wrap_err("Failed to construct the log file level filter.")?,
        )),
        None => None,
    };

    let logging_raii_guard =
        initialize_tracing(console_level_filter, log_file_output, "confreader.log")
            .wrap_err("Failed to initialize tracing.")?;

    info!("Tracing initialized.");


    let reader = build_reader(&cli_args);

    if cli_args.show_fields {
        print_fields(&reader)?;
        return Ok(());
    }

    let mut flags = FlagRegistry::new(cli_args.configuration_argv());
    let configuration: DemoConfig = reader
        .read_config(&mut flags, &ProcessEnvironment)
        .wrap_err("Failed to load configuration.")?;

    match reader.config_file_used() {
        Some(path) => println!("Configuration loaded from {}.", path.display()),
        None => println!("No configuration file found, using defaults, environment and flags."),
    }
    print_summary(&configuration);


    if cli_args.watch {
        let watcher = reader
            .watch(configuration, &flags, Arc::new(ProcessEnvironment))
            .wrap_err("Failed to start watching the configuration file.")?;

        println!("Watching {} for changes.", watcher.path().display());

        let mut seen_generation = watcher.generation();
        loop {
            std::thread::sleep(Duration::from_millis(500));

            let generation = watcher.generation();
            if generation != seen_generation {
                seen_generation = generation;
                println!("Configuration reloaded.");
                print_summary(&watcher.current());
            }
        }
    }


    drop(logging_raii_guard);
    Ok(())
}
