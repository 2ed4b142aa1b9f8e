use std::path::Path;

use miette::{Context, IntoDiagnostic, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
    Layer,
};


/// Initialize tracing: console output, and if a directory is given,
/// a (non-rolling) log file in that directory.
///
/// The returned guard must be kept alive for the log file to be flushed.
pub fn initialize_tracing(
    console_level_filter: EnvFilter,
    log_file_output: Option<(&Path, EnvFilter)>,
    log_file_name: &str,
) -> Result<Option<WorkerGuard>> {
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(console_level_filter);

    let Some((log_file_directory, log_file_level_filter)) = log_file_output else {
        tracing_subscriber::registry()
            .with(console_layer)
            .try_init()
            .into_diagnostic()
            .wrap_err("Failed to initialize tracing subscriber.")?;

        return Ok(None);
    };


    std::fs::create_dir_all(log_file_directory)
        .into_diagnostic()
        .wrap_err_with(|| {
            format!(
                "Failed to create missing log file directory at {}.",
                log_file_directory.display()
            )
        })?;

    let file_appender = tracing_appender::rolling::never(log_file_directory, log_file_name);
    let (non_blocking_file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_writer(non_blocking_file_writer)
        .with_filter(log_file_level_filter);

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .into_diagnostic()
        .wrap_err("Failed to initialize tracing subscriber.")?;

    Ok(Some(guard))
}
