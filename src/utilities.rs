use std::path::PathBuf;

use crate::error::{ConfError, Result};


/// Returns the default configuration search path: the user's home directory,
/// followed by the current directory.
pub fn default_search_directories() -> Result<Vec<PathBuf>> {
    let home_directory = dirs::home_dir().ok_or(ConfError::HomeDirectory)?;

    Ok(vec![home_directory, PathBuf::from("./")])
}

/// Derive the environment variable name for a dotted field path:
/// upper-cased, with dots replaced by underscores, and prefixed by `{prefix}_`
/// if a non-empty prefix is configured.
///
/// `app.from_env_var` with prefix `MYAPP` becomes `MYAPP_APP_FROM_ENV_VAR`.
pub fn environment_variable_name(prefix: Option<&str>, path: &str) -> String {
    let name = path.replace('.', "_").to_uppercase();

    match prefix {
        Some(prefix) if !prefix.is_empty() => format!("{}_{}", prefix, name),
        _ => name,
    }
}
