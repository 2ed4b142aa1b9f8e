//! The three places a configuration value can come from.
//!
//! - [`SettingsFile`]: a JSON, TOML or YAML file located on a search path,
//! - [`EnvironmentSource`]: environment variables,
//! - [`FlagRegistry`]: command-line flags.

mod environment;
mod file;
mod flags;

pub use self::environment::{environment_from_pairs, EnvironmentSource, ProcessEnvironment};
pub use self::file::{FileFormat, SettingsFile};
pub use self::flags::FlagRegistry;
