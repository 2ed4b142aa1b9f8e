//! This crate populates configuration structures from three layers:
//! a configuration file, environment variables and command-line flags.
//!
//! Your starting point should probably be [`ConfReader::read`].
//!
//! # Precedence
//! For every field, the first of these that provides a value wins:
//!
//! 1. a flag given on the command line (`--app.port 8080`),
//! 2. an environment variable (`MYAPP_APP_PORT=8080`),
//! 3. the configuration file (`myapp.yaml`, `.json` or `.toml`),
//! 4. the default declared on the field,
//! 5. the zero value of the field's type.
//!
//! # Internals
//! A structure describes its shape through [`Configurable::schema`].
//! Reading walks that schema into a flat set of [`Descriptors`], registers a flag
//! and an environment binding for each one, merges all sources into a
//! [`ResolvedStore`] (lowest precedence first) and finally deserializes the
//! target structure from it with serde. The result is then checked by a
//! [`Validator`], by default the [`RuleValidator`] evaluating the rules declared
//! on each field.
//!
//! ```no_run
//! use confreader::{ConfReader, Configurable, Field, Schema};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize, Default, Debug)]
//! struct Global {
//!     verbose: bool,
//! }
//!
//! impl Configurable for Global {
//!     fn schema() -> Schema {
//!         Schema::builder("Global")
//!             .field(Field::of::<bool>("verbose"))
//!             .build()
//!     }
//! }
//!
//! #[derive(Serialize, Deserialize, Default, Debug)]
//! struct MyConfig {
//!     global: Global,
//!     name: String,
//!     timeout: std::time::Duration,
//! }
//!
//! impl Configurable for MyConfig {
//!     fn schema() -> Schema {
//!         Schema::builder("MyConfig")
//!             // `--verbose` rather than `--global.verbose`
//!             .field(Field::nested::<Global>("global").squash())
//!             .field(Field::of::<String>("name").validate("required"))
//!             .field(Field::of::<std::time::Duration>("timeout").default("30s"))
//!             .build()
//!     }
//! }
//!
//! let mut config = MyConfig::default();
//! ConfReader::new("myapp")
//!     .with_search_dirs(["/etc/myapp", "."])
//!     .read(&mut config)?;
//! # Ok::<(), confreader::ConfError>(())
//! ```

pub mod binder;
pub mod decode;
pub mod descriptor;
mod error;
pub mod presets;
mod reader;
pub mod resolver;
pub mod schema;
pub mod sources;
pub mod store;
mod traits;
mod utilities;
pub mod validation;
pub mod watch;

pub use self::descriptor::{Descriptors, FieldDescriptor};
pub use self::error::{ConfError, Result};
pub use self::reader::ConfReader;
pub use self::schema::{Field, FieldKind, LeafKind, Schema};
pub use self::sources::{EnvironmentSource, FlagRegistry, ProcessEnvironment};
pub use self::store::ResolvedStore;
pub use self::traits::Configurable;
pub use self::utilities::{default_search_directories, environment_variable_name};
pub use self::validation::{RuleValidator, ValidationErrors, Validator, Violation};
pub use self::watch::ConfigWatcher;
