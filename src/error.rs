use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use crate::decode::DecodeError;
use crate::validation::ValidationErrors;


/// Everything that can go wrong while reading a configuration.
#[derive(Error, Diagnostic, Debug)]
pub enum ConfError {
    /// A schema (indirectly) contains itself.
    #[error("cyclic configuration shape: {type_name} is nested inside itself at \"{path}\"")]
    #[diagnostic(
        code(confreader::cyclic_shape),
        help("break the cycle by marking the self-referencing field with Field::opaque")
    )]
    CyclicShape {
        type_name: &'static str,
        path: String,
    },

    /// Two fields resolved to the same external flag name.
    #[error("flag --{name} is registered more than once")]
    #[diagnostic(
        code(confreader::duplicate_flag),
        help("give one of the fields a distinct name with Field::flag")
    )]
    DuplicateFlag { name: String },

    /// A flag registry was reused after it already parsed its arguments.
    #[error("flag registry has already parsed its arguments")]
    #[diagnostic(
        code(confreader::registry_sealed),
        help("use FlagRegistry::fresh to get an empty registry over the same arguments")
    )]
    RegistrySealed,

    #[error("failed to apply default value for \"{path}\"")]
    #[diagnostic(code(confreader::default_value))]
    DefaultValue {
        path: String,
        #[source]
        source: DecodeError,
    },

    #[error("could not determine the home directory for the configuration search path")]
    #[diagnostic(code(confreader::home_directory))]
    HomeDirectory,

    #[error("failed to read configuration file {}", path.display())]
    #[diagnostic(code(confreader::file_read))]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration file {}: {message}", path.display())]
    #[diagnostic(code(confreader::file_parse))]
    FileParse { path: PathBuf, message: String },

    /// A file or environment value could not be decoded into the field's kind.
    #[error("failed to unmarshal \"{path}\" from {origin}")]
    #[diagnostic(code(confreader::unmarshal))]
    Unmarshal {
        path: String,
        origin: String,
        #[source]
        source: DecodeError,
    },

    /// The resolved values did not fit the target structure.
    #[error("failed to unmarshal struct")]
    #[diagnostic(
        code(confreader::projection),
        help("the schema and the serde shape of the target type must agree")
    )]
    Projection(#[source] serde_json::Error),

    #[error("failed to serialize the target structure")]
    #[diagnostic(code(confreader::target))]
    Target(#[source] serde_json::Error),

    #[error("validation error: {0}")]
    #[diagnostic(code(confreader::validation))]
    Validation(ValidationErrors),

    #[error("failed to parse flags")]
    #[diagnostic(code(confreader::flag_parse))]
    FlagParse(#[source] Box<clap::Error>),

    #[error("failed to decode base64 value for flag: {flag}")]
    #[diagnostic(code(confreader::base64))]
    Base64 {
        flag: String,
        #[source]
        source: base64::DecodeError,
    },

    #[error("no configuration file was found by the last read, there is nothing to watch")]
    #[diagnostic(code(confreader::nothing_to_watch))]
    NothingToWatch,

    #[error("failed to watch configuration file {}", path.display())]
    #[diagnostic(code(confreader::watch))]
    Watch {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
}

pub type Result<T, E = ConfError> = std::result::Result<T, E>;
