use std::collections::BTreeMap;
use std::ffi::OsString;
use std::str::FromStr;

use clap::{
    builder::{BoolishValueParser, ValueParser},
    parser::ValueSource,
    Arg,
    ArgAction,
    ArgMatches,
    Command,
};
use tracing::debug;

use crate::error::{ConfError, Result};
use crate::schema::FieldKind;


const POSITIONAL_ARGUMENTS_ID: &str = "__positional_arguments";


#[derive(Clone, Debug)]
struct FlagDefinition {
    kind: FieldKind,
    default: Option<String>,
}


/// Flag definitions and command-line arguments for exactly one read.
///
/// A registry is filled by the binder, parsed once, and then queried by the
/// resolver. Create a new one (or use [`fresh`][Self::fresh]) for every
/// independent read: registering into an already parsed registry fails.
#[derive(Clone, Debug)]
pub struct FlagRegistry {
    arguments: Vec<OsString>,
    definitions: BTreeMap<String, FlagDefinition>,
    matches: Option<ArgMatches>,
}

impl FlagRegistry {
    /// The first argument is the program name, as in [`std::env::args_os`].
    pub fn new<I, A>(arguments: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<OsString>,
    {
        Self {
            arguments: arguments.into_iter().map(Into::into).collect(),
            definitions: BTreeMap::new(),
            matches: None,
        }
    }

    /// A registry over the arguments of the current process.
    pub fn from_process() -> Self {
        Self::new(std::env::args_os())
    }

    /// An empty registry over the same arguments.
    pub fn fresh(&self) -> Self {
        Self::new(self.arguments.clone())
    }

    pub fn arguments(&self) -> &[OsString] {
        &self.arguments
    }

    /// Register a typed flag `--{name}`.
    pub fn register(&mut self, name: &str, kind: FieldKind, default: Option<&str>) -> Result<()> {
        if self.matches.is_some() {
            return Err(ConfError::RegistrySealed);
        }

        if self.definitions.contains_key(name) {
            return Err(ConfError::DuplicateFlag {
                name: name.to_string(),
            });
        }

        self.definitions.insert(
            name.to_string(),
            FlagDefinition {
                kind,
                default: default.map(str::to_string),
            },
        );

        Ok(())
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    /// Parse the arguments against the registered flags.
    pub fn parse(&mut self) -> Result<()> {
        if self.matches.is_some() {
            return Err(ConfError::RegistrySealed);
        }

        let command = self.build_command();
        let matches = command
            .try_get_matches_from(&self.arguments)
            .map_err(|error| ConfError::FlagParse(Box::new(error)))?;

        debug!(
            flags = self.definitions.len(),
            arguments = self.arguments.len().saturating_sub(1),
            "Parsed command-line flags."
        );

        self.matches = Some(matches);
        Ok(())
    }

    fn build_command(&self) -> Command {
        let program_name = self
            .arguments
            .first()
            .map(|program| program.to_string_lossy().into_owned())
            .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string());

        let mut command = Command::new(program_name)
            .disable_help_flag(true)
            .disable_version_flag(true)
            .arg(
                Arg::new(POSITIONAL_ARGUMENTS_ID)
                    .num_args(0..)
                    .action(ArgAction::Append)
                    .hide(true),
            );

        for (name, definition) in &self.definitions {
            command = command.arg(flag_argument(name, definition));
        }

        command
    }

    /// Whether `--{name}` was given on the command line.
    ///
    /// Declared defaults never count as set.
    pub fn is_set(&self, name: &str) -> bool {
        self.matches
            .as_ref()
            .filter(|_| self.definitions.contains_key(name))
            .and_then(|matches| matches.value_source(name))
            .is_some_and(|source| source == ValueSource::CommandLine)
    }

    /// Raw text of every occurrence of `--{name}`, in order.
    pub fn raw_values(&self, name: &str) -> Vec<String> {
        if !self.is_set(name) {
            return Vec::new();
        }

        self.matches
            .as_ref()
            .and_then(|matches| matches.get_raw(name))
            .map(|values| {
                values
                    .map(|value| value.to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default()
    }
}


fn typed_parser<T>() -> ValueParser
where
    T: FromStr + Clone + Send + Sync + 'static,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    ValueParser::new(|value: &str| value.parse::<T>())
}

fn flag_argument(name: &str, definition: &FlagDefinition) -> Arg {
    let argument = Arg::new(name.to_string()).long(name.to_string());

    let argument = match definition.kind {
        // `--verbose` alone means true. A value must be attached, as in
        // `--verbose=false`, so the next argument is never taken.
        FieldKind::Bool => argument
            .num_args(0..=1)
            .require_equals(true)
            .default_missing_value("true")
            .value_parser(BoolishValueParser::new()),
        FieldKind::I8 => argument.value_parser(typed_parser::<i8>()),
        FieldKind::I16 => argument.value_parser(typed_parser::<i16>()),
        FieldKind::I32 => argument.value_parser(typed_parser::<i32>()),
        FieldKind::I64 => argument.value_parser(typed_parser::<i64>()),
        FieldKind::Isize => argument.value_parser(typed_parser::<isize>()),
        FieldKind::U8 => argument.value_parser(typed_parser::<u8>()),
        FieldKind::U16 => argument.value_parser(typed_parser::<u16>()),
        FieldKind::U32 => argument.value_parser(typed_parser::<u32>()),
        FieldKind::U64 => argument.value_parser(typed_parser::<u64>()),
        FieldKind::Usize => argument.value_parser(typed_parser::<usize>()),
        FieldKind::F32 => argument.value_parser(typed_parser::<f32>()),
        FieldKind::F64 => argument.value_parser(typed_parser::<f64>()),
        FieldKind::Duration => argument.value_parser(ValueParser::new(humantime::parse_duration)),
        FieldKind::String => argument.value_parser(typed_parser::<String>()),
        FieldKind::Bytes => argument
            .value_parser(typed_parser::<String>())
            .help("byte array in base64"),
        FieldKind::StringList => argument
            .action(ArgAction::Append)
            .value_delimiter(',')
            .value_parser(typed_parser::<String>()),
    };

    let argument = match definition.kind {
        FieldKind::Bool | FieldKind::StringList => argument,
        kind if kind.is_signed_integer() || kind.is_float() => argument
            .action(ArgAction::Set)
            .allow_negative_numbers(true),
        _ => argument.action(ArgAction::Set),
    };

    match &definition.default {
        Some(default) if definition.kind.is_scalar() => argument.default_value(default.clone()),
        _ => argument,
    }
}
