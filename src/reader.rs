use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::binder::bind;
use crate::descriptor::Descriptors;
use crate::error::{ConfError, Result};
use crate::resolver::apply_flags;
use crate::sources::{EnvironmentSource, FlagRegistry, ProcessEnvironment, SettingsFile};
use crate::store::ResolvedStore;
use crate::traits::Configurable;
use crate::utilities::default_search_directories;
use crate::validation::{RuleValidator, ValidationErrors, Validator};
use crate::watch::ConfigWatcher;


#[derive(Default, Debug)]
struct ReadState {
    /// Whether any read completed successfully.
    completed: bool,

    /// The configuration file the last successful read used.
    file: Option<PathBuf>,
}


/// A fully resolved, not yet validated configuration.
struct Loaded<T> {
    value: T,
    descriptors: Descriptors,
    store: ResolvedStore,
    file: Option<PathBuf>,
}


/// Reads configuration structures from a file, environment variables and flags.
///
/// Flags take precedence over environment variables, which take precedence
/// over the configuration file, which takes precedence over declared defaults.
///
/// For example, the field `foo` of a record nested as `nested` is set by
/// the flag `--nested.foo`, the variable `MYAPP_NESTED_FOO`, or the file
/// `myapp.yaml` containing
///
/// ```yaml
/// nested:
///   foo: bar
/// ```
#[derive(Clone)]
pub struct ConfReader {
    config_name: String,
    config_file: Option<PathBuf>,
    search_directories: Option<Vec<PathBuf>>,
    environment_prefix: Option<String>,
    validator: Arc<dyn Validator>,
    state: Arc<Mutex<ReadState>>,
}

impl ConfReader {
    /// `config_name` is the file name without extension, and (upper-cased)
    /// the environment variable prefix.
    pub fn new<S: Into<String>>(config_name: S) -> Self {
        let config_name = config_name.into();
        let environment_prefix = Some(config_name.to_uppercase());

        Self {
            config_name,
            config_file: None,
            search_directories: None,
            environment_prefix,
            validator: Arc::new(RuleValidator),
            state: Arc::new(Mutex::new(ReadState::default())),
        }
    }

    /// Directories searched for the configuration file, in order.
    /// Defaults to the home directory followed by the current directory.
    pub fn with_search_dirs<I, P>(mut self, directories: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.search_directories = Some(directories.into_iter().map(Into::into).collect());
        self
    }

    /// Use exactly this file instead of searching for one.
    pub fn with_config_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config_file = Some(path.into());
        self
    }

    /// Prefix of derived environment variable names.
    pub fn with_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.environment_prefix = Some(prefix.into());
        self
    }

    /// Derive environment variable names without any prefix.
    pub fn without_prefix(mut self) -> Self {
        self.environment_prefix = None;
        self
    }

    /// Replace the default [`RuleValidator`].
    pub fn with_validator<V: Validator + 'static>(mut self, validator: V) -> Self {
        self.validator = Arc::new(validator);
        self
    }

    pub fn config_name(&self) -> &str {
        &self.config_name
    }

    pub fn environment_prefix(&self) -> Option<&str> {
        self.environment_prefix.as_deref()
    }

    /// The configuration file used by the last successful read, if any.
    pub fn config_file_used(&self) -> Option<PathBuf> {
        self.state.lock().file.clone()
    }

    /// The field descriptors that reading `T` would bind.
    pub fn descriptors<T: Configurable>(&self) -> Result<Descriptors> {
        Descriptors::of::<T>()
    }

    /// Read into `target` from the process' arguments and environment.
    pub fn read<T>(&self, target: &mut T) -> Result<()>
    where
        T: Configurable + Serialize + DeserializeOwned,
    {
        self.read_from(target, &mut FlagRegistry::from_process(), &ProcessEnvironment)
    }

    /// Read into `target` from the given flags and environment.
    ///
    /// Fields `target` already holds a non-zero value for take precedence
    /// over declared defaults, but not over the file, environment or flags.
    ///
    /// `target` is overwritten before validation runs, so it holds the
    /// resolved values even if validation fails.
    pub fn read_from<T>(
        &self,
        target: &mut T,
        flags: &mut FlagRegistry,
        environment: &dyn EnvironmentSource,
    ) -> Result<()>
    where
        T: Configurable + Serialize + DeserializeOwned,
    {
        let prefilled = serde_json::to_value(&*target).map_err(ConfError::Target)?;
        let loaded = self.load::<T>(Some(&prefilled), flags, environment)?;

        *target = loaded.value;
        self.check(target, &loaded.descriptors, &loaded.store)?;

        self.mark_read(loaded.file);
        Ok(())
    }

    /// Read a brand-new `T` from the given flags and environment.
    pub fn read_config<T>(
        &self,
        flags: &mut FlagRegistry,
        environment: &dyn EnvironmentSource,
    ) -> Result<T>
    where
        T: Configurable + DeserializeOwned,
    {
        let loaded = self.load::<T>(None, flags, environment)?;
        self.check(&loaded.value, &loaded.descriptors, &loaded.store)?;

        self.mark_read(loaded.file);
        Ok(loaded.value)
    }

    /// Keep `initial` up to date with the configuration file the last read used.
    ///
    /// Every change of the file re-runs the whole read of that file with a
    /// fresh registry over the arguments of `flags`.
    ///
    /// # Panics
    /// Panics if no read has completed successfully yet.
    pub fn watch<T>(
        &self,
        initial: T,
        flags: &FlagRegistry,
        environment: Arc<dyn EnvironmentSource>,
    ) -> Result<ConfigWatcher<T>>
    where
        T: Configurable + DeserializeOwned + Send + Sync + 'static,
    {
        let file = {
            let state = self.state.lock();

            if !state.completed {
                panic!("ConfReader::watch called before a successful read");
            }

            state.file.clone()
        };

        let file = file.ok_or(ConfError::NothingToWatch)?;

        // Reloads read the watched file, even if a search would now find another.
        let reader = self.clone().with_config_file(file.clone());

        ConfigWatcher::start(reader, file, initial, flags.fresh(), environment)
    }


    fn load<T>(
        &self,
        prefilled: Option<&Value>,
        flags: &mut FlagRegistry,
        environment: &dyn EnvironmentSource,
    ) -> Result<Loaded<T>>
    where
        T: Configurable + DeserializeOwned,
    {
        let descriptors = Descriptors::of::<T>()?;
        let mut store = ResolvedStore::with_defaults(&descriptors)?;
        if let Some(prefilled) = prefilled {
            store.merge_target(&descriptors, prefilled);
        }

        let bindings = bind(&descriptors, flags, self.environment_prefix.as_deref())?;
        flags.parse()?;

        let settings = match self.locate_file()? {
            Some(path) => SettingsFile::load(&path)?,
            None => {
                debug!(config_name = %self.config_name, "No configuration file found.");
                None
            }
        };

        if let Some(settings) = &settings {
            store.merge_file(&descriptors, settings)?;
        }

        store.merge_environment(&descriptors, &bindings, environment)?;
        let from_flags = apply_flags(&descriptors, flags, &mut store)?;

        let value = store.project::<T>(&descriptors)?;

        info!(
            config_name = %self.config_name,
            file = ?settings.as_ref().map(SettingsFile::path),
            fields = descriptors.len(),
            from_flags,
            "Configuration resolved."
        );

        Ok(Loaded {
            value,
            descriptors,
            store,
            file: settings.map(|settings| settings.path().to_path_buf()),
        })
    }

    fn locate_file(&self) -> Result<Option<PathBuf>> {
        if let Some(explicit_file) = &self.config_file {
            return Ok(SettingsFile::locate(
                &self.config_name,
                Some(explicit_file.as_path()),
                &[],
            ));
        }

        let search_directories = match &self.search_directories {
            Some(directories) if !directories.is_empty() => directories.clone(),
            _ => default_search_directories()?,
        };

        Ok(SettingsFile::locate(&self.config_name, None, &search_directories))
    }

    fn check<T: Configurable>(
        &self,
        value: &T,
        descriptors: &Descriptors,
        store: &ResolvedStore,
    ) -> Result<()> {
        let mut violations = self.validator.validate(descriptors, store);
        violations.extend(value.validate());

        match ValidationErrors::from_violations(violations) {
            Some(errors) => Err(ConfError::Validation(errors)),
            None => Ok(()),
        }
    }

    fn mark_read(&self, file: Option<PathBuf>) {
        let mut state = self.state.lock();
        state.completed = true;
        state.file = file;
    }
}

impl fmt::Debug for ConfReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfReader")
            .field("config_name", &self.config_name)
            .field("config_file", &self.config_file)
            .field("search_directories", &self.search_directories)
            .field("environment_prefix", &self.environment_prefix)
            .finish_non_exhaustive()
    }
}

