//! Reloading a configuration when its file changes.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use tracing::{debug, error, info, warn};

use crate::error::{ConfError, Result};
use crate::reader::ConfReader;
use crate::sources::{EnvironmentSource, FlagRegistry};
use crate::traits::Configurable;


/// The reload lock: readers take the read side, reloads swap under the write side.
pub type ReloadLock<T> = Arc<RwLock<Arc<T>>>;


/// Keeps a configuration in sync with its file.
///
/// Each change builds a brand-new value through the full read pipeline
/// and swaps it in atomically. Readers never observe a half-updated value.
/// A reload that fails is logged and the last good value is kept.
///
/// Watching stops when this handle is dropped.
pub struct ConfigWatcher<T> {
    current: ReloadLock<T>,
    generation: Arc<AtomicU64>,
    path: PathBuf,
    _watcher: RecommendedWatcher,
}

impl<T> ConfigWatcher<T>
where
    T: Configurable + DeserializeOwned + Send + Sync + 'static,
{
    pub(crate) fn start(
        reader: ConfReader,
        path: PathBuf,
        initial: T,
        flags: FlagRegistry,
        environment: Arc<dyn EnvironmentSource>,
    ) -> Result<Self> {
        let current: ReloadLock<T> = Arc::new(RwLock::new(Arc::new(initial)));
        let generation = Arc::new(AtomicU64::new(0));

        let directory = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        let handler = {
            let current = current.clone();
            let generation = generation.clone();
            let path = path.clone();

            move |result: notify::Result<Event>| match result {
                Ok(event) => {
                    if !concerns_file(&event, &path) {
                        return;
                    }

                    handle_event(
                        &reader,
                        &path,
                        &event,
                        &flags,
                        environment.as_ref(),
                        &current,
                        &generation,
                    );
                }
                Err(watch_error) => error!(error = %watch_error, "Configuration watch error."),
            }
        };

        let to_watch_error = |source| ConfError::Watch {
            path: path.clone(),
            source,
        };

        let mut watcher =
            RecommendedWatcher::new(handler, Config::default()).map_err(to_watch_error)?;
        watcher
            .watch(&directory, RecursiveMode::NonRecursive)
            .map_err(to_watch_error)?;

        info!(path = %path.display(), "Watching configuration file.");

        Ok(Self {
            current,
            generation,
            path,
            _watcher: watcher,
        })
    }
}

impl<T> ConfigWatcher<T> {
    /// A snapshot of the current configuration.
    pub fn current(&self) -> Arc<T> {
        self.current.read().clone()
    }

    /// The lock guarding the current configuration, for callers that
    /// coordinate their own reads with reloads.
    pub fn lock(&self) -> ReloadLock<T> {
        self.current.clone()
    }

    /// Number of successful reloads so far.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}


fn concerns_file(event: &Event, path: &Path) -> bool {
    event
        .paths
        .iter()
        .any(|event_path| event_path == path || event_path.file_name() == path.file_name())
}

fn handle_event<T>(
    reader: &ConfReader,
    path: &Path,
    event: &Event,
    flags: &FlagRegistry,
    environment: &dyn EnvironmentSource,
    current: &ReloadLock<T>,
    generation: &AtomicU64,
) where
    T: Configurable + DeserializeOwned,
{
    match event.kind {
        EventKind::Create(_) | EventKind::Modify(_) => {}
        EventKind::Remove(_) => {
            warn!(path = %path.display(), "Configuration file removed, keeping the last configuration.");
            return;
        }
        _ => return,
    }

    if !path.exists() {
        debug!(path = %path.display(), "Configuration file is gone, skipping reload.");
        return;
    }

    info!(path = %path.display(), "Configuration file changed, reloading.");

    match reader.read_config::<T>(&mut flags.fresh(), environment) {
        Ok(reloaded) => {
            *current.write() = Arc::new(reloaded);
            generation.fetch_add(1, Ordering::AcqRel);
        }
        Err(reload_error) => {
            error!(
                error = %reload_error,
                "Failed to reload configuration, keeping the current configuration."
            );
        }
    }
}
