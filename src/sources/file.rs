use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{ConfError, Result};


#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum FileFormat {
    Json,
    Toml,
    Yaml,
}

impl FileFormat {
    /// Extensions probed in each search directory, in this order.
    pub const SEARCH_EXTENSIONS: [&'static str; 4] = ["json", "toml", "yaml", "yml"];

    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "json" => Some(FileFormat::Json),
            "toml" => Some(FileFormat::Toml),
            "yaml" | "yml" => Some(FileFormat::Yaml),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|extension| extension.to_str())
            .and_then(Self::from_extension)
    }

    /// Parse a document of this format. The document root must be a mapping.
    pub fn parse(self, content: &str) -> Result<Map<String, Value>, String> {
        let document: Value = match self {
            FileFormat::Json => serde_json::from_str(content).map_err(|error| error.to_string())?,
            FileFormat::Toml => toml::from_str(content).map_err(|error| error.to_string())?,
            FileFormat::Yaml => {
                serde_yaml::from_str(content).map_err(|error| error.to_string())?
            }
        };

        match document {
            Value::Object(mapping) => Ok(mapping),
            // An empty YAML document.
            Value::Null => Ok(Map::new()),
            _ => Err("expected the document root to be a mapping".to_string()),
        }
    }
}


/// A configuration file that was found and parsed.
#[derive(Clone, Debug)]
pub struct SettingsFile {
    path: PathBuf,
    values: BTreeMap<String, Value>,
}

impl SettingsFile {
    /// Find the configuration file.
    ///
    /// An explicit file is used as-is. Otherwise each search directory is
    /// probed for `{config_name}.{extension}`, see [`FileFormat::SEARCH_EXTENSIONS`].
    pub fn locate(
        config_name: &str,
        explicit_file: Option<&Path>,
        search_directories: &[PathBuf],
    ) -> Option<PathBuf> {
        if let Some(explicit_file) = explicit_file {
            return explicit_file.is_file().then(|| explicit_file.to_path_buf());
        }

        search_directories
            .iter()
            .flat_map(|directory| {
                FileFormat::SEARCH_EXTENSIONS
                    .iter()
                    .map(move |extension| directory.join(format!("{config_name}.{extension}")))
            })
            .find(|candidate| candidate.is_file())
    }

    /// Read and parse the file at `path`. A missing file is not an error.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(error) if error.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "Configuration file does not exist, skipping.");
                return Ok(None);
            }
            Err(error) => {
                return Err(ConfError::FileRead {
                    path: path.to_path_buf(),
                    source: error,
                })
            }
        };

        let format = FileFormat::from_path(path).ok_or_else(|| ConfError::FileParse {
            path: path.to_path_buf(),
            message: "unsupported configuration file extension".to_string(),
        })?;

        let document = format.parse(&content).map_err(|message| ConfError::FileParse {
            path: path.to_path_buf(),
            message,
        })?;

        let path = dunce::canonicalize(path).map_err(|error| ConfError::FileRead {
            path: path.to_path_buf(),
            source: error,
        })?;

        let mut values = BTreeMap::new();
        flatten_into("", &document, &mut values);

        debug!(
            path = %path.display(),
            ?format,
            keys = values.len(),
            "Loaded configuration file."
        );

        Ok(Some(Self { path, values }))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Value at a lower-cased dotted path.
    pub fn get(&self, path: &str) -> Option<&Value> {
        self.values.get(path)
    }
}


/// Flattens nested mappings into lower-cased dotted keys. Lists and scalars are leaves.
fn flatten_into(prefix: &str, mapping: &Map<String, Value>, output: &mut BTreeMap<String, Value>) {
    for (key, value) in mapping {
        let path = if prefix.is_empty() {
            key.to_lowercase()
        } else {
            format!("{}.{}", prefix, key.to_lowercase())
        };

        match value {
            Value::Object(nested) => flatten_into(&path, nested, output),
            leaf => {
                output.insert(path, leaf.clone());
            }
        }
    }
}
