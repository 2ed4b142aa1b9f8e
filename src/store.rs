//! The per-read store of resolved values.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::trace;

use crate::binder::EnvBinding;
use crate::decode::{decode, decode_default, decode_text, is_zero, zero_value};
use crate::descriptor::Descriptors;
use crate::error::{ConfError, Result};
use crate::sources::{EnvironmentSource, SettingsFile};


/// Case-insensitive, dotted-path keyed values, already decoded per field kind.
///
/// Sources are merged lowest precedence first; every merge overwrites.
#[derive(Clone, Default, Debug)]
pub struct ResolvedStore {
    values: BTreeMap<String, Value>,
}

impl ResolvedStore {
    /// A store holding every field's zero value, overridden by its declared default.
    pub fn with_defaults(descriptors: &Descriptors) -> Result<Self> {
        let mut store = Self::default();

        for descriptor in descriptors {
            let value = match &descriptor.default {
                Some(literal) => decode_default(descriptor.kind, literal).map_err(|source| {
                    ConfError::DefaultValue {
                        path: descriptor.path.clone(),
                        source,
                    }
                })?,
                None => zero_value(descriptor.kind),
            };

            store.set(&descriptor.path, value);
        }

        Ok(store)
    }

    pub fn get(&self, path: &str) -> Option<&Value> {
        self.values.get(&path.to_lowercase())
    }

    pub fn set(&mut self, path: &str, value: Value) {
        self.values.insert(path.to_lowercase(), value);
    }

    /// Keep the non-zero fields of an already filled target over the defaults.
    ///
    /// `target` is the serialized form of the structure being read into.
    pub fn merge_target(&mut self, descriptors: &Descriptors, target: &Value) {
        for descriptor in descriptors {
            let found = descriptor
                .target
                .iter()
                .try_fold(target, |value, name| value.get(*name));

            let Some(value) = found else {
                continue;
            };
            if is_zero(descriptor.kind, value) {
                continue;
            }

            trace!(path = %descriptor.path, "Value kept from the target structure.");
            self.set(&descriptor.path, value.clone());
        }
    }

    /// Merge the values of a configuration file. Keys without a descriptor are ignored.
    pub fn merge_file(&mut self, descriptors: &Descriptors, file: &SettingsFile) -> Result<()> {
        for descriptor in descriptors {
            let Some(raw) = file.get(&descriptor.path) else {
                continue;
            };

            let value = decode(descriptor.kind, raw).map_err(|source| ConfError::Unmarshal {
                path: descriptor.path.clone(),
                origin: format!("file {}", file.path().display()),
                source,
            })?;

            trace!(path = %descriptor.path, "Value taken from configuration file.");
            self.set(&descriptor.path, value);
        }

        Ok(())
    }

    /// Merge the bound environment variables that are set.
    pub fn merge_environment(
        &mut self,
        descriptors: &Descriptors,
        bindings: &[EnvBinding],
        environment: &dyn EnvironmentSource,
    ) -> Result<()> {
        for binding in bindings {
            let Some(descriptor) = descriptors.get(&binding.path) else {
                continue;
            };
            let Some(raw) = binding.lookup(environment) else {
                continue;
            };

            let value = decode_text(descriptor.kind, &raw).map_err(|source| {
                ConfError::Unmarshal {
                    path: descriptor.path.clone(),
                    origin: format!("environment variable {}", binding.variable),
                    source,
                }
            })?;

            trace!(
                path = %descriptor.path,
                variable = %binding.variable,
                "Value taken from environment."
            );
            self.set(&descriptor.path, value);
        }

        Ok(())
    }

    /// Nest the values along each descriptor's target path.
    pub fn to_value(&self, descriptors: &Descriptors) -> Value {
        let mut root = Map::new();

        for descriptor in descriptors {
            let Some(value) = self.get(&descriptor.path) else {
                continue;
            };
            let Some((leaf_name, parents)) = descriptor.target.split_last() else {
                continue;
            };

            let mut object = &mut root;
            for parent in parents {
                let entry = object
                    .entry(parent.to_string())
                    .or_insert_with(|| Value::Object(Map::new()));

                if !entry.is_object() {
                    *entry = Value::Object(Map::new());
                }

                object = match entry {
                    Value::Object(nested) => nested,
                    _ => unreachable!("entry was just made an object"),
                };
            }

            object.insert(leaf_name.to_string(), value.clone());
        }

        Value::Object(root)
    }

    /// Deserialize the target structure from the resolved values.
    pub fn project<T: DeserializeOwned>(&self, descriptors: &Descriptors) -> Result<T> {
        serde_json::from_value(self.to_value(descriptors)).map_err(ConfError::Projection)
    }
}
