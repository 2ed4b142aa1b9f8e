use std::collections::{BTreeMap, HashMap};


/// Where environment variables are looked up.
///
/// Reads take the environment as a parameter instead of consulting the
/// process directly, so independent reads (and tests) never share state.
pub trait EnvironmentSource: Send + Sync {
    /// Returns the value of `name`, or `None` if it is unset.
    fn get(&self, name: &str) -> Option<String>;
}


/// The environment of the current process.
#[derive(Clone, Copy, Default, Debug)]
pub struct ProcessEnvironment;

impl EnvironmentSource for ProcessEnvironment {
    fn get(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}


impl EnvironmentSource for HashMap<String, String> {
    fn get(&self, name: &str) -> Option<String> {
        HashMap::get(self, name).cloned()
    }
}

impl EnvironmentSource for BTreeMap<String, String> {
    fn get(&self, name: &str) -> Option<String> {
        BTreeMap::get(self, name).cloned()
    }
}

impl<E: EnvironmentSource + ?Sized> EnvironmentSource for &E {
    fn get(&self, name: &str) -> Option<String> {
        (**self).get(name)
    }
}


/// Builds an in-memory environment from `(name, value)` pairs.
pub fn environment_from_pairs<I, K, V>(pairs: I) -> HashMap<String, String>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(key, value)| (key.into(), value.into()))
        .collect()
}
