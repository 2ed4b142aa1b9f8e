//! Registers every descriptor with the flag and environment sources.

use tracing::trace;

use crate::descriptor::Descriptors;
use crate::error::Result;
use crate::sources::{EnvironmentSource, FlagRegistry};
use crate::utilities::environment_variable_name;


/// The environment variable a field is read from.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct EnvBinding {
    pub path: String,
    pub variable: String,
}

impl EnvBinding {
    /// The variable's value, if it is set to something non-empty.
    pub fn lookup(&self, environment: &dyn EnvironmentSource) -> Option<String> {
        environment
            .get(&self.variable)
            .filter(|value| !value.is_empty())
    }
}


/// Register one flag per descriptor and compute its environment binding.
///
/// Fails with [`DuplicateFlag`][crate::ConfError::DuplicateFlag] if two
/// descriptors share an external name.
pub fn bind(
    descriptors: &Descriptors,
    flags: &mut FlagRegistry,
    environment_prefix: Option<&str>,
) -> Result<Vec<EnvBinding>> {
    let mut bindings = Vec::with_capacity(descriptors.len());

    for descriptor in descriptors {
        flags.register(&descriptor.name, descriptor.kind, descriptor.default.as_deref())?;

        let variable = match &descriptor.env_var {
            Some(explicit) => explicit.clone(),
            None => environment_variable_name(environment_prefix, &descriptor.path),
        };

        trace!(
            path = %descriptor.path,
            flag = %descriptor.name,
            %variable,
            "Bound configuration field."
        );

        bindings.push(EnvBinding {
            path: descriptor.path.clone(),
            variable,
        });
    }

    Ok(bindings)
}
