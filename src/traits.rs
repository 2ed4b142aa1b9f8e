use crate::schema::Schema;
use crate::validation::Violation;

/// Represents a structure that can be populated by a [`ConfReader`][crate::ConfReader].
///
/// The read methods additionally require the type to implement
/// [`serde::de::DeserializeOwned`], which is how resolved values
/// are projected onto it.
pub trait Configurable: 'static {
    /// Describe the shape of this structure.
    fn schema() -> Schema;

    /// Additional checks that involve more than one field.
    ///
    /// Runs after the per-field rules of the schema. Returning any violations
    /// makes the read fail with a validation error.
    fn validate(&self) -> Vec<Violation> {
        Vec::new()
    }
}
