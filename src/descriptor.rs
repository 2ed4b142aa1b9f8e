//! Flattens a [`Schema`] tree into one [`FieldDescriptor`] per leaf field.

use std::any::TypeId;
use std::collections::{btree_map, BTreeMap};
use std::slice;

use tracing::{debug, trace};

use crate::error::{ConfError, Result};
use crate::schema::{Embedding, FieldKind, FieldShape, Schema, SchemaRef};
use crate::traits::Configurable;


/// Everything the binder and resolver need to know about one leaf field.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct FieldDescriptor {
    /// Lower-cased dotted path, the canonical lookup key (`app.id`).
    pub path: String,

    /// External name used for the flag (`--id`). Defaults to `path`.
    pub name: String,

    pub kind: FieldKind,

    /// Declared default literal.
    pub default: Option<String>,

    /// Environment variable that overrides the derived one.
    pub env_var: Option<String>,

    /// Validation rule expression.
    pub rules: Option<String>,

    /// Real field names from the root, squashed records included.
    pub target: Vec<&'static str>,
}


/// Descriptors of a structure in declaration order, indexed by dotted path.
#[derive(Clone, Default, Debug)]
pub struct Descriptors {
    fields: Vec<FieldDescriptor>,
    by_path: BTreeMap<String, usize>,
}

impl Descriptors {
    /// Extract the descriptors of a configurable type.
    pub fn of<T: Configurable>() -> Result<Self> {
        Self::from_schema_ref(SchemaRef::of::<T>())
    }

    pub(crate) fn from_schema_ref(root: SchemaRef) -> Result<Self> {
        let mut descriptors = Descriptors::default();
        let mut ancestors = vec![root.id];

        descriptors.walk(&root.build(), "", &[], &mut ancestors)?;

        debug!(
            schema = root.type_name(),
            fields = descriptors.len(),
            "Extracted field descriptors."
        );

        Ok(descriptors)
    }

    fn walk(
        &mut self,
        schema: &Schema,
        path: &str,
        target: &[&'static str],
        ancestors: &mut Vec<TypeId>,
    ) -> Result<()> {
        for field in schema.fields() {
            let field_path = join_path(path, field.name());

            let mut field_target = target.to_vec();
            field_target.push(field.name());

            match field.shape() {
                FieldShape::Leaf(kind) => {
                    let descriptor = FieldDescriptor {
                        name: field
                            .flag
                            .map(str::to_string)
                            .unwrap_or_else(|| field_path.clone()),
                        path: field_path,
                        kind: *kind,
                        default: field.default.map(str::to_string),
                        env_var: field.env_var.map(str::to_string),
                        rules: field.rules.map(str::to_string),
                        target: field_target,
                    };

                    self.insert(descriptor);
                }
                FieldShape::Record {
                    schema: nested,
                    embedding,
                } => {
                    if ancestors.contains(&nested.id) {
                        return Err(ConfError::CyclicShape {
                            type_name: nested.type_name(),
                            path: field_path,
                        });
                    }

                    let nested_path = match embedding {
                        Embedding::Squashed => path.to_string(),
                        Embedding::Prefixed => field_path,
                    };

                    ancestors.push(nested.id);
                    self.walk(&nested.build(), &nested_path, &field_target, ancestors)?;
                    ancestors.pop();
                }
                FieldShape::Opaque => {
                    trace!(field = field.name(), "Skipping opaque field.");
                }
            }
        }

        Ok(())
    }

    fn insert(&mut self, descriptor: FieldDescriptor) {
        trace!(
            path = %descriptor.path,
            name = %descriptor.name,
            kind = %descriptor.kind,
            "Discovered configuration field."
        );

        match self.by_path.entry(descriptor.path.clone()) {
            btree_map::Entry::Vacant(entry) => {
                entry.insert(self.fields.len());
                self.fields.push(descriptor);
            }
            btree_map::Entry::Occupied(entry) => {
                // Last write wins, at the position of the first declaration.
                debug!(
                    path = %descriptor.path,
                    "Field path appears twice, the later field replaces the earlier one."
                );
                self.fields[*entry.get()] = descriptor;
            }
        }
    }

    pub fn get(&self, path: &str) -> Option<&FieldDescriptor> {
        self.by_path
            .get(&path.to_lowercase())
            .map(|index| &self.fields[*index])
    }

    /// Descriptors in the order their fields are declared.
    pub fn iter(&self) -> slice::Iter<'_, FieldDescriptor> {
        self.fields.iter()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|descriptor| descriptor.path.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<'a> IntoIterator for &'a Descriptors {
    type Item = &'a FieldDescriptor;
    type IntoIter = slice::Iter<'a, FieldDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}


/// Appends a field name to a dotted path, lower-casing it and trimming the leading dot.
fn join_path(parent: &str, field_name: &str) -> String {
    format!("{}.{}", parent, field_name)
        .trim_start_matches('.')
        .to_lowercase()
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Field;

    struct GlobalConfig;

    impl Configurable for GlobalConfig {
        fn schema() -> Schema {
            Schema::builder("GlobalConfig")
                .field(Field::of::<bool>("verbose"))
                .build()
        }
    }

    struct Sibling;

    impl Configurable for Sibling {
        fn schema() -> Schema {
            Schema::builder("Sibling")
                .field(Field::of::<String>("id").flag("id"))
                .field(Field::of::<String>("from_env_var"))
                .build()
        }
    }

    struct Parent;

    impl Configurable for Parent {
        fn schema() -> Schema {
            Schema::builder("Parent")
                .field(Field::nested::<GlobalConfig>("global").squash())
                .field(Field::nested::<Sibling>("Conf").flag("notAllowed"))
                .field(Field::pointer::<Sibling>("ptr_conf"))
                .field(Field::of::<f64>("par").flag("par"))
                .field(Field::of::<std::time::Duration>("duration"))
                .field(Field::opaque("callback"))
                .build()
        }
    }

    #[test]
    fn walks_nested_squashed_and_pointer_records() {
        let descriptors = Descriptors::of::<Parent>().unwrap();

        let verbose = descriptors.get("verbose").unwrap();
        assert_eq!(verbose.name, "verbose");
        assert_eq!(verbose.kind, FieldKind::Bool);
        assert_eq!(verbose.target, vec!["global", "verbose"]);

        let conf_id = descriptors.get("conf.id").unwrap();
        assert_eq!(conf_id.name, "id");
        assert_eq!(conf_id.kind, FieldKind::String);
        assert_eq!(conf_id.target, vec!["Conf", "id"]);

        let ptr_conf_id = descriptors.get("ptr_conf.id").unwrap();
        assert_eq!(ptr_conf_id.name, "id");

        assert_eq!(descriptors.get("conf.from_env_var").unwrap().name, "conf.from_env_var");
        assert_eq!(descriptors.get("par").unwrap().kind, FieldKind::F64);
        assert_eq!(descriptors.get("duration").unwrap().kind, FieldKind::Duration);
    }

    #[test]
    fn record_fields_and_opaque_fields_get_no_descriptor() {
        let descriptors = Descriptors::of::<Parent>().unwrap();

        assert!(descriptors.get("global").is_none());
        assert!(descriptors.get("global.verbose").is_none());
        assert!(descriptors.get("conf").is_none());
        assert!(descriptors.get("callback").is_none());
        assert_eq!(descriptors.len(), 7);
    }

    #[test]
    fn descriptors_keep_declaration_order() {
        let descriptors = Descriptors::of::<Parent>().unwrap();

        assert_eq!(
            descriptors.paths().collect::<Vec<_>>(),
            vec![
                "verbose",
                "conf.id",
                "conf.from_env_var",
                "ptr_conf.id",
                "ptr_conf.from_env_var",
                "par",
                "duration",
            ]
        );
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let descriptors = Descriptors::of::<Parent>().unwrap();
        assert!(descriptors.get("CONF.ID").is_some());
    }

    struct Node;

    impl Configurable for Node {
        fn schema() -> Schema {
            Schema::builder("Node")
                .field(Field::of::<String>("name"))
                .field(Field::pointer::<Node>("next"))
                .build()
        }
    }

    #[test]
    fn cyclic_shapes_are_rejected() {
        let error = Descriptors::of::<Node>().unwrap_err();

        match error {
            ConfError::CyclicShape { path, .. } => assert_eq!(path, "next"),
            other => panic!("unexpected error: {other}"),
        }
    }

    struct Shadowing;

    impl Configurable for Shadowing {
        fn schema() -> Schema {
            Schema::builder("Shadowing")
                .field(Field::nested::<GlobalConfig>("global").squash())
                .field(Field::of::<bool>("verbose").default("true"))
                .build()
        }
    }

    #[test]
    fn later_field_wins_on_path_collision() {
        let descriptors = Descriptors::of::<Shadowing>().unwrap();

        let verbose = descriptors.get("verbose").unwrap();
        assert_eq!(descriptors.len(), 1);
        assert_eq!(verbose.target, vec!["verbose"]);
        assert_eq!(verbose.default.as_deref(), Some("true"));
    }
}
