use std::any::{type_name, TypeId};
use std::fmt;

use super::kind::{FieldKind, LeafKind};
use super::Schema;
use crate::traits::Configurable;


/// Identity of a nested schema, resolved lazily so recursive shapes can be described.
#[derive(Clone, Copy)]
pub struct SchemaRef {
    pub(crate) id: TypeId,
    pub(crate) type_name: &'static str,
    build: fn() -> Schema,
}

impl SchemaRef {
    pub fn of<T: Configurable>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            build: T::schema,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub(crate) fn build(&self) -> Schema {
        (self.build)()
    }
}

impl fmt::Debug for SchemaRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SchemaRef").field(&self.type_name).finish()
    }
}


/// How a nested record contributes to its parent's namespace.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Embedding {
    /// Paths are prefixed by the field name (`app.id`).
    Prefixed,
    /// Paths merge directly into the parent's namespace (`verbose`).
    Squashed,
}

#[derive(Clone, Debug)]
pub enum FieldShape {
    Leaf(FieldKind),
    Record {
        schema: SchemaRef,
        embedding: Embedding,
    },
    /// Functions, channels, trait objects, raw pointers: never bound to any source.
    Opaque,
}


/// A single field of a [`Schema`], together with its annotations.
#[derive(Clone, Debug)]
pub struct Field {
    pub(crate) name: &'static str,
    pub(crate) shape: FieldShape,
    pub(crate) flag: Option<&'static str>,
    pub(crate) default: Option<&'static str>,
    pub(crate) env_var: Option<&'static str>,
    pub(crate) rules: Option<&'static str>,
}

impl Field {
    fn with_shape(name: &'static str, shape: FieldShape) -> Self {
        Self {
            name,
            shape,
            flag: None,
            default: None,
            env_var: None,
            rules: None,
        }
    }

    /// A leaf field of an explicit kind.
    pub fn new(name: &'static str, kind: FieldKind) -> Self {
        Self::with_shape(name, FieldShape::Leaf(kind))
    }

    /// A leaf field whose kind is inferred from its Rust type.
    pub fn of<T: LeafKind>(name: &'static str) -> Self {
        Self::new(name, T::KIND)
    }

    /// A nested record, prefixed by `name` unless [`squash`][Self::squash] is applied.
    pub fn nested<T: Configurable>(name: &'static str) -> Self {
        Self::with_shape(
            name,
            FieldShape::Record {
                schema: SchemaRef::of::<T>(),
                embedding: Embedding::Prefixed,
            },
        )
    }

    /// A record behind one level of indirection (`Box<T>`, `Option<T>`).
    ///
    /// The indirection is transparent: the pointee is walked exactly as if it
    /// were a direct [`nested`][Self::nested] field.
    pub fn pointer<T: Configurable>(name: &'static str) -> Self {
        Self::nested::<T>(name)
    }

    /// A field that is not configurable at all.
    pub fn opaque(name: &'static str) -> Self {
        Self::with_shape(name, FieldShape::Opaque)
    }

    /// Overrides the external (flag) name, which otherwise is the dotted path.
    pub fn flag(mut self, flag_name: &'static str) -> Self {
        self.flag = Some(flag_name);
        self
    }

    /// Declared default, written in the same textual form as an environment value.
    pub fn default(mut self, literal: &'static str) -> Self {
        self.default = Some(literal);
        self
    }

    /// Reads this field from exactly this environment variable, ignoring the prefix.
    pub fn env(mut self, variable_name: &'static str) -> Self {
        self.env_var = Some(variable_name);
        self
    }

    /// Validation rules, e.g. `"required,min=3"`.
    pub fn validate(mut self, rules: &'static str) -> Self {
        self.rules = Some(rules);
        self
    }

    /// Merges a nested record's fields into the parent namespace.
    ///
    /// Has no effect on leaf or opaque fields.
    pub fn squash(mut self) -> Self {
        if let FieldShape::Record { embedding, .. } = &mut self.shape {
            *embedding = Embedding::Squashed;
        }
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn shape(&self) -> &FieldShape {
        &self.shape
    }
}
