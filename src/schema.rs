//! Explicit description of a configuration structure's shape.
//!
//! Instead of inspecting types at runtime, every configurable type describes
//! itself once through [`Configurable::schema`][crate::Configurable::schema]:
//!
//! ```
//! use confreader::{Configurable, Field, Schema};
//!
//! #[derive(serde::Deserialize)]
//! struct Database {
//!     host: String,
//!     port: u16,
//! }
//!
//! impl Configurable for Database {
//!     fn schema() -> Schema {
//!         Schema::builder("Database")
//!             .field(Field::of::<String>("host").default("localhost"))
//!             .field(Field::of::<u16>("port").default("5432"))
//!             .build()
//!     }
//! }
//! ```
//!
//! Field names must be the names serde uses for the target type,
//! because resolved values are projected onto it by those names.

mod field;
mod kind;

pub use self::field::{Embedding, Field, FieldShape, SchemaRef};
pub use self::kind::{FieldKind, LeafKind};


#[derive(Clone, Debug)]
pub struct Schema {
    name: &'static str,
    fields: Vec<Field>,
}

impl Schema {
    pub fn builder(name: &'static str) -> SchemaBuilder {
        SchemaBuilder {
            name,
            fields: Vec::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }
}


#[must_use = "call build() to obtain the schema"]
pub struct SchemaBuilder {
    name: &'static str,
    fields: Vec<Field>,
}

impl SchemaBuilder {
    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn build(self) -> Schema {
        Schema {
            name: self.name,
            fields: self.fields,
        }
    }
}
