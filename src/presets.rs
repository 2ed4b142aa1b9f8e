//! Commonly used configuration records.

use serde::{Deserialize, Serialize};

use crate::schema::{Field, Schema};
use crate::traits::Configurable;


/// Connection settings for a PostgreSQL database.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Debug)]
pub struct PostgresqlDb {
    pub host: String,
    pub password: String,
    pub db_name: String,
    pub username: String,
    pub port: u16,
    pub ssl_enabled: bool,
}

impl Configurable for PostgresqlDb {
    fn schema() -> Schema {
        Schema::builder("PostgresqlDb")
            .field(Field::of::<String>("host").default("localhost"))
            .field(Field::of::<String>("password"))
            .field(Field::of::<String>("db_name").default("postgres"))
            .field(Field::of::<String>("username").default("postgres"))
            .field(Field::of::<u16>("port").default("5432").validate("min=1"))
            .field(Field::of::<bool>("ssl_enabled"))
            .build()
    }
}

impl PostgresqlDb {
    /// A libpq-style key/value connection string.
    pub fn connection_string(&self) -> String {
        let ssl_mode = if self.ssl_enabled {
            "require"
        } else {
            "disable"
        };

        format!(
            "host={} user={} password={} dbname={} port={} sslmode={}",
            self.host, self.username, self.password, self.db_name, self.port, ssl_mode
        )
    }
}
