//! Catalog importers.
//!
//! An adaptor reads a live catalog and builds a [`Database`] snapshot
//! through the generic type system.

mod sqlite;

pub use sqlite::SqliteAdaptor;

use ddl_forge_core::database::Database;
use ddl_forge_core::dialect::Dialect;

use crate::connection::ConnectionString;
use crate::error::{ForgeError, Result};
use crate::options::ImportOptions;

/// Reads a schema from a live database.
#[allow(async_fn_in_trait)]
pub trait SchemaAdaptor {
    /// Dialect of the catalog.
    fn dialect(&self) -> Dialect;

    /// Imports the schema. `name` overrides the database name recorded in
    /// the snapshot.
    async fn import_schema(&self, name: Option<&str>, options: &ImportOptions) -> Result<Database>;
}

/// Adaptor selected from a connection string.
#[derive(Debug)]
pub enum Adaptor {
    Sqlite(SqliteAdaptor),
}

impl SchemaAdaptor for Adaptor {
    fn dialect(&self) -> Dialect {
        match self {
            Self::Sqlite(adaptor) => adaptor.dialect(),
        }
    }

    async fn import_schema(&self, name: Option<&str>, options: &ImportOptions) -> Result<Database> {
        match self {
            Self::Sqlite(adaptor) => adaptor.import_schema(name, options).await,
        }
    }
}

/// Connects the adaptor for `connection`.
///
/// # Errors
///
/// Returns [`ForgeError::UnsupportedDialect`] for dialects without an
/// importer in this build, or the connection error.
pub async fn adaptor_for(connection: &ConnectionString) -> Result<Adaptor> {
    match connection.dialect {
        Dialect::Sqlite => Ok(Adaptor::Sqlite(SqliteAdaptor::connect(connection).await?)),
        other => Err(ForgeError::UnsupportedDialect(format!(
            "no catalog importer for {other}"
        ))),
    }
}
