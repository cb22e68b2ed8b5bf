//! Capture, compare and script relational database schemas.
//!
//! `ddl-forge` wraps the dialect-neutral model of [`ddl_forge_core`] with the
//! parts that touch the outside world:
//!
//! - **Adaptor** - imports a live catalog into a [`Database`] snapshot
//! - **Definition** - stores snapshots as versioned JSON files
//! - **Writer** - lays a snapshot out as per-object DDL files, or renders a
//!   change set as one migration script
//! - **Connection / options** - connection strings and import switches
//!
//! # Example
//!
//! ```rust
//! use ddl_forge::prelude::*;
//!
//! let current = Database::new("Shop");
//! let mut target = Database::new("Shop");
//! target.tables.push(
//!     Table::new(QualifiedName::new("dbo", "Customer"))
//!         .field(Field::new("Id", FieldType::Integer, 4).required()),
//! );
//!
//! let change_set = diff(&current, &target);
//! let script = render_change_script(&change_set, &current, &MsSqlDialect::new()).unwrap();
//! assert!(script.starts_with("CREATE TABLE [dbo].[Customer]"));
//! ```
//!
//! [`Database`]: ddl_forge_core::database::Database

pub mod adaptor;
pub mod connection;
pub mod definition;
pub mod error;
pub mod options;
pub mod writer;

/// Prelude for convenient imports.
pub mod prelude {
    pub use ddl_forge_core::prelude::*;

    pub use crate::adaptor::{Adaptor, SchemaAdaptor, SqliteAdaptor, adaptor_for};
    pub use crate::connection::{ConnectionString, SqliteLocation};
    pub use crate::definition::{DefinitionFile, FORMAT_VERSION, read_definition, write_definition};
    pub use crate::error::ForgeError;
    pub use crate::options::{ImportCategory, ImportOptions};
    pub use crate::writer::{ScriptWriter, WriteSummary, render_change_script};
}
