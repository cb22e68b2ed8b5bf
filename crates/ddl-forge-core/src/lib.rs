//! Dialect-neutral schema model for relational databases.
//!
//! `ddl-forge-core` holds everything that does not touch a server:
//!
//! - **Schema IR** - tables, views, routines and user-defined types keyed by
//!   case-insensitive qualified names
//! - **Generic type system** - maps native column types to a small set of
//!   generic kinds and back
//! - **Ordering** - foreign key and routine dependency ordering for safe
//!   create and drop scripts
//! - **Diff** - compares two snapshots into a change set
//! - **Dialect** - per-dialect DDL fragments (SQL Server, MySQL, PostgreSQL,
//!   SQLite)
//!
//! # Example
//!
//! ```rust
//! use ddl_forge_core::prelude::*;
//!
//! let customer = Table::new(QualifiedName::new("dbo", "Customer"))
//!     .field(Field::new("Id", FieldType::Integer, 4).required())
//!     .primary_key(Key::new(
//!         QualifiedName::new("dbo", "PK_Customer"),
//!         KeyType::PrimaryKey,
//!         vec!["Id"],
//!     ));
//!
//! let sql = MsSqlDialect::new().create_table(&customer, None).unwrap();
//! assert!(sql.starts_with("CREATE TABLE [dbo].[Customer]"));
//! ```

pub mod database;
pub mod dialect;
pub mod diff;
pub mod error;
pub mod identifier;
pub mod ordering;
pub mod schema;
pub mod types;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::database::{ChangeSummary, Database, ObjectRef};
    pub use crate::dialect::{
        ConstraintKind, DdlDialect, Dialect, MsSqlDialect, MySqlDialect, PostgresDialect, SqliteDialect, dialect_for,
    };
    pub use crate::diff::{ColumnChange, KeyChange, diff, diff_columns, diff_entities, diff_keys};
    pub use crate::error::{Result, SchemaError};
    pub use crate::identifier::{Identifier, QualifiedName};
    pub use crate::ordering::{order_names, order_routines, order_tables_by_foreign_key};
    pub use crate::schema::{
        Constraint, Dependency, Field, Function, FunctionType, Key, KeyType, ObjectType,
        OperationType, SchemaObject, StoredProcedure, Table, Udtt, Uddt, View,
    };
    pub use crate::types::{FieldType, NormalizedType, TypeSpec, normalize};
}
