//! SQLite dialect.
//!
//! SQLite types are affinities, so most generic kinds collapse to a handful
//! of names. It has no procedures, functions or user-defined types, and
//! cannot alter a column or its table constraints in place. Auto-increment
//! is only expressible on an `INTEGER PRIMARY KEY` column.

use crate::error::Result;
use crate::identifier::QualifiedName;
use crate::schema::Field;
use crate::types::FieldType;

use super::{ConstraintKind, DdlDialect, Dialect, unsupported_construct, unsupported_type};

/// SQLite DDL dialect.
#[derive(Debug, Clone, Default)]
pub struct SqliteDialect;

impl SqliteDialect {
    /// Creates a new SQLite dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl DdlDialect for SqliteDialect {
    fn kind(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn generic_type_name(&self, kind: FieldType, size: i32) -> Result<String> {
        let name = match (kind, size) {
            (FieldType::Integer, 1 | 2 | 3 | 4 | 8) | (FieldType::Boolean, _) => "INTEGER",
            (FieldType::Float, 4 | 8) => "REAL",
            (FieldType::String | FieldType::UniqueIdentifier, _) => "TEXT",
            (FieldType::Decimal, _) => "NUMERIC",
            (FieldType::Datetime, _) => "DATETIME",
            (FieldType::Binary, _) => "BLOB",
            _ => return Err(unsupported_type(self.kind(), kind, size)),
        };
        Ok(name.to_string())
    }

    fn type_suffix(&self, kind: FieldType, size: i32, scale: i32) -> String {
        match kind {
            FieldType::Decimal if size > 0 => format!("({size},{scale})"),
            _ => String::new(),
        }
    }

    fn auto_increment_keyword(&self) -> Option<&'static str> {
        Some("PRIMARY KEY AUTOINCREMENT")
    }

    fn inline_auto_increment_key(&self) -> bool {
        true
    }

    fn add_table_constraint(&self, table: &QualifiedName, name: &QualifiedName, _clause: &str) -> Result<String> {
        Err(unsupported_construct(
            self.kind(),
            &format!("adding constraint {} to existing table {table}", name.name),
        ))
    }

    fn drop_table_constraint(&self, table: &QualifiedName, _kind: ConstraintKind, name: &QualifiedName) -> Result<String> {
        Err(unsupported_construct(
            self.kind(),
            &format!("dropping constraint {} from existing table {table}", name.name),
        ))
    }

    fn add_column(&self, table: &QualifiedName, field: &Field, source: Option<Dialect>) -> Result<String> {
        if field.auto_increment {
            return Err(unsupported_construct(
                self.kind(),
                &format!("adding auto-increment column {} to {table}", field.name),
            ));
        }
        Ok(format!(
            "ALTER TABLE {} ADD COLUMN {};\n",
            self.quote_name(table),
            self.field_definition(field, source)?
        ))
    }

    fn drop_stored_procedure(&self, _name: &QualifiedName) -> Result<String> {
        Err(unsupported_construct(self.kind(), "stored procedures"))
    }

    fn drop_function(&self, _name: &QualifiedName) -> Result<String> {
        Err(unsupported_construct(self.kind(), "functions"))
    }

    fn alter_column(&self, table: &QualifiedName, field: &Field, _source: Option<Dialect>) -> Result<String> {
        Err(unsupported_construct(
            self.kind(),
            &format!("altering column {} of {table}", field.name),
        ))
    }
}
