//! PostgreSQL dialect.
//!
//! User-defined scalar types become domains and table types become
//! composite types.

use crate::error::Result;
use crate::identifier::QualifiedName;
use crate::schema::{Field, Udtt, Uddt};
use crate::types::FieldType;

use super::{DdlDialect, Dialect, unsupported_type};

/// PostgreSQL DDL dialect.
#[derive(Debug, Clone, Default)]
pub struct PostgresDialect;

impl PostgresDialect {
    /// Creates a new PostgreSQL dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl DdlDialect for PostgresDialect {
    fn kind(&self) -> Dialect {
        Dialect::Postgres
    }

    fn generic_type_name(&self, kind: FieldType, size: i32) -> Result<String> {
        let name = match (kind, size) {
            (FieldType::Integer, 1 | 2) => "SMALLINT",
            (FieldType::Integer, 3 | 4) => "INTEGER",
            (FieldType::Integer, 8) => "BIGINT",
            (FieldType::Float, 4) => "REAL",
            (FieldType::Float, 8) => "DOUBLE PRECISION",
            (FieldType::String, _) => "VARCHAR",
            (FieldType::Decimal, _) => "NUMERIC",
            (FieldType::Datetime, _) => "TIMESTAMP",
            (FieldType::Boolean, _) => "BOOLEAN",
            (FieldType::UniqueIdentifier, _) => "UUID",
            (FieldType::Binary, _) => "BYTEA",
            _ => return Err(unsupported_type(self.kind(), kind, size)),
        };
        Ok(name.to_string())
    }

    fn auto_increment_keyword(&self) -> Option<&'static str> {
        Some("GENERATED BY DEFAULT AS IDENTITY")
    }

    fn create_uddt(&self, uddt: &Uddt, source: Option<Dialect>) -> Result<String> {
        Ok(format!(
            "CREATE DOMAIN {} AS {}{};\n",
            self.quote_name(&uddt.name),
            self.column_type(uddt, source)?,
            if uddt.required { " NOT NULL" } else { "" }
        ))
    }

    // Composite type attributes carry no constraints.
    fn create_udtt(&self, udtt: &Udtt, source: Option<Dialect>) -> Result<String> {
        let fields = udtt
            .fields
            .iter()
            .map(|f| -> Result<String> {
                Ok(format!(
                    "{} {}",
                    self.quote_identifier(f.name.as_str()),
                    self.column_type(f, source)?
                ))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(format!(
            "CREATE TYPE {} AS (\n\t{}\n);\n",
            self.quote_name(&udtt.name),
            fields.join(",\n\t")
        ))
    }

    fn drop_uddt(&self, name: &QualifiedName) -> Result<String> {
        Ok(format!("DROP DOMAIN IF EXISTS {};\n", self.quote_name(name)))
    }

    fn drop_udtt(&self, name: &QualifiedName) -> Result<String> {
        Ok(format!("DROP TYPE IF EXISTS {};\n", self.quote_name(name)))
    }

    fn alter_column(&self, table: &QualifiedName, field: &Field, source: Option<Dialect>) -> Result<String> {
        let column = self.quote_identifier(field.name.as_str());
        Ok(format!(
            "ALTER TABLE {} ALTER COLUMN {column} TYPE {}, ALTER COLUMN {column} {} NOT NULL;\n",
            self.quote_name(table),
            self.column_type(field, source)?,
            if field.required { "SET" } else { "DROP" }
        ))
    }
}
