//! MySQL dialect.

use crate::error::Result;
use crate::identifier::QualifiedName;
use crate::schema::{Field, Key};
use crate::types::FieldType;

use super::{ConstraintKind, DdlDialect, Dialect, unsupported_type};

/// MySQL DDL dialect.
#[derive(Debug, Clone, Default)]
pub struct MySqlDialect;

impl MySqlDialect {
    /// Creates a new MySQL dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl DdlDialect for MySqlDialect {
    fn kind(&self) -> Dialect {
        Dialect::MySql
    }

    fn quote_identifier(&self, name: &str) -> String {
        format!("`{}`", name.replace('`', "``"))
    }

    fn generic_type_name(&self, kind: FieldType, size: i32) -> Result<String> {
        let name = match (kind, size) {
            (FieldType::Integer, 1) => "TINYINT",
            (FieldType::Integer, 2) => "SMALLINT",
            (FieldType::Integer, 3) => "MEDIUMINT",
            (FieldType::Integer, 4) => "INT",
            (FieldType::Integer, 8) => "BIGINT",
            (FieldType::Float, 4) => "FLOAT",
            (FieldType::Float, 8) => "DOUBLE",
            // VARCHAR needs a length
            (FieldType::String, s) if s <= 0 => "TEXT",
            (FieldType::String, _) => "VARCHAR",
            (FieldType::Decimal, _) => "DECIMAL",
            (FieldType::Datetime, _) => "DATETIME",
            (FieldType::Boolean, _) => "TINYINT",
            (FieldType::UniqueIdentifier, _) => "CHAR(36)",
            (FieldType::Binary, _) => "BLOB",
            _ => return Err(unsupported_type(self.kind(), kind, size)),
        };
        Ok(name.to_string())
    }

    fn auto_increment_keyword(&self) -> Option<&'static str> {
        Some("AUTO_INCREMENT")
    }

    fn drop_index(&self, table: &QualifiedName, key: &Key) -> String {
        format!(
            "DROP INDEX {} ON {};\n",
            self.quote_identifier(key.name.name.as_str()),
            self.quote_name(table)
        )
    }

    fn drop_table_constraint(&self, table: &QualifiedName, kind: ConstraintKind, name: &QualifiedName) -> Result<String> {
        let clause = match kind {
            ConstraintKind::PrimaryKey => "PRIMARY KEY".to_string(),
            ConstraintKind::ForeignKey => format!("FOREIGN KEY {}", self.quote_identifier(name.name.as_str())),
            ConstraintKind::Check => format!("CHECK {}", self.quote_identifier(name.name.as_str())),
        };
        Ok(format!("ALTER TABLE {} DROP {clause};\n", self.quote_name(table)))
    }

    fn alter_column(&self, table: &QualifiedName, field: &Field, source: Option<Dialect>) -> Result<String> {
        Ok(format!(
            "ALTER TABLE {} MODIFY COLUMN {};\n",
            self.quote_name(table),
            self.field_definition(field, source)?
        ))
    }
}
