//! SQL Server dialect.
//!
//! Identifiers are bracket-quoted. Drop statements are guarded with an
//! existence check so the scripts can be replayed.

use crate::error::Result;
use crate::identifier::QualifiedName;
use crate::schema::{Field, Key, Udtt, Uddt};
use crate::types::FieldType;

use super::{DdlDialect, Dialect, unsupported_type};

/// SQL Server DDL dialect.
#[derive(Debug, Clone, Default)]
pub struct MsSqlDialect;

impl MsSqlDialect {
    /// Creates a new SQL Server dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Wraps `statement` in an existence check against `sysobjects`.
    fn guarded_drop(name: &QualifiedName, condition: &str, statement: &str) -> String {
        format!(
            "IF EXISTS ( SELECT * FROM sysobjects WHERE id = object_id(N'{}') and {condition} )\nBEGIN\n\t{statement}\nEND\n\n",
            literal(&name.to_string())
        )
    }

    /// Wraps a `DROP TYPE` in an existence check against `sys.types`.
    fn guarded_drop_type(&self, name: &QualifiedName) -> String {
        format!(
            "IF EXISTS ( SELECT * FROM sys.types WHERE is_user_defined = 1 and schema_id = SCHEMA_ID(N'{}') and name = N'{}' )\nBEGIN\n\tDROP TYPE {}\nEND\n\n",
            literal(name.schema.as_str()),
            literal(name.name.as_str()),
            self.quote_name(name)
        )
    }
}

fn literal(value: &str) -> String {
    value.replace('\'', "''")
}

impl DdlDialect for MsSqlDialect {
    fn kind(&self) -> Dialect {
        Dialect::MsSql
    }

    fn quote_identifier(&self, name: &str) -> String {
        format!("[{}]", name.replace(']', "]]"))
    }

    fn generic_type_name(&self, kind: FieldType, size: i32) -> Result<String> {
        let name = match (kind, size) {
            (FieldType::Integer, 1) => "TINYINT",
            (FieldType::Integer, 2) => "SMALLINT",
            (FieldType::Integer, 3 | 4) => "INT",
            (FieldType::Integer, 8) => "BIGINT",
            (FieldType::Float, 4) => "REAL",
            (FieldType::Float, 8) => "FLOAT",
            (FieldType::String, _) => "VARCHAR",
            (FieldType::Decimal, _) => "DECIMAL",
            (FieldType::Datetime, _) => "DATETIME",
            (FieldType::Boolean, _) => "BIT",
            (FieldType::UniqueIdentifier, _) => "UNIQUEIDENTIFIER",
            (FieldType::Binary, _) => "VARBINARY",
            (FieldType::Hierarchy, _) => "HIERARCHYID",
            _ => return Err(unsupported_type(self.kind(), kind, size)),
        };
        Ok(name.to_string())
    }

    fn type_suffix(&self, kind: FieldType, size: i32, scale: i32) -> String {
        self.native_suffix(kind, size, scale)
    }

    fn auto_increment_keyword(&self) -> Option<&'static str> {
        Some("IDENTITY(1, 1)")
    }

    fn batch_separator(&self) -> Option<&'static str> {
        Some("GO")
    }

    fn create_uddt(&self, uddt: &Uddt, source: Option<Dialect>) -> Result<String> {
        Ok(format!(
            "CREATE TYPE {} FROM {} {};\n",
            self.quote_name(&uddt.name),
            self.column_type(uddt, source)?,
            if uddt.required { "NOT NULL" } else { "NULL" }
        ))
    }

    fn create_udtt(&self, udtt: &Udtt, source: Option<Dialect>) -> Result<String> {
        let fields = udtt
            .fields
            .iter()
            .map(|f| self.field_definition(f, source))
            .collect::<Result<Vec<_>>>()?;
        Ok(format!(
            "CREATE TYPE {} AS TABLE (\n\t{}\n);\n",
            self.quote_name(&udtt.name),
            fields.join(",\n\t")
        ))
    }

    fn drop_table(&self, name: &QualifiedName) -> String {
        Self::guarded_drop(
            name,
            "OBJECTPROPERTY(id, N'IsUserTable') = 1",
            &format!("DROP TABLE {}", self.quote_name(name)),
        )
    }

    fn drop_view(&self, name: &QualifiedName) -> String {
        Self::guarded_drop(
            name,
            "OBJECTPROPERTY(id, N'IsView') = 1",
            &format!("DROP VIEW {}", self.quote_name(name)),
        )
    }

    fn drop_stored_procedure(&self, name: &QualifiedName) -> Result<String> {
        Ok(Self::guarded_drop(
            name,
            "OBJECTPROPERTY(id, N'IsProcedure') = 1",
            &format!("DROP PROCEDURE {}", self.quote_name(name)),
        ))
    }

    fn drop_function(&self, name: &QualifiedName) -> Result<String> {
        Ok(Self::guarded_drop(
            name,
            "xtype IN (N'FN', N'IF', N'TF')",
            &format!("DROP FUNCTION {}", self.quote_name(name)),
        ))
    }

    fn drop_index(&self, table: &QualifiedName, key: &Key) -> String {
        format!(
            "IF EXISTS ( SELECT * FROM sys.indexes WHERE name = N'{}' and object_id = object_id(N'{}') )\nBEGIN\n\tDROP INDEX {} ON {}\nEND\n\n",
            literal(key.name.name.as_str()),
            literal(&table.to_string()),
            self.quote_identifier(key.name.name.as_str()),
            self.quote_name(table)
        )
    }

    fn drop_uddt(&self, name: &QualifiedName) -> Result<String> {
        Ok(self.guarded_drop_type(name))
    }

    fn drop_udtt(&self, name: &QualifiedName) -> Result<String> {
        Ok(self.guarded_drop_type(name))
    }

    fn add_column(&self, table: &QualifiedName, field: &Field, source: Option<Dialect>) -> Result<String> {
        Ok(format!(
            "ALTER TABLE {} ADD {};\n",
            self.quote_name(table),
            self.field_definition(field, source)?
        ))
    }

    fn alter_column(&self, table: &QualifiedName, field: &Field, source: Option<Dialect>) -> Result<String> {
        Ok(format!(
            "ALTER TABLE {} ALTER COLUMN {} {} {};\n",
            self.quote_name(table),
            self.quote_identifier(field.name.as_str()),
            self.column_type(field, source)?,
            if field.required { "NOT NULL" } else { "NULL" }
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Constraint, Key, KeyType, Table};
    use crate::types::normalize;

    fn dialect() -> MsSqlDialect {
        MsSqlDialect::new()
    }

    fn name(n: &str) -> QualifiedName {
        QualifiedName::new("dbo", n)
    }

    #[test]
    fn test_quote_identifier() {
        let d = dialect();
        assert_eq!(d.quote_identifier("Order"), "[Order]");
        assert_eq!(d.quote_identifier("odd]name"), "[odd]]name]");
        assert_eq!(d.quote_name(&name("Customer")), "[dbo].[Customer]");
    }

    #[test]
    fn test_generic_type_names() {
        let d = dialect();
        assert_eq!(d.generic_type_name(FieldType::Integer, 1).unwrap(), "TINYINT");
        assert_eq!(d.generic_type_name(FieldType::Integer, 3).unwrap(), "INT");
        assert_eq!(d.generic_type_name(FieldType::Integer, 8).unwrap(), "BIGINT");
        assert_eq!(d.generic_type_name(FieldType::Float, 8).unwrap(), "FLOAT");
        assert_eq!(d.generic_type_name(FieldType::Boolean, 1).unwrap(), "BIT");
        assert_eq!(d.generic_type_name(FieldType::Hierarchy, 1).unwrap(), "HIERARCHYID");
        assert!(d.generic_type_name(FieldType::Integer, 5).unwrap_err().is_datatype_error());
        assert!(d.generic_type_name(FieldType::Float, 2).is_err());
        assert!(d.generic_type_name(FieldType::Undefined, 0).is_err());
    }

    #[test]
    fn test_column_type_suffixes() {
        let d = dialect();
        let name_field = Field::new("Name", FieldType::String, 50);
        assert_eq!(d.column_type(&name_field, None).unwrap(), "VARCHAR(50)");

        let notes = Field::new("Notes", FieldType::String, -1);
        assert_eq!(d.column_type(&notes, None).unwrap(), "VARCHAR(MAX)");

        let total = Field::new("Total", FieldType::Decimal, 18).scale(2);
        assert_eq!(d.column_type(&total, None).unwrap(), "DECIMAL(18,2)");
    }

    #[test]
    fn test_native_round_trip() {
        let d = dialect();
        for (native, size, precision, scale, expected) in [
            ("nvarchar", 50, 0, 0, "nvarchar(50)"),
            ("nvarchar", -1, 0, 0, "nvarchar(MAX)"),
            ("money", 8, 19, 4, "money"),
            ("decimal", 9, 18, 2, "decimal(18,2)"),
            ("datetime2", 8, 0, 0, "datetime2"),
            ("sysname", 256, 0, 0, "sysname"),
            ("uniqueidentifier", 16, 0, 0, "uniqueidentifier"),
        ] {
            let spec = normalize(native, size, precision, scale, None, &[]).unwrap();
            assert_eq!(d.type_name(&spec, Some(Dialect::MsSql)).unwrap(), native);
            assert_eq!(d.column_type(&spec, Some(Dialect::MsSql)).unwrap(), expected);
        }
    }

    #[test]
    fn test_native_name_ignored_for_foreign_source() {
        let d = dialect();
        let spec = normalize("mediumint", 3, 0, 0, None, &[]).unwrap();
        assert_eq!(d.column_type(&spec, Some(Dialect::MySql)).unwrap(), "INT");
    }

    #[test]
    fn test_create_table() {
        let table = Table::new(name("Customer"))
            .field(Field::new("Id", FieldType::Integer, 4).required().auto_increment())
            .field(Field::new("Email", FieldType::String, 255).required())
            .field(Field::new("Status", FieldType::String, 10).default_value("('new')"))
            .field(Field::new("Age", FieldType::Integer, 2))
            .primary_key(Key::new(name("PK_Customer"), KeyType::PrimaryKey, vec!["Id"]))
            .key(Key::new(name("UX_Customer_Email"), KeyType::Unique, vec!["Email"]))
            .key(Key::new(name("IX_Customer_Age"), KeyType::Index, vec!["Age"]))
            .constraint(Constraint::new(name("CK_Age"), name("Customer"), "([Age]>(0))"));

        let sql = dialect().create_table(&table, None).unwrap();
        assert_eq!(
            sql,
            "CREATE TABLE [dbo].[Customer] (\n\
             \t[Id] INT NOT NULL IDENTITY(1, 1),\n\
             \t[Email] VARCHAR(255) NOT NULL,\n\
             \t[Status] VARCHAR(10) NULL DEFAULT ('new'),\n\
             \t[Age] SMALLINT NULL,\n\
             \tPRIMARY KEY ([Id]),\n\
             \tCONSTRAINT [CK_Age] CHECK ([Age]>(0))\n\
             );\n\
             CREATE UNIQUE INDEX [UX_Customer_Email] ON [dbo].[Customer] ([Email]);\n\
             CREATE INDEX [IX_Customer_Age] ON [dbo].[Customer] ([Age]);\n"
        );
    }

    #[test]
    fn test_create_table_with_foreign_key() {
        let table = Table::new(name("Address"))
            .field(Field::new("Id", FieldType::Integer, 4).required())
            .field(Field::new("CustomerId", FieldType::Integer, 4).required())
            .foreign_key(Key::foreign(
                name("FK_Address_Customer"),
                vec!["CustomerId"],
                name("Customer"),
                vec!["Id"],
            ));
        let sql = dialect().create_table(&table, None).unwrap();
        assert!(sql.contains("FOREIGN KEY ([CustomerId]) REFERENCES [dbo].[Customer]([Id])"));
    }

    #[test]
    fn test_create_uddt() {
        let uddt = Uddt::new(name("Email"), FieldType::String, 255);
        assert_eq!(
            dialect().create_uddt(&uddt, None).unwrap(),
            "CREATE TYPE [dbo].[Email] FROM VARCHAR(255) NULL;\n"
        );
    }

    #[test]
    fn test_create_udtt() {
        let udtt = Udtt::new(name("IdList"))
            .field(Field::new("Id", FieldType::Integer, 4).required())
            .field(Field::new("Label", FieldType::String, 20));
        assert_eq!(
            dialect().create_udtt(&udtt, None).unwrap(),
            "CREATE TYPE [dbo].[IdList] AS TABLE (\n\t[Id] INT NOT NULL,\n\t[Label] VARCHAR(20) NULL\n);\n"
        );
    }

    #[test]
    fn test_guarded_drop_procedure() {
        assert_eq!(
            dialect().drop_stored_procedure(&name("GetOrders")).unwrap(),
            "IF EXISTS ( SELECT * FROM sysobjects WHERE id = object_id(N'dbo.GetOrders') and \
             OBJECTPROPERTY(id, N'IsProcedure') = 1 )\nBEGIN\n\tDROP PROCEDURE [dbo].[GetOrders]\nEND\n\n"
        );
    }

    #[test]
    fn test_drop_index_checks_sys_indexes() {
        let key = Key::new(name("IX_Customer_Name"), KeyType::Index, vec!["Name"]);
        let sql = dialect().drop_key(&name("Customer"), &key).unwrap();
        assert!(sql.starts_with(
            "IF EXISTS ( SELECT * FROM sys.indexes WHERE name = N'IX_Customer_Name' and object_id = object_id(N'dbo.Customer') )"
        ));
        assert!(sql.contains("DROP INDEX [IX_Customer_Name] ON [dbo].[Customer]"));
    }

    #[test]
    fn test_drop_type_checks_sys_types() {
        let sql = dialect().drop_uddt(&name("Email")).unwrap();
        assert!(sql.contains("FROM sys.types"));
        assert!(sql.contains("DROP TYPE [dbo].[Email]"));
    }

    #[test]
    fn test_column_changes() {
        let d = dialect();
        let table = name("Customer");
        let field = Field::new("Phone", FieldType::String, 20);
        assert_eq!(
            d.add_column(&table, &field, None).unwrap(),
            "ALTER TABLE [dbo].[Customer] ADD [Phone] VARCHAR(20) NULL;\n"
        );
        assert_eq!(
            d.alter_column(&table, &field.clone().required(), None).unwrap(),
            "ALTER TABLE [dbo].[Customer] ALTER COLUMN [Phone] VARCHAR(20) NOT NULL;\n"
        );
        assert_eq!(
            d.drop_column(&table, "Phone"),
            "ALTER TABLE [dbo].[Customer] DROP COLUMN [Phone];\n"
        );
    }
}
