//! Dialect implementations.
//!
//! Each dialect turns generic types back into DDL type names and produces
//! the DDL fragments the script writer assembles.

mod mssql;
mod mysql;
mod postgres;
mod sqlite;

pub use mssql::MsSqlDialect;
pub use mysql::MySqlDialect;
pub use postgres::PostgresDialect;
pub use sqlite::SqliteDialect;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SchemaError};
use crate::identifier::QualifiedName;
use crate::schema::{Constraint, Field, Function, Key, KeyType, StoredProcedure, Table, Udtt, Uddt, View};
use crate::types::{FieldType, TypeSpec, takes_length};

/// Supported SQL dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    MsSql,
    MySql,
    Postgres,
    Sqlite,
}

impl Dialect {
    /// Every dialect.
    pub const ALL: [Self; 4] = [Self::MsSql, Self::MySql, Self::Postgres, Self::Sqlite];

    /// Returns the canonical short name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MsSql => "mssql",
            Self::MySql => "mysql",
            Self::Postgres => "postgres",
            Self::Sqlite => "sqlite",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dialect {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "mssql" | "sqlserver" => Ok(Self::MsSql),
            "mysql" => Ok(Self::MySql),
            "pgsql" | "postgres" | "postgresql" => Ok(Self::Postgres),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(SchemaError::data(format!("Unknown dialect {other}"))),
        }
    }
}

/// Returns the DDL producer for `dialect`.
#[must_use]
pub fn dialect_for(dialect: Dialect) -> Box<dyn DdlDialect> {
    match dialect {
        Dialect::MsSql => Box::new(MsSqlDialect::new()),
        Dialect::MySql => Box::new(MySqlDialect::new()),
        Dialect::Postgres => Box::new(PostgresDialect::new()),
        Dialect::Sqlite => Box::new(SqliteDialect::new()),
    }
}

/// Error for a generic kind and size with no rule in a dialect.
pub(crate) fn unsupported_type(dialect: Dialect, kind: FieldType, size: i32) -> SchemaError {
    SchemaError::datatype(format!("{dialect} has no type for {kind} of size {size}"))
}

/// Error for a construct a dialect cannot express.
pub(crate) fn unsupported_construct(dialect: Dialect, construct: &str) -> SchemaError {
    SchemaError::data(format!("{dialect} does not support {construct}"))
}

/// Removes parentheses wrapping the whole expression, as catalogs report
/// defaults and check clauses (`((0))`, `('n/a')`).
#[must_use]
pub fn strip_wrapping_parens(expression: &str) -> &str {
    let mut current = expression.trim();
    while current.starts_with('(') && current.ends_with(')') && closes_at_end(current) {
        current = current[1..current.len() - 1].trim();
    }
    current
}

fn closes_at_end(expression: &str) -> bool {
    let mut depth = 0usize;
    for (i, c) in expression.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return i == expression.len() - 1;
                }
            }
            _ => {}
        }
    }
    false
}

/// Renders a default expression. Literals of kinds with quoted defaults are
/// quoted unless they already are, or are a function call or a
/// parenthesised expression.
#[must_use]
pub fn default_literal(kind: FieldType, raw: &str) -> String {
    let value = strip_wrapping_parens(raw);
    let quoted = value.ends_with('\'') && (value.starts_with('\'') || value.starts_with("N'"));
    if kind.quotes_default() && !quoted && !is_expression(value) {
        format!("'{}'", value.replace('\'', "''"))
    } else {
        value.to_string()
    }
}

/// True for `name(...)` calls and `(...) op (...)` expressions.
fn is_expression(value: &str) -> bool {
    if value.starts_with('(') {
        return true;
    }
    let Some(open) = value.find('(') else {
        return false;
    };
    let callee = value[..open].trim_end();
    let mut chars = callee.chars();
    let starts_like_name = chars.next().is_some_and(|c| c.is_alphabetic() || c == '_');
    starts_like_name
        && chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '.'))
        && closes_at_end(&value[open..])
}

/// Table-level constraint kinds that are dropped by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    PrimaryKey,
    ForeignKey,
    Check,
}

fn check_clause(constraint: &Constraint) -> String {
    format!("CHECK ({})", strip_wrapping_parens(&constraint.definition))
}

/// DDL production for one dialect.
pub trait DdlDialect: Send + Sync {
    /// Dialect produced by this implementation.
    fn kind(&self) -> Dialect;

    /// Returns the dialect name.
    fn name(&self) -> &'static str {
        self.kind().as_str()
    }

    /// Quotes a single identifier.
    fn quote_identifier(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    /// Quotes a qualified name part by part.
    fn quote_name(&self, name: &QualifiedName) -> String {
        if name.schema.is_empty() {
            self.quote_identifier(name.name.as_str())
        } else {
            format!(
                "{}.{}",
                self.quote_identifier(name.schema.as_str()),
                self.quote_identifier(name.name.as_str())
            )
        }
    }

    /// Canonical type name for a generic kind.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Datatype`] for kinds or sizes with no rule.
    fn generic_type_name(&self, kind: FieldType, size: i32) -> Result<String>;

    /// Suffix appended to a canonical type name.
    fn type_suffix(&self, kind: FieldType, size: i32, scale: i32) -> String {
        match kind {
            FieldType::String if size > 0 => format!("({size})"),
            FieldType::Decimal if size > 0 => format!("({size},{scale})"),
            _ => String::new(),
        }
    }

    /// Suffix appended to a preserved native type name that takes a length.
    fn native_suffix(&self, kind: FieldType, size: i32, scale: i32) -> String {
        match kind {
            FieldType::String | FieldType::Binary if size < 0 => "(MAX)".to_string(),
            FieldType::String | FieldType::Binary if size > 0 => format!("({size})"),
            FieldType::Decimal if size > 0 => format!("({size},{scale})"),
            _ => String::new(),
        }
    }

    /// Keyword marking an auto-increment column, if the dialect has one.
    fn auto_increment_keyword(&self) -> Option<&'static str>;

    /// Whether an auto-increment column declares the primary key inline,
    /// replacing the table-level `PRIMARY KEY` clause.
    fn inline_auto_increment_key(&self) -> bool {
        false
    }

    /// Line separating batches in a script, for dialects whose routine
    /// bodies must start a batch.
    fn batch_separator(&self) -> Option<&'static str> {
        None
    }

    /// Type name for `spec` without size suffix.
    ///
    /// A preserved native name is returned verbatim when the spec was
    /// imported from this same dialect.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Datatype`] if the generic kind has no rule.
    fn type_name(&self, spec: &dyn TypeSpec, source: Option<Dialect>) -> Result<String> {
        if source == Some(self.kind()) {
            if let Some(native) = spec.native_type() {
                return Ok(native.to_string());
            }
        }
        self.generic_type_name(spec.generic_type(), spec.size())
    }

    /// Type name for `spec` including its size suffix.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Datatype`] if the generic kind has no rule.
    fn column_type(&self, spec: &dyn TypeSpec, source: Option<Dialect>) -> Result<String> {
        let name = self.type_name(spec, source)?;
        let preserved = source == Some(self.kind()) && spec.native_type().is_some();
        let suffix = if !preserved {
            self.type_suffix(spec.generic_type(), spec.size(), spec.scale())
        } else if takes_length(&name) {
            self.native_suffix(spec.generic_type(), spec.size(), spec.scale())
        } else {
            String::new()
        };
        Ok(format!("{name}{suffix}"))
    }

    /// Column definition: `name type NULL|NOT NULL [auto-increment] [DEFAULT (...)]`.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Datatype`] if the column type has no rule.
    fn field_definition(&self, field: &Field, source: Option<Dialect>) -> Result<String> {
        let mut sql = format!(
            "{} {} {}",
            self.quote_identifier(field.name.as_str()),
            self.column_type(field, source)?,
            if field.required { "NOT NULL" } else { "NULL" }
        );
        if field.auto_increment {
            if let Some(keyword) = self.auto_increment_keyword() {
                sql.push(' ');
                sql.push_str(keyword);
            }
        }
        if let Some(default) = &field.default {
            sql.push_str(&format!(" DEFAULT ({})", default_literal(field.generic_type, default)));
        }
        Ok(sql)
    }

    /// Quotes and joins a column list.
    fn column_list(&self, columns: &[String]) -> String {
        columns
            .iter()
            .map(|c| self.quote_identifier(c))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// `CREATE INDEX` statement for an index, unique or lookup key.
    fn create_index(&self, table: &QualifiedName, key: &Key) -> String {
        format!(
            "CREATE {}INDEX {} ON {} ({});\n",
            if key.key_type == KeyType::Unique { "UNIQUE " } else { "" },
            self.quote_identifier(key.name.name.as_str()),
            self.quote_name(table),
            self.column_list(&key.fields)
        )
    }

    /// `FOREIGN KEY (...) REFERENCES target(...)` clause.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Data`] if the key has no target table.
    fn foreign_key_clause(&self, table: &QualifiedName, fk: &Key) -> Result<String> {
        let target = fk
            .primary_table
            .as_ref()
            .ok_or_else(|| SchemaError::data(format!("Foreign key {} on {table} has no target table", fk.name)))?;
        Ok(format!(
            "FOREIGN KEY ({}) REFERENCES {}({})",
            self.column_list(&fk.fields),
            self.quote_name(target),
            self.column_list(&fk.primary_fields)
        ))
    }

    /// `CREATE TABLE` statement followed by the table's indexes.
    ///
    /// # Errors
    ///
    /// Returns an error if a column type has no rule, a foreign key has no
    /// target table, or an auto-increment column cannot be expressed.
    fn create_table(&self, table: &Table, source: Option<Dialect>) -> Result<String> {
        let inline_key = self.inline_auto_increment_key() && table.fields.iter().any(|f| f.auto_increment);
        if inline_key {
            for field in table.fields.iter().filter(|f| f.auto_increment) {
                let single_key = table
                    .pk
                    .as_ref()
                    .is_some_and(|pk| pk.fields.len() == 1 && field.name.matches(&pk.fields[0]));
                if !single_key {
                    return Err(unsupported_construct(
                        self.kind(),
                        &format!(
                            "auto-increment column {} of {} outside a single-column primary key",
                            field.name, table.name
                        ),
                    ));
                }
            }
        }

        let mut lines = table
            .fields
            .iter()
            .map(|f| self.field_definition(f, source))
            .collect::<Result<Vec<_>>>()?;

        if let Some(pk) = table.pk.as_ref().filter(|_| !inline_key) {
            lines.push(format!("PRIMARY KEY ({})", self.column_list(&pk.fields)));
        }

        for fk in table.all_foreign_keys() {
            lines.push(self.foreign_key_clause(&table.name, fk)?);
        }

        for constraint in &table.constraints {
            lines.push(format!(
                "CONSTRAINT {} {}",
                self.quote_identifier(constraint.name.name.as_str()),
                check_clause(constraint)
            ));
        }

        let mut sql = format!(
            "CREATE TABLE {} (\n\t{}\n);\n",
            self.quote_name(&table.name),
            lines.join(",\n\t")
        );

        for key in &table.keys {
            if matches!(key.key_type, KeyType::Unique | KeyType::Index | KeyType::Lookup) {
                sql.push_str(&self.create_index(&table.name, key));
            }
        }

        Ok(sql)
    }

    /// View body, verbatim.
    fn create_view(&self, view: &View) -> String {
        view.definition.clone()
    }

    /// Procedure body, verbatim.
    fn create_stored_procedure(&self, procedure: &StoredProcedure) -> String {
        procedure.text.clone()
    }

    /// Function body, verbatim.
    fn create_function(&self, function: &Function) -> String {
        function.text.clone()
    }

    /// Statement creating a user-defined scalar type.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Data`] where the dialect has no such construct.
    fn create_uddt(&self, _uddt: &Uddt, _source: Option<Dialect>) -> Result<String> {
        Err(unsupported_construct(self.kind(), "user-defined data types"))
    }

    /// Statement creating a user-defined table type.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Data`] where the dialect has no such construct.
    fn create_udtt(&self, _udtt: &Udtt, _source: Option<Dialect>) -> Result<String> {
        Err(unsupported_construct(self.kind(), "user-defined table types"))
    }

    fn drop_table(&self, name: &QualifiedName) -> String {
        format!("DROP TABLE IF EXISTS {};\n", self.quote_name(name))
    }

    fn drop_view(&self, name: &QualifiedName) -> String {
        format!("DROP VIEW IF EXISTS {};\n", self.quote_name(name))
    }

    /// # Errors
    ///
    /// Returns [`SchemaError::Data`] where the dialect has no procedures.
    fn drop_stored_procedure(&self, name: &QualifiedName) -> Result<String> {
        Ok(format!("DROP PROCEDURE IF EXISTS {};\n", self.quote_name(name)))
    }

    /// # Errors
    ///
    /// Returns [`SchemaError::Data`] where the dialect has no functions.
    fn drop_function(&self, name: &QualifiedName) -> Result<String> {
        Ok(format!("DROP FUNCTION IF EXISTS {};\n", self.quote_name(name)))
    }

    /// # Errors
    ///
    /// Returns [`SchemaError::Data`] where the dialect has no such construct.
    fn drop_uddt(&self, _name: &QualifiedName) -> Result<String> {
        Err(unsupported_construct(self.kind(), "user-defined data types"))
    }

    /// # Errors
    ///
    /// Returns [`SchemaError::Data`] where the dialect has no such construct.
    fn drop_udtt(&self, _name: &QualifiedName) -> Result<String> {
        Err(unsupported_construct(self.kind(), "user-defined table types"))
    }

    /// `DROP INDEX` for an index, unique or lookup key.
    fn drop_index(&self, table: &QualifiedName, key: &Key) -> String {
        let index = QualifiedName::new(table.schema.clone(), key.name.name.clone());
        format!("DROP INDEX IF EXISTS {};\n", self.quote_name(&index))
    }

    /// `ALTER TABLE ... ADD CONSTRAINT name <clause>`.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Data`] where the dialect cannot add
    /// constraints to an existing table.
    fn add_table_constraint(&self, table: &QualifiedName, name: &QualifiedName, clause: &str) -> Result<String> {
        Ok(format!(
            "ALTER TABLE {} ADD CONSTRAINT {} {clause};\n",
            self.quote_name(table),
            self.quote_identifier(name.name.as_str())
        ))
    }

    /// # Errors
    ///
    /// Returns [`SchemaError::Data`] where the dialect cannot drop
    /// constraints from an existing table.
    fn drop_table_constraint(&self, table: &QualifiedName, _kind: ConstraintKind, name: &QualifiedName) -> Result<String> {
        Ok(format!(
            "ALTER TABLE {} DROP CONSTRAINT {};\n",
            self.quote_name(table),
            self.quote_identifier(name.name.as_str())
        ))
    }

    /// Statement adding `key` to an existing table.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Data`] for untyped keys, foreign keys without a
    /// target, or constraints the dialect cannot add.
    fn add_key(&self, table: &QualifiedName, key: &Key) -> Result<String> {
        match key.key_type {
            KeyType::PrimaryKey => self.add_table_constraint(
                table,
                &key.name,
                &format!("PRIMARY KEY ({})", self.column_list(&key.fields)),
            ),
            KeyType::ForeignKey => self.add_table_constraint(table, &key.name, &self.foreign_key_clause(table, key)?),
            KeyType::Unique | KeyType::Index | KeyType::Lookup => Ok(self.create_index(table, key)),
            KeyType::Undefined => Err(SchemaError::data(format!("Key {} on {table} has no type", key.name))),
        }
    }

    /// Statement removing `key` from an existing table.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Data`] for untyped keys or constraints the
    /// dialect cannot drop.
    fn drop_key(&self, table: &QualifiedName, key: &Key) -> Result<String> {
        match key.key_type {
            KeyType::PrimaryKey => self.drop_table_constraint(table, ConstraintKind::PrimaryKey, &key.name),
            KeyType::ForeignKey => self.drop_table_constraint(table, ConstraintKind::ForeignKey, &key.name),
            KeyType::Unique | KeyType::Index | KeyType::Lookup => Ok(self.drop_index(table, key)),
            KeyType::Undefined => Err(SchemaError::data(format!("Key {} on {table} has no type", key.name))),
        }
    }

    /// # Errors
    ///
    /// Returns [`SchemaError::Data`] where the dialect cannot add checks to
    /// an existing table.
    fn add_check(&self, table: &QualifiedName, constraint: &Constraint) -> Result<String> {
        self.add_table_constraint(table, &constraint.name, &check_clause(constraint))
    }

    /// # Errors
    ///
    /// Returns [`SchemaError::Data`] where the dialect cannot drop checks
    /// from an existing table.
    fn drop_check(&self, table: &QualifiedName, constraint: &Constraint) -> Result<String> {
        self.drop_table_constraint(table, ConstraintKind::Check, &constraint.name)
    }

    /// # Errors
    ///
    /// Returns [`SchemaError::Datatype`] if the column type has no rule.
    fn add_column(&self, table: &QualifiedName, field: &Field, source: Option<Dialect>) -> Result<String> {
        Ok(format!(
            "ALTER TABLE {} ADD COLUMN {};\n",
            self.quote_name(table),
            self.field_definition(field, source)?
        ))
    }

    fn drop_column(&self, table: &QualifiedName, column: &str) -> String {
        format!(
            "ALTER TABLE {} DROP COLUMN {};\n",
            self.quote_name(table),
            self.quote_identifier(column)
        )
    }

    /// Statement changing an existing column to `field`'s type and
    /// nullability.
    ///
    /// # Errors
    ///
    /// Returns an error if the column type has no rule or the dialect cannot
    /// alter columns.
    fn alter_column(&self, table: &QualifiedName, field: &Field, source: Option<Dialect>) -> Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_parse() {
        assert_eq!("pgsql".parse::<Dialect>().unwrap(), Dialect::Postgres);
        assert_eq!("PostgreSQL".parse::<Dialect>().unwrap(), Dialect::Postgres);
        assert_eq!("MSSQL".parse::<Dialect>().unwrap(), Dialect::MsSql);
        assert!("oracle".parse::<Dialect>().unwrap_err().is_data_error());
        for dialect in Dialect::ALL {
            assert_eq!(dialect.as_str().parse::<Dialect>().unwrap(), dialect);
            assert_eq!(dialect_for(dialect).kind(), dialect);
        }
    }

    #[test]
    fn test_strip_wrapping_parens() {
        assert_eq!(strip_wrapping_parens("((0))"), "0");
        assert_eq!(strip_wrapping_parens("('n/a')"), "'n/a'");
        assert_eq!(strip_wrapping_parens("([Age]>(0))"), "[Age]>(0)");
        assert_eq!(strip_wrapping_parens("(a) + (b)"), "(a) + (b)");
        assert_eq!(strip_wrapping_parens("getdate()"), "getdate()");
    }

    #[test]
    fn test_default_literal() {
        assert_eq!(default_literal(FieldType::String, "('n/a')"), "'n/a'");
        assert_eq!(default_literal(FieldType::String, "O'Brien"), "'O''Brien'");
        assert_eq!(default_literal(FieldType::Datetime, "(getdate())"), "getdate()");
        assert_eq!(default_literal(FieldType::Integer, "((0))"), "0");
        assert_eq!(default_literal(FieldType::String, "nextval('seq'::regclass)"), "nextval('seq'::regclass)");
        assert_eq!(default_literal(FieldType::String, "(a) || (b)"), "(a) || (b)");
    }

    #[test]
    fn test_default_literal_with_parens_inside_text() {
        assert_eq!(default_literal(FieldType::String, "N/A (none)"), "'N/A (none)'");
        assert_eq!(default_literal(FieldType::String, "see (1) and (2)"), "'see (1) and (2)'");
        assert_eq!(default_literal(FieldType::String, "f(x) + 1"), "'f(x) + 1'");
    }

    #[test]
    fn test_key_statements() {
        let d = PostgresDialect::new();
        let table = QualifiedName::new("public", "orders");
        let index = Key::new(QualifiedName::new("public", "ix_orders_date"), KeyType::Index, vec!["placed_at"]);
        assert_eq!(
            d.add_key(&table, &index).unwrap(),
            "CREATE INDEX \"ix_orders_date\" ON \"public\".\"orders\" (\"placed_at\");\n"
        );
        assert_eq!(
            d.drop_key(&table, &index).unwrap(),
            "DROP INDEX IF EXISTS \"public\".\"ix_orders_date\";\n"
        );

        let fk = Key::foreign(
            QualifiedName::new("public", "fk_orders_customer"),
            vec!["customer_id"],
            QualifiedName::new("public", "customer"),
            vec!["id"],
        );
        assert_eq!(
            d.add_key(&table, &fk).unwrap(),
            "ALTER TABLE \"public\".\"orders\" ADD CONSTRAINT \"fk_orders_customer\" \
             FOREIGN KEY (\"customer_id\") REFERENCES \"public\".\"customer\"(\"id\");\n"
        );
        assert_eq!(
            d.drop_key(&table, &fk).unwrap(),
            "ALTER TABLE \"public\".\"orders\" DROP CONSTRAINT \"fk_orders_customer\";\n"
        );

        let check = Constraint::new(QualifiedName::new("public", "ck_total"), table.clone(), "(total >= 0)");
        assert_eq!(
            d.add_check(&table, &check).unwrap(),
            "ALTER TABLE \"public\".\"orders\" ADD CONSTRAINT \"ck_total\" CHECK (total >= 0);\n"
        );

        let untyped = Key::new(QualifiedName::new("public", "k"), KeyType::Undefined, vec!["id"]);
        assert!(d.add_key(&table, &untyped).unwrap_err().is_data_error());
    }
}
