//! SQLite catalog importer.

use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;
use std::sync::LazyLock;

use ddl_forge_core::prelude::*;
use ddl_forge_core::dialect::strip_wrapping_parens;
use ddl_forge_core::types::builtin_type;
use regex::Regex;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::{debug, info};

use super::SchemaAdaptor;
use crate::connection::{ConnectionString, SqliteLocation};
use crate::error::Result;
use crate::options::{ImportCategory, ImportOptions};

static DECLARED_TYPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([A-Za-z_][A-Za-z0-9_ ]*?)\s*(?:\(\s*(\d+)\s*(?:,\s*(\d+)\s*)?\))?\s*$")
        .expect("declared type pattern is valid")
});

static CHECK_CLAUSE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(?:CONSTRAINT\s+["`\[]?(\w+)["`\]]?\s+)?CHECK\s*\("#)
        .expect("check clause pattern is valid")
});

static AUTOINCREMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bAUTOINCREMENT\b").expect("autoincrement pattern is valid"));

type ColumnRow = (i64, String, String, i64, Option<String>, i64);
type ForeignKeyRow = (i64, i64, String, String, Option<String>);

/// Imports tables, keys, constraints and views from a SQLite database.
#[derive(Debug, Clone)]
pub struct SqliteAdaptor {
    pool: SqlitePool,
    default_name: String,
}

impl SqliteAdaptor {
    /// Opens the database named by `connection`. Files are opened read-only.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::ForgeError::Database`] if the file cannot be
    /// opened.
    pub async fn connect(connection: &ConnectionString) -> Result<Self> {
        let (options, default_name) = match connection.sqlite_location() {
            Some(SqliteLocation::File(path)) => (
                SqliteConnectOptions::new().filename(&path).read_only(true),
                database_name(&path),
            ),
            _ => (SqliteConnectOptions::from_str("sqlite::memory:")?, "memory".to_string()),
        };
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        info!(database = %default_name, "Connected to SQLite catalog");
        Ok(Self { pool, default_name })
    }

    /// Wraps an existing pool.
    pub fn from_pool(pool: SqlitePool, name: impl Into<String>) -> Self {
        Self {
            pool,
            default_name: name.into(),
        }
    }

    async fn import_tables(&self, options: &ImportOptions) -> Result<Vec<Table>> {
        let rows: Vec<(String, Option<String>)> = sqlx::query_as(
            "SELECT name, sql FROM sqlite_master \
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut tables = Vec::with_capacity(rows.len());
        for (name, sql) in rows {
            let sql = sql.unwrap_or_default();
            let mut table = Table::new(QualifiedName::unqualified(name.as_str()));

            let columns = self.columns(&name).await?;
            let autoincrement = AUTOINCREMENT.is_match(&sql);
            let mut pk_columns: Vec<(i64, String)> = Vec::new();
            for (_, column, _, _, _, pk) in &columns {
                if *pk > 0 {
                    pk_columns.push((*pk, column.clone()));
                }
            }
            let rowid_alias = pk_columns.len() == 1;
            for (_, column, declared, not_null, default, pk) in columns {
                let auto_increment = autoincrement && rowid_alias && pk > 0;
                table.fields.push(field_from_declared(
                    &column,
                    &declared,
                    not_null != 0,
                    auto_increment,
                    default.as_deref(),
                )?);
            }

            if !options.excludes(ImportCategory::PrimaryKeys) && !pk_columns.is_empty() {
                pk_columns.sort_by_key(|(position, _)| *position);
                table.pk = Some(Key::new(
                    QualifiedName::unqualified(format!("PK_{name}")),
                    KeyType::PrimaryKey,
                    pk_columns.into_iter().map(|(_, column)| column).collect(),
                ));
            }
            table.keys = self.indexes(&name).await?;
            if !options.excludes(ImportCategory::ForeignKeys) {
                table.foreign_keys = self.foreign_keys(&name).await?;
            }
            if !options.excludes(ImportCategory::Constraints) {
                table.constraints = check_constraints(&table.name, &sql);
            }

            debug!(
                table = %table.name,
                fields = table.fields.len(),
                keys = table.keys.len(),
                foreign_keys = table.foreign_keys.len(),
                "Imported table"
            );
            tables.push(table);
        }
        resolve_implicit_targets(&mut tables);
        Ok(tables)
    }

    async fn columns(&self, table: &str) -> Result<Vec<ColumnRow>> {
        Ok(sqlx::query_as(
            r#"SELECT cid, name, type, "notnull", dflt_value, pk FROM pragma_table_info(?) ORDER BY cid"#,
        )
        .bind(table)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn indexes(&self, table: &str) -> Result<Vec<Key>> {
        let rows: Vec<(String, i64, String)> =
            sqlx::query_as(r#"SELECT name, "unique", origin FROM pragma_index_list(?)"#)
                .bind(table)
                .fetch_all(&self.pool)
                .await?;

        let mut keys = Vec::new();
        for (name, unique, origin) in rows {
            if origin == "pk" {
                continue;
            }
            let columns: Vec<(Option<String>,)> =
                sqlx::query_as("SELECT name FROM pragma_index_info(?) ORDER BY seqno")
                    .bind(&name)
                    .fetch_all(&self.pool)
                    .await?;
            let Some(columns) = columns.into_iter().map(|(column,)| column).collect::<Option<Vec<_>>>()
            else {
                debug!(index = %name, "Skipping expression index");
                continue;
            };
            let key_type = if unique != 0 { KeyType::Unique } else { KeyType::Index };
            // Names of automatic indexes are reserved by SQLite.
            let name = if name.starts_with("sqlite_autoindex_") {
                format!("UQ_{table}_{}", keys.len() + 1)
            } else {
                name
            };
            keys.push(Key::new(QualifiedName::unqualified(name), key_type, columns));
        }
        Ok(keys)
    }

    async fn foreign_keys(&self, table: &str) -> Result<Vec<Key>> {
        let rows: Vec<ForeignKeyRow> = sqlx::query_as(
            r#"SELECT id, seq, "table", "from", "to" FROM pragma_foreign_key_list(?) ORDER BY id, seq"#,
        )
        .bind(table)
        .fetch_all(&self.pool)
        .await?;

        let mut grouped: BTreeMap<i64, Key> = BTreeMap::new();
        for (id, _, target, from, to) in rows {
            let key = grouped.entry(id).or_insert_with(|| {
                Key::foreign(
                    QualifiedName::unqualified(format!("FK_{table}_{id}")),
                    Vec::<String>::new(),
                    QualifiedName::unqualified(target.as_str()),
                    Vec::<String>::new(),
                )
            });
            key.fields.push(from);
            key.primary_fields.push(to.unwrap_or_default());
        }
        Ok(grouped.into_values().collect())
    }

    async fn import_views(&self) -> Result<Vec<View>> {
        let rows: Vec<(String, Option<String>)> = sqlx::query_as(
            "SELECT name, sql FROM sqlite_master WHERE type = 'view' ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut views = Vec::with_capacity(rows.len());
        for (name, sql) in rows {
            let mut view = View::new(QualifiedName::unqualified(name.as_str()), sql.unwrap_or_default());
            for (_, column, declared, not_null, default, _) in self.columns(&name).await? {
                view.fields
                    .push(field_from_declared(&column, &declared, not_null != 0, false, default.as_deref())?);
            }
            debug!(view = %view.name, fields = view.fields.len(), "Imported view");
            views.push(view);
        }
        Ok(views)
    }
}

impl SchemaAdaptor for SqliteAdaptor {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    async fn import_schema(&self, name: Option<&str>, options: &ImportOptions) -> Result<Database> {
        let mut database =
            Database::new(name.unwrap_or(self.default_name.as_str())).with_dialect(Dialect::Sqlite);

        for category in ImportCategory::ALL {
            if options.excludes(category) {
                info!(%category, "Skipping excluded category");
            }
        }

        if !options.excludes(ImportCategory::Tables) {
            database.tables = self.import_tables(options).await?;
            info!(count = database.tables.len(), "Imported tables");
        }
        if !options.excludes(ImportCategory::Views) {
            database.views = self.import_views().await?;
            info!(count = database.views.len(), "Imported views");
        }
        debug!("SQLite has no stored procedures, functions, user-defined types or dependency catalog");

        database.validate()?;
        database.finalise();
        info!(database = %database.name, "Schema import complete");
        Ok(database)
    }
}

fn database_name(path: &Path) -> String {
    path.file_stem()
        .map_or_else(|| "sqlite".to_string(), |stem| stem.to_string_lossy().into_owned())
}

/// Maps a SQLite declared type onto a builtin name: known aliases first, then
/// the builtin table itself, then SQLite's column affinity rules.
fn builtin_name(base: &str) -> String {
    let lower = base.trim().to_lowercase();
    let alias = match lower.as_str() {
        "" | "blob" => "varbinary",
        "real" | "float" | "double precision" => "double",
        "clob" => "text",
        "character" | "native character" => "nchar",
        "varying character" => "varchar",
        "int2" => "smallint",
        "int8" | "unsigned big int" => "bigint",
        "guid" | "uuid" => "uniqueidentifier",
        other if builtin_type(other, 0, 0, 0).is_some() => other,
        other if other.contains("int") => "integer",
        other if other.contains("char") || other.contains("clob") || other.contains("text") => "text",
        other if other.contains("blob") => "varbinary",
        other if other.contains("real") || other.contains("floa") || other.contains("doub") => "double",
        _ => "numeric",
    };
    alias.to_string()
}

fn field_from_declared(
    name: &str,
    declared: &str,
    required: bool,
    auto_increment: bool,
    default: Option<&str>,
) -> Result<Field> {
    let (base, first, second) = match DECLARED_TYPE.captures(declared) {
        Some(caps) => (
            caps[1].trim().to_string(),
            caps.get(2).and_then(|m| m.as_str().parse().ok()).unwrap_or(0),
            caps.get(3).and_then(|m| m.as_str().parse().ok()).unwrap_or(0),
        ),
        None => (declared.trim().to_string(), 0, 0),
    };

    // DDL rendered by this crate wraps defaults in parentheses.
    let default = default.map(strip_wrapping_parens);
    let mut normalized = normalize(&builtin_name(&base), first, first, second, default, &[])?;
    normalized.native_type = (!base.is_empty()).then_some(base);
    Ok(normalized.into_field(name, required, auto_increment))
}

/// Fills foreign key targets that name the parent's primary key implicitly.
fn resolve_implicit_targets(tables: &mut [Table]) {
    let primary_keys: Vec<(QualifiedName, Vec<String>)> = tables
        .iter()
        .filter_map(|t| t.pk.as_ref().map(|pk| (t.name.clone(), pk.fields.clone())))
        .collect();

    for table in tables.iter_mut() {
        for key in &mut table.foreign_keys {
            let Some(target) = &key.primary_table else { continue };
            let Some((_, pk_fields)) = primary_keys.iter().find(|(name, _)| name == target) else {
                continue;
            };
            for (position, field) in key.primary_fields.iter_mut().enumerate() {
                if field.is_empty() {
                    if let Some(pk_field) = pk_fields.get(position) {
                        field.clone_from(pk_field);
                    }
                }
            }
        }
    }
}

/// Extracts `CHECK (...)` clauses from a `CREATE TABLE` statement.
fn check_constraints(table: &QualifiedName, sql: &str) -> Vec<Constraint> {
    let mut constraints = Vec::new();
    for caps in CHECK_CLAUSE.captures_iter(sql) {
        let Some(whole) = caps.get(0) else { continue };
        let Some(body) = balanced_body(&sql[whole.end()..]) else { continue };
        let name = caps
            .get(1)
            .map_or_else(|| format!("CK_{}_{}", table.name, constraints.len() + 1), |m| m.as_str().to_string());
        constraints.push(Constraint::new(
            QualifiedName::unqualified(name),
            table.clone(),
            body.trim(),
        ));
    }
    constraints
}

/// Returns the text up to the parenthesis closing an already-open one.
fn balanced_body(text: &str) -> Option<&str> {
    let mut depth = 1usize;
    let mut in_string = false;
    for (index, ch) in text.char_indices() {
        match ch {
            '\'' => in_string = !in_string,
            '(' if !in_string => depth += 1,
            ')' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[..index]);
                }
            }
            _ => {}
        }
    }
    None
}
