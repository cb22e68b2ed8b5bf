//! DDL script output.
//!
//! [`ScriptWriter`] lays a snapshot out as one file per object:
//!
//! ```text
//! tables/001-Customer.sql        FK order
//! views/001-ActiveCustomers.sql  dependency order
//! functions/001-...sql           dependency order, plus drop_functions.sql
//! sp/001-...sql                  dependency order, plus drop_sp.sql
//! udt/<name>.sql                 plus drop_udt.sql
//! udtt/<name>.sql                plus drop_udtt.sql
//! ```
//!
//! [`render_change_script`] turns a change set into a single migration
//! script.

use std::fs;
use std::path::{Path, PathBuf};

use ddl_forge_core::prelude::*;
use tracing::{debug, info};

use crate::error::Result;

/// Number of files written per category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteSummary {
    pub tables: usize,
    pub views: usize,
    pub functions: usize,
    pub stored_procedures: usize,
    pub uddts: usize,
    pub udtts: usize,
}

/// Writes per-object DDL files for a target dialect.
pub struct ScriptWriter {
    dialect: Box<dyn DdlDialect>,
}

impl ScriptWriter {
    /// Creates a writer emitting `dialect` DDL.
    #[must_use]
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect: dialect_for(dialect),
        }
    }

    /// Target dialect.
    #[must_use]
    pub fn dialect(&self) -> Dialect {
        self.dialect.kind()
    }

    /// Writes every category of `database` under `root`. Each category
    /// directory is emptied first.
    ///
    /// # Errors
    ///
    /// Returns an error if ordering fails, the dialect cannot express an
    /// object, or a file cannot be written.
    pub fn write_schema(&self, database: &Database, root: &Path) -> Result<WriteSummary> {
        let source = database.imported_dialect;
        let dialect = self.dialect.as_ref();
        let mut summary = WriteSummary::default();

        info!(dialect = %dialect.kind(), path = %root.display(), "Writing table scripts");
        let dir = recreate_dir(root, "tables")?;
        for (index, table) in order_tables_by_foreign_key(&database.tables)?.into_iter().enumerate() {
            write_numbered(&dir, index, &table.name, &dialect.create_table(table, source)?)?;
            summary.tables += 1;
        }

        info!("Writing view scripts");
        let dir = recreate_dir(root, "views")?;
        for (index, view) in order_routines(&database.views, &database.dependencies)?.into_iter().enumerate() {
            write_numbered(&dir, index, &view.name, &dialect.create_view(view))?;
            summary.views += 1;
        }

        info!("Writing function scripts");
        let dir = recreate_dir(root, "functions")?;
        let functions = order_routines(&database.functions, &database.dependencies)?;
        let mut drops = String::new();
        for function in functions.iter().rev() {
            drops.push_str(&dialect.drop_function(&function.name)?);
        }
        write_file(&dir.join("drop_functions.sql"), &drops)?;
        for (index, function) in functions.into_iter().enumerate() {
            write_numbered(&dir, index, &function.name, &dialect.create_function(function))?;
            summary.functions += 1;
        }

        info!("Writing stored procedure scripts");
        let dir = recreate_dir(root, "sp")?;
        let procedures = order_routines(&database.stored_procedures, &database.dependencies)?;
        let mut drops = String::new();
        for procedure in procedures.iter().rev() {
            drops.push_str(&dialect.drop_stored_procedure(&procedure.name)?);
        }
        write_file(&dir.join("drop_sp.sql"), &drops)?;
        for (index, procedure) in procedures.into_iter().enumerate() {
            write_numbered(&dir, index, &procedure.name, &dialect.create_stored_procedure(procedure))?;
            summary.stored_procedures += 1;
        }

        info!("Writing user-defined type scripts");
        let dir = recreate_dir(root, "udt")?;
        let mut drops = String::new();
        for uddt in &database.uddts {
            drops.push_str(&dialect.drop_uddt(&uddt.name)?);
            write_file(&dir.join(format!("{}.sql", file_stem(&uddt.name))), &dialect.create_uddt(uddt, source)?)?;
            summary.uddts += 1;
        }
        write_file(&dir.join("drop_udt.sql"), &drops)?;

        let dir = recreate_dir(root, "udtt")?;
        let mut drops = String::new();
        for udtt in &database.udtts {
            drops.push_str(&dialect.drop_udtt(&udtt.name)?);
            write_file(&dir.join(format!("{}.sql", file_stem(&udtt.name))), &dialect.create_udtt(udtt, source)?)?;
            summary.udtts += 1;
        }
        write_file(&dir.join("drop_udtt.sql"), &drops)?;

        info!(
            tables = summary.tables,
            views = summary.views,
            functions = summary.functions,
            stored_procedures = summary.stored_procedures,
            uddts = summary.uddts,
            udtts = summary.udtts,
            "Schema scripts written"
        );
        Ok(summary)
    }
}

/// Renders a change set produced by [`diff`] as one script.
///
/// Drops come first (procedures and functions in reverse dependency order,
/// views, keys removed from modified tables, tables in reverse FK order, then
/// types), followed by creates in the opposite order. Modified tables become
/// column, key and check statements computed against `current`; other
/// modified objects are dropped and recreated.
///
/// # Errors
///
/// Returns an error if ordering fails, a modified table is missing from
/// `current` or yields no statements, or the dialect cannot express a change.
pub fn render_change_script(change_set: &Database, current: &Database, dialect: &dyn DdlDialect) -> Result<String> {
    let source = change_set.imported_dialect;
    let dependencies = &change_set.dependencies;
    let mut script = String::new();

    let procedures = order_routines(&change_set.stored_procedures, dependencies)?;
    let functions = order_routines(&change_set.functions, dependencies)?;
    let views = order_routines(&change_set.views, dependencies)?;
    let created_tables: Vec<Table> = with_operation(&change_set.tables, OperationType::Create);
    let dropped_tables: Vec<Table> = with_operation(&change_set.tables, OperationType::Drop);
    let mut modified_tables = Vec::new();
    for table in change_set.tables.iter().filter(|t| t.operation == OperationType::Modify) {
        let before = current.find_table(&table.name)?;
        let key_changes = diff_keys(before, table);
        let column_changes = diff_columns(before, table);
        if key_changes.is_empty() && column_changes.is_empty() {
            return Err(SchemaError::data(format!("Table {} is modified but has no scriptable changes", table.name)).into());
        }
        modified_tables.push((table, key_changes, column_changes));
    }

    for procedure in procedures.iter().rev().filter(|p| is_dropped(p.operation)) {
        script.push_str(&dialect.drop_stored_procedure(&procedure.name)?);
    }
    for function in functions.iter().rev().filter(|f| is_dropped(f.operation)) {
        script.push_str(&dialect.drop_function(&function.name)?);
    }
    for view in views.iter().rev().filter(|v| is_dropped(v.operation)) {
        script.push_str(&dialect.drop_view(&view.name));
    }
    // Keys of modified tables may reference dropped tables or cover dropped
    // columns.
    for (table, key_changes, _) in &modified_tables {
        for change in key_changes.iter().filter(|c| c.is_drop()) {
            script.push_str(&key_statement(dialect, &table.name, change)?);
        }
    }
    for table in order_tables_by_foreign_key(&dropped_tables)?.into_iter().rev() {
        script.push_str(&dialect.drop_table(&table.name));
    }
    for udtt in change_set.udtts.iter().filter(|u| is_dropped(u.operation)) {
        script.push_str(&dialect.drop_udtt(&udtt.name)?);
    }
    for uddt in change_set.uddts.iter().filter(|u| is_dropped(u.operation)) {
        script.push_str(&dialect.drop_uddt(&uddt.name)?);
    }

    for uddt in change_set.uddts.iter().filter(|u| is_created(u.operation)) {
        script.push_str(&dialect.create_uddt(uddt, source)?);
    }
    for udtt in change_set.udtts.iter().filter(|u| is_created(u.operation)) {
        script.push_str(&dialect.create_udtt(udtt, source)?);
    }
    for table in order_tables_by_foreign_key(&created_tables)? {
        script.push_str(&dialect.create_table(table, source)?);
    }
    for (table, key_changes, column_changes) in &modified_tables {
        for change in column_changes {
            let statement = match change {
                ColumnChange::Add(field) => dialect.add_column(&table.name, field, source)?,
                ColumnChange::Drop(field) => dialect.drop_column(&table.name, field.name.as_str()),
                ColumnChange::Alter(field) => dialect.alter_column(&table.name, field, source)?,
            };
            script.push_str(&statement);
        }
        for change in key_changes.iter().filter(|c| !c.is_drop()) {
            script.push_str(&key_statement(dialect, &table.name, change)?);
        }
    }
    for view in views.iter().filter(|v| is_created(v.operation)) {
        push_batch(&mut script, &dialect.create_view(view), dialect);
    }
    for function in functions.iter().filter(|f| is_created(f.operation)) {
        push_batch(&mut script, &dialect.create_function(function), dialect);
    }
    for procedure in procedures.iter().filter(|p| is_created(p.operation)) {
        push_batch(&mut script, &dialect.create_stored_procedure(procedure), dialect);
    }

    let summary = change_set.change_summary();
    info!(%summary, dialect = %dialect.kind(), "Rendered change script");
    Ok(script)
}

fn key_statement(dialect: &dyn DdlDialect, table: &QualifiedName, change: &KeyChange<'_>) -> Result<String> {
    let statement = match change {
        KeyChange::AddKey(key) => dialect.add_key(table, key)?,
        KeyChange::DropKey(key) => dialect.drop_key(table, key)?,
        KeyChange::AddCheck(constraint) => dialect.add_check(table, constraint)?,
        KeyChange::DropCheck(constraint) => dialect.drop_check(table, constraint)?,
    };
    Ok(statement)
}

const fn is_dropped(operation: OperationType) -> bool {
    matches!(operation, OperationType::Drop | OperationType::Modify)
}

const fn is_created(operation: OperationType) -> bool {
    matches!(operation, OperationType::Create | OperationType::Modify)
}

fn with_operation(tables: &[Table], operation: OperationType) -> Vec<Table> {
    tables.iter().filter(|t| t.operation == operation).cloned().collect()
}

fn push_batch(script: &mut String, body: &str, dialect: &dyn DdlDialect) {
    script.push_str(body.trim_end());
    script.push('\n');
    if let Some(separator) = dialect.batch_separator() {
        script.push_str(separator);
        script.push('\n');
    }
}

/// File name for an object: its name part with path-unsafe characters
/// replaced.
fn file_stem(name: &QualifiedName) -> String {
    name.name
        .as_str()
        .chars()
        .map(|c| if c.is_alphanumeric() || matches!(c, '_' | '-' | '.') { c } else { '_' })
        .collect()
}

fn recreate_dir(root: &Path, category: &str) -> Result<PathBuf> {
    let dir = root.join(category);
    if dir.exists() {
        fs::remove_dir_all(&dir)?;
    }
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

fn write_numbered(dir: &Path, index: usize, name: &QualifiedName, sql: &str) -> Result<()> {
    write_file(&dir.join(format!("{:03}-{}.sql", index + 1, file_stem(name))), sql)
}

fn write_file(path: &Path, sql: &str) -> Result<()> {
    fs::write(path, sql)?;
    debug!(path = %path.display(), "Wrote script");
    Ok(())
}
