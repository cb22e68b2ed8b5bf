//! End-to-end tests over SQLite files: import, definition files, diff,
//! change scripts and script export.

use std::path::Path;

use ddl_forge::prelude::*;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

async fn open(path: &Path) -> SqlitePool {
    let options = SqliteConnectOptions::new().filename(path).create_if_missing(true);
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .expect("Failed to open database file")
}

async fn execute_all(pool: &SqlitePool, script: &str) {
    for statement in script.split(";\n").filter(|s| !s.trim().is_empty()) {
        sqlx::query(statement)
            .execute(pool)
            .await
            .unwrap_or_else(|e| panic!("{statement}: {e}"));
    }
}

async fn import(path: &Path) -> Database {
    let connection = ConnectionString::parse(&format!("sqlite://{}", path.display())).unwrap();
    let adaptor = adaptor_for(&connection).await.unwrap();
    adaptor.import_schema(None, &ImportOptions::new()).await.unwrap()
}

const V1: &str = "CREATE TABLE customer (
    id INTEGER PRIMARY KEY,
    name VARCHAR(80) NOT NULL
);\n";

const V2: &str = "CREATE TABLE customer (
    id INTEGER PRIMARY KEY,
    name VARCHAR(80) NOT NULL,
    phone TEXT
);
CREATE TABLE address (
    id INTEGER PRIMARY KEY,
    customer_id INTEGER NOT NULL REFERENCES customer(id),
    city TEXT DEFAULT 'unknown'
);
CREATE INDEX ix_address_city ON address (city);\n";

// =============================================================================
// Import and definition files
// =============================================================================

#[tokio::test]
async fn test_import_names_database_after_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shop.db");
    let pool = open(&path).await;
    execute_all(&pool, V1).await;
    pool.close().await;

    let db = import(&path).await;
    assert_eq!(db.name, "shop");
    assert_eq!(db.imported_dialect, Some(Dialect::Sqlite));
    assert_eq!(db.tables.len(), 1);
}

#[tokio::test]
async fn test_definition_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shop.db");
    let pool = open(&path).await;
    execute_all(&pool, V2).await;
    pool.close().await;

    let db = import(&path).await;
    let definition = dir.path().join("shop.json");
    write_definition(&definition, &db).unwrap();
    let restored = read_definition(&definition).unwrap();

    assert!(diff(&db, &restored).is_empty());
    let address = restored.table(&QualifiedName::unqualified("address")).unwrap();
    assert_eq!(address.get_field("city").unwrap().default.as_deref(), Some("'unknown'"));
    assert_eq!(address.keys.len(), 1);
    assert_eq!(address.foreign_keys.len(), 1);
}

// =============================================================================
// Diff and change scripts
// =============================================================================

#[tokio::test]
async fn test_change_script_migrates_current_to_target() {
    let dir = tempfile::tempdir().unwrap();
    let current_path = dir.path().join("current.db");
    let target_path = dir.path().join("target.db");

    let current_pool = open(&current_path).await;
    execute_all(&current_pool, V1).await;
    let target_pool = open(&target_path).await;
    execute_all(&target_pool, V2).await;
    target_pool.close().await;

    let current = import(&current_path).await;
    let target = import(&target_path).await;

    let change_set = diff(&current, &target);
    let summary = change_set.change_summary();
    assert_eq!((summary.create, summary.drop, summary.modify), (1, 0, 1));

    let script = render_change_script(&change_set, &current, &SqliteDialect::new()).unwrap();
    assert!(script.contains(r#"ALTER TABLE "customer" ADD COLUMN "phone" TEXT NULL;"#));
    assert!(script.contains(r#"CREATE TABLE "address""#));

    execute_all(&current_pool, &script).await;
    current_pool.close().await;

    let migrated = import(&current_path).await;
    let remaining = diff(&migrated, &target);
    assert!(remaining.is_empty(), "{}", remaining.change_summary());
}

#[tokio::test]
async fn test_dropped_table_is_scripted() {
    let dir = tempfile::tempdir().unwrap();
    let current_path = dir.path().join("current.db");
    let target_path = dir.path().join("target.db");

    let pool = open(&current_path).await;
    execute_all(&pool, V2).await;
    pool.close().await;
    let pool = open(&target_path).await;
    execute_all(&pool, V1).await;
    pool.close().await;

    let current = import(&current_path).await;
    let target = import(&target_path).await;
    let script = render_change_script(&diff(&current, &target), &current, &SqliteDialect::new()).unwrap();

    assert!(script.starts_with(r#"DROP TABLE IF EXISTS "address";"#));
    assert!(script.contains(r#"ALTER TABLE "customer" DROP COLUMN "phone";"#));
}

// =============================================================================
// Script export
// =============================================================================

#[tokio::test]
async fn test_export_in_foreign_key_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shop.db");
    let pool = open(&path).await;
    execute_all(&pool, V2).await;
    pool.close().await;

    let db = import(&path).await;
    let out = dir.path().join("scripts");
    let summary = ScriptWriter::new(Dialect::Postgres).write_schema(&db, &out).unwrap();
    assert_eq!(summary.tables, 2);

    let customer = std::fs::read_to_string(out.join("tables/001-customer.sql")).unwrap();
    let address = std::fs::read_to_string(out.join("tables/002-address.sql")).unwrap();
    assert!(customer.contains(r#""name" VARCHAR(80) NOT NULL"#));
    assert!(address.contains(r#"FOREIGN KEY ("customer_id") REFERENCES "customer"("id")"#));
    assert!(address.contains(r#"CREATE INDEX "ix_address_city" ON "address" ("city");"#));
}

#[tokio::test]
async fn test_autoincrement_survives_sqlite_export() {
    let dir = tempfile::tempdir().unwrap();
    let original_path = dir.path().join("original.db");
    let pool = open(&original_path).await;
    execute_all(
        &pool,
        "CREATE TABLE ticket (\n    id INTEGER PRIMARY KEY AUTOINCREMENT,\n    title TEXT NOT NULL\n);\n",
    )
    .await;
    pool.close().await;

    let original = import(&original_path).await;
    let out = dir.path().join("scripts");
    ScriptWriter::new(Dialect::Sqlite).write_schema(&original, &out).unwrap();
    let ddl = std::fs::read_to_string(out.join("tables/001-ticket.sql")).unwrap();
    assert!(ddl.contains(r#""id" INTEGER NULL PRIMARY KEY AUTOINCREMENT"#));

    let copy_path = dir.path().join("copy.db");
    let pool = open(&copy_path).await;
    execute_all(&pool, &ddl).await;
    pool.close().await;

    let copy = import(&copy_path).await;
    let ticket = copy.table(&QualifiedName::unqualified("ticket")).unwrap();
    assert!(ticket.get_field("id").unwrap().auto_increment);
    let remaining = diff(&original, &copy);
    assert!(remaining.is_empty(), "{}", remaining.change_summary());
}
