//! Integration tests for the schema pipeline.
//!
//! These tests build snapshots the way an importer would (through the
//! generic type system), order them, diff them and render DDL for several
//! dialects.

use ddl_forge_core::prelude::*;

fn dbo(name: &str) -> QualifiedName {
    QualifiedName::new("dbo", name)
}

fn column(name: &str, native: &str, size: i32, required: bool, uddts: &[Uddt]) -> Field {
    normalize(native, size, 0, 0, None, uddts)
        .unwrap()
        .into_field(name, required, false)
}

// =============================================================================
// Snapshot builders
// =============================================================================

fn shop_v1() -> Database {
    let mut db = Database::new("Shop").with_dialect(Dialect::MsSql);

    let email = normalize("nvarchar", 255, 0, 0, None, &[])
        .unwrap()
        .into_uddt(dbo("Email"), false);
    db.uddts.push(email);

    let address = Table::new(dbo("Address"))
        .field(column("Id", "int", 4, true, &db.uddts))
        .field(column("CustomerId", "int", 4, true, &db.uddts))
        .field(column("Street", "nvarchar", 100, false, &db.uddts))
        .primary_key(Key::new(dbo("PK_Address"), KeyType::PrimaryKey, vec!["Id"]))
        .foreign_key(Key::foreign(
            dbo("FK_Address_Customer"),
            vec!["CustomerId"],
            dbo("Customer"),
            vec!["Id"],
        ));
    let customer = Table::new(dbo("Customer"))
        .field(column("Id", "int", 4, true, &db.uddts))
        .field(column("Email", "Email", 0, true, &db.uddts))
        .primary_key(Key::new(dbo("PK_Customer"), KeyType::PrimaryKey, vec!["Id"]));
    db.tables.push(address);
    db.tables.push(customer);

    for name in ["A", "B", "C", "D"] {
        db.stored_procedures.push(StoredProcedure::new(
            dbo(name),
            format!("CREATE PROCEDURE dbo.{name} AS SELECT 1"),
        ));
    }
    db.dependencies = vec![
        Dependency::new(dbo("A"), dbo("B"), ObjectType::StoredProcedure),
        Dependency::new(dbo("B"), dbo("C"), ObjectType::StoredProcedure),
        Dependency::new(dbo("A"), dbo("C"), ObjectType::StoredProcedure),
    ];

    db.finalise();
    db
}

fn shop_v2() -> Database {
    let mut db = shop_v1();
    let uddts = db.uddts.clone();
    let customer = db
        .tables
        .iter_mut()
        .find(|t| t.name == dbo("customer"))
        .unwrap();
    customer
        .fields
        .push(column("Phone", "varchar", 20, false, &uddts));

    db.stored_procedures.retain(|sp| sp.name != dbo("D"));
    db.views.push(View::new(
        dbo("CustomerEmails"),
        "CREATE VIEW dbo.CustomerEmails AS SELECT Id, Email FROM dbo.Customer",
    ));
    db
}

// =============================================================================
// Ordering
// =============================================================================

#[test]
fn test_tables_are_created_after_their_references() {
    let db = shop_v1();
    let ordered = order_tables_by_foreign_key(&db.tables).unwrap();
    let names: Vec<String> = ordered.iter().map(|t| t.name.to_string()).collect();
    assert_eq!(names, vec!["dbo.Customer", "dbo.Address"]);
}

#[test]
fn test_routine_create_and_drop_order() {
    let db = shop_v1();
    let ordered = order_routines(&db.stored_procedures, &db.dependencies).unwrap();
    let create: Vec<&str> = ordered.iter().map(|sp| sp.name.name.as_str()).collect();
    assert_eq!(create, vec!["C", "B", "A", "D"]);

    let drop: Vec<&str> = ordered.iter().rev().map(|sp| sp.name.name.as_str()).collect();
    assert_eq!(drop, vec!["D", "A", "B", "C"]);
}

// =============================================================================
// Diff
// =============================================================================

#[test]
fn test_diff_with_itself_is_empty() {
    let db = shop_v1();
    let change_set = diff(&db, &db);
    assert!(change_set.is_empty());
    assert!(change_set.change_summary().is_empty());
}

#[test]
fn test_diff_tags_every_change() {
    let current = shop_v1();
    let target = shop_v2();
    let change_set = diff(&current, &target);

    assert_eq!(change_set.tables.len(), 1);
    assert_eq!(change_set.tables[0].operation, OperationType::Modify);
    assert_eq!(change_set.tables[0].fields.len(), 3);

    assert_eq!(change_set.views.len(), 1);
    assert_eq!(change_set.views[0].operation, OperationType::Create);

    assert_eq!(change_set.stored_procedures.len(), 1);
    assert_eq!(change_set.stored_procedures[0].operation, OperationType::Drop);

    let summary = change_set.change_summary();
    assert_eq!((summary.create, summary.drop, summary.modify), (1, 1, 1));

    // A, B and C are unchanged and absent from the change set, so their
    // edges are pruned.
    assert!(change_set.dependencies.is_empty());

    assert!(current.tables.iter().all(|t| t.operation == OperationType::Retain));
}

#[test]
fn test_modified_table_column_changes() {
    let current = shop_v1();
    let target = shop_v2();
    let change_set = diff(&current, &target);
    let modified = &change_set.tables[0];
    let before = current.find_table(&modified.name).unwrap();

    let changes = diff_columns(before, modified);
    assert_eq!(changes.len(), 1);
    let ColumnChange::Add(field) = changes[0] else {
        panic!("expected an added column, got {:?}", changes[0]);
    };
    assert_eq!(field.name.as_str(), "Phone");

    let sql = MsSqlDialect::new()
        .add_column(&modified.name, field, Some(Dialect::MsSql))
        .unwrap();
    assert_eq!(sql, "ALTER TABLE [dbo].[Customer] ADD [Phone] varchar(20) NULL;\n");
}

// =============================================================================
// Rendering
// =============================================================================

#[test]
fn test_uddt_columns_keep_their_type_name_in_source_dialect() {
    let db = shop_v1();
    let customer = db.find_table(&dbo("Customer")).unwrap();
    let sql = MsSqlDialect::new()
        .create_table(customer, db.imported_dialect)
        .unwrap();
    assert!(sql.contains("[Email] Email NOT NULL"));

    let email = customer.find_field("email").unwrap();
    assert_eq!(email.generic_type, FieldType::String);
    assert_eq!(email.size, 255);
}

#[test]
fn test_same_snapshot_renders_for_every_dialect() {
    let db = shop_v1();
    let customer = db.find_table(&dbo("Customer")).unwrap();
    for dialect in Dialect::ALL {
        let ddl = dialect_for(dialect);
        let sql = ddl.create_table(customer, db.imported_dialect).unwrap();
        assert!(sql.starts_with("CREATE TABLE "), "{dialect}: {sql}");
        assert!(sql.contains("PRIMARY KEY"), "{dialect}: {sql}");
    }
}

#[test]
fn test_postgres_renders_generic_types() {
    let db = shop_v1();
    let customer = db.find_table(&dbo("Customer")).unwrap();
    let sql = PostgresDialect::new()
        .create_table(customer, db.imported_dialect)
        .unwrap();
    assert_eq!(
        sql,
        "CREATE TABLE \"dbo\".\"Customer\" (\n\t\"Id\" INTEGER NOT NULL,\n\t\"Email\" VARCHAR(255) NOT NULL,\n\tPRIMARY KEY (\"Id\")\n);\n"
    );
}

#[test]
fn test_unknown_type_fails_the_import() {
    let err = normalize("bogus_type", 0, 0, 0, None, &[]).unwrap_err();
    assert!(err.is_datatype_error());
    assert!(err.is_data_error());
}

#[test]
fn test_snapshot_serializes_losslessly() {
    let db = shop_v2();
    let json = serde_json::to_string(&db).unwrap();
    let restored: Database = serde_json::from_str(&json).unwrap();
    assert!(diff(&db, &restored).is_empty());
    assert_eq!(restored.imported_dialect, Some(Dialect::MsSql));
}
