//! The database aggregate.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::dialect::Dialect;
use crate::error::{Result, SchemaError};
use crate::identifier::QualifiedName;
use crate::schema::{
    Dependency, Function, ObjectType, OperationType, SchemaObject, StoredProcedure, Table, Udtt,
    Uddt, View,
};

/// Complete schema snapshot, or a change set produced by [`crate::diff::diff`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Database {
    pub name: String,
    /// Dialect the snapshot was captured from.
    #[serde(default)]
    pub imported_dialect: Option<Dialect>,
    #[serde(default)]
    pub tables: Vec<Table>,
    #[serde(default)]
    pub views: Vec<View>,
    #[serde(default)]
    pub stored_procedures: Vec<StoredProcedure>,
    #[serde(default)]
    pub functions: Vec<Function>,
    #[serde(default)]
    pub uddts: Vec<Uddt>,
    #[serde(default)]
    pub udtts: Vec<Udtt>,
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
}

/// Borrowed reference to any top-level object of a [`Database`].
#[derive(Debug, Clone, Copy)]
pub enum ObjectRef<'a> {
    Table(&'a Table),
    View(&'a View),
    StoredProcedure(&'a StoredProcedure),
    Function(&'a Function),
    Uddt(&'a Uddt),
    Udtt(&'a Udtt),
}

impl ObjectRef<'_> {
    #[must_use]
    pub fn name(&self) -> &QualifiedName {
        match self {
            Self::Table(o) => &o.name,
            Self::View(o) => &o.name,
            Self::StoredProcedure(o) => &o.name,
            Self::Function(o) => &o.name,
            Self::Uddt(o) => &o.name,
            Self::Udtt(o) => &o.name,
        }
    }

    #[must_use]
    pub const fn object_type(&self) -> ObjectType {
        match self {
            Self::Table(_) => ObjectType::Table,
            Self::View(_) => ObjectType::View,
            Self::StoredProcedure(_) => ObjectType::StoredProcedure,
            Self::Function(_) => ObjectType::Function,
            Self::Uddt(_) => ObjectType::Uddt,
            Self::Udtt(_) => ObjectType::Udtt,
        }
    }
}

/// Number of tagged entities per operation in a change set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeSummary {
    pub create: usize,
    pub drop: usize,
    pub modify: usize,
}

impl ChangeSummary {
    /// Returns true if the change set does nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.create == 0 && self.drop == 0 && self.modify == 0
    }

    fn count<T: SchemaObject>(&mut self, objects: &[T]) {
        for object in objects {
            match object.operation() {
                OperationType::Create => self.create += 1,
                OperationType::Drop => self.drop += 1,
                OperationType::Modify => self.modify += 1,
                OperationType::Retain => {}
            }
        }
    }
}

impl fmt::Display for ChangeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} to create, {} to drop, {} to modify",
            self.create, self.drop, self.modify
        )
    }
}

fn find_by_name<'a, T: SchemaObject>(objects: &'a [T], name: &QualifiedName) -> Option<&'a T> {
    objects.iter().find(|o| o.name() == name)
}

fn sort_by_name<T: SchemaObject>(objects: &mut [T]) {
    objects.sort_by(|a, b| a.name().cmp(b.name()));
    for object in objects.iter_mut() {
        object.finalise();
    }
}

impl Database {
    /// Creates an empty database.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Sets the source dialect.
    #[must_use]
    pub const fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.imported_dialect = Some(dialect);
        self
    }

    /// Gets a table by name.
    #[must_use]
    pub fn table(&self, name: &QualifiedName) -> Option<&Table> {
        find_by_name(&self.tables, name)
    }

    /// Finds a table by name.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Data`] if the table does not exist.
    pub fn find_table(&self, name: &QualifiedName) -> Result<&Table> {
        self.table(name)
            .ok_or_else(|| SchemaError::data(format!("Could not find table {name}")))
    }

    #[must_use]
    pub fn view(&self, name: &QualifiedName) -> Option<&View> {
        find_by_name(&self.views, name)
    }

    #[must_use]
    pub fn stored_procedure(&self, name: &QualifiedName) -> Option<&StoredProcedure> {
        find_by_name(&self.stored_procedures, name)
    }

    #[must_use]
    pub fn function(&self, name: &QualifiedName) -> Option<&Function> {
        find_by_name(&self.functions, name)
    }

    #[must_use]
    pub fn uddt(&self, name: &QualifiedName) -> Option<&Uddt> {
        find_by_name(&self.uddts, name)
    }

    #[must_use]
    pub fn udtt(&self, name: &QualifiedName) -> Option<&Udtt> {
        find_by_name(&self.udtts, name)
    }

    /// Gets a UDDT by the name part only, as column types refer to it.
    #[must_use]
    pub fn uddt_by_type_name(&self, type_name: &str) -> Option<&Uddt> {
        self.uddts.iter().find(|u| u.name.name.matches(type_name))
    }

    /// Gets an object of a given category.
    #[must_use]
    pub fn object(&self, name: &QualifiedName, object_type: ObjectType) -> Option<ObjectRef<'_>> {
        match object_type {
            ObjectType::Table => self.table(name).map(ObjectRef::Table),
            ObjectType::View => self.view(name).map(ObjectRef::View),
            ObjectType::StoredProcedure => self.stored_procedure(name).map(ObjectRef::StoredProcedure),
            ObjectType::Function => self.function(name).map(ObjectRef::Function),
            ObjectType::Uddt => self.uddt(name).map(ObjectRef::Uddt),
            ObjectType::Udtt => self.udtt(name).map(ObjectRef::Udtt),
        }
    }

    /// Gets an object of any category.
    #[must_use]
    pub fn find_object(&self, name: &QualifiedName) -> Option<ObjectRef<'_>> {
        [
            ObjectType::Table,
            ObjectType::View,
            ObjectType::StoredProcedure,
            ObjectType::Function,
            ObjectType::Uddt,
            ObjectType::Udtt,
        ]
        .into_iter()
        .find_map(|object_type| self.object(name, object_type))
    }

    /// Returns true if an object of any category has this name.
    #[must_use]
    pub fn contains_object(&self, name: &QualifiedName) -> bool {
        self.find_object(name).is_some()
    }

    /// Removes every dependency whose endpoints are not both present.
    pub fn clean_dependencies(&mut self) {
        let dependencies = std::mem::take(&mut self.dependencies);
        let (kept, pruned): (Vec<_>, Vec<_>) = dependencies
            .into_iter()
            .partition(|d| self.contains_object(&d.obj) && self.contains_object(&d.referenced_obj));
        for dependency in &pruned {
            warn!(dependency = %dependency, "Pruning dangling dependency");
        }
        self.dependencies = kept;
    }

    /// Canonicalizes the aggregate: every collection sorted by
    /// case-insensitive name, duplicate and dangling dependencies removed.
    pub fn finalise(&mut self) {
        sort_by_name(&mut self.tables);
        sort_by_name(&mut self.views);
        sort_by_name(&mut self.functions);
        sort_by_name(&mut self.stored_procedures);
        sort_by_name(&mut self.udtts);
        sort_by_name(&mut self.uddts);
        self.dependencies
            .sort_by(|a, b| a.obj.cmp(&b.obj).then_with(|| a.referenced_obj.cmp(&b.referenced_obj)));
        self.dependencies.dedup();
        self.clean_dependencies();
    }

    /// Checks every table invariant.
    ///
    /// # Errors
    ///
    /// Returns the first [`SchemaError::Data`] raised by [`Table::validate`].
    pub fn validate(&self) -> Result<()> {
        self.tables.iter().try_for_each(Table::validate)
    }

    /// Counts tagged entities.
    #[must_use]
    pub fn change_summary(&self) -> ChangeSummary {
        let mut summary = ChangeSummary::default();
        summary.count(&self.tables);
        summary.count(&self.views);
        summary.count(&self.stored_procedures);
        summary.count(&self.functions);
        summary.count(&self.uddts);
        summary.count(&self.udtts);
        summary
    }

    /// Returns true if no collection holds an object.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
            && self.views.is_empty()
            && self.stored_procedures.is_empty()
            && self.functions.is_empty()
            && self.uddts.is_empty()
            && self.udtts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Field, FunctionType, Key, KeyType};
    use crate::types::FieldType;

    fn name(n: &str) -> QualifiedName {
        QualifiedName::new("dbo", n)
    }

    fn sample() -> Database {
        let mut db = Database::new("Shop");
        db.tables.push(
            Table::new(name("Order"))
                .field(Field::new("Id", FieldType::Integer, 4).required())
                .primary_key(Key::new(name("PK_Order"), KeyType::PrimaryKey, vec!["Id"])),
        );
        db.tables.push(Table::new(name("customer")).field(Field::new("Id", FieldType::Integer, 4)));
        db.stored_procedures
            .push(StoredProcedure::new(name("GetOrders"), "CREATE PROCEDURE dbo.GetOrders AS SELECT 1"));
        db.functions.push(Function::new(
            name("OrderTotal"),
            "CREATE FUNCTION dbo.OrderTotal() RETURNS INT AS BEGIN RETURN 1 END",
            FunctionType::ScalarFunction,
        ));
        db.uddts.push(Uddt::new(name("Email"), FieldType::String, 255));
        db
    }

    #[test]
    fn test_lookups_are_case_insensitive() {
        let db = sample();
        assert!(db.table(&QualifiedName::new("DBO", "ORDER")).is_some());
        assert!(db.stored_procedure(&name("getorders")).is_some());
        assert!(db.uddt_by_type_name("EMAIL").is_some());
        assert!(db.view(&name("Order")).is_none());
        assert!(db.find_table(&name("Missing")).unwrap_err().is_data_error());
    }

    #[test]
    fn test_object_by_type() {
        let db = sample();
        let found = db.object(&name("OrderTotal"), ObjectType::Function).unwrap();
        assert_eq!(found.object_type(), ObjectType::Function);
        assert!(db.object(&name("OrderTotal"), ObjectType::Table).is_none());
        assert!(db.contains_object(&name("Email")));
        assert!(!db.contains_object(&name("Nothing")));
    }

    #[test]
    fn test_finalise_sorts_and_prunes() {
        let mut db = sample();
        db.dependencies.push(Dependency::new(
            name("GetOrders"),
            name("OrderTotal"),
            ObjectType::Function,
        ));
        db.dependencies.push(Dependency::new(
            name("GetOrders"),
            name("OrderTotal"),
            ObjectType::Function,
        ));
        db.dependencies.push(Dependency::new(
            name("GetOrders"),
            name("Vanished"),
            ObjectType::Function,
        ));
        db.finalise();

        let tables: Vec<String> = db.tables.iter().map(|t| t.name.to_string()).collect();
        assert_eq!(tables, vec!["dbo.customer", "dbo.Order"]);
        assert_eq!(db.dependencies.len(), 1);
        assert_eq!(db.dependencies[0].referenced_obj, name("OrderTotal"));
    }

    #[test]
    fn test_validate_reports_broken_table() {
        let mut db = sample();
        assert!(db.validate().is_ok());
        db.tables[1]
            .keys
            .push(Key::new(name("IX_Bad"), KeyType::Index, vec!["Nope"]));
        assert!(db.validate().is_err());
    }

    #[test]
    fn test_change_summary() {
        let mut db = Database::new("Shop");
        db.tables
            .push(Table::new(name("A")).with_operation(OperationType::Create));
        db.views
            .push(View::new(name("V"), "SELECT 1").with_operation(OperationType::Drop));
        db.functions.push(
            Function::new(name("F"), "", FunctionType::TableFunction).with_operation(OperationType::Modify),
        );
        let summary = db.change_summary();
        assert_eq!(
            summary,
            ChangeSummary {
                create: 1,
                drop: 1,
                modify: 1
            }
        );
        assert_eq!(summary.to_string(), "1 to create, 1 to drop, 1 to modify");
        assert!(Database::new("Empty").change_summary().is_empty());
    }
}
