//! Diff engine.
//!
//! Compares two snapshots and produces a change set: a [`Database`] whose
//! objects carry the [`OperationType`] that turns `current` into `target`.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::database::Database;
use crate::identifier::QualifiedName;
use crate::schema::{Constraint, Field, Key, OperationType, SchemaObject, Table};

/// Diffs one category of objects.
///
/// Target-only objects are tagged `Create`, current-only objects `Drop`, and
/// objects present on both sides with a different shape `Modify` (carrying
/// the target's attributes). Unchanged objects are omitted.
#[must_use]
pub fn diff_entities<T: SchemaObject>(current: &[T], target: &[T]) -> Vec<T> {
    let current_by_name: HashMap<&QualifiedName, &T> = current.iter().map(|o| (o.name(), o)).collect();
    let target_by_name: HashMap<&QualifiedName, &T> = target.iter().map(|o| (o.name(), o)).collect();

    let object_type = T::OBJECT_TYPE;
    let mut changes = Vec::new();

    for object in target {
        if !current_by_name.contains_key(object.name()) {
            debug!(object_type = %object_type, name = %object.name(), "Create");
            changes.push(object.clone().with_operation(OperationType::Create));
        }
    }

    for object in current {
        match target_by_name.get(object.name()) {
            None => {
                debug!(object_type = %object_type, name = %object.name(), "Drop");
                changes.push(object.clone().with_operation(OperationType::Drop));
            }
            Some(new) if !object.structurally_eq(new) => {
                debug!(object_type = %object_type, name = %object.name(), "Modify");
                changes.push((*new).clone().with_operation(OperationType::Modify));
            }
            Some(_) => {}
        }
    }

    changes
}

/// Computes the change set turning `current` into `target`.
///
/// Both inputs are left untouched. The result is named after `target` and
/// finalised.
#[must_use]
pub fn diff(current: &Database, target: &Database) -> Database {
    let mut change_set = Database {
        name: target.name.clone(),
        imported_dialect: target.imported_dialect,
        tables: diff_entities(&current.tables, &target.tables),
        views: diff_entities(&current.views, &target.views),
        stored_procedures: diff_entities(&current.stored_procedures, &target.stored_procedures),
        functions: diff_entities(&current.functions, &target.functions),
        uddts: diff_entities(&current.uddts, &target.uddts),
        udtts: diff_entities(&current.udtts, &target.udtts),
        dependencies: current
            .dependencies
            .iter()
            .chain(target.dependencies.iter())
            .cloned()
            .collect(),
    };
    change_set.finalise();

    info!(
        current = %current.name,
        target = %target.name,
        summary = %change_set.change_summary(),
        "Computed change set"
    );
    change_set
}

/// A column-level change inside a modified table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnChange<'a> {
    /// Column exists only in the target.
    Add(&'a Field),
    /// Column exists only in the current table.
    Drop(&'a Field),
    /// Column exists on both sides with different attributes; carries the
    /// target definition.
    Alter(&'a Field),
}

/// Compares the columns of two versions of a table.
///
/// Adds come in target column order, then drops and alters in current column
/// order.
#[must_use]
pub fn diff_columns<'a>(current: &'a Table, target: &'a Table) -> Vec<ColumnChange<'a>> {
    let mut changes: Vec<ColumnChange<'a>> = target
        .fields
        .iter()
        .filter(|f| current.get_field(f.name.as_str()).is_none())
        .map(ColumnChange::Add)
        .collect();

    for field in &current.fields {
        match target.get_field(field.name.as_str()) {
            None => changes.push(ColumnChange::Drop(field)),
            Some(new) if new != field => changes.push(ColumnChange::Alter(new)),
            Some(_) => {}
        }
    }

    changes
}

/// A key or check constraint change inside a modified table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyChange<'a> {
    AddKey(&'a Key),
    DropKey(&'a Key),
    AddCheck(&'a Constraint),
    DropCheck(&'a Constraint),
}

impl KeyChange<'_> {
    #[must_use]
    pub const fn is_drop(&self) -> bool {
        matches!(self, Self::DropKey(_) | Self::DropCheck(_))
    }
}

/// Compares the primary key, keys, foreign keys and check constraints of
/// two versions of a table.
///
/// A key whose shape changed is dropped and added again. Drops come first
/// (foreign keys, checks, keys, primary key), then adds in the reverse
/// category order.
#[must_use]
pub fn diff_keys<'a>(current: &'a Table, target: &'a Table) -> Vec<KeyChange<'a>> {
    let mut changes: Vec<KeyChange<'a>> = Vec::new();

    changes.extend(missing_from(&current.foreign_keys, &target.foreign_keys).map(KeyChange::DropKey));
    changes.extend(missing_from(&current.constraints, &target.constraints).map(KeyChange::DropCheck));
    changes.extend(missing_from(&current.keys, &target.keys).map(KeyChange::DropKey));
    if current.pk != target.pk {
        changes.extend(current.pk.iter().map(KeyChange::DropKey));
        changes.extend(target.pk.iter().map(KeyChange::AddKey));
    }
    changes.extend(missing_from(&target.keys, &current.keys).map(KeyChange::AddKey));
    changes.extend(missing_from(&target.foreign_keys, &current.foreign_keys).map(KeyChange::AddKey));
    changes.extend(missing_from(&target.constraints, &current.constraints).map(KeyChange::AddCheck));

    changes
}

fn missing_from<'a, T: PartialEq>(items: &'a [T], other: &'a [T]) -> impl Iterator<Item = &'a T> {
    items.iter().filter(move |item| !other.contains(item))
}
