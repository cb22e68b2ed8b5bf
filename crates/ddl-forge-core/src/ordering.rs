//! Dependency ordering.
//!
//! Tables are ordered by walking foreign keys depth first. Routines (stored
//! procedures and functions) are ordered topologically from the catalog's
//! dependency list. In both cases referenced objects come first, so the
//! reversed order is a valid drop order.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use tracing::debug;

use crate::error::{Result, SchemaError};
use crate::identifier::QualifiedName;
use crate::schema::{Dependency, SchemaObject, Table};

struct ForeignKeyWalk<'a> {
    index: HashMap<&'a QualifiedName, &'a Table>,
    placed: HashSet<&'a QualifiedName>,
    visiting: HashSet<&'a QualifiedName>,
    ordered: Vec<&'a Table>,
}

impl<'a> ForeignKeyWalk<'a> {
    fn visit(&mut self, table: &'a Table) -> Result<()> {
        if self.placed.contains(&table.name) {
            return Ok(());
        }
        if !self.visiting.insert(&table.name) {
            return Err(SchemaError::CircularDependency(table.name.to_string()));
        }

        for fk in table.all_foreign_keys() {
            let Some(target) = &fk.primary_table else {
                continue;
            };
            if *target == table.name {
                continue;
            }
            // Targets outside the input are already satisfied.
            if let Some(parent) = self.index.get(target).copied() {
                self.visit(parent)?;
            }
        }

        self.visiting.remove(&table.name);
        self.placed.insert(&table.name);
        self.ordered.push(table);
        Ok(())
    }
}

/// Orders tables so that every foreign key target precedes the table that
/// references it.
///
/// Tables keep their relative input order wherever foreign keys allow it.
///
/// # Errors
///
/// Returns [`SchemaError::CircularDependency`] naming a table on a foreign
/// key cycle.
pub fn order_tables_by_foreign_key(tables: &[Table]) -> Result<Vec<&Table>> {
    let mut walk = ForeignKeyWalk {
        index: tables.iter().map(|t| (&t.name, t)).collect(),
        placed: HashSet::new(),
        visiting: HashSet::new(),
        ordered: Vec::with_capacity(tables.len()),
    };
    for table in tables {
        walk.visit(table)?;
    }
    Ok(walk.ordered)
}

/// Topologically sorts every name mentioned by `dependencies`, referenced
/// names first.
///
/// The sort proceeds level by level: each level holds the names whose
/// references are all placed, sorted by normalized name. Self references are
/// ignored.
///
/// # Errors
///
/// Returns [`SchemaError::CircularDependency`] naming the first remaining
/// name when no level can be formed.
pub fn order_names(dependencies: &[Dependency]) -> Result<Vec<QualifiedName>> {
    let mut pending: BTreeMap<QualifiedName, BTreeSet<QualifiedName>> = BTreeMap::new();
    for dependency in dependencies {
        pending.entry(dependency.referenced_obj.clone()).or_default();
        let references = pending.entry(dependency.obj.clone()).or_default();
        if dependency.obj != dependency.referenced_obj {
            references.insert(dependency.referenced_obj.clone());
        }
    }

    let mut ordered = Vec::with_capacity(pending.len());
    while !pending.is_empty() {
        let level: Vec<QualifiedName> = pending
            .iter()
            .filter(|(_, references)| references.is_empty())
            .map(|(name, _)| name.clone())
            .collect();

        if level.is_empty() {
            let blocked = pending.keys().next().map(ToString::to_string).unwrap_or_default();
            return Err(SchemaError::CircularDependency(blocked));
        }

        for name in &level {
            pending.remove(name);
        }
        for references in pending.values_mut() {
            for name in &level {
                references.remove(name);
            }
        }
        ordered.extend(level);
    }

    Ok(ordered)
}

/// Orders routines so that callees precede callers.
///
/// Routines that appear in the dependency graph come first in topological
/// order; the rest follow in their input order.
///
/// # Errors
///
/// Returns [`SchemaError::CircularDependency`] if the graph has a cycle.
pub fn order_routines<'a, T: SchemaObject>(
    routines: &'a [T],
    dependencies: &[Dependency],
) -> Result<Vec<&'a T>> {
    let graph_order = order_names(dependencies)?;
    let by_name: HashMap<&QualifiedName, &'a T> = routines.iter().map(|r| (r.name(), r)).collect();

    let mut ordered: Vec<&'a T> = graph_order
        .iter()
        .filter_map(|name| by_name.get(name).copied())
        .collect();

    let in_graph: HashSet<&QualifiedName> = graph_order.iter().collect();
    ordered.extend(routines.iter().filter(|r| !in_graph.contains(r.name())));

    debug!(count = ordered.len(), "Ordered routines");
    Ok(ordered)
}
