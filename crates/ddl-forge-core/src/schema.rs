//! Schema object model.
//!
//! These types describe the objects captured from a database catalog. They
//! are plain values: the diff engine tags clones with an [`OperationType`]
//! rather than mutating the snapshot it was given.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SchemaError};
use crate::identifier::{Identifier, QualifiedName};
use crate::types::{FieldType, TypeSpec};

/// What a change set wants done with an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OperationType {
    /// Object is new in the target.
    Create,
    /// Object disappeared from the target.
    Drop,
    /// Object exists on both sides with a different shape.
    Modify,
    /// Object is unchanged (the state of every freshly imported object).
    #[default]
    Retain,
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Create => "Create",
            Self::Drop => "Drop",
            Self::Modify => "Modify",
            Self::Retain => "Retain",
        };
        f.write_str(name)
    }
}

/// Category of a top-level schema object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ObjectType {
    Table,
    View,
    StoredProcedure,
    Function,
    #[serde(rename = "UDDT")]
    Uddt,
    #[serde(rename = "UDTT")]
    Udtt,
}

impl ObjectType {
    /// Returns the canonical name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Table => "Table",
            Self::View => "View",
            Self::StoredProcedure => "StoredProcedure",
            Self::Function => "Function",
            Self::Uddt => "UDDT",
            Self::Udtt => "UDTT",
        }
    }

    /// Maps a SQL Server `sys.objects.type` code (or the `UDDT`/`UDTT`
    /// markers used for parameter types).
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Data`] for codes with no counterpart.
    pub fn from_catalog_code(code: &str) -> Result<Self> {
        match code.trim().to_uppercase().as_str() {
            "P" => Ok(Self::StoredProcedure),
            "FN" | "TF" | "IF" => Ok(Self::Function),
            "UDTT" => Ok(Self::Udtt),
            "UDDT" => Ok(Self::Uddt),
            "U" => Ok(Self::Table),
            "V" => Ok(Self::View),
            other => Err(SchemaError::data(format!("Unknown object type code {other}"))),
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectType {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self> {
        [
            Self::Table,
            Self::View,
            Self::StoredProcedure,
            Self::Function,
            Self::Uddt,
            Self::Udtt,
        ]
        .into_iter()
        .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
        .ok_or_else(|| SchemaError::data(format!("Unknown object type {s}")))
    }
}

/// Capabilities shared by every top-level schema object.
pub trait SchemaObject: Clone {
    /// Category of the object.
    const OBJECT_TYPE: ObjectType;

    /// Identity of the object.
    fn name(&self) -> &QualifiedName;

    /// Category of the object.
    fn object_type(&self) -> ObjectType {
        Self::OBJECT_TYPE
    }

    /// Change-set tag.
    fn operation(&self) -> OperationType;

    /// Returns the object tagged with `operation`.
    #[must_use]
    fn with_operation(self, operation: OperationType) -> Self;

    /// Canonicalizes internal orderings.
    fn finalise(&mut self) {}

    /// Compares every semantic attribute, ignoring the operation tag and the
    /// declaration order of nested lists.
    fn structurally_eq(&self, other: &Self) -> bool;
}

/// Order-independent list comparison keyed by `key`.
fn same_members<T, K, F>(a: &[T], b: &[T], key: F) -> bool
where
    T: PartialEq,
    K: Ord,
    F: Fn(&T) -> K,
{
    if a.len() != b.len() {
        return false;
    }
    let mut a: Vec<&T> = a.iter().collect();
    let mut b: Vec<&T> = b.iter().collect();
    a.sort_by_key(|item| key(*item));
    b.sort_by_key(|item| key(*item));
    a.iter().zip(b.iter()).all(|(x, y)| x == y)
}

/// A column of a table, view or table type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Column name.
    pub name: Identifier,
    /// Generic kind.
    pub generic_type: FieldType,
    /// Width, length or precision.
    pub size: i32,
    /// Decimal scale.
    pub scale: i32,
    /// Identity / auto-increment column.
    pub auto_increment: bool,
    /// Default expression as captured.
    pub default: Option<String>,
    /// NOT NULL.
    pub required: bool,
    /// Dialect type name as imported.
    pub native_type: Option<String>,
}

impl Field {
    /// Creates a nullable column with no default.
    pub fn new(name: impl Into<Identifier>, generic_type: FieldType, size: i32) -> Self {
        Self {
            name: name.into(),
            generic_type,
            size,
            scale: 0,
            auto_increment: false,
            default: None,
            required: false,
            native_type: None,
        }
    }

    /// Sets the column as NOT NULL.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Sets the column as auto-incrementing.
    #[must_use]
    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    /// Sets the default expression.
    #[must_use]
    pub fn default_value(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Sets the scale.
    #[must_use]
    pub fn scale(mut self, scale: i32) -> Self {
        self.scale = scale;
        self
    }

    /// Preserves the native type name.
    #[must_use]
    pub fn native(mut self, native_type: impl Into<String>) -> Self {
        self.native_type = Some(native_type.into());
        self
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({},{})", self.name, self.generic_type, self.size, self.scale)?;
        if self.auto_increment {
            f.write_str(" AUTOINC")?;
        }
        if let Some(default) = &self.default {
            write!(f, " DEFAULT {default}")?;
        }
        f.write_str(if self.required { " NOT NULL" } else { " NULL" })
    }
}

impl TypeSpec for Field {
    fn generic_type(&self) -> FieldType {
        self.generic_type
    }

    fn size(&self) -> i32 {
        self.size
    }

    fn scale(&self) -> i32 {
        self.scale
    }

    fn native_type(&self) -> Option<&str> {
        self.native_type.as_deref()
    }
}

/// User-defined scalar type (an alias over a generic kind).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Uddt {
    pub name: QualifiedName,
    pub generic_type: FieldType,
    pub size: i32,
    pub scale: i32,
    pub required: bool,
    pub native_type: Option<String>,
    #[serde(default)]
    pub operation: OperationType,
}

impl Uddt {
    /// Creates a nullable UDDT.
    #[must_use]
    pub fn new(name: QualifiedName, generic_type: FieldType, size: i32) -> Self {
        Self {
            name,
            generic_type,
            size,
            scale: 0,
            required: false,
            native_type: None,
            operation: OperationType::Retain,
        }
    }
}

impl TypeSpec for Uddt {
    fn generic_type(&self) -> FieldType {
        self.generic_type
    }

    fn size(&self) -> i32 {
        self.size
    }

    fn scale(&self) -> i32 {
        self.scale
    }

    fn native_type(&self) -> Option<&str> {
        self.native_type.as_deref()
    }
}

impl SchemaObject for Uddt {
    const OBJECT_TYPE: ObjectType = ObjectType::Uddt;

    fn name(&self) -> &QualifiedName {
        &self.name
    }

    fn operation(&self) -> OperationType {
        self.operation
    }

    fn with_operation(mut self, operation: OperationType) -> Self {
        self.operation = operation;
        self
    }

    fn structurally_eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.generic_type == other.generic_type
            && self.size == other.size
            && self.scale == other.scale
            && self.required == other.required
            && self.native_type == other.native_type
    }
}

/// User-defined table type, used for table-valued parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Udtt {
    pub name: QualifiedName,
    pub fields: Vec<Field>,
    #[serde(default)]
    pub operation: OperationType,
}

impl Udtt {
    /// Creates an empty table type.
    #[must_use]
    pub fn new(name: QualifiedName) -> Self {
        Self {
            name,
            fields: Vec::new(),
            operation: OperationType::Retain,
        }
    }

    /// Adds a column.
    #[must_use]
    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Finds a column by name.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Data`] if the column does not exist.
    pub fn find_field(&self, name: &str) -> Result<&Field> {
        self.fields
            .iter()
            .find(|f| f.name.matches(name))
            .ok_or_else(|| SchemaError::data(format!("Could not find field {name} in {}", self.name)))
    }
}

impl SchemaObject for Udtt {
    const OBJECT_TYPE: ObjectType = ObjectType::Udtt;

    fn name(&self) -> &QualifiedName {
        &self.name
    }

    fn operation(&self) -> OperationType {
        self.operation
    }

    fn with_operation(mut self, operation: OperationType) -> Self {
        self.operation = operation;
        self
    }

    fn structurally_eq(&self, other: &Self) -> bool {
        self.name == other.name && same_members(&self.fields, &other.fields, |f| f.name.clone())
    }
}

/// Kind of key or index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum KeyType {
    #[default]
    Undefined,
    PrimaryKey,
    Index,
    Unique,
    ForeignKey,
    Lookup,
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Undefined => "Undefined",
            Self::PrimaryKey => "PrimaryKey",
            Self::Index => "Index",
            Self::Unique => "Unique",
            Self::ForeignKey => "ForeignKey",
            Self::Lookup => "Lookup",
        };
        f.write_str(name)
    }
}

impl FromStr for KeyType {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "undefined" => Ok(Self::Undefined),
            "primarykey" | "primary key" => Ok(Self::PrimaryKey),
            "index" => Ok(Self::Index),
            "unique" => Ok(Self::Unique),
            "foreignkey" | "foreign key" => Ok(Self::ForeignKey),
            "lookup" => Ok(Self::Lookup),
            other => Err(SchemaError::datatype(format!("Unknown key type {other}"))),
        }
    }
}

/// Primary key, index, unique constraint or foreign key.
///
/// Column names compare case-insensitively, like [`Identifier`]s.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
pub struct Key {
    pub name: QualifiedName,
    pub key_type: KeyType,
    /// Local columns, in key order.
    pub fields: Vec<String>,
    /// Target table of a foreign key.
    pub primary_table: Option<QualifiedName>,
    /// Target columns of a foreign key.
    pub primary_fields: Vec<String>,
    pub referenced_table: Option<QualifiedName>,
}

impl Key {
    /// Creates a key over `fields`.
    pub fn new(name: QualifiedName, key_type: KeyType, fields: Vec<impl Into<String>>) -> Self {
        Self {
            name,
            key_type,
            fields: fields.into_iter().map(Into::into).collect(),
            primary_table: None,
            primary_fields: Vec::new(),
            referenced_table: None,
        }
    }

    /// Creates a foreign key from `fields` to `primary_table(primary_fields)`.
    pub fn foreign(
        name: QualifiedName,
        fields: Vec<impl Into<String>>,
        primary_table: QualifiedName,
        primary_fields: Vec<impl Into<String>>,
    ) -> Self {
        Self {
            primary_table: Some(primary_table),
            primary_fields: primary_fields.into_iter().map(Into::into).collect(),
            ..Self::new(name, KeyType::ForeignKey, fields)
        }
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.key_type == other.key_type
            && same_columns(&self.fields, &other.fields)
            && self.primary_table == other.primary_table
            && same_columns(&self.primary_fields, &other.primary_fields)
            && self.referenced_table == other.referenced_table
    }
}

fn same_columns(a: &[String], b: &[String]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_lowercase() == y.to_lowercase())
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.name, self.key_type, self.fields.join(","))?;
        if let Some(primary_table) = &self.primary_table {
            write!(f, " -> {primary_table}({})", self.primary_fields.join(","))?;
        }
        Ok(())
    }
}

/// Check constraint; the definition is opaque.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraint {
    pub name: QualifiedName,
    pub table_name: QualifiedName,
    pub definition: String,
}

impl Constraint {
    /// Creates a check constraint.
    pub fn new(name: QualifiedName, table_name: QualifiedName, definition: impl Into<String>) -> Self {
        Self {
            name,
            table_name,
            definition: definition.into(),
        }
    }
}

/// A base table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    pub name: QualifiedName,
    pub fields: Vec<Field>,
    pub pk: Option<Key>,
    #[serde(default)]
    pub keys: Vec<Key>,
    #[serde(default)]
    pub foreign_keys: Vec<Key>,
    #[serde(default)]
    pub constraints: Vec<Constraint>,
    #[serde(default)]
    pub operation: OperationType,
}

impl Table {
    /// Creates an empty table.
    #[must_use]
    pub fn new(name: QualifiedName) -> Self {
        Self {
            name,
            fields: Vec::new(),
            pk: None,
            keys: Vec::new(),
            foreign_keys: Vec::new(),
            constraints: Vec::new(),
            operation: OperationType::Retain,
        }
    }

    /// Adds a column.
    #[must_use]
    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Sets the primary key.
    #[must_use]
    pub fn primary_key(mut self, pk: Key) -> Self {
        self.pk = Some(pk);
        self
    }

    /// Adds an index, unique or lookup key.
    #[must_use]
    pub fn key(mut self, key: Key) -> Self {
        self.keys.push(key);
        self
    }

    /// Adds a foreign key.
    #[must_use]
    pub fn foreign_key(mut self, fk: Key) -> Self {
        self.foreign_keys.push(fk);
        self
    }

    /// Adds a check constraint.
    #[must_use]
    pub fn constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Gets a column by name (case-insensitive).
    #[must_use]
    pub fn get_field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name.matches(name))
    }

    /// Finds a column by name.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Data`] if the column does not exist.
    pub fn find_field(&self, name: &str) -> Result<&Field> {
        self.get_field(name)
            .ok_or_else(|| SchemaError::data(format!("Could not find field {name} in {}", self.name)))
    }

    /// Foreign keys, including any declared among `keys`.
    pub fn all_foreign_keys(&self) -> impl Iterator<Item = &Key> {
        self.foreign_keys
            .iter()
            .chain(self.keys.iter().filter(|k| k.key_type == KeyType::ForeignKey))
    }

    /// Checks that every key column exists.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Data`] naming the first missing column.
    pub fn validate(&self) -> Result<()> {
        let keys = self
            .pk
            .iter()
            .chain(self.keys.iter())
            .chain(self.foreign_keys.iter());
        for key in keys {
            for column in &key.fields {
                if self.get_field(column).is_none() {
                    return Err(SchemaError::data(format!(
                        "Key {} on {} references missing column {column}",
                        key.name, self.name
                    )));
                }
            }
        }
        Ok(())
    }
}

impl SchemaObject for Table {
    const OBJECT_TYPE: ObjectType = ObjectType::Table;

    fn name(&self) -> &QualifiedName {
        &self.name
    }

    fn operation(&self) -> OperationType {
        self.operation
    }

    fn with_operation(mut self, operation: OperationType) -> Self {
        self.operation = operation;
        self
    }

    // Columns keep declaration order: it is visible in the generated DDL.
    fn finalise(&mut self) {
        self.keys.sort_by(|a, b| a.name.cmp(&b.name));
        self.foreign_keys.sort_by(|a, b| a.name.cmp(&b.name));
        self.constraints.sort_by(|a, b| a.name.cmp(&b.name));
    }

    fn structurally_eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.pk == other.pk
            && same_members(&self.fields, &other.fields, |f| f.name.clone())
            && same_members(&self.keys, &other.keys, |k| k.name.clone())
            && same_members(&self.foreign_keys, &other.foreign_keys, |k| k.name.clone())
            && same_members(&self.constraints, &other.constraints, |c| c.name.clone())
    }
}

/// A view: a table shape plus its query text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct View {
    pub name: QualifiedName,
    #[serde(default)]
    pub fields: Vec<Field>,
    pub definition: String,
    #[serde(default)]
    pub operation: OperationType,
}

impl View {
    /// Creates a view with no columns.
    pub fn new(name: QualifiedName, definition: impl Into<String>) -> Self {
        Self {
            name,
            fields: Vec::new(),
            definition: definition.into(),
            operation: OperationType::Retain,
        }
    }

    /// Adds a column.
    #[must_use]
    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }
}

impl SchemaObject for View {
    const OBJECT_TYPE: ObjectType = ObjectType::View;

    fn name(&self) -> &QualifiedName {
        &self.name
    }

    fn operation(&self) -> OperationType {
        self.operation
    }

    fn with_operation(mut self, operation: OperationType) -> Self {
        self.operation = operation;
        self
    }

    fn structurally_eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.definition == other.definition
            && same_members(&self.fields, &other.fields, |f| f.name.clone())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredProcedure {
    pub name: QualifiedName,
    pub text: String,
    #[serde(default)]
    pub operation: OperationType,
}

impl StoredProcedure {
    pub fn new(name: QualifiedName, text: impl Into<String>) -> Self {
        Self {
            name,
            text: text.into(),
            operation: OperationType::Retain,
        }
    }
}

impl SchemaObject for StoredProcedure {
    const OBJECT_TYPE: ObjectType = ObjectType::StoredProcedure;

    fn name(&self) -> &QualifiedName {
        &self.name
    }

    fn operation(&self) -> OperationType {
        self.operation
    }

    fn with_operation(mut self, operation: OperationType) -> Self {
        self.operation = operation;
        self
    }

    fn structurally_eq(&self, other: &Self) -> bool {
        self.name == other.name && self.text == other.text
    }
}

/// Scalar or table-valued function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FunctionType {
    #[default]
    ScalarFunction,
    TableFunction,
}

impl FunctionType {
    /// Maps the catalog labels `function` and `table function`.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Data`] for any other label.
    pub fn from_catalog(label: &str) -> Result<Self> {
        match label.trim().to_lowercase().as_str() {
            "function" => Ok(Self::ScalarFunction),
            "table function" => Ok(Self::TableFunction),
            other => Err(SchemaError::data(format!("Unknown function type {other}"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Function {
    pub name: QualifiedName,
    pub text: String,
    #[serde(default)]
    pub function_type: FunctionType,
    #[serde(default)]
    pub operation: OperationType,
}

impl Function {
    pub fn new(name: QualifiedName, text: impl Into<String>, function_type: FunctionType) -> Self {
        Self {
            name,
            text: text.into(),
            function_type,
            operation: OperationType::Retain,
        }
    }
}

impl SchemaObject for Function {
    const OBJECT_TYPE: ObjectType = ObjectType::Function;

    fn name(&self) -> &QualifiedName {
        &self.name
    }

    fn operation(&self) -> OperationType {
        self.operation
    }

    fn with_operation(mut self, operation: OperationType) -> Self {
        self.operation = operation;
        self
    }

    fn structurally_eq(&self, other: &Self) -> bool {
        self.name == other.name && self.text == other.text && self.function_type == other.function_type
    }
}

/// Directed edge: `obj` depends on `referenced_obj`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dependency {
    pub obj: QualifiedName,
    pub referenced_obj: QualifiedName,
    /// Category of the referenced object.
    pub obj_type: ObjectType,
}

impl Dependency {
    pub const fn new(obj: QualifiedName, referenced_obj: QualifiedName, obj_type: ObjectType) -> Self {
        Self {
            obj,
            referenced_obj,
            obj_type,
        }
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} => {} ({})", self.obj, self.referenced_obj, self.obj_type)
    }
}
