//! Case-insensitive identifiers and schema-qualified names.
//!
//! Every schema object is keyed by a [`QualifiedName`]. Catalogs disagree on
//! the casing they report (`dbo` vs `DBO`), so identity is computed from the
//! lower-cased display form while the original spelling is kept for output.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// A single name part (schema, table, column...).
///
/// Equality, ordering and hashing ignore ASCII and Unicode case.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifier(String);

impl Identifier {
    /// Creates an identifier from its raw spelling.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Returns the name as imported.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the lower-cased comparison key.
    #[must_use]
    pub fn normalized(&self) -> String {
        self.0.to_lowercase()
    }

    /// Returns true if the identifier is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Case-insensitive comparison against a plain string.
    #[must_use]
    pub fn matches(&self, other: &str) -> bool {
        self.normalized() == other.to_lowercase()
    }
}

impl PartialEq for Identifier {
    fn eq(&self, other: &Self) -> bool {
        self.normalized() == other.normalized()
    }
}

impl Eq for Identifier {}

impl Hash for Identifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.normalized().hash(state);
    }
}

impl PartialOrd for Identifier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Identifier {
    fn cmp(&self, other: &Self) -> Ordering {
        self.normalized().cmp(&other.normalized())
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identifier {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Identifier {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A schema-qualified object name (`schema.name`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QualifiedName {
    /// Owning schema; empty for dialects without schemas.
    pub schema: Identifier,
    /// Object name.
    pub name: Identifier,
}

impl QualifiedName {
    /// Creates a qualified name.
    pub fn new(schema: impl Into<Identifier>, name: impl Into<Identifier>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
        }
    }

    /// Creates a name without a schema.
    pub fn unqualified(name: impl Into<Identifier>) -> Self {
        Self::new("", name)
    }

    /// Parses `schema.name` or `name`. Only the first dot separates the
    /// schema.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value.split_once('.') {
            Some((schema, name)) => Self::new(schema, name),
            None => Self::unqualified(value),
        }
    }

    /// Returns the lower-cased display form, the identity key of the name.
    #[must_use]
    pub fn normalized(&self) -> String {
        self.to_string().to_lowercase()
    }
}

impl PartialEq for QualifiedName {
    fn eq(&self, other: &Self) -> bool {
        self.normalized() == other.normalized()
    }
}

impl Eq for QualifiedName {}

impl Hash for QualifiedName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.normalized().hash(state);
    }
}

impl PartialOrd for QualifiedName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QualifiedName {
    fn cmp(&self, other: &Self) -> Ordering {
        self.normalized().cmp(&other.normalized())
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.schema.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}.{}", self.schema, self.name)
        }
    }
}
