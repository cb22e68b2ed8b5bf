//! Import options.
//!
//! Options are passed as a `key=value` list separated by `;` or `&`, for
//! example `exclude-views=true;exclude-dependencies=1`.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::ForgeError;

static OPTION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([\w-]+)\s*=\s*([^;&]*)").expect("option pattern is valid"));

/// Part of a catalog that can be left out of an import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImportCategory {
    Tables,
    Views,
    Functions,
    Udts,
    StoredProcedures,
    ForeignKeys,
    Constraints,
    PrimaryKeys,
    Dependencies,
}

impl ImportCategory {
    /// Every category, in import order.
    pub const ALL: [Self; 9] = [
        Self::Udts,
        Self::Tables,
        Self::PrimaryKeys,
        Self::ForeignKeys,
        Self::Constraints,
        Self::Views,
        Self::StoredProcedures,
        Self::Functions,
        Self::Dependencies,
    ];

    /// Option key that excludes this category.
    #[must_use]
    pub const fn option_key(self) -> &'static str {
        match self {
            Self::Tables => "exclude-tables",
            Self::Views => "exclude-views",
            Self::Functions => "exclude-functions",
            Self::Udts => "exclude-udts",
            Self::StoredProcedures => "exclude-storedprocedures",
            Self::ForeignKeys => "exclude-foreignkeys",
            Self::Constraints => "exclude-constraints",
            Self::PrimaryKeys => "exclude-primarykeys",
            Self::Dependencies => "exclude-dependencies",
        }
    }
}

impl fmt::Display for ImportCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Tables => "tables",
            Self::Views => "views",
            Self::Functions => "functions",
            Self::Udts => "user-defined types",
            Self::StoredProcedures => "stored procedures",
            Self::ForeignKeys => "foreign keys",
            Self::Constraints => "constraints",
            Self::PrimaryKeys => "primary keys",
            Self::Dependencies => "dependencies",
        };
        f.write_str(name)
    }
}

/// Parsed import options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportOptions {
    values: HashMap<String, String>,
}

impl ImportOptions {
    /// Creates empty options (everything included).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a `key=value;...` list. Malformed fragments are skipped.
    #[must_use]
    pub fn parse(options: &str) -> Self {
        let values = OPTION_PATTERN
            .captures_iter(options)
            .map(|caps| (caps[1].to_lowercase(), caps[2].trim().to_string()))
            .collect();
        Self { values }
    }

    /// Sets an option.
    #[must_use]
    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.values.insert(key.to_lowercase(), value.to_string());
        self
    }

    /// Overlays `other` on these options; keys in `other` win.
    #[must_use]
    pub fn merge(mut self, other: &Self) -> Self {
        self.values
            .extend(other.values.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    /// Returns the raw value of an option.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(&key.to_lowercase()).map(String::as_str)
    }

    /// Returns the value of an option or `default`.
    #[must_use]
    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    /// Returns true if the option is present with a value other than
    /// `false`, `0` or `no`.
    #[must_use]
    pub fn is_set(&self, key: &str) -> bool {
        self.get(key)
            .is_some_and(|value| !matches!(value.to_lowercase().as_str(), "false" | "0" | "no"))
    }

    /// Returns true if `category` should be skipped.
    #[must_use]
    pub fn excludes(&self, category: ImportCategory) -> bool {
        self.is_set(category.option_key())
    }
}

impl FromStr for ImportOptions {
    type Err = ForgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}
