//! Generic type system.
//!
//! Every column, parameter and user-defined scalar type is normalized to a
//! dialect-neutral [`FieldType`] plus size and scale. Dialects turn the generic
//! description back into a DDL type name (see
//! [`DdlDialect::type_name`](crate::dialect::DdlDialect::type_name)).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SchemaError};
use crate::identifier::{Identifier, QualifiedName};
use crate::schema::{Field, Uddt};

/// Dialect-neutral classification of a column's storage type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum FieldType {
    /// No type information.
    #[default]
    Undefined,
    /// Integer; size is the width in bytes (1, 2, 3, 4 or 8).
    Integer,
    /// Character data; size is the declared length.
    String,
    /// Floating point; size is 4 (single) or 8 (double).
    Float,
    /// Exact numeric; size is the precision.
    Decimal,
    /// Date and/or time.
    Datetime,
    /// Boolean or bit.
    Boolean,
    /// GUID/UUID.
    UniqueIdentifier,
    /// Binary data; size is the declared length.
    Binary,
    /// SQL Server hierarchyid.
    Hierarchy,
}

impl FieldType {
    /// All generic kinds.
    pub const ALL: [Self; 10] = [
        Self::Undefined,
        Self::Integer,
        Self::String,
        Self::Float,
        Self::Decimal,
        Self::Datetime,
        Self::Boolean,
        Self::UniqueIdentifier,
        Self::Binary,
        Self::Hierarchy,
    ];

    /// Returns the canonical name of the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Undefined => "Undefined",
            Self::Integer => "Integer",
            Self::String => "String",
            Self::Float => "Float",
            Self::Decimal => "Decimal",
            Self::Datetime => "Datetime",
            Self::Boolean => "Boolean",
            Self::UniqueIdentifier => "UniqueIdentifier",
            Self::Binary => "Binary",
            Self::Hierarchy => "Hierarchy",
        }
    }

    /// Returns true if DDL defaults of this kind are written as quoted
    /// literals.
    #[must_use]
    pub const fn quotes_default(self) -> bool {
        matches!(self, Self::String | Self::Datetime)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| SchemaError::datatype(format!("Unknown generic type {s}")))
    }
}

/// Read access to the typed attributes shared by columns and UDDTs.
pub trait TypeSpec {
    /// Generic kind.
    fn generic_type(&self) -> FieldType;

    /// Size (width, length or precision depending on the kind).
    fn size(&self) -> i32;

    /// Scale, meaningful for decimals.
    fn scale(&self) -> i32;

    /// Dialect type name as imported, if preserved.
    fn native_type(&self) -> Option<&str>;
}

/// Outcome of [`normalize`]: the attributes a field or UDDT takes from its
/// native type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedType {
    /// Generic kind.
    pub generic_type: FieldType,
    /// Normalized size.
    pub size: i32,
    /// Normalized scale.
    pub scale: i32,
    /// Default expression as reported by the catalog.
    pub default: Option<String>,
    /// Native type name to preserve for same-dialect output.
    pub native_type: Option<String>,
}

impl NormalizedType {
    /// Builds a column from the normalized attributes.
    pub fn into_field(self, name: impl Into<Identifier>, required: bool, auto_increment: bool) -> Field {
        Field {
            name: name.into(),
            generic_type: self.generic_type,
            size: self.size,
            scale: self.scale,
            auto_increment,
            default: self.default,
            required,
            native_type: self.native_type,
        }
    }

    /// Builds a user-defined scalar type from the normalized attributes.
    #[must_use]
    pub fn into_uddt(self, name: QualifiedName, required: bool) -> Uddt {
        Uddt {
            name,
            generic_type: self.generic_type,
            size: self.size,
            scale: self.scale,
            required,
            native_type: self.native_type,
            operation: crate::schema::OperationType::Retain,
        }
    }
}

impl TypeSpec for NormalizedType {
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

/// Looks a native name up in the builtin table.
///
/// Returns `(kind, size, scale)`; `size`, `precision` and `scale` are the
/// catalog values and are only used by the kinds that carry them.
#[must_use]
pub fn builtin_type(native: &str, size: i32, precision: i32, scale: i32) -> Option<(FieldType, i32, i32)> {
    let resolved = match native.trim().to_lowercase().as_str() {
        "int" | "integer" => (FieldType::Integer, 4, 0),
        "bigint" => (FieldType::Integer, 8, 0),
        "smallint" => (FieldType::Integer, 2, 0),
        "tinyint" => (FieldType::Integer, 1, 0),
        "mediumint" => (FieldType::Integer, 3, 0),
        "float" | "real" => (FieldType::Float, 4, 0),
        "double" => (FieldType::Float, 8, 0),
        "decimal" | "numeric" | "money" | "smallmoney" => (FieldType::Decimal, precision, scale),
        "varchar" | "nvarchar" | "char" | "nchar" | "string" | "text" => (FieldType::String, size, 0),
        "sysname" => (FieldType::String, 128, 0),
        "varbinary" | "xml" => (FieldType::Binary, size, 0),
        "datetime" | "date" | "datetime2" | "smalldatetime" | "timestamp" | "time" => {
            (FieldType::Datetime, 0, 0)
        }
        "boolean" | "bool" | "bit" => (FieldType::Boolean, 1, 0),
        "uniqueidentifier" => (FieldType::UniqueIdentifier, 0, 0),
        "hierarchyid" => (FieldType::Hierarchy, 1, 0),
        "none" | "undefined" => (FieldType::Undefined, 0, 0),
        _ => return None,
    };
    Some(resolved)
}

/// Returns true for native names whose DDL carries a length or precision
/// suffix.
#[must_use]
pub fn takes_length(native: &str) -> bool {
    matches!(
        native.trim().to_lowercase().as_str(),
        "varchar" | "nvarchar" | "char" | "nchar" | "varbinary" | "decimal" | "numeric"
    )
}

/// Normalizes a native type to its generic description.
///
/// Names outside the builtin table are resolved against `known_uddts` (name
/// part, case-insensitive): the column inherits the UDDT's kind, size and
/// scale and keeps the UDDT name as its native type. Each UDDT in the list is
/// already normalized, so one lookup is enough for a UDDT declared over
/// another UDDT as long as the inner one was imported first.
///
/// # Errors
///
/// Returns [`SchemaError::Datatype`] if the name matches neither the builtin
/// table nor a known UDDT.
pub fn normalize(
    native: &str,
    size: i32,
    precision: i32,
    scale: i32,
    raw_default: Option<&str>,
    known_uddts: &[Uddt],
) -> Result<NormalizedType> {
    let default = raw_default.map(str::to_string);

    if let Some((generic_type, size, scale)) = builtin_type(native, size, precision, scale) {
        return Ok(NormalizedType {
            generic_type,
            size,
            scale,
            default,
            native_type: Some(native.to_string()),
        });
    }

    let uddt = known_uddts
        .iter()
        .find(|uddt| uddt.name.name.matches(native.trim()))
        .ok_or_else(|| SchemaError::datatype(format!("Unknown field type {native}")))?;

    Ok(NormalizedType {
        generic_type: uddt.generic_type,
        size: uddt.size,
        scale: uddt.scale,
        default,
        native_type: Some(uddt.name.name.as_str().to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uddt(name: &str, base: &str, size: i32) -> Uddt {
        normalize(base, size, 0, 0, None, &[])
            .unwrap()
            .into_uddt(QualifiedName::new("dbo", name), true)
    }

    #[test]
    fn test_integer_widths() {
        for (native, width) in [
            ("int", 4),
            ("INTEGER", 4),
            ("bigint", 8),
            ("smallint", 2),
            ("tinyint", 1),
            ("mediumint", 3),
        ] {
            let normalized = normalize(native, 0, 0, 0, None, &[]).unwrap();
            assert_eq!(normalized.generic_type, FieldType::Integer, "{native}");
            assert_eq!(normalized.size, width, "{native}");
        }
    }

    #[test]
    fn test_money_is_decimal_with_precision() {
        let normalized = normalize("money", 8, 19, 4, None, &[]).unwrap();
        assert_eq!(normalized.generic_type, FieldType::Decimal);
        assert_eq!(normalized.size, 19);
        assert_eq!(normalized.scale, 4);
        assert_eq!(normalized.native_type.as_deref(), Some("money"));
    }

    #[test]
    fn test_strings_keep_declared_length() {
        let normalized = normalize("NVarChar", 50, 0, 0, Some("('n/a')"), &[]).unwrap();
        assert_eq!(normalized.generic_type, FieldType::String);
        assert_eq!(normalized.size, 50);
        assert_eq!(normalized.default.as_deref(), Some("('n/a')"));

        let sysname = normalize("sysname", 256, 0, 0, None, &[]).unwrap();
        assert_eq!(sysname.size, 128);
    }

    #[test]
    fn test_misc_kinds() {
        let cases = [
            ("xml", FieldType::Binary, -1),
            ("datetime2", FieldType::Datetime, 0),
            ("bit", FieldType::Boolean, 1),
            ("uniqueidentifier", FieldType::UniqueIdentifier, 0),
            ("hierarchyid", FieldType::Hierarchy, 1),
            ("double", FieldType::Float, 8),
            ("real", FieldType::Float, 4),
            ("none", FieldType::Undefined, 0),
        ];
        for (native, kind, size) in cases {
            let normalized = normalize(native, -1, 0, 0, None, &[]).unwrap();
            assert_eq!(normalized.generic_type, kind, "{native}");
            assert_eq!(normalized.size, size, "{native}");
        }
    }

    #[test]
    fn test_unknown_type_is_fatal() {
        let err = normalize("bogus_type", 0, 0, 0, None, &[]).unwrap_err();
        assert!(err.is_datatype_error());
    }

    #[test]
    fn test_uddt_reference() {
        let uddts = vec![uddt("Name", "nvarchar", 100)];
        let normalized = normalize("name", 0, 0, 0, None, &uddts).unwrap();
        assert_eq!(normalized.generic_type, FieldType::String);
        assert_eq!(normalized.size, 100);
        assert_eq!(normalized.native_type.as_deref(), Some("Name"));
    }

    #[test]
    fn test_two_level_uddt_reference() {
        let mut uddts = vec![uddt("Amount", "decimal", 0)];
        uddts[0].size = 18;
        uddts[0].scale = 2;
        let price = normalize("Amount", 0, 0, 0, None, &uddts)
            .unwrap()
            .into_uddt(QualifiedName::new("dbo", "Price"), false);
        uddts.push(price);

        let normalized = normalize("Price", 0, 0, 0, None, &uddts).unwrap();
        assert_eq!(normalized.generic_type, FieldType::Decimal);
        assert_eq!(normalized.size, 18);
        assert_eq!(normalized.scale, 2);
        assert_eq!(normalized.native_type.as_deref(), Some("Price"));
    }

    #[test]
    fn test_two_level_uddt_out_of_order_fails() {
        let err = normalize("Price", 0, 0, 0, None, &[]).unwrap_err();
        assert!(err.is_datatype_error());
    }

    #[test]
    fn test_field_type_parse() {
        assert_eq!("decimal".parse::<FieldType>().unwrap(), FieldType::Decimal);
        assert_eq!(
            "UniqueIdentifier".parse::<FieldType>().unwrap(),
            FieldType::UniqueIdentifier
        );
        assert!("blob".parse::<FieldType>().is_err());
    }

    #[test]
    fn test_takes_length() {
        assert!(takes_length("NVARCHAR"));
        assert!(takes_length("decimal"));
        assert!(!takes_length("sysname"));
        assert!(!takes_length("int"));
    }
}
