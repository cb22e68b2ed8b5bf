//! Definition files.
//!
//! A definition file is a JSON envelope around a [`Database`] snapshot:
//!
//! ```json
//! { "format_version": 1, "generated_at": "2026-01-01T00:00:00Z", "database": { ... } }
//! ```

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use ddl_forge_core::database::Database;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ForgeError, Result};

/// Current definition format.
pub const FORMAT_VERSION: u32 = 1;

/// On-disk envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefinitionFile {
    pub format_version: u32,
    pub generated_at: DateTime<Utc>,
    pub database: Database,
}

impl DefinitionFile {
    /// Wraps a snapshot stamped with the current time.
    #[must_use]
    pub fn new(database: Database) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            generated_at: Utc::now(),
            database,
        }
    }
}

/// Serializes a snapshot.
///
/// # Errors
///
/// Returns [`ForgeError::Serialization`] if encoding fails.
pub fn serialize(database: &Database) -> Result<String> {
    Ok(serde_json::to_string_pretty(&DefinitionFile::new(database.clone()))?)
}

/// Deserializes and validates a snapshot.
///
/// # Errors
///
/// Returns [`ForgeError::DefinitionVersion`] for files written by a newer
/// format, [`ForgeError::Serialization`] for malformed content and
/// [`ForgeError::Schema`] if a table breaks its invariants.
pub fn deserialize(text: &str) -> Result<Database> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    let version = value
        .get("format_version")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| ForgeError::config("Definition file has no format_version"))?;
    let version = u32::try_from(version).unwrap_or(u32::MAX);
    if version > FORMAT_VERSION {
        return Err(ForgeError::DefinitionVersion(version));
    }

    let file: DefinitionFile = serde_json::from_value(value)?;
    debug!(generated_at = %file.generated_at, "Read definition envelope");
    let mut database = file.database;
    database.validate()?;
    database.finalise();
    Ok(database)
}

/// Writes a snapshot to `path`.
///
/// # Errors
///
/// Returns an error if encoding or writing fails.
pub fn write_definition(path: &Path, database: &Database) -> Result<()> {
    fs::write(path, serialize(database)?)?;
    info!(path = %path.display(), database = %database.name, "Wrote definition file");
    Ok(())
}

/// Reads a snapshot from `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or decoded.
pub fn read_definition(path: &Path) -> Result<Database> {
    let database = deserialize(&fs::read_to_string(path)?)?;
    info!(path = %path.display(), database = %database.name, "Read definition file");
    Ok(database)
}
