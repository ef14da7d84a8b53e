//! YAML file format of the hardware database.
//!
//! A database file is a stream of YAML documents, one per wafer, DLS setup,
//! HX-cube or Jboa. [`load`] replaces nothing on failure: the file is parsed
//! into a fresh [`Database`] which is only handed out once every document has
//! been accepted. [`save`] writes atomically and keeps the mode of the file it
//! replaces.
//!
//! ```yaml
//! ---
//! wafer: 5
//! setuptype: bsswafer
//! macu: 192.168.200.165
//! macuversion: 1
//! fpgas:
//!   - fpga: 0
//!     ip: 192.168.5.1
//! hicanns:
//!   version: 4
//!   label: v4-26
//! ```

mod documents;
mod error;
#[cfg(test)]
mod round_trip;

use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_yaml::{Deserializer, Value};

use hwdb_core::Database;
use hwdb_utils::{AtomicWriteOptions, PersistMode, atomic_write_with_options, recover_bak_file};

pub use error::PersistError;

/// System-wide database used when neither a path argument nor the config
/// names one.
pub const DEFAULT_DATABASE_PATH: &str = "/wang/data/bss-hwdb/db.yaml";

#[must_use]
pub fn default_path() -> &'static Path {
    Path::new(DEFAULT_DATABASE_PATH)
}

/// Parse a complete database file.
///
/// Documents of unknown kind are skipped with a warning; any other problem
/// fails the whole parse.
pub fn parse(text: &str) -> Result<Database, PersistError> {
    let mut db = Database::new();
    for (index, document) in Deserializer::from_str(text).enumerate() {
        let value = Value::deserialize(document)
            .map_err(|source| PersistError::Parse { document: index, source })?;
        if value.is_null() {
            continue;
        }
        let known = documents::apply(&mut db, value)
            .map_err(|error| PersistError::in_document(index, error))?;
        if !known {
            tracing::warn!(
                document = index,
                "Ignoring document without wafer, dls_setup, hxcube_id or jboa_id key"
            );
        }
    }
    Ok(db)
}

fn read(path: &Path) -> Result<String, PersistError> {
    recover_bak_file(path);
    fs::read_to_string(path).map_err(|source| PersistError::Read {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load(path: &Path) -> Result<Database, PersistError> {
    let db = parse(&read(path)?)?;
    tracing::debug!(
        path = %path.display(),
        wafers = db.wafers().count(),
        dls_setups = db.dls_setups().count(),
        hxcubes = db.hxcubes().count(),
        jboas = db.jboas().count(),
        "Loaded hardware database"
    );
    Ok(db)
}

/// Load `path` into `db`, which must be empty. On error `db` is untouched.
pub fn load_into(db: &mut Database, path: &Path) -> Result<(), PersistError> {
    if !db.is_empty() {
        return Err(PersistError::NotEmpty);
    }
    *db = load(path)?;
    Ok(())
}

pub fn load_default() -> Result<Database, PersistError> {
    load(default_path())
}

/// Render `db` in the file format, every document preceded by `---`.
pub fn dump(db: &Database) -> Result<String, PersistError> {
    let mut out = String::new();
    for document in documents::documents(db) {
        out.push_str("---\n");
        out.push_str(&serde_yaml::to_string(&document).map_err(PersistError::Serialize)?);
    }
    Ok(out)
}

pub fn save(db: &Database, path: &Path) -> Result<(), PersistError> {
    let text = dump(db)?;
    let options = AtomicWriteOptions {
        mode: PersistMode::inherit_from(path),
        ..AtomicWriteOptions::default()
    };
    atomic_write_with_options(path, text.as_bytes(), options).map_err(|source| {
        PersistError::Write {
            path: path.to_path_buf(),
            source,
        }
    })?;
    tracing::info!(path = %path.display(), "Saved hardware database");
    Ok(())
}

// ── Raw document access ───────────────────────────────────────────────────

/// Split a document stream at `---` marker lines, keeping each document's
/// original text.
fn split_documents(text: &str) -> Vec<&str> {
    let mut documents = Vec::new();
    let mut start = 0;
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        if line.trim_end() == "---" {
            documents.push(&text[start..offset]);
            start = offset + line.len();
        }
        offset += line.len();
    }
    documents.push(&text[start..]);
    documents.retain(|document| !document.trim().is_empty());
    documents
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

/// The text of every document in `path` whose top-level `node` equals
/// `query`, joined by `---` lines. Empty when nothing matches or `query` is
/// empty.
pub fn yaml_entries(path: &Path, node: &str, query: &str) -> Result<String, PersistError> {
    if query.is_empty() {
        return Ok(String::new());
    }
    let text = read(path)?;

    let mut matches = Vec::new();
    for (index, document) in split_documents(&text).into_iter().enumerate() {
        let value: Value = serde_yaml::from_str(document)
            .map_err(|source| PersistError::Parse { document: index, source })?;
        let hit = value
            .get(node)
            .and_then(scalar_text)
            .is_some_and(|text| text == query);
        if hit {
            matches.push(document.trim());
        }
    }
    Ok(matches.join("\n---\n"))
}
