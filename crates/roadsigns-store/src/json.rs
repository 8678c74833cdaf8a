//! On-disk JSON snapshot of the sign database.

use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use roadsigns_core::{Database, PartialDatabase, split_sign_codes};
use tempfile::NamedTempFile;
use tracing::{info, warn};

use crate::StoreError;

/// The persisted database: one pretty-printed JSON document.
///
/// Writes go to a temp file in the target directory which then replaces the
/// old snapshot, so an interrupted run never leaves a truncated file.
pub struct JsonStore {
    path: PathBuf,
}

impl JsonStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the snapshot. A missing file is an empty database.
    pub fn load(&self) -> Result<Database, StoreError> {
        if !self.path.exists() {
            return Ok(Database::new());
        }
        read_database(&self.path)
    }

    pub fn save(&self, db: &Database) -> Result<(), StoreError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).map_err(|source| self.io_error(source))?;

        let tmp = NamedTempFile::new_in(dir).map_err(|source| self.io_error(source))?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            serde_json::to_writer_pretty(&mut writer, db).map_err(|source| StoreError::Json {
                path: self.path.clone(),
                source,
            })?;
            writer
                .write_all(b"\n")
                .and_then(|()| writer.flush())
                .map_err(|source| self.io_error(source))?;
        }
        tmp.persist(&self.path).map_err(|source| StoreError::Persist {
            path: self.path.clone(),
            source,
        })?;

        info!(
            path = %self.path.display(),
            countries = db.country_count(),
            signs = db.sign_count(),
            "saved sign database"
        );
        Ok(())
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

/// Load the manually curated overrides layer.
///
/// A missing file yields an empty partial database; malformed JSON is an
/// error. Country and sign codes are canonicalised like adapter output.
pub fn load_overrides(path: &Path) -> Result<PartialDatabase, StoreError> {
    if !path.exists() {
        warn!(path = %path.display(), "overrides file not found, continuing without it");
        return Ok(PartialDatabase::new());
    }
    let overrides = canonical_keys(read_database(path)?);
    info!(path = %path.display(), signs = overrides.sign_count(), "loaded overrides");
    Ok(overrides)
}

/// Upper-case country keys and split/upper-case sign codes. When two keys
/// collapse onto one, the last in sorted key order wins.
fn canonical_keys(raw: PartialDatabase) -> PartialDatabase {
    let mut db = PartialDatabase::new();
    for (country, signs) in raw {
        let country = country.trim().to_uppercase();
        for (raw_code, record) in signs {
            let codes = split_sign_codes(&raw_code);
            if codes.is_empty() {
                warn!(
                    country = %country,
                    code = %raw_code,
                    "override without a sign code, skipping"
                );
                continue;
            }
            for code in codes {
                if db
                    .insert(country.as_str(), code.as_str(), record.clone())
                    .is_some()
                {
                    warn!(
                        country = %country,
                        code = %code,
                        "duplicate override key, keeping the later one"
                    );
                }
            }
        }
    }
    db
}

fn read_database(path: &Path) -> Result<Database, StoreError> {
    let text = std::fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })
}
