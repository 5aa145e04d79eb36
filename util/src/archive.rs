//! CSV archiving of per-cycle records
//!
//! Modules that want to keep a record of their cyclic processing own an [`Archiver`] and write
//! one serialisable record per cycle into it. Archives live under the session's `arch` directory.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use std::path::Path;
use std::fs::{File, OpenOptions};
use csv::WriterBuilder;
pub use csv::Writer;
use serde::Serialize;
use thiserror::Error;

// Internal imports
use crate::session::Session;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// An object used to write CSV archive files.
pub struct Archiver {
    writer: Writer<File>
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors raised while creating or writing an archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Could not create the archive file: {0}")]
    CreateError(std::io::Error),

    #[error("Could not write the record: {0}")]
    WriteError(csv::Error),

    #[error("Could not flush the archive: {0}")]
    FlushError(std::io::Error),
}

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A trait which enables a struct to write its archives.
///
/// Structs implementing this trait own one or more `Archiver`s, created in the struct's `init`
/// function, and write all of them in `write`.
pub trait Archived {
    /// Write the archives for this struct
    fn write(&mut self) -> Result<(), ArchiveError>;
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Archiver {
    /// Create a new archiver from a paricular path relative to the session's
    /// archive root.
    ///
    /// Any missing parent directories are created. An existing file at the path is truncated.
    pub fn from_path<P: AsRef<Path>>(
        session: &Session, path: P
    ) -> Result<Self, ArchiveError> {
        let session_path = session.arch_root.join(path);

        Self::from_full_path(session_path)
    }

    /// Create a new archiver writing to the given path.
    pub fn from_full_path<P: AsRef<Path>>(path: P) -> Result<Self, ArchiveError> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(ArchiveError::CreateError)?;
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(ArchiveError::CreateError)?;

        let writer = WriterBuilder::new()
            .has_headers(true)
            .from_writer(file);

        Ok(Self { writer })
    }

    /// Serialise a record into the archive.
    ///
    /// The header row is derived from the first record's field names.
    pub fn serialise<T: Serialize>(&mut self, record: T) -> Result<(), ArchiveError> {
        self.writer.serialize(record).map_err(ArchiveError::WriteError)?;
        self.writer.flush().map_err(ArchiveError::FlushError)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Serialize)]
    struct Row {
        time_s: f64,
        next_gate_idx: usize,
    }

    #[test]
    fn test_archiver_writes_header_and_rows() {
        let path = std::env::temp_dir().join(format!(
            "racer_archive_test_{}/rows.csv",
            std::process::id()
        ));

        let mut arch = Archiver::from_full_path(&path).unwrap();
        arch.serialise(Row { time_s: 0.5, next_gate_idx: 0 }).unwrap();
        arch.serialise(Row { time_s: 1.0, next_gate_idx: 1 }).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines, vec!["time_s,next_gate_idx", "0.5,0", "1.0,1"]);

        std::fs::remove_file(&path).ok();
    }
}
