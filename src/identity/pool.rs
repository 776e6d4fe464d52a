//! Sub-unit serial number pool
//!
//! A plain-text file with one serial per line. Producers append; a consumer
//! drains the whole file in one pass (read, then truncate) and hands entries
//! out in FIFO order. Entries not taken during that pass are gone.
//!
//! The file is not locked. Running a producer and a consumer against the same
//! pool at the same time is unsafe and its outcome is undefined.

use std::collections::VecDeque;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::models::SubUnit;

/// Pool access errors
#[derive(Error, Debug)]
pub enum PoolError {
    #[error("Serial pool underrun: requested {requested}, {available} available")]
    Underrun { requested: usize, available: usize },

    #[error("Serial pool I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Append-only serial number pool backed by a file
#[derive(Clone, Debug)]
pub struct SerialPool {
    path: PathBuf,
}

impl SerialPool {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Pool file `<name>.txt` inside a directory
    pub fn in_dir(dir: impl AsRef<Path>, name: &str) -> Self {
        Self::new(dir.as_ref().join(format!("{name}.txt")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> PoolError {
        PoolError::Io {
            path: self.path.clone(),
            source,
        }
    }

    /// Append one serial number
    pub fn append(&self, serial: &str) -> Result<(), PoolError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.io_error(e))?;
        writeln!(file, "{serial}").map_err(|e| self.io_error(e))?;

        debug!("Appended {} to pool {}", serial, self.path.display());
        Ok(())
    }

    /// Current entries without consuming them; a missing file is an empty pool
    pub fn peek(&self) -> Result<Vec<String>, PoolError> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(parse_entries(&content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(self.io_error(e)),
        }
    }

    /// Read every entry and truncate the file
    pub fn drain(&self) -> Result<PoolDrain, PoolError> {
        let entries = self.peek()?;
        if self.path.exists() {
            fs::write(&self.path, "").map_err(|e| self.io_error(e))?;
        }

        info!(
            "Drained {} serial(s) from pool {}",
            entries.len(),
            self.path.display()
        );
        Ok(PoolDrain {
            entries: entries.into(),
        })
    }
}

fn parse_entries(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Entries drained from a pool, handed out first-in first-out
#[derive(Clone, Debug, Default)]
pub struct PoolDrain {
    entries: VecDeque<String>,
}

impl PoolDrain {
    /// Take the next `count` entries; takes nothing if fewer remain
    pub fn take(&mut self, count: usize) -> Result<Vec<SubUnit>, PoolError> {
        if count > self.entries.len() {
            return Err(PoolError::Underrun {
                requested: count,
                available: self.entries.len(),
            });
        }
        Ok(self.entries.drain(..count).map(SubUnit::new).collect())
    }

    pub fn remaining(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries never taken during this pass
    pub fn into_leftovers(self) -> Vec<String> {
        self.entries.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_append_and_peek() {
        let dir = tempdir().unwrap();
        let pool = SerialPool::in_dir(dir.path().join("pools"), "pcba-rf");

        assert!(pool.peek().unwrap().is_empty());
        pool.append("00375A4J00001").unwrap();
        pool.append("00375A4J00002").unwrap();

        assert_eq!(pool.peek().unwrap(), ["00375A4J00001", "00375A4J00002"]);
        // peeking does not consume
        assert_eq!(pool.peek().unwrap().len(), 2);
    }

    #[test]
    fn test_drain_is_fifo_and_truncates() {
        let dir = tempdir().unwrap();
        let pool = SerialPool::new(dir.path().join("serials.txt"));
        for serial in ["A1", "A2", "A3"] {
            pool.append(serial).unwrap();
        }

        let mut drain = pool.drain().unwrap();
        assert!(pool.peek().unwrap().is_empty());
        assert_eq!(fs::read_to_string(pool.path()).unwrap(), "");

        let first = drain.take(2).unwrap();
        assert_eq!(first, [SubUnit::new("A1"), SubUnit::new("A2")]);
        assert_eq!(drain.remaining(), 1);

        // new entries land in the next pass, not this one
        pool.append("B1").unwrap();
        assert_eq!(drain.take(1).unwrap(), [SubUnit::new("A3")]);
        assert!(drain.is_empty());
        assert_eq!(pool.peek().unwrap(), ["B1"]);
    }

    #[test]
    fn test_underrun_is_explicit_and_takes_nothing() {
        let dir = tempdir().unwrap();
        let pool = SerialPool::new(dir.path().join("serials.txt"));
        pool.append("ONLY").unwrap();

        let mut drain = pool.drain().unwrap();
        match drain.take(2) {
            Err(PoolError::Underrun {
                requested,
                available,
            }) => {
                assert_eq!(requested, 2);
                assert_eq!(available, 1);
            }
            other => panic!("expected underrun, got {other:?}"),
        }
        assert_eq!(drain.remaining(), 1);
        assert_eq!(drain.into_leftovers(), ["ONLY"]);
    }

    #[test]
    fn test_missing_pool_drains_empty() {
        let dir = tempdir().unwrap();
        let pool = SerialPool::new(dir.path().join("absent.txt"));
        let mut drain = pool.drain().unwrap();
        assert!(drain.is_empty());
        assert!(!pool.path().exists());
        assert!(matches!(drain.take(1), Err(PoolError::Underrun { .. })));
    }

    #[test]
    fn test_blank_lines_ignored() {
        assert_eq!(parse_entries("A\n\n  B  \n\n"), ["A", "B"]);
    }
}
