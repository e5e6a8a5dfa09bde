//! Directory-backed row store
//!
//! Each table is a line-delimited JSON file:
//!
//! ```text
//! <datastore>/<project>/<name>/<version>.jsonl
//! ```
//!
//! A channel loads its table when opened, applies puts in memory and writes the
//! table back (atomically) when closed.

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use super::{BundleId, RowChannelProvider, RowScan, StoreLocation, TabularRow, TabularRowChannel};
use crate::error::{Result, config, fs, sync};

const TABLE_EXT: &str = "jsonl";

/// Row store laid out as JSON-lines files under a local and a remote directory
#[derive(Debug, Clone)]
pub struct DirRowStore {
    local_dir: PathBuf,
    remote_dir: Option<PathBuf>,
}

impl DirRowStore {
    pub fn new(local_dir: impl Into<PathBuf>) -> Self {
        Self {
            local_dir: local_dir.into(),
            remote_dir: None,
        }
    }

    /// Directory serving every remote location
    pub fn with_remote(mut self, remote_dir: impl Into<PathBuf>) -> Self {
        self.remote_dir = Some(remote_dir.into());
        self
    }

    fn table_path(&self, bundle: &BundleId, location: &StoreLocation) -> Result<PathBuf> {
        let base = match location {
            StoreLocation::Local => &self.local_dir,
            StoreLocation::Remote { instance } => self.remote_dir.as_ref().ok_or_else(|| {
                config::invalid(format!("no datastore directory configured for {}", instance))
            })?,
        };
        Ok(base
            .join(&bundle.project)
            .join(&bundle.name)
            .join(format!("{}.{}", bundle.version, TABLE_EXT)))
    }
}

impl RowChannelProvider for DirRowStore {
    type Channel = DirChannel;

    fn open(&self, bundle: &BundleId, location: &StoreLocation) -> Result<DirChannel> {
        let path = self.table_path(bundle, location)?;
        let rows = load_table(&path)?;
        let index = rows
            .iter()
            .enumerate()
            .map(|(i, row)| (row.id.clone(), i))
            .collect();

        Ok(DirChannel {
            bundle: bundle.to_string(),
            path,
            rows,
            index,
            dirty: false,
            closed: false,
        })
    }
}

/// Channel on one JSON-lines table
#[derive(Debug)]
pub struct DirChannel {
    bundle: String,
    path: PathBuf,
    rows: Vec<TabularRow>,
    index: HashMap<String, usize>,
    dirty: bool,
    closed: bool,
}

impl TabularRowChannel for DirChannel {
    fn scan(&mut self) -> Result<RowScan<'_>> {
        Ok(Box::new(self.rows.iter().cloned().map(Ok)))
    }

    fn put(&mut self, row: TabularRow) -> Result<()> {
        if self.closed {
            return Err(sync::rows_failed(&self.bundle, "channel is closed"));
        }

        match self.index.get(&row.id) {
            Some(&i) => self.rows[i] = row,
            None => {
                self.index.insert(row.id.clone(), self.rows.len());
                self.rows.push(row);
            }
        }
        self.dirty = true;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        if self.dirty {
            store_table(&self.path, &self.rows)?;
            tracing::debug!("flushed {} rows to {}", self.rows.len(), self.path.display());
        }
        Ok(())
    }
}

fn load_table(path: &Path) -> Result<Vec<TabularRow>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = std::fs::File::open(path).map_err(|e| fs::read_failed(path, e))?;
    let mut rows = Vec::new();
    for (lineno, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| fs::read_failed(path, e))?;
        if line.trim().is_empty() {
            continue;
        }
        let row: TabularRow = serde_json::from_str(&line).map_err(|e| {
            sync::rows_failed(
                path.display().to_string(),
                format!("line {}: {}", lineno + 1, e),
            )
        })?;
        rows.push(row);
    }
    Ok(rows)
}

fn store_table(path: &Path, rows: &[TabularRow]) -> Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    std::fs::create_dir_all(dir).map_err(|e| fs::write_failed(dir, e))?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| fs::write_failed(path, e))?;
    for row in rows {
        let line = serde_json::to_string(row)?;
        writeln!(tmp, "{}", line).map_err(|e| fs::write_failed(path, e))?;
    }
    tmp.persist(path).map_err(|e| fs::write_failed(path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn bundle() -> BundleId {
        BundleId::new("self", "mnist", "v1")
    }

    #[test]
    fn test_rows_persist_across_channels() {
        let temp = TempDir::new().unwrap();
        let store = DirRowStore::new(temp.path());

        let mut ch = store.open(&bundle(), &StoreLocation::Local).unwrap();
        ch.put(TabularRow::new("0").with("label", 7)).unwrap();
        ch.put(TabularRow::new("1").with("label", 2)).unwrap();
        ch.close().unwrap();

        assert!(temp.path().join("self/mnist/v1.jsonl").is_file());

        let mut ch = store.open(&bundle(), &StoreLocation::Local).unwrap();
        let rows: Vec<TabularRow> = ch.scan().unwrap().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].data["label"], 7);
    }

    #[test]
    fn test_upsert_keeps_position() {
        let temp = TempDir::new().unwrap();
        let store = DirRowStore::new(temp.path());

        let mut ch = store.open(&bundle(), &StoreLocation::Local).unwrap();
        ch.put(TabularRow::new("a").with("v", 1)).unwrap();
        ch.put(TabularRow::new("b").with("v", 2)).unwrap();
        ch.put(TabularRow::new("a").with("v", 3)).unwrap();

        let rows: Vec<TabularRow> = ch.scan().unwrap().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, "a");
        assert_eq!(rows[0].data["v"], 3);
    }

    #[test]
    fn test_remote_requires_directory() {
        let temp = TempDir::new().unwrap();
        let store = DirRowStore::new(temp.path());
        let remote = StoreLocation::Remote {
            instance: "cloud".to_string(),
        };
        assert!(store.open(&bundle(), &remote).is_err());

        let store = store.with_remote(temp.path().join("remote"));
        assert!(store.open(&bundle(), &remote).is_ok());
    }

    #[test]
    fn test_untouched_table_not_written() {
        let temp = TempDir::new().unwrap();
        let store = DirRowStore::new(temp.path());
        let mut ch = store.open(&bundle(), &StoreLocation::Local).unwrap();
        ch.close().unwrap();
        assert!(!temp.path().join("self").exists());
    }

    #[test]
    fn test_corrupt_table_reports_line() {
        let temp = TempDir::new().unwrap();
        let table = temp.path().join("self/mnist");
        std::fs::create_dir_all(&table).unwrap();
        std::fs::write(table.join("v1.jsonl"), "{\"id\":\"a\"}\nnot json\n").unwrap();

        let err = DirRowStore::new(temp.path())
            .open(&bundle(), &StoreLocation::Local)
            .unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }
}
