//! In-memory row store
//!
//! Tables live behind a shared mutex, so every channel opened from clones of
//! one store sees the same data. The store also counts open and closed
//! channels, which makes release-on-every-path observable.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::{BundleId, RowChannelProvider, RowScan, StoreLocation, TabularRow, TabularRowChannel};
use crate::error::{Result, sync};

type TableKey = (BundleId, StoreLocation);

#[derive(Debug, Default)]
struct Tables {
    tables: BTreeMap<TableKey, Vec<TabularRow>>,
    open: usize,
    closed: usize,
}

/// Shared in-memory tables keyed by (bundle, store)
#[derive(Debug, Clone, Default)]
pub struct MemoryRowStore {
    inner: Arc<Mutex<Tables>>,
}

fn lock(inner: &Mutex<Tables>) -> MutexGuard<'_, Tables> {
    inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MemoryRowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace a table's content
    pub fn seed(&self, bundle: &BundleId, location: &StoreLocation, rows: Vec<TabularRow>) {
        lock(&self.inner)
            .tables
            .insert((bundle.clone(), location.clone()), rows);
    }

    /// Snapshot of a table's rows in table order
    pub fn rows(&self, bundle: &BundleId, location: &StoreLocation) -> Vec<TabularRow> {
        lock(&self.inner)
            .tables
            .get(&(bundle.clone(), location.clone()))
            .cloned()
            .unwrap_or_default()
    }

    /// Channels opened and not yet closed
    pub fn open_channels(&self) -> usize {
        lock(&self.inner).open
    }

    /// Total number of channel closes
    pub fn close_count(&self) -> usize {
        lock(&self.inner).closed
    }
}

impl RowChannelProvider for MemoryRowStore {
    type Channel = MemoryChannel;

    fn open(&self, bundle: &BundleId, location: &StoreLocation) -> Result<MemoryChannel> {
        let key = (bundle.clone(), location.clone());
        let mut tables = lock(&self.inner);
        tables.tables.entry(key.clone()).or_default();
        tables.open += 1;

        Ok(MemoryChannel {
            inner: Arc::clone(&self.inner),
            key,
            closed: false,
        })
    }
}

/// Channel on one in-memory table
#[derive(Debug)]
pub struct MemoryChannel {
    inner: Arc<Mutex<Tables>>,
    key: TableKey,
    closed: bool,
}

impl MemoryChannel {
    fn row_at(&self, index: usize) -> Option<TabularRow> {
        lock(&self.inner)
            .tables
            .get(&self.key)
            .and_then(|rows| rows.get(index))
            .cloned()
    }
}

impl TabularRowChannel for MemoryChannel {
    fn scan(&mut self) -> Result<RowScan<'_>> {
        let channel: &MemoryChannel = self;
        let mut index = 0;
        Ok(Box::new(std::iter::from_fn(move || {
            let row = channel.row_at(index)?;
            index += 1;
            Some(Ok(row))
        })))
    }

    fn put(&mut self, row: TabularRow) -> Result<()> {
        if self.closed {
            return Err(sync::rows_failed(self.key.0.to_string(), "channel is closed"));
        }

        let mut tables = lock(&self.inner);
        let rows = tables.tables.entry(self.key.clone()).or_default();
        match rows.iter_mut().find(|existing| existing.id == row.id) {
            Some(existing) => *existing = row,
            None => rows.push(row),
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.closed = true;
            let mut tables = lock(&self.inner);
            tables.open -= 1;
            tables.closed += 1;
        }
        Ok(())
    }
}
