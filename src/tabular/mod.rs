//! Tabular row channels
//!
//! A row channel is a handle on the versioned metadata table of one bundle in
//! one store. It supports an ordered, lazy [`TabularRowChannel::scan`] and an
//! idempotent [`TabularRowChannel::put`] (last write wins on identical ids).
//!
//! Channels are opened through a [`RowChannelProvider`] and held in a
//! [`ChannelGuard`], which closes the channel on every exit path.

mod dir;
mod memory;

pub use dir::{DirChannel, DirRowStore};
pub use memory::{MemoryChannel, MemoryRowStore};

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Identity of a bundle's table: (project, name, version)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BundleId {
    pub project: String,
    pub name: String,
    pub version: String,
}

impl BundleId {
    pub fn new(
        project: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            name: name.into(),
            version: version.into(),
        }
    }
}

impl fmt::Display for BundleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.project, self.name, self.version)
    }
}

/// Which store a channel is opened against
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StoreLocation {
    /// The standalone store on this machine
    Local,
    /// A remote instance
    Remote { instance: String },
}

impl fmt::Display for StoreLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreLocation::Local => f.write_str("local"),
            StoreLocation::Remote { instance } => write!(f, "remote({})", instance),
        }
    }
}

/// One metadata row, replicated verbatim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabularRow {
    pub id: String,
    #[serde(default)]
    pub data: BTreeMap<String, serde_json::Value>,
}

impl TabularRow {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            data: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

/// Lazy, finite sequence of rows produced by a scan
pub type RowScan<'a> = Box<dyn Iterator<Item = Result<TabularRow>> + 'a>;

/// Handle on one bundle's table in one store
pub trait TabularRowChannel {
    /// Scan rows in table order. Calling `scan` again restarts from the first row.
    fn scan(&mut self) -> Result<RowScan<'_>>;

    /// Insert or replace the row with the same id
    fn put(&mut self, row: TabularRow) -> Result<()>;

    /// Flush and release the channel. Closing twice is a no-op.
    fn close(&mut self) -> Result<()>;
}

/// Opens row channels for (bundle, store) pairs
pub trait RowChannelProvider {
    type Channel: TabularRowChannel;

    fn open(&self, bundle: &BundleId, location: &StoreLocation) -> Result<Self::Channel>;
}

/// Scoped ownership of an open channel
///
/// [`ChannelGuard::finish`] closes and reports close errors; if the guard is
/// dropped without finishing (early return, `?`, panic) the channel is still
/// closed and the error is logged.
pub struct ChannelGuard<C: TabularRowChannel> {
    channel: C,
    label: String,
    closed: bool,
}

impl<C: TabularRowChannel> ChannelGuard<C> {
    pub fn open<P>(provider: &P, bundle: &BundleId, location: &StoreLocation) -> Result<Self>
    where
        P: RowChannelProvider<Channel = C>,
    {
        let channel = provider.open(bundle, location)?;
        tracing::debug!("opened row channel {} @ {}", bundle, location);
        Ok(Self {
            channel,
            label: format!("{} @ {}", bundle, location),
            closed: false,
        })
    }

    pub fn channel(&mut self) -> &mut C {
        &mut self.channel
    }

    /// Close the channel, surfacing any flush error
    pub fn finish(mut self) -> Result<()> {
        self.closed = true;
        self.channel.close()
    }
}

impl<C: TabularRowChannel> Drop for ChannelGuard<C> {
    fn drop(&mut self) {
        if !self.closed {
            if let Err(e) = self.channel.close() {
                tracing::warn!("failed to close row channel {}: {}", self.label, e);
            }
        }
    }
}

/// Copy every row of `source` into `dest`, in scan order.
///
/// Each row is fully written before the next one is pulled from the scan.
/// Returns the number of rows copied; the first failure aborts the copy.
pub fn replicate<S, D>(source: &mut S, dest: &mut D) -> Result<usize>
where
    S: TabularRowChannel + ?Sized,
    D: TabularRowChannel + ?Sized,
{
    let mut copied = 0;
    for row in source.scan()? {
        dest.put(row?)?;
        copied += 1;
    }
    Ok(copied)
}
