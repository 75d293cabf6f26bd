use std::sync::atomic::{self, AtomicBool, AtomicU64};
use std::sync::Arc;

use anyhow::{bail, ensure};
use cqlsink_bind::{BoundStatement, InsertTemplate, PreparedStatement};
use cqlsink_catalog::{Catalog, Column, MemCatalog};
use cqlsink_core::{Name, Value};
use itertools::Itertools;
use parking_lot::{Mutex, RwLock, RwLockWriteGuard};
use rustc_hash::FxHashMap;

/// A connection to the database cluster.
///
/// Driver errors are opaque to the sink and surface as [`anyhow::Error`].
pub trait Session: Catalog {
    /// Prepares `template` for repeated execution.
    fn prepare(&self, template: InsertTemplate) -> anyhow::Result<Arc<PreparedStatement>>;

    fn execute(&self, stmt: &BoundStatement) -> anyhow::Result<()>;

    fn close(&self) -> anyhow::Result<()>;

    fn cluster_name(&self) -> &str;
}

/// A single node "cluster" kept in memory. Clones share the same state.
#[derive(Debug, Clone)]
pub struct MemSession {
    inner: Arc<Shared>,
}

#[derive(Debug)]
struct Shared {
    cluster_name: String,
    catalog: RwLock<MemCatalog>,
    next_id: AtomicU64,
    closed: AtomicBool,
    rows: Mutex<FxHashMap<(Name, Name), Vec<Vec<Value>>>>,
}

impl MemSession {
    pub fn new(cluster_name: impl Into<String>, catalog: MemCatalog) -> Self {
        Self {
            inner: Arc::new(Shared {
                cluster_name: cluster_name.into(),
                catalog: RwLock::new(catalog),
                next_id: AtomicU64::new(0),
                closed: AtomicBool::new(false),
                rows: Default::default(),
            }),
        }
    }

    /// Write access to the catalog, for altering tables between batches.
    #[inline]
    pub fn catalog_mut(&self) -> RwLockWriteGuard<'_, MemCatalog> {
        self.inner.catalog.write()
    }

    /// The rows written to `keyspace.table` so far, one value per column in insert order.
    pub fn rows(&self, keyspace: &str, table: &str) -> Vec<Vec<Value>> {
        let key = (Name::from(keyspace), Name::from(table));
        self.inner.rows.lock().get(&key).cloned().unwrap_or_default()
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(atomic::Ordering::Acquire)
    }

    fn ensure_open(&self) -> anyhow::Result<()> {
        ensure!(!self.is_closed(), "session to cluster `{}` is closed", self.inner.cluster_name);
        Ok(())
    }
}

impl Catalog for MemSession {
    fn columns(&self, keyspace: &str, table: &str) -> cqlsink_catalog::Result<Vec<Column>> {
        self.inner.catalog.read().columns(keyspace, table)
    }
}

impl Session for MemSession {
    fn prepare(&self, template: InsertTemplate) -> anyhow::Result<Arc<PreparedStatement>> {
        self.ensure_open()?;
        let id = self.inner.next_id.fetch_add(1, atomic::Ordering::Relaxed);
        tracing::debug!(id, query = %template, "prepare");
        Ok(Arc::new(PreparedStatement::new(id, template)))
    }

    fn execute(&self, stmt: &BoundStatement) -> anyhow::Result<()> {
        self.ensure_open()?;
        if !stmt.is_fully_bound() {
            bail!(
                "cannot execute `{}`, markers {} are not bound",
                stmt.prepared().query(),
                stmt.unset().format(", ")
            );
        }

        let template = stmt.prepared().template();
        // the table may have been dropped since the statement was prepared
        self.columns(template.keyspace(), template.table())?;

        let row = stmt.columns().filter_map(|(_, value)| value.cloned()).collect();
        self.inner
            .rows
            .lock()
            .entry((Name::from(template.keyspace()), Name::from(template.table())))
            .or_default()
            .push(row);
        Ok(())
    }

    fn close(&self) -> anyhow::Result<()> {
        if !self.inner.closed.swap(true, atomic::Ordering::AcqRel) {
            tracing::info!(cluster = %self.inner.cluster_name, "session closed");
        }
        Ok(())
    }

    #[inline]
    fn cluster_name(&self) -> &str {
        &self.inner.cluster_name
    }
}
