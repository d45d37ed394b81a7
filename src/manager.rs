use crate::config::Config;
use crate::index::{PrimaryKeyIndex, RowId, SecondaryValueIndex};
use crate::registry::Registry;
use crate::store::{manifest_key, primary_key, secondary_key, Engine, Manifest, WriteBatch};
use crate::{Error, Result};
use indexformat::{ColumnDescriptor, DataKind, IdGenerator, TableDescriptor, TypedValue};
use slog::Logger;
use std::collections::HashMap;
use std::sync::Arc;

/// Which kind of structure a `StructureStats` describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Structure {
    Primary,
    Secondary(DataKind),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructureStats {
    pub id: String,
    pub structure: Structure,
    /// Rows for a primary index, distinct values for a secondary one.
    pub entries: usize,
    /// Rows for a primary index, (value, row) pairs for a secondary one.
    pub postings: usize,
}

/// One planned change to a secondary index.
struct IndexUpdate {
    index_id: String,
    value: TypedValue,
}

/// Keeps every table's primary index and every column's secondary index, and
/// routes row changes to them.
///
/// All structures live in sharded registries, and each structure has its own
/// lock, so changes to different tables run in parallel.
///
/// A row change updates the primary index first and then each secondary
/// index in turn. The updates are not atomic as a group: if one secondary
/// index refuses a change, the ones already updated stay updated and the
/// failure is reported as `Error::FanOut`. The same goes for a table closed
/// while one of its rows is being inserted: indexes already discarded are
/// reported as failed, never recreated.
///
/// ```rust
/// # use babydb::{IndexManager, RowId};
/// # use indexformat::{ColumnDescriptor, IdGenerator, TableDescriptor, TypedValue};
/// # use std::collections::HashMap;
/// let ids = IdGenerator::default();
/// let name = ColumnDescriptor::new("name", "string", &ids)?.indexed(&ids)?;
/// let index_id = name.index_id().unwrap().to_owned();
/// let table = TableDescriptor::new("users", vec![name], &ids)?;
/// let table_id = table.table_id.clone();
///
/// let manager = IndexManager::new(babydb::discard_logger());
/// manager.open_table(table)?;
///
/// let mut row = HashMap::new();
/// row.insert("name".to_owned(), TypedValue::from("alice"));
/// manager.on_row_insert(&table_id, RowId::from("r1"), &row)?;
///
/// let rows = manager.lookup_by_index(&index_id, &"alice".into())?;
/// assert_eq!(rows, vec![RowId::from("r1")]);
/// # Ok::<(), babydb::Error>(())
/// ```
pub struct IndexManager {
    slog: Logger,
    schemas: Registry<TableDescriptor>,
    /// Index id to the id of the table it belongs to.
    owners: Registry<String>,
    tables: Registry<PrimaryKeyIndex>,
    indexes: Registry<SecondaryValueIndex>,
    ids: IdGenerator,
}

impl IndexManager {
    pub fn new(logger: Logger) -> Self {
        IndexManager::with_config(&Config::default(), logger)
    }

    pub fn with_config(config: &Config, logger: Logger) -> Self {
        IndexManager {
            slog: logger.new(o!("component" => "index-manager")),
            schemas: Registry::new(config.shards),
            owners: Registry::new(config.shards),
            tables: Registry::new(config.shards),
            indexes: Registry::new(config.shards),
            ids: IdGenerator::new(config.node_id),
        }
    }

    /// A fresh row identifier.
    pub fn new_row_id(&self) -> Result<RowId> {
        Ok(RowId::from(self.ids.generate()?))
    }

    /// Register a table's schema and create its (empty) indexes.
    ///
    /// Opening a table that is already open replaces its schema and keeps
    /// the indexes that are still declared.
    pub fn open_table(&self, table: TableDescriptor) -> Result<()> {
        let slog = self.slog.new(o!("table" => table.table_id.clone()));
        for column in &table.columns {
            column.kind()?;
        }

        let (_, created) = self
            .tables
            .get_or_create(&table.table_id, PrimaryKeyIndex::new);
        if created {
            debug!(slog, "Created primary index");
        }
        for column in table.indexed_columns() {
            self.secondary_for(&table.table_id, column)?;
            if let Some(index_id) = column.index_id() {
                self.owners.replace(index_id, table.table_id.clone());
            }
        }

        info!(slog, "Opened table {}", table.name; "indexes" => table.indexed_columns().count());
        let table_id = table.table_id.clone();
        let declared: Vec<String> = table
            .indexed_columns()
            .filter_map(|c| c.index_id().map(str::to_owned))
            .collect();
        if let Some(previous) = self.schemas.replace(&table_id, table) {
            for column in previous.indexed_columns() {
                match column.index_id() {
                    Some(index_id) if !declared.iter().any(|id| id == index_id) => {
                        self.discard_index(&table_id, index_id);
                        debug!(slog, "Discarded index no longer declared"; "index" => index_id);
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }

    /// Drop an index from memory if it still belongs to `table_id`.
    fn discard_index(&self, table_id: &str, index_id: &str) {
        let owned = match self.owners.get(index_id) {
            Some(owner) => owner.as_str() == table_id,
            None => true,
        };
        if owned {
            self.indexes.remove(index_id);
            self.owners.remove(index_id);
        }
    }

    /// Forget a table and discard its indexes from memory.
    pub fn close_table(&self, table_id: &str) -> Result<()> {
        let schema = self.schemas.remove(table_id);
        let primary = self.tables.remove(table_id);
        if schema.is_none() && primary.is_none() {
            return Err(Error::UnknownTable(table_id.to_owned()));
        }
        if let Some(schema) = schema {
            for column in schema.indexed_columns() {
                if let Some(index_id) = column.index_id() {
                    self.discard_index(table_id, index_id);
                }
            }
        }
        info!(self.slog, "Closed table"; "table" => table_id);
        Ok(())
    }

    pub fn schema(&self, table_id: &str) -> Result<Arc<TableDescriptor>> {
        self.schemas
            .get(table_id)
            .ok_or_else(|| Error::UnknownTable(table_id.to_owned()))
    }

    /// The column an index was declared on.
    fn index_column(&self, index_id: &str) -> Option<ColumnDescriptor> {
        let table_id = self.owners.get(index_id)?;
        let schema = self.schemas.get(&table_id)?;
        schema.index_column(index_id).cloned()
    }

    fn secondary_for(
        &self,
        table_id: &str,
        column: &ColumnDescriptor,
    ) -> Result<Arc<SecondaryValueIndex>> {
        let index_id = column
            .index_id()
            .ok_or_else(|| Error::UnknownIndex(column.name().to_owned()))?;
        let kind = column.kind()?;
        let (index, created) = self
            .indexes
            .get_or_create(index_id, || SecondaryValueIndex::new(kind));
        if created {
            debug!(self.slog, "Created secondary index";
                "table" => table_id, "index" => index_id, "column" => column.name());
        }
        Ok(index)
    }

    /// Check every value against its column and work out which secondary
    /// indexes change. Nothing is modified.
    fn plan_updates(
        &self,
        schema: &TableDescriptor,
        values: &HashMap<String, TypedValue>,
    ) -> Result<Vec<IndexUpdate>> {
        let mut updates = Vec::new();
        for (name, value) in values {
            let column = schema.column(name).ok_or_else(|| Error::UnknownColumn {
                table: schema.table_id.clone(),
                column: name.clone(),
            })?;
            // Encoding validates the value; decoding gives the form the index
            // stores (an Int64 for a bytes column becomes Bytes).
            let stored = column.decode(&column.encode(value)?)?;
            if let Some(index_id) = column.index_id() {
                updates.push(IndexUpdate {
                    index_id: index_id.to_owned(),
                    value: stored,
                });
            }
        }
        Ok(updates)
    }

    /// Plan a row change. A table that was never opened has no columns, so
    /// only its primary index can be touched.
    fn plan_row(
        &self,
        table_id: &str,
        values: &HashMap<String, TypedValue>,
    ) -> Result<Vec<IndexUpdate>> {
        match self.schemas.get(table_id) {
            Some(schema) => self.plan_updates(&schema, values),
            None if values.is_empty() => Ok(Vec::new()),
            None => Err(Error::UnknownTable(table_id.to_owned())),
        }
    }

    fn finish_fan_out(
        &self,
        op: &str,
        applied: Vec<String>,
        failures: Vec<(String, Error)>,
    ) -> Result<()> {
        if failures.is_empty() {
            return Ok(());
        }
        for (id, err) in &failures {
            warn!(self.slog, "{} not applied to index", op; "index" => id, "error" => %err);
        }
        Err(Error::FanOut { applied, failures })
    }

    /// Add a new row to its table's primary index and to every secondary
    /// index of a column it has a value for.
    pub fn on_row_insert(
        &self,
        table_id: &str,
        row: RowId,
        values: &HashMap<String, TypedValue>,
    ) -> Result<()> {
        let updates = self.plan_row(table_id, values)?;

        let (primary, _) = self.tables.get_or_create(table_id, PrimaryKeyIndex::new);
        primary.insert(row.clone());
        let mut applied = vec![table_id.to_owned()];
        let mut failures = Vec::new();

        for update in updates {
            // Gone only if the table was closed after the plan was made.
            let index = match self.indexes.get(&update.index_id) {
                Some(index) => index,
                None => {
                    let err = Error::UnknownIndex(update.index_id.clone());
                    failures.push((update.index_id, err));
                    continue;
                }
            };
            match index.insert(update.value, row.clone()) {
                Ok(()) => applied.push(update.index_id),
                Err(e) => failures.push((update.index_id, e)),
            }
        }
        trace!(self.slog, "Inserted row {}", row; "table" => table_id);
        self.finish_fan_out("insert", applied, failures)
    }

    /// Remove a row from its table's primary index and from the secondary
    /// indexes of the columns it had values for.
    pub fn on_row_delete(
        &self,
        table_id: &str,
        row: &RowId,
        values: &HashMap<String, TypedValue>,
    ) -> Result<()> {
        let updates = self.plan_row(table_id, values)?;

        if let Some(primary) = self.tables.get(table_id) {
            primary.delete(row);
        }
        let mut applied = vec![table_id.to_owned()];
        let mut failures = Vec::new();

        for update in updates {
            let index = match self.indexes.get(&update.index_id) {
                Some(index) => index,
                None => continue,
            };
            match index.delete(&update.value, row) {
                Ok(_) => applied.push(update.index_id),
                Err(e) => failures.push((update.index_id, e)),
            }
        }
        trace!(self.slog, "Deleted row {}", row; "table" => table_id);
        self.finish_fan_out("delete", applied, failures)
    }

    /// Rows whose indexed column holds exactly `value`, in insertion order.
    pub fn lookup_by_index(&self, index_id: &str, value: &TypedValue) -> Result<Vec<RowId>> {
        let column = self.index_column(index_id);
        let value = match &column {
            Some(column) => column.decode(&column.encode(value)?)?,
            None => value.clone(),
        };
        match self.indexes.get(index_id) {
            Some(index) => index.lookup(&value),
            None if column.is_some() => Ok(Vec::new()),
            None => Err(Error::UnknownIndex(index_id.to_owned())),
        }
    }

    /// The table's row ids in byte order, as of this call.
    pub fn ascend_table(&self, table_id: &str) -> Result<std::vec::IntoIter<RowId>> {
        match self.tables.get(table_id) {
            Some(primary) => Ok(primary.ascend()),
            None => {
                self.schema(table_id)?;
                Ok(Vec::new().into_iter())
            }
        }
    }

    /// An index's values with their rows, in value order, as of this call.
    pub fn ascend_index(
        &self,
        index_id: &str,
    ) -> Result<std::vec::IntoIter<(TypedValue, Vec<RowId>)>> {
        match self.indexes.get(index_id) {
            Some(index) => Ok(index.ascend()),
            None if self.index_column(index_id).is_some() => Ok(Vec::new().into_iter()),
            None => Err(Error::UnknownIndex(index_id.to_owned())),
        }
    }

    /// Serialize a table's primary index.
    pub fn flush_table(&self, table_id: &str) -> Result<Vec<u8>> {
        match self.tables.get(table_id) {
            Some(primary) => primary.serialize(),
            None => {
                self.schema(table_id)?;
                Ok(Vec::new())
            }
        }
    }

    /// Serialize a secondary index.
    pub fn flush_index(&self, index_id: &str) -> Result<Vec<u8>> {
        match self.indexes.get(index_id) {
            Some(index) => index.serialize(),
            None if self.index_column(index_id).is_some() => Ok(Vec::new()),
            None => Err(Error::UnknownIndex(index_id.to_owned())),
        }
    }

    /// Replace a table's primary index with one read from `bytes`. An empty
    /// buffer gives an empty index. On error the current index is kept.
    pub fn load_table(&self, table_id: &str, bytes: &[u8]) -> Result<()> {
        let slog = self.slog.new(o!("table" => table_id.to_owned()));
        let primary = PrimaryKeyIndex::deserialize_or_empty(bytes).map_err(|e| {
            error!(slog, "Failed to load primary index"; "error" => %e);
            e
        })?;
        info!(slog, "Loaded primary index"; "rows" => primary.len(), "bytes" => bytes.len());
        self.tables.replace(table_id, primary);
        Ok(())
    }

    /// Replace a secondary index with one read from `bytes`.
    ///
    /// If the index belongs to an open table, values must be of the
    /// column's kind and an empty buffer gives an empty index. Otherwise the
    /// kind comes from the stream, and an empty buffer is an error.
    pub fn load_index(&self, index_id: &str, bytes: &[u8]) -> Result<()> {
        let slog = self.slog.new(o!("index" => index_id.to_owned()));
        let loaded = match self.index_column(index_id) {
            Some(column) => SecondaryValueIndex::deserialize_or_empty(column.kind()?, bytes),
            None => SecondaryValueIndex::deserialize(bytes),
        };
        let index = loaded.map_err(|e| {
            error!(slog, "Failed to load secondary index"; "error" => %e);
            e
        })?;
        info!(slog, "Loaded secondary index";
            "values" => index.len(), "kind" => %index.kind(), "bytes" => bytes.len());
        self.indexes.replace(index_id, index);
        Ok(())
    }

    /// Write an open table's indexes to `engine`, together with a manifest
    /// naming them, in one atomic batch.
    ///
    /// Each index is serialized under its own lock, one after the other, so
    /// rows changed while this runs may be in some of the blobs and not
    /// others.
    pub fn persist_table<E: Engine>(&self, engine: &E, table_id: &str) -> Result<()> {
        let schema = self.schema(table_id)?;
        let mut batch = WriteBatch::default();
        batch.put(primary_key(table_id), self.flush_table(table_id)?);

        let mut manifest = Manifest {
            table_id: table_id.to_owned(),
            indexes: Vec::new(),
        };
        for column in schema.indexed_columns() {
            if let Some(index_id) = column.index_id() {
                batch.put(secondary_key(index_id), self.flush_index(index_id)?);
                manifest.indexes.push((index_id.to_owned(), column.kind()?));
            }
        }
        batch.put(manifest_key(table_id), manifest.to_bytes()?);

        let writes = batch.len();
        engine.commit(batch)?;
        info!(self.slog, "Persisted table"; "table" => table_id, "writes" => writes);
        Ok(())
    }

    /// Open `table` and load its indexes from `engine`. Indexes that were
    /// never persisted start out empty.
    ///
    /// Stops at the first index that fails to load; that index is left
    /// empty and the ones loaded before it stay loaded.
    pub fn restore_table<E: Engine>(&self, engine: &E, table: TableDescriptor) -> Result<()> {
        let table_id = table.table_id.clone();
        let index_ids: Vec<String> = table
            .indexed_columns()
            .filter_map(|c| c.index_id().map(str::to_owned))
            .collect();
        self.open_table(table)?;

        if let Some(bytes) = engine.get(&primary_key(&table_id))? {
            self.load_table(&table_id, &bytes)?;
        }
        for index_id in index_ids {
            if let Some(bytes) = engine.get(&secondary_key(&index_id))? {
                self.load_index(&index_id, &bytes)?;
            }
        }
        Ok(())
    }

    /// Close a table and delete everything persisted for it.
    pub fn drop_table<E: Engine>(&self, engine: &E, table_id: &str) -> Result<()> {
        let mut batch = WriteBatch::default();
        batch.remove(primary_key(table_id));
        batch.remove(manifest_key(table_id));
        if let Some(bytes) = engine.get(&manifest_key(table_id))? {
            for (index_id, _) in Manifest::from_bytes(&bytes)?.indexes {
                batch.remove(secondary_key(&index_id));
            }
        }
        if let Ok(schema) = self.schema(table_id) {
            for column in schema.indexed_columns() {
                if let Some(index_id) = column.index_id() {
                    batch.remove(secondary_key(index_id));
                }
            }
        }
        engine.commit(batch)?;
        match self.close_table(table_id) {
            Ok(()) | Err(Error::UnknownTable(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Sizes of every structure in memory.
    pub fn stats(&self) -> Vec<StructureStats> {
        let mut stats = Vec::new();
        for id in self.tables.ids() {
            if let Some(primary) = self.tables.get(&id) {
                let rows = primary.len();
                stats.push(StructureStats {
                    id,
                    structure: Structure::Primary,
                    entries: rows,
                    postings: rows,
                });
            }
        }
        for id in self.indexes.ids() {
            if let Some(index) = self.indexes.get(&id) {
                stats.push(StructureStats {
                    id,
                    structure: Structure::Secondary(index.kind()),
                    entries: index.len(),
                    postings: index.posting_count(),
                });
            }
        }
        stats.sort_by(|a, b| a.id.cmp(&b.id));
        stats
    }
}
