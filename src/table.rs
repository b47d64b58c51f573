//! Table orchestrator: composes the file manager, row codec, slot manager,
//! LRU cache, write buffer and id generator into the public insert/get/
//! update/delete/scan contract.
//!
//! Grounded on the teacher's `Table` (`src/table.rs`): the same
//! "one orchestrator composing file + codec + id allocation" shape,
//! generalised from B-tree `SortedFile` storage with `ColInfo`-by-column-
//! number access to flat slot-indexed storage with name-keyed `Row` access,
//! since this engine has no secondary indexes.

use crate::codec::{self, Row};
use crate::error::{Error, Result};
use crate::file_manager::FileManager;
use crate::id::IdGenerator;
use crate::cache::LruCache;
use crate::schema::{BufferLayout, Schema};
use crate::slot::SlotManager;
use crate::util::now_millis;
use crate::value::Value;
use crate::write_buffer::{WriteBuffer, WriteBufferConfig};
use log::warn;
use std::path::Path;

/// A single table's data file plus every subsystem needed to serve the
/// insert/get/update/delete/scan contract against it.
pub struct Table {
    schema: Schema,
    layout: BufferLayout,
    file: FileManager,
    slots: SlotManager,
    cache: LruCache<String, Row>,
    write_buffer: WriteBuffer,
    id_gen: IdGenerator,
    /// Disables Text/Buffer truncation in favour of `Error::BufferOverflow`
    /// (Section 4.2 "Edge cases", opt-in strict mode).
    strict: bool,
}

impl Table {
    /// Open (or create, if absent) the data file at `data_path` for a
    /// freshly-created table: no rebuild is needed since the file is new
    /// or was already scanned by the caller.
    pub fn create(
        data_path: impl AsRef<Path>,
        schema: Schema,
        cache_capacity: usize,
        write_buffer: WriteBufferConfig,
    ) -> Result<Self> {
        let layout = schema.compile()?;
        let file = FileManager::open(data_path)?;
        Ok(Table {
            schema,
            layout,
            file,
            slots: SlotManager::new(),
            cache: LruCache::new(cache_capacity),
            write_buffer: WriteBuffer::new(write_buffer),
            id_gen: IdGenerator::new(),
            strict: false,
        })
    }

    /// Open an existing table, rebuilding the slot map from a linear scan
    /// of the data file (Section 4.5, "Rebuild on open").
    pub fn open(
        data_path: impl AsRef<Path>,
        schema: Schema,
        cache_capacity: usize,
        write_buffer: WriteBufferConfig,
    ) -> Result<Self> {
        let mut table = Self::create(data_path, schema, cache_capacity, write_buffer)?;
        table.rebuild_slot_map()?;
        Ok(table)
    }

    /// Opt into strict mode: oversize Text/Buffer values fail encode with
    /// `Error::BufferOverflow` instead of being silently truncated.
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn layout(&self) -> &BufferLayout {
        &self.layout
    }

    fn row_size(&self) -> u64 {
        self.layout.total_size as u64
    }

    fn rebuild_slot_map(&mut self) -> Result<()> {
        let row_size = self.row_size();
        if row_size == 0 {
            return Ok(());
        }
        let size = self.file.size()?;
        let total_slots = size / row_size;
        let mut active = Vec::new();
        let mut reusable = Vec::new();
        let mut buf = vec![0u8; self.layout.total_size];
        for slot in 0..total_slots {
            let position = slot * row_size;
            self.file.read_into(position, &mut buf)?;
            match codec::decode(&self.layout, &buf) {
                Ok(Some(row)) => match row.get("id").and_then(Value::as_id) {
                    Some(id) => active.push((id.to_string(), slot)),
                    None => {
                        warn!("slot {slot} decoded without an id column, treating as free");
                        reusable.push(slot);
                    }
                },
                Ok(None) => reusable.push(slot),
                Err(e) => {
                    warn!("corrupt row at slot {slot}, treating as free: {e}");
                    reusable.push(slot);
                }
            }
        }
        self.slots.rebuild(active, reusable, total_slots);
        Ok(())
    }

    /// Fill in `ColumnDefinition::default` for any column missing from
    /// `row`. Columns still missing after this (and non-nullable, with no
    /// default) fail later in the codec with `Error::Schema`.
    fn with_defaults(&self, row: &Row) -> Row {
        let mut merged = row.clone();
        for def in &self.schema.columns {
            if !merged.contains_key(&def.name) {
                if let Some(default) = &def.default {
                    merged.insert(def.name.clone(), default.clone());
                }
            }
        }
        merged
    }

    /// Insert `row`, generating an id and filling `UpdatedAt` columns if
    /// necessary, and return the full stored row (Section 4.8 "insert").
    pub fn insert(&mut self, row: Row) -> Result<Row> {
        let merged = self.with_defaults(&row);
        let now = now_millis();
        let id_gen = &self.id_gen;
        let seed = self.schema.table.clone();
        let (id, bytes) = codec::encode(&self.layout, &merged, now, self.strict, || {
            id_gen.unique_id(seed.as_bytes())
        })?;

        let slot = self.slots.allocate(id.clone());
        let position = slot * self.row_size();
        self.write_buffer.add(slot, bytes.clone(), position, &mut self.file)?;

        let decoded = codec::decode(&self.layout, &bytes)?
            .expect("a freshly-encoded Active row always decodes");
        self.cache.set(id, decoded.clone());
        Ok(decoded)
    }

    /// Insert every row in `rows`, in order. The write buffer's own
    /// auto-flush thresholds amortise the disk work across the batch.
    pub fn bulk_insert(&mut self, rows: Vec<Row>) -> Result<Vec<Row>> {
        rows.into_iter().map(|row| self.insert(row)).collect()
    }

    /// Fetch the row for `id`, consulting the write buffer, then the
    /// cache, then disk, in that order (Section 4.8 "get").
    pub fn get(&mut self, id: &str) -> Result<Option<Row>> {
        let slot = match self.slots.slot_of(id) {
            Some(slot) => slot,
            None => return Ok(None),
        };

        if let Some(bytes) = self.write_buffer.peek(slot) {
            return codec::decode(&self.layout, bytes);
        }

        if let Some(row) = self.cache.get(&id.to_string()) {
            return Ok(Some(row.clone()));
        }

        let position = slot * self.row_size();
        let bytes = self.file.read(self.layout.total_size, position)?;
        match codec::decode(&self.layout, &bytes)? {
            Some(row) => {
                self.cache.set(id.to_string(), row.clone());
                Ok(Some(row))
            }
            None => Ok(None),
        }
    }

    /// Merge `partial` over the current row (field-by-field; unspecified
    /// fields are preserved), refresh `UpdatedAt`, and re-encode with
    /// status `Active` (Section 4.8 "update").
    pub fn update(&mut self, id: &str, partial: Row) -> Result<Option<Row>> {
        let slot = match self.slots.slot_of(id) {
            Some(slot) => slot,
            None => return Ok(None),
        };
        let current = match self.get(id)? {
            Some(row) => row,
            None => return Ok(None),
        };

        let mut merged = current;
        for (name, value) in partial {
            merged.insert(name, value);
        }
        merged.insert("id".to_string(), Value::Id(id.to_string()));

        let now = now_millis();
        let (_, bytes) = codec::encode(&self.layout, &merged, now, self.strict, || id.to_string())?;

        let position = slot * self.row_size();
        self.write_buffer.add(slot, bytes.clone(), position, &mut self.file)?;

        let decoded = codec::decode(&self.layout, &bytes)?
            .expect("a freshly-encoded Active row always decodes");
        self.cache.set(id.to_string(), decoded.clone());
        Ok(Some(decoded))
    }

    /// Tombstone the slot for `id`, evict it from the cache, and return it
    /// to the free list (Section 4.8 "delete").
    pub fn delete(&mut self, id: &str) -> Result<bool> {
        let slot = match self.slots.slot_of(id) {
            Some(slot) => slot,
            None => return Ok(false),
        };
        let mut bytes = vec![0u8; self.layout.total_size];
        bytes[0] = codec::STATUS_DELETED;
        let position = slot * self.row_size();
        self.write_buffer.add(slot, bytes, position, &mut self.file)?;

        self.cache.delete(&id.to_string());
        self.slots.deallocate(id);
        Ok(true)
    }

    /// Every currently active row, in no particular order (Section 4.8
    /// "getAll").
    pub fn get_all(&mut self) -> Result<Vec<Row>> {
        let ids: Vec<String> = self.slots.active_ids().cloned().collect();
        let mut rows = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(row) = self.get(&id)? {
                rows.push(row);
            }
        }
        Ok(rows)
    }

    /// Number of currently active rows.
    pub fn count(&self) -> usize {
        self.slots.active_count()
    }

    /// Force the write buffer to drain to disk.
    pub fn flush(&mut self) -> Result<()> {
        self.write_buffer.flush(&mut self.file)
    }

    /// Empty the LRU cache only; no disk effect.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Flush, then release the file handle.
    pub fn close(mut self) -> Result<()> {
        self.flush()?;
        self.file.close()
    }
}
