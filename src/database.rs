//! Directory layout, metadata JSON, table registry and lifecycle.
//!
//! Grounded on the teacher's overall `Database` + `SharedPagedData`
//! composition root (`src/lib.rs`, `src/pstore.rs`): one top-level owner of
//! all tables and underlying storage. This implementation breaks the
//! teacher's `Table` → `Database` back-reference (Section 9 "Cyclic
//! references"): `Database` owns `Table`s in a `HashMap`, and a `Table`
//! never references its owning `Database`.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::schema::Schema;
use crate::table::Table;
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

const METADATA_FILE: &str = "db_metadata.json";

/// `db_metadata.json`: the ordered list of table names, plus whatever
/// unrecognised fields were already present (Section 6: "Unknown fields
/// preserved on rewrite").
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct Metadata {
    tables: Vec<String>,
    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
}

/// One database: a directory of table data/schema files plus the metadata
/// sidecar listing them.
pub struct Database {
    base_dir: PathBuf,
    name: String,
    config: Config,
    metadata: Metadata,
    tables: HashMap<String, Table>,
}

impl Database {
    fn dir(&self) -> PathBuf {
        self.base_dir.join(&self.name)
    }

    fn metadata_path(&self) -> PathBuf {
        self.dir().join(METADATA_FILE)
    }

    fn schema_path(&self, table: &str) -> PathBuf {
        self.dir().join(format!("{table}.schema.json"))
    }

    fn data_path(&self, table: &str) -> PathBuf {
        self.dir().join(format!("{table}.data"))
    }

    /// Ensure `<base>/<name>/` exists and has a metadata sidecar. If the
    /// directory is already initialised, the existing metadata is read and
    /// left untouched rather than clobbered (Section 4.9).
    pub fn create(config: Config, name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let dir = config.base_dir.join(&name);
        fs::create_dir_all(&dir)?;

        let metadata_path = dir.join(METADATA_FILE);
        let metadata = if metadata_path.exists() {
            let raw = fs::read_to_string(&metadata_path)?;
            serde_json::from_str(&raw)?
        } else {
            let metadata = Metadata::default();
            fs::write(&metadata_path, serde_json::to_string_pretty(&metadata)?)?;
            metadata
        };

        info!("database '{name}' created/opened at {}", dir.display());
        Ok(Database {
            base_dir: config.base_dir.clone(),
            name,
            config,
            metadata,
            tables: HashMap::new(),
        })
    }

    /// Open an already-created database: read its metadata, then open
    /// every listed table (schema + data file + slot-map rebuild).
    pub fn init(config: Config, name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let dir = config.base_dir.join(&name);
        let metadata_path = dir.join(METADATA_FILE);
        if !metadata_path.exists() {
            return Err(Error::NotFound(format!(
                "database '{name}' has no metadata at {}",
                metadata_path.display()
            )));
        }
        let raw = fs::read_to_string(&metadata_path)?;
        let metadata: Metadata = serde_json::from_str(&raw)?;

        let mut db = Database {
            base_dir: config.base_dir.clone(),
            name,
            config,
            metadata,
            tables: HashMap::new(),
        };

        let table_names = db.metadata.tables.clone();
        for table_name in table_names {
            db.open_existing_table(&table_name)?;
        }
        info!(
            "database '{}' initialised with {} table(s)",
            db.name,
            db.metadata.tables.len()
        );
        Ok(db)
    }

    fn open_existing_table(&mut self, name: &str) -> Result<()> {
        let schema_json = fs::read_to_string(self.schema_path(name))?;
        let schema = Schema::from_json(&schema_json)?;
        let table = Table::open(
            self.data_path(name),
            schema,
            self.config.cache_capacity,
            self.config.write_buffer,
        )?
        .with_strict(self.config.strict);
        self.tables.insert(name.to_string(), table);
        Ok(())
    }

    /// Create a new table: persist its schema, create its (empty) data
    /// file, append it to the metadata, and register it in memory.
    pub fn create_table(&mut self, name: impl Into<String>, schema: Schema) -> Result<()> {
        let name = name.into();
        if self.tables.contains_key(&name) || self.metadata.tables.iter().any(|t| t == &name) {
            return Err(Error::Schema(format!("table '{name}' already exists")));
        }
        fs::create_dir_all(self.dir())?;
        fs::write(self.schema_path(&name), schema.to_json()?)?;

        let table = Table::create(
            self.data_path(&name),
            schema,
            self.config.cache_capacity,
            self.config.write_buffer,
        )?
        .with_strict(self.config.strict);
        self.tables.insert(name.clone(), table);
        self.metadata.tables.push(name);
        self.persist_metadata()?;
        Ok(())
    }

    fn persist_metadata(&self) -> Result<()> {
        fs::write(self.metadata_path(), serde_json::to_string_pretty(&self.metadata)?)?;
        Ok(())
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    pub fn table_mut(&mut self, name: &str) -> Option<&mut Table> {
        self.tables.get_mut(name)
    }

    /// Table names as listed in the metadata sidecar, in creation order.
    pub fn table_names(&self) -> &[String] {
        &self.metadata.tables
    }

    /// Flush and close every open table.
    pub fn close(mut self) -> Result<()> {
        for (_, table) in self.tables.drain() {
            table.close()?;
        }
        info!("database '{}' closed", self.name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnDefinition;
    use crate::value::{ColumnType, Value};
    use tempfile::tempdir;

    fn people_schema() -> Schema {
        Schema::new(
            "mydb",
            "people",
            vec![
                ColumnDefinition::new("name", ColumnType::Text).with_length(20),
                ColumnDefinition::new("when", ColumnType::Date),
            ],
        )
        .unwrap()
    }

    #[test]
    fn create_table_then_roundtrip() {
        let dir = tempdir().unwrap();
        let config = Config::new(dir.path());
        let mut db = Database::create(config, "mydb").unwrap();
        db.create_table("people", people_schema()).unwrap();

        let mut row = crate::codec::Row::new();
        row.insert("name".to_string(), Value::Text("foo".to_string()));
        row.insert("when".to_string(), Value::Date(1_577_923_200_000.0));

        let inserted = db.table_mut("people").unwrap().insert(row).unwrap();
        let id = inserted.get("id").unwrap().as_id().unwrap().to_string();
        assert_eq!(id.len(), 24);

        db.table_mut("people").unwrap().flush().unwrap();
        let fetched = db.table_mut("people").unwrap().get(&id).unwrap().unwrap();
        assert_eq!(fetched.get("name"), Some(&Value::Text("foo".to_string())));
    }

    #[test]
    fn persists_across_close_and_reinit() {
        let dir = tempdir().unwrap();
        let id;
        {
            let config = Config::new(dir.path());
            let mut db = Database::create(config, "mydb").unwrap();
            db.create_table("people", people_schema()).unwrap();
            let mut row = crate::codec::Row::new();
            row.insert("name".to_string(), Value::Text("bar".to_string()));
            row.insert("when".to_string(), Value::Date(0.0));
            let inserted = db.table_mut("people").unwrap().insert(row).unwrap();
            id = inserted.get("id").unwrap().as_id().unwrap().to_string();
            db.close().unwrap();
        }

        let config = Config::new(dir.path());
        let mut db = Database::init(config, "mydb").unwrap();
        assert_eq!(db.table_names(), &["people".to_string()]);
        let fetched = db.table_mut("people").unwrap().get(&id).unwrap().unwrap();
        assert_eq!(fetched.get("name"), Some(&Value::Text("bar".to_string())));
    }

    #[test]
    fn create_does_not_clobber_existing_metadata() {
        let dir = tempdir().unwrap();
        let config = Config::new(dir.path());
        let mut db = Database::create(config.clone(), "mydb").unwrap();
        db.create_table("people", people_schema()).unwrap();
        drop(db);

        let db2 = Database::create(config, "mydb").unwrap();
        assert_eq!(db2.table_names(), &["people".to_string()]);
    }

    #[test]
    fn duplicate_table_name_is_schema_error() {
        let dir = tempdir().unwrap();
        let config = Config::new(dir.path());
        let mut db = Database::create(config, "mydb").unwrap();
        db.create_table("people", people_schema()).unwrap();
        let err = db.create_table("people", people_schema()).unwrap_err();
        assert!(matches!(err, Error::Schema(_)));
    }

    #[test]
    fn init_missing_database_is_not_found() {
        let dir = tempdir().unwrap();
        let config = Config::new(dir.path());
        let err = Database::init(config, "nope").unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn strict_config_propagates_into_created_tables() {
        let dir = tempdir().unwrap();
        let config = Config::new(dir.path()).with_strict(true);
        let mut db = Database::create(config, "mydb").unwrap();
        db.create_table("people", people_schema()).unwrap();

        let mut row = crate::codec::Row::new();
        row.insert("name".to_string(), Value::Text("this name is far too long to fit".to_string()));
        row.insert("when".to_string(), Value::Date(0.0));
        let err = db.table_mut("people").unwrap().insert(row).unwrap_err();
        assert!(matches!(err, Error::BufferOverflow(_)));
    }

    #[test]
    fn strict_config_propagates_into_reopened_tables() {
        let dir = tempdir().unwrap();
        {
            let config = Config::new(dir.path());
            let mut db = Database::create(config, "mydb").unwrap();
            db.create_table("people", people_schema()).unwrap();
            db.close().unwrap();
        }

        let config = Config::new(dir.path()).with_strict(true);
        let mut db = Database::init(config, "mydb").unwrap();
        let mut row = crate::codec::Row::new();
        row.insert("name".to_string(), Value::Text("this name is far too long to fit".to_string()));
        row.insert("when".to_string(), Value::Date(0.0));
        let err = db.table_mut("people").unwrap().insert(row).unwrap_err();
        assert!(matches!(err, Error::BufferOverflow(_)));
    }
}
