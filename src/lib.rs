//! Embedded, single-node binary table storage engine.
//!
//! A `Database` owns a directory of tables. Each table is a fixed-schema,
//! slot-structured data file: every row occupies one fixed-size slot keyed
//! by a generated id, deletes tombstone the slot for LIFO reuse, and an
//! in-process LRU cache plus coalescing write-behind buffer sit in front of
//! the file.
//!
//! Example:
//! ```no_run
//! use bindb::{Config, Database, Schema, ColumnDefinition, ColumnType, Row, Value};
//!
//! let config = Config::from_env();
//! let mut db = Database::create(config, "mydb").unwrap();
//! let schema = Schema::new(
//!     "mydb",
//!     "people",
//!     vec![ColumnDefinition::new("name", ColumnType::Text).with_length(40)],
//! ).unwrap();
//! db.create_table("people", schema).unwrap();
//!
//! let mut row = Row::new();
//! row.insert("name".to_string(), Value::Text("Ada".to_string()));
//! let stored = db.table_mut("people").unwrap().insert(row).unwrap();
//! println!("{:?}", stored.get("id"));
//! ```

pub mod cache;
pub mod codec;
pub mod config;
pub mod database;
pub mod error;
pub mod file_manager;
pub mod id;
pub mod schema;
pub mod slot;
pub mod table;
pub mod util;
pub mod value;
pub mod write_buffer;

pub use codec::Row;
pub use config::Config;
pub use database::Database;
pub use error::{Error, Result};
pub use schema::{BufferLayout, ColumnDefinition, Schema};
pub use table::Table;
pub use value::{ColumnType, Value};
pub use write_buffer::WriteBufferConfig;
