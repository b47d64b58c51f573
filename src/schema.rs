//! Schema parsing and buffer layout compilation.
//!
//! Mirrors the role of the teacher's `ColInfo` (`src/table.rs`: `add`,
//! `colmap`, `off`, `total`) but persisted as JSON rather than held only in
//! memory, and compiled once into a dense `Vec<CompiledColumn>` walked by
//! index on the hot path (insert/get/update), with name lookup pushed to a
//! `BTreeMap` used only at compile time.

use crate::error::{Error, Result};
use crate::value::{ColumnType, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A table's default Text/Buffer length when the column omits one.
const DEFAULT_LENGTH: usize = 255;

/// Status byte's high bits double as a null bitmap: at most this many
/// nullable columns per table (see DESIGN.md "Null-bitmap placement").
pub const MAX_NULLABLE_COLUMNS: usize = 6;

/// A single column definition as it appears in the schema JSON sidecar.
/// `default` is a construction-time convenience only; it is never
/// persisted (Section 6: "Column `default` is not persisted").
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub col_type: ColumnType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,
    /// Value substituted at insert time when the column is missing from
    /// the caller's row. Never persisted to the schema sidecar (Section 6:
    /// "Column `default` is not persisted") — a reloaded schema always has
    /// `default: None`.
    #[serde(skip)]
    pub default: Option<Value>,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, col_type: ColumnType) -> Self {
        ColumnDefinition {
            name: name.into(),
            col_type,
            length: None,
            nullable: None,
            default: None,
        }
    }

    pub fn with_length(mut self, length: usize) -> Self {
        self.length = Some(length);
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = Some(true);
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    fn is_nullable(&self) -> bool {
        self.nullable.unwrap_or(false)
    }

    fn declared_length(&self) -> usize {
        self.length.unwrap_or(DEFAULT_LENGTH)
    }
}

/// `(database, table, columns)` tuple, persisted as the `<table>.schema.json`
/// sidecar. Immutable after the owning table is created.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Schema {
    pub database: String,
    pub table: String,
    pub columns: Vec<ColumnDefinition>,
}

impl Schema {
    /// Construct a schema, injecting a leading non-nullable `id` column of
    /// type `UniqueIdentifier` if the caller's column list omits one
    /// (Section 3: "an `id` column is injected at position 0").
    pub fn new(
        database: impl Into<String>,
        table: impl Into<String>,
        mut columns: Vec<ColumnDefinition>,
    ) -> Result<Self> {
        if !columns
            .first()
            .map(|c| c.name == "id" && c.col_type == ColumnType::UniqueIdentifier)
            .unwrap_or(false)
        {
            columns.insert(0, ColumnDefinition::new("id", ColumnType::UniqueIdentifier));
        }
        let schema = Schema {
            database: database.into(),
            table: table.into(),
            columns,
        };
        schema.check_columns()?;
        Ok(schema)
    }

    /// Append a single column, rejecting it immediately if its name
    /// duplicates one already present (mirrors the teacher's `ColInfo::add`,
    /// generalised from a bool "already exists" return to `Result`).
    pub fn add_column(&mut self, def: ColumnDefinition) -> Result<()> {
        if self.columns.iter().any(|c| c.name == def.name) {
            return Err(Error::Schema(format!("duplicate column name: {}", def.name)));
        }
        self.columns.push(def);
        Ok(())
    }

    fn check_columns(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for col in &self.columns {
            if !seen.insert(col.name.as_str()) {
                return Err(Error::Schema(format!("duplicate column name: {}", col.name)));
            }
        }
        if self.columns.is_empty() {
            return Err(Error::Schema("schema must have at least one column".into()));
        }
        let id_col = &self.columns[0];
        if id_col.name != "id" || id_col.col_type != ColumnType::UniqueIdentifier {
            return Err(Error::Schema("first column must be a non-nullable id column".into()));
        }
        if id_col.is_nullable() {
            return Err(Error::Schema("id column must not be nullable".into()));
        }
        let nullable_count = self.columns.iter().filter(|c| c.is_nullable()).count();
        if nullable_count > MAX_NULLABLE_COLUMNS {
            return Err(Error::Schema(format!(
                "at most {} nullable columns are supported, got {}",
                MAX_NULLABLE_COLUMNS, nullable_count
            )));
        }
        Ok(())
    }

    /// Parse a schema from its JSON sidecar representation.
    pub fn from_json(s: &str) -> Result<Self> {
        let schema: Schema = serde_json::from_str(s)?;
        schema.check_columns()?;
        Ok(schema)
    }

    /// Serialize the schema to its JSON sidecar representation.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Compile this schema into a dense buffer layout.
    pub fn compile(&self) -> Result<BufferLayout> {
        self.check_columns()?;
        let mut columns = Vec::with_capacity(self.columns.len());
        let mut offset = 1usize; // status byte occupies offset 0
        let mut next_null_flag = 0u8;
        for def in &self.columns {
            let length = def.declared_length();
            let size = def.col_type.size(length);
            let nullable = def.is_nullable();
            let null_flag = if nullable {
                let bit = 1u8 << (2 + next_null_flag);
                next_null_flag += 1;
                bit
            } else {
                0
            };
            columns.push(CompiledColumn {
                name: def.name.clone(),
                offset,
                size,
                col_type: def.col_type,
                length,
                nullable,
                null_flag,
            });
            offset += size;
        }
        let layout = BufferLayout {
            columns,
            total_size: offset,
        };
        let errors = layout.validate();
        if let Some(first) = errors.into_iter().next() {
            return Err(Error::Schema(first));
        }
        Ok(layout)
    }
}

/// One column's place in the compiled row layout.
#[derive(Clone, Debug)]
pub struct CompiledColumn {
    pub name: String,
    pub offset: usize,
    pub size: usize,
    pub col_type: ColumnType,
    pub length: usize,
    pub nullable: bool,
    /// Power-of-two bit (within the status byte's high 6 bits) set when
    /// this column's value is null; `0` for non-nullable columns.
    pub null_flag: u8,
}

/// Compiled, immutable mapping from a `Schema` to per-column offsets/sizes
/// plus the row's total on-disk size. Shared read-only across all readers
/// of one table (see DESIGN.md, Shared-resource policy).
#[derive(Clone, Debug)]
pub struct BufferLayout {
    pub columns: Vec<CompiledColumn>,
    pub total_size: usize,
}

impl BufferLayout {
    /// Name-indexed view, built once at compile time; the hot path never
    /// uses this (it walks `columns` in declared order instead).
    pub fn column_map(&self) -> BTreeMap<&str, usize> {
        self.columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.name.as_str(), i))
            .collect()
    }

    pub fn column(&self, name: &str) -> Option<&CompiledColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Structural sanity checks: at least one column, `total_size > 0`,
    /// no negative/overlapping spans, last span within `total_size`.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.columns.is_empty() {
            errors.push("layout has no columns".to_string());
        }
        if self.total_size == 0 {
            errors.push("total_size must be > 0".to_string());
        }
        let mut spans: Vec<(usize, usize)> = Vec::new();
        for col in &self.columns {
            if col.size == 0 {
                errors.push(format!("column {} has zero size", col.name));
            }
            let end = col.offset + col.size;
            if end > self.total_size {
                errors.push(format!("column {} span exceeds total_size", col.name));
            }
            spans.push((col.offset, end));
        }
        spans.sort_unstable();
        for w in spans.windows(2) {
            if w[0].1 > w[1].0 {
                errors.push("overlapping column spans".to_string());
            }
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_schema() -> Schema {
        Schema::new(
            "db",
            "people",
            vec![
                ColumnDefinition::new("name", ColumnType::Text).with_length(10),
                ColumnDefinition::new("age", ColumnType::Number),
                ColumnDefinition::new("nickname", ColumnType::Text)
                    .with_length(5)
                    .nullable(),
            ],
        )
        .unwrap()
    }

    #[test]
    fn injects_id_column() {
        let schema = sample_schema();
        assert_eq!(schema.columns[0].name, "id");
        assert_eq!(schema.columns[0].col_type, ColumnType::UniqueIdentifier);
    }

    #[test]
    fn compile_computes_offsets() {
        let schema = sample_schema();
        let layout = schema.compile().unwrap();
        // status(1) + id(12) + name(10+2) + age(8) + nickname(5+2)
        assert_eq!(layout.total_size, 1 + 12 + 12 + 8 + 7);
        assert!(layout.validate().is_empty());
        let nickname = layout.column("nickname").unwrap();
        assert_ne!(nickname.null_flag, 0);
    }

    #[test]
    fn rejects_duplicate_column() {
        let result = Schema::new(
            "db",
            "t",
            vec![
                ColumnDefinition::new("a", ColumnType::Number),
                ColumnDefinition::new("a", ColumnType::Number),
            ],
        );
        assert!(result.is_err());
    }

    #[test]
    fn add_column_rejects_duplicate_name() {
        let mut schema = sample_schema();
        assert!(schema.add_column(ColumnDefinition::new("extra", ColumnType::Boolean)).is_ok());
        assert!(schema.columns.iter().any(|c| c.name == "extra"));
        let err = schema
            .add_column(ColumnDefinition::new("name", ColumnType::Text))
            .unwrap_err();
        assert!(matches!(err, Error::Schema(_)));
    }

    #[test]
    fn rejects_too_many_nullable_columns() {
        let mut columns = Vec::new();
        for i in 0..7 {
            columns.push(ColumnDefinition::new(format!("c{i}"), ColumnType::Number).nullable());
        }
        let result = Schema::new("db", "t", columns);
        assert!(result.is_err());
    }

    #[test]
    fn json_round_trips() {
        let schema = sample_schema();
        let json = schema.to_json().unwrap();
        let back = Schema::from_json(&json).unwrap();
        assert_eq!(back.to_json().unwrap(), json);
    }
}
