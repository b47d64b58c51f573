//! Row codec: encode/decode a row against a compiled `BufferLayout`.
//!
//! Grounded on the teacher's `Value::load`/`Value::save` (`src/value.rs`)
//! dispatch-by-type pattern and the `util::iget`/`iset`/`getf64`/`setu64`
//! fixed-width byte helpers (`src/util.rs`), generalised from the teacher's
//! SQL value set to this engine's eight column types.

use crate::error::{Error, Result};
use crate::schema::{BufferLayout, CompiledColumn};
use crate::util::{getf64, hex_decode, hex_encode, setf64, setu16, truncate_utf8};
use crate::value::{ColumnType, Value};
use std::collections::BTreeMap;

/// A decoded (or about-to-be-encoded) row: column name to value.
pub type Row = BTreeMap<String, Value>;

/// Row status byte values (Section 3, "Row status").
pub const STATUS_EMPTY: u8 = 0x00;
pub const STATUS_ACTIVE: u8 = 0x01;
pub const STATUS_DELETED: u8 = 0x02;

/// Low 2 bits of the status byte carry the status code; the high 6 bits
/// double as a null bitmap (see DESIGN.md "Null-bitmap placement").
const STATUS_MASK: u8 = 0b0000_0011;

fn getu16(data: &[u8], off: usize) -> u16 {
    u16::from_le_bytes(data[off..off + 2].try_into().unwrap())
}

/// Encode `row` against `layout`. `now_ms` fills every `UpdatedAt` column
/// unconditionally. If the `UniqueIdentifier` column's value is absent (or
/// empty), `id_factory` is called to generate one. Returns the row's id
/// alongside the encoded, zero-filled, fixed-size block.
///
/// `strict` disables silent Text/Buffer truncation: an oversize value fails
/// with `Error::BufferOverflow` instead of being shortened to fit.
pub fn encode(
    layout: &BufferLayout,
    row: &Row,
    now_ms: f64,
    strict: bool,
    mut id_factory: impl FnMut() -> String,
) -> Result<(String, Vec<u8>)> {
    let mut buf = vec![0u8; layout.total_size];
    buf[0] = STATUS_ACTIVE;
    let mut id = String::new();

    for col in &layout.columns {
        let value = row.get(&col.name);
        match col.col_type {
            ColumnType::UniqueIdentifier => {
                let this_id = match value {
                    Some(Value::Id(s)) if !s.is_empty() => s.clone(),
                    _ => id_factory(),
                };
                write_id(&mut buf, col, &this_id)?;
                id = this_id;
            }
            ColumnType::Text => encode_text(&mut buf, col, value, strict)?,
            ColumnType::Buffer => encode_buffer(&mut buf, col, value, strict)?,
            ColumnType::Number => encode_scalar(&mut buf, col, value, Value::as_number)?,
            ColumnType::Boolean => encode_bool(&mut buf, col, value)?,
            ColumnType::Date => encode_scalar(&mut buf, col, value, Value::as_date)?,
            ColumnType::UpdatedAt => {
                setf64(&mut buf, col.offset, now_ms);
            }
            ColumnType::Coordinates => encode_coordinates(&mut buf, col, value)?,
        }
    }
    Ok((id, buf))
}

/// Decode one fixed-size block. Returns `Ok(None)` for `Empty`/`Deleted`
/// slots (scan callers skip them); fails `Error::CorruptRow` for an unknown
/// status code, a size mismatch, or invalid UTF-8 in a Text column.
pub fn decode(layout: &BufferLayout, data: &[u8]) -> Result<Option<Row>> {
    if data.len() != layout.total_size {
        return Err(Error::CorruptRow(format!(
            "expected {} bytes, got {}",
            layout.total_size,
            data.len()
        )));
    }
    let status = data[0] & STATUS_MASK;
    match status {
        STATUS_EMPTY | STATUS_DELETED => return Ok(None),
        STATUS_ACTIVE => {}
        other => return Err(Error::CorruptRow(format!("invalid status byte: {other:#04x}"))),
    }

    let mut row = Row::new();
    for col in &layout.columns {
        let is_null = col.nullable && (data[0] & col.null_flag) != 0;
        let value = if is_null {
            Value::Null
        } else {
            decode_column(col, data)?
        };
        row.insert(col.name.clone(), value);
    }
    Ok(Some(row))
}

fn decode_column(col: &CompiledColumn, data: &[u8]) -> Result<Value> {
    Ok(match col.col_type {
        ColumnType::UniqueIdentifier => {
            Value::Id(hex_encode(&data[col.offset..col.offset + col.size]))
        }
        ColumnType::Text => {
            let len = (getu16(data, col.offset) as usize).min(col.size - 2);
            let bytes = &data[col.offset + 2..col.offset + 2 + len];
            let s = std::str::from_utf8(bytes)
                .map_err(|e| Error::CorruptRow(format!("invalid utf-8 in column {}: {e}", col.name)))?;
            Value::Text(s.to_string())
        }
        ColumnType::Buffer => {
            let len = (getu16(data, col.offset) as usize).min(col.size - 2);
            Value::Buffer(data[col.offset + 2..col.offset + 2 + len].to_vec())
        }
        ColumnType::Number => Value::Number(getf64(data, col.offset)),
        ColumnType::Boolean => Value::Boolean(data[col.offset] != 0),
        ColumnType::Date => Value::Date(getf64(data, col.offset)),
        ColumnType::UpdatedAt => Value::UpdatedAt(getf64(data, col.offset)),
        ColumnType::Coordinates => {
            Value::Coordinates(getf64(data, col.offset), getf64(data, col.offset + 8))
        }
    })
}

fn write_id(buf: &mut [u8], col: &CompiledColumn, id: &str) -> Result<()> {
    let bytes = hex_decode(id)
        .filter(|b| b.len() == col.size)
        .ok_or_else(|| Error::Schema(format!("malformed id for column {}: {id}", col.name)))?;
    buf[col.offset..col.offset + col.size].copy_from_slice(&bytes);
    Ok(())
}

fn encode_text(buf: &mut [u8], col: &CompiledColumn, value: Option<&Value>, strict: bool) -> Result<()> {
    let text = match value {
        Some(Value::Text(s)) => Some(s.as_str()),
        Some(Value::Null) | None => None,
        Some(other) => {
            return Err(Error::Schema(format!(
                "column {} expects Text, got {other:?}",
                col.name
            )))
        }
    };
    match text {
        Some(s) => {
            let max_bytes = col.size - 2;
            if s.len() > max_bytes && strict {
                return Err(Error::BufferOverflow(format!(
                    "column {} value is {} bytes, capacity is {}",
                    col.name,
                    s.len(),
                    max_bytes
                )));
            }
            let truncated = truncate_utf8(s, max_bytes);
            setu16(buf, col.offset, truncated.len() as u16);
            buf[col.offset + 2..col.offset + 2 + truncated.len()].copy_from_slice(truncated.as_bytes());
        }
        None => set_null_or_fail(buf, col)?,
    }
    Ok(())
}

fn encode_buffer(buf: &mut [u8], col: &CompiledColumn, value: Option<&Value>, strict: bool) -> Result<()> {
    let bytes = match value {
        Some(Value::Buffer(b)) => Some(b.as_slice()),
        Some(Value::Null) | None => None,
        Some(other) => {
            return Err(Error::Schema(format!(
                "column {} expects Buffer, got {other:?}",
                col.name
            )))
        }
    };
    match bytes {
        Some(b) => {
            let max_bytes = col.size - 2;
            if b.len() > max_bytes && strict {
                return Err(Error::BufferOverflow(format!(
                    "column {} value is {} bytes, capacity is {}",
                    col.name,
                    b.len(),
                    max_bytes
                )));
            }
            let n = b.len().min(max_bytes);
            setu16(buf, col.offset, n as u16);
            buf[col.offset + 2..col.offset + 2 + n].copy_from_slice(&b[..n]);
        }
        None => set_null_or_fail(buf, col)?,
    }
    Ok(())
}

fn encode_scalar(
    buf: &mut [u8],
    col: &CompiledColumn,
    value: Option<&Value>,
    extract: impl Fn(&Value) -> Option<f64>,
) -> Result<()> {
    match value {
        Some(Value::Null) | None => set_null_or_fail(buf, col),
        Some(v) => {
            let n = extract(v).ok_or_else(|| {
                Error::Schema(format!("column {} has the wrong value type: {v:?}", col.name))
            })?;
            setf64(buf, col.offset, n);
            Ok(())
        }
    }
}

fn encode_bool(buf: &mut [u8], col: &CompiledColumn, value: Option<&Value>) -> Result<()> {
    match value {
        Some(Value::Null) | None => set_null_or_fail(buf, col),
        Some(Value::Boolean(b)) => {
            buf[col.offset] = u8::from(*b);
            Ok(())
        }
        Some(other) => Err(Error::Schema(format!(
            "column {} expects Boolean, got {other:?}",
            col.name
        ))),
    }
}

fn encode_coordinates(buf: &mut [u8], col: &CompiledColumn, value: Option<&Value>) -> Result<()> {
    match value {
        Some(Value::Null) | None => set_null_or_fail(buf, col),
        Some(Value::Coordinates(lat, lng)) => {
            setf64(buf, col.offset, *lat);
            setf64(buf, col.offset + 8, *lng);
            Ok(())
        }
        Some(other) => Err(Error::Schema(format!(
            "column {} expects Coordinates, got {other:?}",
            col.name
        ))),
    }
}

fn set_null_or_fail(buf: &mut [u8], col: &CompiledColumn) -> Result<()> {
    if col.nullable {
        buf[0] |= col.null_flag;
        Ok(())
    } else {
        Err(Error::Schema(format!(
            "column {} is required and has no value",
            col.name
        )))
    }
}
