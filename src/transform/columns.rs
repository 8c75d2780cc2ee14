//! Column reshaping: move, rename, drop, trim, integer coercion
//!
//! All operations keep rows in step with the header. They are lenient about
//! absent columns and report whether anything changed.

use tabular_text::{Table, Value};

/// Move `column` to `position`, shifting the columns in between.
///
/// Returns false when the column does not exist.
pub fn move_column(table: &mut Table, column: &str, position: usize) -> bool {
    let Some(from) = table.position(column) else {
        return false;
    };
    let to = position.min(table.columns.len() - 1);
    if from == to {
        return true;
    }

    let name = table.columns.remove(from);
    table.columns.insert(to, name);
    if let Some(rows) = table.rows_mut() {
        for row in rows.iter_mut() {
            let value = if from < row.len() {
                row.remove(from)
            } else {
                Value::Null
            };
            let at = to.min(row.len());
            row.insert(at, value);
        }
    }
    true
}

/// Rename in place; false when `from` is absent or `to` already exists
pub fn rename_column(table: &mut Table, from: &str, to: &str) -> bool {
    if table.has_column(to) {
        return false;
    }
    match table.position(from) {
        Some(i) => {
            table.columns[i] = to.to_string();
            true
        }
        None => false,
    }
}

/// Remove each listed column together with its values; returns how many
/// were present
pub fn drop_columns(table: &mut Table, columns: &[String]) -> usize {
    let mut dropped = 0;
    for column in columns {
        let Some(i) = table.position(column) else {
            continue;
        };
        table.columns.remove(i);
        if let Some(rows) = table.rows_mut() {
            for row in rows.iter_mut().filter(|r| i < r.len()) {
                row.remove(i);
            }
        }
        dropped += 1;
    }
    dropped
}

/// Strip surrounding whitespace from every string value of `column`
pub fn trim_column(table: &mut Table, column: &str) -> bool {
    map_column(table, column, |value| match value {
        Value::String(s) if s.trim().len() != s.len() => Value::string(s.trim()),
        other => other,
    })
}

/// Turn every value of `column` into an integer; unreadable values become 0
pub fn coerce_int_column(table: &mut Table, column: &str) -> bool {
    map_column(table, column, |value| match value {
        Value::Null => Value::Null,
        other => Value::Int(other.as_i64().unwrap_or(0)),
    })
}

fn map_column(table: &mut Table, column: &str, f: impl Fn(Value) -> Value) -> bool {
    let Some(i) = table.position(column) else {
        return false;
    };
    if let Some(rows) = table.rows_mut() {
        for cell in rows.iter_mut().filter_map(|r| r.get_mut(i)) {
            *cell = f(std::mem::replace(cell, Value::Null));
        }
    }
    true
}
