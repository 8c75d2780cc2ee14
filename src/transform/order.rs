//! Stable sorting and per-group renumbering

use std::cmp::Ordering;

use tabular_text::{MissingColumn, Row, Table, Value};

/// One component of a sort key; `null` sorts as "" or 0
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortKey {
    Text(String),
    TextNoCase(String),
    Number(String),
}

impl SortKey {
    fn column(&self) -> &str {
        match self {
            SortKey::Text(c) | SortKey::TextNoCase(c) | SortKey::Number(c) => c,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum KeyPart {
    Text(String),
    Number(f64),
}

impl KeyPart {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (KeyPart::Text(a), KeyPart::Text(b)) => a.cmp(b),
            (KeyPart::Number(a), KeyPart::Number(b)) => a.total_cmp(b),
            // parts at one key position share a kind
            _ => Ordering::Equal,
        }
    }
}

fn key_part(key: &SortKey, value: Option<&Value>) -> KeyPart {
    let text = || match value {
        None | Some(Value::Null) => String::new(),
        Some(v) => v.display_text(),
    };
    match key {
        SortKey::Text(_) => KeyPart::Text(text()),
        SortKey::TextNoCase(_) => KeyPart::Text(text().to_lowercase()),
        SortKey::Number(_) => KeyPart::Number(value.and_then(Value::as_f64).unwrap_or(0.0)),
    }
}

/// Stable sort of the table rows by `keys`
pub fn sort_rows(table: &mut Table, keys: &[SortKey]) -> Result<(), MissingColumn> {
    let index = table.column_index();
    let positions = keys
        .iter()
        .map(|k| index.require(k.column()))
        .collect::<Result<Vec<_>, _>>()?;

    let Some(rows) = table.rows_mut() else {
        return Ok(());
    };

    let make_key = |row: &Row| -> Vec<KeyPart> {
        keys.iter()
            .zip(&positions)
            .map(|(k, &p)| key_part(k, row.get(p)))
            .collect()
    };
    let mut keyed: Vec<(Vec<KeyPart>, Row)> =
        rows.drain(..).map(|row| (make_key(&row), row)).collect();
    keyed.sort_by(|(a, _), (b, _)| {
        a.iter()
            .zip(b)
            .map(|(x, y)| x.cmp(y))
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    });
    rows.extend(keyed.into_iter().map(|(_, row)| row));
    Ok(())
}

/// Write 1..N into `counter` within each run of equal `group` values
pub fn renumber(table: &mut Table, group: &str, counter: &str) -> Result<(), MissingColumn> {
    let index = table.column_index();
    let group_at = index.require(group)?;
    let counter_at = index.require(counter)?;

    let Some(rows) = table.rows_mut() else {
        return Ok(());
    };

    let mut current: Option<Value> = None;
    let mut count = 0;
    for row in rows.iter_mut() {
        let key = row.get(group_at).cloned().unwrap_or(Value::Null);
        count = if current.as_ref() == Some(&key) { count + 1 } else { 1 };
        current = Some(key);
        if let Some(cell) = row.get_mut(counter_at) {
            *cell = Value::Int(count);
        }
    }
    Ok(())
}
