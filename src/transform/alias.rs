//! Seven-character parameter aliases
//!
//! An alias is built from the consonants of the parameter name, in order,
//! across all of its words (split on `_` and on lower→upper case changes).
//! Short consonant runs repeat cyclically; a name without consonants gets
//! `XXXXXXX`. Collisions first vary the last character over `A..Z0..9`,
//! then fall back to random tokens.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use tabular_text::{Table, Value};
use tracing::{debug, warn};

use crate::error::TransformError;

pub const ALIAS_LEN: usize = 7;

/// Random candidates tried once every last-character variant is taken
pub const RANDOM_ATTEMPTS: usize = 100;

const CONSONANTS: &str = "BCDFGHJKLMNPQRSTVWXYZ";
const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

static CAMEL_BOUNDARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([a-z])([A-Z])").expect("valid camel-case pattern"));

/// Words of a name, split on underscores and camel-case boundaries
pub fn split_words(name: &str) -> Vec<String> {
    let underscored = name.replace('_', " ");
    let spaced = CAMEL_BOUNDARY.replace_all(&underscored, "$1 $2");
    spaced.split_whitespace().map(str::to_string).collect()
}

/// The alias a name gets when nothing else is taken
pub fn base_alias(name: &str) -> String {
    let consonants: Vec<char> = split_words(name)
        .iter()
        .flat_map(|w| w.chars())
        .map(|c| c.to_ascii_uppercase())
        .filter(|c| CONSONANTS.contains(*c))
        .collect();

    if consonants.is_empty() {
        return "X".repeat(ALIAS_LEN);
    }
    (0..ALIAS_LEN)
        .map(|i| consonants[i % consonants.len()])
        .collect()
}

/// Derive a unique alias for `name` and record it in `used`
pub fn make_alias<R: Rng + ?Sized>(
    name: &str,
    used: &mut HashSet<String>,
    rng: &mut R,
) -> Result<String, TransformError> {
    let base = base_alias(name);
    if used.insert(base.clone()) {
        return Ok(base);
    }

    let stem: String = base.chars().take(ALIAS_LEN - 1).collect();
    for &last in ALPHABET {
        let candidate = format!("{}{}", stem, char::from(last));
        if used.insert(candidate.clone()) {
            debug!(name, alias = %candidate, "alias varied on last character");
            return Ok(candidate);
        }
    }

    for _ in 0..RANDOM_ATTEMPTS {
        let candidate: String = (0..ALIAS_LEN)
            .map(|_| char::from(ALPHABET[rng.gen_range(0..ALPHABET.len())]))
            .collect();
        if used.insert(candidate.clone()) {
            warn!(name, alias = %candidate, "alias fell back to a random token");
            return Ok(candidate);
        }
    }

    Err(TransformError::AliasExhausted {
        name: name.to_string(),
    })
}

/// Fill `target` with aliases derived from `source`, row by row in table
/// order. The target column is appended when absent.
pub fn assign_aliases<R: Rng + ?Sized>(
    table: &mut Table,
    source: &str,
    target: &str,
    rng: &mut R,
) -> Result<usize, TransformError> {
    let Some(from) = table.position(source) else {
        return Ok(0);
    };
    let to = match table.position(target) {
        Some(i) => i,
        None => {
            table.columns.push(target.to_string());
            table.columns.len() - 1
        }
    };

    let mut used = HashSet::new();
    let mut assigned = 0;
    if let Some(rows) = table.rows_mut() {
        for row in rows.iter_mut() {
            let name = row.get(from).map(Value::display_text).unwrap_or_default();
            let alias = make_alias(&name, &mut used, rng)?;
            if row.len() <= to {
                row.resize(to + 1, Value::Null);
            }
            row[to] = Value::String(alias);
            assigned += 1;
        }
    }
    Ok(assigned)
}
