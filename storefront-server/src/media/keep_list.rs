//! Keep-list parsing and the destructive-update guard
//!
//! The keep list names the additional images the client wants to retain.
//! Clients send it loosely typed (JSON numbers, numeric strings, comma
//! lists), so entries are coerced to positive integer ids and anything else
//! is dropped silently.

use std::collections::{BTreeSet, HashSet};

use serde_json::Value;

use super::error::MediaError;

/// Requested image ids, positive and deduplicated
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeepList {
    ids: BTreeSet<i64>,
}

impl KeepList {
    /// Coerce raw JSON entries
    pub fn from_values<'a>(values: impl IntoIterator<Item = &'a Value>) -> Self {
        Self {
            ids: values.into_iter().filter_map(coerce_id).collect(),
        }
    }

    /// Parse the textual form values of `keep_image_ids`.
    ///
    /// Each value may be a JSON array (`[2, "4"]`), a single id, or a comma
    /// separated list (`2,4`).
    pub fn from_form_values<S: AsRef<str>>(values: &[S]) -> Self {
        let mut raw = Vec::new();
        for value in values {
            let text = value.as_ref().trim();
            if text.is_empty() {
                continue;
            }
            match serde_json::from_str::<Value>(text) {
                Ok(Value::Array(items)) => raw.extend(items),
                Ok(Value::Null) => {}
                Ok(single @ (Value::Number(_) | Value::String(_))) => raw.push(single),
                Ok(_) => {}
                Err(_) => raw.extend(
                    text.split(',')
                        .map(|part| Value::String(part.trim().to_string())),
                ),
            }
        }
        Self::from_values(&raw)
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.ids.iter().copied()
    }

    /// Keep only ids that exist on the product
    pub fn validate_against(&self, current_ids: &HashSet<i64>) -> ValidKeepIds {
        ValidKeepIds {
            ids: self
                .ids
                .iter()
                .copied()
                .filter(|id| current_ids.contains(id))
                .collect(),
        }
    }
}

/// Keep ids that refer to images the product actually has
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidKeepIds {
    ids: BTreeSet<i64>,
}

impl ValidKeepIds {
    pub fn contains(&self, id: i64) -> bool {
        self.ids.contains(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Sorted ids, as recorded in the audit trail
    pub fn to_vec(&self) -> Vec<i64> {
        self.ids.iter().copied().collect()
    }
}

fn coerce_id(value: &Value) -> Option<i64> {
    let id = match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(integral))?,
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(integral))?
        }
        _ => return None,
    };
    (id > 0).then_some(id)
}

fn integral(f: f64) -> Option<i64> {
    (f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64).then_some(f as i64)
}

/// Refuse an update that would wipe every additional image.
///
/// New additional files with no valid keep id means "replace the whole
/// gallery", which is almost always a client bug (a lost or malformed keep
/// list). Such requests must be rejected before anything is mutated.
pub fn guard_destructive_update(
    product_id: i64,
    valid_keep: &ValidKeepIds,
    attached_additional: usize,
    existing_additional: usize,
) -> Result<(), MediaError> {
    if valid_keep.is_empty() && attached_additional > 0 {
        tracing::warn!(
            product_id,
            attached_additional,
            existing_additional,
            "Rejected additional image upload without a valid keep list"
        );
        return Err(MediaError::DangerousOperation {
            product_id,
            existing: existing_additional,
        });
    }
    Ok(())
}
