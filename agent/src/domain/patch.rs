//! Type-preserving JSON configuration merge.
//!
//! Pure functions only. The merge works on a copy of the target and returns
//! it; callers write the copy back only when the whole merge succeeded.
//!
//! Rules, applied key by key:
//! - keys absent from the target are ignored (at every depth);
//! - object into object merges recursively;
//! - object against non-object, in either direction, is a type mismatch;
//! - a string patch value overwrites;
//! - a value landing on a numeric literal is rewritten as a numeric literal
//!   with exactly one decimal place;
//! - a number or bool landing on a string becomes its text form.

use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use serde_json::{Map, Number, Value};

use crate::domain::error::PatchError;

/// Merge `patch` into a copy of `target`.
///
/// # Errors
///
/// Returns [`PatchError::TypeMismatch`] naming the first key whose patch value
/// does not fit the target's shape. `target` is never modified.
pub fn merge(
    target: &Map<String, Value>,
    patch: &Map<String, Value>,
) -> Result<Map<String, Value>, PatchError> {
    let mut merged = target.clone();
    merge_into(&mut merged, patch)?;
    Ok(merged)
}

fn mismatch(key: &str) -> PatchError {
    PatchError::TypeMismatch {
        key: key.to_string(),
    }
}

fn merge_into(target: &mut Map<String, Value>, patch: &Map<String, Value>) -> Result<(), PatchError> {
    for (key, incoming) in patch {
        let Some(existing) = target.get_mut(key) else {
            continue;
        };
        if let Value::Object(inner) = existing {
            let Value::Object(sub) = incoming else {
                return Err(mismatch(key));
            };
            merge_into(inner, sub)?;
            continue;
        }
        let replacement = match (&*existing, incoming) {
            (_, Value::Object(_)) => return Err(mismatch(key)),
            (_, Value::String(s)) => Value::String(s.clone()),
            (Value::Number(_), v) => numeric_literal(v),
            (Value::String(_), v) => text_literal(v),
            (_, v) => v.clone(),
        };
        *existing = replacement;
    }
    Ok(())
}

/// Numeric literal for a value landing on a numeric field.
fn numeric_literal(value: &Value) -> Value {
    match value {
        Value::Number(n) => Value::Number(float_text(n)),
        other => other.clone(),
    }
}

/// Re-render a number as one-decimal float text (`7` -> `7.0`, `0.26` -> `0.3`,
/// `1e3` -> `1000.0`).
fn float_text(n: &Number) -> Number {
    let Some(value) = n.as_f64().filter(|v| v.is_finite()) else {
        return n.clone();
    };
    serde_json::from_str::<Number>(&format!("{value:.1}")).unwrap_or_else(|_| n.clone())
}

fn text_literal(value: &Value) -> Value {
    match value {
        Value::Number(n) => Value::String(n.to_string()),
        Value::Bool(b) => Value::String(b.to_string()),
        other => other.clone(),
    }
}

/// Serialize a configuration document with tab indentation.
///
/// # Errors
///
/// Returns an error if a value cannot be serialized.
pub fn render(doc: &Map<String, Value>) -> Result<String, serde_json::Error> {
    let mut buf = Vec::new();
    let mut ser = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"\t"));
    doc.serialize(&mut ser)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Look up a dotted key path (`"model.weights.file"`) in a JSON object.
#[must_use]
pub fn lookup<'a>(root: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let first = segments.next()?;
    let mut current = root.get(first)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}
