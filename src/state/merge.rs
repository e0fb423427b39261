//! Two-level merge of a patch object into a slice value.

use crate::error::{Result, SliceError};
use crate::types::value_kind;
use serde_json::Value;

/// Merge `patch` into `current`.
///
/// For every top-level key of `patch`:
/// - if both sides hold an object at that key, the patch's fields are copied
///   into the existing object one by one (siblings survive, overlapping keys
///   are overwritten, anything deeper is replaced as a whole);
/// - otherwise the patch value replaces whatever was at that key.
///
/// Arrays and `null` in the patch are plain values: they replace what was
/// there. Arrays are not merged index by index and `null` does not delete or
/// skip the key. Scalars replace too; they are never silently dropped.
///
/// Both `current` and `patch` must be objects. On error `current` is left
/// untouched.
pub fn merge_value(name: &str, current: &mut Value, patch: &Value) -> Result<()> {
    let patch = match patch {
        Value::Object(map) => map,
        other => return Err(SliceError::MergePatchNotObject(value_kind(other))),
    };

    let target = match current {
        Value::Object(map) => map,
        other => {
            return Err(SliceError::MergeTargetNotObject {
                name: name.to_string(),
                found: value_kind(other),
            })
        }
    };

    for (key, incoming) in patch {
        match (target.get_mut(key), incoming) {
            (Some(Value::Object(existing)), Value::Object(fields)) => {
                for (field, value) in fields {
                    existing.insert(field.clone(), value.clone());
                }
            }
            _ => {
                target.insert(key.clone(), incoming.clone());
            }
        }
    }

    Ok(())
}
