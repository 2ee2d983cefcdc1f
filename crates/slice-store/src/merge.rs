//! Deep merge over [`Value`] trees
//!
//! The merge policy the whole engine rests on: source wins on scalar
//! conflicts, maps merge recursively on structural overlap, arrays are
//! replaced wholesale. Neither input is ever mutated; the result shares
//! no substructure with either.

use crate::value::Value;

/// Deep-merges `source` into a fresh tree derived from `target`.
///
/// Policy, in order:
/// - strings are atomic: a string source is the result;
/// - two leaves: the source is the result;
/// - array on exactly one side: the target is discarded wholesale in
///   favor of a copy of the source;
/// - two arrays: overwrite, never concatenate or index-merge; the
///   result is a copy of the source array;
/// - otherwise key-wise over maps: untouched target keys survive, leaf
///   source values win, structured values on both sides recurse. A
///   `Null` target value counts as "nothing to merge into".
///
/// A map target with a leaf, non-string source falls through to the
/// key-wise step and therefore survives unchanged.
pub fn merge(target: &Value, source: &Value) -> Value {
    if let Value::String(_) = source {
        return source.clone();
    }
    if !target.is_structured() && !source.is_structured() {
        return source.clone();
    }

    let target_is_array = matches!(target, Value::Array(_));
    let source_is_array = matches!(source, Value::Array(_));

    if target_is_array != source_is_array {
        return source.clone();
    }
    if source_is_array {
        return source.clone();
    }

    merge_maps(target, source)
}

/// Key-wise merge step. Either side may turn out not to be a map (the
/// type-mismatch fall-throughs above land here); a non-map side simply
/// contributes no keys.
fn merge_maps(target: &Value, source: &Value) -> Value {
    let mut dest = match target {
        Value::Map(map) => map.clone(),
        _ => Default::default(),
    };

    if let Value::Map(map) = source {
        for (key, incoming) in map {
            let base = target.get(key).filter(|v| !v.is_null());
            let merged = match base {
                Some(existing) if incoming.is_structured() => merge(existing, incoming),
                _ => incoming.clone(),
            };
            dest.insert(key.clone(), merged);
        }
    }

    Value::Map(dest)
}
