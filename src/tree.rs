//! Path-based access to nested translation trees.
//!
//! A translation tree is a JSON object whose interior nodes are objects and
//! whose leaves are anything else (usually strings). Leaves are addressed by
//! dot-joined paths such as `settings.profile.title`.

use serde_json::{Map, Value};

/// One leaf of a translation tree, addressed by its dot-joined path.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationEntry {
    pub path: String,
    pub value: Value,
}

/// Flatten a tree into its leaves, depth-first in key order.
///
/// Empty objects produce no entries. A root that is not an object has no
/// addressable leaves and yields an empty list.
pub fn flatten(tree: &Value) -> Vec<TranslationEntry> {
    let mut entries = Vec::new();
    if let Value::Object(map) = tree {
        flatten_into(map, None, &mut entries);
    }
    entries
}

/// `prefix` is `None` only at the root; an empty parent key still counts as a
/// segment, so `{"": {"b": 1}}` flattens to `.b`.
fn flatten_into(
    map: &Map<String, Value>,
    prefix: Option<&str>,
    entries: &mut Vec<TranslationEntry>,
) {
    for (key, value) in map {
        let path = match prefix {
            Some(prefix) => format!("{}.{}", prefix, key),
            None => key.clone(),
        };

        match value {
            Value::Object(child) => flatten_into(child, Some(&path), entries),
            leaf => entries.push(TranslationEntry {
                path,
                value: leaf.clone(),
            }),
        }
    }
}

/// Rebuild a nested tree from flattened entries, in entry order.
pub fn unflatten<I>(entries: I) -> Value
where
    I: IntoIterator<Item = TranslationEntry>,
{
    let mut tree = Value::Object(Map::new());
    for entry in entries {
        set_value_at_path(&mut tree, &entry.path, entry.value);
    }
    tree
}

/// Look up the value at `path`.
///
/// Returns `None` when any segment is missing or an intermediate segment is
/// not an object.
pub fn get_value_at_path<'a>(tree: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(tree, |node, segment| node.as_object()?.get(segment))
}

/// Store `value` at `path`, creating intermediate objects as needed.
///
/// A non-object value found on the way (including a non-object root) is
/// replaced by an empty object.
pub fn set_value_at_path(tree: &mut Value, path: &str, value: Value) {
    let (parents, key) = match path.rsplit_once('.') {
        Some((parents, key)) => (Some(parents), key),
        None => (None, path),
    };

    let mut map = coerce_object(tree);
    for segment in parents.into_iter().flat_map(|p| p.split('.')) {
        let child = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        map = coerce_object(child);
    }
    map.insert(key.to_string(), value);
}

fn coerce_object(node: &mut Value) -> &mut Map<String, Value> {
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    match node {
        Value::Object(map) => map,
        _ => unreachable!("node was just replaced by an object"),
    }
}
