#![forbid(unsafe_code)]

//! Path-update engine: write one leaf, get a new tree back.
//!
//! [`apply`] takes the current parameter tree, a [`ParamPath`] and a new
//! value, and returns a new tree in which only that location changed.
//!
//! # Copy-on-write
//!
//! The input is cloned (an `Arc` bump) and the walk calls
//! [`Arc::make_mut`] on every container it passes through. Containers on the
//! path are still shared with the input at that point, so each one is
//! shallow-copied exactly once; every sibling subtree stays shared. The input
//! tree, and every history snapshot that shares storage with it, is left
//! untouched.
//!
//! # Container inference
//!
//! | Slot being descended into | Next segment | Result |
//! |---------------------------|--------------|--------|
//! | missing or `null`         | index        | new array |
//! | missing or `null`         | key          | new object |
//! | string / number / bool    | either       | replaced like `null` (logged) |
//! | object                    | index        | key with the index's text |
//! | array                     | key          | [`UpdateError::KeyIntoArray`] |
//!
//! Writing or descending past the end of an array grows it; the skipped
//! slots are filled with `null`, which is how a sparse array looks once
//! persisted as JSON. Indices above [`MAX_INDEX`] are refused with
//! [`UpdateError::IndexTooLarge`] rather than allocated.
//!
//! The terminal segment is always a plain assignment, never an insert.

use std::fmt;
use std::sync::Arc;

use crate::path::{ParamPath, Segment};
use crate::value::Value;

/// Largest array index the engine will grow an array to reach.
pub const MAX_INDEX: usize = 65_535;

/// A write the engine refuses to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateError {
    /// A key segment addressed an existing array.
    KeyIntoArray {
        /// The offending key.
        key: String,
        /// Index of the offending segment within the path.
        depth: usize,
    },
    /// An index segment would grow an array past [`MAX_INDEX`].
    IndexTooLarge {
        /// The offending index.
        index: usize,
        /// Index of the offending segment within the path.
        depth: usize,
    },
}

impl fmt::Display for UpdateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeyIntoArray { key, depth } => {
                write!(f, "segment {depth} ({key:?}) is a key but addresses an array")
            }
            Self::IndexTooLarge { index, depth } => {
                write!(f, "segment {depth} index {index} exceeds the limit of {MAX_INDEX}")
            }
        }
    }
}

impl std::error::Error for UpdateError {}

/// Return a copy of `tree` with `value` written at `path`.
///
/// A `None` or `null` tree is treated as an empty object.
pub fn apply(tree: Option<&Value>, path: &ParamPath, value: Value) -> Result<Value, UpdateError> {
    let mut root = root_of(tree);
    write_at(&mut root, path.segments(), value, 0)?;
    tracing::trace!(path = %path, "applied parameter write");
    Ok(root)
}

/// Apply several writes in order, copying each container at most once.
///
/// Stops at the first failing write; the input is never modified.
pub fn apply_all<I>(tree: Option<&Value>, edits: I) -> Result<Value, UpdateError>
where
    I: IntoIterator<Item = (ParamPath, Value)>,
{
    let mut root = root_of(tree);
    for (path, value) in edits {
        write_at(&mut root, path.segments(), value, 0)?;
    }
    Ok(root)
}

fn root_of(tree: Option<&Value>) -> Value {
    match tree {
        Some(value) if !value.is_null() => value.clone(),
        _ => Value::object(),
    }
}

fn write_at(
    node: &mut Value,
    segments: &[Segment],
    value: Value,
    depth: usize,
) -> Result<(), UpdateError> {
    let Some((head, rest)) = segments.split_first() else {
        return Ok(());
    };
    let slot = slot_mut(node, head, depth)?;
    if rest.is_empty() {
        *slot = value;
        Ok(())
    } else {
        write_at(slot, rest, value, depth + 1)
    }
}

/// Unshare `node` and return the child slot named by `segment`, creating it
/// (and growing arrays) as needed.
fn slot_mut<'a>(
    node: &'a mut Value,
    segment: &Segment,
    depth: usize,
) -> Result<&'a mut Value, UpdateError> {
    match node {
        Value::Object(map) => Ok(Arc::make_mut(map)
            .entry(segment.as_key().into_owned())
            .or_insert(Value::Null)),
        Value::Array(items) => match segment {
            Segment::Index(index) => {
                let index = *index;
                if index >= items.len() {
                    let len = index
                        .checked_add(1)
                        .filter(|_| index <= MAX_INDEX)
                        .ok_or(UpdateError::IndexTooLarge { index, depth })?;
                    Arc::make_mut(items).resize(len, Value::Null);
                }
                Ok(&mut Arc::make_mut(items)[index])
            }
            Segment::Key(key) => Err(UpdateError::KeyIntoArray {
                key: key.clone(),
                depth,
            }),
        },
        leaf => {
            if !leaf.is_null() {
                tracing::debug!(
                    depth,
                    replaced = leaf.kind(),
                    "replacing scalar with container on parameter path"
                );
            }
            *leaf = Value::container_for(segment);
            slot_mut(leaf, segment, depth)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path(raw: &[&str]) -> ParamPath {
        ParamPath::new(raw.iter().copied()).unwrap()
    }

    fn tree(json: serde_json::Value) -> Value {
        Value::from(json)
    }

    #[test]
    fn numeric_second_segment_creates_array() {
        let out = apply(Some(&Value::object()), &path(&["a", "0", "b"]), "x".into()).unwrap();
        assert_eq!(out.to_json(), json!({"a": [{"b": "x"}]}));
    }

    #[test]
    fn none_and_null_trees_start_empty() {
        let p = path(&["colors", "primary"]);
        let from_none = apply(None, &p, "#FFF".into()).unwrap();
        let from_null = apply(Some(&Value::Null), &p, "#FFF".into()).unwrap();
        assert_eq!(from_none.to_json(), json!({"colors": {"primary": "#FFF"}}));
        assert_eq!(from_none, from_null);
    }

    #[test]
    fn skipped_indices_are_null_filled() {
        let out = apply(
            Some(&tree(json!({"content": {}}))),
            &path(&["content", "problems", "items", "2", "title"]),
            "New Title".into(),
        )
        .unwrap();
        assert_eq!(
            out.to_json(),
            json!({"content": {"problems": {"items": [null, null, {"title": "New Title"}]}}})
        );
    }

    #[test]
    fn terminal_index_assigns_in_place() {
        let before = tree(json!({"items": ["a", "b", "c"]}));
        let out = apply(Some(&before), &path(&["items", "1"]), "B".into()).unwrap();
        assert_eq!(out.to_json(), json!({"items": ["a", "B", "c"]}));
    }

    #[test]
    fn input_tree_is_never_modified() {
        let before = tree(json!({"colors": {"primary": "#000"}, "layout": {"gap": "8px"}}));
        let snapshot = before.to_json();
        let out = apply(Some(&before), &path(&["colors", "primary"]), "#FFF".into()).unwrap();
        assert_eq!(before.to_json(), snapshot);
        assert_ne!(out, before);
    }

    #[test]
    fn untouched_siblings_stay_shared() {
        let before = tree(json!({"colors": {"primary": "#000"}, "layout": {"gap": "8px"}}));
        let out = apply(Some(&before), &path(&["colors", "primary"]), "#FFF".into()).unwrap();

        let layout = ParamPath::new(["layout"]).unwrap();
        let colors = ParamPath::new(["colors"]).unwrap();
        let (Some(old_layout), Some(new_layout)) = (before.get(&layout), out.get(&layout)) else {
            panic!("layout missing");
        };
        assert!(old_layout.shares_storage_with(new_layout));
        let (Some(old_colors), Some(new_colors)) = (before.get(&colors), out.get(&colors)) else {
            panic!("colors missing");
        };
        assert!(!old_colors.shares_storage_with(new_colors));
        assert!(!before.shares_storage_with(&out));
    }

    #[test]
    fn scalar_on_path_is_replaced() {
        let before = tree(json!({"hero": "legacy"}));
        let out = apply(Some(&before), &path(&["hero", "title"]), "Hi".into()).unwrap();
        assert_eq!(out.to_json(), json!({"hero": {"title": "Hi"}}));
    }

    #[test]
    fn index_into_object_uses_key_text() {
        let before = tree(json!({"pages": {"3": {"enabled": false}}}));
        let out = apply(Some(&before), &path(&["pages", "3", "enabled"]), true.into()).unwrap();
        assert_eq!(out.to_json(), json!({"pages": {"3": {"enabled": true}}}));
    }

    #[test]
    fn key_into_array_is_rejected() {
        let before = tree(json!({"items": [1, 2]}));
        let err = apply(Some(&before), &path(&["items", "title"]), "x".into()).unwrap_err();
        assert_eq!(
            err,
            UpdateError::KeyIntoArray {
                key: "title".into(),
                depth: 1
            }
        );
    }

    #[test]
    fn oversized_index_is_rejected() {
        let p = ParamPath::parse_dotted("content.items.18446744073709551615").unwrap();
        let err = apply(None, &p, "x".into()).unwrap_err();
        assert_eq!(
            err,
            UpdateError::IndexTooLarge {
                index: usize::MAX,
                depth: 2
            }
        );

        let before = tree(json!({"content": {"items": ["a"]}}));
        let p = ParamPath::parse_dotted("content.items.99999999999").unwrap();
        assert!(matches!(
            apply(Some(&before), &p, "x".into()),
            Err(UpdateError::IndexTooLarge { depth: 2, .. })
        ));

        let limit = MAX_INDEX.to_string();
        let at_limit = path(&["items", limit.as_str()]);
        let out = apply(None, &at_limit, "z".into()).unwrap();
        assert_eq!(out.get(&at_limit), Some(&Value::from("z")));
    }

    #[test]
    fn whole_subtree_replacement() {
        let before = tree(json!({"content": {"problems": {"items": [{"t": "a"}, {"t": "b"}]}}}));
        let out = apply(
            Some(&before),
            &path(&["content", "problems", "items"]),
            tree(json!([{"t": "a"}])),
        )
        .unwrap();
        assert_eq!(out.to_json(), json!({"content": {"problems": {"items": [{"t": "a"}]}}}));
    }

    #[test]
    fn apply_all_runs_in_order() {
        let out = apply_all(
            None,
            vec![
                (path(&["colors", "primary"]), Value::from("#111")),
                (path(&["colors", "primary"]), Value::from("#222")),
                (path(&["layout", "gap"]), Value::from("4px")),
            ],
        )
        .unwrap();
        assert_eq!(
            out.to_json(),
            json!({"colors": {"primary": "#222"}, "layout": {"gap": "4px"}})
        );
    }

    #[test]
    fn root_array_accepts_index_writes() {
        let before = tree(json!([1]));
        let out = apply(Some(&before), &path(&["2"]), Value::from(3_i64)).unwrap();
        assert_eq!(out.to_json(), json!([1, null, 3]));
    }
}
