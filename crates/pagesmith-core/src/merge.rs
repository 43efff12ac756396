#![forbid(unsafe_code)]

//! Bulk merges: loaded parameters over defaults, AI product pages into a tree.

use std::borrow::Cow;
use std::sync::Arc;

use crate::path::{ParamPath, Segment};
use crate::update::{UpdateError, apply};
use crate::value::{Map, Value};

/// Maps whose children are keyed by id, never by array position.
const ID_KEYED_MAPS: [[&str; 2]; 1] = [["content", "productPages"]];

/// Flags of a product page that survive regeneration.
const PRESERVED_PAGE_FLAGS: [&str; 2] = ["enabled", "showPreview"];

/// Overlay `loaded` on `defaults`.
///
/// Objects merge key by key with the loaded side winning; arrays and scalars
/// from the loaded side replace the default wholesale. A `null` on the loaded
/// side keeps the default. Subtrees that only exist on one side are shared,
/// not copied.
#[must_use]
pub fn merge_with_defaults(defaults: &Value, loaded: &Value) -> Value {
    match (defaults, loaded) {
        (_, Value::Null) => defaults.clone(),
        (Value::Object(base), Value::Object(overlay)) => {
            let mut merged: Map = (**base).clone();
            for (key, value) in overlay.iter() {
                let next = match merged.get(key) {
                    Some(default) => merge_with_defaults(default, value),
                    None => value.clone(),
                };
                merged.insert(key.clone(), next);
            }
            Value::Object(Arc::new(merged))
        }
        _ => loaded.clone(),
    }
}

/// Read a numeric id under an id-keyed map as a key.
///
/// Forms address `content.productPages.7.enabled` with plain strings; without
/// this the `7` would make `productPages` an array, which a later
/// [`merge_product_page`] cannot write into.
#[must_use]
pub fn key_id_segments(path: &ParamPath) -> Cow<'_, ParamPath> {
    let segments = path.segments();
    for prefix in ID_KEYED_MAPS {
        let under_prefix = segments.len() > prefix.len()
            && segments
                .iter()
                .zip(prefix)
                .all(|(segment, name)| matches!(segment, Segment::Key(key) if key == name));
        if under_prefix && segments[prefix.len()].is_index() {
            return Cow::Owned(path.with_key_at(prefix.len()));
        }
    }
    Cow::Borrowed(path)
}

fn product_page_path(product_id: &str) -> ParamPath {
    // Product ids are map keys even when they look numeric.
    ParamPath::single(Segment::key("content"))
        .child(Segment::key("productPages"))
        .child(Segment::key(product_id))
}

/// Store a generated product page under `content.productPages.<product_id>`.
///
/// The generated subtree replaces the previous page data, except that the
/// `enabled` and `showPreview` flags keep their previous values. A flag the
/// page never had defaults to `true`, so a fresh page shows up in the preview.
pub fn merge_product_page(
    tree: &Value,
    product_id: &str,
    generated: &Value,
) -> Result<Value, UpdateError> {
    let path = product_page_path(product_id);
    let previous = tree.get(&path);

    let mut page = generated.as_object().cloned().unwrap_or_default();
    for flag in PRESERVED_PAGE_FLAGS {
        let kept = previous
            .and_then(|p| p.get_key(flag))
            .filter(|v| !v.is_null())
            .cloned()
            .unwrap_or(Value::Bool(true));
        page.insert(flag.to_string(), kept);
    }

    tracing::debug!(product_id, "merging generated product page");
    apply(Some(tree), &path, Value::from(page))
}

/// Find the entry of `content.products.items` whose `id` is `product_id`.
///
/// Numeric ids match their decimal text.
#[must_use]
pub fn find_product<'a>(tree: &'a Value, product_id: &str) -> Option<&'a Value> {
    let items_path = ParamPath::new(["content", "products", "items"]).ok()?;
    tree.get(&items_path)?
        .as_array()?
        .iter()
        .find(|item| match item.get_key("id") {
            Some(Value::String(id)) => &**id == product_id,
            Some(Value::Number(id)) => id.to_string() == product_id,
            _ => false,
        })
}
