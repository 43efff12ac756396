#![forbid(unsafe_code)]

//! Preview renderers: read-only consumers of the current parameter tree.

use std::io::Write;

use pagesmith_core::Value;

/// Receives every new current tree.
///
/// The tree is borrowed immutably; a renderer can never change it.
pub trait PreviewRenderer {
    fn render(&mut self, params: &Value);
}

impl<F: FnMut(&Value)> PreviewRenderer for F {
    fn render(&mut self, params: &Value) {
        self(params)
    }
}

/// Discards every render.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPreview;

impl PreviewRenderer for NoPreview {
    fn render(&mut self, _params: &Value) {}
}

/// Writes a short text outline of the tree to `W`.
#[derive(Debug)]
pub struct OutlinePreview<W> {
    out: W,
    renders: usize,
}

impl<W: Write> OutlinePreview<W> {
    pub fn new(out: W) -> Self {
        Self { out, renders: 0 }
    }

    #[must_use]
    pub fn renders(&self) -> usize {
        self.renders
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> PreviewRenderer for OutlinePreview<W> {
    fn render(&mut self, params: &Value) {
        self.renders += 1;
        if let Err(error) = self.out.write_all(outline(params).as_bytes()) {
            tracing::warn!(error = %error, "preview output failed");
        }
    }
}

/// Content sections in page order.
const SECTIONS: [&str; 9] = [
    "hero",
    "about",
    "problems",
    "solutions",
    "products",
    "testimonials",
    "cta",
    "footer",
    "productPages",
];

/// Render `params` as an outline: palette, font, then one line per section.
#[must_use]
pub fn outline(params: &Value) -> String {
    let mut out = String::new();

    if let Some(colors) = params.get_key("colors").and_then(Value::as_object) {
        let swatches: Vec<String> = colors
            .iter()
            .filter_map(|(name, value)| value.as_str().map(|hex| format!("{name}={hex}")))
            .collect();
        out.push_str(&format!("colors     {}\n", swatches.join(" ")));
    }
    if let Some(font) = params
        .get_key("typography")
        .and_then(|t| t.get_key("fontFamily"))
        .and_then(Value::as_str)
    {
        out.push_str(&format!("font       {font}\n"));
    }

    let Some(content) = params.get_key("content") else {
        return out;
    };
    for section in SECTIONS {
        let Some(node) = content.get_key(section) else {
            continue;
        };
        let line = match section {
            "productPages" => {
                let count = node.as_object().map_or(0, |pages| pages.len());
                format!("{count} page(s)")
            }
            "footer" => node
                .get_key("companyName")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            _ => summarize(node),
        };
        out.push_str(&format!("{section:<10} {line}\n"));
    }
    out
}

fn summarize(section: &Value) -> String {
    let title = section
        .get_key("title")
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .unwrap_or("(untitled)");
    let items = ["items", "testimonials"]
        .iter()
        .find_map(|key| section.get_key(key).and_then(Value::as_array))
        .map(|items| items.len());
    match items {
        Some(n) => format!("{title} [{n}]"),
        None => title.to_string(),
    }
}
