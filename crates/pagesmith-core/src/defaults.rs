#![forbid(unsafe_code)]

//! Parameters of a freshly created theme.
//!
//! A loaded theme is merged over these (see
//! [`merge_with_defaults`](crate::merge::merge_with_defaults)) so every
//! section the preview expects exists even for sparse stored themes.

use serde_json::json;

use crate::value::Value;

/// The default parameter tree.
#[must_use]
pub fn default_theme_params() -> Value {
    Value::from(json!({
        "colors": {
            "primary": "#8B4513",
            "secondary": "#D2691E",
            "accent": "#F4A460",
            "background": "#FFFFFF",
            "text": "#2D3748"
        },
        "typography": {
            "fontFamily": "Inter",
            "fontSize": "16px",
            "headingSize": "2xl",
            "bodySize": "base",
            "lineHeight": "1.6",
            "fontWeight": "400"
        },
        "layout": {
            "containerWidth": "1200px",
            "sectionSpacing": "80px",
            "spacing": "comfortable",
            "borderRadius": "8px"
        },
        "components": {
            "button": { "style": "solid", "size": "medium", "rounded": true },
            "card": { "shadow": "medium", "border": true, "padding": "medium" }
        },
        "content": {
            "meta": { "title": "", "description": "" },
            "header": { "title": "", "navigation": [] },
            "hero": { "title": "", "subtitle": "", "ctaText": "" },
            "about": { "title": "", "description": "" },
            "problems": { "title": "", "items": [] },
            "solutions": { "title": "", "items": [] },
            "products": { "title": "", "items": [] },
            "testimonials": { "title": "", "testimonials": [], "partners": [], "stats": [] },
            "cta": { "title": "", "buttonText": "" },
            "footer": { "companyName": "", "contact": { "email": "", "phone": "", "address": "" } },
            "productPages": {}
        }
    }))
}
