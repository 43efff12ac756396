#![forbid(unsafe_code)]

//! AI content generation for product pages.
//!
//! A generator receives the selected product and the whole parameter tree
//! and returns the product page subtree. The controller merges that subtree
//! into the current tree once it arrives (see
//! [`merge_product_page`](pagesmith_core::merge_product_page)).

use pagesmith_core::Value;

use crate::store::StoreResult;

#[cfg(feature = "http")]
pub use http::HttpGenerator;

/// Produces product page content.
pub trait ContentGenerator: Send + Sync {
    fn name(&self) -> &str;

    /// Generate the page for `product` in the context of `params`.
    fn generate_product_page(&self, product: &Value, params: &Value) -> StoreResult<Value>;
}

/// Always answers with the same page. Used offline and in tests.
#[derive(Debug, Clone, Default)]
pub struct StaticGenerator {
    page: Value,
}

impl StaticGenerator {
    #[must_use]
    pub fn new(page: Value) -> Self {
        Self { page }
    }

    /// A page that echoes the product's name and description.
    #[must_use]
    pub fn echo() -> Self {
        Self { page: Value::Null }
    }
}

impl ContentGenerator for StaticGenerator {
    fn name(&self) -> &str {
        "StaticGenerator"
    }

    fn generate_product_page(&self, product: &Value, _params: &Value) -> StoreResult<Value> {
        if !self.page.is_null() {
            return Ok(self.page.clone());
        }
        let name = product.get_key("name").cloned().unwrap_or_default();
        let description = product.get_key("description").cloned().unwrap_or_default();
        let mut hero = pagesmith_core::Map::new();
        hero.insert("title".into(), name);
        hero.insert("subtitle".into(), description);
        let mut page = pagesmith_core::Map::new();
        page.insert("hero".into(), Value::from(hero));
        Ok(Value::from(page))
    }
}

#[cfg(feature = "http")]
mod http {
    use std::time::Duration;

    use pagesmith_core::Value;
    use serde::{Deserialize, Serialize};

    use crate::store::{StoreError, StoreResult};

    use super::ContentGenerator;

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct GenerateRequest<'a> {
        product: &'a Value,
        theme_params: &'a Value,
    }

    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct GenerateResponse {
        #[serde(default)]
        product_page_data: Option<Value>,
        #[serde(default)]
        error: Option<String>,
    }

    /// Posts to `{base}/api/generate-product-page`.
    #[derive(Debug)]
    pub struct HttpGenerator {
        url: String,
        agent: ureq::Agent,
    }

    impl HttpGenerator {
        #[must_use]
        pub fn new(base_url: impl Into<String>) -> Self {
            // Generation is slow; give it more room than plain saves.
            let agent = ureq::AgentBuilder::new()
                .timeout(Duration::from_secs(120))
                .build();
            let base = base_url.into();
            Self {
                url: format!("{}/api/generate-product-page", base.trim_end_matches('/')),
                agent,
            }
        }
    }

    impl ContentGenerator for HttpGenerator {
        fn name(&self) -> &str {
            "HttpGenerator"
        }

        fn generate_product_page(&self, product: &Value, params: &Value) -> StoreResult<Value> {
            tracing::debug!(url = %self.url, "requesting product page");
            let body = GenerateRequest {
                product,
                theme_params: params,
            };
            let response: GenerateResponse =
                crate::store::read_envelope(self.agent.post(&self.url).send_json(body))?;
            match (response.product_page_data, response.error) {
                (Some(page), _) if page.is_container() => Ok(page),
                (_, Some(error)) => Err(StoreError::Rejected(error)),
                _ => Err(StoreError::Serialization(
                    "response carried no productPageData".into(),
                )),
            }
        }
    }
}
