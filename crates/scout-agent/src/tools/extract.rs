// ABOUTME: Tool wrapper around the pattern-cascade listing extractor.
// ABOUTME: Uses inline HTML when given, otherwise fetches the URL first.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use scout_core::extract_listing_info;

use super::fetch::PageFetcher;
use super::{Tool, ToolError, optional_str};

/// `extract_listing_info(url?, html?)`
pub struct ExtractListingTool {
    fetcher: Arc<PageFetcher>,
}

impl ExtractListingTool {
    pub fn new(fetcher: Arc<PageFetcher>) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl Tool for ExtractListingTool {
    fn name(&self) -> &str {
        "extract_listing_info"
    }

    fn definition(&self) -> Value {
        json!({
            "name": "extract_listing_info",
            "description": "Extract MLS number, price, address, bedrooms, bathrooms and property type from a listing page. Pass raw html, or just the url to have the page fetched.",
            "parameters": {
                "type": "object",
                "properties": {
                    "url": { "type": "string", "description": "URL of the listing page." },
                    "html": { "type": "string", "description": "Raw HTML of the listing page, if already fetched." }
                },
                "required": []
            }
        })
    }

    async fn call(&self, args: Value) -> Result<Value, ToolError> {
        let url = optional_str(&args, "url");

        let info = match (optional_str(&args, "html"), url) {
            (Some(html), _) => extract_listing_info(url, html),
            (None, Some(url)) => {
                let html = self.fetcher.fetch_html(url).await?;
                extract_listing_info(Some(url), &html)
            }
            (None, None) => return Err(ToolError::MissingArgument("html or url")),
        };

        Ok(info.to_raw())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use scout_core::MLS_NOT_FOUND;

    fn tool() -> ExtractListingTool {
        ExtractListingTool::new(Arc::new(PageFetcher::new("test", Duration::from_secs(1))))
    }

    #[tokio::test]
    async fn extracts_from_inline_html() {
        let html = r#"<span>MLS® 19283746</span><span>$ 649,000</span><p>3 bedrooms, 2 bathrooms</p>"#;
        let result = tool()
            .call(json!({ "url": "https://realtor.ca/x", "html": html }))
            .await
            .unwrap();

        assert_eq!(result["mls"], "19283746");
        assert_eq!(result["price"], "649,000");
        assert_eq!(result["beds"], "3");
        assert_eq!(result["baths"], "2");
        assert_eq!(result["url"], "https://realtor.ca/x");
        assert!(result["address"].is_null());
    }

    #[tokio::test]
    async fn no_match_falls_back_to_sentinel() {
        let result = tool().call(json!({ "html": "<p>hello</p>" })).await.unwrap();
        assert_eq!(result["mls"], MLS_NOT_FOUND);
    }

    #[tokio::test]
    async fn requires_html_or_url() {
        let err = tool().call(json!({})).await.unwrap_err();
        assert!(err.to_string().contains("html or url"));
    }
}
