// ABOUTME: Web search tool backed by a Tavily-style search endpoint.
// ABOUTME: Clamps the result count and keeps only results on allow-listed listing domains.

use async_trait::async_trait;
use serde_json::{Value, json};

use scout_core::DomainAllowList;

use super::{Tool, ToolError, required_str};

pub const DEFAULT_SEARCH_BASE_URL: &str = "https://api.tavily.com";
pub const DEFAULT_MAX_RESULTS: u64 = 5;
pub const MAX_RESULTS_LIMIT: u64 = 10;

/// `search_listings(query, max_results?)`
pub struct SearchListingsTool {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    allowed_domains: DomainAllowList,
}

impl SearchListingsTool {
    pub fn new(api_key: Option<String>, base_url: String, allowed_domains: DomainAllowList) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            allowed_domains,
        }
    }

    /// Build the search request body. The allow-list is passed along so the
    /// backend can narrow its own results too.
    pub fn build_request_body(&self, query: &str, max_results: u64) -> Value {
        let mut body = json!({
            "query": query,
            "max_results": max_results,
            "search_depth": "basic",
        });
        if !self.allowed_domains.is_empty() {
            body["include_domains"] = json!(self.allowed_domains.domains());
        }
        body
    }

    /// Reduce a search response to `{title, url, snippet}` entries on allowed domains.
    pub fn parse_results(&self, response_body: &Value, max_results: u64) -> Vec<Value> {
        response_body
            .get("results")
            .and_then(|r| r.as_array())
            .map(|results| {
                results
                    .iter()
                    .filter_map(|item| {
                        let url = item.get("url").and_then(|u| u.as_str())?;
                        if !self.allowed_domains.is_empty() && !self.allowed_domains.allows(url) {
                            tracing::debug!(url, "dropping search result outside allow-list");
                            return None;
                        }
                        let title = item.get("title").and_then(|t| t.as_str()).unwrap_or_default();
                        let snippet = item
                            .get("content")
                            .or_else(|| item.get("snippet"))
                            .and_then(|s| s.as_str())
                            .unwrap_or_default();
                        Some(json!({ "title": title, "url": url, "snippet": snippet }))
                    })
                    .take(usize::try_from(max_results).unwrap_or(usize::MAX))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Read `max_results` as a number or numeric string and clamp it to [1, 10].
pub fn clamp_max_results(args: &Value) -> u64 {
    let requested = match args.get("max_results") {
        Some(Value::Number(n)) => n.as_f64().map(|f| f.max(0.0) as u64),
        Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    requested
        .unwrap_or(DEFAULT_MAX_RESULTS)
        .clamp(1, MAX_RESULTS_LIMIT)
}

#[async_trait]
impl Tool for SearchListingsTool {
    fn name(&self) -> &str {
        "search_listings"
    }

    fn definition(&self) -> Value {
        json!({
            "name": "search_listings",
            "description": "Search the web for real-estate listing pages. Returns ranked results with title, url and snippet.",
            "parameters": {
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "Search query, e.g. '2 bedroom condo Plateau Mont-Royal for sale'." },
                    "max_results": { "type": "integer", "minimum": 1, "maximum": MAX_RESULTS_LIMIT, "description": "Number of results to return (default 5)." }
                },
                "required": ["query"]
            }
        })
    }

    async fn call(&self, args: Value) -> Result<Value, ToolError> {
        let query = required_str(&args, "query")?;
        let max_results = clamp_max_results(&args);
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ToolError::MissingCredential("TAVILY_API_KEY"))?;

        tracing::info!(query, max_results, "searching listings");

        let response = self
            .client
            .post(format!("{}/search", self.base_url))
            .bearer_auth(api_key)
            .json(&self.build_request_body(query, max_results))
            .send()
            .await
            .map_err(|e| ToolError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ToolError::Status {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ToolError::Transport(format!("invalid search response: {}", e)))?;

        Ok(json!({ "results": self.parse_results(&body, max_results) }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::http::StatusCode;
    use axum::routing::post;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn tool(api_key: Option<&str>, base_url: &str) -> SearchListingsTool {
        SearchListingsTool::new(
            api_key.map(String::from),
            base_url.to_string(),
            DomainAllowList::listing_sites(),
        )
    }

    #[test]
    fn max_results_is_clamped() {
        assert_eq!(clamp_max_results(&json!({})), DEFAULT_MAX_RESULTS);
        assert_eq!(clamp_max_results(&json!({ "max_results": 0 })), 1);
        assert_eq!(clamp_max_results(&json!({ "max_results": -3 })), 1);
        assert_eq!(clamp_max_results(&json!({ "max_results": 50 })), 10);
        assert_eq!(clamp_max_results(&json!({ "max_results": "7" })), 7);
        assert_eq!(clamp_max_results(&json!({ "max_results": "lots" })), DEFAULT_MAX_RESULTS);
    }

    #[test]
    fn request_body_carries_allow_list() {
        let body = tool(Some("k"), DEFAULT_SEARCH_BASE_URL).build_request_body("condo", 3);
        assert_eq!(body["query"], "condo");
        assert_eq!(body["max_results"], 3);
        assert_eq!(body["include_domains"][0], "centris.ca");
    }

    #[test]
    fn results_outside_allow_list_are_dropped() {
        let body = json!({
            "results": [
                { "title": "Condo Plateau", "url": "https://www.centris.ca/fr/condo/123", "content": "2 chambres" },
                { "title": "Spam", "url": "https://example.com/condo", "content": "buy now" },
                { "title": "No url" },
                { "title": "Duplex", "url": "https://duproprio.com/fr/456", "snippet": "duplex" }
            ]
        });
        let results = tool(Some("k"), DEFAULT_SEARCH_BASE_URL).parse_results(&body, 10);

        assert_eq!(results.len(), 2);
        assert_eq!(results[0]["snippet"], "2 chambres");
        assert_eq!(results[1]["url"], "https://duproprio.com/fr/456");
        assert_eq!(results[1]["snippet"], "duplex");
    }

    #[test]
    fn empty_allow_list_keeps_everything() {
        let search = SearchListingsTool::new(Some("k".into()), DEFAULT_SEARCH_BASE_URL.into(), DomainAllowList::default());
        let body = json!({ "results": [{ "title": "a", "url": "https://example.com/a", "content": "" }] });
        assert_eq!(search.parse_results(&body, 5).len(), 1);
        assert!(search.build_request_body("q", 5).get("include_domains").is_none());
    }

    #[tokio::test]
    async fn missing_credential_is_reported() {
        let err = tool(None, DEFAULT_SEARCH_BASE_URL)
            .call(json!({ "query": "condo" }))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::MissingCredential("TAVILY_API_KEY")));
    }

    #[tokio::test]
    async fn blank_query_is_rejected() {
        let err = tool(Some("k"), DEFAULT_SEARCH_BASE_URL)
            .call(json!({ "query": "   " }))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::MissingArgument("query")));
    }

    #[tokio::test]
    async fn searches_backend_and_filters() {
        let base = serve(Router::new().route(
            "/search",
            post(|axum::Json(body): axum::Json<Value>| async move {
                assert_eq!(body["query"], "condo rosemont");
                axum::Json(json!({
                    "results": [
                        { "title": "Centris", "url": "https://centris.ca/1", "content": "condo" },
                        { "title": "Other", "url": "https://other.net/2", "content": "condo" }
                    ]
                }))
            }),
        ))
        .await;

        let result = tool(Some("k"), &base)
            .call(json!({ "query": "condo rosemont", "max_results": 3 }))
            .await
            .unwrap();

        let results = result["results"].as_array().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["title"], "Centris");
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let base = serve(Router::new().route(
            "/search",
            post(|| async { (StatusCode::UNAUTHORIZED, "bad key") }),
        ))
        .await;

        let err = tool(Some("k"), &base).call(json!({ "query": "condo" })).await.unwrap_err();
        assert!(matches!(err, ToolError::Status { status: 401, .. }));
    }
}
