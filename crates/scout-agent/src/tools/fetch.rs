// ABOUTME: Page fetching with a descriptive User-Agent, a per-attempt timeout, and retry with backoff.
// ABOUTME: FetchPageTool exposes it to the model as normalized page text.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use scout_core::html_to_text;

use super::{Tool, ToolError, required_str};

pub const DEFAULT_USER_AGENT: &str =
    "listing-scout/0.1 (real-estate listing research bot; +https://github.com/2389-research/listing-scout)";
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);
pub const FETCH_ATTEMPTS: u32 = 3;

/// Delay before retrying after the given zero-based attempt.
pub fn backoff(attempt: u32) -> Duration {
    Duration::from_millis(300 + 500 * u64::from(attempt))
}

/// Shared HTTP fetcher used by both the fetch and extract tools.
pub struct PageFetcher {
    client: reqwest::Client,
    user_agent: String,
    timeout: Duration,
}

impl PageFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            user_agent: user_agent.to_string(),
            timeout,
        }
    }

    /// GET `url` and return the body. Network failures, timeouts, and 5xx
    /// responses are retried up to `FETCH_ATTEMPTS` times; a 4xx is final.
    pub async fn fetch_html(&self, url: &str) -> Result<String, ToolError> {
        let mut last_error = String::new();

        for attempt in 0..FETCH_ATTEMPTS {
            match self.attempt(url).await {
                Ok(html) => {
                    tracing::debug!(url, attempt, bytes = html.len(), "page fetched");
                    return Ok(html);
                }
                Err(ToolError::Status { status, body }) if status < 500 => {
                    return Err(ToolError::Status { status, body });
                }
                Err(e) => {
                    tracing::warn!(url, attempt, error = %e, "page fetch attempt failed");
                    last_error = e.to_string();
                }
            }

            if attempt + 1 < FETCH_ATTEMPTS {
                tokio::time::sleep(backoff(attempt)).await;
            }
        }

        Err(ToolError::FetchExhausted {
            url: url.to_string(),
            attempts: FETCH_ATTEMPTS,
            last_error,
        })
    }

    async fn attempt(&self, url: &str) -> Result<String, ToolError> {
        let request = async {
            let response = self
                .client
                .get(url)
                .header(reqwest::header::USER_AGENT, &self.user_agent)
                .header(reqwest::header::ACCEPT, "text/html,application/xhtml+xml")
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

            response
                .text()
                .await
                .map_err(|e| ToolError::Transport(e.to_string()))
        };

        tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| ToolError::Transport(format!("timed out after {}ms", self.timeout.as_millis())))?
    }
}

/// `fetch_page(url)`: returns the page's normalized text excerpt.
pub struct FetchPageTool {
    fetcher: Arc<PageFetcher>,
}

impl FetchPageTool {
    pub fn new(fetcher: Arc<PageFetcher>) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl Tool for FetchPageTool {
    fn name(&self) -> &str {
        "fetch_page"
    }

    fn definition(&self) -> Value {
        json!({
            "name": "fetch_page",
            "description": "Fetch a web page and return its visible text (scripts, styles and markup removed, truncated).",
            "parameters": {
                "type": "object",
                "properties": {
                    "url": { "type": "string", "description": "Absolute URL of the page to fetch." }
                },
                "required": ["url"]
            }
        })
    }

    async fn call(&self, args: Value) -> Result<Value, ToolError> {
        let url = required_str(&args, "url")?;
        let html = self.fetcher.fetch_html(url).await?;
        Ok(json!({ "url": url, "text": html_to_text(&html) }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::Router;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::get;

    /// Serve `router` on an ephemeral local port and return its base URL.
    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[test]
    fn backoff_grows_linearly() {
        assert_eq!(backoff(0), Duration::from_millis(300));
        assert_eq!(backoff(1), Duration::from_millis(800));
        assert_eq!(backoff(2), Duration::from_millis(1300));
    }

    #[tokio::test]
    async fn fetch_sends_user_agent_and_normalizes_text() {
        let base = serve(Router::new().route(
            "/listing",
            get(|headers: HeaderMap| async move {
                let ua = headers
                    .get("user-agent")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("none")
                    .to_string();
                axum::response::Html(format!(
                    "<html><script>x()</script><body><p>UA: {}</p><p>Condo  2 chambres</p></body></html>",
                    ua
                ))
            }),
        ))
        .await;

        let fetcher = Arc::new(PageFetcher::new("scout-test-agent", Duration::from_secs(5)));
        let tool = FetchPageTool::new(fetcher);
        let url = format!("{}/listing", base);
        let result = tool.call(json!({ "url": url })).await.unwrap();

        assert_eq!(result["url"], url.as_str());
        assert_eq!(result["text"], "UA: scout-test-agent Condo 2 chambres");
    }

    #[tokio::test]
    async fn transient_server_errors_are_retried() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let base = serve(Router::new().route(
            "/flaky",
            get(move || {
                let counter = Arc::clone(&counter);
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        (StatusCode::SERVICE_UNAVAILABLE, "busy".to_string())
                    } else {
                        (StatusCode::OK, "<p>ok</p>".to_string())
                    }
                }
            }),
        ))
        .await;

        let fetcher = PageFetcher::new(DEFAULT_USER_AGENT, Duration::from_secs(5));
        let html = fetcher.fetch_html(&format!("{}/flaky", base)).await.unwrap();

        assert_eq!(html, "<p>ok</p>");
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let base = serve(Router::new().route(
            "/gone",
            get(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { (StatusCode::NOT_FOUND, "missing") }
            }),
        ))
        .await;

        let fetcher = PageFetcher::new(DEFAULT_USER_AGENT, Duration::from_secs(5));
        let err = fetcher.fetch_html(&format!("{}/gone", base)).await.unwrap_err();

        assert!(matches!(err, ToolError::Status { status: 404, .. }));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unreachable_host_exhausts_retries() {
        // Bind then drop a listener so the port is known to refuse connections.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let fetcher = PageFetcher::new(DEFAULT_USER_AGENT, Duration::from_secs(2));
        let url = format!("http://{}/nothing", addr);
        let err = fetcher.fetch_html(&url).await.unwrap_err();

        match &err {
            ToolError::FetchExhausted { url: failed, attempts, last_error } => {
                assert_eq!(failed, &url);
                assert_eq!(*attempts, FETCH_ATTEMPTS);
                assert!(!last_error.is_empty());
            }
            other => panic!("expected FetchExhausted, got {:?}", other),
        }
        assert!(err.to_string().contains(&url));
    }

    #[tokio::test]
    async fn slow_pages_time_out() {
        let base = serve(Router::new().route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "late"
            }),
        ))
        .await;

        let fetcher = PageFetcher::new(DEFAULT_USER_AGENT, Duration::from_millis(50));
        let err = fetcher.fetch_html(&format!("{}/slow", base)).await.unwrap_err();
        assert!(err.to_string().contains("timed out"), "got: {}", err);
    }
}
