// ABOUTME: Allow-list of real-estate listing domains used to filter search results.
// ABOUTME: A URL is allowed when its host equals an entry or is a subdomain of one.

use url::Url;

/// Listing sites searched when no allow-list is configured.
pub const DEFAULT_LISTING_DOMAINS: &[&str] = &[
    "centris.ca",
    "realtor.ca",
    "duproprio.com",
    "remax-quebec.com",
    "royallepage.ca",
    "sutton.com",
    "kijiji.ca",
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomainAllowList {
    domains: Vec<String>,
}

impl DomainAllowList {
    /// Build an allow-list. Entries are lowercased; blanks and leading dots are dropped.
    pub fn new<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let domains = domains
            .into_iter()
            .map(|d| d.as_ref().trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|d| !d.is_empty())
            .collect();
        Self { domains }
    }

    pub fn listing_sites() -> Self {
        Self::new(DEFAULT_LISTING_DOMAINS.iter().copied())
    }

    /// Parse a comma-separated list such as `SCOUT_ALLOWED_DOMAINS`.
    pub fn parse(list: &str) -> Self {
        Self::new(list.split(','))
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    pub fn domains(&self) -> &[String] {
        &self.domains
    }

    /// Whether `url` points at an allowed host. Malformed URLs are never allowed.
    pub fn allows(&self, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else {
            return false;
        };
        let Some(host) = parsed.host_str() else {
            return false;
        };
        let host = host.to_ascii_lowercase();

        self.domains.iter().any(|domain| {
            host == *domain
                || host
                    .strip_suffix(domain.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
    }
}
