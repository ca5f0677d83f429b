// ABOUTME: Core library for listing-scout, containing the pure listing domain.
// ABOUTME: Criteria, record normalization and dedup, HTML-to-text, pattern extraction, and domain filtering.

pub mod criteria;
pub mod domains;
pub mod extract;
pub mod html;
pub mod listing;

pub use criteria::{DEFAULT_LOCATION, ListingCriteria};
pub use domains::{DEFAULT_LISTING_DOMAINS, DomainAllowList};
pub use extract::{ExtractedListing, extract_listing_info};
pub use html::{MAX_TEXT_CHARS, html_to_text};
pub use listing::{
    MAX_LISTINGS, MLS_NOT_FOUND, NormalizedListing, RawListingRecord, normalize_listings,
    parse_price_text,
};
