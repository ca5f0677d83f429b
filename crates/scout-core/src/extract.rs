// ABOUTME: Best-effort listing field extraction from raw listing-page HTML.
// ABOUTME: Each field has an ordered cascade of patterns; the first pattern that matches wins.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::listing::MLS_NOT_FOUND;

/// Fields pulled from a listing page. Values are the raw captured text;
/// numeric coercion happens later in the normalizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedListing {
    pub url: Option<String>,
    pub mls: String,
    pub price: Option<String>,
    pub address: Option<String>,
    pub beds: Option<String>,
    pub baths: Option<String>,
    #[serde(rename = "type")]
    pub property_type: Option<String>,
}

impl ExtractedListing {
    /// The record as a raw listing object, ready for `normalize_listings`.
    pub fn to_raw(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

fn patterns(sources: &[&str]) -> Vec<Regex> {
    sources
        .iter()
        .map(|p| Regex::new(p).expect("listing extraction pattern"))
        .collect()
}

static MLS_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    patterns(&[
        r#""(?:mlsNumber|mls_number|mlsId|listingId)"\s*:\s*"?([A-Z]?\d{5,10})"#,
        r#"data-mls(?:-number)?\s*=\s*"([A-Z]?\d{5,10})""#,
        r"(?:MLS|mls)®?\s*(?i:#|no\.?|number|numéro|n°)?\s*:?\s*([A-Z]?\d{5,10})\b",
        r"(?i:centris)\s*(?i:#|no\.?|number|numéro|n°)?\s*:?\s*(\d{6,10})\b",
    ])
});

static PRICE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    patterns(&[
        r#"itemprop="price"[^>]*content="(\d+)"#,
        r#""price"\s*:\s*"?(\d+)"#,
        r"\$\s*(\d{1,3}(?:[,\s\u{a0}]\d{3})+|\d{4,})",
        r"(\d{1,3}(?:[\s\u{a0}.]\d{3})+|\d{4,})\s*\$",
    ])
});

static ADDRESS_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    patterns(&[
        r#""streetAddress"\s*:\s*"([^"]+)""#,
        r#"itemprop="(?:streetAddress|address)"[^>]*>\s*([^<]+?)\s*<"#,
        r#"(?i)class="[^"]*\baddress\b[^"]*"[^>]*>\s*([^<]+?)\s*<"#,
    ])
});

static BEDS_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    patterns(&[
        r#""numberOfBedrooms"\s*:\s*"?(\d+)"#,
        r"(?i)(\d+)\s*(?:bedrooms?|beds?|chambres?|cac)\b",
        r"(?i)(?:bedrooms?|chambres?)\s*:?\s*(\d+)",
    ])
});

static BATHS_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    patterns(&[
        r#""numberOfBathroomsTotal"\s*:\s*"?(\d+(?:\.\d+)?)"#,
        r"(?i)(\d+(?:\.\d+)?)\s*(?:bathrooms?|baths?|salles? de bains?|sdb)\b",
        r"(?i)(?:bathrooms?|salles? de bains?)\s*:?\s*(\d+(?:\.\d+)?)",
    ])
});

static TYPE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    patterns(&[
        r#"(?i)(?:property type|type de propriété)\s*:?\s*(?:</?[a-z][^>]*>\s*)*([^<\n]{3,40}?)\s*<"#,
        r"(?i)\b(condo(?:minium)?|duplex|triplex|quadruplex|bungalow|townhouse|maison de ville|cottage|loft|split-level|maison|apartment|appartement|house)\b",
    ])
});

/// First capture group of the first pattern that matches, trimmed.
fn first_match(patterns: &[Regex], html: &str) -> Option<String> {
    patterns.iter().find_map(|re| {
        re.captures(html)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|s| !s.is_empty())
    })
}

/// Pull listing fields out of `html`. Fields with no match are `None`,
/// except the identifier which falls back to `MLS_NOT_FOUND`.
pub fn extract_listing_info(url: Option<&str>, html: &str) -> ExtractedListing {
    ExtractedListing {
        url: url.map(str::to_string),
        mls: first_match(&MLS_PATTERNS, html).unwrap_or_else(|| MLS_NOT_FOUND.to_string()),
        price: first_match(&PRICE_PATTERNS, html),
        address: first_match(&ADDRESS_PATTERNS, html),
        beds: first_match(&BEDS_PATTERNS, html),
        baths: first_match(&BATHS_PATTERNS, html),
        property_type: first_match(&TYPE_PATTERNS, html),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing::normalize_listings;

    const CENTRIS_PAGE: &str = r#"
        <html><body>
          <h1 itemprop="category">Condo à vendre</h1>
          <h2 itemprop="address" class="pt-1">1234, Rue Sainte-Catherine, Montréal</h2>
          <span id="ListingDisplayId">Centris No. 28374651</span>
          <div class="price"><span>549 000 $</span></div>
          <div class="cac">2 chambres</div>
          <div class="sdb">1 salle de bain</div>
        </body></html>
    "#;

    const JSON_LD_PAGE: &str = r#"
        <script type="application/ld+json">
        {"@type":"SingleFamilyResidence","mlsNumber":"X1234567",
         "address":{"streetAddress":"77 Maple Street"},
         "numberOfBedrooms":4,"numberOfBathroomsTotal":"2.5",
         "offers":{"price":"899000"}}
        </script>
        <p>Property type: Detached house</p>
    "#;

    #[test]
    fn extracts_centris_markup() {
        let info = extract_listing_info(Some("https://www.centris.ca/fr/1"), CENTRIS_PAGE);

        assert_eq!(info.url.as_deref(), Some("https://www.centris.ca/fr/1"));
        assert_eq!(info.mls, "28374651");
        assert_eq!(info.price.as_deref(), Some("549 000"));
        assert_eq!(info.address.as_deref(), Some("1234, Rue Sainte-Catherine, Montréal"));
        assert_eq!(info.beds.as_deref(), Some("2"));
        assert_eq!(info.baths.as_deref(), Some("1"));
        assert_eq!(info.property_type.as_deref(), Some("Condo"));
    }

    #[test]
    fn prefers_structured_data() {
        let info = extract_listing_info(None, JSON_LD_PAGE);

        assert_eq!(info.mls, "X1234567");
        assert_eq!(info.price.as_deref(), Some("899000"));
        assert_eq!(info.address.as_deref(), Some("77 Maple Street"));
        assert_eq!(info.beds.as_deref(), Some("4"));
        assert_eq!(info.baths.as_deref(), Some("2.5"));
        assert_eq!(info.property_type.as_deref(), Some("Detached house"));
    }

    #[test]
    fn missing_identifier_falls_back_to_sentinel() {
        let info = extract_listing_info(None, "<p>Nothing to see here</p>");
        assert_eq!(info.mls, MLS_NOT_FOUND);
        assert!(info.price.is_none());
        assert!(info.address.is_none());
        assert!(info.beds.is_none());
    }

    #[test]
    fn extracted_record_normalizes() {
        let info = extract_listing_info(Some("https://www.centris.ca/fr/1"), CENTRIS_PAGE);
        let listings = normalize_listings(&[info.to_raw()]);

        assert_eq!(listings[0].mls, "28374651");
        assert_eq!(listings[0].price, Some(549000.0));
        assert_eq!(listings[0].beds, Some(2));
        assert_eq!(listings[0].baths, Some(1.0));
    }
}
