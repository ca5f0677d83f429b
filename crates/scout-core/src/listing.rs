// ABOUTME: Canonicalizes loosely-typed listing records into NormalizedListing and deduplicates them.
// ABOUTME: Aliased keys are resolved in fixed priority order; duplicates merge first-write-wins per field.

use std::collections::HashMap;

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

/// Bilingual placeholder used when no listing identifier can be resolved.
pub const MLS_NOT_FOUND: &str = "MLS non trouvé / MLS not found";

/// Upper bound on distinct listings produced by one normalization pass.
pub const MAX_LISTINGS: usize = 12;

/// A listing record as received from a model or an extraction tool.
/// Keys are not normalized; see the alias tables below.
pub type RawListingRecord = Map<String, Value>;

const MLS_KEYS: &[&str] = &["mls", "MLS", "listingId", "listing_id", "MLS®"];
const URL_KEYS: &[&str] = &["url", "URL", "link", "listingUrl", "listing_url"];
const ADDRESS_KEYS: &[&str] = &["address", "Address", "fullAddress", "full_address"];
const TYPE_KEYS: &[&str] = &["type", "propertyType", "property_type"];
const NOTE_EN_KEYS: &[&str] = &["note_en", "noteEn", "notes_en"];
const NOTE_FR_KEYS: &[&str] = &["note_fr", "noteFr", "notes_fr"];
const PRICE_KEYS: &[&str] = &["price", "Price", "listPrice", "list_price", "priceText", "price_text"];
const BEDS_KEYS: &[&str] = &["beds", "bedrooms", "Beds", "chambres"];
const BATHS_KEYS: &[&str] = &["baths", "bathrooms", "Baths", "salles_de_bain"];

/// The canonical listing shape returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedListing {
    pub mls: String,
    pub url: Option<String>,
    pub address: Option<String>,
    #[serde(serialize_with = "whole_number")]
    pub price: Option<f64>,
    pub beds: Option<u32>,
    #[serde(serialize_with = "whole_number")]
    pub baths: Option<f64>,
    #[serde(rename = "type")]
    pub property_type: Option<String>,
    pub note_en: Option<String>,
    pub note_fr: Option<String>,
}

impl NormalizedListing {
    /// True when the identifier is a real MLS number rather than the sentinel.
    pub fn has_identifier(&self) -> bool {
        self.mls != MLS_NOT_FOUND
    }
}

/// Emit integral values as JSON integers so `500000` stays `500000`, not `500000.0`.
fn whole_number<S: Serializer>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(v) if v.fract() == 0.0 && *v >= 0.0 && *v <= u64::MAX as f64 => {
            serializer.serialize_u64(*v as u64)
        }
        Some(v) => serializer.serialize_f64(*v),
        None => serializer.serialize_none(),
    }
}

/// A listing under construction. `mls` stays optional until finalization so
/// a URL-keyed record can still pick up an identifier from a duplicate.
#[derive(Debug, Default)]
struct Draft {
    mls: Option<String>,
    url: Option<String>,
    address: Option<String>,
    price: Option<f64>,
    beds: Option<u32>,
    baths: Option<f64>,
    property_type: Option<String>,
    note_en: Option<String>,
    note_fr: Option<String>,
}

impl Draft {
    fn from_raw(raw: &RawListingRecord) -> Self {
        Self {
            mls: text_field(raw, MLS_KEYS).filter(|id| id != MLS_NOT_FOUND),
            url: text_field(raw, URL_KEYS),
            address: text_field(raw, ADDRESS_KEYS),
            price: first_present(raw, PRICE_KEYS).and_then(|v| number(v, digits_only)),
            beds: first_present(raw, BEDS_KEYS).and_then(count),
            baths: first_present(raw, BATHS_KEYS).and_then(|v| number(v, digits_and_point)),
            property_type: text_field(raw, TYPE_KEYS),
            note_en: text_field(raw, NOTE_EN_KEYS),
            note_fr: text_field(raw, NOTE_FR_KEYS),
        }
    }

    /// Fill every absent field from `other`. Present fields are never overwritten.
    fn absorb(&mut self, other: Draft) {
        fill(&mut self.mls, other.mls);
        fill(&mut self.url, other.url);
        fill(&mut self.address, other.address);
        fill(&mut self.price, other.price);
        fill(&mut self.beds, other.beds);
        fill(&mut self.baths, other.baths);
        fill(&mut self.property_type, other.property_type);
        fill(&mut self.note_en, other.note_en);
        fill(&mut self.note_fr, other.note_fr);
    }

    fn finish(self) -> NormalizedListing {
        NormalizedListing {
            mls: self.mls.unwrap_or_else(|| MLS_NOT_FOUND.to_string()),
            url: self.url,
            address: self.address,
            price: self.price,
            beds: self.beds,
            baths: self.baths,
            property_type: self.property_type,
            note_en: self.note_en,
            note_fr: self.note_fr,
        }
    }
}

fn fill<T>(slot: &mut Option<T>, incoming: Option<T>) {
    if slot.is_none() {
        *slot = incoming;
    }
}

/// Deduplication key. Records with neither an identifier nor a URL get a
/// positional key and are never merged with each other.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum IdentityKey {
    Mls(String),
    Url(String),
    Position(usize),
}

impl IdentityKey {
    fn of(draft: &Draft, position: usize) -> Self {
        if let Some(mls) = &draft.mls {
            IdentityKey::Mls(mls.to_uppercase())
        } else if let Some(url) = &draft.url {
            IdentityKey::Url(url.clone())
        } else {
            IdentityKey::Position(position)
        }
    }
}

/// Normalize and deduplicate raw listing records, preserving first-seen order.
///
/// Non-object entries are skipped. Once `MAX_LISTINGS` distinct records are
/// accepted, new records are dropped but duplicates still merge into
/// already-accepted ones.
pub fn normalize_listings(raw: &[Value]) -> Vec<NormalizedListing> {
    let mut drafts: Vec<Draft> = Vec::new();
    let mut index: HashMap<IdentityKey, usize> = HashMap::new();

    for (position, value) in raw.iter().enumerate() {
        let Some(record) = value.as_object() else {
            tracing::debug!(position, "skipping non-object listing record");
            continue;
        };

        let draft = Draft::from_raw(record);
        let key = IdentityKey::of(&draft, position);

        if let Some(&slot) = index.get(&key) {
            drafts[slot].absorb(draft);
            continue;
        }

        if drafts.len() >= MAX_LISTINGS {
            tracing::debug!(position, "listing cap reached, dropping record");
            continue;
        }

        index.insert(key, drafts.len());
        drafts.push(draft);
    }

    drafts.truncate(MAX_LISTINGS);
    drafts.into_iter().map(Draft::finish).collect()
}

/// First alias whose value is present and not null.
fn first_present<'a>(raw: &'a RawListingRecord, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| raw.get(*key))
        .find(|value| !value.is_null())
}

fn text_field(raw: &RawListingRecord, keys: &[&str]) -> Option<String> {
    let text = match first_present(raw, keys)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    if text.is_empty() { None } else { Some(text) }
}

fn digits_only(c: char) -> bool {
    c.is_ascii_digit()
}

fn digits_and_point(c: char) -> bool {
    c.is_ascii_digit() || c == '.'
}

/// Coerce a direct number or a free-text string into a non-negative finite number.
/// Strings keep only the characters accepted by `keep` before parsing.
fn number(value: &Value, keep: fn(char) -> bool) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let cleaned: String = s.chars().filter(|c| keep(*c)).collect();
            cleaned.parse::<f64>().ok()?
        }
        _ => return None,
    };
    (parsed.is_finite() && parsed >= 0.0).then_some(parsed)
}

fn count(value: &Value) -> Option<u32> {
    let n = number(value, digits_only)?;
    (n <= f64::from(u32::MAX)).then(|| n.trunc() as u32)
}

/// Parse a price-like string into its digits, e.g. `"549 000 $"` to `549000`.
pub fn parse_price_text(text: &str) -> Option<f64> {
    number(&Value::String(text.to_string()), digits_only)
}
