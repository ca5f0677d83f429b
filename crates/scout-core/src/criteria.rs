// ABOUTME: Defines ListingCriteria, the user-facing search parameters for one workflow run.
// ABOUTME: Built fresh from request variables and rendered into the agent's system prompt.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Locality used when the request does not name one.
pub const DEFAULT_LOCATION: &str = "Montréal, QC";

/// Search parameters assembled from a request's `input_variables`.
///
/// Every field is free-form text; an empty string means "no filter".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingCriteria {
    pub location: String,
    pub price_min: String,
    pub price_max: String,
    pub beds: String,
    pub baths: String,
    pub property_type: String,
    pub keywords: String,
}

impl ListingCriteria {
    /// Build criteria from a request variable map. Accepts camelCase and
    /// snake_case keys, and numbers as well as strings for every value.
    /// A missing or blank location falls back to `fallback_location`.
    pub fn from_variables(vars: &Map<String, Value>, fallback_location: &str) -> Self {
        let location = variable(vars, &["location"]);
        let location = if location.is_empty() {
            fallback_location.to_string()
        } else {
            location
        };

        Self {
            location,
            price_min: variable(vars, &["priceMin", "price_min"]),
            price_max: variable(vars, &["priceMax", "price_max"]),
            beds: variable(vars, &["beds", "bedrooms"]),
            baths: variable(vars, &["baths", "bathrooms"]),
            property_type: variable(vars, &["propertyType", "property_type", "type"]),
            keywords: variable(vars, &["keywords"]),
        }
    }

    /// Render the criteria as the bullet block embedded in the system prompt.
    pub fn render(&self) -> String {
        format!(
            "- Location: {}\n\
             - Minimum price: {}\n\
             - Maximum price: {}\n\
             - Minimum bedrooms: {}\n\
             - Minimum bathrooms: {}\n\
             - Property type: {}\n\
             - Keywords: {}",
            self.location,
            or_any(&self.price_min),
            or_any(&self.price_max),
            or_any(&self.beds),
            or_any(&self.baths),
            or_any(&self.property_type),
            if self.keywords.is_empty() { "none" } else { self.keywords.as_str() },
        )
    }
}

fn or_any(value: &str) -> &str {
    if value.is_empty() { "any" } else { value }
}

/// First non-blank value among `keys`, coerced to trimmed text.
fn variable(vars: &Map<String, Value>, keys: &[&str]) -> String {
    keys.iter()
        .filter_map(|key| vars.get(*key))
        .filter_map(|value| match value {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .find(|s| !s.is_empty())
        .unwrap_or_default()
}
