// ABOUTME: Tool exposing the listing normalizer/deduplicator to the model.

use async_trait::async_trait;
use serde_json::{Value, json};

use scout_core::{MAX_LISTINGS, normalize_listings};

use super::{Tool, ToolError};

/// `normalize_listings(listings)`
pub struct NormalizeListingsTool;

#[async_trait]
impl Tool for NormalizeListingsTool {
    fn name(&self) -> &str {
        "normalize_listings"
    }

    fn definition(&self) -> Value {
        json!({
            "name": "normalize_listings",
            "description": format!(
                "Clean up and deduplicate listing records by MLS number or URL. Returns at most {} listings in a canonical shape.",
                MAX_LISTINGS
            ),
            "parameters": {
                "type": "object",
                "properties": {
                    "listings": {
                        "type": "array",
                        "items": { "type": "object" },
                        "description": "Listing records with fields like mls, url, address, price, beds, baths, type."
                    }
                },
                "required": ["listings"]
            }
        })
    }

    async fn call(&self, args: Value) -> Result<Value, ToolError> {
        let raw = args
            .get("listings")
            .and_then(|l| l.as_array())
            .map(Vec::as_slice)
            .unwrap_or_default();

        Ok(json!({ "listings": normalize_listings(raw) }))
    }
}
