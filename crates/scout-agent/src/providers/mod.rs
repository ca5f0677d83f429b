// ABOUTME: Provider module aggregating chat model adapters and the shared system prompt.
// ABOUTME: Every adapter sends the same instructions so the agent behaves consistently.

pub mod openai;

use scout_core::{ListingCriteria, MAX_LISTINGS, MLS_NOT_FOUND};

/// Build the system prompt for a listing search with the given criteria.
pub fn system_prompt(criteria: &ListingCriteria) -> String {
    format!(
        "You are a real-estate research assistant for the Greater Montréal area. \
         Find active residential listings that match the search criteria below.\n\n\
         Search criteria:\n{criteria}\n\n\
         Tools:\n\
         - search_listings: find candidate listing pages on known real-estate sites.\n\
         - fetch_page: read the text of a page.\n\
         - extract_listing_info: pull MLS number, price, address, beds, baths and type from a page.\n\
         - normalize_listings: merge and clean the listings you collected.\n\n\
         Rules:\n\
         - Never invent MLS numbers, prices or addresses. If the MLS number is unknown use \"{sentinel}\".\n\
         - Return at most {max} listings.\n\
         - When you are done, reply with ONLY a JSON object of this shape:\n\
         {{\"listings\": [{{\"mls\": string, \"url\": string, \"address\": string, \"price\": number, \
         \"beds\": number, \"baths\": number, \"type\": string, \"note_en\": string, \"note_fr\": string}}], \
         \"sources\": [{{\"title\": string, \"url\": string, \"details\": string}}], \
         \"notes_en\": string, \"notes_fr\": string}}\n\
         - notes_en is written in English and notes_fr in French.",
        criteria = criteria.render(),
        sentinel = MLS_NOT_FOUND,
        max = MAX_LISTINGS,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_prompt_embeds_criteria_and_sentinel() {
        let criteria = ListingCriteria {
            location: "Montréal, QC".to_string(),
            price_max: "750000".to_string(),
            ..Default::default()
        };
        let prompt = system_prompt(&criteria);

        assert!(prompt.contains("Location: Montréal, QC"));
        assert!(prompt.contains("Maximum price: 750000"));
        assert!(prompt.contains(MLS_NOT_FOUND));
        assert!(prompt.contains("\"listings\""));
        assert!(prompt.contains("at most 12 listings"));
    }
}
