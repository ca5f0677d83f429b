// ABOUTME: Converts fetched HTML into a bounded plain-text excerpt for the model.
// ABOUTME: Drops script/style blocks and tags, collapses whitespace, and truncates by character count.

use std::sync::LazyLock;

use regex::Regex;

/// Maximum number of characters kept from a page.
pub const MAX_TEXT_CHARS: usize = 9000;

static SCRIPT_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").expect("script block pattern")
});
static STYLE_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<style\b[^>]*>.*?</style\s*>").expect("style block pattern")
});
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("tag pattern"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern"));

/// Strip markup from `html` and return at most `MAX_TEXT_CHARS` characters of text.
pub fn html_to_text(html: &str) -> String {
    let text = SCRIPT_BLOCK.replace_all(html, " ");
    let text = STYLE_BLOCK.replace_all(&text, " ");
    let text = TAG.replace_all(&text, " ");
    let text = decode_entities(&text);
    let text = WHITESPACE.replace_all(&text, " ");

    text.trim().chars().take(MAX_TEXT_CHARS).collect()
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&#160;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_yields_empty_output() {
        assert_eq!(html_to_text(""), "");
    }

    #[test]
    fn strips_scripts_styles_and_tags() {
        let html = r#"<html><head><style>body { color: red; }</style>
            <SCRIPT type="text/javascript">var price = 1;</SCRIPT></head>
            <body><h1>Condo   à vendre</h1><p>549&nbsp;000 $</p></body></html>"#;
        assert_eq!(html_to_text(html), "Condo à vendre 549 000 $");
    }

    #[test]
    fn collapses_whitespace_and_trims() {
        assert_eq!(html_to_text("  <p>a\n\n\tb</p>  "), "a b");
    }

    #[test]
    fn truncates_to_max_chars() {
        let html = format!("<div>{}</div>", "é".repeat(MAX_TEXT_CHARS + 500));
        let text = html_to_text(&html);
        assert_eq!(text.chars().count(), MAX_TEXT_CHARS);
    }
}
