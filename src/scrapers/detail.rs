//! Article page summaries.
//!
//! Only new articles get their page fetched, so the cost of a cycle grows
//! with the number of new articles rather than with the size of the listing.

use super::PageFetcher;
use crate::utils::{collapse_whitespace, truncate_chars, truncate_for_log};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::{debug, instrument, warn};

/// Longest summary placed in a notification, in characters.
pub const MAX_SUMMARY_CHARS: usize = 1000;

static PARAGRAPH: Lazy<Selector> = Lazy::new(|| Selector::parse("p").expect("static selector"));

/// Fetch an article page and return its first paragraph.
///
/// Transport errors and non-success statuses are logged and yield an empty
/// string; this never fails.
#[instrument(level = "info", skip(fetcher))]
pub async fn fetch_summary<F: PageFetcher>(fetcher: &F, link: &str) -> String {
    match fetcher.fetch(link).await {
        Ok(markup) => {
            let summary = first_paragraph(&markup);
            debug!(summary = %truncate_for_log(&summary, 120), "Extracted summary");
            summary
        }
        Err(e) => {
            warn!(error = %e, "Article fetch failed; posting without summary");
            String::new()
        }
    }
}

/// First `<p>` with visible text, whitespace-collapsed and capped at
/// [`MAX_SUMMARY_CHARS`]. Empty when the page has none.
pub fn first_paragraph(markup: &str) -> String {
    let document = Html::parse_document(markup);
    document
        .select(&PARAGRAPH)
        .map(|p| collapse_whitespace(&p.text().collect::<String>()))
        .find(|text| !text.is_empty())
        .map(|text| truncate_chars(&text, MAX_SUMMARY_CHARS))
        .unwrap_or_default()
}
