//! Featured and event cards.
//!
//! Event and featured pages use a card strip instead of the article index:
//!
//! ```html
//! <div class="featured-card">
//!   <a href="/events/community-cup"><img src="/media/cup.jpg"></a>
//!   <h2>Community Cup</h2>
//! </div>
//! ```

use super::CardRules;
use once_cell::sync::Lazy;

pub static RULES: Lazy<CardRules> =
    Lazy::new(|| CardRules::parse("div.featured-card", "h2", "a[href]", "img[src]"));
