//! Article index cards.
//!
//! The regular article listing renders each story as
//!
//! ```html
//! <article class="article-preview">
//!   <a href="/articles/some-slug"><img src="/media/cover.png"></a>
//!   <h3>Headline</h3>
//! </article>
//! ```

use super::CardRules;
use once_cell::sync::Lazy;

pub static RULES: Lazy<CardRules> =
    Lazy::new(|| CardRules::parse("article.article-preview", "h3", "a[href]", "img[src]"));
