//! Source page scraping: fetching markup and turning it into articles.
//!
//! Each adapter kind follows the same card pattern:
//!
//! 1. **Fetching**: download a page through a [`PageFetcher`]
//! 2. **Extracting**: select repeated article cards and lift title, link and
//!    image out of each one
//!
//! # Supported Adapter Kinds
//!
//! | Kind | Module | Card | Title |
//! |------|--------|------|-------|
//! | `ArticleList` | [`article_list`] | `article.article-preview` | `h3` |
//! | `FeaturedList` | [`featured_list`] | `div.featured-card` | `h2` |
//!
//! Cards missing their title, link or image are dropped without failing the
//! batch; the pages are external and partial cards are expected noise.

pub mod article_list;
pub mod detail;
pub mod featured_list;

use crate::BoxError;
use crate::config::AdapterKind;
use crate::models::Article;
use crate::utils::collapse_whitespace;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

/// Retrieves raw markup for a URL.
///
/// Non-success statuses are errors. Implemented over HTTP by [`HttpFetcher`]
/// and by in-memory pages in tests.
pub trait PageFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String, BoxError>> + Send;
}

/// [`PageFetcher`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, BoxError> {
        let client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { client })
    }
}

impl PageFetcher for HttpFetcher {
    #[instrument(level = "debug", skip(self))]
    async fn fetch(&self, url: &str) -> Result<String, BoxError> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        let body = response.text().await?;
        debug!(bytes = body.len(), "Fetched page");
        Ok(body)
    }
}

/// Selector rules describing one kind of article card.
pub struct CardRules {
    pub card: Selector,
    pub title: Selector,
    pub link: Selector,
    pub image: Selector,
}

impl CardRules {
    /// Build rules from selector literals. The literals are fixed at compile
    /// time, so a parse failure is a programming error.
    pub fn parse(card: &str, title: &str, link: &str, image: &str) -> Self {
        let sel = |s: &str| Selector::parse(s).expect("static selector");
        Self {
            card: sel(card),
            title: sel(title),
            link: sel(link),
            image: sel(image),
        }
    }
}

/// Extract article cards from `markup` using the rules of `kind`.
///
/// `source_url` supplies the origin that root-relative links are resolved
/// against. Page order is preserved. Pure: no I/O, no logging side effects
/// beyond debug traces.
pub fn extract(markup: &str, kind: AdapterKind, source_url: &str) -> Vec<Article> {
    let rules = match kind {
        AdapterKind::ArticleList => &*article_list::RULES,
        AdapterKind::FeaturedList => &*featured_list::RULES,
    };
    extract_cards(markup, rules, source_url)
}

fn extract_cards(markup: &str, rules: &CardRules, source_url: &str) -> Vec<Article> {
    let base = Url::parse(source_url).ok();
    let document = Html::parse_document(markup);

    let mut articles = Vec::new();
    let mut dropped = 0usize;
    for card in document.select(&rules.card) {
        match card_to_article(card, rules, base.as_ref()) {
            Some(article) => articles.push(article),
            None => dropped += 1,
        }
    }

    debug!(
        count = articles.len(),
        dropped,
        source = %source_url,
        "Extracted article cards"
    );
    articles
}

fn card_to_article(card: ElementRef<'_>, rules: &CardRules, base: Option<&Url>) -> Option<Article> {
    let title = card
        .select(&rules.title)
        .next()
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .filter(|t| !t.is_empty())?;
    let link = card
        .select(&rules.link)
        .next()
        .and_then(|el| el.value().attr("href"))
        .map(str::trim)
        .filter(|href| !href.is_empty())?;
    let image = card
        .select(&rules.image)
        .next()
        .and_then(|el| el.value().attr("src"))
        .map(str::trim)
        .filter(|src| !src.is_empty())?;

    Some(Article::new(
        title,
        resolve_link(link, base),
        resolve_link(image, base),
    ))
}

/// Rewrite a root-relative path (`/a/1`) to an absolute URL on the source's
/// origin, and give a protocol-relative one (`//cdn/x`) the source's scheme.
/// Everything else passes through unchanged.
pub fn resolve_link(href: &str, base: Option<&Url>) -> String {
    match base {
        Some(base) if href.starts_with("//") => format!("{}:{}", base.scheme(), href),
        Some(base) if href.starts_with('/') => {
            format!("{}{}", base.origin().ascii_serialization(), href)
        }
        _ => href.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARTICLE_PAGE: &str = r#"
        <html><body>
          <article class="article-preview">
            <a href="/a/1"><img src="/i/1.png"></a>
            <h3> Set  Release </h3>
          </article>
          <article class="article-preview">
            <a href="https://other.example/a/2"><img src="https://cdn.example/2.png"></a>
            <h3>Event Schedule</h3>
          </article>
          <article class="article-preview">
            <a href="/a/3"></a>
            <h3>No Image Here</h3>
          </article>
          <article class="unrelated">
            <a href="/a/4"><img src="/i/4.png"></a>
            <h3>Not a preview card</h3>
          </article>
        </body></html>
    "#;

    #[test]
    fn test_extract_article_list() {
        let articles = extract(ARTICLE_PAGE, AdapterKind::ArticleList, "https://site/articles/");
        assert_eq!(articles.len(), 2);
        assert_eq!(articles[0].title, "Set Release");
        assert_eq!(articles[0].link, "https://site/a/1");
        assert_eq!(articles[0].image_url, "https://site/i/1.png");
        assert_eq!(articles[1].link, "https://other.example/a/2");
        assert_eq!(articles[1].image_url, "https://cdn.example/2.png");
    }

    #[test]
    fn test_card_missing_image_is_dropped() {
        let articles = extract(ARTICLE_PAGE, AdapterKind::ArticleList, "https://site/articles/");
        // three preview cards, one without an image
        assert!(articles.iter().all(|a| a.title != "No Image Here"));
    }

    #[test]
    fn test_card_missing_title_or_link_is_dropped() {
        let html = r#"
            <article class="article-preview"><img src="/i/1.png"><h3>No link</h3></article>
            <article class="article-preview"><a href="/a/2"><img src="/i/2.png"></a><h3>  </h3></article>
            <article class="article-preview"><a href="/a/3"><img src="/i/3.png"></a><h3>Kept</h3></article>
        "#;
        let articles = extract(html, AdapterKind::ArticleList, "https://site/");
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].link, "https://site/a/3");
    }

    #[test]
    fn test_extract_featured_list() {
        let html = r#"
            <div class="featured-card">
              <a href="/events/cup"><img src="/img/cup.jpg"></a>
              <h2>Community Cup</h2>
            </div>
            <article class="article-preview">
              <a href="/a/1"><img src="/i/1.png"></a><h3>Regular</h3>
            </article>
        "#;
        let articles = extract(html, AdapterKind::FeaturedList, "https://site/events/");
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].title, "Community Cup");
        assert_eq!(articles[0].link, "https://site/events/cup");
        assert_eq!(articles[0].image_url, "https://site/img/cup.jpg");
    }

    #[test]
    fn test_unparseable_markup_yields_empty() {
        assert!(extract("", AdapterKind::ArticleList, "https://site/").is_empty());
        assert!(extract("<<<>>>not html", AdapterKind::FeaturedList, "https://site/").is_empty());
    }

    #[test]
    fn test_resolve_link() {
        let base = Url::parse("https://site:8443/articles/page").unwrap();
        assert_eq!(resolve_link("/a/1", Some(&base)), "https://site:8443/a/1");
        assert_eq!(resolve_link("https://x/a", Some(&base)), "https://x/a");
        assert_eq!(resolve_link("relative/a", Some(&base)), "relative/a");
        assert_eq!(resolve_link("//cdn/a.png", Some(&base)), "https://cdn/a.png");
        assert_eq!(resolve_link("//cdn/a.png", None), "//cdn/a.png");
        assert_eq!(resolve_link("/a/1", None), "/a/1");
    }
}
