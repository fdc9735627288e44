//! Data models for scraped articles and the notifications built from them.
//!
//! - [`Article`]: one card lifted from a source page, identified by its link
//! - [`Notification`]: the chat payload composed from a fully populated article

/// A single article card scraped from a source page.
///
/// Two articles are the same entity iff their `link` strings are equal. The
/// link is already absolute by the time an `Article` exists; the adapters
/// resolve relative paths against the source's origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    /// Headline text of the card.
    pub title: String,
    /// Canonical absolute URL of the article page.
    pub link: String,
    /// Absolute URL of the card's preview image.
    pub image_url: String,
    /// First paragraph of the article page, filled in only for new articles.
    pub summary: String,
}

impl Article {
    pub fn new(
        title: impl Into<String>,
        link: impl Into<String>,
        image_url: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
            image_url: image_url.into(),
            summary: String::new(),
        }
    }
}

/// The message relayed to the chat channel for one article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub url: String,
    pub image_url: String,
    /// Summary followed by the fixed "Read more at" line.
    pub description: String,
}

impl Notification {
    /// Compose the notification body for an article.
    ///
    /// An empty summary yields a body holding only the "Read more at" line.
    pub fn from_article(article: &Article) -> Self {
        let read_more = format!("Read more at {}", article.link);
        let description = if article.summary.is_empty() {
            read_more
        } else {
            format!("{}\n\n{}", article.summary, read_more)
        };

        Self {
            title: article.title.clone(),
            url: article.link.clone(),
            image_url: article.image_url.clone(),
            description,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_article_new_has_empty_summary() {
        let article = Article::new("Set Release", "https://site/a/1", "https://site/i/1.png");
        assert_eq!(article.title, "Set Release");
        assert_eq!(article.link, "https://site/a/1");
        assert!(article.summary.is_empty());
    }

    #[test]
    fn test_notification_with_summary() {
        let mut article = Article::new("Set Release", "https://site/a/1", "https://site/i/1.png");
        article.summary = "A new expansion arrives.".to_string();

        let note = Notification::from_article(&article);
        assert_eq!(note.title, "Set Release");
        assert_eq!(note.url, "https://site/a/1");
        assert_eq!(note.image_url, "https://site/i/1.png");
        assert_eq!(
            note.description,
            "A new expansion arrives.\n\nRead more at https://site/a/1"
        );
    }

    #[test]
    fn test_notification_without_summary() {
        let article = Article::new("Set Release", "https://site/a/1", "https://site/i/1.png");
        let note = Notification::from_article(&article);
        assert_eq!(note.description, "Read more at https://site/a/1");
    }
}
