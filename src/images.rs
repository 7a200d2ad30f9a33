use std::cmp::Reverse;
use std::sync::OnceLock;

use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::fetch::FETCH_TIMEOUT;

/// Candidate selectors in priority order: metadata image tags first, then
/// content-area images, then catch-alls. Extraction order breaks score ties,
/// so the order here matters.
const IMAGE_SELECTORS: &[&str] = &[
    r#"meta[property="og:image"]"#,
    r#"meta[name="twitter:image"]"#,
    r#"meta[property="twitter:image:src"]"#,
    "article img",
    ".wp-post-image",
    ".article-image img",
    ".post-image img",
    ".entry-content img",
    ".content img",
    "figure img",
    ".hero-image img",
    ".main-image img",
    ".featured-image img",
    r#"[class*="image"] img"#,
    r#"img[src*="large"]"#,
    r#"img[src*="medium"]"#,
    "img",
];

const SOURCE_ATTRS: &[&str] = &["src", "data-src", "data-lazy-src"];

const RASTER_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".webp"];

const EXCLUDED_TERMS: &[&str] = &["icon", "logo", "thumbnail", "small", "avatar", "sprite"];

const QUALITY_KEYWORDS: &[&str] = &[
    "large", "xlarge", "original", "full", "main", "hero", "featured",
];

fn selectors() -> &'static [Selector] {
    static SELECTORS: OnceLock<Vec<Selector>> = OnceLock::new();

    SELECTORS.get_or_init(|| {
        IMAGE_SELECTORS
            .iter()
            .map(|s| Selector::parse(s).unwrap())
            .collect()
    })
}

#[derive(Debug, Clone)]
struct Candidate {
    url: String,
    score: i32,
}

/// Fetches an article page and picks its best image. Every failure along the
/// way (unreachable page, bad status, unparseable HTML, no valid candidates)
/// yields `None`: a missing image is a normal outcome, not an error.
pub async fn find_article_image(client: &reqwest::Client, link: &str) -> Option<Url> {
    let base = match Url::parse(link) {
        Ok(base) => base,

        Err(e) => {
            debug!("Skipping image extraction, `{link}` is not a valid URL: {e}");
            return None;
        }
    };

    let response = match client
        .get(base.clone())
        .timeout(FETCH_TIMEOUT)
        .send()
        .await
        .and_then(|r| r.error_for_status())
    {
        Ok(response) => response,

        Err(e) => {
            debug!("Could not fetch the article page `{link}`: {e}");
            return None;
        }
    };

    let html = match response.text().await {
        Ok(html) => html,

        Err(e) => {
            debug!("Could not read the article page `{link}`: {e}");
            return None;
        }
    };

    let best = best_image(&html, &base);

    if best.is_none() {
        debug!("No usable image on `{link}`");
    }

    best
}

/// Extracts, scores and ranks image candidates from an HTML document,
/// returning the best one as an absolute URL.
pub fn best_image(html: &str, base: &Url) -> Option<Url> {
    let document = Html::parse_document(html);
    let mut candidates: Vec<Candidate> = vec![];

    for selector in selectors() {
        for element in document.select(selector) {
            let url = if element.value().name() == "meta" {
                element.value().attr("content")
            } else {
                SOURCE_ATTRS
                    .iter()
                    .find_map(|attr| element.value().attr(attr).filter(|v| !v.is_empty()))
            };

            let Some(url) = url else {
                continue;
            };

            if !is_valid_image_url(url) {
                continue;
            }

            candidates.push(Candidate {
                url: url.to_string(),
                score: rate_image(url, element),
            });
        }
    }

    // stable: ties keep extraction order
    candidates.sort_by_key(|candidate| Reverse(candidate.score));

    candidates
        .first()
        .and_then(|candidate| to_absolute(&candidate.url, base))
}

/// A candidate URL is valid if it can be made absolute, looks like a raster
/// image, and does not smell like site chrome.
pub fn is_valid_image_url(url: &str) -> bool {
    let lower = url.to_lowercase();

    let absolute_capable =
        lower.starts_with("http://") || lower.starts_with("https://") || url.starts_with('/');

    absolute_capable
        && RASTER_EXTENSIONS.iter().any(|ext| lower.contains(ext))
        && !EXCLUDED_TERMS.iter().any(|term| lower.contains(term))
}

fn rate_image(url: &str, element: ElementRef<'_>) -> i32 {
    let mut score = 0;

    // strong prior: meta-tag images are the canonical article image
    if element.value().name() == "meta" {
        score += 100;
    }

    let dimension = |attr| element.value().attr(attr).and_then(parse_digits);

    if let (Some(width), Some(height)) = (dimension("width"), dimension("height")) {
        if width > 400 && height > 300 {
            score += 50;
        }
        if width > 800 && height > 600 {
            score += 30;
        }
    }

    let lower = url.to_lowercase();
    for keyword in QUALITY_KEYWORDS {
        if lower.contains(keyword) {
            score += 20;
        }
    }

    score
}

// attribute values like `"640px"` still count
fn parse_digits(value: &str) -> Option<u32> {
    let digits = value
        .chars()
        .filter(char::is_ascii_digit)
        .collect::<String>();

    digits.parse().ok()
}

fn to_absolute(url: &str, base: &Url) -> Option<Url> {
    if let Some(rest) = url.strip_prefix("//") {
        Url::parse(&format!("https://{rest}")).ok()
    } else if url.starts_with('/') {
        base.join(url).ok()
    } else {
        Url::parse(url).ok()
    }
}

#[cfg(test)]
mod tests {
    use reqwest::Url;

    use super::{best_image, is_valid_image_url};

    fn base() -> Url {
        Url::parse("https://news.example.com/articles/zelda").unwrap()
    }

    #[test]
    fn meta_image_outranks_content_images() {
        let html = r#"<html><head>
            <meta property="og:image" content="https://cdn.example.com/cover.jpg">
            </head><body>
            <article><img src="https://cdn.example.com/inline.jpg" width="1000" height="700"></article>
            </body></html>"#;

        let best = best_image(html, &base()).unwrap();

        assert_eq!(best.as_str(), "https://cdn.example.com/cover.jpg");
    }

    #[test]
    fn bigger_declared_size_outranks_smaller() {
        let html = r#"<html><body><article>
            <img src="https://cdn.example.com/a.jpg" width="500" height="400">
            <img src="https://cdn.example.com/b.jpg" width="900" height="700">
            </article></body></html>"#;

        let best = best_image(html, &base()).unwrap();

        assert_eq!(best.as_str(), "https://cdn.example.com/b.jpg");
    }

    #[test]
    fn ties_keep_extraction_order() {
        let html = r#"<html><head>
            <meta property="og:image" content="https://cdn.example.com/first.jpg">
            <meta property="og:image" content="https://cdn.example.com/second.jpg">
            </head></html>"#;

        let best = best_image(html, &base()).unwrap();

        assert_eq!(best.as_str(), "https://cdn.example.com/first.jpg");
    }

    #[test]
    fn lazy_load_attributes_are_fallbacks() {
        let html = r#"<html><body><article>
            <img src="" data-src="https://cdn.example.com/lazy.jpg">
            </article></body></html>"#;

        let best = best_image(html, &base()).unwrap();

        assert_eq!(best.as_str(), "https://cdn.example.com/lazy.jpg");
    }

    #[test]
    fn relative_urls_resolve_against_the_page() {
        let html = r#"<html><body><article>
            <img src="/media/shot.png">
            </article></body></html>"#;

        let best = best_image(html, &base()).unwrap();

        assert_eq!(best.as_str(), "https://news.example.com/media/shot.png");
    }

    #[test]
    fn protocol_relative_urls_become_https() {
        let html = r#"<html><head>
            <meta property="og:image" content="//cdn.example.com/cover.jpg">
            </head></html>"#;

        let best = best_image(html, &base()).unwrap();

        assert_eq!(best.as_str(), "https://cdn.example.com/cover.jpg");
    }

    #[test]
    fn chrome_and_non_raster_urls_are_rejected() {
        assert!(!is_valid_image_url("https://cdn.example.com/logo.png"));
        assert!(!is_valid_image_url("https://cdn.example.com/icon.jpg"));
        assert!(!is_valid_image_url("https://cdn.example.com/photo.svg"));
        assert!(!is_valid_image_url("data:image/png;base64,xyz.png"));
        assert!(is_valid_image_url("https://cdn.example.com/Cover-Large.JPG"));
    }

    #[test]
    fn page_without_candidates_yields_none() {
        let html = "<html><body><p>words only</p></body></html>";

        assert!(best_image(html, &base()).is_none());
    }
}
