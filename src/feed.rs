use std::sync::OnceLock;

use anyhow::{anyhow, Result};
use atom_syndication::Feed as AtomFeed;
use rss::Channel;
use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::format_description::{self, OwnedFormatItem};
use time::{OffsetDateTime, PrimitiveDateTime};
use tracing::trace;

/// A single syndication-feed item, normalized across RSS and Atom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedItem {
    pub title: String,
    pub description: Option<String>,
    pub link: String,
    pub published: Option<OffsetDateTime>,
}

impl FeedItem {
    /// Title and description concatenated, the way entity matching and
    /// content classification consume the item.
    pub fn full_text(&self) -> String {
        match &self.description {
            Some(description) => format!("{}. {}", self.title, description),
            None => format!("{}.", self.title),
        }
    }
}

/// True iff the item has a parseable publication date no older than
/// `max_age`. The boundary is inclusive; an undated item is never fresh.
pub fn is_fresh(item: &FeedItem, max_age: time::Duration, now: OffsetDateTime) -> bool {
    item.published
        .is_some_and(|published| now - published <= max_age)
}

/// Parses a feed document, trying RSS first and falling back to Atom.
pub fn parse_feed(data: &[u8]) -> Result<Vec<FeedItem>> {
    if let Ok(channel) = Channel::read_from(data) {
        return Ok(items_from_rss(&channel));
    }

    match AtomFeed::read_from(data) {
        Ok(feed) => Ok(items_from_atom(&feed)),
        Err(e) => Err(anyhow!("document is neither an RSS nor an Atom feed: {e}")),
    }
}

fn items_from_rss(channel: &Channel) -> Vec<FeedItem> {
    let mut items = channel
        .items()
        .iter()
        .filter(|item| item.link().is_some())
        .map(|item| {
            let date_candidates = item
                .pub_date()
                .into_iter()
                .chain(
                    item.dublin_core_ext()
                        .map(|dc| dc.dates())
                        .unwrap_or_default()
                        .iter()
                        .map(String::as_str),
                )
                .collect::<Vec<_>>();

            FeedItem {
                title: item.title().unwrap_or_default().to_string(),
                description: item.description().map(str::to_string),
                link: item.link().unwrap().to_string(),
                published: parse_date_candidates(&date_candidates),
            }
        })
        .collect::<Vec<_>>();

    items.dedup_by(|a, b| a.link == b.link && a.title == b.title);

    items
}

fn items_from_atom(feed: &AtomFeed) -> Vec<FeedItem> {
    let mut items = feed
        .entries()
        .iter()
        .filter(|entry| !entry.links().is_empty())
        .map(|entry| {
            let published = entry
                .published()
                .or(Some(entry.updated()))
                .and_then(|date| OffsetDateTime::from_unix_timestamp(date.timestamp()).ok());

            FeedItem {
                title: entry.title().to_string(),
                description: entry.summary().map(|s| s.to_string()),
                link: entry.links()[0].href().to_string(),
                published,
            }
        })
        .collect::<Vec<_>>();

    items.dedup_by(|a, b| a.link == b.link && a.title == b.title);

    items
}

/// Tries each raw date string in priority order; the first one that parses
/// in any supported format wins.
fn parse_date_candidates(candidates: &[&str]) -> Option<OffsetDateTime> {
    candidates.iter().find_map(|raw| parse_date(raw))
}

/// Parses a feed date string. RFC 2822 (with the obsolete `GMT`/`UT`/`UTC`
/// zone names normalized to `+0000` first), then RFC 3339, then the naive
/// formats some feeds emit (assumed UTC).
pub fn parse_date(raw: &str) -> Option<OffsetDateTime> {
    let raw = raw.trim();

    if let Ok(date) = OffsetDateTime::parse(&normalize_obsolete_zone(raw), &Rfc2822) {
        return Some(date);
    }

    if let Ok(date) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(date);
    }

    for format in naive_formats() {
        if let Ok(date) = PrimitiveDateTime::parse(raw, format) {
            return Some(date.assume_utc());
        }
    }

    trace!("Could not parse a feed date `{raw}`");

    None
}

// `time`'s RFC 2822 parser takes numeric zones only.
fn normalize_obsolete_zone(raw: &str) -> String {
    for zone in [" GMT", " UTC", " UT"] {
        if let Some(stripped) = raw.strip_suffix(zone) {
            return format!("{stripped} +0000");
        }
    }

    raw.to_string()
}

fn naive_formats() -> &'static [OwnedFormatItem] {
    static FORMATS: OnceLock<Vec<OwnedFormatItem>> = OnceLock::new();

    FORMATS.get_or_init(|| {
        [
            "[year]-[month]-[day] [hour]:[minute]:[second]",
            "[day] [month repr:short case_sensitive:false] [year] [hour]:[minute]:[second]",
        ]
        .iter()
        .map(|f| format_description::parse_owned::<2>(f).unwrap())
        .collect()
    })
}

#[cfg(test)]
mod tests {
    use time::{Duration, OffsetDateTime};

    use super::{is_fresh, parse_date, parse_feed, FeedItem};

    fn item(published: Option<OffsetDateTime>) -> FeedItem {
        FeedItem {
            title: "Nintendo announces new Zelda update".into(),
            description: Some("A big one.".into()),
            link: "https://example.com/zelda".into(),
            published,
        }
    }

    #[test]
    fn rfc2822_with_gmt_zone_parses() {
        let date = parse_date("Mon, 21 Oct 2024 07:28:00 GMT").unwrap();

        assert_eq!(date.unix_timestamp(), 1_729_495_680);
    }

    #[test]
    fn rfc2822_with_numeric_zone_parses() {
        assert!(parse_date("Mon, 21 Oct 2024 07:28:00 +0200").is_some());
    }

    #[test]
    fn rfc3339_parses() {
        let date = parse_date("2024-10-21T07:28:00Z").unwrap();

        assert_eq!(date.unix_timestamp(), 1_729_495_680);
    }

    #[test]
    fn naive_formats_parse_as_utc() {
        let dashed = parse_date("2024-10-21 07:28:00").unwrap();
        let spelled = parse_date("21 Oct 2024 07:28:00").unwrap();

        assert_eq!(dashed, spelled);
        assert_eq!(dashed.unix_timestamp(), 1_729_495_680);
    }

    #[test]
    fn garbage_dates_yield_none() {
        assert!(parse_date("yesterday-ish").is_none());
        assert!(parse_date("").is_none());
    }

    #[test]
    fn freshness_boundary_is_inclusive() {
        let now = OffsetDateTime::from_unix_timestamp(1_729_495_680).unwrap();
        let max_age = Duration::hours(12);

        let at_boundary = item(Some(now - max_age));
        let one_second_past = item(Some(now - max_age - Duration::seconds(1)));
        let undated = item(None);

        assert!(is_fresh(&at_boundary, max_age, now));
        assert!(!is_fresh(&one_second_past, max_age, now));
        assert!(!is_fresh(&undated, max_age, now));
    }

    #[test]
    fn parses_rss_items() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Test Feed</title>
    <link>http://example.com/</link>
    <description>Test description</description>
    <item>
      <title>Item 1</title>
      <link>http://example.com/1</link>
      <pubDate>Mon, 21 Oct 2024 07:28:00 GMT</pubDate>
      <description>First</description>
    </item>
    <item>
      <title>No link, dropped</title>
      <description>Second</description>
    </item>
  </channel>
</rss>"#;

        let items = parse_feed(xml.as_bytes()).unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Item 1");
        assert_eq!(items[0].link, "http://example.com/1");
        assert!(items[0].published.is_some());
    }

    #[test]
    fn falls_back_to_atom() {
        let xml = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Example Feed</title>
  <link href="http://example.org/"/>
  <updated>2024-10-21T07:28:00Z</updated>
  <id>urn:uuid:60a76c80-d399-11d9-b93C-0003939e0af6</id>
  <entry>
    <title>Atom-Powered Robots Run Amok</title>
    <link href="http://example.org/2003/12/13/atom03"/>
    <id>urn:uuid:1225c695-cfb8-4ebb-aaaa-80da344efa6a</id>
    <updated>2024-10-21T07:28:00Z</updated>
    <summary>Some text.</summary>
  </entry>
</feed>"#;

        let items = parse_feed(xml.as_bytes()).unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Atom-Powered Robots Run Amok");
        assert_eq!(
            items[0].published.map(|d| d.unix_timestamp()),
            Some(1_729_495_680)
        );
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(parse_feed(b"not a feed at all").is_err());
    }
}
