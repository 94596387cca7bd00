//! RSS 2.0 and Atom parsing into the crate's own entry shape.
//!
//! Both formats are deserialized with `quick-xml`'s serde support. RSS is
//! tried first (every source in the catalog ships RSS today); Atom is the
//! fallback so a source migrating formats keeps working. Entries without a
//! title are dropped: a title is required by both the duplicate guard and
//! the publisher.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// One parsed feed entry, independent of the source syndication format.
#[derive(Debug, Clone)]
pub struct FeedEntry {
    pub title: String,
    pub link: Option<String>,
    pub published: Option<DateTime<Utc>>,
    pub summary: Option<String>,
    /// Raw `itunes:duration` value, when the feed carries one.
    pub itunes_duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Rss {
    channel: RssChannel,
}

#[derive(Debug, Deserialize)]
struct RssChannel {
    #[serde(default, rename = "item")]
    items: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RssItem {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
    #[serde(rename = "itunes:duration")]
    itunes_duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(default, rename = "entry")]
    entries: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    title: Option<AtomText>,
    #[serde(default, rename = "link")]
    links: Vec<AtomLink>,
    published: Option<String>,
    updated: Option<String>,
    summary: Option<AtomText>,
}

/// Atom text constructs may carry a `type` attribute around their content.
#[derive(Debug, Deserialize)]
struct AtomText {
    #[serde(rename = "$text")]
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: Option<String>,
}

/// Parse a feed document into entries, trying RSS 2.0 then Atom.
///
/// Returns the RSS parse error when neither format matches; for a document
/// that is not XML at all the two errors are equivalent.
pub fn parse_feed(xml: &str) -> Result<Vec<FeedEntry>, quick_xml::DeError> {
    match quick_xml::de::from_str::<Rss>(xml) {
        Ok(rss) => Ok(rss
            .channel
            .items
            .into_iter()
            .filter_map(rss_item_to_entry)
            .collect()),
        Err(rss_err) => match quick_xml::de::from_str::<AtomFeed>(xml) {
            Ok(feed) => Ok(feed
                .entries
                .into_iter()
                .filter_map(atom_entry_to_entry)
                .collect()),
            Err(_) => Err(rss_err),
        },
    }
}

fn rss_item_to_entry(item: RssItem) -> Option<FeedEntry> {
    let title = non_blank(item.title)?;
    Some(FeedEntry {
        title,
        link: non_blank(item.link),
        published: item.pub_date.as_deref().and_then(parse_feed_date),
        summary: non_blank(item.description),
        itunes_duration: non_blank(item.itunes_duration),
    })
}

fn atom_entry_to_entry(entry: AtomEntry) -> Option<FeedEntry> {
    let title = non_blank(entry.title.and_then(|t| t.value))?;
    let link = entry.links.into_iter().find_map(|l| non_blank(l.href));
    let published = entry
        .published
        .or(entry.updated)
        .as_deref()
        .and_then(parse_feed_date);
    Some(FeedEntry {
        title,
        link,
        published,
        summary: non_blank(entry.summary.and_then(|s| s.value)),
        itunes_duration: None,
    })
}

/// Feed date formats are inconsistent in the wild; accept RFC 2822 (RSS)
/// and RFC 3339 (Atom) and give up quietly otherwise. A missing date is
/// fine downstream because the recency filter is permissive.
fn parse_feed_date(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn non_blank(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
