use feed_rs::model::Link;
use feed_rs::parser;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("Feed could not be parsed as RSS or Atom: {0}")]
pub struct ParseError(#[from] parser::ParseFeedError);

/// One item of the remote feed. Both fields are optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedEntry {
    pub title: Option<String>,
    pub link: Option<String>,
}

impl FeedEntry {
    pub fn new(title: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            link: Some(link.into()),
        }
    }
}

/// Decodes a feed document into entries, preserving document order.
///
/// The link is the first non-blank `href` whose `rel` is absent or
/// `alternate` (RSS `<link>`, Atom `<link rel="alternate">`). Without one, an
/// http(s) entry id is used instead, which covers RSS items that only carry a
/// permalink `<guid>`. Entries without a link are kept; callers decide what to
/// skip.
pub fn parse_feed(bytes: &[u8]) -> Result<Vec<FeedEntry>, ParseError> {
    let feed = parser::parse(bytes)?;

    let entries = feed
        .entries
        .into_iter()
        .map(|entry| FeedEntry {
            title: entry.title.map(|t| t.content),
            link: entry_link(entry.links, &entry.id),
        })
        .collect();

    Ok(entries)
}

fn entry_link(links: Vec<Link>, id: &str) -> Option<String> {
    links
        .into_iter()
        .filter(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
        .map(|l| l.href)
        .find(|href| !href.trim().is_empty())
        .or_else(|| permalink_id(id))
}

fn permalink_id(id: &str) -> Option<String> {
    let id = id.trim();
    let url = url::Url::parse(id).ok()?;
    matches!(url.scheme(), "http" | "https").then(|| id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_rss_preserves_order() {
        let rss = r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>Markets</title>
    <item><title>Newest</title><link>https://x/3</link></item>
    <item><title>Middle</title><link>https://x/2</link></item>
    <item><title>Oldest</title><link>https://x/1</link></item>
</channel></rss>"#;

        let entries = parse_feed(rss.as_bytes()).unwrap();
        assert_eq!(
            entries,
            vec![
                FeedEntry::new("Newest", "https://x/3"),
                FeedEntry::new("Middle", "https://x/2"),
                FeedEntry::new("Oldest", "https://x/1"),
            ]
        );
    }

    #[test]
    fn test_parse_missing_fields_are_none() {
        let rss = r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>Markets</title>
    <item><guid>abc</guid></item>
    <item><title>Only title</title></item>
</channel></rss>"#;

        let entries = parse_feed(rss.as_bytes()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].title, None);
        assert_eq!(entries[1].title.as_deref(), Some("Only title"));
        assert_eq!(entries[1].link, None);
    }

    #[test]
    fn test_parse_atom() {
        let atom = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Markets</title>
  <id>urn:feed</id>
  <updated>2024-01-01T00:00:00Z</updated>
  <entry>
    <title>Atom item</title>
    <id>urn:item:1</id>
    <updated>2024-01-01T00:00:00Z</updated>
    <link href="https://x/atom"/>
  </entry>
</feed>"#;

        let entries = parse_feed(atom.as_bytes()).unwrap();
        assert_eq!(entries, vec![FeedEntry::new("Atom item", "https://x/atom")]);
    }

    #[test]
    fn test_parse_guid_only_item_uses_guid_as_link() {
        let rss = r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>Markets</title>
    <item><title>Guid only</title><guid>https://x/guid-only</guid></item>
    <item><title>Opaque guid</title><guid isPermaLink="false">wsj-123</guid></item>
    <item><title>Both</title><link>https://x/link</link><guid>https://x/guid</guid></item>
</channel></rss>"#;

        let entries = parse_feed(rss.as_bytes()).unwrap();
        assert_eq!(
            entries,
            vec![
                FeedEntry::new("Guid only", "https://x/guid-only"),
                FeedEntry {
                    title: Some("Opaque guid".to_string()),
                    link: None,
                },
                FeedEntry::new("Both", "https://x/link"),
            ]
        );
    }

    #[test]
    fn test_parse_atom_prefers_alternate_link() {
        let atom = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Markets</title>
  <id>urn:feed</id>
  <updated>2024-01-01T00:00:00Z</updated>
  <entry>
    <title>Article</title>
    <id>urn:item:1</id>
    <updated>2024-01-01T00:00:00Z</updated>
    <link rel="self" href="https://x/api/1"/>
    <link rel="enclosure" href="https://x/audio/1.mp3"/>
    <link rel="alternate" href="https://x/article/1"/>
  </entry>
  <entry>
    <title>Self only</title>
    <id>urn:item:2</id>
    <updated>2024-01-01T00:00:00Z</updated>
    <link rel="self" href="https://x/api/2"/>
  </entry>
</feed>"#;

        let entries = parse_feed(atom.as_bytes()).unwrap();
        assert_eq!(entries[0].link.as_deref(), Some("https://x/article/1"));
        assert_eq!(entries[1].link, None);
    }

    #[test]
    fn test_parse_empty_channel() {
        let rss = r#"<?xml version="1.0"?><rss version="2.0"><channel></channel></rss>"#;
        assert!(parse_feed(rss.as_bytes()).unwrap().is_empty());
    }

    #[test]
    fn test_parse_garbage_is_error() {
        let err = parse_feed(b"<not valid xml").unwrap_err();
        assert!(err.to_string().contains("RSS or Atom"));
    }
}
