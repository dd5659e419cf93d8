//! Feed parsing and entry validation
//!
//! Decodes RSS, Atom and JSON Feed payloads with `feed-rs`, cleans entry text,
//! and drops entries that fail validation. Only valid entries leave this
//! module.

use crate::model::{clean_text, truncate_content, FeedEntry, RawFeed};
use feed_rs::model::{Entry, Link, Person};
use thiserror::Error;
use tracing::debug;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Number of characters of a rejected payload quoted in the error
const PREVIEW_CHARS: usize = 200;

/// Errors from decoding a feed payload
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Response for {url} is not a feed: {preview}")]
    NotAFeed { url: String, preview: String },

    #[error("Failed to parse feed from {url}: {message}")]
    Malformed { url: String, message: String },
}

/// Turns fetched bytes into validated entries
pub trait FeedParser: Send + Sync {
    /// `origin_url` is the source's feed URL, used for diagnostics
    fn parse(&self, raw: &RawFeed, origin_url: &str) -> Result<Vec<FeedEntry>, ParseError>;
}

/// `FeedParser` for every syndication format `feed-rs` understands
#[derive(Debug, Clone, Copy, Default)]
pub struct SyndicationParser;

impl SyndicationParser {
    pub fn new() -> Self {
        Self
    }
}

impl FeedParser for SyndicationParser {
    fn parse(&self, raw: &RawFeed, origin_url: &str) -> Result<Vec<FeedEntry>, ParseError> {
        let payload = raw.bytes.strip_prefix(UTF8_BOM).unwrap_or(&raw.bytes[..]);
        ensure_feed_like(payload, origin_url)?;

        let feed = feed_rs::parser::parse(payload).map_err(|e| ParseError::Malformed {
            url: origin_url.to_string(),
            message: e.to_string(),
        })?;

        let total = feed.entries.len();
        let entries: Vec<FeedEntry> = feed
            .entries
            .into_iter()
            .map(to_feed_entry)
            .filter(|entry| {
                let valid = entry.is_valid();
                if !valid {
                    debug!(
                        "Skipping invalid entry from {} (title: {:?}, url: {:?})",
                        origin_url, entry.title, entry.url
                    );
                }
                valid
            })
            .collect();

        debug!(
            "Parsed {} valid entries out of {} from {}",
            entries.len(),
            total,
            origin_url
        );
        Ok(entries)
    }
}

/// Rejects payloads that cannot be XML or JSON, such as error pages served as text
fn ensure_feed_like(payload: &[u8], origin_url: &str) -> Result<(), ParseError> {
    match payload.iter().find(|b| !b.is_ascii_whitespace()) {
        Some(b'<') | Some(b'{') => Ok(()),
        _ => {
            let preview: String = String::from_utf8_lossy(payload)
                .chars()
                .take(PREVIEW_CHARS)
                .collect();
            Err(ParseError::NotAFeed {
                url: origin_url.to_string(),
                preview,
            })
        }
    }
}

fn to_feed_entry(entry: Entry) -> FeedEntry {
    let title = entry
        .title
        .map(|t| clean_text(&t.content))
        .unwrap_or_default();

    let body = entry
        .summary
        .map(|s| s.content)
        .filter(|s| !s.trim().is_empty())
        .or_else(|| entry.content.and_then(|c| c.body))
        .map(|b| clean_text(&b))
        .filter(|b| !b.is_empty())
        .map(|b| truncate_content(&b));

    let url = preferred_link(&entry.links)
        .map(|l| l.href.trim().to_string())
        .unwrap_or_default();

    let author = entry.authors.into_iter().find_map(author_name);

    FeedEntry {
        title,
        body,
        url,
        author,
        published_at: entry.published.or(entry.updated),
    }
}

/// Display name of an entry author
///
/// RSS 2.0 `<author>` arrives with the placeholder name `author` and the raw
/// element text in `email`, either a bare value or `addr (Name)`.
fn author_name(person: Person) -> Option<String> {
    let name = person.name.trim();
    if !name.is_empty() && !name.eq_ignore_ascii_case("author") {
        return Some(name.to_string());
    }

    let raw = person.email?;
    let raw = raw.trim();
    let display = match (raw.find('('), raw.rfind(')')) {
        (Some(open), Some(close)) if open < close => raw[open + 1..close].trim(),
        _ => raw,
    };
    let display = if display.is_empty() { raw } else { display };

    (!display.is_empty()).then(|| display.to_string())
}

fn preferred_link(links: &[Link]) -> Option<&Link> {
    links
        .iter()
        .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
        .or_else(|| links.first())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MAX_CONTENT_LENGTH;
    use chrono::{TimeZone, Utc};

    const ORIGIN: &str = "https://blog.example.com/feed";

    const SAMPLE_RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:content="http://purl.org/rss/1.0/modules/content/">
  <channel>
    <title>Example Tech Blog</title>
    <link>https://blog.example.com</link>
    <description>Engineering notes</description>
    <item>
      <title>Scaling &amp; Sharding</title>
      <link>https://blog.example.com/posts/sharding</link>
      <description><![CDATA[<p>How we <b>split</b>   the database.</p>]]></description>
      <author>Jane Park</author>
      <pubDate>Mon, 01 Apr 2024 09:30:00 GMT</pubDate>
    </item>
    <item>
      <title>Content only</title>
      <link>https://blog.example.com/posts/content-only</link>
      <content:encoded><![CDATA[<div>Full <i>article</i> body</div>]]></content:encoded>
    </item>
    <item>
      <title></title>
      <link>https://blog.example.com/posts/untitled</link>
    </item>
    <item>
      <title>FTP link</title>
      <link>ftp://blog.example.com/posts/file</link>
    </item>
  </channel>
</rss>"#;

    const SAMPLE_ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom Blog</title>
  <id>urn:uuid:60a76c80-d399-11d9-b93C-0003939e0af6</id>
  <updated>2024-04-02T18:30:02Z</updated>
  <entry>
    <title>Atom entry</title>
    <link rel="edit" href="https://atom.example.com/edit/1"/>
    <link rel="alternate" href="https://atom.example.com/posts/1"/>
    <id>urn:uuid:1225c695-cfb8-4ebb-aaaa-80da344efa6a</id>
    <updated>2024-04-02T18:30:02Z</updated>
    <summary>Short summary</summary>
    <author><name>Lee</name></author>
  </entry>
</feed>"#;

    fn parse(body: &str) -> Result<Vec<FeedEntry>, ParseError> {
        let raw = RawFeed::new(ORIGIN, body.as_bytes().to_vec());
        SyndicationParser::new().parse(&raw, ORIGIN)
    }

    #[test]
    fn test_parse_rss_filters_invalid_entries() {
        let entries = parse(SAMPLE_RSS).unwrap();
        let titles: Vec<_> = entries.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["Scaling & Sharding", "Content only"]);
    }

    #[test]
    fn test_rss_entry_fields() {
        let entries = parse(SAMPLE_RSS).unwrap();
        let first = &entries[0];

        assert_eq!(first.url, "https://blog.example.com/posts/sharding");
        assert_eq!(first.body.as_deref(), Some("How we split the database."));
        assert_eq!(first.author.as_deref(), Some("Jane Park"));
        assert_eq!(
            first.published_at,
            Some(Utc.with_ymd_and_hms(2024, 4, 1, 9, 30, 0).unwrap())
        );
    }

    #[test]
    fn test_rss_author_forms() {
        let rss = r#"<rss version="2.0" xmlns:dc="http://purl.org/dc/elements/1.1/">
  <channel>
    <title>Authors</title>
    <item>
      <title>Plain</title>
      <link>https://blog.example.com/a</link>
      <author>Jane Park</author>
    </item>
    <item>
      <title>Address form</title>
      <link>https://blog.example.com/b</link>
      <author>jane@example.com (Jane Park)</author>
    </item>
    <item>
      <title>Bare address</title>
      <link>https://blog.example.com/c</link>
      <author>jane@example.com</author>
    </item>
    <item>
      <title>Dublin Core</title>
      <link>https://blog.example.com/d</link>
      <dc:creator>Kim</dc:creator>
    </item>
    <item>
      <title>Anonymous</title>
      <link>https://blog.example.com/e</link>
    </item>
  </channel>
</rss>"#;

        let authors: Vec<_> = parse(rss)
            .unwrap()
            .into_iter()
            .map(|e| e.author)
            .collect();

        assert_eq!(
            authors,
            vec![
                Some("Jane Park".to_string()),
                Some("Jane Park".to_string()),
                Some("jane@example.com".to_string()),
                Some("Kim".to_string()),
                None,
            ]
        );
    }

    #[test]
    fn test_author_name_keeps_real_names() {
        let person = |name: &str, email: Option<&str>| Person {
            name: name.to_string(),
            uri: None,
            email: email.map(str::to_string),
        };

        assert_eq!(author_name(person("Lee", None)).as_deref(), Some("Lee"));
        assert_eq!(
            author_name(person("author", Some("x@example.com ()"))).as_deref(),
            Some("x@example.com ()")
        );
        assert_eq!(author_name(person("", None)), None);
        assert_eq!(author_name(person("Author", Some("  "))), None);
    }

    #[test]
    fn test_body_falls_back_to_content() {
        let entries = parse(SAMPLE_RSS).unwrap();
        assert_eq!(entries[1].body.as_deref(), Some("Full article body"));
        assert_eq!(entries[1].published_at, None);
    }

    #[test]
    fn test_parse_atom_prefers_alternate_link() {
        let entries = parse(SAMPLE_ATOM).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].url, "https://atom.example.com/posts/1");
        assert_eq!(entries[0].body.as_deref(), Some("Short summary"));
        assert_eq!(entries[0].author.as_deref(), Some("Lee"));
        // No published date, so updated is used
        assert_eq!(
            entries[0].published_at,
            Some(Utc.with_ymd_and_hms(2024, 4, 2, 18, 30, 2).unwrap())
        );
    }

    #[test]
    fn test_parse_json_feed() {
        let json = r#"{
            "version": "https://jsonfeed.org/version/1.1",
            "title": "JSON Blog",
            "items": [
                {"id": "1", "title": "From JSON", "url": "https://json.example.com/1", "content_text": "hi"}
            ]
        }"#;
        let entries = parse(json).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title, "From JSON");
        assert_eq!(entries[0].url, "https://json.example.com/1");
    }

    #[test]
    fn test_overlong_title_is_dropped() {
        let rss = format!(
            r#"<rss version="2.0"><channel><title>t</title>
            <item><title>{}</title><link>https://blog.example.com/long</link></item>
            <item><title>ok</title><link>https://blog.example.com/ok</link></item>
            </channel></rss>"#,
            "x".repeat(501)
        );
        let entries = parse(&rss).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title, "ok");
    }

    #[test]
    fn test_long_body_is_truncated() {
        let rss = format!(
            r#"<rss version="2.0"><channel><title>t</title>
            <item><title>long</title><link>https://blog.example.com/long</link><description>{}</description></item>
            </channel></rss>"#,
            "y".repeat(5000)
        );
        let entries = parse(&rss).unwrap();
        let body = entries[0].body.as_deref().unwrap();
        assert_eq!(body.chars().count(), MAX_CONTENT_LENGTH);
        assert!(body.ends_with("..."));
    }

    #[test]
    fn test_bom_is_ignored() {
        let with_bom = format!("\u{FEFF}{}", SAMPLE_ATOM);
        assert_eq!(parse(&with_bom).unwrap().len(), 1);
    }

    #[test]
    fn test_empty_channel_yields_no_entries() {
        let entries = parse(r#"<rss version="2.0"><channel><title>t</title></channel></rss>"#);
        assert!(entries.unwrap().is_empty());
    }

    #[test]
    fn test_non_markup_payload_rejected_with_preview() {
        let body = format!("Service Unavailable {}", "z".repeat(400));
        match parse(&body).unwrap_err() {
            ParseError::NotAFeed { url, preview } => {
                assert_eq!(url, ORIGIN);
                assert!(preview.starts_with("Service Unavailable"));
                assert_eq!(preview.chars().count(), PREVIEW_CHARS);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_html_page_is_malformed() {
        let err = parse("<html><body><h1>Not found</h1></body></html>").unwrap_err();
        assert!(matches!(err, ParseError::Malformed { .. }));
    }
}
