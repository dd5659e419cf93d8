//! Integration tests for the crawler
//!
//! These tests use wiremock to serve feeds and a temporary SQLite database to
//! run the full fetch, parse, dedupe and notify cycle end-to-end.

use blogroll::clock::FixedClock;
use blogroll::config::{parse_config, Config};
use blogroll::crawler::{
    Collaborators, Coordinator, CrawlSettings, HttpFeedFetcher, ProxyResolver, RetryPolicy,
    SyndicationParser,
};
use blogroll::model::ErrorKind;
use blogroll::notify::{ChannelListener, CompletionNotifier};
use blogroll::storage::{open_storage, seed_sources, SqliteStorage};
use blogroll::{CrawlError, SourceStatus};
use chrono::{TimeZone, Utc};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn rss(items: &[(&str, &str)]) -> String {
    let items: String = items
        .iter()
        .map(|(title, link)| {
            format!(
                "<item><title>{}</title><link>{}</link><description>&lt;p&gt;About {}&lt;/p&gt;</description>\
                 <pubDate>Mon, 01 Jan 2024 10:00:00 GMT</pubDate></item>",
                title, link, title
            )
        })
        .collect();
    format!(
        r#"<?xml version="1.0"?><rss version="2.0"><channel><title>Blog</title>{}</channel></rss>"#,
        items
    )
}

fn atom(title: &str, link: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom Blog</title>
  <id>urn:blog</id>
  <updated>2024-02-01T08:00:00Z</updated>
  <entry>
    <title>{}</title>
    <id>urn:entry:1</id>
    <link href="{}"/>
    <updated>2024-02-01T08:00:00Z</updated>
    <summary>Short summary</summary>
  </entry>
</feed>"#,
        title, link
    )
}

async fn serve(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/xml")
                .set_body_string(body),
        )
        .mount(server)
        .await;
}

/// Parses a test configuration; `extra` is appended verbatim
fn config(db_path: &Path, extra: &str) -> Config {
    let content = format!(
        r#"
[crawler]
request-timeout = 2000
max-concurrent-sources = 2

[retry]
max-attempts = 2
base-delay = 10
max-delay = 20

[storage]
database-path = "{}"

[notify]
log-summary = false

{}
"#,
        db_path.display(),
        extra
    );
    parse_config(&content).expect("test config is valid")
}

struct Harness {
    _dir: TempDir,
    storage: Arc<SqliteStorage>,
    coordinator: Coordinator,
}

fn harness(extra: &str, notifier: CompletionNotifier) -> Harness {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("blogroll.db");
    let config = config(&db_path, extra);

    let storage = Arc::new(open_storage(&db_path).unwrap());
    seed_sources(&storage, &config.sources).unwrap();
    let coordinator = Coordinator::from_config(&config, Arc::clone(&storage), notifier).unwrap();

    Harness {
        _dir: dir,
        storage,
        coordinator,
    }
}

fn source_block(name: &str, feed_url: &str, status: &str) -> String {
    format!(
        "[[source]]\nname = \"{}\"\nfeed-url = \"{}\"\nstatus = \"{}\"\n",
        name, feed_url, status
    )
}

#[tokio::test]
async fn test_batch_crawl_isolates_failing_source() {
    let server = MockServer::start().await;
    let base = server.uri();

    serve(
        &server,
        "/alpha.xml",
        rss(&[
            ("Alpha One", "https://alpha.example.com/posts/1"),
            ("Alpha Two", "https://alpha.example.com/posts/2"),
        ]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/beta.xml"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;
    serve(&server, "/gamma.xml", atom("Gamma One", "https://gamma.example.com/one")).await;

    let sources = [
        source_block("Alpha", &format!("{}/alpha.xml", base), "ACTIVE"),
        source_block("Beta", &format!("{}/beta.xml", base), "ACTIVE"),
        source_block("Gamma", &format!("{}/gamma.xml", base), "ACTIVE"),
    ]
    .join("\n");
    let h = harness(&sources, CompletionNotifier::new());

    let result = h.coordinator.crawl_all_active().await.unwrap();

    assert_eq!(result.total_sources, 3);
    assert_eq!(result.processed_sources, 2);
    assert_eq!(result.posts_saved, 3);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].source_name, "Beta");
    assert_eq!(result.errors[0].kind, ErrorKind::FetchError);
    assert_eq!(h.storage.count_posts().unwrap(), 3);

    let post = h
        .storage
        .get_post_by_normalized_url("https://alpha.example.com/posts/1")
        .unwrap()
        .expect("alpha post stored");
    assert_eq!(post.title, "Alpha One");
    assert_eq!(post.content.as_deref(), Some("About Alpha One"));
    assert_eq!(
        post.published_at,
        Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap()
    );

    let run_id = h.storage.record_run(&result).unwrap();
    let run = h.storage.latest_run().unwrap().unwrap();
    assert_eq!(run.id, run_id);
    assert_eq!(run.posts_saved, 3);
    assert_eq!(run.error_count, 1);
}

#[tokio::test]
async fn test_recrawl_and_cross_source_duplicates() {
    let server = MockServer::start().await;
    let base = server.uri();

    serve(
        &server,
        "/one.xml",
        rss(&[
            ("Shared", "https://blog.example.com/post?utm_source=rss"),
            ("Only One", "https://blog.example.com/only-one"),
        ]),
    )
    .await;
    serve(
        &server,
        "/two.xml",
        rss(&[("Shared Again", "http://www.blog.example.com/post/#comments")]),
    )
    .await;

    let sources = [
        source_block("One", &format!("{}/one.xml", base), "ACTIVE"),
        source_block("Two", &format!("{}/two.xml", base), "ACTIVE"),
    ]
    .join("\n");
    let h = harness(&sources, CompletionNotifier::new());

    let first = h.coordinator.crawl_all_active().await.unwrap();
    assert_eq!(first.posts_saved, 2);
    assert_eq!(h.storage.count_posts().unwrap(), 2);

    let second = h.coordinator.crawl_all_active().await.unwrap();
    assert_eq!(second.posts_saved, 0);
    assert_eq!(second.processed_sources, 2);
    assert!(second.errors.is_empty());
    assert!(!second.should_notify());
    assert_eq!(h.storage.count_posts().unwrap(), 2);
}

#[tokio::test]
async fn test_proxied_source_is_fetched_through_proxy() {
    let server = MockServer::start().await;
    let base = server.uri();
    let feed_url = format!("{}/mirror-only/feed", base);

    Mock::given(method("GET"))
        .and(path("/proxy"))
        .and(query_param("url", feed_url.as_str()))
        .and(header("accept-encoding", "identity"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(rss(&[("Proxied", "https://mirror.example.com/p/1")])),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/mirror-only/feed"))
        .respond_with(ResponseTemplate::new(403))
        .expect(0)
        .mount(&server)
        .await;

    let extra = format!(
        "[proxy]\nenabled = true\nbase-url = \"{}/proxy?url=\"\ndomains = [\"/mirror-only/\"]\n\n{}",
        base,
        source_block("Mirror", &feed_url, "ACTIVE")
    );
    let h = harness(&extra, CompletionNotifier::new());

    let result = h.coordinator.crawl_all_active().await.unwrap();
    assert_eq!(result.posts_saved, 1);
    assert!(result.errors.is_empty());
}

#[tokio::test]
async fn test_webhook_receives_only_productive_runs() {
    let server = MockServer::start().await;
    let base = server.uri();

    serve(
        &server,
        "/feed.xml",
        rss(&[("Hooked", "https://hook.example.com/a")]),
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let extra = format!(
        "[notify]\nlog-summary = false\nwebhook-url = \"{}/hook\"\n\n{}",
        base,
        source_block("Hooked", &format!("{}/feed.xml", base), "ACTIVE")
    );
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("hook.db");
    let content = format!(
        "[storage]\ndatabase-path = \"{}\"\n\n[retry]\nmax-attempts = 1\n\n{}",
        db_path.display(),
        extra
    );
    let config = parse_config(&content).unwrap();

    let storage = Arc::new(open_storage(&db_path).unwrap());
    seed_sources(&storage, &config.sources).unwrap();
    let notifier = CompletionNotifier::from_config(&config.notify).unwrap();
    let coordinator = Coordinator::from_config(&config, storage, notifier).unwrap();

    assert_eq!(coordinator.crawl_all_active().await.unwrap().posts_saved, 1);
    assert_eq!(coordinator.crawl_all_active().await.unwrap().posts_saved, 0);
    coordinator.flush_notifications().await;

    server.verify().await;
}

#[tokio::test]
async fn test_crawl_source_rejects_inactive_source() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/paused.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(rss(&[("x", "https://x.example.com/x")])))
        .expect(0)
        .mount(&server)
        .await;

    let feed_url = format!("{}/paused.xml", base);
    let sources = source_block("Paused", &feed_url, "SUSPENDED");
    let h = harness(&sources, CompletionNotifier::new());

    let paused = h
        .storage
        .upsert_source("Paused", &feed_url, None, SourceStatus::Suspended)
        .unwrap();

    assert!(matches!(
        h.coordinator.crawl_source(paused.id).await,
        Err(CrawlError::SourceNotFound(id)) if id == paused.id
    ));
    assert!(matches!(
        h.coordinator.crawl_source(paused.id + 100).await,
        Err(CrawlError::SourceNotFound(_))
    ));

    let result = h.coordinator.crawl_all_active().await.unwrap();
    assert_eq!(result.total_sources, 0);
}

#[tokio::test]
async fn test_run_deadline_cuts_off_slow_source() {
    let server = MockServer::start().await;
    let base = server.uri();

    serve(&server, "/quick.xml", rss(&[("Quick", "https://quick.example.com/1")])).await;
    Mock::given(method("GET"))
        .and(path("/slow.xml"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(rss(&[("Slow", "https://slow.example.com/1")]))
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("deadline.db");
    let content = format!(
        "[crawler]\nrequest-timeout = 30000\nrun-deadline = 1\n\n[retry]\nmax-attempts = 1\n\n\
         [storage]\ndatabase-path = \"{}\"\n\n[notify]\nlog-summary = false\n\n{}\n{}",
        db_path.display(),
        source_block("Quick", &format!("{}/quick.xml", base), "ACTIVE"),
        source_block("Slow", &format!("{}/slow.xml", base), "ACTIVE"),
    );
    let config = parse_config(&content).unwrap();

    let storage = Arc::new(open_storage(&db_path).unwrap());
    seed_sources(&storage, &config.sources).unwrap();
    let coordinator =
        Coordinator::from_config(&config, Arc::clone(&storage), CompletionNotifier::new()).unwrap();

    let started = std::time::Instant::now();
    let result = coordinator.crawl_all_active().await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(result.processed_sources, 1);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].source_name, "Slow");
    assert_eq!(result.errors[0].kind, ErrorKind::DeadlineExceeded);
    assert_eq!(storage.count_posts().unwrap(), 1);
}

#[tokio::test]
async fn test_listener_sees_result_and_undated_entries_use_clock() {
    let server = MockServer::start().await;
    let base = server.uri();

    let undated = r#"<rss version="2.0"><channel><title>t</title>
        <item><title>No Date</title><link>https://undated.example.com/a</link></item>
        <item><title></title><link>https://undated.example.com/untitled</link></item>
        <item><title>Bad Link</title><link>mailto:someone@example.com</link></item>
        </channel></rss>"#;
    serve(&server, "/undated.xml", undated.to_string()).await;

    let dir = TempDir::new().unwrap();
    let storage = Arc::new(SqliteStorage::new(&dir.path().join("clock.db")).unwrap());
    let source = storage
        .upsert_source(
            "Undated",
            &format!("{}/undated.xml", base),
            None,
            SourceStatus::Active,
        )
        .unwrap();

    let now = Utc.with_ymd_and_hms(2024, 7, 4, 12, 0, 0).unwrap();
    let (listener, mut events) = ChannelListener::new();
    let coordinator = Coordinator::new(
        Collaborators {
            sources: storage.clone(),
            posts: storage.clone(),
            proxy: Arc::new(ProxyResolver::disabled()),
            fetcher: Arc::new(HttpFeedFetcher::new(
                blogroll::crawler::build_http_client().unwrap(),
                Duration::from_secs(2),
                RetryPolicy::without_delay(1),
            )),
            parser: Arc::new(SyndicationParser::new()),
            clock: Arc::new(FixedClock::new(now)),
        },
        CrawlSettings::default(),
        CompletionNotifier::new().with_listener(Arc::new(listener)),
    );

    let result = coordinator.crawl_source(source.id).await.unwrap();
    assert_eq!(result.posts_saved, 1);
    assert_eq!(result.started_at, now);

    let event = events.recv().await.unwrap();
    assert_eq!(event.result, result);
    assert_eq!(event.occurred_at, now);

    let post = storage
        .get_post_by_normalized_url("https://undated.example.com/a")
        .unwrap()
        .unwrap();
    assert_eq!(post.published_at, now);
    assert_eq!(post.source_id, source.id);
}
