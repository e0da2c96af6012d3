//! Integration tests for the crawler
//!
//! Most tests drive `Crawler::crawl` with a scripted in-process renderer so
//! the crawl graph, timing and failures are fully controlled. The last test
//! runs the real HTTP renderer and Ollama summarizer against wiremock.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use sumi_harvest::config::{CrawlerConfig, RendererConfig, SummarizerConfig};
use sumi_harvest::crawler::{
    CrawlResult, Crawler, ErrorKind, HttpRenderer, JobError, OllamaSummarizer, RenderedPage,
    Renderer, SummarizeError, Summarizer,
};
use sumi_harvest::HarvestError;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// One scripted page
#[derive(Clone, Default)]
struct Page {
    final_url: Option<String>,
    text: String,
    links: Vec<String>,
    delay: Duration,
}

impl Page {
    fn with_links(links: &[&str]) -> Self {
        Self {
            text: "page text".to_string(),
            links: links.iter().map(|l| l.to_string()).collect(),
            ..Self::default()
        }
    }
}

/// Renderer answering from a fixed map of normalized URL -> page
#[derive(Default)]
struct ScriptedRenderer {
    pages: HashMap<String, Page>,
    calls: Mutex<Vec<(String, Instant)>>,
}

impl ScriptedRenderer {
    fn new() -> Self {
        Self::default()
    }

    fn page(mut self, url: &str, page: Page) -> Self {
        self.pages.insert(url.to_string(), page);
        self
    }

    fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(url, _)| url.clone())
            .collect()
    }

    fn call_times(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().iter().map(|(_, at)| *at).collect()
    }

    fn count_for(&self, url: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == url).count()
    }
}

#[async_trait]
impl Renderer for ScriptedRenderer {
    async fn render(
        &self,
        location: &Url,
        _allowed_host: Option<&str>,
    ) -> Result<RenderedPage, JobError> {
        self.calls
            .lock()
            .unwrap()
            .push((location.to_string(), Instant::now()));

        let page = self
            .pages
            .get(location.as_str())
            .cloned()
            .ok_or_else(|| JobError::network("HTTP 404"))?;

        if !page.delay.is_zero() {
            tokio::time::sleep(page.delay).await;
        }

        let final_url = match &page.final_url {
            Some(url) => Url::parse(url).unwrap(),
            None => location.clone(),
        };

        Ok(RenderedPage {
            final_url,
            text: page.text,
            links: page.links,
        })
    }
}

struct EchoSummarizer;

#[async_trait]
impl Summarizer for EchoSummarizer {
    async fn summarize(&self, text: &str) -> Result<String, SummarizeError> {
        Ok(format!("summary of {} chars", text.len()))
    }
}

#[derive(Default)]
struct FailingSummarizer {
    calls: AtomicUsize,
}

#[async_trait]
impl Summarizer for FailingSummarizer {
    async fn summarize(&self, _text: &str) -> Result<String, SummarizeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(SummarizeError::Exhausted {
            attempts: 3,
            last: "model unavailable".to_string(),
        })
    }
}

fn config(max_depth: u32, max_workers: u32) -> CrawlerConfig {
    CrawlerConfig {
        max_depth,
        rate: 1000.0,
        max_workers,
        allowed_host: None,
    }
}

async fn run_crawl(crawler: &Crawler, seed: &str) -> Vec<CrawlResult> {
    let stream = crawler
        .crawl(seed, &CancellationToken::new())
        .expect("crawl failed to start");
    tokio::time::timeout(Duration::from_secs(10), stream.collect())
        .await
        .expect("result stream did not close")
}

fn find<'a>(results: &'a [CrawlResult], url: &str) -> &'a CrawlResult {
    results
        .iter()
        .find(|r| r.location.as_str() == url)
        .unwrap_or_else(|| panic!("no result for {}", url))
}

#[tokio::test]
async fn test_trailing_slash_duplicates_produce_one_job() {
    let renderer = Arc::new(
        ScriptedRenderer::new()
            .page(
                "https://example.com/a",
                Page::with_links(&["https://example.com/b", "https://example.com/b/"]),
            )
            .page(
                "https://example.com/b",
                Page::with_links(&["https://example.com/c"]),
            ),
    );
    let crawler = Crawler::new(config(1, 5), renderer.clone(), Arc::new(EchoSummarizer));

    let results = run_crawl(&crawler, "https://example.com/a").await;

    assert_eq!(results.len(), 2);
    assert_eq!(renderer.count_for("https://example.com/b"), 1);
    assert_eq!(renderer.count_for("https://example.com/c"), 0);

    let a = find(&results, "https://example.com/a");
    assert_eq!(a.depth, 0);
    assert_eq!(a.links.len(), 1);
    assert!(a.is_success());

    let b = find(&results, "https://example.com/b");
    assert_eq!(b.depth, 1);
    assert!(b.is_success());
    // Links are still reported at max depth, just not followed
    assert_eq!(b.links.len(), 1);
}

#[tokio::test]
async fn test_redirect_to_other_host_is_disallowed() {
    let renderer = Arc::new(ScriptedRenderer::new().page(
        "https://example.com/start",
        Page {
            final_url: Some("https://other.com/landing".to_string()),
            text: "somewhere else".to_string(),
            links: vec!["https://example.com/next".to_string()],
            ..Page::default()
        },
    ));
    let crawler = Crawler::new(
        CrawlerConfig {
            allowed_host: Some("example.com".to_string()),
            ..config(2, 3)
        },
        renderer.clone(),
        Arc::new(EchoSummarizer),
    );

    let results = run_crawl(&crawler, "https://example.com/start").await;

    assert_eq!(results.len(), 1);
    let seed = &results[0];
    assert_eq!(seed.error_kind(), Some(ErrorKind::DisallowedHost));
    assert!(seed.content.is_empty());
    assert!(seed.summary.is_empty());
    assert_eq!(
        seed.final_location.as_ref().map(Url::as_str),
        Some("https://other.com/landing")
    );
    assert_eq!(renderer.calls().len(), 1);
}

#[tokio::test]
async fn test_summarizer_failure_keeps_content_and_links() {
    let renderer = Arc::new(
        ScriptedRenderer::new()
            .page(
                "https://example.com/",
                Page::with_links(&["/one", "/two"]),
            )
            .page("https://example.com/one", Page::with_links(&[]))
            .page("https://example.com/two", Page::with_links(&[])),
    );
    let summarizer = Arc::new(FailingSummarizer::default());
    let crawler = Crawler::new(config(1, 2), renderer, summarizer.clone());

    let results = run_crawl(&crawler, "https://example.com/").await;

    assert_eq!(results.len(), 3);
    assert_eq!(summarizer.calls.load(Ordering::SeqCst), 3);
    for result in &results {
        assert!(result.is_success(), "{} carried {:?}", result.location, result.error);
        assert_eq!(result.content, "page text");
        assert!(result.summary.is_empty());
    }
    assert_eq!(find(&results, "https://example.com/").links.len(), 2);
}

#[tokio::test]
async fn test_cancel_mid_fetch_marks_in_flight_jobs_cancelled() {
    let slow = Page {
        delay: Duration::from_secs(60),
        ..Page::with_links(&["/deeper"])
    };
    let renderer = Arc::new(
        ScriptedRenderer::new()
            .page(
                "https://example.com/",
                Page::with_links(&["/c1", "/c2", "/c3"]),
            )
            .page("https://example.com/c1", slow.clone())
            .page("https://example.com/c2", slow.clone())
            .page("https://example.com/c3", slow),
    );
    let crawler = Crawler::new(config(3, 5), renderer.clone(), Arc::new(EchoSummarizer));

    let parent = CancellationToken::new();
    let mut stream = crawler.crawl("https://example.com/", &parent).unwrap();

    // Seed result arrives first; then wait for all three children to be mid-fetch
    let seed = stream.recv().await.unwrap();
    assert!(seed.is_success());
    tokio::time::timeout(Duration::from_secs(5), async {
        while renderer.calls().len() < 4 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("children never started");

    parent.cancel();

    let started = std::time::Instant::now();
    let mut rest = Vec::new();
    while let Some(result) = stream.recv().await {
        rest.push(result);
    }
    assert!(started.elapsed() < Duration::from_secs(5));

    assert_eq!(rest.len(), 3);
    for result in &rest {
        assert_eq!(result.depth, 1);
        assert_eq!(result.error_kind(), Some(ErrorKind::Cancelled));
    }
    // Nothing new was dispatched after the signal
    assert_eq!(renderer.calls().len(), 4);
}

#[tokio::test]
async fn test_stream_cancel_closes_stream() {
    let renderer = Arc::new(ScriptedRenderer::new().page(
        "https://example.com/",
        Page {
            delay: Duration::from_secs(60),
            ..Page::with_links(&[])
        },
    ));
    let crawler = Crawler::new(config(2, 4), renderer, Arc::new(EchoSummarizer));

    let mut stream = crawler
        .crawl("https://example.com/", &CancellationToken::new())
        .unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    stream.cancel();

    let result = tokio::time::timeout(Duration::from_secs(2), stream.recv())
        .await
        .expect("stream stayed open")
        .unwrap();
    assert_eq!(result.error_kind(), Some(ErrorKind::Cancelled));
    assert!(stream.recv().await.is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrently_discovered_link_is_fetched_once() {
    let hubs: Vec<String> = (0..20).map(|i| format!("/hub{}", i)).collect();
    let hub_refs: Vec<&str> = hubs.iter().map(String::as_str).collect();

    let mut renderer = ScriptedRenderer::new().page(
        "https://example.com/",
        Page::with_links(&hub_refs),
    );
    for (i, hub) in hubs.iter().enumerate() {
        renderer = renderer.page(
            &format!("https://example.com{}", hub),
            Page {
                delay: Duration::from_millis((i % 4) as u64),
                // Every hub links to the shared target and back to the seed
                ..Page::with_links(&["/target", "/target/", "https://example.com/"])
            },
        );
    }
    let renderer = Arc::new(renderer.page("https://example.com/target", Page::with_links(&[])));
    let crawler = Crawler::new(config(2, 8), renderer.clone(), Arc::new(EchoSummarizer));

    let results = run_crawl(&crawler, "https://example.com/").await;

    assert_eq!(results.len(), 22);
    assert_eq!(renderer.count_for("https://example.com/target"), 1);
    assert_eq!(renderer.count_for("https://example.com/"), 1);
    assert_eq!(find(&results, "https://example.com/target").depth, 2);

    let mut locations: Vec<_> = results.iter().map(|r| r.location.to_string()).collect();
    locations.sort();
    locations.dedup();
    assert_eq!(locations.len(), 22);
}

#[tokio::test]
async fn test_depth_bound() {
    let renderer = Arc::new(
        ScriptedRenderer::new()
            .page("https://example.com/p0", Page::with_links(&["/p1"]))
            .page("https://example.com/p1", Page::with_links(&["/p2"]))
            .page("https://example.com/p2", Page::with_links(&["/p3"]))
            .page("https://example.com/p3", Page::with_links(&["/p4"])),
    );
    let crawler = Crawler::new(config(2, 3), renderer.clone(), Arc::new(EchoSummarizer));

    let results = run_crawl(&crawler, "https://example.com/p0").await;

    let mut depths: Vec<_> = results.iter().map(|r| r.depth).collect();
    depths.sort();
    assert_eq!(depths, vec![0, 1, 2]);
    assert!(results.iter().all(|r| r.depth <= 2));
    assert_eq!(renderer.count_for("https://example.com/p3"), 0);
    assert_eq!(find(&results, "https://example.com/p2").links.len(), 1);
}

#[tokio::test]
async fn test_zero_depth_fetches_only_seed() {
    let renderer = Arc::new(
        ScriptedRenderer::new().page("https://example.com/", Page::with_links(&["/a", "/b"])),
    );
    let crawler = Crawler::new(config(0, 2), renderer.clone(), Arc::new(EchoSummarizer));

    let results = run_crawl(&crawler, "https://example.com/").await;

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].links.len(), 2);
    assert_eq!(renderer.calls().len(), 1);
}

#[tokio::test]
async fn test_render_failures_do_not_stop_the_crawl() {
    let renderer = Arc::new(
        ScriptedRenderer::new()
            .page("https://example.com/", Page::with_links(&["/missing", "/ok"]))
            .page("https://example.com/ok", Page::with_links(&[])),
    );
    let crawler = Crawler::new(config(1, 2), renderer, Arc::new(EchoSummarizer));

    let results = run_crawl(&crawler, "https://example.com/").await;

    assert_eq!(results.len(), 3);
    let missing = find(&results, "https://example.com/missing");
    assert_eq!(missing.error_kind(), Some(ErrorKind::Network));
    assert!(missing.content.is_empty());
    assert!(find(&results, "https://example.com/ok").is_success());
}

#[tokio::test]
async fn test_invalid_seed_fails_before_dispatch() {
    let renderer = Arc::new(ScriptedRenderer::new());
    let crawler = Crawler::new(config(1, 2), renderer.clone(), Arc::new(EchoSummarizer));

    let err = crawler
        .crawl("example.com/no-scheme", &CancellationToken::new())
        .unwrap_err();

    assert!(matches!(err, HarvestError::InvalidSeedUrl { .. }));
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(renderer.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_permits_respect_global_rate() {
    let renderer = Arc::new(
        ScriptedRenderer::new()
            .page(
                "https://example.com/",
                Page::with_links(&["/a", "/b", "/c", "/d", "/e"]),
            )
            .page("https://example.com/a", Page::with_links(&[]))
            .page("https://example.com/b", Page::with_links(&[]))
            .page("https://example.com/c", Page::with_links(&[]))
            .page("https://example.com/d", Page::with_links(&[]))
            .page("https://example.com/e", Page::with_links(&[])),
    );
    let crawler = Crawler::new(
        CrawlerConfig {
            rate: 10.0,
            ..config(1, 5)
        },
        renderer.clone(),
        Arc::new(EchoSummarizer),
    );

    let results = run_crawl(&crawler, "https://example.com/").await;
    assert_eq!(results.len(), 6);

    let mut times = renderer.call_times();
    times.sort();
    // 1ms of slack for timer wheel rounding
    for pair in times.windows(2) {
        assert!(
            pair[1] - pair[0] >= Duration::from_millis(99),
            "renders started {:?} apart",
            pair[1] - pair[0]
        );
    }
}

#[tokio::test]
async fn test_http_crawl_end_to_end() {
    let site = MockServer::start().await;
    let base = site.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(format!(
                    r#"<html><head><title>Home</title></head><body>
                    <main><p>Welcome to the test site.</p>
                    <a href="/about/">About</a>
                    <a href="{}/missing">Missing</a>
                    <a href="/doc.pdf">Doc</a></main>
                    </body></html>"#,
                    base
                ), "text/html"),
        )
        .mount(&site)
        .await;
    Mock::given(method("GET"))
        .and(path("/about"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("<html><body><article>About us</article></body></html>", "text/html"),
        )
        .mount(&site)
        .await;
    Mock::given(method("GET"))
        .and(path("/doc.pdf"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(b"%PDF".to_vec())
                .insert_header("content-type", "application/pdf"),
        )
        .mount(&site)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"response": "- Key point"})),
        )
        .mount(&site)
        .await;

    let renderer = Arc::new(HttpRenderer::new(RendererConfig::default()));
    renderer.start().await.unwrap();
    let summarizer = Arc::new(
        OllamaSummarizer::new(SummarizerConfig {
            url: base.clone(),
            backoff_ms: 1,
            max_attempts: 1,
            ..SummarizerConfig::default()
        })
        .unwrap(),
    );
    let crawler = Crawler::new(config(1, 3), renderer.clone(), summarizer);

    let results = run_crawl(&crawler, &format!("{}/", base)).await;
    renderer.shutdown().await;

    assert_eq!(results.len(), 4);

    let home = find(&results, &format!("{}/", base));
    assert!(home.is_success());
    assert_eq!(home.content, "Welcome to the test site. About Missing Doc");
    assert_eq!(home.summary, "- Key point");
    assert_eq!(home.links.len(), 3);

    let about = find(&results, &format!("{}/about", base));
    assert_eq!(about.content, "About us");
    assert_eq!(about.summary, "- Key point");

    let missing = find(&results, &format!("{}/missing", base));
    assert_eq!(missing.error_kind(), Some(ErrorKind::Network));

    let pdf = find(&results, &format!("{}/doc.pdf", base));
    assert_eq!(pdf.error_kind(), Some(ErrorKind::NonHtmlContent));
}

#[tokio::test]
async fn test_http_redirect_to_other_host_is_disallowed_before_content_checks() {
    let site = MockServer::start().await;
    let other_host = site.uri().replace("127.0.0.1", "localhost");

    Mock::given(method("GET"))
        .and(path("/start"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("location", format!("{}/file.pdf", other_host).as_str()),
        )
        .mount(&site)
        .await;
    Mock::given(method("GET"))
        .and(path("/file.pdf"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(b"%PDF".to_vec())
                .insert_header("content-type", "application/pdf"),
        )
        .mount(&site)
        .await;

    let renderer = Arc::new(HttpRenderer::new(RendererConfig::default()));
    let crawler = Crawler::new(
        CrawlerConfig {
            allowed_host: Some("127.0.0.1".to_string()),
            ..config(1, 2)
        },
        renderer.clone(),
        Arc::new(EchoSummarizer),
    );

    let results = run_crawl(&crawler, &format!("{}/start", site.uri())).await;
    renderer.shutdown().await;

    assert_eq!(results.len(), 1);
    let seed = &results[0];
    assert_eq!(seed.error_kind(), Some(ErrorKind::DisallowedHost));
    assert!(seed.content.is_empty());
    let final_location = seed.final_location.as_ref().expect("final location kept");
    assert_eq!(final_location.host_str(), Some("localhost"));
    assert_eq!(final_location.path(), "/file.pdf");
}
