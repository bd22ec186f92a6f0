use super::*;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn html_page(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.as_bytes().to_vec(), "text/html; charset=utf-8")
}

fn small_limits() -> CrawlLimits {
    CrawlLimits {
        max_depth: 2,
        max_pages: 5,
        max_chars: 50_000,
    }
}

#[tokio::test]
async fn crawls_linked_pages_on_the_same_host() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page(
            r#"<html><body>
                <p>Welcome to the start page.</p>
                <a href="/about">About</a>
                <a href="https://elsewhere.invalid/external">Elsewhere</a>
            </body></html>"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/about"))
        .respond_with(html_page("<html><body><p>About us page.</p></body></html>"))
        .mount(&server)
        .await;

    let text = scrape_site(&server.uri(), &small_limits())
        .await
        .expect("crawl should succeed");

    assert!(text.contains("Welcome to the start page."));
    assert!(text.contains("About us page."));
    // The off-host link is never followed, so only its anchor text appears.
    assert!(!text.contains("external"));
}

#[tokio::test]
async fn robots_disallow_blocks_the_crawl() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page("<html><body>hidden</body></html>"))
        .expect(0)
        .mount(&server)
        .await;

    let text = scrape_site(&server.uri(), &small_limits())
        .await
        .expect("crawl should succeed");

    assert!(text.is_empty());
}

#[tokio::test]
async fn script_and_style_text_is_dropped() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page(
            "<html><head><style>body { color: red }</style></head>\
             <body><script>var secret = 1;</script><p>Visible text.</p></body></html>",
        ))
        .mount(&server)
        .await;

    let text = scrape_site(&server.uri(), &small_limits())
        .await
        .expect("crawl should succeed");

    assert_eq!(text, "Visible text.");
}

#[tokio::test]
async fn output_is_truncated_to_max_chars() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page(&format!(
            "<html><body><p>{}</p></body></html>",
            "long ".repeat(100)
        )))
        .mount(&server)
        .await;

    let limits = CrawlLimits {
        max_chars: 40,
        ..small_limits()
    };
    let text = scrape_site(&server.uri(), &limits)
        .await
        .expect("crawl should succeed");

    assert!(text.chars().count() <= 40);
    assert!(text.starts_with("long"));
}

#[tokio::test]
async fn non_html_pages_are_skipped() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "application/json")
                .set_body_string("{\"not\": \"html\"}"),
        )
        .mount(&server)
        .await;

    let text = scrape_site(&server.uri(), &small_limits())
        .await
        .expect("crawl should succeed");

    assert!(text.is_empty());
}
