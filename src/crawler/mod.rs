pub mod robots;

#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use scraper::{ElementRef, Html, Selector};
use std::collections::{HashSet, VecDeque};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use url::Url;

use self::robots::RobotsTxt;

const USER_AGENT: &str = "DocativeBot/1.0 (https://docative.com; info@docative.com)";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
/// Delay between page fetches so small sites are not hammered
const POLITENESS_DELAY: Duration = Duration::from_millis(500);

/// Elements whose text never belongs in chatbot content
const SKIPPED_ELEMENTS: [&str; 5] = ["script", "style", "noscript", "iframe", "svg"];

/// Bounds for a site crawl
#[derive(Debug, Clone)]
pub struct CrawlLimits {
    /// Link depth from the starting page (0 = only the starting page)
    pub max_depth: usize,
    /// Total pages fetched
    pub max_pages: usize,
    /// Characters kept from the concatenated page text
    pub max_chars: usize,
}

impl Default for CrawlLimits {
    #[inline]
    fn default() -> Self {
        Self {
            max_depth: 2,
            max_pages: 20,
            max_chars: 50_000,
        }
    }
}

/// Crawl a site breadth-first within its own domain and return the
/// concatenated page text, truncated to `max_chars`.
///
/// Individual page failures are logged and skipped. A start URL disallowed
/// by robots.txt, or a site with no extractable text, yields an empty
/// string; the caller treats that as "no content".
#[inline]
pub async fn scrape_site(start_url: &str, limits: &CrawlLimits) -> Result<String> {
    let start = Url::parse(start_url).context("invalid start URL")?;
    let base_host = start
        .host_str()
        .context("start URL has no host")?
        .to_string();

    let client = reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(USER_AGENT)
        .build()
        .context("failed to build HTTP client")?;

    let robots = fetch_robots(&client, &start).await;

    if !robots.is_allowed(&start, USER_AGENT) {
        warn!("Scraping disallowed by robots.txt for URL: {}", start);
        return Ok(String::new());
    }

    let mut visited: HashSet<String> = HashSet::new();
    let mut queue: VecDeque<(Url, usize)> = VecDeque::new();
    visited.insert(start.to_string());
    queue.push_back((start, 0));

    let mut extracted = String::new();
    let mut pages_scraped = 0;

    while let Some((url, depth)) = queue.pop_front() {
        if pages_scraped >= limits.max_pages {
            break;
        }
        if depth > limits.max_depth {
            continue;
        }

        let body = match fetch_html(&client, &url).await {
            Ok(Some(body)) => body,
            Ok(None) => continue,
            Err(e) => {
                warn!("Failed to scrape {}: {}", url, e);
                continue;
            }
        };

        // Parsing happens in a sync helper so the DOM never lives across an
        // await point.
        let (page_text, links) = extract_page(&body, &url);

        if !page_text.is_empty() {
            extracted.push_str(&page_text);
            extracted.push(' ');
            pages_scraped += 1;
            info!(
                "Scraped {} ({}/{} pages)",
                url, pages_scraped, limits.max_pages
            );
        }

        if pages_scraped < limits.max_pages && depth < limits.max_depth {
            for link in links {
                if link.host_str() != Some(base_host.as_str()) {
                    continue;
                }
                if !robots.is_allowed(&link, USER_AGENT) {
                    continue;
                }
                if visited.insert(link.to_string()) {
                    queue.push_back((link, depth + 1));
                }
            }
        }

        if !queue.is_empty() {
            sleep(POLITENESS_DELAY).await;
        }
    }

    if extracted.chars().count() > limits.max_chars {
        extracted = extracted.chars().take(limits.max_chars).collect();
        info!("Extracted text truncated to {} characters", limits.max_chars);
    }

    Ok(extracted.trim().to_string())
}

/// Fetch robots.txt from the site origin. Missing or unreadable robots
/// falls back to allow-all.
async fn fetch_robots(client: &reqwest::Client, start: &Url) -> RobotsTxt {
    let mut robots_url = start.clone();
    robots_url.set_path("/robots.txt");
    robots_url.set_query(None);
    robots_url.set_fragment(None);

    match client.get(robots_url.clone()).send().await {
        Ok(response) if response.status().is_success() => match response.text().await {
            Ok(body) => RobotsTxt::parse(&body),
            Err(e) => {
                warn!("Could not read robots.txt from {}: {}", robots_url, e);
                RobotsTxt::default()
            }
        },
        Ok(response) => {
            debug!(
                "No robots.txt at {} (status {})",
                robots_url,
                response.status()
            );
            RobotsTxt::default()
        }
        Err(e) => {
            warn!("Could not fetch robots.txt from {}: {}", robots_url, e);
            RobotsTxt::default()
        }
    }
}

/// GET one page, returning `None` for non-HTML responses
async fn fetch_html(client: &reqwest::Client, url: &Url) -> Result<Option<String>> {
    let response = client.get(url.clone()).send().await.context("request failed")?;

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
        .to_string();
    if !content_type.contains("text/html") {
        debug!("Skipping non-HTML content at {} ({})", url, content_type);
        return Ok(None);
    }

    let body = response.text().await.context("failed to read body")?;
    Ok(Some(body))
}

/// Extract the visible text and the same-document links from one page
fn extract_page(body: &str, page_url: &Url) -> (String, Vec<Url>) {
    let document = Html::parse_document(body);

    let mut text = String::new();
    collect_text(document.root_element(), &mut text);

    let link_selector = Selector::parse("a[href]").expect("static selector is valid");
    let mut links = Vec::new();
    for anchor in document.select(&link_selector) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let Ok(mut resolved) = page_url.join(href) else {
            continue;
        };
        resolved.set_fragment(None);
        if matches!(resolved.scheme(), "http" | "https") {
            links.push(resolved);
        }
    }

    (text.trim().to_string(), links)
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    if SKIPPED_ELEMENTS.contains(&element.value().name()) {
        return;
    }

    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                if !out.is_empty() {
                    out.push(' ');
                }
                out.push_str(trimmed);
            }
        } else if let Some(child_element) = ElementRef::wrap(child) {
            collect_text(child_element, out);
        }
    }
}
