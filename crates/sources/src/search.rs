//! DuckDuckGo HTML search result parsing.

use percent_encoding::percent_decode_str;
use scraper::{Html, Selector};

/// Pull result URLs out of a DuckDuckGo HTML results page.
///
/// Redirect links are unwrapped, ads and non-http links are dropped, and
/// duplicates are removed. At most `max_results` URLs are returned, in
/// page order.
pub fn parse_results(html: &str, max_results: usize) -> Vec<String> {
    let doc = Html::parse_document(html);
    let Ok(link_sel) = Selector::parse(".result a.result__a") else {
        return Vec::new();
    };

    let mut urls: Vec<String> = Vec::new();
    for link in doc.select(&link_sel) {
        if urls.len() >= max_results {
            break;
        }
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        let url = extract_ddg_url(href);
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            continue;
        }
        if url.contains("duckduckgo.com/y.js") || urls.contains(&url) {
            continue;
        }
        urls.push(url);
    }
    urls
}

/// DDG wraps result URLs in redirect links like
/// `//duckduckgo.com/l/?uddg=https%3A%2F%2Fexample.com&rut=...`.
/// Extract and percent-decode the actual destination URL.
pub fn extract_ddg_url(href: &str) -> String {
    if let Some(pos) = href.find("uddg=") {
        let start = pos + 5;
        let end = href[start..]
            .find('&')
            .map(|i| start + i)
            .unwrap_or(href.len());
        let encoded = &href[start..end];
        if !encoded.is_empty() {
            return percent_decode_str(encoded).decode_utf8_lossy().into_owned();
        }
    }
    href.to_string()
}
