//! Page text extraction.
//!
//! HTML pages are reduced to a single whitespace-collapsed line made of
//! metadata, the first JSON-LD block, the main content region, heading
//! structure, list items, and up to two tables. Paragraphs are only added
//! when the rest came out short.

use localseek_core::FetchError;
use scraper::{ElementRef, Html, Selector};

/// JSON-LD blocks are cut to this many characters.
const MAX_STRUCTURED_CHARS: usize = 500;

/// Below this length the paragraph text of the page is appended.
const MIN_MAIN_CONTENT_CHARS: usize = 100;

const MAX_TABLES: usize = 2;

/// Extract plain text from a fetched body according to its content type.
pub fn extract_text(url: &str, content_type: &str, body: &str) -> Result<String, FetchError> {
    let content_type = content_type.to_ascii_lowercase();

    let text = if content_type.contains("text/html") {
        html_to_text(body)
    } else if content_type.contains("application/json") {
        let value: serde_json::Value =
            serde_json::from_str(body).map_err(|e| FetchError::Parse {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        serde_json::to_string_pretty(&value).map_err(|e| FetchError::Parse {
            url: url.to_string(),
            reason: e.to_string(),
        })?
    } else if content_type.contains("text/") {
        body.to_string()
    } else {
        return Err(FetchError::UnsupportedContent {
            url: url.to_string(),
            content_type,
        });
    };

    if text.trim().is_empty() {
        return Err(FetchError::NoContent(url.to_string()));
    }
    Ok(text)
}

/// Reduce an HTML document to searchable text.
pub fn html_to_text(html: &str) -> String {
    let doc = Html::parse_document(html);
    let mut sections: Vec<String> = Vec::new();

    let metadata = page_metadata(&doc);
    if !metadata.is_empty() {
        sections.push(format!("METADATA: {}", metadata.join(" | ")));
    }

    if let Some(structured) = first_structured_data(&doc) {
        sections.push(format!("STRUCTURED DATA: {structured}"));
    }

    let mut extracted: Vec<String> = Vec::new();

    if let Some(main) = main_content(&doc) {
        let text = element_text(main);
        if !text.is_empty() {
            extracted.push(text);
        }
    }

    let headings: Vec<String> = select_all(&doc, "h1, h2, h3")
        .filter_map(|h| {
            let text = element_text(h);
            (!text.is_empty()).then(|| format!("{}: {text}", h.value().name()))
        })
        .collect();
    if !headings.is_empty() {
        extracted.push(format!("Document Structure: {}", headings.join(" | ")));
    }

    if extracted.join(" ").chars().count() < MIN_MAIN_CONTENT_CHARS {
        let paragraphs: Vec<String> = select_all(&doc, "p").map(element_text).collect();
        if !paragraphs.is_empty() {
            extracted.push(paragraphs.join(" "));
        }
    }

    let lists: Vec<String> = select_all(&doc, "ul, ol")
        .filter_map(|list| {
            let items: Vec<String> = select_within(list, "li")
                .map(|li| format!("\u{2022} {}", element_text(li)))
                .collect();
            (!items.is_empty()).then(|| items.join(" "))
        })
        .collect();
    if !lists.is_empty() {
        extracted.push(lists.join(" "));
    }

    let rows: Vec<String> = select_all(&doc, "table")
        .take(MAX_TABLES)
        .flat_map(|table| select_within(table, "tr").collect::<Vec<_>>())
        .filter_map(|row| {
            let cells: Vec<String> = select_within(row, "td, th").map(element_text).collect();
            (!cells.is_empty()).then(|| cells.join(" | "))
        })
        .collect();
    if !rows.is_empty() {
        extracted.push(format!("Table Content: {}", rows.join(" / ")));
    }

    sections.extend(extracted);
    collapse_whitespace(&sections.join(" "))
}

/// `<title>` and `<meta name="description">` of a document.
pub(crate) fn page_metadata(doc: &Html) -> Vec<String> {
    let mut metadata = Vec::new();
    if let Some(title) = page_title(doc) {
        metadata.push(format!("Title: {title}"));
    }
    if let Some(description) = meta_description(doc) {
        metadata.push(format!("Description: {description}"));
    }
    metadata
}

pub(crate) fn page_title(doc: &Html) -> Option<String> {
    select_all(doc, "title")
        .next()
        .map(element_text)
        .filter(|t| !t.is_empty())
}

pub(crate) fn meta_description(doc: &Html) -> Option<String> {
    select_all(doc, r#"meta[name="description"]"#)
        .next()
        .and_then(|m| m.value().attr("content"))
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(String::from)
}

fn first_structured_data(doc: &Html) -> Option<String> {
    select_all(doc, r#"script[type="application/ld+json"]"#).find_map(|script| {
        let raw: String = script.text().collect();
        let value: serde_json::Value = serde_json::from_str(raw.trim()).ok()?;
        let pretty = serde_json::to_string_pretty(&value).ok()?;
        Some(pretty.chars().take(MAX_STRUCTURED_CHARS).collect())
    })
}

fn main_content(doc: &Html) -> Option<ElementRef<'_>> {
    ["article", "main", "div.content, div.main-content, div.post, div.article"]
        .into_iter()
        .find_map(|sel| select_all(doc, sel).next())
}

fn select_all<'a>(doc: &'a Html, selector: &str) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    let selector = Selector::parse(selector).ok();
    selector
        .into_iter()
        .flat_map(move |sel| doc.select(&sel).collect::<Vec<_>>())
}

fn select_within<'a>(
    el: ElementRef<'a>,
    selector: &str,
) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    let selector = Selector::parse(selector).ok();
    selector
        .into_iter()
        .flat_map(move |sel| el.select(&sel).collect::<Vec<_>>())
}

/// Text nodes of an element, trimmed and space-joined.
fn element_text(el: ElementRef<'_>) -> String {
    el.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
