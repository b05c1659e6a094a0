//! `Crawler` (spec §4.3): fetches a reference URL and returns its plain
//! text. Backs the reference cache (C6) — a fetch failure here degrades the
//! caller to a summary-only analysis rather than failing the whole request.

use crate::retry::{with_retry, AdapterError};
use async_trait::async_trait;
use scraper::{Html, Selector};

#[derive(Debug, Clone)]
pub struct CrawlResult {
    pub full_text: String,
    pub char_count: usize,
}

#[async_trait]
pub trait Crawler: Send + Sync {
    async fn fetch_text(&self, url: &str) -> Result<CrawlResult, AdapterError>;
}

/// Fetches over HTTP and extracts text by content-type: `scraper` for HTML
/// (stripping script/style, concatenating visible text nodes) and `lopdf`
/// for `application/pdf` (same string-object extraction this codebase's PDF
/// parser uses, adapted to parse an in-memory buffer instead of a path).
pub struct HttpCrawler {
    client: reqwest::Client,
}

impl Default for HttpCrawler {
    fn default() -> Self {
        Self { client: crate::http::client() }
    }
}

impl HttpCrawler {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Crawler for HttpCrawler {
    async fn fetch_text(&self, url: &str) -> Result<CrawlResult, AdapterError> {
        let url = url.to_string();
        let (content_type, bytes) = with_retry("crawler_fetch", || async {
            let resp = self.client.get(&url).send().await.map_err(crate::http::map_reqwest_err)?;
            let resp = crate::http::check_status(resp).await?;
            let content_type = resp
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .to_string();
            let bytes = resp.bytes().await.map_err(crate::http::map_reqwest_err)?;
            Ok((content_type, bytes))
        })
        .await?;

        let full_text = if content_type.contains("pdf") {
            extract_pdf_text(&bytes)?
        } else {
            extract_html_text(&String::from_utf8_lossy(&bytes))
        };

        Ok(CrawlResult { char_count: full_text.chars().count(), full_text })
    }
}

fn extract_html_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let skip = Selector::parse("script, style, noscript").unwrap();
    let skip_ids: std::collections::HashSet<_> = document.select(&skip).map(|e| e.id()).collect();

    let body_selector = Selector::parse("body").unwrap();
    let root = document.select(&body_selector).next().unwrap_or_else(|| document.root_element());

    let mut text = String::new();
    for node in root.descendants() {
        if node.ancestors().any(|ancestor| skip_ids.contains(&ancestor.id())) {
            continue;
        }
        if let scraper::Node::Text(t) = node.value() {
            text.push_str(t);
            text.push(' ');
        }
    }
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn extract_pdf_text(bytes: &[u8]) -> Result<String, AdapterError> {
    let doc = lopdf::Document::load_mem(bytes)
        .map_err(|e| AdapterError::BadRequest(format!("unreadable PDF: {e}")))?;

    let mut full_text = String::new();
    for (_page_num, page_id) in doc.get_pages() {
        let Ok(content_bytes) = doc.get_page_content(page_id) else { continue };
        let Ok(content) = lopdf::content::Content::decode(&content_bytes) else { continue };
        for op in content.operations {
            if op.operator != "Tj" && op.operator != "TJ" {
                continue;
            }
            for operand in &op.operands {
                match operand {
                    lopdf::Object::String(bytes, _) => {
                        if let Ok(text) = String::from_utf8(bytes.clone()) {
                            full_text.push_str(&text);
                        }
                    }
                    lopdf::Object::Array(items) => {
                        for item in items {
                            if let lopdf::Object::String(bytes, _) = item {
                                if let Ok(text) = String::from_utf8(bytes.clone()) {
                                    full_text.push_str(&text);
                                }
                            }
                        }
                    }
                    _ => {}
                }
            }
            full_text.push(' ');
        }
    }
    Ok(full_text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_script_and_collapses_whitespace() {
        let html = "<html><body><script>evil()</script><p>Hello   world</p></body></html>";
        let text = extract_html_text(html);
        assert_eq!(text, "Hello world");
    }
}
