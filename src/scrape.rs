use std::sync::LazyLock;
use std::time::Duration;

use encoding_rs::{Encoding, UTF_8};
use regex::Regex;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::parser::{self, PriceRecord, DEFAULT_UNIT};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// How much of the body to search for a `<meta charset>` declaration.
const CHARSET_SNIFF_BYTES: usize = 1024;

static CHARSET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)charset\s*=\s*["']?([a-z0-9_.:-]+)"#).unwrap());

/// Fetches the market price page and turns it into price records.
///
/// One GET per call, no retries. A 404 from the source or a table with no
/// matching rows degrades to [`mock_prices`]; network failures and other
/// error statuses are reported as [`Error::ServiceUnavailable`].
#[derive(Clone)]
pub struct PageScraper {
    client: reqwest::Client,
    url: String,
}

impl PageScraper {
    pub fn new(url: impl Into<String>, timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn fetch_prices(&self) -> Result<Vec<PriceRecord>> {
        info!("Fetching price page: {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| self.unavailable(e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            warn!("Price page returned 404, serving mock prices");
            return Ok(mock_prices());
        }
        if !status.is_success() {
            return Err(Error::ServiceUnavailable(format!(
                "{} returned HTTP {}",
                self.url, status
            )));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await.map_err(|e| self.unavailable(e))?;
        let body = decode_body(content_type.as_deref(), &bytes);
        let records = parser::extract_price_records(&body)?;

        if records.is_empty() {
            warn!("No orange rows in price table, serving mock prices");
            return Ok(mock_prices());
        }

        info!("Scraped {} orange price rows", records.len());
        Ok(records)
    }

    fn unavailable(&self, e: reqwest::Error) -> Error {
        Error::ServiceUnavailable(format!("Failed to fetch data from {}: {}", self.url, e))
    }
}

/// Decode a page using the Content-Type charset, else the `<meta charset>`
/// near the top of the document, else UTF-8. A BOM overrides both.
fn decode_body(content_type: Option<&str>, bytes: &[u8]) -> String {
    let head = &bytes[..bytes.len().min(CHARSET_SNIFF_BYTES)];
    let head = String::from_utf8_lossy(head);

    let encoding = content_type
        .and_then(charset_label)
        .or_else(|| charset_label(&head))
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .unwrap_or(UTF_8);
    debug!("Decoding price page as {}", encoding.name());

    let (text, _, _) = encoding.decode(bytes);
    text.into_owned()
}

fn charset_label(s: &str) -> Option<&str> {
    CHARSET.captures(s).and_then(|c| c.get(1)).map(|m| m.as_str())
}

/// Fixed fallback dataset: three varieties × grades A and B.
pub fn mock_prices() -> Vec<PriceRecord> {
    const MOCK: &[(&str, &str, f64, f64)] = &[
        ("ส้มแมนดาริน", "เกรด A", 45.0, 60.0),
        ("ส้มแมนดาริน", "เกรด B", 35.0, 45.0),
        ("ส้มเขียวหวาน", "เกรด A", 35.0, 50.0),
        ("ส้มเขียวหวาน", "เกรด B", 25.0, 35.0),
        ("ส้มสายน้ำผึ้ง", "เกรด A", 40.0, 55.0),
        ("ส้มสายน้ำผึ้ง", "เกรด B", 30.0, 40.0),
    ];

    MOCK.iter()
        .map(|&(name, grade, price_min, price_max)| PriceRecord {
            name: name.to_string(),
            grade: grade.to_string(),
            price_min,
            price_max,
            unit: DEFAULT_UNIT.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{
        closed_port_url, fixture, serve_page, serve_page_recording_user_agent, serve_status,
    };
    use encoding_rs::WINDOWS_874;
    use axum::http::StatusCode as Status;

    fn scraper(url: String) -> PageScraper {
        PageScraper::new(url, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn scrapes_matching_rows() {
        let url = serve_page(Status::OK, fixture("market_prices")).await;
        let records = scraper(url).fetch_prices().await.unwrap();
        assert_eq!(records.len(), 4);
        assert_ne!(records, mock_prices());
        assert_eq!(records[0].name, "ส้มแมนดาริน");
        assert_eq!((records[0].price_min, records[0].price_max), (48.0, 62.0));
    }

    #[tokio::test]
    async fn not_found_serves_mock() {
        let url = serve_status(Status::NOT_FOUND).await;
        let records = scraper(url).fetch_prices().await.unwrap();
        assert_eq!(records, mock_prices());
        assert_eq!(records.len(), 6);
    }

    #[tokio::test]
    async fn no_matching_rows_serves_mock() {
        let url = serve_page(Status::OK, fixture("no_oranges")).await;
        let records = scraper(url).fetch_prices().await.unwrap();
        assert_eq!(records, mock_prices());
    }

    #[tokio::test]
    async fn missing_table_is_data_not_found() {
        let url = serve_page(Status::OK, "<html><body>closed</body></html>".to_string()).await;
        let err = scraper(url).fetch_prices().await.unwrap_err();
        assert!(matches!(err, Error::DataNotFound));
    }

    #[tokio::test]
    async fn server_error_is_unavailable() {
        let url = serve_status(Status::INTERNAL_SERVER_ERROR).await;
        let err = scraper(url).fetch_prices().await.unwrap_err();
        assert!(matches!(err, Error::ServiceUnavailable(_)));
    }

    #[tokio::test]
    async fn connection_failure_is_unavailable_not_mock() {
        let url = closed_port_url().await;
        let err = scraper(url).fetch_prices().await.unwrap_err();
        assert!(matches!(err, Error::ServiceUnavailable(_)));
    }

    #[tokio::test]
    async fn sends_browser_user_agent() {
        let (url, seen) = serve_page_recording_user_agent(fixture("market_prices")).await;
        scraper(url).fetch_prices().await.unwrap();
        let agent = seen.lock().unwrap().clone().unwrap();
        assert_eq!(agent, USER_AGENT);
    }

    fn thai_874(html: &str) -> Vec<u8> {
        let (bytes, _, unmappable) = WINDOWS_874.encode(html);
        assert!(!unmappable);
        bytes.into_owned()
    }

    #[test]
    fn decodes_meta_charset() {
        let html = r#"<html><head><meta charset="TIS-620"></head>
            <body><table><tr><td>ส้มแมนดาริน</td></tr></table></body></html>"#;
        let text = decode_body(Some("text/html"), &thai_874(html));
        assert!(text.contains("ส้มแมนดาริน"));
    }

    #[test]
    fn decodes_http_equiv_charset() {
        let html = r#"<meta http-equiv="Content-Type" content="text/html; charset=windows-874">
            <p>ส้มเขียวหวาน</p>"#;
        let text = decode_body(None, &thai_874(html));
        assert!(text.contains("ส้มเขียวหวาน"));
    }

    #[test]
    fn header_charset_wins_over_meta() {
        let html = r#"<meta charset="utf-8"><p>ส้มสายน้ำผึ้ง</p>"#;
        let text = decode_body(Some("text/html; charset=windows-874"), &thai_874(html));
        assert!(text.contains("ส้มสายน้ำผึ้ง"));
    }

    #[test]
    fn defaults_to_utf8() {
        let text = decode_body(None, "<p>ส้มแมนดาริน</p>".as_bytes());
        assert_eq!(text, "<p>ส้มแมนดาริน</p>");
    }

    #[test]
    fn mock_covers_three_varieties_two_grades() {
        let mock = mock_prices();
        assert_eq!(mock.len(), 6);
        for kw in crate::parser::filter::ORANGE_KEYWORDS {
            let grades: Vec<&str> = mock
                .iter()
                .filter(|r| r.name.contains(kw))
                .map(|r| r.grade.as_str())
                .collect();
            assert_eq!(grades, vec!["เกรด A", "เกรด B"]);
        }
        assert!(mock.iter().all(|r| r.price_min <= r.price_max && r.unit == "กก."));
    }
}
