//! Google News RSS fetcher.
//!
//! Maps a [`Topic`] to its fixed search query, issues one GET against the
//! news search feed, and extracts a bounded number of (title, link,
//! summary) records in document order. Failures never escape this module:
//! network errors, non-success statuses, and parse errors all come back as
//! an empty list so the orchestrator can fall back to another topic.

use crate::models::{NewsItem, Topic};
use crate::utils::{collapse_ws, strip_html};
use quick_xml::Reader;
use quick_xml::events::Event;
use std::error::Error;
use std::future::Future;
use std::time::Duration;
use tracing::{error, info, instrument, warn};
use url::Url;

const FEED_BASE: &str = "https://news.google.com/rss/search";
const FEED_LOCALE: &str = "hl=pt-BR&gl=BR&ceid=BR:pt-419";
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Fetches recent news items for a topic.
pub struct NewsFetcher {
    client: reqwest::Client,
}

impl NewsFetcher {
    pub fn new() -> Result<Self, Box<dyn Error>> {
        let client = reqwest::Client::builder().timeout(FETCH_TIMEOUT).build()?;
        Ok(Self { client })
    }

    /// Fetch at most `limit` items for `topic`.
    ///
    /// Errors are logged and swallowed; the caller only ever sees a
    /// possibly-empty list.
    #[instrument(level = "info", skip(self))]
    pub async fn fetch(&self, topic: Topic, limit: usize) -> Vec<NewsItem> {
        match self.try_fetch(topic, limit).await {
            Ok(items) => {
                info!(count = items.len(), topic = %topic, "Fetched news items");
                items
            }
            Err(e) => {
                error!(topic = %topic, error = %e, "News fetch failed; continuing with no items");
                Vec::new()
            }
        }
    }

    async fn try_fetch(&self, topic: Topic, limit: usize) -> Result<Vec<NewsItem>, Box<dyn Error>> {
        let url = feed_url(topic)?;
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(format!("feed returned HTTP {status}").into());
        }
        let body = response.text().await?;
        parse_feed(&body, limit)
    }
}

/// Search-feed URL for a topic.
///
/// The query's `+` separators must survive untouched; parsing through
/// `Url` percent-encodes the spaces around `OR` and leaves `+` alone.
fn feed_url(topic: Topic) -> Result<Url, url::ParseError> {
    Url::parse(&format!(
        "{}?q={}&{}",
        FEED_BASE,
        topic.query(),
        FEED_LOCALE
    ))
}

#[derive(Debug, Clone, Copy)]
enum ItemField {
    Title,
    Link,
    Description,
}

#[derive(Default)]
struct RawItem {
    title: String,
    link: String,
    description: String,
}

impl RawItem {
    fn push(&mut self, field: ItemField, text: &str) {
        let slot = match field {
            ItemField::Title => &mut self.title,
            ItemField::Link => &mut self.link,
            ItemField::Description => &mut self.description,
        };
        if !slot.is_empty() {
            slot.push(' ');
        }
        slot.push_str(text);
    }

    fn into_news_item(self) -> NewsItem {
        NewsItem {
            title: collapse_ws(&self.title),
            link: self.link.trim().to_string(),
            summary: strip_html(&self.description),
        }
    }
}

/// Parse an RSS document into at most `limit` news items, preserving
/// document order. Item descriptions are reduced to plain text.
pub fn parse_feed(xml: &str, limit: usize) -> Result<Vec<NewsItem>, Box<dyn Error>> {
    if limit == 0 {
        return Ok(Vec::new());
    }

    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut items = Vec::new();
    let mut in_item = false;
    let mut field: Option<ItemField> = None;
    let mut current = RawItem::default();

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.name().as_ref() {
                b"item" => {
                    in_item = true;
                    current = RawItem::default();
                }
                b"title" if in_item => field = Some(ItemField::Title),
                b"link" if in_item => field = Some(ItemField::Link),
                b"description" if in_item => field = Some(ItemField::Description),
                _ => {}
            },
            Event::Text(t) => {
                if in_item {
                    if let Some(f) = field {
                        current.push(f, &t.unescape()?);
                    }
                }
            }
            Event::CData(t) => {
                if in_item {
                    if let Some(f) = field {
                        current.push(f, &String::from_utf8_lossy(&t.into_inner()));
                    }
                }
            }
            Event::End(e) => match e.name().as_ref() {
                b"item" => {
                    in_item = false;
                    items.push(std::mem::take(&mut current).into_news_item());
                    if items.len() >= limit {
                        break;
                    }
                }
                b"title" | b"link" | b"description" => field = None,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(items)
}

/// Fetch news for `first`, falling back to one other randomly chosen topic
/// if the first yields nothing. Never fetches a third time.
#[instrument(level = "info", skip(rng, fetch))]
pub async fn fetch_with_fallback<R, F, Fut>(
    rng: &mut R,
    first: Topic,
    fetch: F,
) -> (Topic, Vec<NewsItem>)
where
    R: rand::Rng + ?Sized,
    F: Fn(Topic) -> Fut,
    Fut: Future<Output = Vec<NewsItem>>,
{
    let items = fetch(first).await;
    if !items.is_empty() {
        return (first, items);
    }

    let fallback = Topic::pick_other(rng, first);
    warn!(first = %first, fallback = %fallback, "No news for the chosen topic; trying another");
    let items = fetch(fallback).await;
    (fallback, items)
}
