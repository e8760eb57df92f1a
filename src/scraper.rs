use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;

use chrono::{DateTime, NaiveDate};
use regex::Regex;
use reqwest::Client;
use select::document::Document;
use select::predicate::{Attr, Name, Predicate};
use tracing::{debug, info, warn};
use url::Url;

use crate::config::Config;
use crate::error::{Error, Result};

const PIN_PATH_MARKER: &str = "/pin/";

/// What a single pin page tells us.
#[derive(Debug, Clone, PartialEq)]
pub struct PinPage {
    pub url: String,
    pub image_url: Option<String>,
    pub created_at: Option<NaiveDate>,
}

pub struct Scraper {
    client: Client,
    board_url: Url,
    max_pins: usize,
    max_polls: usize,
    page_source_path: Option<PathBuf>,
}

impl Scraper {
    pub fn new(config: &Config) -> Result<Self> {
        let client = build_client(config)?;
        Ok(Self {
            client,
            board_url: Url::parse(&config.board_url)?,
            max_pins: config.max_pins,
            max_polls: config.max_polls,
            page_source_path: config.page_source_path.clone(),
        })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Opens up to `max_pins` distinct pins linked from the board.
    ///
    /// The board is re-fetched (at most `max_polls` times) until enough pins
    /// have been opened or a fetch turns up nothing new. A pin that fails to
    /// load is logged and skipped. Only a failed first board fetch is an
    /// error; later ones end polling with the pins opened so far.
    pub async fn scrape_board(&self) -> Result<Vec<PinPage>> {
        let mut seen = HashSet::new();
        let mut pins = Vec::new();

        for poll in 1..=self.max_polls {
            info!(poll, board = %self.board_url, "Scraping board");

            let html = match self.fetch_html(self.board_url.as_str()).await {
                Ok(html) => html,
                Err(err) if poll == 1 => return Err(err),
                Err(err) => {
                    warn!(poll, error = %err, "Failed to fetch board, keeping pins found so far");
                    break;
                }
            };

            let fresh: Vec<String> = parse_pin_links(&html, &self.board_url)
                .into_iter()
                .filter(|link| seen.insert(link.clone()))
                .collect();

            if fresh.is_empty() {
                info!(poll, "No new pins on board");
                break;
            }

            for link in fresh {
                if pins.len() >= self.max_pins {
                    break;
                }
                match self.fetch_pin(&link).await {
                    Ok(pin) => pins.push(pin),
                    Err(err) => warn!(pin = %link, error = %err, "Failed to open pin"),
                }
            }

            if pins.len() >= self.max_pins {
                break;
            }
        }

        if pins.len() < self.max_pins {
            warn!(opened = pins.len(), wanted = self.max_pins, "Board ran out of pins");
        }

        Ok(pins)
    }

    pub async fn fetch_pin(&self, url: &str) -> Result<PinPage> {
        let html = self.fetch_html(url).await?;

        if let Some(path) = &self.page_source_path {
            tokio::fs::write(path, &html).await?;
            debug!(path = %path.display(), "Saved pin page source");
        }

        let pin = parse_pin_page(url, &html);
        info!(
            pin = %pin.url,
            image = pin.image_url.as_deref().unwrap_or("-"),
            created_at = ?pin.created_at,
            "Opened pin"
        );
        Ok(pin)
    }

    async fn fetch_html(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(Error::HttpStatus {
                url: url.to_owned(),
                status: response.status(),
            });
        }
        Ok(response.text().await?)
    }
}

pub fn build_client(config: &Config) -> Result<Client> {
    Ok(Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .build()?)
}

/// Absolute pin URLs linked from `html`, first occurrence order, without
/// query strings or fragments.
pub fn parse_pin_links(html: &str, base: &Url) -> Vec<String> {
    let document = Document::from(html);
    let mut seen = HashSet::new();

    document
        .find(Name("a"))
        .filter_map(|n| n.attr("href"))
        .filter(|href| href.contains(PIN_PATH_MARKER))
        .filter_map(|href| base.join(href).ok())
        .map(|mut url| {
            url.set_query(None);
            url.set_fragment(None);
            url.to_string()
        })
        .filter(|url| seen.insert(url.clone()))
        .collect()
}

pub fn parse_pin_page(url: &str, html: &str) -> PinPage {
    let document = Document::from(html);

    let og_image = document
        .find(Name("meta").and(Attr("property", "og:image")))
        .filter_map(|n| n.attr("content"))
        .find(|c| !c.trim().is_empty());

    let image_url = og_image
        .or_else(|| {
            document
                .find(Name("img"))
                .filter_map(|n| n.attr("src"))
                .find(|src| src.contains("pinimg.com"))
        })
        .or_else(|| document.find(Name("img")).filter_map(|n| n.attr("src")).next())
        .map(|src| resolve_against(url, src.trim()));

    PinPage {
        url: url.to_owned(),
        image_url,
        created_at: find_created_at(html),
    }
}

/// Absolute form of `src` relative to the page it came from, or `src` as-is
/// when either side does not parse.
fn resolve_against(page_url: &str, src: &str) -> String {
    Url::parse(page_url)
        .and_then(|base| base.join(src))
        .map(String::from)
        .unwrap_or_else(|_| src.to_owned())
}

fn created_at_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#""created_at"\s*:\s*"([^"]+)""#).expect("created_at pattern is valid")
    })
}

fn find_created_at(html: &str) -> Option<NaiveDate> {
    created_at_pattern()
        .captures_iter(html)
        .filter_map(|caps| parse_timestamp(&caps[1]))
        .next()
}

/// Accepts RFC 2822 (`Mon, 14 Mar 2022 18:23:11 +0000`) or RFC 3339.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .map(|dt| dt.date_naive())
        .ok()
}
