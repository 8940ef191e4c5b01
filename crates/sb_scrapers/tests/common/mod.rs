// Shared helpers for the pipeline integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use sb_core::{Error, PageResponse, PageSource, Result};
use sb_scrapers::{RetryConfig, ScraperConfig, StaatsbladScraper};

pub const BASE: &str = "https://staatsbladmonitor.be";

pub const FULL: &str = include_str!("../fixtures/full.html");
pub const SINGLE_REVENUE: &str = include_str!("../fixtures/single_revenue.html");
pub const NO_FINANCIAL: &str = include_str!("../fixtures/no_financial.html");
pub const NOT_FOUND: &str = include_str!("../fixtures/not_found.html");
pub const SEARCH_WITH_LINKS: &str = include_str!("../fixtures/search_with_links.html");
pub const FINANCIAL_PAGE: &str = include_str!("../fixtures/financial_page.html");
pub const PUBLICATIONS_PAGE: &str = include_str!("../fixtures/publications_page.html");
pub const DIRECTORS_PAGE: &str = include_str!("../fixtures/directors_page.html");

#[derive(Debug, Clone)]
pub enum Answer {
    Status(u16, String),
    Fail(String),
}

pub fn ok(body: &str) -> Answer {
    Answer::Status(200, body.to_string())
}

/// Page source answering from a per-URL script. The last answer for a URL repeats.
#[derive(Default)]
pub struct MockSource {
    script: Mutex<HashMap<String, Vec<Answer>>>,
    calls: AtomicUsize,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(self, url: impl Into<String>, answers: Vec<Answer>) -> Self {
        self.script.lock().unwrap().insert(url.into(), answers);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageSource for MockSource {
    async fn get(&self, url: &str) -> Result<PageResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let answer = {
            let mut script = self.script.lock().unwrap();
            let answers = script
                .get_mut(url)
                .ok_or_else(|| Error::Transport(format!("no route to {}", url)))?;
            if answers.len() > 1 {
                answers.remove(0)
            } else {
                answers[0].clone()
            }
        };
        match answer {
            Answer::Status(status, body) => Ok(PageResponse { status, body }),
            Answer::Fail(message) => Err(Error::Transport(message)),
        }
    }
}

pub fn search_url(number: &str) -> String {
    format!("{}/bedrijfsfiche.html?ondernemingsnummer={}", BASE, number)
}

pub fn detail_url(page: &str, number: &str) -> String {
    format!("{}/{}.html?ondernemingsnummer={}", BASE, page, number)
}

pub fn test_config(max_retries: u32) -> ScraperConfig {
    ScraperConfig::default()
        .with_base_url(BASE)
        .with_retry(RetryConfig {
            max_retries,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
        })
}

pub fn scraper(source: Arc<MockSource>) -> StaatsbladScraper {
    StaatsbladScraper::with_source(source, test_config(2))
}

pub fn messages(issues: &[sb_core::Warning]) -> Vec<String> {
    issues.iter().map(|w| w.message.clone()).collect()
}
