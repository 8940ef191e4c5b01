use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use lazy_static::lazy_static;
use regex::Regex;
use scraper::Html;
use sb_core::{CompanyNumber, Error, PageResponse, PageSource, Result, Section, Warning};
use url::Url;

use crate::config::ScraperConfig;
use crate::logging::Logger;
use crate::parsers::identity::has_identity_block;
use crate::parsers::{default_base, page_base, LINK};

lazy_static! {
    static ref NOT_FOUND: Regex = Regex::new(
        r"(?i)geen (onderneming|resultaten?) gevonden|onderneming niet gevonden|aucune entreprise trouvée|no company found|company not found"
    )
    .unwrap();
    static ref FINANCIAL_LINK: Regex =
        Regex::new(r"(?i)jaarrekening|financieel|financial|kerncijfers").unwrap();
    static ref PUBLICATIONS_LINK: Regex = Regex::new(r"(?i)publicaties|publications").unwrap();
    static ref DIRECTORS_LINK: Regex =
        Regex::new(r"(?i)bestuurders|mandatarissen|directors").unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPage {
    pub url: String,
    pub body: String,
}

/// Every page retrieved for one company, plus warnings about pages that could not be fetched.
#[derive(Debug, Clone)]
pub struct RawPageBundle {
    pub company_number: CompanyNumber,
    pub retrieved_at: DateTime<Utc>,
    pub search: RawPage,
    pub financial: Option<RawPage>,
    pub publications: Option<RawPage>,
    pub directors: Option<RawPage>,
    pub warnings: Vec<Warning>,
}

impl RawPageBundle {
    /// Page a section parser should read: its detail page when one was fetched, the
    /// search page otherwise.
    pub fn content_for(&self, section: Section) -> &RawPage {
        let detail = match section {
            Section::Identity => None,
            Section::Financial => self.financial.as_ref(),
            Section::Publications => self.publications.as_ref(),
            Section::Directors => self.directors.as_ref(),
        };
        detail.unwrap_or(&self.search)
    }

    fn set(&mut self, section: Section, page: RawPage) {
        match section {
            Section::Identity => self.search = page,
            Section::Financial => self.financial = Some(page),
            Section::Publications => self.publications = Some(page),
            Section::Directors => self.directors = Some(page),
        }
    }
}

/// [`PageSource`] backed by a `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpPageSource {
    client: reqwest::Client,
}

impl HttpPageSource {
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| Error::Config(format!("cannot build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    async fn get(&self, url: &str) -> Result<PageResponse> {
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(PageResponse { status, body })
    }
}

/// Retrieves the registry pages for a company.
///
/// Owns its page source; create one and reuse it for as many lookups as needed.
pub struct Fetcher {
    source: Arc<dyn PageSource>,
    config: ScraperConfig,
    logger: Logger,
}

impl Fetcher {
    pub fn new(config: ScraperConfig) -> Result<Self> {
        let source = Arc::new(HttpPageSource::new(&config)?);
        Ok(Self::with_source(source, config))
    }

    pub fn with_source(source: Arc<dyn PageSource>, config: ScraperConfig) -> Self {
        Self {
            source,
            config,
            logger: Logger::new().with_prefix("[fetcher]"),
        }
    }

    pub fn search_url(&self, number: &CompanyNumber) -> String {
        format!(
            "{}/bedrijfsfiche.html?ondernemingsnummer={}",
            self.config.base_url.trim_end_matches('/'),
            number.as_str()
        )
    }

    /// Fetches the company's search page, then any detail pages it links to.
    ///
    /// Fails only when the search page itself cannot be retrieved or reports that the
    /// company does not exist; a detail page that fails becomes a warning.
    pub async fn fetch(&self, number: &CompanyNumber) -> Result<RawPageBundle> {
        let url = self.search_url(number);
        let body = self.get_with_retry(&url).await?;
        if is_not_found_page(&body) {
            return Err(Error::NotFound(format!(
                "no company registered under {}",
                number.formatted()
            )));
        }

        let links = detail_links(&body, &url);
        let mut bundle = RawPageBundle {
            company_number: number.clone(),
            retrieved_at: Utc::now(),
            search: RawPage { url, body },
            financial: None,
            publications: None,
            directors: None,
            warnings: Vec::new(),
        };

        let fetches = links.into_iter().map(|(section, url)| async move {
            let result = self.get_with_retry(&url).await;
            (section, url, result)
        });
        for (section, url, result) in join_all(fetches).await {
            match result {
                Ok(body) => bundle.set(section, RawPage { url, body }),
                Err(e) => {
                    let warning =
                        Warning::new(section, format!("{} detail page unavailable: {}", section, e));
                    self.logger.section_warning(&warning);
                    bundle.warnings.push(warning);
                }
            }
        }

        Ok(bundle)
    }

    /// GET with bounded retries and exponential backoff.
    ///
    /// 5xx answers and transport failures are retried; 404 is `NotFound` straight away and
    /// any other non-success status is a `Network` error without retry.
    pub async fn get_with_retry(&self, url: &str) -> Result<String> {
        let retry = &self.config.retry;
        let max_attempts = retry.max_retries.saturating_add(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            self.logger.debug(&format!("GET {} (attempt {}/{})", url, attempt, max_attempts));
            let failure = match self.source.get(url).await {
                Ok(response) if response.is_success() => return Ok(response.body),
                Ok(response) if response.status == 404 => {
                    return Err(Error::NotFound(format!("{} answered 404", url)));
                }
                Ok(response) if response.is_server_error() => format!("HTTP {} from {}", response.status, url),
                Ok(response) => {
                    return Err(Error::Network {
                        attempts: attempt,
                        message: format!("HTTP {} from {}", response.status, url),
                    });
                }
                Err(e) if e.is_retryable() => e.to_string(),
                Err(e) => {
                    return Err(Error::Network {
                        attempts: attempt,
                        message: e.to_string(),
                    });
                }
            };

            if attempt >= max_attempts {
                return Err(Error::Network {
                    attempts: attempt,
                    message: failure,
                });
            }

            let delay = retry.delay_for(attempt);
            self.logger.warn(&format!(
                "attempt {}/{} failed ({}), retrying in {:?}",
                attempt, max_attempts, failure, delay
            ));
            tokio::time::sleep(delay).await;
        }
    }
}

/// A "no company found" message on a page without any identity block.
fn is_not_found_page(body: &str) -> bool {
    NOT_FOUND.is_match(body) && !has_identity_block(&Html::parse_document(body))
}

/// Links on the search page pointing at the financial, publications and directors pages.
fn detail_links(body: &str, page_url: &str) -> Vec<(Section, String)> {
    let document = Html::parse_document(body);
    let fallback = Url::parse(page_url).unwrap_or_else(|_| default_base());
    let base = page_base(&document, &fallback);
    let mut links: Vec<(Section, String)> = Vec::new();

    for anchor in document.select(&LINK) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        if href.starts_with('#') {
            continue;
        }
        let Ok(url) = base.join(href) else {
            continue;
        };
        let Some(segment) = url.path_segments().and_then(|mut s| s.next_back()) else {
            continue;
        };
        if segment.to_lowercase().ends_with(".pdf") {
            continue;
        }

        let section = if FINANCIAL_LINK.is_match(segment) {
            Section::Financial
        } else if PUBLICATIONS_LINK.is_match(segment) {
            Section::Publications
        } else if DIRECTORS_LINK.is_match(segment) {
            Section::Directors
        } else {
            continue;
        };
        let url = url.to_string();
        if url != page_url && !links.iter().any(|(s, _)| *s == section) {
            links.push((section, url));
        }
    }

    links
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use crate::config::RetryConfig;

    /// Answers each URL from a script; the last scripted answer repeats.
    struct ScriptedSource {
        script: Mutex<HashMap<String, Vec<Result<PageResponse>>>>,
        calls: AtomicUsize,
    }

    impl ScriptedSource {
        fn new(entries: Vec<(&str, Vec<Result<PageResponse>>)>) -> Self {
            Self {
                script: Mutex::new(
                    entries
                        .into_iter()
                        .map(|(url, answers)| (url.to_string(), answers))
                        .collect(),
                ),
                calls: AtomicUsize::new(0),
            }
        }
    }

    fn status(code: u16, body: &str) -> Result<PageResponse> {
        Ok(PageResponse {
            status: code,
            body: body.to_string(),
        })
    }

    #[async_trait]
    impl PageSource for ScriptedSource {
        async fn get(&self, url: &str) -> Result<PageResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut script = self.script.lock().unwrap();
            let answers = script
                .get_mut(url)
                .ok_or_else(|| Error::Transport(format!("unscripted url {}", url)))?;
            if answers.len() > 1 {
                answers.remove(0)
            } else {
                match &answers[0] {
                    Ok(response) => Ok(response.clone()),
                    Err(e) => Err(Error::Transport(e.to_string())),
                }
            }
        }
    }

    fn config(max_retries: u32) -> ScraperConfig {
        ScraperConfig::default().with_retry(RetryConfig {
            max_retries,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
        })
    }

    const SEARCH: &str = "https://staatsbladmonitor.be/bedrijfsfiche.html?ondernemingsnummer=0403200393";

    fn number() -> CompanyNumber {
        CompanyNumber::parse("0403200393").unwrap()
    }

    #[test]
    fn test_search_url() {
        let fetcher = Fetcher::with_source(
            Arc::new(ScriptedSource::new(vec![])),
            ScraperConfig::default().with_base_url("http://localhost:9000/"),
        );
        assert_eq!(
            fetcher.search_url(&number()),
            "http://localhost:9000/bedrijfsfiche.html?ondernemingsnummer=0403200393"
        );
    }

    #[tokio::test]
    async fn test_retries_server_errors_then_succeeds() {
        let source = Arc::new(ScriptedSource::new(vec![(
            SEARCH,
            vec![status(503, ""), status(502, ""), status(200, "<h1>OK</h1>")],
        )]));
        let fetcher = Fetcher::with_source(source.clone(), config(3));

        let bundle = fetcher.fetch(&number()).await.unwrap();
        assert_eq!(bundle.search.body, "<h1>OK</h1>");
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let source = Arc::new(ScriptedSource::new(vec![(
            SEARCH,
            vec![Err(Error::Transport("connection reset".into()))],
        )]));
        let fetcher = Fetcher::with_source(source.clone(), config(2));

        let err = fetcher.fetch(&number()).await.unwrap_err();
        assert!(matches!(err, Error::Network { attempts: 3, .. }), "{:?}", err);
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let source = Arc::new(ScriptedSource::new(vec![(SEARCH, vec![status(403, "")])]));
        let fetcher = Fetcher::with_source(source.clone(), config(3));

        let err = fetcher.fetch(&number()).await.unwrap_err();
        assert!(matches!(err, Error::Network { attempts: 1, .. }));
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_not_found_by_status_and_by_content() {
        let source = Arc::new(ScriptedSource::new(vec![(SEARCH, vec![status(404, "")])]));
        let err = Fetcher::with_source(source, config(3)).fetch(&number()).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        let page = include_str!("../tests/fixtures/not_found.html");
        let source = Arc::new(ScriptedSource::new(vec![(SEARCH, vec![status(200, page)])]));
        let err = Fetcher::with_source(source, config(3)).fetch(&number()).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_not_found_phrase_in_footer_of_company_page() {
        let page = include_str!("../tests/fixtures/full.html").replace(
            "</body>",
            "<footer>Company not found? Contact support.</footer></body>",
        );
        let source = Arc::new(ScriptedSource::new(vec![(SEARCH, vec![status(200, &page)])]));
        let bundle = Fetcher::with_source(source, config(0)).fetch(&number()).await.unwrap();
        assert!(bundle.search.body.contains("ANHEUSER-BUSCH INBEV"));
    }

    #[test]
    fn test_invalid_user_agent_is_a_config_error() {
        let config = ScraperConfig {
            user_agent: "bad\nagent".to_string(),
            ..ScraperConfig::default()
        };
        let err = HttpPageSource::new(&config).unwrap_err();
        assert!(matches!(err, Error::Config(_)), "{:?}", err);
        assert_eq!(err.kind(), sb_core::ErrorKind::Internal);
    }

    #[test]
    fn test_detail_links() {
        let page = include_str!("../tests/fixtures/search_with_links.html");
        let links = detail_links(
            page,
            "https://staatsbladmonitor.be/bedrijfsfiche.html?ondernemingsnummer=0202239951",
        );
        assert_eq!(
            links,
            vec![
                (
                    Section::Financial,
                    "https://staatsbladmonitor.be/jaarrekeningen.html?ondernemingsnummer=0202239951"
                        .to_string()
                ),
                (
                    Section::Publications,
                    "https://staatsbladmonitor.be/publicaties.html?ondernemingsnummer=0202239951"
                        .to_string()
                ),
                (
                    Section::Directors,
                    "https://staatsbladmonitor.be/bestuurders.html?ondernemingsnummer=0202239951"
                        .to_string()
                ),
            ]
        );
    }

    #[test]
    fn test_content_for_falls_back_to_search_page() {
        let search = RawPage {
            url: SEARCH.to_string(),
            body: "search".to_string(),
        };
        let bundle = RawPageBundle {
            company_number: number(),
            retrieved_at: Utc::now(),
            search,
            financial: Some(RawPage {
                url: "f".to_string(),
                body: "financial".to_string(),
            }),
            publications: None,
            directors: None,
            warnings: Vec::new(),
        };
        assert_eq!(bundle.content_for(Section::Financial).body, "financial");
        assert_eq!(bundle.content_for(Section::Directors).body, "search");
    }
}
