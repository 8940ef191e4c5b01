use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use sb_core::{CompanyNumber, CompanyRecord, PageSource, Result, Section};
use url::Url;

use crate::config::ScraperConfig;
use crate::fetcher::Fetcher;
use crate::logging::Logger;
use crate::normalizer::Normalizer;
use crate::parsers::{
    default_base, parse_directors, parse_financial, identity::parse_identity_with_base,
    publications::parse_publications_with_base,
};
use crate::serializer::{serialize, Format};

/// Looks up companies in the Staatsblad registry and turns the pages into [`CompanyRecord`]s.
pub struct StaatsbladScraper {
    fetcher: Fetcher,
    logger: Logger,
}

impl StaatsbladScraper {
    pub fn new(config: ScraperConfig) -> Result<Self> {
        Ok(Self::from_fetcher(Fetcher::new(config)?))
    }

    pub fn with_source(source: Arc<dyn PageSource>, config: ScraperConfig) -> Self {
        Self::from_fetcher(Fetcher::with_source(source, config))
    }

    fn from_fetcher(fetcher: Fetcher) -> Self {
        Self {
            fetcher,
            logger: Logger::new().with_prefix("[staatsblad]"),
        }
    }

    /// Fetches, parses and normalizes everything the registry publishes for a company.
    ///
    /// The number is validated before any request is made. Missing or malformed sections
    /// end up in the record's `issues`; only validation, not-found and network failures
    /// are returned as errors.
    pub async fn search_company(&self, company_number: &str) -> Result<CompanyRecord> {
        let number = CompanyNumber::parse(company_number)?;
        let logger = self.logger.clone().with_prefix(format!("[{}]", number));
        logger.info("fetching registry pages");

        let bundle = match self.fetcher.fetch(&number).await {
            Ok(bundle) => bundle,
            Err(e) => {
                logger.error(&format!("lookup failed: {}", e));
                return Err(e);
            }
        };

        let search = bundle.content_for(Section::Identity);
        let identity = parse_identity_with_base(&search.body, &base_of(&search.url));
        let financial = parse_financial(&bundle.content_for(Section::Financial).body);
        let publications_page = bundle.content_for(Section::Publications);
        let publications =
            parse_publications_with_base(&publications_page.body, &base_of(&publications_page.url));
        let directors = parse_directors(&bundle.content_for(Section::Directors).body);

        let record = Normalizer::new(number, bundle.retrieved_at)
            .with_source_url(search.url.clone())
            .with_issues(bundle.warnings.clone())
            .normalize(identity, financial, publications, directors)?;

        for warning in &record.issues {
            logger.section_warning(warning);
        }
        logger.info(&format!(
            "extracted '{}': {} financial entries, {} publications, {} directors, {} issues",
            record.name,
            record.financial_history.len(),
            record.publications.len(),
            record.directors.len(),
            record.issues.len()
        ));

        Ok(record)
    }

    /// Writes `<prefix>.json`, `<prefix>.md` and `<prefix>.txt`, creating missing parent
    /// directories. Returns the written paths.
    pub async fn save_results_to_files(
        &self,
        record: &CompanyRecord,
        filename_prefix: impl AsRef<Path>,
    ) -> Result<Vec<PathBuf>> {
        let prefix = filename_prefix.as_ref();
        if let Some(parent) = prefix.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut written = Vec::with_capacity(Format::ALL.len());
        for format in Format::ALL {
            let content = serialize(record, format)?;
            let path = with_extension(prefix, format.extension());
            tokio::fs::write(&path, content).await?;
            self.logger.debug(&format!("wrote {}", path.display()));
            written.push(path);
        }

        self.logger
            .info(&format!("saved results to {}.{{json,md,txt}}", prefix.display()));
        Ok(written)
    }
}

/// Appends an extension without replacing one already present in the prefix.
fn with_extension(prefix: &Path, extension: &str) -> PathBuf {
    let mut name = OsString::from(prefix.as_os_str());
    name.push(".");
    name.push(extension);
    PathBuf::from(name)
}

fn base_of(url: &str) -> Url {
    Url::parse(url).unwrap_or_else(|_| default_base())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_extension_keeps_dots_in_prefix() {
        assert_eq!(
            with_extension(Path::new("out/acme.v2"), "json"),
            PathBuf::from("out/acme.v2.json")
        );
    }
}
