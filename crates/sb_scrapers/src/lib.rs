pub mod cli;
pub mod config;
pub mod fetcher;
pub mod logging;
pub mod normalizer;
pub mod parsers;
pub mod serializer;
pub mod staatsblad;

pub use cli::{handle_command, RegistryArgs, RegistryCommands};
pub use config::{RetryConfig, ScraperConfig};
pub use fetcher::{Fetcher, HttpPageSource, RawPage, RawPageBundle};
pub use logging::{init_logging, Logger};
pub use normalizer::Normalizer;
pub use serializer::{serialize, Format};
pub use staatsblad::StaatsbladScraper;
