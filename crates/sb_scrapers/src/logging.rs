use sb_core::Warning;
use std::collections::VecDeque;
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Thin wrapper around `tracing` that prepends context prefixes such as `[0403200393]`.
#[derive(Debug, Clone, Default)]
pub struct Logger {
    prefixes: VecDeque<String>,
}

impl Logger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefixes.push_back(prefix.into());
        self
    }

    fn prefix(&self) -> String {
        self.prefixes.iter().map(|p| format!("{} ", p)).collect()
    }

    pub fn info(&self, message: &str) {
        tracing::info!("{}{}", self.prefix(), message);
    }

    pub fn error(&self, message: &str) {
        tracing::error!("{}{}", self.prefix(), message);
    }

    pub fn warn(&self, message: &str) {
        tracing::warn!("{}{}", self.prefix(), message);
    }

    pub fn debug(&self, message: &str) {
        tracing::debug!("{}{}", self.prefix(), message);
    }

    pub fn section_warning(&self, warning: &Warning) {
        tracing::warn!(section = %warning.section, "{}{}", self.prefix(), warning.message);
    }
}

/// Installs the fmt subscriber once; `RUST_LOG` overrides the default `info` level.
pub fn init_logging() -> Logger {
    if !tracing::dispatcher::has_been_set() {
        INIT.call_once(|| {
            let filter = EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(Level::INFO.as_str()));
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .try_init()
                .ok();
        });
    }
    Logger::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sb_core::Section;

    #[test]
    fn test_prefixes_accumulate() {
        let logger = Logger::new().with_prefix("[staatsblad]").with_prefix("[0403200393]");
        assert_eq!(logger.prefix(), "[staatsblad] [0403200393] ");
        logger.section_warning(&Warning::section_not_found(Section::Financial));
    }

    #[test]
    fn test_init_logging_is_idempotent() {
        init_logging().info("first");
        init_logging().info("second");
    }
}
