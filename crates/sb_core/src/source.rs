use async_trait::async_trait;
use crate::Result;

/// Raw HTTP answer: status code plus decoded body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageResponse {
    pub status: u16,
    pub body: String,
}

impl PageResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }
}

#[async_trait]
pub trait PageSource: Send + Sync {
    /// Retrieve a single URL. Transport failures are errors; HTTP error statuses are not.
    async fn get(&self, url: &str) -> Result<PageResponse>;
}
