#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("network error for {url}: {message}")]
    Network { url: String, message: String },
    #[error("{url} is not available offline")]
    Offline { url: String },
    #[error("precaching {url} failed with status {status}")]
    Precache { url: String, status: u16 },
    #[error("invalid url '{0}'")]
    InvalidUrl(String),
}
