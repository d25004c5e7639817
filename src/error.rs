use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("DB_STRING is not set; export a destination connection string before running")]
    MissingDbString,
    #[error("DB_STRING uses an unsupported scheme (expected postgres://, postgresql:// or sqlite:): {0}")]
    UnsupportedDbScheme(String),
    #[error("SUBGRAPH_URL is not a valid http(s) url: {0}")]
    InvalidSubgraphUrl(String),
    #[error("failed to read configuration: {0}")]
    Source(#[from] config::ConfigError),
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("query failed with status {status}: {query}")]
    Status { status: u16, query: String },
    #[error("request to subgraph failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected subgraph response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("subgraph returned errors: {0}")]
    Remote(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to connect to destination store: {0}")]
    Connect(#[source] sqlx::Error),
    #[error("failed to read watermark: {0}")]
    Watermark(#[source] sqlx::Error),
    #[error("failed to append rows: {0}")]
    Append(#[source] sqlx::Error),
    #[error("id space exhausted: cannot assign ids after {0}")]
    IdOverflow(i64),
}

#[derive(Debug, Error)]
pub enum EtlError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Store(#[from] StoreError),
}
