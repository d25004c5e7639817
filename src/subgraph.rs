use async_trait::async_trait;
use log::{info, warn};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{error::FetchError, models::TransferBank};

pub const PAGE_SIZE: usize = 1000;

#[async_trait]
pub trait TransferSource: Send + Sync {
    async fn fetch_transfers(&self, after: Option<i64>) -> Result<Vec<TransferBank>, FetchError>;
}

pub struct SubgraphClient {
    http: reqwest::Client,
    endpoint: Url,
}

impl SubgraphClient {
    pub fn new(endpoint: Url) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint,
        }
    }
}

#[async_trait]
impl TransferSource for SubgraphClient {
    async fn fetch_transfers(&self, after: Option<i64>) -> Result<Vec<TransferBank>, FetchError> {
        let query = build_query(after);
        let payload = build_payload(&query, after);

        info!("Querying {} for transfers after {:?}", self.endpoint, after);
        let response = self
            .http
            .post(self.endpoint.clone())
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        parse_response(status, &body, &query)
    }
}

pub fn build_payload(query: &str, after: Option<i64>) -> Value {
    json!({ "query": query, "variables": { "input": after } })
}

pub fn build_query(after: Option<i64>) -> String {
    // timestamp_gte would re-ingest the boundary row
    let filter = match after {
        Some(timestamp) => format!("where: {{timestamp_gt: {timestamp}}}, "),
        None => String::new(),
    };

    format!(
        r#"
{{
  transferBanks(first: {PAGE_SIZE}, {filter}orderBy: timestamp, orderDirection: asc, subgraphError: allow) {{
    id
    from_address
    to_address
    amount
    amount_display
    timestamp
    timestamp_display
  }}
}}
"#
    )
}

#[derive(Debug, Deserialize)]
struct GraphResponse {
    data: Option<TransferBanksData>,
    #[serde(default)]
    errors: Vec<GraphError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransferBanksData {
    transfer_banks: Vec<TransferBank>,
}

#[derive(Debug, Deserialize)]
struct GraphError {
    message: String,
}

pub fn parse_response(status: StatusCode, body: &str, query: &str) -> Result<Vec<TransferBank>, FetchError> {
    if status != StatusCode::OK {
        return Err(FetchError::Status {
            status: status.as_u16(),
            query: query.to_string(),
        });
    }

    let response: GraphResponse = serde_json::from_str(body)?;
    let messages = response
        .errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ");

    match response.data {
        Some(data) => {
            if !messages.is_empty() {
                warn!("Subgraph reported partial errors: {}", messages);
            }
            Ok(data.transfer_banks)
        }
        None if !messages.is_empty() => Err(FetchError::Remote(messages)),
        None => Err(FetchError::Remote("response contained neither data nor errors".to_string())),
    }
}
