use serde::{de, Deserialize, Deserializer, Serialize};
use sqlx::FromRow;

/// High-water mark of the destination table. Both fields are `None` on an empty table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Watermark {
    pub max_timestamp: Option<i64>,
    pub max_id: Option<i64>,
}

impl Watermark {
    pub fn next_id(&self) -> Option<i64> {
        match self.max_id {
            Some(max_id) => max_id.checked_add(1),
            None => Some(0),
        }
    }

    pub fn admits(&self, timestamp: i64) -> bool {
        self.max_timestamp.map_or(true, |max| timestamp > max)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TransferBank {
    pub id: String,
    pub from_address: String,
    pub to_address: String,
    pub amount: String,
    pub amount_display: String,
    #[serde(deserialize_with = "big_int")]
    pub timestamp: i64,
    pub timestamp_display: String,
}

/// One row of `stg_subgraph_bank_1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct BankRow {
    pub id: i64,
    pub graph_id: String,
    pub amount_display: String,
    pub from_address: String,
    pub to_address: String,
    pub tx_timestamp: i64,
    pub timestamp_display: String,
}

// The Graph serializes BigInt as a JSON string.
fn big_int<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(i64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| de::Error::custom(format!("invalid integer timestamp: {s:?}"))),
    }
}
