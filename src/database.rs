use log::info;
use sqlx::{
    any::{install_default_drivers, AnyPoolOptions, AnyRow},
    AnyPool, Row, ValueRef,
};

use crate::{
    error::StoreError,
    models::{BankRow, Watermark},
};

pub const TABLE: &str = "stg_subgraph_bank_1";

const COLUMNS: [&str; 7] = [
    "id",
    "graph_id",
    "amount_display",
    "from_address",
    "to_address",
    "tx_timestamp",
    "timestamp_display",
];

const ROWS_PER_STATEMENT: usize = 1000;

pub struct Database {
    pool: AnyPool,
}

impl Database {
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        install_default_drivers();
        let pool = AnyPoolOptions::new()
            .max_connections(1)
            .connect(database_url)
            .await
            .map_err(StoreError::Connect)?;
        Ok(Self { pool })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub async fn read_watermark(&self) -> Result<Watermark, StoreError> {
        let sql = format!(
            "SELECT CAST(MAX(tx_timestamp) AS BIGINT) AS max_tx_timestamp, \
             CAST(MAX(id) AS BIGINT) AS max_id FROM {TABLE}"
        );
        let row = sqlx::query(&sql)
            .fetch_one(&self.pool)
            .await
            .map_err(StoreError::Watermark)?;

        let watermark = Watermark {
            max_timestamp: nullable_i64(&row, "max_tx_timestamp").map_err(StoreError::Watermark)?,
            max_id: nullable_i64(&row, "max_id").map_err(StoreError::Watermark)?,
        };
        info!(
            "Watermark: max_tx_timestamp={:?} max_id={:?}",
            watermark.max_timestamp, watermark.max_id
        );
        Ok(watermark)
    }

    /// Appends `rows` in one transaction. Either every row lands or none does.
    pub async fn append_rows(&self, rows: &[BankRow]) -> Result<u64, StoreError> {
        if rows.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await.map_err(StoreError::Append)?;
        let mut appended = 0;
        for chunk in rows.chunks(ROWS_PER_STATEMENT) {
            let sql = insert_statement(chunk.len());
            let mut query = sqlx::query(&sql);
            for row in chunk {
                query = query
                    .bind(row.id)
                    .bind(row.graph_id.as_str())
                    .bind(row.amount_display.as_str())
                    .bind(row.from_address.as_str())
                    .bind(row.to_address.as_str())
                    .bind(row.tx_timestamp)
                    .bind(row.timestamp_display.as_str());
            }
            appended += query
                .execute(&mut *tx)
                .await
                .map_err(StoreError::Append)?
                .rows_affected();
        }
        tx.commit().await.map_err(StoreError::Append)?;

        Ok(appended)
    }
}

// MAX() over an empty table is an untyped NULL, which Option<i64> refuses to decode.
fn nullable_i64(row: &AnyRow, column: &str) -> Result<Option<i64>, sqlx::Error> {
    if row.try_get_raw(column)?.is_null() {
        return Ok(None);
    }
    row.try_get::<i64, _>(column).map(Some)
}

fn insert_statement(row_count: usize) -> String {
    let values = (0..row_count)
        .map(|r| {
            let params = (1..=COLUMNS.len())
                .map(|c| format!("${}", r * COLUMNS.len() + c))
                .collect::<Vec<_>>()
                .join(", ");
            format!("({params})")
        })
        .collect::<Vec<_>>()
        .join(", ");

    format!("INSERT INTO {TABLE} ({}) VALUES {values}", COLUMNS.join(", "))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) async fn memory_database() -> Database {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        sqlx::query(
            r#"
            CREATE TABLE stg_subgraph_bank_1 (
                id BIGINT PRIMARY KEY,
                graph_id TEXT NOT NULL,
                amount_display TEXT NOT NULL,
                from_address TEXT NOT NULL,
                to_address TEXT NOT NULL,
                tx_timestamp BIGINT NOT NULL,
                timestamp_display TEXT NOT NULL
            )
            "#,
        )
        .execute(&db.pool)
        .await
        .unwrap();
        db
    }

    pub(crate) async fn all_rows(db: &Database) -> Vec<BankRow> {
        sqlx::query_as::<_, BankRow>(
            "SELECT id, graph_id, amount_display, from_address, to_address, tx_timestamp, timestamp_display \
             FROM stg_subgraph_bank_1 ORDER BY id",
        )
        .fetch_all(&db.pool)
        .await
        .unwrap()
    }

    pub(crate) fn row(id: i64, tx_timestamp: i64) -> BankRow {
        BankRow {
            id,
            graph_id: format!("0x{id:x}-0"),
            amount_display: "1.0".to_string(),
            from_address: "0xfrom".to_string(),
            to_address: "0xto".to_string(),
            tx_timestamp,
            timestamp_display: format!("t{tx_timestamp}"),
        }
    }

    #[test]
    fn insert_statement_numbers_placeholders_across_rows() {
        assert_eq!(
            insert_statement(2),
            "INSERT INTO stg_subgraph_bank_1 (id, graph_id, amount_display, from_address, to_address, \
             tx_timestamp, timestamp_display) VALUES ($1, $2, $3, $4, $5, $6, $7), \
             ($8, $9, $10, $11, $12, $13, $14)"
        );
    }

    #[tokio::test]
    async fn empty_table_has_no_watermark() {
        let db = memory_database().await;
        assert_eq!(db.read_watermark().await.unwrap(), Watermark::default());
    }

    #[tokio::test]
    async fn watermark_tracks_maxima() {
        let db = memory_database().await;
        db.append_rows(&[row(0, 100), row(1, 300), row(2, 200)]).await.unwrap();

        let watermark = db.read_watermark().await.unwrap();
        assert_eq!(watermark.max_timestamp, Some(300));
        assert_eq!(watermark.max_id, Some(2));
    }

    #[tokio::test]
    async fn append_persists_rows() {
        let db = memory_database().await;
        let rows = vec![row(0, 10), row(1, 11)];
        assert_eq!(db.append_rows(&rows).await.unwrap(), 2);
        assert_eq!(all_rows(&db).await, rows);
    }

    #[tokio::test]
    async fn append_nothing_is_a_noop() {
        let db = memory_database().await;
        assert_eq!(db.append_rows(&[]).await.unwrap(), 0);
        assert!(all_rows(&db).await.is_empty());
    }

    #[tokio::test]
    async fn conflicting_batch_is_rolled_back() {
        let db = memory_database().await;
        db.append_rows(&[row(0, 10)]).await.unwrap();

        let err = db.append_rows(&[row(1, 11), row(0, 12)]).await.unwrap_err();
        assert!(matches!(err, StoreError::Append(_)));
        assert_eq!(all_rows(&db).await, vec![row(0, 10)]);
    }

    #[tokio::test]
    async fn large_batches_span_statements() {
        let db = memory_database().await;
        let rows: Vec<BankRow> = (0..2_500).map(|i| row(i, 1_000 + i)).collect();
        assert_eq!(db.append_rows(&rows).await.unwrap(), 2_500);

        let watermark = db.read_watermark().await.unwrap();
        assert_eq!(watermark.max_id, Some(2_499));
        assert_eq!(watermark.max_timestamp, Some(3_499));
    }

    #[tokio::test]
    async fn missing_table_is_a_watermark_error() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        let err = db.read_watermark().await.unwrap_err();
        assert!(matches!(err, StoreError::Watermark(_)));
    }
}
