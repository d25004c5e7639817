use log::{info, warn};

use crate::{
    config::Config,
    database::{Database, TABLE},
    error::{ConfigError, EtlError},
    loader,
    models::{BankRow, Watermark},
    subgraph::{TransferSource, PAGE_SIZE},
};

#[derive(Debug)]
pub struct RunSummary {
    pub watermark: Watermark,
    pub fetched: usize,
    pub rows: Vec<BankRow>,
    pub appended: u64,
    pub dry_run: bool,
}

/// One watermark-read, fetch and append cycle against the destination table.
pub struct Pipeline<S> {
    database: Database,
    source: S,
    dry_run: bool,
}

impl<S: TransferSource> Pipeline<S> {
    pub fn new(database: Database, source: S) -> Self {
        Self {
            database,
            source,
            dry_run: false,
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub async fn run(self) -> Result<RunSummary, EtlError> {
        let result = self.sync().await;
        self.database.close().await;
        result
    }

    async fn sync(&self) -> Result<RunSummary, EtlError> {
        let watermark = self.database.read_watermark().await?;

        let records = self.source.fetch_transfers(watermark.max_timestamp).await?;
        let fetched = records.len();
        info!("Fetched {} transfers", fetched);
        if fetched >= PAGE_SIZE {
            warn!(
                "Fetch hit the page limit of {}; remaining transfers will be picked up by the next run",
                PAGE_SIZE
            );
        }

        let rows = loader::shape_rows(records, &watermark)?;

        let appended = if self.dry_run {
            info!("Dry run: skipping append of {} rows", rows.len());
            0
        } else {
            self.database.append_rows(&rows).await?
        };

        if let (Some(first), Some(last)) = (rows.first(), rows.last()) {
            info!(
                "{} rows {} into {} with ids {}..={}",
                rows.len(),
                if self.dry_run { "shaped" } else { "appended" },
                TABLE,
                first.id,
                last.id
            );
        } else {
            info!("No new transfers since {:?}", watermark.max_timestamp);
        }

        Ok(RunSummary {
            watermark,
            fetched,
            rows,
            appended,
            dry_run: self.dry_run,
        })
    }
}

/// Connects with `config` and runs one cycle. A config error returns before the
/// database or the source is touched.
pub async fn run_once<S, F>(
    config: Result<Config, ConfigError>,
    make_source: F,
    dry_run: bool,
) -> Result<RunSummary, EtlError>
where
    S: TransferSource,
    F: FnOnce(&Config) -> S,
{
    let config = config?;
    let database = Database::connect(&config.db_string).await?;
    let source = make_source(&config);
    Pipeline::new(database, source).dry_run(dry_run).run().await
}
