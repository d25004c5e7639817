use log::{debug, warn};

use crate::{
    error::StoreError,
    models::{BankRow, TransferBank, Watermark},
};

/// Renames and numbers fetched records, skipping any at or below the watermark.
pub fn shape_rows(records: Vec<TransferBank>, watermark: &Watermark) -> Result<Vec<BankRow>, StoreError> {
    let overflow = || StoreError::IdOverflow(watermark.max_id.unwrap_or_default());
    let first_id = watermark.next_id().ok_or_else(overflow)?;

    let mut rows = Vec::with_capacity(records.len());
    for record in records {
        if !watermark.admits(record.timestamp) {
            warn!(
                "Dropping {} ({}) at timestamp {}: not after watermark {:?}",
                record.id, record.amount, record.timestamp, watermark.max_timestamp
            );
            continue;
        }

        let id = first_id.checked_add(rows.len() as i64).ok_or_else(overflow)?;
        let row = BankRow {
            id,
            graph_id: record.id,
            amount_display: record.amount_display,
            from_address: record.from_address,
            to_address: record.to_address,
            tx_timestamp: record.timestamp,
            timestamp_display: record.timestamp_display,
        };
        debug!("{:?}", row);
        rows.push(row);
    }

    Ok(rows)
}
