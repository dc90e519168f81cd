use crate::domain::model::FareEstimate;
use crate::utils::error::{FareError, Result};
use serde::Serialize;
use tokio::sync::mpsc;

#[derive(Debug, Serialize)]
struct FareRow {
    id_delivery: i64,
    fare_estimate: String,
}

impl From<&FareEstimate> for FareRow {
    fn from(estimate: &FareEstimate) -> Self {
        Self {
            id_delivery: estimate.delivery_id,
            fare_estimate: format!("{:.2}", estimate.fare),
        }
    }
}

/// Drains the estimate channel into CSV bytes (`id_delivery,fare_estimate`).
/// Rows keep arrival order. The file is assembled in memory and handed to
/// storage in one write. Returns the encoded file and the row count.
pub async fn collect_csv(mut estimates: mpsc::Receiver<FareEstimate>) -> Result<(Vec<u8>, u64)> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(["id_delivery", "fare_estimate"])?;

    let mut written = 0u64;
    while let Some(estimate) = estimates.recv().await {
        writer.serialize(FareRow::from(&estimate))?;
        written += 1;
    }

    let data = writer
        .into_inner()
        .map_err(|e| FareError::IoError(e.into_error()))?;
    Ok((data, written))
}
