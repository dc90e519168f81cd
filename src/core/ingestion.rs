use crate::domain::model::{DeliveryGroup, DeliveryPoint, IngestReport};
use crate::domain::ports::DeliveryFeed;
use crate::utils::error::{FareError, Result};
use csv::{ReaderBuilder, StringRecord, Trim};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::io::Read;
use tokio::sync::mpsc;

const FIELD_COUNT: usize = 4;

/// How raw records are turned into per-delivery groups.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum GroupingMode {
    /// Stream a group out as soon as the delivery id changes. Assumes the
    /// input is sorted by delivery.
    #[default]
    Contiguous,
    /// Hold every record until the input ends, then emit one group per id in
    /// first-seen order. Safe for interleaved input, costs memory.
    Buffered,
}

pub fn parse_record(record: &StringRecord, line: u64) -> Result<DeliveryPoint> {
    if record.len() != FIELD_COUNT {
        return Err(FareError::MalformedRecord {
            line,
            reason: format!("expected {} fields, found {}", FIELD_COUNT, record.len()),
        });
    }

    let malformed = |field: &str, value: &str| FareError::MalformedRecord {
        line,
        reason: format!("invalid {} '{}'", field, value),
    };

    let id: i64 = record[0].parse().map_err(|_| malformed("id", &record[0]))?;
    let latitude: f64 = record[1].parse().map_err(|_| malformed("lat", &record[1]))?;
    let longitude: f64 = record[2].parse().map_err(|_| malformed("lng", &record[2]))?;
    let seconds: i64 = record[3]
        .parse()
        .map_err(|_| malformed("timestamp", &record[3]))?;

    DeliveryPoint::from_unix(id, latitude, longitude, seconds)
        .ok_or_else(|| malformed("timestamp", &record[3]))
}

/// Reads `id,lat,lng,timestamp` rows (after a header row) and hands each
/// finished group to `emit`. Returning `false` from `emit` stops reading.
/// Malformed rows are skipped; only I/O failures abort.
pub fn read_groups<R: Read>(
    reader: R,
    mode: GroupingMode,
    mut emit: impl FnMut(DeliveryGroup) -> bool,
) -> Result<IngestReport> {
    let mut csv_reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let mut report = IngestReport::default();
    let mut grouper = Grouper::new(mode);

    for (index, result) in csv_reader.records().enumerate() {
        let record = match result {
            Ok(record) => record,
            Err(e) if e.is_io_error() => return Err(FareError::CsvError(e)),
            Err(e) => {
                report.malformed += 1;
                tracing::warn!("skipping unreadable record: {}", e);
                continue;
            }
        };
        let line = record
            .position()
            .map(|p| p.line())
            .unwrap_or(index as u64 + 2);

        match parse_record(&record, line) {
            Ok(point) => {
                report.records += 1;
                if let Some(group) = grouper.push(point, &mut report) {
                    report.groups += 1;
                    if !emit(group) {
                        tracing::warn!("delivery receiver closed, stopping ingestion");
                        return Ok(report);
                    }
                }
            }
            Err(e) => {
                report.malformed += 1;
                tracing::warn!("{}", e);
            }
        }
    }

    for group in grouper.finish() {
        report.groups += 1;
        if !emit(group) {
            tracing::warn!("delivery receiver closed, stopping ingestion");
            break;
        }
    }

    Ok(report)
}

/// Parses `data` on a blocking thread and feeds groups into a bounded
/// channel; a full channel blocks the parser.
pub fn spawn_ingest(data: Vec<u8>, mode: GroupingMode, buffer: usize) -> DeliveryFeed {
    let (tx, rx) = mpsc::channel(buffer.max(1));
    let completion = tokio::task::spawn_blocking(move || {
        let report = read_groups(data.as_slice(), mode, |group| tx.blocking_send(group).is_ok())?;
        tracing::info!(
            records = report.records,
            malformed = report.malformed,
            groups = report.groups,
            "ingestion finished"
        );
        Ok(report)
    });

    DeliveryFeed {
        groups: rx,
        completion,
    }
}

enum Grouper {
    Contiguous {
        current: Option<DeliveryGroup>,
        seen: HashSet<i64>,
    },
    Buffered {
        order: Vec<i64>,
        points: HashMap<i64, Vec<DeliveryPoint>>,
    },
}

impl Grouper {
    fn new(mode: GroupingMode) -> Self {
        match mode {
            GroupingMode::Contiguous => Grouper::Contiguous {
                current: None,
                seen: HashSet::new(),
            },
            GroupingMode::Buffered => Grouper::Buffered {
                order: Vec::new(),
                points: HashMap::new(),
            },
        }
    }

    fn push(&mut self, point: DeliveryPoint, report: &mut IngestReport) -> Option<DeliveryGroup> {
        match self {
            Grouper::Contiguous { current, seen } => {
                if let Some(group) = current {
                    if group.delivery_id == point.delivery_id {
                        group.points.push(point);
                        return None;
                    }
                }

                if !seen.insert(point.delivery_id) {
                    report.split_groups += 1;
                    tracing::warn!(
                        delivery_id = point.delivery_id,
                        "delivery id reappeared after its group was emitted; use buffered grouping for unsorted input"
                    );
                }
                current.replace(DeliveryGroup::new(point.delivery_id, vec![point]))
            }
            Grouper::Buffered { order, points } => {
                points
                    .entry(point.delivery_id)
                    .or_insert_with(|| {
                        order.push(point.delivery_id);
                        Vec::new()
                    })
                    .push(point);
                None
            }
        }
    }

    fn finish(self) -> Vec<DeliveryGroup> {
        match self {
            Grouper::Contiguous { current, .. } => current.into_iter().collect(),
            Grouper::Buffered { order, mut points } => order
                .into_iter()
                .filter_map(|id| points.remove(&id).map(|p| DeliveryGroup::new(id, p)))
                .collect(),
        }
    }
}
