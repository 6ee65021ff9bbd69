//! CSV recording of published snapshots.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::snapshot::Snapshot;
use crate::subject::Subject;
use csv::WriterBuilder;
use std::fs::OpenOptions;
use std::path::Path;

/// One CSV row: a subject's snapshot at the moment it was published.
#[derive(Debug, Serialize)]
pub struct SnapshotRecord<'a> {
    pub agency: &'a str,
    pub route: &'a str,
    pub stop: &'a str,
    pub label: &'a str,
    pub queried_at: Option<DateTime<Utc>>,
    pub arrival_count: usize,
    /// Space-separated seconds, in service order.
    pub arrivals: String,
}

impl<'a> SnapshotRecord<'a> {
    pub fn new(subject: &'a Subject, snapshot: &Snapshot) -> Self {
        let arrivals = snapshot
            .arrivals()
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(" ");

        Self {
            agency: subject.agency(),
            route: subject.route(),
            stop: subject.stop(),
            label: subject.label(),
            queried_at: snapshot.queried_at(),
            arrival_count: snapshot.arrivals().len(),
            arrivals,
        }
    }
}

/// Appends a row for `snapshot` to a CSV file.
///
/// Creates the file with headers if it does not already exist.
pub fn append_record(path: &Path, subject: &Subject, snapshot: &Snapshot) -> Result<()> {
    let file_exists = path.exists();
    debug!(path = %path.display(), file_exists, "Appending CSV record");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists)
        .from_writer(file);

    writer.serialize(SnapshotRecord::new(subject, snapshot))?;
    writer.flush()?;

    Ok(())
}
