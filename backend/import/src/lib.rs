//! # Bulk Import
//!
//! Loads a headerless CSV of `userId,action,target` rows into the vote logs.
//!
//! ## Rules
//! - Rows are appended strictly in file order, one at a time, so each user's
//!   log ends up in the same order as the file
//! - Every row goes through [`votes::codec::encode`], the same function the
//!   HTTP write path uses
//! - A bad row is either fatal ([`RowPolicy::Abort`], the default) or logged and
//!   counted ([`RowPolicy::Skip`]). Rows before an abort stay written
//! - Store failures always stop the import
use std::io::Read;

use csv::{ReaderBuilder, StringRecord};
use indicatif::{ProgressBar, ProgressStyle};
use thiserror::Error;
use tracing::{info, warn};
use votes::{
    codec::{Entry, encode},
    store::{StoreError, VoteLog},
};

pub const PROGRESS_EVERY: u64 = 100_000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RowPolicy {
    #[default]
    Abort,
    Skip,
}

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Malformed row {row}: {reason}")]
    MalformedRow { row: u64, reason: String },

    #[error("Failed to read source: {0}")]
    Read(#[from] csv::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub imported: u64,
    pub skipped: u64,
}

struct Row {
    user: String,
    entry: Entry,
}

fn parse_row(record: &StringRecord) -> Result<Row, String> {
    if record.len() != 3 {
        return Err(format!("expected 3 fields, found {}", record.len()));
    }

    let field = |index: usize, name: &str| -> Result<u64, String> {
        let raw = record[index].trim();
        raw.parse()
            .map_err(|e| format!("{name} {raw:?} is not an unsigned integer: {e}"))
    };

    let user = record[0].trim();
    if user.is_empty() {
        return Err("empty user id".to_string());
    }

    let entry = encode(field(1, "action")?, field(2, "target")?).map_err(|e| e.to_string())?;

    Ok(Row {
        user: user.to_string(),
        entry,
    })
}

fn progress_bar() -> ProgressBar {
    let pb = ProgressBar::new_spinner();

    if let Ok(style) =
        ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {pos} rows {msg}")
    {
        pb.set_style(style);
    }

    pb
}

pub async fn import_csv<R: Read>(
    log: &dyn VoteLog,
    source: R,
    policy: RowPolicy,
) -> Result<ImportReport, ImportError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(source);

    let pb = progress_bar();
    let mut report = ImportReport::default();
    let mut record = StringRecord::new();
    let mut row = 0;

    loop {
        row += 1;

        let parsed = match reader.read_record(&mut record) {
            Ok(false) => break,
            Ok(true) => parse_row(&record),
            Err(e) if e.is_io_error() => return Err(ImportError::Read(e)),
            Err(e) => Err(e.to_string()),
        };

        match parsed {
            Ok(Row { user, entry }) => {
                log.append(&user, entry).await?;
                report.imported += 1;
            }
            Err(reason) if policy == RowPolicy::Skip => {
                warn!("Skipping row {row}: {reason}");
                report.skipped += 1;
            }
            Err(reason) => {
                pb.abandon_with_message(format!("failed at row {row}"));
                return Err(ImportError::MalformedRow { row, reason });
            }
        }

        if row % PROGRESS_EVERY == 0 {
            pb.set_position(row);
        }
    }

    pb.set_position(report.imported + report.skipped);
    pb.finish_with_message("done");
    info!(
        imported = report.imported,
        skipped = report.skipped,
        "Import finished"
    );

    Ok(report)
}
