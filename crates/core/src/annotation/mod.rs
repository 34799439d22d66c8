//! Annotation CSV: one row per group with an empty `disease_index` column
//! left open for manual scoring.
//!
//! The file is a best-effort side artifact. Callers log and swallow
//! [`AnnotationError`] instead of failing the job.

use std::path::Path;

use chrono::NaiveDateTime;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::grouping::ProcessingGroup;

#[derive(Debug, Error)]
pub enum AnnotationError {
    #[error("failed to prepare annotation output: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to write annotation CSV: {0}")]
    Csv(#[from] csv::Error),
}

/// One line of the annotation file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnotationRow {
    pub plant: Option<String>,
    pub date_time: Option<NaiveDateTime>,
    /// Left empty for manual scoring.
    pub disease_index: String,
}

/// Representative rows for `groups`, sorted by plant then date, missing
/// values first.
pub fn annotation_rows(groups: &[ProcessingGroup]) -> Vec<AnnotationRow> {
    let mut rows: Vec<AnnotationRow> = groups
        .iter()
        .filter_map(ProcessingGroup::representative)
        .map(|item| AnnotationRow {
            plant: item.plant.clone(),
            date_time: item.date_time,
            disease_index: String::new(),
        })
        .collect();
    // `None` orders before `Some`, which puts missing values first.
    rows.sort_by(|a, b| (&a.plant, a.date_time).cmp(&(&b.plant, b.date_time)));
    rows
}

/// Write the annotation file for `groups` to `path`, returning the row count.
pub fn write_annotation_csv(
    groups: &[ProcessingGroup],
    path: &Path,
) -> Result<usize, AnnotationError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let rows = annotation_rows(groups);
    let mut writer = csv::Writer::from_path(path)?;
    for row in &rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    debug!(path = %path.display(), rows = rows.len(), "annotation CSV written");
    Ok(rows.len())
}
