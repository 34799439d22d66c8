//! Consolidation of per-group CSV artifacts into the final result file.

use std::fs::File;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use thiserror::Error;

use crate::processor::GroupArtifact;

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("failed to read artifact {path}: {source}")]
    ReadArtifact {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("artifact {path} has a header that differs from the first artifact")]
    HeaderMismatch { path: PathBuf },

    #[error("failed to write merged output: {0}")]
    Write(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Concatenate `artifacts` (in the given order) into `output_path`.
///
/// The header is taken from the first artifact that has one and written once.
/// Empty artifacts contribute nothing. Returns the number of artifacts merged.
pub fn merge_artifacts(artifacts: &[GroupArtifact], output_path: &Path) -> Result<usize, MergeError> {
    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = WriterBuilder::new().from_path(output_path)?;
    let mut header: Option<StringRecord> = None;
    let mut merged = 0;

    for artifact in artifacts {
        let read_err = |source| MergeError::ReadArtifact {
            path: artifact.path.clone(),
            source,
        };
        let file = File::open(&artifact.path).map_err(|e| read_err(csv::Error::from(e)))?;
        let mut reader = ReaderBuilder::new().flexible(true).from_reader(file);

        let artifact_header = reader.headers().map_err(read_err)?.clone();
        if artifact_header.is_empty() {
            merged += 1;
            continue;
        }

        match &header {
            None => {
                writer.write_record(&artifact_header)?;
                header = Some(artifact_header);
            }
            Some(expected) if *expected != artifact_header => {
                return Err(MergeError::HeaderMismatch {
                    path: artifact.path.clone(),
                });
            }
            Some(_) => {}
        }

        for record in reader.records() {
            writer.write_record(&record.map_err(read_err)?)?;
        }
        merged += 1;
    }

    writer.flush()?;
    tracing::debug!(
        output = %output_path.display(),
        artifacts = merged,
        "Merged group artifacts"
    );
    Ok(merged)
}
