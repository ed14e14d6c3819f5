//! Dataset document I/O.
//!
//! Persistence is durable and race-safe across crashes: the document is
//! written to a temp file in the same directory as the target, then renamed
//! over it. The target path is never written mid-stream.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::info;

use crate::catalog::ProcessDefinition;
use crate::error::{CatalogError, DatasetError};
use crate::model::{DatasetDocument, ObservationBatch};

/// Load the normalized observation batch.
pub async fn load_observations(path: &Path) -> Result<ObservationBatch, DatasetError> {
    let raw = read_text(path).await?;
    serde_json::from_str(&raw).map_err(|source| DatasetError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load the existing dataset document.
pub async fn load_dataset(path: &Path) -> Result<DatasetDocument, DatasetError> {
    let raw = read_text(path).await?;
    serde_json::from_str(&raw).map_err(|source| DatasetError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load and validate the process definition (YAML).
pub async fn load_process_definition(path: &Path) -> Result<ProcessDefinition, CatalogError> {
    let raw = match fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(CatalogError::NotFound(path.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    };
    let definition: ProcessDefinition = serde_yaml::from_str(&raw)?;
    definition.validate()?;
    Ok(definition)
}

/// Persist the dataset document: pretty JSON with a trailing newline,
/// written to a temp sibling and atomically renamed over the target.
pub async fn save_dataset(path: &Path, document: &DatasetDocument) -> Result<(), DatasetError> {
    let mut body = serde_json::to_string_pretty(document).map_err(DatasetError::Serialize)?;
    body.push('\n');

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).await?;
    }

    let tmp = temp_sibling(path);
    fs::write(&tmp, body).await?;
    fs::rename(&tmp, path).await?;

    info!(path = %path.display(), instances = document.instances.len(), "Dataset written");
    Ok(())
}

async fn read_text(path: &Path) -> Result<String, DatasetError> {
    match fs::read_to_string(path).await {
        Ok(raw) => Ok(raw),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(DatasetError::NotFound(path.to_path_buf()))
        }
        Err(e) => Err(e.into()),
    }
}

/// Temp file next to the target so the rename never crosses filesystems.
fn temp_sibling(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("dataset.json");
    path.with_file_name(format!(".{file_name}.tmp"))
}
