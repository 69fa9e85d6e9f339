//! JSON snapshots written by `get`/`migrate` and read back by `set`.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::{cli::Side, migrator::VariableExport};

pub const DATA_DIR: &str = "data";

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to write {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode data for {path:?}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("could not parse JSON in {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// What a snapshot holds, which determines its default file name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SnapshotKind {
    Groups,
    Projects { group: Option<String> },
    GroupVariables { group: String, recursive: bool },
    ProjectVariables { project: String },
}

/// `data/{s|d}-gitlab_get_{identifier}.json`
pub fn output_file_name(kind: &SnapshotKind, side: Side) -> PathBuf {
    let identifier = match kind {
        SnapshotKind::Groups => "groups".to_string(),
        SnapshotKind::Projects { group: None } => "projects".to_string(),
        SnapshotKind::Projects { group: Some(group) } => format!("projects_g-{}", group),
        SnapshotKind::GroupVariables {
            group,
            recursive: true,
        } => format!("variables_g-{}_recursive", group),
        SnapshotKind::GroupVariables {
            group,
            recursive: false,
        } => format!("variables_g-{}", group),
        SnapshotKind::ProjectVariables { project } => format!("variables_p-{}", project),
    };

    Path::new(DATA_DIR).join(format!("{}-gitlab_get_{}.json", side.prefix(), identifier))
}

/// Write `data` as pretty JSON, creating parent directories as needed.
pub fn save_output<T: Serialize + ?Sized>(data: &T, path: &Path) -> Result<(), SnapshotError> {
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(|source| SnapshotError::Write {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let mut content = serde_json::to_string_pretty(data).map_err(|source| SnapshotError::Encode {
        path: path.to_path_buf(),
        source,
    })?;
    content.push('\n');

    fs::write(path, content).map_err(|source| SnapshotError::Write {
        path: path.to_path_buf(),
        source,
    })?;

    tracing::info!("saved output to {}", path.display());
    Ok(())
}

/// Read variables saved by an earlier run: either a flat list or the
/// per-project map written by recursive exports.
pub fn read_input(path: &Path) -> Result<VariableExport, SnapshotError> {
    let content = fs::read_to_string(path).map_err(|source| SnapshotError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_str(&content).map_err(|source| SnapshotError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
