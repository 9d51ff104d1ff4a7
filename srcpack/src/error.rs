// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::PathBuf;

/// Errors that abort packing.
///
/// No artifact is emitted once any of these is raised.
#[derive(Debug, thiserror::Error)]
pub enum PackError {
    #[error("resource {name} not found in search paths: {}", format_paths(.search_paths))]
    ResourceNotFound {
        name: String,
        search_paths: Vec<PathBuf>,
    },

    #[error("error transforming {name}: {message}")]
    TransformerFailure { name: String, message: String },

    #[error("output path {} already exists; pass --overwrite to replace it", .path.display())]
    OutputAlreadyExists { path: PathBuf },

    #[error("{section} line {line} would be mistaken for archive or bootstrap structure")]
    InvalidArtifactSection { section: &'static str, line: usize },

    #[error("bootstrap template error: {0}")]
    Template(String),

    #[error("invalid configuration in {}: {message}", .path.display())]
    Config { path: PathBuf, message: String },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("archive error: {0}")]
    Archive(#[from] packed_sources::Error),
}

impl PackError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

fn format_paths(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        "(none)".to_string()
    } else {
        paths
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}
