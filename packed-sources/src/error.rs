// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/// Errors produced when writing or reading packed sources archives.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("duplicate resource name: {0}")]
    DuplicateResourceName(String),

    #[error("no resources to pack")]
    EmptyInput,

    #[error("invalid resource name {name:?}: {reason}")]
    InvalidResourceName { name: String, reason: &'static str },

    #[error("invalid line marker {0:?}: must be non-empty and contain no whitespace")]
    InvalidLineMarker(String),

    #[error("malformed archive: {0}")]
    MalformedArchive(String),
}

impl Error {
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedArchive(message.into())
    }
}

/// Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
