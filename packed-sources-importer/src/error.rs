// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::PathBuf;

/// Errors raised while serving a resolution request.
///
/// A requested name that is simply absent is not an error. See
/// [crate::Resolution::NotHandled].
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{origin}: {source}")]
    Archive {
        origin: String,
        source: packed_sources::Error,
    },

    #[error("{origin}: invalid bootstrap directive: {message}")]
    Bootstrap { origin: String, message: String },
}

/// Errors reported by a [crate::LoaderChain].
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("no finder could resolve {name}")]
    NotFound { name: String },

    #[error("finder {finder} failed to resolve {name}: {message}")]
    Failed {
        name: String,
        finder: String,
        message: String,
    },
}
