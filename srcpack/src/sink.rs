// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Destinations for generated artifacts. */

use {
    crate::error::PackError,
    log::info,
    std::{io::Write, path::PathBuf},
};

/// Where a generated artifact goes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutputSink {
    /// Hand the artifact back to the caller.
    Memory,

    /// Write the artifact to a filesystem path.
    Path { path: PathBuf, overwrite: bool },
}

impl OutputSink {
    /// Emit an artifact.
    ///
    /// Returns the artifact for [OutputSink::Memory] and `None` once written
    /// to a path. Path output is staged in a temporary file next to the
    /// destination and moved into place, so a failed write never leaves a
    /// partial artifact behind.
    pub fn emit(&self, data: Vec<u8>) -> Result<Option<Vec<u8>>, PackError> {
        let (path, overwrite) = match self {
            Self::Memory => return Ok(Some(data)),
            Self::Path { path, overwrite } => (path, *overwrite),
        };

        let already_exists = || PackError::OutputAlreadyExists { path: path.clone() };

        if !overwrite && path.exists() {
            return Err(already_exists());
        }

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let mut temp = tempfile::NamedTempFile::new_in(&dir).map_err(|e| PackError::io(&dir, e))?;
        temp.write_all(&data)
            .and_then(|_| temp.flush())
            .map_err(|e| PackError::io(temp.path(), e))?;

        #[cfg(unix)]
        if data.starts_with(b"#!") {
            use std::os::unix::fs::PermissionsExt;

            temp.as_file()
                .set_permissions(std::fs::Permissions::from_mode(0o755))
                .map_err(|e| PackError::io(temp.path(), e))?;
        }

        if overwrite {
            temp.persist(path).map_err(|e| PackError::io(path, e.error))?;
        } else {
            temp.persist_noclobber(path).map_err(|e| {
                if e.error.kind() == std::io::ErrorKind::AlreadyExists {
                    already_exists()
                } else {
                    PackError::io(path, e.error)
                }
            })?;
        }

        info!("wrote {} bytes to {}", data.len(), path.display());

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory() -> Result<(), PackError> {
        assert_eq!(OutputSink::Memory.emit(b"abc".to_vec())?, Some(b"abc".to_vec()));

        Ok(())
    }

    #[test]
    fn test_path_refuses_existing() -> Result<(), PackError> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.run");
        std::fs::write(&path, b"original").unwrap();

        let err = OutputSink::Path {
            path: path.clone(),
            overwrite: false,
        }
        .emit(b"new".to_vec())
        .unwrap_err();

        assert!(matches!(&err, PackError::OutputAlreadyExists { path: p } if p == &path));
        assert!(err.to_string().contains("--overwrite"));
        assert_eq!(std::fs::read(&path).unwrap(), b"original".to_vec());

        // Nothing was left behind in the destination directory.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);

        OutputSink::Path {
            path: path.clone(),
            overwrite: true,
        }
        .emit(b"new".to_vec())?;
        assert_eq!(std::fs::read(&path).unwrap(), b"new".to_vec());

        Ok(())
    }

    #[test]
    fn test_path_creates() -> Result<(), PackError> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.run");

        assert_eq!(
            OutputSink::Path {
                path: path.clone(),
                overwrite: false,
            }
            .emit(b"#!/bin/sh\n".to_vec())?,
            None
        );
        assert_eq!(std::fs::read(&path).unwrap(), b"#!/bin/sh\n".to_vec());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o755);
        }

        Ok(())
    }
}
