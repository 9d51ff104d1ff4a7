// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Finding resource files on a search path. */

use {
    crate::error::PackError,
    log::{debug, warn},
    packed_sources_importer::NamingConvention,
    std::path::{Path, PathBuf},
};

/// A resource file found on disk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocatedResource {
    /// Name the resource will be stored under.
    pub name: String,

    pub path: PathBuf,
}

impl LocatedResource {
    pub fn read(&self) -> Result<Vec<u8>, PackError> {
        std::fs::read(&self.path).map_err(|e| PackError::io(&self.path, e))
    }
}

/// Resolves resource identifiers against an ordered list of directories.
///
/// Identifiers are mapped to file names with the same [NamingConvention]
/// the runtime resolver uses, so a packed resource is found at runtime under
/// the identifier it was packed with. An identifier ending in `/` names a
/// directory whose matching files are all included.
#[derive(Clone, Debug)]
pub struct SearchPathLocator {
    search_paths: Vec<PathBuf>,
    naming: NamingConvention,
}

impl SearchPathLocator {
    pub fn new(search_paths: Vec<PathBuf>, naming: NamingConvention) -> Self {
        Self {
            search_paths,
            naming,
        }
    }

    fn not_found(&self, name: &str) -> PackError {
        PackError::ResourceNotFound {
            name: name.to_string(),
            search_paths: self.search_paths.clone(),
        }
    }

    /// Locate the files an identifier refers to.
    pub fn locate(&self, identifier: &str) -> Result<Vec<LocatedResource>, PackError> {
        if let Some(dir) = identifier.strip_suffix('/') {
            return self.locate_directory(identifier, dir);
        }

        for candidate in self.naming.candidates(identifier) {
            for root in &self.search_paths {
                let path = root.join(&candidate);

                if path.is_file() {
                    debug!("located {} at {}", identifier, path.display());

                    return Ok(vec![LocatedResource {
                        name: candidate,
                        path,
                    }]);
                }
            }
        }

        Err(self.not_found(identifier))
    }

    fn locate_directory(&self, identifier: &str, dir: &str) -> Result<Vec<LocatedResource>, PackError> {
        let root = self
            .search_paths
            .iter()
            .find(|root| root.join(dir).is_dir())
            .ok_or_else(|| self.not_found(identifier))?;

        let mut res = Vec::new();

        for entry in walkdir::WalkDir::new(root.join(dir)).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(root).to_path_buf();
                PackError::io(path, e.into())
            })?;

            if !entry.file_type().is_file() {
                continue;
            }

            let name = match resource_name(root, entry.path()) {
                Some(name) => name,
                None => {
                    warn!("skipping non UTF-8 path {}", entry.path().display());
                    continue;
                }
            };

            if !name.ends_with(&self.naming.extension) {
                continue;
            }

            res.push(LocatedResource {
                name,
                path: entry.path().to_path_buf(),
            });
        }

        if res.is_empty() {
            return Err(self.not_found(identifier));
        }

        debug!("located {} resources under {}", res.len(), identifier);

        Ok(res)
    }
}

/// `/` separated path of `path` relative to `root`.
fn resource_name(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;

    let components = relative
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<Vec<_>>>()?;

    Some(components.join("/"))
}
