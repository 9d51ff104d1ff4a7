// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Locating archives inside generated artifacts. */

use {
    crate::{
        bootstrap::{BootstrapSettings, BOOTSTRAP_MARKER},
        ResolveError,
    },
    log::debug,
    packed_sources::{ArchiveReader, LineLayout, PackedResource, TableOfContents, HEADER_PREFIX},
    std::{
        fs::File,
        io::{BufRead, BufReader, Cursor, Read, Seek, SeekFrom},
        path::Path,
    },
};

/// A generated artifact with an embedded packed sources archive.
///
/// Constructing one scans the artifact up to the archive header, collecting
/// bootstrap directives on the way. Directives are only honored after the
/// bootstrap marker line. The archive itself is not parsed until
/// the first lookup.
#[derive(Debug)]
pub struct PackedArtifact<R: Read + Seek> {
    origin: String,
    reader: ArchiveReader<R>,
    archive_start_line: usize,
    settings: BootstrapSettings,
}

impl PackedArtifact<Cursor<memmap2::Mmap>> {
    /// Open an artifact on the filesystem by memory mapping it.
    pub fn open(path: &Path) -> Result<Self, ResolveError> {
        let io_error = |source| ResolveError::Io {
            path: path.to_path_buf(),
            source,
        };

        let f = File::open(path).map_err(io_error)?;
        let mapped = unsafe { memmap2::Mmap::map(&f) }.map_err(io_error)?;

        Self::from_source(Cursor::new(mapped), path.display().to_string())
    }
}

impl PackedArtifact<Cursor<Vec<u8>>> {
    /// Construct an instance from artifact bytes held in memory.
    pub fn from_bytes(data: Vec<u8>, origin: impl ToString) -> Result<Self, ResolveError> {
        Self::from_source(Cursor::new(data), origin.to_string())
    }
}

impl<R: Read + Seek> PackedArtifact<R> {
    /// Construct an instance from an arbitrary source of artifact bytes.
    ///
    /// `origin` names the artifact in diagnostics and line directives.
    pub fn from_source(mut source: R, origin: String) -> Result<Self, ResolveError> {
        let archive_error = |source: packed_sources::Error| ResolveError::Archive {
            origin: origin.clone(),
            source,
        };

        source
            .seek(SeekFrom::Start(0))
            .map_err(|e| archive_error(e.into()))?;

        let mut settings = BootstrapSettings::default();
        let mut offset = 0u64;
        let mut archive_start_line = 0;
        let mut in_bootstrap = false;

        {
            let mut reader = BufReader::new(&mut source);
            let mut line = Vec::new();

            loop {
                line.clear();
                let count = reader
                    .read_until(b'\n', &mut line)
                    .map_err(|e| archive_error(e.into()))?;

                if count == 0 {
                    return Err(archive_error(packed_sources::Error::MalformedArchive(
                        "no archive header found".to_string(),
                    )));
                }

                if line.starts_with(HEADER_PREFIX.as_bytes()) {
                    break;
                }

                // Host code in the preamble need not be UTF-8. Directives are.
                if let Ok(text) = std::str::from_utf8(&line) {
                    let text = text.trim_end_matches(['\n', '\r']);

                    if text == BOOTSTRAP_MARKER {
                        in_bootstrap = true;
                    } else if in_bootstrap {
                        settings.apply_directive(text, &origin)?;
                    }
                }

                offset += count as u64;
                archive_start_line += 1;
            }
        }

        debug!(
            "{}: archive header at offset {} after {} lines",
            origin, offset, archive_start_line
        );

        Ok(Self {
            origin,
            reader: ArchiveReader::with_offset(source, offset),
            archive_start_line,
            settings,
        })
    }

    /// Name of this artifact used in diagnostics.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// The reader over the embedded archive.
    pub fn reader(&self) -> &ArchiveReader<R> {
        &self.reader
    }

    /// Number of artifact lines preceding the archive header.
    pub fn archive_start_line(&self) -> usize {
        self.archive_start_line
    }

    /// Resolver settings recorded in the bootstrap section.
    pub fn settings(&self) -> &BootstrapSettings {
        &self.settings
    }

    /// The archive's table of contents. Parses it if needed.
    ///
    /// Fails if the resource count announced by the bootstrap section does
    /// not match the archive.
    pub fn table_of_contents(&self) -> Result<&TableOfContents, ResolveError> {
        let toc = self
            .reader
            .table_of_contents()
            .map_err(|e| self.archive_error(e))?;

        match self.settings.declared_resources {
            Some(declared) if declared != toc.len() => {
                Err(self.archive_error(packed_sources::Error::MalformedArchive(format!(
                    "bootstrap declares {} resources; archive has {}",
                    declared,
                    toc.len()
                ))))
            }
            _ => Ok(toc),
        }
    }

    /// Retrieve a resource by its stored name.
    pub fn lookup(&self, name: &str) -> Result<Option<PackedResource>, ResolveError> {
        self.table_of_contents()?;
        self.reader.lookup(name).map_err(|e| self.archive_error(e))
    }

    /// Line layout of the embedded archive. Parses the TOC if needed.
    pub fn line_layout(&self) -> Result<LineLayout, ResolveError> {
        Ok(self
            .table_of_contents()?
            .line_layout(self.archive_start_line))
    }

    /// Names of all resources in the archive.
    pub fn names(&self) -> Result<Vec<String>, ResolveError> {
        Ok(self
            .table_of_contents()?
            .iter()
            .map(|e| e.name.clone())
            .collect())
    }

    /// Resolve an absolute artifact line to a resource name and a line within it.
    pub fn locate_line(&self, absolute_line: usize) -> Result<Option<(String, usize)>, ResolveError> {
        let toc = self.table_of_contents()?;
        let layout = toc.line_layout(self.archive_start_line);

        Ok(toc
            .entry_at_line(&layout, absolute_line)
            .map(|(entry, local)| (entry.name.clone(), local)))
    }

    fn archive_error(&self, source: packed_sources::Error) -> ResolveError {
        ResolveError::Archive {
            origin: self.origin.clone(),
            source,
        }
    }
}
